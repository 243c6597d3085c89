//! Text and HTML board rendering.

use std::fmt::Write as _;

use super::position::Position;
use super::types::Square;

impl Position {
    /// Renders the board as a boxed ASCII diagram, White at the bottom.
    ///
    /// ```text
    ///    +------------------------+
    ///  8 | r  n  b  q  k  b  n  r |
    ///  ...
    ///  1 | R  N  B  Q  K  B  N  R |
    ///    +------------------------+
    ///      a  b  c  d  e  f  g  h
    /// ```
    #[must_use]
    pub fn render_ascii(&self) -> String {
        let mut out = String::from("   +------------------------+\n");

        for rank in (0..8).rev() {
            let _ = write!(out, " {} |", rank + 1);
            for file in 0..8 {
                let c = Square::new(file, rank)
                    .and_then(|sq| self.piece_at(sq))
                    .map_or('.', |piece| piece.fen_char());
                let _ = write!(out, " {c} ");
            }
            out.push_str("|\n");
        }

        out.push_str("   +------------------------+\n");
        out.push_str("     a  b  c  d  e  f  g  h");
        out
    }

    /// Renders the board as a self-contained HTML table.
    #[must_use]
    pub fn render_html(&self) -> String {
        let mut out = String::from(concat!(
            "<table class=\"chess-board\" ",
            "style=\"border-collapse:collapse;font-size:32px;text-align:center\">\n"
        ));

        for rank in (0..8).rev() {
            let _ = write!(out, "<tr><th>{}</th>", rank + 1);
            for file in 0..8 {
                let Some(square) = Square::new(file, rank) else {
                    continue;
                };
                let (class, color) = if square.is_dark() {
                    ("dark", "#b58863")
                } else {
                    ("light", "#f0d9b5")
                };
                let symbol = self
                    .piece_at(square)
                    .map_or(String::from("&nbsp;"), |piece| piece.symbol().to_string());
                let _ = write!(
                    out,
                    "<td class=\"{class}\" data-square=\"{square}\" \
                     style=\"width:48px;height:48px;background:{color}\">{symbol}</td>"
                );
            }
            out.push_str("</tr>\n");
        }

        out.push_str("<tr><th></th>");
        for file in 'a'..='h' {
            let _ = write!(out, "<th>{file}</th>");
        }
        out.push_str("</tr>\n");

        let _ = write!(
            out,
            "<caption>{} to move &middot; {}</caption>\n</table>",
            self.turn(),
            self.status()
        );
        out
    }
}
