//! Chess tools exposed over MCP.
//!
//! # Tools
//!
//! | Tool | Arguments | Effect |
//! |------|-----------|--------|
//! | `new_game` | `fen?` | Resets the session's game |
//! | `make_move` | `move` | Plays a UCI move |
//! | `get_board` | | ASCII board, FEN and status |
//! | `legal_moves` | | Legal moves in UCI notation |
//! | `board_html` | | HTML board |
//!
//! Every tool reads the session's position from the [`PositionStore`],
//! falling back to the starting position, and mutating tools write it back.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{HeaderMap, header};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::chess::{Position, STARTING_FEN};
use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::protocol::{McpServer, ServerFactory, Tool, ToolContext, ToolHandler, ToolOutput};
use crate::store::PositionStore;

// ============================================================================
// Constants
// ============================================================================

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "chess-mcp-server";

const INSTRUCTIONS: &str = "Play chess. Start with new_game, then alternate make_move calls \
     for both sides using UCI notation such as e2e4 or e7e8q. \
     Use get_board or board_html to show the position and legal_moves to list options.";

// ============================================================================
// Game Access
// ============================================================================

/// Loads and saves the position of the calling session.
#[derive(Clone)]
struct Game {
    store: Arc<dyn PositionStore>,
}

impl Game {
    fn session<'a>(&self, ctx: &'a ToolContext) -> Result<&'a SessionId> {
        ctx.session_id()
            .ok_or_else(|| Error::protocol("chess tools require a session"))
    }

    async fn load(&self, ctx: &ToolContext) -> Result<Position> {
        let session_id = self.session(ctx)?;
        Ok(self.store.load(session_id).await?.unwrap_or_default())
    }

    async fn save(&self, ctx: &ToolContext, position: &Position) -> Result<()> {
        self.store.save(self.session(ctx)?, position).await
    }
}

fn describe(position: &Position) -> String {
    format!(
        "{}\n\nFEN: {}\nTurn: {}\nStatus: {}",
        position.render_ascii(),
        position.fen(),
        position.turn(),
        position.status()
    )
}

// ============================================================================
// Tool Handlers
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct NewGameArgs {
    #[serde(default)]
    fen: Option<String>,
}

struct NewGame(Game);

#[async_trait]
impl ToolHandler for NewGame {
    async fn call(&self, ctx: ToolContext, arguments: Value) -> Result<ToolOutput> {
        let args: NewGameArgs = serde_json::from_value(arguments)?;
        let position = match args.fen.as_deref() {
            Some(fen) => Position::from_fen(fen)?,
            None => Position::starting(),
        };

        self.0.save(&ctx, &position).await?;
        info!(session_id = ?ctx.session_id(), fen = %position.fen(), "New game");

        Ok(ToolOutput::text(format!("New game started.\n\n{}", describe(&position))))
    }
}

#[derive(Debug, Deserialize)]
struct MakeMoveArgs {
    #[serde(rename = "move")]
    notation: String,
}

struct MakeMove(Game);

#[async_trait]
impl ToolHandler for MakeMove {
    async fn call(&self, ctx: ToolContext, arguments: Value) -> Result<ToolOutput> {
        let args: MakeMoveArgs = serde_json::from_value(arguments)?;
        let before = self.0.load(&ctx).await?;
        let after = before.apply_uci(&args.notation)?;
        self.0.save(&ctx, &after).await?;

        let status = after.status();
        debug!(session_id = ?ctx.session_id(), mv = %args.notation, %status, "Move played");
        ctx.log(
            "info",
            json!({
                "move": args.notation.trim().to_ascii_lowercase(),
                "fen": after.fen(),
                "status": status,
            }),
        );

        Ok(ToolOutput::text(format!(
            "Played {}.\n\n{}",
            args.notation.trim(),
            describe(&after)
        )))
    }
}

struct GetBoard(Game);

#[async_trait]
impl ToolHandler for GetBoard {
    async fn call(&self, ctx: ToolContext, _arguments: Value) -> Result<ToolOutput> {
        let position = self.0.load(&ctx).await?;
        Ok(ToolOutput::text(describe(&position)))
    }
}

struct LegalMoves(Game);

#[async_trait]
impl ToolHandler for LegalMoves {
    async fn call(&self, ctx: ToolContext, _arguments: Value) -> Result<ToolOutput> {
        let position = self.0.load(&ctx).await?;
        let mut moves: Vec<String> = position
            .legal_moves()
            .iter()
            .map(ToString::to_string)
            .collect();
        moves.sort();

        let text = if moves.is_empty() {
            format!("No legal moves ({}).", position.status())
        } else {
            format!(
                "{} legal moves for {}: {}",
                moves.len(),
                position.turn(),
                moves.join(" ")
            )
        };
        Ok(ToolOutput::text(text))
    }
}

struct BoardHtml(Game);

#[async_trait]
impl ToolHandler for BoardHtml {
    async fn call(&self, ctx: ToolContext, _arguments: Value) -> Result<ToolOutput> {
        let position = self.0.load(&ctx).await?;
        Ok(ToolOutput::text(position.render_html()))
    }
}

// ============================================================================
// Tool Set
// ============================================================================

fn no_arguments() -> Value {
    json!({ "type": "object", "properties": {} })
}

/// Builds the chess tool set backed by `store`.
#[must_use]
pub fn chess_tools(store: Arc<dyn PositionStore>) -> Vec<Tool> {
    let game = Game { store };

    vec![
        Tool::new(
            "new_game",
            "Start a new game from the initial position or from a FEN string.",
            json!({
                "type": "object",
                "properties": {
                    "fen": {
                        "type": "string",
                        "description": format!("Optional starting position, default {STARTING_FEN}"),
                    }
                }
            }),
            Arc::new(NewGame(game.clone())),
        ),
        Tool::new(
            "make_move",
            "Play a move for the side to move in UCI notation, for example e2e4 or e7e8q.",
            json!({
                "type": "object",
                "properties": {
                    "move": { "type": "string", "description": "Move in UCI notation" }
                },
                "required": ["move"]
            }),
            Arc::new(MakeMove(game.clone())),
        ),
        Tool::new(
            "get_board",
            "Show the current board as text with FEN, side to move and game status.",
            no_arguments(),
            Arc::new(GetBoard(game.clone())),
        ),
        Tool::new(
            "legal_moves",
            "List every legal move for the side to move in UCI notation.",
            no_arguments(),
            Arc::new(LegalMoves(game.clone())),
        ),
        Tool::new(
            "board_html",
            "Render the current board as an HTML table.",
            no_arguments(),
            Arc::new(BoardHtml(game)),
        ),
    ]
}

// ============================================================================
// ChessServerFactory
// ============================================================================

/// Creates one chess [`McpServer`] per session, all sharing one store.
#[derive(Clone)]
pub struct ChessServerFactory {
    store: Arc<dyn PositionStore>,
}

impl fmt::Debug for ChessServerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChessServerFactory").finish_non_exhaustive()
    }
}

impl ChessServerFactory {
    /// Creates a factory.
    #[must_use]
    pub fn new(store: Arc<dyn PositionStore>) -> Self {
        Self { store }
    }
}

impl ServerFactory for ChessServerFactory {
    fn make_server(&self, headers: &HeaderMap) -> McpServer {
        debug!(
            user_agent = ?headers.get(header::USER_AGENT),
            "Creating chess server for new session"
        );

        chess_tools(Arc::clone(&self.store)).into_iter().fold(
            McpServer::new(SERVER_NAME, env!("CARGO_PKG_VERSION")).with_instructions(INSTRUCTIONS),
            McpServer::tool,
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::protocol::{Content, JsonRpcRequest, RequestId};
    use crate::store::MemoryPositionStore;

    struct Harness {
        store: Arc<MemoryPositionStore>,
        tools: Vec<Tool>,
        ctx: ToolContext,
    }

    impl Harness {
        fn new() -> Self {
            let store = Arc::new(MemoryPositionStore::new());
            Self {
                tools: chess_tools(store.clone()),
                store,
                ctx: ToolContext::detached(Some(SessionId::generate())),
            }
        }

        async fn call(&self, name: &str, arguments: Value) -> Result<String> {
            let tool = self.tools.iter().find(|t| t.name == name).expect("tool");
            let output = tool.handler().call(self.ctx.clone(), arguments).await?;
            let Content::Text { text } = &output.content[0];
            Ok(text.clone())
        }

        async fn position(&self) -> Option<Position> {
            let id = self.ctx.session_id().expect("session").clone();
            self.store.load(&id).await.unwrap()
        }
    }

    #[tokio::test]
    async fn test_get_board_defaults_to_start() {
        let harness = Harness::new();
        let text = harness.call("get_board", json!({})).await.unwrap();
        assert!(text.contains(STARTING_FEN));
        assert!(text.contains("Status: in progress"));
        assert!(harness.position().await.is_none());
    }

    #[tokio::test]
    async fn test_make_move_persists() {
        let harness = Harness::new();
        let text = harness
            .call("make_move", json!({"move": "e2e4"}))
            .await
            .unwrap();
        assert!(text.starts_with("Played e2e4."));

        let position = harness.position().await.expect("saved");
        assert_eq!(
            position.fen(),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1"
        );
    }

    #[tokio::test]
    async fn test_illegal_move_is_error_and_not_saved() {
        let harness = Harness::new();
        let err = harness
            .call("make_move", json!({"move": "e2e5"}))
            .await
            .unwrap_err();
        assert!(err.is_domain_error());
        assert!(harness.position().await.is_none());
    }

    #[tokio::test]
    async fn test_make_move_requires_argument() {
        let harness = Harness::new();
        let err = harness.call("make_move", json!({})).await.unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[tokio::test]
    async fn test_new_game_from_fen() {
        let harness = Harness::new();
        harness
            .call("make_move", json!({"move": "d2d4"}))
            .await
            .unwrap();

        let fen = "4k3/8/8/8/8/8/8/4K2R w K - 0 1";
        harness.call("new_game", json!({"fen": fen})).await.unwrap();
        assert_eq!(harness.position().await.expect("saved").fen(), fen);

        harness.call("new_game", json!({})).await.unwrap();
        assert_eq!(harness.position().await.expect("saved").fen(), STARTING_FEN);
    }

    #[tokio::test]
    async fn test_new_game_rejects_bad_fen() {
        let harness = Harness::new();
        let err = harness
            .call("new_game", json!({"fen": "nonsense"}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFen { .. }));
    }

    #[tokio::test]
    async fn test_legal_moves_listing() {
        let harness = Harness::new();
        let text = harness.call("legal_moves", json!({})).await.unwrap();
        assert!(text.starts_with("20 legal moves for white: "));
        assert!(text.contains("g1f3"));
    }

    #[tokio::test]
    async fn test_board_html() {
        let harness = Harness::new();
        let html = harness.call("board_html", json!({})).await.unwrap();
        assert!(html.starts_with("<table"));
    }

    #[tokio::test]
    async fn test_detached_without_session_fails() {
        let tools = chess_tools(Arc::new(MemoryPositionStore::new()));
        let err = tools[2]
            .handler()
            .call(ToolContext::detached(None), json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[tokio::test]
    async fn test_factory_lists_chess_tools() {
        let factory = ChessServerFactory::new(Arc::new(MemoryPositionStore::new()));
        let server = factory.make_server(&HeaderMap::new());
        assert_eq!(
            server.tool_names(),
            ["new_game", "make_move", "get_board", "legal_moves", "board_html"]
        );

        let response = server
            .handle_request(JsonRpcRequest::new(
                RequestId::Number(7),
                "tools/list",
                None,
            ))
            .await;
        let tools = &response.result.expect("result")["tools"];
        assert_eq!(tools.as_array().map(Vec::len), Some(5));
        assert_eq!(tools[1]["inputSchema"]["required"][0], "move");
    }
}
