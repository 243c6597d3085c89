//! Disconnect detection for in-flight requests.
//!
//! Every SSE body handed to axum is a [`SessionStream`]. It yields events
//! from a channel until the sender side is dropped. If axum drops the stream
//! before that (the client hung up), the owning transport is closed.
//!
//! While a POST is still being answered, before any body exists, a
//! [`DisconnectGuard`] plays the same role: hyper drops the handler future
//! when the client goes away, and the guard closes the transport unless it
//! was disarmed first.

// ============================================================================
// Imports
// ============================================================================

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::response::sse::Event;
use futures_util::Stream;
use tokio::sync::mpsc;
use tracing::debug;

use super::StreamableHttpTransport;

// ============================================================================
// SessionStream
// ============================================================================

/// Channel-backed SSE stream tied to a transport.
pub(crate) struct SessionStream {
    rx: mpsc::UnboundedReceiver<Event>,
    transport: Arc<StreamableHttpTransport>,
    finished: bool,
}

impl SessionStream {
    pub(crate) fn new(
        rx: mpsc::UnboundedReceiver<Event>,
        transport: Arc<StreamableHttpTransport>,
    ) -> Self {
        Self {
            rx,
            transport,
            finished: false,
        }
    }
}

impl Stream for SessionStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(event)) => Poll::Ready(Some(Ok(event))),
            Poll::Ready(None) => {
                self.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for SessionStream {
    fn drop(&mut self) {
        if !self.finished && !self.transport.is_closed() {
            debug!(
                session_id = ?self.transport.session_id(),
                "Client disconnected from stream"
            );
            self.transport.close();
        }
    }
}

// ============================================================================
// DisconnectGuard
// ============================================================================

/// Closes a transport if dropped while still armed.
pub(crate) struct DisconnectGuard<'a> {
    transport: &'a StreamableHttpTransport,
    armed: bool,
}

impl<'a> DisconnectGuard<'a> {
    pub(crate) fn new(transport: &'a StreamableHttpTransport) -> Self {
        Self {
            transport,
            armed: true,
        }
    }

    /// Marks the request as answered.
    pub(crate) fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for DisconnectGuard<'_> {
    fn drop(&mut self) {
        if self.armed && !self.transport.is_closed() {
            debug!(
                session_id = ?self.transport.session_id(),
                "Client disconnected before response"
            );
            self.transport.close();
        }
    }
}
