//! Streaming chat run adapter.
//!
//! Turns a conversation history into a single backend request and exposes the
//! reply as a lazy, cancellable stream of assistant snapshots. Each snapshot
//! carries the full reply text so far, so callers render by replacement.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use chatline_adapter::prelude::*;
//! use futures::StreamExt as _;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ChatError> {
//! let adapter = ChatAdapter::new(
//!     ChatClientConfig::from_env()?,
//!     Arc::new(FileSessionStore::new(".chatline/session.json")),
//! )?;
//!
//! let history = vec![Message::user("How do I size an RDS instance?")];
//! let mut run = adapter.run(&history, AbortHandle::new(), None);
//! while let Some(snapshot) = run.next().await {
//!     println!("{}", snapshot?.as_text());
//! }
//! # Ok(())
//! # }
//! ```

/// Cancellation handle and signal.
pub mod abort;
/// Chat adapter, run stream and health probe.
pub mod adapter;
/// Client configuration and response modes.
pub mod config;
/// Conversation messages and assistant snapshots.
pub mod content;
/// Public error type.
pub mod errors;
/// Common imports for typical usage.
pub mod prelude;
/// Session id generation and persistence.
pub mod session;
/// Server-sent-events framing and backend stream events.
pub mod transport;

pub use abort::{AbortHandle, AbortSignal};
pub use adapter::{ChatAdapter, HealthStatus, SnapshotStream};
pub use config::{ChatClientConfig, PresentationText, ResponseMode};
pub use content::{
    AssistantSnapshot, ContentPart, Message, MessageContent, Role, SnapshotPart,
    latest_user_text,
};
pub use errors::ChatError;
pub use session::{
    FileSessionStore, MemorySessionStore, SessionId, SessionIdStrategy, SessionIdentity,
    SessionStore,
};
pub use transport::{SseDecoder, StreamEvent, StreamEventKind};
