//! Common imports for typical adapter usage.
pub use crate::{
    AbortHandle, AssistantSnapshot, ChatAdapter, ChatClientConfig, ChatError, FileSessionStore,
    MemorySessionStore, Message, MessageContent, ResponseMode, Role, SnapshotStream,
};
