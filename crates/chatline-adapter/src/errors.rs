/// Generic message used when the backend signals an error without content.
pub(crate) const STREAM_FAILED_FALLBACK: &str = "Streaming failed.";

/// Errors surfaced by the chat adapter.
///
/// Empty input and cancellation are not represented here: the former yields a
/// placeholder snapshot and the latter ends the snapshot stream without an
/// error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Backend answered with a non-success HTTP status.
    #[error("Request failed ({status}).")]
    RequestFailed { status: u16 },
    /// Response was declared as streaming but carries no readable body.
    #[error("{0}")]
    MalformedStream(String),
    /// Backend sent an in-protocol `error` event.
    #[error("{0}")]
    StreamFailed(String),
    /// Connection or body read failed.
    #[error("transport error: {0}")]
    Transport(String),
    /// A frame or response body could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// Session store could not be read or written.
    #[error("storage error: {0}")]
    Storage(String),
}

impl ChatError {
    /// Builds the error for a backend `error` event, falling back to a generic
    /// message when the event carries no content.
    pub fn stream_failed(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.is_empty() {
            Self::StreamFailed(STREAM_FAILED_FALLBACK.to_string())
        } else {
            Self::StreamFailed(message)
        }
    }

    pub(crate) fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub(crate) fn protocol_msg(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Returns the HTTP status for `RequestFailed`, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::RequestFailed { status } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_failed_names_status() {
        let err = ChatError::RequestFailed { status: 500 };
        assert_eq!(err.to_string(), "Request failed (500).");
        assert_eq!(err.status_code(), Some(500));
    }

    #[test]
    fn stream_failed_uses_backend_message_or_fallback() {
        assert_eq!(ChatError::stream_failed("backend down").to_string(), "backend down");
        assert_eq!(ChatError::stream_failed("").to_string(), "Streaming failed.");
    }
}
