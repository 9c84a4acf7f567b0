use std::fmt;
use std::str::FromStr;

use crate::errors::ChatError;
use crate::session::DEFAULT_SESSION_KEY;

/// Base URL used when `CHATLINE_API_BASE_URL` is unset.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Which backend protocol a run speaks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// POST to the stream path and decode server-sent events.
    #[default]
    Stream,
    /// POST to the chat path and decode a single `{reply}` document.
    Json,
    /// POST to the stream path and pick the decoder from `Content-Type`.
    Auto,
}

impl fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stream => "stream",
            Self::Json => "json",
            Self::Auto => "auto",
        })
    }
}

impl FromStr for ResponseMode {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stream" | "sse" => Ok(Self::Stream),
            "json" | "single" => Ok(Self::Json),
            "auto" => Ok(Self::Auto),
            other => Err(ChatError::Config(format!(
                "unknown response mode `{other}` (expected stream, json or auto)"
            ))),
        }
    }
}

/// User-facing fallback copy emitted as assistant snapshots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PresentationText {
    /// Shown when there is no user text to send.
    pub empty_input: String,
    /// Shown when a single-shot reply is missing or blank.
    pub no_response: String,
}

impl Default for PresentationText {
    fn default() -> Self {
        Self {
            empty_input: "Type a message to begin.".to_string(),
            no_response: "No response from server.".to_string(),
        }
    }
}

/// Configuration for `ChatAdapter`.
#[derive(Clone, Debug)]
pub struct ChatClientConfig {
    /// Backend base URL, without a trailing path.
    pub base_url: String,
    /// Protocol used for runs.
    pub mode: ResponseMode,
    /// Path of the server-sent-events endpoint.
    pub stream_path: String,
    /// Path of the single-shot JSON endpoint.
    pub chat_path: String,
    /// Path of the health probe.
    pub health_path: String,
    /// Storage key for the session id.
    pub session_key: String,
    /// Fallback copy.
    pub text: PresentationText,
}

impl Default for ChatClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ChatClientConfig {
    /// Creates a config with default paths for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            mode: ResponseMode::default(),
            stream_path: "/chat/stream".to_string(),
            chat_path: "/chat".to_string(),
            health_path: "/health".to_string(),
            session_key: DEFAULT_SESSION_KEY.to_string(),
            text: PresentationText::default(),
        }
    }

    /// Builds a config from `CHATLINE_*` environment variables.
    ///
    /// - `CHATLINE_API_BASE_URL`: backend base URL (default `http://localhost:8000`).
    /// - `CHATLINE_RESPONSE_MODE`: `stream`, `json` or `auto` (default `stream`).
    /// - `CHATLINE_EMPTY_INPUT_TEXT` / `CHATLINE_NO_RESPONSE_TEXT`: fallback copy.
    pub fn from_env() -> Result<Self, ChatError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ChatError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = Self::new(
            non_empty("CHATLINE_API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        );
        if let Some(mode) = non_empty("CHATLINE_RESPONSE_MODE") {
            config.mode = mode.parse()?;
        }
        if let Some(text) = non_empty("CHATLINE_EMPTY_INPUT_TEXT") {
            config.text.empty_input = text;
        }
        if let Some(text) = non_empty("CHATLINE_NO_RESPONSE_TEXT") {
            config.text.no_response = text;
        }
        config.validate()?;
        Ok(config)
    }

    /// Overrides the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the response mode.
    pub fn mode(mut self, mode: ResponseMode) -> Self {
        self.mode = mode;
        self
    }

    /// Overrides the fallback copy.
    pub fn text(mut self, text: PresentationText) -> Self {
        self.text = text;
        self
    }

    /// Overrides the session storage key.
    pub fn session_key(mut self, key: impl Into<String>) -> Self {
        self.session_key = key.into();
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ChatError> {
        if self.base_url.trim().is_empty() {
            return Err(ChatError::Config("base_url must not be empty".into()));
        }
        if self.session_key.trim().is_empty() {
            return Err(ChatError::Config("session_key must not be empty".into()));
        }
        Ok(())
    }

    /// URL a run posts to for the configured mode.
    pub fn run_url(&self) -> String {
        match self.mode {
            ResponseMode::Json => self.join(&self.chat_path),
            ResponseMode::Stream | ResponseMode::Auto => self.join(&self.stream_path),
        }
    }

    pub(crate) fn health_url(&self) -> String {
        self.join(&self.health_path)
    }

    fn join(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_point_at_local_stream_endpoint() {
        let config = ChatClientConfig::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config.run_url(), "http://localhost:8000/chat/stream");
        assert_eq!(config.text.empty_input, "Type a message to begin.");
        assert_eq!(config.text.no_response, "No response from server.");
    }

    #[test]
    fn env_overrides_are_applied() {
        let config = ChatClientConfig::from_lookup(lookup(&[
            ("CHATLINE_API_BASE_URL", "https://chat.example.com/"),
            ("CHATLINE_RESPONSE_MODE", "JSON"),
            ("CHATLINE_EMPTY_INPUT_TEXT", "Say something."),
        ]))
        .expect("config");
        assert_eq!(config.mode, ResponseMode::Json);
        assert_eq!(config.run_url(), "https://chat.example.com/chat");
        assert_eq!(config.text.empty_input, "Say something.");
        assert_eq!(config.health_url(), "https://chat.example.com/health");
    }

    #[test]
    fn invalid_mode_is_a_config_error() {
        let err = ChatClientConfig::from_lookup(lookup(&[("CHATLINE_RESPONSE_MODE", "carrier")]))
            .expect_err("should fail");
        assert!(matches!(err, ChatError::Config(msg) if msg.contains("carrier")));
    }

    #[test]
    fn blank_base_url_falls_back_to_default() {
        let config = ChatClientConfig::from_lookup(lookup(&[("CHATLINE_API_BASE_URL", "  ")]))
            .expect("config");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }
}
