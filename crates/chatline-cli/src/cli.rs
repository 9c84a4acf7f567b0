use std::path::PathBuf;

use chatline_adapter::ResponseMode;
use clap::Parser;

/// Terminal chat client for a streaming chat backend.
#[derive(Debug, Parser)]
#[command(name = "chatline", version, about)]
pub struct Cli {
    /// Backend base URL (overrides CHATLINE_API_BASE_URL).
    #[arg(long)]
    pub base_url: Option<String>,

    /// Response protocol: stream, json or auto (overrides CHATLINE_RESPONSE_MODE).
    #[arg(long)]
    pub mode: Option<ResponseMode>,

    /// Thread id sent instead of the persisted session id.
    #[arg(long)]
    pub thread_id: Option<String>,

    /// File holding the persisted session id.
    #[arg(long, env = "CHATLINE_SESSION_FILE", default_value = ".chatline/session.json")]
    pub session_file: PathBuf,

    /// Send one message, print the reply and exit.
    #[arg(long, short = 'm')]
    pub message: Option<String>,

    /// Probe the backend health endpoint and exit.
    #[arg(long)]
    pub health: bool,
}

/// One line typed at the interactive prompt.
#[derive(Debug, PartialEq, Eq)]
pub enum ReplInput<'a> {
    Quit,
    Reset,
    /// Blank line; nothing is sent or recorded.
    Skip,
    Send(&'a str),
}

impl<'a> ReplInput<'a> {
    pub fn parse(line: &'a str) -> Self {
        match line.trim() {
            "/quit" | "/exit" => Self::Quit,
            "/reset" => Self::Reset,
            "" => Self::Skip,
            _ => Self::Send(line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_one_shot_invocation() {
        let cli = Cli::parse_from(["chatline", "-m", "hello", "--mode", "auto", "--thread-id", "t1"]);
        assert_eq!(cli.message.as_deref(), Some("hello"));
        assert_eq!(cli.mode, Some(ResponseMode::Auto));
        assert_eq!(cli.thread_id.as_deref(), Some("t1"));
        assert!(!cli.health);
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["chatline", "--mode", "carrier"]).is_err());
    }

    #[test]
    fn blank_lines_are_skipped_and_commands_recognized() {
        assert_eq!(ReplInput::parse("   \t"), ReplInput::Skip);
        assert_eq!(ReplInput::parse(""), ReplInput::Skip);
        assert_eq!(ReplInput::parse(" /exit "), ReplInput::Quit);
        assert_eq!(ReplInput::parse("/reset"), ReplInput::Reset);
        assert_eq!(ReplInput::parse(" hi "), ReplInput::Send(" hi "));
    }
}
