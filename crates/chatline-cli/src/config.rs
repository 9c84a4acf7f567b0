use std::path::Path;

use chatline_adapter::{ChatClientConfig, ChatError};

use crate::cli::Cli;

/// Load `.env` files next to the crate manifest and in the working directory.
pub fn init() {
    let _ = dotenvy::from_path(Path::new(
        format!("{}/.env", env!("CARGO_MANIFEST_DIR")).as_str(),
    ));
    dotenvy::dotenv().ok();
}

pub(crate) fn parse_bool_env(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

/// Builds the adapter config from the environment, then applies CLI flags.
pub fn client_config(cli: &Cli) -> Result<ChatClientConfig, ChatError> {
    Ok(apply_flags(ChatClientConfig::from_env()?, cli))
}

fn apply_flags(mut config: ChatClientConfig, cli: &Cli) -> ChatClientConfig {
    if let Some(base_url) = cli.base_url.as_deref().filter(|v| !v.trim().is_empty()) {
        config = config.base_url(base_url);
    }
    if let Some(mode) = cli.mode {
        config = config.mode(mode);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatline_adapter::ResponseMode;
    use clap::Parser as _;

    #[test]
    fn parse_bool_env_accepts_common_spellings() {
        assert_eq!(parse_bool_env(" Yes "), Some(true));
        assert_eq!(parse_bool_env("off"), Some(false));
        assert_eq!(parse_bool_env("maybe"), None);
    }

    #[test]
    fn flags_override_environment() {
        let cli = Cli::parse_from([
            "chatline",
            "--base-url",
            "http://backend:9000",
            "--mode",
            "json",
        ]);
        let env = ChatClientConfig::new("http://env:8000").mode(ResponseMode::Stream);
        let config = apply_flags(env, &cli);
        assert_eq!(config.run_url(), "http://backend:9000/chat");
        assert_eq!(config.mode, ResponseMode::Json);
    }

    #[test]
    fn absent_flags_keep_environment_values() {
        let cli = Cli::parse_from(["chatline", "--base-url", "  "]);
        let env = ChatClientConfig::new("http://env:8000").mode(ResponseMode::Auto);
        let config = apply_flags(env, &cli);
        assert_eq!(config.base_url, "http://env:8000");
        assert_eq!(config.mode, ResponseMode::Auto);
    }
}
