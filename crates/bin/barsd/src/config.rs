use clap::{Parser, builder::BoolishValueParser};
use std::error::Error;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_TOOL_ADDR: &str = "127.0.0.1:4030";
const DEFAULT_REST_ADDR: &str = "127.0.0.1:4040";
const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;

#[derive(Parser, Debug)]
#[command(name = "barsd", version, about = "Bars query daemon.")]
struct CliArgs {
    #[arg(long, env = "SUPABASE_URL")]
    supabase_url: Option<String>,

    #[arg(long, env = "SUPABASE_KEY")]
    supabase_key: Option<String>,

    #[arg(long, env = "BARS_TOOL_ADDR", default_value = DEFAULT_TOOL_ADDR)]
    tool_addr: SocketAddr,

    #[arg(long, env = "BARS_REST_ADDR", default_value = DEFAULT_REST_ADDR)]
    rest_addr: SocketAddr,

    #[arg(
        long,
        env = "BARS_STORE_TIMEOUT_SECS",
        default_value_t = DEFAULT_STORE_TIMEOUT_SECS
    )]
    store_timeout_secs: u64,

    #[arg(
        long,
        env = "BARS_TOOL_SERVE",
        default_value_t = true,
        value_parser = BoolishValueParser::new()
    )]
    tool_serve: bool,

    #[arg(
        long,
        env = "BARS_REST_SERVE",
        default_value_t = true,
        value_parser = BoolishValueParser::new()
    )]
    rest_serve: bool,
}

/// Runtime configuration loaded from CLI arguments and environment variables.
#[derive(Clone, Debug)]
pub struct BarsConfig {
    pub supabase_url: String,
    pub supabase_key: String,
    pub tool_addr: SocketAddr,
    pub rest_addr: SocketAddr,
    pub store_timeout: Duration,
    pub tool_serve: bool,
    pub rest_serve: bool,
}

#[derive(Debug)]
pub enum ConfigError {
    MissingSetting(&'static str),
    InvalidSetting { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSetting(name) => write!(f, "missing required setting: {name}"),
            Self::InvalidSetting { name, value } => {
                write!(f, "invalid {name} value: {value}")
            }
        }
    }
}

impl Error for ConfigError {}

impl BarsConfig {
    pub fn from_args() -> Result<Self, ConfigError> {
        let args = CliArgs::parse();
        Self::try_from(args)
    }
}

impl TryFrom<CliArgs> for BarsConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let supabase_url = args
            .supabase_url
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::MissingSetting("SUPABASE_URL"))?;
        let supabase_key = args
            .supabase_key
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::MissingSetting("SUPABASE_KEY"))?;

        if args.store_timeout_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "BARS_STORE_TIMEOUT_SECS",
                value: args.store_timeout_secs.to_string(),
            });
        }

        Ok(Self {
            supabase_url,
            supabase_key,
            tool_addr: args.tool_addr,
            rest_addr: args.rest_addr,
            store_timeout: Duration::from_secs(args.store_timeout_secs),
            tool_serve: args.tool_serve,
            rest_serve: args.rest_serve,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> CliArgs {
        CliArgs {
            supabase_url: Some("https://example.supabase.co".to_string()),
            supabase_key: Some("anon-key".to_string()),
            tool_addr: DEFAULT_TOOL_ADDR.parse().expect("valid tool addr"),
            rest_addr: DEFAULT_REST_ADDR.parse().expect("valid rest addr"),
            store_timeout_secs: DEFAULT_STORE_TIMEOUT_SECS,
            tool_serve: true,
            rest_serve: true,
        }
    }

    #[test]
    fn requires_store_credentials() {
        let mut args = base_args();
        args.supabase_url = Some("   ".to_string());

        let err = BarsConfig::try_from(args).expect_err("config should fail");
        assert!(matches!(err, ConfigError::MissingSetting("SUPABASE_URL")));
    }

    #[test]
    fn rejects_a_zero_store_timeout() {
        let mut args = base_args();
        args.store_timeout_secs = 0;

        let err = BarsConfig::try_from(args).expect_err("config should fail");
        assert!(matches!(
            err,
            ConfigError::InvalidSetting {
                name: "BARS_STORE_TIMEOUT_SECS",
                ..
            }
        ));
    }

    #[test]
    fn accepts_complete_settings() {
        let config = BarsConfig::try_from(base_args()).expect("config should parse");
        assert_eq!(config.store_timeout, Duration::from_secs(10));
        assert!(config.tool_serve);
        assert!(config.rest_serve);
    }
}
