// Application configuration, loaded from environment variables and CLI flags.

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default command prefix for DMs and guilds without their own.
    pub prefix: String,
    /// User ID of the bot owner; always allowed through permission checks.
    pub dev_id: i64,
    /// Gateway token, consumed by the gateway host process.
    pub token: Option<String>,
    /// Database URL (SQLite connection string).
    pub database_url: String,
    /// Port to bind the HTTP interaction server to.
    pub port: u16,
    /// Status line shown under the bot's name.
    pub status: String,
    pub version: String,
    pub environment: String,
    /// Number of guilds above which new joins are refused.
    pub guild_limit: usize,
    /// Display name used in reply footers.
    pub bot_name: String,
    /// User ID of the bot account, used for mention prefixes.
    pub bot_user_id: i64,
}

pub const DEFAULT_PREFIX: &str = "=";
pub const DEFAULT_DEV_ID: i64 = 175386962364989440;
pub const DEFAULT_GUILD_LIMIT: usize = 90;

impl Default for Config {
    fn default() -> Self {
        Config {
            prefix: DEFAULT_PREFIX.to_string(),
            dev_id: DEFAULT_DEV_ID,
            token: None,
            database_url: "sqlite:poddo.db?mode=rwc".to_string(),
            port: 3000,
            status: format!("{DEFAULT_PREFIX}help for help."),
            version: "testing".to_string(),
            environment: "testing".to_string(),
            guild_limit: DEFAULT_GUILD_LIMIT,
            bot_name: "Poddo".to_string(),
            bot_user_id: 0,
        }
    }
}

impl Config {
    /// Load configuration from environment variables and CLI arguments.
    ///
    /// Environment variables:
    /// - `DISCORD_BOT_PREFIX` - default command prefix (default: `=`)
    /// - `DEV_ID` - bot owner user ID
    /// - `DISCORD_BOT_TOKEN` - gateway token
    /// - `DATABASE_URL` - SQLite connection string (default: `sqlite:poddo.db?mode=rwc`)
    /// - `PORT` - HTTP server port (default: 3000)
    /// - `DISCORD_STATUS` - status line (default: `{prefix}help for help.`)
    /// - `VERSION`, `ENVIRONMENT` - reported by `about` (default: `testing`)
    /// - `GUILD_LIMIT` - maximum guild count (default: 90)
    /// - `BOT_NAME`, `BOT_USER_ID` - bot identity for replies and mentions
    ///
    /// CLI flags:
    /// - `--port <PORT>` - Override the port
    /// - `--prefix <PREFIX>` - Override the default prefix
    pub fn load() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self::from_sources(&args, |key| std::env::var(key).ok())
    }

    /// Build a config from CLI args and an environment lookup.
    pub fn from_sources(args: &[String], env: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Config::default();

        let prefix = Self::parse_cli_value(args, "--prefix")
            .or_else(|| env("DISCORD_BOT_PREFIX"))
            .filter(|p| !p.is_empty())
            .unwrap_or(defaults.prefix);

        let dev_id = env("DEV_ID")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.dev_id);

        let token = env("DISCORD_BOT_TOKEN").filter(|t| !t.is_empty());

        let database_url = env("DATABASE_URL").unwrap_or(defaults.database_url);

        // Port: CLI flag --port takes precedence, then env var, then default
        let port = Self::parse_cli_value(args, "--port")
            .and_then(|v| v.parse().ok())
            .or_else(|| env("PORT").and_then(|v| v.parse().ok()))
            .unwrap_or(defaults.port);

        let status = env("DISCORD_STATUS").unwrap_or_else(|| format!("{prefix}help for help."));

        let guild_limit = env("GUILD_LIMIT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.guild_limit);

        Config {
            prefix,
            dev_id,
            token,
            database_url,
            port,
            status,
            version: env("VERSION").unwrap_or(defaults.version),
            environment: env("ENVIRONMENT").unwrap_or(defaults.environment),
            guild_limit,
            bot_name: env("BOT_NAME").unwrap_or(defaults.bot_name),
            bot_user_id: env("BOT_USER_ID")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.bot_user_id),
        }
    }

    /// Parse a CLI flag value like `--port 8080`.
    fn parse_cli_value(args: &[String], flag: &str) -> Option<String> {
        args.windows(2).find_map(|pair| {
            if pair[0] == flag {
                Some(pair[1].clone())
            } else {
                None
            }
        })
    }
}
