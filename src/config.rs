//! Session and server configuration loaded from the environment

use std::time::Duration;

/// Timeouts and bounds for the game session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Time participants get to submit an artifact
    pub submit_timeout: Duration,
    pub vote_timeout: Duration,
    pub comment_timeout: Duration,
    /// Auto-end delay on the final round's results screen
    pub final_results_grace: Duration,
    /// Delay between `game_ended` and the full reset back to Waiting
    pub reset_delay: Duration,
    pub default_max_rounds: u32,
    pub max_rounds_limit: u32,
    /// Non-host participants required to start
    pub min_players: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            submit_timeout: Duration::from_secs(60),
            vote_timeout: Duration::from_secs(60),
            comment_timeout: Duration::from_secs(90),
            final_results_grace: Duration::from_secs(45),
            reset_delay: Duration::from_secs(8),
            default_max_rounds: 10,
            max_rounds_limit: 50,
            min_players: 2,
        }
    }
}

impl SessionConfig {
    /// Load config from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            submit_timeout: env_secs("GIFBATTLE_SUBMIT_SECONDS", defaults.submit_timeout),
            vote_timeout: env_secs("GIFBATTLE_VOTE_SECONDS", defaults.vote_timeout),
            comment_timeout: env_secs("GIFBATTLE_COMMENT_SECONDS", defaults.comment_timeout),
            final_results_grace: env_secs(
                "GIFBATTLE_FINAL_RESULTS_SECONDS",
                defaults.final_results_grace,
            ),
            reset_delay: env_secs("GIFBATTLE_RESET_SECONDS", defaults.reset_delay),
            default_max_rounds: env_parse("GIFBATTLE_DEFAULT_ROUNDS", defaults.default_max_rounds)
                .clamp(1, defaults.max_rounds_limit),
            max_rounds_limit: defaults.max_rounds_limit,
            min_players: env_parse("GIFBATTLE_MIN_PLAYERS", defaults.min_players),
        };

        tracing::info!(
            submit_secs = config.submit_timeout.as_secs(),
            vote_secs = config.vote_timeout.as_secs(),
            comment_secs = config.comment_timeout.as_secs(),
            default_max_rounds = config.default_max_rounds,
            min_players = config.min_players,
            "Session config loaded"
        );

        config
    }

    /// Resolve the requested round count into `1..=max_rounds_limit`.
    /// Zero counts as not given.
    pub fn clamp_max_rounds(&self, requested: Option<u32>) -> u32 {
        match requested {
            Some(0) | None => self.default_max_rounds,
            Some(n) => n.min(self.max_rounds_limit),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", 3000),
            static_dir: std::env::var("STATIC_DIR")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "public".to_string()),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!("Ignoring invalid value for {}: {:?}", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}

fn env_secs(key: &str, default: Duration) -> Duration {
    Duration::from_secs(env_parse(key, default.as_secs()))
}
