//! Runtime configuration for the Among Legends server.

use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Lobby size bounds.
    pub min_players: usize,
    pub max_players: usize,
    /// Debate phase length (seconds).
    pub debate_secs: u64,
    /// Vote phase length (seconds).
    pub vote_secs: u64,
    /// Window after debate entry in which a timed reveal is accepted (seconds).
    pub reveal_window_secs: u64,
    /// Gap between scheduled mission deliveries (seconds).
    pub mission_interval_secs: u64,
    /// Missions a single participant may receive in one session.
    pub max_missions: u32,
    /// Join-code length and how often we retry on collision.
    pub code_length: usize,
    pub code_attempts: u32,
}

impl Settings {
    fn from_env() -> Self {
        Settings {
            min_players: env_or("MIN_PLAYERS", 5),
            max_players: env_or("MAX_PLAYERS", 10),
            debate_secs: env_or("DEBATE_SECS", 5 * 60),
            vote_secs: env_or("VOTE_SECS", 60),
            reveal_window_secs: env_or("REVEAL_WINDOW_SECS", 30),
            mission_interval_secs: env_or("MISSION_INTERVAL_SECS", 5 * 60),
            max_missions: env_or("MAX_MISSIONS", 4),
            code_length: env_or("CODE_LENGTH", 6),
            code_attempts: env_or("CODE_ATTEMPTS", 10),
        }
    }

    pub fn debate_duration(&self) -> Duration {
        Duration::from_secs(self.debate_secs)
    }

    pub fn vote_duration(&self) -> Duration {
        Duration::from_secs(self.vote_secs)
    }

    pub fn reveal_window(&self) -> Duration {
        Duration::from_secs(self.reveal_window_secs)
    }

    pub fn mission_interval(&self) -> Duration {
        Duration::from_secs(self.mission_interval_secs)
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

static SETTINGS: Lazy<Settings> = Lazy::new(Settings::from_env);

pub fn settings() -> &'static Settings {
    &SETTINGS
}
