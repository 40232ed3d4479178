// Import necessary libraries and modules for file I/O and serialization.
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::throttle::ThrottleConfig;

pub const SETTINGS_PATH: &str = "./data/settings.json";

// Application settings, read from JSON and overridden by the environment.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub openai_api_key: Option<String>, // Optional API key for OpenAI services.
    pub model: String,
    pub max_tokens: u32, // Completion budget for vibe checks.
    pub channel_message_limit: usize,
    pub server_message_limit: usize, // Messages read from each channel of a server.
    pub user_message_limit: usize,
    pub message_check_chance: f64, // Ceiling of the reaction probability.
    pub min_reaction_interval: u64, // Seconds of hard cooldown after a reaction.
    pub max_reaction_interval: u64, // Seconds until the full chance is back.
    pub refresh_interval: u64,      // Seconds between symbol cache refreshes.
    pub prompt_max_length: usize,
    pub reply_max_length: usize, // Transport limit for a single message.
    pub symbols_path: PathBuf,
    pub debug_mode: bool, // Flag to enable or disable debug logging.
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            openai_api_key: None, // No API key by default.
            model: "gpt-4.1-nano".to_string(),
            max_tokens: 1000,
            channel_message_limit: 20,
            server_message_limit: 10,
            user_message_limit: 50,
            message_check_chance: 0.05,
            min_reaction_interval: 30,
            max_reaction_interval: 300,
            refresh_interval: 4 * 60 * 60,
            prompt_max_length: 3900,
            reply_max_length: 2000,
            symbols_path: PathBuf::from("./data/symbols.json"),
            debug_mode: false,
        }
    }
}

impl Settings {
    // Settings file if present, then environment overrides, then validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = if Path::new(SETTINGS_PATH).exists() {
            Self::load_settings_from_file(SETTINGS_PATH)?
        } else {
            Self::default()
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load_settings_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&data)?;
        Ok(settings)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?; // Create the directory if it doesn't exist.
        }
        let mut file = fs::File::create(path)?;
        file.write_all(data.as_bytes())?;
        Ok(())
    }

    // `lookup` resolves an environment variable by name.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Some(model) = lookup("OPENAI_MODEL_NAME") {
            self.model = model;
        }
        override_parsed(&lookup, "MAX_TOKENS", &mut self.max_tokens)?;
        override_parsed(&lookup, "CHANNEL_MESSAGE_LIMIT", &mut self.channel_message_limit)?;
        override_parsed(&lookup, "SERVER_MESSAGE_LIMIT", &mut self.server_message_limit)?;
        override_parsed(&lookup, "USER_MESSAGE_LIMIT", &mut self.user_message_limit)?;
        override_parsed(&lookup, "MESSAGE_CHECK_CHANCE", &mut self.message_check_chance)?;
        override_parsed(&lookup, "MIN_REACTION_INTERVAL", &mut self.min_reaction_interval)?;
        override_parsed(&lookup, "MAX_REACTION_INTERVAL", &mut self.max_reaction_interval)?;
        override_parsed(&lookup, "REFRESH_INTERVAL", &mut self.refresh_interval)?;
        override_parsed(&lookup, "PROMPT_MAX_LENGTH", &mut self.prompt_max_length)?;
        override_parsed(&lookup, "REPLY_MAX_LENGTH", &mut self.reply_max_length)?;
        if let Some(path) = lookup("SYMBOLS_PATH") {
            self.symbols_path = PathBuf::from(path);
        }
        override_parsed(&lookup, "DEBUG_MODE", &mut self.debug_mode)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let chance = self.message_check_chance;
        if !chance.is_finite() || !(0.0..=1.0).contains(&chance) {
            return Err(ConfigError::ChanceOutOfRange(chance));
        }
        if self.min_reaction_interval >= self.max_reaction_interval {
            return Err(ConfigError::IntervalOrder {
                min: self.min_reaction_interval,
                max: self.max_reaction_interval,
            });
        }
        if self.refresh_interval == 0 {
            return Err(ConfigError::Zero("refresh_interval"));
        }
        if self.prompt_max_length == 0 {
            return Err(ConfigError::Zero("prompt_max_length"));
        }
        if self.reply_max_length == 0 {
            return Err(ConfigError::Zero("reply_max_length"));
        }
        Ok(())
    }

    pub fn throttle_config(&self) -> Result<ThrottleConfig, ConfigError> {
        ThrottleConfig::new(
            self.message_check_chance,
            self.min_reaction_interval,
            self.max_reaction_interval,
        )
    }

    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs(self.refresh_interval)
    }
}

fn override_parsed<F, T>(lookup: &F, key: &'static str, target: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(value) = lookup(key) {
        let parsed: Result<T, _> = value.trim().parse();
        match parsed {
            Ok(parsed) => *target = parsed,
            Err(_) => return Err(ConfigError::InvalidValue { key, value }),
        }
    }
    Ok(())
}
