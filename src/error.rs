use thiserror::Error;

use crate::platform::GroupId;

// Enum for handling the application-level errors surfaced by the binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError), // Invalid settings, fatal at startup.

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError), // Errors from the symbol or history source.

    #[error("Generation error: {0}")]
    Vibe(#[from] VibeError), // Errors from the text generation service.

    #[error("Delivery error: {0}")]
    Sink(#[from] SinkError), // Errors when sending reactions or replies.

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error), // Errors related to data serialization.

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error), // Input/output errors.

    #[error("Symbol cache already stopped")]
    CacheStopped, // The cache cannot be restarted once stopped.
}

// Errors raised while enumerating groups, symbols or channel history.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to list groups: {0}")]
    Groups(String),

    #[error("Failed to list symbols for group {group}: {reason}")]
    Symbols { group: GroupId, reason: String },

    #[error("Failed to read history: {0}")]
    History(String),

    #[error("Symbol source unreadable: {0}")]
    Io(#[from] std::io::Error),

    #[error("Symbol source malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

// Errors from the message classifier. The sampler turns every one of them
// into "no reaction".
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Generation failed: {0}")]
    Generation(#[from] VibeError),

    #[error("Invalid reaction format: {0}")]
    InvalidResponse(String),

    #[error("Unknown custom symbol: {0}")]
    UnknownSymbol(String),
}

// Configuration problems, validated before the cache or throttle is built.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("message_check_chance must be within [0, 1], got {0}")]
    ChanceOutOfRange(f64),

    #[error("min_reaction_interval ({min}s) must be below max_reaction_interval ({max}s)")]
    IntervalOrder { min: u64, max: u64 },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}

// Errors related to text and image generation.
#[derive(Debug, Error)]
pub enum VibeError {
    #[error("OpenAI API error: {0}")]
    OpenAI(#[from] async_openai::error::OpenAIError), // Errors from the OpenAI API.

    #[error("OpenAI API key missing")]
    MissingApiKey,

    #[error("No message found")]
    NoMessageFound, // The completion came back without content.

    #[error("Timeout occurred")]
    Timeout, // Error when a generation exceeds its time limit.
}

// Errors when parsing a `/vibecheck` command line.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command!")]
    UnknownCommand,

    #[error("Unknown subcommand!")]
    UnknownSubcommand(String),

    #[error("Please specify a {0}!")]
    MissingArgument(&'static str),
}

// Errors when delivering a reaction or a reply to the platform.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to add reaction: {0}")]
    Reaction(String),

    #[error("Failed to send reply: {0}")]
    Reply(String),

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}
