pub mod bot;
pub mod budget;
pub mod cache;
pub mod classifier;
pub mod commands;
pub mod console;
pub mod error;
pub mod format;
pub mod logging;
pub mod openai;
pub mod platform;
pub mod sampler;
pub mod settings;
pub mod symbol;
pub mod throttle;
pub mod vibe;

// Re-export commonly used items for easier access
pub use bot::{Bot, BotEvent};
pub use budget::{chunk, trim, trim_with};
pub use cache::{RefreshOutcome, SymbolCache};
pub use classifier::{Classifier, VibeClassifier};
pub use commands::{CommandHandler, CommandLimits, VibeCommand};
pub use error::{AppError, ClassifierError, ConfigError, FetchError, SinkError, VibeError};
pub use platform::{ChannelId, ChatMessage, GroupId, GroupSymbolSource};
pub use sampler::Sampler;
pub use settings::Settings;
pub use symbol::{Reaction, SymbolEntry, SymbolHandle, SymbolKind, SymbolTable};
pub use throttle::{Clock, RandomSource, ReactionThrottle, ThrottleConfig};
pub use vibe::VibeChecker;
