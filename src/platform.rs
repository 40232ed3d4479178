// Collaborator contracts for the chat platform. A gateway (the console one in
// `console.rs`, or a real websocket client) implements these.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FetchError, SinkError};
use crate::symbol::{Reaction, SymbolEntry};

macro_rules! snowflake {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

snowflake!(GroupId);
snowflake!(ChannelId);
snowflake!(MessageId);
snowflake!(UserId);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: UserId,
    pub name: String,
    pub bot: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub channel: ChannelId,
    pub group: Option<GroupId>,
    pub author: Author,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub name: String,
}

// What a reaction resolves to once custom names have been looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedReaction {
    Unicode(String),
    Custom(SymbolEntry),
}

impl ResolvedReaction {
    pub fn reaction(&self) -> Reaction {
        match self {
            ResolvedReaction::Unicode(emoji) => Reaction::unicode(emoji.clone()),
            ResolvedReaction::Custom(entry) => Reaction::custom(entry.name.clone()),
        }
    }
}

#[async_trait]
pub trait GroupSymbolSource: Send + Sync {
    async fn list_groups(&self) -> Result<Vec<GroupId>, FetchError>;

    async fn list_symbols(&self, group: GroupId) -> Result<Vec<SymbolEntry>, FetchError>;
}

#[async_trait]
pub trait ReactionSink: Send + Sync {
    async fn add_reaction(
        &self,
        message: &ChatMessage,
        reaction: &ResolvedReaction,
    ) -> Result<(), SinkError>;
}

// Channel history, ordered oldest first.
#[async_trait]
pub trait HistorySource: Send + Sync {
    async fn text_channels(&self, group: GroupId) -> Result<Vec<ChannelInfo>, FetchError>;

    async fn channel(&self, channel: ChannelId) -> Result<Option<ChannelInfo>, FetchError>;

    async fn recent_messages(
        &self,
        channel: ChannelId,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, FetchError>;
}

#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send(&self, channel: ChannelId, text: &str) -> Result<(), SinkError>;
}
