// A local gateway: lines typed on stdin become message or command events,
// reactions and replies are printed to stdout, and custom symbols come from a
// JSON file.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use crate::bot::BotEvent;
use crate::commands::{COMMAND_NAME, VibeCommand};
use crate::error::{FetchError, SinkError};
use crate::platform::{
    Author, ChannelId, ChannelInfo, ChatMessage, GroupId, GroupSymbolSource, HistorySource,
    MessageId, ReactionSink, ReplySink, ResolvedReaction, UserId,
};
use crate::symbol::SymbolEntry;

pub const CONSOLE_GROUP: GroupId = GroupId(1);
pub const DEFAULT_CHANNEL: &str = "general";
const HISTORY_CAPACITY: usize = 200;

#[derive(Debug, Deserialize)]
struct SymbolFile {
    groups: Vec<SymbolGroup>,
}

#[derive(Debug, Deserialize)]
struct SymbolGroup {
    id: GroupId,
    #[serde(default)]
    name: String,
    #[serde(default)]
    symbols: Vec<SymbolEntry>,
}

// Groups and their symbols, re-read from disk on every refresh.
pub struct StaticSymbolSource {
    path: PathBuf,
}

impl StaticSymbolSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read(&self) -> Result<SymbolFile, FetchError> {
        let data = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&data)?)
    }
}

#[async_trait]
impl GroupSymbolSource for StaticSymbolSource {
    async fn list_groups(&self) -> Result<Vec<GroupId>, FetchError> {
        let file = self
            .read()
            .await
            .map_err(|e| FetchError::Groups(format!("{}: {e}", self.path.display())))?;
        Ok(file.groups.iter().map(|group| group.id).collect())
    }

    async fn list_symbols(&self, group: GroupId) -> Result<Vec<SymbolEntry>, FetchError> {
        let file = self.read().await?;
        let found = file
            .groups
            .into_iter()
            .find(|candidate| candidate.id == group)
            .ok_or_else(|| FetchError::Symbols {
                group,
                reason: "group no longer listed".to_string(),
            })?;
        log::debug!("Loaded {} symbols for group {}", found.symbols.len(), found.name);
        Ok(found.symbols)
    }
}

#[derive(Default)]
struct ConsoleState {
    channels: Vec<ChannelInfo>,
    history: HashMap<ChannelId, VecDeque<ChatMessage>>,
    users: HashMap<String, UserId>,
    next_message: u64,
}

// In-memory channels of the single console group.
#[derive(Default)]
pub struct ConsoleChannels {
    state: Mutex<ConsoleState>,
}

impl ConsoleChannels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel_id(&self, name: &str) -> ChannelId {
        let mut state = self.lock();
        channel_id_locked(&mut state, name)
    }

    pub fn channel_name(&self, id: ChannelId) -> Option<String> {
        self.lock()
            .channels
            .iter()
            .find(|channel| channel.id == id)
            .map(|channel| channel.name.clone())
    }

    // Stores a message typed on the console and returns it.
    pub fn record(&self, channel: &str, author: &str, content: &str) -> ChatMessage {
        let mut state = self.lock();
        let channel = channel_id_locked(&mut state, channel);
        let next_user = UserId(state.users.len() as u64 + 1);
        let user = *state.users.entry(author.to_string()).or_insert(next_user);
        state.next_message += 1;

        let message = ChatMessage {
            id: MessageId(state.next_message),
            channel,
            group: Some(CONSOLE_GROUP),
            author: Author {
                id: user,
                name: author.to_string(),
                bot: false,
            },
            content: content.to_string(),
            timestamp: Utc::now(),
        };
        let history = state.history.entry(channel).or_default();
        if history.len() == HISTORY_CAPACITY {
            history.pop_front();
        }
        history.push_back(message.clone());
        message
    }

    // "#channel author: text" or "#channel /vibecheck ...". The channel
    // defaults to #general and the author to "you".
    pub fn parse_line(&self, line: &str) -> Option<BotEvent> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let (channel, rest) = match line.strip_prefix('#') {
            Some(tagged) => match tagged.split_once(char::is_whitespace) {
                Some((channel, rest)) => (channel, rest.trim()),
                None => (tagged, ""),
            },
            None => (DEFAULT_CHANNEL, line),
        };
        if rest.is_empty() {
            return None;
        }

        if rest.starts_with(COMMAND_NAME) {
            let channel = self.channel_id(channel);
            return Some(match rest.parse::<VibeCommand>() {
                Ok(command) => BotEvent::Command {
                    channel,
                    group: Some(CONSOLE_GROUP),
                    command,
                },
                Err(error) => BotEvent::InvalidCommand { channel, error },
            });
        }

        let (author, content) = match rest.split_once(':') {
            Some((author, content)) if !author.trim().is_empty() && !author.contains(' ') => {
                (author.trim(), content.trim())
            }
            _ => ("you", rest),
        };
        Some(BotEvent::Message(self.record(channel, author, content)))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ConsoleState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn channel_id_locked(state: &mut ConsoleState, name: &str) -> ChannelId {
    if let Some(channel) = state.channels.iter().find(|channel| channel.name == name) {
        return channel.id;
    }
    let id = ChannelId(state.channels.len() as u64 + 1);
    state.channels.push(ChannelInfo {
        id,
        name: name.to_string(),
    });
    id
}

#[async_trait]
impl HistorySource for ConsoleChannels {
    async fn text_channels(&self, group: GroupId) -> Result<Vec<ChannelInfo>, FetchError> {
        if group != CONSOLE_GROUP {
            return Ok(Vec::new());
        }
        Ok(self.lock().channels.clone())
    }

    async fn channel(&self, channel: ChannelId) -> Result<Option<ChannelInfo>, FetchError> {
        Ok(self
            .lock()
            .channels
            .iter()
            .find(|candidate| candidate.id == channel)
            .cloned())
    }

    async fn recent_messages(
        &self,
        channel: ChannelId,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, FetchError> {
        let state = self.lock();
        let Some(history) = state.history.get(&channel) else {
            return Ok(Vec::new());
        };
        let skip = history.len().saturating_sub(limit);
        Ok(history.iter().skip(skip).cloned().collect())
    }
}

// Prints what the bot would send to the platform.
pub struct ConsoleSink {
    channels: Arc<ConsoleChannels>,
}

impl ConsoleSink {
    pub fn new(channels: Arc<ConsoleChannels>) -> Self {
        Self { channels }
    }

    fn label(&self, channel: ChannelId) -> String {
        self.channels
            .channel_name(channel)
            .unwrap_or_else(|| channel.to_string())
    }
}

#[async_trait]
impl ReactionSink for ConsoleSink {
    async fn add_reaction(
        &self,
        message: &ChatMessage,
        reaction: &ResolvedReaction,
    ) -> Result<(), SinkError> {
        let symbol = match reaction {
            ResolvedReaction::Unicode(emoji) => emoji.clone(),
            ResolvedReaction::Custom(entry) if entry.animated => format!("<a:{}:{}>", entry.name, entry.handle.0),
            ResolvedReaction::Custom(entry) => format!("<:{}:{}>", entry.name, entry.handle.0),
        };
        println!(
            "[#{}] reacted to {} ({}) with {symbol}",
            self.label(message.channel),
            message.author.name,
            message.id
        );
        Ok(())
    }
}

#[async_trait]
impl ReplySink for ConsoleSink {
    async fn send(&self, channel: ChannelId, text: &str) -> Result<(), SinkError> {
        println!("[#{}] VibeCheckBot:\n{text}", self.label(channel));
        Ok(())
    }
}
