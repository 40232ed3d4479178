// Hand-written collaborators shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use vibecheck::error::{ClassifierError, FetchError, SinkError, VibeError};
use vibecheck::openai::TextGenerator;
use vibecheck::platform::{
    Author, ChannelId, ChannelInfo, ChatMessage, GroupId, GroupSymbolSource, HistorySource,
    MessageId, ReactionSink, ReplySink, ResolvedReaction, UserId,
};
use vibecheck::symbol::{Reaction, SymbolEntry, SymbolHandle};
use vibecheck::throttle::{Clock, RandomSource};
use vibecheck::Classifier;

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

pub fn entry(name: &str, handle: u64) -> SymbolEntry {
    SymbolEntry {
        name: name.to_string(),
        handle: SymbolHandle(handle),
        animated: false,
        group: None,
    }
}

pub fn message(id: u64, channel: u64, author: &str, content: &str, secs: i64) -> ChatMessage {
    ChatMessage {
        id: MessageId(id),
        channel: ChannelId(channel),
        group: Some(GroupId(1)),
        author: Author {
            id: UserId(author.len() as u64),
            name: author.to_string(),
            bot: false,
        },
        content: content.to_string(),
        timestamp: at(secs),
    }
}

// Clock that only moves when told to.
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.0.lock().unwrap() = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

// Always returns the same draw.
pub struct FixedRandom(pub f64);

impl RandomSource for FixedRandom {
    fn next_f64(&self) -> f64 {
        self.0
    }
}

// Symbol source whose groups can be swapped and made to fail between refreshes.
#[derive(Default)]
pub struct FakeSource {
    pub groups: Mutex<Vec<(GroupId, Vec<SymbolEntry>)>>,
    pub failing: Mutex<Vec<GroupId>>,
    pub fail_listing: Mutex<bool>,
    pub delay: Mutex<Option<Duration>>,
    pub list_calls: AtomicUsize,
}

impl FakeSource {
    pub fn with_groups(groups: Vec<(u64, Vec<SymbolEntry>)>) -> Self {
        let source = Self::default();
        source.set_groups(groups);
        source
    }

    pub fn set_groups(&self, groups: Vec<(u64, Vec<SymbolEntry>)>) {
        *self.groups.lock().unwrap() = groups
            .into_iter()
            .map(|(id, symbols)| (GroupId(id), symbols))
            .collect();
    }

    pub fn fail_group(&self, group: u64) {
        self.failing.lock().unwrap().push(GroupId(group));
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl GroupSymbolSource for FakeSource {
    async fn list_groups(&self) -> Result<Vec<GroupId>, FetchError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_listing.lock().unwrap() {
            return Err(FetchError::Groups("unauthorized".to_string()));
        }
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.groups.lock().unwrap().iter().map(|(id, _)| *id).collect())
    }

    async fn list_symbols(&self, group: GroupId) -> Result<Vec<SymbolEntry>, FetchError> {
        if self.failing.lock().unwrap().contains(&group) {
            return Err(FetchError::Symbols {
                group,
                reason: "network unreachable".to_string(),
            });
        }
        Ok(self
            .groups
            .lock()
            .unwrap()
            .iter()
            .find(|(id, _)| *id == group)
            .map(|(_, symbols)| symbols.clone())
            .unwrap_or_default())
    }
}

pub enum ClassifierReply {
    Reaction(Reaction),
    Nothing,
    Failure,
}

pub struct FakeClassifier {
    pub reply: ClassifierReply,
    pub calls: AtomicUsize,
    pub seen_symbols: Mutex<Vec<String>>,
}

impl FakeClassifier {
    pub fn new(reply: ClassifierReply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            seen_symbols: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for FakeClassifier {
    async fn classify(
        &self,
        _text: &str,
        known_symbols: &[String],
    ) -> Result<Option<Reaction>, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.seen_symbols.lock().unwrap() = known_symbols.to_vec();
        match &self.reply {
            ClassifierReply::Reaction(reaction) => Ok(Some(reaction.clone())),
            ClassifierReply::Nothing => Ok(None),
            ClassifierReply::Failure => Err(ClassifierError::InvalidResponse("garbage".to_string())),
        }
    }
}

// Records reactions and replies; can be told to reject reactions.
#[derive(Default)]
pub struct RecordingSink {
    pub reactions: Mutex<Vec<(MessageId, ResolvedReaction)>>,
    pub replies: Mutex<Vec<(ChannelId, String)>>,
    pub reject: Mutex<bool>,
}

impl RecordingSink {
    pub fn replies(&self) -> Vec<String> {
        self.replies
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl ReactionSink for RecordingSink {
    async fn add_reaction(
        &self,
        message: &ChatMessage,
        reaction: &ResolvedReaction,
    ) -> Result<(), SinkError> {
        if *self.reject.lock().unwrap() {
            return Err(SinkError::Reaction("missing permissions".to_string()));
        }
        self.reactions
            .lock()
            .unwrap()
            .push((message.id, reaction.clone()));
        Ok(())
    }
}

#[async_trait]
impl ReplySink for RecordingSink {
    async fn send(&self, channel: ChannelId, text: &str) -> Result<(), SinkError> {
        self.replies
            .lock()
            .unwrap()
            .push((channel, text.to_string()));
        Ok(())
    }
}

// Scripted generator: pops answers in order and records every request.
#[derive(Default)]
pub struct FakeGenerator {
    pub answers: Mutex<VecDeque<Result<String, VibeError>>>,
    pub image: Mutex<Option<String>>,
    pub requests: Mutex<Vec<(String, Option<String>)>>,
    pub image_prompts: Mutex<Vec<String>>,
}

impl FakeGenerator {
    pub fn answering(answers: Vec<Result<String, VibeError>>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<(String, Option<String>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn complete(
        &self,
        system: &str,
        user: Option<&str>,
        _max_tokens: u32,
    ) -> Result<String, VibeError> {
        self.requests
            .lock()
            .unwrap()
            .push((system.to_string(), user.map(str::to_string)));
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(VibeError::NoMessageFound))
    }

    async fn create_image(&self, prompt: &str) -> Result<Option<String>, VibeError> {
        self.image_prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.image.lock().unwrap().clone())
    }
}

// History keyed by channel, with one optional failing channel.
#[derive(Default)]
pub struct FakeHistory {
    pub channels: Vec<ChannelInfo>,
    pub messages: HashMap<ChannelId, Vec<ChatMessage>>,
    pub failing: Option<ChannelId>,
}

impl FakeHistory {
    pub fn add_channel(&mut self, id: u64, name: &str, messages: Vec<ChatMessage>) {
        self.channels.push(ChannelInfo {
            id: ChannelId(id),
            name: name.to_string(),
        });
        self.messages.insert(ChannelId(id), messages);
    }
}

#[async_trait]
impl HistorySource for FakeHistory {
    async fn text_channels(&self, _group: GroupId) -> Result<Vec<ChannelInfo>, FetchError> {
        Ok(self.channels.clone())
    }

    async fn channel(&self, channel: ChannelId) -> Result<Option<ChannelInfo>, FetchError> {
        Ok(self.channels.iter().find(|c| c.id == channel).cloned())
    }

    async fn recent_messages(
        &self,
        channel: ChannelId,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, FetchError> {
        if self.failing == Some(channel) {
            return Err(FetchError::History("forbidden".to_string()));
        }
        let messages = self.messages.get(&channel).cloned().unwrap_or_default();
        let skip = messages.len().saturating_sub(limit);
        Ok(messages.into_iter().skip(skip).collect())
    }
}
