// `/vibecheck` commands: gather recent history, fit it into the prompt
// budget, ask for a vibe check and send the answer back in transport-sized
// chunks.

use std::str::FromStr;
use std::sync::Arc;

use crate::budget::{chunk, trim_with};
use crate::error::{CommandError, SinkError};
use crate::format::{channel_header, channel_section, format_messages};
use crate::platform::{ChannelId, ChannelInfo, ChatMessage, GroupId, HistorySource, ReplySink};
use crate::settings::Settings;
use crate::vibe::{VibeChecker, VibeScope};

pub const COMMAND_NAME: &str = "/vibecheck";

const LINE_SEPARATOR: &str = "\n";
const SECTION_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VibeCommand {
    Channel { channel: Option<String> },
    Server,
    User { user: String, channel: Option<String> },
    About,
    Image(ImageTarget),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageTarget {
    Channel { channel: Option<String> },
    Server,
    User { user: String, channel: Option<String> },
}

impl FromStr for VibeCommand {
    type Err = CommandError;

    // "/vibecheck <channel|server|user|about|image> [args]"
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        if words.next() != Some(COMMAND_NAME) {
            return Err(CommandError::UnknownCommand);
        }
        let args: Vec<&str> = words.collect();
        match args.as_slice() {
            ["image", rest @ ..] => parse_image(rest).map(VibeCommand::Image),
            ["channel"] => Ok(VibeCommand::Channel { channel: None }),
            ["channel", channel] => Ok(VibeCommand::Channel {
                channel: Some(channel_name(channel)),
            }),
            ["server"] => Ok(VibeCommand::Server),
            ["about"] => Ok(VibeCommand::About),
            ["user"] => Err(CommandError::MissingArgument("user")),
            ["user", user] => Ok(VibeCommand::User {
                user: user.to_string(),
                channel: None,
            }),
            ["user", user, channel] => Ok(VibeCommand::User {
                user: user.to_string(),
                channel: Some(channel_name(channel)),
            }),
            [] => Err(CommandError::UnknownSubcommand(String::new())),
            [other, ..] => Err(CommandError::UnknownSubcommand(other.to_string())),
        }
    }
}

fn parse_image(args: &[&str]) -> Result<ImageTarget, CommandError> {
    match args {
        ["channel"] => Ok(ImageTarget::Channel { channel: None }),
        ["channel", channel] => Ok(ImageTarget::Channel {
            channel: Some(channel_name(channel)),
        }),
        ["server"] => Ok(ImageTarget::Server),
        ["user"] => Err(CommandError::MissingArgument("user")),
        ["user", user] => Ok(ImageTarget::User {
            user: user.to_string(),
            channel: None,
        }),
        ["user", user, channel] => Ok(ImageTarget::User {
            user: user.to_string(),
            channel: Some(channel_name(channel)),
        }),
        [] => Err(CommandError::MissingArgument("target")),
        [other, ..] => Err(CommandError::UnknownSubcommand(other.to_string())),
    }
}

fn channel_name(raw: &str) -> String {
    raw.trim_start_matches('#').to_string()
}

#[derive(Debug, Clone, Copy)]
pub struct CommandLimits {
    pub channel_messages: usize,
    pub server_messages: usize,
    pub user_messages: usize,
    pub prompt_max_length: usize,
    pub reply_max_length: usize,
}

impl From<&Settings> for CommandLimits {
    fn from(settings: &Settings) -> Self {
        Self {
            channel_messages: settings.channel_message_limit,
            server_messages: settings.server_message_limit,
            user_messages: settings.user_message_limit,
            prompt_max_length: settings.prompt_max_length,
            reply_max_length: settings.reply_max_length,
        }
    }
}

pub struct CommandHandler {
    history: Arc<dyn HistorySource>,
    vibes: VibeChecker,
    replies: Arc<dyn ReplySink>,
    limits: CommandLimits,
}

impl CommandHandler {
    pub fn new(
        history: Arc<dyn HistorySource>,
        vibes: VibeChecker,
        replies: Arc<dyn ReplySink>,
        limits: CommandLimits,
    ) -> Self {
        Self {
            history,
            vibes,
            replies,
            limits,
        }
    }

    // Answers `command` in the channel it was issued from.
    pub async fn handle(
        &self,
        origin: ChannelId,
        group: Option<GroupId>,
        command: &VibeCommand,
    ) -> Result<(), SinkError> {
        let reply = self.respond(origin, group, command).await;
        self.reply(origin, &reply).await
    }

    pub async fn reply(&self, channel: ChannelId, text: &str) -> Result<(), SinkError> {
        for part in chunk(text, self.limits.reply_max_length) {
            self.replies.send(channel, &part).await?;
        }
        Ok(())
    }

    pub async fn respond(
        &self,
        origin: ChannelId,
        group: Option<GroupId>,
        command: &VibeCommand,
    ) -> String {
        match command {
            VibeCommand::Channel { channel } => {
                self.channel_vibe(origin, group, channel.as_deref()).await
            }
            VibeCommand::Server => match group {
                Some(group) => self.server_vibe(group).await,
                None => "This command can only be used in a server!".to_string(),
            },
            VibeCommand::User { user, channel } => match group {
                Some(group) => self.user_vibe(origin, group, user, channel.as_deref()).await,
                None => "This command can only be used in a server!".to_string(),
            },
            VibeCommand::About => self.vibes.about().await,
            VibeCommand::Image(target) => self.vibe_image(origin, group, target).await,
        }
    }

    async fn channel_vibe(
        &self,
        origin: ChannelId,
        group: Option<GroupId>,
        target: Option<&str>,
    ) -> String {
        let Some(channel) = self.resolve_channel(origin, group, target).await else {
            return "This command can only be used in text channels!".to_string();
        };
        log::debug!("Channel vibe check requested in channel: {}", channel.name);

        let lines = format_messages(&self.messages(&channel, self.limits.channel_messages).await);
        if lines.is_empty() {
            log::info!("No messages found to analyze in channel: {}", channel.name);
            return "No messages found to analyze in this channel!".to_string();
        }

        let text = trim_with(
            &channel_header(&channel.name),
            &lines,
            self.limits.prompt_max_length,
            LINE_SEPARATOR,
        );
        self.vibes.check_channel_vibe(&text).await
    }

    async fn server_vibe(&self, group: GroupId) -> String {
        log::debug!("Server vibe check requested in group: {group}");
        let sections = self
            .sections(self.text_channels(group).await, self.limits.server_messages, None)
            .await;
        if sections.is_empty() {
            log::info!("No messages found to analyze in group: {group}");
            return "No messages found to analyze in the server!".to_string();
        }

        let text = trim_with("", &sections, self.limits.prompt_max_length, SECTION_SEPARATOR);
        self.vibes.check_server_vibe(&text).await
    }

    async fn user_vibe(
        &self,
        origin: ChannelId,
        group: GroupId,
        user: &str,
        target: Option<&str>,
    ) -> String {
        let channels = match target {
            Some(_) => match self.resolve_channel(origin, Some(group), target).await {
                Some(channel) => vec![channel],
                None => return "This command can only be used in text channels!".to_string(),
            },
            None => self.text_channels(group).await,
        };
        log::debug!("User vibe check requested for user: {user}");

        let sections = self
            .sections(channels, self.limits.user_messages, Some(user))
            .await;
        if sections.is_empty() {
            let place = target.map(|name| format!(" in #{name}")).unwrap_or_default();
            log::info!("No messages found to analyze for user: {user}{place}");
            return format!("No messages found to analyze for {user}{place}!");
        }

        let text = trim_with("", &sections, self.limits.prompt_max_length, SECTION_SEPARATOR);
        self.vibes.check_user_vibe(&text).await
    }

    async fn vibe_image(
        &self,
        origin: ChannelId,
        group: Option<GroupId>,
        target: &ImageTarget,
    ) -> String {
        let (scope, subject, messages) = match target {
            ImageTarget::Channel { channel } => {
                let Some(channel) = self.resolve_channel(origin, group, channel.as_deref()).await
                else {
                    return "This command can only be used in text channels!".to_string();
                };
                let messages = self.messages(&channel, self.limits.channel_messages).await;
                (VibeScope::Channel, channel.name, messages)
            }
            ImageTarget::Server => {
                let Some(group) = group else {
                    return "This command can only be used in a server!".to_string();
                };
                let channels = self.text_channels(group).await;
                let messages = self
                    .merged_messages(channels, self.limits.server_messages, None)
                    .await;
                (VibeScope::Server, String::new(), messages)
            }
            ImageTarget::User { user, channel } => {
                let Some(group) = group else {
                    return "This command can only be used in a server!".to_string();
                };
                let channels = match channel {
                    Some(_) => match self.resolve_channel(origin, Some(group), channel.as_deref()).await {
                        Some(channel) => vec![channel],
                        None => {
                            return "This command can only be used in text channels!".to_string();
                        }
                    },
                    None => self.text_channels(group).await,
                };
                let messages = self
                    .merged_messages(channels, self.limits.user_messages, Some(user.as_str()))
                    .await;
                (VibeScope::User, user.clone(), messages)
            }
        };

        let lines = format_messages(&messages);
        if lines.is_empty() {
            return format!("No messages found to generate a {scope} vibe image!");
        }
        match self.vibes.generate_vibe_image(scope, &subject, &lines).await {
            Some(url) => url,
            None => "Unable to generate a vibe image at this time.".to_string(),
        }
    }

    async fn resolve_channel(
        &self,
        origin: ChannelId,
        group: Option<GroupId>,
        name: Option<&str>,
    ) -> Option<ChannelInfo> {
        match (name, group) {
            (None, _) => match self.history.channel(origin).await {
                Ok(channel) => channel,
                Err(e) => {
                    log::error!("Error resolving channel {origin}: {e}");
                    None
                }
            },
            (Some(name), Some(group)) => self
                .text_channels(group)
                .await
                .into_iter()
                .find(|channel| channel.name == name),
            (Some(_), None) => None,
        }
    }

    async fn text_channels(&self, group: GroupId) -> Vec<ChannelInfo> {
        match self.history.text_channels(group).await {
            Ok(channels) => channels,
            Err(e) => {
                log::error!("Error listing channels of group {group}: {e}");
                Vec::new()
            }
        }
    }

    // Oldest first; bot messages are left out. A failing channel reads as empty.
    async fn messages(&self, channel: &ChannelInfo, limit: usize) -> Vec<ChatMessage> {
        match self.history.recent_messages(channel.id, limit).await {
            Ok(messages) => messages
                .into_iter()
                .filter(|message| !message.author.bot)
                .collect(),
            Err(e) => {
                log::error!("Error getting messages from channel: {}: {e}", channel.name);
                Vec::new()
            }
        }
    }

    async fn sections(
        &self,
        channels: Vec<ChannelInfo>,
        limit: usize,
        user: Option<&str>,
    ) -> Vec<String> {
        let mut sections = Vec::new();
        for channel in channels {
            log::debug!("Getting messages from {}", channel.name);
            let messages = filter_author(self.messages(&channel, limit).await, user);
            if let Some(section) = channel_section(&channel.name, &format_messages(&messages)) {
                sections.push(section);
            }
        }
        sections
    }

    async fn merged_messages(
        &self,
        channels: Vec<ChannelInfo>,
        limit: usize,
        user: Option<&str>,
    ) -> Vec<ChatMessage> {
        let mut merged = Vec::new();
        for channel in channels {
            merged.extend(filter_author(self.messages(&channel, limit).await, user));
        }
        merged.sort_by_key(|message| message.timestamp);
        merged
    }
}

fn filter_author(messages: Vec<ChatMessage>, user: Option<&str>) -> Vec<ChatMessage> {
    match user {
        Some(user) => messages
            .into_iter()
            .filter(|message| message.author.name.eq_ignore_ascii_case(user))
            .collect(),
        None => messages,
    }
}
