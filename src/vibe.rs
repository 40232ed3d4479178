use std::sync::Arc;

use strum_macros::Display;

use crate::budget::trim;
use crate::openai::TextGenerator;

pub const CHANNEL_PREAMBLE: &str = r#"You are a vibe checker. Your only purpose is to check vibes, and you do that job well. Given a channel and some of its message history,
you will generate a concise analysis of the vibe of the channel. The output should begin with a header, "Vibe Check: #channelName", where channelName is
the name of the channel provided in the input text. The output should be formatted for Discord, and all headers should be bolded.
Take anything and everything into account, including but not limited to:
- The overall tone and sentiment of the channel
- The general atmosphere and mood
- Any notable patterns in communication
- The level of engagement and activity"#;

pub const SERVER_PREAMBLE: &str = r#"You are a vibe checker. Your only purpose is to check vibes, and you do that job well. Given a list of channels and their message history,
you will generate a concise analysis of the vibe of the server. The output does not need to discuss every channel, but should select a few highlights and give a general overview of the server vibe as well.
For every channel mentioned, it should begin with "Channel: #channelName", where channelName is the name of the channel.
The overall output should conclude with a "Server Vibe" section, using that as a header. The output should be formatted for Discord, and all headers should be bolded.
Take anything and everything into account, including but not limited to:
- The overall tone and sentiment of the channel
- The general atmosphere and mood
- Any notable patterns in communication
- The level of engagement and activity"#;

pub const USER_PREAMBLE: &str = r#"You are a vibe checker. Your only purpose is to check vibes, and you do that job well. Analyze the given text from a Discord user's messages and generate a check of their vibe.
Focus on:
- The user's communication style and tone
- Their personality traits and characteristics
- Their level of engagement and activity
- Their interaction patterns with others
- Whether they seem friendly and approachable
The response should provide an overall assessment rather than specific examples. The response should have a header indicating the user and channel being analyzed.
The response should be formatted for Discord, and all headers should be bolded."#;

pub const ABOUT_PREAMBLE: &str = r#"You are a discord bot that can be used to check the vibe of a server, channel, or user. Your name is VibeCheckBot.
Respond as though a user has just run an "about" command looking to understand your capabilities and function."#;

pub const IMAGE_PROMPT_PREAMBLE: &str = r#"You are an expert at creating image prompts for DALL-E. Based on the provided messages, write an artistic image prompt that best captures the vibe and atmosphere of the content.
Focus on:
- The overall mood and tone
- Visual elements that represent the vibe
- Artistic style and atmosphere
- Emotional qualities
Ensure the prompt is suitable for DALL-E image generation and avoids any content that might violate content filters.
Return only the image prompt without any explanations."#;

const ABOUT_MAX_TOKENS: u32 = 500;
const IMAGE_PROMPT_MAX_TOKENS: u32 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum VibeScope {
    Channel,
    Server,
    User,
}

impl VibeScope {
    fn preamble(self) -> &'static str {
        match self {
            VibeScope::Channel => CHANNEL_PREAMBLE,
            VibeScope::Server => SERVER_PREAMBLE,
            VibeScope::User => USER_PREAMBLE,
        }
    }

    pub fn fallback(self) -> String {
        format!("Unable to check {self} vibe at this time.")
    }

    // Prefix of the raw image prompt; `subject` is a channel or user name.
    fn image_prefix(self, subject: &str) -> String {
        match self {
            VibeScope::Channel => format!(
                "Create an artistic image that represents the vibe of a Discord channel called #{subject} based on the following recent messages. The image itself should not include any text."
            ),
            VibeScope::User => format!(
                "Create an artistic image that represents the vibe of a Discord user {subject} based on the following recent messages. The image itself should not include any text."
            ),
            VibeScope::Server => "Create an artistic image that represents the overall vibe of this Discord server based on the following recent messages. The image itself should not include any text.".to_string(),
        }
    }
}

pub const ABOUT_FALLBACK: &str = "Unable to get about info at this time.";

// Vibe checks on top of a text generator. Generation failures never escape:
// they turn into fallback text or `None`.
pub struct VibeChecker {
    generator: Arc<dyn TextGenerator>,
    max_tokens: u32,
    prompt_max_length: usize,
}

impl VibeChecker {
    pub fn new(generator: Arc<dyn TextGenerator>, max_tokens: u32, prompt_max_length: usize) -> Self {
        Self {
            generator,
            max_tokens,
            prompt_max_length,
        }
    }

    pub async fn check_channel_vibe(&self, text: &str) -> String {
        self.check_vibe(VibeScope::Channel, text).await
    }

    pub async fn check_server_vibe(&self, text: &str) -> String {
        self.check_vibe(VibeScope::Server, text).await
    }

    pub async fn check_user_vibe(&self, text: &str) -> String {
        self.check_vibe(VibeScope::User, text).await
    }

    pub async fn check_vibe(&self, scope: VibeScope, text: &str) -> String {
        log::debug!(
            "Starting {scope} vibe check for text of length: {}",
            text.chars().count()
        );
        match self
            .generator
            .complete(scope.preamble(), Some(text), self.max_tokens)
            .await
        {
            Ok(result) if !result.trim().is_empty() => {
                log::info!("{scope} vibe response: {result}");
                result
            }
            Ok(_) => {
                log::warn!("Empty {scope} vibe response");
                scope.fallback()
            }
            Err(e) => {
                log::error!("Error during {scope} vibe check: {e}");
                scope.fallback()
            }
        }
    }

    pub async fn about(&self) -> String {
        log::debug!("Getting about info");
        match self
            .generator
            .complete(ABOUT_PREAMBLE, None, ABOUT_MAX_TOKENS)
            .await
        {
            Ok(result) if !result.trim().is_empty() => result,
            Ok(_) => ABOUT_FALLBACK.to_string(),
            Err(e) => {
                log::error!("Error during about info request: {e}");
                ABOUT_FALLBACK.to_string()
            }
        }
    }

    // Builds a raw prompt from the most recent lines that fit the budget.
    pub fn raw_image_prompt(&self, scope: VibeScope, subject: &str, lines: &[String]) -> String {
        trim(&scope.image_prefix(subject), lines, self.prompt_max_length)
    }

    pub async fn generate_vibe_image(
        &self,
        scope: VibeScope,
        subject: &str,
        lines: &[String],
    ) -> Option<String> {
        let raw_prompt = self.raw_image_prompt(scope, subject, lines);
        let prompt = self.generate_image_prompt(&raw_prompt).await;
        log::info!(
            "Original prompt length: {}, Generated prompt length: {}",
            raw_prompt.chars().count(),
            prompt.chars().count()
        );
        match self.generator.create_image(&prompt).await {
            Ok(url) => url,
            Err(e) => {
                log::error!("Error generating {scope} vibe image: {e}");
                None
            }
        }
    }

    // Falls back to the raw prompt when the rewrite fails.
    async fn generate_image_prompt(&self, raw_prompt: &str) -> String {
        match self
            .generator
            .complete(IMAGE_PROMPT_PREAMBLE, Some(raw_prompt), IMAGE_PROMPT_MAX_TOKENS)
            .await
        {
            Ok(result) if !result.trim().is_empty() => result.trim().to_string(),
            Ok(_) => raw_prompt.to_string(),
            Err(e) => {
                log::error!("Error during image prompt generation: {e}");
                raw_prompt.to_string()
            }
        }
    }
}
