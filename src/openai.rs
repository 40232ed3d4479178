use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
        CreateImageRequestArgs, Image, ImageModel, ImageResponseFormat, ImageSize,
    },
};
use async_trait::async_trait;
use tokio::time::{Duration, timeout};

use crate::error::VibeError;
use crate::settings::Settings;

const TEMPERATURE: f32 = 0.7;
const IMAGE_TIMEOUT: Duration = Duration::from_secs(120);

// The hosted text/image generation service.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(
        &self,
        system: &str,
        user: Option<&str>,
        max_tokens: u32,
    ) -> Result<String, VibeError>;

    // URL of the generated image, if the service returned one.
    async fn create_image(&self, prompt: &str) -> Result<Option<String>, VibeError>;
}

pub struct OpenAIGenerator {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIGenerator {
    pub fn new(api_key: &str, model: impl Into<String>) -> Self {
        let openai_config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(openai_config),
            model: model.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, VibeError> {
        let api_key = settings
            .openai_api_key
            .as_deref()
            .ok_or(VibeError::MissingApiKey)?;
        Ok(Self::new(api_key, &settings.model))
    }
}

#[async_trait]
impl TextGenerator for OpenAIGenerator {
    async fn complete(
        &self,
        system: &str,
        user: Option<&str>,
        max_tokens: u32,
    ) -> Result<String, VibeError> {
        let mut messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()?
                .into(),
        ];
        if let Some(user) = user {
            messages.push(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user)
                    .build()?
                    .into(),
            );
        }

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(TEMPERATURE)
            .max_completion_tokens(max_tokens)
            .build()?;

        log::debug!(
            "Sending completion request to OpenAI using model: {}",
            self.model
        );
        let response = self.client.chat().create(request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(VibeError::NoMessageFound)
    }

    async fn create_image(&self, prompt: &str) -> Result<Option<String>, VibeError> {
        let request = CreateImageRequestArgs::default()
            .prompt(prompt)
            .model(ImageModel::DallE3)
            .n(1)
            .response_format(ImageResponseFormat::Url)
            .size(ImageSize::S1024x1024)
            .build()?;

        let response = match timeout(IMAGE_TIMEOUT, self.client.images().create(request)).await {
            Ok(res) => res?,
            Err(_) => return Err(VibeError::Timeout),
        };

        Ok(response.data.iter().find_map(|image| match image.as_ref() {
            Image::Url { url, .. } => Some(url.clone()),
            Image::B64Json { .. } => None,
        }))
    }
}
