use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{ClassifierError, VibeError};
use crate::openai::TextGenerator;
use crate::symbol::{Reaction, SymbolKind};

const CLASSIFIER_MAX_TOKENS: u32 = 20;

// Decides whether a message deserves a reaction, and which one.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        text: &str,
        known_symbols: &[String],
    ) -> Result<Option<Reaction>, ClassifierError>;
}

pub fn classifier_preamble(known_symbols: &[String]) -> String {
    format!(
        r#"You are a vibe checker. Analyze the vibe of the following message on a scale of 1 to 10, where 1 is the worst and 10 is the best.
Vibe should take into account the message's content, length, any salient points it is making, humor, etc.
If the vibe is a 9 or 10, respond with an emoji of your choosing. You can use either a Unicode emoji or a custom server emoji.
For Unicode emojis, respond with "unicode:emoji" (e.g., "unicode:🌟")
For custom server emojis, respond with "custom:emoji_name" (e.g., "custom:pepega")
Available custom emojis: {}
Respond only with the emoji format, should you select one.
If using a custom emoji, make sure to use one from the available list."#,
        known_symbols.join(", ")
    )
}

// Parses "<kind>:<name>". An empty answer means the vibe was not good enough.
pub fn parse_reaction(
    response: &str,
    known_symbols: &[String],
) -> Result<Option<Reaction>, ClassifierError> {
    let response = response.trim();
    if response.is_empty() {
        return Ok(None);
    }

    let (kind, name) = response
        .split_once(':')
        .ok_or_else(|| ClassifierError::InvalidResponse(response.to_string()))?;
    let kind = SymbolKind::from_str(kind.trim())
        .map_err(|_| ClassifierError::InvalidResponse(response.to_string()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(ClassifierError::InvalidResponse(response.to_string()));
    }

    if kind == SymbolKind::Custom && !known_symbols.iter().any(|known| known == name) {
        return Err(ClassifierError::UnknownSymbol(name.to_string()));
    }
    Ok(Some(Reaction {
        kind,
        name: name.to_string(),
    }))
}

pub struct VibeClassifier {
    generator: Arc<dyn TextGenerator>,
}

impl VibeClassifier {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl Classifier for VibeClassifier {
    async fn classify(
        &self,
        text: &str,
        known_symbols: &[String],
    ) -> Result<Option<Reaction>, ClassifierError> {
        log::debug!("Starting message vibe check for text of length: {}", text.chars().count());
        let response = match self
            .generator
            .complete(
                &classifier_preamble(known_symbols),
                Some(text),
                CLASSIFIER_MAX_TOKENS,
            )
            .await
        {
            Ok(response) => response,
            Err(VibeError::NoMessageFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        log::info!("Message vibe response: {}", response.trim());
        parse_reaction(&response, known_symbols)
    }
}
