use std::sync::Arc;

use crate::cache::SymbolCache;
use crate::classifier::Classifier;
use crate::platform::{ChatMessage, ReactionSink, ResolvedReaction};
use crate::symbol::{Reaction, SymbolKind};
use crate::throttle::{Clock, ReactionThrottle};

// Decides, for each live message, whether to react and with what.
pub struct Sampler {
    throttle: ReactionThrottle,
    cache: Arc<SymbolCache>,
    classifier: Arc<dyn Classifier>,
    sink: Arc<dyn ReactionSink>,
    clock: Arc<dyn Clock>,
}

impl Sampler {
    pub fn new(
        throttle: ReactionThrottle,
        cache: Arc<SymbolCache>,
        classifier: Arc<dyn Classifier>,
        sink: Arc<dyn ReactionSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            throttle,
            cache,
            classifier,
            sink,
            clock,
        }
    }

    pub fn throttle(&self) -> &ReactionThrottle {
        &self.throttle
    }

    // Returns the reaction actually applied to `message`, if any. The
    // channel's cooldown restarts only when the sink accepted the reaction.
    pub async fn on_message(&self, message: &ChatMessage) -> Option<Reaction> {
        if message.author.bot || message.content.trim().is_empty() {
            return None;
        }

        let now = self.clock.now();
        if !self.throttle.should_sample(message.channel, now) {
            return None;
        }
        log::debug!("Sampling message {} in channel {}", message.id, message.channel);

        let known_symbols = self.cache.list_names();
        let reaction = match self
            .classifier
            .classify(&message.content, &known_symbols)
            .await
        {
            Ok(Some(reaction)) => reaction,
            Ok(None) => {
                log::debug!("Message {} did not earn a reaction", message.id);
                return None;
            }
            Err(e) => {
                log::error!("Error classifying message {}: {e}", message.id);
                return None;
            }
        };

        let resolved = match reaction.kind {
            SymbolKind::Unicode => ResolvedReaction::Unicode(reaction.name.clone()),
            SymbolKind::Custom => match self.cache.lookup(&reaction.name) {
                Some(entry) => ResolvedReaction::Custom(entry),
                None => {
                    log::debug!("Custom symbol not found in cache: {}", reaction.name);
                    return None;
                }
            },
        };

        match self.sink.add_reaction(message, &resolved).await {
            Ok(()) => {
                self.throttle.record_fired(message.channel, now);
                log::info!(
                    "Reacted to message {} in channel {} with {}:{}",
                    message.id,
                    message.channel,
                    reaction.kind,
                    reaction.name
                );
                Some(reaction)
            }
            Err(e) => {
                log::error!("Error handling emoji reaction: {e}");
                None
            }
        }
    }
}
