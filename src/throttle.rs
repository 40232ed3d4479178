// Per-channel reaction throttle. The chance to sample a message ramps linearly
// from 0 at `min_interval` since the last reaction in that channel up to the
// configured ceiling at `max_interval`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::Rng;

use crate::error::ConfigError;
use crate::platform::ChannelId;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// Uniform draws in [0, 1).
pub trait RandomSource: Send + Sync {
    fn next_f64(&self) -> f64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&self) -> f64 {
        rand::rng().random::<f64>()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrottleConfig {
    message_check_chance: f64,
    min_interval: f64, // seconds
    max_interval: f64, // seconds
}

impl ThrottleConfig {
    pub fn new(
        message_check_chance: f64,
        min_interval_secs: u64,
        max_interval_secs: u64,
    ) -> Result<Self, ConfigError> {
        if !message_check_chance.is_finite() || !(0.0..=1.0).contains(&message_check_chance) {
            return Err(ConfigError::ChanceOutOfRange(message_check_chance));
        }
        // Equal bounds are accepted here and behave as a step; Settings
        // rejects them before a throttle is ever built from configuration.
        if min_interval_secs > max_interval_secs {
            return Err(ConfigError::IntervalOrder {
                min: min_interval_secs,
                max: max_interval_secs,
            });
        }
        Ok(Self {
            message_check_chance,
            min_interval: min_interval_secs as f64,
            max_interval: max_interval_secs as f64,
        })
    }

    pub fn message_check_chance(&self) -> f64 {
        self.message_check_chance
    }

    // Probability for a given number of seconds since the last reaction.
    pub fn probability_after(&self, elapsed: f64) -> f64 {
        let elapsed = elapsed.max(0.0);
        let span = self.max_interval - self.min_interval;
        if span <= 0.0 {
            // Degenerate ramp: a step at max_interval.
            return if elapsed >= self.max_interval {
                self.message_check_chance
            } else {
                0.0
            };
        }
        if elapsed < self.min_interval {
            0.0
        } else if elapsed > self.max_interval {
            self.message_check_chance
        } else {
            let progress = (elapsed - self.min_interval) / span;
            (self.message_check_chance * progress).clamp(0.0, self.message_check_chance)
        }
    }
}

pub struct ReactionThrottle {
    config: ThrottleConfig,
    last_fired: DashMap<ChannelId, DateTime<Utc>>,
    random: Arc<dyn RandomSource>,
}

impl ReactionThrottle {
    pub fn new(config: ThrottleConfig, random: Arc<dyn RandomSource>) -> Self {
        Self {
            config,
            last_fired: DashMap::new(),
            random,
        }
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    // A channel without a recorded reaction is fully cooled down.
    pub fn elapsed_secs(&self, channel: ChannelId, now: DateTime<Utc>) -> f64 {
        match self.last_fired.get(&channel) {
            Some(last) => (now - *last).num_milliseconds() as f64 / 1000.0,
            None => self.config.max_interval,
        }
    }

    pub fn probability(&self, channel: ChannelId, now: DateTime<Utc>) -> f64 {
        self.config
            .probability_after(self.elapsed_secs(channel, now))
    }

    pub fn should_sample(&self, channel: ChannelId, now: DateTime<Utc>) -> bool {
        let probability = self.probability(channel, now);
        if probability <= 0.0 {
            return false;
        }
        let draw = self.random.next_f64();
        log::debug!("Channel {channel}: reaction probability {probability:.4}, draw {draw:.4}");
        draw < probability
    }

    // Only called once a reaction has actually been applied.
    pub fn record_fired(&self, channel: ChannelId, now: DateTime<Utc>) {
        self.last_fired.insert(channel, now);
    }

    pub fn last_fired(&self, channel: ChannelId) -> Option<DateTime<Utc>> {
        self.last_fired.get(&channel).map(|last| *last)
    }

    pub fn tracked_channels(&self) -> usize {
        self.last_fired.len()
    }
}
