use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::cache::SymbolCache;
use crate::commands::{CommandHandler, VibeCommand};
use crate::error::{AppError, CommandError};
use crate::platform::{ChannelId, ChatMessage, GroupId};
use crate::sampler::Sampler;

// Inbound work from the gateway. Each event is handled on its own task.
#[derive(Debug, Clone)]
pub enum BotEvent {
    Message(ChatMessage),
    Command {
        channel: ChannelId,
        group: Option<GroupId>,
        command: VibeCommand,
    },
    InvalidCommand {
        channel: ChannelId,
        error: CommandError,
    },
}

pub struct Bot {
    cache: Arc<SymbolCache>,
    sampler: Sampler,
    commands: CommandHandler,
}

impl Bot {
    pub fn new(cache: Arc<SymbolCache>, sampler: Sampler, commands: CommandHandler) -> Self {
        Self {
            cache,
            sampler,
            commands,
        }
    }

    pub fn cache(&self) -> &Arc<SymbolCache> {
        &self.cache
    }

    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }

    pub async fn start(&self) -> Result<(), AppError> {
        log::info!("Starting VibeCheckBot...");
        self.cache.start().await?;
        log::info!("VibeCheckBot started successfully");
        Ok(())
    }

    pub fn stop(&self) {
        log::info!("Stopping VibeCheckBot...");
        self.cache.stop();
        log::info!("VibeCheckBot stopped successfully");
    }

    // Runs until `token` is cancelled or every sender is gone. Pending events
    // are awaited on a closed channel and aborted on cancellation.
    pub async fn run(self: &Arc<Self>, mut events: UnboundedReceiver<BotEvent>, token: CancellationToken) {
        let mut tasks = JoinSet::new();
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    tasks.abort_all();
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => {
                        let bot = Arc::clone(self);
                        tasks.spawn(async move { bot.dispatch(event).await });
                    }
                    None => break,
                },
                Some(result) = tasks.join_next(), if !tasks.is_empty() => {
                    log_task_result(result);
                }
            }
        }
        while let Some(result) = tasks.join_next().await {
            log_task_result(result);
        }
    }

    pub async fn dispatch(&self, event: BotEvent) {
        match event {
            BotEvent::Message(message) => {
                self.sampler.on_message(&message).await;
            }
            BotEvent::Command {
                channel,
                group,
                command,
            } => {
                if let Err(e) = self.commands.handle(channel, group, &command).await {
                    log::error!("Error answering {command:?} in channel {channel}: {e}");
                }
            }
            BotEvent::InvalidCommand { channel, error } => {
                if let Err(e) = self.commands.reply(channel, &error.to_string()).await {
                    log::error!("Error answering invalid command in channel {channel}: {e}");
                }
            }
        }
    }
}

fn log_task_result(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            log::error!("Event task panicked: {e}");
        }
    }
}
