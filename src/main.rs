use std::sync::Arc;

use color_eyre::eyre::{Result, WrapErr};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use vibecheck::{
    Bot, CommandHandler, CommandLimits, ReactionThrottle, Sampler, Settings, SymbolCache,
    VibeChecker, VibeClassifier,
    console::{ConsoleChannels, ConsoleSink, StaticSymbolSource},
    logging,
    openai::OpenAIGenerator,
    throttle::{SystemClock, ThreadRandom},
};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let settings = Settings::load().wrap_err("Invalid configuration")?;
    if let Err(e) = logging::init(settings.debug_mode) {
        eprintln!("Logging disabled: {e}");
    }
    log::info!(
        "Initializing VibeCheckBot with channel message limit: {}, server message limit: {}, user message limit: {}, OpenAI model: {}, message check chance: {}, min reaction interval: {}, max reaction interval: {}",
        settings.channel_message_limit,
        settings.server_message_limit,
        settings.user_message_limit,
        settings.model,
        settings.message_check_chance,
        settings.min_reaction_interval,
        settings.max_reaction_interval
    );

    let generator = Arc::new(
        OpenAIGenerator::from_settings(&settings).wrap_err("OPENAI_API_KEY environment variable not set")?,
    );
    let channels = Arc::new(ConsoleChannels::new());
    let sink = Arc::new(ConsoleSink::new(Arc::clone(&channels)));

    let cache = Arc::new(SymbolCache::new(
        Arc::new(StaticSymbolSource::new(&settings.symbols_path)),
        settings.refresh_period(),
    ));
    let sampler = Sampler::new(
        ReactionThrottle::new(settings.throttle_config()?, Arc::new(ThreadRandom)),
        Arc::clone(&cache),
        Arc::new(VibeClassifier::new(generator.clone())),
        sink.clone(),
        Arc::new(SystemClock),
    );
    let commands = CommandHandler::new(
        channels.clone(),
        VibeChecker::new(generator, settings.max_tokens, settings.prompt_max_length),
        sink,
        CommandLimits::from(&settings),
    );
    let bot = Arc::new(Bot::new(cache, sampler, commands));

    if let Err(e) = bot.start().await {
        log::error!("Error starting bot: {e}");
        bot.stop();
        return Err(e).wrap_err("Error starting bot");
    }

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let token = CancellationToken::new();
    let runner = {
        let bot = Arc::clone(&bot);
        let token = token.clone();
        tokio::spawn(async move { bot.run(event_rx, token).await })
    };

    println!("Type messages as \"#channel author: text\" or commands as \"#channel /vibecheck channel\". Ctrl-C to quit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => match line? {
                Some(line) => {
                    if let Some(event) = channels.parse_line(&line) {
                        if event_tx.send(event).is_err() {
                            break;
                        }
                    }
                }
                None => break,
            },
        }
    }

    drop(event_tx);
    token.cancel();
    runner.await?;
    bot.stop();
    log::info!("VibeCheckBot exit: {}", chrono::Local::now());
    Ok(())
}
