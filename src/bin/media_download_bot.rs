use coin_media_bots::bot::media_handlers::{self, MediaCommand, TelegramFileSink};
use coin_media_bots::bot::state::{
    current_state, message_dialogue, query_dialogue, DownloadDialog, DownloadDialogue,
};
use coin_media_bots::config::Settings;
use coin_media_bots::logging::init_logging;
use coin_media_bots::media::{clear_leftovers, DispatchOptions, MediaDispatcher, YtDlpExtractor};
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    init_logging().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?;

    info!("Starting media download bot...");

    let settings = init_settings();
    let bot = Bot::new(settings.telegram_token.clone());
    if let Err(e) = bot.set_my_commands(MediaCommand::bot_commands()).await {
        warn!("Failed to register bot commands: {e}");
    }

    match clear_leftovers(&settings.download_dir).await {
        Ok(0) => {}
        Ok(n) => info!("Removed {n} file(s) left by interrupted downloads."),
        Err(e) => warn!("Failed to clean the download directory: {e}"),
    }
    let dispatcher = init_dispatcher(&settings, bot.clone());

    info!("Bot is running...");

    Dispatcher::builder(bot, setup_handler())
        .dependencies(dptree::deps![
            dispatcher.clone(),
            InMemStorage::<DownloadDialog>::new()
        ])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Shutting down...");
    dispatcher.shutdown().await;
    Ok(())
}

fn init_settings() -> Settings {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            s
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_dispatcher(settings: &Settings, bot: Bot) -> Arc<MediaDispatcher> {
    let options = DispatchOptions {
        download_dir: settings.download_dir.clone(),
        max_concurrent: settings.max_concurrent_downloads,
        max_upload_bytes: settings.max_upload_bytes,
        instagram_delivery: settings.instagram_delivery,
    };
    info!(
        "Downloads go to {} (yt-dlp: {}, {} at once, timeout {}s, Instagram delivery {}).",
        options.download_dir.display(),
        settings.ytdlp_path,
        options.max_concurrent,
        settings.download_timeout_secs,
        if options.instagram_delivery { "on" } else { "off" }
    );
    Arc::new(MediaDispatcher::new(
        Arc::new(YtDlpExtractor::new(
            settings.ytdlp_path.clone(),
            settings.download_timeout(),
        )),
        Arc::new(TelegramFileSink::new(bot)),
        options,
    ))
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(
            Update::filter_callback_query()
                .map(query_dialogue::<DownloadDialog>)
                .filter_map_async(current_state::<DownloadDialog>)
                .endpoint(handle_quality),
        )
        .branch(
            Update::filter_message()
                .map(message_dialogue::<DownloadDialog>)
                .filter_map_async(current_state::<DownloadDialog>)
                .branch(
                    dptree::entry()
                        .filter_command::<MediaCommand>()
                        .endpoint(handle_command),
                )
                .branch(
                    dptree::filter(|msg: Message| msg.text().is_some()).endpoint(handle_link),
                ),
        )
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: MediaCommand,
    dialogue: DownloadDialogue,
) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        MediaCommand::Start | MediaCommand::Help => {
            media_handlers::start(bot, msg, dialogue).await
        }
    };
    if let Err(e) = res {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_link(
    bot: Bot,
    msg: Message,
    dialogue: DownloadDialogue,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = media_handlers::handle_link(bot, msg, dialogue).await {
        error!("Link handler error: {}", e);
    }
    respond(())
}

async fn handle_quality(
    bot: Bot,
    q: CallbackQuery,
    dialogue: DownloadDialogue,
    dispatcher: Arc<MediaDispatcher>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = media_handlers::handle_quality(bot, q, dialogue, dispatcher).await {
        error!("Quality handler error: {}", e);
    }
    respond(())
}
