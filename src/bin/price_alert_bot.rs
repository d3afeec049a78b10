use coin_media_bots::alerts::{AlertScanner, AlertStore, Coin, CoinGeckoClient, PriceSource};
use coin_media_bots::bot::notifier::TelegramNotifier;
use coin_media_bots::bot::price_handlers::{self, PriceCommand};
use coin_media_bots::bot::is_command;
use coin_media_bots::bot::state::{
    current_state, message_dialogue, query_dialogue, PriceDialog, PriceDialogue,
};
use coin_media_bots::config::Settings;
use coin_media_bots::logging::init_logging;
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    init_logging().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?;

    info!("Starting price alert bot...");

    let settings = init_settings();
    let store = init_store(&settings).await;

    let prices: Arc<dyn PriceSource> = Arc::new(
        CoinGeckoClient::new(settings.coingecko_api_url.clone(), settings.http_timeout())
            .map_err(|e| {
                error!("Failed to build HTTP client: {e}");
                e
            })?,
    );
    info!("Price client initialized ({}).", settings.coingecko_api_url);

    let bot = Bot::new(settings.telegram_token.clone());
    if let Err(e) = bot.set_my_commands(PriceCommand::bot_commands()).await {
        warn!("Failed to register bot commands: {e}");
    }

    let shutdown = CancellationToken::new();
    let flusher =
        AlertStore::spawn_flusher(store.clone(), settings.flush_interval(), shutdown.clone());
    let scanner = AlertScanner::new(
        store.clone(),
        prices.clone(),
        Arc::new(TelegramNotifier::new(bot.clone())),
    )
    .spawn(settings.check_interval(), shutdown.clone());

    info!("Bot is running...");

    Dispatcher::builder(bot, setup_handler())
        .dependencies(dptree::deps![
            store,
            prices,
            InMemStorage::<PriceDialog>::new()
        ])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Shutting down...");
    shutdown.cancel();
    for (name, task) in [("scanner", scanner), ("flusher", flusher)] {
        if let Err(e) = task.await {
            error!("Background {name} task failed: {e}");
        }
    }
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

async fn init_store(settings: &Settings) -> Arc<AlertStore> {
    match AlertStore::load(&settings.data_file).await {
        Ok(store) => {
            let data = store.snapshot().await;
            info!(
                "Store loaded from {} ({} users, {} alerts).",
                settings.data_file.display(),
                data.users.len(),
                data.alert_count()
            );
            Arc::new(store)
        }
        Err(e) => {
            error!("Failed to load store: {}", e);
            std::process::exit(1);
        }
    }
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(
            Update::filter_callback_query()
                .map(query_dialogue::<PriceDialog>)
                .filter_map_async(current_state::<PriceDialog>)
                .endpoint(handle_callback),
        )
        .branch(
            Update::filter_message()
                .map(message_dialogue::<PriceDialog>)
                .filter_map_async(current_state::<PriceDialog>)
                .branch(
                    dptree::entry()
                        .filter_command::<PriceCommand>()
                        .endpoint(handle_command),
                )
                .branch(
                    dptree::case![PriceDialog::AwaitingTargetPrice { coin }]
                        .filter(|msg: Message| msg.text().is_some_and(|t| !is_command(t)))
                        .endpoint(handle_target_price),
                ),
        )
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: PriceCommand,
    store: Arc<AlertStore>,
    dialogue: PriceDialogue,
) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        PriceCommand::Start => price_handlers::start(bot, msg, store, dialogue).await,
        PriceCommand::Alerts => price_handlers::list_alerts(bot, msg, store).await,
        PriceCommand::Cancel => price_handlers::cancel(bot, msg, store, dialogue).await,
        PriceCommand::Help => price_handlers::help(bot, msg, store).await,
    };
    if let Err(e) = res {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    store: Arc<AlertStore>,
    prices: Arc<dyn PriceSource>,
    dialogue: PriceDialogue,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = price_handlers::handle_callback(bot, q, store, prices, dialogue).await {
        error!("Callback handler error: {}", e);
    }
    respond(())
}

async fn handle_target_price(
    bot: Bot,
    msg: Message,
    store: Arc<AlertStore>,
    prices: Arc<dyn PriceSource>,
    dialogue: PriceDialogue,
    coin: Coin,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) =
        price_handlers::receive_target_price(bot, msg, store, prices, dialogue, coin).await
    {
        error!("Target price handler error: {}", e);
    }
    respond(())
}
