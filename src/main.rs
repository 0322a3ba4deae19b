use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{SecondsFormat, Utc};
use clap::Parser;
use log::info;
use serde::Deserialize;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, Message, ParseMode};
use teloxide::update_listeners::Polling;

mod callback_handlers;
mod dispatcher;
mod helpers;
mod message_handlers;
mod store;

use callback_handlers::handle_callback;
use dispatcher::{ActionDispatcher, CallbackAction, ChatKind, Command, Reply};
use message_handlers::handle_message;
use store::{ItemStore, ListItem};

const TOKEN_ENV_VAR: &str = "BOT_TOKEN";

#[derive(Debug, Deserialize, Clone)]
struct Config {
    #[serde(default)]
    token: Option<String>,
    database_path: PathBuf,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default)]
    log_format: LogFormat,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    config: PathBuf,
}

struct AppState {
    bot_username: String,
    dispatcher: ActionDispatcher,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args.config)?;
    init_logging(&config)?;

    let token = resolve_token(config.token.as_deref(), std::env::var(TOKEN_ENV_VAR).ok())?;

    if let Some(dir) = config
        .database_path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
    {
        fs::create_dir_all(dir).with_context(|| format!("create dir {}", dir.display()))?;
    }
    let store = ItemStore::open(&config.database_path)
        .with_context(|| format!("open database {}", config.database_path.display()))?;
    info!("database initialized at {}", config.database_path.display());

    let bot = Bot::new(token);
    let me = bot.get_me().await.context("fetch bot identity")?;
    let bot_username = me
        .user
        .username
        .clone()
        .ok_or_else(|| anyhow!("bot account has no username"))?;
    info!("running as @{}", bot_username);

    let state = Arc::new(AppState {
        bot_username,
        dispatcher: ActionDispatcher::new(store),
    });

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handle_message))
        .branch(Update::filter_callback_query().endpoint(handle_callback));

    let listener = Polling::builder(bot.clone()).drop_pending_updates().build();

    info!("grocery list bot is starting");
    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build();
    dispatcher
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("update listener failed"),
        )
        .await;

    Ok(())
}

fn load_config(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let config: Config = toml::from_str(&contents).context("parse config")?;
    Ok(config)
}

fn default_log_level() -> String {
    "info".to_string()
}

/// The config file wins; the environment variable is the fallback.
fn resolve_token(configured: Option<&str>, env: Option<String>) -> Result<String> {
    configured
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .or_else(|| {
            env.map(|token| token.trim().to_string())
                .filter(|token| !token.is_empty())
        })
        .ok_or_else(|| {
            anyhow!(
                "bot token not found; set `token` in the config file or the {} environment variable",
                TOKEN_ENV_VAR
            )
        })
}

fn init_logging(config: &Config) -> Result<()> {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(&config.log_level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.target(env_logger::Target::Stdout);
    if config.log_format == LogFormat::Json {
        builder.format(|buf, record| writeln!(buf, "{}", json_log_line(record)));
    }
    builder.try_init().context("init logger")?;
    Ok(())
}

fn json_log_line(record: &log::Record<'_>) -> String {
    serde_json::json!({
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "level": record.level().to_string(),
        "logger": record.target(),
        "message": record.args().to_string(),
    })
    .to_string()
}
