use std::path::PathBuf;

use clap::Parser;

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "greenroom-server",
    about = "Chat-driven CMS console with public read endpoints",
    version
)]
pub struct Cli {
    #[arg(
        long,
        env = "GREENROOM_BIND",
        default_value = "127.0.0.1:8787",
        help = "host:port to listen on."
    )]
    pub bind: String,

    #[arg(
        long,
        env = "GREENROOM_BOT_TOKEN",
        help = "Telegram bot token used for the admin console."
    )]
    pub bot_token: String,

    #[arg(
        long,
        env = "GREENROOM_ADMIN_USER_ID",
        help = "Telegram user id of the single console admin."
    )]
    pub admin_user_id: i64,

    #[arg(
        long,
        env = "GREENROOM_WEBAPP_URL",
        help = "Public URL of the listener-facing web app linked from chat."
    )]
    pub webapp_url: String,

    #[arg(
        long,
        env = "GREENROOM_STATE_DIR",
        default_value = ".greenroom",
        help = "Directory for durable console state."
    )]
    pub state_dir: PathBuf,

    #[arg(
        long,
        env = "GREENROOM_MEDIA_DIR",
        help = "Directory for uploaded media blobs. Defaults to <state-dir>/media."
    )]
    pub media_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "GREENROOM_MEDIA_PUBLIC_BASE",
        help = "Public base URL prepended to stored media keys, e.g. a CDN origin."
    )]
    pub media_public_base: Option<String>,

    #[arg(
        long,
        env = "GREENROOM_TELEGRAM_API_BASE",
        default_value = "https://api.telegram.org",
        help = "Telegram Bot API base URL. Overridable for testing."
    )]
    pub telegram_api_base: String,

    #[arg(
        long,
        env = "GREENROOM_TELEGRAM_TIMEOUT_MS",
        default_value_t = 15_000,
        value_parser = parse_positive_u64,
        help = "Per-request timeout for outbound Telegram calls, in milliseconds."
    )]
    pub telegram_timeout_ms: u64,

    #[arg(
        long,
        env = "GREENROOM_WEBHOOK_SECRET",
        help = "If set, inbound webhooks must carry it in x-telegram-bot-api-secret-token."
    )]
    pub webhook_secret: Option<String>,
}
