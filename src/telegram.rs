// src/telegram.rs
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::sync::Arc;
use teloxide::{
    prelude::*,
    types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, ParseMode},
    utils::command::BotCommands,
    utils::markdown::{bold, code_inline, escape},
    Bot,
};
use tokio::sync::RwLock;

use crate::models::{AssetDetail, MatchedProject};
use crate::scheduler::{run_scan_cycle, Notifier};
use crate::settings::Settings;
use crate::utils::{format_number, preview};
use crate::AppState;

const DETAILS_PREFIX: &str = "details:";
// Telegram rejects callback data longer than this
const MAX_CALLBACK_DATA_BYTES: usize = 64;
const FULL_DESCRIPTION_PREVIEW: usize = 300;

pub struct TelegramBot {
    bot: Bot,
    // The single chat that receives alerts
    recipient: RwLock<Option<ChatId>>,
}

impl TelegramBot {
    pub async fn new(token: &str) -> Result<Self> {
        let bot = Bot::new(token);

        // Test the bot connection
        match bot.get_me().await {
            Ok(me) => {
                info!("✅ Telegram bot connected: @{}", me.username());
            }
            Err(e) => {
                error!("❌ Failed to connect to Telegram: {}", e);
                return Err(anyhow::anyhow!("Telegram connection failed: {}", e));
            }
        }

        Ok(Self {
            bot,
            recipient: RwLock::new(None),
        })
    }

    pub async fn start(&self, state: Arc<AppState>) -> Result<()> {
        info!("🤖 Starting Telegram bot service...");

        let handler = dptree::entry()
            .branch(
                Update::filter_message()
                    .filter_command::<Command>()
                    .endpoint(answer_command),
            )
            .branch(Update::filter_callback_query().endpoint(answer_callback));

        Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![state])
            .default_handler(|upd| async move {
                debug!("Unhandled update: {:?}", upd);
            })
            .error_handler(LoggingErrorHandler::with_custom_text(
                "An error has occurred in the dispatcher",
            ))
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        Ok(())
    }

    /// Make `chat_id` the chat that receives alerts, replacing any previous one.
    pub async fn register_recipient(&self, chat_id: ChatId) {
        *self.recipient.write().await = Some(chat_id);
        info!("📬 Alerts will go to chat {}", chat_id.0);
    }

    /// Register `chat_id` only if nobody has been registered yet.
    pub async fn register_if_absent(&self, chat_id: ChatId) {
        let mut recipient = self.recipient.write().await;
        if recipient.is_none() {
            *recipient = Some(chat_id);
            info!("📬 Alerts will go to chat {}", chat_id.0);
        }
    }

    pub async fn recipient(&self) -> Option<ChatId> {
        *self.recipient.read().await
    }
}

#[async_trait]
impl Notifier for TelegramBot {
    async fn send_alert(&self, project: &MatchedProject) -> Result<bool> {
        let chat_id = match self.recipient().await {
            Some(chat_id) => chat_id,
            None => {
                warn!("⚠️ No recipient chat set, dropping alert for {}. Use /start first.", project.id());
                return Ok(false);
            }
        };

        let mut text = format_quick_summary(project);
        let request = match details_keyboard(project.id()) {
            Some(keyboard) => {
                text.push_str(&format!("\n\n{}", escape("👀 Tap 'Full Details' for more info")));
                self.bot.send_message(chat_id, text).reply_markup(keyboard)
            }
            None => self.bot.send_message(chat_id, text),
        };

        request.parse_mode(ParseMode::MarkdownV2).await?;
        info!("📤 Sent alert for {}", project.id());

        Ok(true)
    }
}

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Project Scanner Bot Commands:")]
enum Command {
    #[command(description = "Start receiving alerts in this chat")]
    Start,
    #[command(description = "Manually trigger a scan")]
    Scan,
    #[command(description = "View bot statistics")]
    Stats,
    #[command(description = "Show this help message")]
    Help,
}

async fn answer_command(bot: Bot, msg: Message, cmd: Command, state: Arc<AppState>) -> ResponseResult<()> {
    let chat_id = msg.chat.id;

    match cmd {
        Command::Start => {
            state.telegram.register_recipient(chat_id).await;
            send_markdown(&bot, chat_id, welcome_message(&state.settings)).await?;
            info!("🤖 Bot started for chat ID: {}", chat_id.0);
        }
        Command::Scan => {
            // Alerts need somewhere to go
            state.telegram.register_if_absent(chat_id).await;

            send_markdown(&bot, chat_id, escape("🔍 Starting manual scan... This may take a minute.")).await?;

            // The scan marks matches seen, so alerts go out before any reply
            let outcome = run_scan_cycle(&state.scanner, &state.telegram).await;
            if let Err(e) = send_markdown(&bot, chat_id, escape(&scan_result_message(outcome.found))).await {
                warn!("⚠️ Could not report manual scan result to chat {}: {}", chat_id.0, e);
            }
        }
        Command::Stats => {
            let sent = state.scanner.seen().len().await;
            let last_scan = state.scanner.last_scan().await;
            let text = format_stats(sent, &state.settings.scan_interval_label(), last_scan);
            send_markdown(&bot, chat_id, text).await?;
        }
        Command::Help => {
            bot.send_message(chat_id, Command::descriptions().to_string()).await?;
        }
    }

    Ok(())
}

/// "Full Details" button: fetch the coin again and expand the alert in place.
async fn answer_callback(bot: Bot, query: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    // Always answer first to remove the loading indicator
    bot.answer_callback_query(query.id.clone()).await?;

    let id = match query.data.as_deref().and_then(parse_details_callback) {
        Some(id) => id,
        None => {
            debug!("Unknown callback: {:?}", query.data);
            return Ok(());
        }
    };

    let message = match query.message.as_ref() {
        Some(message) => message,
        None => {
            warn!("Details callback for {} without message context", id);
            return Ok(());
        }
    };

    let text = match state.metadata.asset_detail(id).await {
        Ok(detail) => format_full_details(&detail),
        Err(e) => {
            warn!("Could not expand {}: {}", id, e);
            escape("Sorry, couldn't fetch details for this project.")
        }
    };

    bot.edit_message_text(message.chat.id, message.id, text)
        .parse_mode(ParseMode::MarkdownV2)
        .disable_web_page_preview(true)
        .await?;

    Ok(())
}

async fn send_markdown(bot: &Bot, chat_id: ChatId, text: String) -> ResponseResult<()> {
    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::MarkdownV2)
        .await?;
    Ok(())
}

fn details_callback_data(id: &str) -> Option<String> {
    let data = format!("{}{}", DETAILS_PREFIX, id);
    (data.len() <= MAX_CALLBACK_DATA_BYTES).then_some(data)
}

fn parse_details_callback(data: &str) -> Option<&str> {
    data.strip_prefix(DETAILS_PREFIX).filter(|id| !id.is_empty())
}

/// `None` when the id is too long to fit in callback data.
fn details_keyboard(id: &str) -> Option<InlineKeyboardMarkup> {
    let data = details_callback_data(id)?;
    Some(InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("📄 Full Details", data),
    ]]))
}

fn welcome_message(settings: &Settings) -> String {
    format!(
        "🤖 {}\n\n\
         {}\n\n\
         {}\n\
         {}\n\n\
         {}\n\
         {}\n\n\
         {}",
        bold(&escape("DeFi/NFT Project Scanner Bot")),
        escape(&format!(
            "I'll automatically scan for new DeFi and NFT projects ({})!",
            settings.scan_interval_label().to_lowercase()
        )),
        bold("Criteria:"),
        escape(&format!(
            "• X/Twitter followers < {}\n• Telegram members < {}",
            settings.max_twitter_followers, settings.max_telegram_users
        )),
        bold("Commands:"),
        escape("/start - Start the bot\n/scan - Manually trigger a scan\n/stats - View bot statistics\n/help - Show all commands"),
        escape("Sit back and relax - I'll notify you when I find matching projects! 🚀"),
    )
}

fn scan_result_message(found: usize) -> String {
    if found == 0 {
        "No new projects found matching criteria.".to_string()
    } else {
        format!("✅ Found {} new project(s)!", found)
    }
}

fn categories_line(categories: &[String], limit: usize) -> String {
    if categories.is_empty() {
        "N/A".to_string()
    } else {
        categories
            .iter()
            .take(limit)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn format_quick_summary(project: &MatchedProject) -> String {
    let detail = &project.detail;

    let mut message = format!("🚀 {}\n\n", bold(&escape("New Project Alert!")));
    message.push_str(&format!(
        "{} {}\n\n",
        bold(&escape(&detail.name)),
        escape(&format!("(${})", detail.symbol))
    ));

    message.push_str(&format!("📊 {}\n", bold("Stats:")));
    message.push_str(&format!("• X Followers: {}\n", detail.twitter_followers));
    message.push_str(&format!("• Telegram: {} members\n", detail.telegram_users));
    message.push_str(&format!(
        "• Categories: {}\n",
        escape(&categories_line(&detail.categories, 3))
    ));

    if let Some(market_cap) = detail.market_cap_usd {
        message.push_str(&format!(
            "\n💰 Market Cap: {}\n",
            escape(&format!("${}", format_number(market_cap)))
        ));
    }

    if !detail.description.is_empty() {
        message.push_str(&format!("\nℹ️ {}\n", escape(&detail.description)));
    }

    message.push_str(&format!(
        "\n⏰ Detected: {}",
        escape(&project.matched_at.format("%H:%M UTC").to_string())
    ));

    message
}

fn format_full_details(detail: &AssetDetail) -> String {
    let mut message = format!(
        "📋 {}\n\n",
        bold(&escape(&format!("Full Details: {}", detail.name)))
    );
    message.push_str(&format!("{} {}\n", bold("Symbol:"), escape(&format!("${}", detail.symbol))));
    message.push_str(&format!("{} {}\n\n", bold("ID:"), escape(&detail.id)));

    message.push_str(&format!("{}\n", bold("📊 Social Metrics:")));
    message.push_str(&format!("• X/Twitter: {} followers\n", detail.twitter_followers));
    message.push_str(&format!("• Telegram: {} members\n\n", detail.telegram_users));

    if !detail.categories.is_empty() {
        message.push_str(&format!(
            "{}\n{}\n\n",
            bold("🏷️ Categories:"),
            escape(&detail.categories.join(", "))
        ));
    }

    let mut links = Vec::new();
    if let Some(homepage) = &detail.homepage {
        links.push(format!("Website: {}", homepage));
    }
    if let Some(handle) = &detail.twitter_handle {
        links.push(format!("Twitter: https://twitter.com/{}", handle));
    }
    if let Some(channel) = &detail.telegram_channel {
        links.push(format!("Telegram: https://t.me/{}", channel));
    }
    if let Some(discord) = &detail.discord_url {
        links.push(format!("Discord: {}", discord));
    }

    message.push_str(&format!("{}\n", bold("🔗 Links:")));
    if links.is_empty() {
        message.push_str(&escape("• None listed"));
        message.push('\n');
    }
    for link in &links {
        message.push_str(&format!("• {}\n", escape(link)));
    }

    if let Some(contract) = &detail.contract_address {
        message.push_str(&format!("\n{} {}\n", bold("📝 Contract:"), code_inline(contract)));
    }

    if let Some(market_cap) = detail.market_cap_usd {
        message.push_str(&format!(
            "\n{} {}\n",
            bold("💰 Market Cap:"),
            escape(&format!("${}", format_number(market_cap)))
        ));
    }

    if !detail.description.is_empty() {
        message.push_str(&format!(
            "\n{}\n{}\n",
            bold("ℹ️ Description:"),
            escape(&preview(&detail.description, FULL_DESCRIPTION_PREVIEW))
        ));
    }

    message
}

fn format_stats(projects_sent: usize, interval_label: &str, last_scan: Option<DateTime<Utc>>) -> String {
    let last_scan = last_scan
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "not yet".to_string());

    format!(
        "📊 {}\n\n\
         Projects sent: {}\n\
         Status: Active ✅\n\
         {}\n\
         {}",
        bold("Bot Statistics"),
        projects_sent,
        escape(&format!("Scan interval: {}", interval_label)),
        escape(&format!("Last scan: {}", last_scan)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn quiet_coin() -> AssetDetail {
        AssetDetail {
            name: "Tiny.Dex".to_string(),
            symbol: "TDX".to_string(),
            description: "An exchange (tiny).".to_string(),
            twitter_followers: 42,
            telegram_users: 7,
            homepage: Some("https://tinydex.io".to_string()),
            twitter_handle: Some("tiny_dex".to_string()),
            categories: vec!["DeFi".to_string(), "DEX".to_string(), "Ethereum".to_string(), "Meme".to_string()],
            contract_address: Some("0xabc".to_string()),
            market_cap_usd: Some(125_000.0),
            ..AssetDetail::empty("tiny-dex")
        }
    }

    #[test]
    fn callback_data_round_trips_the_coin_id() {
        let data = details_callback_data("tiny-dex").unwrap();

        assert_eq!(data, "details:tiny-dex");
        assert_eq!(parse_details_callback(&data), Some("tiny-dex"));
        assert_eq!(parse_details_callback("details:"), None);
        assert_eq!(parse_details_callback("menu:main"), None);
    }

    #[test]
    fn oversized_ids_get_no_button() {
        let long_id = "a".repeat(60);

        assert!(details_callback_data(&long_id).is_none());
        assert!(details_keyboard(&long_id).is_none());
        assert!(details_keyboard("tiny-dex").is_some());
    }

    #[test]
    fn summary_is_escaped_for_markdown_v2() {
        let mut project = MatchedProject::from_detail(quiet_coin(), 500);
        project.matched_at = Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap();

        let text = format_quick_summary(&project);

        assert!(text.contains("*Tiny\\.Dex*"));
        assert!(text.contains("\\($TDX\\)"));
        assert!(text.contains("• X Followers: 42"));
        assert!(text.contains("• Telegram: 7 members"));
        assert!(text.contains("DeFi, DEX, Ethereum"));
        assert!(!text.contains("Meme"));
        assert!(text.contains("$125\\.00K"));
        assert!(text.contains("09:30 UTC"));
    }

    #[test]
    fn full_details_lists_links_and_contract() {
        let text = format_full_details(&quiet_coin());

        assert!(text.contains("https://twitter\\.com/tiny\\_dex"));
        assert!(text.contains("Website: https://tinydex\\.io"));
        assert!(text.contains("`0xabc`"));
        assert!(text.contains("Meme"));
        assert!(!text.contains("Discord"));
    }

    #[test]
    fn full_details_without_links_says_so() {
        let text = format_full_details(&AssetDetail::empty("ghost"));

        assert!(text.contains("None listed"));
        assert!(!text.contains("Contract"));
        assert!(!text.contains("Description"));
    }

    #[test]
    fn full_details_cuts_long_descriptions() {
        let detail = AssetDetail {
            description: "w".repeat(400),
            ..AssetDetail::empty("wordy")
        };

        let text = format_full_details(&detail);

        assert!(text.contains(&format!("{}\\.\\.\\.", "w".repeat(300))));
        assert!(!text.contains(&"w".repeat(301)));
    }

    #[test]
    fn welcome_lists_configured_criteria() {
        let text = welcome_message(&Settings::for_tests());

        assert!(text.contains("followers < 200"));
        assert!(text.contains("members < 50"));
        assert!(text.contains("every hour"));
    }

    #[test]
    fn scan_result_reports_the_match_count() {
        assert_eq!(scan_result_message(0), "No new projects found matching criteria.");
        assert_eq!(scan_result_message(3), "✅ Found 3 new project(s)!");
    }

    #[test]
    fn stats_report_sent_count() {
        let text = format_stats(2, "Every hour", None);

        assert!(text.contains("Projects sent: 2"));
        assert!(text.contains("Every hour"));
        assert!(text.contains("not yet"));
    }
}
