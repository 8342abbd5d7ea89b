use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use crate::config::TelegramConfig;
use crate::error::{AppError, AppResult};
use crate::models::{
    LottoBatch, LottoCheckOutcome, PensionBatch, PensionCheckOutcome, RecommendationSource,
    SyncOutcome,
};
use crate::services::notification::{Notification, Notifier};

/// 每注 1,000 韩元
const TICKET_PRICE: usize = 1_000;
const DIVIDER: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━";
const GAME_EMOJIS: [&str; 10] = ["1️⃣", "2️⃣", "3️⃣", "4️⃣", "5️⃣", "6️⃣", "7️⃣", "8️⃣", "9️⃣", "🔟"];

/// Telegram Bot 通知渠道
#[derive(Clone)]
pub struct TelegramNotifier {
    http: Client,
    config: TelegramConfig,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Failed to build Telegram HTTP client, using defaults: {e}");
                Client::new()
            });
        if config.bot_token.is_empty() || config.chat_id.is_empty() {
            log::warn!("Telegram bot is not configured, notifications are disabled");
        }
        Self { http, config }
    }

    pub fn is_enabled(&self) -> bool {
        !self.config.bot_token.is_empty() && !self.config.chat_id.is_empty()
    }

    pub async fn send_message(&self, text: &str) -> AppResult<()> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token
        );
        let response = self
            .http
            .post(&url)
            .json(&json!({
                "chat_id": self.config.chat_id,
                "text": text,
                "parse_mode": "HTML",
            }))
            .send()
            .await?;

        if response.status().is_success() {
            log::info!("Message sent to Telegram");
            Ok(())
        } else {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            Err(AppError::ExternalApiError(format!(
                "Telegram sendMessage failed with HTTP {}: {}",
                status.as_u16(),
                error_text
            )))
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, notification: &Notification) -> AppResult<()> {
        if !self.is_enabled() {
            log::warn!(
                "Telegram is not configured, {} message not sent",
                notification.kind()
            );
            return Ok(());
        }
        self.send_message(&format_message(notification)).await
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn game_emoji(game_number: i32) -> String {
    usize::try_from(game_number - 1)
        .ok()
        .and_then(|i| GAME_EMOJIS.get(i))
        .map(|e| e.to_string())
        .unwrap_or_else(|| format!("{game_number}."))
}

fn join_numbers(numbers: &[i32]) -> String {
    numbers
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// 千分位格式
fn format_won(amount: usize) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn match_emoji(matched_count: i32, prize_rank: Option<i32>) -> &'static str {
    match prize_rank {
        Some(1) => "🎉🎉🎉",
        Some(2) => "🎉🎉",
        Some(3) => "🎉",
        Some(4) => "👍",
        _ if matched_count == 0 => "❌",
        _ => "⚪",
    }
}

fn best_rank_line(best_rank: Option<i32>) -> String {
    match best_rank {
        Some(rank) => format!("🏆 Best this round: rank {rank}"),
        None => "🏆 Best this round: no prize".to_string(),
    }
}

/// 渲染为 Telegram HTML 文本
pub fn format_message(notification: &Notification) -> String {
    match notification {
        Notification::LottoRecommendations { batch, draw_date } => {
            format_lotto_recommendations(batch, &draw_date.to_string())
        }
        Notification::PensionRecommendations { batch, draw_date } => {
            format_pension_recommendations(batch, &draw_date.to_string())
        }
        Notification::LottoResults(outcome) => format_lotto_results(outcome),
        Notification::PensionResults(outcome) => format_pension_results(outcome),
        Notification::PensionSyncSummary(outcome) => format_pension_sync(outcome),
    }
}

fn format_lotto_recommendations(batch: &LottoBatch, draw_date: &str) -> String {
    let mut lines = vec![
        format!("🎰 <b>Lotto 6/45 draw {} picks</b>", batch.target_draw_id),
        String::new(),
        "📊 <b>Statistical (low-frequency excluded):</b>".to_string(),
    ];
    for rec in batch
        .recommendations
        .iter()
        .filter(|r| r.source == RecommendationSource::Statistical)
    {
        lines.push(format!("{} {}", game_emoji(rec.game_number), join_numbers(&rec.numbers)));
    }

    lines.push(String::new());
    lines.push("🤖 <b>AI:</b>".to_string());
    for rec in batch
        .recommendations
        .iter()
        .filter(|r| r.source == RecommendationSource::Ai)
    {
        lines.push(format!("{} {}", game_emoji(rec.game_number), join_numbers(&rec.numbers)));
        if let Some(reasoning) = &rec.ai_reasoning {
            lines.push(format!("   └ <i>{}</i>", escape_html(reasoning)));
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "💰 Total cost: {} KRW",
        format_won(batch.recommendations.len() * TICKET_PRICE)
    ));
    lines.push(format!("📅 Draw date: {draw_date}"));
    lines.join("\n")
}

fn format_pension_recommendations(batch: &PensionBatch, draw_date: &str) -> String {
    let mut lines = vec![
        format!("🎱 <b>Pension 720+ draw {} picks</b>", batch.target_draw_id),
        String::new(),
        "📊 <b>Statistical:</b>".to_string(),
    ];
    for rec in &batch.recommendations {
        lines.push(format!(
            "{} group {} {}",
            game_emoji(rec.game_number),
            rec.group_no,
            rec.digits
        ));
    }
    lines.push(String::new());
    lines.push(format!(
        "💰 Total cost: {} KRW",
        format_won(batch.recommendations.len() * TICKET_PRICE)
    ));
    lines.push(format!("📅 Draw date: {draw_date}"));
    lines.join("\n")
}

fn format_lotto_results(outcome: &LottoCheckOutcome) -> String {
    let draw = &outcome.draw;
    let mut lines = vec![
        format!("🎯 <b>Lotto 6/45 draw {} results</b>", draw.id),
        String::new(),
        format!(
            "Winning numbers: <b>{}</b> + 🔴 {}",
            join_numbers(&draw.numbers),
            draw.bonus_number
        ),
        String::new(),
        DIVIDER.to_string(),
    ];

    for (source, title) in [
        (RecommendationSource::Statistical, "📊 <b>Statistical:</b>"),
        (RecommendationSource::Ai, "🤖 <b>AI:</b>"),
    ] {
        let entries: Vec<_> = outcome
            .entries
            .iter()
            .filter(|e| e.recommendation.source == source)
            .collect();
        if entries.is_empty() {
            continue;
        }
        lines.push(title.to_string());
        for entry in entries {
            let result = &entry.result;
            let prize = result
                .prize_rank
                .map(|r| format!(" (rank {r}!)"))
                .unwrap_or_default();
            lines.push(format!(
                "{} {} → {} {} matched{}",
                game_emoji(entry.recommendation.game_number),
                join_numbers(&entry.recommendation.numbers),
                match_emoji(result.matched_count, result.prize_rank),
                result.matched_count,
                prize
            ));
        }
    }

    lines.push(DIVIDER.to_string());
    lines.push(best_rank_line(outcome.best_rank));
    lines.join("\n")
}

fn format_pension_results(outcome: &PensionCheckOutcome) -> String {
    let draw = &outcome.draw;
    let winning = match (draw.group_no, draw.published_digits()) {
        (Some(group), Some(digits)) => format!("group {group} {digits}"),
        (None, Some(digits)) => format!("group ? {digits}"),
        _ => "(not published)".to_string(),
    };
    let mut lines = vec![
        format!("🎱 <b>Pension 720+ draw {} results</b>", draw.id),
        String::new(),
        format!("Winning number: <b>{winning}</b>"),
        String::new(),
        DIVIDER.to_string(),
    ];
    for entry in &outcome.entries {
        let rec = &entry.recommendation;
        let rank = entry
            .result
            .prize_rank
            .map(|r| format!("rank {r}!"))
            .unwrap_or_else(|| "no prize".to_string());
        lines.push(format!(
            "{} group {} {} → {}",
            game_emoji(rec.game_number),
            rec.group_no,
            rec.digits,
            rank
        ));
    }
    lines.push(DIVIDER.to_string());
    lines.push(best_rank_line(outcome.best_rank));
    lines.join("\n")
}

fn format_pension_sync(outcome: &SyncOutcome) -> String {
    let mut lines = vec!["🎱 <b>Pension 720+ draw data synced</b>".to_string(), String::new()];
    if outcome.synced_count > 0 {
        lines.push(format!(
            "New draws: <b>{}</b> ({})",
            outcome.synced_count,
            join_numbers(&outcome.new_draws)
        ));
        lines.push(format!(
            "Range: {} ~ {}",
            outcome.start_draw_id, outcome.end_draw_id
        ));
    } else {
        lines.push("No changes, already up to date".to_string());
        lines.push(format!("Latest draw: {}", outcome.end_draw_id));
    }
    lines.join("\n")
}
