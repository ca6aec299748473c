//! Telegram notifications
//!
//! Sends opportunity alerts, bet confirmations, resolutions, and calibration
//! digests to a Telegram chat. Delivery is best-effort: a failed send is
//! logged and swallowed so notification problems never stall a trading loop.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::domain::{Opportunity, Side};
use crate::tracker::CalibrationReport;

/// Outbound notification channel
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str);

    async fn notify_opportunities(&self, opportunities: &[Opportunity], top_n: usize) {
        if opportunities.is_empty() {
            return;
        }
        let mut lines = vec![format!(
            "OPPORTUNITY SCAN: {} mispricings found",
            opportunities.len()
        )];
        for (i, opp) in opportunities.iter().take(top_n).enumerate() {
            lines.push(format!(
                "#{} [{}] {}\nMarket YES={:.0}% | our est {:.0}% | EV {:+.1}% | Kelly {:.1}%\nBET {}\n{}",
                i + 1,
                opp.confidence,
                opp.market.question.chars().take(80).collect::<String>(),
                opp.market.yes_price * 100.0,
                opp.our_probability * 100.0,
                opp.best_ev() * 100.0,
                opp.best_kelly() * 100.0,
                opp.recommended_side,
                opp.rationale.chars().take(100).collect::<String>(),
            ));
        }
        self.send(&lines.join("\n\n")).await;
    }

    async fn notify_bet_placed(
        &self,
        opp: &Opportunity,
        side: Side,
        size_usd: Decimal,
        live: bool,
    ) {
        let (ev, _, price) = opp.side_terms(side);
        self.send(&format!(
            "{} BET PLACED\n{}\nSide: {} @ {:.1}% | Size: ${:.2}\nOur prob: {:.1}% | EV: {:+.1}% | Confidence: {}",
            if live { "LIVE" } else { "PAPER" },
            opp.market.question.chars().take(80).collect::<String>(),
            side,
            price * 100.0,
            size_usd,
            opp.our_probability * 100.0,
            ev * 100.0,
            opp.confidence,
        ))
        .await;
    }

    async fn notify_resolution(
        &self,
        question: &str,
        side: Side,
        entry_price: f64,
        outcome: Side,
        pnl: Decimal,
    ) {
        let won = side == outcome;
        self.send(&format!(
            "MARKET RESOLVED\n{}\nOur bet: {} @ {:.1}%\nOutcome: {} | {} | P&L: ${:+.2}",
            question.chars().take(80).collect::<String>(),
            side,
            entry_price * 100.0,
            outcome,
            if won { "WIN" } else { "LOSS" },
            pnl,
        ))
        .await;
    }

    async fn notify_calibration(&self, report: &CalibrationReport) {
        self.send(&format!(
            "CALIBRATION REPORT\nResolved: {} | Win rate: {:.1}%\nP&L: ${:+.2} (hypothetical $100/bet) | ROI: {:+.1}%\nHigh conf WR: {:.1}%\n{}",
            report.total_resolved,
            report.win_rate * 100.0,
            report.total_pnl,
            report.roi_pct,
            report.high_confidence_win_rate * 100.0,
            if report.ready_for_live {
                "READY FOR LIVE"
            } else {
                "Need more data before live"
            },
        ))
        .await;
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

/// Telegram bot API notifier
pub struct TelegramNotifier {
    client: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: String) -> Arc<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Arc::new(Self {
            client,
            bot_token,
            chat_id,
        })
    }

    /// Build from TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID; None when unset
    pub fn from_env() -> Option<Arc<Self>> {
        let token = std::env::var("TELEGRAM_BOT_TOKEN").ok()?;
        let chat_id = std::env::var("TELEGRAM_CHAT_ID").ok()?;
        if token.is_empty() || chat_id.is_empty() {
            return None;
        }
        Some(Self::new(token, chat_id))
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let message = SendMessage {
            chat_id: &self.chat_id,
            text,
            disable_web_page_preview: true,
        };

        match self.client.post(&url).json(&message).send().await {
            Ok(resp) if resp.status().is_success() => {
                debug!("telegram notification sent");
            }
            Ok(resp) => {
                error!(status = %resp.status(), "telegram send rejected");
            }
            Err(e) => {
                error!(error = %e, "telegram send failed");
            }
        }
    }
}

/// Notifier used when Telegram is not configured; messages go to the log
pub struct NullNotifier;

impl NullNotifier {
    pub fn from_env_or_null() -> Arc<dyn Notifier> {
        match TelegramNotifier::from_env() {
            Some(n) => n,
            None => {
                warn!("Telegram not configured, notifications disabled");
                Arc::new(NullNotifier)
            }
        }
    }
}

#[async_trait]
impl Notifier for NullNotifier {
    async fn send(&self, text: &str) {
        debug!(text, "notification (no channel configured)");
    }
}
