//! OpenAI-compatible chat-completions agent
//!
//! Works against OpenAI, DeepSeek, or any endpoint speaking the same
//! `/chat/completions` protocol. The model answers with a JSON object:
//! `{"action", "symbol", "percentage", "reasoning"}`.

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::{TradeDirection, TradeIntent};
use crate::error::{ArenaError, Result};

use super::traits::{DecisionContext, DecisionProvider};

const DEFAULT_PERCENTAGE: f64 = 0.03;

const SYSTEM_PROMPT: &str = r#"You are an expert cryptocurrency trader. Analyze the market data and make a trading decision.

Respond ONLY with valid JSON in this exact format:
{
    "action": "buy" or "sell" or "short" or "cover" or "hold",
    "symbol": one of the symbols listed in the market data,
    "percentage": 0.02 to 0.5,
    "reasoning": "Brief explanation of your decision"
}

For buy and short, percentage is the fraction of total portfolio value to commit.
For sell and cover, percentage is the fraction of the current position to close.
You may only sell a long position you hold and only cover a short position you hold.
Use technical analysis, momentum, and risk management principles."#;

/// Chat endpoint settings
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmConfig {
    pub fn new(api_key: &str, base_url: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout_secs: 30,
            temperature: 0.7,
            max_tokens: 300,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// The model's reply
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LlmDecision {
    #[serde(default = "default_action")]
    pub action: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub percentage: Option<f64>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

fn default_action() -> String {
    "hold".to_string()
}

/// Parse a reply, tolerating markdown code fences around the JSON
pub fn parse_decision(reply: &str) -> Result<LlmDecision> {
    let text = reply.trim();
    let body = if let Some((_, rest)) = text.split_once("```json") {
        rest.split("```").next().unwrap_or(rest)
    } else if let Some((_, rest)) = text.split_once("```") {
        rest.split("```").next().unwrap_or(rest)
    } else {
        text
    };
    Ok(serde_json::from_str(body.trim())?)
}

/// Render the market summary the model sees
fn market_summary(ctx: &DecisionContext) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Current Portfolio Value: ${:.2}", ctx.portfolio_value);
    let _ = writeln!(out, "Available Cash: ${:.2}\n", ctx.cash_balance);

    if !ctx.positions.is_empty() {
        let _ = writeln!(out, "Current Positions:");
        let mut symbols: Vec<&String> = ctx.positions.keys().collect();
        symbols.sort();
        for symbol in symbols {
            let pos = &ctx.positions[symbol];
            let cost = pos.cost_basis().abs();
            let pnl = pos.unrealized_pnl();
            let pnl_pct = if cost.is_zero() {
                Decimal::ZERO
            } else {
                pnl / cost * dec!(100)
            };
            let side = if pos.is_short() { "SHORT" } else { "LONG" };
            let _ = writeln!(
                out,
                "  {} {}: {:.6} @ ${:.2} (P&L: ${:.2} / {:.2}%)",
                symbol,
                side,
                pos.quantity.abs(),
                pos.average_entry_price,
                pnl,
                pnl_pct
            );
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "Market Data:");
    for quote in ctx.quotes.quotes() {
        let _ = writeln!(out, "\n{}:", quote.symbol);
        let _ = writeln!(out, "  Price: ${:.2}", quote.price);
        let _ = writeln!(out, "  Bid/Ask: ${:.2} / ${:.2}", quote.bid, quote.ask);
        let _ = writeln!(out, "  24h Change: {:.2}%", quote.change_percent_24h);
        let _ = writeln!(out, "  24h High: ${:.2}", quote.high_24h);
        let _ = writeln!(out, "  24h Low: ${:.2}", quote.low_24h);
    }
    out
}

/// Turn a parsed decision into an intent, or a reason for holding
pub fn decision_to_intent(
    decision: &LlmDecision,
    ctx: &DecisionContext,
) -> std::result::Result<TradeIntent, String> {
    let reasoning = decision
        .reasoning
        .clone()
        .unwrap_or_else(|| "No reasoning provided".to_string());

    let action = decision.action.trim().to_ascii_lowercase();
    if action == "hold" {
        return Err(reasoning);
    }
    let direction: TradeDirection = action.parse()?;

    let symbol = decision
        .symbol
        .as_deref()
        .ok_or_else(|| "No symbol in decision".to_string())?;
    let quote = ctx
        .quotes
        .get(symbol)
        .ok_or_else(|| format!("Symbol {} not found in market data", symbol))?;

    let fraction = decision
        .percentage
        .filter(|p| p.is_finite() && *p > 0.0)
        .unwrap_or(DEFAULT_PERCENTAGE)
        .min(1.0);
    let fraction = Decimal::from_f64(fraction).unwrap_or(dec!(0.03));

    let (quantity, price) = match direction {
        TradeDirection::OpenLong => {
            let trade_value = ctx.portfolio_value * fraction;
            if trade_value > ctx.cash_balance {
                return Err("Insufficient cash for buy order".to_string());
            }
            (trade_value / quote.ask, quote.ask)
        }
        TradeDirection::OpenShort => (ctx.portfolio_value * fraction / quote.bid, quote.bid),
        TradeDirection::CloseLong => match ctx.position(symbol) {
            Some(pos) if pos.is_long() => (pos.quantity * fraction, quote.bid),
            _ => return Err(format!("No long position in {} to sell", symbol)),
        },
        TradeDirection::CloseShort => match ctx.position(symbol) {
            Some(pos) if pos.is_short() => (pos.quantity.abs() * fraction, quote.ask),
            _ => return Err(format!("No short position in {} to cover", symbol)),
        },
    };

    let quantity = quantity.round_dp_with_strategy(8, RoundingStrategy::ToZero);
    if quantity <= Decimal::ZERO {
        return Err("Computed quantity too small to trade".to_string());
    }
    Ok(TradeIntent::new(symbol, direction, quantity, price, reasoning))
}

/// Chat-model backed agent
pub struct LlmAgent {
    id: String,
    name: String,
    kind: String,
    config: LlmConfig,
    http: Client,
    last_reasoning: String,
}

impl LlmAgent {
    pub fn new(id: &str, name: &str, kind: &str, config: LlmConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ArenaError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: kind.to_string(),
            config,
            http,
            last_reasoning: String::new(),
        })
    }

    async fn chat(&self, prompt: String) -> Result<String> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(agent = %self.name, %status, "chat API error");
            return Err(self.failure(format!("chat API error: {} - {}", status, body)));
        }

        let reply: ChatResponse = response.json().await?;
        let content = reply
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        debug!(agent = %self.name, chars = content.len(), "chat response received");
        Ok(content)
    }

    fn failure(&self, reason: String) -> ArenaError {
        ArenaError::DecisionFailed {
            agent_id: self.id.clone(),
            reason,
        }
    }
}

#[async_trait]
impl DecisionProvider for LlmAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        &self.kind
    }

    async fn decide(&mut self, ctx: &DecisionContext) -> Result<Option<TradeIntent>> {
        if !self.config.is_configured() {
            self.last_reasoning = "API key not configured - skipping decision".to_string();
            return Ok(None);
        }

        let reply = match self.chat(market_summary(ctx)).await {
            Ok(reply) => reply,
            Err(e) => {
                self.last_reasoning = format!("Error calling chat API: {}", e);
                return Err(e);
            }
        };

        let decision = match parse_decision(&reply) {
            Ok(decision) => decision,
            Err(e) => {
                self.last_reasoning = format!("Unparseable reply: {}", e);
                return Err(self.failure(format!("unparseable reply: {}", e)));
            }
        };

        match decision_to_intent(&decision, ctx) {
            Ok(intent) => {
                self.last_reasoning = intent.reasoning.clone();
                Ok(Some(intent))
            }
            Err(reason) => {
                self.last_reasoning = reason;
                Ok(None)
            }
        }
    }

    fn reasoning(&self) -> String {
        self.last_reasoning.clone()
    }
}
