//! Scripted call transcript
//!
//! Plays a customer-service conversation one line per tick, then closes the
//! stream with a call summary.

use serde::Serialize;
use serde_json::Value;

use crate::hub::{Cursor, EventGenerator, Generated, Payload};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

/// One line of the script
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptEntry {
    pub speaker: &'static str,
    pub text: &'static str,
    pub sentiment: Sentiment,
}

impl TranscriptEntry {
    const fn new(speaker: &'static str, text: &'static str, sentiment: Sentiment) -> Self {
        Self {
            speaker,
            text,
            sentiment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentimentBreakdown {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
    pub overall: &'static str,
}

impl SentimentBreakdown {
    fn of(script: &[TranscriptEntry]) -> Self {
        let count = |s: Sentiment| script.iter().filter(|e| e.sentiment == s).count();
        let positive = count(Sentiment::Positive);
        let neutral = count(Sentiment::Neutral);
        let negative = count(Sentiment::Negative);

        let overall = if positive > negative {
            "Positive"
        } else if negative > positive {
            "Negative"
        } else {
            "Neutral"
        };

        Self {
            positive,
            neutral,
            negative,
            overall,
        }
    }
}

/// Terminal payload sent once the script is exhausted
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSummary {
    pub duration: &'static str,
    pub total_messages: usize,
    pub resolution: &'static str,
    pub customer_satisfaction: &'static str,
    pub key_points: Vec<&'static str>,
    pub sentiment_analysis: SentimentBreakdown,
    pub next_actions: Vec<&'static str>,
}

const SCRIPT: [TranscriptEntry; 12] = [
    TranscriptEntry::new("Agent", "Hello, welcome to our customer service. How can I help you today?", Sentiment::Positive),
    TranscriptEntry::new("Customer", "Hi, I'm having trouble with my recent order. It hasn't arrived yet.", Sentiment::Negative),
    TranscriptEntry::new("Agent", "I'm sorry to hear that. Let me look up your order details right away.", Sentiment::Neutral),
    TranscriptEntry::new("Customer", "Thank you, I really appreciate your help with this.", Sentiment::Positive),
    TranscriptEntry::new("Agent", "I found your order. It looks like there was a delay in shipping.", Sentiment::Neutral),
    TranscriptEntry::new("Customer", "That's frustrating. When will it actually arrive?", Sentiment::Negative),
    TranscriptEntry::new("Agent", "I can see it's now out for delivery and should arrive today by 6 PM.", Sentiment::Positive),
    TranscriptEntry::new("Customer", "Oh wonderful! That's much better than I expected.", Sentiment::Positive),
    TranscriptEntry::new("Agent", "I'm also adding a discount to your account for the inconvenience.", Sentiment::Positive),
    TranscriptEntry::new("Customer", "You've been incredibly helpful. Thank you so much!", Sentiment::Positive),
    TranscriptEntry::new("Agent", "My pleasure! Is there anything else I can help you with today?", Sentiment::Positive),
    TranscriptEntry::new("Customer", "No, that covers everything. Have a great day!", Sentiment::Positive),
];

/// Plays a fixed script, then emits a terminal `summary`
#[derive(Debug, Clone)]
pub struct TranscriptGenerator {
    script: Vec<TranscriptEntry>,
    summary: Value,
}

impl TranscriptGenerator {
    /// Build a generator for `script`, summarized by `summary`
    ///
    /// `total_messages` and `sentiment_analysis` are recomputed from the script.
    pub fn new(script: Vec<TranscriptEntry>, mut summary: CallSummary) -> Self {
        summary.total_messages = script.len();
        summary.sentiment_analysis = SentimentBreakdown::of(&script);

        let summary = serde_json::to_value(&summary).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to encode call summary");
            Value::Null
        });

        Self { script, summary }
    }

    pub fn script(&self) -> &[TranscriptEntry] {
        &self.script
    }
}

impl Default for TranscriptGenerator {
    fn default() -> Self {
        let script = SCRIPT.to_vec();
        let summary = CallSummary {
            duration: "8 minutes 45 seconds",
            total_messages: 0,
            resolution: "Order delivery issue resolved successfully",
            customer_satisfaction: "High",
            key_points: vec![
                "Customer reported delayed order delivery",
                "Agent located order and identified shipping delay",
                "Order confirmed for same-day delivery by 6 PM",
                "Discount applied to customer account for inconvenience",
                "Customer expressed satisfaction with resolution",
            ],
            sentiment_analysis: SentimentBreakdown::of(&[]),
            next_actions: vec![
                "Monitor delivery completion",
                "Follow up with customer if needed",
            ],
        };

        Self::new(script, summary)
    }
}

impl EventGenerator for TranscriptGenerator {
    fn name(&self) -> &'static str {
        "transcript"
    }

    fn next(&self, _stream_id: &str, cursor: Cursor) -> Generated {
        let position = cursor.position();

        match usize::try_from(position).ok().and_then(|i| self.script.get(i)) {
            Some(entry) => {
                let payload = Payload::new("transcript")
                    .field("id", position + 1)
                    .field("speaker", entry.speaker)
                    .field("text", entry.text)
                    .field("sentiment", serde_json::to_value(entry.sentiment).unwrap_or(Value::Null));
                Generated::next(payload, cursor.advance())
            }
            None => {
                let payload = Payload::new("summary").field("summary", self.summary.clone());
                Generated::terminal(payload, cursor.advance())
            }
        }
    }
}
