use std::fmt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct AskRequest {
    #[serde(rename = "text")]
    pub content: String,
}

impl AskRequest {
    pub fn new(content: impl Into<String>) -> Self {
        AskRequest {
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct AskResult {
    #[serde(default)]
    pub keyword: Vec<String>,
    pub answer: String,
}

/// A keyword and its share of recent questions.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RankingItem {
    pub keyword: String,
    pub percentage: Percentage,
}

/// The backend sends `"72%"`, but plain numbers are accepted too.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Percentage {
    Number(f64),
    Text(String),
}

impl Percentage {
    /// Whole-number percentage clamped to 0..=100. Unreadable text counts as 0.
    pub fn value(&self) -> u8 {
        let raw = match self {
            Percentage::Number(n) if n.is_finite() => n.trunc() as i64,
            Percentage::Number(_) => 0,
            Percentage::Text(text) => leading_integer(&text.replace('%', "")),
        };
        raw.clamp(0, 100) as u8
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.value())
    }
}

fn leading_integer(text: &str) -> i64 {
    let text = text.trim_start();
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, text.strip_prefix('+').unwrap_or(text)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let digits = &digits[..end];
    if digits.is_empty() {
        return 0;
    }
    // Only overflow can fail here; saturate like a float parse would
    digits.parse::<i64>().map(|n| sign * n).unwrap_or(sign * i64::MAX)
}
