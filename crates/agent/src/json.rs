//! Parsing for model replies that are supposed to be JSON arrays. Small
//! models wrap JSON in prose often enough that a single recovery pass
//! (slice from the first `[` to the last `]`) is worth carrying.

use serde::Deserialize;

/// One product pick from an occasion or season ranking reply.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RankedPick {
    pub product_id: String,
    #[serde(default, alias = "suitability_score", alias = "seasonal_score")]
    pub score: Option<f64>,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl RankedPick {
    /// Missing scores fall back to a neutral midpoint.
    pub fn score_or_default(&self) -> f64 {
        self.score.unwrap_or(0.5)
    }
}

/// Slice the first `[` .. last `]` span out of a reply, if any.
pub fn extract_json_array(reply: &str) -> Option<&str> {
    let start = reply.find('[')?;
    let end = reply.rfind(']')?;
    if end <= start {
        return None;
    }
    Some(&reply[start..=end])
}

/// Parse a reply as an array of picks: direct parse first, then one
/// recovery attempt on the extracted array span.
pub fn parse_ranked_picks(reply: &str) -> Option<Vec<RankedPick>> {
    if let Ok(picks) = serde_json::from_str::<Vec<RankedPick>>(reply.trim()) {
        return Some(picks);
    }
    let recovered = extract_json_array(reply)?;
    serde_json::from_str::<Vec<RankedPick>>(recovered).ok()
}
