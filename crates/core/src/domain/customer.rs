use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

/// A customer profile as stored in the catalog database.
///
/// Histories are ordered lists of free-text entries ("Electronics",
/// "Resistance Bands"); category affinity matches a product category
/// appearing within an entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub id: CustomerId,
    pub age: i64,
    pub gender: Option<String>,
    pub location: String,
    pub browsing_history: Vec<String>,
    pub purchase_history: Vec<String>,
    pub segment: String,
    pub avg_order_value: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CustomerProfile {
    /// Serializable view of the profile without storage timestamps, used
    /// when handing the profile to an LLM prompt.
    pub fn prompt_view(&self) -> serde_json::Value {
        serde_json::json!({
            "customer_id": self.id.0,
            "age": self.age,
            "gender": self.gender,
            "location": self.location,
            "browsing_history": self.browsing_history,
            "purchase_history": self.purchase_history,
            "customer_segment": self.segment,
            "avg_order_value": self.avg_order_value,
        })
    }
}
