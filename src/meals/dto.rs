use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::analysis::dto::NutritionInfo;

/// A finalized meal, as sent to `POST /meals`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealRecord {
    pub user_id: Uuid,
    pub meal_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<NutritionInfo>,
    #[serde(default)]
    pub food_items: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

/// What the server stored. Its shape is server-defined, so only the id is
/// pulled out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggedMeal {
    pub id: Option<String>,
    pub record: serde_json::Value,
}

impl LoggedMeal {
    pub fn from_server(record: serde_json::Value) -> Self {
        let id = match record.get("id") {
            Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(n @ serde_json::Value::Number(_)) => Some(n.to_string()),
            _ => None,
        };
        Self { id, record }
    }
}
