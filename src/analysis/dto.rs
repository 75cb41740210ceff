use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionInfo {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiber: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sugar: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sodium: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<NutritionInfo>,
}

impl FoodItem {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nutrition: None,
        }
    }
}

/// Normalized outcome of one analysis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub food_items: Vec<FoodItem>,
    pub has_advice: bool,
    pub has_nutrition: bool,
    pub processing_time: f64,
    pub advice: Option<String>,
    /// Meal totals reported by the service; `has_nutrition` mirrors its presence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<NutritionInfo>,
}

/// Hints sent alongside the image as the `profile` multipart field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: Uuid,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    #[serde(default)]
    pub health_conditions: Vec<String>,
}

impl UserProfile {
    pub fn for_user(user_id: Uuid) -> Self {
        Self {
            user_id,
            dietary_restrictions: Vec::new(),
            health_conditions: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JsonAnalysisRequest<'a> {
    pub image: &'a str,
}
