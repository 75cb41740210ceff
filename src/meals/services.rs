use time::OffsetDateTime;
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::dto::{LoggedMeal, MealRecord};
use crate::analysis::dto::{AnalysisResult, NutritionInfo};
use crate::auth::{require_user, AuthUser};
use crate::error::{ClientError, ClientResult};
use crate::state::ClientState;
use crate::transport::{ApiRequest, RequestBody};

pub const MEALS_PATH: &str = "/meals";

/// Persists one meal. Single attempt under the client deadline; retrying is
/// the caller's call.
#[instrument(skip_all, fields(user_id = %record.user_id, meal_name = %record.meal_name))]
pub async fn log_meal(
    state: &ClientState,
    user: Option<&AuthUser>,
    record: &MealRecord,
) -> ClientResult<LoggedMeal> {
    let user = require_user(user)?;
    if user.id != record.user_id {
        return Err(ClientError::precondition("meal belongs to a different user"));
    }
    if record.meal_name.trim().is_empty() {
        return Err(ClientError::precondition("meal name is empty"));
    }

    let body = serde_json::to_value(record)
        .map_err(|e| ClientError::precondition(format!("meal not serializable: {e}")))?;
    let request = ApiRequest {
        path: MEALS_PATH,
        body: RequestBody::Json(body),
        authorization: user.bearer(),
    };

    let deadline = state.config.request_timeout;
    let res = match tokio::time::timeout(deadline, state.transport.post(request)).await {
        Err(_) => {
            error!(timeout_secs = deadline.as_secs_f64(), "meal logging deadline exceeded");
            return Err(ClientError::Timeout(deadline));
        }
        Ok(Err(e)) => {
            error!(error = %e, "meal logging request failed");
            return Err(ClientError::LogFailed {
                status: None,
                message: format!("{e:#}"),
            });
        }
        Ok(Ok(res)) => res,
    };

    if !res.is_success() {
        let message = res.text();
        error!(status = res.status, body = %message, "meal logging rejected");
        return Err(ClientError::LogFailed {
            status: Some(res.status),
            message,
        });
    }

    let stored: serde_json::Value = serde_json::from_slice(&res.body)
        .map_err(|e| ClientError::InvalidResponse(format!("malformed JSON: {e}")))?;
    let logged = LoggedMeal::from_server(stored);
    info!(status = res.status, id = ?logged.id, "meal logged");
    Ok(logged)
}

impl MealRecord {
    /// Starting point for the log form once an analysis came back: named
    /// after the first three foods. Nutrition comes from the service's meal
    /// totals, or from summing per-item nutrition when it sent none.
    pub fn draft_from_analysis(
        user_id: Uuid,
        analysis: &AnalysisResult,
        timestamp: OffsetDateTime,
    ) -> Self {
        let food_items: Vec<String> = analysis
            .food_items
            .iter()
            .map(|f| f.name.clone())
            .collect();
        let meal_name = if food_items.is_empty() {
            "Meal".to_string()
        } else {
            food_items
                .iter()
                .take(3)
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        };

        Self {
            user_id,
            meal_name,
            timestamp,
            image_url: None,
            audio_url: None,
            nutrition: analysis
                .nutrition
                .clone()
                .or_else(|| total_nutrition(analysis)),
            food_items,
            notes: analysis.advice.clone().unwrap_or_default(),
        }
    }
}

fn total_nutrition(analysis: &AnalysisResult) -> Option<NutritionInfo> {
    let mut items = analysis.food_items.iter().filter_map(|f| f.nutrition.as_ref()).peekable();
    items.peek()?;

    let add = |a: Option<f64>, b: Option<f64>| match (a, b) {
        (None, None) => None,
        (a, b) => Some(a.unwrap_or(0.0) + b.unwrap_or(0.0)),
    };
    Some(items.fold(NutritionInfo::default(), |acc, n| NutritionInfo {
        calories: acc.calories + n.calories,
        protein: acc.protein + n.protein,
        carbs: acc.carbs + n.carbs,
        fat: acc.fat + n.fat,
        fiber: add(acc.fiber, n.fiber),
        sugar: add(acc.sugar, n.sugar),
        sodium: add(acc.sodium, n.sodium),
    }))
}
