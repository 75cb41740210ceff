//! Loose upstream JSON in, strict [`AnalysisResult`] out.
//!
//! Nothing here touches the network, so the coercion rules can be checked in
//! isolation from the retry loop.

use serde_json::{Map, Value};

use super::dto::{AnalysisResult, FoodItem, NutritionInfo};
use crate::error::{ClientError, ClientResult};

/// Parses a 2xx body. Anything but a JSON object is an invalid response.
pub fn parse_payload(body: &[u8]) -> ClientResult<Map<String, Value>> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ClientError::InvalidResponse(format!("malformed JSON: {e}")))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ClientError::InvalidResponse(format!(
            "expected a JSON object, got {}",
            kind(&other)
        ))),
    }
}

/// Total over every object: missing or malformed fields fall back to empty,
/// `false`, `0` or `None`.
pub fn normalize(payload: &Map<String, Value>) -> AnalysisResult {
    let food_items = match payload.get("identified_foods") {
        Some(Value::Array(items)) => items.iter().map(food_item).collect(),
        _ => Vec::new(),
    };
    let advice = payload
        .get("advice")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned);
    let nutrition = payload.get("nutrition").and_then(nutrition_info);
    let processing_time = payload
        .get("processing_time")
        .and_then(number)
        .unwrap_or(0.0);

    AnalysisResult {
        food_items,
        has_advice: advice.is_some(),
        has_nutrition: nutrition.is_some(),
        processing_time,
        advice,
        nutrition,
    }
}

fn food_item(raw: &Value) -> FoodItem {
    match raw {
        Value::String(s) => FoodItem::named(s.clone()),
        Value::Object(m) => {
            let name = match m.get("name") {
                Some(Value::String(s)) if !s.is_empty() => s.clone(),
                Some(v @ Value::Number(_)) if is_truthy(v) => v.to_string(),
                _ => raw.to_string(),
            };
            FoodItem {
                name,
                nutrition: m.get("nutrition").and_then(nutrition_info),
            }
        }
        other => FoodItem::named(other.to_string()),
    }
}

fn nutrition_info(raw: &Value) -> Option<NutritionInfo> {
    let m = raw.as_object()?;
    let field = |k: &str| m.get(k).and_then(number);
    Some(NutritionInfo {
        calories: field("calories").unwrap_or(0.0),
        protein: field("protein").unwrap_or(0.0),
        carbs: field("carbs").unwrap_or(0.0),
        fat: field("fat").unwrap_or(0.0),
        fiber: field("fiber"),
        sugar: field("sugar"),
        sodium: field("sodium"),
    })
}

// Numbers sometimes arrive as strings ("12.5").
fn number(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn norm(v: Value) -> AnalysisResult {
        normalize(v.as_object().expect("object"))
    }

    #[test]
    fn empty_payload_maps_to_safe_defaults() {
        let r = norm(json!({}));
        assert!(r.food_items.is_empty());
        assert!(!r.has_advice);
        assert!(!r.has_nutrition);
        assert_eq!(r.processing_time, 0.0);
        assert_eq!(r.advice, None);
        assert_eq!(r.nutrition, None);
    }

    #[test]
    fn non_array_identified_foods_becomes_empty() {
        for v in [json!(null), json!("rice"), json!({"name": "rice"}), json!(3)] {
            let r = norm(json!({ "identified_foods": v }));
            assert!(r.food_items.is_empty());
        }
    }

    #[test]
    fn empty_or_missing_advice_is_no_advice() {
        assert!(!norm(json!({ "advice": "" })).has_advice);
        assert!(!norm(json!({ "advice": null })).has_advice);
        assert!(!norm(json!({ "advice": 12 })).has_advice);

        let r = norm(json!({ "advice": "Add some greens." }));
        assert!(r.has_advice);
        assert_eq!(r.advice.as_deref(), Some("Add some greens."));
    }

    #[test]
    fn full_payload() {
        let r = norm(json!({
            "identified_foods": [
                {
                    "name": "grilled chicken",
                    "confidence": 0.92,
                    "portion_size": "1 breast",
                    "weight_grams": 170,
                    "nutrition": { "calories": 280, "protein": 53, "carbs": 0, "fat": 6.1, "sodium": 120 }
                },
                { "name": "rice" }
            ],
            "advice": "Balanced plate.",
            "nutrition": { "calories": 480 },
            "processing_time": 3.25
        }));
        assert_eq!(r.food_items.len(), 2);
        assert_eq!(r.food_items[0].name, "grilled chicken");
        let n = r.food_items[0].nutrition.as_ref().unwrap();
        assert_eq!(n.calories, 280.0);
        assert_eq!(n.fat, 6.1);
        assert_eq!(n.sodium, Some(120.0));
        assert_eq!(n.fiber, None);
        assert_eq!(r.food_items[1], FoodItem::named("rice"));
        assert!(r.has_nutrition);
        assert!(r.has_advice);
        assert_eq!(r.processing_time, 3.25);
    }

    #[test]
    fn malformed_entries_keep_raw_value_as_name() {
        let r = norm(json!({
            "identified_foods": ["apple", 42, { "weight_grams": 10 }, { "name": "" }, null]
        }));
        let names: Vec<_> = r.food_items.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            ["apple", "42", r#"{"weight_grams":10}"#, r#"{"name":""}"#, "null"]
        );
    }

    #[test]
    fn nutrition_flag_tracks_the_totals_object() {
        for v in [json!(null), json!(false), json!(true), json!("420 kcal")] {
            let r = norm(json!({ "nutrition": v }));
            assert!(!r.has_nutrition);
            assert_eq!(r.nutrition, None);
        }
        let r = norm(json!({ "nutrition": {} }));
        assert!(r.has_nutrition);
        assert_eq!(r.nutrition, Some(NutritionInfo::default()));
    }

    #[test]
    fn meal_totals_are_kept() {
        let r = norm(json!({
            "identified_foods": [{ "name": "pasta" }],
            "nutrition": { "calories": 420, "protein": 14, "carbs": 80, "fat": 5, "fiber": 6 }
        }));
        assert!(r.has_nutrition);
        let n = r.nutrition.unwrap();
        assert_eq!(n.calories, 420.0);
        assert_eq!(n.fiber, Some(6.0));
        assert_eq!(n.sugar, None);
    }

    #[test]
    fn processing_time_accepts_numeric_strings_only() {
        assert_eq!(norm(json!({ "processing_time": "1.5" })).processing_time, 1.5);
        assert_eq!(norm(json!({ "processing_time": "slow" })).processing_time, 0.0);
        assert_eq!(norm(json!({ "processing_time": [1] })).processing_time, 0.0);
    }

    #[test]
    fn partial_item_nutrition_defaults_required_fields() {
        let r = norm(json!({
            "identified_foods": [{ "name": "toast", "nutrition": { "calories": "90" } }]
        }));
        let n = r.food_items[0].nutrition.clone().unwrap();
        assert_eq!(
            n,
            NutritionInfo {
                calories: 90.0,
                ..NutritionInfo::default()
            }
        );
    }

    #[test]
    fn parse_payload_rejects_non_objects() {
        assert!(matches!(
            parse_payload(b"<html>502</html>"),
            Err(ClientError::InvalidResponse(_))
        ));
        let err = parse_payload(b"[1,2]").unwrap_err();
        assert!(err.to_string().contains("an array"));
        assert!(parse_payload(br#"{"advice":"ok"}"#).is_ok());
    }
}
