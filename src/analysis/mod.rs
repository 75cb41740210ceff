pub mod dto;
pub mod normalize;
pub mod retry;
pub mod services;

pub use dto::{AnalysisResult, FoodItem, NutritionInfo, UserProfile};
pub use services::{analyze_meal, AnalysisImage};
