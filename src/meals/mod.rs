pub mod dto;
pub mod services;

pub use dto::{LoggedMeal, MealRecord};
pub use services::log_meal;
