//! Client side of the meal-analysis pipeline: prepare a photo, have the
//! remote service analyze it, and log the finished meal.

pub mod analysis;
pub mod auth;
pub mod config;
pub mod error;
pub mod images;
pub mod meals;
pub mod state;
pub mod transport;

pub use error::{ClientError, ClientResult};
pub use state::ClientState;
