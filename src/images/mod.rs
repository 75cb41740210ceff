pub mod services;

pub use services::{prepare_image, ImageSource, PreparedImage};
