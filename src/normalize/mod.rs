//! Field-level cleanup shared by the dialect parsers.

mod date;
mod image;
mod text;

pub use date::{normalize_date, parse_date};
pub use image::pull_post_image_url;
pub use text::clean_text;
