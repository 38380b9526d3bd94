//! Types that are really the bedrock of the app.

pub mod image;
pub mod pin;
