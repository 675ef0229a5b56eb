#![deny(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

mod color;
pub mod error_codes;
mod json_ext;

pub use color::Colors;
pub use color::init as color_init;
pub use error_codes::ErrorCategory;
pub use json_ext::ValueExt;
