//! Presentation of grouped feed items.
//!
//! - [`console`] - plain-text listing for a terminal
//! - [`json`] - JSON export file, one record per channel

pub mod console;
pub mod json;

pub use console::render_text;
pub use json::{export_json, render_json, ExportError};
