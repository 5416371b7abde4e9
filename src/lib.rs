//! Fetch RSS 2.0 feeds and present their items per channel.
//!
//! [`feed`] holds the pipeline from URL to normalized, grouped items;
//! [`output`] renders the result for a terminal or as a JSON file.

pub mod config;
pub mod feed;
pub mod output;
pub mod util;
