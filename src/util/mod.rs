//! Shared helpers.
//!
//! - **URL validation**: scheme checks and an optional private-network guard
//! - **Terminal text**: removal of control sequences from feed-provided text

mod terminal;
mod url_validator;

pub use terminal::strip_control_chars;
pub use url_validator::{validate_url, HostPolicy, UrlValidationError};
