//! SMTP mail module
//!
//! Address validation, the outgoing message template and the SMTP sender.

pub mod sender;
pub mod template;

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid"));

/// Validate an email address of the shape `local@domain.tld`
pub fn validate_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}
