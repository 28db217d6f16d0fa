//! Workspace Gateway Library
//!
//! A small HTTP gateway in front of an SMTP relay and the Gmail, Calendar and
//! OAuth endpoints of Google Workspace.

pub mod config;
pub mod error;
pub mod google;
pub mod http;
pub mod mail;

pub use config::Config;
pub use error::{GatewayError, Result};
