//! Google API module
//!
//! OAuth handling plus thin clients for Gmail search and Calendar events.

pub mod auth;
pub mod calendar;
pub mod gmail;
pub mod message;
pub mod query;
pub mod types;
