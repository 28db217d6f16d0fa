//! HTTP gateway module
//!
//! Router, request handlers and the JSON error envelope.

pub mod handlers;
pub mod response;
pub mod server;
