//! Tollgate - Per-client Fixed-Window Rate Limiting
//!
//! This crate implements a fixed-window request-rate limiter for HTTP
//! services. Each client gets a counter in a shared store; once a client
//! exceeds its quota within the current window, further requests are
//! rejected until the window rolls over.

pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
