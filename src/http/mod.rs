//! HTTP client module
//!
//! Provides the HTTP client used by the built-in runner.

mod client;

pub use client::{HttpClient, HttpError, HttpRequest, HttpResponse};
