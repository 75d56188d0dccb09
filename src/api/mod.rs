//! HTTP transport for the NexusMods v1 API

mod client;

pub use client::{ApiClient, ApiError, DEFAULT_BASE_URL};
