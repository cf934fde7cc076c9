//! event_relay integration tests.

mod concurrency;
mod pull;
mod round_trip;
mod routing;

#[cfg(feature = "http")]
mod push_http;
