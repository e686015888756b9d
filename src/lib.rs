pub mod config;
pub mod diagnostic;
pub mod engine;
pub mod response;
pub mod routes;
pub mod sanitize;
pub mod task;
pub mod web_server;

pub fn create_timestamp() -> String {
    use chrono::{SecondsFormat, Utc};
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
