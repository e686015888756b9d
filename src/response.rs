use actix_web::HttpResponse;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::diagnostic::DiagnosticRecord;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Body sent back for a classified compile or link failure.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorPayload {
    pub code: String,
    pub error: DiagnosticRecord,
}

/// Interpreted result of one job.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Runtime helper output, returned as-is.
    Success(Map<String, Value>),
    Failure(ErrorPayload),
    /// Neither a known diagnostic nor a JSON object.
    Unknown,
    /// Raw capture, returned when tracing.
    Trace(String),
}

impl Outcome {
    pub fn into_response(self) -> HttpResponse {
        match self {
            Outcome::Success(payload) => HttpResponse::Ok().json(payload),
            Outcome::Failure(payload) => HttpResponse::BadRequest().json(payload),
            Outcome::Unknown => HttpResponse::BadRequest().json(MessageResponse::new("unknown_error")),
            Outcome::Trace(raw) => HttpResponse::Ok().json(raw),
        }
    }
}

pub fn bad_request(message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(MessageResponse::new(message))
}

pub fn invalid_input() -> HttpResponse {
    bad_request("invalid_input")
}

pub fn timeout() -> HttpResponse {
    HttpResponse::GatewayTimeout().json(MessageResponse::new("timeout"))
}

pub fn internal_error() -> HttpResponse {
    HttpResponse::InternalServerError().json(MessageResponse::new("internal_error"))
}
