mod execute;

pub use execute::{AppState, execute_handler};

use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{HttpRequest, HttpResponse};

use crate::response::MessageResponse;

pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = HttpResponse::BadRequest().json(MessageResponse::new(format!(
        "error binding request: {err}"
    )));
    InternalError::from_response(err, response).into()
}
