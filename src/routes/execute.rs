use std::sync::Arc;
use std::time::Duration;

use actix_web::{HttpResponse, web};

use crate::diagnostic::Interpreter;
use crate::engine::{Engine, JOB_NAME, result_channel};
use crate::response::{bad_request, internal_error, invalid_input, timeout};
use crate::sanitize::validate;
use crate::task::{ExecRequest, TaskBuilder};

/// Per-server collaborators of the execute handler.
pub struct AppState {
    pub engine: Arc<dyn Engine>,
    pub builder: TaskBuilder,
    pub interpreter: Interpreter,
    /// How long a request waits for its job before answering 504
    pub request_timeout: Duration,
}

pub async fn execute_handler(
    state: web::Data<AppState>,
    body: web::Json<ExecRequest>,
) -> HttpResponse {
    let mut request = body.into_inner();
    request.input = request.input.trim().to_string();

    if !validate(&request.input) {
        log::debug!("invalid_input: \"{}\"", request.input);
        return invalid_input();
    }

    log::debug!("{}", request.code);

    let task = match state.builder.build(&request) {
        Ok(task) => task,
        Err(e) => return bad_request(e.to_string()),
    };

    let (listener, result) = result_channel();
    let job = match state.engine.submit(JOB_NAME, vec![task], listener) {
        Ok(job) => job,
        Err(e) => {
            log::error!("Failed to submit job: {e:#}");
            return bad_request(format!("error executing code: {e:#}"));
        }
    };
    log::debug!("job {} submitted", job.id);

    tokio::select! {
        received = result => match received {
            Ok(raw) => state.interpreter.interpret(&request.code, &raw).into_response(),
            Err(_) => {
                log::error!("job {} ended without reporting a result", job.id);
                internal_error()
            }
        },
        _ = tokio::time::sleep(state.request_timeout) => {
            log::warn!("job {} timed out after {:?}", job.id, state.request_timeout);
            timeout()
        }
    }
}
