use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;
use tracing::debug;

type Handler = fn(&mut AppState, &Request) -> Option<serde_json::Value>;

const HANDLERS: [Handler; 11] = [
    handlers::core::try_handle,
    handlers::setup::try_handle,
    handlers::backup::try_handle,
    handlers::assignments::try_handle,
    handlers::submissions::try_handle,
    handlers::analytics::try_handle,
    handlers::passes::try_handle,
    handlers::timetable::try_handle,
    handlers::staff::try_handle,
    handlers::question_bank::try_handle,
    handlers::assistant::try_handle,
];

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    debug!(id = %req.id, method = %req.method, "dispatch");
    for handle in HANDLERS {
        if let Some(resp) = handle(state, &req) {
            return resp;
        }
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}
