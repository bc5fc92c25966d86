//! Translation of adapter failures into HTTP responses.
//!
//! | Failure                              | Outcome                          |
//! |--------------------------------------|----------------------------------|
//! | invalid encoding while building      | 400                              |
//! | body not received before the timeout | 408, plain text                  |
//! | body larger than the ceiling         | 413                              |
//! | client disconnect or transport loss  | abort, nothing is sent           |
//! | pipeline failure, handler failed too | 500, plain text, debug detail    |

use crate::{
    error::{BodyError, RequestError},
    failure::Failure,
    response::Response,
};

/// Body of the fallback 500 response outside debug mode.
pub const GENERIC_SERVER_ERROR: &str = "Internal Server Error";

/// What to do after a failure before the pipeline ran.
#[derive(Debug)]
pub enum Outcome {
    /// Send this response in place of the application's.
    Respond(Response),
    /// Abandon the request without sending anything.
    Abort(BodyError),
}

/// Map a body reception failure to its outcome.
#[must_use]
pub fn body_error(error: BodyError) -> Outcome {
    match error {
        BodyError::Timeout { limit } => {
            log::warn!("request timeout (upload too slow): limit={limit:?}");
            Outcome::Respond(Response::text(408, "408 Request Timeout (upload too slow)"))
        }
        BodyError::TooLarge { attempted, limit } => {
            log::warn!("payload too large: attempted={attempted}, limit={limit}");
            Outcome::Respond(Response::text(413, "413 Payload too large"))
        }
        BodyError::Aborted => Outcome::Abort(BodyError::Aborted),
        BodyError::Transport(error) => {
            log::warn!("transport failed while receiving body: error={error}");
            Outcome::Abort(BodyError::Transport(error))
        }
    }
}

/// Map a request construction failure to a 400 response.
#[must_use]
pub fn request_error(error: &RequestError) -> Response {
    log::warn!("bad request: status_code=400, error={error}");
    Response::text(400, "400 Bad Request")
}

/// Last-resort 500 response for a failure nobody else handled.
///
/// The body is the failure trace in debug mode and a fixed string otherwise.
/// Building it cannot fail.
#[must_use]
pub fn fallback_response(failure: &Failure, debug: bool) -> Response {
    let body = if debug {
        failure.trace()
    } else {
        GENERIC_SERVER_ERROR.to_owned()
    };
    Response::text(500, body)
}
