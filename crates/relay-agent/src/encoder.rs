//! Response encoder.
//!
//! Applies the outcome → response mapping. Which failure the engine raises
//! is the engine's business; this module only translates it.

use relay_protocol::{Response, SuccessPayload};

use crate::dispatcher::{Outcome, Reply};
use crate::engine::EngineError;

/// The response frame for `outcome`, or `None` when nothing is written.
pub fn response_for(outcome: Outcome) -> Option<Response> {
    let response = match outcome {
        Ok(Reply::Silent) => return None,
        Ok(Reply::Empty) => Response::Success(SuccessPayload::Empty),
        Ok(Reply::Text(text)) => Response::Success(SuccessPayload::Text(text)),
        Ok(Reply::Opaque(value)) => Response::Success(SuccessPayload::Opaque(value)),
        Err(error) => failure_response(error),
    };
    Some(response)
}

/// The response frame reporting `error`.
pub fn failure_response(error: EngineError) -> Response {
    match error {
        EngineError::Terminated { message } => Response::Terminated {
            message: Some(message),
        },
        EngineError::Unclassified { message } => Response::Terminated { message },
        EngineError::NotImplemented { message } => Response::NotImplemented { message },
        EngineError::Internal { message } => Response::InternalProblem { message },
        EngineError::ClassInstall { message, installed } => {
            Response::ClassInstallException { message, installed }
        }
        EngineError::User {
            message,
            cause_class,
            stack,
        } => Response::UserException {
            message,
            cause_class,
            stack,
        },
        EngineError::Resolution { id, stack } => Response::Corralled { id, stack },
        EngineError::Stopped => Response::Stopped,
    }
}
