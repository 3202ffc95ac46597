//! Rendering of compilation outcomes for the HTTP action API
//!
//! Failures become an HTTP status plus `{"error": {"code", "message", "name"}}`;
//! successes become `{"result": ...}`. Offline jobs persist the same shapes
//! as their result record.

use serde::{Deserialize, Serialize};

use crate::compiler::error::{CompileError, CompileResult, HttpError};
use crate::compiler::CompileReport;

/// Error payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Five-digit error code
    pub code: u32,
    /// Human-readable detail
    pub message: String,
    /// Error kind name
    pub name: String,
}

impl From<&HttpError> for ErrorBody {
    fn from(err: &HttpError) -> Self {
        Self {
            code: err.code(),
            message: err.message().to_string(),
            name: err.name().to_string(),
        }
    }
}

/// `{"error": ...}` envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Error payload
    pub error: ErrorBody,
}

/// `{"result": ...}` envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEnvelope<T> {
    /// Action result
    pub result: T,
}

/// Status and body of a failed action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    /// HTTP status
    pub status: u16,
    /// JSON body
    pub body: ErrorEnvelope,
}

impl ErrorResponse {
    /// Render a classified error
    pub fn from_http(err: &HttpError) -> Self {
        Self {
            status: err.status(),
            body: ErrorEnvelope { error: err.into() },
        }
    }

    /// Body as JSON text
    pub fn to_json(&self) -> String {
        // A struct of strings and integers always serializes.
        serde_json::to_string(&self.body).unwrap_or_default()
    }
}

impl From<HttpError> for ErrorResponse {
    fn from(err: HttpError) -> Self {
        Self::from_http(&err)
    }
}

impl From<CompileError> for ErrorResponse {
    fn from(err: CompileError) -> Self {
        Self::from_http(&err.into_http())
    }
}

/// Render a successful action result
pub fn success<T: Serialize>(result: T) -> (u16, ResultEnvelope<T>) {
    (200, ResultEnvelope { result })
}

/// Result record persisted for an offline compilation job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum JobRecord {
    /// Every resource compiled
    Completed {
        /// Run report
        report: CompileReport,
    },
    /// The run stopped at its first failure
    Failed {
        /// HTTP status the failure maps to
        status: u16,
        /// Classified failure
        error: ErrorBody,
    },
}

impl From<CompileResult<CompileReport>> for JobRecord {
    fn from(outcome: CompileResult<CompileReport>) -> Self {
        match outcome {
            Ok(report) => JobRecord::Completed { report },
            Err(err) => {
                let err = err.into_http();
                JobRecord::Failed {
                    status: err.status(),
                    error: ErrorBody::from(&err),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn test_error_response_body() {
        let response = ErrorResponse::from(HttpError::action_handler_not_found("no route /x"));
        assert_eq!(response.status, 404);
        let body: serde_json::Value = serde_json::from_str(&response.to_json()).unwrap();
        assert_eq!(
            body,
            json!({"error": {"code": 40401, "message": "no route /x", "name": "ActionHandlerNotFoundError"}})
        );
    }

    #[test]
    fn test_io_failure_renders_as_internal() {
        let err = CompileError::Write {
            path: PathBuf::from("/ro/nginx.sls"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
        };
        let response = ErrorResponse::from(err);
        assert_eq!(response.status, 500);
        assert_eq!(response.body.error.code, 50000);
        assert_eq!(response.body.error.name, "InternalServerError");
    }

    #[test]
    fn test_success_envelope() {
        let (status, body) = success("states-20261017");
        assert_eq!(status, 200);
        assert_eq!(serde_json::to_value(body).unwrap(), json!({"result": "states-20261017"}));
    }

    #[test]
    fn test_failed_job_record() {
        let outcome: CompileResult<CompileReport> =
            Err(HttpError::unsupported_type("bogus").into());
        let record = JobRecord::from(outcome);
        assert_eq!(
            serde_json::to_value(record).unwrap(),
            json!({"state": "failed", "status": 415, "error": {
                "code": 41500, "message": "bogus", "name": "UnsupportedTypeError"
            }})
        );
    }
}
