//! Error taxonomy shared by the compiler and the action API
//!
//! Every failure is classified by a status family and a subcode. The numeric
//! error code is always `status * 100 + subcode`, so a code identifies both the
//! HTTP status a client sees and the precise cause. Leaf kinds are fixed
//! `(family, subcode)` pairs; family bases take an arbitrary subcode.
//!
//! | Family | Status | Leaf kinds (subcode) |
//! |---|---|---|
//! | Found | 302 | generic (0) |
//! | Bad Request | 400 | generic (0), invalid argument (1) |
//! | Not Found | 404 | generic (0) .. load-balancer property (9) |
//! | Request Timeout | 408 | generic (0) |
//! | Conflict | 409 | generic (0) .. job not cancelled (6) |
//! | Gone | 410 | generic (0), group gone (1) |
//! | Precondition Failed | 412 | generic (0), uploaded file corrupted (1) |
//! | Unsupported Media Type | 415 | generic (0) .. unsupported strategy type (2) |
//! | Range Not Satisfiable | 416 | generic (0), resource not enough (1) |
//! | Internal Server Error | 500 | generic (0) |
//! | Not Implemented | 501 | generic (0) |

use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Status family of an [`HttpError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Family {
    /// 302, reused as a non-fatal redirection signal
    Found,
    /// 400
    BadRequest,
    /// 404
    NotFound,
    /// 408
    RequestTimeout,
    /// 409
    Conflict,
    /// 410
    Gone,
    /// 412
    PreconditionFailed,
    /// 415
    UnsupportedMediaType,
    /// 416
    RangeNotSatisfiable,
    /// 500
    InternalServerError,
    /// 501
    NotImplemented,
}

impl Family {
    /// Every status family, ordered by status
    pub const ALL: [Family; 11] = [
        Family::Found,
        Family::BadRequest,
        Family::NotFound,
        Family::RequestTimeout,
        Family::Conflict,
        Family::Gone,
        Family::PreconditionFailed,
        Family::UnsupportedMediaType,
        Family::RangeNotSatisfiable,
        Family::InternalServerError,
        Family::NotImplemented,
    ];

    /// HTTP status code of this family
    pub const fn status(self) -> u16 {
        match self {
            Family::Found => 302,
            Family::BadRequest => 400,
            Family::NotFound => 404,
            Family::RequestTimeout => 408,
            Family::Conflict => 409,
            Family::Gone => 410,
            Family::PreconditionFailed => 412,
            Family::UnsupportedMediaType => 415,
            Family::RangeNotSatisfiable => 416,
            Family::InternalServerError => 500,
            Family::NotImplemented => 501,
        }
    }

    /// Name reported for errors built directly from the family base
    pub const fn name(self) -> &'static str {
        match self {
            Family::Found => "FoundRedirection",
            Family::BadRequest => "BadRequestError",
            Family::NotFound => "NotFoundError",
            Family::RequestTimeout => "RequestTimeoutError",
            Family::Conflict => "ConflictError",
            Family::Gone => "GoneError",
            Family::PreconditionFailed => "PreconditionFailedError",
            Family::UnsupportedMediaType => "UnsupportedTypeError",
            Family::RangeNotSatisfiable => "RequestedRangeNotSatisfiableError",
            Family::InternalServerError => "InternalServerError",
            Family::NotImplemented => "NotImplementedError",
        }
    }

    /// Look up the family for an HTTP status
    pub fn from_status(status: u16) -> Option<Family> {
        Family::ALL.into_iter().find(|family| family.status() == status)
    }
}

/// Arguments accepted by a family base constructor.
///
/// A bare message means subcode 0; a `(subcode, message)` pair selects the
/// subcode explicitly.
pub trait FamilyArgs {
    /// Split into `(subcode, message)`
    fn into_parts(self) -> (u16, String);
}

impl FamilyArgs for &str {
    fn into_parts(self) -> (u16, String) {
        (0, self.to_string())
    }
}

impl FamilyArgs for String {
    fn into_parts(self) -> (u16, String) {
        (0, self)
    }
}

impl<S: Into<String>> FamilyArgs for (u16, S) {
    fn into_parts(self) -> (u16, String) {
        (self.0, self.1.into())
    }
}

macro_rules! error_kinds {
    ($( $(#[$doc:meta])* $kind:ident => ($family:ident, $subcode:literal, $name:literal, $ctor:ident); )*) => {
        /// Closed set of concrete error kinds, each bound to one `(family, subcode)`
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum ErrorKind {
            $( $(#[$doc])* $kind, )*
        }

        impl ErrorKind {
            /// Every error kind, in declaration order
            pub const ALL: &'static [ErrorKind] = &[$(ErrorKind::$kind),*];

            /// Status family of this kind
            pub const fn family(self) -> Family {
                match self {
                    $(ErrorKind::$kind => Family::$family,)*
                }
            }

            /// Subcode within the family
            pub const fn subcode(self) -> u16 {
                match self {
                    $(ErrorKind::$kind => $subcode,)*
                }
            }

            /// Reported error name
            pub const fn name(self) -> &'static str {
                match self {
                    $(ErrorKind::$kind => $name,)*
                }
            }
        }

        impl HttpError {
            $(
                #[doc = concat!("Build a `", $name, "` with the given message")]
                pub fn $ctor(message: impl Into<String>) -> Self {
                    Self::from_kind(ErrorKind::$kind, message)
                }
            )*
        }
    };
}

error_kinds! {
    /// 30200
    Found => (Found, 0, "FoundRedirection", found);

    /// 40000
    BadRequest => (BadRequest, 0, "BadRequestError", bad_request);
    /// 40001
    InvalidArgument => (BadRequest, 1, "InvalidArgumentError", invalid_argument);

    /// 40400
    NotFound => (NotFound, 0, "NotFoundError", not_found);
    /// 40401: no handler for the requested action in the routing tree
    ActionHandlerNotFound => (NotFound, 1, "ActionHandlerNotFoundError", action_handler_not_found);
    /// 40402: the routed handler cannot be invoked
    ActionHandlerNotCallable => (NotFound, 2, "ActionHandlerNotCallableError", action_handler_not_callable);
    /// 40403
    GroupNotFound => (NotFound, 3, "GroupNotFoundError", group_not_found);
    /// 40404
    FileNotFound => (NotFound, 4, "FileNotFoundError", file_not_found);
    /// 40405
    PackageNotFound => (NotFound, 5, "PackageNotFoundError", package_not_found);
    /// 40406
    JobNotFound => (NotFound, 6, "JobNotFoundError", job_not_found);
    /// 40407
    JobDataNotFound => (NotFound, 7, "JobDataNotFoundError", job_data_not_found);
    /// 40408
    LoadBalancerIspNotFound => (NotFound, 8, "LoadBalancerIspNotFoundError", load_balancer_isp_not_found);
    /// 40409
    LoadBalancerPropertyNotFound => (NotFound, 9, "LoadBalancerPropertyNotFoundError", load_balancer_property_not_found);

    /// 40800
    RequestTimeout => (RequestTimeout, 0, "RequestTimeoutError", request_timeout);

    /// 40900
    Conflict => (Conflict, 0, "ConflictError", conflict);
    /// 40901
    OperationConflict => (Conflict, 1, "OperationConflictError", operation_conflict);
    /// 40902
    GroupAlreadyExist => (Conflict, 2, "GroupAlreadyExistError", group_already_exist);
    /// 40903
    FileAlreadyExist => (Conflict, 3, "FileAlreadyExistError", file_already_exist);
    /// 40904
    PackageAlreadyExist => (Conflict, 4, "PackageAlreadyExistError", package_already_exist);
    /// 40905
    JobAlreadyExecuted => (Conflict, 5, "JobAlreadyExecutedError", job_already_executed);
    /// 40906
    JobNotCancelled => (Conflict, 6, "JobNotCancelledError", job_not_cancelled);

    /// 41000
    Gone => (Gone, 0, "GoneError", gone);
    /// 41001
    GroupGone => (Gone, 1, "GroupGoneError", group_gone);

    /// 41200
    PreconditionFailed => (PreconditionFailed, 0, "PreconditionFailedError", precondition_failed);
    /// 41201
    UploadedFileCorrupted => (PreconditionFailed, 1, "UploadedFileCorruptedError", uploaded_file_corrupted);

    /// 41500
    UnsupportedType => (UnsupportedMediaType, 0, "UnsupportedTypeError", unsupported_type);
    /// 41501
    UnsupportedCommandType => (UnsupportedMediaType, 1, "UnsupportedCommandTypeError", unsupported_command_type);
    /// 41502
    UnsupportedStrategyType => (UnsupportedMediaType, 2, "UnsupportedStrategyTypeError", unsupported_strategy_type);

    /// 41600
    RequestedRangeNotSatisfiable => (RangeNotSatisfiable, 0, "RequestedRangeNotSatisfiableError", requested_range_not_satisfiable);
    /// 41601
    ResourceNotEnough => (RangeNotSatisfiable, 1, "ResourceNotEnoughError", resource_not_enough);

    /// 50000
    InternalServer => (InternalServerError, 0, "InternalServerError", internal);

    /// 50100
    NotImplemented => (NotImplemented, 0, "NotImplementedError", not_implemented);
}

/// A classified failure: HTTP status, five-digit code, message and kind name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{name} ({code}): {message}")]
pub struct HttpError {
    family: Family,
    subcode: u16,
    code: u32,
    message: String,
    name: &'static str,
}

impl HttpError {
    /// Build an error from a family base.
    ///
    /// `args` is either a message (subcode 0) or a `(subcode, message)` pair.
    /// A subcode of 100 or more would spill into another status, so it falls
    /// back to the family's generic subcode 0.
    pub fn new(family: Family, args: impl FamilyArgs) -> Self {
        let (requested, message) = args.into_parts();
        let subcode = if requested < MAX_SUBCODE {
            requested
        } else {
            tracing::warn!(
                status = family.status(),
                subcode = requested,
                "subcode out of range, using generic subcode 0"
            );
            0
        };
        Self {
            family,
            subcode,
            code: compute_code(family.status(), subcode),
            message,
            name: family.name(),
        }
    }

    /// Build an error of a specific leaf kind
    pub fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        let family = kind.family();
        let subcode = kind.subcode();
        Self {
            family,
            subcode,
            code: compute_code(family.status(), subcode),
            message: message.into(),
            name: kind.name(),
        }
    }

    /// HTTP status for the response
    pub fn status(&self) -> u16 {
        self.family.status()
    }

    /// Five-digit error code (`status * 100 + subcode`)
    pub fn code(&self) -> u32 {
        self.code
    }

    /// Subcode within the status family
    pub fn subcode(&self) -> u16 {
        self.subcode
    }

    /// Status family
    pub fn family(&self) -> Family {
        self.family
    }

    /// Human-readable detail
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Concrete error kind name, e.g. `GroupAlreadyExistError`
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Leaf kind identified by this error's code, if one is reserved for it
    pub fn kind(&self) -> Option<ErrorKind> {
        ErrorKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.family() == self.family && kind.subcode() == self.subcode)
    }

    /// Whether this is the non-fatal redirection signal
    pub fn is_redirection(&self) -> bool {
        self.family == Family::Found
    }
}

/// Exclusive upper bound of a subcode within one status family
pub const MAX_SUBCODE: u16 = 100;

fn compute_code(status: u16, subcode: u16) -> u32 {
    u32::from(status) * 100 + u32::from(subcode)
}

/// Failure surfaced by a resource processor or the pipeline driver
#[derive(Debug, Error)]
pub enum CompileError {
    /// Classified failure from the taxonomy
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Writing an artifact failed; the I/O error is carried unmodified
    #[error("failed to write artifact {path:?}: {source}")]
    Write {
        /// Artifact path being written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Encoding a state document failed
    #[error("failed to encode state document for '{name}': {source}")]
    Encode {
        /// Resource name
        name: String,
        /// Underlying serde error
        #[source]
        source: serde_json::Error,
    },
}

impl CompileError {
    /// Classified error, if this failure carries one
    pub fn as_http(&self) -> Option<&HttpError> {
        match self {
            CompileError::Http(err) => Some(err),
            _ => None,
        }
    }

    /// HTTP status this failure renders as
    pub fn status(&self) -> u16 {
        self.as_http()
            .map(HttpError::status)
            .unwrap_or(Family::InternalServerError.status())
    }

    /// Convert into an [`HttpError`], wrapping unclassified failures as 50000
    pub fn into_http(self) -> HttpError {
        match self {
            CompileError::Http(err) => err,
            other => HttpError::internal(other.to_string()),
        }
    }
}

impl From<CompileError> for HttpError {
    fn from(err: CompileError) -> Self {
        err.into_http()
    }
}

/// Result alias for taxonomy-level operations
pub type HttpResult<T> = std::result::Result<T, HttpError>;

/// Result alias for compilation
pub type CompileResult<T> = std::result::Result<T, CompileError>;
