//! # Errors
//!
//! campus-mart reports failures through one structured error type.
//! Core goals:
//! - a small, fixed taxonomy with stable status codes + class names
//! - can be carried through anyhow::Error (services return `anyhow::Result`)
//! - transport-agnostic (the HTTP crate decides how to serialize)
//!
//! If you enable feature `serde`, you also get:
//! - `errors` as serde_json::Value
//! - `to_json()` helper

use std::fmt;

use anyhow::Error as AnyError;

/// A convenience result type for campus-mart service APIs.
pub type MartResult<T> = std::result::Result<T, AnyError>;

/// Error classes with their HTTP status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,       // 400
    NotAuthenticated, // 401
    NotFound,         // 404
    EmptyResult,      // 404
    Conflict,         // 409
    UploadFailure,    // 500
    Internal,         // 500
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::NotAuthenticated => 401,
            ErrorKind::NotFound => 404,
            ErrorKind::EmptyResult => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::UploadFailure => 500,
            ErrorKind::Internal => 500,
        }
    }

    /// Error `name` (e.g. "NotFound")
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::NotAuthenticated => "NotAuthenticated",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::EmptyResult => "EmptyResult",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::UploadFailure => "UploadFailure",
            ErrorKind::Internal => "InternalError",
        }
    }

    /// Error `className` (kebab-cased)
    pub fn class_name(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation-error",
            ErrorKind::NotAuthenticated => "not-authenticated",
            ErrorKind::NotFound => "not-found",
            ErrorKind::EmptyResult => "empty-result",
            ErrorKind::Conflict => "conflict",
            ErrorKind::UploadFailure => "upload-failure",
            ErrorKind::Internal => "internal-error",
        }
    }
}

#[cfg(feature = "serde")]
pub type ErrorValue = serde_json::Value;

#[cfg(not(feature = "serde"))]
pub type ErrorValue = std::sync::Arc<dyn std::any::Any + Send + Sync>;

/// A structured campus-mart error that can live inside `anyhow::Error`.
///
/// Fields:
/// - kind (name, code, class_name derive from it)
/// - message
/// - errors (optional, per-field details)
/// - source (never sent to clients)
#[derive(Debug)]
pub struct MartError {
    pub kind: ErrorKind,
    pub message: String,
    pub errors: Option<ErrorValue>,
    pub source: Option<AnyError>,
}

impl MartError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            errors: None,
            source: None,
        }
    }

    pub fn with_errors(mut self, errors: ErrorValue) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn with_source(mut self, source: AnyError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    /// Convert into `anyhow::Error` so it flows through service results.
    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Find a `MartError` anywhere in an `anyhow::Error` chain.
    pub fn from_anyhow(err: &AnyError) -> Option<&MartError> {
        err.chain().find_map(|e| e.downcast_ref::<MartError>())
    }

    /// Kind of the error, treating anything unstructured as `Internal`.
    pub fn kind_of(err: &AnyError) -> ErrorKind {
        Self::from_anyhow(err)
            .map(|e| e.kind)
            .unwrap_or(ErrorKind::Internal)
    }

    /// Turn any error into a MartError:
    /// - if it's already a MartError, keep it (lossless)
    /// - otherwise wrap as Internal
    pub fn normalize(err: AnyError) -> MartError {
        match err.downcast::<MartError>() {
            Ok(mart) => mart,
            Err(other) => MartError::new(ErrorKind::Internal, other.to_string()).with_source(other),
        }
    }

    /// A copy suitable for returning to clients: the inner `source` is dropped.
    pub fn sanitize_for_client(&self) -> MartError {
        MartError {
            kind: self.kind,
            message: self.message.clone(),
            errors: self.errors.clone(),
            source: None,
        }
    }

    // ---- Constructors ----

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, msg)
    }
    pub fn not_authenticated(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAuthenticated, msg)
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }
    pub fn empty_result(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::EmptyResult, msg)
    }
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, msg)
    }
    pub fn upload_failure(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::UploadFailure, msg)
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, msg)
    }
}

impl fmt::Display for MartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.code(), self.message)
    }
}

impl std::error::Error for MartError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[cfg(feature = "serde")]
impl MartError {
    /// JSON payload sent to clients.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::json;

        let mut base = json!({
            "name": self.name(),
            "message": self.message,
            "code": self.code(),
            "className": self.class_name(),
        });

        if let Some(e) = &self.errors {
            base["errors"] = e.clone();
        }
        base
    }
}

/// Convenience helper for "bail with MartError".
#[macro_export]
macro_rules! bail_mart {
    ($ctor:ident, $msg:expr) => {
        return Err($crate::errors::MartError::$ctor($msg).into_anyhow())
    };
    ($ctor:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::errors::MartError::$ctor(format!($fmt, $($arg)*)).into_anyhow())
    };
}
