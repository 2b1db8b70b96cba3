use std::fmt::{self, Display};

use serde::Serialize;
use warp::reject::{Reject, Rejection};

/// Error kinds surfaced by the service. Every kind maps to one HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlError {
    InvalidRequest,
    Unauthorized,
    InvalidSession,
    Forbidden,
    NotFound,
    InternalServerError,
}

impl HtmlError {
    pub fn code(&self) -> u16 {
        match self {
            HtmlError::InvalidRequest => 400,
            HtmlError::Unauthorized => 401,
            HtmlError::InvalidSession => 401,
            HtmlError::Forbidden => 403,
            HtmlError::NotFound => 404,
            HtmlError::InternalServerError => 500,
        }
    }

    pub fn new(self, info: &str) -> Error {
        Error {
            code: self.code(),
            info: Some(info.to_string()),
        }
    }

    pub fn default(self) -> Error {
        let info = match self {
            HtmlError::InvalidRequest => "Invalid request",
            HtmlError::Unauthorized => "Authentication credentials were not provided",
            HtmlError::InvalidSession => "Invalid token",
            HtmlError::Forbidden => "You don't have permission to perform this action",
            HtmlError::NotFound => "Not found",
            HtmlError::InternalServerError => "Internal server error",
        };
        self.new(info)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Error {
    pub code: u16,
    pub info: Option<String>,
}

impl Error {
    pub fn message(&self) -> &str {
        self.info.as_deref().unwrap_or("Unknown error")
    }

    pub fn is_validation(&self) -> bool {
        self.code == HtmlError::InvalidRequest.code()
    }

    /// Replaces the message of a validation error, other kinds pass through.
    pub fn or_validation(self, info: &str) -> Self {
        if self.is_validation() {
            HtmlError::InvalidRequest.new(info)
        } else {
            self
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.code)
    }
}

impl std::error::Error for Error {}
impl Reject for Error {}

/// Storage failure. Constraint violations become validation errors, the rest
/// are logged and reported as internal errors.
#[derive(Debug)]
pub struct QueryError {
    kind: HtmlError,
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self {
            kind: HtmlError::InternalServerError,
            info,
        }
    }

    fn with_kind(kind: HtmlError, info: &str) -> Self {
        Self {
            kind,
            info: info.to_string(),
        }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) if e.is_unique_violation() => {
                Self::with_kind(HtmlError::InvalidRequest, "Object already exists")
            }
            sqlx::Error::Database(e) if e.is_foreign_key_violation() => Self::with_kind(
                HtmlError::InvalidRequest,
                "Object is referenced by other records",
            ),
            sqlx::Error::Database(e) if e.is_check_violation() => {
                Self::with_kind(HtmlError::InvalidRequest, "Value violates a constraint")
            }
            sqlx::Error::RowNotFound => Self::with_kind(HtmlError::NotFound, "Not found"),
            sqlx::Error::Database(e) => Self::new(format!("{e}")),
            sqlx::Error::Configuration(e) => Self::new(format!("{e}")),
            sqlx::Error::Io(e) => Self::new(format!("{e}")),
            sqlx::Error::Tls(e) => Self::new(format!("{e}")),
            sqlx::Error::Protocol(e) => Self::new(e),
            sqlx::Error::ColumnNotFound(e) => Self::new(format!("Column not found: {e}")),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::Decode(e) => Self::new(format!("{e}")),
            sqlx::Error::PoolTimedOut => Self::new("Pool timed out".to_string()),
            sqlx::Error::PoolClosed => Self::new("Pool closed".to_string()),
            sqlx::Error::Migrate(e) => Self::new(format!("{e}")),
            e => Self::new(format!("{e}")),
        }
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        match value.kind {
            HtmlError::InternalServerError => {
                log::error!("Query failed: {}", value.info);
                HtmlError::InternalServerError.default()
            }
            kind => kind.new(&value.info),
        }
    }
}

/// Malformed input value.
#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl From<TypeError> for Error {
    fn from(value: TypeError) -> Self {
        HtmlError::InvalidRequest.new(&value.info)
    }
}

impl From<TypeError> for Rejection {
    fn from(value: TypeError) -> Self {
        Error::from(value).into()
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_statuses() {
        assert_eq!(HtmlError::InvalidRequest.new("x").code, 400);
        assert_eq!(HtmlError::Unauthorized.default().code, 401);
        assert_eq!(HtmlError::Forbidden.default().code, 403);
        assert_eq!(HtmlError::NotFound.default().code, 404);
    }

    #[test]
    fn missing_row_is_not_found() {
        let error: Error = QueryError::from(sqlx::Error::RowNotFound).into();
        assert_eq!(error.code, 404);
    }

    #[test]
    fn internal_errors_hide_details() {
        let error: Error = QueryError::from(sqlx::Error::PoolClosed).into();
        assert_eq!(error.code, 500);
        assert_eq!(error.message(), "Internal server error");
    }

    #[test]
    fn type_errors_are_validation_errors() {
        let error: Error = TypeError::new("Invalid key").into();
        assert!(error.is_validation());
        assert_eq!(error.message(), "Invalid key");
    }

    #[test]
    fn rejections_carry_the_error() {
        let rejection: Rejection = HtmlError::Forbidden.new("Not yours").into();
        let error = rejection.find::<Error>().unwrap();
        assert_eq!(error.code, 403);
        assert_eq!(error.message(), "Not yours");

        let rejection: Rejection = TypeError::new("Invalid page").into();
        assert_eq!(rejection.find::<Error>().unwrap().code, 400);
    }
}
