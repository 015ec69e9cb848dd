//! Engine error taxonomy and its HTTP mapping

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The target is already absent. Callers treat this as an idempotent no-op.
    #[error("{kind} {id} not found")]
    NotFound { kind: String, id: i32 },

    /// Bad score range, unknown kind, self-follow and the like.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Connection, lock or I/O failure. The whole operation may be retried.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The reference index points at a table or column the store does not
    /// have. Never retried.
    #[error("integrity violation: {0}")]
    IntegrityViolation(String),
}

impl EngineError {
    pub fn not_found(kind: impl Into<String>, id: i32) -> Self {
        EngineError::NotFound {
            kind: kind.into(),
            id,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound { .. })
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::StoreUnavailable(_))
    }
}

impl From<DbErr> for EngineError {
    fn from(e: DbErr) -> Self {
        if is_schema_mismatch(&e) {
            EngineError::IntegrityViolation(e.to_string())
        } else {
            EngineError::StoreUnavailable(e.to_string())
        }
    }
}

/// SQLite and sqlx column lookup, then MySQL 1146/1054 as sqlx renders them.
const SCHEMA_MISMATCH_MARKERS: [&str; 5] = [
    "no such table",
    "no such column",
    "no column found",
    "1146 (42s02)",
    "1054 (42s22)",
];

/// True when the store rejected a statement because a table or column it
/// names is not there. Sea-orm folds every runtime driver failure into
/// `Exec`/`Query`, so the variant alone says nothing about the cause.
pub fn is_schema_mismatch(e: &DbErr) -> bool {
    let msg = match e {
        DbErr::Exec(msg) | DbErr::Query(msg) => msg.to_lowercase(),
        _ => return false,
    };

    // Postgres 42P01 and 42703
    let pg_undefined = msg.contains("does not exist")
        && (msg.contains("relation \"") || msg.contains("column \""));

    pg_undefined
        || SCHEMA_MISMATCH_MARKERS
            .iter()
            .any(|marker| msg.contains(marker))
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    retry: bool,
}

impl ResponseError for EngineError {
    fn status_code(&self) -> StatusCode {
        match self {
            EngineError::NotFound { .. } => StatusCode::NOT_FOUND,
            EngineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            EngineError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::IntegrityViolation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            EngineError::IntegrityViolation(detail) => {
                log::error!("Integrity violation surfaced to caller: {}", detail);
                "Internal server error".to_string()
            }
            EngineError::StoreUnavailable(_) => {
                "Service temporarily unavailable, please retry".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(ErrorBody {
            error,
            retry: self.is_retryable(),
        })
    }
}
