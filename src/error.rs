use crate::schema::FieldError;

/// Every outcome a request can fail with. Each operation yields exactly one
/// of these; nothing is retried on the way up.
#[derive(thiserror::Error, Debug)]
pub enum PlanError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(&'static str),
    #[error("invalid or expired token")]
    Forbidden,
    #[error("document failed schema validation")]
    ValidationFailed(Vec<FieldError>),
    #[error("no plan stored under objectId {0:?}")]
    NotFound(String),
    #[error("a plan with objectId {0:?} already exists")]
    AlreadyExists(String),
    #[error("If-Match header missing")]
    PreconditionRequired,
    #[error("If-Match does not match the current version")]
    PreconditionFailed,
    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl PlanError {
    /// HTTP status code a transport layer should answer with.
    pub fn status(&self) -> u16 {
        match self {
            PlanError::Unauthenticated(_) => 401,
            PlanError::Forbidden => 403,
            PlanError::ValidationFailed(_) => 400,
            PlanError::NotFound(_) => 404,
            PlanError::AlreadyExists(_) => 409,
            PlanError::PreconditionRequired => 428,
            PlanError::PreconditionFailed => 412,
            PlanError::Internal(_) => 500,
        }
    }

    /// Structured field errors, present only for validation failures.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            PlanError::ValidationFailed(errors) => errors,
            _ => &[],
        }
    }
}

impl From<sled::Error> for PlanError {
    fn from(err: sled::Error) -> Self {
        PlanError::Internal(err.into())
    }
}

impl From<serde_json::Error> for PlanError {
    fn from(err: serde_json::Error) -> Self {
        PlanError::Internal(err.into())
    }
}

impl From<minicbor::decode::Error> for PlanError {
    fn from(err: minicbor::decode::Error) -> Self {
        PlanError::Internal(err.into())
    }
}
