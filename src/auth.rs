//! Bearer-token gate in front of every operation.
use crate::error::PlanError;
use log::warn;

/// The introspection call itself failed (the issuer was unreachable, not
/// that it rejected the token).
#[derive(thiserror::Error, Debug)]
#[error("token introspection call failed: {0}")]
pub struct IntrospectError(pub String);

/// Remote token validity check. `Ok(false)` means the issuer answered and
/// rejected the token; `Err` means the call never completed.
pub trait TokenIntrospector {
    fn introspect(&self, token: &str) -> Result<bool, IntrospectError>;
}

/// Stateless per-request check: nothing is cached between requests, every
/// inbound token goes to the introspector once.
pub struct AuthGate<I> {
    introspector: I,
}

impl<I: TokenIntrospector> AuthGate<I> {
    pub fn new(introspector: I) -> Self {
        Self { introspector }
    }

    /// Check the raw `Authorization` header value, if any. Missing and
    /// malformed headers are both unauthenticated; a reachable issuer that
    /// rejects the token is forbidden; an unreachable issuer is an
    /// internal error.
    pub fn check(&self, authorization: Option<&str>) -> Result<(), PlanError> {
        let header =
            authorization.ok_or(PlanError::Unauthenticated("no authorization header provided"))?;

        // Header shape is "<scheme> <token>".
        let token = header
            .split(' ')
            .nth(1)
            .filter(|token| !token.is_empty())
            .ok_or(PlanError::Unauthenticated("no token provided"))?;

        match self.introspector.introspect(token) {
            Ok(true) => Ok(()),
            Ok(false) => Err(PlanError::Forbidden),
            Err(err) => {
                warn!("token introspection failed: {err}");
                Err(PlanError::Internal(err.into()))
            }
        }
    }
}
