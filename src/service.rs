//! Service layer API for conditional plan operations.
//!
//! Each operation is driven by the caller's conditional headers and yields
//! exactly one outcome. Failure precedence for the mutating operations is
//! fixed: a plan that does not exist reports `NotFound` before any header
//! check, a missing `If-Match` reports `PreconditionRequired`, and a stale
//! one reports `PreconditionFailed`.
use super::error::PlanError;
use super::etag;
use super::schema::{FieldError, SchemaValidator};
use super::store::{PlanRecord, PlanStore};
use log::{debug, info};
use serde_json::Value;
use std::sync::Arc;

/// A plan revision as handed back to callers: the document together with
/// the version token identifying exactly this content.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanRevision {
    pub object_id: String,
    pub document: Value,
    pub etag: String,
}

/// Outcome of a conditional read. `NotModified` carries no body and maps
/// to a 304 at the transport layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    Current(PlanRevision),
    NotModified { etag: String },
}

pub struct PlanService {
    store: PlanStore,
    validator: SchemaValidator,
}

impl PlanService {
    pub fn new(db: Arc<sled::Db>) -> Self {
        Self {
            store: PlanStore::new(db),
            validator: SchemaValidator::new(),
        }
    }

    /// Store a new plan. The objectId comes from the document body; a
    /// second create for the same id conflicts instead of overwriting.
    pub fn create(&self, document: Value) -> Result<PlanRevision, PlanError> {
        self.check_schema(&document)?;
        let object_id = object_id_of(&document)?;

        let bytes = serde_json::to_vec(&document)?;
        let token = etag::compute(&bytes);
        let record = PlanRecord {
            document: bytes,
            etag: token.clone(),
        };

        // Single swap from vacant: two racing creates cannot both win.
        if !self.store.insert_if_absent(&object_id, &record)? {
            debug!("create conflict for plan {object_id}");
            return Err(PlanError::AlreadyExists(object_id));
        }

        info!("created plan {object_id} at version {token}");
        Ok(PlanRevision {
            object_id,
            document,
            etag: token,
        })
    }

    /// Read a plan, short-circuiting to `NotModified` when the caller's
    /// `If-None-Match` token is still current.
    pub fn retrieve(&self, object_id: &str, if_none_match: Option<&str>) -> Result<Retrieval, PlanError> {
        let record = self
            .store
            .load(object_id)?
            .ok_or_else(|| PlanError::NotFound(object_id.to_owned()))?;

        if if_none_match == Some(record.etag.as_str()) {
            return Ok(Retrieval::NotModified { etag: record.etag });
        }

        let document = serde_json::from_slice(&record.document)?;
        Ok(Retrieval::Current(PlanRevision {
            object_id: object_id.to_owned(),
            document,
            etag: record.etag,
        }))
    }

    /// Overwrite a plan wholesale, guarded by `If-Match`.
    pub fn replace(
        &self,
        object_id: &str,
        if_match: Option<&str>,
        document: Value,
    ) -> Result<PlanRevision, PlanError> {
        let current = self.precondition(object_id, if_match)?;
        self.check_schema(&document)?;
        self.commit(object_id, &current, document)
    }

    /// Partially update a plan: the patch's top-level fields overlay the
    /// stored document's, replacing same-named fields wholesale (nested
    /// objects are not merged recursively). The candidate must still
    /// satisfy the schema before anything is written.
    pub fn merge(
        &self,
        object_id: &str,
        if_match: Option<&str>,
        patch: Value,
    ) -> Result<PlanRevision, PlanError> {
        let current = self.precondition(object_id, if_match)?;
        let existing: Value = serde_json::from_slice(&current.document)?;
        let candidate = overlay(existing, patch)?;
        self.check_schema(&candidate)?;
        self.commit(object_id, &current, candidate)
    }

    /// Delete a plan, guarded by `If-Match`.
    pub fn delete(&self, object_id: &str, if_match: Option<&str>) -> Result<(), PlanError> {
        let current = self.precondition(object_id, if_match)?;
        if !self.store.remove_if_matches(object_id, &current)? {
            // Someone else committed between our load and the swap.
            debug!("lost delete race for plan {object_id}");
            return Err(PlanError::PreconditionFailed);
        }
        info!("deleted plan {object_id}");
        Ok(())
    }

    /// Shared prologue for the mutating operations: load the current
    /// record and check the caller's snapshot against it. Existence is
    /// authoritative over the header checks, so an id that was never
    /// created can only ever report `NotFound` here.
    fn precondition(&self, object_id: &str, if_match: Option<&str>) -> Result<PlanRecord, PlanError> {
        let record = self
            .store
            .load(object_id)?
            .ok_or_else(|| PlanError::NotFound(object_id.to_owned()))?;
        let supplied = if_match.ok_or(PlanError::PreconditionRequired)?;
        if supplied != record.etag {
            debug!("stale If-Match for plan {object_id}");
            return Err(PlanError::PreconditionFailed);
        }
        Ok(record)
    }

    fn check_schema(&self, document: &Value) -> Result<(), PlanError> {
        let errors = self.validator.validate(document);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(PlanError::ValidationFailed(errors))
        }
    }

    /// Serialize the candidate, derive its token, and swap it in against
    /// the loaded snapshot. A writer whose snapshot went stale between
    /// load and swap fails the precondition rather than clobbering.
    fn commit(
        &self,
        object_id: &str,
        current: &PlanRecord,
        document: Value,
    ) -> Result<PlanRevision, PlanError> {
        let bytes = serde_json::to_vec(&document)?;
        let token = etag::compute(&bytes);
        let next = PlanRecord {
            document: bytes,
            etag: token.clone(),
        };

        if !self.store.replace_if_matches(object_id, current, &next)? {
            debug!("lost write race for plan {object_id}");
            return Err(PlanError::PreconditionFailed);
        }

        info!("wrote plan {object_id} at version {token}");
        Ok(PlanRevision {
            object_id: object_id.to_owned(),
            document,
            etag: token,
        })
    }
}

fn object_id_of(document: &Value) -> Result<String, PlanError> {
    match document.get("objectId").and_then(Value::as_str) {
        Some(id) => Ok(id.to_owned()),
        None => Err(PlanError::ValidationFailed(vec![FieldError {
            path: "/objectId".into(),
            message: "required field is missing".into(),
        }])),
    }
}

/// Shallow field-level overlay of `patch` onto `base`: top-level fields in
/// the patch win, everything else is untouched.
fn overlay(mut base: Value, patch: Value) -> Result<Value, PlanError> {
    let Value::Object(fields) = patch else {
        return Err(PlanError::ValidationFailed(vec![FieldError {
            path: "".into(),
            message: "patch body must be a JSON object".into(),
        }]));
    };
    let Value::Object(target) = &mut base else {
        return Err(PlanError::Internal(anyhow::anyhow!(
            "stored plan document is not a JSON object"
        )));
    };
    for (name, value) in fields {
        target.insert(name, value);
    }
    Ok(base)
}
