//! Persistence layer: one CBOR record per plan.
use crate::error::PlanError;
use std::sync::Arc;

/// Stored value for a single plan: canonical document bytes plus the
/// version token derived from them. The two are written and removed as one
/// unit, so a plan can never exist with a document but no token.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct PlanRecord {
    #[cbor(n(0), with = "minicbor::bytes")]
    pub document: Vec<u8>,
    #[n(1)]
    pub etag: String,
}

/// Keyed plan storage over sled. All mutations are compare-and-swap
/// operations, so check-then-write sequences in the service layer stay
/// atomic per objectId without any application-level locking.
pub struct PlanStore {
    db: Arc<sled::Db>,
}

impl PlanStore {
    pub fn new(db: Arc<sled::Db>) -> Self {
        Self { db }
    }

    pub fn load(&self, object_id: &str) -> Result<Option<PlanRecord>, PlanError> {
        match self.db.get(object_id.as_bytes())? {
            Some(raw) => Ok(Some(minicbor::decode(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn exists(&self, object_id: &str) -> Result<bool, PlanError> {
        Ok(self.db.contains_key(object_id.as_bytes())?)
    }

    /// Write `record` only if no plan is stored under `object_id` yet.
    /// Returns false when the key was already occupied.
    pub fn insert_if_absent(&self, object_id: &str, record: &PlanRecord) -> Result<bool, PlanError> {
        let encoded = encode(record)?;
        let swap = self
            .db
            .compare_and_swap(object_id.as_bytes(), None::<&[u8]>, Some(encoded))?;
        Ok(swap.is_ok())
    }

    /// Overwrite the record under `object_id` only if the stored value is
    /// still exactly `current`. Returns false when a concurrent writer got
    /// there first (or the plan vanished).
    pub fn replace_if_matches(
        &self,
        object_id: &str,
        current: &PlanRecord,
        next: &PlanRecord,
    ) -> Result<bool, PlanError> {
        let swap = self.db.compare_and_swap(
            object_id.as_bytes(),
            Some(encode(current)?),
            Some(encode(next)?),
        )?;
        Ok(swap.is_ok())
    }

    /// Remove the record under `object_id` only if the stored value is
    /// still exactly `current`. Removing an already-absent plan reports
    /// false rather than an error.
    pub fn remove_if_matches(&self, object_id: &str, current: &PlanRecord) -> Result<bool, PlanError> {
        let swap =
            self.db
                .compare_and_swap(object_id.as_bytes(), Some(encode(current)?), None::<&[u8]>)?;
        Ok(swap.is_ok())
    }
}

fn encode(record: &PlanRecord) -> Result<Vec<u8>, PlanError> {
    minicbor::to_vec(record).map_err(|err| PlanError::Internal(err.into()))
}
