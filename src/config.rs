//! Process configuration. The store location comes from the environment
//! so deployments never hard-code it.
use crate::error::PlanError;
use log::info;
use std::path::PathBuf;

pub const STORE_PATH_ENV: &str = "PLAN_STORE_PATH";
const DEFAULT_STORE_PATH: &str = "plan-store.db";

#[derive(Debug, Clone)]
pub struct Config {
    pub store_path: PathBuf,
}

impl Config {
    /// Read configuration from the environment, falling back to a local
    /// database file when `PLAN_STORE_PATH` is unset.
    pub fn from_env() -> Self {
        let store_path = std::env::var_os(STORE_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH));
        Self { store_path }
    }

    pub fn open_store(&self) -> Result<sled::Db, PlanError> {
        info!("opening plan store at {}", self.store_path.display());
        Ok(sled::open(&self.store_path)?)
    }
}
