#![deny(warnings)]

//! Persistence layer: versioned snapshots, the local JSON store and the
//! debounced writer that coalesces saves.

use chrono::{DateTime, Utc};
use planner_core::Catalog;
use planner_state::{DepotLedger, GoalLedger, Planner, StateError, STATE_VERSION};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub mod session;
pub mod writer;

pub use session::Session;
pub use writer::{DebouncedWriter, PersistConfig, WriterStats};

/// Errors from loading or saving state.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Older shapes must be migrated before the engine sees them.
    #[error("snapshot schema version {found} does not match current {expected}")]
    SchemaMismatch { found: u32, expected: u32 },
    #[error(transparent)]
    State(#[from] StateError),
    #[error("writer task failed: {0}")]
    Writer(String),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> PersistenceError + '_ {
    move |source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Both ledgers plus the schema tag, as written to storage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub schema_version: u32,
    pub saved_at: DateTime<Utc>,
    pub goals: GoalLedger,
    pub depot: DepotLedger,
}

impl Snapshot {
    pub fn capture(planner: &Planner) -> Self {
        Self {
            schema_version: STATE_VERSION,
            saved_at: Utc::now(),
            goals: planner.goals().clone(),
            depot: planner.depot().clone(),
        }
    }

    /// Rebuild a planner. Only the current schema version is accepted.
    pub fn restore(self, catalog: Arc<Catalog>) -> Result<Planner, PersistenceError> {
        if self.schema_version != STATE_VERSION {
            return Err(PersistenceError::SchemaMismatch {
                found: self.schema_version,
                expected: STATE_VERSION,
            });
        }
        let mut planner = Planner::new(catalog);
        planner.dispatch(planner_state::Action::ReplaceGoalsFromRemote(self.goals))?;
        planner.dispatch(planner_state::Action::ReplaceDepotFromRemote(self.depot))?;
        Ok(planner)
    }
}

/// Destination for snapshot writes.
pub trait SnapshotSink: Send + 'static {
    fn write(&mut self, snapshot: &Snapshot) -> Result<(), PersistenceError>;
}

/// Snapshot stored as a single JSON file.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored snapshot, `None` if nothing has been saved yet.
    pub fn load(&self) -> Result<Option<Snapshot>, PersistenceError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&self.path).map_err(io_err(&self.path))?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Write via a sibling temp file and rename, so readers never see a
    /// partial file.
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err(parent))?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        let text = serde_json::to_string_pretty(snapshot)?;
        fs::write(&tmp, text).map_err(io_err(&tmp))?;
        fs::rename(&tmp, &self.path).map_err(io_err(&self.path))?;
        debug!(path = %self.path.display(), goals = snapshot.goals.len(), "snapshot saved");
        Ok(())
    }
}

impl SnapshotSink for JsonFileStore {
    fn write(&mut self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        self.save(snapshot)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use planner_core::{Catalog, Ingredient, Item, ItemId, Operator, OperatorId, UpgradeCost};
    use std::sync::Arc;

    pub const AMIYA: &str = "char_002_amiya";

    pub fn catalog() -> Arc<Catalog> {
        let item = |id: &str| Item {
            id: ItemId::from(id),
            name: id.to_string(),
            tier: 2,
            ingredients: vec![],
            yield_count: None,
        };
        let op = Operator {
            id: OperatorId::from(AMIYA),
            name: "Amiya".to_string(),
            rarity: 5,
            elite: vec![UpgradeCost {
                ingredients: vec![Ingredient::new("30012", 5)],
            }],
            skills: vec![],
            skill_levels: vec![],
        };
        Arc::new(Catalog::new(vec![op], vec![item("30012")]).unwrap())
    }
}
