//! A planner bound to a debounced snapshot writer.
//!
//! Mutations apply to the in-memory planner first; a snapshot is scheduled
//! only after the dispatch succeeded. `close` performs the final flush.

use crate::writer::{DebouncedWriter, PersistConfig, WriterStats};
use crate::{JsonFileStore, PersistenceError, Snapshot, SnapshotSink};
use planner_core::{Catalog, ItemId, OperatorGoal};
use planner_state::{Action, Planner, Reconciliation, RemoteProfile};
use std::sync::Arc;
use tracing::info;

pub struct Session {
    planner: Planner,
    writer: DebouncedWriter,
}

impl Session {
    /// Load state from `store` (or start empty) and spawn its writer.
    pub fn open(
        catalog: Arc<Catalog>,
        store: JsonFileStore,
        config: PersistConfig,
    ) -> Result<Self, PersistenceError> {
        let planner = match store.load()? {
            Some(snapshot) => snapshot.restore(catalog)?,
            None => Planner::new(catalog),
        };
        info!(
            path = %store.path().display(),
            goals = planner.goals().len(),
            items = planner.depot().quantities().len(),
            "session opened"
        );
        Ok(Self::with_sink(planner, store, config))
    }

    pub fn with_sink<S: SnapshotSink>(planner: Planner, sink: S, config: PersistConfig) -> Self {
        Self {
            planner,
            writer: DebouncedWriter::spawn(sink, config),
        }
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    fn schedule(&self) {
        self.writer.schedule(Snapshot::capture(&self.planner));
    }

    pub fn dispatch(&mut self, action: Action) -> Result<(), PersistenceError> {
        self.planner.dispatch(action)?;
        self.schedule();
        Ok(())
    }

    pub fn complete_goal(&mut self, goal: &OperatorGoal) -> Result<bool, PersistenceError> {
        let removed = self.planner.complete_goal(goal)?;
        if removed {
            self.schedule();
        }
        Ok(removed)
    }

    pub fn craft_item(&mut self, item_id: &ItemId) -> Result<(), PersistenceError> {
        self.planner.craft_item(item_id)?;
        self.schedule();
        Ok(())
    }

    pub fn apply_remote(
        &mut self,
        profile: RemoteProfile,
    ) -> Result<Reconciliation, PersistenceError> {
        let outcome = self.planner.apply_remote(profile)?;
        if outcome == Reconciliation::AcceptedRemote {
            self.schedule();
        }
        Ok(outcome)
    }

    /// Flush pending writes and stop the writer.
    pub async fn close(self) -> Result<WriterStats, PersistenceError> {
        let stats = self.writer.shutdown().await?;
        info!(written = stats.written, failed = stats.failed, "session closed");
        Ok(stats)
    }
}
