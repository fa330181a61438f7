//! Per-run context
//!
//! Everything a run accumulates (state, registry, log, counters, fetched
//! source tables) lives in one [`RunContext`] created per invocation, so two
//! runs in one process never share state.

use super::metrics::PlatformMetrics;
use super::run_log::RunLog;
use super::stage::Stage;
use super::statistics::MigrationStatistics;
use crate::error::{MigrateError, MigrateResult};
use crate::models::{EntityKind, MigrationState, SourceRecord, StateTransition};
use crate::registry::IdRegistry;
use crate::source::SourceAdapter;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

pub struct RunContext {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    started: Instant,
    state: MigrationState,
    transitions: Vec<StateTransition>,
    produced: HashSet<EntityKind>,
    tables: HashMap<String, Arc<Vec<SourceRecord>>>,
    pub registry: IdRegistry,
    pub log: RunLog,
    pub stats: MigrationStatistics,
    pub metrics: Option<PlatformMetrics>,
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            started: Instant::now(),
            state: MigrationState::Init,
            transitions: Vec::new(),
            produced: HashSet::new(),
            tables: HashMap::new(),
            registry: IdRegistry::new(),
            log: RunLog::new(),
            stats: MigrationStatistics::default(),
            metrics: None,
        }
    }

    pub fn state(&self) -> MigrationState {
        self.state
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    /// Move to `next`, rejecting transitions the state machine does not allow
    pub fn transition_to(&mut self, next: MigrationState) -> MigrateResult<StateTransition> {
        if !self.state.can_transition_to(next) {
            return Err(MigrateError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        let transition = StateTransition {
            run_id: self.run_id,
            old_state: self.state,
            new_state: next,
            transitioned_at: Utc::now(),
        };
        tracing::debug!(run_id = %self.run_id, from = %self.state, to = %next, "State transition");

        self.state = next;
        self.transitions.push(transition.clone());
        Ok(transition)
    }

    /// Registries `stage` reads that no completed stage has produced yet
    pub fn missing_dependencies(&self, stage: Stage) -> Vec<EntityKind> {
        stage
            .requires()
            .iter()
            .copied()
            .filter(|kind| !self.produced.contains(kind))
            .collect()
    }

    /// Mark `stage` finished, making its registry available downstream
    pub fn complete_stage(&mut self, stage: Stage) {
        if let Some(kind) = stage.produces() {
            self.produced.insert(kind);
        }
    }

    /// Full record set of a source table, fetched at most once per run
    pub async fn source_records(
        &mut self,
        source: &dyn SourceAdapter,
        table: &str,
    ) -> MigrateResult<Arc<Vec<SourceRecord>>> {
        if let Some(records) = self.tables.get(table) {
            return Ok(Arc::clone(records));
        }

        let records = Arc::new(source.fetch_all(table, None).await?);
        self.log.info(format!(
            "Fetched {} records from {} table {}",
            records.len(),
            source.name(),
            table
        ));
        self.tables.insert(table.to_string(), Arc::clone(&records));
        Ok(records)
    }

    /// Wall-clock time since the run started
    pub fn elapsed_ms(&self) -> u64 {
        storybridge_common::time::duration_millis(self.started.elapsed())
    }

    /// Count a non-blocking issue against `kind` and log it
    pub fn warn(&mut self, kind: EntityKind, message: impl Into<String>) {
        self.stats.entity_mut(kind).warnings += 1;
        self.log.warn(message);
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}
