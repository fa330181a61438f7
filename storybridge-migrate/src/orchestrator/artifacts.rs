//! Run artifacts
//!
//! Files written to the log directory at the end of every run, successful
//! or not:
//!
//! - `migration-{ts}.log`: every log line
//! - `migration-errors-{ts}.log`: error lines only, skipped when empty
//! - `migration-stats-{ts}.json`: [`StatisticsDocument`]

use super::run_log::RunLog;
use super::statistics::StatisticsDocument;
use crate::error::MigrateResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use storybridge_common::time::artifact_stamp;

/// Paths of the files a run produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunArtifacts {
    pub log: PathBuf,
    pub error_log: Option<PathBuf>,
    pub statistics: PathBuf,
}

/// Write the log, error log and statistics document into `dir`
///
/// `dir` is created if needed. File names share the stamp of `started_at`.
/// The artifact paths are recorded in `log` before it is rendered, so the
/// log file names its siblings.
pub fn write_artifacts(
    dir: &Path,
    started_at: DateTime<Utc>,
    log: &mut RunLog,
    document: &StatisticsDocument,
) -> MigrateResult<RunArtifacts> {
    fs::create_dir_all(dir)?;
    let stamp = artifact_stamp(started_at);

    let log_path = dir.join(format!("migration-{}.log", stamp));
    let stats_path = dir.join(format!("migration-stats-{}.json", stamp));
    let error_path = dir.join(format!("migration-errors-{}.log", stamp));

    log.info(format!("Run log: {}", log_path.display()));
    if !log.errors().is_empty() {
        log.info(format!("Error log: {}", error_path.display()));
    }
    log.info(format!("Statistics: {}", stats_path.display()));

    fs::write(&log_path, log.render())?;

    let error_log = if log.errors().is_empty() {
        None
    } else {
        fs::write(&error_path, log.render_errors())?;
        Some(error_path)
    };

    fs::write(&stats_path, serde_json::to_string_pretty(document)?)?;

    Ok(RunArtifacts {
        log: log_path,
        error_log,
        statistics: stats_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MigrationState;
    use crate::orchestrator::statistics::MigrationStatistics;
    use chrono::TimeZone;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn document(started_at: DateTime<Utc>) -> StatisticsDocument {
        StatisticsDocument {
            run_id: Uuid::new_v4(),
            state: MigrationState::Completed,
            started_at,
            finished_at: started_at,
            duration_ms: 42,
            entities: MigrationStatistics::default(),
            metrics: None,
            failure: None,
        }
    }

    #[test]
    fn test_clean_run_skips_error_log() {
        let dir = TempDir::new().unwrap();
        let started_at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        let mut log = RunLog::new();
        log.info("Migration started");

        let artifacts = write_artifacts(dir.path(), started_at, &mut log, &document(started_at)).unwrap();

        assert_eq!(artifacts.log, dir.path().join("migration-20240309T140500Z.log"));
        assert!(artifacts.error_log.is_none());
        assert!(artifacts.statistics.exists());

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&artifacts.statistics).unwrap()).unwrap();
        assert_eq!(json["state"], "COMPLETED");
        assert_eq!(json["duration_ms"], 42);
    }

    #[test]
    fn test_errors_written_to_separate_file() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("logs");
        let started_at = Utc::now();
        let mut log = RunLog::new();
        log.info("Migrating 1 stories");
        log.error("[story recX] Missing required field Title");

        let artifacts = write_artifacts(&nested, started_at, &mut log, &document(started_at)).unwrap();

        let error_log = fs::read_to_string(artifacts.error_log.unwrap()).unwrap();
        assert_eq!(error_log.lines().count(), 1);
        assert!(error_log.contains("Missing required field Title"));
        let run_log = fs::read_to_string(artifacts.log).unwrap();
        assert!(run_log.contains("Missing required field Title"));
        assert!(run_log.contains("migration-errors-"));
        assert!(run_log.contains("migration-stats-"));
    }
}
