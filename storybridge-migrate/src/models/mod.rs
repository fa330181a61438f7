//! Data models for storybridge-migrate
//!
//! - Source records as read from the record store
//! - Entity kinds shared by the registry, migrators, and statistics
//! - Migration run state machine

pub mod entity;
pub mod migration_run;
pub mod source_record;

pub use entity::EntityKind;
pub use migration_run::{MigrationState, StateTransition};
pub use source_record::{FieldValue, SourceRecord};
