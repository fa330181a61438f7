//! storybridge-migrate library interface
//!
//! One-shot migration of organizations, communities, storyteller profiles
//! and stories from an Airtable base into the platform's relational store.
//! The binary wires [`orchestrator::Orchestrator`] to [`source::AirtableSource`]
//! and [`target::SqliteTarget`]; tests substitute [`source::StaticSource`].

pub mod error;
pub mod migrators;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod registry;
pub mod source;
pub mod target;

pub use crate::error::{MigrateError, MigrateResult};
pub use crate::orchestrator::{MigrationReport, Orchestrator};
