//! In-memory source adapter
//!
//! Serves fixed record sets keyed by table name. Used for tests and for
//! replaying an exported snapshot of the record store.

use super::{SourceAdapter, SourceError};
use crate::models::SourceRecord;
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct StaticSource {
    tables: HashMap<String, Vec<SourceRecord>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style table setter; replaces any existing table of that name
    pub fn with_table(mut self, table: impl Into<String>, records: Vec<SourceRecord>) -> Self {
        self.tables.insert(table.into(), records);
        self
    }
}

#[async_trait::async_trait]
impl SourceAdapter for StaticSource {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn fetch_all(
        &self,
        table: &str,
        fields: Option<&[&str]>,
    ) -> Result<Vec<SourceRecord>, SourceError> {
        let records = self
            .tables
            .get(table)
            .ok_or_else(|| SourceError::UnknownTable(table.to_string()))?;

        let Some(fields) = fields else {
            return Ok(records.clone());
        };

        Ok(records
            .iter()
            .map(|record| SourceRecord {
                id: record.id.clone(),
                fields: record
                    .fields
                    .iter()
                    .filter(|(name, _)| fields.contains(&name.as_str()))
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect(),
            })
            .collect())
    }
}
