//! Provenance (audit trail) for every calculation step
//!
//! Each calculator appends entries to a caller-owned [`ProvenanceLog`]; the
//! pipeline concatenates them in call order so a case carries one ordered
//! trail from intake to present value.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// One audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenanceEntry {
    /// Calculator that produced the entry
    pub component: String,
    pub step: String,
    pub description: String,
    pub formula: Option<String>,
    pub source_url: Option<String>,
    pub source_date: Option<String>,
    pub value: Value,
    pub recorded_at: DateTime<Utc>,
}

impl ProvenanceEntry {
    pub fn new(
        component: impl Into<String>,
        step: impl Into<String>,
        description: impl Into<String>,
        value: Value,
    ) -> Self {
        Self {
            component: component.into(),
            step: step.into(),
            description: description.into(),
            formula: None,
            source_url: None,
            source_date: None,
            value,
            recorded_at: Utc::now(),
        }
    }

    /// Entry describing the inputs a component received
    pub fn input(component: impl Into<String>, description: impl Into<String>, value: Value) -> Self {
        Self::new(component, "input_validation", description, value)
    }

    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = Some(formula.into());
        self
    }

    pub fn with_source(mut self, url: impl Into<String>, date: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self.source_date = Some(date.into());
        self
    }
}

/// A cited external data source, derived from provenance entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    pub component: String,
    pub source_name: String,
    pub source_url: String,
    pub source_date: Option<String>,
    pub usage: String,
}

/// Append-only list of provenance entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProvenanceLog {
    entries: Vec<ProvenanceEntry>,
}

impl ProvenanceLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: ProvenanceEntry) {
        self.entries.push(entry);
    }

    /// Append another log after this one, preserving order
    pub fn extend(&mut self, other: ProvenanceLog) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[ProvenanceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProvenanceEntry> {
        self.entries.iter()
    }

    /// Entries recorded for a given step name
    pub fn steps<'a>(&'a self, step: &'a str) -> impl Iterator<Item = &'a ProvenanceEntry> + 'a {
        self.entries.iter().filter(move |e| e.step == step)
    }

    pub fn contains_step(&self, step: &str) -> bool {
        self.steps(step).next().is_some()
    }

    /// Cited sources, de-duplicated by URL (first occurrence wins)
    pub fn data_sources(&self) -> Vec<DataSource> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter_map(|e| {
                let url = e.source_url.as_ref()?;
                seen.insert(url.clone()).then(|| DataSource {
                    component: e.component.clone(),
                    source_name: e.description.clone(),
                    source_url: url.clone(),
                    source_date: e.source_date.clone(),
                    usage: e.step.clone(),
                })
            })
            .collect()
    }

    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.entries)
    }

    /// Serialize the log to a JSON file
    pub fn write_json(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json_pretty()?).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl IntoIterator for ProvenanceLog {
    type Item = ProvenanceEntry;
    type IntoIter = std::vec::IntoIter<ProvenanceEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
