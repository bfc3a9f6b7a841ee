//! Grouping of imported tests into Xray test execution documents.
use crate::model::{ExecutionDocument, ExecutionInfo, ExecutionKey, TestRecord};
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

const ROBOT_TIMESTAMP_FORMAT: &str = "%Y%m%d %H:%M:%S%.f";
// Robot timestamps carry no zone; the offset is fixed on output.
const XRAY_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S+01:00";

/// Convert a Robot Framework timestamp (`20180912 10:11:12.345`) to Xray's format.
pub fn convert_timestamp(raw: &str) -> Result<String> {
    let parsed = NaiveDateTime::parse_from_str(raw.trim(), ROBOT_TIMESTAMP_FORMAT)
        .with_context(|| format!("parse timestamp {raw:?}"))?;
    Ok(parsed.format(XRAY_TIMESTAMP_FORMAT).to_string())
}

/// Seconds since the epoch, used to keep synthesized summaries unique per run.
pub fn run_stamp() -> String {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or_default();
    format!("{seconds:.3}")
}

/// Buckets tests by target execution, in order of first appearance.
pub struct ExecutionGrouper {
    overrides: ExecutionInfo,
    filters_description: Option<String>,
    stamp: String,
    documents: Vec<ExecutionDocument>,
    index: HashMap<ExecutionKey, usize>,
}

impl ExecutionGrouper {
    /// `filters_description` is `Some` when the run was filtered.
    pub fn new(
        overrides: ExecutionInfo,
        filters_description: Option<String>,
        stamp: String,
    ) -> Self {
        Self {
            overrides,
            filters_description,
            stamp,
            documents: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn push(&mut self, key: ExecutionKey, test: TestRecord) {
        if let Some(&slot) = self.index.get(&key) {
            self.documents[slot].tests.push(test);
            return;
        }
        self.index.insert(key.clone(), self.documents.len());
        self.documents.push(ExecutionDocument {
            key,
            info: ExecutionInfo::default(),
            tests: vec![test],
        });
    }

    /// Synthesize metadata defaults and apply caller overrides.
    pub fn finish(self, suite_name: &str) -> Vec<ExecutionDocument> {
        let Self {
            overrides,
            filters_description,
            stamp,
            mut documents,
            ..
        } = self;
        for document in &mut documents {
            let mut defaults = ExecutionInfo::default();
            if document.key == ExecutionKey::New {
                defaults.summary = Some(match filters_description.as_deref() {
                    Some(filters) => format!("{suite_name} {filters}-{stamp}"),
                    None => format!("{suite_name} {stamp}"),
                });
            }
            if let Some(first) = document.tests.first() {
                defaults.start_date = Some(first.start.clone());
                defaults.finish_date = Some(first.finish.clone());
            }
            document.info = defaults.overlay(&overrides);
        }
        documents
    }
}
