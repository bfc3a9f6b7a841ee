//! Report to execution documents: one streaming pass over output.xml.
use crate::config::ImportConfig;
use crate::evidence::EvidenceCollector;
use crate::execution::{convert_timestamp, run_stamp, ExecutionGrouper};
use crate::filter::{FilterEngine, TestId};
use crate::model::{ExecutionDocument, ExecutionKey, TestRecord};
use crate::report::{Element, ATTR_ENDTIME, ATTR_STARTTIME};
use crate::steps::{element_status, StepAggregator};
use crate::tags::{extract_tags, raw_tags, TestTags};
use crate::walker::{walk_report, ReportVisitor, SuiteFrame};
use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Parse `report` into one document per target execution.
pub fn import_report(report: &Path, config: &ImportConfig) -> Result<Vec<ExecutionDocument>> {
    import_report_at(report, config, run_stamp())
}

pub(crate) fn import_report_at(
    report: &Path,
    config: &ImportConfig,
    stamp: String,
) -> Result<Vec<ExecutionDocument>> {
    let file =
        File::open(report).with_context(|| format!("open report {}", report.display()))?;
    let collector = EvidenceCollector::for_report(report)?;
    let mut importer = Importer::new(config, &collector, stamp);
    walk_report(BufReader::new(file), &mut importer)
        .with_context(|| format!("import report {}", report.display()))?;
    Ok(importer.finish())
}

struct Importer<'a> {
    aggregator: StepAggregator<'a>,
    filter: Option<FilterEngine<'a>>,
    grouper: ExecutionGrouper,
    // Filtered runs hold a test until it is rejected or the report ends.
    held: BTreeMap<TestId, (ExecutionKey, TestRecord)>,
    suite_name: Option<String>,
    tests_seen: usize,
}

impl<'a> Importer<'a> {
    fn new(config: &'a ImportConfig, collector: &'a EvidenceCollector, stamp: String) -> Self {
        let active = config.filters.is_active();
        Self {
            aggregator: StepAggregator::new(
                config.evidence_mode,
                config.import_steps,
                &config.keywords,
                collector,
            ),
            filter: active.then(|| FilterEngine::new(&config.filters)),
            grouper: ExecutionGrouper::new(
                config.info.clone(),
                active.then(|| config.filters.describe()),
                stamp,
            ),
            held: BTreeMap::new(),
            suite_name: None,
            tests_seen: 0,
        }
    }

    fn release_rejected(&mut self) {
        if let Some(engine) = self.filter.as_mut() {
            for id in engine.take_rejected() {
                self.held.remove(&id);
            }
        }
    }

    fn note_suite(&mut self, suites: &[SuiteFrame]) {
        if self.suite_name.is_none() {
            self.suite_name = suites.first().and_then(|frame| frame.name.clone());
        }
    }

    fn finish(mut self) -> Vec<ExecutionDocument> {
        if let Some(engine) = self.filter.take() {
            let selected = engine.finish();
            let mut chosen: Vec<(ExecutionKey, TestRecord)> = std::mem::take(&mut self.held)
                .into_iter()
                .filter(|(id, _)| selected.contains(id))
                .map(|(_, entry)| entry)
                .collect();
            // Stable: equal keys keep report order.
            chosen.sort_by(|(_, a), (_, b)| a.test_key.cmp(&b.test_key));
            tracing::info!(
                selected = chosen.len(),
                total = self.tests_seen,
                "applied filters"
            );
            for (key, test) in chosen {
                self.grouper.push(key, test);
            }
        }
        let suite_name = self.suite_name.unwrap_or_default();
        let documents = self.grouper.finish(&suite_name);
        tracing::info!(
            tests = self.tests_seen,
            executions = documents.len(),
            suite = %suite_name,
            "parsed report"
        );
        documents
    }
}

impl ReportVisitor for Importer<'_> {
    fn test(&mut self, suites: &[SuiteFrame], test: Element) -> Result<()> {
        self.note_suite(suites);
        let name = test.required_name()?.to_string();
        let tags = extract_tags(raw_tags(&test));
        let record = build_test_record(&test, &tags, &self.aggregator)
            .with_context(|| format!("test {name:?}"))?;
        tracing::debug!(test = %name, key = %record.test_key, status = %record.status, "parsed test");

        let id = TestId(self.tests_seen);
        self.tests_seen += 1;
        match self.filter.as_mut() {
            Some(engine) => {
                engine.record_test(id, &name, &tags);
                self.held.insert(id, (tags.execution_key, record));
                self.release_rejected();
            }
            None => self.grouper.push(tags.execution_key, record),
        }
        Ok(())
    }

    fn suite_end(&mut self, suites: &[SuiteFrame]) -> Result<()> {
        self.note_suite(suites);
        if let Some(engine) = self.filter.as_mut() {
            engine.suite_closed(suites);
        }
        self.release_rejected();
        Ok(())
    }
}

fn build_test_record(
    test: &Element,
    tags: &TestTags,
    aggregator: &StepAggregator<'_>,
) -> Result<TestRecord> {
    let status_element = test.status_element()?;
    let timestamp = |attr: &str| -> Result<String> {
        let raw = status_element
            .attr(attr)
            .ok_or_else(|| anyhow!("status has no {attr} attribute"))?;
        convert_timestamp(raw)
    };
    Ok(TestRecord {
        test_key: tags.test_key.clone(),
        status: element_status(test)?,
        start: timestamp(ATTR_STARTTIME)?,
        finish: timestamp(ATTR_ENDTIME)?,
        comment: status_element.text().map(str::to_string),
        detail: aggregator.aggregate(test)?,
    })
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
