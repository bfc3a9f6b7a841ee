//! Step reconstruction for one test.
//!
//! Walks the test's top-level keywords and turns them into Xray steps (or a
//! flattened evidence list). Log and screenshot keywords are folded into the
//! step they follow, and once a step fails everything after it is either
//! folded into it (teardown) or dropped.
use crate::config::{EvidenceMode, KeywordConfig};
use crate::evidence::EvidenceCollector;
use crate::model::{Status, StepRecord, TestDetail};
use crate::report::{Element, ATTR_LEVEL, ATTR_STATUS, ATTR_TYPE, KEYWORD_TAG, MSG_TAG};
use anyhow::{anyhow, Result};

const FAIL_LEVEL: &str = "FAIL";
const ABSORBED_LOG_LEVELS: [&str; 2] = ["WARN", "ERROR"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeywordKind {
    Setup,
    Teardown,
    Ordinary,
}

fn keyword_kind(keyword: &Element) -> KeywordKind {
    match keyword.attr(ATTR_TYPE) {
        Some(kind) if kind.eq_ignore_ascii_case("setup") => KeywordKind::Setup,
        Some(kind) if kind.eq_ignore_ascii_case("teardown") => KeywordKind::Teardown,
        _ => KeywordKind::Ordinary,
    }
}

pub(crate) fn element_status(keyword: &Element) -> Result<Status> {
    let status = keyword.status_element()?;
    let raw = status.attr(ATTR_STATUS).ok_or_else(|| {
        anyhow!(
            "status of {:?} has no status attribute",
            keyword.attr("name").unwrap_or_default()
        )
    })?;
    Ok(Status::parse(raw))
}

pub struct StepAggregator<'a> {
    mode: EvidenceMode,
    import_steps: bool,
    keywords: &'a KeywordConfig,
    evidence: &'a EvidenceCollector,
}

impl<'a> StepAggregator<'a> {
    pub fn new(
        mode: EvidenceMode,
        import_steps: bool,
        keywords: &'a KeywordConfig,
        evidence: &'a EvidenceCollector,
    ) -> Self {
        Self {
            mode,
            import_steps,
            keywords,
            evidence,
        }
    }

    pub fn aggregate(&self, test: &Element) -> Result<TestDetail> {
        let mut detail = TestDetail::empty(self.import_steps);
        if self.mode == EvidenceMode::None {
            return Ok(detail);
        }

        // The previous step stays open until its successor exists, since
        // later log/screenshot/teardown keywords may still add to it.
        let mut previous: Option<StepRecord> = None;

        for node in test.children_named(KEYWORD_TAG) {
            let kind = keyword_kind(node);
            if kind == KeywordKind::Setup {
                continue;
            }
            let status = element_status(node)?;
            let previous_failed = previous.as_ref().is_some_and(|step| step.status.is_fail());

            let absorb_into_previous = match self.mode {
                EvidenceMode::All => true,
                EvidenceMode::Fail => previous_failed,
                EvidenceMode::None => false,
            };
            if absorb_into_previous {
                if let Some(prev) = previous.as_mut() {
                    if self.absorb_special(prev, node)? {
                        continue;
                    }
                }
            }

            if previous_failed {
                if kind == KeywordKind::Teardown {
                    if let Some(prev) = previous.as_mut() {
                        for descendant in node.descendants_named(KEYWORD_TAG) {
                            self.absorb_special(prev, descendant)?;
                        }
                    }
                }
                continue;
            }

            let mut current = StepRecord::new(status);
            if current.status.is_fail() {
                for descendant in node.descendants_named(KEYWORD_TAG) {
                    if self.mode == EvidenceMode::Fail {
                        self.absorb_special(&mut current, descendant)?;
                    }
                    collect_failure_messages(&mut current, descendant)?;
                }
            }
            if self.mode == EvidenceMode::All {
                for descendant in node.descendants_named(KEYWORD_TAG) {
                    self.absorb_special(&mut current, descendant)?;
                }
            }

            if let Some(done) = previous.replace(current) {
                push_step(&mut detail, done);
            }
        }

        if let Some(done) = previous {
            push_step(&mut detail, done);
        }
        Ok(detail)
    }

    /// Fold a log or evidence keyword into `step`. Returns whether `keyword` was one.
    fn absorb_special(&self, step: &mut StepRecord, keyword: &Element) -> Result<bool> {
        let name = keyword.required_name()?;
        if self.keywords.is_log(name) {
            append_log_line(step, keyword);
            return Ok(true);
        }
        if self.keywords.is_evidence(name) {
            if let Some(evidence) = self.evidence.collect(keyword)? {
                step.evidences.push(evidence);
            }
            return Ok(true);
        }
        Ok(false)
    }
}

fn push_step(detail: &mut TestDetail, step: StepRecord) {
    match detail {
        TestDetail::Steps(steps) => steps.push(step),
        TestDetail::Evidences(evidences) => evidences.extend(step.evidences),
    }
}

/// `Log  message  level` keywords contribute WARN and ERROR lines only.
fn append_log_line(step: &mut StepRecord, keyword: &Element) {
    let args: Vec<&str> = keyword
        .children_named("arguments")
        .flat_map(|arguments| arguments.children_named("arg"))
        .map(|arg| arg.text.as_str())
        .collect();
    let [text, level, ..] = args.as_slice() else {
        return;
    };
    if ABSORBED_LOG_LEVELS.contains(level) {
        step.push_comment_line(level, text);
    }
}

fn collect_failure_messages(step: &mut StepRecord, keyword: &Element) -> Result<()> {
    if !element_status(keyword)?.is_fail() {
        return Ok(());
    }
    for msg in keyword.children_named(MSG_TAG) {
        if msg.attr(ATTR_LEVEL) == Some(FAIL_LEVEL) {
            step.push_comment_line(FAIL_LEVEL, &msg.text);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "steps_tests.rs"]
mod tests;
