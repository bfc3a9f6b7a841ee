//! Typed records produced by the import pipeline.
//!
//! These are the in-memory shapes; `wire` turns them into the JSON layout the
//! Xray import endpoint expects.
use serde::{Serialize, Serializer};

/// Status of a test or keyword as reported by Robot Framework.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Pass,
    Fail,
    Other(String),
}

impl Status {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "PASS" => Status::Pass,
            "FAIL" => Status::Fail,
            other => Status::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Status::Pass => "PASS",
            Status::Fail => "FAIL",
            Status::Other(raw) => raw,
        }
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Status::Fail)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A binary artifact attached to a step or test, already base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceRecord {
    pub data: String,
    pub filename: String,
    pub content_type: Option<String>,
}

/// One imported keyword of a test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub status: Status,
    pub comment: String,
    pub evidences: Vec<EvidenceRecord>,
}

impl StepRecord {
    pub fn new(status: Status) -> Self {
        Self {
            status,
            comment: String::new(),
            evidences: Vec::new(),
        }
    }

    /// Append a `level:text` line to the comment.
    pub fn push_comment_line(&mut self, level: &str, text: &str) {
        self.comment.push_str(level);
        self.comment.push(':');
        self.comment.push_str(text);
        self.comment.push('\n');
    }
}

/// Per-test detail: either ordered steps or a flattened evidence list, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestDetail {
    Steps(Vec<StepRecord>),
    Evidences(Vec<EvidenceRecord>),
}

impl TestDetail {
    pub fn empty(import_steps: bool) -> Self {
        if import_steps {
            TestDetail::Steps(Vec::new())
        } else {
            TestDetail::Evidences(Vec::new())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRecord {
    pub test_key: String,
    pub status: Status,
    /// Wire-format start timestamp.
    pub start: String,
    /// Wire-format finish timestamp.
    pub finish: String,
    pub comment: Option<String>,
    pub detail: TestDetail,
}

/// Target execution of a test: an existing issue, or the "create new" sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExecutionKey {
    New,
    Existing(String),
}

impl ExecutionKey {
    pub fn as_existing(&self) -> Option<&str> {
        match self {
            ExecutionKey::New => None,
            ExecutionKey::Existing(key) => Some(key),
        }
    }
}

impl std::fmt::Display for ExecutionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionKey::New => f.write_str("<new>"),
            ExecutionKey::Existing(key) => f.write_str(key),
        }
    }
}

/// Execution metadata; every field is optional so caller-supplied values can
/// be layered over synthesized defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionInfo {
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub finish_date: Option<String>,
    #[serde(default)]
    pub test_plan_key: Option<String>,
    #[serde(default)]
    pub test_environments: Vec<String>,
}

impl ExecutionInfo {
    /// Layer `overrides` on top of `self`, field by field.
    pub fn overlay(mut self, overrides: &ExecutionInfo) -> Self {
        fn pick(base: &mut Option<String>, over: &Option<String>) {
            if over.is_some() {
                base.clone_from(over);
            }
        }
        pick(&mut self.project, &overrides.project);
        pick(&mut self.summary, &overrides.summary);
        pick(&mut self.description, &overrides.description);
        pick(&mut self.user, &overrides.user);
        pick(&mut self.version, &overrides.version);
        pick(&mut self.revision, &overrides.revision);
        pick(&mut self.start_date, &overrides.start_date);
        pick(&mut self.finish_date, &overrides.finish_date);
        pick(&mut self.test_plan_key, &overrides.test_plan_key);
        if !overrides.test_environments.is_empty() {
            self.test_environments
                .clone_from(&overrides.test_environments);
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionDocument {
    pub key: ExecutionKey,
    pub info: ExecutionInfo,
    pub tests: Vec<TestRecord>,
}
