//! JSON layout of the Xray execution import endpoint.
use crate::model::{
    EvidenceRecord, ExecutionDocument, ExecutionInfo, Status, StepRecord, TestDetail, TestRecord,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireExecution<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_execution_key: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<WireInfo<'a>>,
    pub tests: Vec<WireTest<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireInfo<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_date: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_plan_key: Option<&'a str>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub test_environments: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTest<'a> {
    pub test_key: &'a str,
    pub status: &'a Status,
    pub start: &'a str,
    pub finish: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<WireStep<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidences: Option<Vec<WireEvidence<'a>>>,
}

#[derive(Debug, Serialize)]
pub struct WireStep<'a> {
    pub status: &'a Status,
    pub comment: &'a str,
    pub evidences: Vec<WireEvidence<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEvidence<'a> {
    pub data: &'a str,
    pub filename: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<&'a str>,
}

pub fn to_wire(document: &ExecutionDocument) -> WireExecution<'_> {
    WireExecution {
        test_execution_key: document.key.as_existing(),
        info: wire_info(&document.info),
        tests: document.tests.iter().map(wire_test).collect(),
    }
}

fn wire_info(info: &ExecutionInfo) -> Option<WireInfo<'_>> {
    let wire = WireInfo {
        project: info.project.as_deref(),
        summary: info.summary.as_deref(),
        description: info.description.as_deref(),
        user: info.user.as_deref(),
        version: info.version.as_deref(),
        revision: info.revision.as_deref(),
        start_date: info.start_date.as_deref(),
        finish_date: info.finish_date.as_deref(),
        test_plan_key: info.test_plan_key.as_deref(),
        test_environments: &info.test_environments,
    };
    let empty = [
        wire.project,
        wire.summary,
        wire.description,
        wire.user,
        wire.version,
        wire.revision,
        wire.start_date,
        wire.finish_date,
        wire.test_plan_key,
    ]
    .iter()
    .all(Option::is_none)
        && wire.test_environments.is_empty();
    (!empty).then_some(wire)
}

fn wire_test(test: &TestRecord) -> WireTest<'_> {
    let (steps, evidences) = match &test.detail {
        TestDetail::Steps(steps) => (Some(steps.iter().map(wire_step).collect()), None),
        TestDetail::Evidences(evidences) => {
            (None, Some(evidences.iter().map(wire_evidence).collect()))
        }
    };
    WireTest {
        test_key: &test.test_key,
        status: &test.status,
        start: &test.start,
        finish: &test.finish,
        comment: test.comment.as_deref(),
        steps,
        evidences,
    }
}

fn wire_step(step: &StepRecord) -> WireStep<'_> {
    WireStep {
        status: &step.status,
        comment: &step.comment,
        evidences: step.evidences.iter().map(wire_evidence).collect(),
    }
}

fn wire_evidence(evidence: &EvidenceRecord) -> WireEvidence<'_> {
    WireEvidence {
        data: &evidence.data,
        filename: &evidence.filename,
        content_type: evidence.content_type.as_deref(),
    }
}
