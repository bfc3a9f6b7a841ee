use super::StepAggregator;
use crate::config::{EvidenceMode, KeywordConfig};
use crate::evidence::EvidenceCollector;
use crate::model::{EvidenceRecord, Status, StepRecord, TestDetail};
use crate::report::{parse_fragment, Element};
use std::path::Path;

struct Fixture {
    dir: tempfile::TempDir,
    keywords: KeywordConfig,
    collector: EvidenceCollector,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        for name in ["a.png", "b.png", "c.png"] {
            std::fs::write(dir.path().join(name), name.as_bytes()).expect("write evidence");
        }
        let collector =
            EvidenceCollector::for_report(&dir.path().join("output.xml")).expect("collector");
        Self {
            dir,
            keywords: KeywordConfig::default(),
            collector,
        }
    }

    fn aggregate(&self, mode: EvidenceMode, import_steps: bool, test: &Element) -> TestDetail {
        StepAggregator::new(mode, import_steps, &self.keywords, &self.collector)
            .aggregate(test)
            .expect("aggregate steps")
    }

    fn evidence(&self, name: &str) -> EvidenceRecord {
        let collector = EvidenceCollector::for_report(&self.dir.path().join("output.xml"))
            .expect("collector");
        collector
            .collect(&parse_fragment(&screenshot(name)).expect("parse"))
            .expect("collect")
            .expect("evidence")
    }
}

fn kw(name: &str, status: &str, inner: &str) -> String {
    format!(r#"<kw name="{name}">{inner}<status status="{status}" starttime="20180912 10:00:00.000" endtime="20180912 10:00:01.000"/></kw>"#)
}

fn typed_kw(name: &str, kind: &str, status: &str, inner: &str) -> String {
    format!(r#"<kw name="{name}" type="{kind}">{inner}<status status="{status}"/></kw>"#)
}

fn fail_msg(text: &str) -> String {
    format!(r#"<msg timestamp="20180912 10:00:01.000" level="FAIL">{text}</msg>"#)
}

fn log(text: &str, level: &str) -> String {
    kw(
        "Log",
        "PASS",
        &format!("<arguments><arg>{text}</arg><arg>{level}</arg></arguments>"),
    )
}

fn screenshot(file: &str) -> String {
    kw(
        "Capture Page Screenshot",
        "PASS",
        &format!(r#"<msg level="INFO">&lt;img src="{file}" width="800px"&gt;</msg>"#),
    )
}

fn test_with(keywords: &[String]) -> Element {
    parse_fragment(&format!(
        r#"<test name="T">{}<tags><tag>JIRA_TEST:ABC-1</tag></tags><status status="FAIL"/></test>"#,
        keywords.concat()
    ))
    .expect("parse test")
}

fn steps(detail: TestDetail) -> Vec<StepRecord> {
    match detail {
        TestDetail::Steps(steps) => steps,
        TestDetail::Evidences(_) => panic!("expected steps"),
    }
}

fn step(status: Status, comment: &str, evidences: Vec<EvidenceRecord>) -> StepRecord {
    StepRecord {
        status,
        comment: comment.to_string(),
        evidences,
    }
}

#[test]
fn single_failing_keyword_reports_its_failure_message() {
    let fixture = Fixture::new();
    let test = test_with(&[kw("Click Button", "FAIL", &fail_msg("boom"))]);
    let steps = steps(fixture.aggregate(EvidenceMode::All, true, &test));
    assert_eq!(steps, vec![step(Status::Fail, "FAIL:boom\n", vec![])]);
}

#[test]
fn none_mode_records_nothing() {
    let fixture = Fixture::new();
    let test = test_with(&[
        kw("Open", "PASS", ""),
        kw("Click", "FAIL", &fail_msg("boom")),
        screenshot("a.png"),
    ]);
    assert_eq!(
        fixture.aggregate(EvidenceMode::None, true, &test),
        TestDetail::Steps(vec![])
    );
    assert_eq!(
        fixture.aggregate(EvidenceMode::None, false, &test),
        TestDetail::Evidences(vec![])
    );
}

#[test]
fn setup_keywords_are_not_steps() {
    let fixture = Fixture::new();
    let test = test_with(&[
        typed_kw("Open Browser", "setup", "PASS", ""),
        kw("Go To", "PASS", ""),
    ]);
    let steps = steps(fixture.aggregate(EvidenceMode::Fail, true, &test));
    assert_eq!(steps, vec![step(Status::Pass, "", vec![])]);
}

#[test]
fn fail_mode_folds_log_screenshot_and_teardown_into_failed_step() {
    let fixture = Fixture::new();
    let teardown_body = [log("cleanup went wrong", "ERROR"), screenshot("b.png")].concat();
    let test = test_with(&[
        kw("Open", "PASS", ""),
        kw("Click", "FAIL", &fail_msg("boom")),
        log("after failure", "WARN"),
        screenshot("a.png"),
        kw("Should Not Run", "PASS", ""),
        typed_kw("Close Browser", "teardown", "PASS", &teardown_body),
    ]);
    let steps = steps(fixture.aggregate(EvidenceMode::Fail, true, &test));
    assert_eq!(
        steps,
        vec![
            step(Status::Pass, "", vec![]),
            step(
                Status::Fail,
                "FAIL:boom\nWARN:after failure\nERROR:cleanup went wrong\n",
                vec![fixture.evidence("a.png"), fixture.evidence("b.png")],
            ),
        ]
    );
}

#[test]
fn fail_mode_treats_log_after_passing_step_as_ordinary() {
    let fixture = Fixture::new();
    let test = test_with(&[
        kw("Open", "PASS", ""),
        log("just a warning", "WARN"),
        kw("Check", "PASS", ""),
    ]);
    let steps = steps(fixture.aggregate(EvidenceMode::Fail, true, &test));
    assert_eq!(steps.len(), 3);
    assert!(steps.iter().all(|step| step.comment.is_empty()));
}

#[test]
fn fail_mode_imports_evidence_nested_in_failed_step_only() {
    let fixture = Fixture::new();
    let passing = kw("Open", "PASS", &screenshot("a.png"));
    let failing = kw(
        "Click",
        "FAIL",
        &[
            kw("Inner", "FAIL", &fail_msg("inner broke")),
            screenshot("b.png"),
        ]
        .concat(),
    );
    let test = test_with(&[passing, failing]);
    let steps = steps(fixture.aggregate(EvidenceMode::Fail, true, &test));
    assert_eq!(
        steps,
        vec![
            step(Status::Pass, "", vec![]),
            step(
                Status::Fail,
                "FAIL:inner broke\n",
                vec![fixture.evidence("b.png")]
            ),
        ]
    );
}

#[test]
fn all_mode_folds_logs_into_previous_step_regardless_of_status() {
    let fixture = Fixture::new();
    let test = test_with(&[
        kw("Open", "PASS", ""),
        log("slow page", "WARN"),
        log("chatter", "INFO"),
        screenshot("a.png"),
        kw("Check", "PASS", ""),
    ]);
    let steps = steps(fixture.aggregate(EvidenceMode::All, true, &test));
    assert_eq!(
        steps,
        vec![
            step(Status::Pass, "WARN:slow page\n", vec![fixture.evidence("a.png")]),
            step(Status::Pass, "", vec![]),
        ]
    );
}

#[test]
fn all_mode_merges_nested_logs_into_current_step() {
    let fixture = Fixture::new();
    let body = [
        kw("Wrapper", "PASS", &log("nested warning", "WARN")),
        screenshot("c.png"),
    ]
    .concat();
    let test = test_with(&[kw("Open", "PASS", &body)]);
    let steps = steps(fixture.aggregate(EvidenceMode::All, true, &test));
    assert_eq!(
        steps,
        vec![step(
            Status::Pass,
            "WARN:nested warning\n",
            vec![fixture.evidence("c.png")]
        )]
    );
}

#[test]
fn all_mode_skips_ordinary_keywords_after_failure() {
    let fixture = Fixture::new();
    let test = test_with(&[
        kw("Click", "FAIL", &fail_msg("boom")),
        kw("Not Run", "PASS", ""),
        typed_kw("Close", "teardown", "PASS", &log("closing", "WARN")),
    ]);
    let steps = steps(fixture.aggregate(EvidenceMode::All, true, &test));
    assert_eq!(
        steps,
        vec![step(Status::Fail, "FAIL:boom\nWARN:closing\n", vec![])]
    );
}

#[test]
fn failure_messages_are_collected_depth_first() {
    let fixture = Fixture::new();
    let deepest = kw("Deepest", "FAIL", &fail_msg("deepest"));
    let inner = kw("Inner", "FAIL", &[fail_msg("inner"), deepest].concat());
    let passing_sibling = kw("Fine", "PASS", &fail_msg("ignored"));
    let outer = kw(
        "Outer",
        "FAIL",
        &[passing_sibling, inner, fail_msg("outer")].concat(),
    );
    let test = test_with(&[outer]);
    let steps = steps(fixture.aggregate(EvidenceMode::Fail, true, &test));
    assert_eq!(steps[0].comment, "FAIL:outer\nFAIL:inner\nFAIL:deepest\n");
}

#[test]
fn first_log_keyword_becomes_its_own_step() {
    let fixture = Fixture::new();
    let test = test_with(&[log("early", "ERROR"), kw("Open", "PASS", "")]);
    let steps = steps(fixture.aggregate(EvidenceMode::All, true, &test));
    assert_eq!(
        steps,
        vec![
            step(Status::Pass, "ERROR:early\n", vec![]),
            step(Status::Pass, "", vec![]),
        ]
    );
}

#[test]
fn without_steps_evidences_are_flattened_in_discovery_order() {
    let fixture = Fixture::new();
    let test = test_with(&[
        kw("Open", "PASS", &screenshot("a.png")),
        screenshot("b.png"),
        kw("Click", "FAIL", &[fail_msg("boom"), screenshot("c.png")].concat()),
    ]);
    let detail = fixture.aggregate(EvidenceMode::All, false, &test);
    assert_eq!(
        detail,
        TestDetail::Evidences(vec![
            fixture.evidence("a.png"),
            fixture.evidence("b.png"),
            fixture.evidence("c.png"),
        ])
    );
}

#[test]
fn unreadable_evidence_aborts() {
    let keywords = KeywordConfig::default();
    let collector = EvidenceCollector::for_report(Path::new("/nonexistent/output.xml"))
        .expect("collector");
    let test = test_with(&[kw("Open", "PASS", ""), screenshot("gone.png")]);
    let result = StepAggregator::new(EvidenceMode::All, true, &keywords, &collector).aggregate(&test);
    assert!(result.is_err());
}
