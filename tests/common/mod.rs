//! Shared test infrastructure for CLI integration tests.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A report directory holding `output.xml` and its screenshots.
pub struct ReportFixture {
    pub dir: TempDir,
    pub report: PathBuf,
}

impl ReportFixture {
    /// Write a one-suite report around `tests` plus the named screenshot files.
    pub fn new(suite: &str, tests: &str, screenshots: &[&str]) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        for name in screenshots {
            std::fs::write(dir.path().join(name), format!("image {name}"))
                .expect("write screenshot");
        }
        let report = dir.path().join("output.xml");
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<robot generator="Robot 3.0.4 (Python 3.6.5 on linux)" generated="20180912 10:00:00.000">
<suite id="s1" name="{suite}" source="/tests/{suite}.robot">
{tests}
<status status="FAIL" starttime="20180912 10:00:00.000" endtime="20180912 10:30:00.000"></status>
</suite>
<statistics></statistics>
<errors></errors>
</robot>
"#
        );
        std::fs::write(&report, xml).expect("write report");
        Self { dir, report }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// Run the built binary with a clean logging environment.
pub fn run_rf2xray(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rf2xray"))
        .args(args)
        .current_dir(cwd)
        .env_remove("RUST_LOG")
        .env_remove("RF2XRAY_PASSWORD")
        .output()
        .expect("run rf2xray")
}

pub fn keyword(name: &str, status: &str, inner: &str) -> String {
    format!(
        r#"<kw name="{name}">{inner}<status status="{status}" starttime="20180912 10:11:12.000" endtime="20180912 10:11:13.000"></status></kw>"#
    )
}

pub fn screenshot(file: &str) -> String {
    keyword(
        "Capture Page Screenshot",
        "PASS",
        &format!(
            r#"<msg timestamp="20180912 10:11:13.000" level="INFO" html="yes">&lt;/td&gt;&lt;/tr&gt;&lt;tr&gt;&lt;td colspan="3"&gt;&lt;a href="{file}"&gt;&lt;img src="{file}" width="800px"&gt;&lt;/a&gt;</msg>"#
        ),
    )
}

pub fn test_case(name: &str, tags: &[&str], status: &str, body: &str) -> String {
    let tags: String = tags.iter().map(|tag| format!("<tag>{tag}</tag>")).collect();
    format!(
        r#"<test id="s1-t1" name="{name}">{body}<tags>{tags}</tags><status status="{status}" starttime="20180912 10:11:12.345" endtime="20180912 10:12:00.000" critical="yes"></status></test>"#
    )
}
