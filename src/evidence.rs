//! Evidence extraction from screenshot-style keywords.
//!
//! The keyword's INFO message embeds an HTML `<img src="...">` reference whose
//! path is relative to the directory holding the report.
use crate::model::EvidenceRecord;
use crate::report::{Element, ATTR_LEVEL, MSG_TAG};
use anyhow::{Context, Result};
use base64::Engine;
use regex::{Regex, RegexBuilder};
use std::fs;
use std::path::{Path, PathBuf};

const EVIDENCE_SRC_PATTERN: &str = r#"img src="(.*?)""#;
const EVIDENCE_MSG_LEVEL: &str = "INFO";

pub struct EvidenceCollector {
    base_dir: PathBuf,
    src_pattern: Regex,
}

impl EvidenceCollector {
    /// Build a collector resolving references against the report's directory.
    pub fn for_report(report_path: &Path) -> Result<Self> {
        let base_dir = report_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let src_pattern = RegexBuilder::new(EVIDENCE_SRC_PATTERN)
            .case_insensitive(true)
            .build()
            .context("compile evidence pattern")?;
        Ok(Self {
            base_dir,
            src_pattern,
        })
    }

    /// Load the evidence referenced by an evidence keyword.
    ///
    /// Returns `Ok(None)` when the message carries no reference. An unreadable
    /// referenced file is an error.
    pub fn collect(&self, keyword: &Element) -> Result<Option<EvidenceRecord>> {
        let message = keyword
            .children_named(MSG_TAG)
            .find(|msg| msg.attr(ATTR_LEVEL) == Some(EVIDENCE_MSG_LEVEL))
            .and_then(Element::text);
        let Some(message) = message else {
            tracing::debug!("evidence keyword has no INFO message");
            return Ok(None);
        };
        let Some(src) = self
            .src_pattern
            .captures(message)
            .and_then(|captures| captures.get(1))
        else {
            tracing::debug!(text = message, "no evidence reference in message");
            return Ok(None);
        };

        let path = self.base_dir.join(src.as_str());
        let bytes =
            fs::read(&path).with_context(|| format!("read evidence {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        tracing::debug!(filename = %filename, bytes = bytes.len(), "collected evidence");
        Ok(Some(EvidenceRecord {
            data: base64::engine::general_purpose::STANDARD.encode(&bytes),
            content_type: content_type_for(&path).map(str::to_string),
            filename,
        }))
    }
}

fn content_type_for(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    let content_type = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "txt" | "log" => "text/plain",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "xml" => "application/xml",
        _ => return None,
    };
    Some(content_type)
}
