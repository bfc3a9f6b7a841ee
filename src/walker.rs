//! Streaming traversal of a Robot Framework `output.xml`.
//!
//! Only the currently open `<test>` subtree is held in memory; everything
//! outside tests is discarded as soon as it is read. Suites are tracked as a
//! stack of names so callers can evaluate ancestor chains on suite close.
use crate::report::{Element, ATTR_NAME, SUITE_TAG, TEST_TAG};
use anyhow::{anyhow, Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::BufRead;

/// One open `<suite>` on the walker's stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteFrame {
    pub name: Option<String>,
}

/// Receives tests and suite closures in document order.
pub trait ReportVisitor {
    /// Called when a `<test>` closes; `suites` is the chain of open suites, outermost first.
    fn test(&mut self, suites: &[SuiteFrame], test: Element) -> Result<()>;

    /// Called when a `<suite>` closes; the closing suite is the last frame.
    fn suite_end(&mut self, suites: &[SuiteFrame]) -> Result<()>;
}

pub fn walk_report<R: BufRead>(source: R, visitor: &mut impl ReportVisitor) -> Result<()> {
    let mut reader = Reader::from_reader(source);
    reader.expand_empty_elements(true);

    let mut buf = Vec::new();
    let mut suites: Vec<SuiteFrame> = Vec::new();
    // Elements of the test currently being materialized, root first.
    let mut open: Vec<Element> = Vec::new();

    loop {
        match reader
            .read_event_into(&mut buf)
            .with_context(|| format!("parse report near byte {}", reader.buffer_position()))?
        {
            Event::Start(start) => {
                let is_test = start.name().as_ref() == TEST_TAG.as_bytes();
                let is_suite = start.name().as_ref() == SUITE_TAG.as_bytes();
                if !open.is_empty() || is_test {
                    open.push(Element::from_start(&start)?);
                } else if is_suite {
                    let frame = Element::from_start(&start)?;
                    suites.push(SuiteFrame {
                        name: frame.attr(ATTR_NAME).map(str::to_string),
                    });
                }
            }
            Event::End(end) => {
                if let Some(element) = open.pop() {
                    match open.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => visitor.test(&suites, element)?,
                    }
                } else if end.name().as_ref() == SUITE_TAG.as_bytes() {
                    visitor.suite_end(&suites)?;
                    suites.pop();
                }
            }
            Event::Text(text) => {
                if let Some(current) = open.last_mut() {
                    current
                        .text
                        .push_str(&text.unescape().context("decode report text")?);
                }
            }
            Event::CData(data) => {
                if let Some(current) = open.last_mut() {
                    current
                        .text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !open.is_empty() || !suites.is_empty() {
        return Err(anyhow!("report ended before all suites and tests were closed"));
    }
    Ok(())
}
