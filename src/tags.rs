//! Test tag parsing: Jira identity and target execution keys.
use crate::model::ExecutionKey;
use crate::report::Element;
use std::collections::BTreeSet;

/// Category that carries the Jira test issue key (`JIRA_TEST:POC-1`).
pub const TEST_CATEGORY: &str = "JIRA_TEST";
/// Category that carries the target Test Execution issue key.
pub const EXECUTION_CATEGORY: &str = "JIRA_TESTEXEC";
pub const TAG_SEPARATOR: char = ':';

/// A well-formed `category:value` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub raw: String,
    pub category: String,
    pub value: String,
}

/// Identity and filter data extracted from one test's tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestTags {
    pub test_key: String,
    pub execution_key: ExecutionKey,
    pub tags: Vec<Tag>,
}

impl TestTags {
    /// True when any well-formed tag, by full text or by value, is in `accepted`.
    pub fn matches_any(&self, accepted: &BTreeSet<String>) -> bool {
        self.tags
            .iter()
            .any(|tag| accepted.contains(&tag.raw) || accepted.contains(&tag.value))
    }
}

/// Split a raw tag on the single separator; `None` for malformed tags.
pub fn parse_tag(raw: &str) -> Option<Tag> {
    let (category, value) = raw.split_once(TAG_SEPARATOR)?;
    if value.contains(TAG_SEPARATOR) {
        return None;
    }
    Some(Tag {
        raw: raw.to_string(),
        category: category.to_string(),
        value: value.to_string(),
    })
}

pub fn extract_tags<'a, I>(raw_tags: I) -> TestTags
where
    I: IntoIterator<Item = &'a str>,
{
    let mut test_key = String::new();
    let mut execution_key = ExecutionKey::New;
    let mut tags = Vec::new();
    for raw in raw_tags {
        let Some(tag) = parse_tag(raw) else {
            tracing::debug!(tag = raw, "skipping malformed tag");
            continue;
        };
        // Later tags of the same category overwrite earlier ones.
        match tag.category.as_str() {
            TEST_CATEGORY => test_key.clone_from(&tag.value),
            EXECUTION_CATEGORY => execution_key = ExecutionKey::Existing(tag.value.clone()),
            _ => {}
        }
        tags.push(tag);
    }
    TestTags {
        test_key,
        execution_key,
        tags,
    }
}

/// Raw tag strings of a `<test>` element (`tags/tag` text).
pub fn raw_tags(test: &Element) -> Vec<&str> {
    test.children_named("tags")
        .flat_map(|tags| tags.children_named("tag"))
        .filter_map(|tag| tag.text())
        .collect()
}
