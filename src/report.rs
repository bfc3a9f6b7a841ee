//! Owned element tree for one `<test>` subtree of a Robot Framework report.
//!
//! The walker materializes a single test at a time, so queries here can be
//! simple tree walks without worrying about report size.
use anyhow::{anyhow, Context, Result};
use quick_xml::events::BytesStart;

pub const SUITE_TAG: &str = "suite";
pub const TEST_TAG: &str = "test";
pub const KEYWORD_TAG: &str = "kw";
pub const STATUS_TAG: &str = "status";
pub const MSG_TAG: &str = "msg";

pub const ATTR_NAME: &str = "name";
pub const ATTR_TYPE: &str = "type";
pub const ATTR_STATUS: &str = "status";
pub const ATTR_LEVEL: &str = "level";
pub const ATTR_STARTTIME: &str = "starttime";
pub const ATTR_ENDTIME: &str = "endtime";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    pub(crate) fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.with_context(|| format!("read attributes of <{name}>"))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .with_context(|| format!("decode attribute {key} of <{name}>"))?
                .into_owned();
            attrs.push((key, value));
        }
        Ok(Self {
            name,
            attrs,
            text: String::new(),
            children: Vec::new(),
        })
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Element text, or `None` when it is blank.
    pub fn text(&self) -> Option<&str> {
        if self.text.trim().is_empty() {
            None
        } else {
            Some(&self.text)
        }
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Elements named `name` in this subtree, self included, in document order.
    pub fn descendants_named<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        let mut stack = vec![self];
        while let Some(element) = stack.pop() {
            if element.name == name {
                found.push(element);
            }
            stack.extend(element.children.iter().rev());
        }
        found
    }

    /// The `name` attribute, required on tests and keywords.
    pub fn required_name(&self) -> Result<&str> {
        self.attr(ATTR_NAME)
            .ok_or_else(|| anyhow!("<{}> element has no name attribute", self.name))
    }

    /// The `<status>` child, required on tests and keywords.
    pub fn status_element(&self) -> Result<&Element> {
        self.child(STATUS_TAG).ok_or_else(|| {
            anyhow!(
                "<{}> {:?} has no <status> element",
                self.name,
                self.attr(ATTR_NAME).unwrap_or_default()
            )
        })
    }
}

/// Parse a standalone XML fragment into a tree.
#[cfg(test)]
pub(crate) fn parse_fragment(xml: &str) -> Result<Element> {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(xml);
    reader.expand_empty_elements(true);
    let mut open: Vec<Element> = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(start) => open.push(Element::from_start(&start)?),
            Event::End(_) => {
                let element = open.pop().ok_or_else(|| anyhow!("unbalanced end tag"))?;
                match open.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => return Ok(element),
                }
            }
            Event::Text(text) => {
                if let Some(current) = open.last_mut() {
                    current.text.push_str(&text.unescape()?);
                }
            }
            Event::Eof => return Err(anyhow!("fragment has no root element")),
            _ => {}
        }
    }
}
