//! OAI-PMH response parsing
//!
//! Responses are small (one page), so each is read into a namespace-aware
//! element tree first and then queried. Element matching is by namespace
//! URI plus local name, never by prefix.

use super::error::{HarvestError, HarvestResult};
use super::record::{FieldValue, HarvestRecord, RecordPage};
use crate::model::RecordStatus;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use std::collections::BTreeMap;
use tracing::debug;

/// Protocol namespace
pub const OAI_NS: &str = "http://www.openarchives.org/OAI/2.0/";

/// A parsed element: namespace, local name, attributes, direct text, children.
#[derive(Debug, Clone, Default)]
pub(crate) struct Element {
    ns: Option<String>,
    name: String,
    attrs: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn is(&self, ns: &str, name: &str) -> bool {
        self.name == name && self.ns.as_deref() == Some(ns)
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn text(&self) -> &str {
        self.text.trim()
    }

    fn child(&self, ns: &str, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.is(ns, name))
    }

    fn children_named<'a>(&'a self, ns: &'a str, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.is(ns, name))
    }

    /// First descendant-or-self matching, depth first.
    fn find(&self, ns: &str, name: &str) -> Option<&Element> {
        if self.is(ns, name) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(ns, name))
    }

    /// Every descendant-or-self matching, in document order.
    fn find_all<'a>(&'a self, ns: &str, name: &str, out: &mut Vec<&'a Element>) {
        if self.is(ns, name) {
            out.push(self);
        }
        for child in &self.children {
            child.find_all(ns, name, out);
        }
    }

    /// Child local name → text, for introspection responses.
    fn child_texts(&self) -> BTreeMap<String, String> {
        self.children
            .iter()
            .map(|c| (c.name.clone(), c.text().to_string()))
            .collect()
    }
}

fn namespace_of(resolved: ResolveResult<'_>) -> Option<String> {
    match resolved {
        ResolveResult::Bound(Namespace(ns)) => Some(String::from_utf8_lossy(ns).into_owned()),
        _ => None,
    }
}

fn open_element(ns: Option<String>, e: &quick_xml::events::BytesStart<'_>) -> HarvestResult<Element> {
    let mut attrs = Vec::new();
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.push((key, value));
    }
    Ok(Element {
        ns,
        name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
        attrs,
        ..Element::default()
    })
}

/// Parse a whole document into its root element.
pub(crate) fn parse_document(xml: &str) -> HarvestResult<Element> {
    let mut reader = NsReader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let (resolved, event) = reader.read_resolved_event()?;
        match event {
            Event::Start(ref e) => {
                let element = open_element(namespace_of(resolved), e)?;
                stack.push(element);
            }
            Event::Empty(ref e) => {
                let element = open_element(namespace_of(resolved), e)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Event::End(_) => {
                let Some(element) = stack.pop() else {
                    return Err(HarvestError::Xml("unbalanced end tag".to_string()));
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Event::Text(ref e) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&e.unescape()?);
                }
            }
            Event::CData(ref e) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(HarvestError::Xml("unexpected end of document".to_string()));
    }
    root.ok_or_else(|| HarvestError::Xml("empty document".to_string()))
}

/// Parse a response and fail on a protocol `error` element anywhere in it.
pub(crate) fn parse_response(xml: &str) -> HarvestResult<Element> {
    let root = parse_document(xml)?;
    if let Some(error) = root.find(OAI_NS, "error") {
        let message = match error.text() {
            "" => "No error message".to_string(),
            text => text.to_string(),
        };
        return Err(HarvestError::Protocol {
            code: error.attr("code").unwrap_or("unknown").to_string(),
            message,
        });
    }
    Ok(root)
}

/// `arxiv_id` is the last `:`-separated part of the OAI identifier.
pub fn arxiv_id_from_identifier(identifier: &str) -> &str {
    identifier.rsplit(':').next().unwrap_or(identifier)
}

fn parse_record(record: &Element) -> Option<HarvestRecord> {
    let header = record.child(OAI_NS, "header")?;
    let identifier = header.child(OAI_NS, "identifier")?.text().to_string();
    if identifier.is_empty() {
        return None;
    }
    let datestamp = header
        .child(OAI_NS, "datestamp")
        .map(|d| d.text().to_string())
        .unwrap_or_default();

    if header.attr("status") == Some("deleted") {
        return Some(HarvestRecord {
            arxiv_id: arxiv_id_from_identifier(&identifier).to_string(),
            identifier,
            datestamp,
            sets: Vec::new(),
            status: RecordStatus::Deleted,
            fields: BTreeMap::new(),
        });
    }

    // The metadata root is the single child of <metadata>, whatever its format.
    let metadata = record.child(OAI_NS, "metadata")?.children.first()?;

    let mut fields: BTreeMap<String, FieldValue> = BTreeMap::new();
    for field in &metadata.children {
        let value = field.text();
        if value.is_empty() {
            continue;
        }
        match fields.get_mut(&field.name) {
            Some(existing) => existing.push(value.to_string()),
            None => {
                fields.insert(field.name.clone(), FieldValue::One(value.to_string()));
            }
        }
    }

    let sets = header
        .children_named(OAI_NS, "setSpec")
        .map(|s| s.text().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    Some(HarvestRecord {
        arxiv_id: arxiv_id_from_identifier(&identifier).to_string(),
        identifier,
        datestamp,
        sets,
        status: RecordStatus::Active,
        fields,
    })
}

/// Parse a `ListRecords` response into records and the next token.
///
/// Records without a header, an identifier, or (when active) metadata are
/// skipped. An empty token element means the listing is complete.
pub fn parse_list_records(xml: &str) -> HarvestResult<RecordPage> {
    let root = parse_response(xml)?;

    let mut elements = Vec::new();
    root.find_all(OAI_NS, "record", &mut elements);

    let mut records = Vec::with_capacity(elements.len());
    for element in elements {
        match parse_record(element) {
            Some(record) => records.push(record),
            None => debug!("Skipping record without header or metadata"),
        }
    }

    let resumption_token = root
        .find(OAI_NS, "resumptionToken")
        .map(|t| t.text().to_string())
        .filter(|t| !t.is_empty());

    Ok(RecordPage {
        records,
        resumption_token,
    })
}

/// Parse an `Identify` response.
pub fn parse_identify(xml: &str) -> HarvestResult<BTreeMap<String, String>> {
    let root = parse_response(xml)?;
    root.find(OAI_NS, "Identify")
        .map(Element::child_texts)
        .ok_or_else(|| HarvestError::Malformed {
            verb: "Identify",
            detail: "missing Identify element".to_string(),
        })
}

/// Parse a listing of `entry` elements (`metadataFormat`, `set`), each into
/// a child name → text map.
pub fn parse_entries(xml: &str, entry: &str) -> HarvestResult<Vec<BTreeMap<String, String>>> {
    let root = parse_response(xml)?;
    let mut elements = Vec::new();
    root.find_all(OAI_NS, entry, &mut elements);
    Ok(elements.into_iter().map(Element::child_texts).collect())
}
