//! In-memory structural tree for title XML, parsed via `quick-xml` events.
//!
//! A [`StructuralNode`] mirrors the markup's shape: character data before a
//! node's first child element is the node's `text`; character data following
//! a child element is that child's `tail`. Word counting depends on both.
//!
//! Parsing drives an explicit stack rather than recursion, so arbitrarily
//! deep markup cannot overflow the call stack here.

use anyhow::{bail, Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// One element of a title's structural hierarchy.
#[derive(Debug, Clone, Default)]
pub struct StructuralNode {
    pub tag: String,
    /// The `N` attribute: the subdivision identifier ("1", "III", "425").
    pub ident: Option<String>,
    pub text: String,
    pub tail: String,
    pub children: Vec<StructuralNode>,
}

/// Parse a title's XML into its root [`StructuralNode`].
///
/// Malformed markup is an error; the orchestrator treats it as zero counts
/// for the document rather than aborting the run.
pub fn parse_document(xml: &[u8]) -> Result<StructuralNode> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut stack: Vec<StructuralNode> = Vec::new();
    let mut root: Option<StructuralNode> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                stack.push(node_from_start(&e));
            }
            Ok(Event::Empty(e)) => {
                let node = node_from_start(&e);
                attach(&mut stack, &mut root, node)?;
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .with_context(|| "Failed to decode character data")?;
                append_text(&mut stack, &text);
            }
            Ok(Event::CData(c)) => {
                let text = String::from_utf8_lossy(&c).into_owned();
                append_text(&mut stack, &text);
            }
            Ok(Event::End(_)) => {
                let node = stack.pop().context("Unbalanced closing tag")?;
                attach(&mut stack, &mut root, node)?;
            }
            Ok(Event::Eof) => break,
            Err(e) => bail!("Malformed document markup: {}", e),
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        bail!("Document ended with {} unclosed elements", stack.len());
    }
    root.context("Document has no root element")
}

fn node_from_start(e: &BytesStart) -> StructuralNode {
    let tag = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
    let mut ident = None;
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == b"N" {
            ident = attr.unescape_value().ok().map(|v| v.into_owned());
        }
    }
    StructuralNode {
        tag,
        ident,
        ..Default::default()
    }
}

fn attach(
    stack: &mut [StructuralNode],
    root: &mut Option<StructuralNode>,
    node: StructuralNode,
) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    } else if root.is_none() {
        *root = Some(node);
    } else {
        bail!("Document has more than one root element");
    }
    Ok(())
}

fn append_text(stack: &mut [StructuralNode], text: &str) {
    // Character data outside the root element is dropped.
    if let Some(current) = stack.last_mut() {
        if let Some(last_child) = current.children.last_mut() {
            last_child.tail.push_str(text);
        } else {
            current.text.push_str(text);
        }
    }
}
