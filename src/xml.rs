//! Lightweight element tree over quick-xml.
//!
//! The dialect adapters navigate parsed documents rather than raw event
//! streams, so this module materializes a small arena-backed tree: one
//! `Vec` of elements, `ElementRef` indexes as handles, and accessors for
//! tags, attributes, text and children. Comments, processing instructions
//! and CDATA boundaries are not preserved; attribute values and text are
//! unescaped.
//!
//! ```text
//! Document
//! ├── elements: Vec<ElementData>   (index 0 is the root)
//! └── ElementRef(u32)              (Copy handle into the arena)
//! ```

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::TranslationError;

/// Handle to an element inside a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementRef(u32);

#[derive(Debug, Clone)]
struct ElementData {
    tag: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<ElementRef>,
    parent: Option<ElementRef>,
}

/// A parsed XML document as a flat element arena.
#[derive(Debug, Clone)]
pub struct Document {
    elements: Vec<ElementData>,
}

impl Document {
    /// Parse a document from raw bytes.
    ///
    /// Fails on malformed markup or input with no root element.
    pub fn parse(input: &[u8]) -> Result<Self, TranslationError> {
        let mut reader = Reader::from_reader(input);
        reader.config_mut().trim_text(true);

        let mut elements: Vec<ElementData> = Vec::new();
        let mut stack: Vec<ElementRef> = Vec::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    let id = push_element(&mut elements, &stack, e)?;
                    stack.push(id);
                }
                Ok(Event::Empty(ref e)) => {
                    // Self-closing element, never entered.
                    push_element(&mut elements, &stack, e)?;
                }
                Ok(Event::End(_)) => {
                    stack.pop();
                }
                Ok(Event::Text(ref t)) => {
                    if let Some(&current) = stack.last() {
                        let text = t.unescape().map_err(|e| {
                            TranslationError::xml(format!("Text decode error: {e}"))
                        })?;
                        let data = &mut elements[current.0 as usize];
                        data.text.push_str(&text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(TranslationError::xml(format!(
                        "XML parse error at position {}: {e}",
                        reader.error_position()
                    )));
                }
                _ => {}
            }
            buf.clear();
        }

        if elements.is_empty() {
            return Err(TranslationError::xml("document has no root element"));
        }
        Ok(Self { elements })
    }

    /// The document's root element.
    pub fn root(&self) -> ElementRef {
        ElementRef(0)
    }

    /// Fully qualified tag of an element (prefix included).
    pub fn tag(&self, el: ElementRef) -> &str {
        &self.elements[el.0 as usize].tag
    }

    /// Tag with any namespace prefix stripped.
    pub fn local_tag(&self, el: ElementRef) -> &str {
        let tag = self.tag(el);
        tag.rsplit(':').next().unwrap_or(tag)
    }

    /// Attribute value by exact (qualified) name.
    pub fn attribute(&self, el: ElementRef, name: &str) -> Option<&str> {
        self.elements[el.0 as usize]
            .attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Concatenated direct text content of an element.
    pub fn text(&self, el: ElementRef) -> &str {
        &self.elements[el.0 as usize].text
    }

    /// Direct children in document order.
    pub fn children(&self, el: ElementRef) -> &[ElementRef] {
        &self.elements[el.0 as usize].children
    }

    /// The enclosing element, None for the root.
    pub fn parent(&self, el: ElementRef) -> Option<ElementRef> {
        self.elements[el.0 as usize].parent
    }

    /// Direct children whose local tag matches `tag`.
    pub fn children_named(&self, el: ElementRef, tag: &str) -> Vec<ElementRef> {
        self.children(el)
            .iter()
            .copied()
            .filter(|&c| self.local_tag(c) == tag)
            .collect()
    }

    /// First direct child with the given local tag.
    pub fn first_child_named(&self, el: ElementRef, tag: &str) -> Option<ElementRef> {
        self.children(el)
            .iter()
            .copied()
            .find(|&c| self.local_tag(c) == tag)
    }

    /// Text of the first direct child with the given local tag.
    pub fn child_text(&self, el: ElementRef, tag: &str) -> Option<&str> {
        self.first_child_named(el, tag).map(|c| self.text(c))
    }

    /// Attribute parsed as an integer, or 0 when absent/malformed.
    pub fn int_attribute(&self, el: ElementRef, name: &str) -> i32 {
        self.attribute(el, name)
            .and_then(|v| v.parse::<f64>().ok())
            .map(|v| v.round() as i32)
            .unwrap_or(0)
    }
}

fn push_element(
    elements: &mut Vec<ElementData>,
    stack: &[ElementRef],
    e: &BytesStart<'_>,
) -> Result<ElementRef, TranslationError> {
    let tag = std::str::from_utf8(e.name().as_ref())
        .map_err(|e| TranslationError::xml(format!("Invalid tag name: {e}")))?
        .to_string();

    let mut attributes = Vec::new();
    for attr_result in e.attributes() {
        let attr =
            attr_result.map_err(|e| TranslationError::xml(format!("Attribute error: {e}")))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| TranslationError::xml(format!("Attribute key error: {e}")))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| TranslationError::xml(format!("Attribute value error: {e}")))?
            .to_string();
        attributes.push((key, value));
    }

    let parent = stack.last().copied();
    let id = ElementRef(elements.len() as u32);
    elements.push(ElementData {
        tag,
        attributes,
        text: String::new(),
        children: Vec::new(),
        parent,
    });
    if let Some(p) = parent {
        elements[p.0 as usize].children.push(id);
    }
    Ok(id)
}
