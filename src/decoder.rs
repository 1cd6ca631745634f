//! Decoding of inbound device payloads.
//!
//! Speakers answer in XML. A payload is turned into a `serde_json::Value`
//! tree so the rest of the crate can work with one document shape:
//!
//! - the root element becomes the single top-level key
//! - attributes are merged into the element as string properties
//! - repeated children with the same name are collected into an array
//! - an element with only text becomes that string (`""` when empty)
//! - text mixed with attributes or children is kept under `"_"`

use crate::error::{Result, SoundTouchError};
use serde_json::{Map, Value};
use xmltree::{Element, XMLNode};

/// Property holding the text of an element that also has attributes or children
pub const TEXT_KEY: &str = "_";

/// A decoded inbound message: an object keyed by its root tag
pub type Document = Map<String, Value>;

/// Decode a raw payload into a [`Document`]
pub fn decode(raw: &[u8]) -> Result<Document> {
    let root = Element::parse(raw).map_err(|e| SoundTouchError::Decode(e.to_string()))?;

    let mut document = Map::new();
    document.insert(root.name.clone(), element_to_value(&root));
    Ok(document)
}

fn element_to_value(element: &Element) -> Value {
    let mut text = String::new();
    let mut has_children = false;

    for node in &element.children {
        match node {
            XMLNode::Text(t) | XMLNode::CData(t) => text.push_str(t),
            XMLNode::Element(_) => has_children = true,
            _ => {}
        }
    }
    let text = text.trim();

    if element.attributes.is_empty() && !has_children {
        return Value::String(text.to_string());
    }

    let mut map = Map::new();

    // HashMap iteration order is unstable, keep attribute merging deterministic
    let mut attributes: Vec<_> = element.attributes.iter().collect();
    attributes.sort();
    for (name, value) in attributes {
        insert_property(&mut map, name, Value::String(value.clone()));
    }

    for node in &element.children {
        if let XMLNode::Element(child) = node {
            insert_property(&mut map, &child.name, element_to_value(child));
        }
    }

    if !text.is_empty() {
        insert_property(&mut map, TEXT_KEY, Value::String(text.to_string()));
    }

    Value::Object(map)
}

fn insert_property(map: &mut Map<String, Value>, name: &str, value: Value) {
    match map.get_mut(name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            map.insert(name.to_string(), value);
        }
    }
}
