//! @ai:module:intent Parse annotation values, JSON property blocks and tag shorthands
//! @ai:module:layer domain
//! @ai:module:public_api PropertyValue, Properties, ScalarValue, Payload, PayloadIssue, parse_payload, parse_properties, parse_scalar, parse_tag_shorthand
//! @ai:module:depends_on tokenizer, annotation
//! @ai:module:stateless true
//!
//! Property blocks are strict JSON objects. Values are converted into the
//! closed [`PropertyValue`] variant so callers match on them exhaustively.

use crate::annotation::DiagnosticKind;
use crate::tokenizer::RawAnnotation;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::Number;
use std::collections::BTreeSet;
use std::fmt;

/// Property key that carries the normalized tag set.
pub const TAGS_KEY: &str = "tags";

/// @ai:intent A JSON value inside a property block
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Number(Number),
    Bool(bool),
    Null,
    Array(Vec<PropertyValue>),
    Object(Properties),
}

/// @ai:intent Ordered property mapping; equality ignores order
#[derive(Debug, Clone, Default)]
pub struct Properties {
    entries: Vec<(String, PropertyValue)>,
}

/// @ai:intent The optional scalar written between key and property block
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    String(String),
    Number(Number),
    Bool(bool),
    Null,
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// @ai:intent Check whether the value is `text` or an array holding `text`
    /// @ai:effects pure
    pub fn contains_str(&self, text: &str) -> bool {
        match self {
            PropertyValue::String(s) => s == text,
            PropertyValue::Array(items) => items.iter().any(|item| item.as_str() == Some(text)),
            _ => false,
        }
    }
}

impl From<serde_json::Value> for PropertyValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => PropertyValue::Null,
            serde_json::Value::Bool(b) => PropertyValue::Bool(b),
            serde_json::Value::Number(n) => PropertyValue::Number(n),
            serde_json::Value::String(s) => PropertyValue::String(s),
            serde_json::Value::Array(items) => {
                PropertyValue::Array(items.into_iter().map(PropertyValue::from).collect())
            }
            serde_json::Value::Object(map) => PropertyValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, PropertyValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for PropertyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PropertyValue::String(s) => serializer.serialize_str(s),
            PropertyValue::Number(n) => n.serialize(serializer),
            PropertyValue::Bool(b) => serializer.serialize_bool(*b),
            PropertyValue::Null => serializer.serialize_unit(),
            PropertyValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            PropertyValue::Object(props) => props.serialize(serializer),
        }
    }
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// @ai:intent Insert or replace a property, keeping the original position on replace
    pub fn insert(&mut self, key: impl Into<String>, value: PropertyValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl PartialEq for Properties {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|o| o == v))
    }
}

impl FromIterator<(String, PropertyValue)> for Properties {
    fn from_iter<I: IntoIterator<Item = (String, PropertyValue)>>(iter: I) -> Self {
        let mut props = Properties::new();
        for (k, v) in iter {
            props.insert(k, v);
        }
        props
    }
}

impl Serialize for Properties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl Serialize for ScalarValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ScalarValue::String(s) => serializer.serialize_str(s),
            ScalarValue::Number(n) => n.serialize(serializer),
            ScalarValue::Bool(b) => serializer.serialize_bool(*b),
            ScalarValue::Null => serializer.serialize_unit(),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::String(s) => {
                write!(f, "{}", serde_json::to_string(s).map_err(|_| fmt::Error)?)
            }
            ScalarValue::Number(n) => write!(f, "{}", n),
            ScalarValue::Bool(b) => write!(f, "{}", b),
            ScalarValue::Null => f.write_str("null"),
        }
    }
}

/// @ai:intent A recoverable problem found while parsing one annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadIssue {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl PayloadIssue {
    fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// @ai:intent Typed value, properties and tags of one annotation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    pub value: Option<ScalarValue>,
    pub properties: Properties,
    pub tags: BTreeSet<String>,
    pub issues: Vec<PayloadIssue>,
}

/// @ai:intent Parse every raw part of a tokenized annotation
/// @ai:post properties is empty when the brace span is malformed
/// @ai:post tags is the union of the tags property and the shorthand
/// @ai:effects pure
pub fn parse_payload(raw: &RawAnnotation) -> Payload {
    let mut payload = Payload::default();

    if let Some(token) = &raw.raw_value {
        match parse_scalar(token) {
            Some(value) => payload.value = Some(value),
            None => payload.issues.push(PayloadIssue::new(
                DiagnosticKind::MalformedValue,
                format!(
                    "value `{}` of `{}` is not a quoted string, number, true, false or null; ignored",
                    token, raw.key
                ),
            )),
        }
    }

    if let Some(span) = &raw.raw_props {
        match parse_properties(span) {
            Ok(props) => payload.properties = props,
            Err(message) => payload.issues.push(PayloadIssue::new(
                DiagnosticKind::MalformedProperties,
                format!("properties of `{}` are not a valid JSON object: {}", raw.key, message),
            )),
        }
    }

    let had_tags_property = payload.properties.get(TAGS_KEY).is_some();
    if let Some(value) = payload.properties.get(TAGS_KEY) {
        let (tags, problems) = tags_from_property(value);
        payload.tags.extend(tags);
        payload.issues.extend(
            problems
                .into_iter()
                .map(|m| PayloadIssue::new(DiagnosticKind::MalformedTagToken, m)),
        );
    }

    if let Some(span) = &raw.raw_tags {
        let (tags, problems) = parse_tag_shorthand(span);
        payload.tags.extend(tags);
        payload.issues.extend(
            problems
                .into_iter()
                .map(|m| PayloadIssue::new(DiagnosticKind::MalformedTagToken, m)),
        );
    }

    if had_tags_property || !payload.tags.is_empty() {
        let normalized = payload
            .tags
            .iter()
            .cloned()
            .map(PropertyValue::String)
            .collect();
        payload
            .properties
            .insert(TAGS_KEY, PropertyValue::Array(normalized));
    }

    payload
}

/// @ai:intent Parse a brace span as a strict JSON object
/// @ai:example ("{\"a\": 1}") -> Ok({a: 1})
/// @ai:example ("{a: 1}") -> Err
/// @ai:effects pure
pub fn parse_properties(span: &str) -> Result<Properties, String> {
    match serde_json::from_str::<serde_json::Value>(span) {
        Ok(serde_json::Value::Object(map)) => Ok(map
            .into_iter()
            .map(|(k, v)| (k, PropertyValue::from(v)))
            .collect()),
        Ok(_) => Err("expected an object".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

/// @ai:intent Parse a value token: quoted JSON string, JSON number, true, false or null
/// @ai:example ("true") -> Some(Bool(true))
/// @ai:example ("\"x\"") -> Some(String("x"))
/// @ai:example ("fix") -> None
/// @ai:effects pure
pub fn parse_scalar(token: &str) -> Option<ScalarValue> {
    match token {
        "true" => Some(ScalarValue::Bool(true)),
        "false" => Some(ScalarValue::Bool(false)),
        "null" => Some(ScalarValue::Null),
        _ if token.starts_with('"') => serde_json::from_str::<String>(token)
            .ok()
            .map(ScalarValue::String),
        _ => serde_json::from_str::<Number>(token)
            .ok()
            .map(ScalarValue::Number),
    }
}

/// @ai:intent Parse the `[a, b, "c d"]` shorthand into tags plus problem messages
/// @ai:post malformed tokens are dropped and reported, valid ones kept
/// @ai:effects pure
pub fn parse_tag_shorthand(span: &str) -> (Vec<String>, Vec<String>) {
    let mut tags = Vec::new();
    let mut problems = Vec::new();

    let inner = match span
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
    {
        Some(inner) => inner,
        None => {
            problems.push(format!(
                "tags shorthand `tags={}` must be a bracketed list like tags=[a, b]",
                span
            ));
            return (tags, problems);
        }
    };

    if inner.trim().is_empty() {
        return (tags, problems);
    }

    for token in split_outside_quotes(inner) {
        let token = token.trim();
        match parse_tag_token(token) {
            Ok(tag) => tags.push(tag),
            Err(problem) => problems.push(problem),
        }
    }

    (tags, problems)
}

fn parse_tag_token(token: &str) -> Result<String, String> {
    if token.is_empty() {
        return Err("empty tag in tags shorthand".to_string());
    }

    if token.starts_with('"') {
        return match serde_json::from_str::<String>(token) {
            Ok(tag) if !tag.trim().is_empty() => Ok(tag),
            Ok(_) => Err("empty tag in tags shorthand".to_string()),
            Err(_) => Err(format!("tag `{}` is not a valid quoted string", token)),
        };
    }

    if token.contains(['"', '[', ']', '{', '}']) {
        return Err(format!("tag `{}` contains quote or bracket characters", token));
    }

    Ok(token.to_string())
}

/// Split on commas that are not inside a quoted string.
fn split_outside_quotes(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
        } else if c == '"' {
            in_string = true;
        } else if c == ',' {
            parts.push(&text[start..idx]);
            start = idx + 1;
        }
    }
    parts.push(&text[start..]);
    parts
}

fn tags_from_property(value: &PropertyValue) -> (Vec<String>, Vec<String>) {
    let mut tags = Vec::new();
    let mut problems = Vec::new();

    let items = match value {
        PropertyValue::Array(items) => items.as_slice(),
        PropertyValue::String(_) => std::slice::from_ref(value),
        _ => {
            problems.push("`tags` property must be an array of strings".to_string());
            return (tags, problems);
        }
    };

    for item in items {
        match item {
            PropertyValue::String(s) if !s.trim().is_empty() => tags.push(s.clone()),
            PropertyValue::String(_) => problems.push("empty tag in `tags` property".to_string()),
            other => problems.push(format!(
                "tag {} in `tags` property is not a string",
                serde_json::to_string(other).unwrap_or_default()
            )),
        }
    }

    (tags, problems)
}
