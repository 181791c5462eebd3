//! Normalization of free-form model output into canonical results.
//!
//! Models are asked for JSON but often wrap it in code fences or prose.
//! Extraction first tries a strict parse of the fence-stripped text, then
//! parses the outermost `{...}` span. Anything that still does not parse,
//! or does not coerce into the module's shape, is unusable: the caller gets
//! `None`, never a partially filled result.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

use crate::models::{CanonicalResult, Module, SearchRecord, DEFAULT_RECORD_YEAR, MAX_TITLES};

fn code_fence() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"(?i)```json|```").expect("valid fence regex"))
}

fn object_span() -> &'static Regex {
    static OBJECT: OnceLock<Regex> = OnceLock::new();
    OBJECT.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("valid object regex"))
}

/// Extract a JSON object from model output
pub fn extract_json(text: &str) -> Option<Map<String, Value>> {
    if text.trim().is_empty() {
        return None;
    }

    let cleaned = code_fence().replace_all(text, "");
    let cleaned = cleaned.trim();

    let value = match serde_json::from_str::<Value>(cleaned) {
        Ok(value) => value,
        Err(_) => {
            let span = object_span().find(cleaned)?;
            serde_json::from_str::<Value>(span.as_str()).ok()?
        }
    };

    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Parse and coerce model output for a module
pub fn normalize_text(module: Module, text: &str) -> Option<CanonicalResult> {
    let payload = extract_json(text)?;
    let result = normalize(module, &payload);
    if result.is_none() {
        tracing::debug!(module = %module, "Model output did not match the module schema");
    }
    result
}

/// Coerce a parsed payload into the module's canonical shape
pub fn normalize(module: Module, payload: &Map<String, Value>) -> Option<CanonicalResult> {
    match module {
        Module::Topic => {
            let mut titles = field(payload, "titles").and_then(text_list).unwrap_or_default();
            if titles.is_empty() {
                // A lone `title` string is the one promoted shape
                titles = text_field(payload, "title").into_iter().collect();
            }
            titles.truncate(MAX_TITLES);
            non_empty(titles).map(|titles| CanonicalResult::Topic { titles })
        }
        Module::Outline => {
            let sections = non_empty(field(payload, "sections").and_then(text_list)?)?;
            let logic = match field(payload, "logic") {
                None => Vec::new(),
                Some(value) => text_list(value)?,
            };
            Some(CanonicalResult::Outline { sections, logic })
        }
        Module::Draft => text_field(payload, "draft").map(|draft| CanonicalResult::Draft { draft }),
        Module::Polish => {
            text_field(payload, "polished").map(|polished| CanonicalResult::Polish { polished })
        }
        Module::Search => {
            let records = match field(payload, "results")? {
                Value::Array(items) => items.iter().filter_map(search_record).collect(),
                _ => Vec::new(),
            };
            non_empty(records).map(|results| CanonicalResult::Search { results })
        }
        Module::Citations => text_field(payload, "citationBlock")
            .map(|citation_block| CanonicalResult::Citations { citation_block }),
    }
}

/// A present, non-null field
fn field<'a>(payload: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    payload.get(name).filter(|value| !value.is_null())
}

/// Scalar as trimmed text; objects, arrays and nulls have none
fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Array entries as trimmed strings; anything but an array has none
fn text_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(items.iter().filter_map(scalar_text).collect()),
        _ => None,
    }
}

fn text_field(payload: &Map<String, Value>, name: &str) -> Option<String> {
    match field(payload, name)? {
        Value::String(s) => {
            let text = s.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        _ => None,
    }
}

fn search_record(value: &Value) -> Option<SearchRecord> {
    let item = value.as_object()?;
    let title = item.get("title").and_then(scalar_text)?;
    let source = item.get("source").and_then(scalar_text)?;
    let year = item.get("year").and_then(parse_year).unwrap_or(DEFAULT_RECORD_YEAR);
    Some(SearchRecord { title, year, source })
}

fn parse_year(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .and_then(|y| i32::try_from(y).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}
