//! Per-column transforms.
//!
//! Each function maps one non-null field value to a cell. `None` means the
//! value had no usable shape and the target is left out of that column.

use serde_json::{Map, Value};

pub const PHAROS_TARGET_URL: &str = "https://pharos.nih.gov/targets/";
pub const PUBMED_URL: &str = "https://pubmed.ncbi.nlm.nih.gov/";

/// First element of a non-empty list; anything else unchanged.
pub fn first_if_list(value: &Value) -> Value {
    match value {
        Value::Array(items) if !items.is_empty() => items[0].clone(),
        other => other.clone(),
    }
}

/// Python-style truthiness of a JSON value.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn key_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// `{item[key_ptr]: item[value_ptr]}` over a list of objects. Items without
/// a key are skipped; a later duplicate key overwrites an earlier one.
pub fn collect_pairs(value: &Value, key_ptr: &str, value_ptr: &str) -> Option<Value> {
    let items = value.as_array()?;
    let mut out = Map::new();
    for item in items {
        let Some(key) = item.pointer(key_ptr).and_then(key_text) else {
            continue;
        };
        let val = item.pointer(value_ptr).cloned().unwrap_or(Value::Null);
        out.insert(key, val);
    }
    Some(Value::Object(out))
}

/// `item[ptr]` for every item that has it.
pub fn collect_field(value: &Value, ptr: &str) -> Option<Value> {
    let items = value.as_array()?;
    Some(Value::Array(
        items.iter().filter_map(|item| item.pointer(ptr).cloned()).collect(),
    ))
}

/// `"<prefix><item.name>"` labels.
pub fn prefixed_names(value: &Value, prefix: &str) -> Option<Vec<Value>> {
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| item.get("name").and_then(Value::as_str))
            .map(|name| Value::String(format!("{}{}", prefix, name)))
            .collect(),
    )
}

/// DTO then Panther class labels; needs both lists.
pub fn classes(dto: &Value, panther: &Value) -> Option<Value> {
    let mut labels = prefixed_names(dto, "DTO: ")?;
    labels.extend(prefixed_names(panther, "Panther: ")?);
    Some(Value::Array(labels))
}

/// `"<modality>: <label>"` for every tractability assessment with a truthy value.
pub fn tractability(value: &Value) -> Option<Value> {
    let items = value.as_array()?;
    Some(Value::Array(
        items
            .iter()
            .filter(|item| item.get("value").map_or(false, truthy))
            .filter_map(|item| {
                let modality = item.get("modality")?.as_str()?;
                let label = item.get("label")?.as_str()?;
                Some(Value::String(format!("{}: {}", modality, label)))
            })
            .collect(),
    ))
}

/// Tissue → RNA value, in the order tissues were reported.
pub fn expression_pairs(value: &Value) -> Option<Vec<(String, Value)>> {
    let items = value.as_array()?;
    let mut pairs: Vec<(String, Value)> = Vec::new();
    for item in items {
        let Some(label) = item.pointer("/tissue/label").and_then(key_text) else {
            continue;
        };
        let rna = item.pointer("/rna/value").cloned().unwrap_or(Value::Null);
        match pairs.iter_mut().find(|(l, _)| *l == label) {
            Some(existing) => existing.1 = rna,
            None => pairs.push((label, rna)),
        }
    }
    Some(pairs)
}

/// The `top_k` highest-expressed tissues as `[label, value]` pairs, highest
/// first. Ties keep report order.
pub fn top_expression(value: &Value, top_k: usize) -> Option<Value> {
    let mut pairs = expression_pairs(value)?;
    pairs.sort_by(|a, b| {
        let (a, b) = (rank_value(&a.1), rank_value(&b.1));
        b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal)
    });
    pairs.truncate(top_k);
    Some(Value::Array(
        pairs
            .into_iter()
            .map(|(label, v)| Value::Array(vec![Value::String(label), v]))
            .collect(),
    ))
}

fn rank_value(value: &Value) -> f64 {
    value.as_f64().unwrap_or(f64::NEG_INFINITY)
}

/// `true` for a non-empty list, `false` for an empty one.
pub fn non_empty(value: &Value) -> Option<Value> {
    value.as_array().map(|items| Value::Bool(!items.is_empty()))
}

/// LOEUF (`oeUpper` of the `lof` constraint). A single match is returned
/// bare, otherwise the list of matches.
pub fn loeuf(value: &Value) -> Option<Value> {
    let items = value.as_array()?;
    let mut uppers: Vec<Value> = items
        .iter()
        .filter(|item| item.get("constraintType").and_then(Value::as_str) == Some("lof"))
        .map(|item| item.get("oeUpper").cloned().unwrap_or(Value::Null))
        .collect();
    if uppers.len() == 1 {
        uppers.pop()
    } else {
        Some(Value::Array(uppers))
    }
}

/// PubMed link for the first reference of each evidence row.
pub fn publications(value: &Value) -> Option<Value> {
    let rows = value.as_array()?;
    Some(Value::Array(
        rows.iter()
            .filter_map(|row| row.pointer("/literature/0").and_then(key_text))
            .map(|pmid| Value::String(format!("{}{}", PUBMED_URL, pmid)))
            .collect(),
    ))
}

/// Score of the first associated-disease row whose disease id matches.
pub fn disease_association(value: &Value, disease_id: &str) -> Option<Value> {
    value
        .as_array()?
        .iter()
        .find(|row| row.pointer("/disease/id").and_then(Value::as_str) == Some(disease_id))
        .and_then(|row| row.get("score").cloned())
}

pub fn pharos_link(target: &str) -> Value {
    Value::String(format!("{}{}", PHAROS_TARGET_URL, target))
}
