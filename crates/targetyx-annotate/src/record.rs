//! Merged annotation record: target → source → raw provider JSON.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// One annotation source, with its key in the merged record and the column
/// prefix used when the record is flattened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceName {
    OpenTargets,
    OpenTargetsDiseaseEvidence,
    Pharos,
}

impl SourceName {
    pub const ALL: [SourceName; 3] = [
        SourceName::OpenTargets,
        SourceName::OpenTargetsDiseaseEvidence,
        SourceName::Pharos,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            SourceName::OpenTargets                => "OpenTargets",
            SourceName::OpenTargetsDiseaseEvidence => "OpenTargets_disease_evidence",
            SourceName::Pharos                     => "Pharos",
        }
    }

    pub fn column_prefix(&self) -> &'static str {
        match self {
            SourceName::OpenTargets                => "OT_",
            SourceName::OpenTargetsDiseaseEvidence => "OT_disease_",
            SourceName::Pharos                     => "Pharos_",
        }
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Every source's payload for one target. A source with no data for the
/// target holds an empty object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRecord {
    #[serde(rename = "OpenTargets", default = "empty_object")]
    pub open_targets: Value,

    #[serde(rename = "OpenTargets_disease_evidence", default = "empty_object")]
    pub disease_evidence: Value,

    #[serde(rename = "Pharos", default = "empty_object")]
    pub pharos: Value,
}

impl Default for TargetRecord {
    fn default() -> Self {
        Self {
            open_targets: empty_object(),
            disease_evidence: empty_object(),
            pharos: empty_object(),
        }
    }
}

impl TargetRecord {
    pub fn source(&self, source: SourceName) -> &Value {
        match source {
            SourceName::OpenTargets                => &self.open_targets,
            SourceName::OpenTargetsDiseaseEvidence => &self.disease_evidence,
            SourceName::Pharos                     => &self.pharos,
        }
    }

    pub fn set(&mut self, source: SourceName, value: Value) {
        match source {
            SourceName::OpenTargets                => self.open_targets = value,
            SourceName::OpenTargetsDiseaseEvidence => self.disease_evidence = value,
            SourceName::Pharos                     => self.pharos = value,
        }
    }
}

/// A looked-up field: missing key, explicit JSON `null`, or a value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field<'a> {
    Absent,
    Null,
    Present(&'a Value),
}

impl<'a> Field<'a> {
    pub fn of(value: Option<&'a Value>) -> Self {
        match value {
            None => Field::Absent,
            Some(Value::Null) => Field::Null,
            Some(v) => Field::Present(v),
        }
    }

    pub fn value(self) -> Option<&'a Value> {
        match self {
            Field::Present(v) => Some(v),
            Field::Absent | Field::Null => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Field::Present(_))
    }
}

/// Targets in insertion order, each with its [`TargetRecord`]. Serializes
/// as a JSON object keyed by target id.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnnotationRecord {
    entries: Vec<(String, TargetRecord)>,
}

impl AnnotationRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record for `target`, keeping its first position.
    pub fn insert(&mut self, target: impl Into<String>, record: TargetRecord) {
        let target = target.into();
        match self.entries.iter_mut().find(|(t, _)| *t == target) {
            Some((_, existing)) => *existing = record,
            None => self.entries.push((target, record)),
        }
    }

    pub fn get(&self, target: &str) -> Option<&TargetRecord> {
        self.entries.iter().find(|(t, _)| t == target).map(|(_, r)| r)
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(t, _)| t.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TargetRecord)> {
        self.entries.iter().map(|(t, r)| (t.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for AnnotationRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (target, record) in &self.entries {
            map.serialize_entry(target, record)?;
        }
        map.end()
    }
}

struct AnnotationRecordVisitor;

impl<'de> Visitor<'de> for AnnotationRecordVisitor {
    type Value = AnnotationRecord;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of target ids to per-source annotations")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut record = AnnotationRecord::new();
        while let Some((target, entry)) = access.next_entry::<String, TargetRecord>()? {
            record.insert(target, entry);
        }
        Ok(record)
    }
}

impl<'de> Deserialize<'de> for AnnotationRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(AnnotationRecordVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_serializes_with_source_keys_in_target_order() {
        let mut record = AnnotationRecord::new();
        let mut chek1 = TargetRecord::default();
        chek1.set(SourceName::Pharos, json!({"sym": "CHEK1"}));
        record.insert("ENSG00000149554", chek1);
        record.insert("ENSG00000012048", TargetRecord::default());

        let text = serde_json::to_string(&record).unwrap();
        assert!(text.find("ENSG00000149554").unwrap() < text.find("ENSG00000012048").unwrap());

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value["ENSG00000149554"],
            json!({
                "OpenTargets": {},
                "OpenTargets_disease_evidence": {},
                "Pharos": {"sym": "CHEK1"}
            })
        );
    }

    #[test]
    fn test_deserialize_keeps_order_and_fills_missing_sources() {
        let text = r#"{
            "ENSG00000141510": {"OpenTargets": {"approvedSymbol": "TP53"}},
            "ENSG00000012048": {"Pharos": {"sym": "BRCA1"}}
        }"#;
        let record: AnnotationRecord = serde_json::from_str(text).unwrap();
        assert_eq!(
            record.targets().collect::<Vec<_>>(),
            vec!["ENSG00000141510", "ENSG00000012048"]
        );
        let tp53 = record.get("ENSG00000141510").unwrap();
        assert_eq!(tp53.source(SourceName::Pharos), &json!({}));
        assert_eq!(tp53.open_targets["approvedSymbol"], "TP53");
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut record = AnnotationRecord::new();
        record.insert("A", TargetRecord::default());
        record.insert("B", TargetRecord::default());
        let mut updated = TargetRecord::default();
        updated.set(SourceName::OpenTargets, json!({"id": "A"}));
        record.insert("A", updated.clone());
        assert_eq!(record.len(), 2);
        assert_eq!(record.targets().next(), Some("A"));
        assert_eq!(record.get("A"), Some(&updated));
    }

    #[test]
    fn test_field_variants() {
        let obj = json!({"a": null, "b": 1});
        assert_eq!(Field::of(obj.get("a")), Field::Null);
        assert_eq!(Field::of(obj.get("c")), Field::Absent);
        assert_eq!(Field::of(obj.get("b")).value(), Some(&json!(1)));
        assert!(!Field::Null.is_present());
    }
}
