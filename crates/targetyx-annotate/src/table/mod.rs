//! Summary tables derived from a merged annotation record.
//!
//! Every column of the summary table comes from one projection in
//! [`projections`] reading the flattened [`frame::RefFrame`]. Targets whose
//! input field is missing or null are left blank in that column. Each
//! column also gets a row in the key table describing where it came from.

pub mod export;
pub mod frame;
pub mod projections;

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use targetyx_common::{Result, TargetyxError};
use tracing::warn;

use crate::record::AnnotationRecord;
use frame::RefFrame;

pub const DEFAULT_TOP_EXPRESSION_COUNT: usize = 3;

/// Key rows for these columns lead the key table, in this order.
const BASIC_KEY_ORDER: [&str; 4] = ["symbol", "name", "description", "biotype"];

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Option<Value>>,
}

/// Column-major table indexed by target id.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    index: Vec<String>,
    columns: Vec<Column>,
}

impl Table {
    pub fn new(index: Vec<String>) -> Self {
        Self { index, columns: Vec::new() }
    }

    pub fn index(&self) -> &[String] {
        &self.index
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn cell(&self, target: &str, column: &str) -> Option<&Value> {
        let row = self.index.iter().position(|t| t == target)?;
        self.column(column)?.cells.get(row)?.as_ref()
    }

    fn push(&mut self, name: impl Into<String>, cells: Vec<Option<Value>>) {
        self.columns.push(Column { name: name.into(), cells });
    }
}

/// One row of the key table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnKey {
    pub column: String,
    pub key: String,
}

/// Dataset-wide conditions that blank out part of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableWarning {
    /// No target had a disease id in its disease-evidence block.
    MissingDiseaseCode,
}

impl fmt::Display for TableWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableWarning::MissingDiseaseCode => {
                f.write_str("no disease code from annotation db: OpenTargets_disease_evidence->id")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryTable {
    pub table: Table,
    pub key: Vec<ColumnKey>,
    pub warnings: Vec<TableWarning>,
}

pub struct ExtractTable {
    record: AnnotationRecord,
    top_expression_count: usize,
}

impl ExtractTable {
    pub fn new(record: AnnotationRecord) -> Self {
        Self {
            record,
            top_expression_count: DEFAULT_TOP_EXPRESSION_COUNT,
        }
    }

    /// Load a record written by `TargetAnnotation::export`.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            return Err(TargetyxError::InvalidAnnotationDb(format!(
                "'annotate_db' must be a json file, got {}",
                path.display()
            )));
        }
        let text = fs::read_to_string(path)?;
        let record: AnnotationRecord = serde_json::from_str(&text)?;
        Ok(Self::new(record))
    }

    pub fn with_top_expression_count(mut self, count: usize) -> Self {
        self.top_expression_count = count;
        self
    }

    pub fn record(&self) -> &AnnotationRecord {
        &self.record
    }

    /// Tissue columns of RNA expression, one row per target that has any.
    pub fn expression_table(&self) -> Table {
        let frame = RefFrame::from_record(&self.record);
        let rows: Vec<(String, Vec<(String, Value)>)> = frame
            .present("OT_expressions")
            .filter_map(|(i, v)| {
                projections::expression_pairs(v).map(|pairs| (frame.targets()[i].clone(), pairs))
            })
            .collect();

        let mut tissues: Vec<String> = Vec::new();
        for (_, pairs) in &rows {
            for (label, _) in pairs {
                if !tissues.contains(label) {
                    tissues.push(label.clone());
                }
            }
        }

        let mut table = Table::new(rows.iter().map(|(t, _)| t.clone()).collect());
        for tissue in tissues {
            let cells = rows
                .iter()
                .map(|(_, pairs)| pairs.iter().find(|(l, _)| *l == tissue).map(|(_, v)| v.clone()))
                .collect();
            table.push(tissue, cells);
        }
        table
    }

    /// Build the summary table and its key.
    pub fn table(&self) -> SummaryTable {
        let frame = RefFrame::from_record(&self.record);
        let mut table = Table::new(frame.targets().to_vec());
        let mut key: Vec<ColumnKey> = Vec::new();
        let mut warnings = Vec::new();

        let mut add = |name: &str, description: &str, cells: Vec<Option<Value>>| {
            table.push(name, cells);
            key.push(ColumnKey { column: name.to_string(), key: description.to_string() });
        };

        add("name", "name (Pharos)", map_field(&frame, "Pharos_name", |v| Some(v.clone())));
        add(
            "symbol",
            "preferred symbol",
            coalesce(
                map_field(&frame, "OT_approvedSymbol", |v| Some(v.clone())),
                map_field(&frame, "Pharos_sym", |v| Some(v.clone())),
            ),
        );
        add("biotype", "biotype (OT)", map_field(&frame, "OT_biotype", |v| Some(v.clone())));
        add(
            "description",
            "description (Pharos first, OT if no Pharos)",
            coalesce(
                map_field(&frame, "Pharos_description", |v| Some(v.clone())),
                map_field(&frame, "OT_functionDescriptions", |v| Some(projections::first_if_list(v))),
            ),
        );
        add(
            "pharos_link",
            "link to Pharos Facets for target.",
            frame.targets().iter().map(|t| Some(projections::pharos_link(t))).collect(),
        );
        add(
            "pathways",
            "Pathways from Pharos.",
            map_field(&frame, "Pharos_pathways", |v| projections::collect_pairs(v, "/type", "/name")),
        );
        add("classes", "Panther and DTO classes from Pharos.", {
            let dto = map_field(&frame, "Pharos_dto", |v| Some(v.clone()));
            let panther = map_field(&frame, "Pharos_pantherClasses", |v| Some(v.clone()));
            dto.iter()
                .zip(&panther)
                .map(|(d, p)| match (d, p) {
                    (Some(d), Some(p)) => projections::classes(d, p),
                    _ => None,
                })
                .collect()
        });
        add(
            "GO terms",
            "GO terms collected from OT.",
            map_field(&frame, "OT_geneOntology", |v| {
                projections::collect_pairs(v, "/term/id", "/term/name")
            }),
        );
        add(
            "tractability",
            "tractability from OT.",
            map_field(&frame, "OT_tractability", projections::tractability),
        );
        add(
            "IDG Development Level",
            "Descriptions of the IDG illumination levels, highlighting the milestones attained \
             in research for this target. From Pharos.",
            map_field(&frame, "Pharos_tdl", |v| Some(v.clone())),
        );
        add(
            "is_essential",
            "is essential from DepMap",
            map_field(&frame, "OT_isEssential", |v| Some(v.clone())),
        );
        add(
            "related_publications",
            "PubMed links for publications relating target to disease",
            map_field(&frame, "OT_disease_evidences.rows", projections::publications),
        );
        add(
            "tissue specificity",
            "tissue specificity from Pharos.",
            map_field(&frame, "Pharos_tissueSpecificity", |v| {
                projections::collect_pairs(v, "/name", "/value")
            }),
        );
        let top_k = self.top_expression_count;
        add(
            "top_rna_expression",
            "top expression from Expression Atlas in OT.",
            map_field(&frame, "OT_expressions", |v| projections::top_expression(v, top_k)),
        );
        add(
            "has_chem_probe",
            "whether chemical probe exists in ChEMBL.",
            map_field(&frame, "OT_chemicalProbes", projections::non_empty),
        );
        add(
            "has_known_drug",
            "whether known drug exists for target.",
            map_field(&frame, "OT_knownDrugs.rows", projections::non_empty),
        );
        add(
            "gwas",
            "GWAS catalog results: www.ebi.ac.uk/gwas",
            map_field(&frame, "Pharos_gwas", |v| {
                projections::collect_pairs(v, "/snps/0/value", "/trait")
            }),
        );
        add(
            "gwas_analytics",
            "GWAS trait and meanRankScore. Target Illumination GWAS Analytics (TIGA) scores and \
             ranks those traits according to a subset of study parameters. \
             https://unmtid-shinyapps.net/shiny/tiga/",
            map_field(&frame, "Pharos_gwasAnalytics.associations", |v| {
                projections::collect_pairs(v, "/trait", "/meanRankScore")
            }),
        );
        add(
            "gnomAD_LOEUF",
            "LOEUF genetic constraint: https://gnomad.broadinstitute.org/help/constraint",
            map_field(&frame, "OT_geneticConstraint", projections::loeuf),
        );
        add(
            "Pharos associated diseases",
            "associated disease and their association count from Pharos",
            map_field(&frame, "Pharos_diseases", |v| {
                projections::collect_pairs(v, "/name", "/associationCount")
            }),
        );
        add(
            "OT associated diseases",
            "associated disease and their score from OT",
            map_field(&frame, "OT_associatedDiseases.rows", |v| {
                projections::collect_pairs(v, "/disease/name", "/score")
            }),
        );
        match first_disease_id(&frame) {
            Some(disease_id) => add(
                "disease_association_score",
                "score of association between disease of interest and target from OT.",
                map_field(&frame, "OT_associatedDiseases.rows", |v| {
                    projections::disease_association(v, &disease_id)
                }),
            ),
            None => {
                let warning = TableWarning::MissingDiseaseCode;
                warn!("{}", warning);
                warnings.push(warning);
            }
        }
        add(
            "safety_liabilities",
            "safety liabilities from OT.",
            map_field(&frame, "OT_safetyLiabilities", |v| projections::collect_field(v, "/event")),
        );

        SummaryTable {
            table,
            key: order_key(key),
            warnings,
        }
    }

    /// Write the summary table, its key and the expression table as CSV
    /// sheets under `output_dir`.
    pub fn export(&self, output_dir: impl AsRef<Path>) -> Result<SummaryTable> {
        let summary = self.table();
        let expression = self.expression_table();
        export::write_sheets(output_dir.as_ref(), &summary, &expression)?;
        Ok(summary)
    }
}

fn map_field<F>(frame: &RefFrame, column: &str, f: F) -> Vec<Option<Value>>
where
    F: Fn(&Value) -> Option<Value>,
{
    (0..frame.len())
        .map(|i| frame.field(i, column).value().and_then(&f))
        .collect()
}

fn coalesce(primary: Vec<Option<Value>>, fallback: Vec<Option<Value>>) -> Vec<Option<Value>> {
    primary
        .into_iter()
        .zip(fallback)
        .map(|(p, f)| p.or(f))
        .collect()
}

/// First string disease id, scanning targets in order. It is used for
/// every target of the run.
fn first_disease_id(frame: &RefFrame) -> Option<String> {
    (0..frame.len()).find_map(|i| {
        frame
            .field(i, "OT_disease_id")
            .value()
            .and_then(Value::as_str)
            .map(String::from)
    })
}

fn order_key(key: Vec<ColumnKey>) -> Vec<ColumnKey> {
    let (mut basic, rest): (Vec<ColumnKey>, Vec<ColumnKey>) =
        key.into_iter().partition(|k| BASIC_KEY_ORDER.contains(&k.column.as_str()));
    basic.sort_by_key(|k| BASIC_KEY_ORDER.iter().position(|c| *c == k.column));
    basic.extend(rest);
    basic
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{SourceName, TargetRecord};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(entries: Vec<(&str, Value, Value, Value)>) -> AnnotationRecord {
        let mut record = AnnotationRecord::new();
        for (target, ot, evidence, pharos) in entries {
            let mut r = TargetRecord::default();
            r.set(SourceName::OpenTargets, ot);
            r.set(SourceName::OpenTargetsDiseaseEvidence, evidence);
            r.set(SourceName::Pharos, pharos);
            record.insert(target, r);
        }
        record
    }

    #[test]
    fn test_symbol_and_description_coalesce() {
        let rec = record(vec![
            (
                "A",
                json!({"approvedSymbol": "CHEK1", "functionDescriptions": ["Kinase A", "Other"]}),
                json!({}),
                json!({"sym": "CHK1", "description": null}),
            ),
            (
                "B",
                json!({"functionDescriptions": []}),
                json!({}),
                json!({"sym": "BRCA1", "description": "Pharos text"}),
            ),
        ]);
        let summary = ExtractTable::new(rec).table();
        let t = &summary.table;
        assert_eq!(t.cell("A", "symbol"), Some(&json!("CHEK1")));
        assert_eq!(t.cell("B", "symbol"), Some(&json!("BRCA1")));
        assert_eq!(t.cell("A", "description"), Some(&json!("Kinase A")));
        assert_eq!(t.cell("B", "description"), Some(&json!("Pharos text")));
    }

    #[test]
    fn test_has_known_drug_tri_state() {
        let rec = record(vec![
            ("A", json!({"knownDrugs": {"rows": [{"prefName": "PREXASERTIB"}]}}), json!({}), json!({})),
            ("B", json!({"knownDrugs": {"rows": []}}), json!({}), json!({})),
            ("C", json!({"knownDrugs": null}), json!({}), json!({})),
        ]);
        let t = ExtractTable::new(rec).table().table;
        assert_eq!(t.cell("A", "has_known_drug"), Some(&json!(true)));
        assert_eq!(t.cell("B", "has_known_drug"), Some(&json!(false)));
        assert_eq!(t.cell("C", "has_known_drug"), None);
    }

    #[test]
    fn test_missing_disease_code_drops_column_and_warns() {
        let rec = record(vec![(
            "A",
            json!({"associatedDiseases": {"rows": [{"score": 0.5, "disease": {"id": "EFO_1", "name": "x"}}]}}),
            json!({}),
            json!({}),
        )]);
        let summary = ExtractTable::new(rec).table();
        assert_eq!(summary.warnings, vec![TableWarning::MissingDiseaseCode]);
        assert!(summary.table.column("disease_association_score").is_none());
        assert!(!summary.key.iter().any(|k| k.column == "disease_association_score"));
        assert!(summary.table.column("OT associated diseases").is_some());
    }

    #[test]
    fn test_first_disease_id_applies_to_all_targets() {
        let rows = json!({"rows": [
            {"score": 0.9, "disease": {"id": "EFO_0001378", "name": "multiple myeloma"}},
            {"score": 0.1, "disease": {"id": "EFO_0000311", "name": "cancer"}}
        ]});
        let rec = record(vec![
            ("A", json!({"associatedDiseases": rows.clone()}), json!({}), json!({})),
            ("B", json!({"associatedDiseases": rows.clone()}), json!({"id": "EFO_0001378"}), json!({})),
            ("C", json!({"associatedDiseases": rows}), json!({"id": "EFO_0000311"}), json!({})),
        ]);
        let summary = ExtractTable::new(rec).table();
        assert!(summary.warnings.is_empty());
        let t = &summary.table;
        assert_eq!(t.cell("A", "disease_association_score"), Some(&json!(0.9)));
        assert_eq!(t.cell("C", "disease_association_score"), Some(&json!(0.9)));
    }

    #[test]
    fn test_key_order_leads_with_basic_columns() {
        let rec = record(vec![("A", json!({}), json!({"id": "EFO_0001378"}), json!({}))]);
        let summary = ExtractTable::new(rec).table();
        let key_columns: Vec<&str> = summary.key.iter().map(|k| k.column.as_str()).collect();
        assert_eq!(&key_columns[..5], &["symbol", "name", "description", "biotype", "pharos_link"]);
        assert_eq!(
            &summary.table.column_names()[..4],
            &["name", "symbol", "biotype", "description"]
        );
        assert_eq!(summary.key.len(), summary.table.columns().len());
    }

    #[test]
    fn test_expression_table_columns_are_tissues() {
        let rec = record(vec![
            (
                "A",
                json!({"expressions": [
                    {"tissue": {"label": "liver"}, "rna": {"value": 3}},
                    {"tissue": {"label": "lung"}, "rna": {"value": 7}}
                ]}),
                json!({}),
                json!({}),
            ),
            ("B", json!({}), json!({}), json!({})),
            (
                "C",
                json!({"expressions": [{"tissue": {"label": "testis"}, "rna": {"value": 9}}]}),
                json!({}),
                json!({}),
            ),
        ]);
        let expr = ExtractTable::new(rec).expression_table();
        assert_eq!(expr.index(), &["A".to_string(), "C".to_string()]);
        assert_eq!(expr.column_names(), vec!["liver", "lung", "testis"]);
        assert_eq!(expr.cell("C", "liver"), None);
        assert_eq!(expr.cell("C", "testis"), Some(&json!(9)));
    }

    #[test]
    fn test_from_json_file_requires_json_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("target_annotation.txt");
        fs::write(&path, "{}").unwrap();
        assert!(matches!(
            ExtractTable::from_json_file(&path),
            Err(TargetyxError::InvalidAnnotationDb(_))
        ));
    }
}
