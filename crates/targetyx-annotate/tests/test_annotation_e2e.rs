//! Annotation run and table extraction over mocked provider responses.

use serde_json::json;
use targetyx_annotate::table::export::{sheet_path, EXPRESSION_SHEET, KEY_SHEET, SUMMARY_SHEET};
use targetyx_annotate::{ExtractTable, TargetAnnotation, ANNOTATION_FILE_NAME};
use targetyx_common::TargetyxError;
use targetyx_test_utils::pretty_assertions::assert_eq;
use targetyx_test_utils::{fast_retry, provider_session, CHEK1, MALFORMED_TARGET, MULTIPLE_MYELOMA};

#[test]
fn test_chek1_has_three_sources() {
    let (session, _) = provider_session();
    let dir = tempfile::tempdir().unwrap();
    let mut run =
        TargetAnnotation::with_session([CHEK1], MULTIPLE_MYELOMA, dir.path(), session, fast_retry(1)).unwrap();

    let value = serde_json::to_value(run.run().unwrap()).unwrap();
    let top = value.as_object().unwrap();
    assert_eq!(top.keys().collect::<Vec<_>>(), vec![CHEK1]);

    let sources = top[CHEK1].as_object().unwrap();
    let mut keys: Vec<&str> = sources.keys().map(String::as_str).collect();
    keys.sort();
    assert_eq!(keys, vec!["OpenTargets", "OpenTargets_disease_evidence", "Pharos"]);
    assert!(sources.values().all(|v| v.is_object()));
    assert_eq!(sources["OpenTargets"]["approvedSymbol"], "CHEK1");
}

#[test]
fn test_malformed_target_makes_no_requests() {
    let (session, log) = provider_session();
    let result = TargetAnnotation::with_session(
        [MALFORMED_TARGET],
        MULTIPLE_MYELOMA,
        "unused",
        session,
        fast_retry(1),
    );
    assert!(matches!(result, Err(TargetyxError::InvalidEnsemblId(_))));
    assert_eq!(log.count(), 0);
}

#[test]
fn test_second_run_makes_no_requests() {
    let (session, log) = provider_session();
    let mut run =
        TargetAnnotation::with_session([CHEK1], MULTIPLE_MYELOMA, "unused", session, fast_retry(1)).unwrap();

    let first = run.run().unwrap().clone();
    let after_first = log.count();
    assert_eq!(after_first, 3);

    let second = run.run().unwrap().clone();
    assert_eq!(first, second);
    assert_eq!(log.count(), after_first);
}

#[test]
fn test_unknown_target_gets_empty_sources() {
    let (session, _) = provider_session();
    let other = "ENSG00000141510";
    let mut run = TargetAnnotation::with_session(
        [CHEK1, other],
        MULTIPLE_MYELOMA,
        "unused",
        session,
        fast_retry(1),
    )
    .unwrap();
    let record = run.run().unwrap();
    let tp53 = record.get(other).unwrap();
    assert_eq!(tp53.open_targets, json!({}));
    assert_eq!(tp53.disease_evidence, json!({}));
    assert_eq!(tp53.pharos, json!({}));
    assert_eq!(record.targets().collect::<Vec<_>>(), vec![CHEK1, other]);
}

#[test]
fn test_export_then_tables() {
    let (session, _) = provider_session();
    let dir = tempfile::tempdir().unwrap();
    let results = dir.path().join("results");
    let mut run = TargetAnnotation::with_session(
        [CHEK1, "ENSG00000141510"],
        MULTIPLE_MYELOMA,
        &results,
        session,
        fast_retry(1),
    )
    .unwrap();
    let path = run.export().unwrap();
    assert_eq!(path, results.join(ANNOTATION_FILE_NAME));

    let extract = ExtractTable::from_json_file(&path).unwrap().with_top_expression_count(2);
    let summary = extract.table();
    assert!(summary.warnings.is_empty());

    let t = &summary.table;
    assert_eq!(t.index(), &[CHEK1.to_string(), "ENSG00000141510".to_string()]);
    assert_eq!(t.cell(CHEK1, "symbol"), Some(&json!("CHEK1")));
    assert_eq!(t.cell(CHEK1, "name"), Some(&json!("Serine/threonine-protein kinase Chk1")));
    assert_eq!(t.cell(CHEK1, "biotype"), Some(&json!("protein_coding")));
    assert_eq!(
        t.cell(CHEK1, "pharos_link"),
        Some(&json!("https://pharos.nih.gov/targets/ENSG00000149554"))
    );
    assert_eq!(
        t.cell(CHEK1, "pathways"),
        Some(&json!({"Reactome": "Cell Cycle Checkpoints", "KEGG": "p53 signaling pathway"}))
    );
    assert_eq!(
        t.cell(CHEK1, "classes"),
        Some(&json!(["DTO: Kinase", "Panther: non-receptor serine/threonine protein kinase"]))
    );
    assert_eq!(
        t.cell(CHEK1, "tractability"),
        Some(&json!(["SM: Advanced Clinical", "SM: Structure with Ligand"]))
    );
    assert_eq!(t.cell(CHEK1, "IDG Development Level"), Some(&json!("Tclin")));
    assert_eq!(t.cell(CHEK1, "is_essential"), Some(&json!(true)));
    assert_eq!(
        t.cell(CHEK1, "related_publications"),
        Some(&json!([
            "https://pubmed.ncbi.nlm.nih.gov/30578327",
            "https://pubmed.ncbi.nlm.nih.gov/27533037"
        ]))
    );
    assert_eq!(t.cell(CHEK1, "top_rna_expression"), Some(&json!([["testis", 310], ["thymus", 220]])));
    assert_eq!(t.cell(CHEK1, "has_chem_probe"), Some(&json!(true)));
    assert_eq!(t.cell(CHEK1, "has_known_drug"), Some(&json!(true)));
    assert_eq!(t.cell(CHEK1, "gwas"), Some(&json!({"rs10893387": "platelet count"})));
    assert_eq!(t.cell(CHEK1, "gwas_analytics"), Some(&json!({"platelet count": 74.5})));
    assert_eq!(t.cell(CHEK1, "gnomAD_LOEUF"), Some(&json!(0.34)));
    assert_eq!(
        t.cell(CHEK1, "Pharos associated diseases"),
        Some(&json!({"multiple myeloma": 3, "breast cancer": 5}))
    );
    assert_eq!(
        t.cell(CHEK1, "OT associated diseases"),
        Some(&json!({"cancer": 0.61, "multiple myeloma": 0.42}))
    );
    assert_eq!(t.cell(CHEK1, "disease_association_score"), Some(&json!(0.42)));
    assert_eq!(t.cell(CHEK1, "safety_liabilities"), Some(&json!(["cardiac arrhythmia"])));

    // The unannotated target only has its link.
    assert_eq!(t.cell("ENSG00000141510", "symbol"), None);
    assert!(t.cell("ENSG00000141510", "pharos_link").is_some());

    assert_eq!(
        t.column_names(),
        vec![
            "name",
            "symbol",
            "biotype",
            "description",
            "pharos_link",
            "pathways",
            "classes",
            "GO terms",
            "tractability",
            "IDG Development Level",
            "is_essential",
            "related_publications",
            "tissue specificity",
            "top_rna_expression",
            "has_chem_probe",
            "has_known_drug",
            "gwas",
            "gwas_analytics",
            "gnomAD_LOEUF",
            "Pharos associated diseases",
            "OT associated diseases",
            "disease_association_score",
            "safety_liabilities",
        ]
    );

    let tables = dir.path().join("tables");
    extract.export(&tables).unwrap();
    for sheet in [SUMMARY_SHEET, KEY_SHEET, EXPRESSION_SHEET] {
        assert!(sheet_path(&tables, sheet).exists(), "missing {}", sheet);
    }
    let expression = std::fs::read_to_string(sheet_path(&tables, EXPRESSION_SHEET)).unwrap();
    assert!(expression.starts_with("target,liver,testis,lymph node,thymus,bone marrow\n"));
}
