//! Identifier validation for Ensembl gene IDs and ontology-qualified disease IDs.
//!
//! Validators are pure and run before any network I/O. The `validate_*`
//! variants turn a failed predicate into the matching typed error.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Result, TargetyxError};

/// Ensembl human gene prefix.
pub const ENSEMBL_GENE_PREFIX: &str = "ENSG";

/// Number of digits following the prefix.
pub const ENSEMBL_DIGIT_COUNT: usize = 11;

/// True iff `id` starts with `ENSG` and stripping every non-digit leaves
/// exactly 11 digits. The two checks are independent: `ENSG0000014955X4`
/// passes because the digits are counted after stripping.
pub fn is_valid_ensembl_id(id: &str) -> bool {
    let digit_count = id.chars().filter(|c| c.is_ascii_digit()).count();
    id.starts_with(ENSEMBL_GENE_PREFIX) && digit_count == ENSEMBL_DIGIT_COUNT
}

/// Strict form used when a batch of targets is accepted: `^ENSG[0-9]{11}$`.
pub fn is_strict_ensembl_id(id: &str) -> bool {
    static STRICT: OnceLock<Regex> = OnceLock::new();
    STRICT
        .get_or_init(|| {
            Regex::new(&format!(
                r"^{}[0-9]{{{}}}$",
                ENSEMBL_GENE_PREFIX, ENSEMBL_DIGIT_COUNT
            ))
            .expect("static Ensembl pattern compiles")
        })
        .is_match(id)
}

/// True iff `id` is non-empty, not purely numeric, contains exactly one
/// underscore and consists only of ASCII alphanumerics and underscores.
pub fn is_valid_disease_id(id: &str) -> bool {
    if id.is_empty() || id.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let all_allowed = id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    let underscores = id.chars().filter(|&c| c == '_').count();
    all_allowed && underscores == 1
}

pub fn validate_ensembl_id(id: &str) -> Result<()> {
    if is_valid_ensembl_id(id) {
        Ok(())
    } else {
        Err(TargetyxError::InvalidEnsemblId(id.to_string()))
    }
}

pub fn validate_disease_id(id: &str) -> Result<()> {
    if is_valid_disease_id(id) {
        Ok(())
    } else {
        Err(TargetyxError::InvalidDiseaseId(id.to_string()))
    }
}
