//! Annotation run over a list of targets for one disease.
//!
//! Collection asks every source about every target in turn. A source with
//! nothing usable for a target (empty or mis-shaped response) contributes
//! an empty object; any other failure aborts the run. The merged record is
//! kept on the instance, so later `run` calls return it without refetching.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{Map, Value};
use targetyx_common::ids::{is_strict_ensembl_id, validate_disease_id};
use targetyx_common::{Result, RetryConfig, TargetyxError};
use targetyx_sources::CachedSession;
use tracing::{info, warn};

use crate::record::{AnnotationRecord, TargetRecord};
use crate::sources::{default_sources, AnnotationSource};

pub const ANNOTATION_FILE_NAME: &str = "target_annotation.json";

pub struct TargetAnnotation {
    targets: Vec<String>,
    disease_code: String,
    results_path: PathBuf,
    sources: Vec<Box<dyn AnnotationSource>>,
    show_progress: bool,
    results: Option<AnnotationRecord>,
}

impl TargetAnnotation {
    /// Validate inputs and set up a run. Every target must match
    /// `^ENSG[0-9]{11}$`; nothing is fetched here.
    pub fn new<I, S>(
        targets: I,
        disease_code: &str,
        results_path: impl Into<PathBuf>,
        sources: Vec<Box<dyn AnnotationSource>>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let targets: Vec<String> = targets.into_iter().map(Into::into).collect();
        if targets.is_empty() {
            return Err(TargetyxError::InvalidTargets(
                "at least one target is required".to_string(),
            ));
        }
        if let Some(bad) = targets.iter().find(|t| !is_strict_ensembl_id(t)) {
            return Err(TargetyxError::InvalidEnsemblId(bad.clone()));
        }
        validate_disease_id(disease_code)?;

        Ok(Self {
            targets,
            disease_code: disease_code.to_string(),
            results_path: results_path.into(),
            sources,
            show_progress: false,
            results: None,
        })
    }

    /// Run against the default sources over `session`.
    pub fn with_session<I, S>(
        targets: I,
        disease_code: &str,
        results_path: impl Into<PathBuf>,
        session: Rc<CachedSession>,
        retry: RetryConfig,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(targets, disease_code, results_path, default_sources(session, retry))
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn disease_code(&self) -> &str {
        &self.disease_code
    }

    pub fn results_path(&self) -> &Path {
        &self.results_path
    }

    /// Collect and merge annotations; cached after the first success.
    pub fn run(&mut self) -> Result<&AnnotationRecord> {
        if self.results.is_none() {
            let record = self.collect()?;
            self.results = Some(record);
        }
        self.results
            .as_ref()
            .ok_or_else(|| TargetyxError::InvalidAnnotationDb("annotation run produced no record".to_string()))
    }

    /// Write the merged record to `<results_path>/target_annotation.json`.
    pub fn export(&mut self) -> Result<PathBuf> {
        let path = self.results_path.join(ANNOTATION_FILE_NAME);
        fs::create_dir_all(&self.results_path)?;
        let record = self.run()?;
        fs::write(&path, serde_json::to_vec(record)?)?;
        info!(path = %path.display(), targets = record.len(), "Exported target annotation");
        Ok(path)
    }

    fn collect(&self) -> Result<AnnotationRecord> {
        let mut per_source: Vec<Vec<Value>> = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            let bar = self.progress_bar(&format!("{}: annotation...", source.name()));
            let mut values = Vec::with_capacity(self.targets.len());
            for target in &self.targets {
                let value = match source.fetch(target, &self.disease_code) {
                    Ok(value) => value,
                    Err(e) if e.is_recoverable_per_target() => {
                        warn!(source = %source.name(), target = %target, "No annotation: {}", e);
                        Value::Object(Map::new())
                    }
                    Err(e) => {
                        bar.abandon();
                        return Err(e);
                    }
                };
                values.push(value);
                bar.inc(1);
            }
            bar.finish_and_clear();
            per_source.push(values);
        }

        let mut record = AnnotationRecord::new();
        for (i, target) in self.targets.iter().enumerate() {
            let mut entry = TargetRecord::default();
            for (source, values) in self.sources.iter().zip(&per_source) {
                entry.set(source.name(), values[i].clone());
            }
            record.insert(target.clone(), entry);
        }
        Ok(record)
    }

    fn progress_bar(&self, message: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(self.targets.len() as u64);
        let style = ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.set_message(message.to_string());
        bar
    }
}
