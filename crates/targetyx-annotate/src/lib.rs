//! targetyx-annotate: Per-target annotation runs and summary tables.
//!
//! [`TargetAnnotation`] collects every source's record for each target into
//! an [`AnnotationRecord`]; [`ExtractTable`] flattens that record into the
//! summary table, its column key and the expression table.

pub mod pipeline;
pub mod record;
pub mod sources;
pub mod table;

pub use pipeline::{TargetAnnotation, ANNOTATION_FILE_NAME};
pub use record::{AnnotationRecord, Field, SourceName, TargetRecord};
pub use sources::{
    default_sources, AnnotationSource, MockAnnotationSource, OpenTargetsEvidenceSource, OpenTargetsTargetSource,
    PharosTargetSource,
};
pub use table::{ColumnKey, ExtractTable, SummaryTable, Table, TableWarning};
