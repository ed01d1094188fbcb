//! Local artifact inspection
//!
//! Loads the artifacts from a directory exactly as the server would, without
//! starting it, and reports which degraded modes would apply.

use anyhow::Result;
use shipping_lib::{ArtifactPaths, ArtifactStatus, ArtifactStore, StructuredLogger};
use std::path::Path;
use tabled::Tabled;

use crate::output::{color_status, print_json, print_success, print_table, print_warning, OutputFormat};

#[derive(Tabled)]
struct ArtifactRow {
    #[tabled(rename = "Artifact")]
    artifact: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Details")]
    details: String,
}

impl From<&ArtifactStatus> for ArtifactRow {
    fn from(s: &ArtifactStatus) -> Self {
        let (status, details) = if s.loaded {
            ("loaded", "-".to_string())
        } else {
            (
                "absent",
                format!(
                    "{} ({})",
                    s.kind.degraded_behavior(),
                    s.error.as_deref().unwrap_or("unknown error")
                ),
            )
        };
        Self {
            artifact: s.kind.as_str().to_string(),
            status: color_status(status),
            source: s.source.clone(),
            details,
        }
    }
}

/// Load every artifact in `dir` and report the outcome
pub fn check_artifacts(dir: &Path, format: OutputFormat) -> Result<()> {
    let store = ArtifactStore::load(&ArtifactPaths::in_dir(dir), &StructuredLogger::new("shipq"));
    let statuses = store.statuses();

    match format {
        OutputFormat::Json => print_json(&statuses)?,
        OutputFormat::Table => {
            print_table(statuses.iter().map(ArtifactRow::from).collect());
            println!();
            if statuses.iter().all(|s| s.loaded) {
                print_success("All artifacts loaded");
            } else {
                print_warning("Service would run in degraded mode");
            }
        }
    }

    Ok(())
}
