use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use kairos_core::{Document, Notebook};

use crate::cli::ExportFormat;
use crate::persist::write_atomic;

const HEADER_FENCE: &str = "---";

pub fn export_notebook(
    notebook_id: &str,
    notebook: &Notebook,
    format: ExportFormat,
    target: &Path,
) -> Result<PathBuf> {
    let content = match format {
        ExportFormat::Text => render_text(notebook_id, notebook, Local::now()),
        ExportFormat::Json => {
            serde_json::to_string_pretty(notebook).context("cannot encode notebook")?
        }
    };
    write_atomic(target, &content)
}

/// Header block followed by the document text, one line per block.
pub fn render_text(notebook_id: &str, notebook: &Notebook, exported: DateTime<Local>) -> String {
    let mut out = String::new();
    out.push_str(HEADER_FENCE);
    out.push('\n');
    out.push_str(&format!("notebook: {notebook_id}\n"));
    out.push_str(&format!("name: {}\n", notebook.name));
    out.push_str(&format!("exported: {}\n", exported.to_rfc3339()));
    if !notebook.sources.is_empty() {
        out.push_str("sources:\n");
        for source in &notebook.sources {
            out.push_str(&format!("  - {} {}\n", source.kind, source.origin));
        }
    }
    out.push_str(HEADER_FENCE);
    out.push_str("\n\n");

    let document = Document::from_value(notebook.content.clone());
    out.push_str(&document.plain_text());
    out.push('\n');
    out
}
