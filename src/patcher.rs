//! Multi-file patch driver
//!
//! For each source manifest: parse, patch in memory, write the result under
//! the destination directory with the same file name. Sources are never
//! modified. I/O failures abort the run; malformed manifests abort it or
//! are skipped depending on [`MalformedPolicy`].

use crate::config::{validation, MalformedPolicy, PatchSpec};
use crate::manifest::{patch_document, ManifestDocument, PatchWarning, ROOT_TAG};
use crate::Result;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Outcome of patching one source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilePatchOutcome {
    pub source: PathBuf,
    pub destination: PathBuf,

    /// False when the root was not `<idea-plugin>` and the file was copied unchanged
    pub root_matched: bool,

    /// Overwritten values, in patch order
    pub warnings: Vec<PatchWarning>,
}

/// A malformed source left out of the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub source: PathBuf,
    pub reason: String,
}

/// Result of a patch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PatchReport {
    /// Patched files in source order
    pub files: Vec<FilePatchOutcome>,

    /// Files skipped as malformed (only with [`MalformedPolicy::Skip`])
    pub skipped: Vec<SkippedFile>,
}

impl PatchReport {
    /// All warnings paired with the source file they came from
    pub fn warnings(&self) -> impl Iterator<Item = (&Path, &PatchWarning)> {
        self.files.iter().flat_map(|file| {
            file.warnings
                .iter()
                .map(move |warning| (file.source.as_path(), warning))
        })
    }

    /// Number of destination files written
    pub fn written(&self) -> usize {
        self.files.len()
    }

    /// Pretty-printed JSON rendering of the report
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Patch every source file of `spec` into its destination directory
pub fn patch_all(spec: &PatchSpec) -> Result<PatchReport> {
    validation::into_result(validation::validate_spec(spec))?;

    let sources = spec.resolve_source_files()?;
    let mut report = PatchReport::default();

    if sources.is_empty() {
        tracing::debug!("No source files configured, nothing to patch");
        return Ok(report);
    }

    validation::into_result(validation::validate_sources(
        &sources,
        &spec.destination_dir,
    ))?;

    fs::create_dir_all(&spec.destination_dir)?;

    for source in &sources {
        match patch_file(spec, source) {
            Ok(outcome) => report.files.push(outcome),
            Err(e) if e.is_malformed() && spec.on_malformed == MalformedPolicy::Skip => {
                tracing::warn!(file = %source.display(), error = %e, "Skipping malformed manifest");
                report.skipped.push(SkippedFile {
                    source: source.clone(),
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    tracing::debug!(
        written = report.written(),
        skipped = report.skipped.len(),
        "Patch run complete"
    );

    Ok(report)
}

/// Patch a single source file into the spec's destination directory
///
/// The destination directory must already exist.
pub fn patch_file(spec: &PatchSpec, source: &Path) -> Result<FilePatchOutcome> {
    let destination = spec.destination_for(source)?;
    tracing::debug!(file = %source.display(), "Patching manifest");

    let mut doc = ManifestDocument::from_file(source)?;
    let root_matched = doc.has_root(ROOT_TAG);
    let warnings = patch_document(&mut doc, spec);

    write_atomically(&destination, &doc.to_xml_string(&spec.format))?;
    tracing::info!(
        file = %source.display(),
        destination = %destination.display(),
        warnings = warnings.len(),
        "Wrote patched manifest"
    );

    Ok(FilePatchOutcome {
        source: source.to_path_buf(),
        destination,
        root_matched,
        warnings,
    })
}

/// Write through a temporary file in the same directory, then rename over `path`
fn write_atomically(path: &Path, content: &str) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(content.as_bytes())?;
    temp.flush()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
