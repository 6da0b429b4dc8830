//! Patch spec validation
//!
//! Catches runs that would produce wrong output before any file is touched:
//! - No destination directory
//! - Two sources with the same file name (they would overwrite each other)
//! - A source whose destination is the source itself (patching in place)
//! - Indentation that is not whitespace

use super::patch_spec::PatchSpec;
use crate::PatcherError;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Validation error details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validation result
pub type ValidationResult = std::result::Result<(), Vec<ValidationError>>;

/// Validate the static parts of a spec
pub fn validate_spec(spec: &PatchSpec) -> ValidationResult {
    let mut errors = Vec::new();

    if spec.destination_dir.as_os_str().is_empty() {
        errors.push(ValidationError::new(
            "destination-dir",
            "A destination directory must be set",
        ));
    }

    if !spec.format.indent.chars().all(|c| c == ' ' || c == '\t') {
        errors.push(ValidationError::new(
            "format.indent",
            format!(
                "Indent must only contain spaces or tabs, got {:?}",
                spec.format.indent
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate resolved source files against the destination directory
pub fn validate_sources(sources: &[PathBuf], destination_dir: &Path) -> ValidationResult {
    let mut errors = Vec::new();
    let mut seen_names = HashSet::new();
    let destination = fs::canonicalize(destination_dir).ok();

    for source in sources {
        let Some(name) = source.file_name() else {
            errors.push(ValidationError::new(
                "source-files",
                format!("Source path has no file name: {}", source.display()),
            ));
            continue;
        };

        if !seen_names.insert(name.to_os_string()) {
            errors.push(ValidationError::new(
                "source-files",
                format!(
                    "Duplicate file name {:?}: destinations would collide",
                    name
                ),
            ));
        }

        // Only checkable when both exist; a missing source fails later as I/O
        let source_dir = fs::canonicalize(source)
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf));
        if let (Some(dir), Some(dest)) = (source_dir, destination.as_ref()) {
            if &dir == dest {
                errors.push(ValidationError::new(
                    "destination-dir",
                    format!(
                        "Destination would overwrite the source {}",
                        source.display()
                    ),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Convert validation errors into a single crate error
pub fn into_result(result: ValidationResult) -> crate::Result<()> {
    result.map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        PatcherError::Validation(format!(
            "Patch spec validation failed:\n  - {}",
            messages.join("\n  - ")
        ))
    })
}
