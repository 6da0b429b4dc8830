//! Patch run configuration
//!
//! A `PatchSpec` can be built in code, loaded from a YAML file, or assembled
//! by the CLI from flags layered over a YAML file.

use crate::manifest::OutputFormat;
use crate::{PatcherError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Version value that means "no version was configured"
pub const DEFAULT_VERSION_SENTINEL: &str = "unspecified";

/// What to do with a source file that is not well-formed XML
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// Fail the whole run on the first malformed file
    #[default]
    Abort,
    /// Record the file as skipped and continue with the rest
    Skip,
}

/// Configuration for a single patch run
///
/// Every patch value is optional; an absent or empty value leaves the
/// corresponding location in the manifest untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PatchSpec {
    /// Directory the patched copies are written to
    #[serde(default)]
    pub destination_dir: PathBuf,

    /// Manifests to patch, as paths or glob patterns
    #[serde(default)]
    pub source_files: Vec<PathBuf>,

    /// `<description>` content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// `since-build` attribute of `<idea-version>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since_build: Option<String>,

    /// `until-build` attribute of `<idea-version>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until_build: Option<String>,

    /// `<version>` content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// `<change-notes>` content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_notes: Option<String>,

    /// `<id>` content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_id: Option<String>,

    /// Wrap description and change notes in CDATA sections
    #[serde(default = "default_use_cdata")]
    pub use_cdata: bool,

    /// A `version` equal to this value is treated as not provided
    #[serde(default = "default_version_sentinel")]
    pub default_version_sentinel: String,

    /// Handling of malformed source files
    #[serde(default)]
    pub on_malformed: MalformedPolicy,

    /// Output formatting
    #[serde(default)]
    pub format: OutputFormat,
}

fn default_use_cdata() -> bool {
    true
}

fn default_version_sentinel() -> String {
    DEFAULT_VERSION_SENTINEL.to_string()
}

impl Default for PatchSpec {
    fn default() -> Self {
        Self::new(PathBuf::new(), Vec::new())
    }
}

impl PatchSpec {
    /// Create a spec with no patch values set
    pub fn new(destination_dir: impl Into<PathBuf>, source_files: Vec<PathBuf>) -> Self {
        Self {
            destination_dir: destination_dir.into(),
            source_files,
            description: None,
            since_build: None,
            until_build: None,
            version: None,
            change_notes: None,
            plugin_id: None,
            use_cdata: default_use_cdata(),
            default_version_sentinel: default_version_sentinel(),
            on_malformed: MalformedPolicy::default(),
            format: OutputFormat::default(),
        }
    }

    /// Load a spec from a YAML file
    ///
    /// Relative `destination-dir` and `source-files` entries are resolved
    /// against the directory containing the file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(PatcherError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        tracing::info!(path = %path.display(), "Loading patch configuration");

        let content = fs::read_to_string(path)?;
        let mut spec: Self = serde_yaml::from_str(&content)?;

        if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            spec.rebase(base);
        }

        tracing::debug!(
            sources = spec.source_files.len(),
            destination = %spec.destination_dir.display(),
            "Configuration loaded successfully"
        );

        Ok(spec)
    }

    /// Save the spec as YAML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        tracing::info!(path = %path.display(), "Saving patch configuration");

        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;

        Ok(())
    }

    /// Destination path for `source`: same file name, under the destination directory
    pub fn destination_for(&self, source: &Path) -> Result<PathBuf> {
        let file_name = source.file_name().ok_or_else(|| {
            PatcherError::Config(format!("Source path has no file name: {}", source.display()))
        })?;
        Ok(self.destination_dir.join(file_name))
    }

    /// Expand `source_files` into concrete paths, preserving order
    ///
    /// Entries containing glob metacharacters are expanded (matches sorted
    /// alphabetically, directories ignored); a pattern matching nothing is
    /// an error. Plain paths, and existing files whose names happen to contain
    /// metacharacters, are passed through unchecked.
    pub fn resolve_source_files(&self) -> Result<Vec<PathBuf>> {
        let mut resolved = Vec::new();

        for entry in &self.source_files {
            let pattern = entry.to_string_lossy();
            if !is_glob_pattern(&pattern) || entry.is_file() {
                resolved.push(entry.clone());
                continue;
            }

            let paths = glob::glob(&pattern).map_err(|e| {
                PatcherError::Pattern(format!("Invalid pattern '{}': {}", pattern, e))
            })?;

            let before = resolved.len();
            for path in paths {
                let path = path.map_err(|e| PatcherError::Io(e.into_error()))?;
                if path.is_file() {
                    resolved.push(path);
                }
            }

            if resolved.len() == before {
                return Err(PatcherError::Pattern(format!(
                    "Pattern '{}' matched no files",
                    pattern
                )));
            }
        }

        Ok(resolved)
    }

    fn rebase(&mut self, base: &Path) {
        if self.destination_dir.is_relative() && !self.destination_dir.as_os_str().is_empty() {
            self.destination_dir = base.join(&self.destination_dir);
        }
        for source in &mut self.source_files {
            if source.is_relative() {
                *source = base.join(&*source);
            }
        }
    }
}

fn is_glob_pattern(entry: &str) -> bool {
    entry.contains(['*', '?', '['])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let spec = PatchSpec::new("out", vec![PathBuf::from("plugin.xml")]);
        assert!(spec.use_cdata);
        assert_eq!(spec.default_version_sentinel, "unspecified");
        assert_eq!(spec.on_malformed, MalformedPolicy::Abort);
        assert_eq!(spec.format, OutputFormat::default());
        assert!(spec.version.is_none());
    }

    #[test]
    fn test_yaml_keys() {
        let yaml = r#"
destination-dir: /tmp/out
source-files:
  - /src/META-INF/plugin.xml
since-build: "211"
until-build: "213.*"
version: 1.0.0
plugin-id: com.example
use-cdata: false
on-malformed: skip
format:
  indent: "    "
"#;
        let spec: PatchSpec = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(spec.destination_dir, PathBuf::from("/tmp/out"));
        assert_eq!(spec.source_files, vec![PathBuf::from("/src/META-INF/plugin.xml")]);
        assert_eq!(spec.since_build.as_deref(), Some("211"));
        assert_eq!(spec.until_build.as_deref(), Some("213.*"));
        assert_eq!(spec.version.as_deref(), Some("1.0.0"));
        assert_eq!(spec.plugin_id.as_deref(), Some("com.example"));
        assert!(!spec.use_cdata);
        assert_eq!(spec.on_malformed, MalformedPolicy::Skip);
        assert_eq!(spec.format.indent, "    ");
        assert!(spec.format.omit_declaration);
        assert_eq!(spec.default_version_sentinel, "unspecified");
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("patch.yaml");

        let mut spec = PatchSpec::new(
            temp_dir.path().join("out"),
            vec![temp_dir.path().join("plugin.xml")],
        );
        spec.description = Some("<p>Hello</p>".to_string());
        spec.version = Some("2.0".to_string());

        spec.save(&path).unwrap();
        let loaded = PatchSpec::load(&path).unwrap();

        assert_eq!(loaded, spec);
    }

    #[test]
    fn test_load_rebases_relative_paths() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("patch.yaml");
        fs::write(
            &path,
            "destination-dir: build/patched\nsource-files:\n  - src/plugin.xml\n  - /abs/plugin.xml\n",
        )
        .unwrap();

        let spec = PatchSpec::load(&path).unwrap();
        assert_eq!(spec.destination_dir, temp_dir.path().join("build/patched"));
        assert_eq!(
            spec.source_files,
            vec![
                temp_dir.path().join("src/plugin.xml"),
                PathBuf::from("/abs/plugin.xml")
            ]
        );
    }

    #[test]
    fn test_load_missing_file() {
        let err = PatchSpec::load("/nonexistent/patch.yaml").unwrap_err();
        assert!(matches!(err, PatcherError::Config(ref msg) if msg.contains("Config file not found")));
    }

    #[test]
    fn test_destination_for() {
        let spec = PatchSpec::new("/build/patched", Vec::new());
        assert_eq!(
            spec.destination_for(Path::new("/src/main/resources/META-INF/plugin.xml"))
                .unwrap(),
            PathBuf::from("/build/patched/plugin.xml")
        );
        assert!(spec.destination_for(Path::new("/")).is_err());
    }

    #[test]
    fn test_resolve_globs() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["b.xml", "a.xml", "notes.txt"] {
            fs::write(temp_dir.path().join(name), "<idea-plugin/>").unwrap();
        }
        fs::create_dir(temp_dir.path().join("dir.xml")).unwrap();

        let literal = PathBuf::from("/literal/plugin.xml");
        let spec = PatchSpec::new(
            "out",
            vec![literal.clone(), temp_dir.path().join("*.xml")],
        );

        let resolved = spec.resolve_source_files().unwrap();
        assert_eq!(
            resolved,
            vec![
                literal,
                temp_dir.path().join("a.xml"),
                temp_dir.path().join("b.xml")
            ]
        );
    }

    #[test]
    fn test_resolve_existing_literal_with_glob_characters() {
        let temp_dir = TempDir::new().unwrap();
        let literal = temp_dir.path().join("plugin[ce].xml");
        fs::write(&literal, "<idea-plugin/>").unwrap();

        let spec = PatchSpec::new("out", vec![literal.clone()]);
        assert_eq!(spec.resolve_source_files().unwrap(), vec![literal]);
    }

    #[test]
    fn test_resolve_unmatched_glob_fails() {
        let temp_dir = TempDir::new().unwrap();
        let spec = PatchSpec::new("out", vec![temp_dir.path().join("*.xml")]);

        let err = spec.resolve_source_files().unwrap_err();
        assert!(matches!(err, PatcherError::Pattern(_)));
    }
}
