//! Plugin XML Patcher - build-time patching of IntelliJ plugin descriptors
//!
//! Takes `plugin.xml` descriptors and writes patched copies with build
//! metadata injected: the `<idea-version>` build range, `<description>`,
//! `<change-notes>`, `<version>` and `<id>`. Sources are never modified.
//!
//! # Architecture
//!
//! - **manifest**: XML document tree, patch operations, pretty writer
//! - **patcher**: Multi-file driver producing a [`PatchReport`]
//! - **config**: [`PatchSpec`] (YAML-loadable) and its validation
//!
//! # Example
//!
//! ```no_run
//! use plugin_xml_patcher::{patch_all, PatchSpec};
//! use std::path::PathBuf;
//!
//! let mut spec = PatchSpec::new(
//!     "build/patchedPluginXmlFiles",
//!     vec![PathBuf::from("src/main/resources/META-INF/plugin.xml")],
//! );
//! spec.since_build = Some("211".to_string());
//! spec.version = Some("1.0.0".to_string());
//!
//! let report = patch_all(&spec)?;
//! for (file, warning) in report.warnings() {
//!     eprintln!("{}: {}", file.display(), warning);
//! }
//! # Ok::<(), plugin_xml_patcher::PatcherError>(())
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod patcher;

// Re-exports
pub use config::{MalformedPolicy, PatchSpec};
pub use error::{PatcherError, Result};
pub use manifest::{ManifestDocument, PatchWarning};
pub use patcher::{patch_all, PatchReport};
