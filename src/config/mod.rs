//! Configuration system
//!
//! A patch run is described by a [`PatchSpec`], loadable from YAML:
//!
//! ```yaml
//! destination-dir: build/patchedPluginXmlFiles
//! source-files:
//!   - src/main/resources/META-INF/*.xml
//! since-build: "211"
//! until-build: "213.*"
//! version: 1.0.0
//! use-cdata: true
//! on-malformed: abort
//! ```

mod patch_spec;
pub mod validation;

pub use patch_spec::{MalformedPolicy, PatchSpec, DEFAULT_VERSION_SENTINEL};
pub use validation::{validate_sources, validate_spec, ValidationError};
