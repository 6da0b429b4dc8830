//! Plugin descriptor documents
//!
//! Parses `plugin.xml` descriptors into an owned tree, patches the known
//! build-metadata locations and writes the tree back out.
//!
//! # Patched locations
//!
//! ```xml
//! <idea-plugin>
//!   <id>com.example.plugin</id>
//!   <version>1.0.0</version>
//!   <change-notes><![CDATA[Fixed things]]></change-notes>
//!   <description><![CDATA[Does things]]></description>
//!   <idea-version since-build="211" until-build="213.*" />
//! </idea-plugin>
//! ```

mod document;
mod patch;
mod writer;

pub use document::{Declaration, Element, ManifestDocument, Node, SyntaxError};
pub use patch::{
    patch_attribute, patch_document, patch_tag, PatchTarget, PatchWarning, CDATA_TAGS, ROOT_TAG,
};
pub use writer::OutputFormat;
