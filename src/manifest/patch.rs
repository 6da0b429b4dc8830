//! Patch operations on plugin descriptors
//!
//! Every operation only touches a direct child of the `<idea-plugin>` root
//! and is a no-op for documents with any other root. Overwriting a
//! non-empty value yields a [`PatchWarning`]; the new value always wins.

use super::document::{Element, ManifestDocument};
use crate::config::PatchSpec;
use serde::Serialize;
use std::fmt;

/// Tag of the root element every patch operation requires
pub const ROOT_TAG: &str = "idea-plugin";

/// Tags whose content is wrapped in CDATA when CDATA output is enabled
pub const CDATA_TAGS: [&str; 2] = ["description", "change-notes"];

/// The value a warning refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PatchTarget {
    /// Text content of a child element
    Tag { name: String },

    /// Attribute of a child element
    Attribute { tag: String, attribute: String },
}

/// Advisory record of a pre-existing value being overwritten
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchWarning {
    pub target: PatchTarget,
    pub previous: String,
    pub new: String,
}

impl fmt::Display for PatchWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            PatchTarget::Tag { name } => write!(
                f,
                "value of '{}[{}]' tag will be set to '{}'",
                name, self.previous, self.new
            ),
            PatchTarget::Attribute { tag, attribute } => write!(
                f,
                "attribute '{}=[{}]' of '{}' tag will be set to '{}'",
                attribute, self.previous, tag, self.new
            ),
        }
    }
}

/// Set the content of the root's `tag_name` child
///
/// Creates the child as the first node of the root when missing. Content of
/// [`CDATA_TAGS`] goes into a CDATA section when `use_cdata` is set; every
/// other tag gets plain text.
pub fn patch_tag(
    doc: &mut ManifestDocument,
    tag_name: &str,
    content: &str,
    use_cdata: bool,
) -> Option<PatchWarning> {
    if content.is_empty() || !doc.has_root(ROOT_TAG) {
        return None;
    }

    let root = doc.root_mut();

    let warning = match root.child(tag_name) {
        Some(existing) => {
            let previous = existing.text_content();
            (!previous.is_empty()).then(|| PatchWarning {
                target: PatchTarget::Tag {
                    name: tag_name.to_string(),
                },
                previous,
                new: content.to_string(),
            })
        }
        None => {
            root.insert_child(0, Element::new(tag_name));
            None
        }
    };

    let element = root.child_mut(tag_name)?;
    if use_cdata && CDATA_TAGS.contains(&tag_name) {
        element.set_cdata(content);
    } else {
        element.set_text(content);
    }

    if let Some(ref w) = warning {
        tracing::debug!(warning = %w, "Overwriting existing tag value");
    }
    warning
}

/// Set `attribute_name` on the root's `tag_name` child
///
/// Creates the child, carrying just this attribute, as the first node of
/// the root when missing.
pub fn patch_attribute(
    doc: &mut ManifestDocument,
    tag_name: &str,
    attribute_name: &str,
    attribute_value: &str,
) -> Option<PatchWarning> {
    if attribute_value.is_empty() || !doc.has_root(ROOT_TAG) {
        return None;
    }

    let root = doc.root_mut();

    if root.child(tag_name).is_none() {
        let mut created = Element::new(tag_name);
        created.set_attribute(attribute_name, attribute_value);
        root.insert_child(0, created);
        return None;
    }

    let element = root.child_mut(tag_name)?;

    let previous = element.set_attribute(attribute_name, attribute_value)?;
    if previous.is_empty() {
        return None;
    }

    let warning = PatchWarning {
        target: PatchTarget::Attribute {
            tag: tag_name.to_string(),
            attribute: attribute_name.to_string(),
        },
        previous,
        new: attribute_value.to_string(),
    };
    tracing::debug!(warning = %warning, "Overwriting existing attribute value");
    Some(warning)
}

/// Apply every configured value of `spec` to `doc`
///
/// Order: since-build, until-build, description, change-notes, version, id.
/// A version equal to the spec's default-version sentinel counts as unset.
/// Returns the warnings in the order they were raised.
pub fn patch_document(doc: &mut ManifestDocument, spec: &PatchSpec) -> Vec<PatchWarning> {
    if !doc.has_root(ROOT_TAG) {
        tracing::debug!(root = doc.root().name(), "Unexpected root element, leaving document as-is");
        return Vec::new();
    }

    let version = value(&spec.version).filter(|v| *v != spec.default_version_sentinel);

    let warnings = [
        value(&spec.since_build)
            .and_then(|v| patch_attribute(doc, "idea-version", "since-build", v)),
        value(&spec.until_build)
            .and_then(|v| patch_attribute(doc, "idea-version", "until-build", v)),
        value(&spec.description)
            .and_then(|v| patch_tag(doc, "description", v, spec.use_cdata)),
        value(&spec.change_notes)
            .and_then(|v| patch_tag(doc, "change-notes", v, spec.use_cdata)),
        version.and_then(|v| patch_tag(doc, "version", v, spec.use_cdata)),
        value(&spec.plugin_id).and_then(|v| patch_tag(doc, "id", v, spec.use_cdata)),
    ];

    warnings.into_iter().flatten().collect()
}

fn value(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|v| !v.is_empty())
}
