//! Pretty serialization of manifest documents
//!
//! Output layout:
//! - one element per line, indented by [`OutputFormat::indent`] per level
//! - elements holding only character data written inline, text trimmed
//! - childless elements written as `<tag attr="value" />`
//! - whitespace-only text between elements dropped
//!
//! Writing, re-parsing and writing again produces identical bytes.

use super::document::{Declaration, Element, ManifestDocument, Node};
use quick_xml::escape::{escape, partial_escape};
use serde::{Deserialize, Serialize};

/// Formatting options for written manifests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputFormat {
    /// Indentation unit for each nesting level
    pub indent: String,

    /// Leave out the `<?xml ...?>` declaration
    pub omit_declaration: bool,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
            omit_declaration: true,
        }
    }
}

impl ManifestDocument {
    /// Serialize the document using `format`
    pub fn to_xml_string(&self, format: &OutputFormat) -> String {
        let mut out = String::new();

        if !format.omit_declaration {
            let default = Declaration::default();
            write_declaration(self.declaration().unwrap_or(&default), &mut out);
            out.push('\n');
        }

        for node in self.prolog().iter().filter(|n| !n.is_blank_text()) {
            write_node(node, format, 0, &mut out);
            out.push('\n');
        }

        write_element(self.root(), format, 0, &mut out);
        out.push('\n');

        for node in self.epilog().iter().filter(|n| !n.is_blank_text()) {
            write_node(node, format, 0, &mut out);
            out.push('\n');
        }

        out
    }
}

fn write_declaration(decl: &Declaration, out: &mut String) {
    out.push_str("<?xml version=\"");
    out.push_str(&decl.version);
    out.push('"');
    if let Some(ref encoding) = decl.encoding {
        out.push_str(" encoding=\"");
        out.push_str(encoding);
        out.push('"');
    }
    if let Some(ref standalone) = decl.standalone {
        out.push_str(" standalone=\"");
        out.push_str(standalone);
        out.push('"');
    }
    out.push_str("?>");
}

fn push_indent(format: &OutputFormat, depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str(&format.indent);
    }
}

fn write_element(element: &Element, format: &OutputFormat, depth: usize, out: &mut String) {
    out.push('<');
    out.push_str(element.name());
    for (key, value) in element.attributes() {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape(value.as_str()));
        out.push('"');
    }

    let children: Vec<&Node> = element
        .children()
        .iter()
        .filter(|n| !n.is_blank_text())
        .collect();

    if children.is_empty() {
        out.push_str(" />");
        return;
    }

    out.push('>');

    if children.iter().all(|n| n.is_character_data()) {
        write_inline(&children, out);
    } else {
        out.push('\n');
        for child in children {
            push_indent(format, depth + 1, out);
            write_node(child, format, depth + 1, out);
            out.push('\n');
        }
        push_indent(format, depth, out);
    }

    out.push_str("</");
    out.push_str(element.name());
    out.push('>');
}

/// Character content written on one line, trimmed only at its outer edges
fn write_inline(children: &[&Node], out: &mut String) {
    let last = children.len() - 1;
    for (i, child) in children.iter().enumerate() {
        match child {
            Node::Text(text) => {
                let mut text = text.as_str();
                if i == 0 {
                    text = text.trim_start();
                }
                if i == last {
                    text = text.trim_end();
                }
                out.push_str(&partial_escape(text));
            }
            other => write_character_data(other, out),
        }
    }
}

fn write_node(node: &Node, format: &OutputFormat, depth: usize, out: &mut String) {
    match node {
        Node::Element(element) => write_element(element, format, depth, out),
        Node::Text(text) => out.push_str(&partial_escape(text.trim())),
        Node::Comment(comment) => {
            out.push_str("<!--");
            out.push_str(comment);
            out.push_str("-->");
        }
        Node::ProcessingInstruction { target, content } => {
            out.push_str("<?");
            out.push_str(target);
            if !content.is_empty() {
                out.push(' ');
                out.push_str(content);
            }
            out.push_str("?>");
        }
        Node::DocType(doctype) => {
            out.push_str("<!DOCTYPE ");
            out.push_str(doctype);
            out.push('>');
        }
        other => write_character_data(other, out),
    }
}

fn write_character_data(node: &Node, out: &mut String) {
    match node {
        Node::CData(data) => {
            // "]]>" cannot appear inside a section; split it across two
            out.push_str("<![CDATA[");
            out.push_str(&data.replace("]]>", "]]]]><![CDATA[>"));
            out.push_str("]]>");
        }
        Node::EntityRef(name) => {
            out.push('&');
            out.push_str(name);
            out.push(';');
        }
        Node::Text(text) => out.push_str(&partial_escape(text.as_str())),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewrite(xml: &str) -> String {
        ManifestDocument::parse(xml)
            .unwrap()
            .to_xml_string(&OutputFormat::default())
    }

    #[test]
    fn test_pretty_layout() {
        let xml = "<idea-plugin><id>  com.example  </id><idea-version since-build=\"211\"/>\
                   <extensions defaultExtensionNs=\"com.intellij\"><toolWindow id=\"x\"/></extensions>\
                   </idea-plugin>";

        assert_eq!(
            rewrite(xml),
            "<idea-plugin>\n\
             \x20 <id>com.example</id>\n\
             \x20 <idea-version since-build=\"211\" />\n\
             \x20 <extensions defaultExtensionNs=\"com.intellij\">\n\
             \x20   <toolWindow id=\"x\" />\n\
             \x20 </extensions>\n\
             </idea-plugin>\n"
        );
    }

    #[test]
    fn test_empty_and_blank_elements_self_close() {
        assert_eq!(
            rewrite("<idea-plugin><version/><vendor>   </vendor></idea-plugin>"),
            "<idea-plugin>\n  <version />\n  <vendor />\n</idea-plugin>\n"
        );
    }

    #[test]
    fn test_declaration_omitted_by_default() {
        let xml = "<?xml version=\"1.0\" encoding=\"UTF-8\"?><idea-plugin/>";
        assert_eq!(rewrite(xml), "<idea-plugin />\n");
    }

    #[test]
    fn test_declaration_kept_when_requested() {
        let format = OutputFormat {
            omit_declaration: false,
            ..OutputFormat::default()
        };

        let with_decl = ManifestDocument::parse("<?xml version=\"1.1\"?><idea-plugin/>").unwrap();
        assert_eq!(
            with_decl.to_xml_string(&format),
            "<?xml version=\"1.1\"?>\n<idea-plugin />\n"
        );

        let without_decl = ManifestDocument::parse("<idea-plugin/>").unwrap();
        assert_eq!(
            without_decl.to_xml_string(&format),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<idea-plugin />\n"
        );
    }

    #[test]
    fn test_escaping() {
        let mut root = Element::new("idea-plugin");
        let mut name = Element::new("name");
        name.set_text("Tom & Jerry <3");
        name.set_attribute("title", "say \"hi\"");
        root.insert_child(0, name);

        let out = ManifestDocument::new(root).to_xml_string(&OutputFormat::default());
        assert!(out.contains("<name title=\"say &quot;hi&quot;\">Tom &amp; Jerry &lt;3</name>"));
    }

    #[test]
    fn test_cdata_written_verbatim() {
        assert_eq!(
            rewrite("<idea-plugin><description><![CDATA[ <b>x</b> & y ]]></description></idea-plugin>"),
            "<idea-plugin>\n  <description><![CDATA[ <b>x</b> & y ]]></description>\n</idea-plugin>\n"
        );
    }

    #[test]
    fn test_cdata_terminator_split() {
        let mut root = Element::new("idea-plugin");
        let mut description = Element::new("description");
        description.set_cdata("a]]>b");
        root.insert_child(0, description);

        let out = ManifestDocument::new(root).to_xml_string(&OutputFormat::default());
        assert!(out.contains("<![CDATA[a]]]]><![CDATA[>b]]>"));

        let reparsed = ManifestDocument::parse(&out).unwrap();
        assert_eq!(reparsed.root().child("description").unwrap().text(), "a]]>b");
        assert_eq!(reparsed.to_xml_string(&OutputFormat::default()), out);
    }

    #[test]
    fn test_comments_and_processing_instructions_preserved() {
        let xml = "<!-- head --><?custom-pi data?><idea-plugin>\
                   <!-- inside --><id>x</id></idea-plugin><!-- tail -->";

        assert_eq!(
            rewrite(xml),
            "<!-- head -->\n\
             <?custom-pi data?>\n\
             <idea-plugin>\n\
             \x20 <!-- inside -->\n\
             \x20 <id>x</id>\n\
             </idea-plugin>\n\
             <!-- tail -->\n"
        );
    }

    #[test]
    fn test_custom_indent() {
        let format = OutputFormat {
            indent: "\t".to_string(),
            ..OutputFormat::default()
        };
        let doc = ManifestDocument::parse("<idea-plugin><id>x</id></idea-plugin>").unwrap();
        assert_eq!(
            doc.to_xml_string(&format),
            "<idea-plugin>\n\t<id>x</id>\n</idea-plugin>\n"
        );
    }

    #[test]
    fn test_output_is_stable() {
        let xml = r#"<?xml version="1.0"?>
<!DOCTYPE idea-plugin>
<idea-plugin>
    <name>A &amp; B &custom; C</name>
    <description>
        <![CDATA[ multi
        line ]]>
    </description>
    <actions>
        text
        <action id="a"/>
    </actions>
</idea-plugin>"#;

        let once = rewrite(xml);
        let twice = rewrite(&once);
        assert_eq!(once, twice);
        assert!(once.starts_with("<!DOCTYPE idea-plugin>\n"));
        assert!(once.contains("<name>A &amp; B &custom; C</name>"));
    }
}
