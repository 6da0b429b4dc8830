//! Plugin XML Patcher
//!
//! Main entry point for the `patch-plugin-xml` CLI.

use anyhow::Context;
use clap::Parser;
use plugin_xml_patcher::{patch_all, MalformedPolicy, PatchReport, PatchSpec};
use std::path::PathBuf;
use std::process;

/// Patch plugin.xml descriptors with build metadata
#[derive(Parser, Debug)]
#[command(name = "patch-plugin-xml")]
#[command(version, about, long_about = None)]
struct Cli {
    /// plugin.xml files or glob patterns to patch
    files: Vec<PathBuf>,

    /// Directory the patched copies are written to
    #[arg(short, long, env = "PATCH_PLUGIN_XML_DESTINATION")]
    destination: Option<PathBuf>,

    /// YAML patch spec; command-line values take precedence over it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Value for the since-build attribute of <idea-version>
    #[arg(long, env = "PATCH_PLUGIN_XML_SINCE_BUILD")]
    since_build: Option<String>,

    /// Value for the until-build attribute of <idea-version>
    #[arg(long, env = "PATCH_PLUGIN_XML_UNTIL_BUILD")]
    until_build: Option<String>,

    /// Content of <description>
    #[arg(long, env = "PATCH_PLUGIN_XML_DESCRIPTION")]
    description: Option<String>,

    /// Content of <change-notes>
    #[arg(long, env = "PATCH_PLUGIN_XML_CHANGE_NOTES")]
    change_notes: Option<String>,

    /// Content of <version>
    #[arg(long, env = "PATCH_PLUGIN_XML_VERSION")]
    plugin_version: Option<String>,

    /// Content of <id>
    #[arg(long, env = "PATCH_PLUGIN_XML_PLUGIN_ID")]
    plugin_id: Option<String>,

    /// Write description and change notes as plain text instead of CDATA
    #[arg(long)]
    no_cdata: bool,

    /// Version value treated as "not set" (default: unspecified)
    #[arg(long)]
    default_version_sentinel: Option<String>,

    /// Skip malformed manifests instead of failing the run
    #[arg(long)]
    skip_malformed: bool,

    /// Write an XML declaration at the top of each patched file
    #[arg(long)]
    keep_declaration: bool,

    /// Save the effective patch spec as YAML to this path, then exit
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Print the patch report as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Log every file written
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Layer command-line values over `spec`
    fn apply_to(&self, spec: &mut PatchSpec) {
        if !self.files.is_empty() {
            spec.source_files = self.files.clone();
        }
        if let Some(ref destination) = self.destination {
            spec.destination_dir = destination.clone();
        }

        let overrides = [
            (&mut spec.since_build, &self.since_build),
            (&mut spec.until_build, &self.until_build),
            (&mut spec.description, &self.description),
            (&mut spec.change_notes, &self.change_notes),
            (&mut spec.version, &self.plugin_version),
            (&mut spec.plugin_id, &self.plugin_id),
        ];
        for (field, value) in overrides {
            if value.is_some() {
                field.clone_from(value);
            }
        }

        if let Some(ref sentinel) = self.default_version_sentinel {
            spec.default_version_sentinel = sentinel.clone();
        }
        if self.no_cdata {
            spec.use_cdata = false;
        }
        if self.skip_malformed {
            spec.on_malformed = MalformedPolicy::Skip;
        }
        if self.keep_declaration {
            spec.format.omit_declaration = false;
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { "info" } else { "warn" };
    if let Err(e) = plugin_xml_patcher::logging::init(level) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut spec = match cli.config {
        Some(ref path) => PatchSpec::load(path)
            .with_context(|| format!("Failed to load patch spec {}", path.display()))?,
        None => PatchSpec::default(),
    };
    cli.apply_to(&mut spec);

    if let Some(ref path) = cli.save_config {
        spec.save(path)?;
        println!("Saved patch spec to {}", path.display());
        return Ok(());
    }

    let report = patch_all(&spec)?;

    for (file, warning) in report.warnings() {
        tracing::warn!(file = %file.display(), "Patching plugin.xml: {}", warning);
    }

    if cli.json {
        println!("{}", report.to_json()?);
    } else {
        print_summary(&report, &spec);
    }

    Ok(())
}

fn print_summary(report: &PatchReport, spec: &PatchSpec) {
    println!(
        "Patched {} file(s) into {}",
        report.written(),
        spec.destination_dir.display()
    );
    for file in report.files.iter().filter(|f| !f.root_matched) {
        println!(
            "  {} copied unchanged (root is not <idea-plugin>)",
            file.source.display()
        );
    }
    for skipped in &report.skipped {
        println!("  skipped {}: {}", skipped.source.display(), skipped.reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config_values() {
        let cli = Cli::try_parse_from([
            "patch-plugin-xml",
            "--destination",
            "out",
            "--since-build",
            "211",
            "--plugin-version",
            "1.0.0",
            "--no-cdata",
            "--skip-malformed",
            "plugin.xml",
        ])
        .unwrap();

        let mut spec = PatchSpec::new("from-config", vec![PathBuf::from("config.xml")]);
        spec.since_build = Some("193".to_string());
        spec.until_build = Some("213.*".to_string());
        cli.apply_to(&mut spec);

        assert_eq!(spec.destination_dir, PathBuf::from("out"));
        assert_eq!(spec.source_files, vec![PathBuf::from("plugin.xml")]);
        assert_eq!(spec.since_build.as_deref(), Some("211"));
        assert_eq!(spec.until_build.as_deref(), Some("213.*"));
        assert_eq!(spec.version.as_deref(), Some("1.0.0"));
        assert!(!spec.use_cdata);
        assert_eq!(spec.on_malformed, MalformedPolicy::Skip);
        assert!(spec.format.omit_declaration);
    }

    #[test]
    fn test_cli_without_files_keeps_config_sources() {
        let cli = Cli::try_parse_from(["patch-plugin-xml", "--keep-declaration"]).unwrap();

        let mut spec = PatchSpec::new("out", vec![PathBuf::from("config.xml")]);
        cli.apply_to(&mut spec);

        assert_eq!(spec.source_files, vec![PathBuf::from("config.xml")]);
        assert!(!spec.format.omit_declaration);
        assert!(spec.use_cdata);
    }
}
