//! CLI Application logic
//!
//! Contains the command-line interface implementation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use serde::Serialize;

use docxpack_ooxml::{
    DocxPackage, ListKind, PackageOptions, Relationships, StyleType, TargetMode,
};

/// Output format for reports
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output for tool consumption
    Json,
}

#[derive(Parser)]
#[command(name = "docxpack")]
#[command(author, version, about = "Inspect, round-trip and author DOCX packages", long_about = None)]
struct Cli {
    /// Package options file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the parts, relationships and styles of a package
    Inspect {
        /// Input DOCX file
        input: PathBuf,

        /// Output format (text or json)
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the document text, one paragraph per line
    Text {
        /// Input DOCX file
        input: PathBuf,
    },

    /// Unpack a package and write it back out
    Roundtrip {
        /// Input DOCX file
        input: PathBuf,

        /// Output DOCX file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Create a new document
    New {
        /// Output DOCX file
        #[arg(short, long)]
        output: PathBuf,

        /// Document title
        #[arg(short, long)]
        title: Option<String>,

        /// Paragraph text (repeatable)
        #[arg(short, long)]
        paragraph: Vec<String>,

        /// Bullet list item (repeatable)
        #[arg(short, long)]
        bullet: Vec<String>,

        /// Image file to insert, 4 inches wide (repeatable)
        #[arg(short, long)]
        image: Vec<PathBuf>,
    },
}

/// Summary of a package, as printed by `inspect`
#[derive(Debug, Serialize)]
pub struct PackageReport {
    pub document: String,
    pub paragraphs: usize,
    pub tables: usize,
    pub images: u32,
    pub styles: Option<StylesReport>,
    pub content_types: ContentTypesReport,
    pub root_relationships: Vec<RelationshipReport>,
    pub document_relationships: Vec<RelationshipReport>,
    /// Parts passed through without interpretation
    pub other_parts: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct StylesReport {
    pub path: String,
    pub count: usize,
    pub default_paragraph: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ContentTypesReport {
    pub defaults: Vec<(String, String)>,
    pub overrides: Vec<(String, String)>,
}

#[derive(Debug, Serialize)]
pub struct RelationshipReport {
    pub id: String,
    #[serde(rename = "type")]
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

impl PackageReport {
    /// Build a report for an unpacked package
    pub fn from_package(package: &DocxPackage) -> Self {
        let relationships = |rels: &Relationships| -> Vec<RelationshipReport> {
            rels.iter()
                .map(|r| RelationshipReport {
                    id: r.id.clone(),
                    rel_type: r.rel_type.clone(),
                    target: r.target.clone(),
                    external: r.target_mode == TargetMode::External,
                })
                .collect()
        };
        let content_types = package.content_types();

        Self {
            document: package.document().path().to_string(),
            paragraphs: package.paragraphs().len(),
            tables: package.document().tables().count(),
            images: package.image_count(),
            styles: package.styles().map(|s| StylesReport {
                path: s.path().to_string(),
                count: s.sheet().len(),
                default_paragraph: s
                    .sheet()
                    .default_style(StyleType::Paragraph)
                    .map(|st| st.id.clone()),
            }),
            content_types: ContentTypesReport {
                defaults: content_types
                    .defaults()
                    .iter()
                    .map(|d| (d.extension.clone(), d.content_type.clone()))
                    .collect(),
                overrides: content_types
                    .overrides()
                    .iter()
                    .map(|o| (o.part_name.clone(), o.content_type.clone()))
                    .collect(),
            },
            root_relationships: relationships(package.root_relationships()),
            document_relationships: relationships(package.document().relationships()),
            other_parts: package.files().paths().map(String::from).collect(),
        }
    }

    /// Render the report as human-readable text
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Main document: {}\n", self.document));
        out.push_str(&format!(
            "  {} paragraphs, {} tables, {} images\n",
            self.paragraphs, self.tables, self.images
        ));

        match &self.styles {
            Some(styles) => {
                out.push_str(&format!("Styles: {} ({} styles", styles.path, styles.count));
                if let Some(default) = &styles.default_paragraph {
                    out.push_str(&format!(", default {}", default));
                }
                out.push_str(")\n");
            }
            None => out.push_str("Styles: none\n"),
        }

        out.push_str("Content types:\n");
        for (ext, ct) in &self.content_types.defaults {
            out.push_str(&format!("  .{:<8} {}\n", ext, ct));
        }
        for (part, ct) in &self.content_types.overrides {
            out.push_str(&format!("  {} {}\n", part, ct));
        }

        for (title, rels) in [
            ("Root relationships", &self.root_relationships),
            ("Document relationships", &self.document_relationships),
        ] {
            out.push_str(&format!("{}:\n", title));
            for rel in rels {
                let short_type = rel.rel_type.rsplit('/').next().unwrap_or(&rel.rel_type);
                let external = if rel.external { " (external)" } else { "" };
                out.push_str(&format!(
                    "  {:<6} {:<16} {}{}\n",
                    rel.id, short_type, rel.target, external
                ));
            }
        }

        if !self.other_parts.is_empty() {
            out.push_str("Other parts:\n");
            for part in &self.other_parts {
                out.push_str(&format!("  {}\n", part));
            }
        }
        out
    }
}

/// Run the CLI application
///
/// This is the main entry point for the command-line interface.
/// It parses arguments and dispatches to the appropriate command.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = load_options(cli.config.as_deref())?;

    match cli.command {
        Commands::Inspect { input, format } => {
            let report = inspect_command(&input, options)?;
            match format {
                OutputFormat::Text => print!("{}", report.to_text()),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("Failed to serialize report")?
                ),
            }
        }
        Commands::Text { input } => {
            println!("{}", text_command(&input, options)?);
        }
        Commands::Roundtrip { input, output } => {
            roundtrip_command(&input, &output, options)?;
            println!("Wrote {}", output.display());
        }
        Commands::New {
            output,
            title,
            paragraph,
            bullet,
            image,
        } => {
            new_command(&output, title.as_deref(), &paragraph, &bullet, &image, options)?;
            println!("Created {}", output.display());
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // RUST_LOG still wins when set
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

/// Load package options from `path`, or the defaults when no file is given
pub fn load_options(path: Option<&Path>) -> Result<PackageOptions> {
    match path {
        Some(path) => PackageOptions::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display())),
        None => Ok(PackageOptions::default()),
    }
}

fn open_package(input: &Path, options: PackageOptions) -> Result<DocxPackage> {
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }
    DocxPackage::open_with_options(input, options)
        .with_context(|| format!("Failed to open DOCX file: {}", input.display()))
}

/// Execute the inspect command
pub fn inspect_command(input: &Path, options: PackageOptions) -> Result<PackageReport> {
    let package = open_package(input, options)?;
    Ok(PackageReport::from_package(&package))
}

/// Execute the text command
pub fn text_command(input: &Path, options: PackageOptions) -> Result<String> {
    let package = open_package(input, options)?;
    Ok(package.plain_text())
}

/// Execute the roundtrip command
pub fn roundtrip_command(input: &Path, output: &Path, options: PackageOptions) -> Result<()> {
    let package = open_package(input, options)?;
    package
        .save_to(output)
        .with_context(|| format!("Failed to write output file: {}", output.display()))?;
    log::info!(
        "round-tripped {} -> {}",
        input.display(),
        output.display()
    );
    Ok(())
}

/// Execute the new command
pub fn new_command(
    output: &Path,
    title: Option<&str>,
    paragraphs: &[String],
    bullets: &[String],
    images: &[PathBuf],
    options: PackageOptions,
) -> Result<()> {
    let mut package = DocxPackage::with_options(options);

    if let Some(title) = title {
        package.add_heading(title, 0)?;
    }
    for text in paragraphs {
        package.add_paragraph(text.as_str());
    }
    if !bullets.is_empty() {
        let list = package.new_list_instance(ListKind::Bullet)?;
        for text in bullets {
            package.add_list_item(text.as_str(), list, 0)?;
        }
    }
    for image in images {
        package
            .add_picture(image, 4.0, 3.0)
            .with_context(|| format!("Failed to add image: {}", image.display()))?;
    }

    package
        .save_to(output)
        .with_context(|| format!("Failed to write output file: {}", output.display()))?;
    Ok(())
}
