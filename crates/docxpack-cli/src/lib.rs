//! docxpack CLI - Command-line interface library
//!
//! This library provides the CLI functionality for docxpack, including:
//! - Inspect: List parts, content types, relationships and styles
//! - Text: Print the document text
//! - Roundtrip: Unpack and rewrite a package
//! - New: Create a document from the command line
//!
//! # Library Usage
//!
//! ```ignore
//! use docxpack_cli::{inspect_command, run_cli};
//!
//! // Run the full CLI
//! run_cli();
//!
//! // Or use individual commands programmatically
//! let report = inspect_command(&input, PackageOptions::default())?;
//! println!("{}", report.to_text());
//! ```
//!
//! # Binary Usage
//!
//! ```bash
//! # Show what is inside a package
//! docxpack inspect report.docx --format json
//!
//! # Rewrite a package with stored (uncompressed) entries
//! docxpack --config stored.toml roundtrip report.docx --output copy.docx
//!
//! # Create a document
//! docxpack new --output hello.docx --title "Hello" --paragraph "First paragraph" --bullet "Item"
//! ```

pub mod app;

// Re-export main entry point and types
pub use app::{
    inspect_command, load_options, new_command, roundtrip_command, run_cli, text_command,
    OutputFormat, PackageReport,
};
