//! # docxpack-ooxml
//!
//! Reading, authoring and writing of DOCX packages (Office Open XML).
//!
//! This crate provides functionality to:
//! - Unpack a DOCX zip archive into a linked package model
//! - Edit the main document body (paragraphs, headings, lists, tables, pictures, links)
//! - Write the package back out, keeping every unrecognized part byte-for-byte
//!
//! ## Example: Editing a Document
//!
//! ```no_run
//! use docxpack_ooxml::{DocxPackage, StyleType};
//!
//! let mut package = DocxPackage::open("document.docx")?;
//! println!("{}", package.plain_text());
//!
//! if package.style_by_id("Heading1", StyleType::Paragraph).is_some() {
//!     package.add_heading("Summary", 1)?;
//! }
//! package.add_picture("chart.png", 4.0, 3.0)?;
//! package.save()?;
//! # Ok::<(), docxpack_ooxml::OoxmlError>(())
//! ```

pub mod archive;
pub mod content_types;
pub mod document;
pub mod drawing;
pub mod error;
pub mod numbering;
pub mod options;
pub mod package;
pub mod paragraph;
pub mod paths;
pub mod relationships;
pub mod run;
pub mod styles;
pub mod table;
pub mod units;
pub mod xml;

#[cfg(test)]
mod test_utils;

pub use archive::FileIndex;
pub use content_types::ContentTypes;
pub use document::{BlockChild, Body, Document};
pub use drawing::{Drawing, InlinePicture};
pub use error::{OoxmlError, Result, UnpackStage};
pub use numbering::{ListKind, NumberingChild, NumberingPart};
pub use options::{Compression, PackageOptions};
pub use package::DocxPackage;
pub use paragraph::{Hyperlink, Justification, Paragraph, ParagraphChild};
pub use relationships::{Relationship, Relationships, TargetMode};
pub use run::{BreakType, Run, RunChild};
pub use styles::{Style, StyleSheet, StyleType, StylesPart};
pub use table::{Table, TableCell, TableRow, TableWidth};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
