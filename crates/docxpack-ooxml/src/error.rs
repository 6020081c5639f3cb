//! Error types for OOXML package operations

use std::fmt;

use thiserror::Error;

/// Stage of the unpack pipeline that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnpackStage {
    /// Reading the zip container into the file index
    Archive,
    /// Loading `[Content_Types].xml`
    ContentTypes,
    /// Loading `_rels/.rels` and locating the main document
    RootRelationships,
    /// Loading the main document part and its relationships
    MainDocument,
    /// Loading the styles part
    Styles,
}

impl fmt::Display for UnpackStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Archive => "archive",
            Self::ContentTypes => "content types",
            Self::RootRelationships => "root relationships",
            Self::MainDocument => "main document",
            Self::Styles => "styles",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during OOXML operations
#[derive(Error, Debug)]
pub enum OoxmlError {
    /// The buffer is not a readable zip archive
    #[error("Corrupt archive: {0}")]
    CorruptArchive(#[source] zip::result::ZipError),

    /// A zip entry could not be opened or decompressed
    #[error("Failed to read archive entry {path}: {source}")]
    EntryRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A zip entry could not be written
    #[error("Failed to write archive entry {path}: {source}")]
    EntryWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// `[Content_Types].xml` is not valid XML
    #[error("Malformed content types: {0}")]
    MalformedContentTypes(#[source] quick_xml::Error),

    /// A `.rels` part is not valid XML
    #[error("Malformed relationships in {path}: {source}")]
    MalformedRelationships {
        path: String,
        #[source]
        source: quick_xml::Error,
    },

    /// The main document part is not valid WordprocessingML
    #[error("Malformed document part {path}: {source}")]
    MalformedDocument {
        path: String,
        #[source]
        source: quick_xml::Error,
    },

    /// The styles part is not valid XML
    #[error("Malformed styles part {path}: {source}")]
    MalformedStyles {
        path: String,
        #[source]
        source: quick_xml::Error,
    },

    /// The numbering part is not valid XML
    #[error("Malformed numbering part {path}: {source}")]
    MalformedNumbering {
        path: String,
        #[source]
        source: quick_xml::Error,
    },

    /// A list was requested on an abstract numbering definition the part lacks
    #[error("Abstract numbering definition not found: {0}")]
    UnknownAbstractNumbering(u32),

    /// The root relationships have no officeDocument entry
    #[error("Main document not found: no officeDocument relationship in root relationships")]
    MainDocumentNotFound,

    /// Required part not present in the package
    #[error("Required part not found: {0}")]
    MissingPart(String),

    /// Part has no declared content type
    #[error("No content type declared for part: {0}")]
    UndeclaredPart(String),

    /// Save was requested without a destination
    #[error("Destination file path is empty")]
    EmptyDestination,

    /// Heading levels run from 0 (Title) to 9
    #[error("Heading level not supported: {0}")]
    InvalidHeadingLevel(u32),

    /// List levels run from 0 to 8
    #[error("List level not supported: {0}")]
    InvalidListLevel(u32),

    /// A list item names a numbering instance the package does not define
    #[error("Numbering instance not found: {0}")]
    UnknownNumbering(u32),

    /// Media file extension with no known content type
    #[error("Unsupported media extension: {0:?}")]
    UnsupportedMedia(String),

    /// Error reading or writing files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid package options
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// A failure inside one stage of the unpack pipeline
    #[error("Unpacking {stage}: {source}")]
    Unpack {
        stage: UnpackStage,
        #[source]
        source: Box<OoxmlError>,
    },
}

impl OoxmlError {
    /// Wrap this error with the unpack stage it happened in
    pub(crate) fn in_stage(self, stage: UnpackStage) -> Self {
        Self::Unpack {
            stage,
            source: Box::new(self),
        }
    }

    /// The underlying error with any stage wrappers removed
    pub fn root_cause(&self) -> &OoxmlError {
        match self {
            Self::Unpack { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// The unpack stage this error was raised in, if any
    pub fn stage(&self) -> Option<UnpackStage> {
        match self {
            Self::Unpack { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Result type for OOXML operations
pub type Result<T> = std::result::Result<T, OoxmlError>;
