//! Zip file index for DOCX packages
//!
//! A DOCX file is a zip archive of XML parts and binary resources. The
//! [`FileIndex`] holds every entry as `path -> bytes`, keyed by the normalized
//! part name, and converts to and from the zip container.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek, Write};

use zip::read::ZipArchive;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::error::{OoxmlError, Result};
use crate::options::PackageOptions;
use crate::paths::normalize_entry_name;

/// Upper bound on the buffer reserved from an entry's declared size
const MAX_PREALLOC: usize = 1 << 20;

/// In-memory index of package parts, ordered by path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileIndex {
    files: BTreeMap<String, Vec<u8>>,
}

impl FileIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every entry of a zip buffer into an index
    pub fn read_from_zip(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    /// Read every entry from any zip source
    ///
    /// Fails without a partial result if any entry cannot be decompressed.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader).map_err(OoxmlError::CorruptArchive)?;
        let mut files = BTreeMap::new();

        for i in 0..archive.len() {
            let mut file = archive.by_index(i).map_err(|e| OoxmlError::EntryRead {
                path: format!("#{}", i),
                source: std::io::Error::other(e),
            })?;
            let name = normalize_entry_name(file.name());

            if file.is_dir() || name.ends_with('/') {
                continue;
            }

            let mut contents = Vec::with_capacity((file.size() as usize).min(MAX_PREALLOC));
            file.read_to_end(&mut contents)
                .map_err(|source| OoxmlError::EntryRead {
                    path: name.clone(),
                    source,
                })?;
            log::trace!("read entry {} ({} bytes)", name, contents.len());
            files.insert(name, contents);
        }

        Ok(Self { files })
    }

    /// Write the index as a zip archive
    ///
    /// Entries are written in sorted path order with a fixed timestamp, so the
    /// same index always produces the same bytes.
    pub fn write_to_zip(&self, options: &PackageOptions) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let entry_options = SimpleFileOptions::default()
            .compression_method(options.compression.method())
            .compression_level(options.compression_level)
            .last_modified_time(zip::DateTime::default());

        for (path, contents) in &self.files {
            if let Err(source) = write_entry(&mut zip, path, contents, entry_options) {
                // Close the writer before bailing out; the partial buffer is dropped.
                let _ = zip.finish();
                return Err(OoxmlError::EntryWrite {
                    path: path.clone(),
                    source,
                });
            }
            log::trace!("wrote entry {} ({} bytes)", path, contents.len());
        }

        let cursor = zip.finish().map_err(|e| OoxmlError::EntryWrite {
            path: "<central directory>".to_string(),
            source: std::io::Error::other(e),
        })?;
        Ok(cursor.into_inner())
    }

    /// Get a part's contents by path
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(|v| v.as_slice())
    }

    /// Get a part's contents as a string
    pub fn get_string(&self, path: &str) -> Option<String> {
        self.files
            .get(path)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Set or replace a part; the path is normalized first
    pub fn insert(&mut self, path: impl AsRef<str>, contents: Vec<u8>) {
        self.files
            .insert(normalize_entry_name(path.as_ref()), contents);
    }

    /// Remove a part, returning its contents
    pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        self.files.remove(path)
    }

    /// Check if a part exists
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Number of parts
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the index has no parts
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Part paths in sorted order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(|s| s.as_str())
    }

    /// Parts in sorted path order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of parts whose path starts with `prefix`
    pub fn count_with_prefix(&self, prefix: &str) -> usize {
        self.files.keys().filter(|k| k.starts_with(prefix)).count()
    }
}

fn write_entry<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    path: &str,
    contents: &[u8],
    options: SimpleFileOptions,
) -> std::io::Result<()> {
    zip.start_file(path, options).map_err(std::io::Error::other)?;
    zip.write_all(contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Compression;

    fn zip_with_entries(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, contents) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(contents).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_file_operations() {
        let mut index = FileIndex::new();

        index.insert("test.xml", b"<root/>".to_vec());
        assert!(index.contains("test.xml"));
        assert_eq!(index.get_string("test.xml"), Some("<root/>".to_string()));

        index.remove("test.xml");
        assert!(!index.contains("test.xml"));
        assert!(index.is_empty());
    }

    #[test]
    fn test_insert_normalizes_separators() {
        let mut index = FileIndex::new();
        index.insert("word\\media\\image1.png", vec![1, 2, 3]);
        assert!(index.contains("word/media/image1.png"));
    }

    #[test]
    fn test_read_normalizes_backslash_names() {
        let bytes = zip_with_entries(&[("word\\media\\image1.png", b"png")]);
        let index = FileIndex::read_from_zip(&bytes).unwrap();

        assert_eq!(index.get("word/media/image1.png"), Some(&b"png"[..]));
        assert!(!index.contains("word\\media\\image1.png"));
    }

    #[test]
    fn test_read_skips_directories() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        zip.add_directory("word/", options).unwrap();
        zip.start_file("word/document.xml", options).unwrap();
        zip.write_all(b"<doc/>").unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let index = FileIndex::read_from_zip(&bytes).unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.contains("word/document.xml"));
    }

    #[test]
    fn test_entry_larger_than_prealloc_reads_fully() {
        let big = vec![b'x'; MAX_PREALLOC * 3 + 17];
        let bytes = zip_with_entries(&[("word/media/big.bin", big.as_slice())]);
        let index = FileIndex::read_from_zip(&bytes).unwrap();

        assert_eq!(index.get("word/media/big.bin").map(<[u8]>::len), Some(big.len()));
    }

    #[test]
    fn test_corrupt_archive() {
        let err = FileIndex::read_from_zip(b"definitely not a zip").unwrap_err();
        assert!(matches!(err, OoxmlError::CorruptArchive(_)));
    }

    #[test]
    fn test_roundtrip() {
        let mut index = FileIndex::new();
        index.insert("[Content_Types].xml", b"<Types/>".to_vec());
        index.insert("word/document.xml", b"<w:document/>".to_vec());
        index.insert("word/media/image1.png", vec![0x89, 0x50, 0x4e, 0x47]);

        let bytes = index.write_to_zip(&PackageOptions::default()).unwrap();
        let restored = FileIndex::read_from_zip(&bytes).unwrap();

        assert_eq!(restored, index);
    }

    #[test]
    fn test_deterministic_output_regardless_of_insertion_order() {
        let mut first = FileIndex::new();
        first.insert("b.xml", b"b".to_vec());
        first.insert("a.xml", b"a".to_vec());
        first.insert("c/d.xml", b"d".to_vec());

        let mut second = FileIndex::new();
        second.insert("c/d.xml", b"d".to_vec());
        second.insert("a.xml", b"a".to_vec());
        second.insert("b.xml", b"b".to_vec());

        let options = PackageOptions::default();
        assert_eq!(
            first.write_to_zip(&options).unwrap(),
            second.write_to_zip(&options).unwrap()
        );
    }

    #[test]
    fn test_entries_written_in_sorted_order() {
        let mut index = FileIndex::new();
        index.insert("word/document.xml", b"doc".to_vec());
        index.insert("[Content_Types].xml", b"ct".to_vec());
        index.insert("_rels/.rels", b"rels".to_vec());

        let bytes = index.write_to_zip(&PackageOptions::default()).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();

        assert_eq!(
            names,
            vec!["[Content_Types].xml", "_rels/.rels", "word/document.xml"]
        );
    }

    #[test]
    fn test_stored_compression() {
        let mut index = FileIndex::new();
        index.insert("a.xml", b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_vec());

        let options = PackageOptions::default().with_compression(Compression::Stored);
        let bytes = index.write_to_zip(&options).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let entry = archive.by_name("a.xml").unwrap();

        assert_eq!(entry.compression(), zip::CompressionMethod::Stored);
    }

    #[test]
    fn test_count_with_prefix() {
        let mut index = FileIndex::new();
        index.insert("word/media/image1.png", vec![]);
        index.insert("word/media/image2.jpeg", vec![]);
        index.insert("word/document.xml", vec![]);

        assert_eq!(index.count_with_prefix("word/media/"), 2);
    }
}
