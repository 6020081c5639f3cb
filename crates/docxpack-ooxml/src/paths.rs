//! Part name helpers
//!
//! Part names inside the file index are relative (`word/document.xml`),
//! forward-slash separated, and never start with `/`. Content type overrides
//! use the absolute form (`/word/document.xml`).

/// Well-known path of the content types part
pub const CONTENT_TYPES_PATH: &str = "[Content_Types].xml";

/// Name of the media directory next to the main document part
pub const MEDIA_DIR: &str = "media";

/// Normalize an archive entry name: backslashes become forward slashes
pub fn normalize_entry_name(name: &str) -> String {
    name.replace('\\', "/")
}

/// Path of the relationships part belonging to `part`
///
/// A part at `D/F` keeps its relationships at `D/_rels/F.rels`; the package
/// root (empty part name) maps to `_rels/.rels`.
pub fn rels_path_for(part: &str) -> String {
    let part = part.trim_start_matches('/');
    let (dir, file) = split_part(part);
    if dir.is_empty() {
        format!("_rels/{}.rels", file)
    } else {
        format!("{}/_rels/{}.rels", dir, file)
    }
}

/// Directory portion of a part name (`word` for `word/document.xml`)
pub fn part_dir(part: &str) -> &str {
    split_part(part.trim_start_matches('/')).0
}

/// File name portion of a part name
pub fn part_file_name(part: &str) -> &str {
    split_part(part.trim_start_matches('/')).1
}

/// Lower-cased extension of a part name, without the dot
pub fn part_extension(part: &str) -> Option<String> {
    let file = part_file_name(part);
    match file.rfind('.') {
        Some(pos) if pos + 1 < file.len() => Some(file[pos + 1..].to_ascii_lowercase()),
        _ => None,
    }
}

/// Absolute part name as used by content type overrides
pub fn absolute_part_name(part: &str) -> String {
    format!("/{}", part.trim_start_matches('/'))
}

/// Resolve a relationship target against the part that owns the relationship
///
/// `source_part` is the owning part (empty for the package root). Targets
/// starting with `/` are package-absolute. `.` and `..` segments are folded.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    let target = normalize_entry_name(target);
    let joined = if let Some(absolute) = target.strip_prefix('/') {
        absolute.to_string()
    } else {
        let base = part_dir(source_part);
        if base.is_empty() {
            target
        } else {
            format!("{}/{}", base, target)
        }
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

fn split_part(part: &str) -> (&str, &str) {
    match part.rfind('/') {
        Some(pos) => (&part[..pos], &part[pos + 1..]),
        None => ("", part),
    }
}
