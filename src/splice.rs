use std::{
    fs,
    io::{self, Write},
    path::Path,
};

use regex::{NoExpand, Regex};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::SyncError;

pub const DEFAULT_START_MARKER: &str = "<!-- PUBLICATIONS_START -->";
pub const DEFAULT_END_MARKER: &str = "<!-- PUBLICATIONS_END -->";

/// The pair of literal strings delimiting the region we own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Markers {
    pub start: String,
    pub end: String,
}

impl Default for Markers {
    fn default() -> Self {
        Markers::new(DEFAULT_START_MARKER, DEFAULT_END_MARKER)
    }
}

impl Markers {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Markers {
            start: start.into(),
            end: end.into(),
        }
    }

    /// `start`, anything (newlines included, as little as possible), then `end`.
    fn pattern(&self) -> Regex {
        let pattern = format!(
            "(?s){}.*?{}",
            regex::escape(&self.start),
            regex::escape(&self.end)
        );
        // Both halves are escaped literals, so this always compiles.
        Regex::new(&pattern).expect("escaped marker pattern")
    }

    /// Both markers must be non-empty and distinct, or the region they delimit is not
    /// well defined.
    pub fn validate(&self) -> Result<(), SyncError> {
        let reason = if self.start.is_empty() || self.end.is_empty() {
            "markers must not be empty"
        } else if self.start == self.end {
            "start and end markers must differ"
        } else {
            return Ok(());
        };
        Err(SyncError::InvalidMarkers {
            reason: reason.to_string(),
        })
    }

    /// The first marker that does not occur in `document`, if any.
    fn missing_from<'a>(&'a self, document: &str) -> Option<&'a str> {
        [&self.start, &self.end]
            .into_iter()
            .find(|m| !document.contains(m.as_str()))
            .map(String::as_str)
    }
}

/// What [`update_file`] did to the document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Updated,
    /// The new region was byte-identical to the old one; nothing was written.
    Unchanged,
}

/// Replace the first marker-delimited region of `document` with `region`.
///
/// `region` is inserted literally and is expected to carry both markers itself. Only the first
/// pair is touched even if the document has several. An end marker that only occurs before the
/// start marker counts as missing.
pub fn splice(document: &str, region: &str, markers: &Markers) -> Result<String, SyncError> {
    markers.validate()?;
    if let Some(missing) = markers.missing_from(document) {
        return Err(SyncError::MarkersNotFound {
            path: Default::default(),
            missing: missing.to_string(),
        });
    }
    let pattern = markers.pattern();
    if !pattern.is_match(document) {
        return Err(SyncError::MarkersNotFound {
            path: Default::default(),
            missing: format!("{} after {}", markers.end, markers.start),
        });
    }
    Ok(pattern.replacen(document, 1, NoExpand(region)).into_owned())
}

/// The current region of `document`, markers included.
pub fn extract_region<'a>(document: &'a str, markers: &Markers) -> Option<&'a str> {
    markers.pattern().find(document).map(|m| m.as_str())
}

/// Read `path`, splice `region` in and write it back.
///
/// The new text goes to a temporary file next to `path` which then replaces it, so a failed
/// write leaves the original document intact. When the markers are missing the file is not
/// touched at all.
pub fn update_file(path: &Path, region: &str, markers: &Markers) -> Result<Outcome, SyncError> {
    let document = fs::read_to_string(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => SyncError::DocumentNotFound {
            path: path.to_path_buf(),
        },
        _ => SyncError::ReadFailed {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let updated = splice(&document, region, markers).map_err(|e| match e {
        SyncError::MarkersNotFound { missing, .. } => SyncError::MarkersNotFound {
            path: path.to_path_buf(),
            missing,
        },
        other => other,
    })?;

    debug!(
        path = %path.display(),
        old_len = extract_region(&document, markers).map_or(0, str::len),
        new_len = region.len(),
        "splicing region"
    );
    if updated == document {
        debug!(path = %path.display(), "region already up to date");
        return Ok(Outcome::Unchanged);
    }

    write_atomic(path, &updated).map_err(|source| SyncError::WriteFailed {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), bytes = updated.len(), "document updated");
    Ok(Outcome::Updated)
}

/// Replace the file `path` resolves to, so a symlinked page stays a symlink.
fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let target = fs::canonicalize(path)?;
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let metadata = fs::metadata(&target)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    fs::set_permissions(tmp.path(), metadata.permissions())?;
    keep_owner(tmp.path(), &metadata);
    tmp.persist(&target).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(unix)]
fn keep_owner(tmp: &Path, original: &fs::Metadata) {
    use std::os::unix::fs::{MetadataExt, chown};

    // Only root may hand a file to another user; anyone else keeps their own ownership.
    if let Err(e) = chown(tmp, Some(original.uid()), Some(original.gid())) {
        debug!(error = %e, "could not carry over file owner");
    }
}

#[cfg(not(unix))]
fn keep_owner(_tmp: &Path, _original: &fs::Metadata) {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PAGE: &str = "<html>\n<body>\n  <h2>Publications</h2>\n  <!-- PUBLICATIONS_START -->\n  <p>old</p>\n  <!-- PUBLICATIONS_END -->\n  <footer>$1 &copy;</footer>\n</body>\n</html>\n";

    fn region(body: &str) -> String {
        format!("{DEFAULT_START_MARKER}\n{body}\n    {DEFAULT_END_MARKER}")
    }

    fn page_in(dir: &TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("academia.html");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn replaces_only_the_region() {
        let out = splice(PAGE, &region("new"), &Markers::default()).unwrap();
        assert!(out.starts_with("<html>\n<body>\n  <h2>Publications</h2>\n  <!-- PUBLICATIONS_START -->\nnew\n    <!-- PUBLICATIONS_END -->"));
        assert!(out.ends_with("\n  <footer>$1 &copy;</footer>\n</body>\n</html>\n"));
        assert!(!out.contains("old"));
    }

    #[test]
    fn dollar_signs_in_region_are_literal() {
        let out = splice(PAGE, &region("costs $5 or ${x}"), &Markers::default()).unwrap();
        assert!(out.contains("costs $5 or ${x}"));
    }

    #[test]
    fn only_first_pair_is_replaced() {
        let doc = format!("{}\n{}", region("a"), region("b"));
        let out = splice(&doc, &region("z"), &Markers::default()).unwrap();
        assert_eq!(out, format!("{}\n{}", region("z"), region("b")));
    }

    #[test]
    fn missing_markers_are_reported() {
        let markers = Markers::default();
        let no_end = PAGE.replace(DEFAULT_END_MARKER, "");
        match splice(&no_end, &region("x"), &markers) {
            Err(SyncError::MarkersNotFound { missing, .. }) => assert_eq!(missing, DEFAULT_END_MARKER),
            other => panic!("unexpected {other:?}"),
        }
        let no_start = PAGE.replace(DEFAULT_START_MARKER, "");
        match splice(&no_start, &region("x"), &markers) {
            Err(SyncError::MarkersNotFound { missing, .. }) => {
                assert_eq!(missing, DEFAULT_START_MARKER)
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn end_before_start_is_reported() {
        let doc = format!("<p>x</p>\n{DEFAULT_END_MARKER}\n<p>y</p>\n{DEFAULT_START_MARKER}\n");
        match splice(&doc, &region("x"), &Markers::default()) {
            Err(SyncError::MarkersNotFound { missing, .. }) => assert_eq!(
                missing,
                format!("{DEFAULT_END_MARKER} after {DEFAULT_START_MARKER}")
            ),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_or_equal_markers_are_refused() {
        let doc = format!("<head>KEEP</head>\n{DEFAULT_END_MARKER}\ntail");
        let new_region = format!("NEW{DEFAULT_END_MARKER}");
        for markers in [
            Markers::new("", DEFAULT_END_MARKER),
            Markers::new(DEFAULT_START_MARKER, ""),
            Markers::new(DEFAULT_END_MARKER, DEFAULT_END_MARKER),
        ] {
            assert!(matches!(
                splice(&doc, &new_region, &markers),
                Err(SyncError::InvalidMarkers { .. })
            ));
        }
        assert!(Markers::default().validate().is_ok());
    }

    #[test]
    fn splicing_twice_is_idempotent() {
        proptest::proptest!(|(before in "[a-z <>\n]{0,40}", old in "[a-z <>\n]{0,40}", after in "[a-z <>\n]{0,40}", body in "[a-z$ <>\n]{0,60}")| {
            let markers = Markers::default();
            let doc = format!("{before}{DEFAULT_START_MARKER}{old}{DEFAULT_END_MARKER}{after}");
            let new_region = region(&body);
            let once = splice(&doc, &new_region, &markers).unwrap();
            let twice = splice(&once, &new_region, &markers).unwrap();
            proptest::prop_assert_eq!(&once, &twice);
            proptest::prop_assert_eq!(extract_region(&once, &markers), Some(new_region.as_str()));
            proptest::prop_assert!(once.starts_with(&before));
            proptest::prop_assert!(once.ends_with(&after));
        })
    }

    #[test]
    fn update_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = page_in(&dir, PAGE);
        let markers = Markers::default();
        let new_region = region("fresh");

        assert_eq!(update_file(&path, &new_region, &markers).unwrap(), Outcome::Updated);
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(extract_region(&written, &markers), Some(new_region.as_str()));
        assert!(written.starts_with("<html>\n<body>\n  <h2>Publications</h2>\n  "));
        assert!(written.ends_with("\n  <footer>$1 &copy;</footer>\n</body>\n</html>\n"));

        assert_eq!(update_file(&path, &new_region, &markers).unwrap(), Outcome::Unchanged);
        assert_eq!(fs::read_to_string(&path).unwrap(), written);
    }

    #[test]
    fn update_file_leaves_markerless_document_alone() {
        let dir = TempDir::new().unwrap();
        let original = "<html><body>no markers here</body></html>";
        let path = page_in(&dir, original);
        let err = update_file(&path, &region("x"), &Markers::default()).unwrap_err();
        match err {
            SyncError::MarkersNotFound { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(fs::read(&path).unwrap(), original.as_bytes());
    }

    #[test]
    fn update_file_leaves_misordered_document_alone() {
        let dir = TempDir::new().unwrap();
        let original =
            format!("<p>x</p>\n{DEFAULT_END_MARKER}\n<p>y</p>\n{DEFAULT_START_MARKER}\n");
        let path = page_in(&dir, &original);
        assert!(matches!(
            update_file(&path, &region("x"), &Markers::default()),
            Err(SyncError::MarkersNotFound { .. })
        ));
        assert_eq!(fs::read(&path).unwrap(), original.as_bytes());
    }

    #[cfg(unix)]
    #[test]
    fn update_file_writes_through_symlink() {
        let dir = TempDir::new().unwrap();
        let real = page_in(&dir, PAGE);
        let link = dir.path().join("index.html");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        assert_eq!(
            update_file(&link, &region("fresh"), &Markers::default()).unwrap(),
            Outcome::Updated
        );
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert!(fs::read_to_string(&real).unwrap().contains("\nfresh\n"));
    }

    #[test]
    fn update_file_reports_missing_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.html");
        assert!(matches!(
            update_file(&path, &region("x"), &Markers::default()),
            Err(SyncError::DocumentNotFound { .. })
        ));
        assert!(!path.exists());
    }

    #[test]
    fn custom_markers() {
        let markers = Markers::new("[[", "]]");
        let out = splice("a [[ b ]] c", "[[X]]", &markers).unwrap();
        assert_eq!(out, "a [[X]] c");
    }
}
