//! The steps of one run: fetch, normalise, render, splice, publish.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{info, warn};

use crate::{
    cli::EmptyPolicy,
    error::SyncError,
    normalize::normalize,
    publish::{Git, Published},
    record::Publication,
    render::render_region,
    report,
    source::Provider,
    splice::{Markers, Outcome, update_file},
};

/// Fetch and normalise. A failed fetch is reported and yields an empty list rather than an
/// error; what an empty list means is up to [`apply_empty_policy`].
pub fn fetch_publications(provider: &dyn Provider, limit: usize) -> Vec<Publication> {
    let raw = match provider.fetch() {
        Ok(raw) => raw,
        Err(source) => {
            let err = SyncError::FetchFailed {
                provider: provider.describe(),
                source,
            };
            warn!(error = %err, "fetch failed, continuing with no records");
            report::error(&anyhow::Error::from(err));
            Vec::new()
        }
    };
    info!(records = raw.len(), "fetched raw records");
    normalize(raw, limit)
}

/// `Ok(None)` means stop here without touching the page.
pub fn apply_empty_policy(
    publications: Vec<Publication>,
    policy: EmptyPolicy,
) -> Result<Option<Vec<Publication>>, SyncError> {
    if !publications.is_empty() {
        return Ok(Some(publications));
    }
    match policy {
        EmptyPolicy::Fail => Err(SyncError::NoPublications),
        EmptyPolicy::Skip => Ok(None),
        EmptyPolicy::Clear => Ok(Some(publications)),
    }
}

pub fn update_page(
    publications: &[Publication],
    file: &Path,
    markers: &Markers,
    now: NaiveDateTime,
) -> Result<Outcome, SyncError> {
    let region = render_region(publications, markers, now);
    update_file(file, &region, markers)
}

/// Commit and push `file` from the repository it lives in.
pub fn publish_page(file: &Path, today: NaiveDate) -> Result<Published, SyncError> {
    let (workdir, name) = split_path(file);
    Git::new(workdir).publish(&name, today)
}

fn split_path(file: &Path) -> (PathBuf, PathBuf) {
    let workdir = match file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name = file
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| file.to_path_buf());
    (workdir, name)
}
