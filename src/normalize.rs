use std::{cmp::Reverse, collections::HashSet, str::FromStr};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::record::{
    Authors, MAX_PUBLICATIONS, NO_DATE, NO_TITLE, Publication, RawRecord, UNKNOWN_AUTHORS,
    UNPUBLISHED,
};

/// Candidate keys for each field, highest priority first.
const TITLE_KEYS: &[&str] = &["title"];
const AUTHOR_KEYS: &[&str] = &["authors", "author"];
const YEAR_KEYS: &[&str] = &["pub_year", "year"];
const VENUE_KEYS: &[&str] = &["venue", "journal", "citation"];
const CITATION_KEYS: &[&str] = &["num_citations", "citations"];
const URL_KEYS: &[&str] = &["pub_url", "eprint_url"];
/// Identity sources in priority order, each with the namespace its values live in.
const IDENTITY_KEYS: &[(&str, &str)] = &[
    ("author_pub_id", "id"),
    ("pub_url", "url"),
    ("eprint_url", "url"),
];

/// Result of reading a number out of text we do not trust.
///
/// Parsing never fails: anything unreadable becomes `Fallback` carrying the caller's default.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lenient<T> {
    Parsed(T),
    Fallback(T),
}

impl<T> Lenient<T> {
    pub fn value(self) -> T {
        match self {
            Lenient::Parsed(v) | Lenient::Fallback(v) => v,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Lenient::Fallback(_))
    }
}

/// Parse `text` as an integer, or hand back `fallback`.
pub fn lenient_int<T: FromStr>(text: &str, fallback: T) -> Lenient<T> {
    match text.trim().parse::<T>() {
        Ok(v) => Lenient::Parsed(v),
        Err(_) => Lenient::Fallback(fallback),
    }
}

/// Turn a free-form year into a sort key.
///
/// The sentinel and blank text give 0. Otherwise the first 19xx/20xx run anywhere in the text
/// wins, then a plain integer parse is tried. Negative numbers and junk also give 0.
pub fn parse_year(text: &str) -> Lenient<u32> {
    static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:19|20)\d{2}").unwrap());

    let text = text.trim();
    if text.is_empty() || text == NO_DATE {
        return Lenient::Fallback(0);
    }
    if let Some(m) = YEAR_RE.find(text) {
        return lenient_int(m.as_str(), 0);
    }
    lenient_int(text, 0)
}

/// First value present under any of `keys`. Nulls and blank strings count as absent.
pub fn lookup<'a>(record: &'a RawRecord, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| match record.get(*k) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(v) => Some(v),
    })
}

/// Textual value under the first matching key. Numbers are rendered as text, anything else is
/// skipped.
pub fn lookup_text(record: &RawRecord, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match lookup(record, &[*k])? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Non-negative count under the first matching key. Accepts numbers and numeric strings.
pub fn lookup_count(record: &RawRecord, keys: &[&str]) -> Lenient<u64> {
    let Some(value) = lookup(record, keys) else {
        return Lenient::Fallback(0);
    };
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64))
            .map(Lenient::Parsed)
            .unwrap_or(Lenient::Fallback(0)),
        Value::String(s) => lenient_int(s, 0),
        _ => Lenient::Fallback(0),
    }
}

fn lookup_authors(record: &RawRecord) -> Authors {
    match lookup(record, AUTHOR_KEYS) {
        Some(Value::Array(items)) => {
            let names: Vec<String> = items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if names.is_empty() {
                Authors::Text(UNKNOWN_AUTHORS.to_string())
            } else {
                Authors::List(names)
            }
        }
        Some(Value::String(s)) => Authors::Text(s.trim().to_string()),
        _ => Authors::Text(UNKNOWN_AUTHORS.to_string()),
    }
}

fn fold_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Build a [`Publication`] out of whatever the provider handed us. `position` is the record's
/// index in the provider's list and only matters for records with no identity of their own.
pub fn from_raw(record: &RawRecord, position: usize) -> Publication {
    let title = lookup_text(record, TITLE_KEYS);
    let url = lookup_text(record, URL_KEYS).unwrap_or_default();
    let identity = IDENTITY_KEYS
        .iter()
        .find_map(|(key, ns)| lookup_text(record, &[*key]).map(|v| format!("{ns}:{v}")))
        .or_else(|| title.as_deref().map(|t| format!("title:{}", fold_title(t))))
        .unwrap_or_else(|| format!("pos:{position}"));

    let citations = lookup_count(record, CITATION_KEYS);
    if citations.is_fallback() && lookup(record, CITATION_KEYS).is_some() {
        debug!(identity = %identity, "unreadable citation count, using 0");
    }

    Publication {
        title: title.unwrap_or_else(|| NO_TITLE.to_string()),
        authors: lookup_authors(record),
        year: lookup_text(record, YEAR_KEYS).unwrap_or_else(|| NO_DATE.to_string()),
        venue: lookup_text(record, VENUE_KEYS).unwrap_or_else(|| UNPUBLISHED.to_string()),
        citations: citations.value(),
        url,
        identity,
    }
}

/// Dedup, order newest first and cap the list.
///
/// The sort is stable: records sharing a year keep the order the provider returned them in, which
/// is usually its own relevance ranking. `limit` is clamped to [`MAX_PUBLICATIONS`].
pub fn normalize(records: Vec<RawRecord>, limit: usize) -> Vec<Publication> {
    let mut seen = HashSet::new();
    let mut publications: Vec<Publication> = records
        .iter()
        .enumerate()
        .map(|(i, r)| from_raw(r, i))
        .filter(|p| {
            let fresh = seen.insert(p.identity.clone());
            if !fresh {
                debug!(identity = %p.identity, title = %p.title, "dropping duplicate record");
            }
            fresh
        })
        .collect();

    publications.sort_by_key(|p| Reverse(p.sort_key()));
    publications.truncate(limit.min(MAX_PUBLICATIONS));
    publications
}
