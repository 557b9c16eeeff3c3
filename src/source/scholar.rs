use anyhow::{Context, bail};
use indicatif::{ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Value, json};
use tracing::{debug, info};
use url::Url;

use crate::{record::RawRecord, source::Provider};

const PROFILE_URL: &str = "https://scholar.google.com/citations";
const PAGE_SIZE: usize = 100;
/// Hard stop in case the profile keeps handing out full pages.
const MAX_PAGES: usize = 20;

/// A public Google Scholar profile, scraped page by page.
pub struct Scholar {
    user_id: String,
}

impl Scholar {
    pub fn new(user_id: String) -> Self {
        Scholar { user_id }
    }

    fn page_url(&self, start: usize) -> anyhow::Result<Url> {
        let mut url = Url::parse(PROFILE_URL)?;
        url.query_pairs_mut()
            .append_pair("user", &self.user_id)
            .append_pair("hl", "en")
            .append_pair("cstart", &start.to_string())
            .append_pair("pagesize", &PAGE_SIZE.to_string());
        Ok(url)
    }
}

impl Provider for Scholar {
    fn describe(&self) -> String {
        format!("Google Scholar profile {}", self.user_id)
    }

    fn fetch(&self) -> anyhow::Result<Vec<RawRecord>> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(120));

        let mut records = Vec::new();
        for page in 0..MAX_PAGES {
            spinner.set_message(format!(
                "fetching page {} ({} publications so far)",
                page + 1,
                records.len()
            ));
            let url = self.page_url(page * PAGE_SIZE)?;
            let html = fetch(&url)?;
            let parsed = parse_profile_page(&html)
                .with_context(|| format!("unexpected page for Scholar ID {}", self.user_id))?;

            if page == 0
                && let Some(name) = &parsed.author
            {
                info!(author = %name, "found Scholar profile");
            }
            let count = parsed.records.len();
            debug!(page, count, "parsed profile page");
            records.extend(parsed.records);
            if count < PAGE_SIZE {
                break;
            }
        }
        spinner.finish_and_clear();
        Ok(records)
    }
}

fn fetch(url: &Url) -> anyhow::Result<String> {
    let cfg = ureq::Agent::config_builder()
        .timeout_connect(Some(std::time::Duration::from_secs(5)))
        .timeout_global(Some(std::time::Duration::from_secs(30)))
        .build();
    let agent = ureq::Agent::new_with_config(cfg);
    let body = agent
        .get(url.as_str())
        .header(
            "User-Agent",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.10 Safari/605.1.1",
        )
        .header("Accept-Language", "en")
        .call()
        .with_context(|| format!("failed request for URL {url}"))?
        .into_body()
        .read_to_string()
        .context("failed to read profile page body")?;
    Ok(body)
}

/// What one page of a profile listing yields.
#[derive(Debug)]
pub struct ProfilePage {
    pub author: Option<String>,
    pub records: Vec<RawRecord>,
}

static ROW_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<tr\b[^>]*class="gsc_a_tr"[^>]*>(.*?)</tr>"#).unwrap());
static TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)(<a\b[^>]*class="gsc_a_at"[^>]*>)(.*?)</a>"#).unwrap()
});
static HREF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());
static GRAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<div\b[^>]*class="gs_gray"[^>]*>(.*?)</div>"#).unwrap());
static OPH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<span\b[^>]*class="gs_oph"[^>]*>.*?</span>"#).unwrap());
static CITES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*class="gsc_a_ac[^"]*"[^>]*>(.*?)</a>"#).unwrap()
});
static YEAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<span\b[^>]*class="gsc_a_h[^"]*"[^>]*>(.*?)</span>"#).unwrap()
});
static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<div\b[^>]*id="gsc_prf_in"[^>]*>(.*?)</div>"#).unwrap());
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").unwrap());

/// Pull publication rows out of a profile listing page.
///
/// A page without a profile header and without rows is most likely a captcha or an unknown
/// user, and is an error rather than an empty list.
pub fn parse_profile_page(html: &str) -> anyhow::Result<ProfilePage> {
    let author = NAME_RE
        .captures(html)
        .map(|c| text_of(&c[1]))
        .filter(|n| !n.is_empty());

    let base = Url::parse(PROFILE_URL)?;
    let records: Vec<RawRecord> = ROW_RE
        .captures_iter(html)
        .map(|c| parse_row(&c[1], &base))
        .collect();

    if author.is_none() && records.is_empty() {
        bail!("no profile found (unknown ID, or the request was blocked)");
    }
    Ok(ProfilePage { author, records })
}

fn parse_row(row: &str, base: &Url) -> RawRecord {
    let mut record = RawRecord::new();

    if let Some(c) = TITLE_RE.captures(row) {
        record.insert("title".into(), json!(text_of(&c[2])));
        if let Some(href) = HREF_RE
            .captures(&c[1])
            .and_then(|h| h.get(1).or_else(|| h.get(2)))
            .map(|m| decode_entities(m.as_str()))
            && let Ok(url) = base.join(&href)
        {
            if let Some((_, id)) = url.query_pairs().find(|(k, _)| k == "citation_for_view") {
                record.insert("author_pub_id".into(), json!(id.into_owned()));
            }
            record.insert("pub_url".into(), json!(url.to_string()));
        }
    }

    let mut grays = GRAY_RE.captures_iter(row).map(|c| c.get(1).map_or("", |m| m.as_str()));
    if let Some(authors) = grays.next() {
        record.insert("author".into(), json!(text_of(authors)));
    }
    if let Some(venue) = grays.next() {
        // The trailing ", 2021" inside gs_oph duplicates the year column.
        let venue = text_of(&OPH_RE.replace_all(venue, ""));
        record.insert("venue".into(), json!(venue));
    }

    if let Some(c) = CITES_RE.captures(row) {
        // Counts come with thousands separators, e.g. "1,204".
        let digits: String = text_of(&c[1]).chars().filter(char::is_ascii_digit).collect();
        if let Ok(n) = digits.parse::<u64>() {
            record.insert("num_citations".into(), json!(n));
        }
    }
    if let Some(c) = YEAR_RE.captures(row) {
        record.insert("pub_year".into(), json!(text_of(&c[1])));
    }

    record.retain(|_, v| !matches!(v, Value::String(s) if s.is_empty()));
    record
}

/// Tags stripped, entities decoded, whitespace collapsed.
fn text_of(fragment: &str) -> String {
    normalize_ws(&decode_entities(&TAG_RE.replace_all(fragment, " ")))
}

fn decode_entities(s: &str) -> String {
    ENTITY_RE
        .replace_all(s, |c: &Captures| {
            let name = &c[1];
            let decoded = if let Some(hex) = name
                .strip_prefix("#x")
                .or_else(|| name.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match name {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    "hellip" => Some('…'),
                    _ => None,
                }
            };
            decoded.map_or_else(|| c[0].to_string(), |ch| ch.to_string())
        })
        .into_owned()
}

fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}
