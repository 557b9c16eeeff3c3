use std::fmt::Write;

use chrono::NaiveDateTime;

use crate::{record::Publication, splice::Markers};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

/// HTML for a single entry of the list.
pub fn render_publication(publication: &Publication) -> String {
    let title = escape_text(&publication.title);
    let mut html = String::from("        <div class=\"publication-item\">\n");

    if publication.url.is_empty() {
        let _ = writeln!(html, "            <h3>{title}</h3>");
    } else {
        let _ = writeln!(
            html,
            "            <h3><a href=\"{}\" target=\"_blank\">{title}</a></h3>",
            escape_attr(&publication.url)
        );
    }

    let _ = writeln!(
        html,
        "            <p class=\"authors\">{}</p>",
        escape_text(&publication.authors.joined())
    );

    html.push_str("            <p class=\"venue-info\">");
    if publication.shows_venue() {
        let _ = write!(html, "{}, ", escape_text(&publication.venue));
    }
    html.push_str(&escape_text(&publication.year));
    if publication.citations > 0 {
        let _ = write!(
            html,
            " • <span class=\"citations\">{} citations</span>",
            publication.citations
        );
    }
    html.push_str("</p>\n");
    html.push_str("        </div>\n");
    html
}

/// The whole marker-delimited region, markers included, stamped with `updated_at`.
///
/// Nothing follows the end marker, so the caller's surrounding text stays as it was.
pub fn render_region(
    publications: &[Publication],
    markers: &Markers,
    updated_at: NaiveDateTime,
) -> String {
    let mut html = String::new();
    let _ = writeln!(html, "{}", markers.start);
    let _ = writeln!(
        html,
        "    <!-- Last updated: {} -->",
        updated_at.format(TIMESTAMP_FORMAT)
    );
    html.push_str("    <div class=\"publications-list\">\n");
    for publication in publications {
        html.push_str(&render_publication(publication));
    }
    html.push_str("    </div>\n");
    let _ = write!(html, "    {}", markers.end);
    html
}
