//! Human-facing status lines on stderr.

use owo_colors::OwoColorize;

use crate::{error::SyncError, record::Publication};

pub fn success(msg: impl std::fmt::Display) {
    eprintln!("{} {}", "✓".green().bold(), msg);
}

pub fn failure(msg: impl std::fmt::Display) {
    eprintln!("{} {}", "✗".red().bold(), msg);
}

pub fn note(msg: impl std::fmt::Display) {
    eprintln!("{} {}", "ℹ".blue().bold(), msg);
}

pub fn warning(msg: impl std::fmt::Display) {
    eprintln!("{} {}", "!".yellow().bold(), msg);
}

/// Print an error along with its hint and any underlying causes.
pub fn error(err: &anyhow::Error) {
    failure(format!("{} {err}", "error:".red().bold()));
    for cause in err.chain().skip(1) {
        eprintln!("    caused by: {cause}");
    }
    if let Some(hint) = err.downcast_ref::<SyncError>().and_then(SyncError::hint) {
        eprintln!("    {} {hint}", "hint:".cyan());
    }
}

/// `1. Title (Year)` lines, as a preview of what goes on the page.
pub fn listing(publications: &[Publication]) -> String {
    publications
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{}. {} ({})\n", i + 1, p.title, p.year))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Authors;

    #[test]
    fn listing_numbers_from_one() {
        let p = Publication {
            title: "Paper X".into(),
            authors: Authors::Text("A".into()),
            year: "2023".into(),
            venue: String::new(),
            citations: 0,
            url: String::new(),
            identity: "x".into(),
        };
        assert_eq!(listing(&[p.clone(), p]), "1. Paper X (2023)\n2. Paper X (2023)\n");
    }
}
