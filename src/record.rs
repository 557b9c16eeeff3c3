use crate::normalize::parse_year;

/// One bibliographic entry as handed over by a provider, before normalisation.
///
/// Providers disagree on which keys they fill in, so this stays an untyped JSON object and every
/// access goes through [`crate::normalize::lookup`].
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

pub const NO_TITLE: &str = "No title";
pub const UNKNOWN_AUTHORS: &str = "Unknown authors";
pub const NO_DATE: &str = "n.d.";
pub const UNPUBLISHED: &str = "Unpublished";

/// Hard upper bound on how many publications end up on the page.
pub const MAX_PUBLICATIONS: usize = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Authors {
    List(Vec<String>),
    Text(String),
}

impl Authors {
    /// Single line of author names, lists joined with ", ".
    pub fn joined(&self) -> String {
        match self {
            Authors::List(names) => names.join(", "),
            Authors::Text(text) => text.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Publication {
    pub title: String,
    pub authors: Authors,
    /// Year exactly as the provider wrote it; shown verbatim on the page.
    pub year: String,
    pub venue: String,
    pub citations: u64,
    /// Empty when the provider gave no link.
    pub url: String,
    /// What two records must share to count as the same publication.
    pub identity: String,
}

impl Publication {
    /// Ordering key derived from [`Publication::year`]; 0 sorts last.
    pub fn sort_key(&self) -> u32 {
        parse_year(&self.year).value()
    }

    /// Whether the venue is worth printing at all.
    pub fn shows_venue(&self) -> bool {
        let venue = self.venue.trim();
        !venue.is_empty() && venue != UNPUBLISHED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publication(year: &str, venue: &str) -> Publication {
        Publication {
            title: "T".into(),
            authors: Authors::Text("A".into()),
            year: year.into(),
            venue: venue.into(),
            citations: 0,
            url: String::new(),
            identity: "t".into(),
        }
    }

    #[test]
    fn authors_join_lists_with_comma() {
        let a = Authors::List(vec!["A. One".into(), "B. Two".into()]);
        assert_eq!(a.joined(), "A. One, B. Two");
        assert_eq!(Authors::Text("X, Y".into()).joined(), "X, Y");
    }

    #[test]
    fn venue_visibility() {
        assert!(publication("2020", "Conf Y").shows_venue());
        assert!(!publication("2020", UNPUBLISHED).shows_venue());
        assert!(!publication("2020", "   ").shows_venue());
        assert!(!publication("2020", "").shows_venue());
    }

    #[test]
    fn sort_key_follows_year_text() {
        assert_eq!(publication("2021", "").sort_key(), 2021);
        assert_eq!(publication(NO_DATE, "").sort_key(), 0);
    }
}
