use std::{fs, path::PathBuf, str::FromStr};

use clap::{Args, Parser, Subcommand, ValueEnum, builder::NonEmptyStringValueParser};

use crate::{
    error::SyncError,
    record::MAX_PUBLICATIONS,
    splice::{DEFAULT_END_MARKER, DEFAULT_START_MARKER, Markers},
};

#[derive(Parser, Debug)]
#[command(version, about = "Keep the publications section of a webpage in sync with Google Scholar", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch the publications and rewrite the marked region of the page
    Update {
        #[command(flatten)]
        fetch: FetchArgs,

        /// Page to update
        #[arg(short, long, default_value = "academia.html")]
        file: PathBuf,

        #[command(flatten)]
        markers: MarkerArgs,

        /// Stage, commit and push the page with git afterwards
        #[arg(long)]
        push: bool,
    },
    /// Print the region that `update` would write, without touching any file
    Render {
        #[command(flatten)]
        fetch: FetchArgs,

        #[command(flatten)]
        markers: MarkerArgs,
    },
    /// List the publications that would end up on the page
    List {
        #[command(flatten)]
        fetch: FetchArgs,
    },
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Google Scholar user ID, or a JSON file of publication records
    #[arg(value_name = "SRC", env = "SCHOLAR_ID")]
    pub from: Option<Source>,

    /// How many publications to keep (at most 10)
    #[arg(long, default_value_t = MAX_PUBLICATIONS, value_parser = parse_limit)]
    pub limit: usize,

    /// What to do when no publications come back
    #[arg(long, value_enum, default_value_t = EmptyPolicy::Fail)]
    pub on_empty: EmptyPolicy,
}

#[derive(Args, Debug)]
pub struct MarkerArgs {
    /// Literal text opening the publications region
    #[arg(long, default_value = DEFAULT_START_MARKER, value_parser = NonEmptyStringValueParser::new())]
    pub start_marker: String,

    /// Literal text closing the publications region
    #[arg(long, default_value = DEFAULT_END_MARKER, value_parser = NonEmptyStringValueParser::new())]
    pub end_marker: String,
}

impl MarkerArgs {
    pub fn markers(&self) -> Result<Markers, SyncError> {
        let markers = Markers::new(self.start_marker.clone(), self.end_marker.clone());
        markers.validate()?;
        Ok(markers)
    }
}

/// How an empty publication list is treated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum EmptyPolicy {
    /// Report an error and leave the page alone
    Fail,
    /// Leave the page alone and exit successfully
    Skip,
    /// Write an empty list into the region
    Clear,
}

fn parse_limit(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    if (1..=MAX_PUBLICATIONS).contains(&n) {
        Ok(n)
    } else {
        Err(format!("must be between 1 and {MAX_PUBLICATIONS}"))
    }
}

#[derive(Clone, Debug)]
/// Defines where we can get publication records from, which can either be
///
/// - a Google Scholar user ID, or
/// - a JSON file of records exported earlier.
pub enum Source {
    Identifier(String),
    File(PathBuf),
}

impl FromStr for Source {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Scholar IDs never name an existing path, so anything that resolves is a file.
        if let Ok(path) = fs::canonicalize(s) {
            Ok(Source::File(path))
        }
        // Looks like a path but isn't there; let the JSON reader report it.
        else if looks_like_path(s) {
            Ok(Source::File(PathBuf::from(s)))
        }
        // No? Must be an identifier then!
        else {
            Ok(Source::Identifier(s.trim().to_string()))
        }
    }
}

/// Scholar IDs are 12 characters of `[A-Za-z0-9_-]`, so a separator or a dot never shows up in one.
fn looks_like_path(s: &str) -> bool {
    s.contains(['/', '\\', '.'])
}
