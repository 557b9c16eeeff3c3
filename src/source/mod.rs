use crate::{cli::Source, record::RawRecord};

pub mod json;
pub mod scholar;

/// Somewhere a researcher's publication list can be pulled from.
pub trait Provider {
    /// Short human-readable description, used in messages.
    fn describe(&self) -> String;
    /// Every record the provider knows about, in the provider's own order.
    fn fetch(&self) -> anyhow::Result<Vec<RawRecord>>;
}

/// Pick the provider for a command-line source.
pub fn open(source: &Source) -> Box<dyn Provider> {
    match source {
        Source::Identifier(id) => Box::new(scholar::Scholar::new(id.clone())),
        Source::File(path) => Box::new(json::JsonFile::new(path.clone())),
    }
}
