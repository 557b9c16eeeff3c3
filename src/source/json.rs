use std::{fs, path::PathBuf};

use anyhow::{Context, bail};
use serde_json::Value;
use tracing::warn;

use crate::{record::RawRecord, source::Provider};

/// Publication records exported to a JSON file.
///
/// Accepts either a bare array of objects or an object with a `publications` array. Keys follow
/// the Scholar export naming (`title`, `author`, `pub_year`, `venue`, `num_citations`, ...).
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: PathBuf) -> Self {
        JsonFile { path }
    }
}

impl Provider for JsonFile {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> anyhow::Result<Vec<RawRecord>> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        parse_records(&text).with_context(|| format!("in {}", self.path.display()))
    }
}

pub fn parse_records(text: &str) -> anyhow::Result<Vec<RawRecord>> {
    let value: Value = serde_json::from_str(text).context("invalid JSON")?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("publications") {
            Some(Value::Array(items)) => items,
            _ => bail!("expected an array of records or a `publications` array"),
        },
        _ => bail!("expected an array of records or a `publications` array"),
    };

    Ok(items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match item {
            Value::Object(record) => Some(record),
            other => {
                warn!(index = i, kind = %kind_of(&other), "skipping non-object record");
                None
            }
        })
        .collect())
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn bare_array_and_wrapped_object() {
        let a = parse_records(r#"[{"title": "A"}, 3, {"title": "B"}]"#).unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(a[1]["title"], "B");

        let b = parse_records(r#"{"publications": [{"title": "A"}]}"#).unwrap();
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn rejects_other_shapes() {
        assert!(parse_records(r#"{"title": "A"}"#).is_err());
        assert!(parse_records("42").is_err());
        assert!(parse_records("not json").is_err());
    }

    #[test]
    fn reads_from_disk() {
        let tmp = NamedTempFile::new().expect("tmp file");
        fs::write(tmp.path(), r#"[{"title": "On Disk"}]"#).unwrap();
        let records = JsonFile::new(tmp.path().to_path_buf()).fetch().unwrap();
        assert_eq!(records[0]["title"], "On Disk");
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = JsonFile::new("/definitely/not/here.json".into())
            .fetch()
            .unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
