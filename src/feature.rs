//! The search-fs feature: run one guarded search and publish every hit.

use std::io::Write;

use chrono::{SecondsFormat, Utc};
use tracing::info;

use crate::error::{Error, IoResultExt, Result};
use crate::search::FileSearch;
use crate::storage::Managers;
use crate::types::{SearchRecord, SearchRequest};

/// Receives published search records.
pub trait RecordSink {
    fn send(&mut self, record: &SearchRecord) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl RecordSink for Vec<SearchRecord> {
    fn send(&mut self, record: &SearchRecord) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

/// Writes one JSON object per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    fn send(&mut self, record: &SearchRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)
            .map_err(|e| Error::io("<sink>", e.into()))?;
        self.writer.write_all(b"\n").with_path("<sink>")
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().with_path("<sink>")
    }
}

/// Searches `request.root` and sends one record per file to `sink`.
///
/// Returns the number of published records. A limit breach or I/O failure
/// aborts the run; records sent before that stay published.
pub fn run_search(managers: &Managers, request: &SearchRequest, sink: &mut dyn RecordSink) -> Result<usize> {
    let location = request.root.location;
    let manager = managers.get(&location).ok_or(Error::UnsupportedBackend(location))?;

    info!("Starting search '{}' in {}/{}", request.label, location, request.root.path);
    let options = request.options.clone().unwrap_or_default();
    let search = FileSearch::new(manager.as_ref(), request.root.path.as_str()).options(&options);

    let mut published = 0;
    for hit in search.iter() {
        let hit = hit?;
        let record = SearchRecord {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            path: hit.path,
            filename: hit.filename,
        };
        sink.send(&record)?;
        published += 1;
    }
    sink.flush()?;

    info!("Search '{}' published {} records", request.label, published);
    Ok(published)
}
