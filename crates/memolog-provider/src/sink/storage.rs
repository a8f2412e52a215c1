use std::io::Write;

use serde_json::{Map, Value};

use memolog_core::{MemologError, Result};

use super::{StorageRecord, StorageSink};

/// Storage sink writing one JSON object per record: `{"query": .., "params": {..}}`.
pub struct JsonLinesStorage<W> {
    out: W,
}

impl<W: Write> JsonLinesStorage<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> StorageSink for JsonLinesStorage<W> {
    fn write_storage(&mut self, query: &str, record: &StorageRecord) -> Result<()> {
        let mut line = Map::new();
        line.insert("query".into(), Value::from(query));
        line.insert("params".into(), Value::Object(record.params()));
        serde_json::to_writer(&mut self.out, &line)
            .map_err(|e| MemologError::Sink(format!("encode record failed: {e}")))?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventId;
    use memolog_core::Level;
    use time::OffsetDateTime;

    #[test]
    fn writes_one_object_per_line() {
        let record = StorageRecord {
            level: Level::Error,
            event_id: EventId::new(2),
            category: "db".into(),
            message: "boom".into(),
            timestamp: OffsetDateTime::UNIX_EPOCH,
            exception: Some("stack".into()),
            fields: Map::new(),
        };
        let mut storage = JsonLinesStorage::new(Vec::new());
        storage.write_storage("insert into logs", &record).unwrap();
        storage.write_storage("insert into logs", &record).unwrap();

        let out = String::from_utf8(storage.into_inner()).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["query"], "insert into logs");
        assert_eq!(parsed["params"]["log_exception"], "stack");
        assert_eq!(parsed["params"]["log_level"], "Error");
    }
}
