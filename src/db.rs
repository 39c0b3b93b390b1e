use crate::form::{FormState, Record};
use anyhow::{anyhow, Context};
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, error};

/// Session-scoped key-value store for page records. Backed by an in-memory
/// SQLite database, so it lives exactly as long as the daemon process.
///
/// The form-level operations (`save`, `load`, `load_raw`) never fail: storage
/// and decode errors are logged and replaced by a safe default.
pub struct SessionStore {
    conn: Connection,
}

impl SessionStore {
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS session_records(
                key TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                saved_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self { conn })
    }

    /// Snapshots every field of `form` under `key`, replacing what was there.
    pub fn save(&self, key: &str, form: &FormState) -> bool {
        self.put_record(key, &form.snapshot())
    }

    pub fn put_record(&self, key: &str, record: &Record) -> bool {
        let result = serde_json::to_string(record)
            .context("failed to encode record")
            .and_then(|text| self.put_text(key, &text));
        match result {
            Ok(()) => {
                debug!(key, fields = record.len(), "session record saved");
                true
            }
            Err(e) => {
                error!(key, "session save failed: {e:#}");
                false
            }
        }
    }

    /// Stores `text` verbatim. Nothing checks that it decodes.
    pub fn put_text(&self, key: &str, text: &str) -> anyhow::Result<()> {
        let saved_at = chrono::Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO session_records(key, payload, saved_at)
             VALUES(?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET
               payload = excluded.payload,
               saved_at = excluded.saved_at",
            (key, text, &saved_at),
        )?;
        Ok(())
    }

    /// Restores the record under `key` into `form` and returns the raw
    /// record. Keys matching no field are skipped.
    pub fn load(&self, key: &str, form: &mut FormState) -> Record {
        let record = self.load_raw(key);
        let applied = form.apply(&record);
        debug!(key, applied, stored = record.len(), "session record loaded");
        record
    }

    pub fn load_raw(&self, key: &str) -> Record {
        match self.read(key) {
            Ok(Some(record)) => record,
            Ok(None) => Record::new(),
            Err(e) => {
                error!(key, "session load failed: {e:#}");
                Record::new()
            }
        }
    }

    fn read(&self, key: &str) -> anyhow::Result<Option<Record>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM session_records WHERE key = ?",
                [key],
                |r| r.get(0),
            )
            .optional()?;
        payload.map(|text| decode_record(&text)).transpose()
    }

    pub fn keys(&self) -> anyhow::Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM session_records ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    pub fn clear(&self) -> anyhow::Result<usize> {
        Ok(self.conn.execute("DELETE FROM session_records", [])?)
    }
}

/// Decodes a stored payload into a flat string map. Scalars other than
/// strings are rendered as text and nulls are dropped; anything that is not
/// a flat JSON object is rejected.
pub fn decode_record(text: &str) -> anyhow::Result<Record> {
    let value: serde_json::Value =
        serde_json::from_str(text).context("stored payload is not JSON")?;
    let serde_json::Value::Object(map) = value else {
        return Err(anyhow!("stored payload is not a JSON object"));
    };

    let mut record = Record::new();
    for (k, v) in map {
        let text = match v {
            serde_json::Value::Null => continue,
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => crate::calc::format_number(f),
                None => n.to_string(),
            },
            serde_json::Value::Bool(b) => b.to_string(),
            other => return Err(anyhow!("field {k} is not a scalar: {other}")),
        };
        record.insert(k, text);
    }
    Ok(record)
}
