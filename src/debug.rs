use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Value of one field in a debug event line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Field<'a> {
    Str(&'a str),
    Int(u64),
    Num(f64),
    Bool(bool),
}

/// JSONL trace of planning and capture decisions, one object per line.
#[derive(Clone)]
pub(crate) struct DebugLogger {
    inner: Arc<Mutex<DebugState>>,
}

struct DebugState {
    writer: Box<dyn Write + Send>,
    counters: BTreeMap<String, u64>,
}

impl DebugLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::from_writer(BufWriter::new(file)))
    }

    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(DebugState {
                writer: Box::new(writer),
                counters: BTreeMap::new(),
            })),
        }
    }

    pub fn event(&self, kind: &str, fields: &[(&str, Field<'_>)]) {
        let mut line = format!("{{\"type\":\"{}\"", json_escape(kind));
        for (key, value) in fields {
            line.push_str(&format!(",\"{}\":", json_escape(key)));
            match value {
                Field::Str(s) => line.push_str(&format!("\"{}\"", json_escape(s))),
                Field::Int(v) => line.push_str(&v.to_string()),
                Field::Num(v) if v.is_finite() => line.push_str(&format!("{v:.4}")),
                Field::Num(_) => line.push_str("null"),
                Field::Bool(v) => line.push_str(if *v { "true" } else { "false" }),
            }
        }
        line.push('}');
        if let Ok(mut state) = self.inner.lock() {
            let _ = writeln!(state.writer, "{line}");
        }
    }

    pub fn increment(&self, key: &str, amount: u64) {
        if let Ok(mut state) = self.inner.lock() {
            let entry = state.counters.entry(key.to_string()).or_insert(0);
            *entry = entry.saturating_add(amount);
        }
    }

    /// Write the accumulated counters as one summary line and reset them.
    pub fn emit_summary(&self, context: &str) {
        if let Ok(mut state) = self.inner.lock() {
            let counters = std::mem::take(&mut state.counters);
            let counts = counters
                .iter()
                .map(|(key, value)| format!("\"{}\":{}", json_escape(key), value))
                .collect::<Vec<_>>()
                .join(",");
            let _ = writeln!(
                state.writer,
                "{{\"type\":\"debug.summary\",\"context\":\"{}\",\"counts\":{{{}}}}}",
                json_escape(context),
                counts
            );
        }
    }

    pub fn flush(&self) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = state.writer.flush();
        }
    }
}

pub(crate) fn json_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            _ => out.push(ch),
        }
    }
    out
}
