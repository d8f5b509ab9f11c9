//! Structured records and their single-line JSON rendering

use std::panic::Location;

use chrono::NaiveDateTime;
use serde_json::Value;

use super::level::LogLevel;

/// Timestamp format with millisecond precision
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Key of the field carrying the category label
pub const MODULE_KEY: &str = "module";

/// A caller-supplied key/value pair
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    key: String,
    value: Value,
}

impl Field {
    /// Create a field from anything convertible to a JSON value
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// Shorthand for [`Field::new`]
pub fn field(key: impl Into<String>, value: impl Into<Value>) -> Field {
    Field::new(key, value)
}

/// One log event, borrowed from the emitting call
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    pub time: NaiveDateTime,
    pub level: LogLevel,
    /// Stream name the record is routed to
    pub logger: &'a str,
    pub caller: &'a Caller,
    pub message: &'a str,
    pub fields: &'a [Field],
    /// Category label, written last as `module`
    pub module: &'a str,
}

impl Record<'_> {
    /// Render as one newline-terminated JSON object
    ///
    /// Keys come out in a fixed order: time, level, logger, caller, message,
    /// the caller's fields as given, then module. Repeated keys are kept.
    pub fn render(&self) -> String {
        let mut line = String::with_capacity(160);
        line.push('{');
        push_entry(
            &mut line,
            "time",
            &Value::from(self.time.format(TIME_FORMAT).to_string()),
        );
        push_entry(&mut line, "level", &Value::from(self.level.as_str()));
        push_entry(&mut line, "logger", &Value::from(self.logger));
        push_entry(&mut line, "caller", &Value::from(self.caller.short()));
        push_entry(&mut line, "message", &Value::from(self.message));
        for field in self.fields {
            push_entry(&mut line, &field.key, &field.value);
        }
        push_entry(&mut line, MODULE_KEY, &Value::from(self.module));
        line.push_str("}\n");
        line
    }
}

fn push_entry(line: &mut String, key: &str, value: &Value) {
    if !line.ends_with('{') {
        line.push(',');
    }
    line.push_str(&Value::from(key).to_string());
    line.push(':');
    line.push_str(&value.to_string());
}

/// Source position a record is attributed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    file: String,
    line: u32,
}

impl Caller {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    /// Last directory and file name plus line, e.g. `logging/logger.rs:42`
    pub fn short(&self) -> String {
        let mut parts = self.file.rsplitn(3, ['/', '\\']);
        let name = parts.next().unwrap_or(&self.file);
        let short = match parts.next() {
            Some(dir) if !dir.is_empty() => format!("{}/{}", dir, name),
            _ => name.to_string(),
        };
        format!("{}:{}", short, self.line)
    }
}

impl From<&Location<'_>> for Caller {
    fn from(location: &Location<'_>) -> Self {
        Self::new(location.file(), location.line())
    }
}
