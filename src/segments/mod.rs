pub mod deno;
pub mod execution_time;
pub mod git;
pub mod language;
pub mod npm;
pub mod path;
pub mod python;
pub mod session;
pub mod status;
pub mod text;
pub mod time;

pub use deno::Deno;
pub use execution_time::ExecutionTime;
pub use git::Git;
pub use language::{DisplayMode, Language, Version, VersionCommand};
pub use npm::Npm;
pub use path::PathSegment;
pub use python::Python;
pub use session::Session;
pub use status::Status;
pub use text::Text;
pub use time::Time;

use crate::environment::Environment;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// One kind of prompt content.
///
/// `init` hands over the configured properties and the environment,
/// `enabled` inspects the outside world (and may run commands), after which
/// `data` exposes the collected values to the segment template.
pub trait Segment: Send {
    fn init(&mut self, props: Properties, env: Arc<dyn Environment>);

    fn enabled(&mut self) -> BoxFuture<'_, bool>;

    /// Template used when the configuration does not provide one.
    fn template(&self) -> &'static str;

    fn data(&self) -> Value;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentType {
    Text,
    Path,
    Git,
    Status,
    Time,
    Session,
    #[serde(rename = "executiontime")]
    ExecutionTime,
    Python,
    Npm,
    Deno,
    #[serde(other)]
    Unknown,
}

impl SegmentType {
    /// Fresh, uninitialised segment for this type.
    pub fn create(self) -> Option<Box<dyn Segment>> {
        let segment: Box<dyn Segment> = match self {
            SegmentType::Text => Box::new(Text::default()),
            SegmentType::Path => Box::new(PathSegment::default()),
            SegmentType::Git => Box::new(Git::default()),
            SegmentType::Status => Box::new(Status::default()),
            SegmentType::Time => Box::new(Time::default()),
            SegmentType::Session => Box::new(Session::default()),
            SegmentType::ExecutionTime => Box::new(ExecutionTime::default()),
            SegmentType::Python => Box::new(Python::default()),
            SegmentType::Npm => Box::new(Npm::default()),
            SegmentType::Deno => Box::new(Deno::default()),
            SegmentType::Unknown => return None,
        };
        Some(segment)
    }

    pub fn name(self) -> &'static str {
        match self {
            SegmentType::Text => "text",
            SegmentType::Path => "path",
            SegmentType::Git => "git",
            SegmentType::Status => "status",
            SegmentType::Time => "time",
            SegmentType::Session => "session",
            SegmentType::ExecutionTime => "executiontime",
            SegmentType::Python => "python",
            SegmentType::Npm => "npm",
            SegmentType::Deno => "deno",
            SegmentType::Unknown => "unknown",
        }
    }

    /// Key under `.Segments` in templates.
    pub fn key(self) -> String {
        pascal_case(self.name())
    }
}

pub(crate) fn pascal_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Free-form per-segment settings from the `properties` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties(Map<String, Value>);

impl Properties {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_string(&self, key: &str, default: &str) -> String {
        match self.0.get(key) {
            Some(Value::String(s)) => s.clone(),
            _ => default.to_string(),
        }
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.0.get(key) {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or(default),
            _ => default,
        }
    }

    pub fn get_float(&self, key: &str, default: f64) -> f64 {
        self.0.get(key).and_then(Value::as_f64).unwrap_or(default)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }
}
