use crate::utils::cache::CacheRead;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

static NULL: Value = Value::Null;

/// The fixed vocabulary of variables every template can see.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Globals {
    pub root: bool,
    #[serde(rename = "PWD")]
    pub pwd: String,
    #[serde(rename = "AbsolutePWD")]
    pub absolute_pwd: String,
    #[serde(rename = "PSWD")]
    pub pswd: String,
    pub folder: String,
    pub shell: String,
    pub shell_version: String,
    pub user_name: String,
    pub host_name: String,
    pub code: i32,
    pub env: BTreeMap<String, String>,
    #[serde(rename = "OS")]
    pub os: String,
    #[serde(rename = "WSL")]
    pub wsl: bool,
    pub prompt_count: u64,
    pub segments: Map<String, Value>,
    #[serde(rename = "SHLVL")]
    pub shlvl: i64,
    pub var: Map<String, Value>,
    pub jobs: u32,
}

impl Globals {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

/// Read-only view a template is evaluated against.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    globals: &'a Value,
    data: &'a Value,
    cache: Option<&'a dyn CacheRead>,
}

impl<'a> Context<'a> {
    pub fn new(globals: &'a Value) -> Self {
        Self {
            globals,
            data: &NULL,
            cache: None,
        }
    }

    pub fn with_data(mut self, data: &'a Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_cache(mut self, cache: &'a dyn CacheRead) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn globals(&self) -> &'a Value {
        self.globals
    }

    pub fn data(&self) -> &'a Value {
        self.data
    }

    pub(crate) fn cached(&self, key: &str) -> Option<String> {
        self.cache.and_then(|cache| cache.read(key))
    }
}
