//! Shared machinery for segments that report a toolchain version.
//!
//! A language segment is enabled according to its `display_mode`, then
//! asks each candidate executable for its version until one answers with
//! output its regex understands. Versions may be memoized in the device
//! cache, keyed by executable and a fingerprint of `PATH`.

use crate::environment::Environment;
use crate::segments::Properties;
use crate::template::{Context, Template};
use crate::utils::cache::Scope;
use crate::utils::debug_with_context;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

pub const DEFAULT_VERSION_CACHE_MINUTES: i64 = 7 * 24 * 60;

pub const LANGUAGE_TEMPLATE: &str = " {{ if .Error }}{{ .Error }}{{ else }}{{ .Full }}{{ end }} ";

const NO_EXECUTABLE: &str = "no executable found";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Always shown.
    Always,
    /// Shown when matching files are in the working directory.
    Files,
    /// Shown when the language's environment is active (e.g. a virtualenv).
    Environment,
    /// Shown for matching files or an active environment.
    Context,
}

impl DisplayMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "always" => Some(DisplayMode::Always),
            "files" => Some(DisplayMode::Files),
            "environment" => Some(DisplayMode::Environment),
            "context" => Some(DisplayMode::Context),
            _ => None,
        }
    }
}

/// One way of asking for a version.
#[derive(Debug, Clone, Copy)]
pub struct VersionCommand {
    pub executable: &'static str,
    pub args: &'static [&'static str],
    /// Must define `version`, `major`, `minor` and `patch` groups.
    pub regex: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Version {
    pub full: String,
    pub major: String,
    pub minor: String,
    pub patch: String,
}

impl Version {
    pub fn parse(output: &str, pattern: &str) -> Option<Self> {
        let regex = Regex::new(pattern).ok()?;
        let captures = regex.captures(output)?;
        let group = |name: &str| {
            captures
                .name(name)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        };

        let full = group("version");
        if full.is_empty() {
            return None;
        }
        Some(Self {
            full,
            major: group("major"),
            minor: group("minor"),
            patch: group("patch"),
        })
    }
}

pub struct Language {
    env: Option<Arc<dyn Environment>>,
    props: Properties,
    extensions: &'static [&'static str],
    commands: &'static [VersionCommand],
    display_mode: DisplayMode,
    home_enabled: bool,
    /// Rendered against the version into `.URL`.
    version_url: &'static str,
    pub version: Version,
    pub error: String,
}

impl Default for Language {
    fn default() -> Self {
        Self {
            env: None,
            props: Properties::default(),
            extensions: &[],
            commands: &[],
            display_mode: DisplayMode::Files,
            home_enabled: false,
            version_url: "",
            version: Version::default(),
            error: String::new(),
        }
    }
}

impl Language {
    /// `display_mode` and `home_enabled` fall back to the given defaults
    /// when the properties do not set them.
    pub fn new(
        props: Properties,
        env: Arc<dyn Environment>,
        extensions: &'static [&'static str],
        commands: &'static [VersionCommand],
        display_mode: DisplayMode,
        home_enabled: bool,
    ) -> Self {
        let display_mode = DisplayMode::from_name(&props.get_string("display_mode", "")).unwrap_or(display_mode);
        let home_enabled = props.get_bool("home_enabled", home_enabled);
        Self {
            env: Some(env),
            props,
            extensions,
            commands,
            display_mode,
            home_enabled,
            version_url: "",
            version: Version::default(),
            error: String::new(),
        }
    }

    pub fn with_version_url(mut self, template: &'static str) -> Self {
        self.version_url = template;
        self
    }

    pub fn env(&self) -> Option<&Arc<dyn Environment>> {
        self.env.as_ref()
    }

    pub fn props(&self) -> &Properties {
        &self.props
    }

    /// `in_context` reports whether the language environment is active.
    pub async fn enabled(&mut self, in_context: bool) -> bool {
        let Some(env) = self.env.clone() else {
            return false;
        };

        let in_home = env.home().map_or(false, |home| home.as_path() == env.pwd());
        if in_home && !self.home_enabled {
            return false;
        }

        let enabled = match self.display_mode {
            DisplayMode::Always => true,
            DisplayMode::Files => self.has_files(env.as_ref()).await,
            DisplayMode::Environment => in_context,
            DisplayMode::Context => in_context || self.has_files(env.as_ref()).await,
        };
        if !enabled {
            return false;
        }

        match self.resolve_version(env.as_ref()).await {
            Ok(version) => self.version = version,
            Err(error) => self.error = error,
        }
        true
    }

    async fn has_files(&self, env: &dyn Environment) -> bool {
        for pattern in self.extensions {
            if env.has_files(pattern).await {
                return true;
            }
        }
        false
    }

    async fn resolve_version(&self, env: &dyn Environment) -> Result<Version, String> {
        let cache_version = self.props.get_bool("cache_version", false);
        let cache_minutes = self.props.get_int("cache_duration", DEFAULT_VERSION_CACHE_MINUTES);
        let path = env.getenv("PATH").unwrap_or_default();

        let mut last_error = NO_EXECUTABLE.to_string();
        for command in self.commands {
            let key = version_cache_key(command.executable, &path);

            if cache_version {
                let cached = env.caches().store(Scope::Device).get(&key);
                if let Some(version) = cached.and_then(|raw| serde_json::from_str::<Version>(&raw).ok()) {
                    debug_with_context(command.executable, "Using cached version");
                    return Ok(version);
                }
            }

            let Some(output) = env.run_command(command.executable, command.args).await else {
                continue;
            };

            match Version::parse(&output, command.regex) {
                Some(version) => {
                    if cache_version {
                        if let Ok(raw) = serde_json::to_string(&version) {
                            env.caches().store(Scope::Device).set(&key, &raw, cache_minutes);
                        }
                    }
                    return Ok(version);
                }
                None => {
                    last_error = format!("cannot parse version from {} output", command.executable);
                }
            }
        }

        Err(last_error)
    }

    pub fn data(&self) -> Value {
        json!({
            "Full": self.version.full,
            "Major": self.version.major,
            "Minor": self.version.minor,
            "Patch": self.version.patch,
            "Error": self.error,
            "URL": self.url(),
        })
    }

    fn url(&self) -> String {
        if self.version_url.is_empty() || self.version.full.is_empty() {
            return String::new();
        }
        let version = serde_json::to_value(&self.version).unwrap_or(Value::Null);
        let ctx = Context::new(&version);
        Template::new(self.version_url).parse().and_then(|tree| tree.execute(&ctx)).unwrap_or_else(|e| {
            debug_with_context("version url", &e.to_string());
            String::new()
        })
    }
}

/// Versions depend on which binary `PATH` resolves to, so the key carries a
/// fingerprint of it.
pub fn version_cache_key(executable: &str, path: &str) -> String {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    format!("version_{}_{:x}", executable, hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEMVER: &str = r"(?P<version>((?P<major>[0-9]+).(?P<minor>[0-9]+).(?P<patch>[0-9]+)))";

    #[test]
    fn test_version_parse() {
        let version = Version::parse("deno 1.38.4 (release, x86_64)", SEMVER).unwrap();
        assert_eq!(version.full, "1.38.4");
        assert_eq!(version.major, "1");
        assert_eq!(version.minor, "38");
        assert_eq!(version.patch, "4");

        assert!(Version::parse("command not found", SEMVER).is_none());
    }

    #[test]
    fn test_version_url_renders_from_version() {
        let mut language =
            Language::default().with_version_url("https://example.org/v{{ .Major }}.{{ .Minor }}/{{ .Full }}");
        assert_eq!(language.data()["URL"], "");

        language.version = Version::parse("1.38.4", SEMVER).unwrap();
        assert_eq!(language.data()["URL"], "https://example.org/v1.38/1.38.4");
    }

    #[test]
    fn test_cache_key_follows_path() {
        let a = version_cache_key("node", "/usr/bin");
        let b = version_cache_key("node", "/opt/node/bin:/usr/bin");
        assert_ne!(a, b);
        assert_eq!(a, version_cache_key("node", "/usr/bin"));
    }
}
