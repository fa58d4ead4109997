use crate::environment::Environment;
use crate::segments::language::{DisplayMode, Language, VersionCommand};
use crate::segments::{Properties, Segment};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

const EXTENSIONS: &[&str] = &["*.py", "*.ipynb", "pyproject.toml", "venv.bak", "venv", ".venv"];

const PYTHON_VERSION: &str =
    r"(?:Python (?P<version>((?P<major>[0-9]+).(?P<minor>[0-9]+).(?P<patch>[0-9]+))))";

const VERSION_URL: &str = "https://www.python.org/downloads/release/python-{{ .Major }}{{ .Minor }}{{ .Patch }}/";

const COMMANDS: &[VersionCommand] = &[
    VersionCommand {
        executable: "python",
        args: &["--version"],
        regex: PYTHON_VERSION,
    },
    VersionCommand {
        executable: "python3",
        args: &["--version"],
        regex: PYTHON_VERSION,
    },
];

/// Checked in order; the first usable name wins.
const VENV_VARIABLES: [&str; 4] = ["VIRTUAL_ENV", "CONDA_ENV_PATH", "CONDA_DEFAULT_ENV", "PYENV_VERSION"];

const DEFAULT_ENV_NAMES: [&str; 2] = ["system", "base"];

#[derive(Default)]
pub struct Python {
    language: Language,
    venv: String,
}

impl Python {
    fn load_venv(&mut self) {
        let Some(env) = self.language.env().cloned() else {
            return;
        };
        if !self.language.props().get_bool("fetch_virtual_env", true) {
            return;
        }

        let display_default = self.language.props().get_bool("display_default", true);
        self.venv = VENV_VARIABLES
            .iter()
            .filter_map(|key| env.getenv(key))
            .map(|value| venv_name(&value))
            .find(|name| usable_venv_name(name, display_default))
            .unwrap_or_default();
    }

    async fn detect(&mut self) -> bool {
        self.load_venv();
        let in_context = !self.venv.is_empty();
        self.language.enabled(in_context).await
    }
}

fn venv_name(value: &str) -> String {
    Path::new(value)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| value.to_string())
}

fn usable_venv_name(name: &str, display_default: bool) -> bool {
    if name.is_empty() || name == "." {
        return false;
    }
    display_default || !DEFAULT_ENV_NAMES.contains(&name)
}

impl Segment for Python {
    fn init(&mut self, props: Properties, env: Arc<dyn Environment>) {
        self.language = Language::new(props, env, EXTENSIONS, COMMANDS, DisplayMode::Environment, true)
            .with_version_url(VERSION_URL);
        self.venv.clear();
    }

    fn enabled(&mut self) -> BoxFuture<'_, bool> {
        self.detect().boxed()
    }

    fn template(&self) -> &'static str {
        " {{ if .Error }}{{ .Error }}{{ else }}{{ if .Venv }}{{ .Venv }} {{ end }}{{ .Full }}{{ end }} "
    }

    fn data(&self) -> Value {
        let mut data = self.language.data();
        if let Value::Object(map) = &mut data {
            map.insert("Venv".to_string(), Value::String(self.venv.clone()));
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_venv_name_is_last_component() {
        assert_eq!(venv_name("/home/ada/.virtualenvs/api"), "api");
        assert_eq!(venv_name("base"), "base");
    }

    #[test]
    fn test_default_env_names_can_be_hidden() {
        assert!(usable_venv_name("base", true));
        assert!(!usable_venv_name("base", false));
        assert!(!usable_venv_name("system", false));
        assert!(usable_venv_name("api", false));
        assert!(!usable_venv_name("", true));
    }
}
