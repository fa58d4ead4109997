use crate::environment::Environment;
use crate::segments::language::{DisplayMode, Language, VersionCommand};
use crate::segments::{Properties, Segment};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::sync::Arc;

const EXTENSIONS: &[&str] = &["package.json", "package-lock.json"];

const VERSION_URL: &str = "https://github.com/npm/cli/releases/tag/v{{ .Full }}";

const COMMANDS: &[VersionCommand] = &[VersionCommand {
    executable: "npm",
    args: &["--version"],
    regex: r"(?P<version>((?P<major>[0-9]+).(?P<minor>[0-9]+).(?P<patch>[0-9]+)))",
}];

#[derive(Default)]
pub struct Npm {
    language: Language,
}

impl Segment for Npm {
    fn init(&mut self, props: Properties, env: Arc<dyn Environment>) {
        self.language = Language::new(props, env, EXTENSIONS, COMMANDS, DisplayMode::Files, false)
            .with_version_url(VERSION_URL);
    }

    fn enabled(&mut self) -> BoxFuture<'_, bool> {
        self.language.enabled(false).boxed()
    }

    fn template(&self) -> &'static str {
        " \u{e71e} {{ .Full }} "
    }

    fn data(&self) -> Value {
        self.language.data()
    }
}
