use crate::environment::Environment;
use crate::segments::{Properties, Segment};
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use serde_json::{json, Value};
use std::path::{Component, Path};
use std::sync::Arc;

const ELLIPSIS: &str = "…";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathStyle {
    Full,
    Folder,
    Short,
}

impl PathStyle {
    fn from_name(name: &str) -> Self {
        match name {
            "folder" => PathStyle::Folder,
            "short" => PathStyle::Short,
            _ => PathStyle::Full,
        }
    }
}

/// The working directory, with the home directory folded into an icon.
#[derive(Default)]
pub struct PathSegment {
    path: String,
    folder: String,
}

impl Segment for PathSegment {
    fn init(&mut self, props: Properties, env: Arc<dyn Environment>) {
        let style = PathStyle::from_name(&props.get_string("style", "full"));
        let home_icon = props.get_string("home_icon", "~");
        let max_depth = props.get_int("max_depth", 0).max(0) as usize;

        let pwd = env.pwd();
        let home = env.home();

        self.folder = folder_name(pwd, home.as_deref(), &home_icon);
        self.path = match style {
            PathStyle::Folder => self.folder.clone(),
            PathStyle::Full => display_path(pwd, home.as_deref(), &home_icon),
            PathStyle::Short => shorten(&display_path(pwd, home.as_deref(), &home_icon), max_depth),
        };
    }

    fn enabled(&mut self) -> BoxFuture<'_, bool> {
        future::ready(true).boxed()
    }

    fn template(&self) -> &'static str {
        " {{ .Path }} "
    }

    fn data(&self) -> Value {
        json!({ "Path": self.path, "Folder": self.folder })
    }
}

pub(crate) fn display_path(pwd: &Path, home: Option<&Path>, home_icon: &str) -> String {
    if let Some(home) = home {
        if let Ok(rest) = pwd.strip_prefix(home) {
            if rest.as_os_str().is_empty() {
                return home_icon.to_string();
            }
            return format!("{}{}{}", home_icon, std::path::MAIN_SEPARATOR, rest.display());
        }
    }
    pwd.display().to_string()
}

pub(crate) fn folder_name(pwd: &Path, home: Option<&Path>, home_icon: &str) -> String {
    if home.map_or(false, |home| home == pwd) {
        return home_icon.to_string();
    }
    match pwd.components().next_back() {
        Some(Component::Normal(name)) => name.to_string_lossy().into_owned(),
        _ => pwd.display().to_string(),
    }
}

/// Keep the last `max_depth` components, marking the cut with an ellipsis.
fn shorten(path: &str, max_depth: usize) -> String {
    let separator = std::path::MAIN_SEPARATOR;
    let parts: Vec<&str> = path.split(separator).filter(|part| !part.is_empty()).collect();
    if max_depth == 0 || parts.len() <= max_depth {
        return path.to_string();
    }

    let kept = &parts[parts.len() - max_depth..];
    format!("{}{}{}", ELLIPSIS, separator, kept.join(&separator.to_string()))
}
