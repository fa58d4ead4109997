use crate::environment::Environment;
use crate::segments::{Properties, Segment};
use chrono::format::{Item, StrftimeItems};
use chrono::Local;
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use serde_json::{json, Value};
use std::sync::Arc;

const DEFAULT_FORMAT: &str = "%H:%M:%S";

#[derive(Default)]
pub struct Time {
    current: String,
}

impl Segment for Time {
    fn init(&mut self, props: Properties, _env: Arc<dyn Environment>) {
        let format = props.get_string("time_format", DEFAULT_FORMAT);
        self.current = format_now(&format);
    }

    fn enabled(&mut self) -> BoxFuture<'_, bool> {
        future::ready(true).boxed()
    }

    fn template(&self) -> &'static str {
        " {{ .CurrentDate }} "
    }

    fn data(&self) -> Value {
        json!({ "CurrentDate": self.current })
    }
}

/// Formatting with a malformed pattern panics in chrono's Display impl,
/// so bad patterns fall back to the default.
fn format_now(format: &str) -> String {
    let valid = !StrftimeItems::new(format).any(|item| matches!(item, Item::Error));
    let format = if valid { format } else { DEFAULT_FORMAT };
    Local::now().format(format).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_format_falls_back() {
        let formatted = format_now("%Q%");
        assert_eq!(formatted.len(), "00:00:00".len());
        assert_eq!(format_now("literal"), "literal");
    }
}
