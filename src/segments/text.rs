use crate::environment::Environment;
use crate::segments::{Properties, Segment};
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use serde_json::{json, Value};
use std::sync::Arc;

/// Static text; everything interesting happens in its template.
#[derive(Default)]
pub struct Text {
    text: String,
}

impl Segment for Text {
    fn init(&mut self, props: Properties, _env: Arc<dyn Environment>) {
        self.text = props.get_string("text", "");
    }

    fn enabled(&mut self) -> BoxFuture<'_, bool> {
        future::ready(true).boxed()
    }

    fn template(&self) -> &'static str {
        "{{ .Text }}"
    }

    fn data(&self) -> Value {
        json!({ "Text": self.text })
    }
}
