use crate::environment::Environment;
use crate::segments::{Properties, Segment};
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use serde_json::{json, Value};
use std::sync::Arc;

/// Exit code of the previous command.
#[derive(Default)]
pub struct Status {
    code: i32,
    always_enabled: bool,
}

impl Segment for Status {
    fn init(&mut self, props: Properties, env: Arc<dyn Environment>) {
        self.code = env.status();
        self.always_enabled = props.get_bool("always_enabled", false);
    }

    fn enabled(&mut self) -> BoxFuture<'_, bool> {
        future::ready(self.code != 0 || self.always_enabled).boxed()
    }

    fn template(&self) -> &'static str {
        " {{ if .Error }}✘ {{ .Code }}{{ else }}✔{{ end }} "
    }

    fn data(&self) -> Value {
        json!({ "Code": self.code, "Error": self.code != 0 })
    }
}
