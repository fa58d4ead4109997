use crate::environment::Environment;
use crate::segments::{Properties, Segment};
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use serde_json::{json, Value};
use std::sync::Arc;

const SSH_VARIABLES: [&str; 2] = ["SSH_CONNECTION", "SSH_CLIENT"];

/// Who and where: user, host and whether we came in over SSH.
#[derive(Debug, Clone, Default)]
pub struct Session {
    user_name: String,
    host_name: String,
    ssh_session: bool,
}

impl Segment for Session {
    fn init(&mut self, _props: Properties, env: Arc<dyn Environment>) {
        self.user_name = env.user();
        self.host_name = env.host();
        self.ssh_session = SSH_VARIABLES
            .iter()
            .any(|key| env.getenv(key).map_or(false, |value| !value.is_empty()));
    }

    fn enabled(&mut self) -> BoxFuture<'_, bool> {
        future::ready(true).boxed()
    }

    fn template(&self) -> &'static str {
        " {{ if .SSHSession }}ssh:{{ end }}{{ .UserName }}@{{ .HostName }} "
    }

    fn data(&self) -> Value {
        json!({
            "UserName": self.user_name,
            "HostName": self.host_name,
            "SSHSession": self.ssh_session,
        })
    }
}
