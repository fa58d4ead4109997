use crate::environment::Environment;
use crate::segments::{Properties, Segment};
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use serde_json::{json, Value};
use std::sync::Arc;

/// How long the previous command ran.
#[derive(Default)]
pub struct ExecutionTime {
    ms: u64,
    threshold: u64,
}

impl Segment for ExecutionTime {
    fn init(&mut self, props: Properties, env: Arc<dyn Environment>) {
        self.ms = env.execution_time().max(0.0).round() as u64;
        self.threshold = props.get_int("threshold", 500).max(0) as u64;
    }

    fn enabled(&mut self) -> BoxFuture<'_, bool> {
        future::ready(self.ms > 0 && self.ms >= self.threshold).boxed()
    }

    fn template(&self) -> &'static str {
        " {{ .FormattedMs }} "
    }

    fn data(&self) -> Value {
        json!({ "Ms": self.ms, "FormattedMs": format_duration(self.ms) })
    }
}

pub fn format_duration(ms: u64) -> String {
    if ms < 1_000 {
        return format!("{}ms", ms);
    }

    let seconds = ms / 1_000;
    let (hours, minutes, seconds) = (seconds / 3_600, (seconds % 3_600) / 60, seconds % 60);
    match (hours, minutes) {
        (0, 0) => format!("{}.{}s", seconds, (ms % 1_000) / 100),
        (0, _) => format!("{}m {}s", minutes, seconds),
        _ => format!("{}h {}m {}s", hours, minutes, seconds),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(350), "350ms");
        assert_eq!(format_duration(2_540), "2.5s");
        assert_eq!(format_duration(61_000), "1m 1s");
        assert_eq!(format_duration(3_723_000), "1h 2m 3s");
    }
}
