//! Turns configuration plus environment into printable prompt text.

pub mod adapter;
pub mod block;

pub use adapter::{Outcome, SegmentAdapter, SegmentDescriptor, SegmentError};
pub use block::{layout, BlockStyle, Placement, RenderedBlock};

use crate::color::Writer;
use crate::config::{Alignment, BlockConfig, BlockType, Config, Overflow, TransientConfig};
use crate::environment::{Environment, Shell};
use crate::segments::path::{display_path, folder_name};
use crate::template::{Context, Globals, Renderer};
use crate::utils::cache::{Scope, INFINITE};
use crate::utils::{debug, debug_with_context};
use colored::Colorize;
use futures::future::join_all;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Session key counting primary prompts.
pub const PROMPT_COUNT_KEY: &str = "prompt_count_cache";

/// Column where a right-aligned block of `right_width` columns starts.
pub fn right_padding(width: usize, right_width: usize, offset: usize) -> usize {
    width.saturating_sub(right_width).saturating_sub(offset)
}

struct ReportLine {
    name: String,
    outcome: Outcome,
    elapsed: Duration,
}

pub struct Engine {
    config: Config,
    env: Arc<dyn Environment>,
    writer: Writer,
    renderer: Renderer,
    globals: Value,
    report: Vec<ReportLine>,
}

impl Engine {
    pub fn new(config: Config, env: Arc<dyn Environment>, writer: Writer) -> Self {
        let globals = build_globals(env.as_ref(), &config).to_value();
        Self {
            config,
            env,
            writer,
            renderer: Renderer::new(),
            globals,
            report: Vec::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// The left prompt, with right-aligned blocks placed on their lines.
    pub async fn compose_primary(&mut self) -> String {
        self.bump_prompt_count();

        let blocks: Vec<BlockConfig> = self
            .config
            .blocks
            .iter()
            .filter(|block| block.kind == BlockType::Prompt)
            .cloned()
            .collect();
        let terminal_width = self.env.terminal_width();

        let mut out = String::new();
        let mut line_width = 0;
        let mut right_placed = false;

        for block in &blocks {
            if block.newline {
                out.push('\n');
                line_width = 0;
                right_placed = false;
            }

            if block.alignment == Alignment::Left {
                let rendered = self.render_block(block, Placement::Left).await;
                out.push_str(&rendered.text);
                line_width += rendered.width;
                continue;
            }

            if right_placed {
                debug("Ignoring additional right-aligned block on the same line");
                continue;
            }
            let rendered = self.render_block(block, Placement::Right).await;
            if rendered.is_empty() {
                continue;
            }
            right_placed = true;

            let Some(width) = terminal_width else {
                out.push(' ');
                out.push_str(&rendered.text);
                line_width += 1 + rendered.width;
                continue;
            };

            let column = right_padding(width, rendered.width, block.offset);
            if column >= line_width {
                out.push_str(&" ".repeat(column - line_width));
                line_width = column;
            } else {
                match block.overflow {
                    Overflow::Hide => {
                        debug("Right-aligned block does not fit, hiding it");
                        continue;
                    }
                    Overflow::Break => {
                        out.push('\n');
                        out.push_str(&" ".repeat(column));
                        line_width = column;
                    }
                    // Padding clamps at zero; the block never overlaps the left text.
                    Overflow::None => {}
                }
            }
            out.push_str(&rendered.text);
            line_width += rendered.width;
        }

        if self.config.final_space {
            out.push(' ');
        }
        out
    }

    /// The first `rprompt` block, for shells with a native right prompt.
    pub async fn compose_right(&mut self) -> String {
        let Some(block) = self
            .config
            .blocks
            .iter()
            .find(|block| block.kind == BlockType::RPrompt)
            .cloned()
        else {
            return String::new();
        };

        let mut text = self.render_block(&block, Placement::Right).await.text;
        if self.env.shell() == Shell::Elvish && self.env.os() != "windows" {
            text.push(' ');
        }
        text
    }

    /// The short prompt left behind in scrollback after a command runs.
    pub async fn compose_transient(&mut self) -> String {
        let transient = self.config.transient_prompt.clone().unwrap_or_default();
        let descriptor = self.transient_descriptor(&transient);
        layout(&[descriptor], Placement::Transient, &BlockStyle::default(), &self.writer).text
    }

    fn transient_descriptor(&self, transient: &TransientConfig) -> SegmentDescriptor {
        let config = crate::config::SegmentConfig {
            foreground: transient.foreground.clone(),
            background: transient.background.clone(),
            ..Default::default()
        };
        let descriptor = SegmentDescriptor::from_config(&config);

        let ctx = Context::new(&self.globals).with_cache(self.env.caches());
        match self.renderer.render_str(&transient.template, &ctx) {
            Ok(text) => descriptor.with_text(text),
            Err(e) => {
                debug_with_context("transient", &e.to_string());
                descriptor
            }
        }
    }

    /// Segments whose `tips` name the first word of `command`.
    pub async fn compose_tooltip(&mut self, command: &str) -> String {
        let Some(word) = command.split_whitespace().next() else {
            return String::new();
        };

        let segments: Vec<_> = self
            .config
            .tooltips
            .iter()
            .filter(|tooltip| tooltip.tips.iter().any(|tip| tip == word))
            .cloned()
            .collect();
        if segments.is_empty() {
            return String::new();
        }

        let block = BlockConfig {
            segments,
            ..BlockConfig::default()
        };
        self.render_block(&block, Placement::Tooltip).await.text
    }

    async fn render_block(&mut self, block: &BlockConfig, placement: Placement) -> RenderedBlock {
        let timeout = Duration::from_millis(self.config.segment_timeout_ms);
        let mut adapters: Vec<SegmentAdapter> = block.segments.iter().cloned().map(SegmentAdapter::new).collect();

        join_all(
            adapters
                .iter_mut()
                .map(|adapter| adapter.resolve(Arc::clone(&self.env), timeout)),
        )
        .await;

        // Sequential so later templates see earlier segments under `.Segments`.
        let mut descriptors = Vec::with_capacity(adapters.len());
        for adapter in &adapters {
            let descriptor = adapter.render(&self.renderer, &self.globals, self.env.caches());
            if adapter.is_enabled() {
                if let Some(Value::Object(segments)) = self.globals.get_mut("Segments") {
                    segments.insert(adapter.config().key(), adapter.data().clone());
                }
            }
            self.report.push(ReportLine {
                name: adapter.config().name(),
                outcome: adapter.outcome(),
                elapsed: adapter.elapsed(),
            });
            descriptors.push(descriptor);
        }

        layout(&descriptors, placement, &BlockStyle::from(block), &self.writer)
    }

    fn bump_prompt_count(&mut self) {
        let store = self.env.caches().store(Scope::Session);
        let count = prompt_count(self.env.as_ref()) + 1;
        store.set(PROMPT_COUNT_KEY, &count.to_string(), INFINITE);
        self.globals["PromptCount"] = Value::from(count);
    }

    /// Per-segment timings of everything rendered so far.
    pub fn report(&self) -> String {
        let mut lines = vec![format!("{:<20} {:>10}  {}", "SEGMENT", "DURATION", "RESULT").bold().to_string()];
        for line in &self.report {
            let label = match line.outcome {
                Outcome::Enabled | Outcome::Cached => line.outcome.label().green(),
                Outcome::TimedOut => line.outcome.label().red(),
                Outcome::Unknown => line.outcome.label().yellow(),
                _ => line.outcome.label().dimmed(),
            };
            lines.push(format!(
                "{:<20} {:>8.2}ms  {}",
                line.name,
                line.elapsed.as_secs_f64() * 1000.0,
                label
            ));
        }
        lines.join("\n")
    }
}

fn prompt_count(env: &dyn Environment) -> u64 {
    env.caches()
        .store(Scope::Session)
        .get(PROMPT_COUNT_KEY)
        .and_then(|count| count.trim().parse().ok())
        .unwrap_or(0)
}

pub fn build_globals(env: &dyn Environment, config: &Config) -> Globals {
    let pwd = env.pwd();
    let home = env.home();

    Globals {
        root: env.is_root(),
        pwd: display_path(pwd, home.as_deref(), "~"),
        absolute_pwd: pwd.display().to_string(),
        pswd: env.pswd().to_string(),
        folder: folder_name(pwd, home.as_deref(), "~"),
        shell: env.shell().name().to_string(),
        shell_version: env.shell_version().to_string(),
        user_name: env.user(),
        host_name: env.host(),
        code: env.status(),
        env: env.environ(),
        os: env.os().to_string(),
        wsl: env.is_wsl(),
        prompt_count: prompt_count(env),
        segments: Map::new(),
        shlvl: env
            .getenv("SHLVL")
            .and_then(|level| level.trim().parse().ok())
            .unwrap_or(0),
        var: config.var.clone(),
        jobs: env.jobs(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_right_padding_saturates() {
        assert_eq!(right_padding(80, 10, 0), 70);
        assert_eq!(right_padding(80, 10, 5), 65);
        assert_eq!(right_padding(5, 10, 0), 0);
    }
}
