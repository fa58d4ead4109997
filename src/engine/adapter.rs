use crate::config::{CacheStrategy, SegmentConfig, SegmentStyle};
use crate::environment::Environment;
use crate::segments::SegmentType;
use crate::template::{Context, Renderer, TemplateError};
use crate::utils::cache::{CacheError, CacheRead, Scope};
use crate::utils::{debug_with_context, toggle, visible_width};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SegmentError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("segment cache unavailable: {0}")]
    CacheUnavailable(#[from] CacheError),
    #[error("{segment} did not answer within {timeout:?}")]
    CollaboratorTimeout { segment: String, timeout: Duration },
}

/// How a segment's enablement was decided, for the debug report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pending,
    Enabled,
    Cached,
    Disabled,
    Toggled,
    TimedOut,
    Unknown,
}

impl Outcome {
    pub fn label(self) -> &'static str {
        match self {
            Outcome::Pending => "pending",
            Outcome::Enabled => "enabled",
            Outcome::Cached => "cached",
            Outcome::Disabled => "disabled",
            Outcome::Toggled => "toggled off",
            Outcome::TimedOut => "timed out",
            Outcome::Unknown => "unknown type",
        }
    }
}

/// One segment after rendering, ready for layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentDescriptor {
    pub name: String,
    pub kind: SegmentType,
    pub style: SegmentStyle,
    pub enabled: bool,
    pub text: String,
    /// Visible width of `text`, without separators or caps.
    pub width: usize,
    pub foreground: String,
    pub background: String,
    pub powerline_symbol: String,
    pub invert_powerline: bool,
    pub leading_diamond: String,
    pub trailing_diamond: String,
}

impl SegmentDescriptor {
    /// A disabled descriptor carrying the configured style.
    pub fn from_config(config: &SegmentConfig) -> Self {
        Self {
            name: config.name(),
            kind: config.kind,
            style: config.style,
            enabled: false,
            text: String::new(),
            width: 0,
            foreground: config.foreground.clone(),
            background: config.background.clone(),
            powerline_symbol: config.powerline_symbol.clone(),
            invert_powerline: config.invert_powerline,
            leading_diamond: config.leading_diamond.clone(),
            trailing_diamond: config.trailing_diamond.clone(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self.width = visible_width(&self.text);
        self.enabled = true;
        self
    }

    pub fn is_visible(&self) -> bool {
        self.enabled && !self.text.is_empty()
    }
}

/// Drives one configured segment from enablement to rendered text.
pub struct SegmentAdapter {
    config: SegmentConfig,
    template: &'static str,
    data: Value,
    outcome: Outcome,
    elapsed: Duration,
}

impl SegmentAdapter {
    pub fn new(config: SegmentConfig) -> Self {
        Self {
            config,
            template: "",
            data: Value::Null,
            outcome: Outcome::Pending,
            elapsed: Duration::ZERO,
        }
    }

    pub fn config(&self) -> &SegmentConfig {
        &self.config
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self.outcome, Outcome::Enabled | Outcome::Cached)
    }

    /// Decide whether the segment shows and collect its data. Never fails:
    /// any problem leaves the segment disabled.
    pub async fn resolve(&mut self, env: Arc<dyn Environment>, default_timeout: Duration) {
        let started = Instant::now();
        self.outcome = match self.decide(env, default_timeout).await {
            Ok(outcome) => outcome,
            Err(e) => {
                debug_with_context(&self.config.name(), &e.to_string());
                match e {
                    SegmentError::CollaboratorTimeout { .. } => Outcome::TimedOut,
                    _ => Outcome::Disabled,
                }
            }
        };
        self.elapsed = started.elapsed();
    }

    async fn decide(&mut self, env: Arc<dyn Environment>, default_timeout: Duration) -> Result<Outcome, SegmentError> {
        let name = self.config.name();
        if toggle::is_toggled(env.caches().store(Scope::Session), &name) {
            return Ok(Outcome::Toggled);
        }

        let Some(mut segment) = self.config.kind.create() else {
            return Ok(Outcome::Unknown);
        };
        self.template = segment.template();

        if let Some(data) = self.cached_data(env.as_ref()) {
            self.data = data;
            return Ok(Outcome::Cached);
        }

        segment.init(self.config.properties.clone(), Arc::clone(&env));

        let timeout = self
            .config
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(default_timeout);
        let enabled = tokio::time::timeout(timeout, segment.enabled())
            .await
            .map_err(|_| SegmentError::CollaboratorTimeout {
                segment: name.clone(),
                timeout,
            })?;
        if !enabled {
            return Ok(Outcome::Disabled);
        }

        self.data = segment.data();
        if let Err(e) = self.store_data(env.as_ref()) {
            debug_with_context(&name, &e.to_string());
        }
        Ok(Outcome::Enabled)
    }

    fn cache_slot(&self, env: &dyn Environment) -> Option<(Scope, String, i64)> {
        let cache = self.config.cache.as_ref()?;
        let (scope, key) = match cache.strategy {
            CacheStrategy::Folder => (
                Scope::Device,
                format!("segment_{}_{}", self.config.name(), env.pwd().display()),
            ),
            CacheStrategy::Session => (Scope::Session, format!("segment_{}", self.config.name())),
        };
        Some((scope, key, cache.duration))
    }

    fn cached_data(&self, env: &dyn Environment) -> Option<Value> {
        let (scope, key, _) = self.cache_slot(env)?;
        let raw = env.caches().store(scope).get(&key)?;
        serde_json::from_str(&raw).ok()
    }

    fn store_data(&self, env: &dyn Environment) -> Result<(), SegmentError> {
        let Some((scope, key, duration)) = self.cache_slot(env) else {
            return Ok(());
        };
        env.caches()
            .store(scope)
            .try_set(&key, &self.data.to_string(), duration)?;
        Ok(())
    }

    /// Render text and colors. Template failures yield an empty segment.
    pub fn render(&self, renderer: &Renderer, globals: &Value, cache: &dyn CacheRead) -> SegmentDescriptor {
        let mut descriptor = SegmentDescriptor::from_config(&self.config);
        if !self.is_enabled() {
            return descriptor;
        }

        let ctx = Context::new(globals).with_data(&self.data).with_cache(cache);
        let text = match self.render_text(renderer, &ctx) {
            Ok(text) => text,
            Err(e) => {
                debug_with_context(&descriptor.name, &e.to_string());
                return descriptor;
            }
        };

        if let Some(color) = first_rendered(renderer, &ctx, &self.config.foreground_templates) {
            descriptor.foreground = color;
        }
        if let Some(color) = first_rendered(renderer, &ctx, &self.config.background_templates) {
            descriptor.background = color;
        }
        descriptor.with_text(text)
    }

    fn render_text(&self, renderer: &Renderer, ctx: &Context<'_>) -> Result<String, SegmentError> {
        let template = self.config.template.as_deref().unwrap_or(self.template);
        Ok(renderer.render_str(template, ctx)?)
    }
}

/// First template that renders to non-blank text.
fn first_rendered(renderer: &Renderer, ctx: &Context<'_>, templates: &[String]) -> Option<String> {
    templates.iter().find_map(|template| match renderer.render_str(template, ctx) {
        Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Ok(_) => None,
        Err(e) => {
            debug_with_context("color", &e.to_string());
            None
        }
    })
}
