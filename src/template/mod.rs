//! A small Go-template-like language for segment text.
//!
//! `{{ .Field }}` substitutes a value, `{{ if }}`/`{{ range }}` control the
//! output and a closed set of functions (`upper`, `trunc`, `default`, ...)
//! transforms values. Parsed trees are pooled per process by [`Renderer`].

mod context;
mod eval;
mod funcs;
mod lexer;
mod parse;

pub use context::{Context, Globals};

use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// Malformed syntax.
    #[error("invalid template text: {0}")]
    InvalidTemplate(String),
    /// Valid syntax that failed to evaluate.
    #[error("unable to create text based on template: {0}")]
    IncorrectTemplate(String),
}

/// Immutable template source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Template {
    source: String,
}

impl Template {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Templates without markers render to themselves.
    pub fn is_literal(&self) -> bool {
        !self.source.contains("{{") && !self.source.contains("}}")
    }

    pub fn parse(&self) -> Result<Tree, TemplateError> {
        parse::parse(&self.source).map(|nodes| Tree { nodes })
    }
}

/// A parsed template.
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<parse::Node>,
}

impl Tree {
    pub fn execute(&self, ctx: &Context<'_>) -> Result<String, TemplateError> {
        eval::execute(&self.nodes, ctx)
    }
}

/// Renders templates, keeping parsed trees for the life of the process.
#[derive(Default)]
pub struct Renderer {
    parsed: DashMap<String, Arc<Tree>>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&self, template: &Template, ctx: &Context<'_>) -> Result<String, TemplateError> {
        if template.is_literal() {
            return Ok(template.source().to_string());
        }
        self.tree(template)?.execute(ctx)
    }

    pub fn render_str(&self, source: &str, ctx: &Context<'_>) -> Result<String, TemplateError> {
        self.render(&Template::new(source), ctx)
    }

    /// Number of distinct templates parsed so far.
    pub fn pooled(&self) -> usize {
        self.parsed.len()
    }

    fn tree(&self, template: &Template) -> Result<Arc<Tree>, TemplateError> {
        if let Some(tree) = self.parsed.get(template.source()) {
            return Ok(Arc::clone(&tree));
        }

        // Only successful parses are pooled.
        let tree = Arc::new(template.parse()?);
        self.parsed
            .insert(template.source().to_string(), Arc::clone(&tree));
        Ok(tree)
    }
}
