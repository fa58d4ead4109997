pub mod defaults;
pub mod loader;

pub use defaults::*;
pub use loader::*;

use crate::segments::{Properties, SegmentType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub final_space: bool,
    /// Upper bound for deciding whether one segment shows.
    pub segment_timeout_ms: u64,
    pub blocks: Vec<BlockConfig>,
    pub transient_prompt: Option<TransientConfig>,
    pub tooltips: Vec<SegmentConfig>,
    /// Named colors, referenced as `p:name`.
    pub palette: HashMap<String, String>,
    /// User variables, exposed to templates as `.Var`.
    pub var: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Prompt,
    #[serde(alias = "rPrompt")]
    RPrompt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Right,
}

/// What to do when a right-aligned block does not fit next to the left text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Overflow {
    /// Keep it on the line with zero padding, right after the left text.
    None,
    Hide,
    Break,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockConfig {
    #[serde(rename = "type")]
    pub kind: BlockType,
    pub alignment: Alignment,
    pub newline: bool,
    /// Placed between consecutive non-powerline segments.
    pub separator: String,
    pub overflow: Overflow,
    /// Columns kept free to the right of a right-aligned block.
    pub offset: usize,
    pub segments: Vec<SegmentConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentStyle {
    Plain,
    Powerline,
    Diamond,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStrategy {
    /// One entry per working directory.
    Folder,
    /// One entry per terminal session.
    Session,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentCache {
    /// Minutes.
    pub duration: i64,
    #[serde(default = "default_cache_strategy")]
    pub strategy: CacheStrategy,
}

fn default_cache_strategy() -> CacheStrategy {
    CacheStrategy::Folder
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    #[serde(rename = "type")]
    pub kind: SegmentType,
    pub style: SegmentStyle,
    pub powerline_symbol: String,
    pub invert_powerline: bool,
    pub leading_diamond: String,
    pub trailing_diamond: String,
    pub foreground: String,
    pub background: String,
    /// Rendered in order; the first non-empty result replaces `foreground`.
    pub foreground_templates: Vec<String>,
    pub background_templates: Vec<String>,
    pub template: Option<String>,
    pub alias: Option<String>,
    pub properties: Properties,
    pub cache: Option<SegmentCache>,
    /// Commands that trigger this segment as a tooltip.
    pub tips: Vec<String>,
    pub timeout_ms: Option<u64>,
}

impl SegmentConfig {
    /// Name used by `toggle`.
    pub fn name(&self) -> String {
        self.alias
            .clone()
            .unwrap_or_else(|| self.kind.name().to_string())
    }

    /// Key under `.Segments`.
    pub fn key(&self) -> String {
        self.alias.clone().unwrap_or_else(|| self.kind.key())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransientConfig {
    pub template: String,
    pub foreground: String,
    pub background: String,
}
