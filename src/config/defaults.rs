use crate::config::*;
use crate::segments::{Properties, SegmentType};
use serde_json::{json, Map};
use std::collections::HashMap;

pub const DEFAULT_SEGMENT_TIMEOUT_MS: u64 = 500;

pub const DEFAULT_TRANSIENT_TEMPLATE: &str = "{{ .Shell }}> ";

pub const POWERLINE_SYMBOL: &str = "\u{e0b0}";

impl Default for Config {
    fn default() -> Self {
        Self {
            final_space: true,
            segment_timeout_ms: DEFAULT_SEGMENT_TIMEOUT_MS,
            blocks: default_blocks(),
            transient_prompt: None,
            tooltips: Vec::new(),
            palette: HashMap::new(),
            var: Map::new(),
        }
    }
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            kind: BlockType::Prompt,
            alignment: Alignment::Left,
            newline: false,
            separator: String::new(),
            overflow: Overflow::None,
            offset: 0,
            segments: Vec::new(),
        }
    }
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            kind: SegmentType::Text,
            style: SegmentStyle::Plain,
            powerline_symbol: POWERLINE_SYMBOL.to_string(),
            invert_powerline: false,
            leading_diamond: String::new(),
            trailing_diamond: String::new(),
            foreground: String::new(),
            background: String::new(),
            foreground_templates: Vec::new(),
            background_templates: Vec::new(),
            template: None,
            alias: None,
            properties: Properties::default(),
            cache: None,
            tips: Vec::new(),
            timeout_ms: None,
        }
    }
}

impl Default for TransientConfig {
    fn default() -> Self {
        Self {
            template: DEFAULT_TRANSIENT_TEMPLATE.to_string(),
            foreground: String::new(),
            background: String::new(),
        }
    }
}

fn powerline(kind: SegmentType, foreground: &str, background: &str) -> SegmentConfig {
    SegmentConfig {
        kind,
        style: SegmentStyle::Powerline,
        foreground: foreground.to_string(),
        background: background.to_string(),
        ..SegmentConfig::default()
    }
}

fn default_blocks() -> Vec<BlockConfig> {
    let mut path = powerline(SegmentType::Path, "#ffffff", "#3465a4");
    path.properties.set("style", json!("short"));
    path.properties.set("max_depth", json!(3));

    let mut git = powerline(SegmentType::Git, "#193549", "#95ffa4");
    git.properties.set("fetch_status", json!(true));
    git.background_templates = vec!["{{ if .Working.Changed }}#ffeb3b{{ end }}".to_string()];

    let mut status = powerline(SegmentType::Status, "#ffffff", "#e91e63");
    status.invert_powerline = true;

    let mut execution_time = powerline(SegmentType::ExecutionTime, "#ffffff", "#8800dd");
    execution_time.invert_powerline = true;

    vec![
        BlockConfig {
            segments: vec![
                powerline(SegmentType::Session, "#ffffff", "#c386f1"),
                path,
                git,
            ],
            ..BlockConfig::default()
        },
        BlockConfig {
            alignment: Alignment::Right,
            segments: vec![execution_time, status],
            ..BlockConfig::default()
        },
    ]
}
