use posh_line::config::{
    load_config, load_config_file, load_config_or_default, Alignment, BlockType, CacheStrategy, Config, Overflow,
    SegmentStyle, DEFAULT_SEGMENT_TIMEOUT_MS, DEFAULT_TRANSIENT_TEMPLATE, SEGMENT_TIMEOUT_ENV,
};
use posh_line::segments::SegmentType;
use std::fs;
use tempfile::TempDir;

const SAMPLE: &str = r##"{
  "final_space": false,
  "segment_timeout_ms": 250,
  "palette": { "accent": "#ff8800" },
  "var": { "Greeting": "hi" },
  "blocks": [
    {
      "type": "prompt",
      "alignment": "left",
      "segments": [
        { "type": "path", "style": "powerline", "powerline_symbol": "", "background": "p:accent",
          "properties": { "style": "folder" } },
        { "type": "git", "alias": "Repo", "cache": { "duration": 5 } }
      ]
    },
    {
      "type": "rPrompt",
      "alignment": "right",
      "overflow": "break",
      "offset": 2,
      "segments": [{ "type": "executiontime", "timeout_ms": 50 }]
    }
  ],
  "tooltips": [{ "type": "text", "tips": ["git"], "template": "tip" }],
  "transient_prompt": { "template": "> " }
}"##;

#[tokio::test]
async fn test_load_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    fs::write(&path, SAMPLE).unwrap();

    let config = load_config_file(&path).await.unwrap();
    assert!(!config.final_space);
    assert_eq!(config.segment_timeout_ms, 250);
    assert_eq!(config.palette.get("accent").map(String::as_str), Some("#ff8800"));
    assert_eq!(config.blocks.len(), 2);

    let left = &config.blocks[0];
    assert_eq!(left.kind, BlockType::Prompt);
    assert_eq!(left.segments[0].kind, SegmentType::Path);
    assert_eq!(left.segments[0].style, SegmentStyle::Powerline);
    assert_eq!(left.segments[0].properties.get_string("style", "full"), "folder");
    assert_eq!(left.segments[1].name(), "Repo");
    assert_eq!(left.segments[1].key(), "Repo");
    let cache = left.segments[1].cache.as_ref().unwrap();
    assert_eq!(cache.duration, 5);
    assert_eq!(cache.strategy, CacheStrategy::Folder);

    let right = &config.blocks[1];
    assert_eq!(right.kind, BlockType::RPrompt);
    assert_eq!(right.alignment, Alignment::Right);
    assert_eq!(right.overflow, Overflow::Break);
    assert_eq!(right.offset, 2);
    assert_eq!(right.segments[0].kind, SegmentType::ExecutionTime);
    assert_eq!(right.segments[0].timeout_ms, Some(50));
    assert_eq!(right.segments[0].name(), "executiontime");
    assert_eq!(right.segments[0].key(), "Executiontime");

    assert_eq!(config.tooltips[0].tips, vec!["git".to_string()]);
    assert_eq!(config.transient_prompt.unwrap().template, "> ");
}

#[tokio::test]
async fn test_missing_fields_take_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    fs::write(&path, r#"{ "blocks": [{ "segments": [{ "type": "time" }, { "type": "made-up" }] }] }"#).unwrap();

    let config = load_config_file(&path).await.unwrap();
    assert!(config.final_space);
    assert_eq!(config.segment_timeout_ms, DEFAULT_SEGMENT_TIMEOUT_MS);
    assert!(config.transient_prompt.is_none());

    let block = &config.blocks[0];
    assert_eq!(block.kind, BlockType::Prompt);
    assert_eq!(block.alignment, Alignment::Left);
    assert_eq!(block.overflow, Overflow::None);
    assert_eq!(block.segments[0].style, SegmentStyle::Plain);
    assert_eq!(block.segments[1].kind, SegmentType::Unknown);
}

#[test]
fn test_default_config_is_usable() {
    let config = Config::default();
    assert!(config.final_space);
    assert!(!config.blocks.is_empty());
    assert!(config
        .blocks
        .iter()
        .any(|block| block.alignment == Alignment::Right));
    assert_eq!(posh_line::config::TransientConfig::default().template, DEFAULT_TRANSIENT_TEMPLATE);
}

#[tokio::test]
async fn test_invalid_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.json");
    fs::write(&path, "{ \"blocks\": [ }").unwrap();

    let err = load_config(Some(path.clone())).await.unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse config file"));

    let missing = temp_dir.path().join("missing.json");
    let err = load_config(Some(missing)).await.unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to read config file"));
}

// Environment variables are process-wide, so every override case lives in
// one test.
#[test]
fn test_env_overrides_and_fallback() {
    let temp_dir = TempDir::new().unwrap();
    let broken = temp_dir.path().join("broken.json");
    fs::write(&broken, "not json").unwrap();
    let valid = temp_dir.path().join("valid.json");
    fs::write(&valid, SAMPLE).unwrap();

    std::env::set_var(SEGMENT_TIMEOUT_ENV, "1200");
    let config = tokio_test::block_on(load_config(Some(valid.clone()))).unwrap();
    assert_eq!(config.segment_timeout_ms, 1200);

    let fallback = tokio_test::block_on(load_config_or_default(Some(broken)));
    assert_eq!(fallback.segment_timeout_ms, 1200);
    assert!(fallback.final_space);

    std::env::set_var(SEGMENT_TIMEOUT_ENV, "soon");
    let config = tokio_test::block_on(load_config(Some(valid))).unwrap();
    assert_eq!(config.segment_timeout_ms, 250);

    std::env::remove_var(SEGMENT_TIMEOUT_ENV);
}

#[test]
fn test_printed_config_loads_back() {
    let printed = serde_json::to_string_pretty(&Config::default()).unwrap();
    let reloaded: Config = serde_json::from_str(&printed).unwrap();

    assert_eq!(reloaded.blocks.len(), Config::default().blocks.len());
    assert_eq!(reloaded.blocks[0].segments[0].kind, SegmentType::Session);
    assert_eq!(reloaded.segment_timeout_ms, DEFAULT_SEGMENT_TIMEOUT_MS);
}
