use posh_line::color::Writer;
use posh_line::config::{SegmentConfig, SegmentStyle};
use posh_line::engine::{layout, right_padding, BlockStyle, Placement, SegmentDescriptor};
use posh_line::utils::{strip_ansi, visible_width};
use posh_line::Shell;

fn segment(text: &str) -> SegmentDescriptor {
    SegmentDescriptor::from_config(&SegmentConfig::default()).with_text(text)
}

fn powerline(text: &str, background: &str) -> SegmentDescriptor {
    let config = SegmentConfig {
        style: SegmentStyle::Powerline,
        powerline_symbol: ">".to_string(),
        foreground: "#ffffff".to_string(),
        background: background.to_string(),
        ..SegmentConfig::default()
    };
    SegmentDescriptor::from_config(&config).with_text(text)
}

fn pipe_style() -> BlockStyle {
    BlockStyle {
        separator: "|".to_string(),
    }
}

#[test]
fn test_escapes_do_not_count_towards_width() {
    for text in ["", "abc", "日本語", "e\u{301}x", "❯ main"] {
        let sgr = format!("\x1b[1;38;2;10;20;30m{}\x1b[0m", text);
        let osc = format!("\x1b]8;;https://example.com\x1b\\{}\x1b]8;;\x1b\\", text);
        let title = format!("\x1b]0;title\x07{}", text);

        assert_eq!(visible_width(&sgr), visible_width(text));
        assert_eq!(visible_width(&osc), visible_width(text));
        assert_eq!(visible_width(&title), visible_width(text));
    }
}

#[test]
fn test_separators_only_between_visible_segments() {
    let writer = Writer::plain(Shell::Generic);

    for n in 0..6usize {
        let mut segments = Vec::new();
        for i in 0..n {
            // Interleave empty and disabled segments that must not add separators.
            segments.push(segment(""));
            segments.push(SegmentDescriptor::from_config(&SegmentConfig::default()));
            segments.push(segment(&format!("s{}", i)));
        }
        segments.push(segment(""));

        let rendered = layout(&segments, Placement::Left, &pipe_style(), &writer);
        assert_eq!(rendered.text.matches('|').count(), n.saturating_sub(1), "n = {}", n);
        assert!(!rendered.text.starts_with('|'));
        assert!(!rendered.text.ends_with('|'));
        assert_eq!(rendered.width, visible_width(&rendered.text));
    }
}

#[test]
fn test_plain_layout_text() {
    let writer = Writer::plain(Shell::Generic);
    let segments = [segment("a"), segment(""), segment("b"), segment("c")];
    let rendered = layout(&segments, Placement::Left, &pipe_style(), &writer);
    assert_eq!(rendered.text, "a|b|c");
    assert_eq!(rendered.width, 5);
}

#[test]
fn test_powerline_separator_colors() {
    let writer = Writer::colored(Shell::Generic);
    let segments = [powerline("a", "#ff0000"), powerline("b", "#00ff00")];

    let left = layout(&segments, Placement::Left, &BlockStyle::default(), &writer);
    assert!(left.text.contains("\x1b[38;2;255;0;0;48;2;0;255;0m>\x1b[0m"));
    assert_eq!(strip_ansi(&left.text), "a>b");
    assert_eq!(left.width, 3);

    let right = layout(&segments, Placement::Right, &BlockStyle::default(), &writer);
    assert!(right.text.contains("\x1b[38;2;0;255;0;48;2;255;0;0m>\x1b[0m"));

    let mut inverted = segments.clone();
    inverted[1].invert_powerline = true;
    let left_inverted = layout(&inverted, Placement::Left, &BlockStyle::default(), &writer);
    assert!(left_inverted.text.contains("\x1b[38;2;0;255;0;48;2;255;0;0m>\x1b[0m"));
}

#[test]
fn test_diamond_caps_belong_to_the_segment() {
    let writer = Writer::plain(Shell::Generic);
    let config = SegmentConfig {
        style: SegmentStyle::Diamond,
        leading_diamond: "(".to_string(),
        trailing_diamond: ")".to_string(),
        ..SegmentConfig::default()
    };
    let diamond = SegmentDescriptor::from_config(&config).with_text("d");

    let rendered = layout(&[diamond.clone()], Placement::Left, &pipe_style(), &writer);
    assert_eq!(rendered.text, "(d)");

    let rendered = layout(&[segment("a"), diamond], Placement::Left, &pipe_style(), &writer);
    assert_eq!(rendered.text, "a|(d)");
    assert_eq!(rendered.width, 5);
}

#[test]
fn test_zsh_escapes_are_measured_correctly() {
    let writer = Writer::colored(Shell::Zsh);
    let segments = [powerline("50%", "#101010"), powerline("b", "#202020")];
    let rendered = layout(&segments, Placement::Left, &BlockStyle::default(), &writer);

    assert!(rendered.text.contains("50%%"));
    assert!(rendered.text.contains("%{\x1b["));
    assert_eq!(rendered.width, 5);
}

#[test]
fn test_zsh_literal_percent_brace_keeps_its_width() {
    let writer = Writer::colored(Shell::Zsh);
    let segments = [powerline("a%{b", "#101010")];
    let rendered = layout(&segments, Placement::Right, &BlockStyle::default(), &writer);

    assert!(rendered.text.contains("a%%{b"));
    assert_eq!(rendered.width, 4);
}

#[test]
fn test_right_padding() {
    assert_eq!(right_padding(80, 10, 0), 70);
    assert_eq!(right_padding(5, 10, 0), 0);
    assert_eq!(right_padding(80, 10, 4), 66);
    assert_eq!(right_padding(10, 10, 1), 0);
}
