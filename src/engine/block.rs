use crate::color::Writer;
use crate::config::{BlockConfig, SegmentStyle};
use crate::engine::adapter::SegmentDescriptor;

/// Where a block ends up; decides separator orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Left,
    Right,
    Transient,
    Tooltip,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedBlock {
    pub text: String,
    /// Terminal columns `text` occupies.
    pub width: usize,
}

impl RenderedBlock {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockStyle {
    pub separator: String,
}

impl From<&BlockConfig> for BlockStyle {
    fn from(block: &BlockConfig) -> Self {
        Self {
            separator: block.separator.clone(),
        }
    }
}

/// Join the visible segments, with separators only between neighbours.
pub fn layout(segments: &[SegmentDescriptor], placement: Placement, style: &BlockStyle, writer: &Writer) -> RenderedBlock {
    let mut text = String::new();
    let mut previous: Option<&SegmentDescriptor> = None;

    for segment in segments.iter().filter(|segment| segment.is_visible()) {
        if let Some(previous) = previous {
            text.push_str(&separator(previous, segment, placement, style, writer));
        }
        text.push_str(&paint(segment, writer));
        previous = Some(segment);
    }

    let width = writer.measure(&text);
    RenderedBlock { text, width }
}

fn separator(
    previous: &SegmentDescriptor,
    current: &SegmentDescriptor,
    placement: Placement,
    style: &BlockStyle,
    writer: &Writer,
) -> String {
    if current.style != SegmentStyle::Powerline || current.powerline_symbol.is_empty() {
        return writer.write("", "", &style.separator);
    }

    // Right-aligned blocks grow leftwards, which mirrors the arrow.
    let swapped = current.invert_powerline != (placement == Placement::Right);
    if swapped {
        writer.write(&current.background, &previous.background, &current.powerline_symbol)
    } else {
        writer.write(&previous.background, &current.background, &current.powerline_symbol)
    }
}

fn paint(segment: &SegmentDescriptor, writer: &Writer) -> String {
    let body = writer.write(&segment.foreground, &segment.background, &segment.text);
    if segment.style != SegmentStyle::Diamond {
        return body;
    }

    format!(
        "{}{}{}",
        writer.write(&segment.background, "", &segment.leading_diamond),
        body,
        writer.write(&segment.background, "", &segment.trailing_diamond)
    )
}
