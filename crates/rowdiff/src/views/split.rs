//! Split layout: old on the left, new on the right

use super::{line_number_style, marker_style, number_cell, RenderContext};
use ratatui::prelude::*;
use rowdiff_core::view::{SideText, ViewLine};

/// `" num m "` on each side
pub(super) const GUTTER_WIDTH: usize = 7;

const SEPARATOR: &str = "│";

pub(super) fn content_line(
    ctx: &RenderContext<'_>,
    line: &ViewLine<'_>,
    width: usize,
) -> Line<'static> {
    let column = width.saturating_sub(1) / 2;
    let content_width = column.saturating_sub(GUTTER_WIDTH);
    let language = ctx.language(line);
    let prefix = line.prefix;

    let mut spans = side(
        ctx,
        line.left.as_ref(),
        prefix.old_number,
        prefix.left_marker,
        &language,
        content_width,
        true,
    );
    spans.push(Span::styled(SEPARATOR, line_number_style()));
    spans.extend(side(
        ctx,
        line.right.as_ref(),
        prefix.new_number,
        prefix.right_marker,
        &language,
        content_width,
        false,
    ));
    Line::from(spans)
}

fn side(
    ctx: &RenderContext<'_>,
    text: Option<&SideText<'_>>,
    number: Option<usize>,
    marker: Option<char>,
    language: &str,
    width: usize,
    pad: bool,
) -> Vec<Span<'static>> {
    let Some(text) = text else {
        let blank = if pad { GUTTER_WIDTH + width } else { 0 };
        return vec![Span::raw(" ".repeat(blank))];
    };
    let mut spans = vec![
        Span::styled(number_cell(number), line_number_style()),
        Span::raw(" "),
        Span::styled(
            marker.unwrap_or(' ').to_string(),
            marker_style(text.kind),
        ),
        Span::raw(" "),
    ];
    spans.extend(ctx.side_spans(text, language, width, pad));
    spans
}
