//! Unified layout: one interleaved column

use super::{line_number_style, marker_style, number_cell, RenderContext};
use ratatui::prelude::*;
use rowdiff_core::view::ViewLine;

/// `" old  new m "`
pub(super) const GUTTER_WIDTH: usize = 12;

pub(super) fn content_line(
    ctx: &RenderContext<'_>,
    line: &ViewLine<'_>,
    width: usize,
) -> Line<'static> {
    // Context rows carry both sides; draw the new one
    let Some(side) = line.right.as_ref().or(line.left.as_ref()) else {
        return Line::default();
    };
    let prefix = line.prefix;
    let marker = prefix.right_marker.or(prefix.left_marker).unwrap_or(' ');

    let mut spans = vec![
        Span::styled(number_cell(prefix.old_number), line_number_style()),
        Span::raw(" "),
        Span::styled(number_cell(prefix.new_number), line_number_style()),
        Span::raw(" "),
        Span::styled(marker.to_string(), marker_style(side.kind)),
        Span::raw(" "),
    ];
    let language = ctx.language(line);
    spans.extend(ctx.side_spans(
        side,
        &language,
        width.saturating_sub(GUTTER_WIDTH),
        false,
    ));
    Line::from(spans)
}
