//! Drawing the visible window of a [`DiffView`]

mod split;
#[cfg(test)]
mod tests;
mod unified;

use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use rowdiff_core::flatten::{FileHeaderRow, Layout, Row};
use rowdiff_core::model::{ChangeKind, LineKind};
use rowdiff_core::tokens::{language_for_path, Token, TokenCache, TokenStyle};
use rowdiff_core::view::{DiffView, SideText, ViewLine};
use rowdiff_core::word::SegmentKind;
use unicode_width::UnicodeWidthChar;

/// Columns taken by line numbers and markers on each side
pub fn gutter_width(layout: Layout) -> usize {
    match layout {
        Layout::Unified => unified::GUTTER_WIDTH,
        // Each side also gives up half of the separator column
        Layout::Split => split::GUTTER_WIDTH + 1,
    }
}

/// Total width needed to show `column_width` content columns per side
pub fn render_width(layout: Layout, column_width: usize) -> usize {
    match layout {
        Layout::Unified => unified::GUTTER_WIDTH + column_width,
        Layout::Split => 2 * (split::GUTTER_WIDTH + column_width) + 1,
    }
}

/// Everything needed to draw one frame
pub struct RenderContext<'a> {
    pub view: &'a DiffView,
    /// `None` draws without syntax colors
    pub tokens: Option<&'a TokenCache>,
    pub scroll_top: usize,
}

impl RenderContext<'_> {
    /// Styled lines for a viewport `width` columns wide and `height` rows tall
    pub fn lines(&self, width: usize, height: usize) -> Vec<Line<'static>> {
        let top = self.view.clamp_scroll(self.scroll_top, height);
        let slice = self.view.visible(top, height);
        slice
            .lines
            .iter()
            .filter(|line| line.index >= top)
            .take(height)
            .map(|line| self.line(line, width))
            .collect()
    }

    fn line(&self, line: &ViewLine<'_>, width: usize) -> Line<'static> {
        match line.header {
            Some(Row::FileHeader(header)) => file_header_line(header),
            Some(Row::HunkHeader(header)) => {
                Line::from(Span::styled(header.header.clone(), hunk_header_style()))
            }
            _ => match self.view.layout() {
                Layout::Unified => unified::content_line(self, line, width),
                Layout::Split => split::content_line(self, line, width),
            },
        }
    }

    fn language(&self, line: &ViewLine<'_>) -> String {
        self.view
            .model()
            .file(line.file_id)
            .map(|file| language_for_path(&file.name))
            .unwrap_or_default()
    }

    /// Spans for one side's text, cut or padded to `width` columns
    fn side_spans(
        &self,
        side: &SideText<'_>,
        language: &str,
        width: usize,
        pad: bool,
    ) -> Vec<Span<'static>> {
        let chars: Vec<char> = side.text.chars().collect();
        let mut styles = vec![content_style(side.kind); chars.len()];
        if let Some(cache) = self.tokens {
            let tokens = cache.tokens_for(side.content, language);
            apply_tokens(&mut styles, &tokens, side.start);
        }
        apply_segments(&mut styles, side);
        fit(&chars, &styles, width, pad)
    }
}

/// Draw the current window into `area`
pub fn draw(frame: &mut Frame, area: Rect, ctx: &RenderContext<'_>) {
    let lines = ctx.lines(area.width as usize, area.height as usize);
    frame.render_widget(Paragraph::new(lines), area);
}

/// The same window as unstyled text, trailing blanks trimmed
pub fn plain_lines(ctx: &RenderContext<'_>, width: usize, height: usize) -> Vec<String> {
    ctx.lines(width, height)
        .iter()
        .map(|line| {
            let text: String = line.spans.iter().map(|span| span.content.as_ref()).collect();
            text.trim_end().to_string()
        })
        .collect()
}

fn file_header_line(header: &FileHeaderRow) -> Line<'static> {
    let name = match (&header.prev_name, header.change_kind.is_rename()) {
        (Some(prev), true) => format!("{prev} → {}", header.name),
        _ => header.name.clone(),
    };
    let mut spans = vec![Span::styled(
        name,
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];
    if let Some(label) = change_label(header.change_kind) {
        spans.push(Span::styled(
            format!(" ({label})"),
            Style::default().fg(Color::DarkGray),
        ));
    }
    if header.binary {
        spans.push(Span::styled(" [binary]", Style::default().fg(Color::DarkGray)));
    }
    spans.push(Span::styled(
        format!("  +{}", header.insertions),
        Style::default().fg(Color::Green),
    ));
    spans.push(Span::styled(
        format!(" -{}", header.deletions),
        Style::default().fg(Color::Red),
    ));
    Line::from(spans)
}

fn change_label(kind: ChangeKind) -> Option<&'static str> {
    match kind {
        ChangeKind::New => Some("new"),
        ChangeKind::Deleted => Some("deleted"),
        ChangeKind::RenamePure => Some("renamed"),
        ChangeKind::RenameChanged => Some("renamed, modified"),
        ChangeKind::Change => None,
    }
}

fn hunk_header_style() -> Style {
    Style::default().fg(Color::Blue)
}

fn line_number_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

fn marker_style(kind: LineKind) -> Style {
    match kind {
        LineKind::Addition => Style::default().fg(Color::Green),
        LineKind::Deletion => Style::default().fg(Color::Red),
        LineKind::Context => Style::default(),
    }
}

fn content_style(kind: LineKind) -> Style {
    match kind {
        LineKind::Addition => Style::default().fg(Color::Green).bg(Color::Rgb(20, 40, 24)),
        LineKind::Deletion => Style::default().fg(Color::Red).bg(Color::Rgb(48, 20, 22)),
        LineKind::Context => Style::default(),
    }
}

fn emphasis_style(kind: SegmentKind) -> Option<Style> {
    match kind {
        SegmentKind::Unchanged => None,
        SegmentKind::Added => Some(
            Style::default()
                .bg(Color::Rgb(36, 92, 48))
                .add_modifier(Modifier::BOLD),
        ),
        SegmentKind::Removed => Some(
            Style::default()
                .bg(Color::Rgb(110, 36, 40))
                .add_modifier(Modifier::BOLD),
        ),
    }
}

fn token_style(style: TokenStyle) -> Style {
    let mut out = Style::default();
    if let Some(fg) = style.fg {
        out = out.fg(Color::Rgb(fg.r, fg.g, fg.b));
    }
    if style.bold {
        out = out.add_modifier(Modifier::BOLD);
    }
    if style.italic {
        out = out.add_modifier(Modifier::ITALIC);
    }
    if style.underline {
        out = out.add_modifier(Modifier::UNDERLINED);
    }
    out
}

/// Overlay token colors on the window starting `start` chars into the line
fn apply_tokens(styles: &mut [Style], tokens: &[Token], start: usize) {
    let end = start + styles.len();
    let mut offset = 0;
    for token in tokens {
        if offset >= end {
            break;
        }
        let len = token.text.chars().count();
        let from = offset.max(start);
        let to = (offset + len).min(end);
        if from < to {
            let style = token_style(token.style);
            for slot in &mut styles[from - start..to - start] {
                *slot = slot.patch(style);
            }
        }
        offset += len;
    }
}

/// Overlay word-diff emphasis; segments are already clipped to the window
fn apply_segments(styles: &mut [Style], side: &SideText<'_>) {
    let mut offset = 0;
    for segment in &side.segments {
        let len = segment.text.chars().count();
        if let Some(emphasis) = emphasis_style(segment.kind) {
            for slot in styles.iter_mut().skip(offset).take(len) {
                *slot = slot.patch(emphasis);
            }
        }
        offset += len;
    }
}

/// Group chars into styled runs, stopping at `width` display columns
///
/// Tabs draw as one space so columns line up with the char-based wrap.
fn fit(chars: &[char], styles: &[Style], width: usize, pad: bool) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut used = 0;
    let mut run = String::new();
    let mut run_style: Option<Style> = None;

    for (&ch, &style) in chars.iter().zip(styles) {
        let ch = if ch == '\t' { ' ' } else { ch };
        let ch_width = ch.width().unwrap_or(0);
        if used + ch_width > width {
            break;
        }
        used += ch_width;
        if run_style != Some(style) {
            if let Some(prev) = run_style {
                spans.push(Span::styled(std::mem::take(&mut run), prev));
            }
            run_style = Some(style);
        }
        run.push(ch);
    }
    if let Some(style) = run_style {
        spans.push(Span::styled(run, style));
    }
    if pad && used < width {
        spans.push(Span::raw(" ".repeat(width - used)));
    }
    spans
}

fn number_cell(number: Option<usize>) -> String {
    match number {
        Some(n) => format!("{n:>4}"),
        None => " ".repeat(4),
    }
}
