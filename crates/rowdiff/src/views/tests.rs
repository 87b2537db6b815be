use super::{draw, plain_lines, render_width, RenderContext};
use ratatui::{backend::TestBackend, buffer::Buffer, style::Color, Terminal};
use rowdiff_core::flatten::Layout;
use rowdiff_core::model::DiffModel;
use rowdiff_core::parse::parse_diff;
use rowdiff_core::tokens::{Highlighter, Rgb, Token, TokenCache, TokenStyle};
use rowdiff_core::view::DiffView;
use std::sync::Arc;
use std::time::Duration;

const EXAMPLE: &str = "\
diff --git a/src/lib.rs b/src/lib.rs
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -10,2 +10,3 @@
 a
-b
+b2
+c
";

const LONG_LINE: &str = "\
diff --git a/notes.txt b/notes.txt
new file mode 100644
--- /dev/null
+++ b/notes.txt
@@ -0,0 +1 @@
+hello wonderful world
";

fn make_view(diff: &str, layout: Layout, column_width: usize, wrap: bool) -> DiffView {
    let model = Arc::new(DiffModel::new(parse_diff(diff).expect("parse")));
    DiffView::new(model, layout, column_width, wrap)
}

fn render_buffer(ctx: &RenderContext<'_>, width: u16, height: u16) -> Buffer {
    let backend = TestBackend::new(width, height);
    let mut terminal = Terminal::new(backend).expect("terminal");
    terminal
        .draw(|frame| {
            let area = frame.area();
            draw(frame, area, ctx);
        })
        .expect("draw");
    terminal.backend().buffer().clone()
}

fn buffer_text(buf: &Buffer) -> Vec<String> {
    let mut lines = Vec::new();
    for y in 0..buf.area.height {
        let mut line = String::new();
        for x in 0..buf.area.width {
            line.push_str(buf[(x, y)].symbol());
        }
        lines.push(line.trim_end().to_string());
    }
    lines
}

#[test]
fn test_unified_render() {
    let view = make_view(EXAMPLE, Layout::Unified, 28, false);
    let ctx = RenderContext {
        view: &view,
        tokens: None,
        scroll_top: 0,
    };
    let buf = render_buffer(&ctx, 40, 6);
    assert_eq!(
        buffer_text(&buf),
        vec![
            "src/lib.rs  +2 -1",
            "@@ -10,2 +10,3 @@",
            "  10   10   a",
            "  11      - b",
            "       11 + b2",
            "       12 + c",
        ]
    );
}

#[test]
fn test_split_render() {
    let view = make_view(EXAMPLE, Layout::Split, 13, false);
    let ctx = RenderContext {
        view: &view,
        tokens: None,
        scroll_top: 0,
    };
    let width = render_width(Layout::Split, 13) as u16;
    assert_eq!(width, 41);
    let buf = render_buffer(&ctx, width, 5);
    assert_eq!(
        buffer_text(&buf),
        vec![
            "src/lib.rs  +2 -1",
            "@@ -10,2 +10,3 @@",
            "  10   a            │  10   a",
            "  11 - b            │  11 + b2",
            "                    │  12 + c",
        ]
    );
}

#[test]
fn test_split_word_diff_emphasis() {
    let view = make_view(EXAMPLE, Layout::Split, 13, false);
    let ctx = RenderContext {
        view: &view,
        tokens: None,
        scroll_top: 0,
    };
    let buf = render_buffer(&ctx, 41, 5);
    // "b" on the left, "b2" on the right
    assert_eq!(buf[(7, 3)].symbol(), "b");
    assert_eq!(buf[(7, 3)].bg, Color::Rgb(110, 36, 40));
    assert_eq!(buf[(29, 3)].symbol(), "2");
    assert_eq!(buf[(29, 3)].bg, Color::Rgb(36, 92, 48));
    // Context carries no emphasis
    assert_eq!(buf[(7, 2)].bg, Color::Reset);
}

#[test]
fn test_wrapped_continuation_has_blank_gutter() {
    let view = make_view(LONG_LINE, Layout::Unified, 8, true);
    let ctx = RenderContext {
        view: &view,
        tokens: None,
        scroll_top: 0,
    };
    let width = render_width(Layout::Unified, 8);
    assert_eq!(
        plain_lines(&ctx, width, 10),
        vec![
            "notes.txt (new)  +1 -0",
            "@@ -0,0 +1 @@",
            "        1 + hello wo",
            "            nderful",
            "            world",
        ]
    );
}

#[test]
fn test_truncates_without_wrap() {
    let view = make_view(LONG_LINE, Layout::Unified, 8, false);
    let ctx = RenderContext {
        view: &view,
        tokens: None,
        scroll_top: 2,
    };
    let width = render_width(Layout::Unified, 8);
    assert_eq!(plain_lines(&ctx, width, 1), vec!["        1 + hello wo"]);
}

#[test]
fn test_scroll_past_end_is_clamped() {
    let view = make_view(EXAMPLE, Layout::Unified, 28, false);
    let ctx = RenderContext {
        view: &view,
        tokens: None,
        scroll_top: 1_000,
    };
    let lines = plain_lines(&ctx, 40, 2);
    assert_eq!(lines, vec!["       11 + b2", "       12 + c"]);
}

struct Teal;

impl Highlighter for Teal {
    fn highlight_line(&self, content: &str, _language: &str) -> Option<Vec<Token>> {
        Some(vec![Token {
            text: content.to_string(),
            style: TokenStyle {
                fg: Some(Rgb { r: 0, g: 128, b: 128 }),
                ..TokenStyle::default()
            },
        }])
    }
}

#[test]
fn test_refined_tokens_color_content() {
    let view = make_view(EXAMPLE, Layout::Unified, 28, false);
    let cache = TokenCache::new(Arc::new(Teal));
    let ctx = RenderContext {
        view: &view,
        tokens: Some(&cache),
        scroll_top: 0,
    };

    // First frame is plain; the context line keeps the default color
    let buf = render_buffer(&ctx, 40, 6);
    assert_eq!(buf[(12, 2)].symbol(), "a");
    assert_eq!(buf[(12, 2)].fg, Color::Reset);

    assert!(cache.wait_idle(Duration::from_secs(5)));
    let buf = render_buffer(&ctx, 40, 6);
    assert_eq!(buf[(12, 2)].fg, Color::Rgb(0, 128, 128));
    // Word-diff emphasis survives on top of syntax colors
    assert_eq!(buf[(12, 4)].fg, Color::Rgb(0, 128, 128));
    assert_eq!(buf[(12, 4)].bg, Color::Rgb(36, 92, 48));
}
