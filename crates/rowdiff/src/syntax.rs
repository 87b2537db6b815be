//! Syntax highlighting helpers (syntect-backed)

use rowdiff_core::tokens::{Highlighter, Rgb, Token, TokenStyle};
use syntect::{
    easy::HighlightLines,
    highlighting::{FontStyle, Style as SynStyle, Theme, ThemeSet},
    parsing::{SyntaxReference, SyntaxSet},
};

pub const DEFAULT_THEME: &str = "base16-ocean.dark";

/// Colors single lines with syntect's bundled syntaxes and themes
///
/// Lines are highlighted without the parse state of the lines before them, so constructs that
/// span lines (block comments, raw strings) may be colored as plain code.
pub struct SyntectHighlighter {
    syntax_set: SyntaxSet,
    theme: Theme,
}

impl SyntectHighlighter {
    pub fn new(theme_name: &str) -> Self {
        let mut themes = ThemeSet::load_defaults().themes;
        let theme = match themes.remove(theme_name) {
            Some(theme) => theme,
            None => {
                tracing::warn!(theme = theme_name, "unknown syntax theme, using {DEFAULT_THEME}");
                themes.remove(DEFAULT_THEME).unwrap_or_default()
            }
        };
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme,
        }
    }

    fn syntax_for(&self, language: &str) -> Option<&SyntaxReference> {
        self.syntax_set
            .find_syntax_by_extension(language)
            .or_else(|| self.syntax_set.find_syntax_by_token(language))
    }
}

impl Highlighter for SyntectHighlighter {
    fn highlight_line(&self, content: &str, language: &str) -> Option<Vec<Token>> {
        let syntax = self.syntax_for(language)?;
        let mut highlighter = HighlightLines::new(syntax, &self.theme);
        let line = format!("{content}\n");
        let ranges = match highlighter.highlight_line(&line, &self.syntax_set) {
            Ok(ranges) => ranges,
            Err(err) => {
                tracing::debug!(language, %err, "syntect failed on line");
                return None;
            }
        };

        let mut tokens = Vec::with_capacity(ranges.len());
        for (style, text) in ranges {
            let text = text.strip_suffix('\n').unwrap_or(text);
            if text.is_empty() {
                continue;
            }
            tokens.push(Token {
                text: text.to_string(),
                style: syntect_style_to_token(style),
            });
        }
        Some(tokens)
    }
}

fn syntect_style_to_token(style: SynStyle) -> TokenStyle {
    let fg = style.foreground;
    TokenStyle {
        fg: Some(Rgb {
            r: fg.r,
            g: fg.g,
            b: fg.b,
        }),
        bold: style.font_style.contains(FontStyle::BOLD),
        italic: style.font_style.contains(FontStyle::ITALIC),
        underline: style.font_style.contains(FontStyle::UNDERLINE),
    }
}
