//! rowdiff-core: the diff-rendering pipeline
//!
//! Raw unified diff text goes through a fixed sequence of stages:
//!
//! 1. [`parse`] turns text into a [`DiffModel`] of files, hunks, and lines.
//! 2. [`flatten`] lays the model out as unified or split display rows, with [`word`] diffs on
//!    paired lines.
//! 3. [`wrap`] splits rows into visual sub-rows at a column budget.
//! 4. [`virtualize`] picks the sub-rows that intersect the viewport.
//!
//! [`view::DiffView`] memoizes those stages for a host and keeps navigation keyed by ids.
//! Syntax colors come from [`tokens::TokenCache`], model fetches go through [`fetch`].

pub mod config;
pub mod fetch;
pub mod flatten;
pub mod metadata;
pub mod model;
pub mod parse;
pub mod tokens;
pub mod view;
pub mod virtualize;
pub mod word;
pub mod wrap;

pub use config::RenderConfig;
pub use fetch::{DiffInput, DiffSource, FetchError, FetchKey, FetchWorker, ModelStore};
pub use flatten::{flatten, Layout, Row};
pub use model::{ChangeKind, DiffModel, File, FileId, Hunk, HunkId, Line, LineKind};
pub use parse::{parse_diff, ParseError};
pub use tokens::{Highlighter, Token, TokenCache};
pub use view::{DiffView, ViewLine, VisibleSlice};
pub use virtualize::{visible_range, VisibleRange};
pub use word::{diff_words, SegmentKind, WordDiff, WordDiffSegment};
pub use wrap::{wrap, WrappedRow};
