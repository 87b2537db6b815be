//! Intra-line (word level) diff between a paired deletion and addition

use rustc_hash::FxHashMap;
use serde::Serialize;
use unicode_segmentation::UnicodeSegmentation;

/// Largest LCS table (in cells) computed before degrading to whole-line highlighting
const MAX_TABLE_CELLS: usize = 1 << 20;

/// How a segment relates to the other side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Unchanged,
    Added,
    Removed,
}

/// A run of text with a single highlight kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordDiffSegment {
    pub text: String,
    pub kind: SegmentKind,
}

impl WordDiffSegment {
    fn new(text: &str, kind: SegmentKind) -> Self {
        Self {
            text: text.to_string(),
            kind,
        }
    }
}

/// Segments for both sides of a paired line
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct WordDiff {
    pub old: Vec<WordDiffSegment>,
    pub new: Vec<WordDiffSegment>,
}

impl WordDiff {
    /// True when nothing differs between the two sides
    pub fn is_unchanged(&self) -> bool {
        self.old
            .iter()
            .chain(self.new.iter())
            .all(|s| s.kind == SegmentKind::Unchanged)
    }
}

/// Split a line into word, punctuation, and whitespace runs
pub fn tokenize(line: &str) -> Vec<&str> {
    line.split_word_bounds().collect()
}

/// Compute word-level segments for a pair of lines
///
/// Alignment is the longest common subsequence over tokens. When several alignments are equally
/// long the earliest match wins, so unchanged input always renders the same way.
pub fn diff_words(old: &str, new: &str) -> WordDiff {
    if old == new {
        let segments = if old.is_empty() {
            Vec::new()
        } else {
            vec![WordDiffSegment::new(old, SegmentKind::Unchanged)]
        };
        return WordDiff {
            old: segments.clone(),
            new: segments,
        };
    }

    let old_tokens = tokenize(old);
    let new_tokens = tokenize(new);

    // Intern tokens so the table compares integers
    let mut ids: FxHashMap<&str, u32> = FxHashMap::default();
    let a = intern(&mut ids, &old_tokens);
    let b = intern(&mut ids, &new_tokens);

    let prefix = a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();

    let a_mid = &a[prefix..a.len() - suffix];
    let b_mid = &b[prefix..b.len() - suffix];

    let mut builder = SegmentBuilder::default();
    for token in &old_tokens[..prefix] {
        builder.both(token);
    }

    let cells = (a_mid.len() + 1).saturating_mul(b_mid.len() + 1);
    if cells > MAX_TABLE_CELLS {
        tracing::debug!(cells, "word diff table too large, using whole-line highlight");
        for token in &old_tokens[prefix..a.len() - suffix] {
            builder.old_only(token, SegmentKind::Removed);
        }
        for token in &new_tokens[prefix..b.len() - suffix] {
            builder.new_only(token, SegmentKind::Added);
        }
    } else {
        let mid_old = &old_tokens[prefix..a.len() - suffix];
        let mid_new = &new_tokens[prefix..b.len() - suffix];
        for op in align(a_mid, b_mid) {
            match op {
                Op::Equal(i, _) => builder.both(mid_old[i]),
                Op::Remove(i) => builder.old_only(mid_old[i], SegmentKind::Removed),
                Op::Add(j) => builder.new_only(mid_new[j], SegmentKind::Added),
            }
        }
    }

    for token in &old_tokens[a.len() - suffix..] {
        builder.both(token);
    }

    builder.finish()
}

fn intern<'a>(ids: &mut FxHashMap<&'a str, u32>, tokens: &[&'a str]) -> Vec<u32> {
    tokens
        .iter()
        .map(|t| {
            let next = ids.len() as u32;
            *ids.entry(*t).or_insert(next)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal(usize, usize),
    Remove(usize),
    Add(usize),
}

/// LCS alignment via a suffix-length table, walked front to back
fn align(a: &[u32], b: &[u32]) -> Vec<Op> {
    let n = a.len();
    let m = b.len();
    let width = m + 1;
    // table[i * width + j] = LCS length of a[i..] and b[j..]
    let mut table = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i * width + j] = if a[i] == b[j] {
                table[(i + 1) * width + j + 1] + 1
            } else {
                table[(i + 1) * width + j].max(table[i * width + j + 1])
            };
        }
    }

    let mut ops = Vec::with_capacity(n + m);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] {
            ops.push(Op::Equal(i, j));
            i += 1;
            j += 1;
        } else if table[(i + 1) * width + j] >= table[i * width + j + 1] {
            ops.push(Op::Remove(i));
            i += 1;
        } else {
            ops.push(Op::Add(j));
            j += 1;
        }
    }
    ops.extend((i..n).map(Op::Remove));
    ops.extend((j..m).map(Op::Add));
    ops
}

/// Accumulates tokens into merged per-side segments
#[derive(Default)]
struct SegmentBuilder {
    old: Vec<WordDiffSegment>,
    new: Vec<WordDiffSegment>,
}

impl SegmentBuilder {
    fn both(&mut self, token: &str) {
        push_merged(&mut self.old, token, SegmentKind::Unchanged);
        push_merged(&mut self.new, token, SegmentKind::Unchanged);
    }

    fn old_only(&mut self, token: &str, kind: SegmentKind) {
        push_merged(&mut self.old, token, kind);
    }

    fn new_only(&mut self, token: &str, kind: SegmentKind) {
        push_merged(&mut self.new, token, kind);
    }

    fn finish(self) -> WordDiff {
        WordDiff {
            old: self.old,
            new: self.new,
        }
    }
}

fn push_merged(segments: &mut Vec<WordDiffSegment>, token: &str, kind: SegmentKind) {
    match segments.last_mut() {
        Some(last) if last.kind == kind => last.text.push_str(token),
        _ => segments.push(WordDiffSegment::new(token, kind)),
    }
}

/// Concatenate a side's segments back into its line
pub fn join_segments(segments: &[WordDiffSegment]) -> String {
    segments.iter().map(|s| s.text.as_str()).collect()
}
