//! Property-based invariant tests for the rendering pipeline.
//!
//! 1. Parsed addition/deletion totals equal the counted lines.
//! 2. Line numbers never decrease within a hunk, per side.
//! 3. Split pairing of m deletions then n additions yields max(m, n) rows, min(m, n) with word diff.
//! 4. diff_words(x, x) is all unchanged; each side's segments rebuild its line.
//! 5. Wrapped slices rebuild the stripped content; wrap off yields one sub-row per row.
//! 6. visible_range stays within bounds and paging down never moves start back.

use proptest::prelude::*;
use rowdiff_core::flatten::{flatten, ContentRow, Layout, Row};
use rowdiff_core::model::{FileId, HunkId, Line, LineKind};
use rowdiff_core::parse::parse_diff;
use rowdiff_core::virtualize::visible_range;
use rowdiff_core::word::{diff_words, join_segments, SegmentKind};
use rowdiff_core::wrap::{strip_line_ending, wrap};

// ── Helpers ─────────────────────────────────────────────────────────────

fn line_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 _(){};=.]{0,16}"
}

/// (context, deletions, additions) runs making up one hunk
fn blocks() -> impl Strategy<Value = Vec<(Vec<String>, Vec<String>, Vec<String>)>> {
    proptest::collection::vec(
        (
            proptest::collection::vec(line_text(), 0..3),
            proptest::collection::vec(line_text(), 0..5),
            proptest::collection::vec(line_text(), 0..5),
        ),
        1..6,
    )
}

fn render_hunk(start: usize, blocks: &[(Vec<String>, Vec<String>, Vec<String>)]) -> String {
    let mut body = String::new();
    let mut old_count = 0;
    let mut new_count = 0;
    for (context, deletions, additions) in blocks {
        for line in context {
            body.push_str(&format!(" {line}\n"));
        }
        for line in deletions {
            body.push_str(&format!("-{line}\n"));
        }
        for line in additions {
            body.push_str(&format!("+{line}\n"));
        }
        old_count += context.len() + deletions.len();
        new_count += context.len() + additions.len();
    }
    format!("@@ -{start},{old_count} +{start},{new_count} @@\n{body}")
}

fn content_row(left: Option<&str>, right: Option<&str>) -> Row {
    Row::Content(ContentRow {
        file_id: FileId(0),
        hunk_id: HunkId(0),
        left: left.map(|s| Line::deletion(s, 1)),
        right: right.map(|s| Line::addition(s, 1)),
        left_word_diff: None,
        right_word_diff: None,
    })
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Totals equal counted lines
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn totals_match_counted_lines(hunks in proptest::collection::vec(blocks(), 1..4)) {
        let mut diff = String::from("--- a/f.rs\n+++ b/f.rs\n");
        let mut expected_adds = 0;
        let mut expected_dels = 0;
        for (i, hunk) in hunks.iter().enumerate() {
            diff.push_str(&render_hunk(1 + i * 100, hunk));
            for (_, deletions, additions) in hunk {
                expected_dels += deletions.len();
                expected_adds += additions.len();
            }
        }

        let files = parse_diff(&diff).unwrap();
        prop_assert_eq!(files.len(), 1);
        let file = &files[0];
        prop_assert_eq!(file.additions, expected_adds);
        prop_assert_eq!(file.deletions, expected_dels);
        for hunk in &file.hunks {
            let (old, new) = hunk.counted_range();
            prop_assert_eq!((old, new), (hunk.range.old_count, hunk.range.new_count));
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Line numbers never decrease
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn line_numbers_monotonic(hunk in blocks(), start in 1usize..10_000) {
        let files = parse_diff(&render_hunk(start, &hunk)).unwrap();
        let lines = &files[0].hunks[0].lines;

        let old: Vec<usize> = lines.iter().filter_map(|l| l.old_line).collect();
        let new: Vec<usize> = lines.iter().filter_map(|l| l.new_line).collect();
        prop_assert!(old.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(new.windows(2).all(|w| w[0] < w[1]));

        for line in lines {
            match line.kind {
                LineKind::Context => {
                    prop_assert!(line.old_line.is_some() && line.new_line.is_some())
                }
                LineKind::Addition => {
                    prop_assert!(line.old_line.is_none() && line.new_line.is_some())
                }
                LineKind::Deletion => {
                    prop_assert!(line.old_line.is_some() && line.new_line.is_none())
                }
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Split pairing
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn split_pairing_counts(
        deletions in proptest::collection::vec(line_text(), 0..8),
        additions in proptest::collection::vec(line_text(), 0..8),
    ) {
        let hunk = vec![(Vec::new(), deletions.clone(), additions.clone())];
        let files = parse_diff(&render_hunk(1, &hunk)).unwrap();
        let rows = flatten(&files, Layout::Split);
        let content: Vec<&ContentRow> = rows.iter().filter_map(Row::as_content).collect();

        let m = deletions.len();
        let n = additions.len();
        prop_assert_eq!(content.len(), m.max(n));
        let with_diff = content
            .iter()
            .filter(|r| r.left_word_diff.is_some() && r.right_word_diff.is_some())
            .count();
        prop_assert_eq!(with_diff, m.min(n));

        let unified = flatten(&files, Layout::Unified);
        prop_assert_eq!(unified.iter().filter_map(Row::as_content).count(), m + n);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Word diff
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn identical_lines_all_unchanged(x in "\\PC{0,40}") {
        let diff = diff_words(&x, &x);
        prop_assert!(diff.is_unchanged());
        prop_assert_eq!(join_segments(&diff.old), x.clone());
        prop_assert_eq!(join_segments(&diff.new), x);
    }

    #[test]
    fn segments_are_lossless(old in "\\PC{0,40}", new in "\\PC{0,40}") {
        let diff = diff_words(&old, &new);
        prop_assert_eq!(join_segments(&diff.old), old);
        prop_assert_eq!(join_segments(&diff.new), new);
        prop_assert!(diff.old.iter().all(|s| s.kind != SegmentKind::Added));
        prop_assert!(diff.new.iter().all(|s| s.kind != SegmentKind::Removed));
    }

    #[test]
    fn word_diff_deterministic(old in "[a-c ]{0,20}", new in "[a-c ]{0,20}") {
        prop_assert_eq!(diff_words(&old, &new), diff_words(&old, &new));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Wrapping
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn wrapped_slices_rebuild_content(
        left in "\\PC{0,60}",
        right in "\\PC{0,60}",
        width in 1usize..20,
    ) {
        let rows = vec![content_row(Some(&left), Some(&right))];
        let wrapped = wrap(&rows, width, true);

        let rebuilt_left: String = wrapped.iter().map(|w| w.left.slice(&left)).collect();
        let rebuilt_right: String = wrapped.iter().map(|w| w.right.slice(&right)).collect();
        prop_assert_eq!(rebuilt_left.as_str(), strip_line_ending(&left));
        prop_assert_eq!(rebuilt_right.as_str(), strip_line_ending(&right));

        for w in &wrapped {
            prop_assert!(w.left.length <= width && w.right.length <= width);
        }
    }

    #[test]
    fn wrap_off_one_sub_row(
        texts in proptest::collection::vec(
            (proptest::option::of(line_text()), proptest::option::of(line_text())),
            0..20,
        ),
        width in 1usize..20,
    ) {
        let rows: Vec<Row> = texts
            .iter()
            .map(|(l, r)| content_row(l.as_deref(), r.as_deref()))
            .collect();
        let wrapped = wrap(&rows, width, false);
        prop_assert_eq!(wrapped.len(), rows.len());
        for (w, (l, r)) in wrapped.iter().zip(texts.iter()) {
            prop_assert_eq!(w.left.start.is_some(), l.is_some());
            prop_assert_eq!(w.right.start.is_some(), r.is_some());
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Virtualization
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn visible_range_in_bounds(
        scroll_top in 0usize..20_000,
        viewport in 0usize..500,
        total in 0usize..10_000,
    ) {
        let range = visible_range(scroll_top, viewport, total);
        prop_assert!(range.start <= range.end);
        prop_assert!(range.end <= total);
        prop_assert!(range.len() <= viewport);
        let covered =
            range.leading_placeholders() + range.len() + range.trailing_placeholders(total);
        prop_assert_eq!(covered, total);
    }

    #[test]
    fn paging_down_never_moves_back(viewport in 1usize..50, total in 0usize..2_000) {
        let mut last = 0;
        let mut top = 0;
        while top <= total + viewport {
            let range = visible_range(top, viewport, total);
            prop_assert!(range.start >= last);
            last = range.start;
            top += viewport;
        }
    }
}
