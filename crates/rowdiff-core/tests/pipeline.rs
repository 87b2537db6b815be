//! End-to-end checks: diff text in, visible lines out

use rowdiff_core::fetch::{DiffInput, DiffSource, FetchError, FetchKey, FetchWorker, ModelStore};
use rowdiff_core::flatten::{flatten, Layout, Row};
use rowdiff_core::model::{ChangeKind, DiffModel};
use rowdiff_core::parse::parse_diff;
use rowdiff_core::tokens::{language_for_path, Highlighter, Token, TokenCache, TokenStyle};
use rowdiff_core::view::DiffView;
use rowdiff_core::word::SegmentKind;
use rowdiff_core::wrap::wrap;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const EXAMPLE: &str = "@@ -10,3 +10,4 @@\n a\n-b\n+b2\n+c\n";

const RENAME: &str = "\
diff --git a/src/old_name.rs b/src/new_name.rs
similarity index 90%
rename from src/old_name.rs
rename to src/new_name.rs
index 1111111..2222222 100644
--- a/src/old_name.rs
+++ b/src/new_name.rs
@@ -1,3 +1,3 @@ fn main() {
 fn main() {
-    println!(\"hello\");
+    println!(\"hello, world\");
 }
diff --git a/docs/moved.md b/docs/renamed.md
similarity index 100%
rename from docs/moved.md
rename to docs/renamed.md
";

#[test]
fn example_line_numbers_and_split_rows() {
    let files = parse_diff(EXAMPLE).unwrap();
    let lines = &files[0].hunks[0].lines;
    let old: Vec<Option<usize>> = lines.iter().map(|l| l.old_line).collect();
    let new: Vec<Option<usize>> = lines.iter().map(|l| l.new_line).collect();
    assert_eq!(old, vec![Some(10), Some(11), None, None]);
    assert_eq!(new, vec![Some(10), None, Some(11), Some(12)]);

    let rows = flatten(&files, Layout::Split);
    let pairs: Vec<(Option<&str>, Option<&str>)> = rows
        .iter()
        .filter_map(Row::as_content)
        .map(|r| {
            (
                r.left.as_ref().map(|l| l.content.as_str()),
                r.right.as_ref().map(|l| l.content.as_str()),
            )
        })
        .collect();
    assert_eq!(
        pairs,
        vec![
            (Some("a"), Some("a")),
            (Some("b"), Some("b2")),
            (None, Some("c")),
        ]
    );
}

#[test]
fn renames_flow_through_to_headers() {
    let model = Arc::new(DiffModel::new(parse_diff(RENAME).unwrap()));
    assert_eq!(model.files()[0].change_kind, ChangeKind::RenameChanged);
    assert_eq!(model.files()[1].change_kind, ChangeKind::RenamePure);

    let view = DiffView::new(model, Layout::Unified, 40, true);
    let headers: Vec<&Row> = view
        .rows()
        .iter()
        .filter(|r| matches!(r, Row::FileHeader(_)))
        .collect();
    assert_eq!(headers.len(), 2);
    match headers[0] {
        Row::FileHeader(h) => {
            assert_eq!(h.prev_name.as_deref(), Some("src/old_name.rs"));
            assert_eq!((h.insertions, h.deletions), (1, 1));
        }
        _ => unreachable!(),
    }
}

#[test]
fn wrapped_window_through_view() {
    let model = Arc::new(DiffModel::new(parse_diff(RENAME).unwrap()));
    let view = DiffView::new(model, Layout::Split, 10, true);
    let slice = view.visible(0, view.total_rows());
    assert_eq!(slice.lines.len(), view.total_rows());

    // The changed println pair wraps on both sides; its word diff survives the clipping
    let added: String = slice
        .lines
        .iter()
        .filter_map(|l| l.right.as_ref())
        .flat_map(|side| side.segments.iter())
        .filter(|s| s.kind == SegmentKind::Added)
        .map(|s| s.text)
        .collect();
    assert_eq!(added, ", world");
}

struct Upper;

impl Highlighter for Upper {
    fn highlight_line(&self, content: &str, _language: &str) -> Option<Vec<Token>> {
        Some(vec![Token {
            text: content.to_string(),
            style: TokenStyle {
                bold: true,
                ..TokenStyle::default()
            },
        }])
    }
}

#[test]
fn visible_lines_get_refined_tokens() {
    let model = Arc::new(DiffModel::new(parse_diff(RENAME).unwrap()));
    let view = DiffView::new(model.clone(), Layout::Unified, 80, false);
    let cache = TokenCache::new(Arc::new(Upper));

    let language = language_for_path(&model.files()[0].name);
    assert_eq!(language, "rs");

    let slice = view.visible(0, 10);
    let texts: Vec<&str> = slice
        .lines
        .iter()
        .filter_map(|l| l.left.as_ref().or(l.right.as_ref()))
        .map(|side| side.text)
        .collect();
    for text in &texts {
        assert!(!cache.tokens_for(text, &language)[0].style.bold);
    }

    let before = cache.version();
    assert!(cache.wait_idle(Duration::from_secs(5)));
    assert!(cache.version() > before);
    for text in &texts {
        assert!(cache.tokens_for(text, &language)[0].style.bold);
    }
}

struct Fixed(&'static str);

impl DiffSource for Fixed {
    fn load(&self, _key: &FetchKey) -> Result<DiffInput, FetchError> {
        Ok(DiffInput::from_diff(self.0))
    }
}

#[test]
fn fetched_model_drives_view() {
    let worker = FetchWorker::spawn(Arc::new(Fixed(RENAME))).unwrap();
    let mut store = ModelStore::new();
    worker
        .request(store.begin(FetchKey::new("HEAD", ["src/new_name.rs"])))
        .unwrap();
    let outcome = worker.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
    assert!(store.apply(outcome).unwrap());

    let model = store.model().unwrap().clone();
    assert_eq!(model.file_count(), 1);
    let mut view = DiffView::new(model, Layout::Split, 80, false);
    assert!(view.next_hunk().is_none());
    assert_eq!(view.current_hunk(), view.model().hunk_ids().next());
}

#[test]
fn rows_and_slices_serialize_to_tagged_json() {
    let files = parse_diff(EXAMPLE).unwrap();
    let rows = flatten(&files, Layout::Split);
    let tags: Vec<serde_json::Value> = rows
        .iter()
        .map(|r| serde_json::to_value(r).unwrap()["type"].clone())
        .collect();
    assert_eq!(
        tags,
        vec![
            json!("file_header"),
            json!("hunk_header"),
            json!("content"),
            json!("content"),
            json!("content"),
        ]
    );
    assert_eq!(serde_json::to_value(&rows[2]).unwrap()["left"]["kind"], "context");

    let wrapped = wrap(&rows, 80, false);
    assert_eq!(
        serde_json::to_value(wrapped[4]).unwrap(),
        json!({
            "row": 4,
            "sub_row": 0,
            "left": {"start": null, "length": 0},
            "right": {"start": 0, "length": 1},
        })
    );

    let view = DiffView::new(Arc::new(DiffModel::new(files)), Layout::Split, 80, false);
    let slice = serde_json::to_value(view.visible(0, 5)).unwrap();
    assert_eq!(slice["total"], 5);
    assert!(slice["lines"][0].get("left").is_none());
    let right = &slice["lines"][3]["right"];
    assert_eq!(right["text"], "b2");
    assert!(right.get("content").is_none());
    assert_eq!(right["segments"][0]["kind"], "added");
    assert_eq!(slice["lines"][3]["prefix"]["old_number"], 11);
}
