//! Integration tests for walkrs
//!
//! Each test builds a small tree under a temporary directory and walks it
//! through the public API.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::{tempdir, TempDir};
use walkrs::{
    decode_batch, walk, walk_with_callback, BatchEncoder, ConfigError, ErrorItem, WalkItem,
    WalkRequest, WalkStats, WalkerError,
};

/// Create `files` (relative paths) under a fresh temporary directory
fn tree(files: &[&str]) -> TempDir {
    let dir = tempdir().unwrap();
    for rel in files {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"x").unwrap();
    }
    dir
}

fn root(dir: &TempDir) -> String {
    dir.path().to_str().unwrap().to_string()
}

fn abs(dir: &TempDir, rel: &str) -> String {
    dir.path().join(rel).to_str().unwrap().to_string()
}

fn expected(dir: &TempDir, rels: &[&str]) -> BTreeSet<String> {
    rels.iter().map(|rel| abs(dir, rel)).collect()
}

struct Collected {
    entries: Vec<String>,
    errors: Vec<ErrorItem>,
    batches: Vec<usize>,
    stats: WalkStats,
}

impl Collected {
    fn entry_set(&self) -> BTreeSet<String> {
        self.entries.iter().cloned().collect()
    }
}

fn collect(request: WalkRequest) -> Collected {
    let mut stream = walk(request).unwrap();
    let mut entries = Vec::new();
    let mut errors = Vec::new();
    let mut batches = Vec::new();

    while let Some(batch) = stream.next_batch() {
        batches.push(batch.len());
        for item in batch {
            match item {
                WalkItem::Entry(entry) => entries.push(entry.path),
                WalkItem::Error(err) => errors.push(err),
            }
        }
    }

    let stats = stream.finish().unwrap();
    Collected {
        entries,
        errors,
        batches,
        stats,
    }
}

const PHOTOS: &[&str] = &[
    "a.jpg",
    "b.png",
    "notes.txt",
    "2023/c.jpg",
    "2023/d.JPG",
    "2023/raw/e.jpg",
    "2023/raw/deep/f.jpg",
    "2024/g.tif",
    "2024/image.TIF",
    "2024/h.tiff",
];

#[test]
fn test_empty_paths_terminates_immediately() {
    let mut stream = walk(WalkRequest::default()).unwrap();
    assert!(stream.next_batch().is_none());
    let stats = stream.finish().unwrap();
    assert_eq!(stats.files, 0);
    assert_eq!(stats.batches, 0);
    assert!(stats.completed);
}

#[test]
fn test_unfiltered_walk_finds_every_file() {
    let dir = tree(PHOTOS);
    let result = collect(WalkRequest::new([root(&dir)]));

    assert_eq!(result.entry_set(), expected(&dir, PHOTOS));
    // Exactly once
    assert_eq!(result.entries.len(), PHOTOS.len());
    assert!(result.errors.is_empty());
    assert!(result.stats.completed);
    assert_eq!(result.stats.files, PHOTOS.len() as u64);
}

#[test]
fn test_trailing_slash_is_insignificant() {
    let dir = tree(PHOTOS);
    let plain = collect(WalkRequest::new([root(&dir)]));
    let slashed = collect(WalkRequest::new([format!("{}/", root(&dir))]));
    assert_eq!(plain.entry_set(), slashed.entry_set());
}

#[test]
fn test_exclusion_is_case_insensitive() {
    let dir = tree(PHOTOS);
    let result = collect(WalkRequest::new([root(&dir)]).exclude(["**/*.tif"]));

    let set = result.entry_set();
    assert!(!set.contains(&abs(&dir, "2024/image.TIF")));
    assert!(!set.contains(&abs(&dir, "2024/g.tif")));
    assert!(set.contains(&abs(&dir, "2024/h.tiff")));
    assert_eq!(set.len(), PHOTOS.len() - 2);
}

#[test]
fn test_directory_exclusion_prunes_subtree() {
    let dir = tree(PHOTOS);
    let result = collect(
        WalkRequest::new([root(&dir)])
            .exclude(["**/raw/**"])
            .extensions([".jpg"]),
    );

    assert_eq!(
        result.entry_set(),
        expected(&dir, &["a.jpg", "2023/c.jpg", "2023/d.JPG"])
    );
    // root, 2023 and 2024 are listed; raw and raw/deep never are
    assert_eq!(result.stats.dirs, 3);
}

#[test]
fn test_bare_name_pattern_matches_at_any_depth() {
    let dir = tree(PHOTOS);
    let result = collect(WalkRequest::new([root(&dir)]).exclude(["raw", "*.txt"]));

    let set = result.entry_set();
    assert!(!set.contains(&abs(&dir, "notes.txt")));
    assert!(!set.contains(&abs(&dir, "2023/raw/e.jpg")));
    assert!(!set.contains(&abs(&dir, "2023/raw/deep/f.jpg")));
    assert!(set.contains(&abs(&dir, "2023/c.jpg")));
}

#[test]
fn test_extension_filter_is_case_insensitive() {
    let dir = tree(PHOTOS);
    let result = collect(WalkRequest::new([root(&dir)]).extensions([".jpg"]));

    assert_eq!(
        result.entry_set(),
        expected(
            &dir,
            &[
                "a.jpg",
                "2023/c.jpg",
                "2023/d.JPG",
                "2023/raw/e.jpg",
                "2023/raw/deep/f.jpg"
            ]
        )
    );
}

#[test]
fn test_extension_without_leading_dot() {
    let dir = tree(PHOTOS);
    let dotted = collect(WalkRequest::new([root(&dir)]).extensions([".PNG"]));
    let bare = collect(WalkRequest::new([root(&dir)]).extensions(["png"]));
    assert_eq!(dotted.entry_set(), expected(&dir, &["b.png"]));
    assert_eq!(dotted.entry_set(), bare.entry_set());
}

#[test]
fn test_multiple_roots() {
    let dir = tree(PHOTOS);
    let result = collect(WalkRequest::new([abs(&dir, "2023"), abs(&dir, "2024")]));

    let mut rels: Vec<&str> = PHOTOS
        .iter()
        .copied()
        .filter(|p| p.starts_with("2023/") || p.starts_with("2024/"))
        .collect();
    rels.sort();
    assert_eq!(result.entry_set(), expected(&dir, &rels));
}

#[test]
fn test_nested_and_duplicate_roots_emit_once() {
    let dir = tree(PHOTOS);
    let result = collect(WalkRequest::new([
        root(&dir),
        abs(&dir, "2023"),
        format!("{}/", root(&dir)),
    ]));

    assert_eq!(result.entries.len(), PHOTOS.len());
    assert_eq!(result.entry_set(), expected(&dir, PHOTOS));
}

#[test]
fn test_dot_dot_segments_are_normalized() {
    let dir = tree(&["1/x.jpg", "2/y.jpg", "2/sub/z.jpg"]);
    let via_parent = collect(WalkRequest::new([abs(&dir, "1/../2")]));
    let direct = collect(WalkRequest::new([abs(&dir, "2")]));

    assert_eq!(via_parent.entry_set(), direct.entry_set());
    assert_eq!(
        via_parent.entry_set(),
        expected(&dir, &["2/y.jpg", "2/sub/z.jpg"])
    );
}

#[test]
fn test_special_characters_round_trip() {
    let files = [
        "My Photos (2024)/beach day (1).jpg",
        "My Photos (2024)/[draft] & notes #2.txt",
        "Ünïcödé/café.png",
    ];
    let dir = tree(&files);
    let result = collect(WalkRequest::new([root(&dir)]));
    assert_eq!(result.entry_set(), expected(&dir, &files));
}

#[test]
fn test_thread_counts_agree() {
    let mut files = Vec::new();
    for d in 0..8 {
        for f in 0..25 {
            files.push(format!("d{}/sub{}/file{}.dat", d, f % 3, f));
        }
    }
    let refs: Vec<&str> = files.iter().map(|s| s.as_str()).collect();
    let dir = tree(&refs);

    let one = collect(WalkRequest::new([root(&dir)]).threads(1).batch_size(7));
    let two = collect(WalkRequest::new([root(&dir)]).threads(2).batch_size(7));
    let auto = collect(WalkRequest::new([root(&dir)]).threads(0).batch_size(7));

    assert_eq!(one.entry_set(), expected(&dir, &refs));
    assert_eq!(one.entry_set(), two.entry_set());
    assert_eq!(one.entry_set(), auto.entry_set());
    assert_eq!(two.entries.len(), refs.len());
    assert_eq!(auto.entries.len(), refs.len());
}

#[test]
fn test_small_queue_overflows_locally() {
    // Wide tree with a tiny shared queue forces subdirectories onto local stacks
    let mut files = Vec::new();
    for d in 0..40 {
        files.push(format!("wide/d{}/f.txt", d));
    }
    let refs: Vec<&str> = files.iter().map(|s| s.as_str()).collect();
    let dir = tree(&refs);

    let result = collect(WalkRequest::new([root(&dir)]).threads(2).queue_size(1));
    assert_eq!(result.entry_set(), expected(&dir, &refs));
    assert_eq!(result.entries.len(), refs.len());

    // Every listed directory went through the shared queue or a local stack
    let stats = &result.stats;
    assert_eq!(stats.dirs, 42);
    assert_eq!(stats.dirs_queued + stats.backpressure_events, stats.dirs);
    assert!(stats.backpressure_events > 0);
}

#[test]
fn test_single_worker_backpressure_counts() {
    let files: Vec<String> = (0..10).map(|d| format!("d{}/f.txt", d)).collect();
    let refs: Vec<&str> = files.iter().map(|s| s.as_str()).collect();
    let dir = tree(&refs);

    // One worker, shared queue of two: the root and two children are queued
    let result = collect(WalkRequest::new([root(&dir)]).threads(1).queue_size(1));
    assert_eq!(result.entries.len(), refs.len());
    assert_eq!(result.stats.dirs_queued, 3);
    assert_eq!(result.stats.backpressure_events, 8);
}

#[test]
fn test_batches_are_bounded_and_never_empty() {
    let files = ["a.txt", "b.txt", "c.txt", "d.txt", "e.txt"];
    let dir = tree(&files);
    let result = collect(WalkRequest::new([root(&dir)]).threads(1).batch_size(2));

    assert!(result.batches.len() >= 3);
    assert!(result.batches.iter().all(|&len| len > 0 && len <= 2));
    assert_eq!(result.batches.iter().sum::<usize>(), files.len());
    assert_eq!(result.stats.batches, result.batches.len() as u64);
}

#[test]
fn test_push_discipline_matches_pull() {
    let dir = tree(PHOTOS);
    let calls: Arc<Mutex<Vec<Option<Vec<String>>>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);

    let handle = walk_with_callback(
        WalkRequest::new([root(&dir)]).batch_size(3).channel_capacity(1),
        move |batch| {
            let paths = batch.map(|b| {
                assert!(!b.is_empty());
                b.iter()
                    .filter_map(|item| item.path().map(str::to_string))
                    .collect()
            });
            sink.lock().unwrap().push(paths);
        },
    )
    .unwrap();
    let stats = handle.join().unwrap();
    assert!(stats.completed);

    let calls = calls.lock().unwrap();
    // Exactly one terminal call, and it comes last
    assert_eq!(calls.iter().filter(|c| c.is_none()).count(), 1);
    assert!(calls.last().unwrap().is_none());

    let pushed: BTreeSet<String> = calls.iter().flatten().flatten().cloned().collect();
    let pulled = collect(WalkRequest::new([root(&dir)])).entry_set();
    assert_eq!(pushed, pulled);
}

#[test]
fn test_for_each_batch_on_caller_thread() {
    let dir = tree(PHOTOS);
    let mut seen = 0;
    let mut finals = 0;
    let stats = walk(WalkRequest::new([root(&dir)]))
        .unwrap()
        .for_each_batch(|batch| match batch {
            Some(batch) => seen += batch.len(),
            None => finals += 1,
        })
        .unwrap();

    assert_eq!(seen, PHOTOS.len());
    assert_eq!(finals, 1);
    assert_eq!(stats.files, PHOTOS.len() as u64);
}

#[test]
fn test_metadata_timestamps() {
    let dir = tree(&["a.jpg"]);

    let mut with = walk(WalkRequest::new([root(&dir)]).include_metadata(true)).unwrap();
    let batch = with.next_batch().unwrap();
    match &batch[0] {
        WalkItem::Entry(entry) => {
            let modified = entry.modified_at.unwrap();
            let now = walkrs::types::epoch_secs(std::time::SystemTime::now());
            assert!((now - modified).abs() < 3600);
        }
        other => panic!("unexpected item {:?}", other),
    }

    let mut without = walk(WalkRequest::new([root(&dir)])).unwrap();
    let batch = without.next_batch().unwrap();
    match &batch[0] {
        WalkItem::Entry(entry) => {
            assert!(entry.modified_at.is_none());
            assert!(entry.created_at.is_none());
        }
        other => panic!("unexpected item {:?}", other),
    }
}

#[test]
fn test_invalid_pattern_rejected_before_walking() {
    let dir = tree(PHOTOS);
    let result = walk(WalkRequest::new([root(&dir)]).exclude(["**/[unclosed"]));
    match result {
        Err(WalkerError::Config(ConfigError::InvalidExcludePattern { pattern, .. })) => {
            assert_eq!(pattern, "**/[unclosed");
        }
        Err(other) => panic!("unexpected error {}", other),
        Ok(_) => panic!("invalid pattern accepted"),
    }

    let pushed = walk_with_callback(
        WalkRequest::new([root(&dir)]).exclude(["**/[unclosed"]),
        |_| panic!("callback must not run"),
    );
    assert!(pushed.is_err());
}

#[test]
fn test_missing_root_reports_error_and_continues() {
    let dir = tree(&["ok/a.txt"]);
    let missing = abs(&dir, "does-not-exist");
    let result = collect(WalkRequest::new([missing.clone(), abs(&dir, "ok")]));

    assert_eq!(result.entry_set(), expected(&dir, &["ok/a.txt"]));
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].path.as_deref(), Some(missing.as_str()));
    assert!(result.errors[0].message.to_lowercase().contains("not found"));
    assert!(result.stats.completed);
}

#[test]
fn test_file_root_is_emitted() {
    let dir = tree(&["a.jpg", "b.txt"]);
    let result = collect(WalkRequest::new([abs(&dir, "a.jpg")]));
    assert_eq!(result.entries, vec![abs(&dir, "a.jpg")]);

    let filtered = collect(WalkRequest::new([abs(&dir, "b.txt")]).extensions([".jpg"]));
    assert!(filtered.entries.is_empty());
    assert!(filtered.errors.is_empty());
}

#[test]
fn test_skip_hidden() {
    let dir = tree(&["a.txt", ".hidden", ".git/config", "sub/.env", "sub/b.txt"]);
    let all = collect(WalkRequest::new([root(&dir)]));
    assert_eq!(all.entries.len(), 5);

    let visible = collect(WalkRequest::new([root(&dir)]).skip_hidden(true));
    assert_eq!(visible.entry_set(), expected(&dir, &["a.txt", "sub/b.txt"]));
}

#[test]
fn test_hidden_nested_root_is_still_walked() {
    let dir = tree(&["a.txt", ".config/c.txt", ".config/.d.txt"]);
    let result = collect(
        WalkRequest::new([root(&dir), abs(&dir, ".config")]).skip_hidden(true),
    );

    // The outer walk skips .config, the explicit root does not
    assert_eq!(result.entry_set(), expected(&dir, &["a.txt", ".config/c.txt"]));
    assert_eq!(result.entries.len(), 2);
}

#[test]
fn test_excluded_ancestor_keeps_nested_root() {
    let dir = tree(&["keep/a.txt", "cache/b.txt", "cache/sub/c.txt"]);
    let result = collect(
        WalkRequest::new([root(&dir), abs(&dir, "cache/sub")]).exclude(["**/cache"]),
    );

    assert_eq!(
        result.entry_set(),
        expected(&dir, &["keep/a.txt", "cache/sub/c.txt"])
    );
    assert_eq!(result.entries.len(), 2);
}

#[test]
fn test_cancel_terminates_walk() {
    let mut files = Vec::new();
    for d in 0..20 {
        for f in 0..20 {
            files.push(format!("d{}/f{}.txt", d, f));
        }
    }
    let refs: Vec<&str> = files.iter().map(|s| s.as_str()).collect();
    let dir = tree(&refs);

    let mut stream = walk(
        WalkRequest::new([root(&dir)])
            .threads(4)
            .batch_size(1)
            .channel_capacity(1),
    )
    .unwrap();
    assert!(stream.next_batch().is_some());

    stream.cancel();
    assert!(stream.next_batch().is_none());

    // Joins every worker; hangs if any is stuck on the full channel
    let stats = stream.finish().unwrap();
    assert!(!stats.completed);
    assert!(stats.files < refs.len() as u64);
}

#[test]
fn test_dropping_stream_cancels() {
    let mut files = Vec::new();
    for f in 0..200 {
        files.push(format!("f{}.txt", f));
    }
    let refs: Vec<&str> = files.iter().map(|s| s.as_str()).collect();
    let dir = tree(&refs);

    let mut stream = walk(WalkRequest::new([root(&dir)]).batch_size(1).channel_capacity(1)).unwrap();
    let token = stream.cancel_token();
    assert!(stream.next_batch().is_some());
    drop(stream);
    assert!(token.is_cancelled());
}

#[test]
fn test_push_cancel_still_sends_final_call() {
    let mut files = Vec::new();
    for f in 0..200 {
        files.push(format!("f{}.txt", f));
    }
    let refs: Vec<&str> = files.iter().map(|s| s.as_str()).collect();
    let dir = tree(&refs);

    let finals = Arc::new(Mutex::new(0));
    let sink = Arc::clone(&finals);
    let handle = walk_with_callback(
        WalkRequest::new([root(&dir)]).batch_size(1).channel_capacity(1),
        move |batch| {
            if batch.is_none() {
                *sink.lock().unwrap() += 1;
            }
        },
    )
    .unwrap();
    handle.cancel();
    handle.join().unwrap();
    assert_eq!(*finals.lock().unwrap(), 1);
}

#[test]
fn test_encoded_batches_decode() {
    let dir = tree(&["a b (1).jpg"]);
    let encoder = BatchEncoder::new(false);
    let mut decoded = Vec::new();
    for batch in walk(WalkRequest::new([root(&dir)]).include_metadata(true)).unwrap() {
        let bytes = encoder.encode(&batch).unwrap().unwrap();
        assert_eq!(decode_batch(&bytes).unwrap(), batch);
        decoded.extend(batch);
    }
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].path(), Some(abs(&dir, "a b (1).jpg").as_str()));
}

#[test]
fn test_lightweight_mode_same_entries() {
    let dir = tree(PHOTOS);
    let mut request = WalkRequest::new([root(&dir)]);
    let normal = collect(request.clone());
    request.lightweight_mode = true;

    let stream = walk(request.clone()).unwrap();
    assert!(stream.is_lightweight());
    drop(stream);

    let light = collect(request);
    assert_eq!(normal.entry_set(), light.entry_set());
}

#[test]
fn test_request_file() {
    let dir = tree(PHOTOS);
    let request_path = dir.path().join("request.json");
    fs::write(
        &request_path,
        format!(
            r#"{{"paths": [{:?}], "exclusionPatterns": ["**/raw/**"], "extensions": [".jpg"], "threads": 2}}"#,
            root(&dir)
        ),
    )
    .unwrap();

    let request = WalkRequest::from_json_file(&request_path).unwrap();
    assert_eq!(request.threads, 2);
    let result = collect(request);
    assert_eq!(
        result.entry_set(),
        expected(&dir, &["a.jpg", "2023/c.jpg", "2023/d.JPG"])
    );
}

#[cfg(unix)]
mod unix {
    use super::*;
    use std::os::unix::fs::{symlink, PermissionsExt};

    /// Root ignores permission bits, so these checks are meaningless there
    fn permissions_enforced(path: &Path) -> bool {
        fs::read_dir(path).is_err()
    }

    fn set_mode(path: &Path, mode: u32) {
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
    }

    #[test]
    fn test_restricted_directory_reports_error() {
        let dir = tree(&["open/a.txt", "restricted/secret.txt", "b.txt"]);
        let restricted: PathBuf = dir.path().join("restricted");
        set_mode(&restricted, 0o000);

        if !permissions_enforced(&restricted) {
            set_mode(&restricted, 0o755);
            return;
        }

        let result = collect(WalkRequest::new([root(&dir)]).threads(2));
        set_mode(&restricted, 0o755);

        assert_eq!(result.entry_set(), expected(&dir, &["open/a.txt", "b.txt"]));
        assert_eq!(result.errors.len(), 1);
        assert_eq!(
            result.errors[0].path.as_deref(),
            Some(restricted.to_str().unwrap())
        );
        assert!(result.errors[0]
            .message
            .to_lowercase()
            .contains("permission denied"));
        assert!(result.stats.completed);
    }

    #[test]
    fn test_restricted_file_still_listed() {
        let dir = tree(&["locked.txt", "open.txt"]);
        let locked = dir.path().join("locked.txt");
        set_mode(&locked, 0o000);

        let result = collect(WalkRequest::new([root(&dir)]).include_metadata(true));
        set_mode(&locked, 0o644);

        assert_eq!(result.entry_set(), expected(&dir, &["locked.txt", "open.txt"]));
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_excluded_directory_is_never_opened() {
        let dir = tree(&["keep/a.txt", "cache/b.txt"]);
        let cache = dir.path().join("cache");
        set_mode(&cache, 0o000);

        let result = collect(WalkRequest::new([root(&dir)]).exclude(["**/cache"]));
        set_mode(&cache, 0o755);

        // Listing it would have produced a permission error
        assert!(result.errors.is_empty());
        assert_eq!(result.entry_set(), expected(&dir, &["keep/a.txt"]));
    }

    #[test]
    fn test_symlinks_not_followed() {
        let dir = tree(&["real/a.txt", "b.txt"]);
        symlink(dir.path().join("real"), dir.path().join("link")).unwrap();
        symlink(dir.path().join("b.txt"), dir.path().join("b-link.txt")).unwrap();

        let result = collect(WalkRequest::new([root(&dir)]));
        assert_eq!(result.entry_set(), expected(&dir, &["real/a.txt", "b.txt"]));
    }

    #[test]
    fn test_symlinked_nested_root_is_walked() {
        let dir = tree(&["a/x.txt", "other/y.txt"]);
        symlink(dir.path().join("other"), dir.path().join("a/link")).unwrap();

        let result = collect(WalkRequest::new([abs(&dir, "a"), abs(&dir, "a/link")]));
        assert_eq!(
            result.entry_set(),
            expected(&dir, &["a/x.txt", "a/link/y.txt"])
        );
        assert_eq!(result.entries.len(), 2);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_name_reports_error() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tree(&["ok.txt"]);
        let bad = dir.path().join(OsStr::from_bytes(b"bad\xff.txt"));
        fs::write(&bad, b"x").unwrap();

        let result = collect(WalkRequest::new([root(&dir)]));
        assert_eq!(result.entry_set(), expected(&dir, &["ok.txt"]));
        assert_eq!(result.errors.len(), 1);

        let lossy = bad.to_string_lossy().into_owned();
        assert_eq!(result.errors[0].path.as_deref(), Some(lossy.as_str()));
        assert!(lossy.ends_with("bad\u{FFFD}.txt"));
    }
}
