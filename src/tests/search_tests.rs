#[cfg(test)]
mod tests {
    use crate::error::{Error, Limit};
    use crate::search::{search_files, spawn_search, FileSearch, SearchHit};
    use crate::storage::{FilesManager, LocalFilesManager};
    use crate::types::SearchOptions;
    use std::collections::BTreeSet;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;
    use walkdir::WalkDir;

    fn root_of(dir: &TempDir) -> String {
        dir.path().to_string_lossy().to_string()
    }

    fn touch(path: &Path, contents: &[u8]) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    /// root/f1, root/d1/f2, root/d1/d2/f3
    fn create_nested_tree() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        touch(&base.join("f1"), b"one");
        touch(&base.join("d1/f2"), b"two");
        touch(&base.join("d1/d2/f3"), b"three");
        temp_dir
    }

    fn options(max_depth: usize, max_items: usize) -> SearchOptions {
        SearchOptions { max_depth, max_items, ..SearchOptions::default() }
    }

    fn hit(depth: usize, path: &str, filename: &str) -> SearchHit {
        SearchHit { depth, path: path.to_string(), filename: filename.to_string() }
    }

    #[test]
    fn finds_every_file_with_depth() {
        let temp_dir = create_nested_tree();
        let root = root_of(&temp_dir);
        let manager = LocalFilesManager::default();

        let hits: Vec<SearchHit> = search_files(&manager, &root, &SearchOptions::default())
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(
            hits,
            vec![
                hit(0, &root, "f1"),
                hit(1, &format!("{}/d1", root), "f2"),
                hit(2, &format!("{}/d1/d2", root), "f3"),
            ]
        );
    }

    #[test]
    fn empty_root_yields_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let manager = LocalFilesManager::default();
        let mut iter = search_files(&manager, &root_of(&temp_dir), &SearchOptions::default());
        assert!(iter.next().is_none());
        assert_eq!(iter.emitted(), 0);
    }

    #[test]
    fn missing_root_fails_with_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope").to_string_lossy().to_string();
        let manager = LocalFilesManager::default();

        let mut iter = search_files(&manager, &missing, &SearchOptions::default());
        assert!(matches!(iter.next(), Some(Err(Error::Io { .. }))));
        assert!(iter.next().is_none());
    }

    #[test]
    fn item_limit_terminates_after_yielded_items() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["a", "b", "c"] {
            touch(&temp_dir.path().join(name), b"x");
        }
        let manager = LocalFilesManager::default();
        let mut iter = search_files(&manager, &root_of(&temp_dir), &options(10, 2));

        assert_eq!(iter.next().unwrap().unwrap().filename, "a");
        assert_eq!(iter.next().unwrap().unwrap().filename, "b");
        let err = iter.next().unwrap().unwrap_err();
        assert_eq!(err.limit(), Some(Limit::Items(2)));
        assert!(err.to_string().contains("item count exceeded maximum tolerated value of 2"));
        // fused after the error
        assert!(iter.next().is_none());
    }

    #[test]
    fn depth_limit_terminates_on_first_deeper_file() {
        let temp_dir = create_nested_tree();
        let manager = LocalFilesManager::default();
        let results: Vec<_> = search_files(&manager, &root_of(&temp_dir), &options(1, 100)).collect();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().filename, "f1");
        assert_eq!(results[1].as_ref().unwrap().filename, "f2");
        assert_eq!(results[2].as_ref().unwrap_err().limit(), Some(Limit::Depth(1)));
    }

    #[test]
    fn exact_limits_are_tolerated() {
        let temp_dir = create_nested_tree();
        let manager = LocalFilesManager::default();
        let hits: Vec<_> = search_files(&manager, &root_of(&temp_dir), &options(2, 3))
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn expired_duration_terminates_search() {
        let temp_dir = create_nested_tree();
        let manager = LocalFilesManager::default();
        let opts = SearchOptions { max_duration: Duration::ZERO, ..SearchOptions::default() };
        let mut iter = search_files(&manager, &root_of(&temp_dir), &opts);
        std::thread::sleep(Duration::from_millis(5));

        let err = iter.next().unwrap().unwrap_err();
        assert_eq!(err.limit(), Some(Limit::Duration(Duration::ZERO)));
        assert!(iter.next().is_none());
    }

    #[test]
    fn visits_shallow_folders_first() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        touch(&base.join("a/x/deep.txt"), b"d");
        touch(&base.join("b/mid.txt"), b"m");
        touch(&base.join("top.txt"), b"t");
        let manager = LocalFilesManager::default();

        let names: Vec<String> = search_files(&manager, &root_of(&temp_dir), &SearchOptions::default())
            .map(|r| r.unwrap().filename)
            .collect();
        assert_eq!(names, vec!["top.txt", "mid.txt", "deep.txt"]);
    }

    #[test]
    fn skip_empty_ignores_empty_folders_and_files() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::create_dir_all(base.join("empty/nested")).unwrap();
        touch(&base.join("hollow/zero.bin"), b"");
        touch(&base.join("zero.txt"), b"");
        touch(&base.join("a.txt"), b"x");
        touch(&base.join("full/b.txt"), b"y");
        let root = root_of(&temp_dir);
        let manager = LocalFilesManager::default();

        let all: Vec<String> = FileSearch::new(&manager, root.as_str())
            .iter()
            .map(|r| r.unwrap().filename)
            .collect();
        assert_eq!(all, vec!["a.txt", "zero.txt", "b.txt", "zero.bin"]);

        let non_empty: Vec<String> = FileSearch::new(&manager, root.as_str())
            .skip_empty(true)
            .iter()
            .map(|r| r.unwrap().filename)
            .collect();
        assert_eq!(non_empty, vec!["a.txt", "b.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn skip_empty_keeps_folders_holding_linked_files() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        touch(&base.join("data/payload.bin"), &[7u8; 10]);
        fs::create_dir_all(base.join("tree/sub")).unwrap();
        std::os::unix::fs::symlink(base.join("data/payload.bin"), base.join("tree/sub/link.bin")).unwrap();
        let root = base.join("tree").to_string_lossy().to_string();
        let manager = LocalFilesManager::default();

        let opts = SearchOptions { skip_empty: true, ..SearchOptions::default() };
        let names: Vec<String> = search_files(&manager, &root, &opts)
            .map(|r| r.unwrap().filename)
            .collect();
        assert_eq!(names, vec!["link.bin"]);
    }

    #[test]
    fn skip_empty_on_empty_root_yields_nothing() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("a/b")).unwrap();
        let manager = LocalFilesManager::default();
        let opts = SearchOptions { skip_empty: true, ..SearchOptions::default() };
        assert_eq!(search_files(&manager, &root_of(&temp_dir), &opts).count(), 0);
    }

    #[test]
    fn queue_overflow_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        touch(&base.join("f"), b"x");
        fs::create_dir_all(base.join("a")).unwrap();
        fs::create_dir_all(base.join("b")).unwrap();
        let root = root_of(&temp_dir);
        let manager = LocalFilesManager::default();

        let results: Vec<_> = FileSearch::new(&manager, root.as_str()).max_queue_size(1).iter().collect();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap().filename, "f");
        assert!(matches!(results[1], Err(Error::QueueOverflow { size: 2, max: 1 })));
    }

    #[test]
    fn search_can_be_restarted() {
        let temp_dir = create_nested_tree();
        let root = root_of(&temp_dir);
        let manager = LocalFilesManager::default();
        let search = FileSearch::new(&manager, root.as_str()).options(&SearchOptions::default());

        assert_eq!(search.iter().count(), 3);
        assert_eq!(search.iter().count(), 3);
    }

    #[test]
    fn matches_walkdir_listing() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        for i in 0..4 {
            for j in 0..3 {
                touch(&base.join(format!("d{}/s{}/file_{}_{}.txt", i, j, i, j)), b"data");
            }
            touch(&base.join(format!("d{}/top_{}.txt", i, i)), b"data");
        }
        touch(&base.join("root.txt"), b"data");
        let root = root_of(&temp_dir);
        let manager = LocalFilesManager::default();

        let found: BTreeSet<(String, String)> = search_files(&manager, &root, &SearchOptions::default())
            .map(|r| {
                let hit = r.unwrap();
                (hit.path, hit.filename)
            })
            .collect();

        let expected: BTreeSet<(String, String)> = WalkDir::new(base)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                let parent = e.path().parent().unwrap().to_string_lossy().to_string();
                (parent, e.file_name().to_string_lossy().to_string())
            })
            .collect();

        assert_eq!(found.len(), 17);
        assert_eq!(found, expected);
    }

    #[tokio::test]
    async fn spawn_search_streams_all_hits() {
        let temp_dir = create_nested_tree();
        let manager: Arc<dyn FilesManager> = Arc::new(LocalFilesManager::default());

        let (mut rx, handle) = spawn_search(manager, root_of(&temp_dir), SearchOptions::default(), 1);
        let mut names = Vec::new();
        while let Some(item) = rx.recv().await {
            names.push(item.unwrap().filename);
        }
        handle.await.unwrap();
        assert_eq!(names, vec!["f1", "f2", "f3"]);
    }

    #[tokio::test]
    async fn spawn_search_stops_when_receiver_dropped() {
        let temp_dir = create_nested_tree();
        let manager: Arc<dyn FilesManager> = Arc::new(LocalFilesManager::default());

        let (mut rx, handle) = spawn_search(manager, root_of(&temp_dir), SearchOptions::default(), 1);
        let first = rx.recv().await.unwrap().unwrap();
        assert_eq!(first.filename, "f1");
        drop(rx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn spawn_search_forwards_limit_error() {
        let temp_dir = create_nested_tree();
        let manager: Arc<dyn FilesManager> = Arc::new(LocalFilesManager::default());

        let (mut rx, handle) = spawn_search(manager, root_of(&temp_dir), options(0, 100), 4);
        assert!(rx.recv().await.unwrap().is_ok());
        let err = rx.recv().await.unwrap().unwrap_err();
        assert_eq!(err.limit(), Some(Limit::Depth(0)));
        assert!(rx.recv().await.is_none());
        handle.await.unwrap();
    }
}
