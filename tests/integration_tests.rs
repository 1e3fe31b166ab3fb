//! End-to-end tests: real directory trees, a mocked qBittorrent WebUI and
//! the public `Janitor` surface.

#![cfg(unix)]

mod common;

use common::fixtures::MediaLibrary;
use common::mock_server::{mount_broken_files_endpoint, mount_qbit_api};
use qbit_janitor::cache::{FILE_RECORDS_FILE, TORRENT_FILES_FILE};
use qbit_janitor::{FileFilter, FileRecord, Janitor, JanitorError, Metrics, QbitClient};
use std::fs;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use wiremock::MockServer;

fn janitor(library: &MediaLibrary, server: &MockServer) -> (Janitor<QbitClient>, Arc<Metrics>) {
    let metrics = Arc::new(Metrics::new());
    let janitor = Janitor::from_config(&library.config(&server.uri()), Arc::clone(&metrics)).unwrap();
    (janitor, metrics)
}

fn find<'a>(records: &'a [FileRecord], path: &Path) -> &'a FileRecord {
    records
        .iter()
        .find(|r| r.path == path)
        .unwrap_or_else(|| panic!("no record for {}", path.display()))
}

#[tokio::test]
async fn test_hardlinks_and_prefix_twins() {
    let library = MediaLibrary::build();
    let server = MockServer::start().await;
    mount_qbit_api(&server, &library.torrents(), 1).await;
    let (janitor, _) = janitor(&library, &server);

    let records = janitor
        .get_files_in_directory(&library.tv, &FileFilter::default(), false)
        .await
        .unwrap();

    let a = find(&records, &library.tv.join("a.mkv"));
    let b = find(&records, &library.tv.join("b.mkv"));
    let c = find(&records, &library.tv.join("c.mkv"));

    assert!(a.is_hardlink && b.is_hardlink);
    assert!(!c.is_hardlink);
    assert_eq!(a.inode_id, b.inode_id);
    assert_ne!(a.inode_id, c.inode_id);
    assert_eq!(a.partial_hash, b.partial_hash);
    assert_eq!(a.partial_hash, c.partial_hash);
    assert!(a.hash_duplicate && b.hash_duplicate && c.hash_duplicate);

    // Distinct content never collides
    let ep1 = find(&records, &library.tv.join("Show/ep1.mkv"));
    assert!(!ep1.hash_duplicate);
}

#[tokio::test]
async fn test_twin_outside_scope_still_marks_duplicate() {
    let library = MediaLibrary::build();
    let x = library.tv.join("x.mkv");
    let y = library.film.join("y.mkv");
    fs::write(&x, vec![0x11u8; 2048]).unwrap();
    fs::write(&y, vec![0x11u8; 2048]).unwrap();

    let server = MockServer::start().await;
    mount_qbit_api(&server, &library.torrents(), 1).await;
    let (janitor, _) = janitor(&library, &server);

    let tv = janitor
        .get_files_in_directory(&library.tv, &FileFilter::default(), false)
        .await
        .unwrap();
    assert!(tv.iter().all(|r| r.path != y));
    assert!(find(&tv, &x).hash_duplicate);

    janitor.delete_file(&y).await.unwrap();

    let tv = janitor
        .get_files_in_directory(&library.tv, &FileFilter::default(), false)
        .await
        .unwrap();
    assert!(!find(&tv, &x).hash_duplicate);
}

#[tokio::test]
async fn test_manifest_membership() {
    let library = MediaLibrary::build();
    let server = MockServer::start().await;
    mount_qbit_api(&server, &library.torrents(), 1).await;
    let (janitor, _) = janitor(&library, &server);

    let records = janitor
        .get_files_in_directory(&library.tv, &FileFilter::default(), false)
        .await
        .unwrap();

    let listed = find(&records, &library.tv.join("Show/ep1.mkv"));
    assert!(listed.in_qbit);
    assert!(listed.folder_in_qbit);

    let extra = find(&records, &library.tv.join("Show/extra/ep1.mkv"));
    assert!(!extra.in_qbit);
    assert!(extra.folder_in_qbit);

    let orphans = janitor
        .get_files_in_directory(
            &library.tv,
            &FileFilter {
                in_qbit: Some(false),
                hardlink: Some(false),
                ..Default::default()
            },
            false,
        )
        .await
        .unwrap();
    let paths: Vec<_> = orphans.iter().map(|r| r.path.clone()).collect();
    assert_eq!(
        paths,
        vec![library.tv.join("Show/extra/ep1.mkv"), library.tv.join("c.mkv")]
    );
}

#[tokio::test]
async fn test_scope_covers_all_roots_from_one_snapshot() {
    let library = MediaLibrary::build();
    let server = MockServer::start().await;
    // One fetch and one walk serve every later scope
    mount_qbit_api(&server, &library.torrents(), 1).await;
    let (janitor, metrics) = janitor(&library, &server);

    let tv = janitor
        .get_files_in_directory(&library.tv, &FileFilter::default(), false)
        .await
        .unwrap();
    let film = janitor
        .get_files_in_directory(&library.film, &FileFilter::default(), false)
        .await
        .unwrap();

    assert_eq!(tv.len(), 5);
    assert_eq!(film.len(), 1);
    assert!(film[0].in_qbit);
    assert!(tv.iter().all(|r| r.folder_path.starts_with(&library.tv)));
    assert_eq!(metrics.scan.scan_count.load(Ordering::Relaxed), 1);
    assert!(library.cache_dir.join(FILE_RECORDS_FILE).exists());
}

#[tokio::test]
async fn test_clear_then_concurrent_read_is_consistent() {
    let library = MediaLibrary::build();
    let server = MockServer::start().await;
    mount_qbit_api(&server, &library.torrents(), 1).await;
    let (janitor, metrics) = janitor(&library, &server);

    let filter = FileFilter::default();
    let (first, second) = tokio::join!(
        janitor.get_files_in_directory(&library.tv, &filter, true),
        janitor.get_files_in_directory(&library.tv, &filter, false),
    );

    let first = first.unwrap();
    assert!(!first.is_empty());
    assert_eq!(first, second.unwrap());
    assert_eq!(metrics.scan.scan_count.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_deleted_file_does_not_come_back() {
    let library = MediaLibrary::build();
    let server = MockServer::start().await;
    mount_qbit_api(&server, &library.torrents(), 1).await;
    let (janitor, _) = janitor(&library, &server);
    let filter = FileFilter::default();

    janitor
        .get_files_in_directory(&library.tv, &filter, false)
        .await
        .unwrap();

    let target = library.tv.join("c.mkv");
    janitor.delete_file(&target).await.unwrap();
    assert!(!target.exists());

    let records = janitor
        .get_files_in_directory(&library.tv, &filter, false)
        .await
        .unwrap();
    assert!(records.iter().all(|r| r.path != target));

    // The twin is gone, so the hardlinked pair is no longer a duplicate
    assert!(!find(&records, &library.tv.join("a.mkv")).hash_duplicate);
}

#[tokio::test]
async fn test_deleted_folder_is_removed_from_manifest() {
    let library = MediaLibrary::build();
    let server = MockServer::start().await;
    mount_qbit_api(&server, &library.torrents(), 1).await;
    let (janitor, _) = janitor(&library, &server);

    janitor
        .get_files_in_directory(&library.tv, &FileFilter::default(), false)
        .await
        .unwrap();
    janitor.delete_folder(&library.tv.join("Show")).await.unwrap();

    let manifest = janitor.get_torrent_files(false).await.unwrap();
    assert_eq!(manifest, vec![library.film.join("Movie/movie.mkv")]);

    let records = janitor
        .get_files_in_directory(&library.tv, &FileFilter::default(), false)
        .await
        .unwrap();
    assert_eq!(records.len(), 3);
}

#[tokio::test]
async fn test_short_path_is_rejected_without_mutation() {
    let library = MediaLibrary::build();
    let server = MockServer::start().await;
    mount_qbit_api(&server, &library.torrents(), 1).await;
    let (janitor, _) = janitor(&library, &server);

    let before = janitor
        .get_files_in_directory(&library.tv, &FileFilter::default(), false)
        .await
        .unwrap();

    let result = janitor.delete_file(Path::new("/torrent")).await;
    assert!(matches!(result, Err(JanitorError::ValidationError(_))));

    let after = janitor
        .get_files_in_directory(&library.tv, &FileFilter::default(), false)
        .await
        .unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_batch_delete_reports_each_failure() {
    let library = MediaLibrary::build();
    let server = MockServer::start().await;
    // Nothing was scanned, so cleanup has no snapshot to rewrite
    mount_qbit_api(&server, &library.torrents(), 0).await;
    let (janitor, _) = janitor(&library, &server);

    let batch = vec![
        library.tv.join("b.mkv"),
        library.tv.join("gone.mkv"),
        library.film.join("Empty"),
    ];
    let result = janitor.delete_multiple(&batch).await;

    assert_eq!(
        result.deleted,
        vec![library.tv.join("b.mkv"), library.film.join("Empty")]
    );
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].path, library.tv.join("gone.mkv"));
    assert!(matches!(result.errors[0].error, JanitorError::NotFound(_)));
    // The surviving hardlink stays on disk
    assert!(library.tv.join("a.mkv").exists());
}

#[tokio::test]
async fn test_corrupt_record_snapshot_is_an_error() {
    let library = MediaLibrary::build();
    let server = MockServer::start().await;
    mount_qbit_api(&server, &library.torrents(), 0).await;
    let (janitor, _) = janitor(&library, &server);

    fs::create_dir_all(&library.cache_dir).unwrap();
    fs::write(library.cache_dir.join(FILE_RECORDS_FILE), b"[{\"path\": ").unwrap();

    let result = janitor
        .get_files_in_directory(&library.tv, &FileFilter::default(), false)
        .await;
    match result {
        Err(JanitorError::CacheCorrupted { path, .. }) => {
            assert_eq!(path, library.cache_dir.join(FILE_RECORDS_FILE))
        }
        other => panic!("expected CacheCorrupted, got {:?}", other.map(|r| r.len())),
    }
}

#[tokio::test]
async fn test_manifest_failure_fails_the_scan() {
    let library = MediaLibrary::build();
    let server = MockServer::start().await;
    let torrents = library.torrents();
    mount_broken_files_endpoint(&server, &torrents[0], 500).await;
    let (janitor, _) = janitor(&library, &server);

    let result = janitor
        .get_files_in_directory(&library.tv, &FileFilter::default(), false)
        .await;
    assert!(matches!(result, Err(JanitorError::ApiError { status: 500, .. })));
    assert!(!library.cache_dir.join(TORRENT_FILES_FILE).exists());
    assert!(!library.cache_dir.join(FILE_RECORDS_FILE).exists());
}

#[tokio::test]
async fn test_directory_queries() {
    let library = MediaLibrary::build();
    let server = MockServer::start().await;
    mount_qbit_api(&server, &library.torrents(), 1).await;
    let (janitor, _) = janitor(&library, &server);

    let dirs = janitor
        .get_directories_in_directory(&library.film, false)
        .await
        .unwrap();
    assert_eq!(dirs.len(), 2);
    let movie = dirs.iter().find(|d| d.path == library.film.join("Movie")).unwrap();
    assert!(movie.folder_in_qbit);
    assert_eq!(movie.total_size_bytes, 4096);
    assert_eq!(movie.file_count, 1);

    let empty = janitor.get_empty_folders(&library.film).await.unwrap();
    assert_eq!(empty.len(), 1);
    assert_eq!(empty[0].path, library.film.join("Empty"));

    let small = janitor.get_small_folders(&library.tv, None).await.unwrap();
    let paths: Vec<_> = small.iter().map(|d| d.path.clone()).collect();
    assert_eq!(paths, vec![library.tv.join("Show"), library.tv.join("Show/extra")]);
}

#[tokio::test]
async fn test_torrent_list_is_cached() {
    let library = MediaLibrary::build();
    let server = MockServer::start().await;
    mount_qbit_api(&server, &library.torrents(), 2).await;
    let (janitor, _) = janitor(&library, &server);

    let torrents = janitor.get_torrents(false).await.unwrap();
    assert_eq!(torrents.len(), 2);
    assert_eq!(torrents[0].tag_list(), vec!["tv", "keep"]);
    janitor.get_torrents(false).await.unwrap();
    janitor.get_torrents(true).await.unwrap();
}
