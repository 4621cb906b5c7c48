//! End-to-end tests: a real server on an ephemeral TCP port, a real client,
//! two temporary directories.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use dropsync_core::{ClientConfig, ServerConfig, SyncError, SyncRoot};
use dropsync_transport::{
    PassOutcome, PassReport, ServiceHandle, SyncClient, SyncServer, TcpConnector, start,
};

const CHUNK: usize = 1024;

struct Harness {
    client_dir: TempDir,
    server_dir: TempDir,
    client: SyncClient,
    server: ServiceHandle,
}

impl Harness {
    async fn new() -> Self {
        let client_dir = TempDir::new().unwrap();
        let server_dir = TempDir::new().unwrap();

        let server = SyncServer::bind(&ServerConfig {
            bind: "127.0.0.1:0".parse().unwrap(),
            root: server_dir.path().to_path_buf(),
            chunk_size: CHUNK,
        })
        .await
        .unwrap();
        let addr = server.local_addr().unwrap();
        let server = start(Arc::new(server));

        let config = ClientConfig {
            server: addr.to_string(),
            root: client_dir.path().to_path_buf(),
            poll_interval: Duration::from_millis(20),
            fetch_attempts: 3,
            chunk_size: CHUNK,
        };
        let client = SyncClient::new(
            TcpConnector::new(config.server.clone(), CHUNK),
            SyncRoot::open(client_dir.path()).unwrap(),
            config,
        );

        Self {
            client_dir,
            server_dir,
            client,
            server,
        }
    }

    fn local(&self) -> &Path {
        self.client_dir.path()
    }

    fn remote(&self) -> &Path {
        self.server_dir.path()
    }

    async fn sync(&self) -> PassReport {
        match self.client.sync_once().await.unwrap() {
            PassOutcome::Synced(report) => report,
            other => panic!("expected a pass, got {other:?}"),
        }
    }

    async fn shutdown(self) {
        tokio::time::timeout(Duration::from_secs(5), self.server.stop())
            .await
            .unwrap()
            .unwrap();
    }
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).unwrap()
}

/// All file paths under `root`, slash separated and sorted
fn tree(root: &Path) -> Vec<String> {
    let scanned = dropsync_core::Scanner::new(root).scan().unwrap();
    scanned.paths().map(|p| p.as_str().to_string()).collect()
}

#[tokio::test]
async fn scenario_a_new_file_is_uploaded() {
    let h = Harness::new().await;
    write(h.local(), "a.txt", "H1");

    let report = h.sync().await;
    assert_eq!(report.plan.upload_count(), 1);
    assert_eq!(report.uploaded_bytes, 2);
    assert_eq!(read(h.remote(), "a.txt"), "H1");
    h.shutdown().await;
}

#[tokio::test]
async fn scenario_b_stale_remote_file_is_moved() {
    let h = Harness::new().await;
    write(h.local(), "a.txt", "H1");
    write(h.remote(), "b.txt", "H1");

    let report = h.sync().await;
    assert_eq!(report.plan.upload_count(), 0);
    assert_eq!(report.plan.len(), 1);
    assert_eq!(tree(h.remote()), vec!["a.txt"]);
    h.shutdown().await;
}

#[tokio::test]
async fn scenario_c_live_sibling_is_copied() {
    let h = Harness::new().await;
    write(h.local(), "a.txt", "H1");
    write(h.local(), "b.txt", "H1");
    write(h.remote(), "b.txt", "H1");

    let report = h.sync().await;
    assert_eq!(report.uploaded_bytes, 0);
    assert_eq!(tree(h.remote()), vec!["a.txt", "b.txt"]);
    assert_eq!(read(h.remote(), "a.txt"), "H1");
    h.shutdown().await;
}

#[tokio::test]
async fn scenario_d_remote_only_file_is_deleted() {
    let h = Harness::new().await;
    write(h.local(), "a.txt", "H1");
    write(h.remote(), "a.txt", "H1");
    write(h.remote(), "old/nested/old.txt", "H9");

    let report = h.sync().await;
    assert!(report.plan.transfers.is_empty());
    assert_eq!(report.plan.cleanup.len(), 1);
    assert_eq!(tree(h.remote()), vec!["a.txt"]);
    assert!(!h.remote().join("old").exists(), "emptied directories remain");
    h.shutdown().await;
}

#[tokio::test]
async fn scenario_e_local_rename_is_a_remote_move() {
    let h = Harness::new().await;
    write(h.local(), "docs/draft.txt", "the report");
    h.sync().await;

    fs::rename(h.local().join("docs/draft.txt"), h.local().join("final.txt")).unwrap();
    let PassOutcome::Synced(report) = h.client.poll_once().await.unwrap() else {
        panic!("rename must be detected");
    };
    assert_eq!(report.uploaded_bytes, 0);
    assert_eq!(report.plan.transfers.len(), 1);
    assert!(report.plan.cleanup.is_empty());
    assert_eq!(tree(h.remote()), vec!["final.txt"]);
    assert!(!h.remote().join("docs").exists());
    h.shutdown().await;
}

#[tokio::test]
async fn identical_files_are_sent_once() {
    let h = Harness::new().await;
    let body = "x".repeat(10 * CHUNK + 7);
    write(h.local(), "one.bin", &body);
    write(h.local(), "two/one.bin", &body);
    write(h.local(), "three.bin", &body);

    let report = h.sync().await;
    assert_eq!(report.plan.upload_count(), 1);
    assert_eq!(report.uploaded_bytes, body.len() as u64);
    assert_eq!(read(h.remote(), "two/one.bin"), body);
    h.shutdown().await;
}

#[tokio::test]
async fn second_pass_is_empty() {
    let h = Harness::new().await;
    write(h.local(), "a.txt", "a");
    write(h.local(), "b/c.txt", "c");
    write(h.remote(), "junk.txt", "j");
    h.sync().await;

    let again = h.sync().await;
    assert!(again.plan.is_empty(), "{:?}", again.plan);
    assert!(matches!(
        h.client.poll_once().await.unwrap(),
        PassOutcome::Unchanged
    ));
    h.shutdown().await;
}

#[tokio::test]
async fn swapped_contents_need_no_upload() {
    let h = Harness::new().await;
    write(h.local(), "left.txt", "L");
    write(h.local(), "right.txt", "R");
    h.sync().await;

    write(h.local(), "left.txt", "R");
    write(h.local(), "right.txt", "L");
    let report = h.sync().await;
    assert_eq!(report.uploaded_bytes, 0);
    assert_eq!(read(h.remote(), "left.txt"), "R");
    assert_eq!(read(h.remote(), "right.txt"), "L");
    assert_eq!(tree(h.remote()), vec!["left.txt", "right.txt"]);
    h.shutdown().await;
}

#[tokio::test]
async fn file_replaced_by_directory() {
    let h = Harness::new().await;
    write(h.local(), "item", "was a file");
    h.sync().await;

    fs::remove_file(h.local().join("item")).unwrap();
    write(h.local(), "item/inner.txt", "now a dir");
    h.sync().await;
    assert_eq!(tree(h.remote()), vec!["item/inner.txt"]);
    h.shutdown().await;
}

#[tokio::test]
async fn awkward_names_survive() {
    let h = Harness::new().await;
    write(h.local(), "a::b.txt", "colons");
    write(h.local(), "with space/ünïcode.txt", "unicode");
    write(h.local(), ".hidden", "hidden");
    write(h.local(), "empty.txt", "");

    h.sync().await;
    assert_eq!(tree(h.remote()), tree(h.local()));
    assert_eq!(read(h.remote(), "a::b.txt"), "colons");
    h.shutdown().await;
}

#[tokio::test]
async fn modified_file_is_replaced() {
    let h = Harness::new().await;
    write(h.local(), "notes.txt", "v1");
    h.sync().await;

    write(h.local(), "notes.txt", "version two");
    let PassOutcome::Synced(report) = h.client.poll_once().await.unwrap() else {
        panic!("modification must be detected");
    };
    assert_eq!(report.plan.upload_count(), 1);
    assert_eq!(read(h.remote(), "notes.txt"), "version two");
    h.shutdown().await;
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let h = Harness::new().await;
    write(h.local(), "a.txt", "a");
    let Harness {
        client_dir: _client_dir,
        server_dir: _server_dir,
        client,
        server,
    } = h;
    server.stop().await.unwrap();

    let err = client.sync_once().await.unwrap_err();
    assert!(matches!(err, SyncError::Network { .. }), "{err}");
    assert!(client.last_synced().await.is_none());
}

#[tokio::test]
async fn watch_loop_follows_changes_until_stopped() {
    let h = Harness::new().await;
    write(h.local(), "first.txt", "1");

    let Harness {
        client_dir,
        server_dir,
        client,
        server,
    } = h;
    let watcher = start(Arc::new(client));

    wait_for(|| server_dir.path().join("first.txt").exists()).await;
    write(client_dir.path(), "second.txt", "2");
    fs::remove_file(client_dir.path().join("first.txt")).unwrap();
    wait_for(|| tree(server_dir.path()) == vec!["second.txt".to_string()]).await;

    tokio::time::timeout(Duration::from_secs(5), watcher.stop())
        .await
        .unwrap()
        .unwrap();
    server.stop().await.unwrap();
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}
