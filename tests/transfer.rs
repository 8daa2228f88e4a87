//! End-to-end transfers against a real server on the loopback interface.

use std::collections::BTreeSet;
use std::fs;
use std::io::{BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use netcopy::config::{Mode, SharedKey, TransferConfig};
use netcopy::core::TransferPipeline;
use netcopy::error::NetCopyError;
use netcopy::network::{read_line, ServerStats, TransferServer, PONG};
use tempfile::TempDir;
use walkdir::WalkDir;

struct TestServer {
    addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    stats: Arc<ServerStats>,
    handle: JoinHandle<()>,
}

impl TestServer {
    fn start(root: &Path, key: &str, workers: usize) -> Self {
        let mut config = TransferConfig::new(Mode::Server, root, SharedKey::new(key).unwrap());
        config.bind = "127.0.0.1".to_string();
        config.port = 0;
        config.workers = workers;

        let server = TransferServer::bind(&config).unwrap();
        let addr = server.local_addr().unwrap();
        let shutdown = server.shutdown_flag();
        let stats = server.stats();
        let handle = thread::spawn(move || server.run().unwrap());

        Self {
            addr,
            shutdown,
            stats,
            handle,
        }
    }

    /// Every client connection must be closed before stopping.
    fn stop(self) -> Arc<ServerStats> {
        self.shutdown.store(true, Ordering::SeqCst);
        self.handle.join().unwrap();
        self.stats
    }
}

fn client_config(source: &Path, server: &TestServer, checkpoint: &Path, key: &str) -> TransferConfig {
    let mut config = TransferConfig::new(Mode::Client, source, SharedKey::new(key).unwrap());
    config.host = "127.0.0.1".to_string();
    config.port = server.addr.port();
    config.workers = 4;
    config.checkpoint_path = checkpoint.to_path_buf();
    config
}

fn write_file(root: &Path, relative: &str, contents: &[u8]) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn tree_files(root: &Path) -> BTreeSet<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().strip_prefix(root).unwrap().to_path_buf())
        .collect()
}

fn checkpoint_lines(path: &Path) -> Vec<String> {
    let mut lines: Vec<String> = fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    lines.sort();
    lines
}

fn connect(addr: SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
    stream
}

#[test]
fn concrete_two_file_transfer() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    write_file(src.path(), "a.txt", b"hello");
    write_file(src.path(), "b/c.txt", b"0123456789");

    let server = TestServer::start(dst.path(), "K1", 4);
    let checkpoint = work.path().join("checkpoint.log");
    let mut config = client_config(src.path(), &server, &checkpoint, "K1");
    config.workers = 2;
    let summary = TransferPipeline::new(config).run().unwrap();

    assert_eq!(summary.files_sent, 2);
    assert_eq!(summary.bytes_sent, 15);
    assert_eq!(summary.files_failed, 0);
    assert_eq!(fs::read(dst.path().join("a.txt")).unwrap(), b"hello");
    assert_eq!(fs::read(dst.path().join("b/c.txt")).unwrap(), b"0123456789");
    assert_eq!(checkpoint_lines(&checkpoint), vec!["a.txt", "b/c.txt"]);

    let stats = server.stop();
    assert_eq!(stats.files_received(), 2);
    assert_eq!(stats.bytes_received(), 15);
}

#[test]
fn round_trip_reproduces_tree() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();

    let mut expected_bytes = 0u64;
    for i in 0..40 {
        let body: Vec<u8> = (0..i * 97).map(|n| (n % 251) as u8).collect();
        expected_bytes += body.len() as u64;
        write_file(src.path(), &format!("dir{}/sub{}/file{}.bin", i % 3, i % 5, i), &body);
    }
    write_file(src.path(), "empty.txt", b"");
    let large: Vec<u8> = (0..3 * 1024 * 1024).map(|n| (n % 253) as u8).collect();
    expected_bytes += large.len() as u64;
    write_file(src.path(), "large/blob.bin", &large);

    let server = TestServer::start(dst.path(), "K1", 8);
    let checkpoint = work.path().join("checkpoint.log");
    let summary = TransferPipeline::new(client_config(src.path(), &server, &checkpoint, "K1"))
        .run()
        .unwrap();
    server.stop();

    assert_eq!(summary.files_sent, 42);
    assert_eq!(summary.bytes_sent, expected_bytes);
    assert_eq!(tree_files(src.path()), tree_files(dst.path()));
    for relative in tree_files(src.path()) {
        assert_eq!(
            fs::read(src.path().join(&relative)).unwrap(),
            fs::read(dst.path().join(&relative)).unwrap(),
            "content mismatch for {}",
            relative.display()
        );
    }
}

#[test]
fn resume_after_complete_run_sends_nothing() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    write_file(src.path(), "a.txt", b"hello");
    write_file(src.path(), "b/c.txt", b"0123456789");
    write_file(src.path(), "b/d/e.txt", b"nested");

    let server = TestServer::start(dst.path(), "K1", 4);
    let checkpoint = work.path().join("checkpoint.log");
    let mut config = client_config(src.path(), &server, &checkpoint, "K1");

    let first = TransferPipeline::new(config.clone()).run().unwrap();
    assert_eq!(first.files_sent, 3);
    let lines_after_first = checkpoint_lines(&checkpoint);

    config.resume = true;
    let second = TransferPipeline::new(config).run().unwrap();
    assert_eq!(second.files_sent, 0);
    assert_eq!(second.files_skipped, 3);
    assert_eq!(checkpoint_lines(&checkpoint), lines_after_first);

    let stats = server.stop();
    assert_eq!(stats.files_received(), 3);
}

#[test]
fn resume_sends_only_missing_files() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    write_file(src.path(), "a.txt", b"hello");
    write_file(src.path(), "b/c.txt", b"0123456789");

    // An interrupted run that only got a.txt across.
    let checkpoint = work.path().join("checkpoint.log");
    fs::write(&checkpoint, "a.txt\n").unwrap();

    let server = TestServer::start(dst.path(), "K1", 4);
    let mut config = client_config(src.path(), &server, &checkpoint, "K1");
    config.resume = true;
    let summary = TransferPipeline::new(config).run().unwrap();

    assert_eq!(summary.files_sent, 1);
    assert_eq!(summary.files_skipped, 1);
    assert!(!dst.path().join("a.txt").exists());
    assert_eq!(fs::read(dst.path().join("b/c.txt")).unwrap(), b"0123456789");
    assert_eq!(checkpoint_lines(&checkpoint), vec!["a.txt", "b/c.txt"]);

    let stats = server.stop();
    assert_eq!(stats.files_received(), 1);
}

#[test]
fn failed_write_is_counted_and_not_checkpointed() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    write_file(src.path(), "a.txt", b"hello");
    write_file(src.path(), "b/c.txt", b"0123456789");
    // The server cannot create a file where a directory already stands.
    fs::create_dir_all(dst.path().join("a.txt")).unwrap();

    let server = TestServer::start(dst.path(), "K1", 4);
    let checkpoint = work.path().join("checkpoint.log");
    let mut config = client_config(src.path(), &server, &checkpoint, "K1");
    let summary = TransferPipeline::new(config.clone()).run().unwrap();

    assert_eq!(summary.files_sent, 1);
    assert_eq!(summary.files_failed, 1);
    assert_eq!(summary.bytes_sent, 10);
    assert!(dst.path().join("a.txt").is_dir());
    assert_eq!(fs::read(dst.path().join("b/c.txt")).unwrap(), b"0123456789");
    assert_eq!(checkpoint_lines(&checkpoint), vec!["b/c.txt"]);

    // Once the obstacle is gone a resumed run delivers only the failed file.
    fs::remove_dir(dst.path().join("a.txt")).unwrap();
    config.resume = true;
    let summary = TransferPipeline::new(config).run().unwrap();

    assert_eq!(summary.files_sent, 1);
    assert_eq!(summary.files_failed, 0);
    assert_eq!(fs::read(dst.path().join("a.txt")).unwrap(), b"hello");
    assert_eq!(checkpoint_lines(&checkpoint), vec!["a.txt", "b/c.txt"]);

    let stats = server.stop();
    assert_eq!(stats.files_received(), 2);
}

#[test]
fn without_resume_everything_is_resent() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    write_file(src.path(), "a.txt", b"hello");

    let checkpoint = work.path().join("checkpoint.log");
    fs::write(&checkpoint, "a.txt\n").unwrap();

    let server = TestServer::start(dst.path(), "K1", 2);
    let summary = TransferPipeline::new(client_config(src.path(), &server, &checkpoint, "K1"))
        .run()
        .unwrap();
    server.stop();

    assert_eq!(summary.files_sent, 1);
    assert_eq!(summary.files_skipped, 0);
    assert_eq!(fs::read(dst.path().join("a.txt")).unwrap(), b"hello");
    assert_eq!(checkpoint_lines(&checkpoint), vec!["a.txt", "a.txt"]);
}

#[test]
fn wrong_key_probe_aborts_run() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    write_file(src.path(), "a.txt", b"hello");

    let server = TestServer::start(dst.path(), "K1", 2);
    let checkpoint = work.path().join("checkpoint.log");
    let err = TransferPipeline::new(client_config(src.path(), &server, &checkpoint, "WRONG"))
        .run()
        .unwrap_err();

    assert!(matches!(err, NetCopyError::ProbeFailed { .. }));
    assert!(err.is_fatal());
    assert!(!checkpoint.exists());
    assert!(tree_files(dst.path()).is_empty());

    let stats = server.stop();
    assert_eq!(stats.rejected(), 1);
    assert_eq!(stats.files_received(), 0);
}

#[test]
fn unreachable_server_fails_probe() {
    let src = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();

    let server = TestServer::start(dst.path(), "K1", 1);
    let checkpoint = work.path().join("checkpoint.log");
    let config = client_config(src.path(), &server, &checkpoint, "K1");
    server.stop();

    let err = TransferPipeline::new(config).run().unwrap_err();
    assert!(err.is_fatal());
}

#[test]
fn wrong_key_writes_nothing() {
    let dst = TempDir::new().unwrap();
    let server = TestServer::start(dst.path(), "K1", 2);

    let mut stream = connect(server.addr);
    stream.write_all(b"K2\na.txt\nhello").unwrap();
    let _ = stream.shutdown(std::net::Shutdown::Write);
    let mut reply = Vec::new();
    // The server may reset the connection since it never reads the body.
    let _ = stream.read_to_end(&mut reply);
    assert!(reply.is_empty());
    drop(stream);

    let stats = server.stop();
    assert_eq!(stats.rejected(), 1);
    assert_eq!(stats.files_received(), 0);
    assert!(!dst.path().join("a.txt").exists());
}

#[test]
fn ping_pong_then_close() {
    let dst = TempDir::new().unwrap();
    let server = TestServer::start(dst.path(), "K1", 2);

    let mut stream = connect(server.addr);
    stream.write_all(b"K1\n__ping__\n__ping__\r\n").unwrap();
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    assert_eq!(read_line(&mut reader).unwrap().as_deref(), Some(PONG));
    assert_eq!(read_line(&mut reader).unwrap().as_deref(), Some(PONG));

    stream.write_all(b"__close__\n").unwrap();
    assert_eq!(read_line(&mut reader).unwrap(), None);
    drop(reader);
    drop(stream);

    let stats = server.stop();
    assert_eq!(stats.files_received(), 0);
    assert_eq!(stats.rejected(), 0);
}

#[test]
fn path_traversal_is_refused() {
    let base = TempDir::new().unwrap();
    let root = base.path().join("dest");
    fs::create_dir_all(&root).unwrap();
    let server = TestServer::start(&root, "K1", 2);

    for line in ["../escape.txt", "/tmp/absolute.txt", "a/../../escape2.txt"] {
        let mut stream = connect(server.addr);
        stream
            .write_all(format!("K1\n{}\nevil", line).as_bytes())
            .unwrap();
        let _ = stream.shutdown(std::net::Shutdown::Write);
        let _ = stream.read_to_end(&mut Vec::new());
    }

    let stats = server.stop();
    assert_eq!(stats.files_received(), 0);
    assert!(!base.path().join("escape.txt").exists());
    assert!(!base.path().join("escape2.txt").exists());
    assert!(tree_files(&root).is_empty());
}

#[test]
fn concurrent_handlers_never_exceed_workers() {
    let dst = TempDir::new().unwrap();
    let server = TestServer::start(dst.path(), "K1", 2);

    let mut conns: Vec<Option<BufReader<TcpStream>>> = (0..6)
        .map(|_| {
            let mut stream = connect(server.addr);
            stream.write_all(b"K1\n__ping__\n").unwrap();
            Some(BufReader::new(stream))
        })
        .collect();

    fn expect_pong(conn: &mut Option<BufReader<TcpStream>>) {
        let reader = conn.as_mut().unwrap();
        assert_eq!(read_line(reader).unwrap().as_deref(), Some(PONG));
    }

    expect_pong(&mut conns[0]);
    expect_pong(&mut conns[1]);
    assert_eq!(server.stats.active_handlers(), 2);

    // Each later connection is served only once an earlier one closes.
    for k in 2..6 {
        conns[k - 2] = None;
        expect_pong(&mut conns[k]);
        assert!(server.stats.peak_handlers() <= 2);
    }
    conns.clear();

    let stats = server.stop();
    assert_eq!(stats.peak_handlers(), 2);
}
