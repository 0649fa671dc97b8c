//! Transfer controller behavior against a live (throwaway) HTTP server.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;

use galley::Error;
use galley::progress::{ProgressSink, SIMULATED_CEILING};
use galley::transfer::TransferController;

#[derive(Default)]
struct RecordingSink {
    values: Mutex<Vec<u8>>,
}

impl ProgressSink for RecordingSink {
    fn on_progress(&self, percent: u8) {
        self.values.lock().expect("sink lock").push(percent);
    }
}

async fn spawn(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    addr
}

fn counting_router(status: StatusCode, body: &'static str, hits: Arc<AtomicUsize>) -> Router {
    Router::new()
        .route(
            "/v1/format",
            post(
                move |State(hits): State<Arc<AtomicUsize>>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    (status, body)
                },
            ),
        )
        .with_state(hits)
}

fn write_transcript(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("episode.txt");
    std::fs::write(&path, "Show Title\n\nAnnouncer: welcome back\n").expect("write transcript");
    path
}

#[tokio::test]
async fn three_bad_gateways_exhaust_the_retry_budget() {
    let hits = Arc::new(AtomicUsize::new(0));
    let addr = spawn(counting_router(
        StatusCode::BAD_GATEWAY,
        "upstream offline",
        hits.clone(),
    ))
    .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let file = write_transcript(&dir);
    let base = Duration::from_millis(20);
    let controller = TransferController::new(format!("http://{addr}/v1/format"))
        .with_backoff_base(base);
    let sink = Arc::new(RecordingSink::default());

    let started = Instant::now();
    let err = controller
        .submit(&file, dir.path(), sink.clone())
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    // Exactly one error, exactly 3 attempts, delays of d, 2d, 4d.
    assert!(matches!(err, Error::Transfer { status: Some(502), .. }));
    assert_eq!(hits.load(Ordering::SeqCst), 3);
    assert!(elapsed >= base * 7, "elapsed {elapsed:?} under backoff total");

    // Even on failure the final observed progress is 100.
    let values = sink.values.lock().expect("sink lock").clone();
    assert_eq!(*values.last().expect("at least one report"), 100);
}

#[tokio::test]
async fn forbidden_is_returned_immediately_without_retry() {
    let hits = Arc::new(AtomicUsize::new(0));
    let addr = spawn(counting_router(
        StatusCode::FORBIDDEN,
        "credentials rejected",
        hits.clone(),
    ))
    .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let file = write_transcript(&dir);
    let controller = TransferController::new(format!("http://{addr}/v1/format"));

    let err = controller
        .submit(&file, dir.path(), Arc::new(RecordingSink::default()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Transfer { status: Some(403), .. }));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn diagnostic_bodies_are_truncated() {
    let hits = Arc::new(AtomicUsize::new(0));
    // 500 is fatal on first sight, so one request suffices.
    let long_body: &'static str =
        Box::leak("x".repeat(5000).into_boxed_str());
    let addr = spawn(counting_router(
        StatusCode::INTERNAL_SERVER_ERROR,
        long_body,
        hits.clone(),
    ))
    .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let file = write_transcript(&dir);
    let controller = TransferController::new(format!("http://{addr}/v1/format"));

    let err = controller
        .submit(&file, dir.path(), Arc::new(RecordingSink::default()))
        .await
        .unwrap_err();

    let Error::Transfer { status, message } = err else {
        panic!("expected Transfer error");
    };
    assert_eq!(status, Some(500));
    assert!(message.len() < 400, "diagnostic not truncated: {} bytes", message.len());
}

#[tokio::test]
async fn successful_submission_saves_the_derived_file_and_completes_progress() {
    let payload: &'static [u8] = b"PK\x03\x04 not a real docx but binary enough";
    let addr = spawn(Router::new().route(
        "/v1/format",
        post(move || async move { payload }),
    ))
    .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let file = write_transcript(&dir);
    let controller = TransferController::new(format!("http://{addr}/v1/format"))
        .with_ticker(Duration::from_millis(5), 20);
    let sink = Arc::new(RecordingSink::default());

    let saved = controller
        .submit(&file, dir.path(), sink.clone())
        .await
        .expect("submission succeeds");

    assert_eq!(
        saved.file_name().and_then(|n| n.to_str()),
        Some("formatted_episode.docx")
    );
    assert_eq!(std::fs::read(&saved).expect("read saved file"), payload);

    // Progress is monotonic, simulated values stay under the ceiling, and
    // 100 appears only as the terminal report.
    let values = sink.values.lock().expect("sink lock").clone();
    assert!(!values.is_empty());
    assert!(values.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*values.last().expect("terminal report"), 100);
    for value in &values[..values.len() - 1] {
        assert!(*value <= SIMULATED_CEILING, "premature 100 in {values:?}");
    }
}

#[tokio::test]
async fn empty_input_files_are_rejected_before_any_request() {
    let hits = Arc::new(AtomicUsize::new(0));
    let addr = spawn(counting_router(StatusCode::OK, "unused", hits.clone())).await;

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("empty.txt");
    std::fs::write(&path, b"").expect("write empty file");

    let controller = TransferController::new(format!("http://{addr}/v1/format"));
    let err = controller
        .submit(&path, dir.path(), Arc::new(RecordingSink::default()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Input(_)));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}
