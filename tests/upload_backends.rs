//! ImgBB and Imgur backend tests through MockCommandRunner and
//! MockCredentialSource; no network, no real curl.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use pr_screenshots::backend::{Backend, ImgBbBackend, ImgurBackend, UploadError};
use pr_screenshots::config::MockCredentialSource;
use pr_screenshots::exec::{CommandOutcome, MockCommandRunner};
use tempfile::tempdir;

fn imgbb_credentials() -> Arc<MockCredentialSource> {
    let mut credentials = MockCredentialSource::new();
    credentials
        .expect_imgbb_api_key()
        .returning(|| Some("test-key".to_string()));
    Arc::new(credentials)
}

fn imgur_credentials() -> Arc<MockCredentialSource> {
    let mut credentials = MockCredentialSource::new();
    credentials
        .expect_imgur_client_id()
        .returning(|| Some("client-123".to_string()));
    Arc::new(credentials)
}

fn fixture(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn imgbb_upload_returns_the_display_url() {
    let dir = tempdir().unwrap();
    let file = fixture(&dir, "shot.png", b"png bytes");

    let mut runner = MockCommandRunner::new();
    runner
        .expect_run()
        .withf(|inv| {
            inv.program == "curl"
                && inv
                    .args
                    .iter()
                    .any(|a| a == "https://api.imgbb.com/1/upload?key=test-key")
                && inv.args.iter().any(|a| a.starts_with("image=@"))
        })
        .times(1)
        .returning(|_| {
            Ok(CommandOutcome::succeeded(
                r#"{"success":true,"data":{"display_url":"https://i.ibb.co/abc/shot.png"}}"#,
            ))
        });

    let backend = ImgBbBackend::new(Arc::new(runner), imgbb_credentials());
    let url = backend.upload(&file).await.unwrap();
    assert_eq!(url, "https://i.ibb.co/abc/shot.png");
}

#[tokio::test]
async fn imgbb_surfaces_the_remote_error_message_verbatim() {
    let dir = tempdir().unwrap();
    let file = fixture(&dir, "shot.png", b"png bytes");

    let mut runner = MockCommandRunner::new();
    runner.expect_run().times(1).returning(|_| {
        Ok(CommandOutcome::succeeded(
            r#"{"success":false,"error":{"message":"Invalid API key","code":100}}"#,
        ))
    });

    let backend = ImgBbBackend::new(Arc::new(runner), imgbb_credentials());
    let err = backend.upload(&file).await.unwrap_err();
    match err {
        UploadError::Rejected { message, .. } => assert_eq!(message, "Invalid API key"),
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn imgbb_rejects_a_non_json_response() {
    let dir = tempdir().unwrap();
    let file = fixture(&dir, "shot.png", b"png bytes");

    let mut runner = MockCommandRunner::new();
    runner
        .expect_run()
        .times(1)
        .returning(|_| Ok(CommandOutcome::succeeded("<html>rate limited</html>")));

    let backend = ImgBbBackend::new(Arc::new(runner), imgbb_credentials());
    let err = backend.upload(&file).await.unwrap_err();
    assert!(matches!(err, UploadError::MalformedResponse { .. }));
}

#[tokio::test]
async fn imgbb_curl_failure_is_a_transport_error() {
    let dir = tempdir().unwrap();
    let file = fixture(&dir, "shot.png", b"png bytes");

    let mut runner = MockCommandRunner::new();
    runner
        .expect_run()
        .times(1)
        .returning(|_| Ok(CommandOutcome::failed("curl: (6) could not resolve host")));

    let backend = ImgBbBackend::new(Arc::new(runner), imgbb_credentials());
    let err = backend.upload(&file).await.unwrap_err();
    match err {
        UploadError::Transport { stderr, .. } => assert!(stderr.contains("resolve host")),
        other => panic!("expected Transport, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_imgbb_key_fails_before_any_external_call() {
    let mut credentials = MockCredentialSource::new();
    credentials.expect_imgbb_api_key().returning(|| None);

    // No runner expectations: a spawned process would panic the mock.
    let backend = ImgBbBackend::new(Arc::new(MockCommandRunner::new()), Arc::new(credentials));
    let err = backend.ensure_ready().await.unwrap_err();
    assert!(matches!(err, UploadError::MissingCredential(_)));
    assert!(err.to_string().contains("IMGBB_API_KEY"));
}

#[tokio::test]
async fn imgur_upload_sends_base64_content_and_returns_the_link() {
    let dir = tempdir().unwrap();
    let file = fixture(&dir, "shot.png", b"imgur bytes");
    let encoded = BASE64.encode(b"imgur bytes");

    let mut runner = MockCommandRunner::new();
    runner
        .expect_run()
        .withf(move |inv| {
            inv.program == "curl"
                && inv.has_arg("https://api.imgur.com/3/image")
                && inv.has_arg("Authorization: Client-ID client-123")
                && inv.has_arg(&format!("image={encoded}"))
                && inv.has_arg("type=base64")
        })
        .times(1)
        .returning(|_| {
            Ok(CommandOutcome::succeeded(
                r#"{"success":true,"data":{"link":"https://i.imgur.com/xyz.png"}}"#,
            ))
        });

    let backend = ImgurBackend::new(Arc::new(runner), imgur_credentials());
    let url = backend.upload(&file).await.unwrap();
    assert_eq!(url, "https://i.imgur.com/xyz.png");
}

#[tokio::test]
async fn imgur_surfaces_the_remote_error() {
    let dir = tempdir().unwrap();
    let file = fixture(&dir, "shot.png", b"png bytes");

    let mut runner = MockCommandRunner::new();
    runner.expect_run().times(1).returning(|_| {
        Ok(CommandOutcome::succeeded(
            r#"{"success":false,"data":{"error":"File is over the size limit"}}"#,
        ))
    });

    let backend = ImgurBackend::new(Arc::new(runner), imgur_credentials());
    let err = backend.upload(&file).await.unwrap_err();
    match err {
        UploadError::Rejected { message, .. } => {
            assert_eq!(message, "File is over the size limit")
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_imgur_client_id_fails_before_any_external_call() {
    let mut credentials = MockCredentialSource::new();
    credentials.expect_imgur_client_id().returning(|| None);

    let backend = ImgurBackend::new(Arc::new(MockCommandRunner::new()), Arc::new(credentials));
    let err = backend.ensure_ready().await.unwrap_err();
    assert!(matches!(err, UploadError::MissingCredential(_)));
}

#[tokio::test]
async fn ceilings_differ_per_backend() {
    let imgbb = ImgBbBackend::new(Arc::new(MockCommandRunner::new()), imgbb_credentials());
    let imgur = ImgurBackend::new(Arc::new(MockCommandRunner::new()), imgur_credentials());
    assert_eq!(imgbb.ceiling(), 32 * 1024 * 1024);
    assert_eq!(imgur.ceiling(), 10 * 1024 * 1024);
}
