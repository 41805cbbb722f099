mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use common::{settings_for, TestSink};
use futures_util::{stream, StreamExt};
use hairvision_engine::{
    run_job, Backend, BodyStream, EngineError, EngineEvent, FailureKind, JobId, JobOutcome,
    JobResponse, JobSubmitter, ReqwestSubmitter, StructuredResponse, Upload,
    MAX_STRUCTURED_BODY,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn upload() -> Upload {
    Upload::new("portrait.jpg", vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3])
}

#[tokio::test]
async fn streamed_job_reports_process_id_and_lines() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run-unihair"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Process-ID", "proc-42")
                .set_body_raw(
                    "aaa\n增强文件: /download/x1_enhance.ply\n精细文件: /download/x2_refine.ply\n",
                    "text/plain; charset=utf-8",
                ),
        )
        .expect(1)
        .mount(&server)
        .await;

    let submitter = ReqwestSubmitter::new(settings_for(&server.uri())).unwrap();
    let sink = TestSink::new();
    let token = CancellationToken::new();
    let outcome = run_job(&submitter, 1, upload(), Backend::Local, &token, &sink)
        .await
        .unwrap();

    assert_eq!(outcome, JobOutcome::Streamed { lines: 3 });
    assert_eq!(
        sink.lines(),
        vec![
            "aaa".to_string(),
            "增强文件: /download/x1_enhance.ply".to_string(),
            "精细文件: /download/x2_refine.ply".to_string(),
        ]
    );
    let events = sink.take();
    assert_eq!(
        events[0],
        EngineEvent::ResponseStarted {
            job_id: 1,
            process_id: Some("proc-42".to_string()),
        }
    );

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"file\""));
    assert!(body.contains("filename=\"portrait.jpg\""));
}

#[tokio::test]
async fn json_error_short_circuits_without_lines() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run-unihair"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "decode failed"})))
        .mount(&server)
        .await;

    let submitter = ReqwestSubmitter::new(settings_for(&server.uri())).unwrap();
    let sink = TestSink::new();
    let outcome = run_job(
        &submitter,
        2,
        upload(),
        Backend::Remote,
        &CancellationToken::new(),
        &sink,
    )
    .await
    .unwrap();

    assert_eq!(
        outcome,
        JobOutcome::Structured(StructuredResponse::Error("decode failed".to_string()))
    );
    assert!(sink.lines().is_empty());
}

#[tokio::test]
async fn oversized_json_body_is_a_decode_failure() {
    let server = MockServer::start().await;
    let padding = "x".repeat(MAX_STRUCTURED_BODY);
    Mock::given(method("POST"))
        .and(path("/run-unihair"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": padding })))
        .mount(&server)
        .await;

    let submitter = ReqwestSubmitter::new(settings_for(&server.uri())).unwrap();
    let sink = TestSink::new();
    let err = run_job(
        &submitter,
        3,
        upload(),
        Backend::Local,
        &CancellationToken::new(),
        &sink,
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind, FailureKind::Decode);
    assert!(err.message.contains("exceeds"));
    assert!(sink.lines().is_empty());
}

#[tokio::test]
async fn json_artifacts_are_returned_whole() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run-unihair"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "enhance": "/download/a_enhance.ply",
            "refine": "/download/a_refine.ply",
        })))
        .mount(&server)
        .await;

    let submitter = ReqwestSubmitter::new(settings_for(&server.uri())).unwrap();
    let outcome = run_job(
        &submitter,
        3,
        upload(),
        Backend::Local,
        &CancellationToken::new(),
        &TestSink::new(),
    )
    .await
    .unwrap();
    assert_eq!(
        outcome,
        JobOutcome::Structured(StructuredResponse::Artifacts {
            enhance: "/download/a_enhance.ply".to_string(),
            refine: "/download/a_refine.ply".to_string(),
        })
    );
}

#[tokio::test]
async fn server_error_status_fails_the_job() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run-unihair"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let submitter = ReqwestSubmitter::new(settings_for(&server.uri())).unwrap();
    let sink = TestSink::new();
    let err = run_job(
        &submitter,
        4,
        upload(),
        Backend::Local,
        &CancellationToken::new(),
        &sink,
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(500));
    assert!(sink.take().is_empty());
}

#[tokio::test]
async fn empty_upload_is_refused_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let submitter = ReqwestSubmitter::new(settings_for(&server.uri())).unwrap();
    let err = run_job(
        &submitter,
        5,
        Upload::new("empty.jpg", Vec::new()),
        Backend::Local,
        &CancellationToken::new(),
        &TestSink::new(),
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind, FailureKind::EmptyUpload);
}

#[tokio::test]
async fn cancel_before_headers_abandons_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run-unihair"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Process-ID", "late")
                .set_body_raw("never seen\n", "text/plain")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let submitter = ReqwestSubmitter::new(settings_for(&server.uri())).unwrap();
    let sink = TestSink::new();
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let started = std::time::Instant::now();
    let err = run_job(&submitter, 6, upload(), Backend::Local, &token, &sink)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert!(started.elapsed() < Duration::from_secs(4));
    assert!(sink.take().is_empty());
}

#[tokio::test]
async fn upload_buffer_is_released_when_job_ends() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run-unihair"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("ok\n", "text/plain"))
        .mount(&server)
        .await;

    let submitter = ReqwestSubmitter::new(settings_for(&server.uri())).unwrap();
    let upload = upload();
    let data = upload.data.clone();
    assert_eq!(Arc::strong_count(&data), 2);
    run_job(
        &submitter,
        7,
        upload,
        Backend::Local,
        &CancellationToken::new(),
        &TestSink::new(),
    )
    .await
    .unwrap();
    assert_eq!(Arc::strong_count(&data), 1);
}

struct ChannelSubmitter {
    body: Mutex<Option<BodyStream>>,
}

#[async_trait::async_trait]
impl JobSubmitter for ChannelSubmitter {
    async fn submit(
        &self,
        _job_id: JobId,
        _upload: Upload,
        _backend: Backend,
    ) -> Result<JobResponse, EngineError> {
        let body = self.body.lock().unwrap().take().expect("single submission");
        Ok(JobResponse {
            process_id: Some("p-1".to_string()),
            content_type: Some("text/plain; charset=utf-8".to_string()),
            body,
        })
    }
}

#[tokio::test]
async fn chunks_after_cancellation_are_never_delivered() {
    let (tx, rx) = tokio::sync::mpsc::channel::<Bytes>(4);
    let body = stream::unfold(rx, |mut rx| async move {
        rx.recv()
            .await
            .map(|chunk| (Ok::<_, EngineError>(chunk), rx))
    })
    .boxed();
    let submitter = ChannelSubmitter {
        body: Mutex::new(Some(body)),
    };
    let sink = TestSink::new();
    let token = CancellationToken::new();

    let driver = async {
        tx.send(Bytes::from_static(b"step 1\nstep")).await.unwrap();
        while sink.lines().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        token.cancel();
        let _ = tx
            .send(Bytes::from(" 2\n增强文件: /download/z.ply\n".as_bytes().to_vec()))
            .await;
    };
    let (result, ()) = tokio::join!(
        run_job(&submitter, 8, upload(), Backend::Local, &token, &sink),
        driver
    );

    assert!(result.unwrap_err().is_cancelled());
    assert_eq!(sink.lines(), vec!["step 1".to_string()]);
}
