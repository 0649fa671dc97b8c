//! End-to-end pipeline tests, with the hosted capability stubbed by a
//! throwaway HTTP server speaking the Messages API envelope.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::post;
use axum::Json;

use galley::claude::ClaudeClassifier;
use galley::classifier::Classifier;
use galley::rules::RuleClassifier;
use galley::{Config, Error, Galley};

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

/// A capability stub that always answers with `reply` as its text content.
fn capability_router(reply: &'static str) -> Router {
    Router::new().route(
        "/v1/messages",
        post(move || async move {
            Json(serde_json::json!({
                "content": [{ "type": "text", "text": reply }]
            }))
        }),
    )
}

fn test_config() -> Config {
    Config {
        api_key: Some("test-key".to_string()),
        chunk_delay_secs: 0,
        ..Config::default()
    }
}

async fn classifier_against(addr: SocketAddr) -> ClaudeClassifier {
    ClaudeClassifier::new(&test_config())
        .expect("classifier builds")
        .with_endpoint(format!("http://{addr}/v1/messages"))
}

#[tokio::test]
async fn hosted_capability_output_flows_through_to_a_document() {
    let addr = spawn(capability_router(
        r#"```json
{
  "title": "Living in the Last Days",
  "paragraphs": [
    {
      "text": "Dr. Billy Wilson: \"Be still\"",
      "runs": [
        { "text": "Dr. Billy Wilson:", "bold": true, "italic": false },
        { "text": " \"Be still\"", "bold": false, "italic": true }
      ]
    }
  ]
}
```"#,
    ))
    .await;

    let classifier = classifier_against(addr).await;
    let doc = classifier
        .classify("raw transcript text", None)
        .await
        .expect("classification succeeds");

    assert_eq!(doc.title, "Living in the Last Days");
    assert_eq!(doc.paragraphs.len(), 1);
    assert_eq!(doc.paragraphs[0].runs.len(), 2);
    assert!(doc.paragraphs[0].runs[0].bold);
    assert!(doc.paragraphs[0].runs[1].italic);
}

#[tokio::test]
async fn malformed_capability_output_fails_with_a_schema_error() {
    // Valid JSON, but the paragraphs key is missing.
    let addr = spawn(capability_router(r#"{"title": "no body"}"#)).await;

    let classifier = classifier_against(addr).await;
    let err = classifier
        .classify("raw transcript text", None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Schema(_)));
}

#[tokio::test]
async fn non_json_capability_output_fails_with_a_classification_error() {
    let addr = spawn(capability_router("Sorry, I cannot help with that.")).await;

    let classifier = classifier_against(addr).await;
    let err = classifier
        .classify("raw transcript text", None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Classification(_)));
}

#[tokio::test]
async fn unreachable_capability_fails_with_a_classification_error() {
    // Nothing listens on this port.
    let classifier = ClaudeClassifier::new(&test_config())
        .expect("classifier builds")
        .with_endpoint("http://127.0.0.1:9/v1/messages");

    let err = classifier
        .classify("raw transcript text", None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Classification(_)));
}

#[tokio::test]
async fn missing_credential_is_rejected_at_construction() {
    let config = Config {
        api_key: None,
        ..Config::default()
    };
    assert!(matches!(
        ClaudeClassifier::new(&config).unwrap_err(),
        Error::Classification(_)
    ));
}

#[tokio::test]
async fn full_pipeline_renders_hosted_output_into_a_document() {
    let addr = spawn(capability_router(
        r#"{"title": "T", "paragraphs": [{"text": "Announcer: hello", "runs": []}]}"#,
    ))
    .await;

    let galley = Galley::new(Box::new(classifier_against(addr).await));
    let bytes = galley
        .format("Show Title\n\nAnnouncer: hello\n")
        .await
        .expect("pipeline completes");

    assert_eq!(&bytes[..2], b"PK");
    let parsed = docx_rs::read_docx(&bytes).expect("output is a readable docx");
    assert!(parsed.json().contains("Announcer: hello"));
}

#[tokio::test]
async fn schema_violations_do_not_emit_documents_unless_fallback_is_enabled() {
    let addr = spawn(capability_router(r#"{"title": "broken"}"#)).await;

    // Strict by default: the request fails, no document.
    let strict = Galley::new(Box::new(classifier_against(addr).await));
    let err = strict.format("Title\n\nbody line").await.unwrap_err();
    assert!(matches!(err, Error::Schema(_)));

    // With the rule fallback the same transcript still formats.
    let lenient = Galley::new(Box::new(classifier_against(addr).await)).with_rule_fallback();
    let bytes = lenient
        .format("Title\n\nbody line")
        .await
        .expect("fallback covers the failure");
    assert_eq!(&bytes[..2], b"PK");
}

#[tokio::test]
async fn rule_engine_satisfies_the_detection_contract_end_to_end() {
    let galley = Galley::new(Box::new(RuleClassifier));
    let bytes = galley
        .format(
            "Living in the Last Days\n\n♪♪♪\nDr. Billy Wilson: \"Be still\"\nTurn to 1 John 2:18.\n♪ give me Jesus ♪\n",
        )
        .await
        .expect("pipeline completes");

    let parsed = docx_rs::read_docx(&bytes).expect("output is a readable docx");
    let rendered = parsed.json();
    assert!(rendered.contains("Living in the Last Days"));
    assert!(rendered.contains("Dr. Billy Wilson:"));
    assert!(rendered.contains("1 John 2:18"));
    assert!(rendered.contains("give me Jesus"));
}
