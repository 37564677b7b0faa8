//! End-to-end tests for question submission and the event stream.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, default_app, login, post_json, sse_messages, FakeEngine};
use ragstream_core::job::SearchBudget;
use serde_json::json;

#[tokio::test]
async fn successful_job_streams_logs_then_answer_then_finished() {
    let app = build_test_app(FakeEngine::answering(
        &["Searching graph...\n", "Found 3 entities\n"],
        "Fever is usually caused by infection.",
    ));
    let token = login(&app).await;

    let response = post_json(
        &app,
        "/api/v1/ask",
        json!({ "question": "What causes fever?", "enable_multi_hop": false, "search_budget": "Shallow" }),
        Some(&token),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );

    let messages = sse_messages(response).await;
    let types: Vec<&str> = messages
        .iter()
        .map(|m| m["type"].as_str().unwrap())
        .collect();
    assert_eq!(types, ["log_html", "log_html", "answer", "finished"]);
    assert!(messages[0]["content"]
        .as_str()
        .unwrap()
        .contains("Searching graph..."));
    assert!(messages[1]["content"]
        .as_str()
        .unwrap()
        .contains("Found 3 entities"));
    assert_eq!(
        messages[2]["content"],
        "Fever is usually caused by infection."
    );
    assert!(messages[3].get("content").is_none());

    let query = app.engine.last_query().unwrap();
    assert_eq!(query.question, "What causes fever?");
    assert!(!query.enable_multi_hop);
    assert_eq!(query.search_budget, SearchBudget::Shallow);
    assert_eq!(query.credentials.uri, "bolt://localhost:7687");
    assert!(!app.engine.console_redirected());
}

#[tokio::test]
async fn failed_job_streams_error_then_finished() {
    let app = build_test_app(FakeEngine::failing(&["Connecting...\n"], "graph timeout"));
    let token = login(&app).await;

    let response = post_json(
        &app,
        "/api/v1/ask",
        json!({ "question": "What causes fever?" }),
        Some(&token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let messages = sse_messages(response).await;
    let last_two: Vec<&str> = messages[messages.len() - 2..]
        .iter()
        .map(|m| m["type"].as_str().unwrap())
        .collect();
    assert_eq!(last_two, ["error", "finished"]);
    assert_eq!(
        messages[messages.len() - 2]["content"],
        "An error occurred: graph timeout"
    );
    assert!(messages.iter().all(|m| m["type"] != "answer"));
    assert!(!app.engine.console_redirected());
}

#[tokio::test]
async fn defaults_apply_when_options_are_omitted() {
    let app = default_app();
    let token = login(&app).await;

    let response = post_json(&app, "/api/v1/ask", json!({ "question": "q" }), Some(&token)).await;
    sse_messages(response).await;

    let query = app.engine.last_query().unwrap();
    assert!(query.enable_multi_hop);
    assert_eq!(query.search_budget, SearchBudget::Deeper);
}

#[tokio::test]
async fn blank_question_is_rejected_without_running_the_engine() {
    let app = default_app();
    let token = login(&app).await;

    for body in [json!({ "question": "   " }), json!({})] {
        let response = post_json(&app, "/api/v1/ask", body, Some(&token)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["error"], "No question provided.");
    }
    assert_eq!(app.engine.calls(), 0);
}

#[tokio::test]
async fn unknown_search_budget_is_rejected() {
    let app = default_app();
    let token = login(&app).await;

    let response = post_json(
        &app,
        "/api/v1/ask",
        json!({ "question": "q", "search_budget": "Exhaustive" }),
        Some(&token),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
    assert_eq!(app.engine.calls(), 0);
}

#[tokio::test]
async fn unauthenticated_ask_returns_401() {
    let app = default_app();
    let response = post_json(&app, "/api/v1/ask", json!({ "question": "q" }), None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["error"],
        "Missing Authorization header"
    );
    assert_eq!(app.engine.calls(), 0);
}

#[tokio::test]
async fn consecutive_jobs_each_get_their_own_stream() {
    let app = default_app();
    let token = login(&app).await;

    for _ in 0..2 {
        let response =
            post_json(&app, "/api/v1/ask", json!({ "question": "q" }), Some(&token)).await;
        let messages = sse_messages(response).await;
        assert_eq!(messages.last().unwrap()["type"], "finished");
        assert_eq!(
            messages.iter().filter(|m| m["type"] == "answer").count(),
            1
        );
    }
    assert_eq!(app.engine.calls(), 2);
}
