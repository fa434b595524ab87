mod common;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use http_body_util::BodyExt;
use quiz_arena_back::{routes, state::SharedState};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> Response {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        request = request.header("X-User-Id", user);
    }
    let body = match body {
        Some(value) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    app.clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn open_session(app: &Router) -> String {
    let response = send(
        app,
        Method::POST,
        "/sessions",
        Some("host"),
        Some(json!({ "quiz_id": "trivia", "time_per_question_seconds": 10, "manual_pace": true })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["code"]
        .as_str()
        .unwrap()
        .to_owned()
}

fn app(state: &SharedState) -> Router {
    routes::router(state.clone())
}

#[tokio::test]
async fn malformed_codes_are_rejected_before_lookup() {
    let state = common::arena();
    let app = app(&state);

    for code in ["ABCDE", "ABCDEFG", "ABCDE0", "ABCDE1", "ABCDEI", "ABCDEO"] {
        let response = send(&app, Method::GET, &format!("/sessions/{code}"), None, None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "code {code}");
    }

    // Well formed but unknown: the lookup runs and finds nothing.
    let response = send(&app, Method::GET, "/sessions/ABCDEF", None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn lowercase_codes_resolve_to_the_session() {
    let state = common::arena();
    let app = app(&state);
    let code = open_session(&app).await;

    let uri = format!("/sessions/{}", code.to_lowercase());
    let response = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["code"], code.as_str());
}

#[tokio::test]
async fn missing_identity_is_unauthorized() {
    let state = common::arena();
    let app = app(&state);
    let code = open_session(&app).await;

    let response = send(&app, Method::POST, &format!("/sessions/{code}/start"), None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn late_answers_are_refused_with_the_current_score() {
    let state = common::arena();
    let app = app(&state);
    let code = open_session(&app).await;

    let response = send(
        &app,
        Method::POST,
        &format!("/sessions/{code}/participants"),
        Some("alice"),
        Some(json!({ "name": "Alice" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = send(&app, Method::POST, &format!("/sessions/{code}/start"), Some("host"), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let answers = format!("/sessions/{code}/answers");
    let answer = json!({ "question_index": 0, "answer": "one", "time_remaining_seconds": 8.0 });
    let response = send(&app, Method::POST, &answers, Some("alice"), Some(answer.clone())).await;
    assert_eq!(response.status(), StatusCode::OK);
    let scored = body_json(response).await;
    assert_eq!(scored["accepted"], true);
    assert_eq!(scored["score"], 90);

    let response = send(&app, Method::POST, &format!("/sessions/{code}/advance"), Some("host"), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, Method::POST, &answers, Some("alice"), Some(answer.clone())).await;
    assert_eq!(response.status(), StatusCode::OK);
    let late = body_json(response).await;
    assert_eq!(late["accepted"], false);
    assert_eq!(late["points_awarded"], 0);
    assert_eq!(late["score"], 90);

    let response = send(&app, Method::POST, &answers, Some("mallory"), Some(answer)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
