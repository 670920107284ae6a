use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::get,
    Router,
};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;
use uuid::Uuid;

use formflow_backend::models::answer::AnswerValue;
use formflow_backend::storage::MemoryStore;
use formflow_backend::AppState;

fn integration_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/integration/forms",
            get(formflow_backend::routes::integration::list_forms)
                .post(formflow_backend::routes::integration::create_form),
        )
        .route(
            "/api/integration/forms/:id",
            get(formflow_backend::routes::integration::get_form),
        )
        .route(
            "/api/integration/forms/:id/responses",
            get(formflow_backend::routes::integration::list_form_responses),
        )
        .route(
            "/api/integration/responses/:id",
            get(formflow_backend::routes::integration::get_response),
        )
        .layer(axum::middleware::from_fn_with_state(
            formflow_backend::middleware::rate_limit::new_rps_state(1000),
            formflow_backend::middleware::rate_limit::rps_middleware,
        ))
        .with_state(state)
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Option<JsonValue>) -> (StatusCode, JsonValue) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let json = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn form_lifecycle_over_http() {
    let state = AppState::new(Arc::new(MemoryStore::new()), 32);
    let app = integration_router(state);

    let (q1, q2) = (Uuid::new_v4(), Uuid::new_v4());
    let payload = json!({
        "title": "Churn survey",
        "description": "Why are you leaving?",
        "questions": [
            {
                "id": q1,
                "type": "multiple_choice",
                "label": "Main reason?",
                "required": true,
                "settings": { "options": ["Price", "Missing features", "Other"] },
                "logic": {
                    "rules": [
                        {
                            "conditions": [{ "operator": "equals", "value": "Other" }],
                            "condition_operator": "AND",
                            "action": { "type": "end" }
                        }
                    ],
                    "default_action": "next"
                }
            },
            { "id": q2, "type": "long_text", "label": "Anything else?" }
        ]
    });

    let (status, body) = send_json(&app, "POST", "/api/integration/forms", Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED);
    let form_id = body["id"].as_str().unwrap().to_string();
    assert_eq!(body["questions"].as_array().unwrap().len(), 2);
    assert_eq!(body["questions"][0]["position"], json!(1));
    assert_eq!(body["questions"][1]["position"], json!(2));

    let (status, body) = send_json(&app, "GET", "/api/integration/forms", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], json!(1));
    assert_eq!(body["items"][0]["question_count"], json!(2));
    assert_eq!(body["items"][0]["response_count"], json!(0));

    let (status, body) = send_json(
        &app,
        "GET",
        &format!("/api/integration/forms/{}", form_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // the builder view keeps the branching configuration
    assert_eq!(
        body["questions"][0]["logic"]["rules"][0]["action"]["type"],
        json!("end")
    );

    let (status, _) = send_json(
        &app,
        "GET",
        &format!("/api/integration/forms/{}", Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_form_rejects_blank_title() {
    let state = AppState::new(Arc::new(MemoryStore::new()), 32);
    let app = integration_router(state);

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/integration/forms",
        Some(json!({ "title": "", "questions": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn read_model_exposes_full_answer_history() {
    let state = AppState::new(Arc::new(MemoryStore::new()), 32);

    let (q1, q2) = (Uuid::new_v4(), Uuid::new_v4());
    let (form, questions) = state
        .form_service
        .create_form(formflow_backend::dto::integration_dto::CreateFormPayload {
            title: "Two step form".into(),
            description: None,
            is_active: None,
            questions: vec![
                formflow_backend::dto::integration_dto::CreateQuestionPayload {
                    id: Some(q1),
                    question_type: formflow_backend::models::question::QuestionType::ShortText,
                    label: "First".into(),
                    required: None,
                    settings: None,
                    logic: None,
                },
                formflow_backend::dto::integration_dto::CreateQuestionPayload {
                    id: Some(q2),
                    question_type: formflow_backend::models::question::QuestionType::ShortText,
                    label: "Second".into(),
                    required: None,
                    settings: None,
                    logic: None,
                },
            ],
        })
        .await
        .expect("create form");
    assert_eq!(questions.len(), 2);

    // drive one session: answer, go back, re-answer, finish
    let started = state.session_service.start(form.id).await.expect("start");
    let token = started.response.session_token.clone();
    state
        .session_service
        .submit_answer(&token, q1, AnswerValue::Text("draft".into()))
        .await
        .expect("first answer");
    state
        .session_service
        .navigate_back(&token, q2)
        .await
        .expect("back");
    state
        .session_service
        .submit_answer(&token, q1, AnswerValue::Text("final".into()))
        .await
        .expect("re-answer");
    state
        .session_service
        .submit_answer(&token, q2, AnswerValue::Skipped)
        .await
        .expect("second answer");

    let response_id = started.response.id;
    let app = integration_router(state);

    let (status, body) = send_json(
        &app,
        "GET",
        &format!("/api/integration/forms/{}/responses", form.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], json!(1));
    let answers = body["items"][0]["answers"].as_array().unwrap();
    // superseded draft + current final + skipped second question
    assert_eq!(answers.len(), 3);
    let current: Vec<&JsonValue> = answers
        .iter()
        .filter(|a| a["is_current"] == json!(true))
        .collect();
    assert_eq!(current.len(), 2);
    assert_eq!(body["items"][0]["response"]["status"], json!("completed"));
    // the respondent credential stays out of the read model
    assert!(body["items"][0]["response"].get("session_token").is_none());

    let (status, body) = send_json(
        &app,
        "GET",
        &format!("/api/integration/responses/{}", response_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["questions"].as_array().unwrap().len(), 2);
    assert_eq!(
        body["answers"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|a| a["value"] == json!({ "type": "skipped" }))
            .count(),
        1
    );
}
