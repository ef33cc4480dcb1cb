use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use serde_json::{json, Value};

use test_utils::*;

/// End-to-end flows through the nested `/api` router with stubbed upstream services.

const RESUME: &str = "Jane Doe\nSenior backend engineer. Built Rust and Tokio services \
handling 20k requests per second. Led a team of four.";

const JOB_POSTING: &str = "Platform Engineer at Acme\n\
Responsibilities:\n\
- Design and operate async Rust services\n\
- Mentor engineers on the platform team\n\
Requirements:\n\
- 5+ years of backend experience\n\
- Production experience with PostgreSQL\n";

fn text_upload(kind: &str, text: &str) -> MultipartForm {
    MultipartForm::new()
        .add_text("kind", kind)
        .add_text("method", "text")
        .add_text("text", text)
}

#[tokio::test]
async fn test_probes_and_readiness() {
    let config = test_config(true);
    let state = test_state(&config, Arc::new(ScriptedModel::default()));
    let server = test_server(&state);

    let response = server.get("/api/live").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = server.get("/api/ready").await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);

    state
        .evaluator
        .initialize()
        .await
        .expect("Failed to embed reference answers");

    let response = server.get("/api/ready").await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_sign_in_then_use_protected_routes() {
    let config = test_config(true);
    let state = test_state(&config, Arc::new(ScriptedModel::default()));
    let server = test_server(&state);

    // Protected routes reject anonymous callers
    let response = server.post("/api/search").json(&json!({"query": "rust"})).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["status"], "error");

    let response = server
        .post("/api/auth/signin")
        .json(&json!({"email": "candidate@example.com", "password": "wrong-password"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = server
        .post("/api/auth/signin")
        .json(&json!({"email": "candidate@example.com", "password": TEST_PASSWORD}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let session: Value = response.json();
    let token = session["access_token"].as_str().expect("access token");
    assert_eq!(token, TEST_TOKEN);

    let bearer = format!("Bearer {token}");
    let response = server.get("/api/auth/user").add_header("authorization", &bearer).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let user: Value = response.json();
    assert_eq!(user["email"], "candidate@example.com");

    let response = server
        .post("/api/search")
        .add_header("authorization", &bearer)
        .json(&json!({"query": "rust jobs", "max_results": 5}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let results: Value = response.json();
    assert_eq!(results["results"].as_array().map(Vec::len), Some(2));

    let response = server
        .post("/api/auth/signout")
        .add_header("authorization", &bearer)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_upload_generate_and_grade_flow() {
    let config = test_config(false);
    let model = Arc::new(ScriptedModel::default());
    let state = test_state(&config, Arc::clone(&model));
    let server = test_server(&state);

    // Generating before any upload is a 404 for the unknown session
    let response = server
        .post("/api/questions/generate")
        .json(&json!({"session_id": "prep-1"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let resume_file = Part::bytes(RESUME.as_bytes().to_vec())
        .file_name("resume.txt")
        .mime_type("text/plain");
    let response = server
        .post("/api/sessions/prep-1/upload")
        .multipart(MultipartForm::new().add_text("kind", "resume").add_part("file", resume_file))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["item"]["method"], "file");
    assert_eq!(body["item"]["source"], "resume.txt");

    let response = server
        .post("/api/sessions/prep-1/upload")
        .multipart(text_upload("job_description", JOB_POSTING))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    let posting = &body["item"]["posting"];
    assert!(posting["responsibilities"]
        .as_array()
        .is_some_and(|items| items.iter().any(|i| i == "Design and operate async Rust services")));
    assert!(posting["qualifications"]
        .as_array()
        .is_some_and(|items| !items.is_empty()));

    let response = server.get("/api/sessions/prep-1").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let summary: Value = response.json();
    let kinds: Vec<&str> = summary["items"]
        .as_array()
        .expect("items")
        .iter()
        .filter_map(|item| item["kind"].as_str())
        .collect();
    assert_eq!(kinds, vec!["resume", "job_description"]);

    let response = server
        .post("/api/questions/generate")
        .json(&json!({"session_id": "prep-1", "count": 5}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    let questions = body["questions"].as_array().expect("questions");
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0]["category"], "technical");

    let prompts = model.prompts.lock().expect("prompt log").clone();
    let generation_prompt = prompts.last().expect("generation prompt");
    assert!(generation_prompt.contains("Tokio services"));
    assert!(generation_prompt.contains("Platform Engineer at Acme"));

    let response = server
        .post("/api/answers/grade")
        .json(&json!({
            "question": "Tell me about a Rust service you shipped.",
            "answer": "I rebuilt our ingestion service in Rust and cut latency in half.",
            "session_id": "prep-1"
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let grade: Value = response.json();
    assert_eq!(grade["score"], 9);
    assert_eq!(grade["strengths"][0], "Concrete example");

    let response = server
        .post("/api/answers/grade-batch")
        .json(&json!({
            "session_id": "prep-1",
            "answers": [
                {"question": "Why Acme?", "answer": "The platform team works on problems I enjoy."},
                {"question": "Biggest failure?", "answer": "   "}
            ]
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    let results = body["results"].as_array().expect("results");
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["grade"]["score"], 9);
    assert!(results[1]["error"].is_string());
    assert!(results[1].get("grade").is_none());

    let too_many: Vec<Value> = (0..4)
        .map(|i| json!({"question": format!("Q{i}"), "answer": "A"}))
        .collect();
    let response = server
        .post("/api/answers/grade-batch")
        .json(&json!({"answers": too_many}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_rejects_bad_input() {
    let config = test_config(false);
    let state = test_state(&config, Arc::new(ScriptedModel::default()));
    let server = test_server(&state);

    let response = server
        .post("/api/sessions/prep-2/upload")
        .multipart(text_upload("cover_letter", "Dear hiring manager"))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = server
        .post("/api/sessions/prep-2/upload")
        .multipart(text_upload("resume", "   "))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = server
        .post("/api/sessions/prep-2/upload")
        .multipart(
            MultipartForm::new()
                .add_text("kind", "resume")
                .add_text("method", "url")
                .add_text("url", "not a url"),
        )
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    // Nothing was stored for the rejected uploads
    let response = server.get("/api/sessions/prep-2").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_generation_requires_resume_or_job_description() {
    let config = test_config(false);
    let state = test_state(&config, Arc::new(ScriptedModel::default()));
    let server = test_server(&state);

    let response = server
        .post("/api/sessions/prep-3/upload")
        .multipart(text_upload("other_info", "I prefer remote work."))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = server
        .post("/api/questions/generate")
        .json(&json!({"session_id": "prep-3"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_company_research_is_stored_in_session() {
    let config = test_config(false);
    let state = test_state(&config, Arc::new(ScriptedModel::default()));
    let server = test_server(&state);

    let response = server
        .post("/api/sessions/prep-4/research")
        .json(&json!({"company": "Acme", "max_results": 3}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["answer"], "A developer tools company.");
    assert_eq!(body["session"]["items"][0]["kind"], "company_info");

    let session = state.sessions.get("prep-4").await.expect("stored session");
    assert_eq!(session.items.len(), 1);

    let response = server
        .post("/api/sessions/prep-4/research")
        .json(&json!({"company": "Acme", "query": "nothing to see"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = server
        .post("/api/sessions/prep-4/research")
        .json(&json!({"company": "  "}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_technical_questions_and_evaluation() {
    let config = test_config(false);
    let state = test_state(&config, Arc::new(ScriptedModel::default()));
    let server = test_server(&state);

    let response = server.get("/api/technical/questions").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    let all = body["questions"].as_array().map_or(0, Vec::len);
    assert_eq!(all, state.evaluator.references().len());

    let response = server.get("/api/technical/questions?role=Frontend").await;
    let body: Value = response.json();
    let frontend = body["questions"].as_array().expect("questions");
    assert!(!frontend.is_empty());
    assert!(frontend.iter().all(|q| q["role"] == "frontend"));

    // Evaluation loads reference vectors on demand
    let strong = server
        .post("/api/technical/evaluate")
        .json(&json!({
            "question_id": "be-http-idempotency",
            "answer": "Clients send an idempotency key with each POST; the server stores it \
                       under a unique constraint inside the same transaction so a retry \
                       returns the same result instead of charging twice."
        }))
        .await;
    assert_eq!(strong.status_code(), StatusCode::OK);
    let strong: Value = strong.json();
    assert!(strong["matched_keywords"]
        .as_array()
        .is_some_and(|kw| kw.iter().any(|k| k == "retry")));
    let score = strong["score"].as_u64().expect("score");
    assert!((1..=10).contains(&score));

    let weak: Value = server
        .post("/api/technical/evaluate")
        .json(&json!({"question_id": "be-http-idempotency", "answer": "I like pizza."}))
        .await
        .json();
    assert!(weak["blended_score"].as_f64() < strong["blended_score"].as_f64());
    assert!(weak["matched_keywords"].as_array().is_some_and(Vec::is_empty));

    let response = server
        .post("/api/technical/evaluate")
        .json(&json!({"question_id": "does-not-exist", "answer": "Anything"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = server
        .post("/api/technical/evaluate")
        .json(&json!({"question_id": "be-http-idempotency", "answer": ""}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_speech_round_trip() {
    let config = test_config(false);
    let state = test_state(&config, Arc::new(ScriptedModel::default()));
    let server = test_server(&state);

    let audio = Part::bytes(vec![0_u8; 32])
        .file_name("answer.webm")
        .mime_type("audio/webm");
    let response = server
        .post("/api/speech/transcribe")
        .multipart(
            MultipartForm::new()
                .add_part("audio", audio)
                .add_text("language_code", "en-GB"),
        )
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let transcript: Value = response.json();
    assert_eq!(transcript["transcript"], "32 bytes in en-GB");

    let empty = Part::bytes(Vec::new()).file_name("empty.webm").mime_type("audio/webm");
    let response = server
        .post("/api/speech/transcribe")
        .multipart(MultipartForm::new().add_part("audio", empty))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = server
        .post("/api/speech/synthesize")
        .json(&json!({"text": "Nice work"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.header("content-type"), "audio/mpeg");
    assert_eq!(&response.as_bytes()[..], b"ID3Nice work");

    let response = server
        .post("/api/speech/synthesize")
        .json(&json!({"text": ""}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}
