use api_state::ApiState;
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use middleware_api_auth::api_auth;
use routes::{
    auth::{current_user, sign_in, sign_out, sign_up},
    interview::{generate, grade, grade_many},
    liveness::live,
    readiness::ready,
    search::web_search,
    sessions::{get_session, research_company, upload_content},
    speech::{synthesize, transcribe},
    technical::{evaluate, list_questions},
};

pub mod api_state;
pub mod error;
mod extract;
mod middleware_api_auth;
mod routes;

/// Router for the interview-prep API, meant to be nested under `/api`.
pub fn api_routes<S>(app_state: &ApiState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    let upload_limit = DefaultBodyLimit::max(app_state.config.upload_max_body_bytes);

    // Public, unauthenticated endpoints (probes and sign-in flow)
    let public = Router::new()
        .route("/ready", get(ready))
        .route("/live", get(live))
        .route("/auth/signup", post(sign_up))
        .route("/auth/signin", post(sign_in))
        .route("/auth/signout", post(sign_out))
        .route("/auth/user", get(current_user));

    // Protected API endpoints (require a Supabase access token unless auth is disabled)
    let protected = Router::new()
        .route(
            "/sessions/{id}/upload",
            post(upload_content).layer(upload_limit.clone()),
        )
        .route("/sessions/{id}", get(get_session))
        .route("/sessions/{id}/research", post(research_company))
        .route("/questions/generate", post(generate))
        .route("/answers/grade", post(grade))
        .route("/answers/grade-batch", post(grade_many))
        .route("/technical/questions", get(list_questions))
        .route("/technical/evaluate", post(evaluate))
        .route("/speech/transcribe", post(transcribe).layer(upload_limit))
        .route("/speech/synthesize", post(synthesize))
        .route("/search", post(web_search))
        .route_layer(from_fn_with_state(app_state.clone(), api_auth));

    public.merge(protected)
}
