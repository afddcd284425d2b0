//! services/api/src/web/learning.rs
//!
//! Tutoring, quiz, progress and parent update endpoints.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smartstudy_core::domain::{
    ParentUpdate, ProblemSolution, ProgressReport, Quiz, QuizResults, TutorExplanation,
};
use smartstudy_core::ports::PortError;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use crate::error::HttpError;
use crate::web::extract::ApiJson;
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, Default, ToSchema)]
#[serde(default)]
pub struct ExplainRequest {
    pub topic: Option<String>,
    pub level: Option<String>,
    pub context: Option<String>,
}

#[derive(Deserialize, Default, ToSchema)]
#[serde(default)]
pub struct SolveRequest {
    pub problem: Option<String>,
    pub steps: Option<bool>,
}

#[derive(Deserialize, Default, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerateQuizRequest {
    pub topic: Option<String>,
    pub difficulty: Option<String>,
    pub focus_area: Option<String>,
    pub student_level: Option<String>,
}

#[derive(Deserialize, Default, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct SubmitQuizRequest {
    pub quiz_id: Option<u64>,
    /// Answers keyed by question id.
    pub answers: Option<HashMap<String, String>>,
}

#[derive(Deserialize, Default, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ParentUpdateRequest {
    /// A string or numeric student id.
    #[schema(value_type = String)]
    pub student_id: Option<Value>,
}

#[derive(Serialize)]
pub struct ExplainResponse {
    pub message: String,
    pub explanation: TutorExplanation,
}

#[derive(Serialize)]
pub struct SolveResponse {
    pub message: String,
    pub solution: ProblemSolution,
}

#[derive(Serialize)]
pub struct QuizResponse {
    pub message: String,
    pub quiz: Quiz,
}

#[derive(Serialize)]
pub struct SubmitResponse {
    pub message: String,
    pub results: QuizResults,
}

#[derive(Serialize)]
pub struct ParentUpdateResponse {
    pub message: String,
    pub update: ParentUpdate,
}

#[derive(Serialize)]
pub struct ParentUpdatesResponse {
    pub updates: Vec<ParentUpdate>,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Accepts `"42"` or `42` as an id.
fn id_string(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Logs the failure and keeps client errors, hiding everything else behind
/// "Failed to <action>".
fn server_error(action: &'static str) -> impl Fn(PortError) -> HttpError {
    move |e| {
        error!("{} error: {}", action, e);
        match e {
            PortError::Validation(message) => HttpError::bad_request(message),
            PortError::NotFound(message) => HttpError::not_found(message),
            _ => HttpError::internal(format!("Failed to {}", action.to_lowercase())),
        }
    }
}

//=========================================================================================
// Tutor Handlers
//=========================================================================================

/// Explain a topic at the requested level (`kid`, `high-school` or `advanced`).
#[utoipa::path(
    post,
    path = "/api/tutor/explain",
    request_body = ExplainRequest,
    responses(
        (status = 200, description = "Explanation generated successfully"),
        (status = 400, description = "Topic is required")
    ),
    security(("bearer" = []))
)]
pub async fn explain_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ExplainRequest>,
) -> Result<Json<ExplainResponse>, HttpError> {
    let topic = present(req.topic).ok_or_else(|| HttpError::bad_request("Topic is required"))?;
    let level = present(req.level).unwrap_or_else(|| "high-school".to_string());
    let context = req.context.unwrap_or_default();

    let explanation = state
        .tutor
        .explain(&topic, &level, &context)
        .await
        .map_err(server_error("Generate explanation"))?;

    Ok(Json(ExplainResponse {
        message: "Explanation generated successfully".to_string(),
        explanation,
    }))
}

/// Solve a problem, listing the steps unless `steps` is false.
#[utoipa::path(
    post,
    path = "/api/tutor/solve",
    request_body = SolveRequest,
    responses(
        (status = 200, description = "Solution generated successfully"),
        (status = 400, description = "Problem is required")
    ),
    security(("bearer" = []))
)]
pub async fn solve_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<SolveRequest>,
) -> Result<Json<SolveResponse>, HttpError> {
    let problem =
        present(req.problem).ok_or_else(|| HttpError::bad_request("Problem is required"))?;

    let solution = state
        .tutor
        .solve(&problem, req.steps.unwrap_or(true))
        .await
        .map_err(server_error("Generate solution"))?;

    Ok(Json(SolveResponse {
        message: "Solution generated successfully".to_string(),
        solution,
    }))
}

//=========================================================================================
// Quiz Handlers
//=========================================================================================

/// Generate and store a five-question quiz.
#[utoipa::path(
    post,
    path = "/api/quiz/generate",
    request_body = GenerateQuizRequest,
    responses(
        (status = 200, description = "Quiz generated successfully"),
        (status = 400, description = "Topic is required")
    ),
    security(("bearer" = []))
)]
pub async fn generate_quiz_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<GenerateQuizRequest>,
) -> Result<Json<QuizResponse>, HttpError> {
    let topic = present(req.topic).ok_or_else(|| HttpError::bad_request("Topic is required"))?;
    let difficulty = present(req.difficulty).unwrap_or_else(|| "medium".to_string());
    let focus_area = req.focus_area.unwrap_or_default();
    let student_level = present(req.student_level).unwrap_or_else(|| "high-school".to_string());

    let quiz = state
        .quizzes
        .generate_quiz(&topic, &difficulty, &focus_area, &student_level)
        .await
        .map_err(server_error("Generate quiz"))?;

    Ok(Json(QuizResponse {
        message: "Quiz generated successfully".to_string(),
        quiz,
    }))
}

/// Grade the caller's answers and record the attempt in their progress.
#[utoipa::path(
    post,
    path = "/api/quiz/submit",
    request_body = SubmitQuizRequest,
    responses(
        (status = 200, description = "Quiz submitted successfully"),
        (status = 400, description = "Quiz ID and answers are required"),
        (status = 404, description = "Quiz not found")
    ),
    security(("bearer" = []))
)]
pub async fn submit_quiz_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ApiJson(req): ApiJson<SubmitQuizRequest>,
) -> Result<Json<SubmitResponse>, HttpError> {
    let (Some(quiz_id), Some(answers)) = (req.quiz_id, req.answers) else {
        return Err(HttpError::bad_request("Quiz ID and answers are required"));
    };

    let results = state
        .quizzes
        .submit_quiz(quiz_id, user.uid(), &answers)
        .await
        .map_err(server_error("Submit quiz"))?;

    Ok(Json(SubmitResponse {
        message: "Quiz submitted successfully".to_string(),
        results,
    }))
}

//=========================================================================================
// Progress and Parent Handlers
//=========================================================================================

/// Aggregate a student's quiz history.
#[utoipa::path(
    get,
    path = "/api/progress/{student_id}",
    params(("student_id" = String, Path, description = "The student's user id")),
    responses(
        (status = 200, description = "Progress summary and detailed records")
    ),
    security(("bearer" = []))
)]
pub async fn progress_handler(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<String>,
) -> Result<Json<ProgressReport>, HttpError> {
    let report = state
        .progress
        .get_progress(&student_id)
        .await
        .map_err(server_error("Retrieve progress"))?;
    Ok(Json(report))
}

/// Generate and store a parent update from the student's progress.
#[utoipa::path(
    post,
    path = "/api/parent/update",
    request_body = ParentUpdateRequest,
    responses(
        (status = 200, description = "Parent update generated successfully"),
        (status = 400, description = "Student ID is required")
    ),
    security(("bearer" = []))
)]
pub async fn parent_update_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ParentUpdateRequest>,
) -> Result<Json<ParentUpdateResponse>, HttpError> {
    let student_id =
        id_string(req.student_id).ok_or_else(|| HttpError::bad_request("Student ID is required"))?;

    let update = state
        .progress
        .generate_parent_update(&student_id)
        .await
        .map_err(server_error("Generate parent update"))?;

    Ok(Json(ParentUpdateResponse {
        message: "Parent update generated successfully".to_string(),
        update,
    }))
}

/// List the stored parent updates for a student.
#[utoipa::path(
    get,
    path = "/api/parent/updates/{student_id}",
    params(("student_id" = String, Path, description = "The student's user id")),
    responses(
        (status = 200, description = "Parent updates in creation order")
    ),
    security(("bearer" = []))
)]
pub async fn parent_updates_handler(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<String>,
) -> Result<Json<ParentUpdatesResponse>, HttpError> {
    let updates = state
        .progress
        .parent_updates(&student_id)
        .await
        .map_err(server_error("Retrieve parent updates"))?;
    Ok(Json(ParentUpdatesResponse { updates }))
}
