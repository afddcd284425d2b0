//! services/api/src/web/materials.rs
//!
//! Study material upload and listing.

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use smartstudy_core::domain::{MaterialFilter, StudyMaterial};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::error::HttpError;
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;

const ALLOWED_MIME_TYPES: [&str; 4] = [
    "application/pdf",
    "text/plain",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

//=========================================================================================
// API Response Structs
//=========================================================================================

/// The public view of a stored material.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterialView {
    pub id: u64,
    pub filename: String,
    pub original_name: String,
    pub subject: String,
    pub topic: String,
    pub grade: String,
    pub uploaded_at: DateTime<Utc>,
}

impl From<StudyMaterial> for MaterialView {
    fn from(m: StudyMaterial) -> Self {
        Self {
            id: m.id,
            filename: m.filename,
            original_name: m.original_name,
            subject: m.subject,
            topic: m.topic,
            grade: m.grade,
            uploaded_at: m.uploaded_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    pub message: String,
    pub material: MaterialView,
}

#[derive(Serialize, ToSchema)]
pub struct MaterialsResponse {
    pub materials: Vec<MaterialView>,
}

//=========================================================================================
// Upload Helpers
//=========================================================================================

struct UploadedFile {
    original_name: String,
    mime_type: String,
    data: bytes::Bytes,
}

/// Uses the part's declared type, or guesses from the extension when absent.
fn resolve_mime_type(declared: Option<&str>, file_name: &str) -> String {
    if let Some(declared) = declared.filter(|d| !d.is_empty() && *d != "application/octet-stream") {
        return declared.to_string();
    }
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        _ => "application/octet-stream",
    }
    .to_string()
}

/// Strips any directory components a client put in the file name.
fn safe_file_name(name: &str) -> String {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("upload")
        .to_string()
}

fn field_or(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Upload a study document (PDF, DOC, DOCX or TXT, at most 10 MB).
#[utoipa::path(
    post,
    path = "/api/materials/upload",
    request_body(content_type = "multipart/form-data", description = "A `file` part plus optional `subject`, `topic` and `grade` fields."),
    responses(
        (status = 201, description = "Study material uploaded successfully", body = UploadResponse),
        (status = 400, description = "No file, unsupported type or file too large")
    ),
    security(("bearer" = []))
)]
pub async fn upload_material_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    let max_bytes = state.config.max_upload_bytes;
    let mut file: Option<UploadedFile> = None;
    let (mut subject, mut topic, mut grade) = (None, None, None);

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpError::bad_request(format!("Failed to read multipart data: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let original_name = safe_file_name(field.file_name().unwrap_or_default());
                let mime_type = resolve_mime_type(field.content_type(), &original_name);
                let data = field.bytes().await.map_err(|e| {
                    HttpError::bad_request(format!("Failed to read file bytes: {}", e))
                })?;
                file = Some(UploadedFile {
                    original_name,
                    mime_type,
                    data,
                });
            }
            "subject" | "topic" | "grade" => {
                let value = field.text().await.map_err(|e| {
                    HttpError::bad_request(format!("Failed to read form field: {}", e))
                })?;
                match name.as_str() {
                    "subject" => subject = Some(value),
                    "topic" => topic = Some(value),
                    _ => grade = Some(value),
                }
            }
            _ => {}
        }
    }

    // --- Validate before touching the disk ---
    let file = file.ok_or_else(|| HttpError::bad_request("No file uploaded"))?;
    if !ALLOWED_MIME_TYPES.contains(&file.mime_type.as_str()) {
        return Err(HttpError::bad_request(
            "Invalid file type. Only PDF, DOC, DOCX, and TXT files are allowed.",
        ));
    }
    if file.data.len() > max_bytes {
        return Err(HttpError::bad_request(format!(
            "File too large. Maximum size is {} bytes.",
            max_bytes
        )));
    }

    // --- Store the file ---
    let filename = format!("{}-{}", Utc::now().timestamp_millis(), file.original_name);
    let upload_dir = &state.config.upload_dir;
    let storage_path = upload_dir.join(&filename);
    let write = async {
        tokio::fs::create_dir_all(upload_dir).await?;
        tokio::fs::write(&storage_path, &file.data).await
    };
    write.await.map_err(|e| {
        error!("Failed to store upload {}: {}", filename, e);
        HttpError::internal("Failed to upload file")
    })?;

    let material = StudyMaterial {
        id: 0,
        filename,
        original_name: file.original_name,
        storage_path: storage_path.to_string_lossy().into_owned(),
        uploaded_by: user.uid().to_string(),
        subject: field_or(subject, "General"),
        topic: field_or(topic, "General"),
        grade: field_or(grade, "All"),
        uploaded_at: Utc::now(),
        mime_type: file.mime_type,
    };
    let material = state.store.add_material(material).await?;
    info!("Stored material {} for user {}", material.id, user.uid());

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: "Study material uploaded successfully".to_string(),
            material: material.into(),
        }),
    ))
}

/// List materials, optionally filtered by exact subject, topic and grade.
#[utoipa::path(
    get,
    path = "/api/materials",
    params(
        ("subject" = Option<String>, Query, description = "Exact subject"),
        ("topic" = Option<String>, Query, description = "Exact topic"),
        ("grade" = Option<String>, Query, description = "Exact grade")
    ),
    responses(
        (status = 200, description = "Matching materials", body = MaterialsResponse)
    ),
    security(("bearer" = []))
)]
pub async fn list_materials_handler(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<MaterialFilter>,
) -> Result<Json<MaterialsResponse>, HttpError> {
    let materials = state.store.list_materials(&filter).await?;
    Ok(Json(MaterialsResponse {
        materials: materials.into_iter().map(MaterialView::from).collect(),
    }))
}
