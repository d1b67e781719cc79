use axum::{Json, extract::State, extract::rejection::JsonRejection};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, EmailResultsRequest, MessageResponse, validation};
use crate::email::{EmailMessage, format_for_email};

/// `POST /api/email-results` with body `{email, query, results}`.
///
/// Sends the supplied result set as-is; nothing is searched or cached.
pub async fn email_results(
    State(state): State<Arc<AppState>>,
    request: Result<Json<EmailResultsRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let Json(request) = request.map_err(|e| {
        tracing::debug!(error = %e, "Rejected email body");
        ApiError::validation("Invalid request body")
    })?;

    let results = validation::validate_results(request.results)?;
    let to = validation::validate_email(validation::json_str(request.email.as_ref()))?;
    let query = match &request.query {
        None | Some(serde_json::Value::Null) => "",
        Some(serde_json::Value::String(q)) => q.trim(),
        Some(_) => return Err(ApiError::validation("Invalid search query")),
    };

    let document = format_for_email(&results, query)?;
    let mailer = &state.shared.mailer;
    let message = EmailMessage::new(mailer.sender(), to, document);

    mailer.send(&message).await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Email sent successfully".to_string(),
    })))
}
