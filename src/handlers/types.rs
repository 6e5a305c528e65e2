//! # Common API Types
//!
//! Shared response wrappers and DTOs used across the console's handlers.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::CurrentPrincipal;
use crate::models::principal::Model as PrincipalModel;
use crate::telemetry;

/// Standard envelope for successful responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response metadata
    pub meta: ResponseMeta,
}

/// Response metadata attached to every envelope.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResponseMeta {
    /// Request identifier for log correlation
    #[schema(example = "req-9f2c1ab4e7d0")]
    pub request_id: String,
    /// Response timestamp (ISO 8601)
    #[schema(example = "2026-08-25T10:30:00Z")]
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    /// Wrap data with metadata drawn from the active trace context.
    pub fn new(data: T) -> Self {
        Self {
            data,
            meta: ResponseMeta {
                request_id: telemetry::current_trace_id()
                    .unwrap_or_else(|| telemetry::TraceContext::new().trace_id),
                timestamp: Utc::now().to_rfc3339(),
            },
        }
    }
}

/// Public view of a principal. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PrincipalDto {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: String,
    #[schema(example = "resident@example.com")]
    pub email: String,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub photo_url: Option<String>,
    #[schema(example = "resident")]
    pub role: String,
    #[schema(example = "active")]
    pub status: String,
    #[schema(example = "sunrise-court")]
    pub community_slug: Option<String>,
    /// Free-form household data (building, floor, unit)
    pub household: Option<serde_json::Value>,
}

impl From<&PrincipalModel> for PrincipalDto {
    fn from(model: &PrincipalModel) -> Self {
        Self {
            id: model.id.to_string(),
            email: model.email.clone(),
            display_name: model.display_name.clone(),
            phone: model.phone.clone(),
            photo_url: model.photo_url.clone(),
            role: model.role.clone(),
            status: model.status.clone(),
            community_slug: model.community_slug.clone(),
            household: model.household.clone(),
        }
    }
}

impl From<&CurrentPrincipal> for PrincipalDto {
    fn from(principal: &CurrentPrincipal) -> Self {
        Self {
            id: principal.id.to_string(),
            email: principal.email.clone(),
            display_name: principal.display_name.clone(),
            phone: principal.phone.clone(),
            photo_url: principal.photo_url.clone(),
            role: principal.role.as_str().to_string(),
            status: principal.status.as_str().to_string(),
            community_slug: principal.community_slug.clone(),
            household: None,
        }
    }
}
