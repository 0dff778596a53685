//! Report domain models and DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::ValidationError;

/// Message returned for any status value outside the accepted set.
pub const STATUS_VALIDATION_MESSAGE: &str =
    "El estado debe ser: PENDIENTE, EN_REPARACION, RESUELTO o DESCARTADO";

/// Report status.
///
/// Serialized with the Spanish wire literals. The English canonical names are
/// accepted on input as aliases. Matching is case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum ReportStatus {
    #[serde(rename = "PENDIENTE", alias = "PENDING")]
    Pending,
    #[serde(rename = "EN_REPARACION", alias = "IN_REPAIR")]
    InRepair,
    #[serde(rename = "RESUELTO", alias = "RESOLVED")]
    Resolved,
    #[serde(rename = "DESCARTADO", alias = "DISCARDED")]
    Discarded,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 4] = [
        Self::Pending,
        Self::InRepair,
        Self::Resolved,
        Self::Discarded,
    ];

    /// Wire and storage literal.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDIENTE",
            Self::InRepair => "EN_REPARACION",
            Self::Resolved => "RESUELTO",
            Self::Discarded => "DESCARTADO",
        }
    }

    pub fn canonical_name(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InRepair => "IN_REPAIR",
            Self::Resolved => "RESOLVED",
            Self::Discarded => "DISCARDED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDIENTE" | "PENDING" => Some(Self::Pending),
            "EN_REPARACION" | "IN_REPAIR" => Some(Self::InRepair),
            "RESUELTO" | "RESOLVED" => Some(Self::Resolved),
            "DESCARTADO" | "DISCARDED" => Some(Self::Discarded),
            _ => None,
        }
    }

    /// Decode a raw request value for `field`, failing with the status message.
    pub fn decode(field: &str, raw: Option<&str>) -> Result<Self, ValidationError> {
        raw.and_then(Self::parse)
            .ok_or_else(|| ValidationError::new(field, STATUS_VALIDATION_MESSAGE))
    }

    /// Whether the report's issue is settled (fixed or dismissed).
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Resolved | Self::Discarded)
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Request to change a report's status.
///
/// `status` is kept as raw JSON so that a number, boolean or array is
/// rejected by [`ReportStatus::decode`] like any other unknown value.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateReportStatusRequest {
    /// One of PENDIENTE, EN_REPARACION, RESUELTO, DESCARTADO.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub status: Option<serde_json::Value>,
}

impl UpdateReportStatusRequest {
    /// Decode the requested status; the transition logic only sees valid members.
    pub fn validate(&self) -> Result<ReportStatus, ValidationError> {
        ReportStatus::decode(
            "status",
            self.status.as_ref().and_then(serde_json::Value::as_str),
        )
    }
}

const TITLE_MIN_CHARS: usize = 3;
const TITLE_MAX_CHARS: usize = 120;

/// Request to submit a new report.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    /// Length is checked on the trimmed value, which is what gets stored.
    pub title: String,
    #[validate(length(
        min = 1,
        max = 2000,
        message = "description must be between 1 and 2000 characters"
    ))]
    pub description: String,
    #[validate(range(min = -90.0, max = 90.0, message = "latitude must be between -90 and 90"))]
    pub latitude: f64,
    #[validate(range(
        min = -180.0,
        max = 180.0,
        message = "longitude must be between -180 and 180"
    ))]
    pub longitude: f64,
    #[serde(default)]
    #[validate(length(max = 255, message = "address must be at most 255 characters"))]
    pub address: Option<String>,
    #[serde(default)]
    #[validate(
        url(message = "imageUrl must be a valid URL"),
        length(max = 1000, message = "imageUrl must be at most 1000 characters")
    )]
    pub image_url: Option<String>,
}

impl CreateReportRequest {
    /// Run field validation, reporting the first failing field.
    pub fn validate_request(&self) -> Result<(), ValidationError> {
        let title_len = self.title.trim().chars().count();
        if title_len == 0 {
            return Err(ValidationError::new("title", "title is required"));
        }
        if !(TITLE_MIN_CHARS..=TITLE_MAX_CHARS).contains(&title_len) {
            return Err(ValidationError::new(
                "title",
                "title must be between 3 and 120 characters",
            ));
        }
        self.validate().map_err(super::first_validation_error)
    }
}

/// Query parameters for listing reports.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ListReportsQuery {
    /// Optional status filter (same literals as status updates).
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

fn default_limit() -> u64 {
    20
}

impl ListReportsQuery {
    /// Decode the optional status filter.
    pub fn status_filter(&self) -> Result<Option<ReportStatus>, ValidationError> {
        self.status
            .as_deref()
            .map(|s| ReportStatus::decode("status", Some(s)))
            .transpose()
    }

    /// Clamp limit to the allowed window.
    pub fn clamped_limit(&self) -> u64 {
        self.limit.clamp(1, 100)
    }
}

/// Report as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub image_url: Option<String>,
    pub status: ReportStatus,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status_changed_at: Option<DateTime<Utc>>,
}

impl ReportResponse {
    /// Build a response from a stored row.
    ///
    /// The status column is CHECK-constrained, so an unknown literal means
    /// the row was written outside this service; it is reported as pending.
    pub fn from_entity(m: crate::entity::report::Model) -> Self {
        let status = ReportStatus::parse(&m.status).unwrap_or_else(|| {
            tracing::warn!(report_id = %m.id, status = %m.status, "Unknown stored report status");
            ReportStatus::Pending
        });

        Self {
            id: m.id,
            title: m.title,
            description: m.description,
            latitude: m.latitude,
            longitude: m.longitude,
            address: m.address,
            image_url: m.image_url,
            status,
            created_by: m.created_by,
            created_at: m.created_at,
            updated_at: m.updated_at,
            status_changed_at: m.status_changed_at,
        }
    }
}

/// Paginated report list.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReportListResponse {
    pub reports: Vec<ReportResponse>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}
