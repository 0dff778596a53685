//! WebSocket event types for real-time updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ReportStatus;

/// WebSocket event sent to connected clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
#[serde(rename_all = "snake_case")]
pub enum WsEvent {
    /// A new report was submitted.
    ReportCreated(ReportCreatedPayload),
    /// An admin changed a report's status.
    ReportStatusChanged(ReportStatusChangedPayload),
}

/// Payload for report_created event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportCreatedPayload {
    pub report_id: Uuid,
    pub title: String,
    pub latitude: f64,
    pub longitude: f64,
    pub status: ReportStatus,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Payload for report_status_changed event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportStatusChangedPayload {
    pub report_id: Uuid,
    pub previous_status: ReportStatus,
    pub status: ReportStatus,
    pub changed_by: Uuid,
    pub changed_at: DateTime<Utc>,
}

/// Wrapper that includes timestamp with every event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsEventMessage {
    #[serde(flatten)]
    pub event: WsEvent,
    pub timestamp: DateTime<Utc>,
}

impl WsEventMessage {
    /// Create a new event message with the current timestamp.
    pub fn new(event: WsEvent) -> Self {
        Self {
            event,
            timestamp: Utc::now(),
        }
    }
}

impl WsEvent {
    /// Create a report_created event from a stored report.
    pub fn report_created(report: &super::ReportResponse) -> Self {
        WsEvent::ReportCreated(ReportCreatedPayload {
            report_id: report.id,
            title: report.title.clone(),
            latitude: report.latitude,
            longitude: report.longitude,
            status: report.status,
            created_by: report.created_by,
            created_at: report.created_at,
        })
    }

    /// Create a report_status_changed event.
    pub fn report_status_changed(
        report_id: Uuid,
        previous_status: ReportStatus,
        status: ReportStatus,
        changed_by: Uuid,
    ) -> Self {
        WsEvent::ReportStatusChanged(ReportStatusChangedPayload {
            report_id,
            previous_status,
            status,
            changed_by,
            changed_at: Utc::now(),
        })
    }
}
