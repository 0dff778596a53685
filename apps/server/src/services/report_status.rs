//! Report status lifecycle: who may move a report and where.
//!
//! The decision itself is pure; [`change_report_status`] wraps it in the
//! database's locked read-modify-write so two admins cannot interleave.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::{DbPool, StatusWrite, users};
use crate::error::{AppError, AppResult};
use crate::models::{AuthenticatedUser, ReportStatus, UserRole};

/// Which status-to-status moves are allowed for an admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Any status may follow any other.
    #[default]
    Permissive,
    /// Closed reports (RESUELTO, DESCARTADO) cannot be reopened.
    Strict,
}

impl TransitionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Permissive => "permissive",
            Self::Strict => "strict",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "permissive" => Some(Self::Permissive),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }

    /// Whether `from -> to` is permitted. Staying put is always permitted.
    pub fn allows(&self, from: ReportStatus, to: ReportStatus) -> bool {
        if from == to {
            return true;
        }
        match self {
            Self::Permissive => true,
            Self::Strict => !(from.is_closed() && !to.is_closed()),
        }
    }
}

/// Why a status change was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatusChangeError {
    #[error("Only administrators can change report status")]
    AdminRequired,

    #[error("Cannot move report from {from} to {to}")]
    InvalidTransition { from: ReportStatus, to: ReportStatus },
}

impl From<StatusChangeError> for AppError {
    fn from(err: StatusChangeError) -> Self {
        match err {
            StatusChangeError::AdminRequired => AppError::Forbidden(err.to_string()),
            StatusChangeError::InvalidTransition { from, to } => {
                AppError::InvalidTransition { from, to }
            }
        }
    }
}

/// Refuse non-admin callers.
pub fn authorize(requester_is_admin: bool) -> Result<(), StatusChangeError> {
    if requester_is_admin {
        Ok(())
    } else {
        Err(StatusChangeError::AdminRequired)
    }
}

/// Decide the status a report ends up in.
///
/// The admin check runs before anything else, so a non-admin gets the same
/// answer whatever the current or requested status.
pub fn request_status_change(
    current: ReportStatus,
    requested: ReportStatus,
    requester_is_admin: bool,
    policy: TransitionPolicy,
) -> Result<ReportStatus, StatusChangeError> {
    authorize(requester_is_admin)?;

    if !policy.allows(current, requested) {
        return Err(StatusChangeError::InvalidTransition {
            from: current,
            to: requested,
        });
    }

    Ok(requested)
}

/// Change a stored report's status on behalf of `requester`.
///
/// A session claiming admin is confirmed against the stored role, so a
/// demotion applies before the session token expires.
pub async fn change_report_status(
    pool: &DbPool,
    report_id: Uuid,
    requested: ReportStatus,
    requester: &AuthenticatedUser,
    policy: TransitionPolicy,
) -> AppResult<StatusWrite> {
    // Fail before touching the database.
    authorize(requester.is_admin())?;

    let is_admin = users::find_by_id(pool.connection(), requester.user_id)
        .await?
        .is_some_and(|user| user.role == UserRole::Admin);
    if !is_admin {
        warn!(user_id = %requester.user_id, "Session claims admin but stored role does not");
    }
    authorize(is_admin)?;

    let write = pool
        .apply_status_change(report_id, requester.user_id, |current| {
            request_status_change(current, requested, is_admin, policy).map_err(AppError::from)
        })
        .await?;

    if write.changed() {
        info!(
            report_id = %report_id,
            from = %write.previous,
            to = %write.current,
            changed_by = %requester.user_id,
            "Report status changed"
        );
    } else {
        debug!(report_id = %report_id, status = %write.current, "Report status unchanged");
    }

    Ok(write)
}
