//! Database queries for reports.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entity::report::{self, ActiveModel, Entity as Report};
use crate::error::{AppError, AppResult};
use crate::models::{CreateReportRequest, ReportStatus};

use super::DbPool;

/// Outcome of a status read-modify-write.
#[derive(Debug, Clone)]
pub struct StatusWrite {
    /// Row as it stands after the write.
    pub report: report::Model,
    pub previous: ReportStatus,
    pub current: ReportStatus,
}

impl StatusWrite {
    /// Whether the stored status actually moved.
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

impl DbPool {
    /// Insert a new report in PENDIENTE.
    pub async fn insert_report(
        &self,
        id: Uuid,
        created_by: Uuid,
        request: &CreateReportRequest,
    ) -> AppResult<report::Model> {
        let now = Utc::now();

        let model = ActiveModel {
            id: Set(id),
            title: Set(request.title.trim().to_string()),
            description: Set(request.description.clone()),
            latitude: Set(request.latitude),
            longitude: Set(request.longitude),
            address: Set(request.address.clone()),
            image_url: Set(request.image_url.clone()),
            status: Set(ReportStatus::Pending.as_str().to_string()),
            created_by: Set(created_by),
            created_at: Set(now),
            updated_at: Set(now),
            status_changed_at: Set(None),
            status_changed_by: Set(None),
        };

        let result = model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert report: {}", e)))?;

        Ok(result)
    }

    /// Get a report by ID.
    pub async fn get_report_by_id(&self, id: Uuid) -> AppResult<Option<report::Model>> {
        let result = Report::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get report: {}", e)))?;

        Ok(result)
    }

    /// List reports, newest first, optionally filtered by status and creator.
    pub async fn list_reports(
        &self,
        status: Option<ReportStatus>,
        created_by: Option<Uuid>,
        limit: u64,
        offset: u64,
    ) -> AppResult<(Vec<report::Model>, u64)> {
        let mut select = Report::find();

        if let Some(status) = status {
            select = select.filter(report::Column::Status.eq(status.as_str()));
        }

        if let Some(created_by) = created_by {
            select = select.filter(report::Column::CreatedBy.eq(created_by));
        }

        // Count total before pagination
        let total = select
            .clone()
            .count(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to count reports: {}", e)))?;

        let reports = select
            .order_by_desc(report::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list reports: {}", e)))?;

        Ok((reports, total))
    }

    /// Atomically read a report's status, decide the next one, and store it.
    ///
    /// The row is locked for the duration of the transaction. `decide` gets
    /// the stored status and returns the status to persist; an error from it
    /// rolls back without writing. When the decided status equals the stored
    /// one nothing is written.
    pub async fn apply_status_change<F>(
        &self,
        id: Uuid,
        changed_by: Uuid,
        decide: F,
    ) -> AppResult<StatusWrite>
    where
        F: FnOnce(ReportStatus) -> AppResult<ReportStatus>,
    {
        let txn = self
            .connection()
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let mut row = Report::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to get report: {}", e)))?
            .ok_or_else(|| AppError::NotFound(format!("Report {}", id)))?;

        let previous = ReportStatus::parse(&row.status).ok_or_else(|| {
            AppError::Database(format!(
                "Report {} has unknown stored status {}",
                id, row.status
            ))
        })?;

        // Dropping the transaction on error rolls it back.
        let next = decide(previous)?;

        if next == previous {
            txn.commit()
                .await
                .map_err(|e| AppError::Database(format!("Failed to commit: {}", e)))?;
            return Ok(StatusWrite {
                report: row,
                previous,
                current: next,
            });
        }

        let now = Utc::now();
        let result = Report::update_many()
            .col_expr(report::Column::Status, Expr::value(next.as_str()))
            .col_expr(report::Column::StatusChangedAt, Expr::value(now))
            .col_expr(report::Column::StatusChangedBy, Expr::value(changed_by))
            .col_expr(report::Column::UpdatedAt, Expr::value(now))
            .filter(report::Column::Id.eq(id))
            .filter(report::Column::Status.eq(previous.as_str()))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to update report status: {}", e)))?;

        if result.rows_affected != 1 {
            return Err(AppError::Database(format!(
                "Report {} status changed concurrently",
                id
            )));
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit: {}", e)))?;

        row.status = next.as_str().to_string();
        row.status_changed_at = Some(now);
        row.status_changed_by = Some(changed_by);
        row.updated_at = now;

        Ok(StatusWrite {
            report: row,
            previous,
            current: next,
        })
    }
}
