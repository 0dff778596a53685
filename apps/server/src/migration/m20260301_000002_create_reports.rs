//! Migration: Create reports table.
//!
//! The status column only admits the four report states.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TABLE reports (
                    id UUID PRIMARY KEY,
                    title VARCHAR(120) NOT NULL,
                    description TEXT NOT NULL,
                    latitude DOUBLE PRECISION NOT NULL
                        CHECK (latitude BETWEEN -90 AND 90),
                    longitude DOUBLE PRECISION NOT NULL
                        CHECK (longitude BETWEEN -180 AND 180),
                    address VARCHAR(255),
                    image_url VARCHAR(1000),
                    status VARCHAR(20) NOT NULL DEFAULT 'PENDIENTE'
                        CHECK (status IN ('PENDIENTE', 'EN_REPARACION', 'RESUELTO', 'DESCARTADO')),
                    created_by UUID NOT NULL REFERENCES users(id),

                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    status_changed_at TIMESTAMPTZ,
                    status_changed_by UUID REFERENCES users(id)
                );

                CREATE INDEX idx_reports_created_at ON reports(created_at DESC);

                CREATE INDEX idx_reports_status ON reports(status);

                CREATE INDEX idx_reports_created_by ON reports(created_by);

                CREATE TRIGGER update_reports_updated_at
                    BEFORE UPDATE ON reports
                    FOR EACH ROW
                    EXECUTE FUNCTION update_updated_at_column();
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DROP TRIGGER IF EXISTS update_reports_updated_at ON reports;
                DROP TABLE IF EXISTS reports CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
