//! Payment reminders.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(REMINDERS_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const REMINDERS_SQL: &str = r"
CREATE TYPE reminder_type AS ENUM ('USER', 'SPLIT');
CREATE TYPE reminder_status AS ENUM ('PENDING', 'COMPLETED', 'CANCELLED');

CREATE TABLE reminders (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    sender_id UUID NOT NULL REFERENCES users(id),
    receiver_id UUID NOT NULL REFERENCES users(id),
    reminder_type reminder_type NOT NULL,
    split_id UUID REFERENCES expenses(id) ON DELETE CASCADE,
    content TEXT,
    status reminder_status NOT NULL DEFAULT 'PENDING',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_reminders_no_self CHECK (sender_id <> receiver_id),
    CONSTRAINT chk_reminders_split CHECK (reminder_type = 'USER' OR split_id IS NOT NULL)
);

CREATE INDEX idx_reminders_receiver ON reminders(receiver_id, created_at DESC) WHERE status = 'PENDING';
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS reminders CASCADE;
DROP TYPE IF EXISTS reminder_status CASCADE;
DROP TYPE IF EXISTS reminder_type CASCADE;
";
