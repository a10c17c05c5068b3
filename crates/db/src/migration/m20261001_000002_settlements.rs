//! Settlement transactions and their items.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(SETTLEMENTS_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const SETTLEMENTS_SQL: &str = r"
CREATE TYPE settlement_status AS ENUM ('PENDING', 'COMPLETED', 'FAILED');

CREATE TABLE settlement_transactions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    user_id UUID NOT NULL REFERENCES users(id),
    group_id UUID REFERENCES groups(id) ON DELETE SET NULL,
    settlement_currency VARCHAR(16) NOT NULL,
    chain_id VARCHAR(64),
    token_id VARCHAR(64),
    status settlement_status NOT NULL DEFAULT 'PENDING',
    transaction_hash VARCHAR(255),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    completed_at TIMESTAMPTZ
);

CREATE INDEX idx_settlement_transactions_user ON settlement_transactions(user_id, created_at DESC);

CREATE TABLE settlement_items (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    settlement_transaction_id UUID NOT NULL REFERENCES settlement_transactions(id) ON DELETE CASCADE,
    user_id UUID NOT NULL REFERENCES users(id),
    friend_id UUID NOT NULL REFERENCES users(id),
    group_id UUID REFERENCES groups(id) ON DELETE SET NULL,
    original_amount NUMERIC(38, 18) NOT NULL CHECK (original_amount > 0),
    original_currency VARCHAR(16) NOT NULL,
    settlement_amount NUMERIC(38, 18) NOT NULL CHECK (settlement_amount > 0),
    after_settlement_balance NUMERIC(38, 18),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_settlement_items_no_self CHECK (user_id <> friend_id)
);

CREATE INDEX idx_settlement_items_transaction ON settlement_items(settlement_transaction_id);
CREATE INDEX idx_settlement_items_friend ON settlement_items(friend_id);
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS settlement_items CASCADE;
DROP TABLE IF EXISTS settlement_transactions CASCADE;
DROP TYPE IF EXISTS settlement_status CASCADE;
";
