//! Initial database migration.
//!
//! Creates users, groups, expenses, and the two balance ledgers. The unique
//! keys on the ledgers are what make the increment upserts well defined.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: USERS & GROUPS
        // ============================================================
        db.execute_unprepared(USERS_SQL).await?;
        db.execute_unprepared(GROUPS_SQL).await?;
        db.execute_unprepared(GROUP_USERS_SQL).await?;

        // ============================================================
        // PART 3: EXPENSES
        // ============================================================
        db.execute_unprepared(EXPENSES_SQL).await?;
        db.execute_unprepared(EXPENSE_PARTICIPANTS_SQL).await?;

        // ============================================================
        // PART 4: BALANCE LEDGERS
        // ============================================================
        db.execute_unprepared(BALANCES_SQL).await?;
        db.execute_unprepared(GROUP_BALANCES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE split_type AS ENUM (
    'EQUAL',
    'PERCENTAGE',
    'EXACT',
    'SHARE',
    'ADJUSTMENT',
    'SETTLEMENT'
);

CREATE TYPE currency_type AS ENUM ('FIAT', 'TOKEN');
";

const USERS_SQL: &str = r"
CREATE TABLE users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    email VARCHAR(255) NOT NULL UNIQUE,
    name VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const GROUPS_SQL: &str = r"
CREATE TABLE groups (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    description TEXT,
    created_by UUID NOT NULL REFERENCES users(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_groups_created_by ON groups(created_by);
";

const GROUP_USERS_SQL: &str = r"
CREATE TABLE group_users (
    group_id UUID NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
    user_id UUID NOT NULL REFERENCES users(id),
    joined_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (group_id, user_id)
);

CREATE INDEX idx_group_users_user ON group_users(user_id);
";

const EXPENSES_SQL: &str = r"
CREATE TABLE expenses (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    category VARCHAR(100),
    amount NUMERIC(38, 18) NOT NULL CHECK (amount > 0),
    paid_by UUID NOT NULL REFERENCES users(id),
    added_by UUID NOT NULL REFERENCES users(id),
    group_id UUID REFERENCES groups(id) ON DELETE SET NULL,
    split_type split_type NOT NULL,
    currency VARCHAR(16) NOT NULL,
    currency_type currency_type NOT NULL DEFAULT 'FIAT',
    token_id VARCHAR(64),
    chain_id VARCHAR(64),
    expense_date TIMESTAMPTZ NOT NULL DEFAULT now(),
    file_key VARCHAR(512),
    idempotency_key VARCHAR(128),
    updated_by UUID REFERENCES users(id),
    deleted_at TIMESTAMPTZ,
    deleted_by UUID REFERENCES users(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT uq_expenses_idempotency UNIQUE (added_by, idempotency_key)
);

CREATE INDEX idx_expenses_group ON expenses(group_id, created_at DESC) WHERE deleted_at IS NULL;
CREATE INDEX idx_expenses_paid_by ON expenses(paid_by) WHERE deleted_at IS NULL;
";

const EXPENSE_PARTICIPANTS_SQL: &str = r"
CREATE TABLE expense_participants (
    expense_id UUID NOT NULL REFERENCES expenses(id) ON DELETE CASCADE,
    user_id UUID NOT NULL REFERENCES users(id),
    amount NUMERIC(38, 18) NOT NULL CHECK (amount >= 0),
    PRIMARY KEY (expense_id, user_id)
);

CREATE INDEX idx_expense_participants_user ON expense_participants(user_id);
";

const BALANCES_SQL: &str = r"
CREATE TABLE balances (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    user_id UUID NOT NULL REFERENCES users(id),
    friend_id UUID NOT NULL REFERENCES users(id),
    currency VARCHAR(16) NOT NULL,
    amount NUMERIC(38, 18) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT uq_balances_pair UNIQUE (user_id, friend_id, currency),
    CONSTRAINT chk_balances_no_self CHECK (user_id <> friend_id)
);

CREATE INDEX idx_balances_friend ON balances(friend_id);
";

const GROUP_BALANCES_SQL: &str = r"
CREATE TABLE group_balances (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    group_id UUID NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
    user_id UUID NOT NULL REFERENCES users(id),
    friend_id UUID NOT NULL REFERENCES users(id),
    currency VARCHAR(16) NOT NULL,
    amount NUMERIC(38, 18) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT uq_group_balances_pair UNIQUE (group_id, user_id, friend_id, currency),
    CONSTRAINT chk_group_balances_no_self CHECK (user_id <> friend_id)
);

CREATE INDEX idx_group_balances_pair ON group_balances(user_id, friend_id, currency);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS group_balances CASCADE;
DROP TABLE IF EXISTS balances CASCADE;
DROP TABLE IF EXISTS expense_participants CASCADE;
DROP TABLE IF EXISTS expenses CASCADE;
DROP TABLE IF EXISTS group_users CASCADE;
DROP TABLE IF EXISTS groups CASCADE;
DROP TABLE IF EXISTS users CASCADE;

DROP TYPE IF EXISTS currency_type CASCADE;
DROP TYPE IF EXISTS split_type CASCADE;
";
