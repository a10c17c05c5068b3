//! `SeaORM` Entity for settlement_transactions table.

use super::sea_orm_active_enums::SettlementStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "settlement_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub group_id: Option<Uuid>,
    pub settlement_currency: String,
    pub chain_id: Option<String>,
    pub token_id: Option<String>,
    pub status: SettlementStatus,
    pub transaction_hash: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub completed_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::settlement_items::Entity")]
    SettlementItems,
}

impl Related<super::settlement_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SettlementItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
