//! `SeaORM` Entity for settlement_items table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "settlement_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub settlement_transaction_id: Uuid,
    pub user_id: Uuid,
    pub friend_id: Uuid,
    pub group_id: Option<Uuid>,
    #[sea_orm(column_type = "Decimal(Some((38, 18)))")]
    pub original_amount: Decimal,
    pub original_currency: String,
    #[sea_orm(column_type = "Decimal(Some((38, 18)))")]
    pub settlement_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((38, 18)))", nullable)]
    pub after_settlement_balance: Option<Decimal>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::settlement_transactions::Entity",
        from = "Column::SettlementTransactionId",
        to = "super::settlement_transactions::Column::Id",
        on_delete = "Cascade"
    )]
    SettlementTransactions,
}

impl Related<super::settlement_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SettlementTransactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
