//! Postgres enum types and their conversions to core types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tally_core::{reminder, settlement, split};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "split_type")]
pub enum SplitType {
    #[sea_orm(string_value = "EQUAL")]
    Equal,
    #[sea_orm(string_value = "PERCENTAGE")]
    Percentage,
    #[sea_orm(string_value = "EXACT")]
    Exact,
    #[sea_orm(string_value = "SHARE")]
    Share,
    #[sea_orm(string_value = "ADJUSTMENT")]
    Adjustment,
    #[sea_orm(string_value = "SETTLEMENT")]
    Settlement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "currency_type")]
pub enum CurrencyType {
    #[sea_orm(string_value = "FIAT")]
    Fiat,
    #[sea_orm(string_value = "TOKEN")]
    Token,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "settlement_status")]
pub enum SettlementStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "FAILED")]
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "reminder_type")]
pub enum ReminderType {
    #[sea_orm(string_value = "USER")]
    User,
    #[sea_orm(string_value = "SPLIT")]
    Split,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "reminder_status")]
pub enum ReminderStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

impl From<split::SplitType> for SplitType {
    fn from(value: split::SplitType) -> Self {
        match value {
            split::SplitType::Equal => Self::Equal,
            split::SplitType::Percentage => Self::Percentage,
            split::SplitType::Exact => Self::Exact,
            split::SplitType::Share => Self::Share,
            split::SplitType::Adjustment => Self::Adjustment,
            split::SplitType::Settlement => Self::Settlement,
        }
    }
}

impl From<SplitType> for split::SplitType {
    fn from(value: SplitType) -> Self {
        match value {
            SplitType::Equal => Self::Equal,
            SplitType::Percentage => Self::Percentage,
            SplitType::Exact => Self::Exact,
            SplitType::Share => Self::Share,
            SplitType::Adjustment => Self::Adjustment,
            SplitType::Settlement => Self::Settlement,
        }
    }
}

impl From<split::CurrencyType> for CurrencyType {
    fn from(value: split::CurrencyType) -> Self {
        match value {
            split::CurrencyType::Fiat => Self::Fiat,
            split::CurrencyType::Token => Self::Token,
        }
    }
}

impl From<CurrencyType> for split::CurrencyType {
    fn from(value: CurrencyType) -> Self {
        match value {
            CurrencyType::Fiat => Self::Fiat,
            CurrencyType::Token => Self::Token,
        }
    }
}

impl From<settlement::SettlementStatus> for SettlementStatus {
    fn from(value: settlement::SettlementStatus) -> Self {
        match value {
            settlement::SettlementStatus::Pending => Self::Pending,
            settlement::SettlementStatus::Completed => Self::Completed,
            settlement::SettlementStatus::Failed => Self::Failed,
        }
    }
}

impl From<SettlementStatus> for settlement::SettlementStatus {
    fn from(value: SettlementStatus) -> Self {
        match value {
            SettlementStatus::Pending => Self::Pending,
            SettlementStatus::Completed => Self::Completed,
            SettlementStatus::Failed => Self::Failed,
        }
    }
}

impl From<reminder::ReminderType> for ReminderType {
    fn from(value: reminder::ReminderType) -> Self {
        match value {
            reminder::ReminderType::User => Self::User,
            reminder::ReminderType::Split => Self::Split,
        }
    }
}

impl From<ReminderType> for reminder::ReminderType {
    fn from(value: ReminderType) -> Self {
        match value {
            ReminderType::User => Self::User,
            ReminderType::Split => Self::Split,
        }
    }
}

impl From<reminder::ReminderStatus> for ReminderStatus {
    fn from(value: reminder::ReminderStatus) -> Self {
        match value {
            reminder::ReminderStatus::Pending => Self::Pending,
            reminder::ReminderStatus::Completed => Self::Completed,
            reminder::ReminderStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<ReminderStatus> for reminder::ReminderStatus {
    fn from(value: ReminderStatus) -> Self {
        match value {
            ReminderStatus::Pending => Self::Pending,
            ReminderStatus::Completed => Self::Completed,
            ReminderStatus::Cancelled => Self::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_type_conversions_agree_on_db_values() {
        for core_type in [
            split::SplitType::Equal,
            split::SplitType::Percentage,
            split::SplitType::Exact,
            split::SplitType::Share,
            split::SplitType::Adjustment,
            split::SplitType::Settlement,
        ] {
            let db_type = SplitType::from(core_type);
            assert_eq!(db_type.to_value(), core_type.as_str());
            assert_eq!(split::SplitType::from(db_type), core_type);
        }
    }

    #[test]
    fn test_status_conversions_agree_on_db_values() {
        for status in [
            settlement::SettlementStatus::Pending,
            settlement::SettlementStatus::Completed,
            settlement::SettlementStatus::Failed,
        ] {
            assert_eq!(SettlementStatus::from(status).to_value(), status.as_str());
        }
        for status in [
            reminder::ReminderStatus::Pending,
            reminder::ReminderStatus::Completed,
            reminder::ReminderStatus::Cancelled,
        ] {
            assert_eq!(ReminderStatus::from(status).to_value(), status.as_str());
        }
    }
}
