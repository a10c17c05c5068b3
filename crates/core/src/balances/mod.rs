//! Read-side projections: summaries, friend lists, group views, analytics.

pub mod service;
pub mod types;

pub use service::BalanceQueries;
pub use types::{
    BalanceRow, BalanceSummary, CurrencyAmount, FriendBalance, GroupBalanceView,
    MonthlyAnalytics, ShareRow,
};
