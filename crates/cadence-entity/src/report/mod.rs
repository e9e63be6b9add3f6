//! Report kinds aggregated by the daily trigger.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A business report that is pre-aggregated once per day per tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportKind {
    /// Sales totals for the period.
    SalesSummary,
    /// Day-by-day sales trend.
    SalesDailyTrend,
    /// Stock levels and valuation.
    InventorySummary,
    /// Monthly profit and loss.
    ProfitLossMonthly,
    /// Best and worst selling products.
    ProductRanking,
    /// Top customers by revenue.
    CustomerRanking,
}

impl ReportKind {
    /// Every report kind, in aggregation order.
    pub const ALL: [ReportKind; 6] = [
        Self::SalesSummary,
        Self::SalesDailyTrend,
        Self::InventorySummary,
        Self::ProfitLossMonthly,
        Self::ProductRanking,
        Self::CustomerRanking,
    ];

    /// Stable string form, also used as the job scope key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SalesSummary => "SALES_SUMMARY",
            Self::SalesDailyTrend => "SALES_DAILY_TREND",
            Self::InventorySummary => "INVENTORY_SUMMARY",
            Self::ProfitLossMonthly => "PROFIT_LOSS_MONTHLY",
            Self::ProductRanking => "PRODUCT_RANKING",
            Self::CustomerRanking => "CUSTOMER_RANKING",
        }
    }

    /// Reverse of [`ReportKind::as_str`].
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == value)
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_every_kind() {
        for kind in ReportKind::ALL {
            assert_eq!(ReportKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ReportKind::parse("UNKNOWN"), None);
    }

    #[test]
    fn test_serde_matches_as_str() {
        let json = serde_json::to_string(&ReportKind::ProfitLossMonthly).unwrap();
        assert_eq!(json, "\"PROFIT_LOSS_MONTHLY\"");
    }
}
