//! Built-in executor implementations.

pub mod order_sync;
pub mod report;

pub use order_sync::{
    MarketplaceAdapter, MarketplaceOrder, NoopOrderSink, OrderOutcome, OrderSink,
    OrderSyncExecutor,
};
pub use report::{LoggingReportAggregator, ReportAggregationExecutor, ReportAggregator};
