pub mod aggregate;
pub mod category;
pub mod refresher;

pub use aggregate::{
    NoDataReason, ParticulatePoint, TrendDirection, TrendPoint, TrendReport, TrendState,
    build_report, classify_trend, particulate_series, run_cycle,
};
pub use category::AqiCategory;
pub use refresher::{TrendDashboard, spawn_trend_refresh};
