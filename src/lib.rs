pub mod config;
pub mod error;
pub mod models;
pub mod github;
pub mod aggregation;
pub mod metrics;
pub mod summary;
pub mod storage;
pub mod pipeline;

pub use aggregation::AggregationEngine;
pub use config::{AggregationConfig, Config, MetricsConfig};
pub use error::{AggregationError, Error, Result, SubFetchError};
pub use github::{AuthContext, GitHubClient};
pub use metrics::{DashboardMetrics, MonthBucketing};
pub use pipeline::{DashboardReport, RefreshPipeline};
pub use storage::{SnapshotStore, Storage};
pub use summary::{GeminiGenerator, Summary, SummaryGenerator, SummaryService};
