//! Tattle reports automated test outcomes to external tracking services.
//!
//! The library wraps two REST integrations behind blocking clients: a
//! Jira-compatible issue tracker (basic auth) and a Zephyr Scale-compatible
//! test-management service (bearer auth). Both are switched on and
//! credentialed through a two-tier configuration layer, so a test run on a
//! machine without tracker access degrades to logged no-ops instead of
//! failing.

pub mod config;
pub mod error;
pub mod jira;
pub mod tags;
pub mod zephyr;

pub use config::{ConfigError, LayeredConfig};
pub use error::AutomationError;
pub use jira::{FieldUpdate, IssueUpdate, JiraClient, JiraError, UpdateReport, UpdateStep};
pub use zephyr::{ZephyrClient, ZephyrError};
