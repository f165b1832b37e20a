//! Blocking client for a Zephyr Scale-compatible test-management service.
//!
//! Same construction pattern as the issue tracker client: built once from
//! [`LayeredConfig`], downgraded to inactive with a warning when the
//! configuration is unusable, and every operation on an inactive client
//! returns [`ZephyrError::Inactive`] without touching the network. Requests
//! carry bearer-token authorization.

mod error;

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use serde::Serialize;
use url::Url;

use crate::config::LayeredConfig;
use crate::tags::{test_case_key, test_cycle_key};

pub use error::ZephyrError;

/// Status name reported for a passed execution.
const STATUS_PASS: &str = "Pass";

/// Status name reported for a failed execution.
const STATUS_FAIL: &str = "Fail";

/// Test-cycle service client holding credentials for the process lifetime.
///
/// # Example
///
/// ```no_run
/// use tattle::{LayeredConfig, ZephyrClient};
///
/// let config = LayeredConfig::load().expect("configuration should load");
/// let zephyr = ZephyrClient::from_config(&config);
/// let tags = vec!["@Key_ABC-1".to_owned(), "@Zephyr_CYC-9".to_owned()];
/// if zephyr.is_active() {
///     zephyr.record_execution(&tags, true, 1_200).expect("execution should record");
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ZephyrClient {
    state: Option<ActiveState>,
}

#[derive(Debug, Clone)]
struct ActiveState {
    http: Client,
    base_url: String,
    token: String,
    project_key: String,
}

impl ZephyrClient {
    /// Builds the client from configuration.
    ///
    /// Reads `zephyr.connector.isActive`; when active, reads the bearer
    /// token, project identifier, and base URL. A missing or blank value, an
    /// unparsable base URL, or an HTTP client construction failure downgrades
    /// the connector to inactive with a warning. Construction never fails.
    #[must_use]
    pub fn from_config(config: &LayeredConfig) -> Self {
        Self {
            state: build_active_state(config),
        }
    }

    /// Returns true when the connector is configured and usable.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.state.is_some()
    }

    /// Records a pass/fail execution for the scenario named by `tags`.
    ///
    /// The test-case key (`@Key_` tag) is required; the test-cycle key
    /// (`@Zephyr_` tag) is optional and omitted from the payload when
    /// absent.
    ///
    /// # Errors
    ///
    /// Returns [`ZephyrError::MissingTestCaseTag`] when no `@Key_` tag is
    /// present (no network call is made), and the usual connector errors
    /// otherwise; success is a 201 response.
    pub fn record_execution(
        &self,
        tags: &[String],
        passed: bool,
        duration_ms: u64,
    ) -> Result<(), ZephyrError> {
        let status_name = if passed { STATUS_PASS } else { STATUS_FAIL };
        self.post_execution("record execution", tags, status_name, duration_ms)?;
        tracing::info!("recorded {status_name} execution");
        Ok(())
    }

    /// Reports the given status for the scenario's test cycle.
    ///
    /// Sends an execution record with `executionTime: 0`. Checks the
    /// activation flag like every other operation.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`ZephyrClient::record_execution`].
    pub fn update_cycle_status(
        &self,
        tags: &[String],
        status_name: &str,
    ) -> Result<(), ZephyrError> {
        self.post_execution("update cycle status", tags, status_name, 0)?;
        tracing::info!("updated test cycle status to {status_name}");
        Ok(())
    }

    /// Checks whether the test cycle exists.
    ///
    /// # Errors
    ///
    /// Returns [`ZephyrError`] when the connector is inactive, the transport
    /// fails, or the service answers with a status other than 200 or 404.
    pub fn test_cycle_exists(&self, cycle_key: &str) -> Result<bool, ZephyrError> {
        let state = self.active()?;
        let operation = "check test cycle";
        let url = format!("{}/v2/testcycles/{cycle_key}", state.base_url);
        let response = state
            .get(url.as_str())
            .send()
            .map_err(|error| ZephyrError::Network {
                operation,
                message: error.to_string(),
            })?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(ZephyrError::UnexpectedStatus {
                operation,
                status: status.as_u16(),
            }),
        }
    }

    /// Checks that every named test cycle exists.
    ///
    /// Short-circuits on the first missing cycle.
    ///
    /// # Errors
    ///
    /// Propagates the first [`ZephyrError`] from an individual check.
    pub fn test_cycles_exist(&self, cycle_keys: &[String]) -> Result<bool, ZephyrError> {
        for cycle_key in cycle_keys {
            if !self.test_cycle_exists(cycle_key.as_str())? {
                tracing::warn!("test cycle {cycle_key} does not exist");
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn post_execution(
        &self,
        operation: &'static str,
        tags: &[String],
        status_name: &str,
        execution_time: u64,
    ) -> Result<(), ZephyrError> {
        let state = self.active()?;
        let test_case = test_case_key(tags).ok_or(ZephyrError::MissingTestCaseTag)?;
        let payload = TestExecutionRequest {
            project_key: state.project_key.as_str(),
            test_case_key: test_case,
            test_cycle_key: test_cycle_key(tags),
            status_name,
            execution_time,
        };
        let url = format!("{}/v2/testexecutions", state.base_url);
        let response = state
            .post(url.as_str())
            .json(&payload)
            .send()
            .map_err(|error| ZephyrError::Network {
                operation,
                message: error.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::CREATED {
            Ok(())
        } else {
            Err(ZephyrError::UnexpectedStatus {
                operation,
                status: status.as_u16(),
            })
        }
    }

    fn active(&self) -> Result<&ActiveState, ZephyrError> {
        self.state.as_ref().ok_or(ZephyrError::Inactive)
    }
}

impl ActiveState {
    fn get(&self, url: &str) -> RequestBuilder {
        self.http.get(url).bearer_auth(self.token.as_str())
    }

    fn post(&self, url: &str) -> RequestBuilder {
        self.http.post(url).bearer_auth(self.token.as_str())
    }
}

fn build_active_state(config: &LayeredConfig) -> Option<ActiveState> {
    let active = match config.resolve_flag("zephyr.connector.isActive") {
        Ok(active) => active,
        Err(error) => {
            tracing::warn!("test-cycle connector disabled: {error}");
            return None;
        }
    };
    if !active {
        tracing::info!("test-cycle connector is not active");
        return None;
    }

    let token = non_blank(config, "zephyr.connector.zephyrKey")?;
    let project_key = non_blank(config, "zephyr.connector.projectId")?;
    let base_url = non_blank(config, "zephyr.connector.baseUrl")?;

    if let Err(error) = Url::parse(base_url.as_str()) {
        tracing::warn!("test-cycle connector disabled: base URL is invalid: {error}");
        return None;
    }

    let http = match Client::builder().timeout(config.http_timeout()).build() {
        Ok(http) => http,
        Err(error) => {
            tracing::warn!("test-cycle connector disabled: HTTP client failed: {error}");
            return None;
        }
    };

    tracing::info!("test-cycle connector is active");
    Some(ActiveState {
        http,
        base_url: base_url.trim_end_matches('/').to_owned(),
        token,
        project_key,
    })
}

fn non_blank(config: &LayeredConfig, key: &str) -> Option<String> {
    match config.resolve(key) {
        Ok(value) if !value.trim().is_empty() => Some(value.to_owned()),
        Ok(_) => {
            tracing::warn!("test-cycle connector disabled: '{key}' is blank");
            None
        }
        Err(error) => {
            tracing::warn!("test-cycle connector disabled: {error}");
            None
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TestExecutionRequest<'a> {
    project_key: &'a str,
    test_case_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    test_cycle_key: Option<&'a str>,
    status_name: &'a str,
    execution_time: u64,
}
