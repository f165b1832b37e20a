//! Blocking client for a Jira-compatible issue tracker.
//!
//! The client is constructed once from [`LayeredConfig`] and passed
//! explicitly to collaborators. Unusable configuration downgrades the client
//! to inactive with a warning instead of failing construction; every
//! operation on an inactive client returns [`JiraError::Inactive`] without
//! touching the network.

mod error;
mod evidence;
mod update;

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, multipart};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::LayeredConfig;
use crate::tags::{ISSUE_PREFIX, linked_issue_key};

pub use error::JiraError;
pub use update::{FieldUpdate, IssueUpdate, UpdateReport, UpdateStep};

use evidence::EvidenceLocator;

/// Issue tracker client holding credentials for the process lifetime.
///
/// # Example
///
/// ```no_run
/// use tattle::{JiraClient, LayeredConfig};
///
/// let config = LayeredConfig::load().expect("configuration should load");
/// let jira = JiraClient::from_config(&config);
/// if jira.is_active() {
///     jira.validate_project("ABC").expect("project should validate");
/// }
/// ```
#[derive(Debug, Clone)]
pub struct JiraClient {
    state: Option<ActiveState>,
}

#[derive(Debug, Clone)]
struct ActiveState {
    http: Client,
    base_url: String,
    username: String,
    api_key: String,
    issue_type: String,
    evidence: EvidenceLocator,
}

impl JiraClient {
    /// Builds the client from configuration.
    ///
    /// Reads `jira.connector.isActive`; when active, reads the base URL,
    /// username, and API key. A missing or blank credential, an unparsable
    /// base URL, or an HTTP client construction failure downgrades the
    /// connector to inactive with a warning. Construction itself never fails.
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

    /// Checks that the tracker's project endpoint answers.
    ///
    /// # Errors
    ///
    /// Returns [`JiraError`] when the connector is inactive, the transport
    /// fails, or the tracker answers with a status other than 200.
    pub fn validate_project(&self, project_key: &str) -> Result<(), JiraError> {
        let state = self.active()?;
        let url = format!("{}/rest/api/2/project", state.base_url);
        execute("validate project", state.get(url.as_str()), StatusCode::OK)?;
        tracing::info!("validated tracker project {project_key}");
        Ok(())
    }

    /// Runs the project's issue search and logs the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`JiraError`] when the connector is inactive, the transport
    /// fails, or the search endpoint answers with a status other than 200.
    pub fn search_project_issues(&self, project_key: &str) -> Result<(), JiraError> {
        let state = self.active()?;
        let url = format!(
            "{}/rest/api/latest/search?jql=project={project_key}",
            state.base_url
        );
        execute("search project issues", state.get(url.as_str()), StatusCode::OK)?;
        tracing::info!("searched issues for project {project_key}");
        Ok(())
    }

    /// Checks that the tracker's search endpoint answers.
    ///
    /// The request carries no filter for `issue_key`, so a 200 confirms the
    /// search endpoint is reachable rather than that the issue exists. This
    /// matches the behaviour the tracker integrations have always had;
    /// changing it to a real per-issue query is a semantic change for
    /// stakeholders.
    ///
    /// # Errors
    ///
    /// Returns [`JiraError`] when the connector is inactive, the transport
    /// fails, or the tracker answers with a status other than 200.
    pub fn validate_issue(&self, issue_key: &str) -> Result<(), JiraError> {
        let state = self.active()?;
        let url = format!("{}/rest/api/2/search", state.base_url);
        execute("validate issue", state.get(url.as_str()), StatusCode::OK)?;
        tracing::info!("validated tracker issue {issue_key}");
        Ok(())
    }

    /// Sends the set fields of `update` to the issue.
    ///
    /// # Errors
    ///
    /// Returns [`JiraError::EmptyUpdate`] when no field is set (no network
    /// call is made), and the usual connector errors otherwise; success is a
    /// 204 response.
    pub fn update_issue_fields(
        &self,
        issue_key: &str,
        update: &FieldUpdate,
    ) -> Result<(), JiraError> {
        if update.is_empty() {
            return Err(JiraError::EmptyUpdate);
        }
        let state = self.active()?;
        let url = format!("{}/rest/api/2/issue/{issue_key}", state.base_url);
        execute(
            "update issue fields",
            state.put(url.as_str()).json(&update.request_body()),
            StatusCode::NO_CONTENT,
        )?;
        tracing::info!("updated fields of issue {issue_key}");
        Ok(())
    }

    /// Transitions the issue to the given workflow status id.
    ///
    /// # Errors
    ///
    /// Returns [`JiraError`] when the connector is inactive, the transport
    /// fails, or the tracker answers with a status other than 204.
    pub fn transition_issue(&self, issue_key: &str, status_id: &str) -> Result<(), JiraError> {
        let state = self.active()?;
        let url = format!("{}/rest/api/2/issue/{issue_key}/transitions", state.base_url);
        let payload = TransitionRequest {
            transition: TransitionId { id: status_id },
        };
        execute(
            "transition issue",
            state.post(url.as_str()).json(&payload),
            StatusCode::NO_CONTENT,
        )?;
        tracing::info!("transitioned issue {issue_key} to status {status_id}");
        Ok(())
    }

    /// Adds a comment to the issue.
    ///
    /// # Errors
    ///
    /// Returns [`JiraError`] when the connector is inactive, the transport
    /// fails, or the tracker answers with a status other than 201.
    pub fn add_comment(&self, issue_key: &str, text: &str) -> Result<(), JiraError> {
        let state = self.active()?;
        let url = format!("{}/rest/api/2/issue/{issue_key}/comment", state.base_url);
        let payload = CommentRequest { body: text };
        execute(
            "add comment",
            state.post(url.as_str()).json(&payload),
            StatusCode::CREATED,
        )?;
        tracing::info!("added comment to issue {issue_key}");
        Ok(())
    }

    /// Uploads the most recent evidence file as an attachment.
    ///
    /// `tagged_key` may carry a tag prefix (`@Jira_ABC-1`); everything up to
    /// and including the first underscore is stripped to obtain the issue
    /// key. The evidence directory comes from configuration, switched by
    /// `JENKINS_HOME` on CI agents.
    ///
    /// # Errors
    ///
    /// Returns [`JiraError::NoEvidenceFile`] when the directory holds no
    /// file, [`JiraError::EvidenceUnreadable`] when the file cannot be read,
    /// and the usual connector errors otherwise; success is a 200 response.
    pub fn attach_latest_evidence(&self, tagged_key: &str) -> Result<(), JiraError> {
        let state = self.active()?;
        let issue_key = linked_issue_key(tagged_key);
        let directory = state.evidence.directory();
        let file =
            evidence::latest_file(&directory).ok_or_else(|| JiraError::NoEvidenceFile {
                directory: directory.to_string(),
            })?;

        let form = multipart::Form::new()
            .file("file", file.as_std_path())
            .map_err(|error| JiraError::EvidenceUnreadable {
                path: file.to_string(),
                message: error.to_string(),
            })?;
        let url = format!("{}/rest/api/3/issue/{issue_key}/attachments", state.base_url);
        execute(
            "attach evidence",
            state
                .post(url.as_str())
                .header("X-Atlassian-Token", "no-check")
                .multipart(form),
            StatusCode::OK,
        )?;
        tracing::info!("attached evidence {file} to issue {issue_key}");
        Ok(())
    }

    /// Attaches the latest evidence file to every issue named by an
    /// `@Jira_`-prefixed tag, returning per-tag outcomes.
    ///
    /// Failures are logged and do not stop the remaining tags.
    #[must_use]
    pub fn attach_evidence_for_tags(
        &self,
        tags: &[String],
    ) -> Vec<(String, Result<(), JiraError>)> {
        tags.iter()
            .filter(|tag| tag.starts_with(ISSUE_PREFIX))
            .map(|tag| {
                let outcome = self.attach_latest_evidence(tag.as_str());
                if let Err(error) = &outcome {
                    tracing::warn!("evidence attachment for tag {tag} failed: {error}");
                }
                (tag.clone(), outcome)
            })
            .collect()
    }

    /// Creates a new issue and returns its key.
    ///
    /// The issue type name comes from `jira.connector.issueType`.
    ///
    /// # Errors
    ///
    /// Returns [`JiraError::MalformedResponse`] when the 201 response body
    /// lacks the created key, and the usual connector errors otherwise.
    pub fn create_issue(
        &self,
        project_key: &str,
        summary: &str,
        description: &str,
    ) -> Result<String, JiraError> {
        let state = self.active()?;
        let url = format!("{}/rest/api/2/issue", state.base_url);
        let payload = CreateIssueRequest {
            fields: CreateIssueFields {
                project: ProjectRef { key: project_key },
                summary,
                description,
                issuetype: IssueTypeRef {
                    name: state.issue_type.as_str(),
                },
            },
        };
        let response = execute(
            "create issue",
            state.post(url.as_str()).json(&payload),
            StatusCode::CREATED,
        )?;
        let created: CreatedIssue =
            response
                .json()
                .map_err(|error| JiraError::MalformedResponse {
                    message: format!("created issue body did not decode: {error}"),
                })?;
        tracing::info!(
            "created issue {} in project {project_key}",
            created.key.as_str()
        );
        Ok(created.key)
    }

    /// Updates only the issue summary.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`JiraClient::update_issue_fields`].
    pub fn update_summary(&self, issue_key: &str, summary: &str) -> Result<(), JiraError> {
        self.update_issue_fields(issue_key, &FieldUpdate::new().summary(summary))
    }

    /// Updates only the issue description.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`JiraClient::update_issue_fields`].
    pub fn update_description(&self, issue_key: &str, description: &str) -> Result<(), JiraError> {
        self.update_issue_fields(issue_key, &FieldUpdate::new().description(description))
    }

    /// Replaces only the issue labels.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`JiraClient::update_issue_fields`].
    pub fn update_labels(&self, issue_key: &str, labels: Vec<String>) -> Result<(), JiraError> {
        self.update_issue_fields(issue_key, &FieldUpdate::new().labels(labels))
    }

    /// Validates the project and issue, then returns a primed update batch.
    ///
    /// Logs the project's issue search along the way.
    ///
    /// # Errors
    ///
    /// Propagates the first failed validation.
    pub fn consult_issue(
        &self,
        project_key: &str,
        issue_key: &str,
    ) -> Result<IssueUpdate, JiraError> {
        self.validate_project(project_key)?;
        if let Err(error) = self.search_project_issues(project_key) {
            tracing::warn!("issue search for project {project_key} failed: {error}");
        }
        self.validate_issue(issue_key)?;
        Ok(IssueUpdate::new(issue_key))
    }

    fn active(&self) -> Result<&ActiveState, JiraError> {
        self.state.as_ref().ok_or(JiraError::Inactive)
    }
}

impl ActiveState {
    fn get(&self, url: &str) -> RequestBuilder {
        self.http
            .get(url)
            .basic_auth(self.username.as_str(), Some(self.api_key.as_str()))
    }

    fn post(&self, url: &str) -> RequestBuilder {
        self.http
            .post(url)
            .basic_auth(self.username.as_str(), Some(self.api_key.as_str()))
    }

    fn put(&self, url: &str) -> RequestBuilder {
        self.http
            .put(url)
            .basic_auth(self.username.as_str(), Some(self.api_key.as_str()))
    }
}

fn execute(
    operation: &'static str,
    request: RequestBuilder,
    expected: StatusCode,
) -> Result<reqwest::blocking::Response, JiraError> {
    let response = request.send().map_err(|error| JiraError::Network {
        operation,
        message: error.to_string(),
    })?;
    let status = response.status();
    if status == expected {
        Ok(response)
    } else {
        Err(JiraError::UnexpectedStatus {
            operation,
            status: status.as_u16(),
        })
    }
}

fn build_active_state(config: &LayeredConfig) -> Option<ActiveState> {
    let active = match config.resolve_flag("jira.connector.isActive") {
        Ok(active) => active,
        Err(error) => {
            tracing::warn!("issue tracker connector disabled: {error}");
            return None;
        }
    };
    if !active {
        tracing::info!("issue tracker connector is not active");
        return None;
    }

    let base_url = non_blank(config, "jira.connector.baseUrl")?;
    let username = non_blank(config, "jira.connector.username")?;
    let api_key = non_blank(config, "jira.connector.jiraKey")?;
    let issue_type = non_blank(config, "jira.connector.issueType")?;

    if let Err(error) = Url::parse(base_url.as_str()) {
        tracing::warn!("issue tracker connector disabled: base URL is invalid: {error}");
        return None;
    }

    let evidence = match EvidenceLocator::from_config(config) {
        Ok(evidence) => evidence,
        Err(error) => {
            tracing::warn!("issue tracker connector disabled: {error}");
            return None;
        }
    };

    let http = match Client::builder().timeout(config.http_timeout()).build() {
        Ok(http) => http,
        Err(error) => {
            tracing::warn!("issue tracker connector disabled: HTTP client failed: {error}");
            return None;
        }
    };

    tracing::info!("issue tracker connector is active");
    Some(ActiveState {
        http,
        base_url: base_url.trim_end_matches('/').to_owned(),
        username,
        api_key,
        issue_type,
        evidence,
    })
}

fn non_blank(config: &LayeredConfig, key: &str) -> Option<String> {
    match config.resolve(key) {
        Ok(value) if !value.trim().is_empty() => Some(value.to_owned()),
        Ok(_) => {
            tracing::warn!("issue tracker connector disabled: '{key}' is blank");
            None
        }
        Err(error) => {
            tracing::warn!("issue tracker connector disabled: {error}");
            None
        }
    }
}

#[derive(Debug, Serialize)]
struct TransitionRequest<'a> {
    transition: TransitionId<'a>,
}

#[derive(Debug, Serialize)]
struct TransitionId<'a> {
    id: &'a str,
}

#[derive(Debug, Serialize)]
struct CommentRequest<'a> {
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateIssueRequest<'a> {
    fields: CreateIssueFields<'a>,
}

#[derive(Debug, Serialize)]
struct CreateIssueFields<'a> {
    project: ProjectRef<'a>,
    summary: &'a str,
    description: &'a str,
    issuetype: IssueTypeRef<'a>,
}

#[derive(Debug, Serialize)]
struct ProjectRef<'a> {
    key: &'a str,
}

#[derive(Debug, Serialize)]
struct IssueTypeRef<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreatedIssue {
    key: String,
}
