//! Field-update payloads and the batched issue update builder.

use serde::Serialize;

use super::error::JiraError;
use super::JiraClient;

/// One `{"set": value}` operation in an update payload.
#[derive(Debug, Serialize)]
struct SetOperation<T> {
    set: T,
}

/// Optional issue fields accumulated for a single update call.
///
/// Only set fields serialize into the outbound payload; an entirely empty
/// update is rejected locally before any network call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldUpdate {
    summary: Option<String>,
    description: Option<String>,
    labels: Option<Vec<String>>,
}

impl FieldUpdate {
    /// Creates an update with no fields set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the issue summary.
    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Sets the issue description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replaces the issue labels.
    #[must_use]
    pub fn labels(mut self, labels: Vec<String>) -> Self {
        self.labels = Some(labels);
        self
    }

    /// Returns true when no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.summary.is_none() && self.description.is_none() && self.labels.is_none()
    }

    pub(super) fn summary_value(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub(super) fn description_value(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub(super) fn request_body(&self) -> UpdateRequestBody<'_> {
        UpdateRequestBody {
            update: UpdateOperations {
                summary: self
                    .summary
                    .as_deref()
                    .map(|value| vec![SetOperation { set: value }]),
                description: self
                    .description
                    .as_deref()
                    .map(|value| vec![SetOperation { set: value }]),
                labels: self
                    .labels
                    .as_deref()
                    .map(|value| vec![SetOperation { set: value }]),
            },
        }
    }
}

/// Wire shape of a field update: `{"update": {field: [{"set": value}]}}`.
#[derive(Debug, Serialize)]
pub(super) struct UpdateRequestBody<'a> {
    update: UpdateOperations<'a>,
}

#[derive(Debug, Serialize)]
struct UpdateOperations<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<Vec<SetOperation<&'a str>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<Vec<SetOperation<&'a str>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    labels: Option<Vec<SetOperation<&'a [String]>>>,
}

/// A step of a batched issue update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStep {
    /// Add a comment to the issue.
    Comment,
    /// Send the accumulated field updates.
    Fields,
    /// Transition the issue to a new status.
    Transition,
    /// Attach the latest evidence file.
    Evidence,
    /// Create a new issue in the named project.
    Create,
}

/// Per-step outcomes of applying a batched update.
///
/// Failed steps are logged and do not abort the remaining steps; a tracker
/// outage must not fail the test run that reported through it.
#[derive(Debug, Default)]
pub struct UpdateReport {
    steps: Vec<(UpdateStep, Result<(), JiraError>)>,
}

impl UpdateReport {
    /// Returns true when every attempted step succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.steps.iter().all(|(_, outcome)| outcome.is_ok())
    }

    /// The attempted steps and their outcomes, in execution order.
    #[must_use]
    pub fn outcomes(&self) -> &[(UpdateStep, Result<(), JiraError>)] {
        self.steps.as_slice()
    }

    fn record(&mut self, step: UpdateStep, outcome: Result<(), JiraError>) {
        if let Err(error) = &outcome {
            tracing::warn!("batched update step {step:?} failed: {error}");
        }
        self.steps.push((step, outcome));
    }
}

/// Fluent builder batching several tracker calls against one issue.
///
/// `apply` executes the configured steps in a fixed order — comment, field
/// update, transition, evidence, create — and each step runs only when its
/// data was actually set.
///
/// # Example
///
/// ```no_run
/// use tattle::{IssueUpdate, JiraClient, LayeredConfig};
///
/// let config = LayeredConfig::load().expect("configuration should load");
/// let client = JiraClient::from_config(&config);
/// let report = IssueUpdate::new("ABC-1")
///     .summary("Checkout regression")
///     .comment("Reproduced by the nightly run")
///     .transition("31")
///     .apply(&client);
/// assert!(report.is_success() || !client.is_active());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueUpdate {
    issue_key: String,
    fields: FieldUpdate,
    comment: Option<String>,
    transition_id: Option<String>,
    attach_evidence: bool,
    project_key: Option<String>,
}

impl IssueUpdate {
    /// Starts a batch against the given issue key.
    #[must_use]
    pub fn new(issue_key: impl Into<String>) -> Self {
        Self {
            issue_key: issue_key.into(),
            ..Self::default()
        }
    }

    /// Sets the new summary.
    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.fields = self.fields.summary(summary);
        self
    }

    /// Sets the new description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.fields = self.fields.description(description);
        self
    }

    /// Replaces the labels.
    #[must_use]
    pub fn labels(mut self, labels: Vec<String>) -> Self {
        self.fields = self.fields.labels(labels);
        self
    }

    /// Adds a comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Transitions the issue to the given workflow status id.
    #[must_use]
    pub fn transition(mut self, status_id: impl Into<String>) -> Self {
        self.transition_id = Some(status_id.into());
        self
    }

    /// Attaches the most recent evidence file to the issue.
    #[must_use]
    pub const fn attach_latest_evidence(mut self) -> Self {
        self.attach_evidence = true;
        self
    }

    /// Additionally creates a new issue in `project_key`, reusing the batch's
    /// summary and description.
    ///
    /// The create step is skipped with a warning unless summary and
    /// description are both set.
    #[must_use]
    pub fn create_in_project(mut self, project_key: impl Into<String>) -> Self {
        self.project_key = Some(project_key.into());
        self
    }

    /// The steps `apply` would execute, in order.
    #[must_use]
    pub fn planned_steps(&self) -> Vec<UpdateStep> {
        let mut steps = Vec::new();
        if self.comment.is_some() {
            steps.push(UpdateStep::Comment);
        }
        if !self.fields.is_empty() {
            steps.push(UpdateStep::Fields);
        }
        if self.transition_id.is_some() {
            steps.push(UpdateStep::Transition);
        }
        if self.attach_evidence {
            steps.push(UpdateStep::Evidence);
        }
        if self.project_key.is_some() && self.create_spec().is_some() {
            steps.push(UpdateStep::Create);
        }
        steps
    }

    /// Executes the configured steps against the tracker.
    ///
    /// Step failures are logged and recorded in the report; later steps still
    /// run.
    #[must_use]
    pub fn apply(&self, client: &JiraClient) -> UpdateReport {
        let mut report = UpdateReport::default();

        if let Some(comment) = self.comment.as_deref() {
            report.record(
                UpdateStep::Comment,
                client.add_comment(self.issue_key.as_str(), comment),
            );
        }
        if !self.fields.is_empty() {
            report.record(
                UpdateStep::Fields,
                client.update_issue_fields(self.issue_key.as_str(), &self.fields),
            );
        }
        if let Some(status_id) = self.transition_id.as_deref() {
            report.record(
                UpdateStep::Transition,
                client.transition_issue(self.issue_key.as_str(), status_id),
            );
        }
        if self.attach_evidence {
            report.record(
                UpdateStep::Evidence,
                client.attach_latest_evidence(self.issue_key.as_str()),
            );
        }
        if let Some(project_key) = self.project_key.as_deref() {
            self.create_spec().map_or_else(
                || {
                    tracing::warn!(
                        "skipping issue creation in {project_key}: summary and description required"
                    );
                },
                |(summary, description)| {
                    report.record(
                        UpdateStep::Create,
                        client
                            .create_issue(project_key, summary, description)
                            .map(|_created_key| ()),
                    );
                },
            );
        }

        report
    }

    fn create_spec(&self) -> Option<(&str, &str)> {
        self.fields
            .summary_value()
            .zip(self.fields.description_value())
    }
}

#[cfg(test)]
#[path = "update_tests.rs"]
mod tests;
