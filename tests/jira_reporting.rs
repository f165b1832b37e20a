//! Endpoint contract tests for the issue tracker client.

type FixtureResult<T> = Result<T, Box<dyn std::error::Error>>;

use rstest::{fixture, rstest};
use tokio::runtime::Runtime;
use wiremock::matchers::{any, body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tattle::{FieldUpdate, IssueUpdate, JiraClient, JiraError, LayeredConfig, UpdateStep};

const BASIC_AUTH: &str = "Basic cmVwb3J0ZXI6c2VjcmV0";

fn config_text(base_url: &str, evidence_dir: &str, active: bool) -> String {
    format!(
        r#"
[http]
timeoutSeconds = 5

[jira.connector]
isActive = {active}
baseUrl = "{base_url}"
username = "reporter"
jiraKey = "secret"
issueType = "Tarefa"

[evidence.path]
windows = "{evidence_dir}"
unix = "{evidence_dir}"
jenkins = "{evidence_dir}"
"#
    )
}

struct TrackerFixture {
    runtime: Runtime,
    server: MockServer,
    client: JiraClient,
}

impl TrackerFixture {
    fn with_evidence_dir(evidence_dir: &str, active: bool) -> FixtureResult<Self> {
        let runtime = Runtime::new()?;
        let server = runtime.block_on(MockServer::start());
        let config = LayeredConfig::from_toml(
            &config_text(&server.uri(), evidence_dir, active),
            None,
        )?;
        let client = JiraClient::from_config(&config);
        Ok(Self {
            runtime,
            server,
            client,
        })
    }

    fn mount(&self, mock: Mock) {
        self.runtime.block_on(mock.mount(&self.server));
    }

    fn verify(&self) {
        self.runtime.block_on(self.server.verify());
    }
}

#[fixture]
fn tracker() -> FixtureResult<TrackerFixture> {
    TrackerFixture::with_evidence_dir("/nonexistent-evidence", true)
}

#[rstest]
fn validate_project_succeeds_on_ok(tracker: FixtureResult<TrackerFixture>) -> FixtureResult<()> {
    let fixture = tracker?;
    fixture.mount(
        Mock::given(method("GET"))
            .and(path("/rest/api/2/project"))
            .and(header("Authorization", BASIC_AUTH))
            .respond_with(ResponseTemplate::new(200)),
    );

    fixture.client.validate_project("ABC")?;
    Ok(())
}

#[rstest]
fn validate_project_maps_unexpected_status(
    tracker: FixtureResult<TrackerFixture>,
) -> FixtureResult<()> {
    let fixture = tracker?;
    fixture.mount(
        Mock::given(method("GET"))
            .and(path("/rest/api/2/project"))
            .respond_with(ResponseTemplate::new(404)),
    );

    let error = fixture
        .client
        .validate_project("ABC")
        .expect_err("404 should be rejected");
    assert!(
        matches!(error, JiraError::UnexpectedStatus { status: 404, .. }),
        "unexpected error: {error:?}"
    );
    Ok(())
}

#[rstest]
fn search_carries_the_project_jql(tracker: FixtureResult<TrackerFixture>) -> FixtureResult<()> {
    let fixture = tracker?;
    fixture.mount(
        Mock::given(method("GET"))
            .and(path("/rest/api/latest/search"))
            .and(query_param("jql", "project=ABC"))
            .respond_with(ResponseTemplate::new(200)),
    );

    fixture.client.search_project_issues("ABC")?;
    Ok(())
}

#[rstest]
fn update_sends_only_the_set_fields(tracker: FixtureResult<TrackerFixture>) -> FixtureResult<()> {
    let fixture = tracker?;
    fixture.mount(
        Mock::given(method("PUT"))
            .and(path("/rest/api/2/issue/ABC-1"))
            .and(body_json(
                serde_json::json!({"update": {"summary": [{"set": "S"}]}}),
            ))
            .respond_with(ResponseTemplate::new(204)),
    );

    fixture
        .client
        .update_issue_fields("ABC-1", &FieldUpdate::new().summary("S"))?;
    Ok(())
}

#[rstest]
fn empty_update_is_rejected_without_a_network_call(
    tracker: FixtureResult<TrackerFixture>,
) -> FixtureResult<()> {
    let fixture = tracker?;
    fixture.mount(Mock::given(any()).respond_with(ResponseTemplate::new(500)).expect(0));

    let error = fixture
        .client
        .update_issue_fields("ABC-1", &FieldUpdate::new())
        .expect_err("empty update should be rejected");
    assert_eq!(error, JiraError::EmptyUpdate);

    fixture.verify();
    Ok(())
}

#[rstest]
fn transition_posts_the_status_id(tracker: FixtureResult<TrackerFixture>) -> FixtureResult<()> {
    let fixture = tracker?;
    fixture.mount(
        Mock::given(method("POST"))
            .and(path("/rest/api/2/issue/ABC-1/transitions"))
            .and(body_json(serde_json::json!({"transition": {"id": "31"}})))
            .respond_with(ResponseTemplate::new(204)),
    );

    fixture.client.transition_issue("ABC-1", "31")?;
    Ok(())
}

#[rstest]
fn comment_posts_the_body(tracker: FixtureResult<TrackerFixture>) -> FixtureResult<()> {
    let fixture = tracker?;
    fixture.mount(
        Mock::given(method("POST"))
            .and(path("/rest/api/2/issue/ABC-1/comment"))
            .and(body_json(serde_json::json!({"body": "Reproduced tonight"})))
            .respond_with(ResponseTemplate::new(201)),
    );

    fixture.client.add_comment("ABC-1", "Reproduced tonight")?;
    Ok(())
}

#[rstest]
fn create_issue_returns_the_created_key(
    tracker: FixtureResult<TrackerFixture>,
) -> FixtureResult<()> {
    let fixture = tracker?;
    fixture.mount(
        Mock::given(method("POST"))
            .and(path("/rest/api/2/issue"))
            .and(body_json(serde_json::json!({
                "fields": {
                    "project": {"key": "ABC"},
                    "summary": "S",
                    "description": "D",
                    "issuetype": {"name": "Tarefa"},
                }
            })))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({"id": "10000", "key": "ABC-10"})),
            ),
    );

    let created_key = fixture.client.create_issue("ABC", "S", "D")?;
    assert_eq!(created_key, "ABC-10");
    Ok(())
}

#[rstest]
fn create_issue_without_a_key_is_malformed(
    tracker: FixtureResult<TrackerFixture>,
) -> FixtureResult<()> {
    let fixture = tracker?;
    fixture.mount(
        Mock::given(method("POST"))
            .and(path("/rest/api/2/issue"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({}))),
    );

    let error = fixture
        .client
        .create_issue("ABC", "S", "D")
        .expect_err("missing key should be rejected");
    assert!(
        matches!(error, JiraError::MalformedResponse { .. }),
        "unexpected error: {error:?}"
    );
    Ok(())
}

#[rstest]
fn inactive_client_performs_zero_network_calls() -> FixtureResult<()> {
    let fixture = TrackerFixture::with_evidence_dir("/nonexistent-evidence", false)?;
    fixture.mount(Mock::given(any()).respond_with(ResponseTemplate::new(200)).expect(0));

    assert!(!fixture.client.is_active());
    assert_eq!(
        fixture.client.validate_project("ABC"),
        Err(JiraError::Inactive)
    );
    assert_eq!(
        fixture.client.add_comment("ABC-1", "text"),
        Err(JiraError::Inactive)
    );
    assert_eq!(
        fixture
            .client
            .update_issue_fields("ABC-1", &FieldUpdate::new().summary("S")),
        Err(JiraError::Inactive)
    );
    assert_eq!(
        fixture.client.transition_issue("ABC-1", "31"),
        Err(JiraError::Inactive)
    );
    assert!(matches!(
        fixture.client.create_issue("ABC", "S", "D"),
        Err(JiraError::Inactive)
    ));

    fixture.verify();
    Ok(())
}

#[rstest]
fn blank_credentials_downgrade_to_inactive() -> FixtureResult<()> {
    let config = LayeredConfig::from_toml(
        &config_text("", "/nonexistent-evidence", true),
        None,
    )?;
    let client = JiraClient::from_config(&config);
    assert!(!client.is_active());
    Ok(())
}

#[rstest]
fn batch_apply_runs_only_the_configured_steps(
    tracker: FixtureResult<TrackerFixture>,
) -> FixtureResult<()> {
    let fixture = tracker?;
    fixture.mount(
        Mock::given(method("POST"))
            .and(path("/rest/api/2/issue/ABC-1/comment"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1),
    );
    fixture.mount(
        Mock::given(method("PUT"))
            .and(path("/rest/api/2/issue/ABC-1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0),
    );

    let report = IssueUpdate::new("ABC-1")
        .comment("only a comment")
        .apply(&fixture.client);

    assert!(report.is_success());
    assert_eq!(report.outcomes().len(), 1);
    assert!(matches!(
        report.outcomes().first(),
        Some((UpdateStep::Comment, Ok(())))
    ));

    fixture.verify();
    Ok(())
}

#[rstest]
fn batch_apply_continues_past_a_failed_step(
    tracker: FixtureResult<TrackerFixture>,
) -> FixtureResult<()> {
    let fixture = tracker?;
    fixture.mount(
        Mock::given(method("POST"))
            .and(path("/rest/api/2/issue/ABC-1/comment"))
            .respond_with(ResponseTemplate::new(500)),
    );
    fixture.mount(
        Mock::given(method("POST"))
            .and(path("/rest/api/2/issue/ABC-1/transitions"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1),
    );

    let report = IssueUpdate::new("ABC-1")
        .comment("doomed")
        .transition("31")
        .apply(&fixture.client);

    assert!(!report.is_success());
    assert_eq!(report.outcomes().len(), 2);
    assert!(matches!(
        report.outcomes().first(),
        Some((UpdateStep::Comment, Err(JiraError::UnexpectedStatus { .. })))
    ));
    assert!(matches!(
        report.outcomes().get(1),
        Some((UpdateStep::Transition, Ok(())))
    ));

    fixture.verify();
    Ok(())
}

#[rstest]
fn evidence_uploads_the_latest_file() -> FixtureResult<()> {
    let evidence_root = tempfile::tempdir()?;
    let report_dir = evidence_root.path().join("PDF");
    std::fs::create_dir(&report_dir)?;
    std::fs::write(report_dir.join("report.pdf"), b"%PDF-1.4")?;

    let _env = env_lock::lock_env([("JENKINS_HOME", None::<&str>)]);
    let fixture = TrackerFixture::with_evidence_dir(
        evidence_root
            .path()
            .to_str()
            .ok_or("temp path should be UTF-8")?,
        true,
    )?;
    fixture.mount(
        Mock::given(method("POST"))
            .and(path("/rest/api/3/issue/ABC-1/attachments"))
            .and(header("X-Atlassian-Token", "no-check"))
            .respond_with(ResponseTemplate::new(200)),
    );

    fixture.client.attach_latest_evidence("@Jira_ABC-1")?;
    Ok(())
}

#[rstest]
fn missing_evidence_file_is_reported_without_an_upload() -> FixtureResult<()> {
    let evidence_root = tempfile::tempdir()?;
    std::fs::create_dir(evidence_root.path().join("PDF"))?;

    let _env = env_lock::lock_env([("JENKINS_HOME", None::<&str>)]);
    let fixture = TrackerFixture::with_evidence_dir(
        evidence_root
            .path()
            .to_str()
            .ok_or("temp path should be UTF-8")?,
        true,
    )?;
    fixture.mount(Mock::given(any()).respond_with(ResponseTemplate::new(200)).expect(0));

    let error = fixture
        .client
        .attach_latest_evidence("@Jira_ABC-1")
        .expect_err("empty evidence directory should be rejected");
    assert!(
        matches!(error, JiraError::NoEvidenceFile { .. }),
        "unexpected error: {error:?}"
    );

    fixture.verify();
    Ok(())
}

#[rstest]
fn evidence_for_tags_targets_only_tracker_tags() -> FixtureResult<()> {
    let evidence_root = tempfile::tempdir()?;
    let report_dir = evidence_root.path().join("PDF");
    std::fs::create_dir(&report_dir)?;
    std::fs::write(report_dir.join("report.pdf"), b"%PDF-1.4")?;

    let _env = env_lock::lock_env([("JENKINS_HOME", None::<&str>)]);
    let fixture = TrackerFixture::with_evidence_dir(
        evidence_root
            .path()
            .to_str()
            .ok_or("temp path should be UTF-8")?,
        true,
    )?;
    fixture.mount(
        Mock::given(method("POST"))
            .and(path("/rest/api/3/issue/ABC-1/attachments"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1),
    );

    let tags = vec![
        "@Jira_ABC-1".to_owned(),
        "@Key_ABC-1".to_owned(),
        "@smoke".to_owned(),
    ];
    let outcomes = fixture.client.attach_evidence_for_tags(&tags);

    assert_eq!(outcomes.len(), 1);
    assert!(matches!(outcomes.first(), Some((tag, Ok(()))) if tag == "@Jira_ABC-1"));

    fixture.verify();
    Ok(())
}

#[rstest]
fn consult_issue_primes_an_empty_batch(
    tracker: FixtureResult<TrackerFixture>,
) -> FixtureResult<()> {
    let fixture = tracker?;
    fixture.mount(
        Mock::given(method("GET"))
            .and(path("/rest/api/2/project"))
            .respond_with(ResponseTemplate::new(200)),
    );
    fixture.mount(
        Mock::given(method("GET"))
            .and(path("/rest/api/latest/search"))
            .respond_with(ResponseTemplate::new(200)),
    );
    fixture.mount(
        Mock::given(method("GET"))
            .and(path("/rest/api/2/search"))
            .respond_with(ResponseTemplate::new(200)),
    );

    let update = fixture.client.consult_issue("ABC", "ABC-1")?;
    assert!(update.planned_steps().is_empty());
    Ok(())
}
