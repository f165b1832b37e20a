//! Tag-derived identifiers for scenarios.
//!
//! Test scenarios carry textual tags that encode the identifiers linking them
//! to external services. The first tag with a matching prefix wins; absence
//! yields `None`.

/// Tag prefix naming the linked test case (`@Key_ABC-1`).
pub const TEST_CASE_PREFIX: &str = "@Key_";

/// Tag prefix naming the linked test cycle (`@Zephyr_CYC-9`).
pub const TEST_CYCLE_PREFIX: &str = "@Zephyr_";

/// Tag prefix naming the linked tracker issue (`@Jira_ABC-1`).
pub const ISSUE_PREFIX: &str = "@Jira_";

/// Returns the value of the first tag carrying `prefix`, trimmed.
#[must_use]
pub fn tag_value<'a>(tags: &'a [String], prefix: &str) -> Option<&'a str> {
    tags.iter()
        .find_map(|tag| tag.strip_prefix(prefix))
        .map(str::trim)
}

/// Derives the test-case key from scenario tags.
#[must_use]
pub fn test_case_key(tags: &[String]) -> Option<&str> {
    tag_value(tags, TEST_CASE_PREFIX)
}

/// Derives the test-cycle key from scenario tags.
#[must_use]
pub fn test_cycle_key(tags: &[String]) -> Option<&str> {
    tag_value(tags, TEST_CYCLE_PREFIX)
}

/// Strips everything up to and including the first underscore.
///
/// `"@Jira_ABC-1"` becomes `"ABC-1"`; a value without an underscore passes
/// through unchanged.
#[must_use]
pub fn linked_issue_key(tagged_key: &str) -> &str {
    tagged_key
        .split_once('_')
        .map_or(tagged_key, |(_, rest)| rest)
}
