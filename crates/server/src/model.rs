use jira_lookup_api::IssueBody;
use serde::Serialize;

/// Error text reported for any issue that could not be resolved.
pub const ISSUE_ERROR_MESSAGE: &str = "Issue not found or API error";

/// One entry of a batch: the upstream body as-is, or an error marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IssueResult {
    Found(IssueBody),
    Failed(IssueFailure),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueFailure {
    #[serde(rename = "issueKey")]
    pub issue_key: String,
    pub error: String,
}

impl IssueResult {
    pub fn failed(issue_key: impl Into<String>) -> Self {
        IssueResult::Failed(IssueFailure {
            issue_key: issue_key.into(),
            error: ISSUE_ERROR_MESSAGE.to_string(),
        })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, IssueResult::Failed(_))
    }

    /// Best-effort key: the requested key for failures, the body's `key` field otherwise.
    pub fn issue_key(&self) -> Option<&str> {
        match self {
            IssueResult::Found(body) => body.get("key").and_then(|v| v.as_str()),
            IssueResult::Failed(failure) => Some(&failure.issue_key),
        }
    }
}

/// Response body for a batch lookup: `{"issues": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct BatchResult {
    pub issues: Vec<IssueResult>,
}

impl BatchResult {
    pub fn new(issues: Vec<IssueResult>) -> Self {
        Self { issues }
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn failure_count(&self) -> usize {
        self.issues.iter().filter(|i| i.is_failure()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failed_serializes_as_marker() {
        let value = serde_json::to_value(IssueResult::failed("PROJ-2")).unwrap();
        assert_eq!(
            value,
            json!({"issueKey": "PROJ-2", "error": "Issue not found or API error"})
        );
    }

    #[test]
    fn test_found_serializes_verbatim() {
        let body = json!({"id": "1", "key": "PROJ-1", "fields": {"summary": "x"}});
        let issue = IssueResult::Found(body.as_object().unwrap().clone());
        assert_eq!(serde_json::to_value(&issue).unwrap(), body);
    }

    #[test]
    fn test_batch_wraps_issues() {
        let batch = BatchResult::new(vec![IssueResult::failed("A-1")]);
        let value = serde_json::to_value(&batch).unwrap();
        assert_eq!(
            value,
            json!({"issues": [{"issueKey": "A-1", "error": ISSUE_ERROR_MESSAGE}]})
        );
        assert_eq!(batch.failure_count(), 1);
    }

    #[test]
    fn test_empty_batch() {
        let batch = BatchResult::default();
        assert!(batch.is_empty());
        assert_eq!(serde_json::to_value(&batch).unwrap(), json!({"issues": []}));
    }

    #[test]
    fn test_issue_key() {
        let found = IssueResult::Found(json!({"key": "A-1"}).as_object().unwrap().clone());
        let anonymous = IssueResult::Found(json!({"id": "9"}).as_object().unwrap().clone());
        assert_eq!(found.issue_key(), Some("A-1"));
        assert_eq!(anonymous.issue_key(), None);
        assert_eq!(IssueResult::failed("B-2").issue_key(), Some("B-2"));
    }
}
