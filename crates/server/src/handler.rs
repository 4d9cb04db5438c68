use tracing::info;

use crate::fetcher::IssueFetcher;
use crate::model::BatchResult;

/// Issue keys as they arrive from a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringOrList {
    /// A single comma-delimited string, e.g. `"AAA-1, AAA-2"`.
    Delimited(String),
    /// Pre-split values; each may still carry commas.
    List(Vec<String>),
}

impl StringOrList {
    /// Split on commas, trim each piece and drop the empty ones.
    pub fn into_keys(self) -> Vec<String> {
        match self {
            StringOrList::Delimited(raw) => split_keys(std::iter::once(raw)),
            StringOrList::List(values) => split_keys(values),
        }
    }
}

impl From<&str> for StringOrList {
    fn from(raw: &str) -> Self {
        StringOrList::Delimited(raw.to_string())
    }
}

impl From<Vec<String>> for StringOrList {
    fn from(values: Vec<String>) -> Self {
        StringOrList::List(values)
    }
}

pub fn split_keys<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .flat_map(|value| {
            value
                .as_ref()
                .split(',')
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Entry point for a batch lookup. Never fails: per-issue problems are
/// reported inside the returned [`BatchResult`].
#[derive(Clone)]
pub struct IssueHandler {
    fetcher: IssueFetcher,
}

impl IssueHandler {
    pub fn new(fetcher: IssueFetcher) -> Self {
        Self { fetcher }
    }

    pub async fn handle(&self, identifiers: impl Into<StringOrList>) -> BatchResult {
        let keys = identifiers.into().into_keys();
        if keys.is_empty() {
            return BatchResult::default();
        }

        let batch = BatchResult::new(self.fetcher.fetch_all(&keys).await);
        info!(
            requested = keys.len(),
            failed = batch.failure_count(),
            "Batch resolved"
        );
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::tests::{FakeSource, Outcome};
    use crate::model::IssueResult;
    use jira_lookup_bulk::BulkExecutor;
    use serde_json::json;
    use std::sync::Arc;

    fn handler(source: Arc<FakeSource>) -> IssueHandler {
        IssueHandler::new(IssueFetcher::new(source, BulkExecutor::new(4)))
    }

    #[test]
    fn test_split_trims_whitespace() {
        let keys = StringOrList::from("AAA-1, AAA-2 ,AAA-3").into_keys();
        assert_eq!(keys, vec!["AAA-1", "AAA-2", "AAA-3"]);
    }

    #[test]
    fn test_split_drops_empty_pieces() {
        let keys = StringOrList::from(" ,A-1,, ,B-2, ").into_keys();
        assert_eq!(keys, vec!["A-1", "B-2"]);
    }

    #[test]
    fn test_split_list_values() {
        let keys = StringOrList::from(vec![
            " A-1 ".to_string(),
            "B-2,C-3".to_string(),
            String::new(),
        ])
        .into_keys();
        assert_eq!(keys, vec!["A-1", "B-2", "C-3"]);
    }

    #[test]
    fn test_split_empty_string() {
        assert!(StringOrList::from("").into_keys().is_empty());
        assert!(StringOrList::from(Vec::new()).into_keys().is_empty());
    }

    #[tokio::test]
    async fn test_handle_fetches_trimmed_keys() {
        let source = Arc::new(FakeSource::default());

        let batch = handler(Arc::clone(&source))
            .handle("AAA-1, AAA-2 ,AAA-3")
            .await;

        assert_eq!(source.calls().len(), 3);
        let mut calls = source.calls();
        calls.sort();
        assert_eq!(calls, vec!["AAA-1", "AAA-2", "AAA-3"]);
        assert_eq!(batch.len(), 3);
    }

    #[tokio::test]
    async fn test_handle_empty_input() {
        let source = Arc::new(FakeSource::default());

        let batch = handler(Arc::clone(&source)).handle("   ").await;

        assert!(batch.is_empty());
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_handle_partial_success() {
        let source = Arc::new(
            FakeSource::default()
                .with("PROJ-1", Outcome::Body(json!({"id": "1", "key": "PROJ-1"})))
                .with("PROJ-2", Outcome::Refused),
        );

        let batch = handler(source).handle("PROJ-1,PROJ-2").await;

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.failure_count(), 1);
        assert_eq!(batch.issues[1], IssueResult::failed("PROJ-2"));
        assert_eq!(
            serde_json::to_value(&batch).unwrap(),
            json!({"issues": [
                {"id": "1", "key": "PROJ-1"},
                {"issueKey": "PROJ-2", "error": "Issue not found or API error"}
            ]})
        );
    }
}
