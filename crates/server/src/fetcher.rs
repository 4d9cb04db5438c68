use std::sync::Arc;

use jira_lookup_api::IssueSource;
use jira_lookup_bulk::BulkExecutor;
use tracing::{debug, warn};

use crate::model::IssueResult;

/// Resolves a batch of issue keys against an [`IssueSource`].
///
/// Each key produces exactly one [`IssueResult`], in input order. Any
/// failure for a key (transport error, timeout, non-2xx status, body that is
/// not a JSON object) becomes an error entry for that key only.
#[derive(Clone)]
pub struct IssueFetcher {
    source: Arc<dyn IssueSource>,
    executor: BulkExecutor,
}

impl IssueFetcher {
    pub fn new(source: Arc<dyn IssueSource>, executor: BulkExecutor) -> Self {
        Self { source, executor }
    }

    pub async fn fetch_all(&self, issue_keys: &[String]) -> Vec<IssueResult> {
        self.executor
            .execute_ordered(issue_keys.to_vec(), |issue_key| async move {
                self.fetch_one(&issue_key).await
            })
            .await
    }

    pub async fn fetch_one(&self, issue_key: &str) -> IssueResult {
        match self.source.fetch_issue(issue_key).await {
            Ok(body) => {
                debug!(issue_key, "Issue resolved");
                IssueResult::Found(body)
            }
            Err(err) => {
                warn!(
                    issue_key,
                    error = %err,
                    status = err.status(),
                    transport = err.is_transport(),
                    hint = err.suggestion().unwrap_or_default(),
                    "Issue lookup failed"
                );
                IssueResult::failed(issue_key)
            }
        }
    }
}
