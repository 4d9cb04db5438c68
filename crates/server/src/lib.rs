//! Batch issue lookup: key parsing, per-issue fetching with error isolation,
//! and the `GET /jira/search` HTTP surface.

pub mod fetcher;
pub mod handler;
pub mod model;
pub mod routes;
pub mod server;

pub use fetcher::IssueFetcher;
pub use handler::{IssueHandler, StringOrList};
pub use model::{BatchResult, IssueFailure, IssueResult, ISSUE_ERROR_MESSAGE};
pub use server::{Acceptor, Server, ACCEPT_ERROR_BACKOFF};
