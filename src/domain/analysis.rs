//! Content analysis collaborator

use async_trait::async_trait;

use crate::domain::error::DomainError;

#[cfg(test)]
use mockall::automock;

/// External analyzer for topic extraction and summarization
///
/// Failures are tolerated by callers: a failed topic extraction yields no
/// topics and a failed summary yields none.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContentAnalyzer: Send + Sync {
    /// Returns at most `max_topics` topics, most relevant first
    async fn extract_topics(
        &self,
        content: &str,
        max_topics: usize,
    ) -> Result<Vec<String>, DomainError>;

    /// Returns a short summary, or `None` when the content has none worth giving
    async fn summarize(&self, content: &str) -> Result<Option<String>, DomainError>;
}
