//! A provider that replays a canned response, optionally after a delay.

use std::time::Duration;

use async_trait::async_trait;

use super::{Advice, ContentSuggester, SuggestionError, SuggestionRequest};

#[derive(Debug, Clone)]
pub struct FixedSuggester {
    response: Result<Advice, SuggestionError>,
    delay: Option<Duration>,
}

impl FixedSuggester {
    pub fn new(advice: Advice) -> Self {
        Self {
            response: Ok(advice),
            delay: None,
        }
    }

    /// A provider that always fails with `error`.
    pub fn failing(error: SuggestionError) -> Self {
        Self {
            response: Err(error),
            delay: None,
        }
    }

    /// Sleep for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl ContentSuggester for FixedSuggester {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn suggest(&self, _request: &SuggestionRequest) -> Result<Advice, SuggestionError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.response.clone()
    }
}
