use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::ai::AiHandler;
use crate::error::BotError;

/// A recorded AI call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedAiCall {
    pub system: String,
    pub user: String,
}

/// Mock AI handler that returns pre-configured results in order.
///
/// `Err` entries surface as `BotError::AiHandler`, modeling a failed or
/// timed-out provider call. Records every call for assertions.
pub struct MockAiHandler {
    results: Mutex<VecDeque<Result<String, String>>>,
    recorded_calls: Mutex<Vec<RecordedAiCall>>,
}

impl MockAiHandler {
    /// Create a mock that returns the same response for every call.
    pub fn new(response: impl Into<String>) -> Self {
        let mut q = VecDeque::new();
        q.push_back(Ok(response.into()));
        Self {
            results: Mutex::new(q),
            recorded_calls: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that returns results in order (one per call).
    pub fn with_results(results: Vec<Result<String, String>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            recorded_calls: Mutex::new(Vec::new()),
        }
    }

    /// Get all recorded AI calls for test assertions.
    pub fn get_recorded_calls(&self) -> Vec<RecordedAiCall> {
        self.recorded_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AiHandler for MockAiHandler {
    async fn complete(&self, system: &str, user: &str) -> Result<String, BotError> {
        self.recorded_calls.lock().unwrap().push(RecordedAiCall {
            system: system.to_string(),
            user: user.to_string(),
        });

        let mut results = self.results.lock().unwrap();
        // If only one result left, clone it (reusable); otherwise pop front.
        let result = if results.len() == 1 {
            results.front().cloned().unwrap()
        } else {
            results
                .pop_front()
                .ok_or_else(|| BotError::AiHandler("no more mock responses".into()))?
        };

        result.map_err(BotError::AiHandler)
    }
}
