use crate::{TitleError, TitleGenerator, TitleRequest, TitleResult};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Scriptable titler for pipeline tests. Outcomes are queued per exact image
/// bytes and consumed one per call; when a queue runs dry its last outcome
/// repeats. Images with no script succeed with a default title.
#[derive(Default)]
pub struct MockTitler {
    scripts: Mutex<HashMap<Vec<u8>, VecDeque<Result<String, String>>>>,
    calls: Mutex<HashMap<Vec<u8>, usize>>,
}

impl MockTitler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the outcomes for one image, in call order.
    #[must_use]
    pub fn with_script(
        self,
        image: impl Into<Vec<u8>>,
        outcomes: Vec<Result<String, String>>,
    ) -> Self {
        self.scripts
            .lock()
            .expect("scripts lock")
            .insert(image.into(), outcomes.into());
        self
    }

    /// Convenience: every call for this image fails.
    #[must_use]
    pub fn always_failing(self, image: impl Into<Vec<u8>>) -> Self {
        self.with_script(image, vec![Err("scripted failure".to_string())])
    }

    /// How many title calls were made for this image.
    #[must_use]
    pub fn calls_for(&self, image: &[u8]) -> usize {
        self.calls
            .lock()
            .expect("calls lock")
            .get(image)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl TitleGenerator for MockTitler {
    async fn request_title(&self, request: &TitleRequest) -> TitleResult<String> {
        *self
            .calls
            .lock()
            .expect("calls lock")
            .entry(request.image.clone())
            .or_insert(0) += 1;

        let mut scripts = self.scripts.lock().expect("scripts lock");
        let Some(queue) = scripts.get_mut(&request.image) else {
            return Ok("Untitled photo".to_string());
        };
        let outcome = if queue.len() > 1 {
            queue.pop_front().expect("non-empty queue")
        } else {
            queue.front().cloned().unwrap_or(Ok("Untitled photo".to_string()))
        };
        outcome.map_err(|body| TitleError::Api {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            body,
        })
    }
}
