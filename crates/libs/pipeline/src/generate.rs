use std::time::Duration;
use title_model::{TitleGenerator, TitleRequest};
use tokio::time::sleep;
use tracing::warn;

/// Literal stored as the suggested name when every title attempt failed.
/// Visible and editable in review; the apply stage refuses to commit it.
pub const TITLE_ERROR_MARKER: &str = "[title failed]";

/// Requests a title with a linear backoff schedule: attempt N sleeps
/// `N * 2` seconds before the next try. `None` after the budget is spent.
pub(crate) async fn request_title_with_retry(
    titler: &dyn TitleGenerator,
    request: &TitleRequest,
    attempts: u32,
) -> Option<String> {
    let attempts = attempts.max(1);
    for attempt in 1..=attempts {
        match titler.request_title(request).await {
            Ok(title) => return Some(title),
            Err(error) => {
                warn!("Title request attempt {attempt}/{attempts} failed: {error}");
                if attempt < attempts {
                    sleep(Duration::from_secs(u64::from(attempt) * 2)).await;
                }
            }
        }
    }
    None
}
