use crate::{Message, MessageContent, MessagePart, TitleResult, VisionClient};
use async_trait::async_trait;
use common_types::PersonReference;
use tracing::debug;

const TITLE_PROMPT: &str = "You are a photo naming assistant. Write a short, \
factual, descriptive title for the first photo, at most eight words. Mention \
the named people where they are clearly the subject. Do not use quotes, \
dates, file names, or trailing punctuation. Answer with the title only.";

/// Everything the title generator may draw on for one photo.
#[derive(Debug, Clone, Default)]
pub struct TitleRequest {
    /// Display-resolution bytes of the photo to title.
    pub image: Vec<u8>,
    /// People identified on the photo, in face order.
    pub people: Vec<String>,
    /// One reference photo per identified person, for appearance matching.
    pub references: Vec<PersonReference>,
    /// Collection path, often carries an event or year hint.
    pub album_path: Option<String>,
    /// Decimal "lat, lon" from the photo's GPS metadata.
    pub location: Option<String>,
    /// Free-text notes the user typed for this batch.
    pub notes: Option<String>,
}

/// External AI titling capability. May fail transiently; the pipeline owns
/// the retry schedule.
#[async_trait]
pub trait TitleGenerator: Send + Sync {
    async fn request_title(&self, request: &TitleRequest) -> TitleResult<String>;
}

/// Builds the single user message for a title request: instruction text,
/// the target photo, then each reference photo labeled with its name.
#[must_use]
pub fn build_title_message(request: &TitleRequest) -> Message {
    let mut context = String::from(TITLE_PROMPT);
    if !request.people.is_empty() {
        context.push_str("\nPeople on this photo: ");
        context.push_str(&request.people.join(", "));
        context.push('.');
    }
    if let Some(album) = &request.album_path {
        context.push_str(&format!("\nThe photo comes from the album \"{album}\"."));
    }
    if let Some(location) = &request.location {
        context.push_str(&format!("\nIt was taken at coordinates {location}."));
    }
    if let Some(notes) = &request.notes
        && !notes.trim().is_empty()
    {
        context.push_str(&format!("\nExtra context from the user: {}", notes.trim()));
    }

    let mut parts = vec![
        VisionClient::text_part(context),
        VisionClient::image_part(&request.image),
    ];
    for reference in &request.references {
        parts.push(VisionClient::text_part(format!(
            "Reference photo of {}:",
            reference.person_name
        )));
        parts.push(VisionClient::image_part(&reference.image));
    }

    Message {
        role: "user".to_string(),
        content: MessageContent::Parts(parts),
    }
}

/// Reduces a model response to a single clean title line.
#[must_use]
pub fn clean_title(raw: &str) -> String {
    let first_line = raw.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    first_line
        .trim()
        .trim_matches(['"', '\'', '“', '”'])
        .trim_end_matches('.')
        .trim()
        .to_string()
}

#[async_trait]
impl TitleGenerator for VisionClient {
    async fn request_title(&self, request: &TitleRequest) -> TitleResult<String> {
        let message = build_title_message(request);
        let raw = self.call(vec![message]).await?;
        let title = clean_title(&raw);
        debug!("Vision model titled photo as {title:?}");
        Ok(title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_title_takes_first_line_and_strips_quotes() {
        assert_eq!(clean_title("\"Alice at the beach.\"\n\nMore text"), "Alice at the beach");
        assert_eq!(clean_title("  Sunset over dunes "), "Sunset over dunes");
        assert_eq!(clean_title(""), "");
    }

    #[test]
    fn title_message_includes_people_and_references() {
        let request = TitleRequest {
            image: b"target".to_vec(),
            people: vec!["Alice".to_string(), "Bob".to_string()],
            references: vec![PersonReference {
                person_name: "Alice".to_string(),
                image: b"ref".to_vec(),
                source_item_id: "m1".to_string(),
            }],
            album_path: Some("2024/Summer".to_string()),
            location: None,
            notes: Some("taken at the company picnic".to_string()),
        };
        let message = build_title_message(&request);
        let MessageContent::Parts(parts) = message.content else {
            panic!("expected parts");
        };
        // Instruction + target image + one text/image pair per reference.
        assert_eq!(parts.len(), 4);
        let MessagePart::Text { text } = &parts[0] else {
            panic!("expected leading text part");
        };
        assert!(text.contains("Alice, Bob"));
        assert!(text.contains("2024/Summer"));
        assert!(text.contains("company picnic"));
    }
}
