use chrono::NaiveDateTime;
use chrono::format::{Item, StrftimeItems};
use std::fmt::Write as _;

const DEFAULT_DATE_FORMAT: &str = "%Y%m%d";
const DEFAULT_SEQUENCE_WIDTH: usize = 3;

/// Context values a naming template can draw from. Absent values remove
/// their token entirely rather than leaving an empty hole.
#[derive(Debug, Clone, Default)]
pub struct NameContext {
    pub date: Option<NaiveDateTime>,
    pub sequence: Option<u32>,
    pub title: Option<String>,
    pub people: Vec<String>,
    pub album: Option<String>,
    pub original_filename: Option<String>,
    pub location: Option<String>,
}

/// Renders a brace-token template into a final photo name.
///
/// Recognized tokens: `{date}`, `{date:FMT}` (chrono strftime), `{seq}`,
/// `{seq:N}`, `{title}`, `{people}`, `{album}`, `{original}`, `{location}`.
/// Unrecognized tokens are kept literally. After substitution, runs of
/// spaces collapse to one and leading/trailing whitespace plus the
/// separator characters `-`, `_` and space are trimmed, so a template like
/// `"{date} - {title}"` without a date does not render as `" - My Photo"`.
#[must_use]
pub fn render(template: &str, ctx: &NameContext) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            // Unterminated brace, keep the tail as-is.
            out.push_str(&rest[open..]);
            rest = "";
            break;
        };
        let token = &after[..close];
        match expand_token(token, ctx) {
            Some(value) => out.push_str(&value),
            None => {
                out.push('{');
                out.push_str(token);
                out.push('}');
            }
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    cleanup(&out)
}

/// Joins names the way a caption would: `A`, `A and B`, `A, B, and C`.
#[must_use]
pub fn join_people(people: &[String]) -> String {
    match people {
        [] => String::new(),
        [one] => one.clone(),
        [first, second] => format!("{first} and {second}"),
        [head @ .., last] => format!("{}, and {last}", head.join(", ")),
    }
}

/// Renders the template against fixed sample values, for settings previews.
#[must_use]
pub fn preview(template: &str) -> String {
    let sample = NameContext {
        date: chrono::NaiveDate::from_ymd_opt(2025, 11, 12)
            .and_then(|d| d.and_hms_opt(14, 30, 0)),
        sequence: Some(7),
        title: Some("Sunset over the bay".to_string()),
        people: vec!["Alice".to_string(), "Bob".to_string()],
        album: Some("Summer trip".to_string()),
        original_filename: Some("IMG_0001".to_string()),
        location: Some("52.379189, 4.899431".to_string()),
    };
    render(template, &sample)
}

/// Expands one recognized token, `Some("")` when its value is absent.
/// `None` means the token is unknown and should stay literal.
fn expand_token(token: &str, ctx: &NameContext) -> Option<String> {
    let (name, format) = match token.split_once(':') {
        Some((name, format)) => (name, Some(format)),
        None => (token, None),
    };
    match name {
        "date" => Some(ctx.date.map_or_else(String::new, |date| {
            format_date(date, format.unwrap_or(DEFAULT_DATE_FORMAT))
        })),
        "seq" => {
            let width = match format {
                Some(raw) => raw.parse::<usize>().ok()?.max(1),
                None => DEFAULT_SEQUENCE_WIDTH,
            };
            Some(
                ctx.sequence
                    .map_or_else(String::new, |seq| format!("{seq:0width$}")),
            )
        }
        "title" if format.is_none() => Some(ctx.title.clone().unwrap_or_default()),
        "people" if format.is_none() => Some(join_people(&ctx.people)),
        "album" if format.is_none() => Some(ctx.album.clone().unwrap_or_default()),
        "original" if format.is_none() => {
            Some(ctx.original_filename.clone().unwrap_or_default())
        }
        "location" if format.is_none() => Some(ctx.location.clone().unwrap_or_default()),
        _ => None,
    }
}

fn format_date(date: NaiveDateTime, format: &str) -> String {
    let items: Vec<Item<'_>> = StrftimeItems::new(format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        // Bad user format string, fall back rather than fail the render.
        return date.format(DEFAULT_DATE_FORMAT).to_string();
    }
    let mut out = String::new();
    // Specifiers a naive date cannot satisfy (e.g. %z) error at render time.
    if write!(out, "{}", date.format_with_items(items.iter())).is_err() {
        return date.format(DEFAULT_DATE_FORMAT).to_string();
    }
    out
}

fn cleanup(raw: &str) -> String {
    let mut collapsed = String::with_capacity(raw.len());
    let mut last_was_space = false;
    for ch in raw.chars() {
        if ch == ' ' {
            if last_was_space {
                continue;
            }
            last_was_space = true;
        } else {
            last_was_space = false;
        }
        collapsed.push(ch);
    }
    collapsed
        .trim()
        .trim_matches(['-', '_', ' '])
        .to_string()
}
