//! Text utilities shared by triggers and handlers

use thiserror::Error;

/// Errors from text chunking
#[derive(Debug, Error)]
pub enum TextError {
    #[error(
        "cannot split text into chunks of {max_length} bytes with separator {separator:?}: \
         a single unit exceeds the limit"
    )]
    Unsplittable { max_length: usize, separator: String },
}

/// Split `text` into chunks of at most `max_length` bytes, cutting only at
/// `separator` boundaries. The separator at each cut point is consumed, so
/// rejoining the chunks with `separator` reconstructs the input.
///
/// Fails if a separator-delimited unit is itself longer than `max_length` —
/// that is a content defect, not something a smaller cut can fix.
pub fn smart_split(
    text: &str,
    max_length: usize,
    separator: &str,
) -> Result<Vec<String>, TextError> {
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.len() > max_length {
        // Largest char boundary at or below max_length, so a multi-byte
        // glyph is never cut in half.
        let mut boundary = max_length;
        while boundary > 0 && !rest.is_char_boundary(boundary) {
            boundary -= 1;
        }

        let cut = rest[..boundary].rfind(separator).ok_or_else(|| {
            TextError::Unsplittable {
                max_length,
                separator: separator.to_string(),
            }
        })?;

        chunks.push(rest[..cut].to_string());
        rest = &rest[cut + separator.len()..];
    }

    chunks.push(rest.to_string());
    Ok(chunks)
}

/// Render a number of seconds as an exact unit breakdown, from the largest
/// nonzero unit down to seconds: `125` → `"2m 5s"`, `90000` → `"1d 1h 0m 0s"`.
pub fn to_human_readable_time(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let secs = total % 60;

    if days > 0 {
        format!("{}d {}h {}m {}s", days, hours, minutes, secs)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}
