//! Common utilities and helper functions

pub mod error;

/// Truncate text to a maximum length
///
/// Used to keep log lines bounded when echoing untrusted payloads.
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }

    let mut end = max_len.saturating_sub(3);
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

/// Format a duration the way operators write it on the command line
pub fn format_duration(duration: std::time::Duration) -> String {
    humantime::format_duration(duration).to_string()
}
