//! Input sanitization and identifier validation.
//!
//! Text that ends up re-broadcast into conversations (line-set entries) is
//! cleaned of markup and script fragments:
//! - Angle brackets
//! - `javascript:` / `data:` URL schemes
//! - Inline `on<event>=` handler attributes
//! - Zero-width and bidi control characters

/// Maximum length (in characters) of a sanitized message.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Result of sanitizing a message.
#[derive(Debug)]
pub struct SanitizeResult {
    /// The cleaned text.
    pub text: String,
    /// Whether anything was stripped or truncated.
    pub was_modified: bool,
    /// Descriptions of what was stripped.
    pub warnings: Vec<String>,
}

/// Sanitize free text before it is persisted or re-broadcast.
pub fn sanitize_message(input: &str) -> SanitizeResult {
    let mut warnings = Vec::new();

    // 1. Angle brackets.
    let mut text: String = input.chars().filter(|c| *c != '<' && *c != '>').collect();
    if text.len() != input.len() {
        warnings.push("removed angle brackets".to_string());
    }

    // 2. Script URL scheme.
    let (stripped, hit) = remove_ascii_ci(&text, "javascript:");
    if hit {
        text = stripped;
        warnings.push("removed javascript: scheme".to_string());
    }

    // 3. Inline event handlers (onclick=, onload=, ...).
    let (stripped, hit) = strip_handler_attrs(&text);
    if hit {
        text = stripped;
        warnings.push("removed inline event handler".to_string());
    }

    // 4. Data URLs.
    let (stripped, hit) = remove_ascii_ci(&text, "data:");
    if hit {
        text = stripped;
        warnings.push("removed data: scheme".to_string());
    }

    // 5. Invisible characters.
    let visible: String = text.chars().filter(|c| !is_invisible(*c)).collect();
    if visible.len() != text.len() {
        text = visible;
        warnings.push("removed invisible characters".to_string());
    }

    let trimmed = text.trim();
    let mut text = if trimmed.chars().count() > MAX_MESSAGE_CHARS {
        warnings.push(format!("truncated to {MAX_MESSAGE_CHARS} characters"));
        trimmed.chars().take(MAX_MESSAGE_CHARS).collect()
    } else {
        trimmed.to_string()
    };
    text.shrink_to_fit();

    SanitizeResult {
        was_modified: !warnings.is_empty(),
        text,
        warnings,
    }
}

/// Platform actor identifiers are numeric strings of 5 to 20 digits.
pub fn is_valid_actor_id(id: &str) -> bool {
    (5..=20).contains(&id.len()) && id.bytes().all(|b| b.is_ascii_digit())
}

/// Command names: `[A-Za-z0-9_]`, at most 50 characters.
pub fn is_valid_command_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 50
        && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Line-set names double as file stems, so only `[A-Za-z0-9_-]` is allowed.
pub fn is_valid_line_set_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 50
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn is_invisible(c: char) -> bool {
    matches!(c, '\u{200B}'..='\u{200F}' | '\u{202A}'..='\u{202E}')
}

/// Remove every case-insensitive occurrence of an ASCII needle.
fn remove_ascii_ci(text: &str, needle: &str) -> (String, bool) {
    let lower = text.to_ascii_lowercase();
    if !lower.contains(needle) {
        return (text.to_string(), false);
    }
    let mut out = String::with_capacity(text.len());
    let mut start = 0;
    // ASCII lowercasing keeps byte offsets aligned with `text`.
    while let Some(pos) = lower[start..].find(needle) {
        out.push_str(&text[start..start + pos]);
        start += pos + needle.len();
    }
    out.push_str(&text[start..]);
    (out, true)
}

/// Strip `on\w+=` sequences.
fn strip_handler_attrs(text: &str) -> (String, bool) {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut removed = false;
    let mut i = 0;

    while i < bytes.len() {
        if i + 1 < bytes.len()
            && bytes[i].eq_ignore_ascii_case(&b'o')
            && bytes[i + 1].eq_ignore_ascii_case(&b'n')
        {
            let mut j = i + 2;
            while j < bytes.len() && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_') {
                j += 1;
            }
            if j > i + 2 && j < bytes.len() && bytes[j] == b'=' {
                i = j + 1;
                removed = true;
                continue;
            }
        }
        match text[i..].chars().next() {
            Some(ch) => {
                out.push(ch);
                i += ch.len_utf8();
            }
            None => break,
        }
    }

    (out, removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_input_passes_through() {
        let result = sanitize_message("tomorrow at the field");
        assert!(!result.was_modified);
        assert_eq!(result.text, "tomorrow at the field");
    }

    #[test]
    fn test_script_fragments_removed() {
        let result = sanitize_message("<img src=x onerror=alert(1)> JavaScript:go()");
        assert!(result.was_modified);
        assert!(!result.text.contains('<'));
        assert!(!result.text.to_lowercase().contains("javascript:"));
        assert!(!result.text.contains("onerror="));
        assert_eq!(result.text, "img src=x alert(1) go()");
    }

    #[test]
    fn test_data_url_removed() {
        let result = sanitize_message("see DATA:text/html;base64,AAAA");
        assert_eq!(result.text, "see text/html;base64,AAAA");
    }

    #[test]
    fn test_invisible_characters_removed() {
        let result = sanitize_message("a\u{200B}b\u{202E}c");
        assert_eq!(result.text, "abc");
        assert!(result.was_modified);
    }

    #[test]
    fn test_non_ascii_text_preserved() {
        let result = sanitize_message("  চোর ধরো 🪓  ");
        assert_eq!(result.text, "চোর ধরো 🪓");
        assert!(!result.was_modified);
    }

    #[test]
    fn test_long_message_truncated() {
        let long = "x".repeat(MAX_MESSAGE_CHARS + 10);
        let result = sanitize_message(&long);
        assert_eq!(result.text.chars().count(), MAX_MESSAGE_CHARS);
        assert!(result.was_modified);
    }

    #[test]
    fn test_actor_id_shape() {
        assert!(is_valid_actor_id("61578706761898"));
        assert!(is_valid_actor_id("12345"));
        assert!(!is_valid_actor_id("1234"));
        assert!(!is_valid_actor_id("123456789012345678901"));
        assert!(!is_valid_actor_id("12a45678"));
        assert!(!is_valid_actor_id(""));
    }

    #[test]
    fn test_command_and_line_set_names() {
        assert!(is_valid_command_name("startfun"));
        assert!(is_valid_command_name("start_fun2"));
        assert!(!is_valid_command_name("start-fun"));
        assert!(!is_valid_command_name(""));
        assert!(is_valid_line_set_name("chor"));
        assert!(is_valid_line_set_name("good-night"));
        assert!(!is_valid_line_set_name("../etc/passwd"));
        assert!(!is_valid_line_set_name(&"a".repeat(51)));
    }
}
