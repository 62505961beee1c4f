use std::borrow::Cow;

const REDACTED: &str = "REDACTED";

const TOKEN_FIELDS: [&str; 2] = ["\"accessToken\"", "\"refreshToken\""];

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let nee = needle.as_bytes();
    if nee.is_empty() {
        return Some(0);
    }
    if nee.len() > hay.len() {
        return None;
    }

    (0..=hay.len() - nee.len()).find(|&i| {
        hay[i..i + nee.len()]
            .iter()
            .zip(nee)
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
    })
}

fn redact_header_value(text: String, header: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text.as_str();
    loop {
        let Some(idx) = find_ascii_case_insensitive(rest, header) else {
            out.push_str(rest);
            break;
        };
        out.push_str(&rest[..idx + header.len()]);
        rest = &rest[idx + header.len()..];

        if let Some(stripped) = rest.strip_prefix(' ') {
            out.push(' ');
            rest = stripped;
        }

        // Token runs to end-of-line or the closing quote of an embedding JSON string.
        let end = rest
            .find(|c: char| c == '\n' || c == '\r' || c == '"')
            .unwrap_or(rest.len());
        out.push_str(REDACTED);
        rest = &rest[end..];
    }
    out
}

/// Replaces the string value of `"accessToken": "..."` style JSON fields.
fn redact_json_field(text: String, field: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text.as_str();
    while let Some(idx) = rest.find(field) {
        out.push_str(&rest[..idx + field.len()]);
        rest = &rest[idx + field.len()..];

        let after_colon = rest.trim_start();
        let Some(after_colon) = after_colon.strip_prefix(':') else {
            continue;
        };
        let value = after_colon.trim_start();
        let Some(value) = value.strip_prefix('"') else {
            continue;
        };

        // Copy the separator as-is, then swap the quoted value.
        let prefix_len = rest.len() - value.len();
        out.push_str(&rest[..prefix_len]);
        let mut end = value.len();
        let mut escaped = false;
        for (i, ch) in value.char_indices() {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                end = i;
                break;
            }
        }
        out.push_str(REDACTED);
        rest = &value[end..];
    }
    out.push_str(rest);
    out
}

/// Strips bearer credentials and token fields from text bound for logs or errors.
pub fn redact_secrets(input: &str) -> Cow<'_, str> {
    let mut value = redact_header_value(input.to_string(), "Bearer");
    for field in TOKEN_FIELDS {
        value = redact_json_field(value, field);
    }

    if value == input {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(value)
    }
}

/// Short, log-safe fingerprint of a token: its length and last four characters.
pub fn token_hint(token: &str) -> String {
    let tail: String = token
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if token.chars().count() <= 8 {
        format!("len={}", token.len())
    } else {
        format!("len={} ...{tail}", token.len())
    }
}
