use crate::request::ApiResponse;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A file fetched through the authenticated client.
#[derive(Debug, Clone)]
pub struct Download {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub filename: Option<String>,
}

impl Download {
    pub(crate) fn from_response(response: ApiResponse) -> Self {
        let headers = response.headers();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        let filename = headers
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_disposition);
        Self {
            bytes: response.into_bytes(),
            content_type,
            filename,
        }
    }
}

/// Picks the file name out of a `Content-Disposition` value.
///
/// `filename*=UTF-8''...` wins over plain `filename=`. Path separators are
/// stripped so the result is always a bare file name.
pub fn filename_from_disposition(value: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for param in split_params(value).into_iter().map(str::trim) {
        let Some((key, raw)) = param.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let raw = raw.trim();
        match key.as_str() {
            "filename*" => {
                let encoded = match raw.split_once("''") {
                    Some((_charset, rest)) => rest,
                    None => raw,
                };
                extended = urlencoding::decode(encoded.trim_matches('"'))
                    .ok()
                    .map(|s| s.into_owned());
            }
            "filename" => {
                plain = Some(raw.trim_matches('"').replace("\\\"", "\""));
            }
            _ => {}
        }
    }

    extended
        .or(plain)
        .map(|name| sanitize_filename(&name))
        .filter(|name| !name.is_empty())
}

/// Splits on `;` outside quoted strings, so `filename="a;b.pdf"` stays whole.
fn split_params(value: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;
    for (i, ch) in value.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ';' if !quoted => {
                params.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    params.push(&value[start..]);
    params
}

fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    if base == "." || base == ".." {
        String::new()
    } else {
        base.to_string()
    }
}
