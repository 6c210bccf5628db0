//! Download filename handling shared by the render service (which announces a
//! name through `Content-Disposition`) and the exporter (which reads it back).

const PDF_EXTENSION: &str = ".pdf";

/// Reduce a caller supplied name to a safe `*.pdf` basename.
///
/// Directory components, quotes, separators and control characters are
/// dropped; an empty result falls back to `default`.
pub fn sanitize_pdf_filename(raw: Option<&str>, default: &str) -> String {
    let candidate = raw
        .map(|value| value.rsplit(['/', '\\']).next().unwrap_or(value))
        .unwrap_or_default();

    let cleaned: String = candidate
        .chars()
        .filter(|ch| !ch.is_control() && !matches!(ch, '"' | ';' | ':' | '*' | '?' | '<' | '>' | '|'))
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.').trim();

    let base = if cleaned.is_empty() { default } else { cleaned };
    if base.to_ascii_lowercase().ends_with(PDF_EXTENSION) {
        base.to_string()
    } else {
        format!("{base}{PDF_EXTENSION}")
    }
}

/// Build an `attachment` disposition for `filename`.
///
/// Non-ASCII names keep an ASCII `filename` fallback and carry the exact name
/// in an RFC 5987 `filename*` parameter.
pub fn attachment_disposition(filename: &str) -> String {
    if filename.is_ascii() {
        return format!("attachment; filename=\"{filename}\"");
    }

    let fallback: String = filename
        .chars()
        .map(|ch| if ch.is_ascii() { ch } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        percent_encode(filename)
    )
}

/// Extract the suggested filename from a `Content-Disposition` header value.
pub fn filename_from_disposition(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for param in split_parameters(header).into_iter().skip(1) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();
        match key.as_str() {
            "filename*" => {
                let encoded = value
                    .split_once("''")
                    .map(|(_, rest)| rest)
                    .unwrap_or(value);
                extended = percent_decode(encoded.trim_matches('"'));
            }
            "filename" => {
                let unquoted = unquote(value);
                let unquoted = unquoted.trim();
                if !unquoted.is_empty() {
                    plain = Some(unquoted.to_string());
                }
            }
            _ => {}
        }
    }

    extended.filter(|name| !name.is_empty()).or(plain)
}

/// Name without its `.pdf` extension, matched case-insensitively.
pub fn pdf_stem(filename: &str) -> &str {
    let split = filename.len().saturating_sub(PDF_EXTENSION.len());
    match (filename.get(..split), filename.get(split..)) {
        (Some(stem), Some(extension)) if extension.eq_ignore_ascii_case(PDF_EXTENSION) => stem,
        _ => filename,
    }
}

/// Split header parameters on `;`, ignoring separators inside quoted strings.
fn split_parameters(header: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;

    for (index, ch) in header.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ';' if !quoted => {
                parts.push(&header[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&header[start..]);
    parts
}

fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .map(|rest| rest.strip_suffix('"').unwrap_or(rest))
    else {
        return value.to_string();
    };

    let mut unquoted = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                unquoted.push(next);
            }
        } else {
            unquoted.push(ch);
        }
    }
    unquoted
}

fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

fn percent_decode(value: &str) -> Option<String> {
    let bytes = value.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] == b'%' {
            let hex = value.get(index + 1..index + 3)?;
            decoded.push(u8::from_str_radix(hex, 16).ok()?);
            index += 3;
        } else {
            decoded.push(bytes[index]);
            index += 1;
        }
    }
    String::from_utf8(decoded).ok()
}
