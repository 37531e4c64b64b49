//! Suggested filename extraction from `Content-Disposition`

use crate::assets::DEFAULT_MODEL_FILENAME;

/// Filename from a `Content-Disposition` header value, preferring the
/// extended `filename*` parameter. Falls back to `model.glb`.
pub fn suggested_filename(header: Option<&str>) -> String {
    header
        .and_then(parse_filename)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_MODEL_FILENAME.to_owned())
}

fn parse_filename(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for param in header.split(';').map(str::trim) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => extended = Some(decode_value(value, true)),
            "filename" => plain = Some(decode_value(value, false)),
            _ => {}
        }
    }

    let non_empty = |name: &String| !name.is_empty();
    extended.filter(non_empty).or(plain.filter(non_empty))
}

fn decode_value(raw: &str, extended: bool) -> String {
    let mut value = raw.trim();
    if extended {
        // charset'language'value
        if let Some((_, rest)) = value.split_once('\'') {
            if let Some((_, encoded)) = rest.split_once('\'') {
                value = encoded;
            }
        }
    }
    let value = value.trim_matches('"');
    percent_decode(value)
}

fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex(bytes[i + 1]), hex(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|d| d as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_filename() {
        assert_eq!(
            suggested_filename(Some(r#"attachment; filename="statue.glb""#)),
            "statue.glb"
        );
    }

    #[test]
    fn test_missing_header_defaults() {
        assert_eq!(suggested_filename(None), "model.glb");
        assert_eq!(suggested_filename(Some("attachment")), "model.glb");
        assert_eq!(suggested_filename(Some(r#"attachment; filename="""#)), "model.glb");
    }

    #[test]
    fn test_extended_filename_wins_and_is_decoded() {
        let header = r#"attachment; filename="fallback.glb"; filename*=UTF-8''caf%C3%A9%20bust.glb"#;
        assert_eq!(suggested_filename(Some(header)), "café bust.glb");

        let empty_extended = r#"attachment; filename="statue.glb"; filename*=UTF-8''"#;
        assert_eq!(suggested_filename(Some(empty_extended)), "statue.glb");
    }

    #[test]
    fn test_unquoted_and_bad_escapes() {
        assert_eq!(suggested_filename(Some("inline; filename=a%2.glb")), "a%2.glb");
        assert_eq!(suggested_filename(Some("inline; filename=cube%2Eglb")), "cube.glb");
    }
}
