//! Response-side `multipart/form-data` parsing.
//!
//! The inference endpoint answers with a JSON params part plus one binary
//! mask file part. reqwest only assembles request-side multipart, so the
//! framing is parsed here: boundary from the Content-Type header, CRLF
//! delimiters, per-part Content-Disposition.

use std::collections::HashMap;

use crate::error::{ClientError, Result};

/// Parsed multipart response body.
#[derive(Debug, Default)]
pub struct MultipartBody {
    /// Parts without a filename, decoded as text.
    pub fields: HashMap<String, String>,
    /// Parts carrying a filename, kept as raw bytes.
    pub files: Vec<MultipartFile>,
}

#[derive(Debug)]
pub struct MultipartFile {
    pub name: String,
    pub filename: String,
    pub bytes: Vec<u8>,
}

pub fn is_multipart(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("multipart")
}

/// Boundary parameter of a multipart Content-Type header.
pub fn boundary(content_type: &str) -> Result<String> {
    for param in content_type.split(';').skip(1) {
        let param = param.trim();
        if let Some(value) = param.strip_prefix("boundary=") {
            let value = value.trim_matches('"');
            if !value.is_empty() {
                return Ok(value.to_string());
            }
        }
    }
    Err(ClientError::Multipart(format!(
        "no boundary in content type: {content_type}"
    )))
}

pub fn parse(content_type: &str, body: &[u8]) -> Result<MultipartBody> {
    let boundary = boundary(content_type)?;
    let opening = format!("--{boundary}");
    let delimiter = format!("\r\n--{boundary}");

    if !body.starts_with(opening.as_bytes()) {
        return Err(ClientError::Multipart(
            "body does not start with the boundary".to_string(),
        ));
    }

    let mut out = MultipartBody::default();
    let mut cursor = opening.len();

    loop {
        let rest = &body[cursor..];
        if rest.starts_with(b"--") {
            // closing delimiter
            break;
        }
        if !rest.starts_with(b"\r\n") {
            return Err(ClientError::Multipart(
                "malformed boundary line".to_string(),
            ));
        }
        cursor += 2;

        let end = find(&body[cursor..], delimiter.as_bytes()).ok_or_else(|| {
            ClientError::Multipart("unterminated multipart part".to_string())
        })? + cursor;

        parse_part(&body[cursor..end], &mut out)?;
        cursor = end + delimiter.len();
    }

    Ok(out)
}

fn parse_part(part: &[u8], out: &mut MultipartBody) -> Result<()> {
    let header_end = find(part, b"\r\n\r\n").ok_or_else(|| {
        ClientError::Multipart("part without header/body separator".to_string())
    })?;
    let headers = String::from_utf8_lossy(&part[..header_end]);
    let content = &part[header_end + 4..];

    let disposition = headers
        .lines()
        .find(|line| {
            line.to_ascii_lowercase()
                .starts_with("content-disposition:")
        })
        .ok_or_else(|| ClientError::Multipart("part without content disposition".to_string()))?;

    let name = disposition_param(disposition, "name")
        .ok_or_else(|| ClientError::Multipart("part without a name".to_string()))?;

    match disposition_param(disposition, "filename") {
        Some(filename) => out.files.push(MultipartFile {
            name,
            filename,
            bytes: content.to_vec(),
        }),
        None => {
            out.fields
                .insert(name, String::from_utf8_lossy(content).into_owned());
        }
    }
    Ok(())
}

/// Value of one `key=value` / `key="value"` parameter in a header line.
fn disposition_param(header: &str, key: &str) -> Option<String> {
    for piece in header.split(';').skip(1) {
        let piece = piece.trim();
        if let Some(value) = piece.strip_prefix(key)
            && let Some(value) = value.strip_prefix('=')
        {
            return Some(value.trim_matches('"').to_string());
        }
    }
    None
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARY: &str = "f8a1b2c3";

    fn body_of(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, filename, content) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match filename {
                Some(f) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    #[test]
    fn parses_fields_and_files() {
        let body = body_of(&[
            ("params", None, br#"{"label_names":{"liver":1}}"#),
            ("file", Some("mask.nrrd"), &[0u8, 1, 2, 3, 255]),
        ]);
        let content_type = format!("multipart/form-data; boundary={BOUNDARY}");

        let parsed = parse(&content_type, &body).unwrap();
        assert_eq!(parsed.fields["params"], r#"{"label_names":{"liver":1}}"#);
        assert_eq!(parsed.files.len(), 1);
        assert_eq!(parsed.files[0].filename, "mask.nrrd");
        assert_eq!(parsed.files[0].bytes, vec![0u8, 1, 2, 3, 255]);
    }

    #[test]
    fn quoted_boundary_accepted() {
        let content_type = format!("multipart/form-data; boundary=\"{BOUNDARY}\"");
        assert_eq!(boundary(&content_type).unwrap(), BOUNDARY);
    }

    #[test]
    fn missing_boundary_is_an_error() {
        let err = boundary("multipart/form-data").unwrap_err();
        assert!(matches!(err, ClientError::Multipart(_)));
    }

    #[test]
    fn binary_content_with_crlf_bytes_survives() {
        // file bytes that contain CRLF must not split the part
        let payload = b"ab\r\ncd\r\n\r\nef";
        let body = body_of(&[("file", Some("blob.bin"), payload)]);
        let content_type = format!("multipart/form-data; boundary={BOUNDARY}");

        let parsed = parse(&content_type, &body).unwrap();
        assert_eq!(parsed.files[0].bytes, payload);
    }

    #[test]
    fn unterminated_part_is_an_error() {
        let content_type = format!("multipart/form-data; boundary={BOUNDARY}");
        let truncated = format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"x\"\r\n\r\nvalue");
        let err = parse(&content_type, truncated.as_bytes()).unwrap_err();
        assert!(matches!(err, ClientError::Multipart(_)));
    }
}
