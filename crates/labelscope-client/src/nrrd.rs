//! Minimal NRRD decoding for the mask volumes the server returns.
//!
//! Covers what the inference endpoints actually emit: 3-D label volumes,
//! `raw` or `gzip` encoding, 8/16-bit integer elements, attached data.
//! Anything else is a decode error, never a panic.

use std::collections::HashMap;
use std::io::Read;

use flate2::read::GzDecoder;
use labelscope_core::models::MaskBuffer;

use crate::error::{ClientError, Result};

/// A decoded NRRD volume.
#[derive(Debug, Clone, PartialEq)]
pub struct NrrdVolume {
    /// Voxel counts per axis, fastest-varying axis first.
    pub shape: [usize; 3],
    pub spacing: [f64; 3],
    pub origin: [f64; 3],
    pub buffer: MaskBuffer,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ElementType {
    U8,
    U16,
    I16,
}

impl ElementType {
    fn size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 | Self::I16 => 2,
        }
    }
}

pub fn decode(bytes: &[u8]) -> Result<NrrdVolume> {
    let (fields, data) = split_header(bytes)?;

    let dimension: usize = required(&fields, "dimension")?
        .parse()
        .map_err(|_| bad("dimension is not a number"))?;
    if dimension != 3 {
        return Err(bad(&format!("only 3-D volumes supported, got {dimension}-D")));
    }

    let shape = parse_sizes(required(&fields, "sizes")?)?;
    let element = parse_type(required(&fields, "type")?)?;
    let encoding = required(&fields, "encoding")?.to_ascii_lowercase();
    let big_endian = fields
        .get("endian")
        .is_some_and(|e| e.eq_ignore_ascii_case("big"));

    if fields.contains_key("data file") || fields.contains_key("datafile") {
        return Err(bad("detached data files are not supported"));
    }

    let (spacing, origin) = parse_space(&fields)?;

    let raw = match encoding.as_str() {
        "raw" => data.to_vec(),
        "gzip" | "gz" => {
            let mut decoded = Vec::new();
            GzDecoder::new(data)
                .read_to_end(&mut decoded)
                .map_err(|e| bad(&format!("gzip decode failed: {e}")))?;
            decoded
        }
        other => return Err(bad(&format!("unsupported encoding: {other}"))),
    };

    let expected = shape.iter().product::<usize>() * element.size();
    if raw.len() != expected {
        return Err(bad(&format!(
            "data length {} does not match sizes (expected {expected} bytes)",
            raw.len()
        )));
    }

    let buffer = match element {
        ElementType::U8 => MaskBuffer::U8(raw),
        ElementType::U16 => MaskBuffer::U16(
            raw.chunks_exact(2)
                .map(|c| {
                    let pair = [c[0], c[1]];
                    if big_endian {
                        u16::from_be_bytes(pair)
                    } else {
                        u16::from_le_bytes(pair)
                    }
                })
                .collect(),
        ),
        ElementType::I16 => MaskBuffer::I16(
            raw.chunks_exact(2)
                .map(|c| {
                    let pair = [c[0], c[1]];
                    if big_endian {
                        i16::from_be_bytes(pair)
                    } else {
                        i16::from_le_bytes(pair)
                    }
                })
                .collect(),
        ),
    };

    Ok(NrrdVolume {
        shape,
        spacing,
        origin,
        buffer,
    })
}

// ─── Header ───────────────────────────────────────────────────────────────────

/// Header fields and the attached data that follows the blank line.
fn split_header(bytes: &[u8]) -> Result<(HashMap<String, String>, &[u8])> {
    let mut fields = HashMap::new();
    let mut offset = 0usize;
    let mut first = true;

    loop {
        let rest = &bytes[offset..];
        let line_end = rest
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| bad("header has no terminating blank line"))?;
        let line = std::str::from_utf8(&rest[..line_end])
            .map_err(|_| bad("header is not valid UTF-8"))?
            .trim_end_matches('\r');
        offset += line_end + 1;

        if first {
            if !line.starts_with("NRRD") {
                return Err(bad("missing NRRD magic"));
            }
            first = false;
            continue;
        }

        if line.is_empty() {
            return Ok((fields, &bytes[offset..]));
        }
        if line.starts_with('#') {
            continue;
        }
        // "key:=value" pairs carry free-form metadata; ignored
        if line.contains(":=") {
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            fields.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        } else {
            return Err(bad(&format!("malformed header line: {line}")));
        }
    }
}

fn required<'a>(fields: &'a HashMap<String, String>, key: &str) -> Result<&'a str> {
    fields
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| bad(&format!("missing required field: {key}")))
}

fn parse_sizes(value: &str) -> Result<[usize; 3]> {
    let sizes: Vec<usize> = value
        .split_whitespace()
        .map(|s| s.parse().map_err(|_| bad("sizes are not numbers")))
        .collect::<Result<_>>()?;
    let [a, b, c] = sizes[..] else {
        return Err(bad(&format!("expected 3 sizes, got {}", sizes.len())));
    };
    if a == 0 || b == 0 || c == 0 {
        return Err(bad("zero-length axis"));
    }
    Ok([a, b, c])
}

fn parse_type(value: &str) -> Result<ElementType> {
    match value.to_ascii_lowercase().as_str() {
        "uint8" | "uint8_t" | "uchar" | "unsigned char" => Ok(ElementType::U8),
        "uint16" | "uint16_t" | "ushort" | "unsigned short" => Ok(ElementType::U16),
        "int16" | "int16_t" | "short" | "signed short" => Ok(ElementType::I16),
        other => Err(bad(&format!("unsupported element type: {other}"))),
    }
}

/// Spacing and origin from `space directions` / `space origin`, with the
/// plain `spacings` field as a fallback.
fn parse_space(fields: &HashMap<String, String>) -> Result<([f64; 3], [f64; 3])> {
    let mut spacing = [1.0f64; 3];

    if let Some(directions) = fields.get("space directions") {
        let vectors = parse_vectors(directions)?;
        if vectors.len() != 3 {
            return Err(bad("expected 3 space direction vectors"));
        }
        for (k, v) in vectors.iter().enumerate() {
            let norm = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
            if norm == 0.0 {
                return Err(bad("zero-length space direction"));
            }
            spacing[k] = norm;
        }
    } else if let Some(spacings) = fields.get("spacings") {
        let values: Vec<f64> = spacings
            .split_whitespace()
            .map(|s| s.parse().map_err(|_| bad("spacings are not numbers")))
            .collect::<Result<_>>()?;
        if values.len() == 3 {
            spacing = [values[0], values[1], values[2]];
        }
    }

    let mut origin = [0.0f64; 3];
    if let Some(value) = fields.get("space origin") {
        let vectors = parse_vectors(value)?;
        let [v] = vectors[..] else {
            return Err(bad("expected one space origin vector"));
        };
        origin = v;
    }

    Ok((spacing, origin))
}

/// `(a,b,c) (d,e,f) …` vector lists; `none` entries are skipped.
fn parse_vectors(value: &str) -> Result<Vec<[f64; 3]>> {
    let mut vectors = Vec::new();
    for token in value.split_whitespace() {
        if token.eq_ignore_ascii_case("none") {
            continue;
        }
        let inner = token
            .strip_prefix('(')
            .and_then(|t| t.strip_suffix(')'))
            .ok_or_else(|| bad(&format!("malformed vector: {token}")))?;
        let parts: Vec<f64> = inner
            .split(',')
            .map(|s| s.trim().parse().map_err(|_| bad("vector component is not a number")))
            .collect::<Result<_>>()?;
        let [a, b, c] = parts[..] else {
            return Err(bad(&format!("expected 3 components in vector: {token}")));
        };
        vectors.push([a, b, c]);
    }
    Ok(vectors)
}

fn bad(message: &str) -> ClientError {
    ClientError::MaskDecode(message.to_string())
}
