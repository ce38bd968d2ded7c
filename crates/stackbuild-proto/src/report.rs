//! Build completion payload.
//!
//! A finished build is announced on the [`BUILD_CHANNEL`] channel with a
//! base64 string. Decoded, it is a sequence of tagged values:
//!
//! | tag | value                                   |
//! |-----|-----------------------------------------|
//! | `2` | number: 8-byte big-endian `f64`         |
//! | `1` | string: 4-byte big-endian length + UTF-8 |
//!
//! The build report is `[number: build id][string: JSON diagnostics]`.
//! Diagnostics are never sent as a raw JSON string through the host bridge,
//! since some hosts mangle escapes on the way through.

use crate::Diagnostic;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::io;

/// Channel name for build completion messages.
pub const BUILD_CHANNEL: &str = "build";

const TAG_STRING: u8 = 1;
const TAG_NUMBER: u8 = 2;

/// A finished build as seen by whoever requested it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// Id of the build request this answers.
    pub build_id: u32,
    /// Diagnostics in engine order.
    pub diagnostics: Vec<Diagnostic>,
}

/// Encode a build report into its base64 channel payload.
///
/// # Errors
/// Returns an error if the diagnostics cannot be serialized or are larger
/// than `u32::MAX` bytes.
pub fn encode_build_report(report: &BuildReport) -> io::Result<String> {
    let json = serde_json::to_string(&report.diagnostics)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let mut payload = Vec::with_capacity(json.len() + 14);
    push_number(&mut payload, f64::from(report.build_id));
    push_string(&mut payload, &json)?;

    Ok(STANDARD.encode(payload))
}

/// Decode a base64 channel payload back into a build report.
///
/// An empty or `null` diagnostics string decodes to no diagnostics.
///
/// # Errors
/// Returns `InvalidData` for malformed base64, tags, lengths, ids, or JSON.
pub fn decode_build_report(payload: &str) -> io::Result<BuildReport> {
    let bytes = STANDARD.decode(payload).map_err(invalid)?;
    let mut cursor = 0usize;

    let id = read_number(&bytes, &mut cursor)?;
    if !(0.0..=f64::from(u32::MAX)).contains(&id) || id.fract() != 0.0 {
        return Err(invalid(format!("build id out of range: {id}")));
    }
    #[allow(clippy::cast_sign_loss)]
    let build_id = id as u32;

    let json = read_string(&bytes, &mut cursor)?;
    let diagnostics = match json.trim() {
        "" | "null" => Vec::new(),
        text => serde_json::from_str(text).map_err(invalid)?,
    };

    Ok(BuildReport {
        build_id,
        diagnostics,
    })
}

fn push_number(buf: &mut Vec<u8>, value: f64) {
    buf.push(TAG_NUMBER);
    buf.extend_from_slice(&value.to_be_bytes());
}

fn push_string(buf: &mut Vec<u8>, value: &str) -> io::Result<()> {
    let len = u32::try_from(value.len()).map_err(|_| invalid("string too large"))?;
    buf.push(TAG_STRING);
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(value.as_bytes());
    Ok(())
}

fn take<'a>(bytes: &'a [u8], cursor: &mut usize, n: usize) -> io::Result<&'a [u8]> {
    let end = cursor
        .checked_add(n)
        .filter(|&end| end <= bytes.len())
        .ok_or_else(|| invalid("payload truncated"))?;
    let slice = &bytes[*cursor..end];
    *cursor = end;
    Ok(slice)
}

fn expect_tag(bytes: &[u8], cursor: &mut usize, tag: u8) -> io::Result<()> {
    let found = take(bytes, cursor, 1)?[0];
    if found == tag {
        Ok(())
    } else {
        Err(invalid(format!("expected tag {tag}, found {found}")))
    }
}

fn read_number(bytes: &[u8], cursor: &mut usize) -> io::Result<f64> {
    expect_tag(bytes, cursor, TAG_NUMBER)?;
    let raw: [u8; 8] = take(bytes, cursor, 8)?
        .try_into()
        .map_err(|_| invalid("bad number width"))?;
    Ok(f64::from_be_bytes(raw))
}

fn read_string(bytes: &[u8], cursor: &mut usize) -> io::Result<String> {
    expect_tag(bytes, cursor, TAG_STRING)?;
    let raw: [u8; 4] = take(bytes, cursor, 4)?
        .try_into()
        .map_err(|_| invalid("bad length width"))?;
    let len = u32::from_be_bytes(raw) as usize;
    let data = take(bytes, cursor, len)?;
    String::from_utf8(data.to_vec()).map_err(invalid)
}

fn invalid<E>(err: E) -> io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    io::Error::new(io::ErrorKind::InvalidData, err)
}
