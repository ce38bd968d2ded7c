#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Wire types for stackbuild.
//!
//! This crate defines what crosses process or sandbox boundaries:
//! - filesystem calls proxied from a sandboxed build to its host
//! - build diagnostics
//! - the build completion report delivered on the `build` channel
//!
//! ## Wire format
//! Filesystem calls use length-prefixed JSON:
//! - 4-byte little-endian u32 length prefix
//! - JSON payload bytes

mod diagnostic;
pub mod report;

pub use diagnostic::{Diagnostic, Location, Severity};
pub use report::{decode_build_report, encode_build_report, BuildReport, BUILD_CHANNEL};

use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};

/// Error codes carried by [`FsResponse::Error`].
pub mod codes {
    pub const FS_NOT_FOUND: &str = "FS_NOT_FOUND";
    pub const FS_IO_ERROR: &str = "FS_IO_ERROR";
    pub const FS_INVALID_REQUEST: &str = "FS_INVALID_REQUEST";
}

/// A directory listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Name relative to the listed directory, `/`-separated when recursive.
    pub name: String,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

impl DirEntry {
    #[must_use]
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
        }
    }

    #[must_use]
    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
        }
    }
}

/// A filesystem call forwarded across the sandbox boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FsRequest {
    Exists {
        path: String,
    },
    ReadFile {
        path: String,
    },
    ReadDir {
        path: String,
        recursive: bool,
    },
    WriteFile {
        path: String,
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
    },
    Mkdir {
        path: String,
    },
    Rename {
        from: String,
        to: String,
    },
    Unlink {
        path: String,
    },
}

impl FsRequest {
    /// The primary path this request targets.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Exists { path }
            | Self::ReadFile { path }
            | Self::ReadDir { path, .. }
            | Self::WriteFile { path, .. }
            | Self::Mkdir { path }
            | Self::Unlink { path } => path,
            Self::Rename { from, .. } => from,
        }
    }
}

/// The host's answer to an [`FsRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FsResponse {
    /// Answer to `exists`.
    Exists { exists: bool, is_file: bool },
    /// File contents.
    Data {
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
    },
    /// Directory listing.
    Entries { entries: Vec<DirEntry> },
    /// A mutating call completed.
    Done,
    /// The call failed.
    Error {
        /// Stable error code (see [`codes`]).
        code: String,
        /// Human-readable message.
        message: String,
    },
}

impl FsResponse {
    #[must_use]
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}

/// Encode a frame to bytes (with length prefix).
///
/// # Errors
/// Returns an error if serialization fails or the frame exceeds `u32::MAX` bytes.
pub fn encode_frame<T: Serialize>(frame: &T) -> io::Result<Vec<u8>> {
    let json =
        serde_json::to_vec(frame).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let len = u32::try_from(json.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "frame too large"))?;

    let mut buf = Vec::with_capacity(4 + json.len());
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(&json);

    Ok(buf)
}

/// Decode a frame from bytes (without length prefix).
///
/// # Errors
/// Returns an error if deserialization fails.
pub fn decode_frame<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> io::Result<T> {
    serde_json::from_slice(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Write a length-prefixed frame to a writer.
///
/// # Errors
/// Returns an error if encoding or writing fails.
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, frame: &T) -> io::Result<()> {
    let encoded = encode_frame(frame)?;
    writer.write_all(&encoded)?;
    writer.flush()
}

/// Maximum frame size (64 MiB); file contents travel inside frames.
const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Read a length-prefixed frame from a reader.
///
/// # Errors
/// Returns an error if reading or decoding fails, or the frame is oversized.
pub fn read_frame<R: Read, T: for<'de> Deserialize<'de>>(reader: &mut R) -> io::Result<T> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf) as usize;

    if len > MAX_FRAME_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame too large: {len} bytes"),
        ));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;

    decode_frame(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_request_is_tagged_snake_case() {
        let req = FsRequest::ReadDir {
            path: "/proj".into(),
            recursive: false,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["type"], "read_dir");
        assert_eq!(json["path"], "/proj");
        assert_eq!(json["recursive"], false);
    }

    #[test]
    fn test_write_file_data_is_base64() {
        let req = FsRequest::WriteFile {
            path: "/a".into(),
            data: b"hi".to_vec(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["data"], "aGk=");
    }

    #[test]
    fn test_frames_over_a_stream() {
        let mut buf = Vec::new();
        write_frame(&mut buf, &FsRequest::Exists { path: "/x".into() }).unwrap();
        write_frame(&mut buf, &FsRequest::Unlink { path: "/y".into() }).unwrap();

        let mut cursor = Cursor::new(buf);
        let first: FsRequest = read_frame(&mut cursor).unwrap();
        let second: FsRequest = read_frame(&mut cursor).unwrap();
        assert_eq!(first.path(), "/x");
        assert_eq!(second, FsRequest::Unlink { path: "/y".into() });
    }

    #[test]
    fn test_read_frame_rejects_oversized() {
        let mut bytes = u32::MAX.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"{}");
        let result: io::Result<FsResponse> = read_frame(&mut Cursor::new(bytes));
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_error_response_shape() {
        let resp = FsResponse::error(codes::FS_NOT_FOUND, "missing /a");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["code"], "FS_NOT_FOUND");
    }
}
