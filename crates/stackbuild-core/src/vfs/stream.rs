use super::Transport;
use stackbuild_proto::{codes, read_frame, write_frame, FsRequest, FsResponse};
use std::io::{self, Read, Write};
use std::sync::{Mutex, PoisonError};

/// Transport that proxies requests over a byte stream.
///
/// Each call writes one framed [`FsRequest`] and blocks for the framed
/// [`FsResponse`]. Calls are serialized; the other end answers in order.
pub struct StreamTransport<R, W> {
    io: Mutex<(R, W)>,
}

impl<R, W> std::fmt::Debug for StreamTransport<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamTransport").finish_non_exhaustive()
    }
}

impl<R: Read, W: Write> StreamTransport<R, W> {
    #[must_use]
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            io: Mutex::new((reader, writer)),
        }
    }

    fn round_trip(&self, request: &FsRequest) -> io::Result<FsResponse> {
        let mut guard = self.io.lock().unwrap_or_else(PoisonError::into_inner);
        let (reader, writer) = &mut *guard;
        write_frame(writer, request)?;
        read_frame(reader)
    }
}

impl<R, W> Transport for StreamTransport<R, W>
where
    R: Read + Send,
    W: Write + Send,
{
    fn call(&self, request: FsRequest) -> FsResponse {
        match self.round_trip(&request) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(path = request.path(), error = %e, "sandbox stream failed");
                FsResponse::error(codes::FS_IO_ERROR, e.to_string())
            }
        }
    }
}

/// Answer framed requests from `reader` with `handler` until the stream ends.
///
/// This is the host side of a [`StreamTransport`].
///
/// # Errors
/// Returns an error if a frame cannot be decoded or a response cannot be
/// written. A clean end of stream is not an error.
pub fn serve_requests<R, W, T>(mut reader: R, mut writer: W, handler: &T) -> io::Result<()>
where
    R: Read,
    W: Write,
    T: Transport + ?Sized,
{
    loop {
        let request: FsRequest = match read_frame(&mut reader) {
            Ok(request) => request,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e),
        };
        tracing::trace!(path = request.path(), "serving sandbox request");
        write_frame(&mut writer, &handler.call(request))?;
    }
}
