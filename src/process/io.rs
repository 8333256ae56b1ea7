//! I/O primitives for communicating with the exiftool subprocess.

use std::io;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::protocol::CommandBlock;
use crate::{Error, Result};

/// Write half of a session: the process stdin.
pub type InputStream = Box<dyn AsyncWrite + Send + Unpin>;

/// Read half of a session: stdout and stderr merged.
pub type OutputStream = Box<dyn AsyncRead + Send + Unpin>;

/// Writes command blocks to the process stdin.
pub struct ProcessWriter {
    stdin: InputStream,
}

impl ProcessWriter {
    pub fn new(stdin: InputStream) -> Self {
        Self { stdin }
    }

    /// Write one block and its `-execute` line, then flush.
    ///
    /// ExifTool starts working only once the execute line arrives, so the
    /// block must not sit in a buffer.
    pub async fn write_block(&mut self, block: &CommandBlock) -> Result<()> {
        self.stdin
            .write_all(&block.encode())
            .await
            .map_err(Error::io)?;
        self.stdin.flush().await.map_err(Error::io)
    }

    /// Close stdin, signalling end of input.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.stdin.shutdown().await.map_err(Error::io)
    }
}

/// Create the pipe both stdout and stderr of the child write into.
///
/// Sharing one pipe keeps diagnostics in the same order as data, which the
/// sentinel framing depends on.
pub(crate) fn merged_pipe() -> io::Result<(io::PipeReader, io::PipeWriter)> {
    io::pipe()
}

/// Register the read end of the merged pipe with the tokio runtime.
///
/// Must be called from within a runtime.
#[cfg(unix)]
pub(crate) fn async_output(reader: io::PipeReader) -> io::Result<OutputStream> {
    use std::os::fd::OwnedFd;
    use tokio::net::unix::pipe::Receiver;

    let receiver = Receiver::from_owned_fd(OwnedFd::from(reader))?;
    Ok(Box::new(receiver))
}

/// Register the read end of the merged pipe with the tokio runtime.
///
/// Reads go through the blocking pool on this platform.
#[cfg(windows)]
pub(crate) fn async_output(reader: io::PipeReader) -> io::Result<OutputStream> {
    use std::os::windows::io::OwnedHandle;

    let file = std::fs::File::from(OwnedHandle::from(reader));
    Ok(Box::new(tokio::fs::File::from_std(file)))
}
