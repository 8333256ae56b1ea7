//! Long-lived exiftool sessions.
//!
//! This module provides [`Session`], which owns one exiftool process and
//! drives it over the `-stay_open` protocol.
//!
//! # Example
//!
//! ```ignore
//! use libexiftool::{Session, SessionConfig, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = SessionConfig::builder()
//!         .custom_fields("custom", ["OriginalFilename"])
//!         .build()?;
//!     let session = Session::start(config).await?;
//!
//!     let results = session
//!         .set_field("OriginalFilename", "archive_001", &["photo.jpg"])
//!         .await?;
//!     for result in &results {
//!         match &result.error {
//!             None => println!("{}: {:?}", result.file.display(), result.fields["OriginalFilename"]),
//!             Some(e) => eprintln!("{}: {e}", result.file.display()),
//!         }
//!     }
//!
//!     session.close().await
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::config::{FieldName, GeneratedConfig, Namespace, SessionConfig};
use crate::process::{ExifToolProcess, InputStream, OutputStream, ProcessWriter};
use crate::protocol::{check_value, decode_fields, path_arg, CommandBlock, FileMetadata, FrameReader};
use crate::{Error, Result};

/// A running exiftool process plus its protocol state.
///
/// # Thread Safety
///
/// `Session` is `Send + Sync` and can be shared across tasks. Responses carry
/// no request id, so every batch call holds the session exclusively until
/// all of its files are done; concurrent calls are served one after another,
/// in arrival order.
///
/// # Failure
///
/// When the process dies, its output desynchronizes or a response times out,
/// the session is marked broken: the affected file records the error and
/// every later command fails with [`Error::ProcessTerminated`]. Close the
/// session and start a new one.
pub struct Session {
    config: SessionConfig,
    pid: Option<u32>,
    channel: Mutex<Option<Channel>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Start exiftool and wrap it in a session.
    ///
    /// If the config declares custom fields, an exiftool config file is
    /// generated first and kept until the session is closed.
    ///
    /// # Errors
    ///
    /// [`Error::BinaryNotFound`] or [`Error::ProcessSpawn`] if exiftool cannot
    /// be launched, [`Error::ConfigWrite`] if the config file cannot be
    /// written. Nothing is retried.
    pub async fn start(config: SessionConfig) -> Result<Self> {
        let generated = config
            .field_set()
            .map(|set| GeneratedConfig::write_in(set, config.config_dir()))
            .transpose()?;

        // On failure `generated` is dropped here, removing the file.
        let mut process =
            ExifToolProcess::spawn(&config, generated.as_ref().map(GeneratedConfig::path)).await?;

        let stdin = process.take_stdin().expect("stdin is taken once");
        let output = process.take_output().expect("output is taken once");
        let pid = process.pid();

        tracing::debug!(?pid, "exiftool session started");

        Ok(Self {
            pid,
            channel: Mutex::new(Some(Channel::new(
                &config,
                stdin,
                output,
                Some(process),
                generated,
            ))),
            config,
        })
    }

    /// Drive the protocol over arbitrary byte streams instead of a child
    /// process.
    ///
    /// `input` receives the argument lines, `output` must yield what exiftool
    /// would print on its merged stdout/stderr.
    pub fn from_channels(config: SessionConfig, input: InputStream, output: OutputStream) -> Self {
        Self {
            pid: None,
            channel: Mutex::new(Some(Channel::new(&config, input, output, None, None))),
            config,
        }
    }

    /// The configuration this session was started with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Process ID of exiftool, if the session owns a child process.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Returns true once [`close`](Self::close) has run.
    pub async fn is_closed(&self) -> bool {
        self.channel.lock().await.is_none()
    }

    /// Extract metadata from each file.
    ///
    /// Returns one result per file, in input order. Per-file failures are
    /// recorded in the result and do not stop the batch.
    pub async fn extract_metadata<P: AsRef<Path>>(&self, files: &[P]) -> Result<Vec<FileMetadata>> {
        let mut guard = self.channel.lock().await;
        let channel = guard.as_mut().ok_or(Error::SessionClosed)?;

        let mut results = Vec::with_capacity(files.len());
        for file in files {
            let file = file.as_ref();
            let result = match prepare_file(file).await {
                Ok(arg) => channel.extract(&self.config, file, &arg).await,
                Err(e) => FileMetadata::failure(file.to_path_buf(), e),
            };
            results.push(result);
        }
        Ok(results)
    }

    /// Write one of the session's declared custom fields on each file.
    ///
    /// Each file is written and then read back, so the returned fields show
    /// what exiftool actually stored.
    ///
    /// # Errors
    ///
    /// Fails before touching the process with [`Error::InvalidIdentifier`] for
    /// a malformed field name, [`Error::FieldNotConfigured`] for a field
    /// outside the configured set and [`Error::InvalidValue`] for a value
    /// containing a line break.
    pub async fn set_field<P: AsRef<Path>>(
        &self,
        field: &str,
        value: &str,
        files: &[P],
    ) -> Result<Vec<FileMetadata>> {
        let field = FieldName::new(field)?;
        let set = self
            .config
            .field_set()
            .filter(|set| set.contains(field.as_str()))
            .ok_or_else(|| Error::FieldNotConfigured {
                field: field.to_string(),
            })?;
        check_value(value)?;

        self.write_batch(set.namespace(), &field, value, files).await
    }

    /// Write a namespaced custom field on each file.
    ///
    /// The namespace must be the one the session was configured with; use
    /// [`set_metadata`](crate::set_metadata) for a one-off write under any
    /// namespace.
    pub async fn set_metadata<P: AsRef<Path>>(
        &self,
        namespace: &str,
        field: &str,
        value: &str,
        files: &[P],
    ) -> Result<Vec<FileMetadata>> {
        let namespace = Namespace::new(namespace)?;
        let field = FieldName::new(field)?;
        let configured = self
            .config
            .field_set()
            .is_some_and(|set| set.namespace() == &namespace && set.contains(field.as_str()));
        if !configured {
            return Err(Error::FieldNotConfigured {
                field: format!("{namespace}:{field}"),
            });
        }
        check_value(value)?;

        self.write_batch(&namespace, &field, value, files).await
    }

    async fn write_batch<P: AsRef<Path>>(
        &self,
        namespace: &Namespace,
        field: &FieldName,
        value: &str,
        files: &[P],
    ) -> Result<Vec<FileMetadata>> {
        let mut guard = self.channel.lock().await;
        let channel = guard.as_mut().ok_or(Error::SessionClosed)?;

        let mut results = Vec::with_capacity(files.len());
        for file in files {
            let file = file.as_ref();
            let arg = match prepare_file(file).await {
                Ok(arg) => arg,
                Err(e) => {
                    results.push(FileMetadata::failure(file.to_path_buf(), e));
                    continue;
                }
            };

            let block = CommandBlock::set(namespace, field, value, &arg);
            let result = match channel.run_one(&block).await {
                Ok(frame) => {
                    tracing::trace!(
                        file = %file.display(),
                        output = %String::from_utf8_lossy(&frame).trim(),
                        "write finished"
                    );
                    channel.extract(&self.config, file, &arg).await
                }
                Err(e) => FileMetadata::failure(file.to_path_buf(), e),
            };
            results.push(result);
        }
        Ok(results)
    }

    /// Stop exiftool and release the session's resources.
    ///
    /// Asks the process to exit, waits for it, then removes the generated
    /// config file. Calling `close` again is a no-op.
    pub async fn close(&self) -> Result<()> {
        let channel = self.channel.lock().await.take();
        match channel {
            Some(channel) => channel.shutdown().await,
            None => Ok(()),
        }
    }
}

/// Check that a file exists and turn it into its argument line.
async fn prepare_file(file: &Path) -> Result<String> {
    match tokio::fs::metadata(file).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::FileNotFound {
                path: file.to_path_buf(),
            })
        }
        Err(e) => {
            return Err(Error::FileAccess {
                path: file.to_path_buf(),
                source: e,
            })
        }
    }
    path_arg(file)
}

/// Protocol state: stdin writer, output framer and the owned process.
///
/// Only reachable through the session mutex.
struct Channel {
    writer: ProcessWriter,
    frames: FrameReader<OutputStream>,
    timeout: Option<Duration>,
    // Set while a command awaits its frame; still set on entry means the
    // previous caller was cancelled and its frame is unaccounted for.
    in_flight: bool,
    broken: bool,
    process: Option<ExifToolProcess>,
    // Dropped after `process`; exiftool may read it lazily.
    generated: Option<GeneratedConfig>,
}

impl Channel {
    fn new(
        config: &SessionConfig,
        input: InputStream,
        output: OutputStream,
        process: Option<ExifToolProcess>,
        generated: Option<GeneratedConfig>,
    ) -> Self {
        Self {
            writer: ProcessWriter::new(input),
            frames: FrameReader::new(output, config.buffer_size()),
            timeout: config.timeout(),
            in_flight: false,
            broken: false,
            process,
            generated,
        }
    }

    /// Send one command block and wait for its frame.
    async fn run_one(&mut self, block: &CommandBlock) -> Result<Vec<u8>> {
        if self.in_flight {
            tracing::warn!("previous command was cancelled before its response arrived");
            self.in_flight = false;
            self.mark_broken(&Error::ProcessTerminated);
        }
        if self.broken {
            return Err(Error::ProcessTerminated);
        }

        tracing::trace!(lines = ?block.lines(), "sending command");
        self.in_flight = true;
        if let Err(e) = self.writer.write_block(block).await {
            self.in_flight = false;
            self.mark_broken(&e);
            return Err(match e {
                Error::Io(io) if io.kind() == std::io::ErrorKind::BrokenPipe => {
                    Error::ProcessTerminated
                }
                other => other,
            });
        }

        let next = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.frames.next_frame()).await {
                Ok(next) => next,
                Err(_) => Err(Error::Timeout(limit)),
            },
            None => self.frames.next_frame().await,
        };
        self.in_flight = false;

        match next {
            Ok(Some(frame)) => {
                tracing::trace!(bytes = frame.len(), "received frame");
                Ok(frame)
            }
            Ok(None) => {
                let err = Error::EmptyResponse;
                self.mark_broken(&err);
                Err(err)
            }
            Err(e) => {
                self.mark_broken(&e);
                Err(e)
            }
        }
    }

    /// Extract one prepared file and decode its fields.
    async fn extract(&mut self, config: &SessionConfig, file: &Path, arg: &str) -> FileMetadata {
        let block = CommandBlock::extract(config.extract_args(), arg);
        let decoded = match self.run_one(&block).await {
            Ok(frame) => decode_fields(&frame),
            Err(e) => Err(e),
        };
        match decoded {
            Ok(fields) => FileMetadata::success(file.to_path_buf(), fields),
            Err(e) => FileMetadata::failure(file.to_path_buf(), e),
        }
    }

    fn mark_broken(&mut self, cause: &Error) {
        tracing::warn!(error = %cause, "exiftool session is no longer usable");
        self.broken = true;
        if let Some(process) = self.process.as_mut() {
            let _ = process.start_kill();
        }
    }

    async fn shutdown(mut self) -> Result<()> {
        if !self.broken && !self.in_flight {
            if let Err(e) = self.writer.write_block(&CommandBlock::close()).await {
                tracing::debug!(error = %e, "failed to send stay_open False");
            }
        }
        if let Err(e) = self.writer.shutdown().await {
            tracing::debug!(error = %e, "failed to close exiftool stdin");
        }

        let mut result = Ok(());
        if let Some(mut process) = self.process.take() {
            let waited = match self.timeout {
                Some(limit) => match tokio::time::timeout(limit, process.wait()).await {
                    Ok(waited) => waited.map(|_| ()),
                    Err(_) => {
                        tracing::warn!("exiftool did not exit in time, killing it");
                        process.kill().await
                    }
                },
                None => process.wait().await.map(|_| ()),
            };
            if let Err(e) = waited {
                tracing::warn!(error = %e, "failed to wait for exiftool");
                result = Err(e);
            }
        }

        if let Some(generated) = self.generated.take() {
            tracing::trace!(path = %generated.path().display(), "removing exiftool config");
        }

        tracing::debug!("exiftool session closed");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    #[test]
    fn session_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Session>();
    }

    fn fields_config() -> SessionConfig {
        SessionConfig::builder()
            .custom_fields("custom", ["OriginalFilename"])
            .build()
            .unwrap()
    }

    /// A session whose peer never answers; any process contact would hang.
    fn silent_session(config: SessionConfig) -> Session {
        let (input, _) = tokio::io::duplex(64);
        let (_, output) = tokio::io::duplex(64);
        Session::from_channels(config, Box::new(input), Box::new(output))
    }

    #[tokio::test]
    async fn undeclared_field_rejected_before_io() {
        let session = silent_session(fields_config());
        let err = session
            .set_field("Make", "Canon", &["photo.jpg"])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::FieldNotConfigured { field } if field == "Make"));
    }

    #[tokio::test]
    async fn bound_write_without_field_set_rejected() {
        let session = silent_session(SessionConfig::builder().build().unwrap());
        let err = session
            .set_field("Title", "x", &["photo.jpg"])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::FieldNotConfigured { .. }));
    }

    #[tokio::test]
    async fn identifiers_validated_before_io() {
        let session = silent_session(fields_config());
        let err = session
            .set_field("original", "x", &["photo.jpg"])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidIdentifier { .. }));

        let err = session
            .set_metadata("A-123", "OriginalFilename", "x", &["photo.jpg"])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidIdentifier { .. }));

        let err = session
            .set_metadata("other", "OriginalFilename", "x", &["photo.jpg"])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::FieldNotConfigured { .. }));
    }

    #[tokio::test]
    async fn multiline_value_rejected() {
        let session = silent_session(fields_config());
        let err = session
            .set_field("OriginalFilename", "a\n-execute", &["photo.jpg"])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidValue(_)));
    }

    #[tokio::test]
    async fn run_one_writes_block_and_reads_frame() {
        let (input, peer_in) = tokio::io::duplex(1024);
        let (mut peer_out, output) = tokio::io::duplex(1024);
        let config = SessionConfig::builder().build().unwrap();
        let mut channel = Channel::new(&config, Box::new(input), Box::new(output), None, None);

        let peer = tokio::spawn(async move {
            let mut lines = BufReader::new(peer_in).lines();
            let mut seen = Vec::new();
            while let Some(line) = lines.next_line().await.unwrap() {
                let done = line == "-execute";
                seen.push(line);
                if done {
                    break;
                }
            }
            peer_out.write_all(b"pong\n{ready}\n").await.unwrap();
            seen
        });

        let frame = channel
            .run_one(&CommandBlock::new(vec!["-ver".to_string()]))
            .await
            .unwrap();
        assert_eq!(frame, b"pong\n");
        assert_eq!(peer.await.unwrap(), ["-ver", "-execute"]);
    }

    #[tokio::test]
    async fn eof_marks_channel_broken() {
        let (input, _peer_in) = tokio::io::duplex(1024);
        let (peer_out, output) = tokio::io::duplex(1024);
        drop(peer_out);
        let config = SessionConfig::builder().build().unwrap();
        let mut channel = Channel::new(&config, Box::new(input), Box::new(output), None, None);

        let block = CommandBlock::new(vec!["-ver".to_string()]);
        assert!(matches!(
            channel.run_one(&block).await,
            Err(Error::EmptyResponse)
        ));
        assert!(matches!(
            channel.run_one(&block).await,
            Err(Error::ProcessTerminated)
        ));
    }

    #[tokio::test]
    async fn timeout_marks_channel_broken() {
        let (input, _peer_in) = tokio::io::duplex(1024);
        let (_peer_out, output) = tokio::io::duplex(1024);
        let config = SessionConfig::builder()
            .timeout(Duration::from_millis(20))
            .build()
            .unwrap();
        let mut channel = Channel::new(&config, Box::new(input), Box::new(output), None, None);

        let block = CommandBlock::new(vec!["-ver".to_string()]);
        assert!(matches!(
            channel.run_one(&block).await,
            Err(Error::Timeout(_))
        ));
        assert!(channel.broken);
    }

    #[tokio::test]
    async fn cancelled_command_breaks_channel() {
        let (input, _peer_in) = tokio::io::duplex(1024);
        let (mut peer_out, output) = tokio::io::duplex(1024);
        let config = SessionConfig::builder().build().unwrap();
        let mut channel = Channel::new(&config, Box::new(input), Box::new(output), None, None);

        let block = CommandBlock::new(vec!["-ver".to_string()]);
        let cancelled =
            tokio::time::timeout(Duration::from_millis(20), channel.run_one(&block)).await;
        assert!(cancelled.is_err());
        assert!(channel.in_flight);

        // The late frame belongs to the cancelled command, not the next one
        peer_out.write_all(b"12.76\n{ready}\n").await.unwrap();
        assert!(matches!(
            channel.run_one(&block).await,
            Err(Error::ProcessTerminated)
        ));
        assert!(channel.broken);
        assert!(!channel.in_flight);
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let session = silent_session(SessionConfig::builder().build().unwrap());
        assert!(!session.is_closed().await);
        session.close().await.unwrap();
        assert!(session.is_closed().await);
        session.close().await.unwrap();

        let err = session
            .extract_metadata(&["photo.jpg"])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SessionClosed));
    }
}
