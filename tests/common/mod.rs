//! Test utilities for libexiftool integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

use libexiftool::{Session, SessionConfig};

/// How the mock deviates from a well-behaved exiftool.
#[derive(Debug, Clone, Default)]
pub struct MockBehavior {
    /// Stop answering (close output) after this many command blocks.
    pub exit_after: Option<usize>,
    /// Answer extractions for paths ending with this suffix with plain text.
    pub garbage_for: Option<String>,
    /// Emit a diagnostic line in front of every write response.
    pub write_warning: bool,
    /// Wait this long before answering each command block.
    pub delay: Option<Duration>,
}

#[derive(Debug, Default)]
struct MockState {
    commands: Vec<Vec<String>>,
    tags: HashMap<String, Map<String, Value>>,
}

/// An in-process stand-in for `exiftool -stay_open True -@ -`.
///
/// Understands `-xmp-<ns>:<Field>=<value>` writes and `-j` extractions, and
/// remembers written fields per path.
#[derive(Clone)]
pub struct MockExifTool {
    state: Arc<Mutex<MockState>>,
}

impl MockExifTool {
    /// Start a mock and a session talking to it.
    pub fn session(config: SessionConfig, behavior: MockBehavior) -> (Session, MockExifTool) {
        let (input, mock_in) = tokio::io::duplex(64 * 1024);
        let (mut mock_out, output) = tokio::io::duplex(64 * 1024);

        let mock = MockExifTool {
            state: Arc::new(Mutex::new(MockState::default())),
        };
        let server = mock.clone();
        tokio::spawn(async move {
            server.serve(mock_in, &mut mock_out, behavior).await;
        });

        let session = Session::from_channels(config, Box::new(input), Box::new(output));
        (session, mock)
    }

    /// Every command block received so far, without `-execute`.
    pub fn commands(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().commands.clone()
    }

    /// Values of all writes received, in arrival order.
    pub fn written_values(&self) -> Vec<String> {
        self.commands()
            .iter()
            .flat_map(|block| block.iter())
            .filter_map(|arg| arg.strip_prefix("-xmp-"))
            .filter_map(|assign| assign.split_once('=').map(|(_, v)| v.to_string()))
            .collect()
    }

    async fn serve(&self, input: DuplexStream, output: &mut DuplexStream, behavior: MockBehavior) {
        let mut lines = BufReader::new(input).lines();
        let mut args: Vec<String> = Vec::new();
        let mut answered = 0;

        while let Ok(Some(line)) = lines.next_line().await {
            if line != "-execute" {
                args.push(line);
                continue;
            }

            let block = std::mem::take(&mut args);
            self.state.lock().unwrap().commands.push(block.clone());

            if block == ["-stay_open", "False"] {
                let _ = output.write_all(b"{ready}\n").await;
                return;
            }
            if behavior.exit_after == Some(answered) {
                return;
            }
            answered += 1;

            if let Some(delay) = behavior.delay {
                tokio::time::sleep(delay).await;
            }
            let response = self.respond(&block, &behavior);
            if output.write_all(&response).await.is_err() {
                return;
            }
        }
    }

    fn respond(&self, block: &[String], behavior: &MockBehavior) -> Vec<u8> {
        let file = block.last().cloned().unwrap_or_default();
        let mut state = self.state.lock().unwrap();

        if let Some(assign) = block.iter().find_map(|a| a.strip_prefix("-xmp-")) {
            let (tag, value) = assign.split_once('=').expect("assignment has '='");
            let (_, field) = tag.split_once(':').expect("assignment has a group");
            state
                .tags
                .entry(file)
                .or_default()
                .insert(field.to_string(), Value::String(value.to_string()));

            let mut out = String::new();
            if behavior.write_warning {
                out.push_str("Warning: [minor] Fixed incorrect URI - XMP\n");
            }
            out.push_str("    1 image files updated\n{ready}\n");
            return out.into_bytes();
        }

        if block.iter().any(|a| a == "-j") {
            if let Some(suffix) = &behavior.garbage_for {
                if file.ends_with(suffix.as_str()) {
                    return b"Error: File format error - corrupt\n{ready}\n".to_vec();
                }
            }
            let mut object = Map::new();
            object.insert("SourceFile".into(), Value::String(file.clone()));
            object.insert("FileType".into(), Value::String("JPEG".into()));
            if let Some(tags) = state.tags.get(&file) {
                object.extend(tags.clone());
            }
            let mut out = serde_json::to_vec(&vec![object]).expect("serializable");
            out.extend_from_slice(b"\n{ready}\n");
            return out;
        }

        b"{ready}\n".to_vec()
    }
}

/// Create `count` empty files named `photo<N>.jpg` in a fresh temp dir.
pub fn fixture_files(count: usize) -> (tempfile::TempDir, Vec<PathBuf>) {
    let dir = tempfile::tempdir().expect("temp dir");
    let files = (0..count)
        .map(|i| {
            let path = dir.path().join(format!("photo{i}.jpg"));
            std::fs::write(&path, b"\xFF\xD8\xFF\xD9").expect("write fixture");
            path
        })
        .collect();
    (dir, files)
}

/// Path string as the session sends it.
pub fn arg(path: &Path) -> String {
    path.to_str().expect("utf-8 path").to_string()
}
