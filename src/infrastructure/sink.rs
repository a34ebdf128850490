// Sink module - Fire-and-forget writers for control messages and the device
use crate::domain::error::RelayResult;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// A destination that accepts raw payloads
#[async_trait]
pub trait Sink: Send + 'static {
    /// Human-readable name used in log messages
    fn describe(&self) -> String;

    /// Write one payload
    async fn write(&mut self, payload: &[u8]) -> RelayResult<()>;
}

/// How a [`FileSink`] applies each payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Append to the end, creating the file if needed
    Append,
    /// Replace the whole file contents
    Overwrite,
}

/// Writes payloads to a fixed path
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
    mode: WriteMode,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>, mode: WriteMode) -> Self {
        Self {
            path: path.into(),
            mode,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> WriteMode {
        self.mode
    }
}

#[async_trait]
impl Sink for FileSink {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn write(&mut self, payload: &[u8]) -> RelayResult<()> {
        match self.mode {
            WriteMode::Overwrite => tokio::fs::write(&self.path, payload).await?,
            WriteMode::Append => {
                let mut file = tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.path)
                    .await?;
                file.write_all(payload).await?;
                file.flush().await?;
            }
        }
        Ok(())
    }
}

/// Handle to a background task that owns a [`Sink`].
///
/// `send` only queues the payload, so callers never wait on I/O and never
/// see a write failure. Payloads sent through one outlet are written in
/// order. Failures are logged and the payload is discarded.
pub struct Outlet {
    name: String,
    tx_sender: mpsc::UnboundedSender<Vec<u8>>,
    tx_handle: tokio::task::JoinHandle<()>,
}

impl Outlet {
    /// Start the writer task for `sink`
    pub fn spawn<S: Sink>(mut sink: S) -> Self {
        let name = sink.describe();
        let (tx_sender, mut tx_receiver) = mpsc::unbounded_channel::<Vec<u8>>();
        let task_name = name.clone();

        let tx_handle = tokio::spawn(async move {
            while let Some(payload) = tx_receiver.recv().await {
                match sink.write(&payload).await {
                    Ok(()) => debug!("Wrote {} bytes to {}", payload.len(), task_name),
                    Err(e) => error!("Failed to write to {}: {}", task_name, e),
                }
            }
        });

        Self {
            name,
            tx_sender,
            tx_handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue a payload; never blocks
    pub fn send(&self, payload: impl Into<Vec<u8>>) {
        if self.tx_sender.send(payload.into()).is_err() {
            warn!("Writer for {} has stopped; payload discarded", self.name);
        }
    }

    /// Finish pending writes and stop the writer task
    pub async fn close(self) {
        drop(self.tx_sender);

        if let Err(e) = self.tx_handle.await {
            warn!("Writer for {} completed with error: {}", self.name, e);
        }
    }
}

impl std::fmt::Debug for Outlet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outlet").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    struct FailingSink;

    #[async_trait]
    impl Sink for FailingSink {
        fn describe(&self) -> String {
            "failing".to_string()
        }

        async fn write(&mut self, _payload: &[u8]) -> RelayResult<()> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone").into())
        }
    }

    struct CountingSink(Arc<Mutex<Vec<Vec<u8>>>>);

    #[async_trait]
    impl Sink for CountingSink {
        fn describe(&self) -> String {
            "counting".to_string()
        }

        async fn write(&mut self, payload: &[u8]) -> RelayResult<()> {
            self.0.lock().unwrap().push(payload.to_vec());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_overwrite_replaces_contents() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("altairpos.txt");

        let outlet = Outlet::spawn(FileSink::new(&path, WriteMode::Overwrite));
        outlet.send("1,2,3,4,5");
        outlet.send("1,2,3");
        outlet.close().await;

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1,2,3");
    }

    #[tokio::test]
    async fn test_append_accumulates() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tty.usbserial");

        let outlet = Outlet::spawn(FileSink::new(&path, WriteMode::Append));
        outlet.send("AB");
        outlet.send("C");
        outlet.close().await;

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "ABC");
    }

    #[tokio::test]
    async fn test_write_failure_is_contained() {
        let outlet = Outlet::spawn(FailingSink);
        outlet.send("lost");
        outlet.send("also lost");
        outlet.close().await;
    }

    #[tokio::test]
    async fn test_missing_directory_does_not_stop_writer() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing").join("snapshot.txt");

        let outlet = Outlet::spawn(FileSink::new(&path, WriteMode::Overwrite));
        outlet.send("x");
        outlet.close().await;

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_writes_are_ordered() {
        let written = Arc::new(Mutex::new(Vec::new()));
        let outlet = Outlet::spawn(CountingSink(Arc::clone(&written)));
        for i in 0..50u8 {
            outlet.send(vec![i]);
        }
        outlet.close().await;

        let written = written.lock().unwrap();
        let expected: Vec<Vec<u8>> = (0..50u8).map(|i| vec![i]).collect();
        assert_eq!(*written, expected);
    }
}
