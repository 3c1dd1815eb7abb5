use std::io::{Read, Write};

use serde::Serialize;

use crate::catalog::{DatasetCatalog, DatasetEntry};
use crate::config::DataConfig;
use crate::domain::DatasetKey;
use crate::error::HcpError;
use crate::fs_util::{self, ARCHIVE_STRIP_COMPONENTS};
use crate::http::ArchiveClient;
use crate::layout::{Layout, ensure_directory};

/// Body bytes copied per read.
pub const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchAction {
    Cached,
    Downloaded,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    pub root: String,
    pub items: Vec<FetchItemResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchItemResult {
    pub key: DatasetKey,
    pub archive_path: String,
    pub source_url: String,
    pub action: FetchAction,
    pub bytes: Option<u64>,
    pub extracted_entries: usize,
    pub fetched_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub transferred: Option<u64>,
    pub total: Option<u64>,
}

impl ProgressEvent {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transferred: None,
            total: None,
        }
    }

    pub fn transfer(key: DatasetKey, transferred: u64, total: Option<u64>) -> Self {
        Self {
            message: format!("download {key}"),
            transferred: Some(transferred),
            total,
        }
    }
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct Fetcher<C: ArchiveClient> {
    layout: Layout,
    datasets: DatasetCatalog,
    client: C,
}

impl<C: ArchiveClient> Fetcher<C> {
    pub fn new(config: &DataConfig, client: C) -> Self {
        Self {
            layout: config.layout(),
            datasets: config.datasets.clone(),
            client,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Fetches the named datasets, or the whole catalog when `requested` is
    /// empty. Unknown names fail before anything touches the network.
    pub fn fetch<S: AsRef<str>>(
        &self,
        requested: &[S],
        sink: &dyn ProgressSink,
    ) -> Result<FetchResult, HcpError> {
        let entries = self.datasets.select(requested)?;
        self.fetch_all(&entries, sink)
    }

    pub fn fetch_all(
        &self,
        entries: &[&DatasetEntry],
        sink: &dyn ProgressSink,
    ) -> Result<FetchResult, HcpError> {
        self.layout.ensure_root()?;
        let items = entries
            .iter()
            .map(|entry| self.fetch_dataset(entry, sink))
            .collect::<Result<Vec<_>, HcpError>>()?;
        Ok(FetchResult {
            root: self.layout.root().to_string(),
            items,
        })
    }

    /// Downloads `entry` into the root unless its archive is already there,
    /// then unpacks tarballs in place. The archive is moved to its final path
    /// only once extraction has succeeded, and is kept.
    pub fn fetch_dataset(
        &self,
        entry: &DatasetEntry,
        sink: &dyn ProgressSink,
    ) -> Result<FetchItemResult, HcpError> {
        let archive_path = self.layout.archive_path(entry);

        if archive_path.as_std_path().exists() {
            tracing::info!(key = %entry.key, path = %archive_path, "archive present, skipping download");
            sink.event(ProgressEvent::message(format!(
                "{} already present at {archive_path}",
                entry.key
            )));
            return Ok(FetchItemResult {
                key: entry.key,
                archive_path: archive_path.to_string(),
                source_url: entry.source_url.clone(),
                action: FetchAction::Cached,
                bytes: None,
                extracted_entries: 0,
                fetched_at: None,
            });
        }

        ensure_directory(self.layout.root())?;
        tracing::info!(key = %entry.key, url = %entry.source_url, "downloading");
        sink.event(ProgressEvent::message(format!(
            "requesting {} from {}",
            entry.key, entry.source_url
        )));
        let download = self.client.open(&entry.source_url)?;

        let mut temp = tempfile::Builder::new()
            .prefix(&format!(".{}", entry.archive_filename))
            .suffix(".part")
            .tempfile_in(self.layout.root().as_std_path())
            .map_err(|err| HcpError::Filesystem(err.to_string()))?;
        let bytes = copy_with_progress(
            download.body,
            temp.as_file_mut(),
            entry.key,
            download.content_length,
            sink,
        )?;
        temp.as_file_mut()
            .flush()
            .map_err(|err| HcpError::Filesystem(err.to_string()))?;
        tracing::debug!(key = %entry.key, bytes, "archive downloaded");

        let extracted_entries = if fs_util::is_tarball(&entry.archive_filename) {
            sink.event(ProgressEvent::message(format!("extracting {}", entry.key)));
            let count = fs_util::extract_tar_gz(
                temp.path(),
                self.layout.root().as_std_path(),
                ARCHIVE_STRIP_COMPONENTS,
            )?;
            tracing::info!(key = %entry.key, files = count, "archive extracted");
            count
        } else {
            0
        };

        temp.persist(archive_path.as_std_path())
            .map_err(|err| HcpError::Filesystem(err.to_string()))?;

        Ok(FetchItemResult {
            key: entry.key,
            archive_path: archive_path.to_string(),
            source_url: entry.source_url.clone(),
            action: FetchAction::Downloaded,
            bytes: Some(bytes),
            extracted_entries,
            fetched_at: Some(chrono::Utc::now().to_rfc3339()),
        })
    }
}

fn copy_with_progress(
    mut body: impl Read,
    out: &mut impl Write,
    key: DatasetKey,
    total: Option<u64>,
    sink: &dyn ProgressSink,
) -> Result<u64, HcpError> {
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut transferred = 0u64;
    sink.event(ProgressEvent::transfer(key, 0, total));
    loop {
        let read = match body.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(HcpError::Http(err.to_string())),
        };
        out.write_all(&buffer[..read])
            .map_err(|err| HcpError::Filesystem(err.to_string()))?;
        transferred += read as u64;
        sink.event(ProgressEvent::transfer(key, transferred, total));
    }
    Ok(transferred)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        transfers: Mutex<Vec<(u64, Option<u64>)>>,
    }

    impl ProgressSink for Recorder {
        fn event(&self, event: ProgressEvent) {
            if let Some(transferred) = event.transferred {
                self.transfers
                    .lock()
                    .unwrap()
                    .push((transferred, event.total));
            }
        }
    }

    /// Yields one chunk, then a connection reset.
    struct Dropped {
        sent: bool,
    }

    impl Read for Dropped {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.sent {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "connection reset by peer",
                ));
            }
            self.sent = true;
            buf[..4].copy_from_slice(b"gzip");
            Ok(4)
        }
    }

    #[test]
    fn body_read_failure_is_a_transport_error() {
        let recorder = Recorder::default();
        let mut out = Vec::new();
        let err = copy_with_progress(
            Dropped { sent: false },
            &mut out,
            DatasetKey::Task,
            Some(100),
            &recorder,
        )
        .unwrap_err();

        assert!(err.is_network());
        assert!(matches!(err, HcpError::Http(ref message) if message.contains("reset")));
        assert_eq!(out, b"gzip");
    }

    #[test]
    fn progress_is_cumulative() {
        let payload = vec![7u8; CHUNK_SIZE * 2 + 10];
        let recorder = Recorder::default();
        let mut out = Vec::new();
        let written = copy_with_progress(
            Cursor::new(payload.clone()),
            &mut out,
            DatasetKey::Rest,
            Some(payload.len() as u64),
            &recorder,
        )
        .unwrap();

        assert_eq!(written, payload.len() as u64);
        assert_eq!(out, payload);
        let transfers = recorder.transfers.lock().unwrap();
        assert_eq!(transfers.first(), Some(&(0, Some(payload.len() as u64))));
        assert_eq!(transfers.last().unwrap().0, payload.len() as u64);
        assert!(transfers.windows(2).all(|pair| pair[0].0 <= pair[1].0));
    }
}
