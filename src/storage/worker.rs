// src/storage/worker.rs
//! Debounced background writer for the JSON document.
//!
//! Mutations hand the worker a full snapshot of the document. The worker
//! keeps only the most recent one and writes it once no newer snapshot has
//! arrived for the debounce window, so a burst of statements costs a single
//! write. Flush and shutdown requests write immediately and acknowledge.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, error};
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;

use crate::core::document::Document;
use crate::core::errors::{Result, StoreError};

/// Operations accepted by the save worker
pub enum SaveOp {
    /// Newest state of the document
    Snapshot(Document),
    /// Write pending state now
    Flush(oneshot::Sender<Result<()>>),
    /// Write pending state and stop
    Shutdown(oneshot::Sender<Result<()>>),
}

/// Statistics for the save worker
#[derive(Debug, Default, Clone)]
pub struct SaveStats {
    /// Snapshots received
    pub snapshots: usize,
    /// Successful writes
    pub writes: usize,
    /// Snapshots superseded before they were written
    pub coalesced: usize,
    /// Failed writes
    pub failures: usize,
    /// Error of the last write, cleared by the next successful one
    pub last_error: Option<String>,
}

/// Writes document snapshots to a single file
struct SnapshotWriter {
    path: PathBuf,
    pretty: bool,
    stats: Arc<Mutex<SaveStats>>,
}

impl SnapshotWriter {
    async fn write(&self, document: &Document) -> Result<()> {
        match self.write_file(document).await {
            Ok(()) => {
                let mut stats = lock_stats(&self.stats);
                stats.writes += 1;
                stats.last_error = None;
                debug!("Saved document ({} rows) to {:?}", document.total_rows(), self.path);
                Ok(())
            }
            Err(e) => {
                error!("Failed to save document to {:?}: {}", self.path, e);
                let mut stats = lock_stats(&self.stats);
                stats.failures += 1;
                stats.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn write_file(&self, document: &Document) -> Result<()> {
        let contents = if self.pretty {
            serde_json::to_string_pretty(document)?
        } else {
            serde_json::to_string(document)?
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        // Whole-file overwrite through a sibling temp file
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Write the dirty snapshot, keeping it dirty if the write fails
    async fn write_pending(&self, dirty: &mut Option<Document>) -> Result<()> {
        match dirty.take() {
            Some(document) => {
                let result = self.write(&document).await;
                if result.is_err() {
                    *dirty = Some(document);
                }
                result
            }
            None => Ok(()),
        }
    }
}

fn lock_stats(stats: &Mutex<SaveStats>) -> std::sync::MutexGuard<'_, SaveStats> {
    stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Block until the worker answers, also when called from inside a runtime
fn wait_for<T: Send>(done: oneshot::Receiver<T>) -> Option<T> {
    let wait = move || done.blocking_recv().ok();
    match Handle::try_current() {
        Err(_) => wait(),
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => tokio::task::block_in_place(wait),
        // A current-thread runtime cannot hand its thread over
        Ok(_) => std::thread::scope(|scope| scope.spawn(wait).join().ok().flatten()),
    }
}

/// Background task coalescing document saves
pub struct SaveWorker {
    /// Sender for save operations
    tx: UnboundedSender<SaveOp>,
    /// Runtime owning the worker task
    runtime: Option<Runtime>,
    /// Save statistics
    stats: Arc<Mutex<SaveStats>>,
}

impl SaveWorker {
    /// Start a worker writing to `path`
    pub fn start(path: PathBuf, debounce: Duration, pretty: bool) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("crmql-save")
            .enable_time()
            .build()
            .map_err(|e| StoreError::Internal(format!("Failed to create save runtime: {}", e)))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let stats = Arc::new(Mutex::new(SaveStats::default()));
        let writer = SnapshotWriter {
            path,
            pretty,
            stats: Arc::clone(&stats),
        };

        runtime.spawn(Self::process_operations(rx, writer, debounce));

        Ok(SaveWorker {
            tx,
            runtime: Some(runtime),
            stats,
        })
    }

    /// Process operations in the background
    async fn process_operations(
        mut rx: UnboundedReceiver<SaveOp>,
        writer: SnapshotWriter,
        debounce: Duration,
    ) {
        // Latest state not yet on disk
        let mut dirty: Option<Document> = None;
        // Whether the debounce timer is running
        let mut armed = false;

        loop {
            let op = if armed {
                match tokio::time::timeout(debounce, rx.recv()).await {
                    Ok(op) => op,
                    Err(_) => {
                        armed = false;
                        // Failures stay dirty until the next snapshot or flush
                        let _ = writer.write_pending(&mut dirty).await;
                        continue;
                    }
                }
            } else {
                rx.recv().await
            };

            match op {
                Some(SaveOp::Snapshot(document)) => {
                    let superseded = dirty.replace(document).is_some();
                    let mut stats = lock_stats(&writer.stats);
                    stats.snapshots += 1;
                    if superseded {
                        stats.coalesced += 1;
                    }
                    armed = true;
                }
                Some(SaveOp::Flush(ack)) => {
                    armed = false;
                    let result = writer.write_pending(&mut dirty).await;
                    let _ = ack.send(result);
                }
                Some(SaveOp::Shutdown(ack)) => {
                    let result = writer.write_pending(&mut dirty).await;
                    let _ = ack.send(result);
                    debug!("Save worker shutting down");
                    break;
                }
                None => {
                    let _ = writer.write_pending(&mut dirty).await;
                    break;
                }
            }
        }
    }

    /// Hand the worker a new snapshot; the write happens after the debounce window
    pub fn schedule(&self, document: Document) -> Result<()> {
        self.tx
            .send(SaveOp::Snapshot(document))
            .map_err(|_| StoreError::Internal("Save worker is not running".to_string()))
    }

    /// Write pending state now and wait for the outcome
    pub fn flush(&self) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.tx
            .send(SaveOp::Flush(ack))
            .map_err(|_| StoreError::Internal("Save worker is not running".to_string()))?;
        wait_for(done)
            .ok_or_else(|| StoreError::Internal("Save worker dropped the flush request".to_string()))?
    }

    /// Get the current statistics
    pub fn stats(&self) -> SaveStats {
        lock_stats(&self.stats).clone()
    }

    /// Final flush and stop. Safe to call more than once.
    pub fn shutdown(&mut self) -> Result<()> {
        let runtime = match self.runtime.take() {
            Some(runtime) => runtime,
            None => return Ok(()),
        };

        let (ack, done) = oneshot::channel();
        if self.tx.send(SaveOp::Shutdown(ack)).is_err() {
            runtime.shutdown_background();
            return Err(StoreError::Internal("Save worker is not running".to_string()));
        }

        let result = wait_for(done)
            .ok_or_else(|| StoreError::Internal("Save worker stopped before the final write".to_string()))
            .and_then(|result| result);
        // Dropping a runtime blocks, which a caller's runtime forbids
        runtime.shutdown_background();
        result
    }
}

impl Drop for SaveWorker {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!("Final save failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::document::Record;
    use crate::core::table::Table;
    use crate::core::value::Value;
    use tempfile::tempdir;

    fn document_with_leads(count: usize) -> Document {
        let mut document = Document::new();
        for i in 0..count {
            let mut record = Record::new();
            record.insert("id".to_string(), Value::from(format!("l{}", i)));
            document.rows_mut(Table::Leads).push(record);
        }
        document
    }

    fn read_leads(path: &std::path::Path) -> usize {
        let raw = std::fs::read_to_string(path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        json["leads"].as_array().unwrap().len()
    }

    #[test]
    fn test_burst_is_coalesced_into_one_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("crm-data.json");
        let worker = SaveWorker::start(path.clone(), Duration::from_secs(5), true).unwrap();

        for count in 1..=5 {
            worker.schedule(document_with_leads(count)).unwrap();
        }
        worker.flush().unwrap();

        let stats = worker.stats();
        assert_eq!(stats.snapshots, 5);
        assert_eq!(stats.coalesced, 4);
        assert_eq!(stats.writes, 1);
        assert_eq!(read_leads(&path), 5);
    }

    #[test]
    fn test_debounced_write_happens_without_flush() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("crm-data.json");
        let worker = SaveWorker::start(path.clone(), Duration::from_millis(20), true).unwrap();

        worker.schedule(document_with_leads(2)).unwrap();
        std::thread::sleep(Duration::from_millis(500));

        assert!(path.exists());
        assert_eq!(read_leads(&path), 2);
        assert_eq!(worker.stats().writes, 1);
    }

    #[test]
    fn test_flush_without_pending_state_is_a_no_op() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("crm-data.json");
        let worker = SaveWorker::start(path.clone(), Duration::from_millis(20), true).unwrap();

        worker.flush().unwrap();
        assert!(!path.exists());
        assert_eq!(worker.stats().writes, 0);
    }

    #[test]
    fn test_shutdown_writes_pending_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("crm-data.json");
        let mut worker = SaveWorker::start(path.clone(), Duration::from_secs(5), false).unwrap();

        worker.schedule(document_with_leads(3)).unwrap();
        worker.shutdown().unwrap();

        assert_eq!(read_leads(&path), 3);
        // Second shutdown is harmless
        worker.shutdown().unwrap();
    }

    #[tokio::test]
    async fn test_flush_and_shutdown_inside_current_thread_runtime() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("crm-data.json");
        let mut worker = SaveWorker::start(path.clone(), Duration::from_secs(5), true).unwrap();

        worker.schedule(document_with_leads(2)).unwrap();
        worker.flush().unwrap();
        assert_eq!(read_leads(&path), 2);

        worker.schedule(document_with_leads(4)).unwrap();
        worker.shutdown().unwrap();
        assert_eq!(read_leads(&path), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_flush_inside_multi_thread_runtime() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("crm-data.json");
        let worker = SaveWorker::start(path.clone(), Duration::from_secs(5), true).unwrap();

        worker.schedule(document_with_leads(3)).unwrap();
        worker.flush().unwrap();
        assert_eq!(read_leads(&path), 3);
    }

    #[test]
    fn test_failed_write_is_reported_by_flush() {
        let dir = tempdir().unwrap();
        // A directory where the file should be makes the rename fail
        let path = dir.path().join("occupied");
        std::fs::create_dir_all(path.join("child")).unwrap();
        let worker = SaveWorker::start(path, Duration::from_secs(5), true).unwrap();

        worker.schedule(document_with_leads(1)).unwrap();
        assert!(worker.flush().is_err());

        let stats = worker.stats();
        assert_eq!(stats.failures, 1);
        assert!(stats.last_error.is_some());
        // Still dirty, so the retry fails the same way
        assert!(worker.flush().is_err());
    }
}
