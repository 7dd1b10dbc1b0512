//! Background encoding of a cooked clip set.

use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError, channel};
use std::thread::{self, JoinHandle};

use log::{debug, warn};

use crate::codec::{encode_clip_set, write_encoded};
use crate::error::{ReplayError, Result};
use crate::pose::ClipSet;
use crate::schema::FileOptions;

/// Where the encoded bytes go once the worker is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveSink {
    /// Keep the bytes in memory only.
    Memory,
    /// Also write them to this path.
    File(PathBuf),
}

/// Output of a finished save.
#[derive(Debug, Clone)]
pub struct SavedClip {
    /// Encoded blob, ready to store or transfer.
    pub bytes: Vec<u8>,
    /// File the blob was written to, if any.
    pub path: Option<PathBuf>,
    /// The clip set after invalid clips were dropped and ranges filled in.
    pub clip_set: ClipSet,
}

/// Handle to one encode running on its own thread.
///
/// The result is delivered exactly once, through [`SaveTask::wait`] or the
/// first [`SaveTask::try_result`] that finds it ready.
#[derive(Debug)]
pub struct SaveTask {
    rx: Receiver<Result<SavedClip>>,
    handle: Option<JoinHandle<()>>,
    delivered: bool,
}

impl SaveTask {
    /// Take ownership of `clip_set` and start encoding it.
    pub fn spawn(clip_set: ClipSet, options: FileOptions, sink: SaveSink) -> Self {
        let (tx, rx) = channel();
        let handle = thread::spawn(move || {
            let result = run(clip_set, options, sink);
            if tx.send(result).is_err() {
                debug!("Save result dropped, task handle is gone");
            }
        });
        Self {
            rx,
            handle: Some(handle),
            delivered: false,
        }
    }

    /// Block until the worker finishes.
    ///
    /// Fails with [`ReplayError::ResultTaken`] if [`SaveTask::try_result`]
    /// already returned the result.
    pub fn wait(mut self) -> Result<SavedClip> {
        if self.delivered {
            return Err(ReplayError::ResultTaken);
        }
        let result = self.rx.recv().unwrap_or(Err(ReplayError::WorkerLost));
        self.delivered = true;
        self.join();
        result
    }

    /// Poll for the result; `None` while running or after it was delivered.
    pub fn try_result(&mut self) -> Option<Result<SavedClip>> {
        if self.delivered {
            return None;
        }
        let result = match self.rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(ReplayError::WorkerLost),
        };
        self.delivered = true;
        self.join();
        Some(result)
    }

    pub fn is_finished(&self) -> bool {
        self.delivered || self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Save worker panicked");
            }
        }
    }
}

fn run(mut clip_set: ClipSet, options: FileOptions, sink: SaveSink) -> Result<SavedClip> {
    let bytes = encode_clip_set(&mut clip_set, options)?;
    let path = match sink {
        SaveSink::Memory => None,
        SaveSink::File(path) => {
            write_encoded(&path, &bytes)?;
            Some(path)
        }
    };
    Ok(SavedClip {
        bytes,
        path,
        clip_set,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode_clip_set;
    use crate::pose::{Clip, Sample, Transform};
    use glam::Vec3;
    use std::time::Duration;
    use tempfile::tempdir;

    fn clip_set(frames: usize) -> ClipSet {
        let samples = (0..frames)
            .map(|i| {
                Sample::new(i as f32 * 0.1, i as i32)
                    .with_transform("root", Transform::from_translation(Vec3::X * i as f32))
            })
            .collect();
        ClipSet {
            clips: vec![Clip {
                primary_part: "root".to_string(),
                samples,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_save_to_memory() {
        let task = SaveTask::spawn(clip_set(5), FileOptions::default(), SaveSink::Memory);
        let saved = task.wait().unwrap();
        assert!(saved.path.is_none());
        let decoded = decode_clip_set(&saved.bytes).unwrap();
        assert_eq!(decoded.clips[0].samples.len(), 5);
    }

    #[test]
    fn test_save_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("saves").join("a.ghst");
        let sink = SaveSink::File(path.clone());
        let task = SaveTask::spawn(clip_set(3), FileOptions::default(), sink);
        let saved = task.wait().unwrap();
        assert_eq!(saved.path.as_deref(), Some(path.as_path()));
        assert_eq!(std::fs::read(&path).unwrap(), saved.bytes);
    }

    #[test]
    fn test_result_delivered_once() {
        let mut task = SaveTask::spawn(clip_set(1), FileOptions::default(), SaveSink::Memory);
        let result = loop {
            if let Some(result) = task.try_result() {
                break result;
            }
            std::thread::sleep(Duration::from_millis(1));
        };
        assert!(matches!(result, Err(ReplayError::EmptyGroup)));
        assert!(task.try_result().is_none());
        assert!(task.is_finished());
        assert!(matches!(task.wait(), Err(ReplayError::ResultTaken)));
    }
}
