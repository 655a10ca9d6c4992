//! Segmented journal: rotates the active file at a size threshold so
//! compaction can drop whole segments instead of rewriting one long file.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use decisiongraph_core::error::DgError;

use crate::{replay_file, ReplayOutcome, Wal};

/// A directory of `segment-<n>.wal` files with one active tail segment.
pub struct SegmentedWal {
    dir: PathBuf,
    segment_max_bytes: u64,
    active_index: u64,
    active: Wal,
}

impl SegmentedWal {
    /// Open the directory, continuing from the highest existing segment.
    pub fn open<P: AsRef<Path>>(dir: P, segment_max_bytes: u64) -> Result<Self, DgError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        let active_index = existing_segments(&dir)?.last().copied().unwrap_or(0);
        let active = Wal::open(segment_path(&dir, active_index))?;
        Ok(Self {
            dir,
            segment_max_bytes,
            active_index,
            active,
        })
    }

    /// Append one record, rotating first if the active segment is full.
    pub fn append(&mut self, payload: &[u8]) -> Result<(), DgError> {
        if self.active.bytes_written() >= self.segment_max_bytes {
            self.rotate()?;
        }
        self.active.append(payload)
    }

    fn rotate(&mut self) -> Result<(), DgError> {
        self.active_index += 1;
        self.active = Wal::open(segment_path(&self.dir, self.active_index))?;
        debug!(segment = self.active_index, "journal segment rotated");
        Ok(())
    }

    /// Replay all segments in order. Only the final segment may carry a
    /// damaged tail; damage in an earlier segment is real corruption and
    /// surfaces as an error.
    pub fn replay(&self) -> Result<ReplayOutcome, DgError> {
        let segments = existing_segments(&self.dir)?;
        let mut combined = ReplayOutcome::default();
        let last = segments.last().copied();
        for index in segments {
            let outcome = replay_file(&segment_path(&self.dir, index))?;
            if let Some((offset, reason)) = outcome.discarded_tail {
                if Some(index) != last {
                    return Err(DgError::WalCorrupt {
                        offset,
                        detail: format!("segment {index} damaged mid-journal: {reason}"),
                    });
                }
                combined.discarded_tail = Some((offset, reason));
            }
            combined.records.extend(outcome.records);
        }
        Ok(combined)
    }

    /// Drop every sealed segment for which `fully_committed` returns true
    /// for all of its records. The active segment is never dropped.
    pub fn compact<F>(&mut self, mut fully_committed: F) -> Result<usize, DgError>
    where
        F: FnMut(&[u8]) -> bool,
    {
        let mut dropped = 0;
        for index in existing_segments(&self.dir)? {
            if index == self.active_index {
                continue;
            }
            let path = segment_path(&self.dir, index);
            let outcome = replay_file(&path)?;
            if outcome.discarded_tail.is_none()
                && outcome.records.iter().all(|r| fully_committed(r))
            {
                std::fs::remove_file(&path)?;
                dropped += 1;
                info!(segment = index, "compacted fully-committed journal segment");
            }
        }
        Ok(dropped)
    }

    pub fn active_segment(&self) -> u64 {
        self.active_index
    }
}

fn segment_path(dir: &Path, index: u64) -> PathBuf {
    dir.join(format!("segment-{index:06}.wal"))
}

fn existing_segments(dir: &Path) -> Result<Vec<u64>, DgError> {
    let mut indexes = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let name = entry?.file_name();
        let name = name.to_string_lossy();
        if let Some(num) = name
            .strip_prefix("segment-")
            .and_then(|rest| rest.strip_suffix(".wal"))
        {
            if let Ok(index) = num.parse::<u64>() {
                indexes.push(index);
            }
        }
    }
    indexes.sort_unstable();
    Ok(indexes)
}
