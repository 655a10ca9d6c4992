//! decisiongraph-wal
//!
//! Append-before-commit durability for the chain. Every cell is journaled as
//! `u32 LE length ∥ payload ∥ u32 LE crc32c` and fsynced before the chain
//! exposes it. Recovery replays whole records and discards a truncated or
//! corrupt tail — the journal's last record is the only one that can be
//! damaged by a crash mid-write.

pub mod segment;

pub use segment::SegmentedWal;

use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use decisiongraph_core::error::DgError;

const LEN_BYTES: usize = 4;
const CRC_BYTES: usize = 4;

/// Upper bound on a single record; anything larger is treated as corruption
/// rather than an attempt to allocate it.
pub const MAX_RECORD_BYTES: u32 = 16 * 1024 * 1024;

/// A single-file append journal.
pub struct Wal {
    file: File,
    path: PathBuf,
    bytes_written: u64,
}

impl Wal {
    /// Open (or create) the journal at `path`, positioned for appending.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DgError> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;
        let bytes_written = file.seek(SeekFrom::End(0))?;
        Ok(Self {
            file,
            path,
            bytes_written,
        })
    }

    /// Append one record and fsync. The caller must not expose the cell
    /// until this returns.
    pub fn append(&mut self, payload: &[u8]) -> Result<(), DgError> {
        if payload.len() as u64 > u64::from(MAX_RECORD_BYTES) {
            return Err(DgError::Storage(format!(
                "record of {} bytes exceeds the {} byte record cap",
                payload.len(),
                MAX_RECORD_BYTES
            )));
        }
        let len = payload.len() as u32;
        let crc = crc32c::crc32c(payload);
        self.file.write_all(&len.to_le_bytes())?;
        self.file.write_all(payload)?;
        self.file.write_all(&crc.to_le_bytes())?;
        self.file.sync_data()?;
        self.bytes_written += (LEN_BYTES + payload.len() + CRC_BYTES) as u64;
        Ok(())
    }

    /// Replay every intact record in order. A truncated length, truncated
    /// payload, or checksum mismatch ends the replay at that point; the
    /// damaged tail is reported, not returned.
    pub fn replay(&self) -> Result<ReplayOutcome, DgError> {
        replay_file(&self.path)
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// What a replay recovered, and whether a damaged tail was discarded.
#[derive(Debug, Default)]
pub struct ReplayOutcome {
    pub records: Vec<Vec<u8>>,
    /// Offset and reason of the first damaged byte, if any.
    pub discarded_tail: Option<(u64, String)>,
}

pub(crate) fn replay_file(path: &Path) -> Result<ReplayOutcome, DgError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(ReplayOutcome::default())
        }
        Err(e) => return Err(e.into()),
    };
    let mut reader = BufReader::new(file);
    let mut outcome = ReplayOutcome::default();
    let mut offset: u64 = 0;

    loop {
        let mut len_buf = [0u8; LEN_BYTES];
        match read_exact_or_eof(&mut reader, &mut len_buf) {
            ReadState::Eof => break,
            ReadState::Partial => {
                outcome.discarded_tail = Some((offset, "truncated length prefix".to_string()));
                break;
            }
            ReadState::Full => {}
        }
        let len = u32::from_le_bytes(len_buf);
        if len > MAX_RECORD_BYTES {
            outcome.discarded_tail =
                Some((offset, format!("implausible record length {len}")));
            break;
        }

        let mut payload = vec![0u8; len as usize];
        if !matches!(read_exact_or_eof(&mut reader, &mut payload), ReadState::Full) {
            outcome.discarded_tail = Some((offset, "truncated payload".to_string()));
            break;
        }

        let mut crc_buf = [0u8; CRC_BYTES];
        if !matches!(read_exact_or_eof(&mut reader, &mut crc_buf), ReadState::Full) {
            outcome.discarded_tail = Some((offset, "truncated checksum".to_string()));
            break;
        }
        let stored = u32::from_le_bytes(crc_buf);
        let computed = crc32c::crc32c(&payload);
        if stored != computed {
            outcome.discarded_tail = Some((
                offset,
                format!("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}"),
            ));
            break;
        }

        offset += (LEN_BYTES + payload.len() + CRC_BYTES) as u64;
        outcome.records.push(payload);
    }

    if let Some((at, ref reason)) = outcome.discarded_tail {
        warn!(path = %path.display(), offset = at, reason = %reason, "discarding damaged journal tail");
    } else {
        debug!(path = %path.display(), records = outcome.records.len(), "journal replay complete");
    }
    Ok(outcome)
}

enum ReadState {
    Full,
    Partial,
    Eof,
}

fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> ReadState {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return if filled == 0 {
                    ReadState::Eof
                } else {
                    ReadState::Partial
                }
            }
            Ok(n) => filled += n,
            Err(_) => return ReadState::Partial,
        }
    }
    ReadState::Full
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_wal(name: &str) -> PathBuf {
        let _ = tracing_subscriber::fmt().with_env_filter("debug").try_init();
        let dir = std::env::temp_dir().join("decisiongraph_wal_tests");
        let _ = std::fs::create_dir_all(&dir);
        let path = dir.join(name);
        let _ = std::fs::remove_file(&path);
        path
    }

    #[test]
    fn append_replay_round_trip() {
        let path = temp_wal("round_trip.wal");
        let mut wal = Wal::open(&path).unwrap();
        wal.append(b"first").unwrap();
        wal.append(b"second").unwrap();

        let outcome = wal.replay().unwrap();
        assert_eq!(outcome.records, vec![b"first".to_vec(), b"second".to_vec()]);
        assert!(outcome.discarded_tail.is_none());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn truncated_tail_is_discarded() {
        let path = temp_wal("truncated.wal");
        let mut wal = Wal::open(&path).unwrap();
        wal.append(b"intact").unwrap();
        wal.append(b"doomed").unwrap();
        drop(wal);

        // Chop mid-way through the second record.
        let full = std::fs::metadata(&path).unwrap().len();
        let f = OpenOptions::new().write(true).open(&path).unwrap();
        f.set_len(full - 3).unwrap();
        drop(f);

        let outcome = replay_file(&path).unwrap();
        assert_eq!(outcome.records, vec![b"intact".to_vec()]);
        assert!(outcome.discarded_tail.is_some());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn corrupt_checksum_is_discarded() {
        let path = temp_wal("corrupt.wal");
        let mut wal = Wal::open(&path).unwrap();
        wal.append(b"intact").unwrap();
        wal.append(b"flipped").unwrap();
        drop(wal);

        // Flip one payload byte of the second record.
        let mut bytes = std::fs::read(&path).unwrap();
        let second_payload_start = LEN_BYTES + b"intact".len() + CRC_BYTES + LEN_BYTES;
        bytes[second_payload_start] ^= 0xFF;
        std::fs::write(&path, &bytes).unwrap();

        let outcome = replay_file(&path).unwrap();
        assert_eq!(outcome.records, vec![b"intact".to_vec()]);
        let (_, reason) = outcome.discarded_tail.unwrap();
        assert!(reason.contains("checksum"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn replay_of_missing_file_is_empty() {
        let path = temp_wal("never_written.wal");
        let _ = std::fs::remove_file(&path);
        let outcome = replay_file(&path).unwrap();
        assert!(outcome.records.is_empty());
        assert!(outcome.discarded_tail.is_none());
    }
}
