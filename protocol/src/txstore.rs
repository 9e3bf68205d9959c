//! # Flat-File Transaction Store
//!
//! Byte-offset retrieval of fixed-size transaction records from one file
//! per account address. Record `n` (1-based) lives at byte offset
//! `(n - 1) * TXN_RECORD_SIZE`, so a fetch is a single seek plus an exact
//! read — no index, no framing, no surprises.
//!
//! Reads fail closed: if the requested range runs past the end of the file,
//! the caller gets an error and zero bytes, never a partial buffer.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use crate::config::{TXN_FILE_EXT, TXN_RECORD_SIZE};
use crate::identity::AccountAddress;

/// Errors from the flat-file transaction store.
#[derive(Debug, Error)]
pub enum TxStoreError {
    /// No record file exists for the address.
    #[error("no transaction file for address {0}")]
    Missing(AccountAddress),

    /// Record indices are 1-based; zero is a caller bug, not an I/O problem.
    #[error("record start index must be >= 1")]
    ZeroStart,

    /// The requested range extends past the end of the file.
    #[error("requested records [{start}, {start}+{count}) exceed stored records")]
    OutOfRange {
        /// First requested record (1-based).
        start: u64,
        /// Number of requested records.
        count: u64,
    },

    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Per-address flat files of fixed-size transaction records.
pub struct TxnFileStore {
    base_dir: PathBuf,
}

impl TxnFileStore {
    /// Creates a store rooted at `base_dir`. The directory is not created
    /// or scanned here; a missing file only surfaces on fetch.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// The record file path for an address: `<base>/<hex-address>.txn`.
    pub fn path_for(&self, address: &AccountAddress) -> PathBuf {
        self.base_dir
            .join(format!("{}.{}", address.to_hex(), TXN_FILE_EXT))
    }

    /// Reads `count` consecutive records starting at the 1-based record
    /// index `start`, returning them as one concatenated buffer of exactly
    /// `count * TXN_RECORD_SIZE` bytes.
    ///
    /// Fails closed: any short read returns an error, not partial data.
    /// `count == 0` is a valid no-op returning an empty buffer.
    pub fn fetch(
        &self,
        address: &AccountAddress,
        start: u64,
        count: u64,
    ) -> Result<Vec<u8>, TxStoreError> {
        if start == 0 {
            return Err(TxStoreError::ZeroStart);
        }
        if count == 0 {
            return Ok(Vec::new());
        }

        let path = self.path_for(address);
        let mut file = open_records_file(&path, address)?;

        let record_size = TXN_RECORD_SIZE as u64;
        let offset = (start - 1) * record_size;
        let wanted = count * record_size;

        let available = file.metadata()?.len();
        if offset + wanted > available {
            warn!(
                address = %address,
                start, count, available,
                "transaction fetch out of range"
            );
            return Err(TxStoreError::OutOfRange { start, count });
        }

        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; wanted as usize];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }
}

fn open_records_file(path: &Path, address: &AccountAddress) -> Result<File, TxStoreError> {
    File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            warn!(address = %address, "transaction file not found");
            TxStoreError::Missing(*address)
        } else {
            TxStoreError::Io(e)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::NodeIdentity;
    use std::io::Write;

    fn store_with_records(records: usize) -> (tempfile::TempDir, TxnFileStore, AccountAddress) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = TxnFileStore::new(dir.path());
        let address = *NodeIdentity::generate().address();

        let mut file = std::fs::File::create(store.path_for(&address)).expect("create");
        for n in 0..records {
            // Each record is its index byte repeated, so slices are easy to
            // assert on.
            file.write_all(&vec![n as u8; TXN_RECORD_SIZE]).expect("write");
        }
        (dir, store, address)
    }

    #[test]
    fn fetch_reads_exact_records_from_offset() {
        let (_dir, store, address) = store_with_records(5);

        let buf = store.fetch(&address, 2, 3).expect("fetch");
        assert_eq!(buf.len(), 3 * TXN_RECORD_SIZE);
        assert!(buf[..TXN_RECORD_SIZE].iter().all(|&b| b == 1));
        assert!(buf[TXN_RECORD_SIZE..2 * TXN_RECORD_SIZE].iter().all(|&b| b == 2));
        assert!(buf[2 * TXN_RECORD_SIZE..].iter().all(|&b| b == 3));
    }

    #[test]
    fn out_of_range_fails_closed() {
        let (_dir, store, address) = store_with_records(2);

        let err = store.fetch(&address, 2, 2).expect_err("must fail");
        assert!(matches!(err, TxStoreError::OutOfRange { start: 2, count: 2 }));

        // In-range request on the same file still works.
        assert!(store.fetch(&address, 1, 2).is_ok());
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = TxnFileStore::new(dir.path());
        let address = *NodeIdentity::generate().address();

        let err = store.fetch(&address, 1, 1).expect_err("must fail");
        assert!(matches!(err, TxStoreError::Missing(a) if a == address));
    }

    #[test]
    fn zero_start_and_zero_count() {
        let (_dir, store, address) = store_with_records(1);

        assert!(matches!(
            store.fetch(&address, 0, 1),
            Err(TxStoreError::ZeroStart)
        ));
        assert!(store.fetch(&address, 1, 0).expect("empty").is_empty());
    }
}
