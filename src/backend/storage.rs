//! Single-blob key/value storage on disk.
//!
//! Each key maps to one file `<dir>/<key>.blob`:
//!
//! ```text
//! magic "NTS\0" | version u8 | payload_len u64 LE | payload | crc32 u32 LE
//! ```
//!
//! Writes go to a temp file and are renamed into place. Callers serialize
//! read-modify-write cycles with [`BlobFile::lock`].

use crate::error::{NotesError, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Magic bytes for blob files.
const BLOB_MAGIC: &[u8; 4] = b"NTS\0";

/// Current blob format version.
const BLOB_VERSION: u8 = 1;

/// Header plus trailing checksum: magic + version + length + crc32.
const BLOB_OVERHEAD: u64 = 4 + 1 + 8 + 4;

/// One persisted blob addressed by a fixed key.
pub struct BlobFile {
    path: PathBuf,
    lock_path: PathBuf,
}

/// Exclusive lock over a blob, released on drop.
pub struct BlobLock {
    file: File,
}

impl Drop for BlobLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl BlobFile {
    /// Open the blob for `key` under `dir`, creating the directory.
    pub fn open(dir: impl AsRef<Path>, key: &str) -> Result<Self> {
        if key.is_empty() || key.contains(['/', '\\']) {
            return Err(NotesError::Validation(format!("invalid storage key: {key:?}")));
        }
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        Ok(Self {
            path: dir.join(format!("{key}.blob")),
            lock_path: dir.join(format!("{key}.lock")),
        })
    }

    /// Path of the blob file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the blob has ever been written.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Take the exclusive lock (blocks until available).
    pub fn lock(&self) -> Result<BlobLock> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)?;
        FileExt::lock_exclusive(&file)?;
        Ok(BlobLock { file })
    }

    /// Read the payload, or `None` if nothing was ever written.
    pub fn read(&self) -> Result<Option<Vec<u8>>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let mut file = File::open(&self.path)?;

        let mut magic = [0u8; 4];
        read_exact(&mut file, &mut magic)?;
        if &magic != BLOB_MAGIC {
            return Err(NotesError::Storage("invalid blob magic".into()));
        }

        let mut version = [0u8; 1];
        read_exact(&mut file, &mut version)?;
        if version[0] != BLOB_VERSION {
            return Err(NotesError::Storage(format!(
                "unsupported blob version: {}",
                version[0]
            )));
        }

        let mut len_bytes = [0u8; 8];
        read_exact(&mut file, &mut len_bytes)?;
        let len = u64::from_le_bytes(len_bytes);
        let remaining = file.metadata()?.len().saturating_sub(BLOB_OVERHEAD);
        if len > remaining {
            return Err(NotesError::Storage(format!(
                "blob length {len} exceeds file size ({remaining} payload bytes)"
            )));
        }

        let mut payload = vec![0u8; len as usize];
        read_exact(&mut file, &mut payload)?;

        let mut checksum_bytes = [0u8; 4];
        read_exact(&mut file, &mut checksum_bytes)?;
        let stored = u32::from_le_bytes(checksum_bytes);
        let computed = crc32fast::hash(&payload);
        if stored != computed {
            return Err(NotesError::Storage(format!(
                "checksum mismatch: expected {stored}, got {computed}"
            )));
        }

        Ok(Some(payload))
    }

    /// Replace the payload atomically.
    pub fn write(&self, payload: &[u8]) -> Result<()> {
        let tmp_path = self.path.with_extension("blob.tmp");
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(BLOB_MAGIC)?;
            file.write_all(&[BLOB_VERSION])?;
            file.write_all(&(payload.len() as u64).to_le_bytes())?;
            file.write_all(payload)?;
            file.write_all(&crc32fast::hash(payload).to_le_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

fn read_exact(file: &mut File, buf: &mut [u8]) -> Result<()> {
    file.read_exact(buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => NotesError::Storage("truncated blob".into()),
        _ => NotesError::from(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_read() {
        let dir = TempDir::new().unwrap();
        let blob = BlobFile::open(dir.path(), "notes").unwrap();

        assert!(blob.read().unwrap().is_none());
        blob.write(b"[1,2,3]").unwrap();
        assert_eq!(blob.read().unwrap().unwrap(), b"[1,2,3]");
        assert!(blob.exists());
    }

    #[test]
    fn test_overwrite_replaces_payload() {
        let dir = TempDir::new().unwrap();
        let blob = BlobFile::open(dir.path(), "notes").unwrap();

        blob.write(b"first, longer payload").unwrap();
        blob.write(b"second").unwrap();
        assert_eq!(blob.read().unwrap().unwrap(), b"second");
    }

    #[test]
    fn test_corruption_detected() {
        let dir = TempDir::new().unwrap();
        let blob = BlobFile::open(dir.path(), "notes").unwrap();
        blob.write(b"payload").unwrap();

        let mut bytes = fs::read(blob.path()).unwrap();
        bytes[14] ^= 0xff;
        fs::write(blob.path(), bytes).unwrap();

        let err = blob.read().unwrap_err();
        assert!(matches!(err, NotesError::Storage(_)));
    }

    #[test]
    fn test_truncated_blob() {
        let dir = TempDir::new().unwrap();
        let blob = BlobFile::open(dir.path(), "notes").unwrap();
        fs::write(blob.path(), b"NTS\0\x01").unwrap();

        assert!(matches!(blob.read(), Err(NotesError::Storage(_))));
    }

    #[test]
    fn test_corrupt_length_field() {
        let dir = TempDir::new().unwrap();
        let blob = BlobFile::open(dir.path(), "notes").unwrap();

        let mut bytes = b"NTS\0\x01".to_vec();
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        fs::write(blob.path(), &bytes).unwrap();
        assert!(matches!(blob.read(), Err(NotesError::Storage(_))));

        // Plausible but larger than the file.
        blob.write(b"[]").unwrap();
        let mut bytes = fs::read(blob.path()).unwrap();
        bytes[5..13].copy_from_slice(&1_000_000u64.to_le_bytes());
        fs::write(blob.path(), &bytes).unwrap();
        assert!(matches!(blob.read(), Err(NotesError::Storage(_))));
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let dir = TempDir::new().unwrap();
        assert!(BlobFile::open(dir.path(), "../escape").is_err());
        assert!(BlobFile::open(dir.path(), "").is_err());
    }
}
