//! MD5 digest type used for cache identity checks
//!
//! Stores digests as 16-byte arrays so that comparing a freshly downloaded
//! partial file against the cached copy is a plain byte comparison.

use std::fmt;
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::constants::io::DIGEST_BUFFER_SIZE;

/// MD5 digest stored as its raw 16-byte representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Md5Hash([u8; 16]);

impl Md5Hash {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Md5Hash(bytes)
    }

    /// Compute the digest of an in-memory buffer
    pub fn of_bytes(data: &[u8]) -> Self {
        Md5Hash(md5::compute(data).0)
    }

    /// Compute the digest of a file, streaming it in fixed-size chunks
    ///
    /// The whole file is never held in memory, so this is safe to call on
    /// large rasters.
    pub async fn of_file(path: &Path) -> std::io::Result<Self> {
        let mut file = File::open(path).await?;
        Self::of_reader(&mut file).await
    }

    /// Compute the digest of everything left in a reader
    pub async fn of_reader<R>(reader: &mut R) -> std::io::Result<Self>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut context = md5::Context::new();
        let mut buffer = vec![0u8; DIGEST_BUFFER_SIZE];

        loop {
            let read = reader.read(&mut buffer).await?;
            if read == 0 {
                break;
            }
            context.consume(&buffer[..read]);
        }

        Ok(Md5Hash(context.compute().0))
    }

    /// Get the raw byte array representation
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Convert the hash to a lowercase hex string
    pub fn to_hex(&self) -> String {
        use std::fmt::Write;
        self.0.iter().fold(String::with_capacity(32), |mut acc, b| {
            let _ = write!(&mut acc, "{:02x}", b);
            acc
        })
    }
}

impl fmt::Display for Md5Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_known_digest() {
        // RFC 1321 test vector
        let hash = Md5Hash::of_bytes(b"abc");
        assert_eq!(hash.to_hex(), "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(format!("{}", hash), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_from_bytes() {
        let bytes = [
            0x50, 0xc9, 0xd1, 0xc4, 0x65, 0xf3, 0xcb, 0xff, 0x65, 0x2b, 0xe1, 0x50, 0x9c, 0x2e,
            0x2a, 0x4e,
        ];

        let hash = Md5Hash::from_bytes(bytes);
        assert_eq!(hash.to_hex(), "50c9d1c465f3cbff652be1509c2e2a4e");
        assert_eq!(hash.as_bytes(), &bytes);
    }

    #[tokio::test]
    async fn test_file_digest_matches_buffer_digest() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tile.png");

        // Larger than one digest chunk so the streaming loop runs more than once
        let content: Vec<u8> = (0..(DIGEST_BUFFER_SIZE * 2 + 17))
            .map(|i| (i % 251) as u8)
            .collect();
        tokio::fs::write(&path, &content).await.unwrap();

        let from_file = Md5Hash::of_file(&path).await.unwrap();
        assert_eq!(from_file, Md5Hash::of_bytes(&content));
    }

    #[tokio::test]
    async fn test_reader_digest() {
        let mut reader: &[u8] = b"abc";
        let hash = Md5Hash::of_reader(&mut reader).await.unwrap();
        assert_eq!(hash, Md5Hash::of_bytes(b"abc"));
    }

    #[tokio::test]
    async fn test_missing_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = Md5Hash::of_file(&temp_dir.path().join("missing")).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_memory_efficiency() {
        assert_eq!(std::mem::size_of::<Md5Hash>(), 16);
    }
}
