//! Destinations for shards.

use crate::Error;
use sha2::{Digest as _, Sha256};
use std::{
    fs::{self, File},
    io::{self, BufWriter},
    path::{Path, PathBuf},
};
use tracing::info;
use w3up_car::{link::CAR, Link};

/// A destination that accepts shards one at a time.
pub trait ShardStore {
    /// Consumes `shard` to its end and returns the link naming its bytes.
    fn put(&mut self, shard: &mut dyn io::Read) -> Result<Link, Error>;
}

/// Hashes everything written through it.
struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
}

impl<W: io::Write> io::Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Stores each shard in a directory as `<link>.car`.
///
/// A shard is streamed to a temporary file in the same directory while it is hashed, and only
/// renamed once it has been read in full, so a failed shard never leaves a named file behind.
pub struct FileStore {
    dir: PathBuf,
    stored: usize,
}

impl FileStore {
    /// Creates a store in `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, Error> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, stored: 0 })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The path of a stored shard.
    pub fn path(&self, link: &Link) -> PathBuf {
        self.dir.join(format!("{link}.car"))
    }

    fn write(&self, partial: &Path, shard: &mut dyn io::Read) -> Result<(Link, u64), Error> {
        let mut writer = HashingWriter {
            inner: BufWriter::new(File::create(partial)?),
            hasher: Sha256::new(),
        };
        let len = io::copy(shard, &mut writer).map_err(Error::from_read)?;
        let file = writer.inner.into_inner().map_err(|err| err.into_error())?;
        file.sync_all()?;

        let digest = writer.hasher.finalize();
        Ok((Link::from_sha256(CAR, digest.into()), len))
    }
}

impl ShardStore for FileStore {
    fn put(&mut self, shard: &mut dyn io::Read) -> Result<Link, Error> {
        let partial = self.dir.join(format!(".shard-{}.partial", self.stored));
        let (link, len) = match self.write(&partial, shard) {
            Ok(stored) => stored,
            Err(err) => {
                let _ = fs::remove_file(&partial);
                return Err(err);
            }
        };

        let path = self.path(&link);
        fs::rename(&partial, &path)?;
        self.stored += 1;
        info!(%link, len, path = %path.display(), "stored shard");
        Ok(link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use w3up_car::link::SHA2_256;

    /// Fails after yielding some bytes.
    struct Failing {
        remaining: usize,
    }

    impl io::Read for Failing {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.remaining == 0 {
                return Err(io::Error::other(w3up_car::Error::InvalidSection("boom")));
            }
            let n = self.remaining.min(buf.len());
            buf[..n].fill(0xAB);
            self.remaining -= n;
            Ok(n)
        }
    }

    #[test]
    fn test_put() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("shards")).unwrap();

        let bytes = b"not really an archive".to_vec();
        let link = store.put(&mut &bytes[..]).unwrap();
        assert_eq!(link.codec(), CAR);
        assert_eq!(link.hash(), SHA2_256);
        assert_eq!(link.digest(), Sha256::digest(&bytes).as_slice());
        assert!(link.to_string().starts_with("bagb"));

        let mut stored = Vec::new();
        File::open(store.path(&link))
            .unwrap()
            .read_to_end(&mut stored)
            .unwrap();
        assert_eq!(stored, bytes);

        // Only the named shard remains.
        let entries: Vec<_> = fs::read_dir(store.dir()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_put_same_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path()).unwrap();
        let a = store.put(&mut &b"same"[..]).unwrap();
        let b = store.put(&mut &b"same"[..]).unwrap();
        assert_eq!(a, b);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_put_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path()).unwrap();
        let result = store.put(&mut Failing { remaining: 10_000 });
        assert!(matches!(
            result,
            Err(Error::Car(w3up_car::Error::InvalidSection("boom")))
        ));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
