//! File storage seen by the servers
//!
//! Servers only need existence, regularity, size and a byte stream. Any
//! backend implementing [`FileStore`] can be served.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

use tokio::sync::mpsc;

/// Storage collaborator of both servers
pub trait FileStore {
    /// Whether anything exists under `name`
    fn exists(&self, name: &str) -> bool;

    /// Whether `name` is an ordinary file
    fn is_regular_file(&self, name: &str) -> bool;

    /// Size of `name` in bytes
    fn size(&self, name: &str) -> io::Result<u64>;

    /// Open `name` for reading
    fn open(&self, name: &str) -> io::Result<Box<dyn Read + Send>>;

    /// Size of `name` if it can be served, `None` if it is not found
    fn lookup(&self, name: &str) -> io::Result<Option<u64>> {
        if !self.exists(name) || !self.is_regular_file(name) {
            return Ok(None);
        }
        self.size(name).map(Some)
    }
}

/// Files on the local disk, resolved against a root directory
///
/// Request names are not sanitized: `..` components walk out of the root and
/// an absolute name replaces it.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl FileStore for LocalStore {
    fn exists(&self, name: &str) -> bool {
        self.path(name).exists()
    }

    fn is_regular_file(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    fn size(&self, name: &str) -> io::Result<u64> {
        Ok(self.path(name).metadata()?.len())
    }

    fn open(&self, name: &str) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(self.path(name))?))
    }
}

/// Files held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file
    pub fn insert(&mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.files.insert(name.into(), content.into());
    }

    /// Builder form of [`MemoryStore::insert`]
    pub fn with_file(mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(name, content);
        self
    }
}

impl FileStore for MemoryStore {
    fn exists(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    fn is_regular_file(&self, name: &str) -> bool {
        self.exists(name)
    }

    fn size(&self, name: &str) -> io::Result<u64> {
        self.files
            .get(name)
            .map(|content| content.len() as u64)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    fn open(&self, name: &str) -> io::Result<Box<dyn Read + Send>> {
        let content = self
            .files
            .get(name)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
        Ok(Box::new(Cursor::new(content.clone())))
    }
}

/// Read until `buf` is full or the reader is exhausted
///
/// Returns the number of bytes read; anything short of `buf.len()` means end
/// of file. Chunk boundaries therefore never depend on how the reader splits
/// its data.
pub fn read_chunk<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Iterator over exact-size chunks of a reader; only the last may be short
pub struct ChunkReader<R> {
    reader: R,
    buf: Vec<u8>,
    done: bool,
}

impl<R: Read> ChunkReader<R> {
    pub fn new(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            buf: vec![0u8; chunk_size],
            done: false,
        }
    }
}

impl<R: Read> Iterator for ChunkReader<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match read_chunk(&mut self.reader, &mut self.buf) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(n) => Some(Ok(self.buf[..n].to_vec())),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Number of items a background reader may run ahead of its consumer
const READ_AHEAD: usize = 4;

/// Run a blocking iterator on the blocking pool and hand its items over a channel
///
/// The iterator stops early once the receiver is dropped.
pub fn spawn_blocking_iter<I>(iter: I) -> mpsc::Receiver<I::Item>
where
    I: Iterator + Send + 'static,
    I::Item: Send + 'static,
{
    let (tx, rx) = mpsc::channel(READ_AHEAD);
    tokio::task::spawn_blocking(move || {
        for item in iter {
            if tx.blocking_send(item).is_err() {
                log::debug!("Reader dropped, stopping background read");
                break;
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    /// Reader returning at most three bytes per call
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.0.len().min(buf.len()).min(3);
            buf[..n].copy_from_slice(&self.0[..n]);
            self.0 = &self.0[n..];
            Ok(n)
        }
    }

    #[test]
    fn read_chunk_fills_across_short_reads() {
        let mut reader = Trickle(b"Hello World");
        let mut buf = [0u8; 8];
        assert_eq!(read_chunk(&mut reader, &mut buf).unwrap(), 8);
        assert_eq!(&buf, b"Hello Wo");
        assert_eq!(read_chunk(&mut reader, &mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"rld");
        assert_eq!(read_chunk(&mut reader, &mut buf).unwrap(), 0);
    }

    #[test]
    fn chunk_reader_yields_exact_chunks() {
        let chunks: Vec<Vec<u8>> = ChunkReader::new(Trickle(b"Hello World"), 4)
            .collect::<io::Result<_>>()
            .unwrap();
        assert_eq!(chunks, vec![b"Hell".to_vec(), b"o Wo".to_vec(), b"rld".to_vec()]);
    }

    #[tokio::test]
    async fn background_reader_delivers_in_order() {
        let content: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        let mut rx = spawn_blocking_iter(ChunkReader::new(Cursor::new(content.clone()), 1024));

        let mut rebuilt = Vec::new();
        let mut count = 0;
        while let Some(chunk) = rx.recv().await {
            rebuilt.extend_from_slice(&chunk.unwrap());
            count += 1;
        }
        assert_eq!(count, 5);
        assert_eq!(rebuilt, content);
    }

    #[test]
    fn memory_store_lookup() {
        let store = MemoryStore::new().with_file("test.txt", "Hello World");
        assert_eq!(store.lookup("test.txt").unwrap(), Some(11));
        assert_eq!(store.lookup("missing.txt").unwrap(), None);

        let mut content = String::new();
        store
            .open("test.txt")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "Hello World");
    }

    #[test]
    #[serial]
    fn local_store_serves_regular_files_only() {
        let dir = std::env::temp_dir().join("xfer_storage_test");
        std::fs::create_dir_all(dir.join("subdir")).unwrap();
        std::fs::write(dir.join("test.txt"), b"Hello World").unwrap();

        let store = LocalStore::new(&dir);
        assert_eq!(store.lookup("test.txt").unwrap(), Some(11));
        assert!(store.exists("subdir"));
        assert_eq!(store.lookup("subdir").unwrap(), None);
        assert_eq!(store.lookup("nope.txt").unwrap(), None);
        assert_eq!(store.lookup("").unwrap(), None);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
