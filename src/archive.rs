//! Tar streaming of cached directories.
//!
//! `tar` is synchronous, so archiving and unpacking run on the blocking pool
//! and exchange fixed-size chunks with the async side over bounded channels.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const CHUNK_SIZE: usize = 256 * 1024;
const CHANNEL_DEPTH: usize = 8;

/// Blocking writer that forwards full chunks to an async receiver.
struct ChunkWriter {
    tx: mpsc::Sender<Vec<u8>>,
    buf: Vec<u8>,
}

impl ChunkWriter {
    fn flush_buffer(&mut self) -> io::Result<()> {
        if !self.buf.is_empty() {
            let chunk = std::mem::replace(&mut self.buf, Vec::with_capacity(CHUNK_SIZE));
            self.tx
                .blocking_send(chunk)
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "archive reader went away"))?;
        }
        Ok(())
    }
}

impl Write for ChunkWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let room = CHUNK_SIZE - self.buf.len();
        let n = data.len().min(room);
        self.buf.extend_from_slice(&data[..n]);
        if self.buf.len() >= CHUNK_SIZE {
            self.flush_buffer()?;
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_buffer()
    }
}

/// Blocking reader fed by chunks from the async side.
struct ChunkReader {
    rx: mpsc::Receiver<Vec<u8>>,
    buf: Vec<u8>,
    pos: usize,
}

impl Read for ChunkReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.buf.len() {
            match self.rx.blocking_recv() {
                Some(chunk) => {
                    self.buf = chunk;
                    self.pos = 0;
                }
                None => return Ok(0),
            }
        }
        let n = out.len().min(self.buf.len() - self.pos);
        out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Start archiving the contents of `dir`.
///
/// Entries are stored relative to `dir`. Chunks arrive on the returned
/// receiver; the channel closes when the archive is complete or failed, and
/// the join handle reports which.
pub fn spawn_archiver(dir: PathBuf) -> (mpsc::Receiver<Vec<u8>>, JoinHandle<io::Result<()>>) {
    let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
    let task = tokio::task::spawn_blocking(move || {
        let mut writer = ChunkWriter {
            tx,
            buf: Vec::with_capacity(CHUNK_SIZE),
        };
        {
            let mut builder = tar::Builder::new(&mut writer);
            builder.follow_symlinks(false);
            builder.append_dir_all("", &dir)?;
            builder.finish()?;
        }
        writer.flush()
    });
    (rx, task)
}

/// Start unpacking an archive into `dest`, which is created if missing.
pub fn spawn_unpacker(dest: &Path) -> (mpsc::Sender<Vec<u8>>, JoinHandle<io::Result<()>>) {
    let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
    let dest = dest.to_path_buf();
    let task = tokio::task::spawn_blocking(move || {
        std::fs::create_dir_all(&dest)?;
        let reader = ChunkReader {
            rx,
            buf: Vec::new(),
            pos: 0,
        };
        let mut archive = tar::Archive::new(reader);
        archive.set_overwrite(true);
        archive.unpack(&dest)
    });
    (tx, task)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn archive_then_unpack_reproduces_tree() {
        let src = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("a.txt"), b"alpha").unwrap();
        std::fs::create_dir(src.path().join("nested")).unwrap();
        std::fs::write(src.path().join("nested").join("b.bin"), vec![7u8; 600_000]).unwrap();

        let dst = tempfile::tempdir().unwrap();
        let target = dst.path().join("copy");

        let (mut chunks, archiver) = spawn_archiver(src.path().to_path_buf());
        let (sink, unpacker) = spawn_unpacker(&target);
        while let Some(chunk) = chunks.recv().await {
            sink.send(chunk).await.unwrap();
        }
        drop(sink);
        archiver.await.unwrap().unwrap();
        unpacker.await.unwrap().unwrap();

        assert_eq!(std::fs::read(target.join("a.txt")).unwrap(), b"alpha");
        assert_eq!(
            std::fs::read(target.join("nested").join("b.bin")).unwrap(),
            vec![7u8; 600_000]
        );
    }
}
