//! Byte sources and sinks for the codecs.
//!
//! `std::io::Read + Seek` is the stream contract; the extra capability
//! queries let `StreamMap` pick its backing without downcasting.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use io_util::ReadEntireSeekableStream;
use memmap2::Mmap;

/// Random-access byte source feeding the codecs.
pub trait ReadStream: Read + Seek + std::fmt::Debug {
    /// The backing file, when the stream reads straight from one.
    fn backing_file(&self) -> Option<&File> {
        None
    }

    /// The whole stream contents, when they are already resident in memory.
    fn shared_buffer(&self) -> Option<Arc<[u8]>> {
        None
    }
}

impl<T: ReadStream + ?Sized> ReadStream for Box<T> {
    fn backing_file(&self) -> Option<&File> {
        (**self).backing_file()
    }

    fn shared_buffer(&self) -> Option<Arc<[u8]>> {
        (**self).shared_buffer()
    }
}

/// Buffered stream over a file on disk.
#[derive(Debug)]
pub struct FileStream {
    inner: BufReader<File>,
}

impl FileStream {
    pub fn new(file: File) -> Self {
        Self {
            inner: BufReader::new(file),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(File::open(path)?))
    }
}

impl Read for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Seek for FileStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl ReadStream for FileStream {
    fn backing_file(&self) -> Option<&File> {
        Some(self.inner.get_ref())
    }
}

/// Stream over a refcounted in-memory buffer.
#[derive(Debug)]
pub struct MemoryStream {
    data: Arc<[u8]>,
    at: u64,
}

impl MemoryStream {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            data: data.into(),
            at: 0,
        }
    }
}

impl Read for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let at = self.at as usize;
        // the cursor may sit past the end after a seek
        if at >= self.data.len() {
            return Ok(0);
        }
        let n = (self.data.len() - at).min(buf.len());
        buf[..n].copy_from_slice(&self.data[at..at + n]);
        self.at += n as u64;
        Ok(n)
    }
}

impl Seek for MemoryStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::Current(offset) => self.at as i64 + offset,
            SeekFrom::End(offset) => self.data.len() as i64 + offset,
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of stream",
            ));
        }
        self.at = target as u64;
        Ok(self.at)
    }
}

impl ReadStream for MemoryStream {
    fn shared_buffer(&self) -> Option<Arc<[u8]>> {
        Some(self.data.clone())
    }
}

#[derive(Debug)]
enum Backing {
    Mapped(Mmap),
    Shared(Arc<[u8]>),
    Owned(Box<[u8]>),
}

/// Maps the entire contents of a stream into memory.
///
/// Strategies, in order: mmap the backing file read-only, alias an already
/// in-memory buffer, or fall back to reading the whole stream into an owned
/// copy. With `fail_on_copy` the fallback is an error instead and the stream
/// is handed back to the caller.
#[derive(Debug)]
pub struct StreamMap {
    stream: Box<dyn ReadStream>,
    backing: Backing,
}

impl StreamMap {
    pub fn new(
        mut stream: Box<dyn ReadStream>,
        fail_on_copy: bool,
    ) -> Result<Self, (Box<dyn ReadStream>, io::Error)> {
        if let Some(file) = stream.backing_file() {
            // Mapping may fail for pipes or exotic mounts. That's not an
            // error, the read fallback below still works.
            // Safety: the mapping is read-only and the file stays owned by
            // the stream for the lifetime of the map.
            match unsafe { Mmap::map(file) } {
                Ok(map) => {
                    return Ok(Self {
                        stream,
                        backing: Backing::Mapped(map),
                    });
                }
                Err(err) => {
                    log::debug!("mmap failed, falling back to stream read: {err}");
                }
            }
        }

        if let Some(data) = stream.shared_buffer() {
            return Ok(Self {
                stream,
                backing: Backing::Shared(data),
            });
        }

        if fail_on_copy {
            let err = io::Error::new(
                io::ErrorKind::Unsupported,
                "stream cannot be mapped without a copy",
            );
            return Err((stream, err));
        }

        match stream.read_seekable_to_end() {
            Ok(data) => Ok(Self {
                stream,
                backing: Backing::Owned(data),
            }),
            Err(err) => Err((stream, err)),
        }
    }

    /// The mapped bytes, spanning the entire stream.
    pub fn data(&self) -> &[u8] {
        match &self.backing {
            Backing::Mapped(map) => map,
            Backing::Shared(data) => data,
            Backing::Owned(data) => data,
        }
    }

    pub fn len(&self) -> usize {
        self.data().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data().is_empty()
    }

    /// Drops the mapping and returns the stream.
    pub fn release(self) -> Box<dyn ReadStream> {
        self.stream
    }
}
