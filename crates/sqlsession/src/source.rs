//! Configuration sources accepted by the builder.
//!
//! A source is either a stream that still has to be parsed ([`ConfigStream`],
//! text or bytes) or a [`Configuration`] that was already resolved. Streams
//! are handed over to the builder by value; the builder closes them before it
//! returns, whatever the outcome.

use std::fmt;
use std::io::{self, Read};

use sqlsession_core::Configuration;

/// A readable stream with an explicit, fallible close.
///
/// Implement this for readers whose release can fail (sockets, pipes, test
/// doubles). Plain readers can be passed to [`ConfigStream::text`] or
/// [`ConfigStream::bytes`] directly; they are closed by being dropped.
pub trait CloseableRead: Read + Send {
    /// Release the underlying resource. Called exactly once by the builder.
    fn close(&mut self) -> io::Result<()>;
}

/// Adapter giving any [`Read`] a close that drops the inner reader.
#[derive(Debug)]
pub struct OwnedReader<R> {
    inner: Option<R>,
}

impl<R> OwnedReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner: Some(inner) }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }
}

impl<R: Read> Read for OwnedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner.as_mut() {
            Some(reader) => reader.read(buf),
            None => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "configuration stream already closed",
            )),
        }
    }
}

impl<R: Read + Send> CloseableRead for OwnedReader<R> {
    fn close(&mut self) -> io::Result<()> {
        drop(self.inner.take());
        Ok(())
    }
}

/// How the bytes of a stream are to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// A character stream; must already be UTF-8 text.
    Text,
    /// A raw byte stream; a UTF-8 byte order mark is tolerated.
    Bytes,
}

/// An open configuration stream, owned by the builder for one call.
pub struct ConfigStream {
    kind: StreamKind,
    reader: Box<dyn CloseableRead>,
}

impl ConfigStream {
    /// Wrap a character stream.
    pub fn text<R: Read + Send + 'static>(reader: R) -> Self {
        Self::text_closeable(OwnedReader::new(reader))
    }

    /// Wrap a byte stream.
    pub fn bytes<R: Read + Send + 'static>(reader: R) -> Self {
        Self::bytes_closeable(OwnedReader::new(reader))
    }

    /// Wrap a character stream with its own close behavior.
    pub fn text_closeable<R: CloseableRead + 'static>(reader: R) -> Self {
        Self {
            kind: StreamKind::Text,
            reader: Box::new(reader),
        }
    }

    /// Wrap a byte stream with its own close behavior.
    pub fn bytes_closeable<R: CloseableRead + 'static>(reader: R) -> Self {
        Self {
            kind: StreamKind::Bytes,
            reader: Box::new(reader),
        }
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub(crate) fn into_parts(self) -> (StreamKind, Box<dyn CloseableRead>) {
        (self.kind, self.reader)
    }
}

impl fmt::Debug for ConfigStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigStream")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Anything the builder can turn into a session factory.
#[derive(Debug)]
pub enum ConfigurationSource {
    /// A stream that still has to be parsed.
    Stream(ConfigStream),
    /// An already-resolved configuration; no parsing, no stream to close.
    Parsed(Configuration),
}

impl From<ConfigStream> for ConfigurationSource {
    fn from(stream: ConfigStream) -> Self {
        ConfigurationSource::Stream(stream)
    }
}

impl From<Configuration> for ConfigurationSource {
    fn from(configuration: Configuration) -> Self {
        ConfigurationSource::Parsed(configuration)
    }
}
