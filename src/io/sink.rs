//! Where dumped text goes and where loaded text comes from.

use super::error::Error;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Target of a dump.
pub enum Destination<'a> {
    /// Return the rendered content to the caller.
    InMemory,
    /// Create (or truncate) the file, write, and close it before returning.
    Path(PathBuf),
    /// Write into a caller-owned stream. The stream is flushed but never closed.
    Stream(&'a mut dyn Write),
}

impl Destination<'_> {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Destination::Path(path.into())
    }

    pub fn is_in_memory(&self) -> bool {
        matches!(self, Destination::InMemory)
    }

    pub(crate) fn as_path(&self) -> Option<&Path> {
        match self {
            Destination::Path(path) => Some(path),
            _ => None,
        }
    }
}

impl fmt::Debug for Destination<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::InMemory => f.write_str("InMemory"),
            Destination::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Destination::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// What a writer produced once the destination has been resolved.
#[derive(Debug)]
pub(crate) enum Delivered {
    Text(String),
    Written,
}

/// Renders with `write`, then hands the bytes to the resolved destination.
///
/// Nothing reaches a file or stream unless `write` succeeds. Files opened here are dropped on
/// every return path, errors included.
pub(crate) fn deliver<F>(destination: Destination<'_>, write: F) -> Result<Delivered, Error>
where
    F: FnOnce(&mut dyn Write) -> Result<(), Error>,
{
    let mut buffer = Vec::new();
    let rendered = write(&mut buffer);

    match destination {
        Destination::InMemory => {
            rendered?;
            String::from_utf8(buffer)
                .map(Delivered::Text)
                .map_err(|e| Error::inconsistent_data("output", None, e.to_string()))
        }
        Destination::Path(path) => {
            rendered.map_err(|e| e.with_path(&path))?;
            let file = File::create(&path).map_err(|e| Error::from_io(e, Some(path.clone())))?;
            let mut writer = BufWriter::new(file);
            writer
                .write_all(&buffer)
                .and_then(|()| writer.flush())
                .map_err(|e| Error::from_io(e, Some(path.clone())))?;
            tracing::debug!(path = %path.display(), bytes = buffer.len(), "wrote file");
            Ok(Delivered::Written)
        }
        Destination::Stream(stream) => {
            rendered?;
            stream
                .write_all(&buffer)
                .and_then(|()| stream.flush())
                .map_err(|e| Error::from_io(e, None))?;
            Ok(Delivered::Written)
        }
    }
}

/// Origin of a load.
pub enum Source<'a> {
    /// Content already in memory.
    Text(&'a str),
    /// File opened and closed by the loader.
    Path(PathBuf),
    /// Caller-owned buffered reader.
    Reader(&'a mut dyn BufRead),
}

impl Source<'_> {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Source::Path(path.into())
    }
}

impl fmt::Debug for Source<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Text(text) => f.debug_tuple("Text").field(&text.len()).finish(),
            Source::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Source::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

/// Runs `read` against the resolved source.
pub(crate) fn consume<T, F>(source: Source<'_>, read: F) -> Result<T, Error>
where
    F: FnOnce(&mut dyn BufRead) -> Result<T, Error>,
{
    match source {
        Source::Text(text) => {
            let mut bytes = text.as_bytes();
            read(&mut bytes)
        }
        Source::Path(path) => {
            let file = File::open(&path).map_err(|e| Error::from_io(e, Some(path.clone())))?;
            let mut reader = BufReader::new(file);
            read(&mut reader).map_err(|e| e.with_path(&path))
        }
        Source::Reader(reader) => read(reader),
    }
}

/// Reads every line, tagging each with its 1-based line number.
pub(crate) fn numbered_lines(reader: &mut dyn BufRead) -> Result<Vec<(usize, String)>, Error> {
    reader
        .lines()
        .enumerate()
        .map(|(i, line)| {
            line.map(|l| (i + 1, l))
                .map_err(|e| Error::from_io(e, None))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn hello(writer: &mut dyn Write) -> Result<(), Error> {
        writer
            .write_all(b"hello\n")
            .map_err(|e| Error::from_io(e, None))
    }

    #[test]
    fn in_memory_returns_text() {
        match deliver(Destination::InMemory, hello).unwrap() {
            Delivered::Text(text) => assert_eq!(text, "hello\n"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn stream_receives_bytes_and_stays_usable() {
        let mut buffer: Vec<u8> = Vec::new();
        let delivered = deliver(Destination::Stream(&mut buffer), hello).unwrap();
        assert!(matches!(delivered, Delivered::Written));
        buffer.extend_from_slice(b"more");
        assert_eq!(buffer, b"hello\nmore");
    }

    fn half_then_fail(writer: &mut dyn Write) -> Result<(), Error> {
        hello(writer)?;
        Err(Error::inconsistent_data("test", None, "second half"))
    }

    #[test]
    fn failed_render_leaves_stream_untouched() {
        let mut buffer: Vec<u8> = Vec::new();
        assert!(deliver(Destination::Stream(&mut buffer), half_then_fail).is_err());
        assert!(buffer.is_empty());
    }

    #[test]
    fn failed_render_creates_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let err = deliver(Destination::path(&path), half_then_fail).unwrap_err();
        assert!(err.to_string().contains("out.txt"), "{err}");
        assert!(!path.exists());
    }

    #[test]
    fn path_destination_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        deliver(Destination::path(&path), hello).unwrap();

        let mut content = String::new();
        File::open(&path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "hello\n");
    }

    #[test]
    fn missing_source_file_reports_path() {
        let err = consume(Source::path("/nonexistent/input.data"), |_| Ok(())).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/input.data"));
    }

    #[test]
    fn numbered_lines_start_at_one() {
        let lines = consume(Source::Text("a\nb\n"), numbered_lines).unwrap();
        assert_eq!(lines, vec![(1, "a".to_string()), (2, "b".to_string())]);
    }
}
