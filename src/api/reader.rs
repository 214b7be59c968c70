//! Purpose: Load one encoded source and hand out typed cursors over its records.
//! Exports: `Reader`, `ReaderOptions`.
//! Role: Public decode entry point; wraps the codec layer with source handling.
//! Invariants: The source is read fully and validated as UTF-8 at construction.
//! Invariants: Each decode call re-scans the text; one cursor covers exactly one kind.
//! Invariants: Delimiter changes affect only later decode calls.
#![allow(clippy::result_large_err)]

use crate::codec::{self, CodecConfig, Delimiter, Format};
use crate::core::cursor::Cursor;
use crate::core::entity::{Record, RecordKind};
use crate::core::error::{Error, ErrorKind};
use crate::core::numeric::Numeric;
use crate::core::plate::Plate;
use crate::core::stack::Stack;
use crate::core::well::Well;
use crate::core::well_set::WellSet;
use bstr::ByteSlice;
use std::fs::File;
use std::io::{BufReader, Read};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReaderOptions {
    pub format: Format,
    pub delimiter: Delimiter,
    pub buffer_size: usize,
}

impl ReaderOptions {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            delimiter: Delimiter::default(),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }
}

/// Decoder over one fully loaded source, generic over the well value type.
#[derive(Debug)]
pub struct Reader<N> {
    text: Option<String>,
    format: Format,
    delimiter: Delimiter,
    path: Option<PathBuf>,
    _values: PhantomData<N>,
}

impl<N: Numeric> Reader<N> {
    pub fn open(path: impl AsRef<Path>, options: ReaderOptions) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to open input file")
                .with_path(path)
                .with_source(err)
        })?;
        let mut reader = Self::from_reader(file, options).map_err(|err| err.with_path(path))?;
        reader.path = Some(path.to_path_buf());
        Ok(reader)
    }

    pub fn from_reader(source: impl Read, options: ReaderOptions) -> Result<Self, Error> {
        let mut bytes = Vec::new();
        BufReader::with_capacity(options.buffer_size, source)
            .read_to_end(&mut bytes)
            .map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to read input")
                    .with_source(err)
            })?;
        let text = bytes.to_str().map_err(|err| {
            let offset = err.valid_up_to();
            let tail = &bytes[offset..bytes.len().min(offset + 16)];
            Error::new(ErrorKind::Malformed)
                .with_message("input is not valid utf-8")
                .with_offset(offset as u64)
                .with_hint(format!("bytes near the error: {:?}", tail.to_str_lossy()))
                .with_source(err)
        })?;
        Ok(Self::from_text(text, options))
    }

    pub fn from_text(text: impl Into<String>, options: ReaderOptions) -> Self {
        let mut text = text.into();
        if text.starts_with('\u{feff}') {
            text.drain(..'\u{feff}'.len_utf8());
        }
        Self {
            text: Some(text),
            format: options.format,
            delimiter: options.delimiter,
            path: None,
            _values: PhantomData,
        }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn delimiter(&self) -> Delimiter {
        self.delimiter
    }

    pub fn set_delimiter(&mut self, delimiter: Delimiter) {
        self.delimiter = delimiter;
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_closed(&self) -> bool {
        self.text.is_none()
    }

    fn text(&self) -> Result<&str, Error> {
        self.text.as_deref().ok_or_else(|| {
            let err = Error::new(ErrorKind::Usage).with_message("reader is closed");
            match &self.path {
                Some(path) => err.with_path(path),
                None => err,
            }
        })
    }

    fn attach_path(&self, err: Error) -> Error {
        match (&self.path, err.path()) {
            (Some(path), None) => err.with_path(path),
            _ => err,
        }
    }

    /// Decodes every record of kind `K` into a fresh cursor positioned at the start.
    pub fn decode<K: Record<N>>(&self) -> Result<Cursor<K>, Error> {
        let text = self.text()?;
        let config = CodecConfig::new().with_delimiter(self.delimiter);
        let records = codec::decode_all::<N, K>(self.format, text, &config)
            .map_err(|err| self.attach_path(err))?;
        tracing::debug!(
            format = %self.format,
            kind = %K::KIND,
            records = records.len(),
            bytes = text.len(),
            "decoded records"
        );
        Ok(Cursor::new(records))
    }

    pub fn wells(&self) -> Result<Cursor<Well<N>>, Error> {
        self.decode()
    }

    pub fn sets(&self) -> Result<Cursor<WellSet<N>>, Error> {
        self.decode()
    }

    pub fn plates(&self) -> Result<Cursor<Plate<N>>, Error> {
        self.decode()
    }

    pub fn stacks(&self) -> Result<Cursor<Stack<N>>, Error> {
        self.decode()
    }

    /// Kind of the first record, or `None` for a source without records.
    pub fn detect_kind(&self) -> Result<Option<RecordKind>, Error> {
        codec::detect_kind(self.format, self.text()?).map_err(|err| self.attach_path(err))
    }

    pub fn close(&mut self) {
        if self.text.take().is_some() {
            tracing::trace!(format = %self.format, "reader closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Reader, ReaderOptions};
    use crate::codec::{Delimiter, Format};
    use crate::core::entity::RecordKind;
    use crate::core::error::ErrorKind;
    use std::io::Cursor as IoCursor;

    const GRID: &str = "P\n;1;2\nA;1;2\n";

    #[test]
    fn invalid_utf8_reports_offset() {
        let bytes = b"\t1\nA\t\xff\n".to_vec();
        let err =
            Reader::<f64>::from_reader(IoCursor::new(bytes), ReaderOptions::new(Format::PlateMap))
                .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
        assert_eq!(err.offset(), Some(5));
    }

    #[test]
    fn bom_is_stripped() {
        let mut bytes = b"\xEF\xBB\xBF".to_vec();
        bytes.extend_from_slice(b"{\"kind\":\"set\",\"label\":\"x\"}");
        let reader =
            Reader::<i32>::from_reader(IoCursor::new(bytes), ReaderOptions::new(Format::Json))
                .unwrap();
        assert_eq!(reader.detect_kind().unwrap(), Some(RecordKind::Set));
        assert_eq!(reader.sets().unwrap().all()[0].label(), "x");

        let reader = Reader::<i32>::from_text("\u{feff}", ReaderOptions::new(Format::Json));
        assert_eq!(reader.detect_kind().unwrap(), None);
    }

    #[test]
    fn only_one_bom_is_stripped() {
        let mut bytes = "\u{feff}\u{feff}".as_bytes().to_vec();
        bytes.extend_from_slice(b"L\nA1\t1\n");
        let reader = Reader::<i32>::from_reader(
            IoCursor::new(bytes),
            ReaderOptions::new(Format::ResultTable),
        )
        .unwrap();
        assert_eq!(reader.sets().unwrap().all()[0].label(), "\u{feff}L");
    }

    #[test]
    fn delimiter_change_applies_to_later_decodes() {
        let mut reader = Reader::<i32>::from_text(GRID, ReaderOptions::new(Format::PlateMap));
        assert_eq!(reader.delimiter(), Delimiter::Tab);
        assert!(reader.plates().is_err());

        reader.set_delimiter(Delimiter::Semicolon);
        let plates = reader.plates().unwrap();
        assert_eq!(plates.len(), 1);
        assert_eq!(plates.all()[0].label(), "P");
    }

    #[test]
    fn each_decode_returns_a_fresh_cursor() {
        let options = ReaderOptions::new(Format::PlateMap).with_delimiter(Delimiter::Semicolon);
        let reader = Reader::<i32>::from_text(GRID, options);
        let mut first = reader.plates().unwrap();
        assert!(first.next().is_some());
        let second = reader.plates().unwrap();
        assert_eq!(second.position(), 0);
        assert!(second.has_next());
    }

    #[test]
    fn decoding_after_close_is_usage_error() {
        let mut reader = Reader::<f64>::from_text("", ReaderOptions::new(Format::Xml));
        reader.close();
        reader.close();
        assert!(reader.is_closed());
        assert_eq!(reader.plates().unwrap_err().kind(), ErrorKind::Usage);
        assert_eq!(reader.detect_kind().unwrap_err().kind(), ErrorKind::Usage);
    }

    #[test]
    fn unsupported_kind_is_usage_error() {
        let reader = Reader::<f64>::from_text("", ReaderOptions::new(Format::ResultTable));
        assert_eq!(reader.plates().unwrap_err().kind(), ErrorKind::Usage);
        assert!(reader.sets().unwrap().is_empty());
    }
}
