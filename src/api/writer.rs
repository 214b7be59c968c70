//! Purpose: Encode entities to strings or a buffered sink in any supported format.
//! Exports: `Writer`, `WriterOptions`.
//! Role: Public encode entry point; every call shape funnels into `codec::encode_many`.
//! Invariants: Label-list length is checked before any byte reaches the sink.
//! Invariants: Consecutive writes to a delimited sink stay separated into blocks.
//! Invariants: `close` flushes once; later writes are usage errors.
#![allow(clippy::result_large_err)]

use crate::codec::{self, CodecConfig, Delimiter, Format};
use crate::core::entity::{AsEntity, Entity, EntityRef};
use crate::core::error::{Error, ErrorKind};
use crate::core::numeric::Numeric;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriterOptions {
    pub format: Format,
    pub delimiter: Delimiter,
    pub pretty: bool,
    pub buffer_size: usize,
}

impl WriterOptions {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            delimiter: Delimiter::default(),
            pretty: false,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }
}

pub struct Writer<W: Write> {
    sink: Option<BufWriter<W>>,
    format: Format,
    config: CodecConfig,
    path: Option<PathBuf>,
    records_written: usize,
}

impl Writer<File> {
    pub fn create(path: impl AsRef<Path>, options: WriterOptions) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to create output file")
                .with_path(path)
                .with_source(err)
        })?;
        let mut writer = Self::new(file, options);
        writer.path = Some(path.to_path_buf());
        Ok(writer)
    }
}

impl<W: Write> Writer<W> {
    pub fn new(sink: W, options: WriterOptions) -> Self {
        Self {
            sink: Some(BufWriter::with_capacity(options.buffer_size, sink)),
            format: options.format,
            config: CodecConfig::new()
                .with_delimiter(options.delimiter)
                .with_pretty(options.pretty),
            path: None,
            records_written: 0,
        }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn delimiter(&self) -> Delimiter {
        self.config.delimiter
    }

    pub fn set_delimiter(&mut self, delimiter: Delimiter) {
        self.config.delimiter = delimiter;
    }

    pub fn pretty(&self) -> bool {
        self.config.pretty
    }

    pub fn set_pretty(&mut self, pretty: bool) {
        self.config.pretty = pretty;
    }

    pub fn is_closed(&self) -> bool {
        self.sink.is_none()
    }

    /// Number of records written to the sink so far.
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    pub fn render<N: Numeric, E: AsEntity<N>>(&self, entity: &E) -> Result<String, Error> {
        self.encode(&[entity.as_entity()])
    }

    pub fn render_all<N: Numeric, E: AsEntity<N>>(&self, entities: &[E]) -> Result<String, Error> {
        let refs: Vec<EntityRef<'_, N>> =
            entities.iter().map(|entity| entity.as_entity()).collect();
        self.encode(&refs)
    }

    /// Renders `entity` with `label` in place of its own label.
    pub fn render_with_label<N: Numeric, E: AsEntity<N>>(
        &self,
        entity: &E,
        label: &str,
    ) -> Result<String, Error> {
        let relabeled = relabel(entity.as_entity(), label)?;
        self.encode(&[relabeled.borrowed()])
    }

    /// Renders `entities[i]` with `labels[i]`; the two slices must match in length.
    pub fn render_labeled<N: Numeric, E: AsEntity<N>, L: AsRef<str>>(
        &self,
        entities: &[E],
        labels: &[L],
    ) -> Result<String, Error> {
        if entities.len() != labels.len() {
            return Err(Error::new(ErrorKind::LabelCountMismatch)
                .with_message(format!(
                    "{} labels supplied for {} records",
                    labels.len(),
                    entities.len()
                ))
                .with_hint("Pass exactly one label per record."));
        }
        let relabeled = entities
            .iter()
            .zip(labels)
            .map(|(entity, label)| relabel(entity.as_entity(), label.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let refs: Vec<EntityRef<'_, N>> = relabeled.iter().map(Entity::borrowed).collect();
        self.encode(&refs)
    }

    pub fn write<N: Numeric, E: AsEntity<N>>(&mut self, entity: &E) -> Result<(), Error> {
        self.ensure_open()?;
        let text = self.render(entity)?;
        self.emit(&text, 1)
    }

    pub fn write_all<N: Numeric, E: AsEntity<N>>(&mut self, entities: &[E]) -> Result<(), Error> {
        self.ensure_open()?;
        let text = self.render_all(entities)?;
        self.emit(&text, entities.len())
    }

    pub fn write_with_label<N: Numeric, E: AsEntity<N>>(
        &mut self,
        entity: &E,
        label: &str,
    ) -> Result<(), Error> {
        self.ensure_open()?;
        let text = self.render_with_label(entity, label)?;
        self.emit(&text, 1)
    }

    pub fn write_labeled<N: Numeric, E: AsEntity<N>, L: AsRef<str>>(
        &mut self,
        entities: &[E],
        labels: &[L],
    ) -> Result<(), Error> {
        self.ensure_open()?;
        let text = self.render_labeled(entities, labels)?;
        self.emit(&text, entities.len())
    }

    pub fn flush(&mut self) -> Result<(), Error> {
        let result = match self.sink.as_mut() {
            Some(sink) => sink.flush(),
            None => return Err(self.closed_error()),
        };
        result.map_err(|err| self.io_error("failed to flush output", err))
    }

    /// Flushes and releases the sink. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<(), Error> {
        let Some(mut sink) = self.sink.take() else {
            return Ok(());
        };
        sink.flush()
            .map_err(|err| self.io_error("failed to flush output", err))?;
        tracing::trace!(
            format = %self.format,
            records = self.records_written,
            "writer closed"
        );
        Ok(())
    }

    /// Flushes and returns the underlying sink.
    pub fn into_inner(mut self) -> Result<W, Error> {
        let sink = self.sink.take().ok_or_else(|| self.closed_error())?;
        sink.into_inner()
            .map_err(|err| self.io_error("failed to flush output", err.into_error()))
    }

    fn encode<N: Numeric>(&self, entities: &[EntityRef<'_, N>]) -> Result<String, Error> {
        codec::encode_many(self.format, entities, &self.config)
    }

    fn ensure_open(&self) -> Result<(), Error> {
        if self.sink.is_some() {
            Ok(())
        } else {
            Err(self.closed_error())
        }
    }

    fn emit(&mut self, text: &str, records: usize) -> Result<(), Error> {
        let separate = self.records_written > 0
            && records > 0
            && matches!(self.format, Format::PlateMap | Format::ResultTable);
        let result = match self.sink.as_mut() {
            Some(sink) => {
                let separator: &[u8] = if separate { b"\n" } else { b"" };
                sink.write_all(separator)
                    .and_then(|()| sink.write_all(text.as_bytes()))
            }
            None => return Err(self.closed_error()),
        };
        result.map_err(|err| self.io_error("failed to write output", err))?;
        self.records_written += records;
        tracing::debug!(
            format = %self.format,
            records,
            bytes = text.len(),
            "wrote records"
        );
        Ok(())
    }

    fn closed_error(&self) -> Error {
        self.with_path(Error::new(ErrorKind::Usage).with_message("writer is closed"))
    }

    fn io_error(&self, message: &str, err: std::io::Error) -> Error {
        self.with_path(
            Error::new(ErrorKind::Io)
                .with_message(message)
                .with_source(err),
        )
    }

    fn with_path(&self, err: Error) -> Error {
        match &self.path {
            Some(path) => err.with_path(path),
            None => err,
        }
    }
}

fn relabel<N: Numeric>(entity: EntityRef<'_, N>, label: &str) -> Result<Entity<N>, Error> {
    let mut owned = entity.to_entity();
    owned.set_label(label)?;
    Ok(owned)
}

#[cfg(test)]
mod tests {
    use super::{Writer, WriterOptions};
    use crate::codec::{Delimiter, Format};
    use crate::core::error::ErrorKind;
    use crate::core::plate::Plate;
    use crate::core::well::{Well, WellIndex};
    use crate::core::well_set::WellSet;

    fn set(label: &str, value: f64) -> WellSet<f64> {
        WellSet::from_wells([Well::single(WellIndex::new(0, 1).unwrap(), value)])
            .unwrap()
            .with_label(label)
    }

    #[test]
    fn render_and_write_share_output() {
        let options = WriterOptions::new(Format::ResultTable);
        let sets = [set("a", 1.0), set("b", 2.5)];
        let mut writer = Writer::new(Vec::new(), options);
        let rendered = writer.render_all(&sets).unwrap();
        writer.write_all(&sets).unwrap();
        let written = writer.into_inner().unwrap();
        assert_eq!(String::from_utf8(written).unwrap(), rendered);
        assert_eq!(rendered, "a\nA1\t1\n\nb\nA1\t2.5\n");
    }

    #[test]
    fn separate_delimited_writes_stay_separate_blocks() {
        let mut writer = Writer::new(Vec::new(), WriterOptions::new(Format::ResultTable));
        writer.write(&set("a", 1.0)).unwrap();
        writer.write(&set("b", 2.0)).unwrap();
        assert_eq!(writer.records_written(), 2);
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert_eq!(text, "a\nA1\t1\n\nb\nA1\t2\n");
    }

    #[test]
    fn explicit_labels_override() {
        let writer = Writer::new(Vec::new(), WriterOptions::new(Format::ResultTable));
        let original = set("own", 1.0);
        assert_eq!(
            writer.render_with_label(&original, "TestLabel").unwrap(),
            "TestLabel\nA1\t1\n"
        );
        assert_eq!(original.label(), "own");

        let well = Well::single(WellIndex::new(0, 1).unwrap(), 1.0);
        let writer = Writer::new(Vec::new(), WriterOptions::new(Format::Json));
        let err = writer.render_with_label(&well, "x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn label_count_mismatch_writes_nothing() {
        let mut writer = Writer::new(Vec::new(), WriterOptions::new(Format::Json));
        let plates = [Plate::<i32>::new(2, 2).unwrap(), Plate::new(2, 2).unwrap()];
        let err = writer.write_labeled(&plates, &["only one"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LabelCountMismatch);
        assert_eq!(writer.records_written(), 0);
        assert!(writer.into_inner().unwrap().is_empty());
    }

    #[test]
    fn write_after_close_is_usage_error() {
        let mut writer = Writer::new(Vec::new(), WriterOptions::new(Format::Xml));
        writer.write(&Plate::<f64>::new(1, 1).unwrap()).unwrap();
        writer.close().unwrap();
        writer.close().unwrap();
        assert!(writer.is_closed());
        let err = writer.write(&Plate::<f64>::new(1, 1).unwrap()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert_eq!(writer.flush().unwrap_err().kind(), ErrorKind::Usage);
    }

    #[test]
    fn settings_apply_to_later_calls() {
        let mut writer = Writer::new(Vec::new(), WriterOptions::new(Format::PlateMap));
        let plate = Plate::<i32>::new(1, 2).unwrap();
        assert_eq!(writer.render(&plate).unwrap(), "\t1\t2\nA\t-\t-\n");
        writer.set_delimiter(Delimiter::Comma);
        assert_eq!(writer.delimiter(), Delimiter::Comma);
        assert_eq!(writer.render(&plate).unwrap(), ",1,2\nA,-,-\n");

        let mut writer = Writer::new(Vec::new(), WriterOptions::new(Format::Json));
        let compact = writer.render(&plate).unwrap();
        writer.set_pretty(true);
        assert!(writer.pretty());
        assert!(writer.render(&plate).unwrap().len() > compact.len());
    }
}
