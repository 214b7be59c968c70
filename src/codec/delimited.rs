// Shared block splitting and csv plumbing for the plate-map and result-table formats.
//
// A delimited file is a sequence of blocks separated by blank lines. Each block is
// parsed as flexible, header-less csv so quoted labels may contain the delimiter.

use crate::codec::Delimiter;
use crate::core::error::{Error, ErrorKind};

pub(super) struct Block {
    /// 1-based line number of the block's first line.
    pub(super) first_line: u64,
    pub(super) text: String,
}

pub(super) struct Row {
    pub(super) line: u64,
    pub(super) fields: Vec<String>,
}

pub(super) fn has_content(text: &str) -> bool {
    text.lines().any(|line| !is_blank(line))
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

pub(super) fn split_blocks(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut current: Option<Block> = None;
    for (idx, line) in text.lines().enumerate() {
        if is_blank(line) {
            if let Some(block) = current.take() {
                blocks.push(block);
            }
            continue;
        }
        let block = current.get_or_insert_with(|| Block {
            first_line: idx as u64 + 1,
            text: String::new(),
        });
        block.text.push_str(line);
        block.text.push('\n');
    }
    if let Some(block) = current {
        blocks.push(block);
    }
    blocks
}

pub(super) fn read_rows(block: &Block, delimiter: Delimiter) -> Result<Vec<Row>, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter.byte())
        .has_headers(false)
        .flexible(true)
        .from_reader(block.text.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|err| {
            let line = err
                .position()
                .map(|pos| block.first_line + pos.line().saturating_sub(1))
                .unwrap_or(block.first_line);
            Error::malformed("unreadable delimited line")
                .with_line(line)
                .with_source(err)
        })?;
        let line = record
            .position()
            .map(|pos| block.first_line + pos.line().saturating_sub(1))
            .unwrap_or(block.first_line);
        rows.push(Row {
            line,
            fields: record.iter().map(str::to_string).collect(),
        });
    }
    Ok(rows)
}

pub(super) fn check_label(label: &str) -> Result<(), Error> {
    if label.contains(['\n', '\r']) {
        return Err(Error::usage(format!(
            "label {label:?} contains a line break"
        ))
        .with_hint("Delimited formats keep each label on a single line."));
    }
    Ok(())
}

pub(super) struct BlockWriter {
    delimiter: Delimiter,
    out: Vec<u8>,
}

impl BlockWriter {
    pub(super) fn new(delimiter: Delimiter) -> Self {
        Self {
            delimiter,
            out: Vec::new(),
        }
    }

    pub(super) fn row<I, S>(&mut self, fields: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        self.write_record(csv::QuoteStyle::Necessary, fields)
    }

    /// Writes a one-field label line. Blank labels are quoted so the line never
    /// reads back as a block separator.
    pub(super) fn label(&mut self, label: &str) -> Result<(), Error> {
        let quote = if is_blank(label) {
            csv::QuoteStyle::Always
        } else {
            csv::QuoteStyle::Necessary
        };
        self.write_record(quote, [label])
    }

    /// Ends the current block; the next row starts after a blank line.
    pub(super) fn blank_line(&mut self) -> Result<(), Error> {
        self.out.push(b'\n');
        Ok(())
    }

    pub(super) fn finish(self) -> Result<String, Error> {
        String::from_utf8(self.out).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("delimited output is not utf-8")
                .with_source(err)
        })
    }

    fn write_record<I, S>(&mut self, quote: csv::QuoteStyle, fields: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let mut inner = csv::WriterBuilder::new()
            .delimiter(self.delimiter.byte())
            .has_headers(false)
            .flexible(true)
            .terminator(csv::Terminator::Any(b'\n'))
            .quote_style(quote)
            .from_writer(&mut self.out);
        inner.write_record(fields).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to render delimited line")
                .with_source(err)
        })?;
        inner.flush().map_err(internal_io)
    }
}

fn internal_io(err: std::io::Error) -> Error {
    Error::new(ErrorKind::Internal)
        .with_message("failed to flush delimited output")
        .with_source(err)
}
