//! Purpose: Normalize four text encodings to one ordered entity-sequence contract.
//! Exports: `Format`, `Delimiter`, `CodecConfig`, `decode_entities`, `decode_all`,
//! `encode_one`, `encode_many`, `detect_kind`.
//! Role: The only path between source text and decoded entities for reader and writer.
//! Invariants: Decode returns every record in file order or fails; nothing partial escapes.
//! Invariants: `encode_many` output decodes back to equal entities for the same format.
//! Invariants: One file holds one record kind; unsupported (format, kind) pairs are usage errors.

mod delimited;
mod json;
mod plate_map;
mod result_table;
mod xml;

use crate::core::entity::{Entity, EntityRef, Record, RecordKind};
use crate::core::error::Error;
use crate::core::numeric::Numeric;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Format {
    Json,
    Xml,
    PlateMap,
    ResultTable,
}

impl Format {
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Xml => "xml",
            Format::PlateMap => "plate-map",
            Format::ResultTable => "result-table",
        }
    }

    /// Infers the tagged-record formats from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        match ext.to_ascii_lowercase().as_str() {
            "json" | "jsonl" => Some(Format::Json),
            "xml" => Some(Format::Xml),
            _ => None,
        }
    }

    pub fn supports(self, kind: RecordKind) -> bool {
        match self {
            Format::Json | Format::Xml => true,
            Format::PlateMap => kind == RecordKind::Plate,
            Format::ResultTable => kind == RecordKind::Set,
        }
    }

    fn ensure_supports(self, kind: RecordKind) -> Result<(), Error> {
        if self.supports(kind) {
            return Ok(());
        }
        let carried = match self {
            Format::PlateMap => "plate",
            Format::ResultTable => "set",
            Format::Json | Format::Xml => "any",
        };
        Err(Error::usage(format!(
            "{self} format cannot carry {kind} records"
        ))
        .with_hint(format!("{self} files hold {carried} records only.")))
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "xml" => Ok(Format::Xml),
            "plate-map" | "platemap" | "map" => Ok(Format::PlateMap),
            "result-table" | "resulttable" | "table" => Ok(Format::ResultTable),
            other => Err(Error::usage(format!("unknown format '{other}'"))),
        }
    }
}

/// Field separator for the plate-map and result-table formats.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum Delimiter {
    #[default]
    Tab,
    Comma,
    Semicolon,
    Pipe,
    Space,
}

impl Delimiter {
    pub fn char(self) -> char {
        match self {
            Delimiter::Tab => '\t',
            Delimiter::Comma => ',',
            Delimiter::Semicolon => ';',
            Delimiter::Pipe => '|',
            Delimiter::Space => ' ',
        }
    }

    pub fn from_char(ch: char) -> Option<Self> {
        match ch {
            '\t' => Some(Delimiter::Tab),
            ',' => Some(Delimiter::Comma),
            ';' => Some(Delimiter::Semicolon),
            '|' => Some(Delimiter::Pipe),
            ' ' => Some(Delimiter::Space),
            _ => None,
        }
    }

    pub(crate) fn byte(self) -> u8 {
        self.char() as u8
    }
}

impl TryFrom<char> for Delimiter {
    type Error = Error;

    fn try_from(ch: char) -> Result<Self, Self::Error> {
        Self::from_char(ch).ok_or_else(|| {
            Error::usage(format!("unsupported delimiter {ch:?}"))
                .with_hint("Use tab, comma, semicolon, pipe, or space.")
        })
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CodecConfig {
    pub delimiter: Delimiter,
    pub pretty: bool,
}

impl CodecConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

/// Decodes every record of `kind` in `text`, in file order.
pub fn decode_entities<N: Numeric>(
    format: Format,
    kind: RecordKind,
    text: &str,
    config: &CodecConfig,
) -> Result<Vec<Entity<N>>, Error> {
    format.ensure_supports(kind)?;
    match format {
        Format::Json => json::decode_all(text, kind),
        Format::Xml => xml::decode_all(text, kind),
        Format::PlateMap => Ok(plate_map::decode_all(text, config.delimiter)?
            .into_iter()
            .map(Entity::Plate)
            .collect()),
        Format::ResultTable => Ok(result_table::decode_all(text, config.delimiter)?
            .into_iter()
            .map(Entity::Set)
            .collect()),
    }
}

pub fn decode_all<N: Numeric, K: Record<N>>(
    format: Format,
    text: &str,
    config: &CodecConfig,
) -> Result<Vec<K>, Error> {
    decode_entities(format, K::KIND, text, config)?
        .into_iter()
        .map(K::from_entity)
        .collect()
}

pub fn encode_one<N: Numeric>(
    format: Format,
    entity: EntityRef<'_, N>,
    config: &CodecConfig,
) -> Result<String, Error> {
    encode_many(format, &[entity], config)
}

pub fn encode_many<N: Numeric>(
    format: Format,
    entities: &[EntityRef<'_, N>],
    config: &CodecConfig,
) -> Result<String, Error> {
    if let Some(first) = entities.first() {
        let kind = first.kind();
        format.ensure_supports(kind)?;
        if let Some(other) = entities.iter().find(|entity| entity.kind() != kind) {
            return Err(Error::usage(format!(
                "cannot mix {kind} and {} records in one file",
                other.kind()
            )));
        }
    }
    match format {
        Format::Json => json::encode_many(entities, config.pretty),
        Format::Xml => Ok(xml::encode_many(entities, config.pretty)),
        Format::PlateMap => {
            let plates = entities
                .iter()
                .filter_map(|entity| match entity {
                    EntityRef::Plate(plate) => Some(*plate),
                    _ => None,
                })
                .collect::<Vec<_>>();
            plate_map::encode_many(&plates, config.delimiter)
        }
        Format::ResultTable => {
            let sets = entities
                .iter()
                .filter_map(|entity| match entity {
                    EntityRef::Set(set) => Some(*set),
                    _ => None,
                })
                .collect::<Vec<_>>();
            result_table::encode_many(&sets, config.delimiter)
        }
    }
}

/// Kind of the first record in `text`, or `None` when it holds no records.
pub fn detect_kind(format: Format, text: &str) -> Result<Option<RecordKind>, Error> {
    match format {
        Format::Json => json::detect_kind(text),
        Format::Xml => xml::detect_kind(text),
        Format::PlateMap if delimited::has_content(text) => Ok(Some(RecordKind::Plate)),
        Format::ResultTable if delimited::has_content(text) => Ok(Some(RecordKind::Set)),
        Format::PlateMap | Format::ResultTable => Ok(None),
    }
}
