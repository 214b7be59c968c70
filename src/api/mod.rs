//! Purpose: Define the public Rust API boundary for platestream.
//! Exports: Entity model, cursor, codecs, and the `Reader`/`Writer` pair.
//! Role: Public, additive-only surface used by the CLI and tests.
//! Invariants: This module is the only public path to the codec and entity modules.
//! Invariants: Internal modules remain private and are not directly exposed.

mod reader;
mod writer;

pub use crate::codec::{
    CodecConfig, Delimiter, Format, decode_all, decode_entities, detect_kind, encode_many,
    encode_one,
};
pub use crate::core::cursor::Cursor;
pub use crate::core::entity::{AsEntity, Entity, EntityRef, Record, RecordKind};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::numeric::Numeric;
pub use crate::core::plate::{Plate, PlateType};
pub use crate::core::stack::Stack;
pub use crate::core::well::{Well, WellIndex, parse_row_label, row_label};
pub use crate::core::well_set::WellSet;
pub use reader::{Reader, ReaderOptions};
pub use writer::{Writer, WriterOptions};
