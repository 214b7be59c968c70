// Tagged JSON records: concatenated objects, each carrying its own `kind`.
use crate::core::entity::{Entity, EntityRef, RecordKind};
use crate::core::error::{Error, ErrorKind};
use crate::core::numeric::Numeric;
use crate::core::plate::{Plate, PlateType};
use crate::core::stack::Stack;
use crate::core::well::{Well, WellIndex};
use crate::core::well_set::WellSet;
use crate::json::parse;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", bound = "N: Numeric")]
enum RecordIn<N> {
    Well {
        index: WellIndex,
        #[serde(default)]
        values: Vec<N>,
    },
    Set {
        #[serde(default)]
        label: String,
        #[serde(default)]
        children: Vec<RecordIn<N>>,
    },
    Plate {
        #[serde(default)]
        label: String,
        rows: u32,
        columns: u32,
        #[serde(default, rename = "type")]
        plate_type: Option<String>,
        #[serde(default)]
        children: Vec<RecordIn<N>>,
    },
    Stack {
        #[serde(default)]
        label: String,
        rows: u32,
        columns: u32,
        #[serde(default)]
        children: Vec<RecordIn<N>>,
    },
}

impl<N> RecordIn<N> {
    fn kind(&self) -> RecordKind {
        match self {
            RecordIn::Well { .. } => RecordKind::Well,
            RecordIn::Set { .. } => RecordKind::Set,
            RecordIn::Plate { .. } => RecordKind::Plate,
            RecordIn::Stack { .. } => RecordKind::Stack,
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "lowercase", bound = "N: Numeric")]
enum RecordOut<'a, N> {
    Well {
        index: WellIndex,
        values: &'a [N],
    },
    Set {
        label: &'a str,
        children: Vec<RecordOut<'a, N>>,
    },
    Plate {
        label: &'a str,
        rows: u32,
        columns: u32,
        #[serde(rename = "type")]
        plate_type: &'static str,
        children: Vec<RecordOut<'a, N>>,
    },
    Stack {
        label: &'a str,
        rows: u32,
        columns: u32,
        children: Vec<RecordOut<'a, N>>,
    },
}

#[derive(Deserialize)]
struct KindProbe {
    kind: String,
}

pub(super) fn decode_all<N: Numeric>(text: &str, kind: RecordKind) -> Result<Vec<Entity<N>>, Error> {
    let mut stream = parse::records::<RecordIn<N>>(text);
    let mut entities = Vec::new();
    loop {
        let start = stream.byte_offset();
        let Some(item) = stream.next() else {
            break;
        };
        let record = item.map_err(|err| parse::malformed(err, "record"))?;
        if record.kind() != kind {
            return Err(Error::malformed(format!(
                "expected {kind} record, found {}",
                record.kind()
            ))
            .with_offset(start as u64));
        }
        let entity = into_entity(record).map_err(|err| err.with_offset(start as u64))?;
        entities.push(entity);
    }
    Ok(entities)
}

pub(super) fn detect_kind(text: &str) -> Result<Option<RecordKind>, Error> {
    let Some(first) = parse::records::<KindProbe>(text).next() else {
        return Ok(None);
    };
    let probe = first.map_err(|err| parse::malformed(err, "record"))?;
    RecordKind::from_tag(&probe.kind)
        .map(Some)
        .ok_or_else(|| Error::malformed(format!("unknown record kind '{}'", probe.kind)))
}

fn into_entity<N: Numeric>(record: RecordIn<N>) -> Result<Entity<N>, Error> {
    match record {
        RecordIn::Well { index, values } => Ok(Entity::Well(into_well(index, values)?)),
        RecordIn::Set { label, children } => {
            let mut set = WellSet::new().with_label(label);
            for child in children {
                set.insert_unique(expect_well(child, RecordKind::Set)?)?;
            }
            Ok(Entity::Set(set))
        }
        RecordIn::Plate {
            label,
            rows,
            columns,
            plate_type,
            children,
        } => Ok(Entity::Plate(into_plate(
            label, rows, columns, plate_type, children,
        )?)),
        RecordIn::Stack {
            label,
            rows,
            columns,
            children,
        } => {
            let mut stack = Stack::new(rows, columns)?.with_label(label);
            for child in children {
                let plate = match child {
                    RecordIn::Plate {
                        label,
                        rows,
                        columns,
                        plate_type,
                        children,
                    } => into_plate(label, rows, columns, plate_type, children)?,
                    other => return Err(child_mismatch(RecordKind::Stack, other.kind())),
                };
                stack.push(plate)?;
            }
            Ok(Entity::Stack(stack))
        }
    }
}

fn into_plate<N: Numeric>(
    label: String,
    rows: u32,
    columns: u32,
    plate_type: Option<String>,
    children: Vec<RecordIn<N>>,
) -> Result<Plate<N>, Error> {
    let mut plate = Plate::new(rows, columns)?.with_label(label);
    if let Some(tag) = plate_type {
        plate.check_declared_type(tag.parse::<PlateType>()?)?;
    }
    for child in children {
        plate.insert_unique(expect_well(child, RecordKind::Plate)?)?;
    }
    Ok(plate)
}

fn expect_well<N: Numeric>(child: RecordIn<N>, parent: RecordKind) -> Result<Well<N>, Error> {
    match child {
        RecordIn::Well { index, values } => into_well(index, values),
        other => Err(child_mismatch(parent, other.kind())),
    }
}

fn into_well<N: Numeric>(index: WellIndex, values: Vec<N>) -> Result<Well<N>, Error> {
    let index = WellIndex::new(index.row(), index.column()).map_err(|err| {
        Error::new(ErrorKind::Malformed).with_message(err.message().unwrap_or("invalid well index"))
    })?;
    Ok(Well::new(index, values))
}

fn child_mismatch(parent: RecordKind, found: RecordKind) -> Error {
    let expected = match parent {
        RecordKind::Stack => RecordKind::Plate,
        _ => RecordKind::Well,
    };
    Error::malformed(format!(
        "{parent} children must be {expected} records, found {found}"
    ))
}

fn to_record<'a, N: Numeric>(entity: EntityRef<'a, N>) -> RecordOut<'a, N> {
    match entity {
        EntityRef::Well(well) => well_record(well),
        EntityRef::Set(set) => RecordOut::Set {
            label: set.label(),
            children: set.wells().map(well_record).collect(),
        },
        EntityRef::Plate(plate) => plate_record(plate),
        EntityRef::Stack(stack) => RecordOut::Stack {
            label: stack.label(),
            rows: stack.rows(),
            columns: stack.columns(),
            children: stack.plates().iter().map(plate_record).collect(),
        },
    }
}

fn well_record<N: Numeric>(well: &Well<N>) -> RecordOut<'_, N> {
    RecordOut::Well {
        index: well.index,
        values: &well.values,
    }
}

fn plate_record<N: Numeric>(plate: &Plate<N>) -> RecordOut<'_, N> {
    RecordOut::Plate {
        label: plate.label(),
        rows: plate.rows(),
        columns: plate.columns(),
        plate_type: plate.plate_type().as_str(),
        children: plate.wells().map(well_record).collect(),
    }
}

pub(super) fn encode_many<N: Numeric>(
    entities: &[EntityRef<'_, N>],
    pretty: bool,
) -> Result<String, Error> {
    let mut out = String::new();
    for entity in entities {
        let record = to_record(*entity);
        let text = if pretty {
            serde_json::to_string_pretty(&record)
        } else {
            serde_json::to_string(&record)
        }
        .map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode json record")
                .with_source(err)
        })?;
        out.push_str(&text);
        out.push('\n');
    }
    Ok(out)
}
