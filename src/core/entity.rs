//! Purpose: Tie the four entity types to a single record-kind vocabulary.
//! Exports: `RecordKind`, `Entity`, `EntityRef`, `AsEntity`, `Record`.
//! Role: The unit codecs produce and consume, and the item type of reader cursors.
//! Invariants: A decoded file holds records of exactly one kind.
//! Invariants: Wells carry no label; every other kind defaults to "".

use crate::core::error::Error;
use crate::core::numeric::Numeric;
use crate::core::plate::Plate;
use crate::core::stack::Stack;
use crate::core::well::Well;
use crate::core::well_set::WellSet;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum RecordKind {
    Well,
    Set,
    Plate,
    Stack,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Well => "well",
            RecordKind::Set => "set",
            RecordKind::Plate => "plate",
            RecordKind::Stack => "stack",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "well" => Some(RecordKind::Well),
            "set" => Some(RecordKind::Set),
            "plate" => Some(RecordKind::Plate),
            "stack" => Some(RecordKind::Stack),
            _ => None,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::from_tag(text.trim())
            .ok_or_else(|| Error::usage(format!("unknown record kind '{text}'")))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Entity<N> {
    Well(Well<N>),
    Set(WellSet<N>),
    Plate(Plate<N>),
    Stack(Stack<N>),
}

#[derive(Clone, Copy, Debug)]
pub enum EntityRef<'a, N> {
    Well(&'a Well<N>),
    Set(&'a WellSet<N>),
    Plate(&'a Plate<N>),
    Stack(&'a Stack<N>),
}

impl<N: Numeric> Entity<N> {
    pub fn kind(&self) -> RecordKind {
        self.borrowed().kind()
    }

    pub fn label(&self) -> &str {
        self.borrowed().label()
    }

    pub fn set_label(&mut self, label: impl Into<String>) -> Result<(), Error> {
        match self {
            Entity::Well(well) => Err(Error::usage(format!(
                "well {} cannot carry a label",
                well.index
            ))),
            Entity::Set(set) => {
                set.set_label(label);
                Ok(())
            }
            Entity::Plate(plate) => {
                plate.set_label(label);
                Ok(())
            }
            Entity::Stack(stack) => {
                stack.set_label(label);
                Ok(())
            }
        }
    }

    pub fn borrowed(&self) -> EntityRef<'_, N> {
        match self {
            Entity::Well(well) => EntityRef::Well(well),
            Entity::Set(set) => EntityRef::Set(set),
            Entity::Plate(plate) => EntityRef::Plate(plate),
            Entity::Stack(stack) => EntityRef::Stack(stack),
        }
    }
}

impl<'a, N: Numeric> EntityRef<'a, N> {
    pub fn kind(&self) -> RecordKind {
        match self {
            EntityRef::Well(_) => RecordKind::Well,
            EntityRef::Set(_) => RecordKind::Set,
            EntityRef::Plate(_) => RecordKind::Plate,
            EntityRef::Stack(_) => RecordKind::Stack,
        }
    }

    pub fn label(&self) -> &'a str {
        match self {
            EntityRef::Well(_) => "",
            EntityRef::Set(set) => set.label(),
            EntityRef::Plate(plate) => plate.label(),
            EntityRef::Stack(stack) => stack.label(),
        }
    }

    pub fn to_entity(&self) -> Entity<N> {
        match *self {
            EntityRef::Well(well) => Entity::Well(well.clone()),
            EntityRef::Set(set) => Entity::Set(set.clone()),
            EntityRef::Plate(plate) => Entity::Plate(plate.clone()),
            EntityRef::Stack(stack) => Entity::Stack(stack.clone()),
        }
    }
}

/// Anything a writer can encode: a concrete entity or a runtime-kinded [`Entity`].
pub trait AsEntity<N: Numeric> {
    fn as_entity(&self) -> EntityRef<'_, N>;
}

/// A concrete entity type that a reader cursor can yield.
pub trait Record<N: Numeric>: AsEntity<N> + Clone + fmt::Debug + Sized {
    const KIND: RecordKind;

    fn from_entity(entity: Entity<N>) -> Result<Self, Error>;
}

fn kind_mismatch(expected: RecordKind, found: RecordKind) -> Error {
    Error::malformed(format!("expected {expected} record, found {found}"))
}

macro_rules! impl_record {
    ($ty:ident, $variant:ident, $kind:expr) => {
        impl<N: Numeric> AsEntity<N> for $ty<N> {
            fn as_entity(&self) -> EntityRef<'_, N> {
                EntityRef::$variant(self)
            }
        }

        impl<N: Numeric> Record<N> for $ty<N> {
            const KIND: RecordKind = $kind;

            fn from_entity(entity: Entity<N>) -> Result<Self, Error> {
                match entity {
                    Entity::$variant(inner) => Ok(inner),
                    other => Err(kind_mismatch(Self::KIND, other.kind())),
                }
            }
        }
    };
}

impl_record!(Well, Well, RecordKind::Well);
impl_record!(WellSet, Set, RecordKind::Set);
impl_record!(Plate, Plate, RecordKind::Plate);
impl_record!(Stack, Stack, RecordKind::Stack);

impl<N: Numeric> AsEntity<N> for Entity<N> {
    fn as_entity(&self) -> EntityRef<'_, N> {
        self.borrowed()
    }
}

#[cfg(test)]
mod tests {
    use super::{AsEntity, Entity, Record, RecordKind};
    use crate::core::error::ErrorKind;
    use crate::core::plate::Plate;
    use crate::core::well::{Well, WellIndex};
    use crate::core::well_set::WellSet;

    #[test]
    fn kind_tags_round_trip() {
        for kind in [RecordKind::Well, RecordKind::Set, RecordKind::Plate, RecordKind::Stack] {
            assert_eq!(kind.as_str().parse::<RecordKind>().unwrap(), kind);
        }
        assert_eq!("tray".parse::<RecordKind>().unwrap_err().kind(), ErrorKind::Usage);
    }

    #[test]
    fn from_entity_rejects_other_kinds() {
        let set = Entity::Set(WellSet::<i32>::new().with_label("s"));
        let err = Plate::<i32>::from_entity(set.clone()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
        let back = WellSet::<i32>::from_entity(set).unwrap();
        assert_eq!(back.label(), "s");
    }

    #[test]
    fn relabel_applies_to_labeled_kinds_only() {
        let mut plate = Plate::<f64>::new(2, 2).unwrap().as_entity().to_entity();
        plate.set_label("renamed").unwrap();
        assert_eq!(plate.label(), "renamed");

        let well = Well::single(WellIndex::new(0, 1).unwrap(), 1.0_f64);
        let mut entity = Entity::Well(well);
        assert_eq!(entity.set_label("x").unwrap_err().kind(), ErrorKind::Usage);
        assert_eq!(entity.kind(), RecordKind::Well);
    }
}
