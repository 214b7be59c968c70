//! Purpose: Model a bounded plate of wells and its standard format tag.
//! Exports: `PlateType`, `Plate`.
//! Role: Unit of the plate-map format and building block of stacks.
//! Invariants: Every contained well lies within rows x columns.
//! Invariants: The type tag always agrees with the declared dimensions.

use crate::core::cursor::Cursor;
use crate::core::error::Error;
use crate::core::numeric::Numeric;
use crate::core::well::{Well, WellIndex};
use crate::core::well_set::WellSet;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum PlateType {
    Wells6,
    Wells12,
    Wells24,
    Wells48,
    Wells96,
    Wells384,
    Wells1536,
    Custom,
}

const STANDARD_TYPES: [(PlateType, u32, u32); 7] = [
    (PlateType::Wells6, 2, 3),
    (PlateType::Wells12, 3, 4),
    (PlateType::Wells24, 4, 6),
    (PlateType::Wells48, 6, 8),
    (PlateType::Wells96, 8, 12),
    (PlateType::Wells384, 16, 24),
    (PlateType::Wells1536, 32, 48),
];

impl PlateType {
    pub fn from_dimensions(rows: u32, columns: u32) -> Self {
        STANDARD_TYPES
            .iter()
            .find(|(_, r, c)| *r == rows && *c == columns)
            .map(|(plate_type, _, _)| *plate_type)
            .unwrap_or(PlateType::Custom)
    }

    /// Rows and columns of a standard format; `None` for `Custom`.
    pub fn dimensions(self) -> Option<(u32, u32)> {
        STANDARD_TYPES
            .iter()
            .find(|(plate_type, _, _)| *plate_type == self)
            .map(|(_, rows, columns)| (*rows, *columns))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlateType::Wells6 => "6",
            PlateType::Wells12 => "12",
            PlateType::Wells24 => "24",
            PlateType::Wells48 => "48",
            PlateType::Wells96 => "96",
            PlateType::Wells384 => "384",
            PlateType::Wells1536 => "1536",
            PlateType::Custom => "custom",
        }
    }
}

impl fmt::Display for PlateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlateType {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.trim().to_ascii_lowercase().as_str() {
            "6" => Ok(PlateType::Wells6),
            "12" => Ok(PlateType::Wells12),
            "24" => Ok(PlateType::Wells24),
            "48" => Ok(PlateType::Wells48),
            "96" => Ok(PlateType::Wells96),
            "384" => Ok(PlateType::Wells384),
            "1536" => Ok(PlateType::Wells1536),
            "custom" => Ok(PlateType::Custom),
            other => Err(Error::malformed(format!("unknown plate type '{other}'"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Plate<N> {
    rows: u32,
    columns: u32,
    plate_type: PlateType,
    wells: WellSet<N>,
}

impl<N: Numeric> Plate<N> {
    pub fn new(rows: u32, columns: u32) -> Result<Self, Error> {
        if rows == 0 || columns == 0 {
            return Err(Error::dimension(format!(
                "plate dimensions must be positive (got {rows}x{columns})"
            )));
        }
        Ok(Self {
            rows,
            columns,
            plate_type: PlateType::from_dimensions(rows, columns),
            wells: WellSet::new(),
        })
    }

    pub fn of_type(plate_type: PlateType) -> Result<Self, Error> {
        let (rows, columns) = plate_type.dimensions().ok_or_else(|| {
            Error::usage("custom plates need explicit dimensions; use Plate::new")
        })?;
        Self::new(rows, columns)
    }

    /// Builds a plate around an existing set, checking every well against the bounds.
    pub fn from_set(rows: u32, columns: u32, wells: WellSet<N>) -> Result<Self, Error> {
        let mut plate = Self::new(rows, columns)?;
        for well in wells.wells() {
            plate.check_bounds(&well.index)?;
        }
        plate.wells = wells;
        Ok(plate)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.wells.set_label(label);
        self
    }

    pub fn label(&self) -> &str {
        self.wells.label()
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.wells.set_label(label);
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.rows, self.columns)
    }

    pub fn plate_type(&self) -> PlateType {
        self.plate_type
    }

    pub fn well_set(&self) -> &WellSet<N> {
        &self.wells
    }

    pub fn into_well_set(self) -> WellSet<N> {
        self.wells
    }

    pub fn len(&self) -> usize {
        self.wells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wells.is_empty()
    }

    pub fn contains_index(&self, index: &WellIndex) -> bool {
        index.row() < self.rows && index.column() <= self.columns
    }

    /// Rejects a type tag read from a file that disagrees with the declared dimensions.
    pub(crate) fn check_declared_type(&self, declared: PlateType) -> Result<(), Error> {
        if declared == self.plate_type {
            return Ok(());
        }
        Err(Error::dimension(format!(
            "plate type {declared} does not match {}x{} dimensions",
            self.rows, self.columns
        )))
    }

    fn check_bounds(&self, index: &WellIndex) -> Result<(), Error> {
        if self.contains_index(index) {
            return Ok(());
        }
        Err(Error::dimension(format!(
            "well {index} lies outside {}x{} plate",
            self.rows, self.columns
        )))
    }

    /// Inserts a well inside the plate bounds, returning any well it replaced.
    pub fn insert(&mut self, well: Well<N>) -> Result<Option<Well<N>>, Error> {
        self.check_bounds(&well.index)?;
        Ok(self.wells.insert(well))
    }

    pub(crate) fn insert_unique(&mut self, well: Well<N>) -> Result<(), Error> {
        self.check_bounds(&well.index)?;
        self.wells.insert_unique(well)
    }

    pub fn get(&self, index: &WellIndex) -> Option<&Well<N>> {
        self.wells.get(index)
    }

    pub fn wells(&self) -> impl Iterator<Item = &Well<N>> {
        self.wells.wells()
    }

    pub fn cursor(&self) -> Cursor<Well<N>> {
        self.wells.cursor()
    }
}

#[cfg(test)]
mod tests {
    use super::{Plate, PlateType};
    use crate::core::error::ErrorKind;
    use crate::core::well::{Well, WellIndex};
    use crate::core::well_set::WellSet;

    #[test]
    fn type_follows_dimensions() {
        assert_eq!(PlateType::from_dimensions(8, 12), PlateType::Wells96);
        assert_eq!(PlateType::from_dimensions(16, 24), PlateType::Wells384);
        assert_eq!(PlateType::from_dimensions(5, 5), PlateType::Custom);
        assert_eq!(PlateType::Wells1536.dimensions(), Some((32, 48)));
        assert_eq!(PlateType::Custom.dimensions(), None);
        assert_eq!("96".parse::<PlateType>().unwrap(), PlateType::Wells96);
        assert_eq!("Custom".parse::<PlateType>().unwrap(), PlateType::Custom);
        assert!("97".parse::<PlateType>().is_err());
    }

    #[test]
    fn wells_outside_bounds_are_rejected() {
        let mut plate = Plate::<f64>::of_type(PlateType::Wells6).unwrap();
        let inside = Well::single(WellIndex::new(1, 3).unwrap(), 1.0);
        let below = Well::single(WellIndex::new(2, 1).unwrap(), 1.0);
        let right = Well::single(WellIndex::new(0, 4).unwrap(), 1.0);
        assert!(plate.insert(inside).unwrap().is_none());
        assert_eq!(
            plate.insert(below).unwrap_err().kind(),
            ErrorKind::DimensionMismatch
        );
        assert_eq!(
            plate.insert(right).unwrap_err().kind(),
            ErrorKind::DimensionMismatch
        );
        assert_eq!(plate.len(), 1);
    }

    #[test]
    fn from_set_checks_every_well() {
        let set = WellSet::from_wells([Well::single(WellIndex::new(3, 1).unwrap(), 7)]).unwrap();
        let err = Plate::from_set(2, 2, set.clone()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DimensionMismatch);
        let plate = Plate::from_set(4, 1, set.with_label("P")).unwrap();
        assert_eq!(plate.label(), "P");
        assert_eq!(plate.plate_type(), PlateType::Custom);
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert_eq!(
            Plate::<i32>::new(0, 12).unwrap_err().kind(),
            ErrorKind::DimensionMismatch
        );
        assert_eq!(
            Plate::<i32>::of_type(PlateType::Custom).unwrap_err().kind(),
            ErrorKind::Usage
        );
    }
}
