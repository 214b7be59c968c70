//! Purpose: Model an ordered stack of same-sized plates.
//! Exports: `Stack`.
//! Role: Outermost entity of the tagged-record formats.
//! Invariants: Every member plate has the stack's rows and columns.
//! Invariants: Plate order is insertion order and is preserved by every codec.

use crate::core::cursor::Cursor;
use crate::core::error::Error;
use crate::core::numeric::Numeric;
use crate::core::plate::{Plate, PlateType};

#[derive(Clone, Debug, PartialEq)]
pub struct Stack<N> {
    label: String,
    rows: u32,
    columns: u32,
    plates: Vec<Plate<N>>,
}

impl<N: Numeric> Stack<N> {
    pub fn new(rows: u32, columns: u32) -> Result<Self, Error> {
        if rows == 0 || columns == 0 {
            return Err(Error::dimension(format!(
                "stack dimensions must be positive (got {rows}x{columns})"
            )));
        }
        Ok(Self {
            label: String::new(),
            rows,
            columns,
            plates: Vec::new(),
        })
    }

    pub fn from_plates(
        rows: u32,
        columns: u32,
        plates: impl IntoIterator<Item = Plate<N>>,
    ) -> Result<Self, Error> {
        let mut stack = Self::new(rows, columns)?;
        for plate in plates {
            stack.push(plate)?;
        }
        Ok(stack)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
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
        PlateType::from_dimensions(self.rows, self.columns)
    }

    pub fn push(&mut self, plate: Plate<N>) -> Result<(), Error> {
        if plate.dimensions() != self.dimensions() {
            return Err(Error::dimension(format!(
                "plate '{}' is {}x{} but stack is {}x{}",
                plate.label(),
                plate.rows(),
                plate.columns(),
                self.rows,
                self.columns
            )));
        }
        self.plates.push(plate);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.plates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plates.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Plate<N>> {
        self.plates.get(position)
    }

    pub fn plates(&self) -> &[Plate<N>] {
        &self.plates
    }

    pub fn cursor(&self) -> Cursor<Plate<N>> {
        Cursor::new(self.plates.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::Stack;
    use crate::core::error::ErrorKind;
    use crate::core::plate::{Plate, PlateType};

    #[test]
    fn mismatched_plate_is_rejected() {
        let mut stack = Stack::<f64>::new(8, 12).unwrap();
        stack
            .push(Plate::of_type(PlateType::Wells96).unwrap().with_label("ok"))
            .unwrap();
        let err = stack
            .push(Plate::of_type(PlateType::Wells384).unwrap())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DimensionMismatch);
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.plate_type(), PlateType::Wells96);
    }

    #[test]
    fn cursor_preserves_plate_order() {
        let plates = (0..3).map(|i| {
            Plate::<i32>::new(2, 2)
                .unwrap()
                .with_label(format!("P{i}"))
        });
        let stack = Stack::from_plates(2, 2, plates).unwrap().with_label("S");
        let mut cursor = stack.cursor();
        let mut labels = Vec::new();
        while let Some(plate) = cursor.next() {
            labels.push(plate.label().to_string());
        }
        assert_eq!(labels, vec!["P0", "P1", "P2"]);
        assert_eq!(cursor.previous().map(|p| p.label()), Some("P2"));
    }
}
