//! Purpose: Model a single well and its grid position.
//! Exports: `WellIndex`, `Well`.
//! Role: Leaf entity shared by sets, plates, and every codec.
//! Invariants: Columns are 1-based; rows are 0-based and render as letters (A, B, .., Z, AA).
//! Invariants: Wells order by (row, column) only; values never affect ordering.

use crate::core::error::Error;
use crate::core::numeric::Numeric;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct WellIndex {
    row: u32,
    column: u32,
}

impl WellIndex {
    pub fn new(row: u32, column: u32) -> Result<Self, Error> {
        if column == 0 {
            return Err(Error::usage(format!(
                "well column must be at least 1 (row {row})"
            )));
        }
        Ok(Self { row, column })
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn column(&self) -> u32 {
        self.column
    }
}

/// Renders a 0-based row number as spreadsheet-style letters.
pub fn row_label(row: u32) -> String {
    let mut n = u64::from(row) + 1;
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Inverse of [`row_label`]; `None` for empty input, non-letters, or overflow.
pub fn parse_row_label(label: &str) -> Option<u32> {
    if label.is_empty() {
        return None;
    }
    let mut acc: u64 = 0;
    for ch in label.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = u64::from(ch.to_ascii_uppercase() as u8 - b'A') + 1;
        acc = acc.checked_mul(26)?.checked_add(digit)?;
        if acc > u64::from(u32::MAX) + 1 {
            return None;
        }
    }
    u32::try_from(acc - 1).ok()
}

impl fmt::Display for WellIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", row_label(self.row), self.column)
    }
}

impl FromStr for WellIndex {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        let split = text
            .find(|ch: char| ch.is_ascii_digit())
            .ok_or_else(|| Error::malformed(format!("well index '{text}' has no column")))?;
        let (letters, digits) = text.split_at(split);
        let row = parse_row_label(letters)
            .ok_or_else(|| Error::malformed(format!("well index '{text}' has no valid row")))?;
        let column = digits
            .parse::<u32>()
            .map_err(|_| Error::malformed(format!("well index '{text}' has no valid column")))?;
        if column == 0 {
            return Err(Error::malformed(format!(
                "well index '{text}' has column 0"
            )));
        }
        Ok(Self { row, column })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Well<N> {
    pub index: WellIndex,
    pub values: Vec<N>,
}

impl<N: Numeric> Well<N> {
    pub fn new(index: WellIndex, values: Vec<N>) -> Self {
        Self { index, values }
    }

    pub fn single(index: WellIndex, value: N) -> Self {
        Self {
            index,
            values: vec![value],
        }
    }

    pub fn row(&self) -> u32 {
        self.index.row
    }

    pub fn column(&self) -> u32 {
        self.index.column
    }

    /// The value of a single-measurement well, as carried by grid and table formats.
    pub fn single_value(&self) -> Option<N> {
        match self.values.as_slice() {
            [value] => Some(*value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{WellIndex, parse_row_label, row_label};
    use crate::core::error::ErrorKind;

    #[test]
    fn row_labels_use_bijective_letters() {
        let cases = [(0, "A"), (7, "H"), (25, "Z"), (26, "AA"), (27, "AB"), (701, "ZZ"), (702, "AAA")];
        for (row, label) in cases {
            assert_eq!(row_label(row), label);
            assert_eq!(parse_row_label(label), Some(row));
        }
        assert_eq!(parse_row_label(""), None);
        assert_eq!(parse_row_label("A1"), None);
    }

    #[test]
    fn index_text_form() {
        let index: WellIndex = "H12".parse().expect("parse");
        assert_eq!((index.row(), index.column()), (7, 12));
        assert_eq!(index.to_string(), "H12");
        assert_eq!("aa3".parse::<WellIndex>().expect("lower").to_string(), "AA3");
    }

    #[test]
    fn index_rejects_bad_text() {
        for text in ["", "12", "A", "A0", "1A", "A-1"] {
            let err = text.parse::<WellIndex>().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Malformed, "{text}");
        }
        assert_eq!(WellIndex::new(0, 0).unwrap_err().kind(), ErrorKind::Usage);
    }

    #[test]
    fn indices_order_by_row_then_column() {
        let a1 = WellIndex::new(0, 1).unwrap();
        let a2 = WellIndex::new(0, 2).unwrap();
        let b1 = WellIndex::new(1, 1).unwrap();
        let mut indices = vec![b1, a2, a1];
        indices.sort();
        assert_eq!(indices, vec![a1, a2, b1]);
    }
}
