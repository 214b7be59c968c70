// Plate-map grids: one block per plate, optional label line, header, one line per row.
//
//     Plate 1
//     <d>1<d>2<d>3
//     A<d>0.5<d>-<d>1.25
//     B<d>2<d>3<d>-
//
// `-` (or an empty cell) marks a well the plate does not hold.
use crate::codec::Delimiter;
use crate::codec::delimited::{self, Block, BlockWriter, Row};
use crate::core::error::Error;
use crate::core::numeric::Numeric;
use crate::core::plate::Plate;
use crate::core::well::{Well, WellIndex, parse_row_label, row_label};

pub(super) const MISSING_CELL: &str = "-";

pub(super) fn decode_all<N: Numeric>(
    text: &str,
    delimiter: Delimiter,
) -> Result<Vec<Plate<N>>, Error> {
    delimited::split_blocks(text)
        .iter()
        .map(|block| decode_block(block, delimiter))
        .collect()
}

fn decode_block<N: Numeric>(block: &Block, delimiter: Delimiter) -> Result<Plate<N>, Error> {
    let rows = delimited::read_rows(block, delimiter)?;
    let mut rows = rows.iter().peekable();

    let label = rows
        .next_if(|row| row.fields.len() == 1)
        .map(|row| row.fields[0].clone())
        .unwrap_or_default();

    let header = rows.next().ok_or_else(|| {
        Error::malformed("plate map has a label but no header line").with_line(block.first_line)
    })?;
    let columns = parse_header(header)?;

    let grid: Vec<&Row> = rows.collect();
    if grid.is_empty() {
        return Err(Error::malformed("plate map has no rows").with_line(header.line));
    }
    let row_count = u32::try_from(grid.len())
        .map_err(|_| Error::malformed("plate map has too many rows").with_line(header.line))?;

    let mut plate = Plate::new(row_count, columns)
        .map_err(|err| err.with_line(header.line))?
        .with_label(label);
    for (row_idx, row) in (0u32..).zip(grid) {
        let expected = row_label(row_idx);
        let found = row.fields[0].trim();
        if parse_row_label(found) != Some(row_idx) {
            return Err(Error::malformed(format!(
                "expected row {expected}, found '{found}'"
            ))
            .with_line(row.line));
        }
        let cells = &row.fields[1..];
        if cells.len() != columns as usize {
            return Err(Error::malformed(format!(
                "row {expected} has {} cells but the header declares {columns} columns",
                cells.len()
            ))
            .with_line(row.line));
        }
        for (column, cell) in (1u32..).zip(cells) {
            let cell = cell.trim();
            if cell.is_empty() || cell == MISSING_CELL {
                continue;
            }
            let value = N::parse_value(cell).ok_or_else(|| {
                Error::malformed(format!(
                    "invalid {} value '{cell}' in {expected}{column}",
                    N::NAME
                ))
                .with_line(row.line)
            })?;
            let index = WellIndex::new(row_idx, column)?;
            plate.insert_unique(Well::single(index, value))?;
        }
    }
    Ok(plate)
}

fn parse_header(header: &Row) -> Result<u32, Error> {
    let malformed = |reason: String| Error::malformed(reason).with_line(header.line);
    if header.fields.len() < 2 || !header.fields[0].trim().is_empty() {
        return Err(malformed(
            "plate map header must start with an empty cell followed by column numbers".into(),
        ));
    }
    for (expected, field) in (1u32..).zip(&header.fields[1..]) {
        if field.trim().parse::<u32>().ok() != Some(expected) {
            return Err(malformed(format!(
                "expected column {expected} in header, found '{}'",
                field.trim()
            )));
        }
    }
    u32::try_from(header.fields.len() - 1)
        .map_err(|_| malformed("plate map header has too many columns".into()))
}

pub(super) fn encode_many<N: Numeric>(
    plates: &[&Plate<N>],
    delimiter: Delimiter,
) -> Result<String, Error> {
    let mut writer = BlockWriter::new(delimiter);
    for (position, plate) in plates.iter().enumerate() {
        if position > 0 {
            writer.blank_line()?;
        }
        encode_plate(&mut writer, plate)?;
    }
    writer.finish()
}

fn encode_plate<N: Numeric>(writer: &mut BlockWriter, plate: &Plate<N>) -> Result<(), Error> {
    delimited::check_label(plate.label())?;
    if !plate.label().is_empty() {
        writer.label(plate.label())?;
    }

    let mut header = vec![String::new()];
    header.extend((1..=plate.columns()).map(|column| column.to_string()));
    writer.row(&header)?;

    for row in 0..plate.rows() {
        let mut fields = Vec::with_capacity(plate.columns() as usize + 1);
        fields.push(row_label(row));
        for column in 1..=plate.columns() {
            let index = WellIndex::new(row, column)?;
            let cell = match plate.get(&index) {
                None => MISSING_CELL.to_string(),
                Some(well) => well.single_value().map(|v| v.to_string()).ok_or_else(|| {
                    Error::usage(format!(
                        "well {index} holds {} values; plate maps carry exactly one per well",
                        well.values.len()
                    ))
                })?,
            };
            fields.push(cell);
        }
        writer.row(&fields)?;
    }
    Ok(())
}
