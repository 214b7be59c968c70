// Result tables: one block per well set, label line then `index<d>value` lines.
use crate::codec::Delimiter;
use crate::codec::delimited::{self, Block, BlockWriter};
use crate::core::error::Error;
use crate::core::numeric::Numeric;
use crate::core::well::{Well, WellIndex};
use crate::core::well_set::WellSet;

pub(super) fn decode_all<N: Numeric>(
    text: &str,
    delimiter: Delimiter,
) -> Result<Vec<WellSet<N>>, Error> {
    delimited::split_blocks(text)
        .iter()
        .map(|block| decode_block(block, delimiter))
        .collect()
}

fn decode_block<N: Numeric>(block: &Block, delimiter: Delimiter) -> Result<WellSet<N>, Error> {
    let rows = delimited::read_rows(block, delimiter)?;
    let mut rows = rows.iter().peekable();
    let label = rows
        .next_if(|row| row.fields.len() == 1)
        .map(|row| row.fields[0].clone())
        .unwrap_or_default();

    let mut set = WellSet::new().with_label(label);
    for row in rows {
        let [index, value] = row.fields.as_slice() else {
            return Err(Error::malformed(format!(
                "result line has {} fields, expected index and value",
                row.fields.len()
            ))
            .with_line(row.line));
        };
        let index: WellIndex = index.parse().map_err(|err: Error| err.with_line(row.line))?;
        let value = N::parse_value(value).ok_or_else(|| {
            Error::malformed(format!(
                "invalid {} value '{}' for {index}",
                N::NAME,
                value.trim()
            ))
            .with_line(row.line)
        })?;
        set.insert_unique(Well::single(index, value))
            .map_err(|err| err.with_line(row.line))?;
    }
    Ok(set)
}

pub(super) fn encode_many<N: Numeric>(
    sets: &[&WellSet<N>],
    delimiter: Delimiter,
) -> Result<String, Error> {
    let mut writer = BlockWriter::new(delimiter);
    for (position, set) in sets.iter().enumerate() {
        if position > 0 {
            writer.blank_line()?;
        }
        delimited::check_label(set.label())?;
        // Always present so an empty, unlabeled set still occupies a block.
        writer.label(set.label())?;
        for well in set.wells() {
            let value = well.single_value().ok_or_else(|| {
                Error::usage(format!(
                    "well {} holds {} values; result tables carry exactly one per well",
                    well.index,
                    well.values.len()
                ))
            })?;
            writer.row([well.index.to_string(), value.to_string()])?;
        }
    }
    writer.finish()
}
