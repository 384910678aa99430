//! Packing rows into fixed-width bit strings, and unpacking them again.

use crate::error::{Result, RowRef};
use crate::layout::RecordLayout;
use crate::table::Table;
use crate::types::TypeTable;
use crate::value::Row;

/// A row's bits, most significant first, as a string of `'0'` and `'1'`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitString(Vec<u8>);

impl BitString {
    /// An all-zero string of the given width.
    pub fn zeroed(width: u32) -> Self {
        BitString(vec![b'0'; width as usize])
    }

    /// Write `value` right-justified into the `width` bits starting `start` bits from the
    /// left. Bits of `value` above `width` are dropped.
    pub fn apply(&mut self, start: u32, width: u32, value: u64) {
        for offset in 0..width {
            let bit = (value >> (width - 1 - offset)) & 1;
            self.0[(start + offset) as usize] = if bit == 1 { b'1' } else { b'0' };
        }
    }

    /// Read the `width` bits starting `start` bits from the left.
    pub fn extract(&self, start: u32, width: u32) -> u64 {
        self.0[start as usize..(start + width) as usize]
            .iter()
            .fold(0, |acc, &bit| (acc << 1) | u64::from(bit == b'1'))
    }

    /// Parse a line of `'0'`/`'1'` characters. Returns `None` for any other character.
    pub fn parse(line: &str) -> Option<Self> {
        line.bytes()
            .map(|b| matches!(b, b'0' | b'1').then_some(b))
            .collect::<Option<Vec<u8>>>()
            .map(BitString)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        // Only ever holds ASCII '0' and '1'.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

/// Pack one row. Labels are skipped, missing fields are zero.
pub fn pack_row(
    layout: &RecordLayout,
    types: &TypeTable,
    row: &Row,
    at: &RowRef,
) -> Result<BitString> {
    let codes = layout.resolve_row(row, at, types)?;
    let mut bits = BitString::zeroed(layout.total_width());
    for (field, code) in layout.fields().iter().zip(codes) {
        bits.apply(field.start, field.width, code);
    }
    Ok(bits)
}

/// Pack every row of a table, in row order.
pub fn pack_table(
    layout: &RecordLayout,
    types: &TypeTable,
    table: &Table,
) -> Result<Vec<BitString>> {
    table
        .rows
        .iter()
        .enumerate()
        .map(|(index, row)| pack_row(layout, types, row, &RowRef::table(&table.name, index)))
        .collect()
}

/// Unpack a packed row back into field values, with enum fields as symbols. Returns `None`
/// if the string is not exactly as wide as the layout.
pub fn unpack_row(layout: &RecordLayout, types: &TypeTable, bits: &BitString) -> Option<Row> {
    if bits.len() != layout.total_width() as usize {
        return None;
    }
    let codes: Vec<u64> = layout
        .fields()
        .iter()
        .map(|field| bits.extract(field.start, field.width))
        .collect();
    Some(layout.decode_row(&codes, types))
}
