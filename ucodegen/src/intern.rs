//! Content-addressed storage of control words.
//!
//! Words are compared by their resolved field codes rather than by their symbolic form, so
//! a word that spells out a field's zero value is the same word as one that leaves it
//! unset.

use std::collections::HashMap;

use log::trace;

use crate::control::ControlWord;
use crate::error::{CompileError, Result, RowRef};
use crate::layout::RecordLayout;
use crate::types::TypeTable;

/// Assigns each structurally distinct control word an address in first-seen order.
#[derive(Debug)]
pub struct Interner<'a> {
    layout: &'a RecordLayout,
    types: &'a TypeTable,
    addresses: HashMap<Vec<u64>, usize>,
    words: Vec<ControlWord>,
}

impl<'a> Interner<'a> {
    pub fn new(layout: &'a RecordLayout, types: &'a TypeTable) -> Self {
        Self {
            layout,
            types,
            addresses: HashMap::new(),
            words: Vec::new(),
        }
    }

    /// Return the address of an equal word, adding `word` if none exists yet. Errors name
    /// `row` as the location of the offending word.
    pub fn intern(&mut self, word: &ControlWord, row: &RowRef) -> Result<usize> {
        // Labels annotate table rows; a word may only name packed fields.
        if let Some((field, _)) = word.iter().find(|(f, _)| self.layout.field(f).is_none()) {
            return Err(CompileError::UnknownColumn {
                row: row.clone(),
                field: field.to_owned(),
            });
        }
        let key = self.layout.resolve_row(word.as_row(), row, self.types)?;
        if let Some(&address) = self.addresses.get(&key) {
            return Ok(address);
        }
        let address = self.words.len();
        trace!("{}: new control word {} {:?}", row, address, word);
        self.addresses.insert(key, address);
        self.words.push(word.clone());
        Ok(address)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Words in address order.
    pub fn words(&self) -> &[ControlWord] {
        &self.words
    }

    pub fn into_words(self) -> Vec<ControlWord> {
        self.words
    }
}

#[cfg(test)]
mod tests {
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg64Mcg;

    use super::*;
    use crate::control::Fragment;
    use crate::layout::ResolvedSchema;
    use crate::schema::Schema;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    const DOC: &str = r#"{
        "types": [
            {"name": "e_op", "type": "enum", "width": 2, "values": ["NOP", "SUM", "SUB", "AND"]},
            {"name": "e_src", "type": "enum", "width": 2, "values": ["PC", "SP", "HL"]}
        ],
        "tables": [
            {
                "name": "nrom",
                "columns": [
                    {"name": "op", "type": "e_op"},
                    {"name": "src", "type": "e_src"},
                    {"name": "load", "width": 1},
                    {"name": "idx", "width": 2}
                ],
                "labels": ["naddr"]
            }
        ]
    }"#;

    fn word(fragment: Fragment) -> ControlWord {
        ControlWord::from_fragment(&fragment, &RowRef::step("test", 0)).unwrap()
    }

    #[test]
    fn equal_words_share_an_address() {
        init();
        let resolved = ResolvedSchema::new(&Schema::from_json(DOC).unwrap()).unwrap();
        let layout = resolved.layout("nrom").unwrap();
        let mut interner = Interner::new(layout, resolved.types());
        let at = RowRef::step("test", 0);

        let mut intern = |fragment: Fragment| interner.intern(&word(fragment), &at).unwrap();
        assert_eq!(intern(Fragment::new()), 0);
        assert_eq!(intern(Fragment::set("load", 1u64)), 1);
        assert_eq!(intern(Fragment::set("op", "SUM").with("load", 1u64)), 2);
        assert_eq!(intern(Fragment::set("load", 1u64)), 1);
        // Zero values spelled out explicitly resolve to the empty word.
        let zeroes = Fragment::set("op", "NOP").with("src", "PC");
        assert_eq!(intern(zeroes.with("idx", 0u64)), 0);
        assert_eq!(interner.len(), 3);
        assert!(interner.words()[0].is_empty());
    }

    #[test]
    fn bad_words_are_rejected() {
        init();
        let resolved = ResolvedSchema::new(&Schema::from_json(DOC).unwrap()).unwrap();
        let layout = resolved.layout("nrom").unwrap();
        let mut interner = Interner::new(layout, resolved.types());
        let at = RowRef::step("bad", 4);

        assert!(matches!(
            interner.intern(&word(Fragment::set("op", "MUL")), &at),
            Err(CompileError::UnresolvedSymbol { row, .. }) if row == at
        ));
        assert!(matches!(
            interner.intern(&word(Fragment::set("idx", 4u64)), &at),
            Err(CompileError::ValueOutOfRange { value: 4, width: 2, .. })
        ));
        assert!(matches!(
            interner.intern(&word(Fragment::set("naddr", 3u64)), &at),
            Err(CompileError::UnknownColumn { .. })
        ));
        assert!(interner.is_empty());
    }

    /// Randomized check that addresses agree exactly with resolved equality.
    #[test]
    fn dedup_matches_resolved_equality() {
        init();
        let resolved = ResolvedSchema::new(&Schema::from_json(DOC).unwrap()).unwrap();
        let layout = resolved.layout("nrom").unwrap();
        let mut interner = Interner::new(layout, resolved.types());
        let mut rng = Pcg64Mcg::seed_from_u64(0x7800);
        let at = RowRef::step("random", 0);

        let ops = ["NOP", "SUM", "SUB", "AND"];
        let srcs = ["PC", "SP", "HL"];
        let mut seen = Vec::new();
        for _ in 0..500 {
            let mut fragment = Fragment::new();
            if rng.gen_bool(0.5) {
                fragment = fragment.with("op", *ops.choose(&mut rng).unwrap());
            }
            if rng.gen_bool(0.5) {
                fragment = fragment.with("src", *srcs.choose(&mut rng).unwrap());
            }
            if rng.gen_bool(0.5) {
                fragment = fragment.with("load", rng.gen_range(0..2u64));
            }
            if rng.gen_bool(0.5) {
                fragment = fragment.with("idx", rng.gen_range(0..4u64));
            }
            let control = word(fragment);
            let codes = layout
                .resolve_row(control.as_row(), &at, resolved.types())
                .unwrap();
            let address = interner.intern(&control, &at).unwrap();
            seen.push((codes, address));
        }
        for (a_codes, a_addr) in &seen {
            for (b_codes, b_addr) in &seen {
                assert_eq!(a_codes == b_codes, a_addr == b_addr, "{:?}", b_codes);
            }
        }
        // Addresses are handed out densely in first-seen order.
        let mut next = 0;
        for (_, address) in &seen {
            assert!(*address <= next);
            if *address == next {
                next += 1;
            }
        }
        assert_eq!(next, interner.len());
    }
}
