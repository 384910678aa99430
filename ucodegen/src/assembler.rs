//! Assembles instruction definitions into the decode, sequence and control-word tables.

use std::collections::HashMap;
use std::ops::RangeInclusive;

use log::{debug, info};

use crate::config::CompilerConfig;
use crate::control::{ControlWord, Fragment};
use crate::error::{CompileError, Result, RowRef};
use crate::intern::Interner;
use crate::layout::ResolvedSchema;
use crate::sequence::{BuiltSequence, CycleBudget, Sequence};
use crate::table::{Table, TableSet};
use crate::types::max_for_width;
use crate::value::{Row, Value};

/// The opcodes that decode to one instruction: inclusive ranges, minus any excluded
/// opcodes. Every opcode shares the instruction's single sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opcodes {
    ranges: Vec<RangeInclusive<u32>>,
    excluded: Vec<u32>,
}

impl Opcodes {
    pub fn single(opcode: u32) -> Self {
        Self::range(opcode, opcode)
    }

    pub fn range(first: u32, last: u32) -> Self {
        Self {
            ranges: vec![first..=last],
            excluded: Vec::new(),
        }
    }

    /// Add another range of opcodes.
    pub fn and(mut self, opcodes: impl Into<Opcodes>) -> Self {
        let other = opcodes.into();
        self.ranges.extend(other.ranges);
        self.excluded.extend(other.excluded);
        self
    }

    /// Leave out one opcode, typically one decoded by a more specific instruction.
    pub fn except(mut self, opcode: u32) -> Self {
        self.excluded.push(opcode);
        self
    }

    /// Every opcode, in ascending order within each range.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.ranges
            .iter()
            .flat_map(|range| range.clone())
            .filter(move |opcode| !self.excluded.contains(opcode))
    }

    pub fn first(&self) -> Option<u32> {
        self.iter().next()
    }
}

impl From<u32> for Opcodes {
    fn from(opcode: u32) -> Self {
        Opcodes::single(opcode)
    }
}

impl From<RangeInclusive<u32>> for Opcodes {
    fn from(range: RangeInclusive<u32>) -> Self {
        Opcodes::range(*range.start(), *range.end())
    }
}

/// One instruction: where it decodes from, its cycle budget and its micro-program.
#[derive(Debug, Clone)]
pub struct InstructionDef {
    pub opcodes: Opcodes,
    /// Declared cycle count, opcode fetch included.
    pub cycles: u32,
    /// Operand bytes following the opcode.
    pub operands: u32,
    pub sequence: Sequence,
    /// Extra fields for this instruction's decode rows.
    pub decode: Fragment,
}

impl InstructionDef {
    pub fn new(
        opcodes: impl Into<Opcodes>,
        cycles: u32,
        operands: u32,
        sequence: Sequence,
    ) -> Self {
        Self {
            opcodes: opcodes.into(),
            cycles,
            operands,
            sequence,
            decode: Fragment::new(),
        }
    }

    /// Add fields to the decode rows.
    pub fn with_decode(mut self, decode: impl Into<Fragment>) -> Self {
        self.decode = self.decode | decode;
        self
    }
}

/// Collects instructions in commit order. Sequence rows and control words are produced
/// together as each sequence is committed; the sequence table only holds control-word
/// addresses.
#[derive(Debug)]
pub struct Assembler<'a> {
    config: &'a CompilerConfig,
    interner: Interner<'a>,
    decode: Vec<Row>,
    sequence: Vec<Row>,
    entries: HashMap<String, usize>,
    opcodes: HashMap<u32, String>,
}

impl<'a> Assembler<'a> {
    /// Create an assembler for the schema's decode, sequence and control tables.
    pub fn new(resolved: &'a ResolvedSchema, config: &'a CompilerConfig) -> Result<Self> {
        resolved.layout(&config.tables.decode)?;
        resolved.layout(&config.tables.sequence)?;
        let control = resolved.layout(&config.tables.control)?;
        Ok(Self {
            config,
            interner: Interner::new(control, resolved.types()),
            decode: Vec::new(),
            sequence: Vec::new(),
            entries: HashMap::new(),
            opcodes: HashMap::new(),
        })
    }

    /// Intern a control word up front, fixing its address ahead of any sequence.
    pub fn preload(&mut self, word: impl Into<Fragment>) -> Result<usize> {
        let row = RowRef::table(&self.config.tables.control, self.interner.len());
        let word = ControlWord::from_fragment(&word.into(), &row)?;
        self.interner.intern(&word, &row)
    }

    /// Commit a sequence that no opcode decodes to directly and that has no cycle budget.
    /// Returns its entry address.
    pub fn routine(&mut self, sequence: &Sequence) -> Result<usize> {
        let (entry, _) = self.commit(sequence, None)?;
        Ok(entry)
    }

    /// Commit an instruction's sequence and add one decode row per opcode. Returns the
    /// sequence's entry address.
    pub fn instruction(&mut self, def: InstructionDef) -> Result<usize> {
        let name = def.sequence.name().to_owned();
        let first = def.opcodes.first().ok_or_else(|| {
            CompileError::InvalidSchema(format!("instruction `{}` has no opcodes", name))
        })?;
        let width = self.config.opcode_width.min(u32::BITS);
        for opcode in def.opcodes.iter() {
            if u64::from(opcode) > max_for_width(width) {
                return Err(CompileError::ValueOutOfRange {
                    row: RowRef::opcode(&self.config.tables.decode, opcode),
                    field: self.config.fields.opcode.clone(),
                    value: opcode.into(),
                    width,
                });
            }
            if let Some(existing) = self.opcodes.get(&opcode) {
                return Err(CompileError::DuplicateOpcode {
                    opcode,
                    first: existing.clone(),
                    second: name,
                });
            }
        }

        let budget = CycleBudget {
            cycles: def.cycles,
            fetch: self.config.fetch.for_opcode(first),
            window: self.config.overlap_window,
        };
        let (entry, built) = self.commit(&def.sequence, Some(budget))?;

        let table = &self.config.tables.decode;
        let fields = &self.config.fields;
        let extra = ControlWord::from_fragment(&def.decode, &RowRef::opcode(table, first))?;
        for opcode in def.opcodes.iter() {
            let at = RowRef::opcode(table, opcode);
            let mut row = ControlWord::new();
            row.merge(&fields.opcode, Value::from(opcode), &at)?;
            row.merge(&fields.entry, Value::symbol(&built.name), &at)?;
            row.merge(&fields.operands, Value::from(def.operands), &at)?;
            if built.entry_overlap {
                row.merge(&fields.entry_overlap, Value::Int(1), &at)?;
            }
            for (field, value) in extra.iter() {
                row.merge(field, value.clone(), &at)?;
            }
            self.decode.push(row.into_row());
            self.opcodes.insert(opcode, built.name.clone());
        }
        Ok(entry)
    }

    fn commit(
        &mut self,
        sequence: &Sequence,
        budget: Option<CycleBudget>,
    ) -> Result<(usize, BuiltSequence)> {
        if self.entries.contains_key(sequence.name()) {
            return Err(CompileError::DuplicateEntry(sequence.name().to_owned()));
        }
        let built = sequence.build(budget, &self.config.terminal_only, &mut self.interner)?;

        let fields = &self.config.fields;
        let entry = self.sequence.len();
        for step in &built.steps {
            let mut row = Row::new();
            if step.first {
                row.insert(fields.entry.clone(), Value::symbol(&built.name));
            }
            row.insert(fields.control.clone(), Value::Int(step.control as u64));
            if step.overlap {
                row.insert(fields.overlap.clone(), Value::Int(1));
            }
            if step.last {
                row.insert(
                    fields.branch.clone(),
                    Value::symbol(&self.config.end_symbol),
                );
            }
            self.sequence.push(row);
        }
        debug!(
            "Committed {} at {} ({} steps)",
            built.name,
            entry,
            built.steps.len()
        );
        self.entries.insert(built.name.clone(), entry);
        Ok((entry, built))
    }

    /// Entry address of a committed sequence.
    pub fn entry(&self, name: &str) -> Option<usize> {
        self.entries.get(name).copied()
    }

    pub fn decode_rows(&self) -> &[Row] {
        &self.decode
    }

    pub fn sequence_rows(&self) -> &[Row] {
        &self.sequence
    }

    pub fn control_words(&self) -> &[ControlWord] {
        self.interner.words()
    }

    /// Hand over the three tables. Each control word is labelled with its own address.
    pub fn finish(self) -> TableSet {
        let names = &self.config.tables;
        let label = &self.config.fields.control;
        info!(
            "Assembled {} decode rows, {} sequence rows and {} control words",
            self.decode.len(),
            self.sequence.len(),
            self.interner.len()
        );
        let control = self
            .interner
            .into_words()
            .into_iter()
            .enumerate()
            .map(|(address, word)| {
                let mut row = word.into_row();
                row.insert(label.clone(), Value::Int(address as u64));
                row
            })
            .collect();

        let mut set = TableSet::default();
        set.insert(Table::new(names.decode.clone(), self.decode));
        set.insert(Table::new(names.sequence.clone(), self.sequence));
        set.insert(Table::new(names.control.clone(), control));
        set
    }
}
