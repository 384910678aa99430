//! Micro-programs: building an instruction's step list and committing it against a cycle
//! budget.

use log::{trace, warn};

use crate::control::{ControlWord, Fragment};
use crate::error::{CompileError, Result, RowRef};
use crate::intern::Interner;

/// A named micro-program: one control-word fragment per cycle.
#[derive(Default, Debug, Clone)]
pub struct Sequence {
    name: String,
    steps: Vec<Fragment>,
}

impl Sequence {
    /// Create an empty sequence. `+` and `-` in the name become `P` and `N` so the name is
    /// usable as an identifier.
    pub fn new(name: impl AsRef<str>) -> Self {
        let name = name
            .as_ref()
            .chars()
            .map(|c| match c {
                '+' => 'P',
                '-' => 'N',
                c => c,
            })
            .collect();
        Self {
            name,
            steps: Vec::new(),
        }
    }

    /// Add a step to the end of the sequence.
    pub fn then(mut self, step: impl Into<Fragment>) -> Self {
        self.push(step);
        self
    }

    /// Add a step to the end of the sequence, in place.
    pub fn push(&mut self, step: impl Into<Fragment>) {
        self.steps.push(step.into());
    }

    /// Append `_suffix` to the name.
    pub fn suffixed(mut self, suffix: &str) -> Self {
        self.name.push('_');
        self.name.push_str(suffix);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[Fragment] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Intern every step and compute the step flags.
    ///
    /// With a budget, the fetch cost is taken off the declared cycles and each step then
    /// costs one cycle. The step that brings the budget to exactly zero is flagged as
    /// overlapping the next fetch; if the fetch alone uses the whole budget the decode entry
    /// is flagged instead. Running more than `window` cycles past zero is an error.
    pub fn build(
        &self,
        budget: Option<CycleBudget>,
        terminal_only: &[String],
        interner: &mut Interner<'_>,
    ) -> Result<BuiltSequence> {
        if self.steps.is_empty() {
            return Err(CompileError::EmptySequence(self.name.clone()));
        }

        let mut remaining = match budget {
            Some(budget) => {
                let left = i64::from(budget.cycles) - i64::from(budget.fetch);
                if left < 0 {
                    return Err(budget.exceeded(RowRef::step(&self.name, 0)));
                }
                Some(left)
            }
            None => None,
        };
        let entry_overlap = remaining == Some(0);

        let last = self.steps.len() - 1;
        let mut steps = Vec::with_capacity(self.steps.len());
        for (index, fragment) in self.steps.iter().enumerate() {
            let row = RowRef::step(&self.name, index);
            let word = ControlWord::from_fragment(fragment, &row)?;
            if index != last {
                if let Some(field) = terminal_only.iter().find(|f| word.contains(f)) {
                    return Err(CompileError::TerminalFieldNotLast {
                        row,
                        field: field.clone(),
                    });
                }
            }

            let mut overlap = false;
            if let (Some(left), Some(budget)) = (remaining.as_mut(), budget) {
                *left -= 1;
                if *left < -i64::from(budget.window) {
                    return Err(budget.exceeded(row));
                }
                overlap = *left == 0;
            }

            let control = interner.intern(&word, &row)?;
            trace!("{} -> control word {}", row, control);
            steps.push(MicroStep {
                control,
                first: index == 0,
                last: index == last,
                overlap,
            });
        }

        if let Some(left) = remaining.filter(|&left| left > 0) {
            warn!(
                "{}: {} cycles of the declared budget are never used",
                self.name, left
            );
        }

        Ok(BuiltSequence {
            name: self.name.clone(),
            steps,
            entry_overlap,
        })
    }
}

/// An instruction's declared cycle count, the cost of fetching its opcode, and how far its
/// last steps may run into the next fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleBudget {
    pub cycles: u32,
    pub fetch: u32,
    pub window: u32,
}

impl CycleBudget {
    fn exceeded(&self, row: RowRef) -> CompileError {
        CompileError::CycleBudgetExceeded {
            row,
            cycles: self.cycles,
            fetch: self.fetch,
        }
    }
}

/// One committed step of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MicroStep {
    /// Address of the step's control word.
    pub control: usize,
    /// Carries the sequence's entry symbol.
    pub first: bool,
    /// Ends the sequence.
    pub last: bool,
    /// The budget reaches zero on this step.
    pub overlap: bool,
}

/// A sequence after interning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltSequence {
    pub name: String,
    pub steps: Vec<MicroStep>,
    /// The opcode fetch used the whole budget.
    pub entry_overlap: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::ResolvedSchema;
    use crate::schema::Schema;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    const DOC: &str = r#"{
        "types": [
            {"name": "e_alu", "type": "enum", "width": 2, "values": ["NOP", "SUM", "SUB"]},
            {"name": "e_sk", "type": "enum", "width": 2, "values": ["NONE", "C", "Z"]}
        ],
        "tables": [
            {
                "name": "nrom",
                "columns": [
                    {"name": "aluop", "type": "e_alu"},
                    {"name": "pswsk", "type": "e_sk"},
                    {"name": "load", "width": 1},
                    {"name": "pc_inc", "width": 1}
                ]
            }
        ]
    }"#;

    fn resolved() -> ResolvedSchema {
        ResolvedSchema::new(&Schema::from_json(DOC).unwrap()).unwrap()
    }

    fn fetch() -> Fragment {
        Fragment::set("pc_inc", 1u64)
    }

    fn load() -> Fragment {
        Fragment::set("load", 1u64)
    }

    fn budget(cycles: u32, window: u32) -> Option<CycleBudget> {
        Some(CycleBudget {
            cycles,
            fetch: 4,
            window,
        })
    }

    #[test]
    fn names_are_sanitized() {
        assert_eq!(Sequence::new("JRE_+").name(), "JRE_P");
        assert_eq!(Sequence::new("JRE_-").suffixed("L0").name(), "JRE_N_L0");
    }

    /// 13 cycles with a single-byte opcode and two operand fetches: 9 steps, with the
    /// overlap on the ninth.
    #[test]
    fn budget_reaches_zero_on_last_step() {
        init();
        let resolved = resolved();
        let mut interner = Interner::new(resolved.layout("nrom").unwrap(), resolved.types());
        let seq = Sequence::new("MVIW")
            .then(fetch())
            .then(load())
            .then(Fragment::new())
            .then(fetch())
            .then(load())
            .then(Fragment::set("aluop", "SUM"))
            .then(Fragment::new())
            .then(load())
            .then(Fragment::new());
        let built = seq.build(budget(13, 0), &[], &mut interner).unwrap();
        assert_eq!(built.steps.len(), 13 - 4);
        assert!(!built.entry_overlap);
        let overlaps: Vec<_> = built.steps.iter().map(|s| s.overlap).collect();
        assert_eq!(overlaps.iter().filter(|&&o| o).count(), 1);
        assert!(built.steps[8].overlap);
        assert!(built.steps[0].first && !built.steps[1].first);
        assert!(built.steps[8].last && !built.steps[7].last);
        // Equal fragments share control words.
        assert_eq!(built.steps[0].control, built.steps[3].control);
        assert_eq!(built.steps[1].control, built.steps[4].control);
        assert_eq!(built.steps[2].control, built.steps[6].control);
        assert_eq!(interner.len(), 4);
    }

    #[test]
    fn overlap_mid_sequence() {
        init();
        let resolved = resolved();
        let mut interner = Interner::new(resolved.layout("nrom").unwrap(), resolved.types());
        let seq = Sequence::new("ADD")
            .then(load())
            .then(Fragment::set("aluop", "SUM"))
            .then(Fragment::new());
        let built = seq.build(budget(6, 3), &[], &mut interner).unwrap();
        let overlaps: Vec<_> = built.steps.iter().map(|s| s.overlap).collect();
        assert_eq!(overlaps, [false, true, false]);
    }

    #[test]
    fn fetch_uses_whole_budget() {
        init();
        let resolved = resolved();
        let mut interner = Interner::new(resolved.layout("nrom").unwrap(), resolved.types());
        let seq = Sequence::new("RLL").then(load()).then(Fragment::new());
        let built = seq.build(budget(4, 3), &[], &mut interner).unwrap();
        assert!(built.entry_overlap);
        assert!(built.steps.iter().all(|s| !s.overlap));
    }

    #[test]
    fn budget_overrun() {
        init();
        let resolved = resolved();
        let mut interner = Interner::new(resolved.layout("nrom").unwrap(), resolved.types());
        let seq = Sequence::new("LONG").then(load()).then(load()).then(load());
        match seq.build(budget(6, 0), &[], &mut interner) {
            Err(CompileError::CycleBudgetExceeded { row, cycles, fetch }) => {
                assert_eq!(row, RowRef::step("LONG", 2));
                assert_eq!((cycles, fetch), (6, 4));
            }
            other => panic!("expected a budget error, got {:?}", other),
        }
        // The same sequence fits once it may run into the next fetch.
        assert!(seq.build(budget(6, 1), &[], &mut interner).is_ok());

        assert!(matches!(
            seq.build(budget(3, 3), &[], &mut interner),
            Err(CompileError::CycleBudgetExceeded { row: RowRef::Step { step: 0, .. }, .. })
        ));
    }

    #[test]
    fn routines_have_no_budget() {
        init();
        let resolved = resolved();
        let mut interner = Interner::new(resolved.layout("nrom").unwrap(), resolved.types());
        let built = Sequence::new("IDLE")
            .then(Fragment::new())
            .build(None, &[], &mut interner)
            .unwrap();
        assert_eq!(
            built.steps,
            [MicroStep {
                control: 0,
                first: true,
                last: true,
                overlap: false,
            }]
        );
        assert!(!built.entry_overlap);
    }

    #[test]
    fn terminal_fields_only_on_last_step() {
        init();
        let resolved = resolved();
        let mut interner = Interner::new(resolved.layout("nrom").unwrap(), resolved.types());
        let terminal = ["pswsk".to_owned()];

        let ok = Sequence::new("SKIP")
            .then(load())
            .then(Fragment::set("pswsk", "C"));
        assert!(ok.build(None, &terminal, &mut interner).is_ok());

        let bad = Sequence::new("BAD")
            .then(Fragment::set("pswsk", "Z"))
            .then(load());
        match bad.build(None, &terminal, &mut interner) {
            Err(CompileError::TerminalFieldNotLast { row, field }) => {
                assert_eq!(row, RowRef::step("BAD", 0));
                assert_eq!(field, "pswsk");
            }
            other => panic!("expected a terminal field error, got {:?}", other),
        }
    }

    #[test]
    fn conflicts_and_empty_sequences() {
        init();
        let resolved = resolved();
        let mut interner = Interner::new(resolved.layout("nrom").unwrap(), resolved.types());

        let conflict = Sequence::new("CONFLICT")
            .then(load())
            .then(Fragment::set("aluop", "SUM") | Fragment::set("aluop", "SUB"));
        assert!(matches!(
            conflict.build(None, &[], &mut interner),
            Err(CompileError::ControlWordConflict { row: RowRef::Step { step: 1, .. }, .. })
        ));

        assert!(matches!(
            Sequence::new("EMPTY").build(None, &[], &mut interner),
            Err(CompileError::EmptySequence(name)) if name == "EMPTY"
        ));
    }
}
