//! The uPD7800 control signals: bus selectors, ALU controls and strobes.
//!
//! Every selector is a closed enum whose values map one-to-one onto the symbols of its
//! schema type, so a misspelled signal is a compile error instead of a bad microcode row.

use bitflags::bitflags;
use ucodegen::Fragment;

use crate::signal_enum;

/// Register file output select field.
pub const RFOS: &str = "rfos";
/// Register file target select field.
pub const RFTS: &str = "rfts";
/// Special register select field.
pub const SPRS: &str = "sprs";
/// Special data generator select field.
pub const SDGS: &str = "sdgs";
/// Immediate index field.
pub const IDX: &str = "idx";

signal_enum! {
    /// A register of the register file. `IR210` is the register selected by the low three
    /// bits of the opcode.
    pub enum Reg {
        V => "V",
        A => "A",
        B => "B",
        C => "C",
        D => "D",
        E => "E",
        H => "H",
        L => "L",
        /// Work register, holds fetched operands.
        W => "W",
        Spl => "SPL",
        Sph => "SPH",
        Pcl => "PCL",
        Pch => "PCH",
        Psw => "PSW",
        Ir210 => "IR210",
    }
}

signal_enum! {
    /// Special register, selected by opcode bits.
    pub enum Spr {
        Ir3 => "IR3",
        Ir2 => "IR2",
    }
}

signal_enum! {
    /// Special data generators: values derived from the opcode or interrupt state.
    pub enum Sdg {
        /// Sign-extended low displacement of `JR`.
        Jrl => "JRL",
        /// High byte of the `JR` displacement.
        Jrh => "JRH",
        /// `CALF` page.
        Calf => "CALF",
        /// `CALT` table address.
        Calt => "CALT",
        /// Interrupt vector.
        Intva => "INTVA",
        /// Bit mask for `BIT`.
        Bit => "BIT",
    }
}

signal_enum! {
    /// What drives the internal data bus.
    pub enum IdbSelect in "idbs" {
        Zero => "0",
        Rf => "RF",
        Spr => "SPR",
        Sdg => "SDG",
        Db => "DB",
        Co => "CO",
    }
}

signal_enum! {
    /// What latches the internal data bus.
    pub enum LatchSelect in "lts" {
        None => "NONE",
        Rf => "RF",
        Spr => "SPR",
        Ai => "AI",
        Bi => "BI",
        Dor => "DOR",
        Ie => "IE",
        PswCy => "PSW_CY",
        /// Swap with the secondary register set.
        Sec => "SEC",
    }
}

signal_enum! {
    /// What drives the address bus.
    pub enum AddrSource in "abs" {
        Pc => "PC",
        Sp => "SP",
        Bc => "BC",
        De => "DE",
        Hl => "HL",
        Vw => "VW",
        /// Register pair selected by the opcode.
        Ir210 => "IR210",
        Aor => "AOR",
        /// `{idb, W}`.
        IdbW => "IDB_W",
        /// The address bus incrementer output.
        Nabi => "NABI",
    }
}

signal_enum! {
    /// Where the incremented or decremented address bus is written back.
    pub enum AddrTarget in "abits" {
        None => "NONE",
        Pc => "PC",
        Sp => "SP",
        Bc => "BC",
        De => "DE",
        Hl => "HL",
        Ir210 => "IR210",
    }
}

signal_enum! {
    pub enum AluOp in "aluop" {
        Nop => "NOP",
        Sum => "SUM",
        Sub => "SUB",
        And => "AND",
        Or => "OR",
        Eor => "EOR",
        Lsl => "LSL",
        Lsr => "LSR",
        Rol => "ROL",
        Ror => "ROR",
        Inc => "INC",
        Dec => "DEC",
        /// Digit swap.
        Dis => "DIS",
        /// Digit low.
        Dil => "DIL",
        /// Digit high.
        Dih => "DIH",
    }
}

signal_enum! {
    /// ALU carry in.
    pub enum CarryIn in "cis" {
        Zero => "0",
        One => "1",
        PswCy => "PSW_CY",
        /// Carry out of the previous ALU operation.
        Cco => "CCO",
    }
}

signal_enum! {
    /// Condition latched into `PSW.SK`, skipping the next instruction.
    pub enum SkipCond in "pswsk" {
        None => "NONE",
        Always => "1",
        C => "C",
        Nc => "NC",
        Z => "Z",
        Nz => "NZ",
        I => "I",
        Ni => "NI",
        PswC => "PSW_C",
        PswNc => "PSW_NC",
        PswZ => "PSW_Z",
        PswNz => "PSW_NZ",
    }
}

signal_enum! {
    /// String effect of an instruction, carried in its decode row.
    pub enum StrEffect in "sefm" {
        None => "NONE",
        L0 => "L0",
        L1 => "L1",
    }
}

bitflags! {
    /// One-bit strobes. Each flag drives the control-word field named like the flag, in
    /// lower case.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct Strobe: u16 {
        /// ab -> aor.
        const AOUT = 1 << 0;
        const PC_INC = 1 << 1;
        const LOAD = 1 << 2;
        const STORE = 1 << 3;
        const AB_INC = 1 << 4;
        const AB_DEC = 1 << 5;
        /// Write the incremented/decremented pair back to the opcode's register pair.
        const RPIR = 1 << 6;
        /// 0 -> BI.
        const BI0 = 1 << 7;
        /// Invert BI.
        const BIN = 1 << 8;
        const DAA = 1 << 9;
        const PSWZ = 1 << 10;
        const PSWCY = 1 << 11;
        const PSWHC = 1 << 12;
    }
}

impl Strobe {
    /// Field names of the set flags.
    pub fn fields(self) -> impl Iterator<Item = String> {
        self.iter_names().map(|(name, _)| name.to_ascii_lowercase())
    }
}

impl From<Strobe> for Fragment {
    fn from(strobe: Strobe) -> Self {
        strobe.fields().map(|field| (field, 1u64.into())).collect()
    }
}

/// A value driven onto the internal data bus.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IdbSource {
    Zero,
    Rf(Reg),
    Spr(Spr),
    Sdg(Sdg),
    /// The external data bus.
    Db,
    /// ALU result.
    Co,
}

impl From<Reg> for IdbSource {
    fn from(reg: Reg) -> Self {
        IdbSource::Rf(reg)
    }
}

impl From<Spr> for IdbSource {
    fn from(spr: Spr) -> Self {
        IdbSource::Spr(spr)
    }
}

impl From<Sdg> for IdbSource {
    fn from(sdg: Sdg) -> Self {
        IdbSource::Sdg(sdg)
    }
}

impl From<IdbSource> for Fragment {
    fn from(source: IdbSource) -> Self {
        match source {
            IdbSource::Zero => IdbSelect::Zero.into(),
            IdbSource::Rf(reg) => IdbSelect::Rf | Fragment::set(RFOS, reg),
            IdbSource::Spr(spr) => IdbSelect::Spr | Fragment::set(SPRS, spr),
            IdbSource::Sdg(sdg) => IdbSelect::Sdg | Fragment::set(SDGS, sdg),
            IdbSource::Db => IdbSelect::Db.into(),
            IdbSource::Co => IdbSelect::Co.into(),
        }
    }
}

/// A latch loaded from the internal data bus.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IdbTarget {
    Rf(Reg),
    Spr(Spr),
    Ai,
    Bi,
    /// Data output register, written to the external bus on a store.
    Dor,
    Ie,
    PswCy,
    /// Exchange the register group starting at the given register with its secondary set.
    Sec(Reg),
}

impl From<Reg> for IdbTarget {
    fn from(reg: Reg) -> Self {
        IdbTarget::Rf(reg)
    }
}

impl From<Spr> for IdbTarget {
    fn from(spr: Spr) -> Self {
        IdbTarget::Spr(spr)
    }
}

impl From<IdbTarget> for Fragment {
    fn from(target: IdbTarget) -> Self {
        match target {
            IdbTarget::Rf(reg) => LatchSelect::Rf | Fragment::set(RFTS, reg),
            IdbTarget::Spr(spr) => LatchSelect::Spr | Fragment::set(SPRS, spr),
            IdbTarget::Ai => LatchSelect::Ai.into(),
            IdbTarget::Bi => LatchSelect::Bi.into(),
            IdbTarget::Dor => LatchSelect::Dor.into(),
            IdbTarget::Ie => LatchSelect::Ie.into(),
            IdbTarget::PswCy => LatchSelect::PswCy.into(),
            IdbTarget::Sec(reg) => LatchSelect::Sec | Fragment::set(RFTS, reg),
        }
    }
}

/// Drive the internal data bus.
pub fn idb_rd(source: impl Into<IdbSource>) -> Fragment {
    source.into().into()
}

/// Latch the internal data bus.
pub fn idb_wr(target: impl Into<IdbTarget>) -> Fragment {
    target.into().into()
}

/// Select a register file output without driving it onto the internal data bus.
pub fn rf_out(reg: Reg) -> Fragment {
    Fragment::set(RFOS, reg)
}

/// Load the address output register.
pub fn aor_wr(source: AddrSource) -> Fragment {
    source | Strobe::AOUT
}

/// Address the opcode's register pair, writing any increment or decrement back to it.
pub fn aor_wr_rp() -> Fragment {
    aor_wr(AddrSource::Ir210) | AddrTarget::Ir210 | Strobe::RPIR
}

pub fn idx(index: u64) -> Fragment {
    Fragment::set(IDX, index)
}

#[cfg(test)]
mod tests {
    use ucodegen::{ControlWord, RowRef, Value};

    use super::*;

    fn word(fragment: Fragment) -> ControlWord {
        ControlWord::from_fragment(&fragment, &RowRef::step("test", 0)).unwrap()
    }

    #[test]
    fn strobe_fields() {
        let fields: Vec<_> = (Strobe::PC_INC | Strobe::AB_DEC | Strobe::PSWHC)
            .fields()
            .collect();
        assert_eq!(fields, ["pc_inc", "ab_dec", "pswhc"]);
        assert!(Fragment::from(Strobe::empty()).is_empty());
    }

    #[test]
    fn bus_helpers() {
        let w = word(idb_rd(Reg::Pch) | idb_wr(IdbTarget::Dor) | aor_wr(AddrSource::Sp));
        assert_eq!(w.get("idbs"), Some(&Value::symbol("RF")));
        assert_eq!(w.get("rfos"), Some(&Value::symbol("PCH")));
        assert_eq!(w.get("lts"), Some(&Value::symbol("DOR")));
        assert_eq!(w.get("abs"), Some(&Value::symbol("SP")));
        assert_eq!(w.get("aout"), Some(&Value::Int(1)));
        assert_eq!(w.len(), 5);

        let w = word(idb_rd(Sdg::Calt) | idb_wr(Reg::W) | idx(1));
        assert_eq!(w.get("sdgs"), Some(&Value::symbol("CALT")));
        assert_eq!(w.get("rfts"), Some(&Value::symbol("W")));
        assert_eq!(w.get("idx"), Some(&Value::Int(1)));

        let w = word(aor_wr_rp());
        assert_eq!(w.get("abits"), Some(&Value::symbol("IR210")));
        assert_eq!(w.get("rpir"), Some(&Value::Int(1)));
    }

    #[test]
    fn signal_symbols() {
        assert_eq!(SkipCond::Always.symbol(), "1");
        assert_eq!(IdbSelect::Zero.to_string(), "0");
        assert_eq!(AluOp::ALL.len(), 15);
        assert_eq!(Reg::ALL.last(), Some(&Reg::Ir210));
        assert_eq!(LatchSelect::FIELD, "lts");
    }
}
