//! Micro-programs for every uPD7800 instruction.
//!
//! Each builder returns an [`InstructionDef`]: the opcodes it decodes from, its cycle count
//! from the data sheet, its operand byte count and its step list. [`define`] commits the
//! whole instruction set.

use std::fmt;

use ucodegen::{Assembler, Fragment, InstructionDef, Opcodes, Result, Sequence};

use crate::signals::{
    aor_wr, aor_wr_rp, idb_rd, idb_wr, idx, rf_out, AddrSource, AddrTarget, AluOp, CarryIn,
    IdbSource, IdbTarget, LatchSelect, Reg, Sdg, SkipCond, Spr, StrEffect, Strobe,
};

/// Spell a register operand in a sequence name. The opcode-selected register carries its
/// register-file prefix.
fn write_reg(f: &mut fmt::Formatter<'_>, reg: Reg) -> fmt::Result {
    match reg {
        Reg::Ir210 => f.write_str("RF_IR210"),
        reg => write!(f, "{}", reg),
    }
}

/// Destination operand of a move or ALU instruction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Dst {
    Reg(Reg),
    Spr(Spr),
    /// Working-area memory at `{V, wa}`.
    Wa,
}

impl From<Reg> for Dst {
    fn from(reg: Reg) -> Self {
        Dst::Reg(reg)
    }
}

impl From<Spr> for Dst {
    fn from(spr: Spr) -> Self {
        Dst::Spr(spr)
    }
}

impl Dst {
    /// Drive this operand onto the internal data bus. Memory operands arrive on the data bus.
    fn read(self) -> Fragment {
        match self {
            Dst::Reg(reg) => idb_rd(reg),
            Dst::Spr(spr) => idb_rd(spr),
            Dst::Wa => idb_rd(IdbSource::Db),
        }
    }

    /// Latch the internal data bus into this operand. Memory operands go through the data
    /// output register.
    fn write(self) -> Fragment {
        match self {
            Dst::Reg(reg) => idb_wr(reg),
            Dst::Spr(spr) => idb_wr(spr),
            Dst::Wa => idb_wr(IdbTarget::Dor),
        }
    }
}

impl fmt::Display for Dst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dst::Reg(reg) => write_reg(f, *reg),
            Dst::Spr(spr) => write!(f, "SPR_{}", spr),
            Dst::Wa => f.write_str("WA"),
        }
    }
}

/// Source operand of a move or ALU instruction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Src {
    Reg(Reg),
    Spr(Spr),
    /// Immediate byte following the opcode.
    Imm,
    /// Working-area memory at `{V, wa}`.
    Wa,
    /// Memory addressed by the opcode's register pair.
    Ind,
    /// No second operand, as for shifts and rotates.
    Implied,
}

impl From<Reg> for Src {
    fn from(reg: Reg) -> Self {
        Src::Reg(reg)
    }
}

impl From<Spr> for Src {
    fn from(spr: Spr) -> Self {
        Src::Spr(spr)
    }
}

impl Src {
    /// Drive this operand onto the internal data bus. Memory and immediate operands arrive
    /// on the data bus. Empty for an implied operand.
    fn read(self) -> Fragment {
        match self {
            Src::Reg(reg) => idb_rd(reg),
            Src::Spr(spr) => idb_rd(spr),
            Src::Imm | Src::Wa | Src::Ind => idb_rd(IdbSource::Db),
            Src::Implied => Fragment::new(),
        }
    }

    /// Copy this operand to `target`. Empty for an implied operand.
    fn read_to(self, target: IdbTarget) -> Fragment {
        match self {
            Src::Implied => Fragment::new(),
            src => src.read() | idb_wr(target),
        }
    }
}

impl fmt::Display for Src {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Src::Reg(reg) => write_reg(f, *reg),
            Src::Spr(spr) => write!(f, "SPR_{}", spr),
            Src::Imm => f.write_str("IMM"),
            Src::Wa => f.write_str("WA"),
            Src::Ind => f.write_str("IND"),
            // Names keep the separator before an implied operand, as in `RLL_A_`.
            Src::Implied => Ok(()),
        }
    }
}

/// A 16-bit register pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RegPair {
    Sp,
    Bc,
    De,
    Hl,
}

impl RegPair {
    /// Low and high halves.
    pub fn halves(self) -> (Reg, Reg) {
        match self {
            RegPair::Sp => (Reg::Spl, Reg::Sph),
            RegPair::Bc => (Reg::C, Reg::B),
            RegPair::De => (Reg::E, Reg::D),
            RegPair::Hl => (Reg::L, Reg::H),
        }
    }

    fn addr_source(self) -> AddrSource {
        match self {
            RegPair::Sp => AddrSource::Sp,
            RegPair::Bc => AddrSource::Bc,
            RegPair::De => AddrSource::De,
            RegPair::Hl => AddrSource::Hl,
        }
    }

    fn addr_target(self) -> AddrTarget {
        match self {
            RegPair::Sp => AddrTarget::Sp,
            RegPair::Bc => AddrTarget::Bc,
            RegPair::De => AddrTarget::De,
            RegPair::Hl => AddrTarget::Hl,
        }
    }
}

impl fmt::Display for RegPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RegPair::Sp => "SP",
            RegPair::Bc => "BC",
            RegPair::De => "DE",
            RegPair::Hl => "HL",
        })
    }
}

/// A register pair as pushed to or popped from the stack: high byte at the higher address.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StackPair {
    Va,
    Bc,
    De,
    Hl,
}

impl StackPair {
    /// High and low halves.
    pub fn halves(self) -> (Reg, Reg) {
        match self {
            StackPair::Va => (Reg::V, Reg::A),
            StackPair::Bc => (Reg::B, Reg::C),
            StackPair::De => (Reg::D, Reg::E),
            StackPair::Hl => (Reg::H, Reg::L),
        }
    }
}

impl fmt::Display for StackPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (hi, lo) = self.halves();
        write!(f, "{}{}", hi, lo)
    }
}

/// Arithmetic, logic and compare operations.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MathOp {
    Add,
    Adc,
    Sub,
    Sbb,
    And,
    Or,
    Xor,
    Sll,
    Slr,
    Rll,
    Rlr,
    Bit,
    Cmp,
    Cmpb,
}

impl MathOp {
    fn alu(self) -> Fragment {
        match self {
            MathOp::Add => AluOp::Sum.into(),
            MathOp::Adc => AluOp::Sum | CarryIn::PswCy,
            MathOp::Sub => AluOp::Sub | Strobe::BIN,
            MathOp::Sbb => AluOp::Sub | Strobe::BIN | CarryIn::PswCy,
            MathOp::And | MathOp::Bit => AluOp::And.into(),
            MathOp::Or => AluOp::Or.into(),
            MathOp::Xor => AluOp::Eor.into(),
            MathOp::Sll => AluOp::Lsl.into(),
            MathOp::Slr => AluOp::Lsr.into(),
            MathOp::Rll => AluOp::Rol | CarryIn::PswCy,
            MathOp::Rlr => AluOp::Ror | CarryIn::PswCy,
            MathOp::Cmp => AluOp::Sub | Strobe::BIN | CarryIn::Zero,
            MathOp::Cmpb => AluOp::Sub | Strobe::BIN | CarryIn::One,
        }
    }

    /// PSW flags updated by the operation.
    fn psw(self) -> Strobe {
        match self {
            MathOp::Add | MathOp::Adc | MathOp::Sub | MathOp::Sbb | MathOp::Cmp | MathOp::Cmpb => {
                Strobe::PSWZ | Strobe::PSWCY | Strobe::PSWHC
            }
            MathOp::And | MathOp::Or | MathOp::Xor | MathOp::Bit => Strobe::PSWZ,
            MathOp::Sll | MathOp::Slr | MathOp::Rll | MathOp::Rlr => Strobe::PSWCY,
        }
    }

    /// Only updates flags; the result is discarded.
    fn is_test(self) -> bool {
        matches!(self, MathOp::Bit | MathOp::Cmp | MathOp::Cmpb)
    }
}

impl fmt::Display for MathOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MathOp::Add => "ADD",
            MathOp::Adc => "ADC",
            MathOp::Sub => "SUB",
            MathOp::Sbb => "SBB",
            MathOp::And => "AND",
            MathOp::Or => "OR",
            MathOp::Xor => "XOR",
            MathOp::Sll => "SLL",
            MathOp::Slr => "SLR",
            MathOp::Rll => "RLL",
            MathOp::Rlr => "RLR",
            MathOp::Bit => "BIT",
            MathOp::Cmp => "CMP",
            MathOp::Cmpb => "CMPB",
        })
    }
}

/// Skip condition of an ALU instruction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Skip {
    Never,
    /// No carry.
    Nc,
    /// No borrow.
    Nb,
    /// Borrow.
    B,
    Z,
    Nz,
}

impl Skip {
    fn cond(self) -> Fragment {
        match self {
            Skip::Never => Fragment::new(),
            Skip::Nc | Skip::Nb => SkipCond::Nc.into(),
            Skip::B => SkipCond::C.into(),
            Skip::Z => SkipCond::Z.into(),
            Skip::Nz => SkipCond::Nz.into(),
        }
    }
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Skip::Never => "",
            Skip::Nc => "NC",
            Skip::Nb => "NB",
            Skip::B => "B",
            Skip::Z => "Z",
            Skip::Nz => "NZ",
        })
    }
}

/// Comparisons that skip the next instruction when they hold.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Test {
    Eq,
    Neq,
    Gt,
    Lt,
    On,
    Off,
}

impl Test {
    fn op(self) -> (MathOp, Skip) {
        match self {
            Test::Eq => (MathOp::Cmp, Skip::Z),
            Test::Neq => (MathOp::Cmp, Skip::Nz),
            Test::Gt => (MathOp::Cmpb, Skip::Nb),
            Test::Lt => (MathOp::Cmp, Skip::B),
            Test::On => (MathOp::Bit, Skip::Nz),
            Test::Off => (MathOp::Bit, Skip::Z),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IncDec {
    Inc,
    Dec,
}

impl IncDec {
    fn alu(self) -> AluOp {
        match self {
            IncDec::Inc => AluOp::Inc,
            IncDec::Dec => AluOp::Dec,
        }
    }

    fn addr_strobe(self) -> Strobe {
        match self {
            IncDec::Inc => Strobe::AB_INC,
            IncDec::Dec => Strobe::AB_DEC,
        }
    }
}

impl fmt::Display for IncDec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IncDec::Inc => "INC",
            IncDec::Dec => "DEC",
        })
    }
}

/// Return variants.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Ret {
    Ret,
    /// Return and skip the next instruction.
    Rets,
    /// Return from interrupt, restoring PSW.
    Reti,
}

impl fmt::Display for Ret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Ret::Ret => "RET",
            Ret::Rets => "RETS",
            Ret::Reti => "RETI",
        })
    }
}

// Common control words. The first four are preloaded so they have fixed addresses.

pub fn idle() -> Fragment {
    Fragment::new()
}

/// Put PC on the address bus and increment it: the first cycle of an operand fetch.
pub fn pc_out_inc() -> Fragment {
    (Strobe::AOUT | Strobe::PC_INC).into()
}

pub fn load() -> Fragment {
    Strobe::LOAD.into()
}

/// Drive the data output register onto the data bus.
pub fn store() -> Fragment {
    Strobe::STORE.into()
}

fn write_db_to_w() -> Fragment {
    idb_rd(IdbSource::Db) | idb_wr(Reg::W)
}

/// DB -> idb -> AI, 0 -> BI, AI + BI -> CO.
fn write_db_to_co() -> Fragment {
    idb_rd(IdbSource::Db) | idb_wr(IdbTarget::Ai) | Strobe::BI0 | AluOp::Sum
}

/// SP - 1 -> SP.
fn dec_sp() -> Fragment {
    AddrSource::Sp | Strobe::AB_DEC | AddrTarget::Sp
}

/// SP + 1 -> SP.
fn inc_sp() -> Fragment {
    AddrSource::Sp | Strobe::AB_INC | AddrTarget::Sp
}

fn store_co_to_vw() -> Fragment {
    idb_rd(IdbSource::Co) | idb_wr(IdbTarget::Dor) | aor_wr(AddrSource::Vw)
}

/// Fetch the working-area offset into W and address `{V, W}`. The next step loads.
fn fetch_wa(seq: Sequence) -> Sequence {
    seq.then(pc_out_inc()).then(load()).then(write_db_to_w())
}

/// An instruction with no string effect.
fn ins(opcodes: impl Into<Opcodes>, cycles: u32, operands: u32, seq: Sequence) -> InstructionDef {
    with_effect(opcodes, cycles, operands, seq, StrEffect::None)
}

/// An instruction whose decode row carries a string effect. Any effect but `NONE` is also
/// appended to the sequence name.
fn with_effect(
    opcodes: impl Into<Opcodes>,
    cycles: u32,
    operands: u32,
    seq: Sequence,
    effect: StrEffect,
) -> InstructionDef {
    let seq = match effect {
        StrEffect::None => seq,
        effect => seq.suffixed(effect.symbol()),
    };
    InstructionDef::new(opcodes, cycles, operands, seq).with_decode(effect)
}

/// A single-step instruction.
pub fn simple(
    opcodes: impl Into<Opcodes>,
    cycles: u32,
    name: &str,
    step: impl Into<Fragment>,
) -> InstructionDef {
    ins(opcodes, cycles, 0, Sequence::new(name).then(step))
}

// Move / load / store

/// `MOV`/`MVI`: register, special register or immediate to register.
pub fn mov(
    opcodes: impl Into<Opcodes>,
    cycles: u32,
    dst: impl Into<Dst>,
    src: impl Into<Src>,
    effect: StrEffect,
) -> InstructionDef {
    let (dst, src) = (dst.into(), src.into());
    let seq = Sequence::new(format!("MOV_{}_{}", dst, src));
    let (seq, operands) = match src {
        Src::Imm => (
            seq.then(pc_out_inc())
                .then(load())
                .then(src.read() | dst.write()),
            1,
        ),
        _ => (seq.then(src.read() | dst.write()), 0),
    };
    with_effect(opcodes, cycles, operands, seq, effect)
}

/// `LDAW`: working-area byte to a register.
pub fn load_wa(opcodes: impl Into<Opcodes>, cycles: u32, dst: Reg) -> InstructionDef {
    let seq = fetch_wa(Sequence::new(format!("LD_{}_WA", dst)))
        .then(aor_wr(AddrSource::Vw))
        .then(load())
        .then(idb_rd(IdbSource::Db) | idb_wr(dst));
    ins(opcodes, cycles, 1, seq)
}

/// `LXI`: 16-bit immediate to a register pair.
pub fn load_imm16(
    opcodes: impl Into<Opcodes>,
    cycles: u32,
    rp: RegPair,
    effect: StrEffect,
) -> InstructionDef {
    let (lo, hi) = rp.halves();
    let seq = Sequence::new(format!("LDX_{}_IMM", rp))
        .then(pc_out_inc())
        .then(load())
        .then(idb_rd(IdbSource::Db) | idb_wr(lo))
        .then(pc_out_inc())
        .then(load())
        .then(idb_rd(IdbSource::Db) | idb_wr(hi));
    with_effect(opcodes, cycles, 2, seq, effect)
}

/// `LDAX`: memory at the opcode's register pair to A.
pub fn loadx(opcodes: impl Into<Opcodes>, cycles: u32) -> InstructionDef {
    let seq = Sequence::new("LDAX")
        .then(aor_wr_rp())
        .then(load())
        .then(idb_rd(IdbSource::Db) | idb_wr(Reg::A));
    ins(opcodes, cycles, 0, seq)
}

/// Fetch a 16-bit address: low byte into W, high byte into CO, then address it.
fn fetch_word_address(seq: Sequence, during_hi_load: Fragment) -> Sequence {
    seq.then(pc_out_inc())
        .then(load())
        .then(write_db_to_w())
        .then(pc_out_inc())
        .then(load() | during_hi_load)
        .then(write_db_to_co())
        .then(idb_rd(IdbSource::Co) | aor_wr(AddrSource::IdbW))
}

/// `MOV r, word`.
pub fn load_abs(opcodes: impl Into<Opcodes>, cycles: u32) -> InstructionDef {
    let seq = fetch_word_address(Sequence::new("LD_IR210_ABS"), idle())
        .then(load())
        .then(idb_rd(IdbSource::Db) | idb_wr(Reg::Ir210));
    ins(opcodes, cycles, 2, seq)
}

/// `LSPD`/`LBCD`/`LDED`/`LHLD`: register pair from a 16-bit address.
pub fn load_ind(opcodes: impl Into<Opcodes>, cycles: u32, rp: RegPair) -> InstructionDef {
    let (lo, hi) = rp.halves();
    let seq = fetch_word_address(Sequence::new(format!("L{}D", rp)), idle())
        .then(load())
        .then(idb_rd(IdbSource::Db) | idb_wr(lo) | AddrSource::Aor)
        .then(aor_wr(AddrSource::Nabi) | Strobe::AB_INC)
        .then(load())
        .then(idb_rd(IdbSource::Db) | idb_wr(hi));
    ins(opcodes, cycles, 2, seq)
}

fn store_rp(seq: Sequence, src: Reg) -> Sequence {
    seq.then(idb_rd(src) | idb_wr(IdbTarget::Dor) | aor_wr_rp())
        .then(store())
        .then(idle())
}

/// `STAX`: A to memory at the opcode's register pair.
pub fn storex(opcodes: impl Into<Opcodes>, cycles: u32) -> InstructionDef {
    ins(opcodes, cycles, 0, store_rp(Sequence::new("STX_A"), Reg::A))
}

/// `MVIX`: immediate byte to memory at the opcode's register pair.
pub fn mvix(opcodes: impl Into<Opcodes>, cycles: u32) -> InstructionDef {
    let seq = Sequence::new("STX_RF_W")
        .then(pc_out_inc())
        .then(load())
        .then(idb_rd(IdbSource::Db) | idb_wr(Reg::W));
    ins(opcodes, cycles, 1, store_rp(seq, Reg::W))
}

/// `STAW`: A to the working area.
pub fn staw(opcodes: impl Into<Opcodes>, cycles: u32) -> InstructionDef {
    let seq = fetch_wa(Sequence::new("STW_A"))
        .then(idb_rd(Reg::A) | idb_wr(IdbTarget::Dor) | aor_wr(AddrSource::Vw))
        .then(store())
        .then(idle());
    ins(opcodes, cycles, 1, seq)
}

/// `MVIW`: immediate byte to the working area.
pub fn mviw(opcodes: impl Into<Opcodes>, cycles: u32) -> InstructionDef {
    let seq = fetch_wa(Sequence::new("STW_IMM"))
        .then(pc_out_inc())
        .then(load())
        .then(write_db_to_co())
        .then(idb_rd(IdbSource::Co) | idb_wr(IdbTarget::Dor) | aor_wr(AddrSource::Vw))
        .then(store())
        .then(idle());
    ins(opcodes, cycles, 2, seq)
}

/// `MOV word, r`.
pub fn store_abs(opcodes: impl Into<Opcodes>, cycles: u32) -> InstructionDef {
    let seq = Sequence::new("ST_IR210_ABS")
        .then(pc_out_inc())
        .then(load() | idb_rd(Reg::Ir210) | idb_wr(IdbTarget::Dor))
        .then(write_db_to_w())
        .then(pc_out_inc())
        .then(load())
        .then(write_db_to_co())
        .then(idb_rd(IdbSource::Co) | aor_wr(AddrSource::IdbW))
        .then(store())
        .then(idle());
    ins(opcodes, cycles, 2, seq)
}

/// `SSPD`/`SBCD`/`SDED`/`SHLD`: register pair to a 16-bit address.
pub fn store_ind(opcodes: impl Into<Opcodes>, cycles: u32, rp: RegPair) -> InstructionDef {
    let (lo, hi) = rp.halves();
    let seq = fetch_word_address(
        Sequence::new(format!("S{}D", rp)),
        idb_rd(lo) | idb_wr(IdbTarget::Dor),
    )
    .then(store())
    .then(AddrSource::Aor)
    .then(idb_rd(hi) | idb_wr(IdbTarget::Dor) | aor_wr(AddrSource::Nabi) | Strobe::AB_INC)
    .then(store())
    .then(idle());
    ins(opcodes, cycles, 2, seq)
}

/// `TABLE`: C <- (PC+2+A), B <- (PC+2+A+1).
pub fn table(opcodes: impl Into<Opcodes>, cycles: u32) -> InstructionDef {
    let seq = Sequence::new("TABLE")
        .then(idb_rd(Reg::Pcl) | idb_wr(IdbTarget::Ai))
        .then(idle())
        .then(idle())
        .then(idb_rd(Reg::A) | idb_wr(IdbTarget::Bi) | AluOp::Sum | CarryIn::One)
        .then(idb_rd(IdbSource::Co) | idb_wr(Reg::W))
        .then(idle())
        .then(idb_rd(Reg::Pch) | idb_wr(IdbTarget::Ai) | AluOp::Sum | Strobe::BI0 | CarryIn::Cco)
        .then(idle())
        .then(idle())
        .then(idb_rd(IdbSource::Co) | aor_wr(AddrSource::IdbW))
        .then(load())
        .then(idb_rd(IdbSource::Db) | idb_wr(Reg::C) | AddrSource::Aor)
        .then(aor_wr(AddrSource::Nabi) | Strobe::AB_INC)
        .then(load())
        .then(idb_rd(IdbSource::Db) | idb_wr(Reg::B));
    ins(opcodes, cycles, 0, seq)
}

/// `BLOCK`: (DE)+ <- (HL)+, C <- C - 1, repeating until C borrows.
pub fn block(opcodes: impl Into<Opcodes>, cycles: u32) -> InstructionDef {
    let seq = Sequence::new("BLOCK")
        .then(aor_wr(AddrSource::Hl))
        .then(AddrSource::Hl | Strobe::AB_INC | AddrTarget::Hl | Strobe::LOAD)
        .then(idb_rd(IdbSource::Db) | idb_wr(Reg::W))
        .then(idb_rd(Reg::W) | idb_wr(IdbTarget::Dor) | aor_wr(AddrSource::De))
        .then(store() | AddrSource::De | Strobe::AB_INC | AddrTarget::De)
        .then(idle())
        .then(idb_rd(Reg::C) | idb_wr(IdbTarget::Ai) | AluOp::Dec)
        .then(idb_rd(IdbSource::Co) | idb_wr(Reg::C))
        // Back up PC so the instruction repeats until the skip is taken.
        .then(SkipCond::C | AddrSource::Pc | Strobe::AB_DEC);
    ins(opcodes, cycles, 0, seq)
}

// Math / logic / test

/// Every two-operand ALU instruction.
pub fn alu(
    opcodes: impl Into<Opcodes>,
    cycles: u32,
    op: MathOp,
    dst: impl Into<Dst>,
    src: impl Into<Src>,
    skip: Skip,
) -> InstructionDef {
    let (dst, src) = (dst.into(), src.into());
    let name = format!("{}{}_{}_{}", op, skip, dst, src);
    let operands = u32::from(src == Src::Imm) + u32::from(src == Src::Wa || dst == Dst::Wa);
    let dst_to_ai = dst.read() | idb_wr(IdbTarget::Ai);
    let flags = skip.cond() | op.psw();

    let mut seq = Sequence::new(name);
    seq = match (dst, src) {
        (Dst::Wa, Src::Imm) => fetch_wa(seq)
            .then(aor_wr(AddrSource::Vw))
            .then(load())
            .then(dst_to_ai)
            .then(pc_out_inc())
            .then(load()),
        // Special registers take a full M-cycle to read.
        (Dst::Spr(_), Src::Imm) => seq
            .then(idle())
            .then(idle())
            .then(dst_to_ai)
            .then(pc_out_inc())
            .then(load()),
        (_, Src::Imm) => seq.then(pc_out_inc() | dst_to_ai).then(load()),
        (_, Src::Ind) => seq.then(aor_wr_rp()).then(load() | dst_to_ai),
        (_, Src::Wa) => fetch_wa(seq)
            .then(aor_wr(AddrSource::Vw) | dst_to_ai)
            .then(load()),
        _ => seq.then(dst_to_ai),
    };
    seq.push(src.read_to(IdbTarget::Bi) | op.alu());

    if op.is_test() {
        seq.push(flags);
    } else {
        seq = match dst {
            Dst::Wa => seq.then(store_co_to_vw()).then(store()).then(flags),
            // And a full M-cycle to write.
            Dst::Spr(_) => seq
                .then(idle())
                .then(idle())
                .then(idb_rd(IdbSource::Co) | dst.write() | flags),
            Dst::Reg(_) => seq.then(idb_rd(IdbSource::Co) | dst.write() | flags),
        };
    }
    ins(opcodes, cycles, operands, seq)
}

/// A comparison that skips the next instruction when it holds.
pub fn test(
    opcodes: impl Into<Opcodes>,
    cycles: u32,
    test: Test,
    dst: impl Into<Dst>,
    src: impl Into<Src>,
) -> InstructionDef {
    let (op, skip) = test.op();
    alu(opcodes, cycles, op, dst, src, skip)
}

/// `INR`/`DCR`/`INRW`/`DCRW`: 8-bit increment or decrement, skipping on carry.
pub fn incdec(
    opcodes: impl Into<Opcodes>,
    cycles: u32,
    dir: IncDec,
    dst: impl Into<Dst>,
) -> InstructionDef {
    let dst = dst.into();
    let flags = SkipCond::C | Strobe::PSWZ | Strobe::PSWHC;
    let mut seq = Sequence::new(format!("{}R_{}", dir, dst));
    if dst == Dst::Wa {
        seq = fetch_wa(seq).then(aor_wr(AddrSource::Vw)).then(load());
    }
    seq.push(dst.read() | idb_wr(IdbTarget::Ai) | dir.alu());
    seq = match dst {
        Dst::Wa => seq.then(store_co_to_vw()).then(store()).then(flags),
        _ => seq.then(idb_rd(IdbSource::Co) | dst.write() | flags),
    };
    ins(opcodes, cycles, u32::from(dst == Dst::Wa), seq)
}

/// `INX`/`DCX`: 16-bit increment or decrement through the address incrementer.
pub fn incdecx(
    opcodes: impl Into<Opcodes>,
    cycles: u32,
    dir: IncDec,
    rp: RegPair,
) -> InstructionDef {
    let seq = Sequence::new(format!("{}_{}", dir, rp))
        .then(rp.addr_source() | dir.addr_strobe() | rp.addr_target())
        .then(idle())
        .then(idle());
    ins(opcodes, cycles, 0, seq)
}

/// `DAA`: decimal adjust A.
pub fn daa(opcodes: impl Into<Opcodes>, cycles: u32) -> InstructionDef {
    let flags = Strobe::PSWZ | Strobe::PSWHC | Strobe::PSWCY;
    let seq = Sequence::new("DAA")
        .then(idb_rd(Reg::A) | idb_wr(IdbTarget::Ai) | Strobe::DAA | AluOp::Sum)
        .then(idb_rd(IdbSource::Co) | idb_wr(Reg::A) | flags);
    ins(opcodes, cycles, 0, seq)
}

/// Read (HL) into W. The first three steps of the digit rotates.
fn digit_prologue(name: &str) -> Sequence {
    Sequence::new(name)
        .then(aor_wr(AddrSource::Hl))
        .then(load())
        .then(write_db_to_w())
}

/// Store CO to (HL) while W goes back into AI for the final digit step.
fn digit_epilogue(seq: Sequence) -> Sequence {
    let co_to_hl = aor_wr(AddrSource::Hl) | idb_rd(IdbSource::Co) | idb_wr(IdbTarget::Dor);
    seq.then(co_to_hl | rf_out(Reg::W))
        .then(store() | idb_rd(Reg::W) | idb_wr(IdbTarget::Ai) | AluOp::Dil)
        .then(idb_rd(Reg::A) | idb_wr(IdbTarget::Ai) | AluOp::Dih)
        .then(idb_rd(IdbSource::Co) | idb_wr(Reg::A))
}

/// `RLD`: A[3:0] <- (HL)[7:4] <- (HL)[3:0] <- A[3:0].
pub fn rld(opcodes: impl Into<Opcodes>, cycles: u32) -> InstructionDef {
    let seq = digit_prologue("RLD")
        .then(idb_rd(Reg::W) | idb_wr(IdbTarget::Ai) | AluOp::Dis)
        .then(idb_rd(IdbSource::Co) | idb_wr(Reg::W))
        .then(idb_rd(Reg::A) | idb_wr(IdbTarget::Ai) | AluOp::Dil);
    ins(opcodes, cycles, 0, digit_epilogue(seq))
}

/// `RRD`: A[3:0] -> (HL)[7:4] -> (HL)[3:0] -> A[3:0].
pub fn rrd(opcodes: impl Into<Opcodes>, cycles: u32) -> InstructionDef {
    let seq = digit_prologue("RRD")
        .then(idb_rd(Reg::W) | idb_wr(IdbTarget::Ai) | AluOp::Dih)
        .then(idb_rd(Reg::A) | idb_wr(IdbTarget::Ai) | AluOp::Dil)
        .then(idb_rd(IdbSource::Co) | idb_wr(IdbTarget::Ai) | AluOp::Dis);
    ins(opcodes, cycles, 0, digit_epilogue(seq))
}

// Jump / call / return

/// `JR`: PC-relative jump with the displacement in the opcode.
pub fn jr(opcodes: impl Into<Opcodes>, cycles: u32) -> InstructionDef {
    let seq = Sequence::new("JR")
        .then(idb_rd(Reg::Pcl) | idb_wr(IdbTarget::Ai))
        .then(idb_rd(Sdg::Jrl) | idb_wr(IdbTarget::Bi))
        .then(AluOp::Sum | CarryIn::Zero)
        .then(idb_rd(IdbSource::Co) | idb_wr(Reg::Pcl))
        .then(idb_rd(Reg::Pch) | idb_wr(IdbTarget::Ai))
        .then(idb_rd(Sdg::Jrh) | idb_wr(IdbTarget::Bi))
        .then(AluOp::Sum | CarryIn::Cco)
        .then(idb_rd(IdbSource::Co) | idb_wr(Reg::Pch))
        .then(idle());
    ins(opcodes, cycles, 0, seq)
}

/// `JRE`: PC-relative jump with a displacement byte. The opcode carries the sign.
pub fn jre(opcodes: impl Into<Opcodes>, cycles: u32, negative: bool) -> InstructionDef {
    let mut high =
        idb_rd(Reg::Pch) | idb_wr(IdbTarget::Ai) | Strobe::BI0 | AluOp::Sum | CarryIn::Cco;
    if negative {
        high = high | Strobe::BIN;
    }
    let seq = Sequence::new(format!("JRE_{}", if negative { '-' } else { '+' }))
        .then(pc_out_inc())
        .then(idb_rd(Reg::Pcl) | idb_wr(IdbTarget::Ai) | Strobe::LOAD)
        .then(idb_rd(IdbSource::Db) | idb_wr(IdbTarget::Bi) | AluOp::Sum | CarryIn::Zero)
        .then(idb_rd(IdbSource::Co) | idb_wr(Reg::Pcl))
        .then(high)
        .then(idb_rd(IdbSource::Co) | idb_wr(Reg::Pch))
        .then(idle())
        .then(idle())
        .then(idle());
    ins(opcodes, cycles, 1, seq)
}

/// `JMP word`.
pub fn jmp(opcodes: impl Into<Opcodes>, cycles: u32) -> InstructionDef {
    let seq = Sequence::new("JMP")
        .then(pc_out_inc())
        .then(load())
        .then(write_db_to_w())
        .then(pc_out_inc())
        .then(idb_rd(Reg::W) | idb_wr(Reg::Pcl) | load())
        .then(idb_rd(IdbSource::Db) | idb_wr(Reg::Pch));
    ins(opcodes, cycles, 2, seq)
}

/// `JB`: jump to BC.
pub fn jb(opcodes: impl Into<Opcodes>, cycles: u32) -> InstructionDef {
    let step = aor_wr(AddrSource::Bc) | AddrTarget::Pc | Strobe::AB_INC | Strobe::AB_DEC;
    ins(opcodes, cycles, 0, Sequence::new("JB").then(step))
}

/// Decrement SP and push PCH then PCL. Leaves SP pointing at PCL.
fn push_pc(seq: Sequence, during_pch: Fragment, during_pcl: Fragment) -> Sequence {
    seq.then(idb_rd(Reg::Pch) | idb_wr(IdbTarget::Dor) | aor_wr(AddrSource::Sp))
        .then(store() | during_pch)
        .then(dec_sp())
        .then(idb_rd(Reg::Pcl) | idb_wr(IdbTarget::Dor) | aor_wr(AddrSource::Sp))
        .then(store() | during_pcl)
}

/// Two idle cycles, then SP - 1: the start of every call without an operand.
fn enter_call(name: &str) -> Sequence {
    Sequence::new(name).then(idle()).then(idle()).then(dec_sp())
}

/// `CALL word`.
pub fn call(opcodes: impl Into<Opcodes>, cycles: u32) -> InstructionDef {
    let seq = Sequence::new("CALL")
        .then(pc_out_inc())
        .then(load())
        .then(write_db_to_w())
        .then(pc_out_inc())
        .then(load())
        .then(write_db_to_co() | dec_sp());
    let seq = push_pc(seq, idle(), idb_rd(Reg::W) | idb_wr(Reg::Pcl))
        .then(idb_rd(IdbSource::Co) | idb_wr(Reg::Pch));
    ins(opcodes, cycles, 2, seq)
}

/// `CALB`: call BC.
pub fn calb(opcodes: impl Into<Opcodes>, cycles: u32) -> InstructionDef {
    let seq = push_pc(
        enter_call("CALB"),
        idb_rd(Reg::B) | idb_wr(Reg::Pch),
        idb_rd(Reg::C) | idb_wr(Reg::Pcl),
    )
    .then(idle());
    ins(opcodes, cycles, 0, seq)
}

/// `CALF`: call into the fixed page at 0x0800, low byte from the operand.
pub fn calf(opcodes: impl Into<Opcodes>, cycles: u32) -> InstructionDef {
    let seq = Sequence::new("CALF")
        .then(Strobe::PC_INC)
        .then(load())
        .then(write_db_to_w() | dec_sp());
    let seq = push_pc(seq, idle(), idle())
        .then(AddrSource::Pc | Strobe::AB_DEC | AddrTarget::Pc)
        .then(aor_wr(AddrSource::Pc))
        .then(load() | idb_rd(Sdg::Calf) | idb_wr(Reg::Pch))
        .then(idb_rd(IdbSource::Db) | idb_wr(Reg::Pcl));
    ins(opcodes, cycles, 1, seq)
}

/// `CALT`: call through the table at 0x0080.
pub fn calt(opcodes: impl Into<Opcodes>, cycles: u32) -> InstructionDef {
    let seq = push_pc(enter_call("CALT"), idle(), idle())
        .then(idx(0) | idb_rd(Sdg::Calt) | idb_wr(Reg::W))
        .then(idb_rd(IdbSource::Zero) | aor_wr(AddrSource::IdbW))
        .then(load() | idx(1) | idb_rd(Sdg::Calt) | idb_wr(Reg::W))
        .then(idb_rd(IdbSource::Db) | idb_wr(Reg::Pcl))
        .then(idb_rd(IdbSource::Zero) | aor_wr(AddrSource::IdbW))
        .then(load())
        .then(idb_rd(IdbSource::Db) | idb_wr(Reg::Pch));
    ins(opcodes, cycles, 0, seq)
}

/// `SOFTI` and hardware interrupts: push PSW and PC, jump to the interrupt vector.
pub fn softi(opcodes: impl Into<Opcodes>, cycles: u32) -> InstructionDef {
    let seq = enter_call("INT")
        .then(idb_rd(Reg::Psw) | idb_wr(IdbTarget::Dor) | aor_wr(AddrSource::Sp))
        .then(store())
        .then(dec_sp());
    let seq = push_pc(seq, idle(), idle())
        .then(idx(0) | idb_rd(Sdg::Calt) | idb_wr(Reg::W))
        .then(idb_rd(IdbSource::Zero) | idb_wr(Reg::Pch))
        .then(idb_rd(Sdg::Intva) | idb_wr(Reg::Pcl))
        .then(idle());
    ins(opcodes, cycles, 0, seq)
}

/// Pop one byte into `dst`.
fn pop_byte(seq: Sequence, dst: Reg, last: Fragment) -> Sequence {
    seq.then(aor_wr(AddrSource::Sp))
        .then(load() | inc_sp())
        .then(idb_rd(IdbSource::Db) | idb_wr(dst) | last)
}

/// `RET`/`RETS`/`RETI`.
pub fn ret(opcodes: impl Into<Opcodes>, cycles: u32, kind: Ret) -> InstructionDef {
    let skip = match kind {
        Ret::Rets => SkipCond::Always.into(),
        _ => Fragment::new(),
    };
    let seq = Sequence::new(kind.to_string());
    let seq = pop_byte(seq, Reg::Pcl, idle());
    let mut seq = pop_byte(seq, Reg::Pch, skip);
    if kind == Ret::Reti {
        seq = pop_byte(seq, Reg::Psw, idle());
    }
    ins(opcodes, cycles, 0, seq)
}

// Stack

/// `PUSH`: high byte first, at the higher address.
pub fn push(opcodes: impl Into<Opcodes>, cycles: u32, rp: StackPair) -> InstructionDef {
    let (hi, lo) = rp.halves();
    let seq = enter_call(&format!("PUSH_{}", rp))
        .then(idb_rd(hi) | idb_wr(IdbTarget::Dor) | aor_wr(AddrSource::Sp))
        .then(store())
        .then(dec_sp())
        .then(idb_rd(lo) | idb_wr(IdbTarget::Dor) | aor_wr(AddrSource::Sp))
        .then(store())
        .then(idle());
    ins(opcodes, cycles, 0, seq)
}

/// `POP`: low byte first.
pub fn pop(opcodes: impl Into<Opcodes>, cycles: u32, rp: StackPair) -> InstructionDef {
    let (hi, lo) = rp.halves();
    let seq = Sequence::new(format!("POP_{}", rp))
        .then(aor_wr(AddrSource::Sp) | inc_sp())
        .then(load())
        .then(idb_rd(IdbSource::Db) | idb_wr(lo))
        .then(aor_wr(AddrSource::Sp) | inc_sp())
        .then(load())
        .then(idb_rd(IdbSource::Db) | idb_wr(hi));
    ins(opcodes, cycles, 0, seq)
}

// Skip

/// `SKIT`/`SKNIT`/`SKC`/...: skip on a flag.
pub fn skip(opcodes: impl Into<Opcodes>, cycles: u32, cond: SkipCond) -> InstructionDef {
    simple(opcodes, cycles, &format!("SKIP_{}", cond), cond)
}

/// `BIT bit, wa`: skip if the selected bit of a working-area byte is set.
pub fn bit(opcodes: impl Into<Opcodes>, cycles: u32) -> InstructionDef {
    let seq = fetch_wa(Sequence::new("BIT"))
        .then(aor_wr(AddrSource::Vw))
        .then(load() | idb_rd(Sdg::Bit) | idb_wr(IdbTarget::Bi))
        .then(idb_rd(IdbSource::Db) | idb_wr(IdbTarget::Ai) | AluOp::And)
        .then(SkipCond::Nz);
    ins(opcodes, cycles, 1, seq)
}

/// Preload the common control words and commit the `IDLE` routine, so that they take the
/// first addresses of their tables.
pub fn preamble(asm: &mut Assembler<'_>) -> Result<()> {
    for word in [idle(), pc_out_inc(), load(), store()] {
        asm.preload(word)?;
    }
    asm.routine(&Sequence::new("IDLE").then(idle()))?;
    Ok(())
}

/// Commit the full uPD7800 instruction set.
pub fn define(asm: &mut Assembler<'_>) -> Result<()> {
    use IncDec::{Dec, Inc};
    use MathOp::*;
    use Reg::{Ir210, A, C};
    use Src::{Implied, Imm, Ind, Wa as SrcWa};
    use StrEffect as Fx;

    preamble(asm)?;

    // MVI A is 0x69, which needs its own string effect.
    let mvi = Opcodes::range(0x68, 0x6e).except(0x69);
    let defs = [
        // No prefix.
        mov(0x0a..=0x0f, 4, A, Ir210, Fx::None),
        mov(0x1a..=0x1f, 4, Ir210, A, Fx::None),
        mov(mvi, 7, Ir210, Imm, Fx::None),
        mov(0x69, 7, Ir210, Imm, Fx::L1),
        mov(0x6f, 7, Ir210, Imm, Fx::L0),
        load_wa(0x28, 10, A),
        load_imm16(0x04, 10, RegPair::Sp, Fx::None),
        load_imm16(0x14, 10, RegPair::Bc, Fx::None),
        load_imm16(0x24, 10, RegPair::De, Fx::None),
        load_imm16(0x34, 10, RegPair::Hl, Fx::L0),
        loadx(0x29..=0x2f, 7),
        storex(0x39..=0x3f, 7),
        mvix(0x49..=0x4b, 10),
        staw(0x38, 10),
        mviw(0x71, 13),
        table(0x21, 19),
        block(0x31, 13),
        simple(0x10, 4, "EX", IdbTarget::Sec(Reg::V)),
        simple(0x11, 4, "EXX", IdbTarget::Sec(Reg::B)),
        alu(0x05, 16, And, Dst::Wa, Imm, Skip::Never),
        alu(0x15, 16, Or, Dst::Wa, Imm, Skip::Never),
        alu(0x07, 7, And, A, Imm, Skip::Never),
        alu(0x16, 7, Xor, A, Imm, Skip::Never),
        alu(0x17, 7, Or, A, Imm, Skip::Never),
        test(0x25, 13, Test::Gt, Dst::Wa, Imm),
        test(0x35, 13, Test::Lt, Dst::Wa, Imm),
        test(0x45, 13, Test::On, Dst::Wa, Imm),
        test(0x55, 13, Test::Off, Dst::Wa, Imm),
        test(0x65, 13, Test::Neq, Dst::Wa, Imm),
        test(0x75, 13, Test::Eq, Dst::Wa, Imm),
        test(0x27, 7, Test::Gt, A, Imm),
        test(0x37, 7, Test::Lt, A, Imm),
        test(0x47, 7, Test::On, A, Imm),
        test(0x57, 7, Test::Off, A, Imm),
        test(0x67, 7, Test::Neq, A, Imm),
        test(0x77, 7, Test::Eq, A, Imm),
        alu(0x26, 7, Add, A, Imm, Skip::Nc),
        alu(0x36, 7, Sub, A, Imm, Skip::Nb),
        alu(0x46, 7, Add, A, Imm, Skip::Never),
        alu(0x56, 7, Adc, A, Imm, Skip::Never),
        alu(0x66, 7, Sub, A, Imm, Skip::Never),
        alu(0x76, 7, Sbb, A, Imm, Skip::Never),
        incdec(0x20, 13, Inc, Dst::Wa),
        incdec(0x30, 13, Dec, Dst::Wa),
        incdec(0x41..=0x43, 4, Inc, Ir210),
        incdec(0x51..=0x53, 4, Dec, Ir210),
        incdecx(0x02, 7, Inc, RegPair::Sp),
        incdecx(0x12, 7, Inc, RegPair::Bc),
        incdecx(0x22, 7, Inc, RegPair::De),
        incdecx(0x32, 7, Inc, RegPair::Hl),
        incdecx(0x03, 7, Dec, RegPair::Sp),
        incdecx(0x13, 7, Dec, RegPair::Bc),
        incdecx(0x23, 7, Dec, RegPair::De),
        incdecx(0x33, 7, Dec, RegPair::Hl),
        daa(0x61, 4),
        jr(0xc0..=0xff, 13),
        jre(0x4e, 13, false),
        jre(0x4f, 13, true),
        jmp(0x54, 10),
        jb(0x73, 4),
        call(0x44, 16),
        calb(0x63, 13),
        calf(0x78..=0x7f, 16),
        calt(0x80..=0xbf, 19),
        softi(0x72, 19),
        ret(0x08, 10, Ret::Ret),
        ret(0x18, 10, Ret::Rets),
        ret(0x62, 13, Ret::Reti),
        bit(0x58..=0x5f, 10),
        simple(0x00, 4, "NOP", idle()),
        simple(0x19, 4, "STM", idle()),
        // 0x1xx: prefix 0x48.
        alu(0x130, 8, Rll, A, Implied, Skip::Never),
        alu(0x131, 8, Rlr, A, Implied, Skip::Never),
        alu(0x132, 8, Rll, C, Implied, Skip::Never),
        alu(0x133, 8, Rlr, C, Implied, Skip::Never),
        alu(0x134, 8, Sll, A, Implied, Skip::Never),
        alu(0x135, 8, Slr, A, Implied, Skip::Never),
        alu(0x136, 8, Sll, C, Implied, Skip::Never),
        alu(0x137, 8, Slr, C, Implied, Skip::Never),
        push(0x10e, 17, StackPair::Va),
        pop(0x10f, 14, StackPair::Va),
        push(0x11e, 17, StackPair::Bc),
        pop(0x11f, 14, StackPair::Bc),
        push(0x12e, 17, StackPair::De),
        pop(0x12f, 14, StackPair::De),
        push(0x13e, 17, StackPair::Hl),
        pop(0x13f, 14, StackPair::Hl),
        skip(0x100..=0x104, 8, SkipCond::I),
        skip(0x10a, 8, SkipCond::PswC),
        skip(0x10c, 8, SkipCond::PswZ),
        skip(0x110..=0x114, 8, SkipCond::Ni),
        skip(0x11a, 8, SkipCond::PswNc),
        skip(0x11c, 8, SkipCond::PswNz),
        simple(0x120, 8, "EI", idx(1) | LatchSelect::Ie),
        simple(0x124, 8, "DI", idx(0) | LatchSelect::Ie),
        simple(0x12a, 8, "CLC", idx(0) | LatchSelect::PswCy),
        simple(0x12b, 8, "STC", idx(1) | LatchSelect::PswCy),
        rld(0x138, 17),
        rrd(0x139, 17),
        // 0x2xx: prefix 0x4c.
        mov(0x2c0..=0x2c9, 8, A, Spr::Ir3, Fx::None),
        // 0x3xx: prefix 0x4d.
        mov(0x3c0..=0x3c9, 8, Spr::Ir3, A, Fx::None),
        // 0x4xx: prefix 0x60.
        alu(0x420..=0x427, 8, Add, Ir210, A, Skip::Nc),
        alu(0x430..=0x437, 8, Sub, Ir210, A, Skip::Nb),
        alu(0x440..=0x447, 8, Add, Ir210, A, Skip::Never),
        alu(0x450..=0x457, 8, Adc, Ir210, A, Skip::Never),
        alu(0x460..=0x467, 8, Sub, Ir210, A, Skip::Never),
        alu(0x470..=0x477, 8, Sbb, Ir210, A, Skip::Never),
        alu(0x4a0..=0x4a7, 8, Add, A, Ir210, Skip::Nc),
        alu(0x4b0..=0x4b7, 8, Sub, A, Ir210, Skip::Nb),
        alu(0x4c0..=0x4c7, 8, Add, A, Ir210, Skip::Never),
        alu(0x4d0..=0x4d7, 8, Adc, A, Ir210, Skip::Never),
        alu(0x4e0..=0x4e7, 8, Sub, A, Ir210, Skip::Never),
        alu(0x4f0..=0x4f7, 8, Sbb, A, Ir210, Skip::Never),
        alu(0x408..=0x40f, 8, And, Ir210, A, Skip::Never),
        alu(0x410..=0x417, 8, Xor, Ir210, A, Skip::Never),
        alu(0x418..=0x41f, 8, Or, Ir210, A, Skip::Never),
        alu(0x488..=0x48f, 8, And, A, Ir210, Skip::Never),
        alu(0x490..=0x497, 8, Xor, A, Ir210, Skip::Never),
        alu(0x498..=0x49f, 8, Or, A, Ir210, Skip::Never),
        test(0x428..=0x42f, 8, Test::Gt, Ir210, A),
        test(0x438..=0x43f, 8, Test::Lt, Ir210, A),
        test(0x468..=0x46f, 8, Test::Neq, Ir210, A),
        test(0x478..=0x47f, 8, Test::Eq, Ir210, A),
        test(0x4a8..=0x4af, 8, Test::Gt, A, Ir210),
        test(0x4b8..=0x4bf, 8, Test::Lt, A, Ir210),
        test(0x4c8..=0x4cf, 8, Test::On, A, Ir210),
        test(0x4d8..=0x4df, 8, Test::Off, A, Ir210),
        test(0x4e8..=0x4ef, 8, Test::Neq, A, Ir210),
        test(0x4f8..=0x4ff, 8, Test::Eq, A, Ir210),
        // 0x5xx: prefix 0x64.
        alu(0x520..=0x527, 11, Add, Ir210, Imm, Skip::Nc),
        alu(0x530..=0x537, 11, Sub, Ir210, Imm, Skip::Nb),
        alu(0x540..=0x547, 11, Add, Ir210, Imm, Skip::Never),
        alu(0x550..=0x557, 11, Adc, Ir210, Imm, Skip::Never),
        alu(0x560..=0x567, 11, Sub, Ir210, Imm, Skip::Never),
        alu(0x570..=0x577, 11, Sbb, Ir210, Imm, Skip::Never),
        alu(0x508..=0x50f, 11, And, Ir210, Imm, Skip::Never),
        alu(0x510..=0x517, 11, Xor, Ir210, Imm, Skip::Never),
        alu(0x518..=0x51f, 11, Or, Ir210, Imm, Skip::Never),
        alu(0x5a0..=0x5a3, 17, Add, Spr::Ir2, Imm, Skip::Nc),
        alu(0x5b0..=0x5b3, 17, Sub, Spr::Ir2, Imm, Skip::Nb),
        alu(0x5c0..=0x5c3, 17, Add, Spr::Ir2, Imm, Skip::Never),
        alu(0x5d0..=0x5d3, 17, Adc, Spr::Ir2, Imm, Skip::Never),
        alu(0x5e0..=0x5e3, 17, Sub, Spr::Ir2, Imm, Skip::Never),
        alu(0x5f0..=0x5f3, 17, Sbb, Spr::Ir2, Imm, Skip::Never),
        alu(0x588..=0x58b, 17, And, Spr::Ir2, Imm, Skip::Never),
        alu(0x590..=0x593, 17, Xor, Spr::Ir2, Imm, Skip::Never),
        alu(0x598..=0x59b, 17, Or, Spr::Ir2, Imm, Skip::Never),
        test(0x528..=0x52f, 11, Test::Gt, Ir210, Imm),
        test(0x538..=0x53f, 11, Test::Lt, Ir210, Imm),
        test(0x548..=0x54f, 11, Test::On, Ir210, Imm),
        test(0x558..=0x55f, 11, Test::Off, Ir210, Imm),
        test(0x568..=0x56f, 11, Test::Neq, Ir210, Imm),
        test(0x578..=0x57f, 11, Test::Eq, Ir210, Imm),
        test(0x5a8..=0x5ab, 14, Test::Gt, Spr::Ir2, Imm),
        test(0x5b8..=0x5bb, 14, Test::Lt, Spr::Ir2, Imm),
        test(0x5c8..=0x5cb, 14, Test::On, Spr::Ir2, Imm),
        test(0x5d8..=0x5db, 14, Test::Off, Spr::Ir2, Imm),
        test(0x5e8..=0x5eb, 14, Test::Neq, Spr::Ir2, Imm),
        test(0x5f8..=0x5fb, 14, Test::Eq, Spr::Ir2, Imm),
        // 0x6xx: prefix 0x70.
        load_abs(0x668..=0x66f, 17),
        load_ind(0x60f, 20, RegPair::Sp),
        load_ind(0x61f, 20, RegPair::Bc),
        load_ind(0x62f, 20, RegPair::De),
        load_ind(0x63f, 20, RegPair::Hl),
        store_abs(0x678..=0x67f, 17),
        store_ind(0x60e, 20, RegPair::Sp),
        store_ind(0x61e, 20, RegPair::Bc),
        store_ind(0x62e, 20, RegPair::De),
        store_ind(0x63e, 20, RegPair::Hl),
        alu(0x6a1..=0x6a7, 11, Add, A, Ind, Skip::Nc),
        alu(0x6b1..=0x6b7, 11, Sub, A, Ind, Skip::Nb),
        alu(0x6c1..=0x6c7, 11, Add, A, Ind, Skip::Never),
        alu(0x6d1..=0x6d7, 11, Adc, A, Ind, Skip::Never),
        alu(0x6e1..=0x6e7, 11, Sub, A, Ind, Skip::Never),
        alu(0x6f1..=0x6f7, 11, Sbb, A, Ind, Skip::Never),
        alu(0x689..=0x68f, 11, And, A, Ind, Skip::Never),
        alu(0x691..=0x697, 11, Xor, A, Ind, Skip::Never),
        alu(0x699..=0x69f, 11, Or, A, Ind, Skip::Never),
        test(0x6a9..=0x6af, 11, Test::Gt, A, Ind),
        test(0x6b9..=0x6bf, 11, Test::Lt, A, Ind),
        test(0x6c9..=0x6cf, 11, Test::On, A, Ind),
        test(0x6d9..=0x6df, 11, Test::Off, A, Ind),
        test(0x6e9..=0x6ef, 11, Test::Neq, A, Ind),
        test(0x6f9..=0x6ff, 11, Test::Eq, A, Ind),
        // 0x7xx: prefix 0x74.
        alu(0x7a0, 14, Add, A, SrcWa, Skip::Nc),
        alu(0x7b0, 14, Sub, A, SrcWa, Skip::Nb),
        alu(0x7c0, 14, Add, A, SrcWa, Skip::Never),
        alu(0x7d0, 14, Adc, A, SrcWa, Skip::Never),
        alu(0x7e0, 14, Sub, A, SrcWa, Skip::Never),
        alu(0x7f0, 14, Sbb, A, SrcWa, Skip::Never),
        alu(0x788, 14, And, A, SrcWa, Skip::Never),
        alu(0x790, 14, Xor, A, SrcWa, Skip::Never),
        alu(0x798, 14, Or, A, SrcWa, Skip::Never),
        test(0x7a8, 14, Test::Gt, A, SrcWa),
        test(0x7b8, 14, Test::Lt, A, SrcWa),
        test(0x7c8, 14, Test::On, A, SrcWa),
        test(0x7d8, 14, Test::Off, A, SrcWa),
        test(0x7e8, 14, Test::Neq, A, SrcWa),
        test(0x7f8, 14, Test::Eq, A, SrcWa),
    ];
    for def in defs {
        asm.instruction(def)?;
    }
    Ok(())
}
