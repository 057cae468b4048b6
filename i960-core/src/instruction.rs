//! Decoded instruction model for the four 80960 encoding formats.
//!
//! A fetched word (plus the optional second word carrying a MEMB
//! displacement) decodes into an [`Instruction`], one variant per format.
//! The REG family's dense sub-opcode space is resolved here, down to
//! mnemonic granularity, with the reserved rows folded onto their
//! neighbours exactly as the hardware decoder cascade folds them (a
//! reserved row in the middle of a decoded block behaves as the block, not
//! as an invalid opcode).

use crate::registers::Specifier;
use thiserror::Error;

/// Data structure that can hold any supported instruction in its decoded
/// form.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Instruction {
    Ctrl {
        op: CtrlOp,
        displacement: i32,
    },
    Cobr {
        op: CobrOp,
        src1: Operand,
        src2: Specifier,
        displacement: i32,
    },
    Reg {
        op: RegOp,
        src1: Operand,
        src2: Operand,
        dst: Specifier,
    },
    Mem {
        op: MemOp,
        addressing: Addressing,
        reg: Specifier,
    },
}

/// A source operand: either a register or a 5-bit literal `0..=31`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Operand {
    Register(Specifier),
    Literal(u8),
}

impl Operand {
    /// Returns the raw 5-bit encoding field.
    ///
    /// The multi-word operations (`movl` and friends, `eshro`, `ediv`)
    /// address the registers adjacent to an operand through this field.
    pub fn field(self) -> u8 {
        match self {
            Operand::Register(specifier) => specifier.into(),
            Operand::Literal(value) => value,
        }
    }
}

/// The three-bit condition field of a conditional opcode.
///
/// The field is a mask over the condition code: `100` less, `010` equal,
/// `001` greater, with `000` standing for the unordered/"no" group.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Condition(u8);

impl Condition {
    /// Convert a 3-bit value into a condition.
    /// Panics if the value doesn't fit in 3 bits (`0..=7`).
    pub fn from_u3(value_u3: u8) -> Self {
        if value_u3 > 7 {
            panic!("out of range u3 used");
        }
        Self(value_u3)
    }

    /// Returns the condition-code mask this condition tests.
    pub fn mask(self) -> u32 {
        self.0 as u32
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CtrlOp {
    Branch,
    Call,
    Ret,
    /// Branch and link through `g14`.
    BranchAndLink,
    BranchIf(Condition),
    FaultIf(Condition),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CobrOp {
    /// Write 1 to `dst` if the condition holds, else 0. No branch.
    Test { cond: Condition, dst: Specifier },
    /// `bbc` (`set == false`) / `bbs` (`set == true`): test bit `src1` of
    /// `src2`, set the condition code, branch on a match.
    BranchOnBit { set: bool },
    /// Compare `src1` with `src2` and branch if the condition then holds.
    CompareBranch { integer: bool, cond: Condition },
}

/// The sixteen-row truth table of the bitwise block, plus the single-bit
/// edits that share its encodings.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BitwiseOp {
    NotBit,
    And,
    AndNot,
    SetBit,
    NotAnd,
    Xor,
    Or,
    Nor,
    Xnor,
    Not,
    OrNot,
    ClrBit,
    NotOr,
    Nand,
    /// Set or clear bit `src1` of `src2` according to the carry bit.
    AlterBit,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShiftOp {
    /// Shift right ordinal; counts of 32 or more produce zero.
    Shro,
    /// Shift right integer rounding the quotient toward zero.
    Shrdi,
    /// Shift right integer; counts saturate at 31.
    Shri,
    /// Shift left ordinal; counts of 32 or more produce zero.
    Shlo,
    /// Rotate left by the count modulo 32.
    Rotate,
    /// Shift left integer, raising overflow when non-sign bits shift out.
    Shli,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MulDivKind {
    Multiply,
    Divide,
    Remainder,
    /// Remainder adjusted toward the divisor's sign (`modi`).
    Modulo,
}

/// A REG-format operation, at mnemonic granularity.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RegOp {
    Bitwise(BitwiseOp),
    /// `addo`/`addi`/`subo`/`subi`: `dst = src2 ± src1`, the integer forms
    /// checking signed overflow.
    AddSub { integer: bool, subtract: bool },
    /// `cmpob`/`cmpib`/`cmpos`/`cmpis`: compare after narrowing.
    CompareNarrow { integer: bool, short: bool },
    Shift(ShiftOp),
    /// `cmpo`/`cmpi` and the conditional `concmpo`/`concmpi`.
    Compare { integer: bool, conditional: bool },
    /// `cmpinco`/`cmpinci`/`cmpdeco`/`cmpdeci`: compare, then write
    /// `src2 ± 1` to `dst` with overflow suppressed.
    CompareAdjust { integer: bool, decrement: bool },
    Scanbyte,
    Bswap,
    Chkbit,
    /// `addc`/`subc`: extended arithmetic through the carry bit.
    AddSubCarry { subtract: bool },
    IntDis,
    IntEn,
    /// `mov`/`movl`/`movt`/`movq`.
    Move { words: u8 },
    Eshro,
    /// `atmod` (`add == false`) / `atadd` (`add == true`).
    Atomic { add: bool },
    SpanBit,
    ScanBit,
    ModAc,
    Modify,
    Extract,
    ModTc,
    ModPc,
    Calls,
    Mark,
    Fmark,
    FlushReg,
    SyncF,
    Emul,
    Ediv,
    MulDiv { integer: bool, kind: MulDivKind },
    CondAddSub {
        cond: Condition,
        integer: bool,
        subtract: bool,
    },
    /// `sel<cc>`: `dst = src2` if the condition holds, else `src1`.
    Select { cond: Condition },
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MemSize {
    Byte { signed: bool },
    Short { signed: bool },
    Word,
    Long,
    Triple,
    Quad,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MemOp {
    Load(MemSize),
    Store(MemSize),
    Bx,
    Balx,
    Callx,
    Lda,
}

/// A decoded MEM addressing mode. The effective address is computed at
/// execution time from the registers named here.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Addressing {
    /// MEMA: a 12-bit offset.
    Offset { offset: u32 },
    /// MEMA: base register plus a 12-bit offset.
    OffsetBase { base: Specifier, offset: u32 },
    /// MEMB mode 4: register indirect.
    Indirect { base: Specifier },
    /// MEMB mode 5: the address of the instruction, plus 8, plus the
    /// 32-bit displacement.
    IpRelative { displacement: u32 },
    /// MEMB mode 7: base plus scaled index.
    IndirectIndexed {
        base: Specifier,
        index: Specifier,
        scale: u8,
    },
    /// MEMB mode 0xC: the 32-bit displacement alone.
    Absolute { displacement: u32 },
    /// MEMB mode 0xD: base plus 32-bit displacement.
    IndirectOffset { base: Specifier, displacement: u32 },
    /// MEMB mode 0xE: scaled index plus 32-bit displacement.
    IndexedOffset {
        index: Specifier,
        scale: u8,
        displacement: u32,
    },
    /// MEMB mode 0xF: base plus scaled index plus 32-bit displacement.
    IndirectIndexedOffset {
        base: Specifier,
        index: Specifier,
        scale: u8,
        displacement: u32,
    },
}

/// Per-mode decode flags for the MEM format, indexed by bits 10..13 of the
/// instruction word: bit 0 index, bit 1 base, bit 2 displacement, bit 3
/// extra displacement word. Mode 6 is reserved.
pub(crate) const MODE_FLAGS: [u8; 16] = [
    0x4, 0x4, 0x4, 0x4, 0x2, 0x8, 0x0, 0x3, 0x6, 0x6, 0x6, 0x6, 0xC, 0xE, 0xD, 0xF,
];

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum DecodeError {
    /// A reserved or unlisted opcode.
    #[error("reserved opcode")]
    Reserved,
    /// Any floating-point encoding; the core has no FPU.
    #[error("floating-point opcodes are not supported")]
    FloatingPoint,
    /// MEM addressing mode 6.
    #[error("reserved addressing mode")]
    ReservedAddressingMode,
}

impl Instruction {
    /// Decodes a fetched instruction.
    ///
    /// `extension` is the second word of a MEMB-extended encoding; it is
    /// ignored for every 4-byte encoding (see [`Instruction::size_of`] for
    /// whether one must be fetched).
    pub fn decode(word: u32, extension: u32) -> Result<Self, DecodeError> {
        match word >> 28 {
            0x8..=0xF => decode_mem(word, extension),
            0x4..=0x7 => decode_reg(word),
            0x2 | 0x3 => Ok(decode_cobr(word)),
            _ => Ok(decode_ctrl(word)),
        }
    }

    /// Returns the size in bytes of the instruction starting with `word`:
    /// 8 for a MEMB encoding with a displacement word, 4 otherwise.
    pub fn size_of(word: u32) -> u32 {
        if word >> 28 >= 0x8 && MODE_FLAGS[(word >> 10 & 0xF) as usize] & 0x8 != 0 {
            8
        } else {
            4
        }
    }
}

fn specifier(word: u32, pos: u32) -> Specifier {
    Specifier::from_u5((word >> pos & 0x1F) as u8)
}

fn operand(word: u32, pos: u32, literal: bool) -> Operand {
    let field = (word >> pos & 0x1F) as u8;
    if literal {
        Operand::Literal(field)
    } else {
        Operand::Register(Specifier::from_u5(field))
    }
}

fn condition(word: u32) -> Condition {
    Condition::from_u3((word >> 24 & 0x7) as u8)
}

fn decode_ctrl(word: u32) -> Instruction {
    let opcode = word >> 24;
    let op = if opcode & 0x10 == 0 {
        match opcode & 0x3 {
            0 => CtrlOp::Branch,
            1 => CtrlOp::Call,
            2 => CtrlOp::Ret,
            _ => CtrlOp::BranchAndLink,
        }
    } else if opcode & 0x8 == 0 {
        CtrlOp::BranchIf(condition(word))
    } else {
        CtrlOp::FaultIf(condition(word))
    };
    // 24-bit displacement, sign-extended, word-aligned.
    let displacement = ((word << 8) as i32 >> 8) & !3;
    Instruction::Ctrl { op, displacement }
}

fn decode_cobr(word: u32) -> Instruction {
    let opcode = word >> 24;
    let op = if opcode & 0x10 == 0 {
        CobrOp::Test {
            cond: condition(word),
            dst: specifier(word, 19),
        }
    } else {
        match opcode {
            0x30 => CobrOp::BranchOnBit { set: false },
            0x37 => CobrOp::BranchOnBit { set: true },
            _ => CobrOp::CompareBranch {
                integer: opcode & 0x8 != 0,
                cond: condition(word),
            },
        }
    };
    // 13-bit displacement, sign-extended, word-aligned.
    let displacement = ((word << 19) as i32 >> 19) & !3;
    Instruction::Cobr {
        op,
        src1: operand(word, 19, word >> 13 & 1 != 0),
        src2: specifier(word, 14),
        displacement,
    }
}

fn decode_reg(word: u32) -> Result<Instruction, DecodeError> {
    let opcode = word >> 24;
    let f = word >> 7 & 0xF;
    let op = match opcode {
        0x58 => RegOp::Bitwise(match f {
            0x0 => BitwiseOp::NotBit,
            0x1 => BitwiseOp::And,
            0x2 => BitwiseOp::AndNot,
            0x3 => BitwiseOp::SetBit,
            0x4 | 0x5 => BitwiseOp::NotAnd,
            0x6 => BitwiseOp::Xor,
            0x7 => BitwiseOp::Or,
            0x8 => BitwiseOp::Nor,
            0x9 => BitwiseOp::Xnor,
            0xA => BitwiseOp::Not,
            0xB => BitwiseOp::OrNot,
            0xC => BitwiseOp::ClrBit,
            0xD => BitwiseOp::NotOr,
            0xE => BitwiseOp::Nand,
            _ => BitwiseOp::AlterBit,
        }),
        0x59 => {
            if f & 0x8 != 0 {
                RegOp::Shift(match f & 0x7 {
                    0 | 1 => ShiftOp::Shro,
                    2 => ShiftOp::Shrdi,
                    3 => ShiftOp::Shri,
                    4 => ShiftOp::Shlo,
                    6 => ShiftOp::Shli,
                    _ => ShiftOp::Rotate,
                })
            } else if f & 0x4 != 0 {
                RegOp::CompareNarrow {
                    integer: f & 0x1 != 0,
                    short: f & 0x2 != 0,
                }
            } else {
                RegOp::AddSub {
                    integer: f & 0x1 != 0,
                    subtract: f & 0x2 != 0,
                }
            }
        }
        0x5A => match f {
            0x0 | 0x1 => RegOp::Compare {
                integer: f & 0x1 != 0,
                conditional: false,
            },
            0x2 | 0x3 => RegOp::Compare {
                integer: f & 0x1 != 0,
                conditional: true,
            },
            0x4..=0x7 => RegOp::CompareAdjust {
                integer: f & 0x1 != 0,
                decrement: f & 0x2 != 0,
            },
            _ => {
                if f & 0x2 != 0 {
                    RegOp::Chkbit
                } else if f & 0x1 != 0 {
                    RegOp::Bswap
                } else {
                    RegOp::Scanbyte
                }
            }
        },
        0x5B => {
            if f & 0x4 == 0 {
                RegOp::AddSubCarry {
                    subtract: f & 0x2 != 0,
                }
            } else if f & 0x1 != 0 {
                RegOp::IntEn
            } else {
                RegOp::IntDis
            }
        }
        0x5C..=0x5F => {
            if f & 0x4 != 0 {
                RegOp::Move {
                    words: (opcode & 0x3) as u8 + 1,
                }
            } else {
                RegOp::Eshro
            }
        }
        // The synmov block belongs to the K and S subfamilies.
        0x60 | 0x62 => return Err(DecodeError::Reserved),
        0x61 | 0x63 => RegOp::Atomic { add: f & 0x2 != 0 },
        0x64 => {
            if f & 0x4 != 0 {
                RegOp::ModAc
            } else if f & 0x1 != 0 {
                RegOp::ScanBit
            } else {
                RegOp::SpanBit
            }
        }
        0x65 => match (f & 0x4 != 0, f & 0x1 != 0) {
            (false, false) => RegOp::Modify,
            (false, true) => RegOp::Extract,
            (true, false) => RegOp::ModTc,
            (true, true) => RegOp::ModPc,
        },
        0x66 => match f {
            0x0..=0x7 => RegOp::Calls,
            0x8..=0xB => RegOp::Mark,
            0xC => RegOp::Fmark,
            0xD => RegOp::FlushReg,
            _ => RegOp::SyncF,
        },
        0x67 => {
            if f & 0x4 != 0 {
                return Err(DecodeError::FloatingPoint);
            } else if f & 0x1 != 0 {
                RegOp::Ediv
            } else {
                RegOp::Emul
            }
        }
        0x68..=0x6F => return Err(DecodeError::FloatingPoint),
        0x70..=0x77 => {
            let integer = opcode & 0x4 != 0;
            let kind = if f & 0x8 == 0 {
                MulDivKind::Multiply
            } else if f & 0x2 != 0 {
                MulDivKind::Divide
            } else if integer && f & 0x1 != 0 {
                MulDivKind::Modulo
            } else {
                MulDivKind::Remainder
            };
            RegOp::MulDiv { integer, kind }
        }
        0x78..=0x7F => {
            if f & 0x8 != 0 {
                return Err(DecodeError::FloatingPoint);
            }
            let cond = Condition::from_u3((opcode & 0x7) as u8);
            if f & 0x4 != 0 {
                RegOp::Select { cond }
            } else {
                RegOp::CondAddSub {
                    cond,
                    integer: f & 0x1 != 0,
                    subtract: f & 0x2 != 0,
                }
            }
        }
        _ => return Err(DecodeError::Reserved),
    };
    Ok(Instruction::Reg {
        op,
        src1: operand(word, 0, word >> 11 & 1 != 0),
        src2: operand(word, 14, word >> 12 & 1 != 0),
        dst: specifier(word, 19),
    })
}

fn decode_mem(word: u32, extension: u32) -> Result<Instruction, DecodeError> {
    let opcode = word >> 24;
    let op = if opcode & 0x4 != 0 {
        if opcode & 0x8 != 0 {
            MemOp::Lda
        } else {
            match opcode & 0x3 {
                0 => MemOp::Bx,
                1 => MemOp::Balx,
                _ => MemOp::Callx,
            }
        }
    } else {
        let size = match opcode >> 3 & 0x7 {
            0 => MemSize::Byte {
                signed: opcode & 0x40 != 0,
            },
            1 => MemSize::Short {
                signed: opcode & 0x40 != 0,
            },
            2 => MemSize::Word,
            3 => MemSize::Long,
            4 | 5 => MemSize::Triple,
            _ => MemSize::Quad,
        };
        if opcode & 0x2 != 0 {
            MemOp::Store(size)
        } else {
            MemOp::Load(size)
        }
    };
    Ok(Instruction::Mem {
        op,
        addressing: decode_addressing(word, extension)?,
        reg: specifier(word, 19),
    })
}

fn decode_addressing(word: u32, extension: u32) -> Result<Addressing, DecodeError> {
    if word & 0x1000 == 0 {
        // MEMA: a 12-bit offset, optionally based.
        let offset = word & 0xFFF;
        return Ok(if word & 0x2000 != 0 {
            Addressing::OffsetBase {
                base: specifier(word, 14),
                offset,
            }
        } else {
            Addressing::Offset { offset }
        });
    }
    let base = specifier(word, 14);
    let index = specifier(word, 0);
    let scale = (word >> 7 & 0x7) as u8;
    Ok(match word >> 10 & 0xF {
        0x4 => Addressing::Indirect { base },
        0x5 => Addressing::IpRelative {
            displacement: extension,
        },
        0x6 => return Err(DecodeError::ReservedAddressingMode),
        0x7 => Addressing::IndirectIndexed { base, index, scale },
        0xC => Addressing::Absolute {
            displacement: extension,
        },
        0xD => Addressing::IndirectOffset {
            base,
            displacement: extension,
        },
        0xE => Addressing::IndexedOffset {
            index,
            scale,
            displacement: extension,
        },
        0xF => Addressing::IndirectIndexedOffset {
            base,
            index,
            scale,
            displacement: extension,
        },
        _ => unreachable!("bit 12 of the word is set"),
    })
}
