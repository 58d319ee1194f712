//! Opcode decode tables, shared by the execution engine and the
//! disassembler.
//!
//! An instruction word packs three fields: bits 0-4 are the basic opcode,
//! bits 5-9 the `b` operand, and bits 10-15 the `a` operand. A zero basic
//! opcode selects the special form, where the `b` field carries the special
//! opcode instead.

/// Extract the basic opcode field (bits 0-4).
#[must_use]
pub const fn basic_opcode(word: u16) -> u16 {
    word & 0x1F
}

/// Extract the `b` operand field (bits 5-9). For the special form this is
/// the special opcode.
#[must_use]
pub const fn b_field(word: u16) -> u16 {
    (word >> 5) & 0x1F
}

/// Extract the `a` operand field (bits 10-15).
#[must_use]
pub const fn a_field(word: u16) -> u16 {
    (word >> 10) & 0x3F
}

/// True when an operand code consumes a trailing word from the instruction
/// stream: `[register + next]`, `[SP + next]`, `[next]` and `next` itself.
#[must_use]
pub const fn takes_next_word(code: u16) -> bool {
    matches!(code, 0x10..=0x17 | 0x1A | 0x1E | 0x1F)
}

/// Basic two-operand opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicOp {
    Set,
    Add,
    Sub,
    Mul,
    Mli,
    Div,
    Dvi,
    Mod,
    Mdi,
    And,
    Bor,
    Xor,
    Shr,
    Asr,
    Shl,
    Ifb,
    Ifc,
    Ife,
    Ifn,
    Ifg,
    Ifa,
    Ifl,
    Ifu,
    Adx,
    Sbx,
    Sti,
    Std,
}

impl BasicOp {
    /// Decode a basic opcode field. Zero (the special form) and the
    /// reserved encodings return `None`.
    #[must_use]
    pub const fn decode(opcode: u16) -> Option<Self> {
        Some(match opcode {
            0x01 => Self::Set,
            0x02 => Self::Add,
            0x03 => Self::Sub,
            0x04 => Self::Mul,
            0x05 => Self::Mli,
            0x06 => Self::Div,
            0x07 => Self::Dvi,
            0x08 => Self::Mod,
            0x09 => Self::Mdi,
            0x0A => Self::And,
            0x0B => Self::Bor,
            0x0C => Self::Xor,
            0x0D => Self::Shr,
            0x0E => Self::Asr,
            0x0F => Self::Shl,
            0x10 => Self::Ifb,
            0x11 => Self::Ifc,
            0x12 => Self::Ife,
            0x13 => Self::Ifn,
            0x14 => Self::Ifg,
            0x15 => Self::Ifa,
            0x16 => Self::Ifl,
            0x17 => Self::Ifu,
            0x1A => Self::Adx,
            0x1B => Self::Sbx,
            0x1E => Self::Sti,
            0x1F => Self::Std,
            _ => return None,
        })
    }

    /// Base cycle cost, including the opcode fetch.
    #[must_use]
    pub const fn cycles(self) -> u64 {
        match self {
            Self::Set | Self::And | Self::Bor | Self::Xor | Self::Shr | Self::Asr | Self::Shl => 1,
            Self::Add
            | Self::Sub
            | Self::Mul
            | Self::Mli
            | Self::Ifb
            | Self::Ifc
            | Self::Ife
            | Self::Ifn
            | Self::Ifg
            | Self::Ifa
            | Self::Ifl
            | Self::Ifu
            | Self::Sti
            | Self::Std => 2,
            Self::Div | Self::Dvi | Self::Mod | Self::Mdi | Self::Adx | Self::Sbx => 3,
        }
    }

    /// True for the `IF*` family, which skips the following instruction
    /// when its condition fails.
    #[must_use]
    pub const fn is_conditional(self) -> bool {
        matches!(
            self,
            Self::Ifb
                | Self::Ifc
                | Self::Ife
                | Self::Ifn
                | Self::Ifg
                | Self::Ifa
                | Self::Ifl
                | Self::Ifu
        )
    }

    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Set => "SET",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mul => "MUL",
            Self::Mli => "MLI",
            Self::Div => "DIV",
            Self::Dvi => "DVI",
            Self::Mod => "MOD",
            Self::Mdi => "MDI",
            Self::And => "AND",
            Self::Bor => "BOR",
            Self::Xor => "XOR",
            Self::Shr => "SHR",
            Self::Asr => "ASR",
            Self::Shl => "SHL",
            Self::Ifb => "IFB",
            Self::Ifc => "IFC",
            Self::Ife => "IFE",
            Self::Ifn => "IFN",
            Self::Ifg => "IFG",
            Self::Ifa => "IFA",
            Self::Ifl => "IFL",
            Self::Ifu => "IFU",
            Self::Adx => "ADX",
            Self::Sbx => "SBX",
            Self::Sti => "STI",
            Self::Std => "STD",
        }
    }
}

/// Special single-operand opcodes, selected by the `b` field of a word
/// whose basic opcode is zero. Special opcode zero is a reserved halt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialOp {
    Jsr,
    Int,
    Iag,
    Ias,
    Rfi,
    Iaq,
    Hwn,
    Hwq,
    Hwi,
}

impl SpecialOp {
    /// Decode a special opcode field. Zero (reserved) and the unassigned
    /// encodings return `None`.
    #[must_use]
    pub const fn decode(opcode: u16) -> Option<Self> {
        Some(match opcode {
            0x01 => Self::Jsr,
            0x08 => Self::Int,
            0x09 => Self::Iag,
            0x0A => Self::Ias,
            0x0B => Self::Rfi,
            0x0C => Self::Iaq,
            0x10 => Self::Hwn,
            0x11 => Self::Hwq,
            0x12 => Self::Hwi,
            _ => return None,
        })
    }

    /// Cycle cost, charged on top of the opcode fetch.
    #[must_use]
    pub const fn cycles(self) -> u64 {
        match self {
            Self::Iag | Self::Ias => 1,
            Self::Iaq | Self::Hwn => 2,
            Self::Jsr | Self::Rfi => 3,
            Self::Int | Self::Hwq | Self::Hwi => 4,
        }
    }

    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Jsr => "JSR",
            Self::Int => "INT",
            Self::Iag => "IAG",
            Self::Ias => "IAS",
            Self::Rfi => "RFI",
            Self::Iaq => "IAQ",
            Self::Hwn => "HWN",
            Self::Hwq => "HWQ",
            Self::Hwi => "HWI",
        }
    }
}
