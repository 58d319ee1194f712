//! DCPU-16 disassembler.
//!
//! Renders one instruction at a time from a memory image, using the same
//! decode tables and next-word rules as the execution engine but without
//! touching any machine state.

use crate::MEMORY_WORDS;
use crate::opcodes::{BasicOp, SpecialOp, a_field, b_field, basic_opcode};
use crate::registers::NAMES;

/// One rendered instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disassembly {
    /// Human-readable rendering, e.g. `SET A, 0x0030`.
    pub text: String,
    /// Words consumed: one plus the count of next-word operands. This
    /// matches the fetch count of executing the same instruction.
    pub words: u16,
}

/// Reads trailing operand words relative to the instruction address,
/// wrapping at the end of the address space.
struct Cursor<'a> {
    memory: &'a [u16; MEMORY_WORDS],
    addr: u16,
    words: u16,
}

impl Cursor<'_> {
    fn next(&mut self) -> u16 {
        let word = self.memory[self.addr.wrapping_add(self.words) as usize];
        self.words += 1;
        word
    }
}

/// Render the instruction at `addr`.
///
/// Words whose opcode has no assigned meaning (including the reserved
/// all-zero special form) render as `DAT 0xNNNN` and consume one word.
#[must_use]
pub fn disassemble(memory: &[u16; MEMORY_WORDS], addr: u16) -> Disassembly {
    let word = memory[addr as usize];
    let mut cursor = Cursor {
        memory,
        addr,
        words: 1,
    };

    let opcode = basic_opcode(word);
    if opcode != 0 {
        if let Some(op) = BasicOp::decode(opcode) {
            // a's next word precedes b's, so render in evaluation order.
            let a = render_a(a_field(word), &mut cursor);
            let b = render_b(b_field(word), &mut cursor);
            return Disassembly {
                text: format!("{} {b}, {a}", op.mnemonic()),
                words: cursor.words,
            };
        }
    } else if let Some(op) = SpecialOp::decode(b_field(word)) {
        let a = render_a(a_field(word), &mut cursor);
        return Disassembly {
            text: format!("{} {a}", op.mnemonic()),
            words: cursor.words,
        };
    }

    Disassembly {
        text: format!("DAT {word:#06x}"),
        words: 1,
    }
}

fn render_b(code: u16, cursor: &mut Cursor) -> String {
    match code {
        0x00..=0x07 => NAMES[code as usize].to_string(),
        0x08..=0x0F => format!("[{}]", NAMES[(code - 0x08) as usize]),
        0x10..=0x17 => {
            let next = cursor.next();
            format!("[{next:#06x}+{}]", NAMES[(code - 0x10) as usize])
        }
        0x18 => "PUSH".to_string(),
        0x19 => "PEEK".to_string(),
        0x1A => {
            let next = cursor.next();
            format!("[SP+{next:#06x}]")
        }
        0x1B => "SP".to_string(),
        0x1C => "PC".to_string(),
        0x1D => "EX".to_string(),
        0x1E => {
            let next = cursor.next();
            format!("[{next:#06x}]")
        }
        _ => {
            let next = cursor.next();
            format!("{next:#06x}")
        }
    }
}

fn render_a(code: u16, cursor: &mut Cursor) -> String {
    match code {
        0x18 => "POP".to_string(),
        // Inline literals -1..30, shown as wrapped 16-bit values.
        0x20..=0x3F => format!("{:#06x}", code.wrapping_sub(0x21)),
        _ => render_b(code, cursor),
    }
}
