//! DCPU-16 CPU emulator.
//!
//! Implements the DCPU-16, a 16-bit word-addressable CPU:
//!
//! - Eight general registers (A, B, C, X, Y, Z, I, J) plus PC, SP, EX, IA
//! - 65,536 words of memory; every address wraps modulo 2^16
//! - A compact variable-length encoding where operands may consume trailing
//!   "next word" immediates from the instruction stream
//! - A deferred-interrupt queue bounded at 256 pending messages; overflow
//!   sets the machine on fire
//! - A hardware bus of up to 65,535 attached devices, addressed by
//!   attachment index
//!
//! Programs are loaded by writing words straight into memory
//! ([`Dcpu::load`]) and driven one instruction at a time with
//! [`Dcpu::step`]. The [`disasm`] module renders instructions with the same
//! decode tables the engine executes from.

pub mod disasm;
mod hardware;
pub mod opcodes;
mod operand;
pub mod registers;

pub use disasm::{Disassembly, disassemble};
pub use hardware::{Device, DeviceInfo};
pub use registers::Registers;

use hardware::Slot;
use opcodes::{BasicOp, SpecialOp, a_field, b_field, basic_opcode};
use operand::Target;

/// Size of the address space in words.
pub const MEMORY_WORDS: usize = 0x1_0000;

/// Capacity of the deferred-interrupt queue.
pub const INTERRUPT_QUEUE_DEPTH: usize = 256;

/// Maximum number of attached devices.
pub const MAX_DEVICES: usize = 0xFFFF;

/// Execution state.
///
/// `Halt` and `OnFire` are terminal and sticky: [`Dcpu::step`] is a no-op
/// in either. A freshly created CPU is `Idle` until its first step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Ok,
    Halt,
    OnFire,
}

/// The DCPU-16 machine: registers, memory, interrupt queue and hardware
/// bus.
pub struct Dcpu {
    /// Register file, exposed for inspection and test setup.
    pub regs: Registers,
    state: State,
    iaq_enabled: bool,
    iaq: [u16; INTERRUPT_QUEUE_DEPTH],
    iaq_index: usize,
    memory: [u16; MEMORY_WORDS],
    hardware: Vec<Slot>,
    cycles: u64,
}

impl Dcpu {
    /// Create a CPU with zeroed registers and memory and no devices.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            state: State::Idle,
            iaq_enabled: false,
            iaq: [0; INTERRUPT_QUEUE_DEPTH],
            iaq_index: 0,
            memory: [0; MEMORY_WORDS],
            hardware: Vec::new(),
            cycles: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    /// Total simulated cycles since creation.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Number of attached devices.
    #[must_use]
    pub fn device_count(&self) -> u16 {
        self.hardware.len() as u16
    }

    /// Number of interrupt messages waiting in the queue.
    #[must_use]
    pub fn pending_interrupts(&self) -> usize {
        self.iaq_index
    }

    /// Read one memory word.
    #[must_use]
    pub fn peek(&self, addr: u16) -> u16 {
        self.memory[addr as usize]
    }

    /// Write one memory word.
    pub fn poke(&mut self, addr: u16, value: u16) {
        self.memory[addr as usize] = value;
    }

    /// Copy a word image into memory starting at `origin`, wrapping at the
    /// end of the address space.
    pub fn load(&mut self, origin: u16, words: &[u16]) {
        let mut addr = origin;
        for &word in words {
            self.memory[addr as usize] = word;
            addr = addr.wrapping_add(1);
        }
    }

    /// The full address space.
    #[must_use]
    pub fn memory(&self) -> &[u16; MEMORY_WORDS] {
        &self.memory
    }

    /// Render the instruction at `addr` without touching machine state.
    #[must_use]
    pub fn disassemble(&self, addr: u16) -> Disassembly {
        disasm::disassemble(&self.memory, addr)
    }

    pub(crate) fn tick(&mut self, cycles: u64) {
        self.cycles += cycles;
    }

    /// Execute one instruction.
    ///
    /// A step ticks every enabled device, delivers one queued interrupt if
    /// queuing is off, then fetches and executes the word at PC. In a
    /// terminal state this does nothing.
    pub fn step(&mut self) {
        if matches!(self.state, State::Halt | State::OnFire) {
            return;
        }
        self.state = State::Ok;

        let mut hardware = std::mem::take(&mut self.hardware);
        for slot in &mut hardware {
            if slot.enabled {
                slot.device.tick(self);
            }
        }
        hardware.append(&mut self.hardware);
        self.hardware = hardware;

        if !self.iaq_enabled && self.iaq_index > 0 {
            self.iaq_index -= 1;
            let message = self.iaq[self.iaq_index];
            self.interrupt(message);
        }

        let word = self.next_word();
        if basic_opcode(word) == 0 {
            self.special(word);
        } else {
            self.basic(word);
        }
    }

    /// Raise an interrupt carrying `message`.
    ///
    /// With IA zero the interrupt is dropped. While queuing is off the
    /// handler is entered immediately: PC then A are pushed, PC jumps to
    /// IA, A carries the message, and queuing turns on until RFI. While
    /// queuing is on the message is deferred; a 257th pending message sets
    /// the machine on fire.
    ///
    /// Devices may call this from their callbacks during a step.
    pub fn interrupt(&mut self, message: u16) {
        if self.regs.ia == 0 {
            return;
        }
        if self.iaq_enabled {
            if self.iaq_index >= INTERRUPT_QUEUE_DEPTH {
                self.state = State::OnFire;
            } else {
                self.iaq[self.iaq_index] = message;
                self.iaq_index += 1;
            }
        } else {
            self.iaq_enabled = true;
            let slot = self.regs.push();
            self.memory[slot as usize] = self.regs.pc;
            let slot = self.regs.push();
            self.memory[slot as usize] = self.regs.gp[registers::A];
            self.regs.pc = self.regs.ia;
            self.regs.gp[registers::A] = message;
        }
    }

    /// Attach a device to the hardware bus.
    ///
    /// The device is registered enabled, its `init` callback runs once, and
    /// its attachment index becomes its bus address. Returns false without
    /// attaching when the bus already holds 65,535 devices.
    pub fn attach(&mut self, mut device: Box<dyn Device>) -> bool {
        if self.hardware.len() >= MAX_DEVICES {
            return false;
        }
        device.init(self);
        self.hardware.push(Slot {
            device,
            enabled: true,
        });
        true
    }

    /// Enable or disable an attached device. Returns false for an invalid
    /// index.
    pub fn set_device_enabled(&mut self, index: u16, enabled: bool) -> bool {
        match self.hardware.get_mut(index as usize) {
            Some(slot) => {
                slot.enabled = enabled;
                true
            }
            None => false,
        }
    }

    fn basic(&mut self, word: u16) {
        let Some(op) = BasicOp::decode(basic_opcode(word)) else {
            self.state = State::Halt;
            return;
        };

        // a evaluates before b; a's next word precedes b's in the stream.
        let a = self.read_a(a_field(word));
        let b = self.target(b_field(word));
        self.tick(op.cycles() - 1);

        match op {
            BasicOp::Set => self.write(b, a),
            BasicOp::Add => {
                let bv = self.read(b);
                let sum = u32::from(bv) + u32::from(a);
                self.regs.ex = (sum >> 16) as u16;
                self.write(b, sum as u16);
            }
            BasicOp::Sub => {
                let bv = self.read(b);
                let diff = i32::from(bv) - i32::from(a);
                self.regs.ex = ((diff >> 16) & 0xFFFF) as u16;
                self.write(b, bv.wrapping_sub(a));
            }
            BasicOp::Mul => {
                let bv = self.read(b);
                let product = u32::from(bv) * u32::from(a);
                self.regs.ex = (product >> 16) as u16;
                self.write(b, product as u16);
            }
            BasicOp::Mli => {
                let bv = self.read(b);
                let product = i32::from(bv as i16) * i32::from(a as i16);
                self.regs.ex = ((product >> 16) & 0xFFFF) as u16;
                self.write(b, product as u16);
            }
            BasicOp::Div => {
                let bv = self.read(b);
                if a == 0 {
                    self.regs.ex = 0;
                    self.write(b, 0);
                } else {
                    self.regs.ex = ((u32::from(bv) << 16) / u32::from(a)) as u16;
                    self.write(b, bv / a);
                }
            }
            BasicOp::Dvi => {
                let bv = self.read(b);
                if a == 0 {
                    self.regs.ex = 0;
                    self.write(b, 0);
                } else {
                    let bi = i64::from(bv as i16);
                    let ai = i64::from(a as i16);
                    self.regs.ex = (((bi << 16) / ai) & 0xFFFF) as u16;
                    self.write(b, ((bi / ai) & 0xFFFF) as u16);
                }
            }
            BasicOp::Mod => {
                let bv = self.read(b);
                self.write(b, if a == 0 { 0 } else { bv % a });
            }
            BasicOp::Mdi => {
                let bv = self.read(b);
                if a == 0 {
                    self.write(b, 0);
                } else {
                    let rem = i32::from(bv as i16) % i32::from(a as i16);
                    self.write(b, rem as u16);
                }
            }
            BasicOp::And => {
                let bv = self.read(b);
                self.write(b, bv & a);
            }
            BasicOp::Bor => {
                let bv = self.read(b);
                self.write(b, bv | a);
            }
            BasicOp::Xor => {
                let bv = self.read(b);
                self.write(b, bv ^ a);
            }
            BasicOp::Shr => {
                let bv = self.read(b);
                self.regs.ex = (u64::from(bv) << 16).checked_shr(u32::from(a)).unwrap_or(0) as u16;
                self.write(b, bv.checked_shr(u32::from(a)).unwrap_or(0));
            }
            BasicOp::Asr => {
                // EX takes the logically shifted-out bits; the stored value
                // shifts arithmetically.
                let bv = self.read(b);
                self.regs.ex = (u64::from(bv) << 16).checked_shr(u32::from(a)).unwrap_or(0) as u16;
                self.write(b, (i32::from(bv as i16) >> u32::from(a).min(31)) as u16);
            }
            BasicOp::Shl => {
                let bv = self.read(b);
                let wide = u64::from(bv).checked_shl(u32::from(a)).unwrap_or(0);
                self.regs.ex = (wide >> 16) as u16;
                self.write(b, bv.checked_shl(u32::from(a)).unwrap_or(0));
            }
            BasicOp::Ifb => {
                let bv = self.read(b);
                if bv & a == 0 {
                    self.skip();
                }
            }
            BasicOp::Ifc => {
                let bv = self.read(b);
                if bv & a != 0 {
                    self.skip();
                }
            }
            BasicOp::Ife => {
                let bv = self.read(b);
                if bv != a {
                    self.skip();
                }
            }
            BasicOp::Ifn => {
                let bv = self.read(b);
                if bv == a {
                    self.skip();
                }
            }
            BasicOp::Ifg => {
                let bv = self.read(b);
                if bv <= a {
                    self.skip();
                }
            }
            BasicOp::Ifa => {
                let bv = self.read(b);
                if (bv as i16) <= (a as i16) {
                    self.skip();
                }
            }
            BasicOp::Ifl => {
                let bv = self.read(b);
                if bv >= a {
                    self.skip();
                }
            }
            BasicOp::Ifu => {
                let bv = self.read(b);
                if (bv as i16) >= (a as i16) {
                    self.skip();
                }
            }
            BasicOp::Adx => {
                let bv = self.read(b);
                let sum = u32::from(bv) + u32::from(a) + u32::from(self.regs.ex);
                self.write(b, sum as u16);
                self.regs.ex = (sum >> 16) as u16;
            }
            BasicOp::Sbx => {
                let bv = self.read(b);
                let diff = i32::from(bv as i16) - i32::from(a as i16) - i32::from(self.regs.ex as i16);
                self.write(b, bv.wrapping_sub(a).wrapping_sub(self.regs.ex));
                self.regs.ex = ((diff >> 16) & 0xFFFF) as u16;
            }
            BasicOp::Sti => {
                self.write(b, a);
                self.regs.gp[registers::I] = self.regs.gp[registers::I].wrapping_add(1);
                self.regs.gp[registers::J] = self.regs.gp[registers::J].wrapping_add(1);
            }
            BasicOp::Std => {
                self.write(b, a);
                self.regs.gp[registers::I] = self.regs.gp[registers::I].wrapping_sub(1);
                self.regs.gp[registers::J] = self.regs.gp[registers::J].wrapping_sub(1);
            }
        }
    }

    fn special(&mut self, word: u16) {
        let opcode = b_field(word);
        if opcode == 0 {
            // Reserved encoding.
            self.state = State::Halt;
            return;
        }
        let Some(op) = SpecialOp::decode(opcode) else {
            self.state = State::Halt;
            return;
        };
        self.tick(op.cycles());

        // The operand doubles as the store slot for IAG and HWN, so codes
        // below 0x20 resolve through the write-capable path.
        let code = a_field(word);
        let target = if code < 0x20 {
            self.target(code)
        } else {
            Target::Literal(code.wrapping_sub(0x21))
        };
        let a = self.read(target);

        match op {
            SpecialOp::Jsr => {
                let slot = self.regs.push();
                self.memory[slot as usize] = self.regs.pc;
                self.regs.pc = a;
            }
            SpecialOp::Int => self.interrupt(a),
            SpecialOp::Iag => self.write(target, self.regs.ia),
            SpecialOp::Ias => self.regs.ia = a,
            SpecialOp::Rfi => {
                self.iaq_enabled = false;
                let slot = self.regs.pop();
                self.regs.gp[registers::A] = self.memory[slot as usize];
                let slot = self.regs.pop();
                self.regs.pc = self.memory[slot as usize];
            }
            SpecialOp::Iaq => self.iaq_enabled = a == 0,
            SpecialOp::Hwn => {
                let count = self.device_count();
                self.write(target, count);
            }
            SpecialOp::Hwq => self.query_device(a),
            SpecialOp::Hwi => self.interrupt_device(a),
        }
    }

    /// HWQ: load A/B/C/X/Y with the identity of the addressed device, or
    /// zero all five when the index is invalid or the device is disabled.
    fn query_device(&mut self, index: u16) {
        let found = self
            .hardware
            .get(index as usize)
            .filter(|slot| slot.enabled)
            .map(|slot| slot.device.info());
        if let Some(info) = found {
            self.regs.gp[registers::A] = info.id as u16;
            self.regs.gp[registers::B] = (info.id >> 16) as u16;
            self.regs.gp[registers::C] = info.version;
            self.regs.gp[registers::X] = info.manufacturer as u16;
            self.regs.gp[registers::Y] = (info.manufacturer >> 16) as u16;
        } else {
            for reg in [
                registers::A,
                registers::B,
                registers::C,
                registers::X,
                registers::Y,
            ] {
                self.regs.gp[reg] = 0;
            }
        }
    }

    /// HWI: deliver a hardware interrupt to the addressed device, if it
    /// exists and is enabled.
    fn interrupt_device(&mut self, index: u16) {
        let mut hardware = std::mem::take(&mut self.hardware);
        if let Some(slot) = hardware.get_mut(index as usize) {
            if slot.enabled {
                slot.device.interrupt(self);
            }
        }
        hardware.append(&mut self.hardware);
        self.hardware = hardware;
    }
}

impl Default for Dcpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Dcpu {
    fn drop(&mut self) {
        let mut hardware = std::mem::take(&mut self.hardware);
        for slot in &mut hardware {
            slot.device.deinit(self);
        }
    }
}
