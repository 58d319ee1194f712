//! The hardware attachment contract.

use crate::Dcpu;

/// Identity a device reports in response to an HWQ query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    /// 32-bit hardware id.
    pub id: u32,
    /// 16-bit hardware version.
    pub version: u16,
    /// 32-bit manufacturer id.
    pub manufacturer: u32,
}

/// A hardware device attached to the CPU.
///
/// Devices are owned by the CPU for the CPU's lifetime; a device's
/// attachment index is its stable address on the hardware bus. Every
/// callback receives the CPU, so a device may read and write memory and
/// registers and raise interrupts with [`Dcpu::interrupt`]. While a
/// callback runs the bus itself is detached from the CPU; devices attached
/// from inside a callback are appended after the existing ones.
pub trait Device {
    /// Identity reported to an HWQ query.
    fn info(&self) -> DeviceInfo;

    /// Called once when the device is attached.
    fn init(&mut self, _cpu: &mut Dcpu) {}

    /// Called at the top of every step while the device is enabled.
    fn tick(&mut self, _cpu: &mut Dcpu) {}

    /// Called when the program addresses the device with HWI.
    fn interrupt(&mut self, _cpu: &mut Dcpu) {}

    /// Called when the CPU is torn down.
    fn deinit(&mut self, _cpu: &mut Dcpu) {}
}

/// A device plus its per-attachment bus state.
pub(crate) struct Slot {
    pub(crate) device: Box<dyn Device>,
    pub(crate) enabled: bool,
}
