// Vigna Testbench - Bare-metal fixtures and simulator for the Vigna RISC-V core
// Copyright (C) 2026 Vigna Testbench Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::memory::LinearMemory;
use crate::peripherals::OutputPort;
use crate::{Peripheral, SimResult, SimulationError};

/// Unified memory when nothing else is requested (64 KiB).
pub const DEFAULT_MEMORY_SIZE: usize = 64 * 1024;

pub const OUTPUT_PORT_NAME: &str = "output";

#[derive(Debug)]
pub struct PeripheralEntry {
    pub name: String,
    pub base: u64,
    pub size: u64,
    pub dev: Box<dyn Peripheral>,
}

impl PeripheralEntry {
    fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr < self.base + self.size
    }
}

/// The Vigna memory map: one RAM starting at address 0, with peripheral
/// windows carved out of it. Peripherals take precedence over RAM.
pub struct SystemBus {
    pub ram: LinearMemory,
    pub peripherals: Vec<PeripheralEntry>,
}

impl Default for SystemBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemBus {
    pub fn new() -> Self {
        Self::with_memory(DEFAULT_MEMORY_SIZE)
    }

    /// RAM of `size` bytes at 0 and the output port at its fixed window.
    pub fn with_memory(size: usize) -> Self {
        let output = OutputPort::default();
        Self {
            ram: LinearMemory::new(size, 0),
            peripherals: vec![PeripheralEntry {
                name: OUTPUT_PORT_NAME.to_string(),
                base: vigna_harness::OUTPUT_BASE as u64,
                size: output.size(),
                dev: Box::new(output),
            }],
        }
    }

    pub fn attach(&mut self, name: &str, base: u64, size: u64, dev: Box<dyn Peripheral>) {
        tracing::debug!("Attaching {} at {:#x} ({} bytes)", name, base, size);
        self.peripherals.push(PeripheralEntry {
            name: name.to_string(),
            base,
            size,
            dev,
        });
    }

    pub fn peripheral(&self, name: &str) -> Option<&PeripheralEntry> {
        self.peripherals.iter().find(|p| p.name == name)
    }

    pub fn output(&self) -> Option<&OutputPort> {
        let p = self.peripheral(OUTPUT_PORT_NAME)?;
        p.dev.as_any()?.downcast_ref::<OutputPort>()
    }

    pub fn output_mut(&mut self) -> Option<&mut OutputPort> {
        let p = self
            .peripherals
            .iter_mut()
            .find(|p| p.name == OUTPUT_PORT_NAME)?;
        p.dev.as_any_mut()?.downcast_mut::<OutputPort>()
    }

    pub fn output_base(&self) -> u64 {
        self.peripheral(OUTPUT_PORT_NAME)
            .map_or(vigna_harness::OUTPUT_BASE as u64, |p| p.base)
    }

    /// Routes a sized store to the peripheral that fully covers it, if any.
    /// Returns `None` when the access belongs to RAM.
    fn write_peripheral(&mut self, addr: u64, value: u32, width: u8) -> Option<SimResult<()>> {
        let last = addr + width as u64 - 1;
        let p = self
            .peripherals
            .iter_mut()
            .find(|p| p.contains(addr) || p.contains(last))?;
        if !(p.contains(addr) && p.contains(last)) {
            return Some(Err(SimulationError::MemoryViolation(addr)));
        }
        Some(p.dev.write_sized(addr - p.base, value, width))
    }
}

impl crate::Bus for SystemBus {
    fn read_u8(&self, addr: u64) -> SimResult<u8> {
        for p in &self.peripherals {
            if p.contains(addr) {
                return p.dev.read(addr - p.base);
            }
        }
        if let Some(val) = self.ram.read_u8(addr) {
            return Ok(val);
        }
        Err(SimulationError::MemoryViolation(addr))
    }

    fn write_u8(&mut self, addr: u64, value: u8) -> SimResult<()> {
        if let Some(result) = self.write_peripheral(addr, value as u32, 1) {
            return result;
        }
        if self.ram.write_u8(addr, value) {
            return Ok(());
        }
        Err(SimulationError::MemoryViolation(addr))
    }

    fn write_u16(&mut self, addr: u64, value: u16) -> SimResult<()> {
        if let Some(result) = self.write_peripheral(addr, value as u32, 2) {
            return result;
        }
        self.write_u8(addr, value as u8)?;
        self.write_u8(addr + 1, (value >> 8) as u8)
    }

    fn write_u32(&mut self, addr: u64, value: u32) -> SimResult<()> {
        if let Some(result) = self.write_peripheral(addr, value, 4) {
            return result;
        }
        for (i, byte) in value.to_le_bytes().into_iter().enumerate() {
            self.write_u8(addr + i as u64, byte)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bus;

    #[test]
    fn test_ram_round_trip() {
        let mut bus = SystemBus::new();
        bus.write_u32(0x2000, 0xCAFE_F00D).unwrap();
        assert_eq!(bus.read_u32(0x2000).unwrap(), 0xCAFE_F00D);
        assert_eq!(bus.read_u16(0x2002).unwrap(), 0xCAFE);
    }

    #[test]
    fn test_output_window_shadows_ram() {
        let mut bus = SystemBus::new();
        bus.write_u32(0x1004, 42).unwrap();

        let output = bus.output().unwrap();
        assert_eq!(output.cell(1), Some(42));
        assert_eq!(output.writes().len(), 1);
        assert_eq!(output.writes()[0].width, 4);
        // RAM underneath is untouched
        assert_eq!(bus.ram.data[0x1004], 0);
        assert_eq!(bus.read_u32(0x1004).unwrap(), 42);
    }

    #[test]
    fn test_halfword_store_logged_once() {
        let mut bus = SystemBus::new();
        bus.write_u16(0x1000, 0xBEEF).unwrap();
        let writes = bus.output().unwrap().writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].width, 2);
    }

    #[test]
    fn test_out_of_range() {
        let mut bus = SystemBus::with_memory(0x4000);
        assert_eq!(
            bus.write_u32(0x4000, 1),
            Err(SimulationError::MemoryViolation(0x4000))
        );
        assert_eq!(
            bus.read_u8(0x1_0000),
            Err(SimulationError::MemoryViolation(0x1_0000))
        );
    }

    #[test]
    fn test_store_straddling_window() {
        let mut bus = SystemBus::new();
        assert_eq!(
            bus.write_u32(0xFFE, 1),
            Err(SimulationError::MemoryViolation(0xFFE))
        );
    }
}
