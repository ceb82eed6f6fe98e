// Vigna Testbench - Bare-metal fixtures and simulator for the Vigna RISC-V core
// Copyright (C) 2026 Vigna Testbench Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod asm;
pub mod bus;
pub mod cpu;
pub mod decoder;
pub mod memory;
pub mod metrics;
pub mod peripherals;
pub mod snapshot;
pub mod verify;

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use vigna_config::StopReason;


#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimulationError {
    #[error("Memory access violation at {0:#x}")]
    MemoryViolation(u64),
    #[error("Misaligned access at {0:#x}")]
    MisalignedAccess(u64),
    #[error("Instruction decoding error at {0:#x}")]
    DecodeError(u64),
    #[error("EBREAK at {0:#x}")]
    Ebreak(u64),
}

impl SimulationError {
    pub fn stop_reason(&self) -> StopReason {
        match self {
            SimulationError::MemoryViolation(_) => StopReason::MemoryViolation,
            SimulationError::MisalignedAccess(_) => StopReason::MisalignedAccess,
            SimulationError::DecodeError(_) => StopReason::DecodeError,
            SimulationError::Ebreak(_) => StopReason::Ebreak,
        }
    }
}

pub type SimResult<T> = Result<T, SimulationError>;

/// Trait for observing simulation events in a modular way.
pub trait SimulationObserver: std::fmt::Debug + Send + Sync {
    fn on_simulation_start(&self) {}
    fn on_simulation_stop(&self) {}
    fn on_step_start(&self, _pc: u32, _opcode: u32) {}
}

/// Trait representing a CPU architecture
pub trait Cpu {
    fn reset(&mut self);
    fn step(
        &mut self,
        bus: &mut dyn Bus,
        observers: &[Arc<dyn SimulationObserver>],
    ) -> SimResult<()>;
    fn set_pc(&mut self, val: u32);
    fn get_pc(&self) -> u32;
    fn set_sp(&mut self, val: u32);
    fn get_register(&self, id: u8) -> u32;
    fn set_register(&mut self, id: u8, val: u32);
    fn snapshot(&self) -> snapshot::CpuSnapshot;
}

/// Trait representing a memory-mapped peripheral
pub trait Peripheral: std::fmt::Debug + Send {
    fn read(&self, offset: u64) -> SimResult<u8>;
    fn write(&mut self, offset: u64, value: u8) -> SimResult<()>;

    /// A store of `width` bytes (1, 2 or 4) issued as one bus access.
    /// Devices that care about access width override this; the default
    /// splits the value into bytes.
    fn write_sized(&mut self, offset: u64, value: u32, width: u8) -> SimResult<()> {
        for (i, byte) in value.to_le_bytes().into_iter().take(width as usize).enumerate() {
            self.write(offset + i as u64, byte)?;
        }
        Ok(())
    }

    fn as_any(&self) -> Option<&dyn Any> {
        None
    }
    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }
}

/// Trait representing the system bus
pub trait Bus {
    fn read_u8(&self, addr: u64) -> SimResult<u8>;
    fn write_u8(&mut self, addr: u64, value: u8) -> SimResult<()>;

    fn read_u16(&self, addr: u64) -> SimResult<u16> {
        let b0 = self.read_u8(addr)? as u16;
        let b1 = self.read_u8(addr + 1)? as u16;
        // Little Endian
        Ok(b0 | (b1 << 8))
    }

    fn read_u32(&self, addr: u64) -> SimResult<u32> {
        let b0 = self.read_u8(addr)? as u32;
        let b1 = self.read_u8(addr + 1)? as u32;
        let b2 = self.read_u8(addr + 2)? as u32;
        let b3 = self.read_u8(addr + 3)? as u32;
        Ok(b0 | (b1 << 8) | (b2 << 16) | (b3 << 24))
    }

    fn write_u32(&mut self, addr: u64, value: u32) -> SimResult<()> {
        self.write_u8(addr, (value & 0xFF) as u8)?;
        self.write_u8(addr + 1, ((value >> 8) & 0xFF) as u8)?;
        self.write_u8(addr + 2, ((value >> 16) & 0xFF) as u8)?;
        self.write_u8(addr + 3, ((value >> 24) & 0xFF) as u8)?;
        Ok(())
    }

    fn write_u16(&mut self, addr: u64, value: u16) -> SimResult<()> {
        self.write_u8(addr, (value & 0xFF) as u8)?;
        self.write_u8(addr + 1, ((value >> 8) & 0xFF) as u8)?;
        Ok(())
    }
}

/// Bounds for [`Machine::run`].
#[derive(Debug, Clone, Copy)]
pub struct RunLimits {
    pub max_steps: u64,
    pub wall_time: Option<Duration>,
}

impl RunLimits {
    pub fn steps(max_steps: u64) -> Self {
        Self {
            max_steps,
            wall_time: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub stop_reason: StopReason,
    pub steps: u64,
    /// PC after the last executed step.
    pub pc: u32,
    pub error: Option<SimulationError>,
}

pub struct Machine<C: Cpu> {
    pub cpu: C,
    pub bus: bus::SystemBus,
    pub observers: Vec<Arc<dyn SimulationObserver>>,
}

impl<C: Cpu> Machine<C> {
    pub fn new(cpu: C, bus: bus::SystemBus) -> Self {
        Self {
            cpu,
            bus,
            observers: Vec::new(),
        }
    }

    pub fn load_firmware(&mut self, image: &memory::ProgramImage) -> SimResult<()> {
        for segment in &image.segments {
            if !self.bus.ram.load_from_segment(segment) {
                tracing::error!(
                    "Segment at {:#x} ({} bytes) does not fit in RAM",
                    segment.start_addr,
                    segment.data.len()
                );
                return Err(SimulationError::MemoryViolation(segment.start_addr));
            }
        }

        for observer in &self.observers {
            observer.on_simulation_start();
        }
        self.reset()?;

        // The core always starts at its reset address, whatever the ELF says.
        if image.entry_point != self.cpu.get_pc() as u64 {
            tracing::warn!(
                "ELF entry point {:#x} differs from core reset address {:#x}",
                image.entry_point,
                self.cpu.get_pc()
            );
        }

        Ok(())
    }

    pub fn reset(&mut self) -> SimResult<()> {
        self.cpu.reset();
        Ok(())
    }

    pub fn step(&mut self) -> SimResult<()> {
        self.cpu.step(&mut self.bus, &self.observers)
    }

    pub fn snapshot(&self) -> snapshot::MachineSnapshot {
        let base = self.bus.output_base();
        let output = match self.bus.output() {
            Some(port) => port.snapshot(base),
            None => snapshot::RegionSnapshot {
                base,
                cells: Vec::new(),
                writes: Vec::new(),
            },
        };
        snapshot::MachineSnapshot {
            cpu: self.cpu.snapshot(),
            output,
        }
    }

    /// Runs until the core parks itself, faults, or a limit is hit.
    ///
    /// A step that leaves the PC where it was is the idle loop: the core is
    /// halted and stays halted, so the run ends there.
    pub fn run(&mut self, limits: &RunLimits) -> RunOutcome {
        let start = Instant::now();
        let mut outcome = RunOutcome {
            stop_reason: StopReason::MaxSteps,
            steps: 0,
            pc: self.cpu.get_pc(),
            error: None,
        };

        for step in 0..limits.max_steps {
            if let Some(wall_time) = limits.wall_time {
                if start.elapsed() >= wall_time {
                    outcome.stop_reason = StopReason::WallTime;
                    break;
                }
            }

            let pc_before = self.cpu.get_pc();
            if let Err(e) = self.step() {
                tracing::error!("Simulation error at step {}: {}", step, e);
                outcome.stop_reason = e.stop_reason();
                outcome.error = Some(e);
                break;
            }
            outcome.steps = step + 1;

            if self.cpu.get_pc() == pc_before {
                tracing::info!("Core halted at {:#x} after {} steps", pc_before, step + 1);
                outcome.stop_reason = StopReason::Halted;
                break;
            }
        }

        for observer in &self.observers {
            observer.on_simulation_stop();
        }
        outcome.pc = self.cpu.get_pc();
        outcome
    }
}
