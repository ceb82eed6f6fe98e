// Vigna Testbench - Bare-metal fixtures and simulator for the Vigna RISC-V core
// Copyright (C) 2026 Vigna Testbench Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::cpu::{CpuConfig, Extensions};
use crate::decoder::riscv::{decode_rv32, Instruction};
use crate::{Bus, Cpu, SimResult, SimulationError, SimulationObserver};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const CSR_MISA: u16 = 0x301;
pub const CSR_MEPC: u16 = 0x341;
pub const CSR_MVENDORID: u16 = 0xF11;
pub const CSR_MARCHID: u16 = 0xF12;
pub const CSR_MIMPID: u16 = 0xF13;
pub const CSR_MHARTID: u16 = 0xF14;

#[derive(Debug)]
pub struct RiscV {
    pub x: [u32; 32], // x0..x31. x0 is correctly hardwired to 0 in logic.
    pub pc: u32,
    pub config: CpuConfig,
    csrs: BTreeMap<u16, u32>,
}

impl Default for RiscV {
    fn default() -> Self {
        Self::new(CpuConfig::default())
    }
}

impl RiscV {
    pub fn new(config: CpuConfig) -> Self {
        Self {
            x: [0; 32],
            pc: config.reset_addr,
            config,
            csrs: BTreeMap::new(),
        }
    }

    fn read_reg(&self, n: u8) -> u32 {
        if n == 0 {
            0
        } else {
            self.x[n as usize]
        }
    }

    fn write_reg(&mut self, n: u8, val: u32) {
        if n != 0 {
            self.x[n as usize] = val;
        }
    }

    pub fn read_csr(&self, csr: u16) -> u32 {
        match csr {
            CSR_MISA => self.config.extensions.misa(),
            CSR_MHARTID | CSR_MVENDORID | CSR_MARCHID | CSR_MIMPID => 0,
            _ => self.csrs.get(&csr).copied().unwrap_or(0),
        }
    }

    pub fn write_csr(&mut self, csr: u16, val: u32) {
        // csr[11:10] == 0b11 marks the read-only space; misa is fixed.
        if csr >> 10 == 0b11 || csr == CSR_MISA {
            tracing::debug!("Ignoring write of {:#x} to read-only CSR {:#x}", val, csr);
            return;
        }
        self.csrs.insert(csr, val);
    }

    fn check_legal(&self, instruction: &Instruction) -> SimResult<()> {
        let required = instruction.required_extensions();
        if !self.config.extensions.contains(required) {
            tracing::error!(
                "{:?} needs {:?}, not enabled in this core at {:#x}",
                instruction,
                required,
                self.pc
            );
            return Err(SimulationError::DecodeError(self.pc as u64));
        }

        if self.config.extensions.contains(Extensions::E)
            && instruction.registers().iter().any(|&r| r >= 16)
        {
            tracing::error!("{:?} uses x16..x31 on an RV32E core at {:#x}", instruction, self.pc);
            return Err(SimulationError::DecodeError(self.pc as u64));
        }

        Ok(())
    }

    fn check_aligned(&self, addr: u32, width: u32) -> SimResult<()> {
        if self.config.alignment_checks && addr % width != 0 {
            return Err(SimulationError::MisalignedAccess(addr as u64));
        }
        Ok(())
    }

    fn jump_target(&self, target: u32) -> SimResult<u32> {
        self.check_aligned(target, 4)?;
        Ok(target)
    }

    /// Zero-extended load of `width` bytes from `rs1 + imm`.
    fn load(&self, bus: &dyn Bus, rs1: u8, imm: i32, width: u32) -> SimResult<u32> {
        let addr = self.read_reg(rs1).wrapping_add(imm as u32);
        self.check_aligned(addr, width)?;
        match width {
            1 => Ok(bus.read_u8(addr as u64)? as u32),
            2 => Ok(bus.read_u16(addr as u64)? as u32),
            _ => bus.read_u32(addr as u64),
        }
    }

    /// Stores the low `width` bytes of `rs2` at `rs1 + imm` as one access.
    fn store(&self, bus: &mut dyn Bus, rs1: u8, rs2: u8, imm: i32, width: u32) -> SimResult<()> {
        let addr = self.read_reg(rs1).wrapping_add(imm as u32);
        self.check_aligned(addr, width)?;
        let val = self.read_reg(rs2);
        match width {
            1 => bus.write_u8(addr as u64, val as u8),
            2 => bus.write_u16(addr as u64, val as u16),
            _ => bus.write_u32(addr as u64, val),
        }
    }

    /// Read-modify-write shared by the six CSR instructions. `write` is
    /// `None` when the instruction must not write (set/clear with zero).
    fn csr_access(&mut self, rd: u8, csr: u16, write: Option<u32>) {
        let old = self.read_csr(csr);
        if let Some(new) = write {
            self.write_csr(csr, new);
        }
        self.write_reg(rd, old);
    }
}

impl Cpu for RiscV {
    fn reset(&mut self) {
        self.x = [0; 32];
        self.csrs.clear();
        self.pc = self.config.reset_addr;
        if let Some(sp) = self.config.stack_reset {
            self.set_sp(sp);
        }
    }

    fn step(
        &mut self,
        bus: &mut dyn Bus,
        observers: &[Arc<dyn SimulationObserver>],
    ) -> SimResult<()> {
        if self.pc % 4 != 0 {
            return Err(SimulationError::MisalignedAccess(self.pc as u64));
        }
        let opcode = bus.read_u32(self.pc as u64)?;

        for observer in observers {
            observer.on_step_start(self.pc, opcode);
        }

        let instruction = decode_rv32(opcode);
        tracing::debug!("PC={:#x}, Op={:#010x}, Instr={:?}", self.pc, opcode, instruction);
        self.check_legal(&instruction)?;

        let mut next_pc = self.pc.wrapping_add(4);

        match instruction {
            Instruction::Lui { rd, imm } => {
                self.write_reg(rd, imm);
            }
            Instruction::Auipc { rd, imm } => {
                let val = self.pc.wrapping_add(imm);
                self.write_reg(rd, val);
            }
            Instruction::Jal { rd, imm } => {
                next_pc = self.jump_target(self.pc.wrapping_add(imm as u32))?;
                self.write_reg(rd, self.pc.wrapping_add(4));
            }
            Instruction::Jalr { rd, rs1, imm } => {
                let base = self.read_reg(rs1);
                next_pc = self.jump_target(base.wrapping_add(imm as u32) & !1)?;
                self.write_reg(rd, self.pc.wrapping_add(4));
            }
            Instruction::Beq { rs1, rs2, imm } => {
                if self.read_reg(rs1) == self.read_reg(rs2) {
                    next_pc = self.jump_target(self.pc.wrapping_add(imm as u32))?;
                }
            }
            Instruction::Bne { rs1, rs2, imm } => {
                if self.read_reg(rs1) != self.read_reg(rs2) {
                    next_pc = self.jump_target(self.pc.wrapping_add(imm as u32))?;
                }
            }
            Instruction::Blt { rs1, rs2, imm } => {
                if (self.read_reg(rs1) as i32) < (self.read_reg(rs2) as i32) {
                    next_pc = self.jump_target(self.pc.wrapping_add(imm as u32))?;
                }
            }
            Instruction::Bge { rs1, rs2, imm } => {
                if (self.read_reg(rs1) as i32) >= (self.read_reg(rs2) as i32) {
                    next_pc = self.jump_target(self.pc.wrapping_add(imm as u32))?;
                }
            }
            Instruction::Bltu { rs1, rs2, imm } => {
                if self.read_reg(rs1) < self.read_reg(rs2) {
                    next_pc = self.jump_target(self.pc.wrapping_add(imm as u32))?;
                }
            }
            Instruction::Bgeu { rs1, rs2, imm } => {
                if self.read_reg(rs1) >= self.read_reg(rs2) {
                    next_pc = self.jump_target(self.pc.wrapping_add(imm as u32))?;
                }
            }
            Instruction::Lb { rd, rs1, imm } => {
                let val = self.load(bus, rs1, imm, 1)?;
                self.write_reg(rd, val as u8 as i8 as i32 as u32);
            }
            Instruction::Lh { rd, rs1, imm } => {
                let val = self.load(bus, rs1, imm, 2)?;
                self.write_reg(rd, val as u16 as i16 as i32 as u32);
            }
            Instruction::Lw { rd, rs1, imm } => {
                let val = self.load(bus, rs1, imm, 4)?;
                self.write_reg(rd, val);
            }
            Instruction::Lbu { rd, rs1, imm } => {
                let val = self.load(bus, rs1, imm, 1)?;
                self.write_reg(rd, val);
            }
            Instruction::Lhu { rd, rs1, imm } => {
                let val = self.load(bus, rs1, imm, 2)?;
                self.write_reg(rd, val);
            }
            Instruction::Sb { rs1, rs2, imm } => self.store(bus, rs1, rs2, imm, 1)?,
            Instruction::Sh { rs1, rs2, imm } => self.store(bus, rs1, rs2, imm, 2)?,
            Instruction::Sw { rs1, rs2, imm } => self.store(bus, rs1, rs2, imm, 4)?,
            Instruction::Addi { rd, rs1, imm } => {
                let res = self.read_reg(rs1).wrapping_add(imm as u32);
                self.write_reg(rd, res);
            }
            Instruction::Slti { rd, rs1, imm } => {
                let val = ((self.read_reg(rs1) as i32) < imm) as u32;
                self.write_reg(rd, val);
            }
            Instruction::Sltiu { rd, rs1, imm } => {
                let val = (self.read_reg(rs1) < (imm as u32)) as u32;
                self.write_reg(rd, val);
            }
            Instruction::Xori { rd, rs1, imm } => {
                let res = self.read_reg(rs1) ^ (imm as u32);
                self.write_reg(rd, res);
            }
            Instruction::Ori { rd, rs1, imm } => {
                let res = self.read_reg(rs1) | (imm as u32);
                self.write_reg(rd, res);
            }
            Instruction::Andi { rd, rs1, imm } => {
                let res = self.read_reg(rs1) & (imm as u32);
                self.write_reg(rd, res);
            }
            Instruction::Slli { rd, rs1, shamt } => {
                let res = self.read_reg(rs1) << shamt;
                self.write_reg(rd, res);
            }
            Instruction::Srli { rd, rs1, shamt } => {
                let res = self.read_reg(rs1) >> shamt;
                self.write_reg(rd, res);
            }
            Instruction::Srai { rd, rs1, shamt } => {
                let res = (self.read_reg(rs1) as i32) >> shamt;
                self.write_reg(rd, res as u32);
            }
            Instruction::Add { rd, rs1, rs2 } => {
                let res = self.read_reg(rs1).wrapping_add(self.read_reg(rs2));
                self.write_reg(rd, res);
            }
            Instruction::Sub { rd, rs1, rs2 } => {
                let res = self.read_reg(rs1).wrapping_sub(self.read_reg(rs2));
                self.write_reg(rd, res);
            }
            Instruction::Sll { rd, rs1, rs2 } => {
                let shamt = self.read_reg(rs2) & 0x1F;
                let res = self.read_reg(rs1) << shamt;
                self.write_reg(rd, res);
            }
            Instruction::Slt { rd, rs1, rs2 } => {
                let val = ((self.read_reg(rs1) as i32) < (self.read_reg(rs2) as i32)) as u32;
                self.write_reg(rd, val);
            }
            Instruction::Sltu { rd, rs1, rs2 } => {
                let val = (self.read_reg(rs1) < self.read_reg(rs2)) as u32;
                self.write_reg(rd, val);
            }
            Instruction::Xor { rd, rs1, rs2 } => {
                let res = self.read_reg(rs1) ^ self.read_reg(rs2);
                self.write_reg(rd, res);
            }
            Instruction::Srl { rd, rs1, rs2 } => {
                let shamt = self.read_reg(rs2) & 0x1F;
                let res = self.read_reg(rs1) >> shamt;
                self.write_reg(rd, res);
            }
            Instruction::Sra { rd, rs1, rs2 } => {
                let shamt = self.read_reg(rs2) & 0x1F;
                let res = (self.read_reg(rs1) as i32) >> shamt;
                self.write_reg(rd, res as u32);
            }
            Instruction::Or { rd, rs1, rs2 } => {
                let res = self.read_reg(rs1) | self.read_reg(rs2);
                self.write_reg(rd, res);
            }
            Instruction::And { rd, rs1, rs2 } => {
                let res = self.read_reg(rs1) & self.read_reg(rs2);
                self.write_reg(rd, res);
            }
            Instruction::Mul { rd, rs1, rs2 } => {
                let res = self.read_reg(rs1).wrapping_mul(self.read_reg(rs2));
                self.write_reg(rd, res);
            }
            Instruction::Mulh { rd, rs1, rs2 } => {
                let a = self.read_reg(rs1) as i32 as i64;
                let b = self.read_reg(rs2) as i32 as i64;
                self.write_reg(rd, (a.wrapping_mul(b) >> 32) as u32);
            }
            Instruction::Mulhsu { rd, rs1, rs2 } => {
                let a = self.read_reg(rs1) as i32 as i64;
                let b = self.read_reg(rs2) as i64;
                self.write_reg(rd, (a.wrapping_mul(b) >> 32) as u32);
            }
            Instruction::Mulhu { rd, rs1, rs2 } => {
                let a = self.read_reg(rs1) as u64;
                let b = self.read_reg(rs2) as u64;
                self.write_reg(rd, ((a * b) >> 32) as u32);
            }
            Instruction::Div { rd, rs1, rs2 } => {
                let a = self.read_reg(rs1) as i32;
                let b = self.read_reg(rs2) as i32;
                let res = if b == 0 { -1 } else { a.wrapping_div(b) };
                self.write_reg(rd, res as u32);
            }
            Instruction::Divu { rd, rs1, rs2 } => {
                let a = self.read_reg(rs1);
                let b = self.read_reg(rs2);
                let res = if b == 0 { u32::MAX } else { a / b };
                self.write_reg(rd, res);
            }
            Instruction::Rem { rd, rs1, rs2 } => {
                let a = self.read_reg(rs1) as i32;
                let b = self.read_reg(rs2) as i32;
                let res = if b == 0 { a } else { a.wrapping_rem(b) };
                self.write_reg(rd, res as u32);
            }
            Instruction::Remu { rd, rs1, rs2 } => {
                let a = self.read_reg(rs1);
                let b = self.read_reg(rs2);
                let res = if b == 0 { a } else { a % b };
                self.write_reg(rd, res);
            }
            Instruction::Fence => {
                // No-op in single threaded core model
            }
            Instruction::Ecall => {
                tracing::warn!("ECALL at {:#x} ignored, no trap handler is modelled", self.pc);
            }
            Instruction::Ebreak => {
                tracing::info!("EBREAK at {:#x}", self.pc);
                return Err(SimulationError::Ebreak(self.pc as u64));
            }
            Instruction::Mret => {
                next_pc = self.jump_target(self.read_csr(CSR_MEPC))?;
            }
            Instruction::Csrrw { rd, rs1, csr } => {
                let val = self.read_reg(rs1);
                self.csr_access(rd, csr, Some(val));
            }
            Instruction::Csrrs { rd, rs1, csr } => {
                let mask = self.read_reg(rs1);
                let write = (rs1 != 0).then(|| self.read_csr(csr) | mask);
                self.csr_access(rd, csr, write);
            }
            Instruction::Csrrc { rd, rs1, csr } => {
                let mask = self.read_reg(rs1);
                let write = (rs1 != 0).then(|| self.read_csr(csr) & !mask);
                self.csr_access(rd, csr, write);
            }
            Instruction::Csrrwi { rd, imm, csr } => {
                self.csr_access(rd, csr, Some(imm as u32));
            }
            Instruction::Csrrsi { rd, imm, csr } => {
                let write = (imm != 0).then(|| self.read_csr(csr) | imm as u32);
                self.csr_access(rd, csr, write);
            }
            Instruction::Csrrci { rd, imm, csr } => {
                let write = (imm != 0).then(|| self.read_csr(csr) & !(imm as u32));
                self.csr_access(rd, csr, write);
            }
            Instruction::Unknown(inst) => {
                tracing::error!("Unknown instruction {:#x} at {:#x}", inst, self.pc);
                return Err(SimulationError::DecodeError(self.pc as u64));
            }
        }

        self.pc = next_pc;
        Ok(())
    }

    fn set_pc(&mut self, val: u32) {
        self.pc = val;
    }
    fn get_pc(&self) -> u32 {
        self.pc
    }
    fn set_sp(&mut self, val: u32) {
        self.write_reg(2, val); // x2 is SP
    }

    fn get_register(&self, id: u8) -> u32 {
        if id < 32 {
            self.read_reg(id)
        } else {
            0
        }
    }
    fn set_register(&mut self, id: u8, val: u32) {
        if id < 32 {
            self.write_reg(id, val);
        }
    }

    fn snapshot(&self) -> crate::snapshot::CpuSnapshot {
        crate::snapshot::CpuSnapshot {
            registers: self.x.to_vec(),
            pc: self.pc,
        }
    }
}
