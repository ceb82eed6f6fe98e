// Vigna Testbench - Bare-metal fixtures and simulator for the Vigna RISC-V core
// Copyright (C) 2026 Vigna Testbench Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! A small RV32IM encoder for building programs without a cross toolchain,
//! plus an ELF32 writer to package them the way the linker would.

use std::collections::BTreeMap;

pub const ZERO: u8 = 0;
pub const RA: u8 = 1;
pub const SP: u8 = 2;
pub const GP: u8 = 3;
pub const TP: u8 = 4;
pub const T0: u8 = 5;
pub const T1: u8 = 6;
pub const T2: u8 = 7;
pub const S0: u8 = 8;
pub const S1: u8 = 9;
pub const A0: u8 = 10;
pub const A1: u8 = 11;
pub const A2: u8 = 12;
pub const A3: u8 = 13;
pub const A4: u8 = 14;
pub const A5: u8 = 15;
pub const A6: u8 = 16;
pub const A7: u8 = 17;
pub const T3: u8 = 28;
pub const T4: u8 = 29;
pub const T5: u8 = 30;
pub const T6: u8 = 31;

pub const NOP: u32 = 0x0000_0013;
pub const ECALL: u32 = 0x0000_0073;
pub const EBREAK: u32 = 0x0010_0073;
pub const MRET: u32 = 0x3020_0073;
pub const FENCE: u32 = 0x0ff0_000f;

fn r_type(funct7: u32, rs2: u8, rs1: u8, funct3: u32, rd: u8, opcode: u32) -> u32 {
    (funct7 << 25)
        | ((rs2 as u32) << 20)
        | ((rs1 as u32) << 15)
        | (funct3 << 12)
        | ((rd as u32) << 7)
        | opcode
}

fn i_type(imm: i32, rs1: u8, funct3: u32, rd: u8, opcode: u32) -> u32 {
    (((imm as u32) & 0xFFF) << 20)
        | ((rs1 as u32) << 15)
        | (funct3 << 12)
        | ((rd as u32) << 7)
        | opcode
}

fn s_type(imm: i32, rs2: u8, rs1: u8, funct3: u32) -> u32 {
    let imm = imm as u32;
    (((imm >> 5) & 0x7F) << 25)
        | ((rs2 as u32) << 20)
        | ((rs1 as u32) << 15)
        | (funct3 << 12)
        | ((imm & 0x1F) << 7)
        | 0x23
}

fn b_type(imm: i32, rs2: u8, rs1: u8, funct3: u32) -> u32 {
    let imm = imm as u32;
    (((imm >> 12) & 1) << 31)
        | (((imm >> 5) & 0x3F) << 25)
        | ((rs2 as u32) << 20)
        | ((rs1 as u32) << 15)
        | (funct3 << 12)
        | (((imm >> 1) & 0xF) << 8)
        | (((imm >> 11) & 1) << 7)
        | 0x63
}

fn j_type(imm: i32, rd: u8) -> u32 {
    let imm = imm as u32;
    (((imm >> 20) & 1) << 31)
        | (((imm >> 1) & 0x3FF) << 21)
        | (((imm >> 11) & 1) << 20)
        | (((imm >> 12) & 0xFF) << 12)
        | ((rd as u32) << 7)
        | 0x6F
}

/// `imm` is the full 32-bit value; its low 12 bits are dropped.
pub fn lui(rd: u8, imm: u32) -> u32 {
    (imm & 0xFFFF_F000) | ((rd as u32) << 7) | 0x37
}

pub fn auipc(rd: u8, imm: u32) -> u32 {
    (imm & 0xFFFF_F000) | ((rd as u32) << 7) | 0x17
}

pub fn jal(rd: u8, offset: i32) -> u32 {
    j_type(offset, rd)
}

pub fn jalr(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(imm, rs1, 0, rd, 0x67)
}

macro_rules! branch {
    ($($name:ident = $funct3:expr),* $(,)?) => {
        $(pub fn $name(rs1: u8, rs2: u8, offset: i32) -> u32 {
            b_type(offset, rs2, rs1, $funct3)
        })*
    };
}

macro_rules! load {
    ($($name:ident = $funct3:expr),* $(,)?) => {
        $(pub fn $name(rd: u8, rs1: u8, imm: i32) -> u32 {
            i_type(imm, rs1, $funct3, rd, 0x03)
        })*
    };
}

macro_rules! store {
    ($($name:ident = $funct3:expr),* $(,)?) => {
        $(
        /// Operands follow the assembly order: `sw rs2, imm(rs1)`.
        pub fn $name(rs2: u8, rs1: u8, imm: i32) -> u32 {
            s_type(imm, rs2, rs1, $funct3)
        })*
    };
}

macro_rules! op_imm {
    ($($name:ident = $funct3:expr),* $(,)?) => {
        $(pub fn $name(rd: u8, rs1: u8, imm: i32) -> u32 {
            i_type(imm, rs1, $funct3, rd, 0x13)
        })*
    };
}

macro_rules! op {
    ($($name:ident = ($funct7:expr, $funct3:expr)),* $(,)?) => {
        $(pub fn $name(rd: u8, rs1: u8, rs2: u8) -> u32 {
            r_type($funct7, rs2, rs1, $funct3, rd, 0x33)
        })*
    };
}

macro_rules! csr {
    ($($name:ident = $funct3:expr),* $(,)?) => {
        $(
        /// The last operand is `rs1` or, for the immediate forms, a 5-bit
        /// unsigned immediate.
        pub fn $name(rd: u8, csr: u16, src: u8) -> u32 {
            ((csr as u32) << 20) | (((src & 0x1F) as u32) << 15) | ($funct3 << 12) | ((rd as u32) << 7) | 0x73
        })*
    };
}

branch!(beq = 0, bne = 1, blt = 4, bge = 5, bltu = 6, bgeu = 7);
load!(lb = 0, lh = 1, lw = 2, lbu = 4, lhu = 5);
store!(sb = 0, sh = 1, sw = 2);
op_imm!(addi = 0, slti = 2, sltiu = 3, xori = 4, ori = 6, andi = 7);
op!(
    add = (0x00, 0),
    sub = (0x20, 0),
    sll = (0x00, 1),
    slt = (0x00, 2),
    sltu = (0x00, 3),
    xor = (0x00, 4),
    srl = (0x00, 5),
    sra = (0x20, 5),
    or = (0x00, 6),
    and = (0x00, 7),
    mul = (0x01, 0),
    mulh = (0x01, 1),
    mulhsu = (0x01, 2),
    mulhu = (0x01, 3),
    div = (0x01, 4),
    divu = (0x01, 5),
    rem = (0x01, 6),
    remu = (0x01, 7),
);
csr!(csrrw = 1, csrrs = 2, csrrc = 3, csrrwi = 5, csrrsi = 6, csrrci = 7);

pub fn slli(rd: u8, rs1: u8, shamt: u8) -> u32 {
    i_type((shamt & 0x1F) as i32, rs1, 1, rd, 0x13)
}

pub fn srli(rd: u8, rs1: u8, shamt: u8) -> u32 {
    i_type((shamt & 0x1F) as i32, rs1, 5, rd, 0x13)
}

pub fn srai(rd: u8, rs1: u8, shamt: u8) -> u32 {
    i_type(0x400 | (shamt & 0x1F) as i32, rs1, 5, rd, 0x13)
}

pub fn mv(rd: u8, rs: u8) -> u32 {
    addi(rd, rs, 0)
}

/// Loads a 32-bit constant: one `addi` when it fits, `lui` (+ `addi`) otherwise.
pub fn li(rd: u8, value: u32) -> Vec<u32> {
    let signed = value as i32;
    if (-2048..2048).contains(&signed) {
        return vec![addi(rd, ZERO, signed)];
    }
    let upper = value.wrapping_add(0x800) & 0xFFFF_F000;
    let lower = value.wrapping_sub(upper) as i32;
    let mut words = vec![lui(rd, upper)];
    if lower != 0 {
        words.push(addi(rd, rd, lower));
    }
    words
}

pub fn to_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AsmError {
    #[error("Undefined label '{0}'")]
    UndefinedLabel(String),
    #[error("Label '{0}' defined twice")]
    DuplicateLabel(String),
    #[error("Branch to '{label}' is out of range ({offset} bytes)")]
    OutOfRange { label: String, offset: i64 },
}

#[derive(Debug, Clone, Copy)]
enum Fixup {
    Branch { funct3: u32, rs1: u8, rs2: u8 },
    Jal { rd: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    Eq,
    Ne,
    Lt,
    Ge,
    Ltu,
    Geu,
}

impl Cond {
    fn funct3(self) -> u32 {
        match self {
            Cond::Eq => 0,
            Cond::Ne => 1,
            Cond::Lt => 4,
            Cond::Ge => 5,
            Cond::Ltu => 6,
            Cond::Geu => 7,
        }
    }
}

/// Straight-line program builder with forward and backward labels.
#[derive(Debug, Default)]
pub struct Assembler {
    words: Vec<u32>,
    labels: BTreeMap<String, usize>,
    fixups: Vec<(usize, String, Fixup)>,
    duplicate: Option<String>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, word: u32) -> &mut Self {
        self.words.push(word);
        self
    }

    pub fn extend<I: IntoIterator<Item = u32>>(&mut self, words: I) -> &mut Self {
        self.words.extend(words);
        self
    }

    pub fn label(&mut self, name: &str) -> &mut Self {
        if self.labels.insert(name.to_string(), self.words.len()).is_some() {
            self.duplicate.get_or_insert_with(|| name.to_string());
        }
        self
    }

    pub fn branch(&mut self, cond: Cond, rs1: u8, rs2: u8, label: &str) -> &mut Self {
        let fixup = Fixup::Branch {
            funct3: cond.funct3(),
            rs1,
            rs2,
        };
        self.fixups.push((self.words.len(), label.to_string(), fixup));
        self.words.push(0);
        self
    }

    pub fn jal_to(&mut self, rd: u8, label: &str) -> &mut Self {
        self.fixups
            .push((self.words.len(), label.to_string(), Fixup::Jal { rd }));
        self.words.push(0);
        self
    }

    pub fn j(&mut self, label: &str) -> &mut Self {
        self.jal_to(ZERO, label)
    }

    /// `j .`, the idle loop the core parks in.
    pub fn halt(&mut self) -> &mut Self {
        self.emit(jal(ZERO, 0))
    }

    pub fn finish(&mut self) -> Result<Vec<u32>, AsmError> {
        if let Some(name) = self.duplicate.take() {
            return Err(AsmError::DuplicateLabel(name));
        }
        let mut words = self.words.clone();
        for (at, label, fixup) in &self.fixups {
            let target = *self
                .labels
                .get(label)
                .ok_or_else(|| AsmError::UndefinedLabel(label.clone()))?;
            let offset = (target as i64 - *at as i64) * 4;
            let (limit, word) = match *fixup {
                Fixup::Branch { funct3, rs1, rs2 } => {
                    (1 << 12, b_type(offset as i32, rs2, rs1, funct3))
                }
                Fixup::Jal { rd } => (1 << 20, j_type(offset as i32, rd)),
            };
            if offset < -limit || offset >= limit {
                return Err(AsmError::OutOfRange {
                    label: label.clone(),
                    offset,
                });
            }
            words[*at] = word;
        }
        Ok(words)
    }
}

/// Hand-assembled counterparts of the firmware fixtures. They publish
/// through the same output window with the same sentinels, so the
/// simulator and the checker can be exercised without cross-compiling.
pub mod programs {
    use super::*;
    use vigna_harness::fixture;

    /// Scratch RAM the programs use for buffers.
    pub const SCRATCH: u32 = 0x2000;

    fn output_base() -> u32 {
        vigna_harness::OUTPUT_BASE as u32
    }

    /// Prefixes `body` with the platform entry the fixture images start
    /// with: `sp` pointed at the top of RAM, then a jump into the body.
    pub fn with_entry(body: &[u32]) -> Vec<u32> {
        let mut words = li(SP, vigna_harness::STACK_TOP as u32);
        words.push(jal(ZERO, 4));
        words.extend_from_slice(body);
        words
    }

    /// Fibonacci terms stored as they are produced.
    pub fn fibonacci_stream() -> Result<Vec<u32>, AsmError> {
        let mut a = Assembler::new();
        a.extend(li(S0, output_base()))
            .emit(addi(T0, ZERO, 0))
            .emit(addi(T1, ZERO, 1))
            .emit(addi(T2, ZERO, vigna_harness::fibonacci::TERMS as i32))
            .label("next")
            .emit(sw(T0, S0, 0))
            .emit(add(T3, T0, T1))
            .emit(mv(T0, T1))
            .emit(mv(T1, T3))
            .emit(addi(S0, S0, 4))
            .emit(addi(T2, T2, -1))
            .branch(Cond::Ne, T2, ZERO, "next")
            .extend(li(T4, fixture::FIBONACCI_SENTINEL))
            .emit(sw(T4, S0, 0))
            .halt();
        a.finish()
    }

    /// Fibonacci terms computed into a RAM buffer first, then copied out.
    pub fn fibonacci_buffered() -> Result<Vec<u32>, AsmError> {
        let terms = vigna_harness::fibonacci::TERMS as i32;
        let mut a = Assembler::new();
        a.extend(li(S1, SCRATCH))
            .emit(sw(ZERO, S1, 0))
            .emit(addi(T0, ZERO, 1))
            .emit(sw(T0, S1, 4))
            .emit(addi(T2, ZERO, 2))
            .emit(addi(A0, ZERO, terms))
            .label("fill")
            .emit(slli(T3, T2, 2))
            .emit(add(T3, S1, T3))
            .emit(lw(T4, T3, -8))
            .emit(lw(T5, T3, -4))
            .emit(add(T4, T4, T5))
            .emit(sw(T4, T3, 0))
            .emit(addi(T2, T2, 1))
            .branch(Cond::Lt, T2, A0, "fill");
        publish_buffer(&mut a, fixture::FIBONACCI_SENTINEL);
        a.finish()
    }

    /// 10 + 20, the sum 1..=5 and max(10, 20).
    pub fn simple() -> Result<Vec<u32>, AsmError> {
        let mut a = Assembler::new();
        a.extend(li(S0, output_base()))
            .emit(addi(A0, ZERO, 10))
            .emit(addi(A1, ZERO, 20))
            .emit(add(T0, A0, A1))
            .emit(sw(T0, S0, 0))
            .emit(addi(T0, ZERO, 0))
            .emit(addi(T1, ZERO, 1))
            .emit(addi(T2, ZERO, 6))
            .label("sum")
            .emit(add(T0, T0, T1))
            .emit(addi(T1, T1, 1))
            .branch(Cond::Lt, T1, T2, "sum")
            .emit(sw(T0, S0, 4))
            .emit(mv(T0, A0))
            .branch(Cond::Ge, A0, A1, "keep")
            .emit(mv(T0, A1))
            .label("keep")
            .emit(sw(T0, S0, 8))
            .extend(li(T4, fixture::SIMPLE_SENTINEL))
            .emit(sw(T4, S0, 12))
            .halt();
        a.finish()
    }

    /// Bubble sort of the fixture input in RAM, then published.
    pub fn sorting() -> Result<Vec<u32>, AsmError> {
        let mut a = Assembler::new();
        a.extend(li(S1, SCRATCH));
        for (i, &v) in fixture::SORT_INPUT.iter().enumerate() {
            a.extend(li(T0, v as u32)).emit(sw(T0, S1, (i * 4) as i32));
        }
        a.emit(addi(A0, ZERO, fixture::SORT_INPUT.len() as i32))
            .emit(addi(T0, ZERO, 0))
            .emit(addi(T5, A0, -1))
            .label("outer")
            .branch(Cond::Ge, T0, T5, "sorted")
            .emit(addi(T1, ZERO, 0))
            .emit(sub(T6, T5, T0))
            .label("inner")
            .branch(Cond::Ge, T1, T6, "next_pass")
            .emit(slli(T2, T1, 2))
            .emit(add(T2, S1, T2))
            .emit(lw(T3, T2, 0))
            .emit(lw(T4, T2, 4))
            .branch(Cond::Ge, T4, T3, "in_order")
            .emit(sw(T4, T2, 0))
            .emit(sw(T3, T2, 4))
            .label("in_order")
            .emit(addi(T1, T1, 1))
            .j("inner")
            .label("next_pass")
            .emit(addi(T0, T0, 1))
            .j("outer")
            .label("sorted");
        publish_buffer(&mut a, fixture::SORTING_SENTINEL);
        a.finish()
    }

    /// Copies `A0` words from the buffer at `S1` to the output window, seals
    /// it with `sentinel` and parks.
    fn publish_buffer(a: &mut Assembler, sentinel: u32) {
        a.extend(li(S0, output_base()))
            .emit(addi(T0, ZERO, 0))
            .label("publish")
            .emit(slli(T2, T0, 2))
            .emit(add(T3, S1, T2))
            .emit(lw(T4, T3, 0))
            .emit(add(T3, S0, T2))
            .emit(sw(T4, T3, 0))
            .emit(addi(T0, T0, 1))
            .branch(Cond::Lt, T0, A0, "publish")
            .extend(li(T4, sentinel))
            .emit(slli(T2, A0, 2))
            .emit(add(T3, S0, T2))
            .emit(sw(T4, T3, 0))
            .halt();
    }
}

const EHDR_SIZE: u32 = 52;
const PHDR_SIZE: u32 = 32;
const EM_RISCV: u16 = 0xF3;
const PT_LOAD: u32 = 1;
const PF_X: u32 = 1;
const PF_W: u32 = 2;
const PF_R: u32 = 4;

/// Builds a little-endian ELF32 RISC-V executable with one `PT_LOAD`
/// program header per `(address, bytes)` segment and no section headers.
pub fn elf_image(entry: u32, segments: &[(u32, &[u8])]) -> Vec<u8> {
    let phnum = segments.len() as u32;
    let mut out = Vec::new();

    out.extend_from_slice(&[0x7F, b'E', b'L', b'F', 1, 1, 1, 0]);
    out.extend_from_slice(&[0; 8]);
    out.extend_from_slice(&2u16.to_le_bytes()); // ET_EXEC
    out.extend_from_slice(&EM_RISCV.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&entry.to_le_bytes());
    out.extend_from_slice(&EHDR_SIZE.to_le_bytes()); // e_phoff
    out.extend_from_slice(&0u32.to_le_bytes()); // e_shoff
    out.extend_from_slice(&0u32.to_le_bytes()); // e_flags
    out.extend_from_slice(&(EHDR_SIZE as u16).to_le_bytes());
    out.extend_from_slice(&(PHDR_SIZE as u16).to_le_bytes());
    out.extend_from_slice(&(phnum as u16).to_le_bytes());
    out.extend_from_slice(&40u16.to_le_bytes()); // e_shentsize
    out.extend_from_slice(&0u16.to_le_bytes()); // e_shnum
    out.extend_from_slice(&0u16.to_le_bytes()); // e_shstrndx

    let mut offset = EHDR_SIZE + PHDR_SIZE * phnum;
    for (i, (addr, data)) in segments.iter().enumerate() {
        let flags = if i == 0 { PF_R | PF_X } else { PF_R | PF_W };
        for field in [
            PT_LOAD,
            offset,
            *addr,
            *addr,
            data.len() as u32,
            data.len() as u32,
            flags,
            4,
        ] {
            out.extend_from_slice(&field.to_le_bytes());
        }
        offset += (data.len() as u32 + 3) & !3;
    }

    for (_, data) in segments {
        out.extend_from_slice(data);
        while out.len() % 4 != 0 {
            out.push(0);
        }
    }
    out
}
