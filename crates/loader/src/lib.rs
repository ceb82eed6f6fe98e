// Vigna Testbench - Bare-metal fixtures and simulator for the Vigna RISC-V core
// Copyright (C) 2026 Vigna Testbench Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{anyhow, bail, Context, Result};
use goblin::elf::header::EM_RISCV;
use goblin::elf::program_header::PT_LOAD;
use goblin::elf::Elf;
use std::fmt::Write;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};
use vigna_core::memory::ProgramImage;

pub fn load_elf(path: &Path) -> Result<ProgramImage> {
    let buffer = fs::read(path).with_context(|| format!("Failed to read ELF file: {:?}", path))?;
    load_elf_bytes(&buffer)
}

pub fn load_elf_bytes(buffer: &[u8]) -> Result<ProgramImage> {
    let elf = Elf::parse(buffer).context("Failed to parse ELF binary")?;

    if elf.is_64 {
        bail!("Expected an ELF32 image, found ELF64");
    }
    if elf.header.e_machine != EM_RISCV {
        warn!(
            "ELF machine {:#x} is not RISC-V; loading anyway",
            elf.header.e_machine
        );
    }

    info!("ELF Entry Point: {:#x}", elf.entry);

    let mut program_image = ProgramImage::new(elf.entry);

    for ph in &elf.program_headers {
        if ph.p_type == PT_LOAD {
            // Load at the physical address; .data is copied to RAM by startup code
            let start_addr = ph.p_paddr;
            let size = ph.p_filesz as usize;
            let offset = ph.p_offset as usize;

            if size == 0 {
                continue;
            }

            debug!(
                "Found Loadable Segment: Addr={:#x}, Size={} bytes, Offset={:#x}",
                start_addr, size, offset
            );

            if offset + size > buffer.len() {
                return Err(anyhow!("Segment out of bounds in ELF file"));
            }

            let segment_data = buffer[offset..offset + size].to_vec();
            program_image.add_segment(start_addr, segment_data);
        }
    }

    if program_image.segments.is_empty() {
        warn!("No loadable segments found in ELF file");
    }

    Ok(program_image)
}

/// Renders `[base, base + len)` of an image for Verilog `$readmemh`: one
/// byte per line as two lowercase hex digits, in address order. Bytes no
/// segment covers are written as `00`.
pub fn readmemh(image: &ProgramImage, base: u64, len: usize) -> String {
    bytes_to_readmemh(&image.flatten(base, len))
}

/// Same layout as [`readmemh`] for a list of instruction words, each
/// emitted little-endian.
pub fn words_to_readmemh(words: &[u32]) -> String {
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
    bytes_to_readmemh(&bytes)
}

fn bytes_to_readmemh(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for b in bytes {
        let _ = writeln!(out, "{:02x}", b);
    }
    out
}

/// Pulls the instruction words out of an `objdump -d` listing.
///
/// Instruction lines are the ones indented by two spaces; their second
/// field is the encoding in hex.
pub fn words_from_objdump(text: &str) -> Result<Vec<u32>> {
    let mut words = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        if !line.starts_with("  ") {
            continue;
        }
        let Some(field) = line.split_whitespace().nth(1) else {
            continue;
        };
        let word = u32::from_str_radix(field, 16).with_context(|| {
            format!(
                "Line {}: '{}' is not an instruction encoding",
                lineno + 1,
                field
            )
        })?;
        words.push(word);
    }
    Ok(words)
}
