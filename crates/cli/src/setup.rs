// Vigna Testbench - Bare-metal fixtures and simulator for the Vigna RISC-V core
// Copyright (C) 2026 Vigna Testbench Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{anyhow, Context, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::info;

use vigna_config::{parse_size, CoreConfig};
use vigna_core::bus::SystemBus;
use vigna_core::cpu::{CpuConfig, RiscV};
use vigna_core::Machine;

/// A machine with firmware loaded, ready to run.
pub struct Booted {
    pub machine: Machine<RiscV>,
    pub firmware_bytes: Vec<u8>,
}

/// Resolves a preset name or `.vh` path into a CPU configuration the
/// simulator can model.
pub fn resolve_core(spec: &str) -> Result<CpuConfig> {
    let config = CoreConfig::resolve(spec)?;
    if let Err(errors) = config.validate() {
        let joined: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        return Err(anyhow!(
            "Core configuration '{}' is invalid: {}",
            spec,
            joined.join("; ")
        ));
    }
    let cpu = CpuConfig::try_from(&config)
        .with_context(|| format!("Core configuration '{}' cannot be simulated", spec))?;
    info!(
        "Core '{}': extensions {:?}, reset address {:#x}",
        spec, cpu.extensions, cpu.reset_addr
    );
    Ok(cpu)
}

pub fn memory_bytes(memory_size: &str) -> Result<usize> {
    let bytes = parse_size(memory_size)?;
    if bytes == 0 || bytes > u32::MAX as u64 + 1 {
        return Err(anyhow!(
            "Memory size '{}' must be between 1 byte and 4 GiB",
            memory_size
        ));
    }
    Ok(bytes as usize)
}

/// Builds a fresh machine for `core`, reads the firmware and loads it.
/// Every failure here is a configuration problem.
pub fn boot(firmware: &Path, core: &str, memory_size: &str) -> Result<Booted> {
    let cpu = resolve_core(core)?;
    let size = memory_bytes(memory_size)?;

    let firmware_bytes = std::fs::read(firmware)
        .with_context(|| format!("Failed to read firmware {:?}", firmware))?;
    let program = vigna_loader::load_elf_bytes(&firmware_bytes)
        .with_context(|| format!("Failed to load firmware {:?}", firmware))?;

    let mut machine = Machine::new(RiscV::new(cpu), SystemBus::with_memory(size));
    machine
        .load_firmware(&program)
        .map_err(|e| anyhow!("Failed to load firmware into memory: {}", e))?;

    Ok(Booted {
        machine,
        firmware_bytes,
    })
}

pub fn firmware_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
