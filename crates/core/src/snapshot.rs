// Vigna Testbench - Bare-metal fixtures and simulator for the Vigna RISC-V core
// Copyright (C) 2026 Vigna Testbench Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

use crate::peripherals::output::OutputWrite;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MachineSnapshot {
    pub cpu: CpuSnapshot,
    pub output: RegionSnapshot,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CpuSnapshot {
    /// x0..x31 (x0..x15 on RV32E, upper half stays zero).
    pub registers: Vec<u32>,
    pub pc: u32,
}

/// Contents of the output region and the stores that produced them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RegionSnapshot {
    pub base: u64,
    pub cells: Vec<u32>,
    pub writes: Vec<OutputWrite>,
}

impl MachineSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
