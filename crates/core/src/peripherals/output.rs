// Vigna Testbench - Bare-metal fixtures and simulator for the Vigna RISC-V core
// Copyright (C) 2026 Vigna Testbench Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::any::Any;

use crate::snapshot::RegionSnapshot;
use crate::SimResult;

/// Cells available in the output window.
pub const DEFAULT_CELLS: usize = 64;

/// One store that landed in the output region, in program order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputWrite {
    /// Cell index (`offset / 4`).
    pub cell: usize,
    /// Byte offset from the region base.
    pub offset: u64,
    pub value: u32,
    /// Access width in bytes.
    pub width: u8,
}

impl OutputWrite {
    pub fn is_word(&self) -> bool {
        self.width == 4 && self.offset % 4 == 0
    }
}

/// The observation window firmware publishes its results into.
///
/// Stores update the cell contents and are appended to a write log so an
/// external checker can see both the final state and how it was reached.
#[derive(Debug)]
pub struct OutputPort {
    cells: Vec<u32>,
    writes: Vec<OutputWrite>,
}

impl Default for OutputPort {
    fn default() -> Self {
        Self::new(DEFAULT_CELLS)
    }
}

impl OutputPort {
    pub fn new(cells: usize) -> Self {
        Self {
            cells: vec![0; cells],
            writes: Vec::new(),
        }
    }

    pub fn size(&self) -> u64 {
        (self.cells.len() * vigna_harness::CELL_BYTES) as u64
    }

    pub fn cells(&self) -> &[u32] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> Option<u32> {
        self.cells.get(index).copied()
    }

    pub fn writes(&self) -> &[OutputWrite] {
        &self.writes
    }

    /// Zeroes every cell and forgets the log.
    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = 0);
        self.writes.clear();
    }

    pub fn snapshot(&self, base: u64) -> RegionSnapshot {
        RegionSnapshot {
            base,
            cells: self.cells.clone(),
            writes: self.writes.clone(),
        }
    }

    fn store_byte(&mut self, offset: u64, value: u8) {
        let index = (offset / 4) as usize;
        let shift = (offset % 4) * 8;
        if let Some(cell) = self.cells.get_mut(index) {
            *cell = (*cell & !(0xFF << shift)) | ((value as u32) << shift);
        }
    }
}

impl crate::Peripheral for OutputPort {
    fn read(&self, offset: u64) -> SimResult<u8> {
        let index = (offset / 4) as usize;
        let shift = (offset % 4) * 8;
        Ok(self.cell(index).map_or(0, |c| (c >> shift) as u8))
    }

    fn write(&mut self, offset: u64, value: u8) -> SimResult<()> {
        self.write_sized(offset, value as u32, 1)
    }

    fn write_sized(&mut self, offset: u64, value: u32, width: u8) -> SimResult<()> {
        let write = OutputWrite {
            cell: (offset / 4) as usize,
            offset,
            value,
            width,
        };
        if !write.is_word() {
            tracing::warn!(
                "{}-byte store of {:#x} at output offset {:#x}",
                width,
                value,
                offset
            );
        }
        tracing::debug!("output[{}] <= {:#010x}", write.cell, value);
        self.writes.push(write);

        for (i, byte) in value.to_le_bytes().into_iter().take(width as usize).enumerate() {
            self.store_byte(offset + i as u64, byte);
        }
        Ok(())
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }
    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        Some(self)
    }
}
