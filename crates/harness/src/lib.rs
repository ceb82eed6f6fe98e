// Vigna Testbench - Bare-metal fixtures and simulator for the Vigna RISC-V core
// Copyright (C) 2026 Vigna Testbench Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Memory-mapped test harness shared by the Vigna fixture programs.
//!
//! A fixture computes a handful of 32-bit results, publishes them into
//! consecutive cells of the output window at [`OUTPUT_BASE`], writes its
//! completion sentinel into the next cell and idles forever. The same crate
//! also carries the fixture table the host-side checker compares against.

#![cfg_attr(not(test), no_std)]

pub mod arith;
pub mod entry;
pub mod fibonacci;
pub mod fixture;
pub mod region;
pub mod sort;

pub use entry::STACK_TOP;
pub use fixture::Fixture;
pub use region::{CellSink, Halted, Mmio, Publisher};

/// Base address of the output window on the Vigna test platform.
pub const OUTPUT_BASE: usize = 0x1000;

/// Every cell is one naturally aligned 32-bit word.
pub const CELL_BYTES: usize = 4;

/// Address of output cell `index`.
pub const fn cell_address(index: usize) -> usize {
    OUTPUT_BASE + index * CELL_BYTES
}
