// Vigna Testbench - Bare-metal fixtures and simulator for the Vigna RISC-V core
// Copyright (C) 2026 Vigna Testbench Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Platform entry for fixture programs.
//!
//! The core starts fetching at its reset address with nothing set up. The
//! `_start` emitted by [`entry!`](crate::entry) is linked first in `.text`
//! (see `link.x`) and does exactly two things: point `sp` at
//! [`STACK_TOP`] and jump to the fixture body. It touches no CSR, clears no
//! register file and copies no `.data`: the loader places every segment at
//! its final address and RAM powers up zeroed on the simulator. Only `x0`
//! and `x2` are used, so the sequence is legal on every Vigna build,
//! RV32E included.

/// One past the last byte of the linker `RAM` region in `memory.x`.
pub const STACK_TOP: usize = 0x0001_0000;

/// Declares `$main` as the fixture body and emits the bare `_start` that
/// the platform jumps to out of reset.
///
/// ```ignore
/// vigna_harness::entry!(main);
///
/// fn main() -> ! {
///     // publish, seal, idle
/// }
/// ```
#[macro_export]
macro_rules! entry {
    ($main:path) => {
        const _: fn() -> ! = $main;

        #[cfg(target_arch = "riscv32")]
        ::core::arch::global_asm!(
            ".section .text.start, \"ax\"",
            ".global _start",
            "_start:",
            "    la sp, _stack_top",
            "    j {main}",
            main = sym $main,
        );
    };
}
