// Vigna Testbench - Bare-metal fixtures and simulator for the Vigna RISC-V core
// Copyright (C) 2026 Vigna Testbench Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Bubble sort of a fixed five-element array.

#![no_std]
#![no_main]

use panic_halt as _;
use vigna_harness::{fixture, sort, Mmio, Publisher};

vigna_harness::entry!(main);

fn main() -> ! {
    // SAFETY: the Vigna test platform maps the output window.
    let mut out = Publisher::new(unsafe { Mmio::output() });

    let mut arr = fixture::SORT_INPUT;
    sort::bubble_sort(&mut arr);
    out.publish_all(&arr);

    out.seal(fixture::SORTING_SENTINEL).idle()
}
