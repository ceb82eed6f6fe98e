// Vigna Testbench - Bare-metal fixtures and simulator for the Vigna RISC-V core
// Copyright (C) 2026 Vigna Testbench Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! First eight Fibonacci numbers, computed into a local buffer and then
//! copied out.

#![no_std]
#![no_main]

use panic_halt as _;
use vigna_harness::{fibonacci, fixture, Mmio, Publisher};

vigna_harness::entry!(main);

fn main() -> ! {
    // SAFETY: the Vigna test platform maps the output window.
    let mut out = Publisher::new(unsafe { Mmio::output() });

    let fib = fibonacci::buffered();
    out.publish_all(&fib);

    out.seal(fixture::FIBONACCI_SENTINEL).idle()
}
