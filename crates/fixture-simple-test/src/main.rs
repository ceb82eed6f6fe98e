// Vigna Testbench - Bare-metal fixtures and simulator for the Vigna RISC-V core
// Copyright (C) 2026 Vigna Testbench Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Straight-line arithmetic, a counted loop and a conditional.

#![no_std]
#![no_main]

use panic_halt as _;
use vigna_harness::{arith, fixture, Mmio, Publisher};

vigna_harness::entry!(main);

fn main() -> ! {
    // SAFETY: the Vigna test platform maps the output window.
    let mut out = Publisher::new(unsafe { Mmio::output() });

    let a = 10;
    let b = 20;

    out.publish(arith::add(a, b)); // 30
    out.publish(arith::sum_inclusive(1, 5)); // 15
    out.publish(arith::max(a, b)); // 20

    out.seal(fixture::SIMPLE_SENTINEL).idle()
}
