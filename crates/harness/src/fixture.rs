// Vigna Testbench - Bare-metal fixtures and simulator for the Vigna RISC-V core
// Copyright (C) 2026 Vigna Testbench Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Expected output-region contents of every fixture program.
//!
//! Sentinels are per program and carry no shared meaning.

pub const FIBONACCI_SENTINEL: u32 = 0x1234_5678;
pub const SIMPLE_SENTINEL: u32 = 0xDEAD_BEEF;
pub const SORTING_SENTINEL: u32 = 0xABCD_EF00;

/// Input array of `sorting_test`.
pub const SORT_INPUT: [i32; 5] = [5, 2, 8, 1, 9];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fixture {
    pub name: &'static str,
    /// Cargo package building the firmware.
    pub package: &'static str,
    pub values: &'static [i32],
    pub sentinel: u32,
}

impl Fixture {
    /// Cells used, sentinel included.
    pub const fn cells(&self) -> usize {
        self.values.len() + 1
    }

    /// Finds a fixture by program name or package name.
    pub fn lookup(name: &str) -> Option<&'static Fixture> {
        ALL.iter().find(|f| f.name == name || f.package == name)
    }
}

pub const FIBONACCI_SIMPLE: Fixture = Fixture {
    name: "fibonacci_simple",
    package: "fixture-fibonacci-simple",
    values: &[0, 1, 1, 2, 3, 5, 8, 13],
    sentinel: FIBONACCI_SENTINEL,
};

pub const FIBONACCI_TEST: Fixture = Fixture {
    name: "fibonacci_test",
    package: "fixture-fibonacci-test",
    values: &[0, 1, 1, 2, 3, 5, 8, 13],
    sentinel: FIBONACCI_SENTINEL,
};

pub const SIMPLE_TEST: Fixture = Fixture {
    name: "simple_test",
    package: "fixture-simple-test",
    values: &[30, 15, 20],
    sentinel: SIMPLE_SENTINEL,
};

pub const SORTING_TEST: Fixture = Fixture {
    name: "sorting_test",
    package: "fixture-sorting-test",
    values: &[1, 2, 5, 8, 9],
    sentinel: SORTING_SENTINEL,
};

pub static ALL: [Fixture; 4] = [FIBONACCI_SIMPLE, FIBONACCI_TEST, SIMPLE_TEST, SORTING_TEST];
