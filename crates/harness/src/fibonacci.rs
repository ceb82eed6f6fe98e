// Vigna Testbench - Bare-metal fixtures and simulator for the Vigna RISC-V core
// Copyright (C) 2026 Vigna Testbench Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Two independent ways of producing F(0)..F(7).

pub const TERMS: usize = 8;

/// Two-variable recurrence starting at (0, 1), handing out every term as soon
/// as it is known.
pub fn stream(mut emit: impl FnMut(i32)) {
    let mut a = 0;
    let mut b = 1;
    emit(a);
    emit(b);

    for _ in 2..TERMS {
        let next = a + b;
        emit(next);
        a = b;
        b = next;
    }
}

/// Same recurrence, materialised into a local buffer first.
pub const fn buffered() -> [i32; TERMS] {
    let mut fib = [0; TERMS];
    fib[0] = 0;
    fib[1] = 1;

    let mut i = 2;
    while i < TERMS {
        fib[i] = fib[i - 1] + fib[i - 2];
        i += 1;
    }
    fib
}
