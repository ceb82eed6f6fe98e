// Vigna Testbench - Bare-metal fixtures and simulator for the Vigna RISC-V core
// Copyright (C) 2026 Vigna Testbench Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use core::sync::atomic::{fence, Ordering};

use crate::OUTPUT_BASE;

/// Destination of published cells.
pub trait CellSink {
    fn store(&mut self, index: usize, value: i32);
}

/// Volatile stores into a device-visible word array.
#[derive(Debug)]
pub struct Mmio {
    base: *mut i32,
}

impl Mmio {
    /// # Safety
    ///
    /// `base` must be a word-aligned device address with room for every cell
    /// the program publishes, and nothing else may alias it.
    pub const unsafe fn new(base: usize) -> Self {
        Self {
            base: base as *mut i32,
        }
    }

    /// The platform output window at [`OUTPUT_BASE`].
    ///
    /// # Safety
    ///
    /// Only sound on the Vigna platform, where the window is mapped.
    pub const unsafe fn output() -> Self {
        unsafe { Self::new(OUTPUT_BASE) }
    }
}

impl CellSink for Mmio {
    fn store(&mut self, index: usize, value: i32) {
        // SAFETY: `new` requires the window to cover every published index.
        unsafe { self.base.add(index).write_volatile(value) }
    }
}

/// A running fixture: cells are published strictly in ascending order.
#[derive(Debug)]
pub struct Publisher<S: CellSink> {
    sink: S,
    next: usize,
}

impl<S: CellSink> Publisher<S> {
    pub const fn new(sink: S) -> Self {
        Self { sink, next: 0 }
    }

    pub fn publish(&mut self, value: i32) {
        self.sink.store(self.next, value);
        self.next += 1;
    }

    pub fn publish_all(&mut self, values: &[i32]) {
        for &value in values {
            self.publish(value);
        }
    }

    /// Number of result cells written so far.
    pub fn published(&self) -> usize {
        self.next
    }

    /// Writes the completion sentinel after every result and stops publishing.
    ///
    /// Consumes the publisher, so no cell can be written once the sentinel is
    /// visible.
    pub fn seal(mut self, sentinel: u32) -> Halted<S> {
        // Results must be visible no later than the sentinel.
        fence(Ordering::Release);
        self.sink.store(self.next, sentinel as i32);
        Halted {
            sink: self.sink,
            cells: self.next + 1,
        }
    }
}

/// A fixture that has published its sentinel.
#[derive(Debug)]
pub struct Halted<S> {
    sink: S,
    cells: usize,
}

impl<S> Halted<S> {
    /// Cells written including the sentinel.
    pub fn cells(&self) -> usize {
        self.cells
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Parks the hart. There is no way back to a running state.
    #[allow(clippy::empty_loop)]
    pub fn idle(self) -> ! {
        loop {}
    }
}
