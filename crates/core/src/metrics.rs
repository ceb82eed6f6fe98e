// Vigna Testbench - Bare-metal fixtures and simulator for the Vigna RISC-V core
// Copyright (C) 2026 Vigna Testbench Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::SimulationObserver;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

const OPCODE_STORE: u32 = 0x23;

#[derive(Debug)]
pub struct PerformanceMetrics {
    instruction_count: AtomicU64,
    store_count: AtomicU64,
    start_time: Mutex<Instant>,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self {
            instruction_count: AtomicU64::new(0),
            store_count: AtomicU64::new(0),
            start_time: Mutex::new(Instant::now()),
        }
    }

    pub fn reset(&self) {
        self.instruction_count.store(0, Ordering::SeqCst);
        self.store_count.store(0, Ordering::SeqCst);
        if let Ok(mut start) = self.start_time.lock() {
            *start = Instant::now();
        }
    }

    pub fn get_instructions(&self) -> u64 {
        self.instruction_count.load(Ordering::SeqCst)
    }

    /// Store instructions executed, to any address.
    pub fn get_stores(&self) -> u64 {
        self.store_count.load(Ordering::SeqCst)
    }

    pub fn get_ips(&self) -> f64 {
        let elapsed = match self.start_time.lock() {
            Ok(start) => start.elapsed().as_secs_f64(),
            Err(_) => return 0.0,
        };
        if elapsed > 0.0 {
            self.get_instructions() as f64 / elapsed
        } else {
            0.0
        }
    }
}

impl SimulationObserver for PerformanceMetrics {
    fn on_simulation_start(&self) {
        self.reset();
    }

    fn on_step_start(&self, _pc: u32, opcode: u32) {
        self.instruction_count.fetch_add(1, Ordering::SeqCst);
        if opcode & 0x7F == OPCODE_STORE {
            self.store_count.fetch_add(1, Ordering::SeqCst);
        }
    }
}
