// Vigna Testbench - Bare-metal fixtures and simulator for the Vigna RISC-V core
// Copyright (C) 2026 Vigna Testbench Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Checks the write log of the output region against what a program is
//! supposed to publish.
//!
//! A well-behaved program stores one word per cell, in ascending cell order
//! with no repeats or gaps, finishes with the sentinel in the cell right
//! after its results and then never touches the region again.

use serde::Serialize;
use std::fmt;

use vigna_config::{ExpectedOutput, StopReason};
use vigna_harness::Fixture;

use crate::peripherals::OutputWrite;
use crate::RunOutcome;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Expectation {
    pub values: Vec<i32>,
    pub sentinel: u32,
}

impl Expectation {
    /// Result cells plus the sentinel cell.
    pub fn cells(&self) -> usize {
        self.values.len() + 1
    }

    fn expected(&self, cell: usize) -> Option<u32> {
        match cell.cmp(&self.values.len()) {
            std::cmp::Ordering::Less => Some(self.values[cell] as u32),
            std::cmp::Ordering::Equal => Some(self.sentinel),
            std::cmp::Ordering::Greater => None,
        }
    }
}

impl From<&Fixture> for Expectation {
    fn from(fixture: &Fixture) -> Self {
        Self {
            values: fixture.values.to_vec(),
            sentinel: fixture.sentinel,
        }
    }
}

impl From<&ExpectedOutput> for Expectation {
    fn from(output: &ExpectedOutput) -> Self {
        Self {
            values: output.values.clone(),
            sentinel: output.sentinel,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    #[error("write #{index}: {width}-byte store at offset {offset:#x}, expected a full word")]
    NotWordAccess { index: usize, offset: u64, width: u8 },
    #[error("write #{index}: cell {actual} written while cell {expected} was next")]
    OutOfOrder {
        index: usize,
        expected: usize,
        actual: usize,
    },
    #[error("cell {cell}: expected {expected} ({expected:#x}), got {actual} ({actual:#x})")]
    ValueMismatch {
        cell: usize,
        expected: i32,
        actual: i32,
    },
    #[error("sentinel cell {cell}: expected {expected:#010x}, got {actual:#010x}")]
    SentinelMismatch {
        cell: usize,
        expected: u32,
        actual: u32,
    },
    #[error("write #{index}: cell {cell} is past the sentinel cell")]
    ExtraCell { index: usize, cell: usize },
    #[error("write #{index}: cell {cell} written after the sentinel")]
    WriteAfterSentinel { index: usize, cell: usize },
    #[error("cell {cell} was never written")]
    MissingCell { cell: usize },
    #[error("sentinel {expected:#010x} was never published")]
    MissingSentinel { expected: u32 },
    #[error("run ended with '{actual}' instead of halting")]
    NotHalted { actual: StopReason },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub expectation: Expectation,
    pub writes_checked: usize,
    pub violations: Vec<Violation>,
}

impl Report {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.passed() {
            return write!(
                f,
                "PASS: {} cells published in order, sentinel {:#010x}",
                self.expectation.cells(),
                self.expectation.sentinel
            );
        }
        writeln!(f, "FAIL: {} violation(s)", self.violations.len())?;
        for v in &self.violations {
            writeln!(f, "  - {}", v)?;
        }
        Ok(())
    }
}

/// Checks a write log in program order.
pub fn check(writes: &[OutputWrite], expectation: &Expectation) -> Report {
    let sentinel_cell = expectation.values.len();
    let mut violations = Vec::new();
    let mut written = vec![false; expectation.cells()];
    let mut next = 0usize;
    let mut sealed = false;

    for (index, w) in writes.iter().enumerate() {
        if sealed {
            violations.push(Violation::WriteAfterSentinel {
                index,
                cell: w.cell,
            });
            continue;
        }
        if !w.is_word() {
            violations.push(Violation::NotWordAccess {
                index,
                offset: w.offset,
                width: w.width,
            });
            continue;
        }

        if w.cell != next {
            violations.push(Violation::OutOfOrder {
                index,
                expected: next,
                actual: w.cell,
            });
        }
        next = next.max(w.cell + 1);

        let Some(expected) = expectation.expected(w.cell) else {
            violations.push(Violation::ExtraCell {
                index,
                cell: w.cell,
            });
            continue;
        };
        written[w.cell] = true;

        if w.cell == sentinel_cell {
            if w.value == expectation.sentinel {
                sealed = true;
            } else {
                violations.push(Violation::SentinelMismatch {
                    cell: w.cell,
                    expected,
                    actual: w.value,
                });
            }
        } else if w.value != expected {
            violations.push(Violation::ValueMismatch {
                cell: w.cell,
                expected: expected as i32,
                actual: w.value as i32,
            });
        }
    }

    for (cell, &seen) in written[..sentinel_cell].iter().enumerate() {
        if !seen {
            violations.push(Violation::MissingCell { cell });
        }
    }
    if !sealed {
        violations.push(Violation::MissingSentinel {
            expected: expectation.sentinel,
        });
    }

    Report {
        expectation: expectation.clone(),
        writes_checked: writes.len(),
        violations,
    }
}

/// Like [`check`], and additionally requires the run to have ended in the
/// idle loop.
pub fn check_run(
    outcome: &RunOutcome,
    writes: &[OutputWrite],
    expectation: &Expectation,
) -> Report {
    let mut report = check(writes, expectation);
    if outcome.stop_reason != StopReason::Halted {
        report.violations.push(Violation::NotHalted {
            actual: outcome.stop_reason,
        });
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigna_harness::fixture;

    fn word(cell: usize, value: u32) -> OutputWrite {
        OutputWrite {
            cell,
            offset: (cell * 4) as u64,
            value,
            width: 4,
        }
    }

    fn published(fixture: &Fixture) -> Vec<OutputWrite> {
        let mut writes: Vec<_> = fixture
            .values
            .iter()
            .enumerate()
            .map(|(i, &v)| word(i, v as u32))
            .collect();
        writes.push(word(fixture.values.len(), fixture.sentinel));
        writes
    }

    #[test]
    fn test_every_fixture_passes_its_own_log() {
        for fixture in &fixture::ALL {
            let report = check(&published(fixture), &Expectation::from(fixture));
            assert!(report.passed(), "{}: {}", fixture.name, report);
            assert_eq!(report.writes_checked, fixture.cells());
        }
    }

    #[test]
    fn test_swapped_cells() {
        let fixture = &fixture::SORTING_TEST;
        let mut writes = published(fixture);
        writes.swap(1, 2);
        let report = check(&writes, &Expectation::from(fixture));
        assert!(report.violations.contains(&Violation::OutOfOrder {
            index: 1,
            expected: 1,
            actual: 2
        }));
    }

    #[test]
    fn test_repeated_cell() {
        let fixture = &fixture::SIMPLE_TEST;
        let mut writes = published(fixture);
        writes.insert(1, word(0, fixture.values[0] as u32));
        let report = check(&writes, &Expectation::from(fixture));
        assert_eq!(
            report.violations,
            vec![Violation::OutOfOrder {
                index: 1,
                expected: 1,
                actual: 0
            }]
        );
    }

    #[test]
    fn test_skipped_cell() {
        let fixture = &fixture::FIBONACCI_TEST;
        let mut writes = published(fixture);
        writes.remove(3);
        let report = check(&writes, &Expectation::from(fixture));
        assert!(report.violations.contains(&Violation::MissingCell { cell: 3 }));
        assert!(report.violations.contains(&Violation::OutOfOrder {
            index: 3,
            expected: 3,
            actual: 4
        }));
    }

    #[test]
    fn test_wrong_value_and_sentinel() {
        let expectation = Expectation {
            values: vec![1, 2],
            sentinel: 0xDEAD_BEEF,
        };
        let writes = [word(0, 1), word(1, 3), word(2, 0xDEAD_BEEE)];
        let report = check(&writes, &expectation);
        assert_eq!(
            report.violations,
            vec![
                Violation::ValueMismatch {
                    cell: 1,
                    expected: 2,
                    actual: 3
                },
                Violation::SentinelMismatch {
                    cell: 2,
                    expected: 0xDEAD_BEEF,
                    actual: 0xDEAD_BEEE
                },
                Violation::MissingSentinel {
                    expected: 0xDEAD_BEEF
                },
            ]
        );
    }

    #[test]
    fn test_write_after_sentinel() {
        let fixture = &fixture::FIBONACCI_SIMPLE;
        let mut writes = published(fixture);
        writes.push(word(0, 99));
        let report = check(&writes, &Expectation::from(fixture));
        assert_eq!(
            report.violations,
            vec![Violation::WriteAfterSentinel {
                index: fixture.cells(),
                cell: 0
            }]
        );
    }

    #[test]
    fn test_byte_store_rejected() {
        let expectation = Expectation {
            values: vec![7],
            sentinel: 1,
        };
        let writes = [
            OutputWrite {
                cell: 0,
                offset: 0,
                value: 7,
                width: 1,
            },
            word(0, 7),
            word(1, 1),
        ];
        let report = check(&writes, &expectation);
        assert_eq!(
            report.violations,
            vec![Violation::NotWordAccess {
                index: 0,
                offset: 0,
                width: 1
            }]
        );
    }

    #[test]
    fn test_empty_log() {
        let expectation = Expectation::from(&fixture::SIMPLE_TEST);
        let report = check(&[], &expectation);
        assert!(!report.passed());
        assert!(report.violations.contains(&Violation::MissingSentinel {
            expected: fixture::SIMPLE_SENTINEL
        }));
        assert!(report.to_string().starts_with("FAIL"));
    }

    #[test]
    fn test_violation_serialises_with_kind() {
        let v = Violation::MissingCell { cell: 2 };
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["kind"], "missing_cell");
        assert_eq!(json["cell"], 2);
    }
}
