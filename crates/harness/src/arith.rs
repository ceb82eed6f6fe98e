// Vigna Testbench - Bare-metal fixtures and simulator for the Vigna RISC-V core
// Copyright (C) 2026 Vigna Testbench Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub const fn add(a: i32, b: i32) -> i32 {
    a + b
}

/// Sum of `lo..=hi`, accumulated one term at a time.
pub const fn sum_inclusive(lo: i32, hi: i32) -> i32 {
    let mut sum = 0;
    if lo > hi {
        return sum;
    }
    let mut i = lo;
    loop {
        sum += i;
        if i == hi {
            break;
        }
        i += 1;
    }
    sum
}

pub const fn max(a: i32, b: i32) -> i32 {
    if a > b {
        a
    } else {
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_values() {
        assert_eq!(add(10, 20), 30);
        assert_eq!(sum_inclusive(1, 5), 15);
        assert_eq!(max(10, 20), 20);
    }

    #[test]
    fn test_sum_inclusive_bounds() {
        assert_eq!(sum_inclusive(7, 7), 7);
        assert_eq!(sum_inclusive(i32::MAX, i32::MAX), i32::MAX);
        assert_eq!(sum_inclusive(-1, 0), -1);
        const TOP: i32 = sum_inclusive(i32::MAX, i32::MAX);
        assert_eq!(TOP, i32::MAX);
    }

    #[test]
    fn test_max_ties_and_order() {
        assert_eq!(max(20, 10), 20);
        assert_eq!(max(-3, -3), -3);
    }

    #[test]
    fn test_empty_range() {
        assert_eq!(sum_inclusive(5, 1), 0);
    }
}
