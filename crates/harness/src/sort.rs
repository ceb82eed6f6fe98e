// Vigna Testbench - Bare-metal fixtures and simulator for the Vigna RISC-V core
// Copyright (C) 2026 Vigna Testbench Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

/// Ascending bubble sort with a strict `>` swap test.
///
/// Outer pass `i` runs over `0..N-1`, inner index `j` over `0..N-1-i`, so the
/// comparison count is fixed by `N` alone. Returns that count.
pub fn bubble_sort<const N: usize>(arr: &mut [i32; N]) -> usize {
    let last = N.saturating_sub(1);
    let mut comparisons = 0;

    for i in 0..last {
        for j in 0..last - i {
            comparisons += 1;
            if arr[j] > arr[j + 1] {
                arr.swap(j, j + 1);
            }
        }
    }
    comparisons
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_input() {
        let mut arr = [5, 2, 8, 1, 9];
        let comparisons = bubble_sort(&mut arr);
        assert_eq!(arr, [1, 2, 5, 8, 9]);
        assert_eq!(comparisons, 10);
    }

    #[test]
    fn test_already_sorted_still_compares() {
        let mut arr = [1, 2, 3, 4, 5];
        assert_eq!(bubble_sort(&mut arr), 10);
        assert_eq!(arr, [1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_negative_and_equal_values() {
        let mut arr = [3, -7, 3, 0, -7, 12];
        assert_eq!(bubble_sort(&mut arr), 15);
        assert_eq!(arr, [-7, -7, 0, 3, 3, 12]);
    }
}
