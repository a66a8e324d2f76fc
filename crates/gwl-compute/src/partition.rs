//! Walker-to-device assignment for the batched device backend.

use std::ops::Range;

/// Contiguous partition of `0..n_walkers` across devices.
///
/// Block sizes differ by at most one; the first `n_walkers % n_devices`
/// devices take the extra walker. Devices beyond `n_walkers` get empty
/// blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAssignment {
    ranges: Vec<Range<usize>>,
    n_walkers: usize,
}

impl DeviceAssignment {
    /// Partition `n_walkers` walkers over `n_devices` devices.
    ///
    /// # Panics
    /// Panics if `n_devices == 0`.
    pub fn contiguous(n_walkers: usize, n_devices: usize) -> Self {
        assert!(n_devices > 0, "n_devices must be > 0");
        let base = n_walkers / n_devices;
        let extra = n_walkers % n_devices;

        let mut ranges = Vec::with_capacity(n_devices);
        let mut start = 0;
        for device in 0..n_devices {
            let len = base + usize::from(device < extra);
            ranges.push(start..start + len);
            start += len;
        }
        Self { ranges, n_walkers }
    }

    /// Number of devices (including ones with empty blocks).
    pub fn n_devices(&self) -> usize {
        self.ranges.len()
    }

    /// Walker block owned by `device`.
    pub fn range(&self, device: usize) -> Range<usize> {
        self.ranges[device].clone()
    }

    /// `(device, block)` pairs in device order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Range<usize>)> + '_ {
        self.ranges.iter().cloned().enumerate()
    }

    /// Split a per-walker output array into disjoint per-device windows.
    ///
    /// # Panics
    /// Panics if `out.len() != n_walkers`.
    pub fn split_outputs<'a>(&self, out: &'a mut [f64]) -> Vec<&'a mut [f64]> {
        assert_eq!(out.len(), self.n_walkers, "output length must equal n_walkers");
        let mut windows = Vec::with_capacity(self.ranges.len());
        let mut rest = out;
        for r in &self.ranges {
            let (head, tail) = rest.split_at_mut(r.len());
            windows.push(head);
            rest = tail;
        }
        windows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_even_split() {
        let a = DeviceAssignment::contiguous(8, 4);
        let ranges: Vec<_> = a.iter().map(|(_, r)| r).collect();
        assert_eq!(ranges, vec![0..2, 2..4, 4..6, 6..8]);
    }

    #[test]
    fn test_remainder_goes_to_first_devices() {
        let a = DeviceAssignment::contiguous(10, 4);
        assert_eq!(a.range(0), 0..3);
        assert_eq!(a.range(1), 3..6);
        assert_eq!(a.range(2), 6..8);
        assert_eq!(a.range(3), 8..10);
    }

    #[test]
    fn test_more_devices_than_walkers() {
        let a = DeviceAssignment::contiguous(2, 4);
        assert_eq!(a.range(0), 0..1);
        assert_eq!(a.range(1), 1..2);
        assert!(a.range(2).is_empty());
        assert!(a.range(3).is_empty());
    }

    #[test]
    fn test_split_outputs_windows() {
        let a = DeviceAssignment::contiguous(5, 2);
        let mut out = vec![0.0; 5];
        {
            let mut windows = a.split_outputs(&mut out);
            assert_eq!(windows[0].len(), 3);
            assert_eq!(windows[1].len(), 2);
            windows[1][0] = 7.0;
        }
        assert_eq!(out[3], 7.0);
    }

    #[test]
    #[should_panic(expected = "output length")]
    fn test_split_outputs_rejects_short_output() {
        let a = DeviceAssignment::contiguous(5, 2);
        let mut out = vec![0.0; 4];
        a.split_outputs(&mut out);
    }

    #[test]
    #[should_panic(expected = "n_devices")]
    fn test_zero_devices_panics() {
        DeviceAssignment::contiguous(4, 0);
    }

    proptest! {
        #[test]
        fn prop_partition_covers_every_walker_once(n_walkers in 1usize..500, n_devices in 1usize..9) {
            let a = DeviceAssignment::contiguous(n_walkers, n_devices);
            let mut next = 0;
            let (mut min_len, mut max_len) = (usize::MAX, 0);
            for (_, r) in a.iter() {
                prop_assert_eq!(r.start, next);
                next = r.end;
                min_len = min_len.min(r.len());
                max_len = max_len.max(r.len());
            }
            prop_assert_eq!(next, n_walkers);
            prop_assert!(max_len - min_len <= 1);

            let mut out: Vec<f64> = (0..n_walkers).map(|w| w as f64).collect();
            let windows = a.split_outputs(&mut out);
            prop_assert_eq!(windows.len(), n_devices);
            for ((_, r), window) in a.iter().zip(&windows) {
                let expected: Vec<f64> = r.map(|w| w as f64).collect();
                prop_assert_eq!(&window[..], &expected[..]);
            }
        }
    }
}
