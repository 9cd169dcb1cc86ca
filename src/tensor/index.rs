//! Strided index calculation
//!
//! Every buffer access in the crate goes through [`calculate_linear_index`], which
//! is what keeps kernels independent of physical layout: any permutation of axes
//! in memory is handled by supplying the matching strides.

use super::shape::STACK_DIMS;
use smallvec::SmallVec;

/// Linear element offset of `coords` under `strides`.
///
/// No bounds checking: callers guarantee every coordinate is in range.
#[inline]
pub fn calculate_linear_index(coords: &[usize], strides: &[isize]) -> isize {
    debug_assert_eq!(coords.len(), strides.len());
    coords
        .iter()
        .zip(strides)
        .map(|(&c, &s)| c as isize * s)
        .sum()
}

/// Iterator over every coordinate of a shape in logical row-major order.
///
/// Yields nothing when any dimension is zero, and a single empty coordinate for a
/// 0-d shape.
#[derive(Debug, Clone)]
pub struct CoordIter {
    shape: SmallVec<[usize; STACK_DIMS]>,
    next: Option<SmallVec<[usize; STACK_DIMS]>>,
}

impl CoordIter {
    /// Iterate the coordinates of `shape`.
    pub fn new(shape: &[usize]) -> Self {
        let next = if shape.contains(&0) {
            None
        } else {
            Some(SmallVec::from_elem(0, shape.len()))
        };
        Self {
            shape: shape.iter().copied().collect(),
            next,
        }
    }
}

impl Iterator for CoordIter {
    type Item = SmallVec<[usize; STACK_DIMS]>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        let mut advanced = current.clone();
        for d in (0..advanced.len()).rev() {
            advanced[d] += 1;
            if advanced[d] < self.shape[d] {
                self.next = Some(advanced);
                return Some(current);
            }
            advanced[d] = 0;
        }
        // Wrapped around every dimension: `current` was the last coordinate
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_index_row_major() {
        let strides = [12, 4, 1];
        assert_eq!(calculate_linear_index(&[0, 0, 0], &strides), 0);
        assert_eq!(calculate_linear_index(&[1, 2, 3], &strides), 23);
    }

    #[test]
    fn test_linear_index_permuted() {
        // NCHW logical coordinate into NHWC storage of [1, 3, 2, 2]
        let strides = [12, 1, 6, 3];
        assert_eq!(calculate_linear_index(&[0, 2, 1, 0], &strides), 8);
    }

    #[test]
    fn test_coord_iter_order() {
        let coords: Vec<Vec<usize>> = CoordIter::new(&[2, 3]).map(|c| c.to_vec()).collect();
        assert_eq!(
            coords,
            vec![
                vec![0, 0],
                vec![0, 1],
                vec![0, 2],
                vec![1, 0],
                vec![1, 1],
                vec![1, 2]
            ]
        );
    }

    #[test]
    fn test_coord_iter_degenerate() {
        assert_eq!(CoordIter::new(&[2, 0, 3]).count(), 0);
        assert_eq!(CoordIter::new(&[]).count(), 1);
        assert_eq!(CoordIter::new(&[1, 1, 1]).count(), 1);
    }
}
