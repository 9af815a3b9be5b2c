//! Utility functions and types used accross the library
use crate::{EPSILON, Scalar};
use std::{fmt, iter::FromIterator};

/// Parameter values closer than this to `0.0` or `1.0` are not treated as curve extrema
pub const PARAM_EPSILON: Scalar = 1e-6;

/// Abstraction over slices used by `ArrayIter`
pub trait Array {
    type Item;
    fn new() -> Self;
    fn at(&self, index: usize) -> Option<&Self::Item>;
    fn take(&mut self, index: usize) -> Option<Self::Item>;
    fn put(&mut self, index: usize, value: Self::Item) -> Option<Self::Item>;
}

macro_rules! impl_array(
    ($($size:expr),+) => {
        $(
            impl<T: Copy> Array for [Option<T>; $size] {
                type Item = T;
                fn new() -> Self {
                    [None; $size]
                }
                fn at(&self, index: usize) -> Option<&Self::Item> {
                    self.get(index).and_then(|item| item.as_ref())
                }
                fn take(&mut self, index: usize) -> Option<Self::Item> {
                    self[index].take()
                }
                fn put(&mut self, index: usize, value: Self::Item) -> Option<Self::Item> {
                    self[index].replace(value)
                }
            }
        )+
    }
);

impl_array!(1, 2, 3, 4);

/// Fixed sized iterator
///
/// This type is similar to a smallvec but it never allocates and just panics
/// if you try to fit more data than its size.
#[derive(Clone, Copy)]
pub struct ArrayIter<A> {
    start: usize,
    end: usize,
    array: A,
}

impl<A> fmt::Debug for ArrayIter<A>
where
    A: Array,
    A::Item: fmt::Debug,
{
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = fmt.debug_list();
        for index in self.start..self.end {
            if let Some(item) = self.array.at(index) {
                list.entry(item);
            }
        }
        list.finish()
    }
}

impl<A: Array> Default for ArrayIter<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Array> ArrayIter<A> {
    pub fn new() -> Self {
        Self {
            start: 0,
            end: 0,
            array: A::new(),
        }
    }

    /// Push new element to the end of the iterator
    pub fn push(&mut self, item: A::Item) {
        self.array.put(self.end, item);
        self.end += 1;
    }

    /// Check if array iterator is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of uncosumed elements
    pub fn len(&self) -> usize {
        self.end - self.start
    }
}

impl<A: Array> Extend<A::Item> for ArrayIter<A> {
    fn extend<T: IntoIterator<Item = A::Item>>(&mut self, iter: T) {
        for item in iter.into_iter() {
            self.push(item);
        }
    }
}

impl<A> FromIterator<A::Item> for ArrayIter<A>
where
    A: Array,
    A::Item: Copy,
{
    fn from_iter<T: IntoIterator<Item = A::Item>>(iter: T) -> Self {
        let mut array = ArrayIter::<A>::new();
        for item in iter.into_iter() {
            array.push(item);
        }
        array
    }
}

impl<A: Array> Iterator for ArrayIter<A> {
    type Item = A::Item;

    fn next(&mut self) -> Option<Self::Item> {
        if self.start < self.end {
            let item = self.array.take(self.start);
            self.start += 1;
            item
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let size = self.end - self.start;
        (size, Some(size))
    }
}

impl<A: Array> DoubleEndedIterator for ArrayIter<A> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.start < self.end {
            self.end -= 1;
            self.array.take(self.end)
        } else {
            None
        }
    }
}

pub type Roots = ArrayIter<[Option<Scalar>; 2]>;

/// Solve quadratic equation `a * t ^ 2 + b * t + c = 0` for `t`
///
/// Roots are returned in ascending order.
pub fn quadratic_solve(a: Scalar, b: Scalar, c: Scalar) -> Roots {
    let mut result = Roots::new();
    if a.abs() < EPSILON {
        if b.abs() > EPSILON {
            result.push(-c / b);
        }
        return result;
    }
    let delta = b * b - 4.0 * a * c;
    if delta < 0.0 {
        return result;
    }
    if delta == 0.0 {
        result.push(-b / (2.0 * a));
        return result;
    }
    // q = -0.5 * (b + sign(b) * sqrt(delta)) avoids cancellation between `b` and `sqrt(delta)`
    // https://people.csail.mit.edu/bkph/articles/Quadratics.pdf
    let sq = delta.sqrt();
    let q = if b < 0.0 { -0.5 * (b - sq) } else { -0.5 * (b + sq) };
    let r0 = q / a;
    let r1 = if q == 0.0 { r0 } else { c / q };
    if r0 <= r1 {
        result.push(r0);
        result.push(r1);
    } else {
        result.push(r1);
        result.push(r0);
    }
    result
}

/// Roots of `a * t ^ 2 + b * t + c = 0` strictly inside `(0, 1)`, ascending and deduplicated
pub fn unit_roots(a: Scalar, b: Scalar, c: Scalar) -> Roots {
    let mut result = Roots::new();
    let mut last = None;
    for root in quadratic_solve(a, b, c) {
        if root <= PARAM_EPSILON || root >= 1.0 - PARAM_EPSILON {
            continue;
        }
        if matches!(last, Some(prev) if root - prev <= PARAM_EPSILON) {
            continue;
        }
        last = Some(root);
        result.push(root);
    }
    result
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[macro_export]
    macro_rules! assert_approx_eq {
        ( $v0:expr, $v1: expr ) => {{
            assert!(($v0 - $v1).abs() < $crate::EPSILON, "{} != {}", $v0, $v1);
        }};
        ( $v0:expr, $v1: expr, $e: expr ) => {{
            assert!(($v0 - $v1).abs() < $e, "{} != {}", $v0, $v1);
        }};
    }

    /// Install tracing subscriber controlled by `RUST_LOG`, ignoring repeated installs
    pub(crate) fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    #[test]
    fn test_solve() {
        fn solve_check(a: Scalar, b: Scalar, c: Scalar, roots: &[Scalar]) {
            const PREC: Scalar = 0.00001;
            let result: Vec<_> = quadratic_solve(a, b, c).collect();
            assert_eq!(result.len(), roots.len(), "{:?} != {:?}", result, roots);
            for (root, root_ref) in result.iter().zip(roots) {
                let value = a * root * root + b * root + c;
                assert!(value.abs() < PREC, "f(x = {}) = {} != 0", root, value);
                assert_approx_eq!(root, root_ref, PREC);
            }
        }

        solve_check(1.0, -5.0, 6.0, &[2.0, 3.0]);
        solve_check(-1.0, 5.0, -6.0, &[2.0, 3.0]);
        solve_check(1.0, -6.0, 9.0, &[3.0]);
        solve_check(1.0, 3.0, 5.0, &[]);
        solve_check(0.0, 5.0, 10.0, &[-2.0]);
        solve_check(0.0, 0.0, 10.0, &[]);
        // large `b` would lose precision with the textbook formula
        solve_check(1.0, 1e4, 1.0, &[-9999.9999, -0.0001]);
    }

    #[test]
    fn test_unit_roots() {
        let roots: Vec<_> = unit_roots(1.0, -1.0, 0.1875).collect();
        assert_eq!(roots.len(), 2);
        assert_approx_eq!(roots[0], 0.25, 1e-9);
        assert_approx_eq!(roots[1], 0.75, 1e-9);
        // roots at exactly 0 and 1 are rejected
        assert!(unit_roots(1.0, -1.0, 0.0).next().is_none());
        // single root outside of the unit interval
        assert!(unit_roots(0.0, 1.0, -2.0).next().is_none());
    }

    #[test]
    fn test_array_iter() {
        let mut iter: ArrayIter<[Option<u32>; 4]> = (0..4).collect();
        assert_eq!(iter.len(), 4);
        assert!(!iter.is_empty());
        assert_eq!(iter.next(), Some(0));
        assert_eq!(iter.next_back(), Some(3));
        assert_eq!(iter.next(), Some(1));
        assert_eq!(iter.len(), 1);
        assert_eq!(iter.next_back(), Some(2));
        assert!(iter.is_empty());
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next_back(), None);
    }
}
