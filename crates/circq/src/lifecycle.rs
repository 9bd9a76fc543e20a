//! Construct and destroy elements over a logical, possibly wrapping range.
//!
//! A logical range `[cursor, cursor + n)` maps onto at most two contiguous
//! physical runs: `[wrap(cursor), size)` and `[0, rest)`. Operations that
//! cannot fail (`Copy` payloads, drops, relocation) work on those runs in
//! bulk. Operations that run user code (`Default`, `Clone`, closures,
//! iterators) construct one element at a time under a [`Partial`] guard:
//! if the k-th construction panics, the k elements already built in this
//! batch are dropped before the panic continues, and the caller's cursors
//! are never touched, so nothing is published.
//!
//! Every function here is `unsafe`: the caller owns the slots of the range
//! and knows their state (uninitialized for construction, initialized for
//! destruction).

use crate::storage::Storage;
use std::mem;
use std::ops::Range;
use std::ptr;
use std::slice;

/// Splits the logical range `[cursor, cursor + n)` into its physical runs.
///
/// The second run is empty unless the range wraps past the last slot.
#[inline]
pub(crate) fn split<S: Storage>(storage: &S, cursor: usize, n: usize) -> (Range<usize>, Range<usize>) {
    let size = storage.allocated_size();
    debug_assert!(n <= size, "range of {} exceeds storage of {}", n, size);
    let start = storage.wrap(cursor);
    let first = n.min(size - start);
    (start..start + first, 0..n - first)
}

/// Drops the first `built` elements of a batch on unwind.
struct Partial<'a, S: Storage> {
    storage: &'a S,
    cursor: usize,
    built: usize,
}

impl<S: Storage> Drop for Partial<'_, S> {
    fn drop(&mut self) {
        // SAFETY: exactly `built` slots from `cursor` were constructed by
        // this batch and have not been published.
        unsafe { destroy_n(self.storage, self.cursor, self.built) }
    }
}

/// Constructs up to `n` elements from `cursor`, taking values from `make`
/// until it returns `None`. Returns how many were constructed.
///
/// # Safety
///
/// The `n` slots from `cursor` must be uninitialized and owned by the caller.
pub(crate) unsafe fn construct_n<S, F>(storage: &S, cursor: usize, n: usize, mut make: F) -> usize
where
    S: Storage,
    F: FnMut() -> Option<S::Item>,
{
    let mut batch = Partial {
        storage,
        cursor,
        built: 0,
    };
    while batch.built < n {
        let Some(value) = make() else { break };
        storage.construct(storage.wrap(cursor.wrapping_add(batch.built)), value);
        batch.built += 1;
    }
    let built = batch.built;
    mem::forget(batch);
    built
}

/// Default-constructs `n` elements from `cursor`.
///
/// # Safety
///
/// See [`construct_n`].
pub(crate) unsafe fn default_n<S>(storage: &S, cursor: usize, n: usize)
where
    S: Storage,
    S::Item: Default,
{
    construct_n(storage, cursor, n, || Some(S::Item::default()));
}

/// Clones `value` into `n` slots from `cursor`.
///
/// # Safety
///
/// See [`construct_n`].
pub(crate) unsafe fn fill_n<S>(storage: &S, cursor: usize, n: usize, value: &S::Item)
where
    S: Storage,
    S::Item: Clone,
{
    construct_n(storage, cursor, n, || Some(value.clone()));
}

/// Clones every element of `src` into the slots from `cursor`.
///
/// # Safety
///
/// See [`construct_n`]; `src.len()` slots must be available.
pub(crate) unsafe fn clone_n<S>(storage: &S, cursor: usize, src: &[S::Item])
where
    S: Storage,
    S::Item: Clone,
{
    let mut values = src.iter();
    construct_n(storage, cursor, src.len(), || values.next().cloned());
}

/// Bitwise-copies `src` into the slots from `cursor`, at most two memcpys.
///
/// # Safety
///
/// `src.len()` uninitialized slots from `cursor` must be owned by the caller.
pub(crate) unsafe fn copy_n<S>(storage: &S, cursor: usize, src: &[S::Item])
where
    S: Storage,
    S::Item: Copy,
{
    copy_into(storage, cursor, src.as_ptr(), src.len());
}

/// Moves `n` live elements from `src` at `src_cursor` into `dst` at
/// `dst_cursor`. The source slots are left logically uninitialized.
///
/// # Safety
///
/// The source range must be initialized, the destination range
/// uninitialized, both owned by the caller, and the two must not overlap.
pub(crate) unsafe fn relocate_n<S, D>(src: &S, src_cursor: usize, dst: &D, dst_cursor: usize, n: usize)
where
    S: Storage,
    D: Storage<Item = S::Item>,
{
    let (a, b) = split(src, src_cursor, n);
    let a_len = a.len();
    copy_into(dst, dst_cursor, src.as_ptr().add(a.start), a_len);
    copy_into(dst, dst_cursor.wrapping_add(a_len), src.as_ptr().add(b.start), b.len());
}

unsafe fn copy_into<S: Storage>(dst: &S, cursor: usize, src: *const S::Item, n: usize) {
    let (a, b) = split(dst, cursor, n);
    let a_len = a.len();
    ptr::copy_nonoverlapping(src, dst.as_ptr().add(a.start), a_len);
    ptr::copy_nonoverlapping(src.add(a_len), dst.as_ptr().add(b.start), b.len());
}

/// Drops `n` elements from `cursor`, one `drop_in_place` per physical run.
///
/// # Safety
///
/// The `n` slots from `cursor` must be initialized and owned by the caller;
/// they are uninitialized afterwards.
pub(crate) unsafe fn destroy_n<S: Storage>(storage: &S, cursor: usize, n: usize) {
    if n == 0 || !mem::needs_drop::<S::Item>() {
        return;
    }
    let (a, b) = split(storage, cursor, n);
    let base = storage.as_ptr();
    ptr::drop_in_place(ptr::slice_from_raw_parts_mut(base.add(a.start), a.len()));
    ptr::drop_in_place(ptr::slice_from_raw_parts_mut(base.add(b.start), b.len()));
}

/// Borrows the `n` live elements from `cursor` as two slices.
///
/// # Safety
///
/// The range must be initialized and must stay so for `'a`.
pub(crate) unsafe fn as_slices<'a, S: Storage>(
    storage: &'a S,
    cursor: usize,
    n: usize,
) -> (&'a [S::Item], &'a [S::Item]) {
    let (a, b) = split(storage, cursor, n);
    let base = storage.as_ptr();
    (
        slice::from_raw_parts(base.add(a.start), a.len()),
        slice::from_raw_parts(base.add(b.start), b.len()),
    )
}

/// Mutable counterpart of [`as_slices`].
///
/// # Safety
///
/// As [`as_slices`], and no other reference to the range may exist for `'a`.
pub(crate) unsafe fn as_mut_slices<'a, S: Storage>(
    storage: &'a S,
    cursor: usize,
    n: usize,
) -> (&'a mut [S::Item], &'a mut [S::Item]) {
    let (a, b) = split(storage, cursor, n);
    let base = storage.as_ptr();
    (
        slice::from_raw_parts_mut(base.add(a.start), a.len()),
        slice::from_raw_parts_mut(base.add(b.start), b.len()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StaticStorage;
    use std::cell::Cell;
    use std::panic::{self, AssertUnwindSafe};
    use std::rc::Rc;

    struct Tracked {
        live: Rc<Cell<usize>>,
        value: u32,
    }

    impl Tracked {
        fn new(live: &Rc<Cell<usize>>, value: u32) -> Self {
            live.set(live.get() + 1);
            Self {
                live: Rc::clone(live),
                value,
            }
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.live.set(self.live.get() - 1);
        }
    }

    #[test]
    fn test_split_wraps() {
        let storage = StaticStorage::<u8, 8>::new();
        assert_eq!(split(&storage, 2, 3), (2..5, 0..0));
        assert_eq!(split(&storage, 6, 5), (6..8, 0..3));
        assert_eq!(split(&storage, 16, 8), (0..8, 0..0));
        assert_eq!(split(&storage, 7, 0), (7..7, 0..0));
    }

    #[test]
    fn test_copy_and_read_across_wrap() {
        let storage = StaticStorage::<u32, 8>::new();
        unsafe {
            copy_n(&storage, 6, &[1, 2, 3, 4]);
            let (a, b) = as_slices(&storage, 6, 4);
            assert_eq!(a, &[1, 2]);
            assert_eq!(b, &[3, 4]);
        }
    }

    #[test]
    fn test_relocate_between_storages() {
        let src = StaticStorage::<u32, 4>::new();
        let dst = StaticStorage::<u32, 8>::new();
        unsafe {
            copy_n(&src, 3, &[7, 8, 9]);
            relocate_n(&src, 3, &dst, 0, 3);
            let (a, b) = as_slices(&dst, 0, 3);
            assert_eq!(a, &[7, 8, 9]);
            assert!(b.is_empty());
        }
    }

    #[test]
    fn test_destroy_drops_both_runs() {
        let live = Rc::new(Cell::new(0));
        let storage = StaticStorage::<Tracked, 4>::new();
        unsafe {
            let mut next = 0;
            let built = construct_n(&storage, 2, 4, || {
                next += 1;
                Some(Tracked::new(&live, next))
            });
            assert_eq!(built, 4);
            assert_eq!(live.get(), 4);
            let (a, b) = as_slices(&storage, 2, 4);
            assert_eq!(a.iter().chain(b).map(|t| t.value).collect::<Vec<_>>(), [1, 2, 3, 4]);
            destroy_n(&storage, 2, 4);
        }
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn test_construct_stops_when_source_ends() {
        let storage = StaticStorage::<u8, 8>::new();
        let mut values = [1u8, 2].into_iter();
        let built = unsafe { construct_n(&storage, 0, 5, || values.next()) };
        assert_eq!(built, 2);
    }

    #[test]
    fn test_panic_rolls_back_batch() {
        let live = Rc::new(Cell::new(0));
        let storage = StaticStorage::<Tracked, 8>::new();
        let mut made = 0;
        let result = panic::catch_unwind(AssertUnwindSafe(|| unsafe {
            construct_n(&storage, 5, 6, || {
                if made == 3 {
                    panic!("third construction fails");
                }
                made += 1;
                Some(Tracked::new(&live, made))
            })
        }));
        assert!(result.is_err());
        assert_eq!(made, 3);
        assert_eq!(live.get(), 0, "partially built batch must be dropped");
    }

    #[test]
    fn test_default_and_fill() {
        let storage = StaticStorage::<String, 4>::new();
        unsafe {
            default_n(&storage, 3, 2);
            fill_n(&storage, 5, 2, &"x".to_string());
            let (a, b) = as_slices(&storage, 3, 4);
            assert_eq!(a, &[String::new()]);
            assert_eq!(b, &[String::new(), "x".to_string(), "x".to_string()]);
            destroy_n(&storage, 3, 4);
        }
    }

    #[test]
    fn test_clone_n_clones_slice() {
        let storage = StaticStorage::<Vec<u8>, 4>::new();
        let src = vec![vec![1], vec![2, 2]];
        unsafe {
            clone_n(&storage, 1, &src);
            let (a, _) = as_mut_slices(&storage, 1, 2);
            a[0].push(9);
            let (a, _) = as_slices(&storage, 1, 2);
            assert_eq!(a, &[vec![1, 9], vec![2, 2]]);
            destroy_n(&storage, 1, 2);
        }
        assert_eq!(src[0], vec![1]);
    }
}
