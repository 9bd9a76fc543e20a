//! Property-based tests against a `VecDeque` model.
//!
//! Random operation sequences are applied to a queue and to a model; after
//! every step the queue must hold exactly the model's elements, in order,
//! and never more than `max_size()` of them.
//!
//! Coverage:
//! - StaticQueue<T, N> (inline storage)
//! - DynamicQueue<T> (heap storage, including resize)

use circq_rs::prelude::*;
use circq_rs::{DynamicQueue, StaticQueue};
use proptest::prelude::*;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
enum Op {
    Push(u16),
    Extend(Vec<u16>),
    ExtendWith(usize, u16),
    Pop,
    PopN(usize),
    Fill(u16),
    Clear,
    Resize(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => any::<u16>().prop_map(Op::Push),
        2 => prop::collection::vec(any::<u16>(), 0..12).prop_map(Op::Extend),
        1 => (0usize..10, any::<u16>()).prop_map(|(n, v)| Op::ExtendWith(n, v)),
        4 => Just(Op::Pop),
        2 => (0usize..10).prop_map(Op::PopN),
        1 => any::<u16>().prop_map(Op::Fill),
        1 => Just(Op::Clear),
        1 => (0usize..40).prop_map(Op::Resize),
    ]
}

/// Applies `op` to the queue and the model. Only the dynamic backend can
/// resize; `resize` returns `None` for the static one.
fn apply<Q>(
    q: &mut Q,
    model: &mut VecDeque<u16>,
    op: &Op,
    resize: impl FnOnce(&mut Q, usize) -> Option<bool>,
)
where
    Q: Produce<Item = u16> + Consume<Item = u16>,
{
    let max = Produce::max_size(q);
    match op {
        Op::Push(v) => {
            let ok = q.try_push(*v).is_ok();
            assert_eq!(ok, model.len() < max);
            if ok {
                model.push_back(*v);
            }
        }
        Op::Extend(values) => {
            let ok = q.try_extend_from_slice(values);
            assert_eq!(ok, model.len() + values.len() <= max);
            if ok {
                model.extend(values.iter().copied());
            }
        }
        Op::ExtendWith(n, v) => {
            if q.try_extend_with(*n, v) {
                model.extend(std::iter::repeat(*v).take(*n));
            } else {
                assert!(model.len() + n > max);
            }
        }
        Op::Pop => assert_eq!(q.pop(), model.pop_front()),
        Op::PopN(n) => {
            let n = (*n).min(model.len());
            q.pop_front_n(n);
            model.drain(..n).for_each(drop);
        }
        Op::Fill(v) => {
            let n = q.fill(v);
            assert_eq!(n, max - model.len());
            model.extend(std::iter::repeat(*v).take(n));
        }
        Op::Clear => {
            q.clear();
            model.clear();
        }
        Op::Resize(slots) => {
            if let Some(ok) = resize(q, *slots) {
                let usable = (*slots).max(2).next_power_of_two() - 1;
                assert_eq!(ok, usable >= model.len());
            }
        }
    }
}

fn check<Q>(q: &Q, model: &VecDeque<u16>)
where
    Q: Produce<Item = u16> + Consume<Item = u16>,
{
    assert_eq!(q.size_for_read(), model.len());
    assert_eq!(q.size_for_write(), model.len());
    assert!(q.size_for_read() <= Consume::max_size(q));
    assert!(q.iter().eq(model.iter()));
    assert!(q.iter().rev().eq(model.iter().rev()));
    assert_eq!(q.front(), model.front());
    assert_eq!(q.back(), model.back());
    let (a, b) = q.as_slices();
    assert_eq!(a.len() + b.len(), model.len());
    assert!(a.iter().chain(b).eq(model.iter()));
}

proptest! {
    /// Static queue behaves like a bounded VecDeque.
    #[test]
    fn prop_static_matches_model(ops in prop::collection::vec(op_strategy(), 0..200)) {
        let mut q = StaticQueue::<u16, 16>::new();
        let mut model = VecDeque::new();
        for op in &ops {
            apply(&mut q, &mut model, op, |_, _| None);
            check(&q, &model);
        }
    }

    /// Dynamic queue behaves like a bounded VecDeque across resizes.
    #[test]
    fn prop_dynamic_matches_model(ops in prop::collection::vec(op_strategy(), 0..200)) {
        let mut q = DynamicQueue::<u16>::with_capacity(8);
        let mut model = VecDeque::new();
        for op in &ops {
            apply(&mut q, &mut model, op, |q, slots| Some(q.resize(slots).is_ok()));
            check(&q, &model);
        }
    }

    /// Cursor distance equals index difference, across any wrap offset.
    #[test]
    fn prop_cursor_arithmetic(offset in 0usize..64, len in 0usize..16, i in 0usize..16, j in 0usize..16) {
        let mut q = StaticQueue::<u8, 16>::new();
        for _ in 0..offset {
            q.push(0).unwrap();
            q.pop_front();
        }
        q.extend_default(len.min(15)).unwrap();
        let len = q.len();
        let (i, j) = (i.min(len), j.min(len));
        let a = q.begin() + i as isize;
        let b = q.begin() + j as isize;
        prop_assert_eq!(b - a, j as isize - i as isize);
        prop_assert_eq!(a.index(), i);
        prop_assert_eq!(a < b, i < j);
        prop_assert_eq!(a == b, i == j);
        prop_assert_eq!(a.get().is_some(), i < len);
    }
}
