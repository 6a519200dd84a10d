//! # Traversal Callbacks
//!
//! `traverse` accepts three callback shapes:
//!
//! - `FnMut(Entity)`
//! - `FnMut(&mut T)`
//! - `FnMut(Entity, &mut T)`
//!
//! Each may return `()` (visit every row) or `bool` (`false` stops early).
//! The shape is resolved at compile time through a marker type, so closure
//! parameters must be annotated:
//!
//! ```rust
//! use tessera_core::{Entity, PackedComponentTable};
//!
//! let mut table = PackedComponentTable::<u32>::new();
//! table.add(1, 10);
//! table.add(2, 20);
//!
//! let mut visited = 0;
//! table.traverse(|_entity: Entity, value: &mut u32| {
//!     *value += 1;
//!     visited += 1;
//!     visited != 1
//! });
//! assert_eq!(visited, 1);
//! ```

use super::entity::Entity;

/// Return type of a traversal callback.
pub trait TraverseFlow {
    /// Returns `true` if traversal continues after this row.
    fn keep_going(self) -> bool;
}

impl TraverseFlow for () {
    #[inline]
    fn keep_going(self) -> bool {
        true
    }
}

impl TraverseFlow for bool {
    #[inline]
    fn keep_going(self) -> bool {
        self
    }
}

/// A callback usable by `traverse` over components of type `T`.
///
/// `Marker` only disambiguates the implementations; it is always inferred.
pub trait TraverseCallback<T, Marker> {
    /// Visits one row, returns `false` to stop traversal.
    fn visit(&mut self, entity: Entity, component: &mut T) -> bool;
}

impl<T, F, R> TraverseCallback<T, fn(Entity) -> R> for F
where
    F: FnMut(Entity) -> R,
    R: TraverseFlow,
{
    #[inline]
    fn visit(&mut self, entity: Entity, _component: &mut T) -> bool {
        (self)(entity).keep_going()
    }
}

impl<T, F, R> TraverseCallback<T, fn(&mut T) -> R> for F
where
    F: FnMut(&mut T) -> R,
    R: TraverseFlow,
{
    #[inline]
    fn visit(&mut self, _entity: Entity, component: &mut T) -> bool {
        (self)(component).keep_going()
    }
}

impl<T, F, R> TraverseCallback<T, fn(Entity, &mut T) -> R> for F
where
    F: FnMut(Entity, &mut T) -> R,
    R: TraverseFlow,
{
    #[inline]
    fn visit(&mut self, entity: Entity, component: &mut T) -> bool {
        (self)(entity, component).keep_going()
    }
}

/// Drives `callback` over `rows`, stopping when it asks to.
#[inline]
pub(crate) fn drive<'a, T, M, C, I>(rows: I, callback: &mut C)
where
    T: 'a,
    C: TraverseCallback<T, M>,
    I: Iterator<Item = (Entity, &'a mut T)>,
{
    for (entity, component) in rows {
        if !callback.visit(entity, component) {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run<M, C: TraverseCallback<i32, M>>(mut callback: C, rows: &mut [(Entity, i32)]) {
        drive(rows.iter_mut().map(|(e, c)| (*e, c)), &mut callback);
    }

    #[test]
    fn test_entity_only() {
        let mut rows = [(1, 10), (2, 20), (3, 30)];
        let mut seen = Vec::new();
        run(|entity: Entity| seen.push(entity), &mut rows);
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn test_component_only_mutates() {
        let mut rows = [(1, 10), (2, 20)];
        run(|value: &mut i32| *value *= 2, &mut rows);
        assert_eq!(rows, [(1, 20), (2, 40)]);
    }

    #[test]
    fn test_early_exit() {
        let mut rows = [(1, 10), (2, 20), (3, 30), (4, 40)];
        let mut count = 0;
        run(
            |_entity: Entity, _value: &mut i32| {
                count += 1;
                count != 2
            },
            &mut rows,
        );
        assert_eq!(count, 2);
    }
}
