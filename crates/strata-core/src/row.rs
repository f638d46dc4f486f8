//! Row schema machinery: compile-time column type lists.
//!
//! A row is an ordered tuple of column values. Rather than storing rows
//! contiguously, the containers in this crate give every column its own
//! sub-array inside one shared allocation, so a row only exists as "the
//! values at index `i` of every column". The traits here describe that
//! layout once, and a declarative macro implements them for tuples of
//! arity 1 through 8.
//!
//! # Layout
//!
//! For a block with `cap` row slots, column `k` starts at byte offset
//!
//! ```text
//! offset(k) = (size_of(col 0) + ... + size_of(col k-1)) * cap
//! ```
//!
//! from the column-block base. `cap` is always a multiple of 16 and column
//! alignments are capped at 16, so every sub-array base stays 16-byte
//! aligned no matter how the columns are ordered.

use std::mem;
use std::ptr;

use bytemuck::Pod;

/// Shorthand for the key type of a keyed row (its column 0 element).
pub type Key<R> = <R as ColumnAt<0>>::Elem;

/// Describes how one row spreads across parallel column sub-arrays.
///
/// Implemented for tuples `(C0,)` through `(C0, ..., C7)`. All methods
/// address a *column block*: a buffer laid out as described in the module
/// docs, with `cap` slots per column.
///
/// # Safety
///
/// Implementations must follow the documented offset rule exactly and must
/// touch exactly one value per column at the addressed slot. The containers
/// rely on this to size allocations and to hand out disjoint column slices.
pub unsafe trait Row: Sized {
    /// Number of columns in the row.
    const COLUMN_COUNT: usize;
    /// Total bytes of one row, summed across all columns.
    const SIZE_PER_ROW: usize;
    /// Largest column alignment; checked against the 16-byte block alignment.
    const MAX_COLUMN_ALIGN: usize;

    /// Moves `row` into slot `at`, one field per column.
    ///
    /// # Safety
    ///
    /// `at < cap`, and slot `at` must not contain live values.
    unsafe fn write_row(base: *mut u8, cap: usize, at: usize, row: Self);

    /// Moves the row out of slot `at`, leaving the slot dead.
    ///
    /// # Safety
    ///
    /// `at < cap`, and slot `at` must contain live values.
    unsafe fn read_row(base: *const u8, cap: usize, at: usize) -> Self;

    /// Drops the row values in slot `at` in place.
    ///
    /// # Safety
    ///
    /// `at < cap`, and slot `at` must contain live values.
    unsafe fn drop_row(base: *mut u8, cap: usize, at: usize);

    /// Exchanges the contents of slots `a` and `b` (which may be equal).
    ///
    /// # Safety
    ///
    /// `a < cap`, `b < cap`, and both slots must contain live values.
    unsafe fn swap_rows(base: *mut u8, cap: usize, a: usize, b: usize);

    /// Shifts rows `[at, len)` up one slot, opening a gap at `at`.
    ///
    /// # Safety
    ///
    /// `at <= len < cap`; slot `len` must be dead. The gap slot is dead
    /// afterwards.
    unsafe fn open_gap(base: *mut u8, cap: usize, at: usize, len: usize);

    /// Shifts rows `[at + 1, len)` down one slot, closing the gap at `at`.
    ///
    /// # Safety
    ///
    /// `at < len <= cap`; slot `at` must be dead. Slot `len - 1` is dead
    /// afterwards.
    unsafe fn close_gap(base: *mut u8, cap: usize, at: usize, len: usize);

    /// Copies `len` rows column-wise from one block layout into another.
    ///
    /// This is a bitwise move: the source slots are dead afterwards and
    /// must not be dropped.
    ///
    /// # Safety
    ///
    /// `len <= old_cap`, `len <= new_cap`, the blocks must not overlap, and
    /// the first `len` slots of the source must be live.
    unsafe fn migrate(old: *const u8, old_cap: usize, new: *mut u8, new_cap: usize, len: usize);

    /// Zero-fills rows `[from, to)` of every column.
    ///
    /// # Safety
    ///
    /// `from <= to <= cap`, and the affected slots must be dead. Only
    /// meaningful for [`PodRow`] types, where all-zero bytes form valid
    /// values.
    unsafe fn zero_rows(base: *mut u8, cap: usize, from: usize, to: usize);
}

/// Maps column index `K` of a row to its element type and byte offset.
///
/// # Safety
///
/// `offset` must agree with the layout rule documented on [`Row`], and
/// `of_row` must project the `K`th tuple field.
pub unsafe trait ColumnAt<const K: usize>: Row {
    /// Element type stored in column `K`.
    type Elem;

    /// Byte offset of column `K`'s sub-array for a block of `cap` slots.
    fn offset(cap: usize) -> usize;

    /// Borrows the `K`th field of a row value.
    fn of_row(row: &Self) -> &Self::Elem;
}

/// A row whose first column acts as the lookup key.
///
/// Blanket-implemented for every row with at least one column; the hash
/// index requires the key element to be `Hash + Eq` on its methods.
pub trait KeyedRow: Row + ColumnAt<0> {
    /// Borrows the key (column 0) of this row value.
    fn key(&self) -> &Key<Self> {
        <Self as ColumnAt<0>>::of_row(self)
    }
}

impl<R: Row + ColumnAt<0>> KeyedRow for R {}

/// A row that can be duplicated in place, column by column.
///
/// # Safety
///
/// `clone_row` must clone exactly the addressed slot and leave it live.
pub unsafe trait CloneRow: Row + Clone {
    /// Clones the row in slot `at`.
    ///
    /// # Safety
    ///
    /// `at < cap`, and slot `at` must contain live values.
    unsafe fn clone_row(base: *const u8, cap: usize, at: usize) -> Self;
}

/// Marker for rows whose every column element is plain-old-data.
///
/// Gates the raw-byte serialization surface: a `PodRow` column block can be
/// viewed and rebuilt as `&[u8]` without touching uninitialized or
/// pointer-bearing memory. Rows with heap-owning columns (e.g. `String`)
/// intentionally do not implement this.
///
/// # Safety
///
/// Every column element type must be [`Pod`].
pub unsafe trait PodRow: Row {}

macro_rules! impl_column_at {
    ( $idx:tt : $T:ident [ $($P:ident),* ] in [ $($A:ident),+ ] ) => {
        unsafe impl<$($A),+> ColumnAt<$idx> for ($($A,)+) {
            type Elem = $T;

            #[inline]
            fn offset(cap: usize) -> usize {
                (0usize $(+ mem::size_of::<$P>())*) * cap
            }

            #[inline]
            fn of_row(row: &Self) -> &Self::Elem {
                &row.$idx
            }
        }
    };
}

macro_rules! impl_row {
    ( $count:expr; [ $($All:ident),+ ] $( ($idx:tt : $T:ident [ $($P:ident),* ]) )+ ) => {
        unsafe impl<$($All),+> Row for ($($All,)+) {
            const COLUMN_COUNT: usize = $count;
            const SIZE_PER_ROW: usize = 0 $(+ mem::size_of::<$T>())+;
            const MAX_COLUMN_ALIGN: usize = {
                let mut max = 1;
                $( if mem::align_of::<$T>() > max { max = mem::align_of::<$T>(); } )+
                max
            };

            unsafe fn write_row(base: *mut u8, cap: usize, at: usize, row: Self) {
                $(
                    ptr::write(
                        base.add((0usize $(+ mem::size_of::<$P>())*) * cap).cast::<$T>().add(at),
                        row.$idx,
                    );
                )+
            }

            unsafe fn read_row(base: *const u8, cap: usize, at: usize) -> Self {
                (
                    $(
                        ptr::read(
                            base.add((0usize $(+ mem::size_of::<$P>())*) * cap).cast::<$T>().add(at),
                        ),
                    )+
                )
            }

            unsafe fn drop_row(base: *mut u8, cap: usize, at: usize) {
                $(
                    ptr::drop_in_place(
                        base.add((0usize $(+ mem::size_of::<$P>())*) * cap).cast::<$T>().add(at),
                    );
                )+
            }

            unsafe fn swap_rows(base: *mut u8, cap: usize, a: usize, b: usize) {
                $(
                    {
                        let col = base.add((0usize $(+ mem::size_of::<$P>())*) * cap).cast::<$T>();
                        ptr::swap(col.add(a), col.add(b));
                    }
                )+
            }

            unsafe fn open_gap(base: *mut u8, cap: usize, at: usize, len: usize) {
                $(
                    {
                        let col = base.add((0usize $(+ mem::size_of::<$P>())*) * cap).cast::<$T>();
                        ptr::copy(col.add(at), col.add(at + 1), len - at);
                    }
                )+
            }

            unsafe fn close_gap(base: *mut u8, cap: usize, at: usize, len: usize) {
                $(
                    {
                        let col = base.add((0usize $(+ mem::size_of::<$P>())*) * cap).cast::<$T>();
                        ptr::copy(col.add(at + 1), col.add(at), len - at - 1);
                    }
                )+
            }

            unsafe fn migrate(
                old: *const u8,
                old_cap: usize,
                new: *mut u8,
                new_cap: usize,
                len: usize,
            ) {
                $(
                    {
                        let src = old.add((0usize $(+ mem::size_of::<$P>())*) * old_cap).cast::<$T>();
                        let dst = new.add((0usize $(+ mem::size_of::<$P>())*) * new_cap).cast::<$T>();
                        ptr::copy_nonoverlapping(src, dst, len);
                    }
                )+
            }

            unsafe fn zero_rows(base: *mut u8, cap: usize, from: usize, to: usize) {
                $(
                    {
                        let col = base.add((0usize $(+ mem::size_of::<$P>())*) * cap).cast::<$T>();
                        ptr::write_bytes(col.add(from), 0, to - from);
                    }
                )+
            }
        }

        unsafe impl<$($All: Clone),+> CloneRow for ($($All,)+) {
            unsafe fn clone_row(base: *const u8, cap: usize, at: usize) -> Self {
                (
                    $(
                        (&*base.add((0usize $(+ mem::size_of::<$P>())*) * cap).cast::<$T>().add(at))
                            .clone(),
                    )+
                )
            }
        }

        unsafe impl<$($All: Pod),+> PodRow for ($($All,)+) {}
    };
}

impl_row! { 1; [C0]
    (0: C0 [])
}
impl_column_at! { 0: C0 [] in [C0] }

impl_row! { 2; [C0, C1]
    (0: C0 [])
    (1: C1 [C0])
}
impl_column_at! { 0: C0 [] in [C0, C1] }
impl_column_at! { 1: C1 [C0] in [C0, C1] }

impl_row! { 3; [C0, C1, C2]
    (0: C0 [])
    (1: C1 [C0])
    (2: C2 [C0, C1])
}
impl_column_at! { 0: C0 [] in [C0, C1, C2] }
impl_column_at! { 1: C1 [C0] in [C0, C1, C2] }
impl_column_at! { 2: C2 [C0, C1] in [C0, C1, C2] }

impl_row! { 4; [C0, C1, C2, C3]
    (0: C0 [])
    (1: C1 [C0])
    (2: C2 [C0, C1])
    (3: C3 [C0, C1, C2])
}
impl_column_at! { 0: C0 [] in [C0, C1, C2, C3] }
impl_column_at! { 1: C1 [C0] in [C0, C1, C2, C3] }
impl_column_at! { 2: C2 [C0, C1] in [C0, C1, C2, C3] }
impl_column_at! { 3: C3 [C0, C1, C2] in [C0, C1, C2, C3] }

impl_row! { 5; [C0, C1, C2, C3, C4]
    (0: C0 [])
    (1: C1 [C0])
    (2: C2 [C0, C1])
    (3: C3 [C0, C1, C2])
    (4: C4 [C0, C1, C2, C3])
}
impl_column_at! { 0: C0 [] in [C0, C1, C2, C3, C4] }
impl_column_at! { 1: C1 [C0] in [C0, C1, C2, C3, C4] }
impl_column_at! { 2: C2 [C0, C1] in [C0, C1, C2, C3, C4] }
impl_column_at! { 3: C3 [C0, C1, C2] in [C0, C1, C2, C3, C4] }
impl_column_at! { 4: C4 [C0, C1, C2, C3] in [C0, C1, C2, C3, C4] }

impl_row! { 6; [C0, C1, C2, C3, C4, C5]
    (0: C0 [])
    (1: C1 [C0])
    (2: C2 [C0, C1])
    (3: C3 [C0, C1, C2])
    (4: C4 [C0, C1, C2, C3])
    (5: C5 [C0, C1, C2, C3, C4])
}
impl_column_at! { 0: C0 [] in [C0, C1, C2, C3, C4, C5] }
impl_column_at! { 1: C1 [C0] in [C0, C1, C2, C3, C4, C5] }
impl_column_at! { 2: C2 [C0, C1] in [C0, C1, C2, C3, C4, C5] }
impl_column_at! { 3: C3 [C0, C1, C2] in [C0, C1, C2, C3, C4, C5] }
impl_column_at! { 4: C4 [C0, C1, C2, C3] in [C0, C1, C2, C3, C4, C5] }
impl_column_at! { 5: C5 [C0, C1, C2, C3, C4] in [C0, C1, C2, C3, C4, C5] }

impl_row! { 7; [C0, C1, C2, C3, C4, C5, C6]
    (0: C0 [])
    (1: C1 [C0])
    (2: C2 [C0, C1])
    (3: C3 [C0, C1, C2])
    (4: C4 [C0, C1, C2, C3])
    (5: C5 [C0, C1, C2, C3, C4])
    (6: C6 [C0, C1, C2, C3, C4, C5])
}
impl_column_at! { 0: C0 [] in [C0, C1, C2, C3, C4, C5, C6] }
impl_column_at! { 1: C1 [C0] in [C0, C1, C2, C3, C4, C5, C6] }
impl_column_at! { 2: C2 [C0, C1] in [C0, C1, C2, C3, C4, C5, C6] }
impl_column_at! { 3: C3 [C0, C1, C2] in [C0, C1, C2, C3, C4, C5, C6] }
impl_column_at! { 4: C4 [C0, C1, C2, C3] in [C0, C1, C2, C3, C4, C5, C6] }
impl_column_at! { 5: C5 [C0, C1, C2, C3, C4] in [C0, C1, C2, C3, C4, C5, C6] }
impl_column_at! { 6: C6 [C0, C1, C2, C3, C4, C5] in [C0, C1, C2, C3, C4, C5, C6] }

impl_row! { 8; [C0, C1, C2, C3, C4, C5, C6, C7]
    (0: C0 [])
    (1: C1 [C0])
    (2: C2 [C0, C1])
    (3: C3 [C0, C1, C2])
    (4: C4 [C0, C1, C2, C3])
    (5: C5 [C0, C1, C2, C3, C4])
    (6: C6 [C0, C1, C2, C3, C4, C5])
    (7: C7 [C0, C1, C2, C3, C4, C5, C6])
}
impl_column_at! { 0: C0 [] in [C0, C1, C2, C3, C4, C5, C6, C7] }
impl_column_at! { 1: C1 [C0] in [C0, C1, C2, C3, C4, C5, C6, C7] }
impl_column_at! { 2: C2 [C0, C1] in [C0, C1, C2, C3, C4, C5, C6, C7] }
impl_column_at! { 3: C3 [C0, C1, C2] in [C0, C1, C2, C3, C4, C5, C6, C7] }
impl_column_at! { 4: C4 [C0, C1, C2, C3] in [C0, C1, C2, C3, C4, C5, C6, C7] }
impl_column_at! { 5: C5 [C0, C1, C2, C3, C4] in [C0, C1, C2, C3, C4, C5, C6, C7] }
impl_column_at! { 6: C6 [C0, C1, C2, C3, C4, C5] in [C0, C1, C2, C3, C4, C5, C6, C7] }
impl_column_at! { 7: C7 [C0, C1, C2, C3, C4, C5, C6] in [C0, C1, C2, C3, C4, C5, C6, C7] }
