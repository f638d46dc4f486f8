//! Open-addressing hash index over a column store.
//!
//! [`HashIndex`] keys every row by its first column and maps
//! `hash(key) % hash_capacity` to a row index through a probe-slot array
//! that shares one allocation with the column block. Duplicate keys are a
//! first-class feature: each occupies its own row and probe slot, and a
//! cursor-based [`find`](HashIndex::find) enumerates them in probe order.
//!
//! # Probe scheme
//!
//! The slot array modulus is `2 * capacity + 3`, always odd, which keeps the
//! load factor under one half. Probes start at `hash(key) % hash_capacity`
//! and advance by a fixed stride of 2; with an odd modulus the sequence
//! visits every slot exactly once, a lightweight substitute for double
//! hashing. Deleted slots become tombstones that probes skip but inserts
//! reuse. Every probe walk is capped at `hash_capacity` steps: a capped
//! lookup reports not-found, while a capped insert or repair walk reports
//! [`Error::IndexCorrupted`] instead of spinning.
//!
//! # Row relocation
//!
//! Erasing through the index swap-removes the row, so the previously-last
//! row moves into the freed position and the one slot referencing it must be
//! repaired (located by probing from the relocated row's key). Operations
//! that relocate rows in bulk (shift-based erase, ordered insert, sort, any
//! capacity change) rebuild the whole slot array with
//! [`rehash`](HashIndex::rehash) instead.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};

use rustc_hash::FxBuildHasher;

use crate::arena::{SLOT_EMPTY, SLOT_TOMBSTONE};
use crate::column_store::ColumnStore;
use crate::config::StrataConfig;
use crate::error::{Error, Result};
use crate::row::{CloneRow, ColumnAt, Key, KeyedRow, PodRow};

/// Diagnostic state of one probe slot, as reported by
/// [`HashIndex::probe_slots`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Never used since the last rehash; terminates probe walks.
    Empty,
    /// Held an erased row; probe walks continue past it.
    Tombstone,
    /// References the row at this index.
    Occupied(u32),
}

/// External probe cursor for [`HashIndex::find_with_cursor`], letting a
/// caller enumerate a key's rows without exclusive access to the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HashCursor {
    pos: Option<usize>,
}

impl HashCursor {
    /// Creates a cursor in the not-yet-probed state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// A hash index layered over a [`ColumnStore`], keyed by column 0.
///
/// `R` is the full row tuple (key first); `S` supplies the hash function
/// and defaults to [`FxBuildHasher`].
///
/// Rows are only ever moved through the store's own row operations, and
/// every relocation is mirrored by a slot repair or a full rehash, so each
/// occupied slot always leads back to a live row of its key's probe chain.
pub struct HashIndex<R: KeyedRow, S: BuildHasher = FxBuildHasher> {
    store: ColumnStore<R>,
    hasher: S,
    /// Slot visited by the most recent `find`, if still meaningful.
    cursor: Option<usize>,
    /// Row limit; never above [`Self::MAX_ROWS`].
    max_rows: usize,
}

impl<R: KeyedRow> HashIndex<R> {
    /// Creates an empty index with the default hasher. No memory is
    /// allocated until the first insertion or reserve.
    #[must_use]
    pub fn new() -> Self {
        Self::with_hasher(FxBuildHasher::default())
    }
}

impl<R: KeyedRow, S: BuildHasher> HashIndex<R, S> {
    /// Two slot values are reserved as sentinels, which bounds the row
    /// index space.
    pub const MAX_ROWS: usize = (u32::MAX - 2) as usize;

    /// Creates an empty index using `hasher` for key hashing.
    #[must_use]
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            store: ColumnStore::new_indexed(),
            hasher,
            cursor: None,
            max_rows: Self::MAX_ROWS,
        }
    }

    /// Creates an index pre-sized per `config.store.initial_rows` and
    /// row-limited per `config.limits.max_rows`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid, or
    /// [`Error::Allocation`] if the initial reserve fails.
    pub fn with_config(config: &StrataConfig) -> Result<Self>
    where
        S: Default,
        Key<R>: Hash,
    {
        config.validate()?;
        let mut index = Self::with_hasher(S::default());
        index.max_rows = config.limits.max_rows.min(Self::MAX_ROWS);
        if config.store.initial_rows > 0 {
            index.reserve(config.store.initial_rows)?;
        }
        Ok(index)
    }

    // --- size & capacity ----------------------------------------------------

    /// Number of live rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns true if the index holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Allocated row slots; always a multiple of 16 (or zero).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    /// Probe modulus: odd, just above twice the row capacity, so the load
    /// factor stays well under one half.
    #[must_use]
    pub fn hash_capacity(&self) -> usize {
        self.store.hash_capacity()
    }

    /// Maximum number of rows this index will accept.
    #[must_use]
    pub fn max_size(&self) -> usize {
        self.max_rows
    }

    /// Ensures capacity for at least `n` rows; a capacity change rebuilds
    /// the slot array and invalidates the find cursor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Allocation`] if the new block cannot be allocated;
    /// the index is unchanged in that case.
    pub fn reserve(&mut self, n: usize) -> Result<()>
    where
        Key<R>: Hash,
    {
        let before = self.store.capacity();
        self.store.reserve(n)?;
        if self.store.capacity() != before {
            self.rehash();
        }
        Ok(())
    }

    /// Shrinks to the smallest capacity holding all rows, rebuilding the
    /// slot array if the capacity changed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Allocation`] if the replacement block cannot be
    /// allocated.
    pub fn shrink_to_fit(&mut self) -> Result<()>
    where
        Key<R>: Hash,
    {
        let before = self.store.capacity();
        self.store.shrink_to_fit()?;
        if self.store.capacity() != before {
            self.rehash();
        }
        Ok(())
    }

    /// Erases every row and empties every probe slot. Capacity is
    /// unchanged.
    pub fn clear(&mut self) {
        self.store.clear();
        self.store.slots_mut().fill(SLOT_EMPTY);
        self.cursor = None;
    }

    // --- insertion ----------------------------------------------------------

    /// Inserts a row, keyed by its first column. Duplicate keys are always
    /// accepted and occupy separate rows and slots.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExhausted`] at the row limit,
    /// [`Error::Allocation`] if growth fails (index unchanged), or
    /// [`Error::IndexCorrupted`] if the probe walk finds no open slot,
    /// which cannot happen while the load-factor invariant holds.
    pub fn insert(&mut self, row: R) -> Result<()>
    where
        Key<R>: Hash,
    {
        if self.store.len() >= self.max_rows {
            return Err(Error::CapacityExhausted {
                max_rows: self.max_rows,
            });
        }
        if self.store.len() == self.store.capacity() {
            let want = self.store.capacity().saturating_mul(2);
            let before = self.store.capacity();
            self.store.reserve(want)?;
            if self.store.capacity() != before {
                self.rehash();
            }
        }
        let pos = self.open_slot(row.key())?;
        let idx = self.store.len() as u32;
        self.store.push(row)?;
        self.store.slots_mut()[pos] = idx;
        Ok(())
    }

    /// Inserts a row at its ordered position in column `K` (shifting later
    /// rows), then rebuilds the slot array. Useful when the rows must stay
    /// sorted for reasons other than key lookup.
    ///
    /// # Errors
    ///
    /// As [`insert`](Self::insert).
    pub fn insert_sorted<const K: usize>(&mut self, row: R) -> Result<()>
    where
        R: ColumnAt<K>,
        <R as ColumnAt<K>>::Elem: PartialOrd,
        Key<R>: Hash,
    {
        if self.store.len() >= self.max_rows {
            return Err(Error::CapacityExhausted {
                max_rows: self.max_rows,
            });
        }
        if self.store.len() == self.store.capacity() {
            let want = self.store.capacity().saturating_mul(2);
            self.store.reserve(want)?;
        }
        let at = self.store.lower_bound_row::<K>(&row);
        self.store.insert(at, row)?;
        self.rehash();
        Ok(())
    }

    /// First open (empty or tombstoned) slot on the key's probe chain.
    fn open_slot<Q: Hash + ?Sized>(&self, key: &Q) -> Result<usize> {
        let hcap = self.store.hash_capacity();
        let mut pos = self.probe_start(key);
        let slots = self.store.slots();
        for _ in 0..hcap {
            let s = slots[pos];
            if s == SLOT_EMPTY || s == SLOT_TOMBSTONE {
                return Ok(pos);
            }
            pos = (pos + 2) % hcap;
        }
        tracing::error!(
            rows = self.store.len(),
            hash_capacity = hcap,
            "insert probe walk found no open slot"
        );
        Err(Error::IndexCorrupted(
            "probe walk found no open slot".into(),
        ))
    }

    #[inline]
    fn probe_start<Q: Hash + ?Sized>(&self, key: &Q) -> usize {
        (self.hasher.hash_one(key) as usize) % self.store.hash_capacity()
    }

    // --- lookup -------------------------------------------------------------

    /// Finds a row with the given key; `None` is a normal outcome, not an
    /// error.
    ///
    /// With `restart = true` the probe starts fresh at the key's home slot;
    /// with `restart = false` it resumes one stride past the slot of the
    /// previous `find`, so repeated calls enumerate every row sharing the
    /// key, in probe order, until `None`:
    ///
    /// ```text
    /// let mut hit = index.find(&key, true);
    /// while let Some(row) = hit { ...; hit = index.find(&key, false); }
    /// ```
    ///
    /// Keys can be queried through any borrowed form (e.g. `&str` against
    /// `String` keys).
    pub fn find<Q>(&mut self, key: &Q, restart: bool) -> Option<usize>
    where
        Key<R>: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut cursor = HashCursor { pos: self.cursor };
        let found = self.find_with_cursor(key, restart, &mut cursor);
        self.cursor = cursor.pos;
        found
    }

    /// [`find`](Self::find) with caller-owned cursor state, usable through a
    /// shared reference.
    pub fn find_with_cursor<Q>(
        &self,
        key: &Q,
        restart: bool,
        cursor: &mut HashCursor,
    ) -> Option<usize>
    where
        Key<R>: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.store.is_empty() {
            return None;
        }
        let hcap = self.store.hash_capacity();
        let mut pos = if restart {
            self.probe_start(key)
        } else {
            match cursor.pos {
                Some(p) if p < hcap => (p + 2) % hcap,
                _ => {
                    cursor.pos = None;
                    return None;
                }
            }
        };
        let slots = self.store.slots();
        let keys = self.store.col::<0>();
        for _ in 0..hcap {
            let slot = slots[pos];
            if slot == SLOT_EMPTY {
                cursor.pos = Some(pos);
                return None;
            }
            if slot != SLOT_TOMBSTONE {
                let idx = slot as usize;
                debug_assert!(idx < keys.len(), "probe slot references dead row");
                if idx < keys.len() && keys[idx].borrow() == key {
                    cursor.pos = Some(pos);
                    return Some(idx);
                }
            }
            pos = (pos + 2) % hcap;
        }
        // Every slot was occupied or tombstoned; the key is absent.
        cursor.pos = None;
        None
    }

    /// Iterator over the indices of every row sharing `key`, in probe
    /// order. Uses its own cursor, so it does not disturb [`find`].
    pub fn matches<'a, Q>(&'a self, key: &'a Q) -> Matches<'a, R, S, Q>
    where
        Key<R>: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        Matches {
            index: self,
            key,
            cursor: HashCursor::new(),
            started: false,
        }
    }

    /// Number of rows whose key equals `key`.
    #[must_use]
    pub fn count<Q>(&self, key: &Q) -> usize
    where
        Key<R>: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.matches(key).count()
    }

    // --- erasure ------------------------------------------------------------

    /// Erases the row located by the most recent [`find`](Self::find).
    /// Returns the number of rows erased (0 or 1); 0 when the last find
    /// missed or the cursor is stale.
    ///
    /// The row is swap-removed, its slot becomes a tombstone, and the one
    /// slot referencing the relocated ex-last row is repaired in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexCorrupted`] if the repair walk cannot locate
    /// the relocated row's slot; this indicates a prior invariant breach
    /// and is not recoverable.
    pub fn erase_found(&mut self) -> Result<usize>
    where
        Key<R>: Hash,
    {
        let Some(pos) = self.cursor else {
            return Ok(0);
        };
        let hcap = self.store.hash_capacity();
        if pos >= hcap {
            return Ok(0);
        }
        let slot = self.store.slots()[pos];
        if slot == SLOT_EMPTY || slot == SLOT_TOMBSTONE {
            return Ok(0);
        }
        let idx = slot as usize;
        let len = self.store.len();
        if idx >= len {
            tracing::error!(slot = pos, row = idx, rows = len, "probe slot references dead row");
            return Err(Error::IndexCorrupted(format!(
                "slot {pos} references row {idx} beyond row count {len}"
            )));
        }
        self.store.erase_swap(idx);
        self.store.slots_mut()[pos] = SLOT_TOMBSTONE;
        let moved_from = self.store.len();
        if idx < moved_from {
            // The old last row now lives at idx; point its slot there.
            let repaired = self.locate_slot(idx, moved_from as u32)?;
            self.store.slots_mut()[repaired] = idx as u32;
        }
        Ok(1)
    }

    /// Finds and erases one row with the given key. Returns the number of
    /// rows erased (0 or 1).
    ///
    /// # Errors
    ///
    /// As [`erase_found`](Self::erase_found).
    pub fn erase<Q>(&mut self, key: &Q) -> Result<usize>
    where
        Key<R>: Borrow<Q> + Hash,
        Q: Hash + Eq + ?Sized,
    {
        self.find(key, true);
        self.erase_found()
    }

    /// Erases every row with the given key. Returns the number erased.
    ///
    /// # Errors
    ///
    /// As [`erase_found`](Self::erase_found).
    pub fn erase_all<Q>(&mut self, key: &Q) -> Result<usize>
    where
        Key<R>: Borrow<Q> + Hash,
        Q: Hash + Eq + ?Sized,
    {
        let mut erased = 0;
        let mut hit = self.find(key, true);
        while hit.is_some() {
            erased += self.erase_found()?;
            hit = self.find(key, false);
        }
        Ok(erased)
    }

    /// Erases the row located by the most recent [`find`](Self::find) with
    /// shift-based removal, preserving row order, then rebuilds the slot
    /// array (every slot referencing a row past the erased one went stale).
    /// Returns the number of rows erased (0 or 1).
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexCorrupted`] if the cursor's slot references a
    /// dead row.
    pub fn erase_found_sorted(&mut self) -> Result<usize>
    where
        Key<R>: Hash,
    {
        let Some(pos) = self.cursor else {
            return Ok(0);
        };
        let hcap = self.store.hash_capacity();
        if pos >= hcap {
            return Ok(0);
        }
        let slot = self.store.slots()[pos];
        if slot == SLOT_EMPTY || slot == SLOT_TOMBSTONE {
            return Ok(0);
        }
        let idx = slot as usize;
        let len = self.store.len();
        if idx >= len {
            tracing::error!(slot = pos, row = idx, rows = len, "probe slot references dead row");
            return Err(Error::IndexCorrupted(format!(
                "slot {pos} references row {idx} beyond row count {len}"
            )));
        }
        self.store.erase_shift(idx);
        self.rehash();
        Ok(1)
    }

    /// Finds and erases one row with the given key, preserving row order.
    /// Returns the number of rows erased (0 or 1).
    ///
    /// # Errors
    ///
    /// As [`erase_found_sorted`](Self::erase_found_sorted).
    pub fn erase_sorted<Q>(&mut self, key: &Q) -> Result<usize>
    where
        Key<R>: Borrow<Q> + Hash,
        Q: Hash + Eq + ?Sized,
    {
        self.find(key, true);
        self.erase_found_sorted()
    }

    // --- relocation & maintenance -------------------------------------------

    /// Exchanges two rows and repairs both affected probe slots.
    ///
    /// Both slots are located before either is rewritten: the two probe
    /// chains may overlap, and repairing one first could make the second
    /// walk find the freshly written slot instead of its own.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if either index is out of range, or
    /// [`Error::IndexCorrupted`] if a repair walk fails.
    pub fn swap_entries(&mut self, a: usize, b: usize) -> Result<()>
    where
        Key<R>: Hash,
    {
        let len = self.store.len();
        if a >= len {
            return Err(Error::OutOfBounds { index: a, len });
        }
        if b >= len {
            return Err(Error::OutOfBounds { index: b, len });
        }
        if a == b {
            return Ok(());
        }
        self.store.swap_entries(a, b);
        // The key now at b came from a, so its slot still holds a (and
        // symmetrically for the key now at a).
        let slot_of_a = self.locate_slot(b, a as u32)?;
        let slot_of_b = self.locate_slot(a, b as u32)?;
        let slots = self.store.slots_mut();
        slots[slot_of_a] = b as u32;
        slots[slot_of_b] = a as u32;
        self.cursor = None;
        Ok(())
    }

    /// Sorts rows by column `K` (delegating to the store's quicksort), then
    /// rebuilds the slot array, since every row may have moved. Returns the
    /// exact number of row swaps performed.
    pub fn sort<const K: usize>(&mut self) -> usize
    where
        R: ColumnAt<K>,
        <R as ColumnAt<K>>::Elem: PartialOrd,
        Key<R>: Hash,
    {
        let swaps = self.store.sort::<K>();
        self.rehash();
        swaps
    }

    /// Rebuilds every probe slot from the live rows: all slots become
    /// empty, then each row's key is walked to its first open slot. Also
    /// reclaims tombstones and resets the find cursor.
    pub fn rehash(&mut self)
    where
        Key<R>: Hash,
    {
        self.cursor = None;
        let hcap = self.store.hash_capacity();
        if hcap == 0 {
            return;
        }
        let hasher = &self.hasher;
        let (slots, keys) = self.store.slots_and_col::<0>();
        slots.fill(SLOT_EMPTY);
        for (i, key) in keys.iter().enumerate() {
            let mut pos = (hasher.hash_one(key) as usize) % hcap;
            let mut placed = false;
            for _ in 0..hcap {
                if slots[pos] == SLOT_EMPTY {
                    slots[pos] = i as u32;
                    placed = true;
                    break;
                }
                pos = (pos + 2) % hcap;
            }
            // Unreachable while hash_capacity > 2 * rows.
            debug_assert!(placed, "rehash found no open slot");
        }
        tracing::debug!(rows = self.store.len(), hash_capacity = hcap, "rehashed");
    }

    /// Walks the probe chain of the key at row `key_row` for the slot
    /// currently holding row index `holding`.
    fn locate_slot(&self, key_row: usize, holding: u32) -> Result<usize>
    where
        Key<R>: Hash,
    {
        let hcap = self.store.hash_capacity();
        let keys = self.store.col::<0>();
        let mut pos = self.probe_start(&keys[key_row]);
        let slots = self.store.slots();
        for _ in 0..hcap {
            let s = slots[pos];
            if s == holding {
                return Ok(pos);
            }
            if s == SLOT_EMPTY {
                break;
            }
            pos = (pos + 2) % hcap;
        }
        tracing::error!(row = key_row, holding, "slot repair walk failed");
        Err(Error::IndexCorrupted(format!(
            "no probe slot holds row index {holding}"
        )))
    }

    // --- column access ------------------------------------------------------

    /// Column `K` as a slice over the live rows. Mutable column access is
    /// deliberately absent: rewriting a key out of band would break the
    /// probe invariant.
    #[must_use]
    pub fn col<const K: usize>(&self) -> &[<R as ColumnAt<K>>::Elem]
    where
        R: ColumnAt<K>,
    {
        self.store.col::<K>()
    }

    /// Value of column `K` at row `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= len()`.
    #[must_use]
    pub fn at<const K: usize>(&self, i: usize) -> &<R as ColumnAt<K>>::Elem
    where
        R: ColumnAt<K>,
    {
        self.store.at::<K>(i)
    }

    /// First value of column `K`, or `None` if the index is empty.
    #[must_use]
    pub fn front<const K: usize>(&self) -> Option<&<R as ColumnAt<K>>::Elem>
    where
        R: ColumnAt<K>,
    {
        self.store.front::<K>()
    }

    /// Last value of column `K`, or `None` if the index is empty.
    #[must_use]
    pub fn back<const K: usize>(&self) -> Option<&<R as ColumnAt<K>>::Elem>
    where
        R: ColumnAt<K>,
    {
        self.store.back::<K>()
    }

    /// Binary search on a sorted column `K`; see
    /// [`ColumnStore::lower_bound`].
    #[must_use]
    pub fn lower_bound<const K: usize>(&self, goal: &<R as ColumnAt<K>>::Elem) -> usize
    where
        R: ColumnAt<K>,
        <R as ColumnAt<K>>::Elem: PartialOrd,
    {
        self.store.lower_bound::<K>(goal)
    }

    /// Binary search on a sorted column `K`; see
    /// [`ColumnStore::upper_bound`].
    #[must_use]
    pub fn upper_bound<const K: usize>(&self, goal: &<R as ColumnAt<K>>::Elem) -> usize
    where
        R: ColumnAt<K>,
        <R as ColumnAt<K>>::Elem: PartialOrd,
    {
        self.store.upper_bound::<K>(goal)
    }

    /// Diagnostic view of the probe slots, useful for inspecting clustering
    /// and tombstone buildup.
    pub fn probe_slots(&self) -> impl Iterator<Item = Slot> + '_ {
        let hcap = self.store.hash_capacity();
        self.store.slots()[..hcap].iter().map(|&s| match s {
            SLOT_EMPTY => Slot::Empty,
            SLOT_TOMBSTONE => Slot::Tombstone,
            v => Slot::Occupied(v),
        })
    }

    // --- bulk & serialization -----------------------------------------------

    /// Inserts every row from `iter`, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// As [`insert`](Self::insert); rows inserted before the failure remain.
    pub fn try_extend<I: IntoIterator<Item = R>>(&mut self, iter: I) -> Result<()>
    where
        Key<R>: Hash,
    {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        if lower > 0 {
            self.reserve(self.store.len().saturating_add(lower))?;
        }
        for row in iter {
            self.insert(row)?;
        }
        Ok(())
    }

    /// Fallible deep copy: clones the rows at the same capacity, then
    /// rebuilds the slot array.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Allocation`] if the new block cannot be allocated.
    pub fn try_clone(&self) -> Result<Self>
    where
        R: CloneRow,
        S: Clone,
        Key<R>: Hash,
    {
        let mut out = Self {
            store: ColumnStore::new_indexed(),
            hasher: self.hasher.clone(),
            cursor: None,
            max_rows: self.max_rows,
        };
        if self.store.capacity() > 0 {
            out.store.reserve(self.store.capacity())?;
        }
        for i in 0..self.store.len() {
            out.store.push(self.store.clone_row_at(i))?;
        }
        out.rehash();
        Ok(out)
    }

    /// Shrinks to fit, then exposes the raw backing block for persistence:
    /// the probe-slot array followed by the column sub-arrays, all from one
    /// allocation. The caller must persist `len()` separately and replay it
    /// into [`deserialize`](Self::deserialize). Valid only for
    /// same-process, same-layout round trips.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Allocation`] if the shrinking reallocation fails.
    pub fn serialize(&mut self) -> Result<&[u8]>
    where
        R: PodRow,
        Key<R>: Hash,
    {
        let before = self.store.capacity();
        self.store.shrink_to_fit()?;
        if self.store.capacity() != before {
            self.rehash();
        }
        Ok(self.store.finish_serialize())
    }

    /// Rebuilds the index for exactly `n` rows and hands back the raw block
    /// (slots plus columns) to be filled with bytes previously produced by
    /// [`serialize`](Self::serialize). Existing contents are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityExhausted`] if `n` exceeds the row limit,
    /// or [`Error::Allocation`] if the block cannot be allocated.
    pub fn deserialize(&mut self, n: usize) -> Result<&mut [u8]>
    where
        R: PodRow,
    {
        if n > self.max_rows {
            return Err(Error::CapacityExhausted {
                max_rows: self.max_rows,
            });
        }
        self.cursor = None;
        self.store.deserialize(n)
    }
}

/// Iterator over the row indices sharing one key; see
/// [`HashIndex::matches`].
pub struct Matches<'a, R: KeyedRow, S: BuildHasher, Q: ?Sized> {
    index: &'a HashIndex<R, S>,
    key: &'a Q,
    cursor: HashCursor,
    started: bool,
}

impl<R, S, Q> Iterator for Matches<'_, R, S, Q>
where
    R: KeyedRow,
    S: BuildHasher,
    Key<R>: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
{
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let restart = !self.started;
        self.started = true;
        self.index.find_with_cursor(self.key, restart, &mut self.cursor)
    }
}

impl<R: KeyedRow, S: BuildHasher + Default> Default for HashIndex<R, S> {
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<R, S> FromIterator<R> for HashIndex<R, S>
where
    R: KeyedRow,
    S: BuildHasher + Default,
    Key<R>: Hash,
{
    /// # Panics
    ///
    /// Panics if allocation fails; use [`HashIndex::try_extend`] for a
    /// fallible build.
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        let mut index = Self::with_hasher(S::default());
        index
            .try_extend(iter)
            .expect("allocation failed while collecting");
        index
    }
}

impl<R, S> Extend<R> for HashIndex<R, S>
where
    R: KeyedRow,
    S: BuildHasher,
    Key<R>: Hash,
{
    /// # Panics
    ///
    /// Panics if allocation fails; use [`HashIndex::try_extend`] for a
    /// fallible append.
    fn extend<I: IntoIterator<Item = R>>(&mut self, iter: I) {
        self.try_extend(iter)
            .expect("allocation failed while extending");
    }
}

impl<R, S> Clone for HashIndex<R, S>
where
    R: KeyedRow + CloneRow,
    S: BuildHasher + Clone,
    Key<R>: Hash,
{
    /// # Panics
    ///
    /// Panics if allocation fails; use [`HashIndex::try_clone`] for a
    /// fallible copy.
    fn clone(&self) -> Self {
        self.try_clone().expect("allocation failed while cloning")
    }
}

impl<R: KeyedRow, S: BuildHasher> fmt::Debug for HashIndex<R, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashIndex")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("hash_capacity", &self.hash_capacity())
            .finish()
    }
}
