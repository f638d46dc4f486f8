//! # Strata Core
//!
//! A struct-of-arrays record store with an open-addressing hash index on
//! top.
//!
//! [`ColumnStore`] keeps many heterogeneous-but-fixed-shape rows (e.g.
//! `(i32, String, i16, f64)`) so that each field occupies its own
//! contiguous array inside a single 16-byte-aligned allocation, improving
//! cache locality for column-wise scans while still supporting row-level
//! insert, erase, binary search, sorting and raw serialization.
//! [`HashIndex`] layers a probe-slot array over the same allocation for
//! keyed access, with duplicate keys, tombstoned deletion and multi-value
//! cursor iteration.
//!
//! ## Quick Start
//!
//! ```rust
//! use strata_core::HashIndex;
//!
//! let mut inventory: HashIndex<(String, i32)> = HashIndex::new();
//! inventory.insert(("banana".to_string(), 12))?;
//! inventory.insert(("banana".to_string(), 42))?;
//!
//! // Enumerate duplicates in probe order.
//! let mut hit = inventory.find("banana", true);
//! while let Some(row) = hit {
//!     println!("banana -> {}", inventory.at::<1>(row));
//!     hit = inventory.find("banana", false);
//! }
//! assert_eq!(inventory.count("banana"), 2);
//! # Ok::<(), strata_core::Error>(())
//! ```
//!
//! ## Caveats
//!
//! Containers are single-threaded values: they are `Send`/`Sync` when the
//! row types are, and exclusive access is whatever `&mut` already enforces.
//! Row indices returned by lookups are invalidated by any operation that
//! changes the row count or reorders rows.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)] // row indices are bounded below u32::MAX - 2
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::if_not_else)]
#![allow(clippy::missing_const_for_fn)]

mod arena;
pub mod column_store;
#[cfg(test)]
mod column_store_tests;
pub mod config;
pub mod error;
#[cfg(test)]
mod error_tests;
pub mod hash_index;
pub mod row;

pub use column_store::ColumnStore;
pub use config::{ConfigError, LimitsConfig, StoreConfig, StrataConfig};
pub use error::{Error, Result};
pub use hash_index::{HashCursor, HashIndex, Matches, Slot};
pub use row::{CloneRow, ColumnAt, Key, KeyedRow, PodRow, Row};
