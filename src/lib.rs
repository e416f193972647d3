//! polykey-map: a single-threaded map whose values are reachable through
//! several independently typed key spaces, with cascade removal of every
//! key when a value is erased.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: look a value up by any of N keys (at most one per key space)
//!   while guaranteeing that erasing the value erases all of its keys.
//! - Indirection: key -> surrogate id -> value.
//!   - Per key space: `HashMap<K, SurrogateId>` index.
//!   - Value store: `IndexMap<SurrogateId, V>`; its positions back the
//!     iterators and cursors.
//!   - Key-bundle store: `HashMap<SurrogateId, KeyBundle>`, recording for
//!     each value which key (if any) links to it in each space.
//!
//! Key spaces
//! - The list of key types is a tuple `(K0, K1, ...)` fixed at compile
//!   time (arity 1 through 6). Operations pick a space by position with a
//!   const generic: `map.insert::<0>(key, value)`. A position outside the
//!   tuple does not compile.
//! - Keys need `Eq + Hash + Clone`; each key is held by both its index and
//!   its bundle.
//!
//! Invariants (hold after every public call, including failed ones and
//! ones unwound by a panic in a predicate or a value's `Drop`)
//! - The value store and the bundle store hold the same surrogate ids.
//! - Every indexed key resolves to a bundle whose slot for that space holds
//!   exactly that key, and every bundle slot key is indexed.
//! - A key appears in at most one bundle per key space.
//! - Every live bundle has at least one key.
//! - `PolyKeyMap::validate` checks all of the above.
//!
//! Lifecycle
//! - `insert` creates a value with exactly one key; `link` adds keys;
//!   `erase`, `retain`, `CursorMut::remove_current` and `clear` remove
//!   values with all their keys.
//! - Surrogate ids are strictly increasing and never reused. Running out
//!   fails the insert with `Error::CapacityExceeded`.
//! - `Clone` deep-copies all stores and the id counter. `std::mem::take`
//!   moves the contents out and leaves an empty map with a fresh counter.
//!
//! Concurrency
//! - No internal synchronization. Shared use across threads needs an
//!   external lock; the borrow rules already forbid concurrent mutation.
//!
//! Notes and non-goals
//! - No ordering guarantees between values; erasing moves the last value
//!   into the erased position.
//! - No range queries, persistence or dynamic key-space lists.

mod error;
pub mod iter;
mod key_bundle;
mod key_space;
mod poly_key_map;
mod poly_key_map_proptest;
mod surrogate;

// Public surface
pub use error::{Error, Result, ValidationError};
pub use iter::{Cursor, CursorMut, Entry, EntryMut, Iter, IterMut};
pub use key_bundle::KeyBundle;
pub use key_space::{KeyOf, KeySpace, KeySpaces};
pub use poly_key_map::PolyKeyMap;
pub use surrogate::SurrogateId;
