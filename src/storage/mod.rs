//!  Storage is organized through [tracker_storage::TrackerStorage].
//!  The basic idea is:
//!   - There is a string keyed store ([key_value::KeyValueStore]), on disk one file per key.
//!   - Activities, sessions and the dashboard selection are JSON arrays under their own key.
//!   - Every change rewrites the whole collection, there is no partial update.

pub mod entities;
pub mod key_value;
pub mod selection;
pub mod tracker_storage;
