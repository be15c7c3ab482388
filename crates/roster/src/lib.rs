//! Account roster loading
//!
//! Loads the bot's input file: the list of disposable entertainer
//! credentials and the list of tracked user accounts whose nicknames are
//! watched. The file is the only persistence the bot has: it is read
//! once at startup and never written back.
//!
//! File format (JSON, pair-encoded for compatibility with the existing
//! data files):
//!
//! ```json
//! {
//!   "entertainers": [["mail@example.com", "password"], ...],
//!   "trackeds": [["user-id", "last-known-nickname-or-empty"], ...]
//! }
//! ```

mod store;

pub use store::{Entertainer, Roster, TrackedTarget};
