//! Candidate elimination for a city-guessing game.
//!
//! The pieces compose as a pipeline over plain values:
//! recap text → [`recap::parse_recap`] → [`ConstraintState`] →
//! [`eliminate::evaluate`] → surviving cities. Sessions round-trip through
//! [`codec::PersistedState`] and a [`StateStore`].
//!
//! Nothing here holds global state; every function takes its inputs by
//! reference and returns new values.

pub mod catalog;
pub mod codec;
pub mod eliminate;
pub mod recap;
pub mod resolver;
pub mod source;
pub mod state;
pub mod store;

pub use catalog::CatalogIndex;
pub use codec::{decode, encode, PersistedState};
pub use eliminate::{evaluate, evaluate_with_stats, EliminationStats, RejectReason, Verdict};
pub use recap::{parse_recap, Clue, ClueError, Diagnostic};
pub use resolver::{resolve, ResolveError};
pub use source::{CatalogQuery, CatalogSource, JsonDirCatalog};
pub use state::{ConstraintState, DistanceBrackets, GuessRing, Mutation};
pub use store::{MemoryStateStore, StateStore, StoreError, StoredState};
