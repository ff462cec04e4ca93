pub mod config;
pub mod event_log;
pub mod extract;
pub mod listing;
pub mod notify;
pub mod novelty;
pub mod run;
pub mod search;
pub mod source;

pub use listing::{Listing, Rejection};
pub use novelty::{Novelty, SeenSet};
pub use run::{Coordinator, RunOutcome};
