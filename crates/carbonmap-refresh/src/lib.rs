pub mod clock;
pub mod scheduler;
pub mod state;

pub use clock::{Clock, SystemClock};
pub use scheduler::{FeedHandle, RefreshConfig, RefreshScheduler};
pub use state::{CompletionOutcome, FetchTicket, RefreshMachine, RefreshPhase};
