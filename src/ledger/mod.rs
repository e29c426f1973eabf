/// Fjall-based persistence layer for identities and download jobs
///
/// Durable storage for vidgrab's state, using Fjall (an embedded LSM
/// key-value store) to persist:
///
/// - User records plus a username uniqueness index
/// - Download job rows (status, file path/size, error message)
/// - An ownership index for per-user, newest-first job listings
/// - Metadata (pruning state)
///
/// ## Architecture
///
/// The ledger runs inside the API process. The submission handler inserts
/// `pending` rows; download workers own all subsequent transitions on their
/// job row. Listing endpoints may observe any intermediate state.
///
/// ## Retention
///
/// Terminal jobs older than `retention.job_ttl_days` (default 30) are
/// pruned together with their downloaded files; see
/// [`Ledger::prune_expired`]. The server triggers a prune at startup and
/// once a day thereafter.
///
/// ## Usage
///
/// ```rust,ignore
/// use vidgrab::ledger::Ledger;
///
/// let ledger = Ledger::open("data/ledger")?;
/// ledger.upsert_job(&job)?;
/// let job = ledger.get_job(&job_id)?;
/// ```

pub mod error;
pub mod partitions;
pub mod pruning;
pub mod store;

pub use error::{LedgerError, Result};
pub use pruning::PruneStats;
pub use store::{Ledger, RecoveredJobs, StoreStats};
