pub mod dedupe;
pub mod error;
pub mod extract;
pub mod load_more;
pub mod pipeline;
pub mod rate_limit;
pub mod reconcile;
pub mod session;
pub mod sink;

pub use dedupe::dedupe_listings;
pub use error::{ScraperError, SessionError, SinkError};
pub use extract::{extract_detail, extract_listings, DetailOptions, Extraction, PartialRecord};
pub use load_more::{run_load_more, LoadMoreSettings, LoadState, StopReason};
pub use pipeline::{collect_listings, reextract, run_details, run_listings, RunSettings, RunSummary};
pub use rate_limit::{load_with_retry, Cooldown, RetryPolicy};
pub use reconcile::reconcile;
pub use session::{ClickTarget, HttpSession, PageSession, PageSnapshot};
pub use sink::{JsonFileSink, RecordSink};
