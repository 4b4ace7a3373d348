//! 감시 파이프라인 모듈.

pub mod poller;
pub mod report;
pub mod scheduler;
pub mod store;

pub use poller::{build_poller, PollOutcome, PollerSettings, RebalancingPoller};
pub use report::RebalancingReport;
pub use scheduler::Scheduler;
pub use store::ProcessedEventStore;
