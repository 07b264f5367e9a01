/// Contract service and job queue for the token generator
pub mod queue;
pub mod service;
pub mod store;

pub use queue::{Job, JobContext, JobHandler, JobPayload, JobQueue, JobState, JobStatus, CONTRACT_QUEUE};
pub use service::ContractService;
pub use store::{ContractAbi, ContractStore};
