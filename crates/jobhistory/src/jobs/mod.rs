pub mod history;
pub mod logs;
pub mod memory;
pub mod model;
pub mod projector;
pub mod repo;
pub mod scope;
pub mod views;

pub use history::{HistoryService, QueryContext};
pub use logs::{FsLogTailReader, LogTailReader, DEFAULT_LOG_TAIL_LINES};
pub use memory::MemoryJobStore;
pub use model::{Attempt, AttemptStatus, ConfigType, Job, JobId, JobOutput, JobStatus};
pub use repo::{JobPersistence, JobsRepo};
pub use scope::JobScope;
