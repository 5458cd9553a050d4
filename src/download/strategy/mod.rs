mod cooperative;
mod multiprocess;
mod threaded;

pub use cooperative::CooperativeScheduler;
pub use multiprocess::{run_worker, ProcessScheduler, WORKER_COMMAND};
pub use threaded::ThreadedScheduler;
