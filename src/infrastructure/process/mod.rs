//! Child process management: mock supervision and test execution.

mod capture;
mod runner;
mod supervisor;

pub use capture::OutputCapture;
pub use runner::TestRunner;
pub use supervisor::{ProcessLogs, ProcessSupervisor, StartFailure, SupervisedProcess};
