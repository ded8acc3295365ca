pub mod corrective;
pub mod router;

pub use corrective::{CorrectiveRagWorkflow, CorrectiveResult};
pub use router::RouterWorkflow;
