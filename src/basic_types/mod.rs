mod constraint_operation_error;
pub(crate) mod moving_averages;
mod stopwatch;
mod trail;

pub use constraint_operation_error::ConstraintOperationError;
pub(crate) use stopwatch::Stopwatch;
pub(crate) use trail::Trail;
