use thiserror::Error;

/// Errors related to adding constraints to the solver.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOperationError {
    /// The added clause makes the formula infeasible at the root level.
    #[error("Adding the clause failed because it is infeasible at the root")]
    InfeasibleClause,
}
