use crate::basic_types::moving_averages::CumulativeMovingAverage;
use crate::create_statistics_struct;

create_statistics_struct!(
    /// Counters for the solving process of the [`SatisfactionSolver`](crate::engine::SatisfactionSolver).
    SolverStatistics {
        /// The number of conflicts encountered by the solver
        num_conflicts: u64,
        /// The number of decisions taken by the solver
        num_decisions: u64,
        /// The number of times the solver has restarted
        num_restarts: u64,
        /// The number of restarts that kept a prefix of the trail
        num_reused_trails: u64,
        /// The number of learned clauses which have a size of 1
        num_unit_clauses_learned: u64,
        /// The average length of the learned clauses
        average_learned_clause_length: CumulativeMovingAverage,
        /// The average number of levels which have been backtracked per conflict
        average_backjump_amount: CumulativeMovingAverage,
    }
);
