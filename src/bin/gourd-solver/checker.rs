use std::num::NonZeroI32;

use gourd_solver::engine::variables::PropositionalVariable;
use gourd_solver::engine::SatisfactionSolver;

use crate::parsers::dimacs::parse_cnf;
use crate::parsers::dimacs::DimacsSink;
use crate::result::GourdError;
use crate::result::GourdResult;

/// Verifies that the assignment reported by the solver satisfies every clause of the instance by
/// re-reading the instance from scratch; used for self-testing through the `--verify` flag.
pub(crate) fn verify_cnf_solution(
    source: impl std::io::Read,
    solver: &SatisfactionSolver,
) -> GourdResult<()> {
    let clauses = parse_cnf::<Vec<Vec<NonZeroI32>>>(source, ())?;

    let clause_is_satisfied = |clause: &[NonZeroI32]| {
        clause.iter().any(|&dimacs_code| {
            let variable = PropositionalVariable::new(dimacs_code.unsigned_abs().get());
            solver.get_truth_value(variable) == dimacs_code.get().is_positive()
        })
    };

    if clauses.iter().all(|clause| clause_is_satisfied(clause)) {
        Ok(())
    } else {
        Err(GourdError::InconsistentSolution)
    }
}

impl DimacsSink for Vec<Vec<NonZeroI32>> {
    type ConstructorArgs = ();

    type Formula = Vec<Vec<NonZeroI32>>;

    fn empty(_: Self::ConstructorArgs, _: usize) -> Self {
        vec![]
    }

    fn add_clause(&mut self, clause: &[NonZeroI32]) {
        self.push(clause.to_vec());
    }

    fn into_formula(self) -> Self::Formula {
        self
    }
}
