use log::debug;

use crate::basic_types::moving_averages::ExponentialMovingAverage;
use crate::basic_types::moving_averages::MovingAverage;
use crate::engine::sat::assignments_propositional::AssignmentsPropositional;
use crate::engine::sat::clause_allocator::ClauseAllocator;
use crate::engine::sat::clause_allocator::ClauseReference;
use crate::engine::variables::Literal;
use crate::engine::SolverOptions;
use crate::gourd_assert_moderate;
use crate::propagators::ClausalPropagator;

/// Maintains the sets of irredundant and redundant clauses and periodically garbage collects
/// redundant clauses of poor quality.
///
/// The reduction threshold grows by an increment which itself grows with every reduction, so
/// reductions become less frequent over time. Between reductions the database tracks moving
/// averages of the glue and size of redundant clauses involved in conflicts; in dynamic mode
/// these averages spare "above average" clauses from deletion.
pub(crate) struct ClauseDatabase {
    irredundant_clauses: Vec<ClauseReference>,
    redundant_clauses: Vec<ClauseReference>,
    reduce_enabled: bool,
    reduce_dynamic: bool,
    /// The conflict count at which the next reduction fires.
    num_conflicts_until_reduce: u64,
    /// Added to the threshold on every reduction; grows by `reduce_increment_step` each time.
    reduce_increment: u64,
    reduce_increment_step: u64,
    /// Clauses not resolved against since this conflict count are deletion candidates.
    resolved_cutoff: u64,
    /// The number of root-fixed variables at the previous reduction; growth triggers the
    /// removal of root-satisfied clauses.
    num_fixed_at_last_reduce: u64,
    resolved_glue_moving_average: ExponentialMovingAverage,
    resolved_size_moving_average: ExponentialMovingAverage,
    num_reductions: u64,
    num_clauses_removed: u64,
    num_bytes_removed: usize,
}

impl ClauseDatabase {
    pub(crate) fn new(options: &SolverOptions) -> ClauseDatabase {
        ClauseDatabase {
            irredundant_clauses: vec![],
            redundant_clauses: vec![],
            reduce_enabled: options.reduce_enabled,
            reduce_dynamic: options.reduce_dynamic,
            num_conflicts_until_reduce: options.reduce_initial_threshold,
            reduce_increment: options.reduce_initial_threshold,
            reduce_increment_step: options.reduce_increment,
            resolved_cutoff: 0,
            num_fixed_at_last_reduce: 0,
            resolved_glue_moving_average: ExponentialMovingAverage::new(options.resolved_alpha),
            resolved_size_moving_average: ExponentialMovingAverage::new(options.resolved_alpha),
            num_reductions: 0,
            num_clauses_removed: 0,
            num_bytes_removed: 0,
        }
    }

    /// Allocates a clause, registers its two watches and records it in the appropriate set. The
    /// clause's recency stamp is the current conflict count.
    pub(crate) fn add_clause(
        &mut self,
        literals: Vec<Literal>,
        is_redundant: bool,
        lbd: u32,
        num_conflicts: u64,
        clause_allocator: &mut ClauseAllocator,
        clausal_propagator: &mut ClausalPropagator,
    ) -> ClauseReference {
        let clause_reference =
            clause_allocator.create_clause(literals, is_redundant, lbd, num_conflicts);
        clausal_propagator.start_watching_clause_unchecked(clause_reference, clause_allocator);
        if is_redundant {
            self.redundant_clauses.push(clause_reference);
        } else {
            self.irredundant_clauses.push(clause_reference);
        }
        clause_reference
    }

    /// Called with the clause a conflict was detected on. Redundant conflicting clauses get
    /// their recency stamp refreshed and feed the resolved-glue and resolved-size averages,
    /// which protect recently useful clauses during reduction.
    pub(crate) fn on_conflict_clause(
        &mut self,
        clause_reference: ClauseReference,
        clause_allocator: &mut ClauseAllocator,
        num_conflicts: u64,
    ) {
        let clause = clause_allocator.get_mutable_clause(clause_reference);
        if !clause.is_redundant() {
            return;
        }
        clause.update_resolved_at(num_conflicts);
        let glue = clause.get_lbd() as u64;
        let size = clause.len() as u64;
        self.resolved_glue_moving_average.add_term(glue);
        self.resolved_size_moving_average.add_term(size);
    }

    pub(crate) fn should_reduce(&self, num_conflicts: u64) -> bool {
        self.reduce_enabled && num_conflicts >= self.num_conflicts_until_reduce
    }

    /// Garbage collects half of the eligible redundant clauses.
    ///
    /// Reasons of trail literals are protected for the duration of the sweep. When new root
    /// assignments appeared since the previous reduction, clauses satisfied at the root are
    /// removed as well, including irredundant ones.
    pub(crate) fn reduce(
        &mut self,
        assignments: &AssignmentsPropositional,
        clause_allocator: &mut ClauseAllocator,
        clausal_propagator: &mut ClausalPropagator,
        num_conflicts: u64,
    ) {
        self.num_reductions += 1;
        debug!("reduce {}", self.num_reductions);

        let num_fixed = assignments.num_fixed_variables();
        let new_fixed_variables = self.num_fixed_at_last_reduce < num_fixed;

        self.protect_reason_clauses(assignments, clause_allocator);
        if new_fixed_variables {
            ClauseDatabase::mark_root_satisfied_clauses(
                &self.irredundant_clauses,
                assignments,
                clause_allocator,
            );
            ClauseDatabase::mark_root_satisfied_clauses(
                &self.redundant_clauses,
                assignments,
                clause_allocator,
            );
        }
        self.mark_redundant_clauses_for_removal(clause_allocator);
        self.unprotect_reason_clauses(assignments, clause_allocator);

        clausal_propagator.flush_garbage_watches(clause_allocator, assignments);

        if new_fixed_variables {
            let mut irredundant = std::mem::take(&mut self.irredundant_clauses);
            self.collect_garbage_clauses(&mut irredundant, clause_allocator);
            self.irredundant_clauses = irredundant;
        }
        let mut redundant = std::mem::take(&mut self.redundant_clauses);
        self.collect_garbage_clauses(&mut redundant, clause_allocator);
        self.redundant_clauses = redundant;

        self.reduce_increment += self.reduce_increment_step;
        self.num_conflicts_until_reduce = num_conflicts + self.reduce_increment;
        self.resolved_cutoff = num_conflicts;
        self.num_fixed_at_last_reduce = num_fixed;
    }

    fn protect_reason_clauses(
        &self,
        assignments: &AssignmentsPropositional,
        clause_allocator: &mut ClauseAllocator,
    ) {
        for index in 0..assignments.num_trail_entries() {
            let variable = assignments
                .get_trail_entry(index)
                .get_propositional_variable();
            if assignments.get_variable_assignment_level(variable) == 0 {
                continue;
            }
            if let Some(reason) = assignments.get_variable_reason(variable) {
                clause_allocator.get_mutable_clause(reason).mark_reason();
            }
        }
    }

    fn unprotect_reason_clauses(
        &self,
        assignments: &AssignmentsPropositional,
        clause_allocator: &mut ClauseAllocator,
    ) {
        for index in 0..assignments.num_trail_entries() {
            let variable = assignments
                .get_trail_entry(index)
                .get_propositional_variable();
            if assignments.get_variable_assignment_level(variable) == 0 {
                continue;
            }
            if let Some(reason) = assignments.get_variable_reason(variable) {
                clause_allocator.get_mutable_clause(reason).clear_reason();
            }
        }
    }

    fn mark_root_satisfied_clauses(
        clause_references: &[ClauseReference],
        assignments: &AssignmentsPropositional,
        clause_allocator: &mut ClauseAllocator,
    ) {
        for &clause_reference in clause_references {
            let clause = clause_allocator.get_clause(clause_reference);
            if clause.is_reason() || clause.is_garbage() {
                continue;
            }
            let root_satisfied = clause
                .get_literal_slice()
                .iter()
                .any(|&literal| assignments.is_literal_fixed_true(literal));
            if root_satisfied {
                clause_allocator
                    .get_mutable_clause(clause_reference)
                    .mark_garbage();
            }
        }
    }

    /// Selects the redundant clauses eligible for deletion and marks the worse half garbage.
    /// Candidates are ordered by recency first, then by glue and size.
    fn mark_redundant_clauses_for_removal(&mut self, clause_allocator: &mut ClauseAllocator) {
        let mut work: Vec<ClauseReference> = vec![];
        for &clause_reference in &self.redundant_clauses {
            let clause = clause_allocator.get_clause(clause_reference);
            gourd_assert_moderate!(clause.is_redundant());
            if clause.is_reason() || clause.is_garbage() {
                continue;
            }
            if clause.get_lbd() <= 2 || clause.len() <= 3 {
                continue;
            }
            //clauses resolved against since the previous reduction are kept
            if clause.get_resolved_at() > self.resolved_cutoff {
                continue;
            }
            //in dynamic mode, clauses better than the average resolved clause are spared
            if self.reduce_dynamic
                && (clause.get_lbd() as f64) < self.resolved_glue_moving_average.value()
                && (clause.len() as f64) < self.resolved_size_moving_average.value()
            {
                continue;
            }
            work.push(clause_reference);
        }

        work.sort_unstable_by(|&a, &b| {
            let clause_a = clause_allocator.get_clause(a);
            let clause_b = clause_allocator.get_clause(b);
            clause_a
                .get_resolved_at()
                .cmp(&clause_b.get_resolved_at())
                .then(clause_b.get_lbd().cmp(&clause_a.get_lbd()))
                .then(clause_b.len().cmp(&clause_a.len()))
        });

        let target = work.len() / 2;
        for &clause_reference in &work[..target] {
            clause_allocator
                .get_mutable_clause(clause_reference)
                .mark_garbage();
        }
    }

    fn collect_garbage_clauses(
        &mut self,
        clause_references: &mut Vec<ClauseReference>,
        clause_allocator: &mut ClauseAllocator,
    ) {
        let mut end_index = 0;
        for current_index in 0..clause_references.len() {
            let clause_reference = clause_references[current_index];
            if clause_allocator.get_clause(clause_reference).is_garbage() {
                self.num_clauses_removed += 1;
                let num_bytes_before = clause_allocator.num_bytes();
                clause_allocator.delete_clause(clause_reference);
                self.num_bytes_removed += num_bytes_before - clause_allocator.num_bytes();
            } else {
                clause_references[end_index] = clause_reference;
                end_index += 1;
            }
        }
        clause_references.truncate(end_index);
    }

    pub(crate) fn num_irredundant_clauses(&self) -> usize {
        self.irredundant_clauses.len()
    }

    pub(crate) fn num_redundant_clauses(&self) -> usize {
        self.redundant_clauses.len()
    }

    pub(crate) fn num_reductions(&self) -> u64 {
        self.num_reductions
    }

    pub(crate) fn num_clauses_removed(&self) -> u64 {
        self.num_clauses_removed
    }

    pub(crate) fn num_bytes_removed(&self) -> usize {
        self.num_bytes_removed
    }

    #[cfg(test)]
    fn redundant_clause_references(&self) -> &[ClauseReference] {
        &self.redundant_clauses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::variables::PropositionalVariable;

    struct TestSetup {
        assignments: AssignmentsPropositional,
        clause_allocator: ClauseAllocator,
        clausal_propagator: ClausalPropagator,
        database: ClauseDatabase,
    }

    fn setup(num_variables: u32, configure: impl FnOnce(&mut SolverOptions)) -> TestSetup {
        let mut options = SolverOptions::default();
        configure(&mut options);

        let mut assignments = AssignmentsPropositional::default();
        let mut clausal_propagator = ClausalPropagator::default();
        //the zero index is reserved
        for _ in 0..=num_variables {
            assignments.grow();
            clausal_propagator.grow();
        }
        TestSetup {
            assignments,
            clause_allocator: ClauseAllocator::default(),
            clausal_propagator,
            database: ClauseDatabase::new(&options),
        }
    }

    fn literal(index: u32, is_positive: bool) -> Literal {
        Literal::new(PropositionalVariable::new(index), is_positive)
    }

    fn add_redundant_clause(
        test: &mut TestSetup,
        indices: [u32; 4],
        lbd: u32,
        resolved_at: u64,
    ) -> ClauseReference {
        test.database.add_clause(
            indices.iter().map(|&i| literal(i, true)).collect(),
            true,
            lbd,
            resolved_at,
            &mut test.clause_allocator,
            &mut test.clausal_propagator,
        )
    }

    #[test]
    fn the_reduce_threshold_grows_by_an_increasing_increment() {
        let mut test = setup(4, |options| {
            options.reduce_initial_threshold = 10;
            options.reduce_increment = 5;
        });

        assert!(!test.database.should_reduce(9));
        assert!(test.database.should_reduce(10));

        test.database.reduce(
            &test.assignments,
            &mut test.clause_allocator,
            &mut test.clausal_propagator,
            10,
        );
        //the increment grew from 10 to 15, so the next reduction fires at 25
        assert!(!test.database.should_reduce(24));
        assert!(test.database.should_reduce(25));
    }

    #[test]
    fn half_of_the_stale_redundant_clauses_are_deleted() {
        let mut test = setup(8, |options| {
            options.reduce_dynamic = false;
        });

        let worst = add_redundant_clause(&mut test, [1, 2, 3, 4], 8, 0);
        let _middle = add_redundant_clause(&mut test, [5, 6, 7, 8], 5, 0);
        let best = add_redundant_clause(&mut test, [1, 3, 5, 7], 4, 0);
        let _irredundant = test.database.add_clause(
            vec![literal(2, true), literal(4, true)],
            false,
            2,
            0,
            &mut test.clause_allocator,
            &mut test.clausal_propagator,
        );

        test.database.reduce(
            &test.assignments,
            &mut test.clause_allocator,
            &mut test.clausal_propagator,
            100,
        );

        //three candidates, the worst one (greatest glue) is deleted
        assert_eq!(2, test.database.num_redundant_clauses());
        assert_eq!(1, test.database.num_clauses_removed());
        assert!(!test
            .database
            .redundant_clause_references()
            .contains(&worst));
        assert!(test.database.redundant_clause_references().contains(&best));
        assert_eq!(1, test.database.num_irredundant_clauses());
    }

    #[test]
    fn low_glue_and_short_clauses_are_never_deleted() {
        let mut test = setup(8, |options| {
            options.reduce_dynamic = false;
        });

        //glue two and ternary clauses are always kept
        let glue_two = add_redundant_clause(&mut test, [1, 2, 3, 4], 2, 0);
        let ternary = test.database.add_clause(
            vec![literal(5, true), literal(6, true), literal(7, true)],
            true,
            3,
            0,
            &mut test.clause_allocator,
            &mut test.clausal_propagator,
        );

        test.database.reduce(
            &test.assignments,
            &mut test.clause_allocator,
            &mut test.clausal_propagator,
            100,
        );

        assert_eq!(2, test.database.num_redundant_clauses());
        assert!(test
            .database
            .redundant_clause_references()
            .contains(&glue_two));
        assert!(test
            .database
            .redundant_clause_references()
            .contains(&ternary));
    }

    #[test]
    fn reason_clauses_survive_reduction() {
        let mut test = setup(8, |options| {
            options.reduce_dynamic = false;
        });

        let reason = add_redundant_clause(&mut test, [1, 2, 3, 4], 8, 0);
        let _other = add_redundant_clause(&mut test, [5, 6, 7, 8], 8, 0);

        //variable 1 is propagated with the first clause as reason
        test.assignments.increase_decision_level();
        test.assignments.enqueue_decision_literal(literal(2, false));
        test.assignments
            .enqueue_propagated_literal(literal(1, true), reason);

        test.database.reduce(
            &test.assignments,
            &mut test.clause_allocator,
            &mut test.clausal_propagator,
            100,
        );

        assert!(test
            .database
            .redundant_clause_references()
            .contains(&reason));
        //the protection is transient
        assert!(!test.clause_allocator.get_clause(reason).is_reason());
    }

    #[test]
    fn reducing_twice_without_new_conflicts_is_a_no_op() {
        let mut test = setup(8, |options| {
            options.reduce_dynamic = false;
        });

        let _ = add_redundant_clause(&mut test, [1, 2, 3, 4], 8, 0);
        let _ = add_redundant_clause(&mut test, [5, 6, 7, 8], 6, 0);

        test.database.reduce(
            &test.assignments,
            &mut test.clause_allocator,
            &mut test.clausal_propagator,
            100,
        );
        let remaining = test.database.redundant_clause_references().to_vec();

        test.database.reduce(
            &test.assignments,
            &mut test.clause_allocator,
            &mut test.clausal_propagator,
            100,
        );
        assert_eq!(remaining, test.database.redundant_clause_references());
    }

    #[test]
    fn root_satisfied_clauses_are_removed_when_fixed_variables_appear() {
        let mut test = setup(4, |options| {
            options.reduce_dynamic = false;
        });

        let satisfied = test.database.add_clause(
            vec![literal(1, true), literal(2, true)],
            false,
            2,
            0,
            &mut test.clause_allocator,
            &mut test.clausal_propagator,
        );
        let _untouched = test.database.add_clause(
            vec![literal(3, true), literal(4, true)],
            false,
            2,
            0,
            &mut test.clause_allocator,
            &mut test.clausal_propagator,
        );

        //fix variable 1 at the root, satisfying the first clause
        test.assignments.enqueue_decision_literal(literal(1, true));

        test.database.reduce(
            &test.assignments,
            &mut test.clause_allocator,
            &mut test.clausal_propagator,
            100,
        );

        assert_eq!(1, test.database.num_irredundant_clauses());
        assert!(!test
            .database
            .irredundant_clauses
            .contains(&satisfied));
    }
}
