use std::io::Write;

use log::debug;
use log::info;
use log::warn;

use crate::basic_types::moving_averages::MovingAverage;
use crate::basic_types::ConstraintOperationError;
use crate::basic_types::Stopwatch;
use crate::engine::conflict_analysis::ConflictAnalysisResult;
use crate::engine::conflict_analysis::ResolutionConflictAnalyser;
use crate::engine::preprocessor::PreprocessedClause;
use crate::engine::preprocessor::Preprocessor;
use crate::engine::proof::DratProof;
use crate::engine::sat::assignments_propositional::AssignmentsPropositional;
use crate::engine::sat::clause_allocator::ClauseAllocator;
use crate::engine::sat::clause_allocator::ClauseReference;
use crate::engine::sat::clause_database::ClauseDatabase;
use crate::engine::sat::restart_strategy::RestartStrategy;
use crate::engine::sat::vmtf_queue::VmtfQueue;
use crate::engine::variables::Literal;
use crate::engine::variables::PropositionalVariable;
use crate::engine::SolverStatistics;
use crate::gourd_assert_moderate;
use crate::gourd_assert_simple;
use crate::propagators::ClausalPropagator;
use crate::signal_handling::signal_handler;
use crate::statistics::LogStatistics;
use crate::statistics::StatisticLogger;

/// The outcome of a call to [`SatisfactionSolver::solve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverExecutionFlag {
    /// A satisfying assignment has been found; it can be read through
    /// [`SatisfactionSolver::get_truth_value`].
    Satisfiable,
    /// The formula has no satisfying assignment.
    Unsatisfiable,
    /// The host asked the solver to stop before a conclusion was reached.
    Unknown,
}

/// The configuration of the solver, consumed once at construction.
#[derive(Debug, Clone, Copy)]
pub struct SolverOptions {
    /// Target alpha of the fast (short-horizon) learned-glue moving average.
    pub glue_fast_alpha: f64,
    /// Target alpha of the slow (long-horizon) learned-glue moving average.
    pub glue_slow_alpha: f64,
    /// Target alpha of the backjump-level moving average.
    pub jump_alpha: f64,
    /// Target alpha of the resolved-clause glue and size moving averages.
    pub resolved_alpha: f64,
    /// Enables garbage collection of redundant clauses.
    pub reduce_enabled: bool,
    /// Spares clauses that are better than the average resolved clause during reduction.
    pub reduce_dynamic: bool,
    /// The number of conflicts before the first reduction.
    pub reduce_initial_threshold: u64,
    /// Added to the growth of the reduction threshold on every reduction.
    pub reduce_increment: u64,
    /// Enables restarting.
    pub restart_enabled: bool,
    /// Enables suppressing forced restarts when the search is already shallow.
    pub restart_delay_enabled: bool,
    /// A restart is suppressed when the decision level is below this fraction of the
    /// backjump-level moving average.
    pub restart_delay_fraction: f64,
    /// The fast glue average has to exceed the slow one by this fraction to force a restart.
    pub restart_margin: f64,
    /// The minimum number of conflicts between two considered restarts.
    pub restart_base_interval: u64,
    /// Keeps the part of the trail that agrees with the decision ordering across restarts.
    pub reuse_trail_enabled: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            glue_fast_alpha: 3e-2,
            glue_slow_alpha: 1e-5,
            jump_alpha: 1e-6,
            resolved_alpha: 1e-6,
            reduce_enabled: true,
            reduce_dynamic: true,
            reduce_initial_threshold: 2000,
            reduce_increment: 300,
            restart_enabled: true,
            restart_delay_enabled: true,
            restart_delay_fraction: 0.5,
            restart_margin: 0.2,
            restart_base_interval: 10,
            reuse_trail_enabled: true,
        }
    }
}

/// A conflict-driven clause-learning satisfiability solver.
///
/// The solver owns all of its state; clauses are added through
/// [`SatisfactionSolver::add_permanent_clause`] at the root level, after which
/// [`SatisfactionSolver::solve`] runs the search loop: propagate until fixpoint, analyse
/// conflicts into learned clauses, and otherwise restart, reduce the clause database or decide
/// on the next variable.
pub struct SatisfactionSolver {
    options: SolverOptions,
    assignments_propositional: AssignmentsPropositional,
    clause_allocator: ClauseAllocator,
    clausal_propagator: ClausalPropagator,
    clause_database: ClauseDatabase,
    restart_strategy: RestartStrategy,
    vmtf_queue: VmtfQueue,
    conflict_analyser: ResolutionConflictAnalyser,
    proof: Option<DratProof<Box<dyn Write>>>,
    counters: SolverStatistics,
    stopwatch: Stopwatch,
    num_variables: usize,
    /// The fixed count at the last root-assignment progress report.
    num_fixed_variables_reported: u64,
    is_unsat: bool,
}

impl Default for SatisfactionSolver {
    fn default() -> Self {
        SatisfactionSolver::new(SolverOptions::default())
    }
}

impl SatisfactionSolver {
    pub fn new(options: SolverOptions) -> SatisfactionSolver {
        let mut solver = SatisfactionSolver {
            options,
            assignments_propositional: AssignmentsPropositional::default(),
            clause_allocator: ClauseAllocator::default(),
            clausal_propagator: ClausalPropagator::default(),
            clause_database: ClauseDatabase::new(&options),
            restart_strategy: RestartStrategy::new(&options),
            vmtf_queue: VmtfQueue::default(),
            conflict_analyser: ResolutionConflictAnalyser::default(),
            proof: None,
            counters: SolverStatistics::default(),
            stopwatch: Stopwatch::starting_now(),
            num_variables: 0,
            num_fixed_variables_reported: 0,
            is_unsat: false,
        };

        //the reserved variable with index zero occupies a slot in every per-variable structure
        //so that variable indices can be used for indexing directly
        solver.grow_variable_structures();

        solver
    }

    /// Registers the writer the proof trace is emitted to. Must be called before any clause is
    /// learned for the trace to be complete.
    pub fn set_proof_writer(&mut self, writer: Box<dyn Write>) {
        self.proof = Some(DratProof::new(writer));
    }

    pub fn create_new_propositional_variable(&mut self) -> PropositionalVariable {
        self.grow_variable_structures();
        self.num_variables += 1;
        gourd_assert_moderate!(
            self.assignments_propositional.num_propositional_variables() as usize
                == self.num_variables + 1
        );
        PropositionalVariable::new(self.num_variables as u32)
    }

    pub fn num_propositional_variables(&self) -> usize {
        self.num_variables
    }

    /// The truth value of the variable under the current assignment; meaningful once
    /// [`SatisfactionSolver::solve`] returned [`SolverExecutionFlag::Satisfiable`].
    pub fn get_truth_value(&self, variable: PropositionalVariable) -> bool {
        gourd_assert_simple!(self.assignments_propositional.is_variable_assigned(variable));
        self.assignments_propositional
            .is_variable_assigned_true(variable)
    }

    fn grow_variable_structures(&mut self) {
        self.assignments_propositional.grow();
        self.clausal_propagator.grow();
        self.vmtf_queue.grow();
        self.conflict_analyser.grow();
    }

    /// Adds a clause of the input formula. Tautological clauses are discarded, duplicate
    /// literals are removed, units are applied as root assignments, and an empty or clashing
    /// clause makes the formula unsatisfiable.
    pub fn add_permanent_clause(
        &mut self,
        literals: Vec<Literal>,
    ) -> Result<(), ConstraintOperationError> {
        gourd_assert_simple!(self.assignments_propositional.is_at_the_root_level());

        if self.is_unsat {
            debug!("clause added to an already inconsistent formula");
            return Err(ConstraintOperationError::InfeasibleClause);
        }

        let literals = match Preprocessor::preprocess_clause(literals) {
            //tautological clauses hold under every assignment and are silently discarded
            PreprocessedClause::Tautology => return Ok(()),
            PreprocessedClause::Literals(literals) => literals,
        };

        if literals.is_empty() {
            info!("original empty clause");
            self.learn_empty_clause();
            return Err(ConstraintOperationError::InfeasibleClause);
        }

        //unit clauses are applied as root assignments, rather than stored as clauses
        if literals.len() == 1 {
            let unit = literals[0];
            if self.assignments_propositional.is_literal_assigned_false(unit) {
                info!("parsed clashing unit");
                self.learn_empty_clause();
                return Err(ConstraintOperationError::InfeasibleClause);
            }
            if self.assignments_propositional.is_literal_unassigned(unit) {
                self.assignments_propositional.enqueue_decision_literal(unit);
            }
            //a repeated unit needs no work
            return Ok(());
        }

        let _ = self.clause_database.add_clause(
            literals,
            false,
            0,
            self.counters.num_conflicts,
            &mut self.clause_allocator,
            &mut self.clausal_propagator,
        );
        Ok(())
    }

    pub fn solve(&mut self) -> SolverExecutionFlag {
        self.stopwatch.reset();
        let result = self.solve_internal();
        self.flush_proof();
        result
    }

    fn solve_internal(&mut self) -> SolverExecutionFlag {
        loop {
            if signal_handler::should_terminate() {
                debug!("Received signal to quit");
                return SolverExecutionFlag::Unknown;
            }

            if self.is_unsat {
                return SolverExecutionFlag::Unsatisfiable;
            }

            match self
                .clausal_propagator
                .propagate(&mut self.assignments_propositional, &mut self.clause_allocator)
            {
                Err(conflict_reference) => {
                    self.counters.num_conflicts += 1;
                    self.resolve_conflict(conflict_reference);
                }
                Ok(()) => {
                    if self.assignments_propositional.num_fixed_variables()
                        > self.num_fixed_variables_reported
                    {
                        self.report_root_assignments();
                    } else if self.assignments_propositional.num_trail_entries()
                        == self.num_variables
                    {
                        return SolverExecutionFlag::Satisfiable;
                    } else if self.restart_strategy.should_restart(
                        self.counters.num_conflicts,
                        self.assignments_propositional.get_decision_level(),
                    ) {
                        self.restart();
                    } else if self.clause_database.should_reduce(self.counters.num_conflicts) {
                        self.reduce();
                    } else {
                        self.decide();
                    }
                }
            }
        }
    }

    /// Turns the conflicting clause into a learned clause via 1UIP analysis, backjumps, asserts
    /// the learned literal and bumps the involved variables. A conflict at the root level means
    /// the formula is unsatisfiable.
    fn resolve_conflict(&mut self, conflict_reference: ClauseReference) {
        if self.assignments_propositional.is_at_the_root_level() {
            self.learn_empty_clause();
            return;
        }

        self.clause_database.on_conflict_clause(
            conflict_reference,
            &mut self.clause_allocator,
            self.counters.num_conflicts,
        );

        let analysis_result = self.conflict_analyser.compute_1uip(
            conflict_reference,
            &self.assignments_propositional,
            &self.clause_allocator,
        );

        self.counters
            .average_learned_clause_length
            .add_term(analysis_result.learned_literals.len() as u64);
        self.counters.average_backjump_amount.add_term(
            (self.assignments_propositional.get_decision_level()
                - analysis_result.backjump_level) as u64,
        );
        self.restart_strategy
            .notify_conflict(analysis_result.glue, analysis_result.backjump_level);

        let asserting_literal = analysis_result.learned_literals[0];
        self.process_learned_clause(analysis_result);

        //bumping happens after the backjump so that the queue cursor can be placed on the
        //variables that became unassigned
        self.conflict_analyser.bump_and_clear_seen_variables(
            !asserting_literal,
            &mut self.vmtf_queue,
            &self.assignments_propositional,
        );
        self.conflict_analyser.clear_seen_levels();
    }

    fn process_learned_clause(&mut self, analysis_result: ConflictAnalysisResult) {
        //unit clauses are treated in a special way: they are added as root assignments
        if analysis_result.learned_literals.len() == 1 {
            let unit = analysis_result.learned_literals[0];
            self.write_unit_clause_to_proof(unit);
            self.counters.num_unit_clauses_learned += 1;

            self.backtrack(0);
            self.assignments_propositional.enqueue_decision_literal(unit);
        } else {
            self.write_learned_clause_to_proof(&analysis_result.learned_literals);

            let asserting_literal = analysis_result.learned_literals[0];
            let clause_reference = self.clause_database.add_clause(
                analysis_result.learned_literals,
                true,
                analysis_result.glue,
                self.counters.num_conflicts,
                &mut self.clause_allocator,
                &mut self.clausal_propagator,
            );

            self.backtrack(analysis_result.backjump_level);
            self.assignments_propositional
                .enqueue_propagated_literal(asserting_literal, clause_reference);
        }
    }

    fn learn_empty_clause(&mut self) {
        gourd_assert_simple!(!self.is_unsat);
        self.write_empty_clause_to_proof();
        self.is_unsat = true;
    }

    fn backtrack(&mut self, backtrack_level: usize) {
        gourd_assert_simple!(
            backtrack_level < self.assignments_propositional.get_decision_level()
        );

        let vmtf_queue = &mut self.vmtf_queue;
        self.assignments_propositional
            .synchronise(backtrack_level)
            .for_each(|literal| vmtf_queue.on_unassign(literal.get_propositional_variable()));

        self.clausal_propagator
            .synchronise(self.assignments_propositional.num_trail_entries());
    }

    fn restart(&mut self) {
        self.counters.num_restarts += 1;

        let target_level = self.compute_reused_trail_level();
        if target_level > 0 {
            self.counters.num_reused_trails += 1;
            debug!("reusing the trail up to level {target_level}");
        }
        if target_level < self.assignments_propositional.get_decision_level() {
            self.backtrack(target_level);
        }

        self.restart_strategy.notify_restart(self.counters.num_conflicts);
        self.report_progress('*');
    }

    /// The deepest prefix of decision levels whose decisions were all bumped more recently than
    /// the next decision candidate; backtracking there instead of to the root keeps assignments
    /// the restarted search would immediately redo.
    fn compute_reused_trail_level(&mut self) -> usize {
        if !self.options.reuse_trail_enabled {
            return 0;
        }

        let next_decision_variable = self
            .vmtf_queue
            .next_decision_variable(&self.assignments_propositional);
        let stamp_limit = self.vmtf_queue.get_bump_stamp(next_decision_variable);

        let mut target_level = 0;
        while target_level < self.assignments_propositional.get_decision_level() {
            let decision = self
                .assignments_propositional
                .get_decision_literal(target_level + 1);
            if self.vmtf_queue.get_bump_stamp(decision.get_propositional_variable()) > stamp_limit
            {
                target_level += 1;
            } else {
                break;
            }
        }
        target_level
    }

    fn reduce(&mut self) {
        self.clause_database.reduce(
            &self.assignments_propositional,
            &mut self.clause_allocator,
            &mut self.clausal_propagator,
            self.counters.num_conflicts,
        );
        self.report_progress('-');
    }

    fn decide(&mut self) {
        gourd_assert_moderate!(self
            .clausal_propagator
            .is_propagation_complete(self.assignments_propositional.num_trail_entries()));

        self.counters.num_decisions += 1;

        let variable = self
            .vmtf_queue
            .next_decision_variable(&self.assignments_propositional);
        let decision_literal = Literal::new(
            variable,
            self.assignments_propositional.get_saved_phase(variable),
        );

        self.assignments_propositional.increase_decision_level();
        self.assignments_propositional
            .enqueue_decision_literal(decision_literal);
    }

    /// Emits a progress report for freshly derived root-level assignments.
    fn report_root_assignments(&mut self) {
        self.num_fixed_variables_reported =
            self.assignments_propositional.num_fixed_variables();
        self.report_progress('i');
    }

    fn report_progress(&self, tag: char) {
        info!(
            "{} {:>11} conflicts {:>9} redundant {:>8.1} jump {:>9} irredundant {:>9} variables",
            tag,
            self.counters.num_conflicts,
            self.clause_database.num_redundant_clauses(),
            self.restart_strategy.jump_average(),
            self.clause_database.num_irredundant_clauses(),
            self.num_active_variables(),
        );
    }

    fn num_active_variables(&self) -> usize {
        self.num_variables - self.assignments_propositional.num_fixed_variables() as usize
    }

    fn write_learned_clause_to_proof(&mut self, literals: &[Literal]) {
        if let Some(proof) = &mut self.proof {
            if let Err(write_error) = proof.log_learned_clause(literals) {
                warn!("Failed to update the proof file, error message: {write_error}");
            }
        }
    }

    fn write_unit_clause_to_proof(&mut self, literal: Literal) {
        if let Some(proof) = &mut self.proof {
            if let Err(write_error) = proof.log_unit_clause(literal) {
                warn!("Failed to update the proof file, error message: {write_error}");
            }
        }
    }

    fn write_empty_clause_to_proof(&mut self) {
        if let Some(proof) = &mut self.proof {
            if let Err(write_error) = proof.log_empty_clause() {
                warn!("Failed to update the proof file, error message: {write_error}");
            }
        }
    }

    fn flush_proof(&mut self) {
        if let Some(proof) = &mut self.proof {
            if let Err(write_error) = proof.flush() {
                warn!("Failed to flush the proof file, error message: {write_error}");
            }
        }
    }

    /// Logs the solver statistics through the configured statistic writer; may be called at any
    /// quiescent point.
    pub fn log_statistics(&self) {
        let statistic_logger = StatisticLogger::default();
        self.counters.log_statistics(&statistic_logger);
        statistic_logger.log_statistic(
            "num_propagations",
            self.clausal_propagator.num_propagations(),
        );
        statistic_logger.log_statistic("num_bumped_variables", self.vmtf_queue.num_bumped());
        statistic_logger.log_statistic("num_searched_decisions", self.vmtf_queue.num_searched());
        statistic_logger.log_statistic(
            "num_delayed_restarts",
            self.restart_strategy.num_delayed_restarts(),
        );
        statistic_logger.log_statistic("num_reductions", self.clause_database.num_reductions());
        statistic_logger.log_statistic(
            "num_clauses_removed",
            self.clause_database.num_clauses_removed(),
        );
        statistic_logger.log_statistic(
            "num_clause_bytes_removed",
            self.clause_database.num_bytes_removed(),
        );
        statistic_logger.log_statistic(
            "num_fixed_variables",
            self.assignments_propositional.num_fixed_variables(),
        );
        statistic_logger.log_statistic("num_clauses", self.clause_allocator.num_clauses());
        statistic_logger
            .log_statistic("max_num_clauses", self.clause_allocator.max_num_clauses());
        statistic_logger.log_statistic("num_clause_bytes", self.clause_allocator.num_bytes());
        statistic_logger
            .log_statistic("max_num_clause_bytes", self.clause_allocator.max_num_bytes());
        statistic_logger.log_statistic(
            "time_spent_in_solver_seconds",
            format!("{:.3}", self.stopwatch.elapsed().as_secs_f64()),
        );
    }
}
