use crate::containers::KeyedVec;
use crate::engine::sat::assignments_propositional::AssignmentsPropositional;
use crate::engine::sat::clause_allocator::ClauseAllocator;
use crate::engine::sat::clause_allocator::ClauseReference;
use crate::engine::sat::vmtf_queue::VmtfQueue;
use crate::engine::variables::Literal;
use crate::engine::variables::PropositionalVariable;
use crate::gourd_assert_extreme;
use crate::gourd_assert_moderate;
use crate::gourd_assert_simple;

/// The outcome of analysing a conflict according to the 1UIP scheme.
///
/// The asserting literal is at position zero; for clauses of at least two literals a literal from
/// the second-deepest contributing decision level is at position one, and its level is the
/// backjump level.
pub(crate) struct ConflictAnalysisResult {
    pub(crate) learned_literals: Vec<Literal>,
    pub(crate) backjump_level: usize,
    /// The number of distinct decision levels among the learned literals.
    pub(crate) glue: u32,
}

/// First unique-implication-point conflict analysis: resolves backwards along the trail from the
/// conflicting clause until exactly one literal of the current decision level remains.
///
/// The per-variable `seen`/`minimised`/`poison` marks and the per-level counters are transient
/// analysis state; they are cleared at the end of each analysis rather than at the start, which
/// both [`ResolutionConflictAnalyser::compute_1uip`] and
/// [`ResolutionConflictAnalyser::bump_and_clear_seen_variables`] rely on.
#[derive(Default)]
pub(crate) struct ResolutionConflictAnalyser {
    learned_clause: Vec<Literal>,
    seen_literals: Vec<Literal>,
    seen_levels: Vec<usize>,
    num_seen_at_level: Vec<u32>,
    marks: KeyedVec<PropositionalVariable, AnalysisMarks>,
}

#[derive(Default, Clone, Copy, Debug)]
struct AnalysisMarks {
    seen: bool,
    //the minimised and poison marks are reserved for learned-clause minimisation, see
    //`minimise_learned_clause`
    #[allow(dead_code)]
    minimised: bool,
    #[allow(dead_code)]
    poison: bool,
}

impl ResolutionConflictAnalyser {
    pub(crate) fn grow(&mut self) {
        let _ = self.marks.push(AnalysisMarks::default());
    }

    /// Computes the learned clause according to the 1UIP scheme. Must only be called when the
    /// conflict occurred above the root level.
    ///
    /// The seen marks and level counters are left populated for the follow-up calls to
    /// [`ResolutionConflictAnalyser::bump_and_clear_seen_variables`] and
    /// [`ResolutionConflictAnalyser::clear_seen_levels`].
    pub(crate) fn compute_1uip(
        &mut self,
        conflict_reference: ClauseReference,
        assignments: &AssignmentsPropositional,
        clause_allocator: &ClauseAllocator,
    ) -> ConflictAnalysisResult {
        gourd_assert_simple!(assignments.get_decision_level() > 0);
        gourd_assert_moderate!(self.learned_clause.is_empty() && self.seen_literals.is_empty());

        let mut reason_reference = conflict_reference;
        let mut num_current_level_literals = 0;
        let mut next_trail_index = assignments.num_trail_entries();
        let uip;
        loop {
            //perform resolution with the current reason, marking newly seen literals
            let reason_length = clause_allocator.get_clause(reason_reference).len();
            for index in 0..reason_length {
                let reason_literal = clause_allocator.get_clause(reason_reference)[index];
                if self.analyse_literal(reason_literal, assignments) {
                    num_current_level_literals += 1;
                }
            }

            //find the most recently assigned seen literal on the trail; it is the next candidate
            //for resolution, or the first unique implication point once it is the only seen
            //literal left at the current level
            let candidate = loop {
                next_trail_index -= 1;
                let trail_literal = assignments.get_trail_entry(next_trail_index);
                if self.marks[trail_literal.get_propositional_variable()].seen {
                    break trail_literal;
                }
            };

            num_current_level_literals -= 1;
            if num_current_level_literals == 0 {
                uip = candidate;
                break;
            }

            reason_reference = assignments
                .get_variable_reason(candidate.get_propositional_variable())
                .expect("A non-UIP literal of the current decision level is always propagated");
        }

        //the learned clause asserts the negation of the first unique implication point
        self.learned_clause.push(!uip);
        let glue = self.seen_levels.len() as u32;

        //place the asserting literal at position zero and a second-deepest-level literal at
        //position one by ordering on assignment level
        self.learned_clause.sort_unstable_by(|a, b| {
            assignments
                .get_literal_assignment_level(*b)
                .cmp(&assignments.get_literal_assignment_level(*a))
        });
        gourd_assert_moderate!(self.learned_clause[0] == !uip);

        self.minimise_learned_clause(assignments);

        let backjump_level = if self.learned_clause.len() > 1 {
            assignments.get_literal_assignment_level(self.learned_clause[1])
        } else {
            0
        };
        gourd_assert_simple!(backjump_level < assignments.get_decision_level());

        ConflictAnalysisResult {
            learned_literals: std::mem::take(&mut self.learned_clause),
            backjump_level,
            glue,
        }
    }

    /// Marks the literal as seen if it is relevant for the analysis. Returns true when the
    /// literal is assigned at the current decision level.
    fn analyse_literal(
        &mut self,
        reason_literal: Literal,
        assignments: &AssignmentsPropositional,
    ) -> bool {
        let variable = reason_literal.get_propositional_variable();
        if self.marks[variable].seen {
            return false;
        }
        //root assignments hold unconditionally and are resolved away
        if assignments.is_literal_root_assignment(reason_literal) {
            return false;
        }
        gourd_assert_moderate!(assignments.is_literal_assigned_false(reason_literal));

        let literal_level = assignments.get_variable_assignment_level(variable);
        let current_level = assignments.get_decision_level();

        //literals from previous decision levels are part of the learned clause
        if literal_level < current_level {
            self.learned_clause.push(reason_literal);
        }

        if literal_level >= self.num_seen_at_level.len() {
            self.num_seen_at_level.resize(literal_level + 1, 0);
        }
        if self.num_seen_at_level[literal_level] == 0 {
            self.seen_levels.push(literal_level);
        }
        self.num_seen_at_level[literal_level] += 1;

        self.marks[variable].seen = true;
        self.seen_literals.push(reason_literal);

        literal_level == current_level
    }

    /// Placeholder for learned-clause minimisation. The `minimised` and `poison` marks are in
    /// place for an implementation that removes implication-graph-dominated literals; until then
    /// the learned clause is kept as derived.
    fn minimise_learned_clause(&mut self, _assignments: &AssignmentsPropositional) {}

    /// Moves the variables seen during the analysis to the back of the VMTF queue, in ascending
    /// order of their current stamps, and clears their transient marks. The cursor ends up on
    /// the most recently bumped unassigned variable other than the UIP.
    ///
    /// Must be called after the driver has backtracked and asserted the learned literal, since
    /// the cursor placement depends on which of the seen variables ended up unassigned.
    pub(crate) fn bump_and_clear_seen_variables(
        &mut self,
        uip: Literal,
        vmtf_queue: &mut VmtfQueue,
        assignments: &AssignmentsPropositional,
    ) {
        let uip_variable = uip.get_propositional_variable();

        self.seen_literals
            .sort_unstable_by_key(|literal| {
                vmtf_queue.get_bump_stamp(literal.get_propositional_variable())
            });

        for index in 0..self.seen_literals.len() {
            let variable = self.seen_literals[index].get_propositional_variable();
            gourd_assert_moderate!(self.marks[variable].seen);
            self.marks[variable] = AnalysisMarks::default();

            vmtf_queue.requeue_bumped_variable(
                variable,
                assignments.is_variable_unassigned(variable),
                variable == uip_variable,
            );
        }
        self.seen_literals.clear();

        gourd_assert_extreme!(vmtf_queue.debug_check_queue_invariant());
    }

    /// Clears the per-level seen counters populated by the analysis.
    pub(crate) fn clear_seen_levels(&mut self) {
        for index in 0..self.seen_levels.len() {
            let level = self.seen_levels[index];
            self.num_seen_at_level[level] = 0;
        }
        self.seen_levels.clear();
    }
}
