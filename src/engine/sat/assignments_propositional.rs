use crate::basic_types::Trail;
use crate::containers::KeyedVec;
use crate::engine::sat::clause_allocator::ClauseReference;
use crate::engine::variables::Literal;
use crate::engine::variables::PropositionalVariable;
use crate::gourd_assert_moderate;
use crate::gourd_assert_simple;

/// The current partial assignment: per-variable truth value, decision level and reason, the trail
/// of assigned literals in assignment order, and the saved phases used to pick the polarity of
/// future decisions.
#[derive(Default)]
pub(crate) struct AssignmentsPropositional {
    assignment_info: KeyedVec<PropositionalVariable, PropositionalAssignmentInfo>,
    /// The polarity the variable had when it was last assigned. Decisions reuse it, so the
    /// search returns to the part of the space it was exploring before a restart.
    saved_phases: KeyedVec<PropositionalVariable, bool>,
    trail: Trail<Literal>,
    /// The number of variables assigned at the root level; these assignments are never undone.
    num_fixed_variables: u64,
}

impl AssignmentsPropositional {
    pub(crate) fn grow(&mut self) {
        let _ = self
            .assignment_info
            .push(PropositionalAssignmentInfo::Unassigned);
        //the initial phase preference is the negative polarity
        let _ = self.saved_phases.push(false);
    }

    pub(crate) fn num_propositional_variables(&self) -> u32 {
        self.assignment_info.len() as u32
    }

    pub(crate) fn increase_decision_level(&mut self) {
        self.trail.increase_decision_level()
    }

    pub(crate) fn get_decision_level(&self) -> usize {
        self.trail.get_decision_level()
    }

    pub(crate) fn num_trail_entries(&self) -> usize {
        self.trail.len()
    }

    pub(crate) fn get_trail_entry(&self, index: usize) -> Literal {
        self.trail[index]
    }

    /// The decision literal of `decision_level`, i.e., the first literal placed on the trail at
    /// that level.
    pub(crate) fn get_decision_literal(&self, decision_level: usize) -> Literal {
        self.trail[self.trail.start_of_level(decision_level)]
    }

    pub(crate) fn num_fixed_variables(&self) -> u64 {
        self.num_fixed_variables
    }

    pub(crate) fn get_saved_phase(&self, variable: PropositionalVariable) -> bool {
        self.saved_phases[variable]
    }

    pub(crate) fn is_variable_assigned_true(&self, variable: PropositionalVariable) -> bool {
        match self.assignment_info[variable] {
            PropositionalAssignmentInfo::Assigned { truth_value, .. } => truth_value,
            PropositionalAssignmentInfo::Unassigned => false,
        }
    }

    pub(crate) fn is_variable_assigned_false(&self, variable: PropositionalVariable) -> bool {
        match self.assignment_info[variable] {
            PropositionalAssignmentInfo::Assigned { truth_value, .. } => !truth_value,
            PropositionalAssignmentInfo::Unassigned => false,
        }
    }

    pub(crate) fn is_literal_assigned_true(&self, literal: Literal) -> bool {
        if literal.is_positive() {
            self.is_variable_assigned_true(literal.get_propositional_variable())
        } else {
            self.is_variable_assigned_false(literal.get_propositional_variable())
        }
    }

    pub(crate) fn is_literal_assigned_false(&self, literal: Literal) -> bool {
        self.is_literal_assigned(literal) && !self.is_literal_assigned_true(literal)
    }

    pub(crate) fn is_literal_assigned(&self, literal: Literal) -> bool {
        self.is_variable_assigned(literal.get_propositional_variable())
    }

    pub(crate) fn is_literal_unassigned(&self, literal: Literal) -> bool {
        self.is_variable_unassigned(literal.get_propositional_variable())
    }

    pub(crate) fn is_variable_unassigned(&self, variable: PropositionalVariable) -> bool {
        self.assignment_info[variable] == PropositionalAssignmentInfo::Unassigned
    }

    pub(crate) fn is_variable_assigned(&self, variable: PropositionalVariable) -> bool {
        self.assignment_info[variable] != PropositionalAssignmentInfo::Unassigned
    }

    pub(crate) fn is_literal_root_assignment(&self, literal: Literal) -> bool {
        if self.is_literal_unassigned(literal) {
            false
        } else {
            self.get_variable_assignment_level(literal.get_propositional_variable()) == 0
        }
    }

    /// True when the literal holds unconditionally, i.e., it is true under the current assignment
    /// and was assigned at the root level.
    pub(crate) fn is_literal_fixed_true(&self, literal: Literal) -> bool {
        self.is_literal_assigned_true(literal) && self.is_literal_root_assignment(literal)
    }

    pub(crate) fn get_variable_assignment_level(&self, variable: PropositionalVariable) -> usize {
        match self.assignment_info[variable] {
            PropositionalAssignmentInfo::Unassigned => {
                panic!("Unassigned variables do not have assignment levels");
            }
            PropositionalAssignmentInfo::Assigned { decision_level, .. } => decision_level,
        }
    }

    pub(crate) fn get_literal_assignment_level(&self, literal: Literal) -> usize {
        self.get_variable_assignment_level(literal.get_propositional_variable())
    }

    /// The clause that propagated the variable, or [`None`] for decisions and assignments made
    /// directly at the root.
    pub(crate) fn get_variable_reason(
        &self,
        variable: PropositionalVariable,
    ) -> Option<ClauseReference> {
        match self.assignment_info[variable] {
            PropositionalAssignmentInfo::Unassigned => {
                panic!("Unassigned variables do not have reasons");
            }
            PropositionalAssignmentInfo::Assigned { reason, .. } => reason,
        }
    }

    fn make_assignment(&mut self, true_literal: Literal, reason: Option<ClauseReference>) {
        gourd_assert_simple!(self.is_literal_unassigned(true_literal));

        let variable = true_literal.get_propositional_variable();
        self.assignment_info[variable] = PropositionalAssignmentInfo::Assigned {
            truth_value: true_literal.is_positive(),
            decision_level: self.get_decision_level(),
            reason,
        };
        self.saved_phases[variable] = true_literal.is_positive();

        if self.get_decision_level() == 0 {
            self.num_fixed_variables += 1;
        }

        self.trail.push(true_literal);
    }

    pub(crate) fn enqueue_decision_literal(&mut self, decision_literal: Literal) {
        self.make_assignment(decision_literal, None);
    }

    pub(crate) fn enqueue_propagated_literal(
        &mut self,
        propagated_literal: Literal,
        reason: ClauseReference,
    ) {
        self.make_assignment(propagated_literal, Some(reason));
    }

    /// Backtracks to `new_decision_level` and returns the unassigned literals in _reverse_
    /// assignment order (LIFO). The saved phases of the popped variables are kept.
    pub(crate) fn synchronise(
        &mut self,
        new_decision_level: usize,
    ) -> impl Iterator<Item = Literal> + '_ {
        gourd_assert_simple!(new_decision_level < self.get_decision_level());
        self.trail.synchronise(new_decision_level).inspect(|entry| {
            let variable = entry.get_propositional_variable();
            gourd_assert_moderate!(
                self.assignment_info[variable] != PropositionalAssignmentInfo::Unassigned
            );
            self.assignment_info[variable] = PropositionalAssignmentInfo::Unassigned;
        })
    }

    pub(crate) fn is_at_the_root_level(&self) -> bool {
        self.get_decision_level() == 0
    }
}

#[derive(PartialEq, Clone, Copy, Default, Debug)]
enum PropositionalAssignmentInfo {
    Assigned {
        truth_value: bool,
        decision_level: usize,
        reason: Option<ClauseReference>,
    },
    #[default]
    Unassigned,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignments_with_variables(num_variables: u32) -> AssignmentsPropositional {
        let mut assignments = AssignmentsPropositional::default();
        //the zero index is reserved
        for _ in 0..=num_variables {
            assignments.grow();
        }
        assignments
    }

    #[test]
    fn assigned_literals_are_true_and_their_negations_false() {
        let mut assignments = assignments_with_variables(2);
        let literal = Literal::new(PropositionalVariable::new(1), true);

        assignments.enqueue_decision_literal(literal);

        assert!(assignments.is_literal_assigned_true(literal));
        assert!(assignments.is_literal_assigned_false(!literal));
        assert_eq!(1, assignments.num_trail_entries());
    }

    #[test]
    fn root_assignments_are_counted_as_fixed() {
        let mut assignments = assignments_with_variables(2);
        let literal = Literal::new(PropositionalVariable::new(1), false);

        assignments.enqueue_decision_literal(literal);
        assert_eq!(1, assignments.num_fixed_variables());
        assert!(assignments.is_literal_fixed_true(literal));

        assignments.increase_decision_level();
        let other = Literal::new(PropositionalVariable::new(2), true);
        assignments.enqueue_decision_literal(other);
        assert_eq!(1, assignments.num_fixed_variables());
        assert!(!assignments.is_literal_fixed_true(other));
    }

    #[test]
    fn backtracking_unassigns_but_keeps_the_saved_phase() {
        let mut assignments = assignments_with_variables(1);
        let variable = PropositionalVariable::new(1);
        let literal = Literal::new(variable, true);

        assignments.increase_decision_level();
        assignments.enqueue_decision_literal(literal);

        let popped = assignments.synchronise(0).collect::<Vec<_>>();
        assert_eq!(vec![literal], popped);
        assert!(assignments.is_variable_unassigned(variable));
        assert!(assignments.get_saved_phase(variable));
    }

    #[test]
    fn the_decision_literal_is_the_first_literal_of_its_level() {
        let mut assignments = assignments_with_variables(2);
        let decision = Literal::new(PropositionalVariable::new(1), false);

        assignments.increase_decision_level();
        assignments.enqueue_decision_literal(decision);
        assignments.enqueue_decision_literal(Literal::new(PropositionalVariable::new(2), true));

        assert_eq!(decision, assignments.get_decision_literal(1));
    }
}
