use crate::containers::KeyedVec;
use crate::engine::sat::assignments_propositional::AssignmentsPropositional;
use crate::engine::variables::PropositionalVariable;
use crate::gourd_assert_moderate;

/// The variable-move-to-front decision queue: a doubly-linked list of all variables ordered by
/// their bump time stamps, together with a search cursor.
///
/// The cursor invariant is that every variable strictly after the cursor in the queue is
/// currently assigned, so the next decision variable is found by walking backwards from the
/// cursor instead of rescanning from the head.
pub(crate) struct VmtfQueue {
    entries: KeyedVec<PropositionalVariable, VmtfEntry>,
    first: Option<PropositionalVariable>,
    last: Option<PropositionalVariable>,
    /// All variables strictly after this one in the queue are assigned.
    next_search: PropositionalVariable,
    /// Total number of stamps handed out; doubles as the source of fresh time stamps.
    num_bumped: u64,
    num_searched: u64,
}

impl Default for VmtfQueue {
    fn default() -> Self {
        VmtfQueue {
            entries: KeyedVec::default(),
            first: None,
            last: None,
            //points at the reserved variable until the first real variable is added
            next_search: PropositionalVariable::new(0),
            num_bumped: 0,
            num_searched: 0,
        }
    }
}

#[derive(Default, Clone, Copy, Debug)]
struct VmtfEntry {
    bumped: u64,
    prev: Option<PropositionalVariable>,
    next: Option<PropositionalVariable>,
}

impl VmtfQueue {
    /// Adds the next variable at the back of the queue with a fresh stamp and places the cursor
    /// on it. Called once per variable in ascending order during initialisation, so the first
    /// decision picks the variable with the greatest index.
    pub(crate) fn grow(&mut self) {
        let variable = self.entries.push(VmtfEntry::default());
        if variable.get_index() == 0 {
            //the reserved zero index never enters the queue
            return;
        }
        self.enqueue(variable);
        self.num_bumped += 1;
        self.entries[variable].bumped = self.num_bumped;
        self.next_search = variable;
    }

    pub(crate) fn get_bump_stamp(&self, variable: PropositionalVariable) -> u64 {
        self.entries[variable].bumped
    }

    pub(crate) fn num_bumped(&self) -> u64 {
        self.num_bumped
    }

    pub(crate) fn num_searched(&self) -> u64 {
        self.num_searched
    }

    /// Walks backwards from the cursor until an unassigned variable is found, advancing the
    /// cursor along the way.
    pub(crate) fn next_decision_variable(
        &mut self,
        assignments: &AssignmentsPropositional,
    ) -> PropositionalVariable {
        let mut cursor = self.next_search;
        while assignments.is_variable_assigned(cursor) {
            cursor = self.entries[cursor]
                .prev
                .expect("The queue holds an unassigned variable whenever a decision is needed");
            self.num_searched += 1;
        }
        self.next_search = cursor;
        cursor
    }

    /// Restores the cursor invariant after `variable` has been unassigned: a variable with a
    /// stamp above the cursor's must itself become the cursor.
    pub(crate) fn on_unassign(&mut self, variable: PropositionalVariable) {
        if self.entries[variable].bumped > self.entries[self.next_search].bumped {
            self.next_search = variable;
        }
    }

    /// Moves a variable seen during conflict analysis to the back of the queue with a fresh
    /// stamp. `is_uip` marks the variable the learned clause asserts; it is excluded from
    /// becoming the cursor since the driver assigns it right after analysis.
    pub(crate) fn requeue_bumped_variable(
        &mut self,
        variable: PropositionalVariable,
        is_unassigned: bool,
        is_uip: bool,
    ) {
        if self.entries[variable].next.is_none() {
            //already at the back of the queue, the stamp stays as it is
            return;
        }

        if self.next_search == variable {
            self.next_search = match self.entries[variable].prev {
                Some(prev) => prev,
                None => self.entries[variable]
                    .next
                    .expect("A variable that is not last has a successor"),
            };
        }

        self.dequeue(variable);
        self.enqueue(variable);
        self.num_bumped += 1;
        self.entries[variable].bumped = self.num_bumped;

        if !is_uip && is_unassigned {
            self.next_search = variable;
        }
    }

    fn dequeue(&mut self, variable: PropositionalVariable) {
        let entry = self.entries[variable];
        match entry.prev {
            Some(prev) => self.entries[prev].next = entry.next,
            None => self.first = entry.next,
        }
        match entry.next {
            Some(next) => self.entries[next].prev = entry.prev,
            None => self.last = entry.prev,
        }
    }

    fn enqueue(&mut self, variable: PropositionalVariable) {
        self.entries[variable].prev = self.last;
        self.entries[variable].next = None;
        match self.last {
            Some(last) => self.entries[last].next = Some(variable),
            None => self.first = Some(variable),
        }
        self.last = Some(variable);
    }

    /// Walks the queue from front to back, checking that every variable occurs exactly once and
    /// that the stamps strictly increase.
    pub(crate) fn debug_check_queue_invariant(&self) -> bool {
        let mut count = 0;
        let mut cursor = self.first;
        let mut previous_stamp = 0;
        while let Some(variable) = cursor {
            count += 1;
            gourd_assert_moderate!(self.entries[variable].bumped > previous_stamp);
            previous_stamp = self.entries[variable].bumped;
            cursor = self.entries[variable].next;
        }
        count == self.entries.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_with_variables(num_variables: u32) -> (VmtfQueue, AssignmentsPropositional) {
        let mut queue = VmtfQueue::default();
        let mut assignments = AssignmentsPropositional::default();
        //the zero index is reserved
        for _ in 0..=num_variables {
            queue.grow();
            assignments.grow();
        }
        (queue, assignments)
    }

    #[test]
    fn the_first_decision_is_the_greatest_variable() {
        let (mut queue, assignments) = queue_with_variables(4);
        assert!(queue.debug_check_queue_invariant());

        let decision = queue.next_decision_variable(&assignments);
        assert_eq!(PropositionalVariable::new(4), decision);
    }

    #[test]
    fn the_cursor_skips_assigned_variables() {
        let (mut queue, mut assignments) = queue_with_variables(3);
        let v3 = PropositionalVariable::new(3);
        let v2 = PropositionalVariable::new(2);

        assignments.enqueue_decision_literal(crate::engine::variables::Literal::new(v3, true));
        assert_eq!(v2, queue.next_decision_variable(&assignments));
        assert_eq!(1, queue.num_searched());
    }

    #[test]
    fn requeued_variables_move_to_the_back_with_fresh_stamps() {
        let (mut queue, assignments) = queue_with_variables(3);
        let v1 = PropositionalVariable::new(1);

        let stamp_before = queue.get_bump_stamp(v1);
        queue.requeue_bumped_variable(v1, true, false);

        assert!(queue.get_bump_stamp(v1) > stamp_before);
        assert!(queue.debug_check_queue_invariant());
        //the unassigned requeued variable becomes the cursor
        assert_eq!(v1, queue.next_decision_variable(&assignments));
    }

    #[test]
    fn requeueing_the_last_variable_keeps_its_stamp() {
        let (mut queue, _assignments) = queue_with_variables(3);
        let v3 = PropositionalVariable::new(3);

        let stamp_before = queue.get_bump_stamp(v3);
        queue.requeue_bumped_variable(v3, true, false);

        assert_eq!(stamp_before, queue.get_bump_stamp(v3));
        assert!(queue.debug_check_queue_invariant());
    }

    #[test]
    fn unassignment_moves_the_cursor_to_more_recently_bumped_variables() {
        let (mut queue, mut assignments) = queue_with_variables(3);
        let v1 = PropositionalVariable::new(1);
        let v3 = PropositionalVariable::new(3);

        //bump v1 to the back, then assign it
        queue.requeue_bumped_variable(v1, true, false);
        assignments.increase_decision_level();
        assignments.enqueue_decision_literal(crate::engine::variables::Literal::new(v1, true));
        //the cursor moves backwards past v1 when deciding
        let _ = queue.next_decision_variable(&assignments);
        assert_eq!(v3, queue.next_decision_variable(&assignments));

        //after unassigning v1 the cursor must move back to it
        let _ = assignments.synchronise(0).collect::<Vec<_>>();
        queue.on_unassign(v1);
        assert_eq!(v1, queue.next_decision_variable(&assignments));
    }
}
