use crate::engine::sat::assignments_propositional::AssignmentsPropositional;
use crate::engine::sat::clause_allocator::ClauseAllocator;
use crate::engine::sat::clause_allocator::ClauseReference;
use crate::engine::variables::Literal;
use crate::gourd_assert_moderate;
use crate::gourd_assert_simple;

/// Unit propagation over the trail with two watched literals per clause.
///
/// Each watcher caches the other watched literal (the blocking literal) and the clause size at
/// registration time. A true blocking literal lets the sweep skip the clause without touching its
/// memory, and a cached size of two resolves binary clauses from the watcher alone.
#[derive(Default)]
pub(crate) struct ClausalPropagator {
    watch_lists: Vec<Vec<ClauseWatcher>>,
    next_position_on_trail_to_propagate: usize,
    num_propagations: u64,
}

impl ClausalPropagator {
    pub(crate) fn grow(&mut self) {
        //increase the watch list, once for each polarity
        self.watch_lists.push(vec![]);
        self.watch_lists.push(vec![]);
    }

    pub(crate) fn start_watching_clause_unchecked(
        &mut self,
        clause_reference: ClauseReference,
        clause_allocator: &ClauseAllocator,
    ) {
        let clause = clause_allocator.get_clause(clause_reference);
        gourd_assert_simple!(clause.len() >= 2);

        self.watch_lists[clause[0]].push(ClauseWatcher {
            cached_literal: clause[1],
            cached_size: clause.len(),
            clause_reference,
        });

        self.watch_lists[clause[1]].push(ClauseWatcher {
            cached_literal: clause[0],
            cached_size: clause.len(),
            clause_reference,
        });
    }

    /// Propagates all literals on the trail that have not been propagated yet. On conflict the
    /// reference of the falsified clause is returned and the remaining watches are left intact.
    pub(crate) fn propagate(
        &mut self,
        assignments: &mut AssignmentsPropositional,
        clause_allocator: &mut ClauseAllocator,
    ) -> Result<(), ClauseReference> {
        //this function is implemented as one long function
        //  dividing this function into several smaller functions would normally make sense for
        //  readability, however this is a performance hotspot, so the decision was to keep one
        //  long function
        while self.next_position_on_trail_to_propagate < assignments.num_trail_entries() {
            let true_literal =
                assignments.get_trail_entry(self.next_position_on_trail_to_propagate);
            self.next_position_on_trail_to_propagate += 1;
            self.num_propagations += 1;
            gourd_assert_simple!(assignments.is_literal_assigned_true(true_literal));

            //go through the watches of the falsified literal one by one and insert them back as
            //indicated; watchers whose clause migrated to a new watched literal are dropped
            //if a conflict takes place, put back the remaining watchers and report the conflict
            let mut end_index: usize = 0;
            let mut current_index: usize = 0;
            while current_index < self.watch_lists[!true_literal].len() {
                //inspect if the cached literal is already set to true
                //if so, no need to go further in the memory to check the clause
                //often this literal will be true in practice so it is a good heuristic to check
                let watcher = self.watch_lists[!true_literal][current_index];
                if assignments.is_literal_assigned_true(watcher.cached_literal) {
                    //keep the watcher, the clause is satisfied, no propagation can take place
                    self.watch_lists[!true_literal][end_index] = watcher;
                    current_index += 1;
                    end_index += 1;
                    continue;
                }

                //binary clauses are resolved from the watcher alone: the cached literal is the
                //only other literal of the clause
                if watcher.cached_size == 2 {
                    if assignments.is_literal_assigned_false(watcher.cached_literal) {
                        //conflict detected, stop any further propagation
                        //readd this watcher and the remaining watchers to the watch list
                        while current_index < self.watch_lists[!true_literal].len() {
                            self.watch_lists[!true_literal][end_index] =
                                self.watch_lists[!true_literal][current_index];
                            current_index += 1;
                            end_index += 1;
                        }
                        self.watch_lists[!true_literal].truncate(end_index);
                        return Err(watcher.clause_reference);
                    }
                    assignments
                        .enqueue_propagated_literal(watcher.cached_literal, watcher.clause_reference);
                    //keep the watcher
                    self.watch_lists[!true_literal][end_index] = watcher;
                    current_index += 1;
                    end_index += 1;
                    continue;
                }

                let watched_clause = clause_allocator.get_mutable_clause(watcher.clause_reference);
                gourd_assert_moderate!(watched_clause.len() == watcher.cached_size);

                //standard clause propagation starts here

                //place the falsified literal at position 1 for simplicity
                if watched_clause[0] == !true_literal {
                    let other = watched_clause[1];
                    watched_clause[0] = other;
                    watched_clause[1] = !true_literal;
                }
                gourd_assert_moderate!(watched_clause[1] == !true_literal);

                //check the other watched literal to see if the clause is already satisfied
                if assignments.is_literal_assigned_true(watched_clause[0]) {
                    //take the true literal as the new cached literal
                    //keep the watcher, the clause is satisfied, no propagation can take place
                    self.watch_lists[!true_literal][end_index] = ClauseWatcher {
                        cached_literal: watched_clause[0],
                        ..watcher
                    };
                    current_index += 1;
                    end_index += 1;
                    continue;
                }

                //look for another nonfalsified literal to replace one of the watched literals
                let mut found_new_watch = false;
                let mut found_true_literal = false;
                //start from index 2 since we are skipping watched literals
                for i in 2..watched_clause.len() {
                    if assignments.is_literal_assigned_false(watched_clause[i]) {
                        continue;
                    }
                    if assignments.is_literal_assigned_true(watched_clause[i]) {
                        //the clause is satisfied; keep the watcher but remember the true literal
                        //so that the next visit skips the clause cheaply
                        self.watch_lists[!true_literal][end_index] = ClauseWatcher {
                            cached_literal: watched_clause[i],
                            ..watcher
                        };
                        found_true_literal = true;
                        break;
                    }
                    //replace the watched literal, add the clause to the watch list of the new
                    //watcher literal
                    watched_clause[1] = watched_clause[i];
                    watched_clause[i] = !true_literal;

                    let new_watched_literal = watched_clause[1];
                    let cached_literal = watched_clause[0];
                    self.watch_lists[new_watched_literal].push(ClauseWatcher {
                        cached_literal,
                        ..watcher
                    });

                    found_new_watch = true;
                    break;
                }

                if found_true_literal {
                    current_index += 1;
                    end_index += 1;
                    continue;
                }

                if found_new_watch {
                    //note this clause is effectively removed from the watch list of true_literal,
                    //since we are only incrementing the current index, and not copying anything to
                    //the end_index location
                    current_index += 1;
                    continue;
                }

                //keep the current watch for this literal
                self.watch_lists[!true_literal][end_index] = watcher;
                end_index += 1;
                current_index += 1;

                //at this point, nonwatched literals and literal[1] are assigned false. There are
                //two scenarios:
                //	watched_clause[0] is unassigned -> propagate the literal to true
                //	watched_clause[0] is assigned false -> conflict
                let propagated_literal = clause_allocator.get_clause(watcher.clause_reference)[0];
                if assignments.is_literal_unassigned(propagated_literal) {
                    assignments
                        .enqueue_propagated_literal(propagated_literal, watcher.clause_reference);
                } else {
                    //conflict detected, stop any further propagation and report the conflict
                    //readd the remaining watchers to the watch list
                    while current_index < self.watch_lists[!true_literal].len() {
                        self.watch_lists[!true_literal][end_index] =
                            self.watch_lists[!true_literal][current_index];
                        current_index += 1;
                        end_index += 1;
                    }
                    self.watch_lists[!true_literal].truncate(end_index);
                    return Err(watcher.clause_reference);
                }
            }
            self.watch_lists[!true_literal].truncate(end_index);
        }
        Ok(())
    }

    pub(crate) fn synchronise(&mut self, trail_size: usize) {
        gourd_assert_simple!(self.next_position_on_trail_to_propagate >= trail_size);
        self.next_position_on_trail_to_propagate = trail_size;
    }

    pub(crate) fn is_propagation_complete(&self, trail_size: usize) -> bool {
        self.next_position_on_trail_to_propagate == trail_size
    }

    pub(crate) fn num_propagations(&self) -> u64 {
        self.num_propagations
    }

    /// Rewrites every watch list in place, dropping watchers of garbage clauses. The watch lists
    /// of root-fixed variables are emptied entirely since their literals can never propagate
    /// again.
    pub(crate) fn flush_garbage_watches(
        &mut self,
        clause_allocator: &ClauseAllocator,
        assignments: &AssignmentsPropositional,
    ) {
        for literal_code in 2..self.watch_lists.len() {
            let literal = Literal::u32_to_literal(literal_code as u32);
            if assignments.is_literal_root_assignment(literal) {
                self.watch_lists[literal].clear();
                continue;
            }
            let mut end_index = 0;
            let mut current_index = 0;
            while current_index < self.watch_lists[literal].len() {
                let watcher = self.watch_lists[literal][current_index];
                if !clause_allocator.get_clause(watcher.clause_reference).is_garbage() {
                    self.watch_lists[literal][end_index] = watcher;
                    end_index += 1;
                }
                current_index += 1;
            }
            self.watch_lists[literal].truncate(end_index);
        }
    }
}

#[derive(Clone, Copy)]
struct ClauseWatcher {
    /// If the cached literal is true the clause is satisfied and need not be visited.
    cached_literal: Literal,
    /// The clause size at registration; a size of two means the clause is binary and can be
    /// resolved without dereferencing the clause at all.
    cached_size: u32,
    clause_reference: ClauseReference,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::variables::PropositionalVariable;

    struct TestSetup {
        assignments: AssignmentsPropositional,
        clause_allocator: ClauseAllocator,
        propagator: ClausalPropagator,
    }

    fn setup(num_variables: u32) -> TestSetup {
        let mut assignments = AssignmentsPropositional::default();
        let mut propagator = ClausalPropagator::default();
        //the zero index is reserved
        for _ in 0..=num_variables {
            assignments.grow();
            propagator.grow();
        }
        TestSetup {
            assignments,
            clause_allocator: ClauseAllocator::default(),
            propagator,
        }
    }

    fn positive_literal(index: u32) -> Literal {
        Literal::new(PropositionalVariable::new(index), true)
    }

    #[test]
    fn a_binary_clause_propagates_its_other_literal() {
        let mut test = setup(2);
        let clause_reference = test.clause_allocator.create_clause(
            vec![positive_literal(1), positive_literal(2)],
            false,
            2,
            0,
        );
        test.propagator
            .start_watching_clause_unchecked(clause_reference, &test.clause_allocator);

        test.assignments.enqueue_decision_literal(!positive_literal(1));
        let result = test
            .propagator
            .propagate(&mut test.assignments, &mut test.clause_allocator);

        assert!(result.is_ok());
        assert!(test.assignments.is_literal_assigned_true(positive_literal(2)));
        assert_eq!(
            Some(clause_reference),
            test.assignments
                .get_variable_reason(PropositionalVariable::new(2))
        );
    }

    #[test]
    fn a_falsified_binary_clause_is_reported_as_conflict() {
        let mut test = setup(2);
        let clause_reference = test.clause_allocator.create_clause(
            vec![positive_literal(1), positive_literal(2)],
            false,
            2,
            0,
        );
        test.propagator
            .start_watching_clause_unchecked(clause_reference, &test.clause_allocator);

        test.assignments.enqueue_decision_literal(!positive_literal(1));
        test.assignments.enqueue_decision_literal(!positive_literal(2));
        let result = test
            .propagator
            .propagate(&mut test.assignments, &mut test.clause_allocator);

        assert_eq!(Err(clause_reference), result);
    }

    #[test]
    fn a_clause_with_a_single_unassigned_literal_propagates() {
        let mut test = setup(3);
        let clause_reference = test.clause_allocator.create_clause(
            vec![positive_literal(1), positive_literal(2), positive_literal(3)],
            false,
            3,
            0,
        );
        test.propagator
            .start_watching_clause_unchecked(clause_reference, &test.clause_allocator);

        test.assignments.enqueue_decision_literal(!positive_literal(1));
        test.assignments.enqueue_decision_literal(!positive_literal(3));
        let result = test
            .propagator
            .propagate(&mut test.assignments, &mut test.clause_allocator);

        assert!(result.is_ok());
        assert!(test.assignments.is_literal_assigned_true(positive_literal(2)));
    }

    #[test]
    fn the_watch_migrates_to_an_unassigned_literal() {
        let mut test = setup(3);
        let clause_reference = test.clause_allocator.create_clause(
            vec![positive_literal(1), positive_literal(2), positive_literal(3)],
            false,
            3,
            0,
        );
        test.propagator
            .start_watching_clause_unchecked(clause_reference, &test.clause_allocator);

        test.assignments.enqueue_decision_literal(!positive_literal(2));
        let result = test
            .propagator
            .propagate(&mut test.assignments, &mut test.clause_allocator);

        assert!(result.is_ok());
        //nothing is propagated, the clause still has two non-false literals
        assert!(test.assignments.is_literal_unassigned(positive_literal(1)));
        assert!(test.assignments.is_literal_unassigned(positive_literal(3)));
        //the falsified literal is no longer watched
        assert!(test.propagator.watch_lists[positive_literal(2)].is_empty());
        //the replacement literal is watched instead
        assert_eq!(1, test.propagator.watch_lists[positive_literal(3)].len());
        //position 1 of the clause now holds the replacement watched literal
        let clause = test.clause_allocator.get_clause(clause_reference);
        assert_eq!(positive_literal(3), clause[1]);
    }

    #[test]
    fn a_fully_falsified_clause_is_reported_as_conflict() {
        let mut test = setup(3);
        let clause_reference = test.clause_allocator.create_clause(
            vec![positive_literal(1), positive_literal(2), positive_literal(3)],
            false,
            3,
            0,
        );
        test.propagator
            .start_watching_clause_unchecked(clause_reference, &test.clause_allocator);

        test.assignments.enqueue_decision_literal(!positive_literal(1));
        test.assignments.enqueue_decision_literal(!positive_literal(3));
        test.assignments.enqueue_decision_literal(!positive_literal(2));

        //propagating assigns nothing; the last decision falsifies the clause completely since
        //the propagation of literal 2 had made the clause unit for literal 2's variable already
        let result = test
            .propagator
            .propagate(&mut test.assignments, &mut test.clause_allocator);

        assert_eq!(Err(clause_reference), result);
    }

    #[test]
    fn garbage_watches_are_flushed() {
        let mut test = setup(3);
        let kept = test.clause_allocator.create_clause(
            vec![positive_literal(1), positive_literal(2)],
            false,
            2,
            0,
        );
        let garbage = test.clause_allocator.create_clause(
            vec![positive_literal(1), positive_literal(3)],
            true,
            2,
            0,
        );
        test.propagator
            .start_watching_clause_unchecked(kept, &test.clause_allocator);
        test.propagator
            .start_watching_clause_unchecked(garbage, &test.clause_allocator);

        test.clause_allocator.get_mutable_clause(garbage).mark_garbage();
        test.propagator
            .flush_garbage_watches(&test.clause_allocator, &test.assignments);

        assert_eq!(1, test.propagator.watch_lists[positive_literal(1)].len());
        assert!(test.propagator.watch_lists[positive_literal(3)].is_empty());
    }
}
