pub(crate) mod assignments_propositional;
pub(crate) mod clause_allocator;
pub(crate) mod clause_database;
pub(crate) mod restart_strategy;
pub(crate) mod vmtf_queue;
