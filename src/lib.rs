//! # Gourd
//! Gourd is a conflict-driven clause-learning (CDCL) SAT solver for
//! propositional formulas in DIMACS CNF format.
//!
//! The solver implements the classic CDCL loop \[1\]: breadth-first unit
//! propagation with two watched literals per clause, first-UIP conflict
//! analysis with clause learning, VMTF (variable-move-to-front) decisions,
//! restarts driven by exponential moving averages of learned-clause glue
//! \[2\], and periodic reduction of the learned-clause database based on
//! glue \[3\], size and recency.
//!
//! # Example of how to use Gourd
//!
//! ```rust
//! # use gourd_solver::engine::SatisfactionSolver;
//! # use gourd_solver::engine::SolverExecutionFlag;
//! # use gourd_solver::engine::SolverOptions;
//! # use gourd_solver::engine::variables::Literal;
//! # use gourd_solver::engine::variables::PropositionalVariable;
//! // We create a solver with default options and two variables
//! let mut solver = SatisfactionSolver::new(SolverOptions::default());
//! let x = solver.create_new_propositional_variable();
//! let y = solver.create_new_propositional_variable();
//!
//! // We add the clauses (x \/ y) and (~x \/ y)
//! let _ = solver.add_permanent_clause(vec![
//!     Literal::new(x, true),
//!     Literal::new(y, true),
//! ]);
//! let _ = solver.add_permanent_clause(vec![
//!     Literal::new(x, false),
//!     Literal::new(y, true),
//! ]);
//!
//! // Then we solve to satisfaction
//! let result = solver.solve();
//!
//! assert!(matches!(result, SolverExecutionFlag::Satisfiable));
//! assert!(solver.get_truth_value(y));
//! ```
//!
//! # Bibliography
//! \[1\] J. Marques-Silva, I. Lynce, and S. Malik, ‘Conflict-driven clause
//! learning SAT solvers’, in Handbook of satisfiability, IOS press, 2021.
//!
//! \[2\] A. Biere and A. Fröhlich, ‘Evaluating CDCL restart schemes’,
//! Proceedings of Pragmatics of SAT, pp. 1–17, 2015.
//!
//! \[3\] G. Audemard and L. Simon, ‘Predicting learnt clauses quality in
//! modern SAT solvers’, in Twenty-first international joint conference on
//! artificial intelligence, 2009.
pub mod asserts;
pub(crate) mod basic_types;
pub(crate) mod containers;
pub mod engine;
pub(crate) mod propagators;
pub mod signal_handling;
pub mod statistics;

pub use basic_types::ConstraintOperationError;
