//! A parser for the DIMACS CNF file format. Given that DIMACS files can be very large, the
//! implementation reads the file in chunks and re-uses its buffers rather than allocating for
//! every encountered clause.
//!
//! The parser operates on a type that implements the [`DimacsSink`] trait, which serves as the
//! interface to the consumer of the parsed clauses.

use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::num::NonZeroI32;
use std::str::FromStr;

use gourd_solver::engine::variables::Literal;
use gourd_solver::engine::variables::PropositionalVariable;
use gourd_solver::engine::SatisfactionSolver;
use thiserror::Error;

use crate::SolverArgs;

/// A dimacs sink stores a set of clauses and allows for new variables to be created.
pub(crate) trait DimacsSink {
    /// The arguments to the dimacs sink.
    type ConstructorArgs;

    /// The underlying formula type.
    type Formula;

    /// Create an empty formula over `num_variables` variables.
    fn empty(args: Self::ConstructorArgs, num_variables: usize) -> Self;

    /// Add a new clause to the formula. Consistency does not have to be checked at every
    /// insertion; the sink may resolve it lazily.
    fn add_clause(&mut self, clause: &[NonZeroI32]);

    /// Take the collected clauses and turn them into the underlying formula type.
    fn into_formula(self) -> Self::Formula;
}

#[derive(Debug, Error)]
pub(crate) enum DimacsParseError {
    #[error("failed to read file")]
    Io(#[from] std::io::Error),

    #[error("missing dimacs header")]
    MissingHeader,

    #[error("'{0}' is an invalid header")]
    InvalidHeader(String),

    #[error("multiple dimacs headers found")]
    DuplicateHeader,

    #[error("unexpected character '{0}' on line {1}")]
    UnexpectedCharacter(char, usize),

    #[error("'{0}' on line {1} is an invalid DIMACS literal")]
    InvalidLiteral(String, usize),

    #[error("literal {0} on line {1} exceeds the maximum variable {2}")]
    LiteralOutOfBounds(i32, usize, usize),

    #[error("the last clause in the source is not terminated with a '0'")]
    UnterminatedClause,

    #[error("expected to parse {expected} clauses, but parsed {parsed}")]
    IncorrectClauseCount { expected: usize, parsed: usize },
}

pub(crate) fn parse_cnf<Sink: DimacsSink>(
    source: impl Read,
    sink_constructor_args: Sink::ConstructorArgs,
) -> Result<Sink::Formula, DimacsParseError> {
    let mut reader = BufReader::new(source);
    let mut parser = DimacsParser::<Sink>::new(sink_constructor_args);

    loop {
        let num_bytes = {
            let data = reader.fill_buf()?;

            if data.is_empty() {
                return parser.complete();
            }

            parser.parse_chunk(data)?;
            data.len()
        };

        reader.consume(num_bytes);
    }
}

/// The core DIMACS parser: a state machine over the raw bytes which may enter and leave a chunk
/// in the middle of a clause, header or comment.
struct DimacsParser<Sink: DimacsSink> {
    sink_constructor_args: Option<Sink::ConstructorArgs>,
    sink: Option<Sink>,
    header: Option<CnfHeader>,
    buffer: String,
    clause: Vec<NonZeroI32>,
    state: ParseState,
    parsed_clauses: usize,
    line: usize,
}

enum ParseState {
    StartLine,
    Header,
    Comment,
    Literal,
    NegativeLiteral,
    Clause,
}

impl<Sink: DimacsSink> DimacsParser<Sink> {
    fn new(sink_constructor_args: Sink::ConstructorArgs) -> Self {
        DimacsParser {
            sink_constructor_args: Some(sink_constructor_args),
            sink: None,
            header: None,
            buffer: String::new(),
            clause: vec![],
            state: ParseState::StartLine,
            parsed_clauses: 0,
            line: 1,
        }
    }

    /// Parse the next chunk of bytes. This may start in the middle of parsing a clause or file
    /// header, and may end in such a state as well.
    fn parse_chunk(&mut self, chunk: &[u8]) -> Result<(), DimacsParseError> {
        for byte in chunk {
            match self.state {
                ParseState::StartLine => match byte {
                    b if b.is_ascii_whitespace() => {} // Continue consuming whitespace.

                    b'p' => {
                        self.state = ParseState::Header;
                        self.buffer.clear();
                        self.buffer.push('p');
                    }

                    b'c' => {
                        self.state = ParseState::Comment;
                    }

                    b @ b'1'..=b'9' => {
                        self.start_literal(b, true);
                    }

                    // Covers the exotic case of having an empty clause in the dimacs file.
                    b'0' => self.finish_clause()?,

                    b'-' => self.start_literal(&b'-', false),

                    b => return Err(DimacsParseError::UnexpectedCharacter(*b as char, self.line)),
                },

                ParseState::Header => match byte {
                    b'\n' => {
                        self.init_formula()?;
                        self.state = ParseState::StartLine;
                    }

                    b => self.buffer.push(*b as char),
                },

                ParseState::Comment => {
                    // Ignore all other bytes until we find a new-line, at which point the comment
                    // ends.
                    if *byte == b'\n' {
                        self.state = ParseState::StartLine;
                    }
                }

                ParseState::Literal => match byte {
                    b if b.is_ascii_whitespace() => {
                        self.finish_literal()?;
                    }

                    b @ b'0'..=b'9' => self.buffer.push(*b as char),

                    b => return Err(DimacsParseError::UnexpectedCharacter(*b as char, self.line)),
                },

                ParseState::NegativeLiteral => match byte {
                    b @ b'1'..=b'9' => {
                        self.buffer.push(*b as char);
                        self.state = ParseState::Literal;
                    }

                    b => return Err(DimacsParseError::UnexpectedCharacter(*b as char, self.line)),
                },

                ParseState::Clause => match byte {
                    b'0' => self.finish_clause()?,

                    // When a new-line is encountered, it does not mean the clause is terminated;
                    // the clause buffer is kept so the clause continues on the next line. The
                    // state switches to StartLine to handle comments and leading whitespace.
                    b'\n' => self.state = ParseState::StartLine,
                    b if b.is_ascii_whitespace() => {} // Ignore whitespace.

                    b @ b'1'..=b'9' => self.start_literal(b, true),
                    b'-' => self.start_literal(&b'-', false),

                    b => return Err(DimacsParseError::UnexpectedCharacter(*b as char, self.line)),
                },
            }

            if *byte == b'\n' {
                self.line += 1;
            }
        }

        Ok(())
    }

    fn start_literal(&mut self, b: &u8, is_positive: bool) {
        self.state = if is_positive {
            ParseState::Literal
        } else {
            ParseState::NegativeLiteral
        };

        self.buffer.clear();
        self.buffer.push(*b as char);
    }

    fn complete(self) -> Result<Sink::Formula, DimacsParseError> {
        let sink = self.sink.ok_or(DimacsParseError::MissingHeader)?;
        let header = self
            .header
            .expect("if sink is present then header is present");

        if !self.clause.is_empty() || matches!(self.state, ParseState::Literal) {
            Err(DimacsParseError::UnterminatedClause)
        } else if header.num_clauses != self.parsed_clauses {
            Err(DimacsParseError::IncorrectClauseCount {
                expected: header.num_clauses,
                parsed: self.parsed_clauses,
            })
        } else {
            Ok(sink.into_formula())
        }
    }

    fn init_formula(&mut self) -> Result<(), DimacsParseError> {
        let header = self.buffer.trim().parse::<CnfHeader>()?;

        self.sink = Some(Sink::empty(
            self.sink_constructor_args
                .take()
                .ok_or(DimacsParseError::DuplicateHeader)?,
            header.num_variables,
        ));

        self.header = Some(header);

        Ok(())
    }

    fn finish_literal(&mut self) -> Result<(), DimacsParseError> {
        let dimacs_code = self
            .buffer
            .parse::<i32>()
            .map_err(|_| DimacsParseError::InvalidLiteral(self.buffer.clone(), self.line))?;

        let num_variables = self
            .header
            .as_ref()
            .ok_or(DimacsParseError::MissingHeader)?
            .num_variables;
        if dimacs_code.unsigned_abs() as usize > num_variables {
            return Err(DimacsParseError::LiteralOutOfBounds(
                dimacs_code,
                self.line,
                num_variables,
            ));
        }

        let literal = NonZeroI32::new(dimacs_code).expect("cannot be 0 here");
        self.clause.push(literal);
        self.state = ParseState::Clause;

        Ok(())
    }

    fn finish_clause(&mut self) -> Result<(), DimacsParseError> {
        let sink = self.sink.as_mut().ok_or(DimacsParseError::MissingHeader)?;

        self.parsed_clauses += 1;
        sink.add_clause(&self.clause);
        self.clause.clear();
        self.state = ParseState::Clause;

        Ok(())
    }
}

struct CnfHeader {
    num_variables: usize,
    num_clauses: usize,
}

impl FromStr for CnfHeader {
    type Err = DimacsParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.starts_with("p cnf ") {
            return Err(DimacsParseError::InvalidHeader(s.to_string()));
        }

        let mut components = s.trim().split_whitespace().skip(2);

        let num_variables = next_header_component::<usize>(&mut components, s)?;
        let num_clauses = next_header_component::<usize>(&mut components, s)?;

        if components.next().is_some() {
            return Err(DimacsParseError::InvalidHeader(s.to_string()));
        }

        Ok(Self {
            num_variables,
            num_clauses,
        })
    }
}

fn next_header_component<'a, Num: FromStr>(
    components: &mut impl Iterator<Item = &'a str>,
    header: &str,
) -> Result<Num, DimacsParseError> {
    components
        .next()
        .ok_or_else(|| DimacsParseError::InvalidHeader(header.to_string()))?
        .parse::<Num>()
        .map_err(|_| DimacsParseError::InvalidHeader(header.to_string()))
}

/// A dimacs sink that fills a fresh [`SatisfactionSolver`] while reading a DIMACS file.
pub(crate) struct SolverDimacsSink {
    solver: SatisfactionSolver,
    variables: Vec<PropositionalVariable>,
}

impl SolverDimacsSink {
    fn mapped_literals<'a>(
        &'a self,
        clause: &'a [NonZeroI32],
    ) -> impl Iterator<Item = Literal> + 'a {
        clause.iter().map(|dimacs_code| {
            let variable = self.variables[dimacs_code.unsigned_abs().get() as usize - 1];
            Literal::new(variable, dimacs_code.get().is_positive())
        })
    }
}

impl DimacsSink for SolverDimacsSink {
    type ConstructorArgs = SolverArgs;
    type Formula = SatisfactionSolver;

    fn empty(args: Self::ConstructorArgs, num_variables: usize) -> Self {
        let mut solver = args.into_solver();

        let variables = (0..num_variables)
            .map(|_| solver.create_new_propositional_variable())
            .collect::<Vec<_>>();

        SolverDimacsSink { solver, variables }
    }

    fn add_clause(&mut self, clause: &[NonZeroI32]) {
        let mapped = self.mapped_literals(clause).collect::<Vec<_>>();
        let _ = self.solver.add_permanent_clause(mapped);
    }

    fn into_formula(self) -> Self::Formula {
        self.solver
    }
}
