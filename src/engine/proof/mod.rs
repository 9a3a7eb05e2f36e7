use std::io::BufWriter;
use std::io::Write;

use crate::engine::variables::Literal;

/// An append-only clausal-addition proof trace in the DRAT format: every learned clause is
/// written as its DIMACS literals terminated by `0`, and the empty clause concludes an
/// unsatisfiability proof. Deletion lines are not emitted.
pub(crate) struct DratProof<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> DratProof<W> {
    pub(crate) fn new(writer: W) -> DratProof<W> {
        DratProof {
            writer: BufWriter::new(writer),
        }
    }

    pub(crate) fn log_learned_clause<'a>(
        &mut self,
        literals: impl IntoIterator<Item = &'a Literal>,
    ) -> std::io::Result<()> {
        for literal in literals.into_iter() {
            let prefix = if literal.is_negative() { "-" } else { "" };
            let code = literal.get_propositional_variable().get_index();

            write!(self.writer, "{prefix}{code} ")?;
        }

        writeln!(self.writer, "0")
    }

    pub(crate) fn log_unit_clause(&mut self, literal: Literal) -> std::io::Result<()> {
        self.log_learned_clause(std::iter::once(&literal))
    }

    pub(crate) fn log_empty_clause(&mut self) -> std::io::Result<()> {
        writeln!(self.writer, "0")
    }

    pub(crate) fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::variables::PropositionalVariable;

    fn proof_output(log: impl FnOnce(&mut DratProof<&mut Vec<u8>>)) -> String {
        let mut buffer = Vec::new();
        let mut proof = DratProof::new(&mut buffer);
        log(&mut proof);
        proof.flush().expect("flushing an in-memory writer succeeds");
        drop(proof);
        String::from_utf8(buffer).expect("proof traces are ascii")
    }

    #[test]
    fn learned_clauses_are_written_as_dimacs_lines() {
        let output = proof_output(|proof| {
            let literals = vec![
                Literal::new(PropositionalVariable::new(1), true),
                Literal::new(PropositionalVariable::new(3), false),
            ];
            proof
                .log_learned_clause(&literals)
                .expect("writing succeeds");
        });

        assert_eq!("1 -3 0\n", output);
    }

    #[test]
    fn units_and_the_empty_clause_are_traced() {
        let output = proof_output(|proof| {
            proof
                .log_unit_clause(Literal::new(PropositionalVariable::new(2), false))
                .expect("writing succeeds");
            proof.log_empty_clause().expect("writing succeeds");
        });

        assert_eq!("-2 0\n0\n", output);
    }
}
