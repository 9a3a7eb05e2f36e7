mod resolution_conflict_analyser;

pub(crate) use resolution_conflict_analyser::ConflictAnalysisResult;
pub(crate) use resolution_conflict_analyser::ResolutionConflictAnalyser;
