use std::fmt::Display;

use super::statistic_logging::log_statistic;

/// Logs statistics under an optional name prefix; used to distinguish the statistics of
/// different solver components.
#[derive(Debug, Default, Clone)]
pub struct StatisticLogger {
    /// The prefix which will be attached to the statistic name
    name_prefix: String,
}

impl StatisticLogger {
    pub fn new(name_prefix: impl Display) -> Self {
        Self {
            name_prefix: name_prefix.to_string(),
        }
    }

    /// Attaches the provided `addition_to_prefix` to the stored internal prefix and returns a
    /// new [`StatisticLogger`] with these two prefixes.
    pub fn attach_to_prefix(&self, addition_to_prefix: impl Display) -> Self {
        Self {
            name_prefix: format!("{}_{}", self.name_prefix, addition_to_prefix),
        }
    }

    pub fn log_statistic(&self, name: impl Display, value: impl Display) {
        if self.name_prefix.is_empty() {
            log_statistic(name, value);
        } else {
            log_statistic(format!("{}_{name}", self.name_prefix), value);
        }
    }
}
