//! Contains structures related to the statistic logging of the solver.
pub(crate) mod statistic_logger;
pub(crate) mod statistic_logging;

use std::fmt::Display;

pub use statistic_logger::StatisticLogger;
pub use statistic_logging::configure_statistic_logging;
pub use statistic_logging::log_statistic;
pub use statistic_logging::log_statistic_postfix;
pub use statistic_logging::should_log_statistics;
pub use statistic_logging::StatisticOptions;

pub(crate) trait LogStatistics {
    fn log_statistics(&self, statistic_logger: &StatisticLogger);
}

impl<Name: Display + Clone, Value: Display + Clone> LogStatistics for (Name, Value) {
    fn log_statistics(&self, statistic_logger: &StatisticLogger) {
        statistic_logger.log_statistic(self.0.clone(), self.1.clone())
    }
}

/// A macro for generating a struct for storing statistics.
///
/// The generated struct derives [`Default`] and implements [`LogStatistics`] which logs every
/// field under its own name.
#[macro_export]
#[doc(hidden)]
macro_rules! create_statistics_struct {
    ($(#[$struct_documentation:meta])* $name:ident { $($(#[$variable_documentation:meta])* $field:ident : $type:ident),+ $(,)? }) => {
        $(#[$struct_documentation])*
        #[derive(Default, Debug, Copy, Clone)]
        pub(crate) struct $name {
            $($(#[$variable_documentation])* pub(crate) $field: $type),+
        }

        impl $crate::statistics::LogStatistics for $name {
            fn log_statistics(
                &self,
                statistic_logger: &$crate::statistics::StatisticLogger
            ) {
                $($crate::statistics::LogStatistics::log_statistics(
                    &(stringify!($field), self.$field),
                    statistic_logger,
                ));+
            }
        }
    };
}
