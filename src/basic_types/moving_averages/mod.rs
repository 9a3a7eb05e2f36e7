mod cumulative_moving_average;
mod exponential_moving_average;
mod moving_average;

pub(crate) use cumulative_moving_average::CumulativeMovingAverage;
pub(crate) use exponential_moving_average::ExponentialMovingAverage;
pub(crate) use moving_average::MovingAverage;
