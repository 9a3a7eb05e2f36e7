/// A moving average over a sequence of integer observations.
pub(crate) trait MovingAverage {
    /// Add the observed term to the moving average.
    fn add_term(&mut self, new_term: u64);

    /// The current value of the moving average.
    fn value(&self) -> f64;
}
