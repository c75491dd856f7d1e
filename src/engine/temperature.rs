//! Temperature baselines. Both channels sample during the first laps of a
//! session, then freeze a baseline; warnings are deltas above baseline, not
//! absolute temperatures, so they adapt to car and weather.

#[derive(Debug, Default)]
struct TempChannel {
    samples: Vec<f32>,
    baseline: Option<f32>,
    spread: Option<f32>,
}

impl TempChannel {
    /// Samples are only collected until the channel freezes. The first
    /// sample is discarded from the baseline as unrepresentative warm-up.
    fn record(&mut self, value: f32, capacity: usize) {
        if self.baseline.is_some() || capacity == 0 {
            return;
        }
        if self.samples.len() < capacity {
            self.samples.push(value);
        }
        if self.samples.len() >= capacity {
            self.freeze();
        }
    }

    fn freeze(&mut self) {
        let warmup = &self.samples[1..];
        self.baseline = if warmup.is_empty() {
            self.samples.first().copied()
        } else {
            Some(warmup.iter().sum::<f32>() / warmup.len() as f32)
        };
        let max = self.samples.iter().cloned().fold(f32::MIN, f32::max);
        let min = self.samples.iter().cloned().fold(f32::MAX, f32::min);
        self.spread = Some(max - min);
    }

    fn reset(&mut self) {
        self.samples.clear();
        self.baseline = None;
        self.spread = None;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TempStatus {
    pub warning: bool,
    pub critical: bool,
}

#[derive(Debug, Default)]
pub struct TemperatureModel {
    water: TempChannel,
    oil: TempChannel,
}

impl TemperatureModel {
    pub fn new() -> TemperatureModel {
        TemperatureModel::default()
    }

    pub fn reset(&mut self) {
        self.water.reset();
        self.oil.reset();
    }

    pub fn on_sector_transition(&mut self, water: f32, oil: f32, capacity: usize) {
        self.water.record(water, capacity);
        self.oil.record(oil, capacity);
    }

    pub fn water_baseline(&self) -> Option<f32> {
        self.water.baseline
    }

    pub fn oil_baseline(&self) -> Option<f32> {
        self.oil.baseline
    }

    /// Spread of the water warm-up window; drives the derived warning delta
    /// for sources without configured absolute thresholds.
    pub fn baseline_spread(&self) -> Option<f32> {
        self.water.spread
    }

    /// Evaluates both channels against their baselines. A source-reported
    /// overheating flag is critical regardless of baseline state.
    pub fn status(
        &self,
        water: f32,
        oil: f32,
        overheating: bool,
        warn_delta: f32,
        critical_delta: f32,
    ) -> TempStatus {
        let above = |baseline: Option<f32>, current: f32, delta: f32| {
            baseline.map_or(false, |b| current - b >= delta)
        };
        let warning = above(self.water.baseline, water, warn_delta)
            || above(self.oil.baseline, oil, warn_delta)
            || overheating;
        let critical = above(self.water.baseline, water, critical_delta)
            || above(self.oil.baseline, oil, critical_delta)
            || overheating;
        TempStatus { warning, critical }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warmed_up(samples: &[(f32, f32)], capacity: usize) -> TemperatureModel {
        let mut model = TemperatureModel::new();
        for &(w, o) in samples {
            model.on_sector_transition(w, o, capacity);
        }
        model
    }

    #[test]
    fn baseline_excludes_first_sample() {
        let model = warmed_up(&[(70.0, 90.0), (80.0, 100.0), (80.0, 100.0), (80.0, 100.0)], 4);
        assert_eq!(model.water_baseline(), Some(80.0));
        assert_eq!(model.oil_baseline(), Some(100.0));
    }

    #[test]
    fn no_baseline_until_capacity() {
        let model = warmed_up(&[(70.0, 90.0), (80.0, 100.0), (80.0, 100.0)], 4);
        assert_eq!(model.water_baseline(), None);
        assert_eq!(model.baseline_spread(), None);
    }

    #[test]
    fn further_samples_ignored_after_freeze() {
        let mut model = warmed_up(&[(70.0, 90.0), (80.0, 100.0), (80.0, 100.0)], 3);
        assert_eq!(model.water_baseline(), Some(80.0));
        model.on_sector_transition(120.0, 140.0, 3);
        assert_eq!(model.water_baseline(), Some(80.0));
        assert_eq!(model.baseline_spread(), Some(10.0));
    }

    #[test]
    fn capacity_of_one_uses_the_lone_sample() {
        let model = warmed_up(&[(75.0, 95.0)], 1);
        assert_eq!(model.water_baseline(), Some(75.0));
        assert_eq!(model.baseline_spread(), Some(0.0));
    }

    #[test]
    fn spread_tracks_the_water_window() {
        let model = warmed_up(&[(70.0, 90.0), (78.0, 100.0), (80.0, 101.0)], 3);
        assert_eq!(model.baseline_spread(), Some(10.0));
    }

    #[test]
    fn status_thresholds_are_inclusive() {
        let model = warmed_up(&[(70.0, 90.0), (80.0, 100.0), (80.0, 100.0)], 3);
        // baseline water 80, warn at +7, critical at +12
        assert_eq!(model.status(86.9, 90.0, false, 7.0, 12.0), TempStatus { warning: false, critical: false });
        assert_eq!(model.status(87.0, 90.0, false, 7.0, 12.0), TempStatus { warning: true, critical: false });
        assert_eq!(model.status(92.0, 90.0, false, 7.0, 12.0), TempStatus { warning: true, critical: true });
    }

    #[test]
    fn either_channel_can_warn() {
        let model = warmed_up(&[(70.0, 90.0), (80.0, 100.0), (80.0, 100.0)], 3);
        // oil baseline 100, water cool
        let status = model.status(80.0, 108.0, false, 7.0, 12.0);
        assert!(status.warning);
        assert!(!status.critical);
    }

    #[test]
    fn overheating_flag_is_always_critical() {
        let model = TemperatureModel::new();
        // no baseline at all, hardware flag still fires
        let status = model.status(80.0, 90.0, true, 7.0, 12.0);
        assert!(status.warning);
        assert!(status.critical);
    }

    #[test]
    fn reset_reopens_sampling() {
        let mut model = warmed_up(&[(70.0, 90.0), (80.0, 100.0), (80.0, 100.0)], 3);
        model.reset();
        assert_eq!(model.water_baseline(), None);
        model.on_sector_transition(60.0, 80.0, 1);
        assert_eq!(model.water_baseline(), Some(60.0));
    }
}
