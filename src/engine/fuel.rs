//! Fuel consumption estimate. Keeps a bounded window of per-sector-transition
//! consumption samples and produces a recency-weighted per-lap average once
//! the window has filled.

#[derive(Debug, Default)]
pub struct FuelModel {
    samples: Vec<f32>,
    last_reading: Option<f32>,
    average: Option<f32>,
}

impl FuelModel {
    pub fn new() -> FuelModel {
        FuelModel::default()
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.last_reading = None;
        self.average = None;
    }

    /// Feed one sector transition with the remaining-fuel reading captured at
    /// the transition. A sample is recorded only when fuel strictly
    /// decreased since the previous transition, so refuels and tow-backs
    /// never produce negative or zero samples. `scale` converts the
    /// per-transition window into a per-lap figure (transitions per lap).
    pub fn on_sector_transition(&mut self, fuel: f32, capacity: usize, scale: f32) {
        let fuel = fuel.max(0.0);
        if let Some(previous) = self.last_reading {
            if previous > fuel && capacity > 0 {
                self.samples.push(previous - fuel);
                if self.samples.len() > capacity {
                    let excess = self.samples.len() - capacity;
                    self.samples.drain(..excess);
                }
                if self.samples.len() == capacity {
                    self.average = Some(weighted_average(&self.samples, scale));
                }
            }
        }
        self.last_reading = Some(fuel);
    }

    /// `None` until the window first fills.
    pub fn estimate(&self) -> Option<f32> {
        self.average
    }
}

/// Oldest to newest, sample `i` weighted `i + 1`.
fn weighted_average(samples: &[f32], scale: f32) -> f32 {
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (i, sample) in samples.iter().enumerate() {
        let weight = (i + 1) as f32;
        numerator += sample * weight;
        denominator += weight;
    }
    numerator * scale / denominator
}
