//! Source-independent telemetry model. Each simulator adapter normalizes its
//! shared-memory layout into one `Snapshot` per tick; everything downstream
//! of this module is simulator-agnostic.

pub mod ac;
pub mod producer;
pub mod r3e;
pub mod rf1;
pub mod scripted;
#[cfg(windows)]
pub mod shared_memory;

use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Practice,
    Qualify,
    Race,
    Other(i32),
}

/// Session identity. A change in any field resets all session-scoped state.
/// `epoch` lets adapters that can only detect restarts heuristically (rFactor
/// and its `currentET` rollback) force a new identity for an otherwise
/// identical tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId {
    pub track: String,
    pub car: String,
    pub kind: SessionKind,
    pub epoch: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PitWindow {
    Unavailable,
    Disabled,
    Closed,
    Open,
    Stopped,
    Completed,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DrsState {
    pub available: bool,
    pub engaged: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct PushToPass {
    pub available: bool,
    pub engaged: bool,
    pub amount_left: i32,
    pub engaged_time_left: f32,
    pub wait_time_left: f32,
}

/// Lap times in seconds. `None` marks invalid or not-yet-set laps; sources
/// report those as zero or negative sentinels.
#[derive(Debug, Clone, Copy, Default)]
pub struct LapTimes {
    pub current: Option<f32>,
    pub previous: Option<f32>,
    pub best_self: Option<f32>,
    pub best_session: Option<f32>,
}

/// Split times for the two intermediate sectors, as true per-sector
/// durations. Sources that report cumulative sector times (rFactor) are
/// resolved by their adapter before reaching here.
#[derive(Debug, Clone, Copy, Default)]
pub struct SectorSplits {
    pub current: [Option<f32>; 2],
    pub previous: [Option<f32>; 2],
    pub best_self: [Option<f32>; 2],
    pub best_session: [Option<f32>; 2],
}

/// One normalized telemetry reading. Immutable per tick.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// `None` when the source reports an empty field or no player entry.
    pub session: Option<SessionId>,
    pub engine_running: bool,
    pub rpm: f32,
    pub max_rpm: f32,
    /// Signed gear: -1 reverse, 0 neutral, 1.. forward, anything else unknown.
    pub gear: i32,
    pub speed_mps: f32,
    pub fuel_left: f32,
    pub fuel_use_active: bool,
    pub water_temp: f32,
    pub oil_temp: f32,
    pub overheating: bool,
    pub laps: LapTimes,
    /// Track sector 1..=3, where 1 is the start/finish sector.
    pub sector: u8,
    pub splits: SectorSplits,
    pub position: i32,
    pub num_cars: i32,
    pub completed_laps: i32,
    pub laps_total: Option<i32>,
    pub time_remaining: Option<f32>,
    pub pit_window: PitWindow,
    pub pit_limiter: bool,
    pub drs: DrsState,
    pub push_to_pass: Option<PushToPass>,
}

impl Default for Snapshot {
    fn default() -> Snapshot {
        Snapshot {
            session: None,
            engine_running: false,
            rpm: 0.0,
            max_rpm: 0.0,
            gear: 0,
            speed_mps: 0.0,
            fuel_left: 0.0,
            fuel_use_active: false,
            water_temp: 0.0,
            oil_temp: 0.0,
            overheating: false,
            laps: LapTimes::default(),
            sector: 1,
            splits: SectorSplits::default(),
            position: 0,
            num_cars: 0,
            completed_laps: 0,
            laps_total: None,
            time_remaining: None,
            pit_window: PitWindow::Unavailable,
            pit_limiter: false,
            drs: DrsState::default(),
            push_to_pass: None,
        }
    }
}

/// How temperature warning deltas are derived for a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempPolicy {
    /// Warning delta = spread of the warm-up window, critical = 1.5x that.
    BaselineSpread,
    /// Warning/critical deltas come straight from the settings file.
    Configured,
}

/// Per-source engine parameters that are properties of the simulator, not
/// user preferences.
#[derive(Debug, Clone, Copy)]
pub struct SourceProfile {
    /// Sector transitions per lap; scales the per-sector fuel window into a
    /// per-lap estimate.
    pub fuel_window_scale: u32,
    pub temp_policy: TempPolicy,
    pub has_drs_ptp: bool,
}

impl Default for SourceProfile {
    fn default() -> SourceProfile {
        SourceProfile {
            fuel_window_scale: 3,
            temp_policy: TempPolicy::Configured,
            has_drs_ptp: false,
        }
    }
}

/// Messages from the producer task to the dash loop.
#[derive(Debug, Clone)]
pub enum Update {
    Connected {
        name: &'static str,
        profile: SourceProfile,
    },
    Snapshot(Snapshot),
    Disconnected,
}

/// A running simulator (or a scripted stand-in). `next_snapshot` paces the
/// polling loop; `None` means the source has gone away.
#[async_trait]
pub trait TelemetrySource: Send {
    fn name(&self) -> &'static str;
    fn profile(&self) -> SourceProfile;
    async fn next_snapshot(&mut self) -> Option<Snapshot>;
}

pub fn mps_to_mph(mps: f32) -> f32 {
    mps * 2.23694
}

pub fn mps_to_kph(mps: f32) -> f32 {
    mps * 3.6
}

pub fn rads_to_rpm(rads: f32) -> f32 {
    rads * 9.549_297
}

/// Sources flag invalid times as zero or negative.
pub fn valid_time(t: f32) -> Option<f32> {
    if t > 0.0 {
        Some(t)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_conversions() {
        assert!((mps_to_mph(44.704) - 100.0).abs() < 0.01);
        assert!((mps_to_kph(10.0) - 36.0).abs() < 1e-4);
        // 100 rad/s is roughly 955 rpm
        assert!((rads_to_rpm(100.0) - 954.9297).abs() < 0.01);
    }

    #[test]
    fn valid_time_rejects_sentinels() {
        assert_eq!(valid_time(-1.0), None);
        assert_eq!(valid_time(0.0), None);
        assert_eq!(valid_time(83.2), Some(83.2));
    }

    #[test]
    fn session_identity_compares_all_fields() {
        let a = SessionId {
            track: "indy".to_string(),
            car: "dw12".to_string(),
            kind: SessionKind::Race,
            epoch: 0,
        };
        let mut b = a.clone();
        assert_eq!(a, b);
        b.epoch = 1;
        assert_ne!(a, b);
    }
}
