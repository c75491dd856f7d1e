//! Deterministic scripted telemetry: canned frames for tests, synthesized
//! demo laps for running the dashboard without a simulator.

use std::time::Duration;

use async_std::task;
use async_trait::async_trait;

use super::{
    LapTimes, SessionId, SessionKind, Snapshot, SourceProfile, TelemetrySource, TempPolicy,
};

const DEMO_LAP_TICKS: u64 = 1200;
const DEMO_TICK: Duration = Duration::from_millis(10);

enum Mode {
    Frames(std::vec::IntoIter<Snapshot>),
    Demo { tick: u64, total: u64 },
}

pub struct ScriptedSource {
    mode: Mode,
    interval: Duration,
}

impl ScriptedSource {
    pub fn new(frames: Vec<Snapshot>, interval: Duration) -> ScriptedSource {
        ScriptedSource {
            mode: Mode::Frames(frames.into_iter()),
            interval,
        }
    }

    /// Synthesized twelve-second demo laps.
    pub fn demo(laps: u64) -> ScriptedSource {
        ScriptedSource {
            mode: Mode::Demo {
                tick: 0,
                total: laps * DEMO_LAP_TICKS,
            },
            interval: DEMO_TICK,
        }
    }
}

fn demo_frame(tick: u64) -> Snapshot {
    let lap = tick / DEMO_LAP_TICKS;
    let lap_tick = tick % DEMO_LAP_TICKS;
    let in_lap = lap_tick as f32 / 100.0;
    let sector = match lap_tick {
        t if t < DEMO_LAP_TICKS / 3 => 1,
        t if t < 2 * DEMO_LAP_TICKS / 3 => 2,
        _ => 3,
    };
    let revs = 0.55 + 0.4 * (in_lap * 2.2).sin().abs();
    Snapshot {
        session: Some(SessionId {
            track: "demo ring".to_string(),
            car: "demo gt".to_string(),
            kind: SessionKind::Practice,
            epoch: 0,
        }),
        engine_running: true,
        rpm: 7600.0 * revs,
        max_rpm: 7600.0,
        gear: 2 + (revs * 4.0) as i32,
        speed_mps: 68.0 * revs,
        fuel_left: 50.0 - tick as f32 * 0.0003,
        fuel_use_active: true,
        water_temp: 70.0 + (lap as f32 * 3.0).min(15.0),
        oil_temp: 90.0 + (lap as f32 * 3.0).min(15.0),
        laps: LapTimes {
            current: Some(in_lap),
            previous: if lap > 0 { Some(12.0) } else { None },
            best_self: if lap > 0 { Some(12.0) } else { None },
            best_session: Some(11.8),
        },
        sector,
        position: 3,
        num_cars: 14,
        completed_laps: lap as i32,
        time_remaining: Some(1200.0 - tick as f32 / 100.0),
        ..Snapshot::default()
    }
}

#[async_trait]
impl TelemetrySource for ScriptedSource {
    fn name(&self) -> &'static str {
        "scripted telemetry"
    }

    fn profile(&self) -> SourceProfile {
        SourceProfile {
            fuel_window_scale: 3,
            temp_policy: TempPolicy::Configured,
            has_drs_ptp: false,
        }
    }

    async fn next_snapshot(&mut self) -> Option<Snapshot> {
        if !self.interval.is_zero() {
            task::sleep(self.interval).await;
        }
        match &mut self.mode {
            Mode::Frames(frames) => frames.next(),
            Mode::Demo { tick, total } => {
                if *tick >= *total {
                    None
                } else {
                    let frame = demo_frame(*tick);
                    *tick += 1;
                    Some(frame)
                }
            }
        }
    }
}
