//! rFactor 1 adapter (also Game Stock Car / Automobilista), reading the
//! block exported by rFactorSharedMemoryMap.dll. Scoring data only updates
//! every half second, so the adapter interpolates the lap clock against wall
//! time, and a `currentET` rollback is the only restart signal the plugin
//! gives us. Sector times come cumulative and are resolved into true splits
//! here. Temperature warnings derive from the warm-up spread.

use std::time::Instant;

use super::{
    valid_time, DrsState, LapTimes, PitWindow, SectorSplits, SessionId, SessionKind, Snapshot,
    SourceProfile, TempPolicy,
};

pub const RF_MAP_TAG: &str = "$rFactorShared$";

pub const RF_YELLOW_PIT_OPEN: i8 = 4;

pub const RF_MAX_VEHICLES: usize = 128;

/// Scoring updates arrive every 0.5 s; the interpolation delta never runs
/// past one update interval.
const RF_SCORING_INTERVAL: f32 = 0.5;

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct RfVec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct RfWheel {
    pub rotation: f32,
    pub suspension_deflection: f32,
    pub ride_height: f32,
    pub tire_load: f32,
    pub lateral_force: f32,
    pub grip_fract: f32,
    pub brake_temp: f32,
    pub pressure: f32,
    pub temperature: [f32; 3],
    pub wear: f32,
    pub terrain_name: [u8; 16],
    pub surface_type: i8,
    pub flat: u8,
    pub detached: u8,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct RfVehicleInfo {
    pub driver_name: [u8; 32],
    pub vehicle_name: [u8; 64],
    pub total_laps: i16,
    pub sector: i8,
    pub finish_status: i8,
    pub lap_dist: f32,
    pub path_lateral: f32,
    pub track_edge: f32,
    pub best_sector_1: f32,
    /// Cumulative: best sector 2 plus sector 1.
    pub best_sector_2: f32,
    pub best_lap_time: f32,
    pub last_sector_1: f32,
    /// Cumulative: last sector 2 plus sector 1.
    pub last_sector_2: f32,
    pub last_lap_time: f32,
    pub cur_sector_1: f32,
    /// Cumulative: current sector 2 plus sector 1.
    pub cur_sector_2: f32,
    pub num_pitstops: i16,
    pub num_penalties: i16,
    pub is_player: u8,
    pub control: i8,
    pub in_pits: u8,
    pub place: i8,
    pub vehicle_class: [u8; 32],
    pub time_behind_next: f32,
    pub laps_behind_next: i32,
    pub time_behind_leader: f32,
    pub laps_behind_leader: i32,
    pub lap_start_et: f32,
    pub pos: RfVec3,
    pub local_vel: RfVec3,
    pub local_accel: RfVec3,
    pub ori_x: RfVec3,
    pub ori_y: RfVec3,
    pub ori_z: RfVec3,
    pub local_rot: RfVec3,
    pub local_rot_accel: RfVec3,
    pub speed: f32,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct RfShared {
    pub delta_time: f32,
    pub lap_number: i32,
    pub lap_start_et: f32,
    pub vehicle_name: [u8; 64],
    pub track_name: [u8; 64],
    pub pos: RfVec3,
    pub local_vel: RfVec3,
    pub local_accel: RfVec3,
    pub ori_x: RfVec3,
    pub ori_y: RfVec3,
    pub ori_z: RfVec3,
    pub local_rot: RfVec3,
    pub local_rot_accel: RfVec3,
    pub speed: f32,
    pub gear: i32,
    pub engine_rpm: f32,
    pub engine_water_temp: f32,
    pub engine_oil_temp: f32,
    pub clutch_rpm: f32,
    pub unfiltered_throttle: f32,
    pub unfiltered_brake: f32,
    pub unfiltered_steering: f32,
    pub unfiltered_clutch: f32,
    pub steering_arm_force: f32,
    pub fuel: f32,
    pub engine_max_rpm: f32,
    pub scheduled_stops: i8,
    pub overheating: u8,
    pub detached: u8,
    pub dent_severity: [i8; 8],
    pub last_impact_et: f32,
    pub last_impact_magnitude: f32,
    pub last_impact_pos: RfVec3,
    pub wheel: [RfWheel; 4],
    pub session: i32,
    pub current_et: f32,
    pub end_et: f32,
    pub max_laps: i32,
    pub lap_dist: f32,
    pub num_vehicles: i32,
    pub game_phase: i8,
    pub yellow_flag_state: i8,
    pub sector_flag: [i8; 3],
    pub start_light: i8,
    pub num_red_lights: i8,
    pub in_realtime: u8,
    pub player_name: [u8; 32],
    pub plr_file_name: [u8; 64],
    pub ambient_temp: f32,
    pub track_temp: f32,
    pub wind: RfVec3,
    pub vehicle: [RfVehicleInfo; RF_MAX_VEHICLES],
}

pub fn profile() -> SourceProfile {
    SourceProfile {
        fuel_window_scale: 3,
        temp_policy: TempPolicy::BaselineSpread,
        has_drs_ptp: false,
    }
}

fn cstr(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn session_kind(session: i32) -> SessionKind {
    match session {
        1..=4 => SessionKind::Practice,
        5..=8 => SessionKind::Qualify,
        10..=13 => SessionKind::Race,
        other => SessionKind::Other(other),
    }
}

/// A cumulative pair becomes a true second split only when both legs exist.
fn split_pair(sector_1: f32, sector_2: f32) -> [Option<f32>; 2] {
    let second = if sector_1 > 0.0 && sector_2 > 0.0 {
        valid_time(sector_2 - sector_1)
    } else {
        None
    };
    [valid_time(sector_1), second]
}

/// rFactor scoring only ticks every half second, and restarting a session
/// rewinds `currentET`. This adapter carries the interpolation clock and a
/// session epoch across frames.
pub struct Rf1Adapter {
    last_et: f32,
    last_update: Option<Instant>,
    epoch: u32,
}

impl Rf1Adapter {
    pub fn new() -> Rf1Adapter {
        Rf1Adapter { last_et: 0.0, last_update: None, epoch: 0 }
    }

    pub fn normalize(&mut self, raw: &RfShared, now: Instant) -> Snapshot {
        let current_et = raw.current_et;
        if current_et != self.last_et {
            if current_et < self.last_et {
                // session restarted or rewound at the monitor
                self.epoch += 1;
            }
            self.last_et = current_et;
            self.last_update = Some(now);
        }
        let mut et_delta = self
            .last_update
            .map_or(0.0, |t| now.saturating_duration_since(t).as_secs_f32());
        if et_delta > RF_SCORING_INTERVAL && self.last_et > 0.0 {
            // stalled scoring means we are not in realtime, stop extrapolating
            et_delta = RF_SCORING_INTERVAL;
        }

        let num_vehicles = raw.num_vehicles;
        let mut player: Option<RfVehicleInfo> = None;
        let mut best_lap_session = None;
        let mut best_sector_1_session = None;
        let mut best_sector_2_session = None;
        if num_vehicles > 0 {
            let vehicles = raw.vehicle;
            for v in vehicles.iter().take(num_vehicles.min(RF_MAX_VEHICLES as i32) as usize) {
                if v.is_player != 0 {
                    player = Some(*v);
                }
                let best_lap = v.best_lap_time;
                if best_lap > 0.0 && best_lap_session.map_or(true, |b| best_lap < b) {
                    best_lap_session = Some(best_lap);
                }
                let best_1 = v.best_sector_1;
                if best_1 > 0.0 && best_sector_1_session.map_or(true, |b| best_1 < b) {
                    best_sector_1_session = Some(best_1);
                }
                let best_2 = v.best_sector_2;
                if best_2 > 0.0 && best_sector_2_session.map_or(true, |b| best_2 < b) {
                    best_sector_2_session = Some(best_2);
                }
            }
        }

        let lap_number = raw.lap_number;
        let lap_start_et = raw.lap_start_et;
        let current_lap = if current_et > 0.0 && lap_start_et > 0.0 && lap_number > 0 {
            valid_time((current_et + et_delta) - lap_start_et)
        } else {
            None
        };

        let end_et = raw.end_et;
        let max_laps = raw.max_laps;
        let mut snap = Snapshot {
            session: None,
            engine_running: raw.engine_rpm > 1.0,
            rpm: raw.engine_rpm,
            max_rpm: raw.engine_max_rpm,
            gear: raw.gear,
            speed_mps: raw.speed,
            fuel_left: raw.fuel,
            fuel_use_active: true,
            water_temp: raw.engine_water_temp,
            oil_temp: raw.engine_oil_temp,
            overheating: raw.overheating != 0,
            laps: LapTimes {
                current: current_lap,
                previous: None,
                best_self: None,
                best_session: best_lap_session,
            },
            sector: 1,
            splits: SectorSplits::default(),
            position: 0,
            num_cars: num_vehicles,
            completed_laps: 0,
            laps_total: if max_laps > 0 && max_laps < 200 { Some(max_laps) } else { None },
            time_remaining: if end_et > 0.0 {
                valid_time(end_et - (current_et + et_delta))
            } else {
                None
            },
            pit_window: PitWindow::Unavailable,
            pit_limiter: false,
            drs: DrsState::default(),
            push_to_pass: None,
        };

        let sector_flag = raw.sector_flag;
        let pit_open = raw.yellow_flag_state == RF_YELLOW_PIT_OPEN
            || sector_flag.contains(&RF_YELLOW_PIT_OPEN);

        if let Some(v) = player {
            snap.session = Some(SessionId {
                track: cstr(&raw.track_name),
                car: cstr(&raw.vehicle_name),
                kind: session_kind(raw.session),
                epoch: self.epoch,
            });
            // rFactor counts sectors start/finish-last: 1, 2, then 0
            snap.sector = match v.sector {
                1 => 2,
                2 => 3,
                _ => 1,
            };
            snap.laps.previous = valid_time(v.last_lap_time);
            snap.laps.best_self = valid_time(v.best_lap_time);
            snap.position = v.place as i32;
            snap.completed_laps = v.total_laps as i32;
            let best_session_split = match (best_sector_1_session, best_sector_2_session) {
                (Some(s1), Some(s2)) => split_pair(s1, s2),
                (Some(s1), None) => [Some(s1), None],
                _ => [None, None],
            };
            snap.splits = SectorSplits {
                current: split_pair(v.cur_sector_1, v.cur_sector_2),
                previous: split_pair(v.last_sector_1, v.last_sector_2),
                best_self: split_pair(v.best_sector_1, v.best_sector_2),
                best_session: best_session_split,
            };
            snap.pit_window = if v.in_pits != 0 {
                PitWindow::Stopped
            } else if pit_open {
                PitWindow::Open
            } else {
                PitWindow::Unavailable
            };
        }

        snap
    }
}

impl Default for Rf1Adapter {
    fn default() -> Rf1Adapter {
        Rf1Adapter::new()
    }
}

#[cfg(windows)]
pub use source::Rf1Source;

#[cfg(windows)]
mod source {
    use std::time::{Duration, Instant};

    use async_std::task;
    use async_trait::async_trait;

    use super::super::shared_memory::{MapError, SharedMemoryMap};
    use super::super::{Snapshot, SourceProfile, TelemetrySource};
    use super::{profile, Rf1Adapter, RfShared, RF_MAP_TAG};

    pub struct Rf1Source {
        map: SharedMemoryMap<RfShared>,
        adapter: Rf1Adapter,
    }

    impl Rf1Source {
        pub fn open() -> Result<Rf1Source, MapError> {
            let map = SharedMemoryMap::open(RF_MAP_TAG)?;
            Ok(Rf1Source { map, adapter: Rf1Adapter::new() })
        }
    }

    #[async_trait]
    impl TelemetrySource for Rf1Source {
        fn name(&self) -> &'static str {
            "rFactor"
        }

        fn profile(&self) -> SourceProfile {
            profile()
        }

        async fn next_snapshot(&mut self) -> Option<Snapshot> {
            task::sleep(Duration::from_millis(10)).await;
            let raw = self.map.read();
            Some(self.adapter.normalize(&raw, Instant::now()))
        }
    }
}
