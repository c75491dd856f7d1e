//! RaceRoom Racing Experience adapter. Reads the `$Race$` shared memory
//! block (layout per the Sector3 public API) and normalizes it. R3E is the
//! source with DRS and push-to-pass, and it exposes explicit pit window
//! states; temperatures use the configured absolute warning deltas.

use super::{
    rads_to_rpm, valid_time, DrsState, LapTimes, PitWindow, PushToPass, SectorSplits, SessionId,
    SessionKind, Snapshot, SourceProfile, TempPolicy,
};

pub const R3E_SMM_TAG: &str = "$Race$";

pub const R3E_PIT_WINDOW_UNAVAILABLE: i32 = -1;
pub const R3E_PIT_WINDOW_DISABLED: i32 = 0;
pub const R3E_PIT_WINDOW_CLOSED: i32 = 1;
pub const R3E_PIT_WINDOW_OPEN: i32 = 2;
pub const R3E_PIT_WINDOW_STOPPED: i32 = 3;
pub const R3E_PIT_WINDOW_COMPLETED: i32 = 4;

pub const R3E_SESSION_PRACTICE: i32 = 0;
pub const R3E_SESSION_QUALIFY: i32 = 1;
pub const R3E_SESSION_RACE: i32 = 2;

pub const R3E_MAX_DRIVERS: usize = 128;

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct R3eVec3F32 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct R3eVec3F64 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct R3eOriF32 {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct R3ePlayerData {
    pub game_simulation_ticks: i32,
    pub _padding1: i32,
    pub game_simulation_time: f64,
    pub position: R3eVec3F64,
    pub velocity: R3eVec3F64,
    pub acceleration: R3eVec3F64,
    pub local_acceleration: R3eVec3F64,
    pub orientation: R3eVec3F64,
    pub rotation: R3eVec3F64,
    pub angular_acceleration: R3eVec3F64,
    pub driver_acceleration: R3eVec3F64,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct R3eTrackInfo {
    pub track_id: i32,
    pub layout_id: i32,
    pub length: f32,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct R3ePushToPass {
    pub available: i32,
    pub engaged: i32,
    pub amount_left: i32,
    pub engaged_time_left: f32,
    pub wait_time_left: f32,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct R3eDriverInfo {
    pub name: [u8; 64],
    pub car_number: i32,
    pub class_id: i32,
    pub model_id: i32,
    pub team_id: i32,
    pub livery_id: i32,
    pub manufacturer_id: i32,
    pub slot_id: i32,
    pub class_performance_index: i32,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct R3eDriverData1 {
    pub driver_info: R3eDriverInfo,
    pub finish_status: i32,
    pub place: i32,
    pub lap_distance: f32,
    pub position: R3eVec3F32,
    pub track_sector: i32,
    pub completed_laps: i32,
    pub current_lap_valid: i32,
    pub lap_time_current_self: f32,
    pub sector_time_current_self: [f32; 3],
    pub sector_time_previous_self: [f32; 3],
    pub sector_time_best_self: [f32; 3],
    pub time_delta_front: f32,
    pub time_delta_behind: f32,
    pub pitstop_status: i32,
    pub in_pitlane: i32,
    pub num_pitstops: i32,
    pub penalties: [i32; 5],
    pub car_speed: f32,
    pub tire_type: i32,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct R3eShared {
    pub user_input: [f32; 6],
    pub engine_rps: f32,
    pub max_engine_rps: f32,
    pub fuel_pressure: f32,
    pub fuel_left: f32,
    pub fuel_capacity: f32,
    pub engine_water_temp: f32,
    pub engine_oil_temp: f32,
    pub engine_oil_pressure: f32,
    pub car_speed: f32,
    pub number_of_laps: i32,
    pub completed_laps: i32,
    pub lap_time_best_self: f32,
    pub lap_time_previous_self: f32,
    pub lap_time_current_self: f32,
    pub position: i32,
    pub num_cars: i32,
    pub gear: i32,
    pub tire_temps: [f32; 12],
    pub num_penalties: i32,
    pub car_cg_location: R3eVec3F32,
    pub car_orientation: R3eOriF32,
    pub local_acceleration: R3eVec3F32,
    pub drs_available: i32,
    pub drs_engaged: i32,
    pub _padding1: i32,
    pub player: R3ePlayerData,
    pub event_index: i32,
    pub session_type: i32,
    pub session_phase: i32,
    pub session_iteration: i32,
    pub control_type: i32,
    pub throttle_pedal: f32,
    pub brake_pedal: f32,
    pub clutch_pedal: f32,
    pub brake_bias: f32,
    pub tire_pressure: [f32; 4],
    pub tire_wear_active: i32,
    pub tire_type: i32,
    pub brake_temps: [f32; 4],
    pub fuel_use_active: i32,
    pub session_time_remaining: f32,
    pub lap_time_best_leader: f32,
    pub lap_time_best_leader_class: f32,
    pub lap_time_delta_self: f32,
    pub lap_time_delta_leader: f32,
    pub lap_time_delta_leader_class: f32,
    pub sector_time_delta_self: [f32; 3],
    pub sector_time_delta_leader: [f32; 3],
    pub session_best_lap_sector_times: [f32; 3],
    pub time_delta_front: f32,
    pub time_delta_behind: f32,
    pub pit_window_status: i32,
    pub pit_window_start: i32,
    pub pit_window_end: i32,
    pub cut_track_warnings: i32,
    pub penalties: [i32; 5],
    pub flags: [i32; 3],
    pub car_damage: [f32; 7],
    pub slot_id: i32,
    pub tyre_dirt: [f32; 4],
    pub pit_limiter: i32,
    pub wheel_speed: [f32; 4],
    pub track_info: R3eTrackInfo,
    pub push_to_pass: R3ePushToPass,
    pub all_drivers_data_1: [R3eDriverData1; R3E_MAX_DRIVERS],
}

pub fn profile() -> SourceProfile {
    SourceProfile {
        fuel_window_scale: 3,
        temp_policy: TempPolicy::Configured,
        has_drs_ptp: true,
    }
}

fn session_kind(session_type: i32) -> SessionKind {
    match session_type {
        R3E_SESSION_PRACTICE => SessionKind::Practice,
        R3E_SESSION_QUALIFY => SessionKind::Qualify,
        R3E_SESSION_RACE => SessionKind::Race,
        other => SessionKind::Other(other),
    }
}

fn pit_window(status: i32) -> PitWindow {
    match status {
        R3E_PIT_WINDOW_DISABLED => PitWindow::Disabled,
        R3E_PIT_WINDOW_CLOSED => PitWindow::Closed,
        R3E_PIT_WINDOW_OPEN => PitWindow::Open,
        R3E_PIT_WINDOW_STOPPED => PitWindow::Stopped,
        R3E_PIT_WINDOW_COMPLETED => PitWindow::Completed,
        _ => PitWindow::Unavailable,
    }
}

/// Finds the player entry by slot id. No entry means no trackable session.
fn player_data(raw: &R3eShared) -> Option<R3eDriverData1> {
    let num_cars = raw.num_cars;
    let slot_id = raw.slot_id;
    if num_cars <= 0 {
        return None;
    }
    let drivers = raw.all_drivers_data_1;
    drivers
        .iter()
        .take(num_cars.min(R3E_MAX_DRIVERS as i32) as usize)
        .find(|d| {
            let id = d.driver_info.slot_id;
            id == slot_id
        })
        .copied()
}

pub fn normalize(raw: &R3eShared) -> Snapshot {
    let driver = player_data(raw);
    let session = driver.as_ref().map(|dd| {
        let track_id = raw.track_info.track_id;
        let layout_id = raw.track_info.layout_id;
        let model_id = dd.driver_info.model_id;
        SessionId {
            track: format!("{}-{}", track_id, layout_id),
            car: format!("{}", model_id),
            kind: session_kind(raw.session_type),
            epoch: 0,
        }
    });

    let ptp = raw.push_to_pass;
    let number_of_laps = raw.number_of_laps;
    let mut snap = Snapshot {
        session,
        engine_running: raw.engine_rps > 0.0,
        rpm: rads_to_rpm(raw.engine_rps),
        max_rpm: rads_to_rpm(raw.max_engine_rps),
        gear: raw.gear,
        speed_mps: raw.car_speed,
        fuel_left: raw.fuel_left,
        fuel_use_active: raw.fuel_use_active == 1,
        water_temp: raw.engine_water_temp,
        oil_temp: raw.engine_oil_temp,
        overheating: false,
        laps: LapTimes {
            current: valid_time(raw.lap_time_current_self),
            previous: valid_time(raw.lap_time_previous_self),
            best_self: valid_time(raw.lap_time_best_self),
            best_session: valid_time(raw.lap_time_best_leader),
        },
        sector: 1,
        splits: SectorSplits::default(),
        position: raw.position,
        num_cars: raw.num_cars,
        completed_laps: raw.completed_laps,
        laps_total: if number_of_laps > 0 { Some(number_of_laps) } else { None },
        time_remaining: valid_time(raw.session_time_remaining),
        pit_window: pit_window(raw.pit_window_status),
        pit_limiter: raw.pit_limiter == 1,
        drs: DrsState {
            available: raw.drs_available == 1,
            engaged: raw.drs_engaged == 1,
        },
        push_to_pass: Some(PushToPass {
            available: ptp.available > 0,
            engaged: ptp.engaged > 0,
            amount_left: ptp.amount_left,
            engaged_time_left: ptp.engaged_time_left,
            wait_time_left: ptp.wait_time_left,
        }),
    };

    if let Some(dd) = driver {
        let sector = dd.track_sector;
        snap.sector = sector.clamp(1, 3) as u8;
        let current = dd.sector_time_current_self;
        let previous = dd.sector_time_previous_self;
        let best_self = dd.sector_time_best_self;
        let best_session = raw.session_best_lap_sector_times;
        snap.splits = SectorSplits {
            current: [valid_time(current[0]), valid_time(current[1])],
            previous: [valid_time(previous[0]), valid_time(previous[1])],
            best_self: [valid_time(best_self[0]), valid_time(best_self[1])],
            best_session: [valid_time(best_session[0]), valid_time(best_session[1])],
        };
    }

    snap
}

#[cfg(windows)]
pub use source::R3eSource;

#[cfg(windows)]
mod source {
    use std::time::Duration;

    use async_std::task;
    use async_trait::async_trait;

    use super::super::shared_memory::{MapError, SharedMemoryMap};
    use super::super::{Snapshot, SourceProfile, TelemetrySource};
    use super::{normalize, profile, R3eShared, R3E_SMM_TAG};

    pub struct R3eSource {
        map: SharedMemoryMap<R3eShared>,
    }

    impl R3eSource {
        pub fn open() -> Result<R3eSource, MapError> {
            let map = SharedMemoryMap::open(R3E_SMM_TAG)?;
            Ok(R3eSource { map })
        }
    }

    #[async_trait]
    impl TelemetrySource for R3eSource {
        fn name(&self) -> &'static str {
            "RaceRoom Racing Experience"
        }

        fn profile(&self) -> SourceProfile {
            profile()
        }

        async fn next_snapshot(&mut self) -> Option<Snapshot> {
            task::sleep(Duration::from_millis(10)).await;
            Some(normalize(&self.map.read()))
        }
    }
}
