//! Assetto Corsa adapter. AC publishes three separate blocks (physics,
//! graphics, static) with UTF-16 strings and millisecond lap times. Gear 0
//! is reverse and 1 is neutral, speed is already km/h, and there is no pit
//! window or temperature telemetry, so those paths stay inert.

use super::{
    valid_time, DrsState, LapTimes, PitWindow, SectorSplits, SessionId, SessionKind, Snapshot,
    SourceProfile, TempPolicy,
};

pub const AC_PHYSICS_TAG: &str = "Local\\acpmf_physics";
pub const AC_GRAPHICS_TAG: &str = "Local\\acpmf_graphics";
pub const AC_STATIC_TAG: &str = "Local\\acpmf_static";

#[repr(C, packed(4))]
#[derive(Clone, Copy)]
pub struct AcPhysics {
    pub packet_id: i32,
    pub gas: f32,
    pub brake: f32,
    pub fuel: f32,
    pub gear: i32,
    pub rpm: i32,
    pub steer_angle: f32,
    pub speed_kmh: f32,
    pub velocity: [f32; 3],
    pub acc_g: [f32; 3],
    pub wheel_slip: [f32; 4],
    pub wheel_load: [f32; 4],
    pub tire_pressure: [f32; 4],
    pub wheel_angular_velocity: [f32; 4],
    pub tire_wear: [f32; 4],
    pub tire_dirt_level: [f32; 4],
    pub tire_temperature: [f32; 4],
    pub camber: [f32; 4],
    pub suspension_travel: [f32; 4],
    pub drs: f32,
    pub tc: f32,
    pub heading: f32,
    pub pitch: f32,
    pub roll: f32,
    pub cg_height: f32,
    pub damage: [f32; 5],
    pub wheels_off_track: i32,
    pub pit_limiter: i32,
    pub abs_level: f32,
    pub kers_charge: f32,
    pub kers_input: f32,
    pub auto_shifter_on: i32,
    pub ride_height: [f32; 2],
    pub turbo_boost: f32,
    pub ballast: f32,
    pub air_density: f32,
    pub air_temperature: f32,
    pub track_temperature: f32,
    pub local_angular_velocity: [f32; 3],
    pub final_ff: f32,
}

#[repr(C, packed(4))]
#[derive(Clone, Copy)]
pub struct AcGraphics {
    pub packet_id: i32,
    pub status: i32,
    pub session: i32,
    pub current_time: [u16; 15],
    pub last_time: [u16; 15],
    pub best_time: [u16; 15],
    pub split: [u16; 15],
    pub completed_laps: i32,
    pub position: i32,
    pub i_current_time: i32,
    pub i_last_time: i32,
    pub i_best_time: i32,
    pub session_time_left: f32,
    pub distance_traveled: f32,
    pub in_pit: i32,
    pub current_sector: i32,
    pub last_sector_time: i32,
    pub number_of_laps: i32,
    pub tire_compound: [u16; 33],
    pub replay_time_multiplier: f32,
    pub normalized_position: f32,
    pub coordinates: [f32; 3],
    pub penalty_time: f32,
    pub flag: i32,
    pub ideal_line: i32,
    pub in_pit_lane: i32,
    pub surface_grip: f32,
}

#[repr(C, packed(4))]
#[derive(Clone, Copy)]
pub struct AcStatic {
    pub sm_version: [u16; 15],
    pub ac_version: [u16; 15],
    pub number_of_sessions: i32,
    pub num_cars: i32,
    pub car_model: [u16; 33],
    pub track: [u16; 33],
    pub player_name: [u16; 33],
    pub player_surname: [u16; 33],
    pub player_nick: [u16; 33],
    pub sector_count: i32,
    pub max_torque: f32,
    pub max_power: f32,
    pub max_rpm: i32,
    pub max_fuel: f32,
    pub suspension_max_travel: [f32; 4],
    pub tire_radius: [f32; 4],
    pub max_turbo_boost: f32,
    pub unused1: f32,
    pub unused2: f32,
    pub penalties_enabled: i32,
    pub aid_fuel_rate: f32,
    pub aid_tire_rate: f32,
    pub aid_damage_rate: f32,
    pub aid_tire_blankets: i32,
    pub aid_stability: f32,
    pub aid_auto_clutch: i32,
    pub aid_auto_blip: i32,
}

pub fn profile() -> SourceProfile {
    SourceProfile {
        fuel_window_scale: 3,
        temp_policy: TempPolicy::Configured,
        has_drs_ptp: false,
    }
}

fn widestr(units: &[u16]) -> String {
    let end = units.iter().position(|&u| u == 0).unwrap_or(units.len());
    String::from_utf16_lossy(&units[..end])
}

fn session_kind(session: i32) -> SessionKind {
    match session {
        0 => SessionKind::Practice,
        1 => SessionKind::Qualify,
        2 => SessionKind::Race,
        other => SessionKind::Other(other),
    }
}

/// Millisecond lap fields use zero for not-yet-set.
fn valid_millis(ms: i32) -> Option<f32> {
    valid_time(ms as f32 / 1000.0)
}

pub fn normalize(physics: &AcPhysics, graphics: &AcGraphics, statics: &AcStatic) -> Snapshot {
    let num_cars = statics.num_cars;
    let session = if num_cars > 0 {
        let track = statics.track;
        let car_model = statics.car_model;
        Some(SessionId {
            track: widestr(&track),
            car: widestr(&car_model),
            kind: session_kind(graphics.session),
            epoch: 0,
        })
    } else {
        None
    };

    // AC counts sectors from zero
    let sector = (graphics.current_sector.clamp(0, 2) + 1) as u8;

    // only the most recent completed split is published; comparisons come
    // from the lap history the engine keeps
    let mut splits = SectorSplits::default();
    let last_split = valid_millis(graphics.last_sector_time);
    if sector == 2 {
        splits.current[0] = last_split;
    } else if sector == 3 {
        splits.current[1] = last_split;
    }

    let number_of_laps = graphics.number_of_laps;
    Snapshot {
        session,
        engine_running: physics.rpm > 1,
        rpm: physics.rpm as f32,
        max_rpm: statics.max_rpm as f32,
        // AC: 0 reverse, 1 neutral, 2 first gear
        gear: physics.gear - 1,
        speed_mps: physics.speed_kmh / 3.6,
        fuel_left: physics.fuel,
        fuel_use_active: statics.aid_fuel_rate > 0.0,
        water_temp: 0.0,
        oil_temp: 0.0,
        overheating: false,
        laps: LapTimes {
            current: valid_millis(graphics.i_current_time),
            previous: valid_millis(graphics.i_last_time),
            best_self: valid_millis(graphics.i_best_time),
            best_session: None,
        },
        sector,
        splits,
        position: graphics.position,
        num_cars,
        completed_laps: graphics.completed_laps,
        laps_total: if number_of_laps > 0 { Some(number_of_laps) } else { None },
        time_remaining: valid_time(graphics.session_time_left / 1000.0),
        pit_window: if graphics.in_pit_lane != 0 {
            PitWindow::Stopped
        } else {
            PitWindow::Unavailable
        },
        pit_limiter: physics.pit_limiter != 0,
        drs: DrsState {
            available: physics.drs >= 1.0,
            engaged: physics.drs >= 1.0,
        },
        push_to_pass: None,
    }
}

#[cfg(windows)]
pub use source::AcSource;

#[cfg(windows)]
mod source {
    use std::time::Duration;

    use async_std::task;
    use async_trait::async_trait;

    use super::super::shared_memory::{MapError, SharedMemoryMap};
    use super::super::{Snapshot, SourceProfile, TelemetrySource};
    use super::{
        normalize, profile, AcGraphics, AcPhysics, AcStatic, AC_GRAPHICS_TAG, AC_PHYSICS_TAG,
        AC_STATIC_TAG,
    };

    pub struct AcSource {
        physics: SharedMemoryMap<AcPhysics>,
        graphics: SharedMemoryMap<AcGraphics>,
        statics: SharedMemoryMap<AcStatic>,
    }

    impl AcSource {
        pub fn open() -> Result<AcSource, MapError> {
            Ok(AcSource {
                physics: SharedMemoryMap::open(AC_PHYSICS_TAG)?,
                graphics: SharedMemoryMap::open(AC_GRAPHICS_TAG)?,
                statics: SharedMemoryMap::open(AC_STATIC_TAG)?,
            })
        }
    }

    #[async_trait]
    impl TelemetrySource for AcSource {
        fn name(&self) -> &'static str {
            "Assetto Corsa"
        }

        fn profile(&self) -> SourceProfile {
            profile()
        }

        async fn next_snapshot(&mut self) -> Option<Snapshot> {
            task::sleep(Duration::from_millis(10)).await;
            Some(normalize(
                &self.physics.read(),
                &self.graphics.read(),
                &self.statics.read(),
            ))
        }
    }
}
