//! The dashboard state engine. One `tick` per telemetry snapshot: session
//! tracking, model updates on sector transitions, info text rotation, and
//! warning overlays, producing the `DisplayState` for the device.

pub mod blink;
pub mod fuel;
pub mod info_text;
pub mod session;
pub mod temperature;
pub mod warnings;

use std::time::Instant;

use crate::display::{DisplayState, STATUS_FUEL, STATUS_PIT, STATUS_SHIFT, STATUS_TEMPERATURE};
use crate::settings::{CompareLap, Settings, SpeedUnits};
use crate::telemetry::{mps_to_kph, mps_to_mph, Snapshot, SourceProfile};

use blink::BlinkClock;
use fuel::FuelModel;
use info_text::{InfoPage, InfoTextSequencer};
use session::{SessionTracker, SessionTransition};
use temperature::TemperatureModel;

pub struct DashboardStateEngine {
    profile: SourceProfile,
    session: SessionTracker,
    blink: BlinkClock,
    fuel: FuelModel,
    temperature: TemperatureModel,
    info: InfoTextSequencer,
    compare_lap: Option<f32>,
    compare_sector: Option<f32>,
    current_sector: Option<u8>,
    prev_fuel: Option<f32>,
    prev_water: Option<f32>,
    prev_oil: Option<f32>,
    use_green: bool,
}

impl DashboardStateEngine {
    pub fn new(profile: SourceProfile) -> DashboardStateEngine {
        DashboardStateEngine {
            profile,
            session: SessionTracker::new(),
            blink: BlinkClock::new(),
            fuel: FuelModel::new(),
            temperature: TemperatureModel::new(),
            info: InfoTextSequencer::new(),
            compare_lap: None,
            compare_sector: None,
            current_sector: None,
            prev_fuel: None,
            prev_water: None,
            prev_oil: None,
            use_green: true,
        }
    }

    pub fn fuel_estimate(&self) -> Option<f32> {
        self.fuel.estimate()
    }

    /// One tick. `None` means the display should show its reset state: no
    /// session in progress, or the engine is not running (stale warnings are
    /// never shown while parked).
    pub fn tick(
        &mut self,
        snap: &Snapshot,
        settings: &Settings,
        now: Instant,
    ) -> Option<DisplayState> {
        match self.session.update(snap.session.as_ref()) {
            SessionTransition::NoSession => return None,
            SessionTransition::Started => {
                info!["New session detected"];
                self.reset_session_state();
            }
            SessionTransition::Unchanged => {}
        }

        self.blink
            .advance(now, settings.led_blink.duration, settings.text_blink.duration);
        let led_phase_on = self.blink.led_phase_on(now, settings.led_blink.duration);
        let text_phase_on = self.blink.text_phase_on(now, settings.text_blink.duration);

        // sector transitions consume the readings captured on the previous
        // tick, never the post-transition values
        if self.current_sector != Some(snap.sector) {
            self.info.on_sector_entry(now);
            self.current_sector = Some(snap.sector);
            if settings.fuel.enabled && snap.fuel_use_active {
                if let Some(fuel) = self.prev_fuel {
                    let capacity = window_capacity(self.profile.fuel_window_scale, settings.fuel.samples);
                    self.fuel.on_sector_transition(
                        fuel,
                        capacity,
                        self.profile.fuel_window_scale as f32,
                    );
                    if let Some(estimate) = self.fuel.estimate() {
                        debug!["Average fuel use: {:4.2} L per lap", estimate];
                    }
                }
            }
            if settings.temperature.enabled {
                if let (Some(water), Some(oil)) = (self.prev_water, self.prev_oil) {
                    let capacity =
                        window_capacity(self.profile.fuel_window_scale, settings.temperature.samples);
                    self.temperature.on_sector_transition(water, oil, capacity);
                }
            }
        }
        self.prev_fuel = Some(snap.fuel_left.max(0.0));
        self.prev_water = Some(snap.water_temp);
        self.prev_oil = Some(snap.oil_temp);

        // the green group may be on DRS/PTP duty; that changes the group
        // count before the RPM fraction is computed
        if self.profile.has_drs_ptp {
            self.use_green =
                warnings::green_channel_assignment(self.use_green, snap, settings.drs_ptp.led);
        }

        let mut state = DisplayState::reset();
        state.use_green = self.use_green;
        let mut status = [false; 4];

        if snap.max_rpm > 0.0 {
            let raw = (snap.rpm / snap.max_rpm).max(0.0);
            let groups =
                state.use_green as u32 + state.use_red as u32 + state.use_blue as u32;
            let span = groups as f32 * settings.rpm.range;
            if span > 0.0 {
                state.rpm_fraction = ((raw - (1.0 - span)) / span).max(0.0);
            }
            if raw >= settings.rpm.shift {
                status[STATUS_SHIFT] = true;
            }
        }

        state.gear = gear_glyph(snap.gear, settings.neutral_glyph());
        state.left = match snap.laps.current {
            Some(t) => lap_clock(t),
            None => "-.--.-".to_string(),
        };
        state.right = format_speed(snap.speed_mps, settings.speed.units);

        self.apply_info_page(snap, settings, now, &mut state);

        let overlay = warnings::evaluate(
            snap,
            self.fuel.estimate(),
            &self.temperature,
            &self.profile,
            settings,
            led_phase_on,
            text_phase_on,
        );
        for bit in [STATUS_FUEL, STATUS_TEMPERATURE, STATUS_PIT] {
            status[bit] = overlay.status[bit];
        }
        if let Some(left) = overlay.left {
            state.left = left;
        }
        if let Some(right) = overlay.right {
            state.right = right;
        }
        state.green_override = overlay.green_override;

        if !snap.engine_running {
            return None;
        }
        state.status = status;
        Some(state)
    }

    fn reset_session_state(&mut self) {
        self.fuel.reset();
        self.temperature.reset();
        self.info.reset();
        self.compare_lap = None;
        self.compare_sector = None;
        self.current_sector = None;
        self.prev_fuel = None;
        self.prev_water = None;
        self.prev_oil = None;
        self.use_green = true;
    }

    fn apply_info_page(
        &mut self,
        snap: &Snapshot,
        settings: &Settings,
        now: Instant,
        state: &mut DisplayState,
    ) {
        let page = self.info.active_page(snap.sector, now, &settings.info_text);

        // the comparison lap updates only outside the lap split window, so
        // the delta on display never compares a lap against itself
        if snap.sector == 1 && page != Some(InfoPage::LapSplit) {
            self.compare_lap = match settings.info_text.lap_split.compare_lap {
                CompareLap::SelfPrevious => snap.laps.previous,
                CompareLap::SelfBest => snap.laps.best_self,
                CompareLap::SessionBest => snap.laps.best_session,
            };
        }

        match page {
            Some(InfoPage::LapSplit) => {
                state.left = match snap.laps.previous {
                    Some(t) => lap_clock(t),
                    None => "-.--.-".to_string(),
                };
                state.right = match (self.compare_lap, snap.laps.previous) {
                    (Some(compare), Some(previous)) => split_delta(previous - compare),
                    _ => "--.--".to_string(),
                };
            }
            Some(InfoPage::Position) => {
                state.left = format!("P{:>3}", snap.position);
                state.right = format!(" {:<3}", snap.num_cars);
            }
            Some(InfoPage::Remaining) => {
                state.left = format!("L{:>3}", snap.completed_laps);
                state.right = match (snap.laps_total, snap.time_remaining) {
                    (Some(laps), _) if laps > 0 => format!(" {:<3}", laps),
                    (_, Some(t)) if t > 0.0 => remaining_clock(t),
                    _ => "    ".to_string(),
                };
            }
            Some(InfoPage::SectorSplit) => {
                let split = (snap.sector.clamp(2, 3) - 2) as usize;
                self.compare_sector = match settings.info_text.sector_split.compare_lap {
                    CompareLap::SelfPrevious => snap.splits.previous[split],
                    CompareLap::SelfBest => snap.splits.best_self[split],
                    CompareLap::SessionBest => snap.splits.best_session[split],
                };
                state.right = match (self.compare_sector, snap.splits.current[split]) {
                    (Some(compare), Some(current)) => split_delta(current - compare),
                    _ => "--.--".to_string(),
                };
            }
            None => {}
        }
    }
}

fn window_capacity(scale: u32, samples: f32) -> usize {
    (scale as f32 * samples.max(0.0)).round() as usize
}

fn gear_glyph(gear: i32, neutral: char) -> char {
    match gear {
        -1 => 'r',
        0 => neutral,
        1..=9 => (b'0' + gear as u8) as char,
        _ => '-',
    }
}

/// Running clock as `M.SS.T` (minutes, seconds, tenths).
fn lap_clock(seconds: f32) -> String {
    let seconds = seconds.max(0.0);
    let minutes = (seconds / 60.0).floor();
    format!("{:.0}.{:04.1}", minutes, seconds - minutes * 60.0)
}

/// Session time remaining as `MM.SS.T`.
fn remaining_clock(seconds: f32) -> String {
    let seconds = seconds.max(0.0);
    let minutes = (seconds / 60.0).floor();
    format!("{:02.0}.{:04.1}", minutes, seconds - minutes * 60.0)
}

fn split_delta(delta: f32) -> String {
    format!("{:04.2}", delta)
}

fn format_speed(mps: f32, units: SpeedUnits) -> String {
    let speed = match units {
        SpeedUnits::Mph => mps_to_mph(mps),
        SpeedUnits::Kmh => mps_to_kph(mps),
    };
    format!("{}", speed.max(0.0) as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{LapTimes, PitWindow, SessionId, SessionKind};
    use std::time::Duration;

    fn session(track: &str, car: &str) -> SessionId {
        SessionId {
            track: track.to_string(),
            car: car.to_string(),
            kind: SessionKind::Race,
            epoch: 0,
        }
    }

    fn racing_snapshot() -> Snapshot {
        Snapshot {
            session: Some(session("spa", "gt3")),
            engine_running: true,
            rpm: 5000.0,
            max_rpm: 7000.0,
            gear: 3,
            speed_mps: 44.704,
            fuel_left: 30.0,
            fuel_use_active: true,
            water_temp: 80.0,
            oil_temp: 100.0,
            laps: LapTimes {
                current: Some(35.2),
                previous: Some(92.5),
                best_self: Some(91.0),
                best_session: Some(90.0),
                ..LapTimes::default()
            },
            sector: 1,
            position: 4,
            num_cars: 20,
            completed_laps: 7,
            laps_total: Some(30),
            ..Snapshot::default()
        }
    }

    fn engine() -> DashboardStateEngine {
        DashboardStateEngine::new(SourceProfile::default())
    }

    fn at(base: Instant, secs: f32) -> Instant {
        base + Duration::from_secs_f32(secs)
    }

    #[test]
    fn formatting_helpers() {
        assert_eq!(lap_clock(83.45), "1.23.4");
        assert_eq!(lap_clock(5.0), "0.05.0");
        assert_eq!(remaining_clock(754.3), "12.34.3");
        assert_eq!(split_delta(0.5), "0.50");
        assert_eq!(split_delta(-1.2), "-1.20");
        assert_eq!(format_speed(30.0, SpeedUnits::Mph), "67");
        assert_eq!(format_speed(10.0, SpeedUnits::Kmh), "36");
    }

    #[test]
    fn gear_glyphs() {
        assert_eq!(gear_glyph(-1, 'n'), 'r');
        assert_eq!(gear_glyph(0, 'n'), 'n');
        assert_eq!(gear_glyph(0, '-'), '-');
        assert_eq!(gear_glyph(6, 'n'), '6');
        assert_eq!(gear_glyph(-2, 'n'), '-');
        assert_eq!(gear_glyph(42, 'n'), '-');
    }

    #[test]
    fn neutral_and_reverse_end_to_end() {
        let mut engine = engine();
        let now = Instant::now();
        let mut snap = racing_snapshot();
        snap.gear = 0;
        let state = engine.tick(&snap, &Settings::default(), now).unwrap();
        assert_eq!(state.gear, 'n');
        snap.gear = -1;
        let state = engine.tick(&snap, &Settings::default(), now).unwrap();
        assert_eq!(state.gear, 'r');
    }

    #[test]
    fn zero_max_rpm_never_shifts() {
        let mut engine = engine();
        let mut snap = racing_snapshot();
        snap.rpm = 9000.0;
        snap.max_rpm = 0.0;
        let state = engine.tick(&snap, &Settings::default(), Instant::now()).unwrap();
        assert_eq!(state.rpm_fraction, 0.0);
        assert!(!state.status[STATUS_SHIFT]);
    }

    #[test]
    fn rpm_fraction_spans_the_led_range() {
        let mut engine = engine();
        let mut snap = racing_snapshot();
        snap.rpm = 6650.0;
        snap.max_rpm = 7000.0;
        let state = engine.tick(&snap, &Settings::default(), Instant::now()).unwrap();
        // raw 0.95 over a 3 x 0.13 span: (0.95 - 0.61) / 0.39
        assert!((state.rpm_fraction - 0.871_794_9).abs() < 1e-4);
        assert!(state.status[STATUS_SHIFT]);
    }

    #[test]
    fn below_the_led_range_is_clamped_dark() {
        let mut engine = engine();
        let mut snap = racing_snapshot();
        snap.rpm = 2000.0;
        snap.max_rpm = 7000.0;
        let state = engine.tick(&snap, &Settings::default(), Instant::now()).unwrap();
        assert_eq!(state.rpm_fraction, 0.0);
        assert!(!state.status[STATUS_SHIFT]);
    }

    #[test]
    fn no_session_or_stopped_engine_resets_display() {
        let mut engine = engine();
        let mut snap = racing_snapshot();
        snap.session = None;
        assert!(engine.tick(&snap, &Settings::default(), Instant::now()).is_none());
        let mut snap = racing_snapshot();
        snap.engine_running = false;
        assert!(engine.tick(&snap, &Settings::default(), Instant::now()).is_none());
    }

    #[test]
    fn invalid_lap_shows_placeholder_clock() {
        let mut engine = engine();
        let settings = Settings::default();
        let base = Instant::now();
        let mut snap = racing_snapshot();
        snap.laps.current = None;
        // out past the info rotation so the base text shows through
        engine.tick(&snap, &settings, at(base, 0.0));
        let state = engine.tick(&snap, &settings, at(base, 10.0)).unwrap();
        assert_eq!(state.left, "-.--.-");
    }

    #[test]
    fn fuel_estimate_builds_over_sector_transitions() {
        let mut engine = engine();
        let settings = Settings::default();
        let base = Instant::now();
        let mut snap = racing_snapshot();
        snap.fuel_left = 60.0;
        let mut t = 0.0;
        engine.tick(&snap, &settings, at(base, t));
        // ten sector changes burning 0.8 L each: the first seeds the
        // comparison point, the next nine fill the 3 x 3 sample window
        for sector in [2u8, 3, 1, 2, 3, 1, 2, 3, 1, 2] {
            snap.fuel_left -= 0.8;
            snap.sector = sector;
            t += 30.0;
            engine.tick(&snap, &settings, at(base, t));
        }
        let estimate = engine.fuel_estimate().expect("window should be full");
        // uniform samples: weighted average equals 3 x the sector burn
        assert!((estimate - 2.4).abs() < 1e-3);
    }

    #[test]
    fn session_change_resets_models() {
        let mut engine = engine();
        let settings = Settings::default();
        let base = Instant::now();
        let mut snap = racing_snapshot();
        snap.fuel_left = 60.0;
        let mut t = 0.0;
        engine.tick(&snap, &settings, at(base, t));
        for sector in [2u8, 3, 1, 2, 3, 1, 2, 3, 1, 2] {
            snap.fuel_left -= 0.8;
            snap.sector = sector;
            t += 30.0;
            engine.tick(&snap, &settings, at(base, t));
        }
        assert!(engine.fuel_estimate().is_some());
        snap.session = Some(session("spa", "lmp2"));
        engine.tick(&snap, &settings, at(base, t + 30.0));
        assert!(engine.fuel_estimate().is_none());
    }

    #[test]
    fn lap_split_then_comparison_update() {
        let mut engine = engine();
        let settings = Settings::default();
        let base = Instant::now();
        let mut snap = racing_snapshot();
        snap.laps.previous = Some(92.0);

        // first crossing: no comparison lap yet
        let state = engine.tick(&snap, &settings, at(base, 0.0)).unwrap();
        assert_eq!(state.left, lap_clock(92.0));
        assert_eq!(state.right, "--.--");

        // after the split window the comparison lap latches the previous lap
        engine.tick(&snap, &settings, at(base, 4.0));

        // next lap is two seconds quicker
        let mut t = 4.0;
        for sector in [2u8, 3] {
            snap.sector = sector;
            t += 30.0;
            engine.tick(&snap, &settings, at(base, t));
        }
        snap.sector = 1;
        snap.laps.previous = Some(90.0);
        let state = engine.tick(&snap, &settings, at(base, t + 30.0)).unwrap();
        assert_eq!(state.left, lap_clock(90.0));
        assert_eq!(state.right, "-2.00");
    }

    #[test]
    fn sector_split_page_shows_delta_against_best() {
        let mut engine = engine();
        let mut settings = Settings::default();
        settings.info_text.sector_split.compare_lap = CompareLap::SelfBest;
        let base = Instant::now();
        let mut snap = racing_snapshot();
        snap.splits.best_self = [Some(28.0), Some(31.0)];
        snap.splits.current = [Some(28.5), None];
        engine.tick(&snap, &settings, at(base, 0.0));
        snap.sector = 2;
        let state = engine.tick(&snap, &settings, at(base, 30.0)).unwrap();
        assert_eq!(state.right, "0.50");
    }

    #[test]
    fn sector_split_without_comparison_shows_placeholder() {
        let mut engine = engine();
        let settings = Settings::default();
        let base = Instant::now();
        let mut snap = racing_snapshot();
        snap.splits.best_session = [None, None];
        snap.splits.current = [Some(28.5), None];
        engine.tick(&snap, &settings, at(base, 0.0));
        snap.sector = 2;
        let state = engine.tick(&snap, &settings, at(base, 30.0)).unwrap();
        assert_eq!(state.right, "--.--");
    }

    #[test]
    fn remaining_page_prefers_lap_count() {
        let mut engine = engine();
        let mut settings = Settings::default();
        settings.info_text.lap_split.enabled = false;
        settings.info_text.position.enabled = false;
        let base = Instant::now();
        let mut snap = racing_snapshot();
        snap.laps_total = Some(30);
        snap.time_remaining = Some(600.0);
        let state = engine.tick(&snap, &settings, at(base, 0.0)).unwrap();
        assert_eq!(state.left, "L  7");
        assert_eq!(state.right, " 30 ");
        // timed session: fall back to the clock
        snap.laps_total = None;
        let state = engine.tick(&snap, &settings, at(base, 1.0)).unwrap();
        assert_eq!(state.right, "10.00.0");
    }

    #[test]
    fn pit_state_reaches_the_status_vector() {
        let mut engine = engine();
        let mut snap = racing_snapshot();
        snap.pit_window = PitWindow::Open;
        let state = engine.tick(&snap, &Settings::default(), Instant::now()).unwrap();
        assert!(state.status[STATUS_PIT]);
    }

    #[test]
    fn settings_swap_does_not_reset_session_state() {
        let mut engine = engine();
        let settings = Settings::default();
        let base = Instant::now();
        let mut snap = racing_snapshot();
        snap.fuel_left = 60.0;
        let mut t = 0.0;
        engine.tick(&snap, &settings, at(base, t));
        for sector in [2u8, 3, 1, 2, 3, 1, 2, 3, 1, 2] {
            snap.fuel_left -= 0.8;
            snap.sector = sector;
            t += 30.0;
            engine.tick(&snap, &settings, at(base, t));
        }
        assert!(engine.fuel_estimate().is_some());
        let mut swapped = Settings::default();
        swapped.speed.units = SpeedUnits::Kmh;
        let state = engine.tick(&snap, &swapped, at(base, t + 1.0)).unwrap();
        assert!(engine.fuel_estimate().is_some());
        assert!(!state.left.is_empty());
    }
}
