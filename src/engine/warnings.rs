//! Warning evaluation: fuel, temperature, and pit status bits with their
//! text overrides, plus the DRS/push-to-pass effects. Pure functions of the
//! snapshot, the models, and the blink phases.
//!
//! Priority is fixed by evaluation order: fuel and heat contend for the left
//! field, pit for the right, and DRS/PTP runs last and wins both fields and
//! the green LED pattern for the tick.

use crate::display::{STATUS_FUEL, STATUS_PIT, STATUS_TEMPERATURE};
use crate::engine::temperature::TemperatureModel;
use crate::settings::Settings;
use crate::telemetry::{PitWindow, Snapshot, SourceProfile, TempPolicy};

#[derive(Debug, Default, PartialEq)]
pub struct WarningOverlay {
    pub status: [bool; 4],
    pub left: Option<String>,
    pub right: Option<String>,
    pub green_override: Option<[bool; 4]>,
}

/// The green RPM group is lent to DRS/PTP duty while any of it is in play,
/// and returned once everything is idle. In between (engaged but spent, for
/// example) the previous assignment holds.
pub fn green_channel_assignment(current: bool, snap: &Snapshot, led_enabled: bool) -> bool {
    let ptp_active = snap
        .push_to_pass
        .map_or(false, |p| p.amount_left > 0 || p.engaged);
    let ptp_idle = snap.push_to_pass.map_or(true, |p| !p.available && !p.engaged);
    if (ptp_active || snap.drs.engaged) && led_enabled {
        false
    } else if ptp_idle && !snap.drs.engaged {
        true
    } else {
        current
    }
}

pub fn evaluate(
    snap: &Snapshot,
    fuel_estimate: Option<f32>,
    temperature: &TemperatureModel,
    profile: &SourceProfile,
    settings: &Settings,
    led_phase_on: bool,
    text_phase_on: bool,
) -> WarningOverlay {
    let mut overlay = WarningOverlay::default();
    let led_blink = settings.led_blink.enabled && led_phase_on;
    let text_blink = settings.text_blink.enabled && text_phase_on;

    // fuel: warning once the estimated laps of fuel left drop to the
    // configured count, blinking below the critical count
    if settings.fuel.enabled && snap.fuel_use_active {
        if let Some(estimate) = fuel_estimate.filter(|e| *e > 0.0) {
            let laps_left = snap.fuel_left.max(0.0) / estimate;
            if laps_left <= settings.fuel.warning {
                overlay.status[STATUS_FUEL] = true;
                if laps_left < settings.fuel.critical {
                    if led_blink {
                        overlay.status[STATUS_FUEL] = false;
                    }
                    if text_blink {
                        overlay.left = Some("fuel".to_string());
                    }
                }
            }
        }
    }

    // temperature: deltas above the frozen baseline
    if settings.temperature.enabled {
        let (warn_delta, critical_delta) = match profile.temp_policy {
            TempPolicy::Configured => (settings.temperature.warning, settings.temperature.critical),
            TempPolicy::BaselineSpread => {
                let spread = temperature.baseline_spread().unwrap_or(f32::INFINITY);
                (spread, spread * 1.5)
            }
        };
        let status = temperature.status(
            snap.water_temp,
            snap.oil_temp,
            snap.overheating,
            warn_delta,
            critical_delta,
        );
        if status.warning {
            overlay.status[STATUS_TEMPERATURE] = true;
            if status.critical {
                if led_blink {
                    overlay.status[STATUS_TEMPERATURE] = false;
                }
                if text_blink {
                    overlay.left = Some("heat".to_string());
                }
            }
        }
    }

    // pit: steady while the window is open, blinking while stopped for
    // service or running the limiter
    if snap.pit_window == PitWindow::Open {
        overlay.status[STATUS_PIT] = true;
    }
    if snap.pit_window == PitWindow::Stopped || snap.pit_limiter {
        overlay.status[STATUS_PIT] = !led_blink;
        if text_blink {
            overlay.right = Some("pit ".to_string());
        }
    }

    if profile.has_drs_ptp {
        apply_drs_ptp(snap, settings, led_blink, text_phase_on, &mut overlay);
    }

    overlay
}

/// DRS and push-to-pass effects on the green group and the text fields.
/// Charge/deplete bar graphs take over inside the last four seconds.
fn apply_drs_ptp(
    snap: &Snapshot,
    settings: &Settings,
    led_blink: bool,
    text_phase_on: bool,
    overlay: &mut WarningOverlay,
) {
    let drs_text = settings.drs_ptp.text && text_phase_on;

    if snap.drs.engaged {
        overlay.green_override = Some(if led_blink {
            pattern("0110")
        } else {
            pattern("1001")
        });
        if drs_text {
            overlay.left = Some("drs ".to_string());
            overlay.right = Some(" on ".to_string());
        }
    }

    let ptp = match snap.push_to_pass {
        Some(p) => p,
        None => return,
    };

    // cool-down: charging effect over the last four seconds
    if ptp.amount_left > 0 && !ptp.engaged {
        if ptp.wait_time_left <= 4.0 {
            overlay.green_override = Some(charge_bar(ptp.wait_time_left));
        } else {
            overlay.green_override = Some(if led_blink {
                pattern("0000")
            } else {
                pattern("1000")
            });
        }
    }

    // engaged: depleting effect over the last four seconds
    if ptp.engaged {
        if ptp.engaged_time_left <= 4.0 {
            overlay.green_override = Some(deplete_bar(ptp.engaged_time_left));
        } else {
            overlay.green_override = Some(if led_blink {
                pattern("0110")
            } else {
                pattern("1001")
            });
            if drs_text {
                overlay.left = Some(" ptp".to_string());
                overlay.right = Some(format!("{:<4}", ptp.amount_left));
            }
        }
    }
}

fn pattern(bits: &str) -> [bool; 4] {
    let mut leds = [false; 4];
    for (i, c) in bits.chars().take(4).enumerate() {
        leds[i] = c == '1';
    }
    leds
}

/// Seconds remaining map to dark LEDs filling from the right.
fn charge_bar(wait_seconds: f32) -> [bool; 4] {
    let dark = (wait_seconds.max(0.0) as usize).min(4);
    let mut leds = [true; 4];
    for slot in leds.iter_mut().skip(4 - dark) {
        *slot = false;
    }
    leds
}

/// Seconds remaining map to lit LEDs draining from the left.
fn deplete_bar(engaged_seconds: f32) -> [bool; 4] {
    let lit = (engaged_seconds.max(0.0) as usize).min(4);
    let mut leds = [false; 4];
    for slot in leds.iter_mut().skip(4 - lit) {
        *slot = true;
    }
    leds
}
