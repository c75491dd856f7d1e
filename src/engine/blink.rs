//! Synchronized blink phases. Everything that blinks does so in unison per
//! channel: one anchor for the LEDs, one for the text, re-armed every two
//! durations.

use std::time::Instant;

#[derive(Debug, Default)]
pub struct BlinkClock {
    led_anchor: Option<Instant>,
    text_anchor: Option<Instant>,
}

impl BlinkClock {
    pub fn new() -> BlinkClock {
        BlinkClock::default()
    }

    /// Re-anchors any channel whose full on+off cycle has elapsed. The
    /// boundary at exactly two durations re-anchors, so there is never a gap
    /// or overlap tick.
    pub fn advance(&mut self, now: Instant, led_duration: f32, text_duration: f32) {
        Self::advance_channel(&mut self.led_anchor, now, led_duration);
        Self::advance_channel(&mut self.text_anchor, now, text_duration);
    }

    fn advance_channel(anchor: &mut Option<Instant>, now: Instant, duration: f32) {
        let elapsed = anchor.map(|t| now.saturating_duration_since(t).as_secs_f32());
        match elapsed {
            Some(e) if e < duration * 2.0 => {}
            _ => *anchor = Some(now),
        }
    }

    /// True during the first `duration` seconds of the LED cycle.
    pub fn led_phase_on(&self, now: Instant, duration: f32) -> bool {
        Self::phase_on(self.led_anchor, now, duration)
    }

    /// True during the first `duration` seconds of the text cycle.
    pub fn text_phase_on(&self, now: Instant, duration: f32) -> bool {
        Self::phase_on(self.text_anchor, now, duration)
    }

    fn phase_on(anchor: Option<Instant>, now: Instant, duration: f32) -> bool {
        anchor.map_or(false, |t| now.saturating_duration_since(t).as_secs_f32() < duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn at(base: Instant, secs: f32) -> Instant {
        base + Duration::from_secs_f32(secs)
    }

    #[test]
    fn phase_windows_are_half_open() {
        let base = Instant::now();
        let mut clock = BlinkClock::new();
        clock.advance(at(base, 0.0), 0.2, 0.5);
        assert!(clock.led_phase_on(at(base, 0.0), 0.2));
        assert!(clock.led_phase_on(at(base, 0.19), 0.2));
        // off exactly at one duration
        assert!(!clock.led_phase_on(at(base, 0.2), 0.2));
        assert!(!clock.led_phase_on(at(base, 0.39), 0.2));
    }

    #[test]
    fn reanchor_at_twice_duration_is_inclusive() {
        let base = Instant::now();
        let mut clock = BlinkClock::new();
        clock.advance(at(base, 0.0), 0.2, 0.5);
        clock.advance(at(base, 0.4), 0.2, 0.5);
        // the tick at exactly 2x duration starts a fresh on phase
        assert!(clock.led_phase_on(at(base, 0.4), 0.2));
        assert!(clock.led_phase_on(at(base, 0.55), 0.2));
        assert!(!clock.led_phase_on(at(base, 0.62), 0.2));
    }

    #[test]
    fn channels_run_independent_durations() {
        let base = Instant::now();
        let mut clock = BlinkClock::new();
        clock.advance(at(base, 0.0), 0.2, 0.5);
        clock.advance(at(base, 0.3), 0.2, 0.5);
        // led is past its on window, text is still within its own
        assert!(!clock.led_phase_on(at(base, 0.3), 0.2));
        assert!(clock.text_phase_on(at(base, 0.3), 0.5));
    }

    #[test]
    fn unanchored_clock_reports_off() {
        let clock = BlinkClock::new();
        assert!(!clock.led_phase_on(Instant::now(), 0.2));
        assert!(!clock.text_phase_on(Instant::now(), 0.5));
    }
}
