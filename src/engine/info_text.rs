//! Info text rotation. Each sector entry starts a timer; the start/finish
//! sector rotates through lap split, position, and laps/time remaining, the
//! intermediate sectors show a single sector split page. Window boundaries
//! accumulate enabled durations only, so a disabled page can never flash.

use std::time::Instant;

use crate::settings::InfoTextSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoPage {
    LapSplit,
    Position,
    Remaining,
    SectorSplit,
}

#[derive(Debug, Default)]
pub struct InfoTextSequencer {
    sector_entry: Option<Instant>,
}

impl InfoTextSequencer {
    pub fn new() -> InfoTextSequencer {
        InfoTextSequencer::default()
    }

    pub fn reset(&mut self) {
        self.sector_entry = None;
    }

    pub fn on_sector_entry(&mut self, now: Instant) {
        self.sector_entry = Some(now);
    }

    /// Page active at `now`, or `None` once every enabled window has elapsed
    /// (idle until the next sector entry).
    pub fn active_page(
        &self,
        sector: u8,
        now: Instant,
        settings: &InfoTextSettings,
    ) -> Option<InfoPage> {
        let entry = self.sector_entry?;
        let elapsed = now.saturating_duration_since(entry).as_secs_f32();
        match sector {
            1 => {
                let rotation = [
                    (InfoPage::LapSplit, settings.lap_split.enabled),
                    (InfoPage::Position, settings.position.enabled),
                    (InfoPage::Remaining, settings.remaining.enabled),
                ];
                let mut window_start = 0.0;
                for (page, enabled) in rotation {
                    if !enabled {
                        continue;
                    }
                    let window_end = window_start + settings.duration;
                    if elapsed >= window_start && elapsed < window_end {
                        return Some(page);
                    }
                    window_start = window_end;
                }
                None
            }
            2 | 3 => {
                if settings.sector_split.enabled && elapsed < settings.duration {
                    Some(InfoPage::SectorSplit)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}
