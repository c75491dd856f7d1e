//! Producer task: waits for a simulator to come up, then owns its telemetry
//! source and streams normalized snapshots to the dash loop.

use async_std::channel::Sender;

use super::{TelemetrySource, Update};

pub struct SourceTask {
    sender: Sender<Update>,
}

impl SourceTask {
    pub fn new(sender: Sender<Update>) -> SourceTask {
        SourceTask { sender }
    }

    pub async fn execute(self) {
        loop {
            let source = wait_for_source().await;
            info!["Connected to {}", source.name()];
            if !self.run_source(source).await {
                // dash loop went away, nothing left to feed
                return;
            }
        }
    }

    /// Streams one source until it ends. Returns false once the receiving
    /// side is gone.
    async fn run_source(&self, mut source: Box<dyn TelemetrySource>) -> bool {
        let connected = Update::Connected {
            name: source.name(),
            profile: source.profile(),
        };
        if self.sender.send(connected).await.is_err() {
            return false;
        }
        while let Some(snapshot) = source.next_snapshot().await {
            if self.sender.send(Update::Snapshot(snapshot)).await.is_err() {
                return false;
            }
        }
        info!["{} telemetry ended", source.name()];
        self.sender.send(Update::Disconnected).await.is_ok()
    }
}

#[cfg(windows)]
async fn wait_for_source() -> Box<dyn TelemetrySource> {
    use std::time::Duration;

    use super::ac::AcSource;
    use super::r3e::R3eSource;
    use super::rf1::Rf1Source;

    loop {
        if let Ok(source) = R3eSource::open() {
            return Box::new(source);
        }
        if let Ok(source) = Rf1Source::open() {
            return Box::new(source);
        }
        if let Ok(source) = AcSource::open() {
            return Box::new(source);
        }
        async_std::task::sleep(Duration::from_secs(1)).await;
    }
}

#[cfg(not(windows))]
async fn wait_for_source() -> Box<dyn TelemetrySource> {
    use std::time::Duration;

    use super::scripted::ScriptedSource;

    // no simulator shared memory off Windows; loop the scripted demo
    async_std::task::sleep(Duration::from_secs(1)).await;
    info!["No simulator interface on this platform, playing scripted demo laps"];
    Box::new(ScriptedSource::demo(3))
}
