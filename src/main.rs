mod display;
mod engine;
mod settings;
mod telemetry;

#[macro_use]
extern crate log;
extern crate env_logger;

use std::time::Instant;

use async_std::task;

use display::{pack_report, DisplayState, LogSink, ReportSink};
use engine::DashboardStateEngine;
use settings::SettingsFile;
use telemetry::producer::SourceTask;
use telemetry::Update;

const SETTINGS_FILE: &str = "srdash.settings.json";

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    #[cfg(windows)]
    unsafe {
        use windows::Win32::System::Threading::{
            GetCurrentProcess, SetPriorityClass, HIGH_PRIORITY_CLASS,
        };
        SetPriorityClass(GetCurrentProcess(), HIGH_PRIORITY_CLASS);
    }

    let mut settings_file = match SettingsFile::open(SETTINGS_FILE) {
        Ok(file) => file,
        Err(err) => {
            error!["Unable to load settings: {}", err];
            std::process::exit(1);
        }
    };

    let (sender, receiver) = async_std::channel::unbounded::<Update>();

    let producer = SourceTask::new(sender);
    let producer_thread = task::spawn(async { producer.execute().await });

    // the device transport plugs in behind ReportSink; without hardware the
    // reports go to the trace log
    let mut sink = LogSink;

    task::block_on(async {
        let mut dash: Option<DashboardStateEngine> = None;
        send(&mut sink, &DisplayState::reset());
        while let Ok(update) = receiver.recv().await {
            match update {
                Update::Connected { name, profile } => {
                    info!["Driving dashboard from {}", name];
                    dash = Some(DashboardStateEngine::new(profile));
                }
                Update::Snapshot(snapshot) => {
                    settings_file.poll();
                    if let Some(engine) = dash.as_mut() {
                        match engine.tick(&snapshot, settings_file.settings(), Instant::now()) {
                            Some(state) => send(&mut sink, &state),
                            None => send(&mut sink, &DisplayState::reset()),
                        }
                    }
                }
                Update::Disconnected => {
                    dash = None;
                    send(&mut sink, &DisplayState::blank());
                }
            }
        }
    });

    task::block_on(producer_thread);
}

fn send<S: ReportSink>(sink: &mut S, state: &DisplayState) {
    if let Err(err) = sink.send_report(&pack_report(state)) {
        warn!["Failed to send report: {}", err];
    }
}
