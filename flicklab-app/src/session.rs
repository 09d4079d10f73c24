use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use std::thread;

use anyhow::{anyhow, Context, Result};
use chrono::Local;

use flicklab_core::{CommandPort, EventSource, TrialOutcome, TrialRecord};
use flicklab_experiment::{run_paradigm, Paradigm, SessionConfig};
use flicklab_runtime::{
    run_observer, run_recorder, run_router, Address, Post, SessionMarker,
};

/// One experimenter-facing session: wiring, threads, and output files.
pub struct Session {
    pub config: SessionConfig,
    pub paradigm: Paradigm,
    pub data_dir: PathBuf,
    pub label: String,
}

impl Session {
    /// Runs the session to completion and returns how it ended.
    ///
    /// The controller runs on the calling thread; router, recorder and
    /// observer run on their own threads and unwind when the observer
    /// receives a session marker or the device connection drops.
    pub fn run<P, S>(&self, mut port: P, source: S) -> Result<SessionMarker>
    where
        P: CommandPort,
        S: EventSource + Send + 'static,
    {
        tracing::info!(paradigm = ?self.paradigm, trials = self.config.number_of_trial, "session starting");
        fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("creating {}", self.data_dir.display()))?;
        let stamp = Local::now().format("%Y%m%d-%H%M%S");
        let events_path = self.data_dir.join(format!("{}-{stamp}-events.csv", self.label));
        let trials_path = self.data_dir.join(format!("{}-{stamp}-trials.json", self.label));

        let mut post = Post::open(&Address::ALL);
        let controller = post.node(Address::Controller).ok_or_else(|| anyhow!("controller inbox"))?;
        let reader = post.node(Address::Reader).ok_or_else(|| anyhow!("reader inbox"))?;
        let recorder = post.node(Address::Recorder).ok_or_else(|| anyhow!("recorder inbox"))?;
        let observer = post.node(Address::Observer).ok_or_else(|| anyhow!("observer inbox"))?;
        let stop = post.stop_token();

        let response_set = self.config.response_pins.clone();
        let router_thread = thread::spawn(move || {
            let mut source = source;
            run_router(&reader, &mut source, &response_set);
        });

        let sink = File::create(&events_path)
            .with_context(|| format!("creating {}", events_path.display()))?;
        let recorder_thread = thread::spawn(move || {
            let mut sink = BufWriter::new(sink);
            run_recorder(&recorder, &mut sink)
        });

        let observer_stop = stop.clone();
        let observer_thread = thread::spawn(move || run_observer(&observer, &observer_stop));

        let outcome =
            run_paradigm(self.paradigm, &controller, &mut port, &self.config, &mut rand::rng());
        if outcome.is_err() {
            // the session cannot continue without the command port
            stop.stop();
        }

        let marker =
            observer_thread.join().map_err(|_| anyhow!("observer task panicked"))?;
        router_thread.join().map_err(|_| anyhow!("router task panicked"))?;
        let recorded = recorder_thread.join().map_err(|_| anyhow!("recorder task panicked"))?;

        let records = outcome.context("command port failed")?;
        recorded.with_context(|| format!("writing {}", events_path.display()))?;

        let trials_file = File::create(&trials_path)
            .with_context(|| format!("creating {}", trials_path.display()))?;
        serde_json::to_writer_pretty(trials_file, &records)?;

        print_summary(marker, &records, &events_path, &trials_path);
        Ok(marker)
    }
}

fn print_summary(
    marker: SessionMarker,
    records: &[TrialRecord],
    events_path: &std::path::Path,
    trials_path: &std::path::Path,
) {
    let rewarded = records
        .iter()
        .filter(|record| record.outcome == TrialOutcome::Rewarded)
        .count();
    println!("\nSession {marker:?}: {} trials, {rewarded} rewarded.", records.len());
    println!("Events: {}", events_path.display());
    println!("Trials: {}", trials_path.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use flicklab_core::{MemoryPort, ScriptedSource};

    fn quick_session(dir: &std::path::Path) -> Session {
        Session {
            config: SessionConfig {
                flick_duration: 0.05,
                decision_duration: 0.02,
                reward_duration: 0.01,
                timeout_duration: 0.02,
                iti: 0.01,
                iti_range: 0.0,
                number_of_trial: 2,
                ..SessionConfig::default()
            },
            paradigm: Paradigm::GoNogo,
            data_dir: dir.to_path_buf(),
            label: "test".into(),
        }
    }

    #[test]
    fn a_session_writes_both_output_files() {
        let dir = tempfile::tempdir().unwrap();
        let session = quick_session(dir.path());
        // the source closing early aborts the session, which still
        // produces the event log and the trial summary
        let marker =
            session.run(MemoryPort::new(), ScriptedSource::new(["6100", "5200"])).unwrap();
        assert_eq!(marker, SessionMarker::Aborted);

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().any(|name| name.ends_with("-events.csv")));
        assert!(names.iter().any(|name| name.ends_with("-trials.json")));
    }
}
