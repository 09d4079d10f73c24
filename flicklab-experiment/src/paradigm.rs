//! Representative experiment compositions.
//!
//! Each runner walks a planned trial list, sequences hardware commands
//! around the timing protocols in `kernel`, and reports one record per
//! trial. A session stop mid-plan just ends the walk; the completion
//! marker is only sent after the final trial.

use std::io;
use std::time::Duration;

use rand::Rng;

use flicklab_core::{Command, CommandPort, Modality, TrialOutcome, TrialRecord};
use flicklab_runtime::{Address, Mailbox, Payload, SessionMarker};

use crate::config::SessionConfig;
use crate::kernel::{
    count_matching, detect, fixed_interval_with_postpone, flush, go_with_deadline,
    nogo_with_postpone,
};
use crate::trials::{TrialPlan, TrialRow};

/// Hold duration for "flicker until stopped" commands; the explicit stop
/// always arrives first.
const FLICK_HOLD_MS: u16 = 60_000;

/// The experiment variants a session can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paradigm {
    /// Fixed stimulus window, first-lick decision.
    GoNogo,
    /// Open-ended stimulus, response deadline with postponement.
    GoNogoPostpone,
    /// Lick shaping against a reward quota.
    LickTraining,
    /// Two-choice fixed-interval schedule.
    IntervalChoice,
}

pub fn run_paradigm<M, P, R>(
    paradigm: Paradigm,
    mailbox: &M,
    port: &mut P,
    config: &SessionConfig,
    rng: &mut R,
) -> io::Result<Vec<TrialRecord>>
where
    M: Mailbox,
    P: CommandPort,
    R: Rng,
{
    match paradigm {
        Paradigm::GoNogo => go_nogo(mailbox, port, config, rng),
        Paradigm::GoNogoPostpone => go_nogo_postpone(mailbox, port, config, rng),
        Paradigm::LickTraining => lick_training(mailbox, port, config, rng),
        Paradigm::IntervalChoice => interval_choice(mailbox, port, config, rng),
    }
}

/// Go/no-go with a fixed stimulus window.
///
/// Visual trials flicker for the full window, the decision interval is the
/// tail of it, and the first lick decides: hit earns a reward, a false
/// alarm serves the timeout. Auditory trials are probe trials rewarded at
/// chance.
pub fn go_nogo<M, P, R>(
    mailbox: &M,
    port: &mut P,
    config: &SessionConfig,
    rng: &mut R,
) -> io::Result<Vec<TrialRecord>>
where
    M: Mailbox,
    P: CommandPort,
    R: Rng,
{
    let plan = TrialPlan::discrimination(config, rng);
    let mut records = Vec::with_capacity(plan.len());

    for row in plan.iter() {
        if !mailbox.working() {
            break;
        }
        show_progress(row, config.led_pin);
        flush(mailbox, row.iti);

        let outcome = match row.modality {
            Modality::Visual => {
                port.send(Command::flick_for(
                    config.led_pin,
                    row.hz,
                    millis(config.flick_duration),
                    config.pulse_ms,
                ))?;
                flush(mailbox, config.flick_duration - config.decision_duration);
                let licked = detect(mailbox, config.decision_duration, config.response_pin);
                if row.hz > config.boundary && licked {
                    deliver_reward(mailbox, port, config)?;
                    TrialOutcome::Rewarded
                } else if row.hz < config.boundary && !licked {
                    flush(mailbox, config.reward_duration);
                    TrialOutcome::Withheld
                } else {
                    flush(mailbox, config.timeout_duration);
                    if licked {
                        TrialOutcome::TimedOut
                    } else {
                        TrialOutcome::NoResponse
                    }
                }
            }
            _ => {
                port.send(Command::flick_for(
                    config.sound_pin,
                    row.hz,
                    millis(config.flick_duration),
                    config.pulse_ms,
                ))?;
                flush(mailbox, config.flick_duration);
                if rng.random_bool(0.5) {
                    deliver_reward(mailbox, port, config)?;
                    TrialOutcome::Rewarded
                } else {
                    TrialOutcome::Withheld
                }
            }
        };
        records.push(record(row, outcome));
    }

    finish(mailbox);
    Ok(records)
}

/// Go/no-go with an open-ended stimulus and postponement.
///
/// The flicker holds until the decision resolves. Go trials use the
/// response deadline; no-go trials postpone on premature licks. Rewards on
/// go trials follow the stimulus unconditionally, the record keeps whether
/// the deadline was met.
pub fn go_nogo_postpone<M, P, R>(
    mailbox: &M,
    port: &mut P,
    config: &SessionConfig,
    rng: &mut R,
) -> io::Result<Vec<TrialRecord>>
where
    M: Mailbox,
    P: CommandPort,
    R: Rng,
{
    let plan = TrialPlan::discrimination(config, rng);
    let mut records = Vec::with_capacity(plan.len());

    for row in plan.iter() {
        if !mailbox.working() {
            break;
        }
        show_progress(row, config.led_pin);
        flush(mailbox, row.iti);

        let outcome = match row.modality {
            Modality::Visual => {
                port.send(Command::flick_on(
                    config.led_pin,
                    row.hz,
                    FLICK_HOLD_MS,
                    config.pulse_ms,
                ))?;
                if row.hz > config.boundary {
                    let hit = go_with_deadline(
                        mailbox,
                        config.response_pin,
                        config.decision_duration,
                        config.postpone,
                    );
                    port.send(Command::FlickOff)?;
                    deliver_reward(mailbox, port, config)?;
                    if hit {
                        TrialOutcome::Rewarded
                    } else {
                        TrialOutcome::NoResponse
                    }
                } else {
                    nogo_with_postpone(
                        mailbox,
                        config.response_pin,
                        config.decision_duration,
                        config.postpone,
                    );
                    port.send(Command::FlickOff)?;
                    flush(mailbox, config.reward_duration);
                    TrialOutcome::Withheld
                }
            }
            _ => {
                port.send(Command::flick_for(
                    config.sound_pin,
                    row.hz,
                    millis(config.decision_duration),
                    config.pulse_ms,
                ))?;
                flush(mailbox, config.decision_duration);
                if rng.random_bool(0.5) {
                    deliver_reward(mailbox, port, config)?;
                    TrialOutcome::Rewarded
                } else {
                    flush(mailbox, config.reward_duration);
                    TrialOutcome::Withheld
                }
            }
        };
        records.push(record(row, outcome));
    }

    finish(mailbox);
    Ok(records)
}

/// Lick shaping: every sufficiently licked stimulus earns a reward until
/// the session quota runs out.
pub fn lick_training<M, P, R>(
    mailbox: &M,
    port: &mut P,
    config: &SessionConfig,
    rng: &mut R,
) -> io::Result<Vec<TrialRecord>>
where
    M: Mailbox,
    P: CommandPort,
    R: Rng,
{
    let plan = TrialPlan::training(config, rng);
    let mut records = Vec::with_capacity(plan.len());
    let mut rewards_left = config.number_of_reward;

    for row in plan.iter() {
        if !mailbox.working() || rewards_left == 0 {
            break;
        }
        show_progress(row, config.led_pin);
        flush(mailbox, row.iti);

        let outcome = match row.modality {
            Modality::Audiovisual | Modality::Visual => {
                let command = if row.modality == Modality::Audiovisual {
                    Command::flick_for_pair(
                        (config.led_pin, config.sound_pin),
                        (row.hz, row.hz),
                        millis(config.flick_duration),
                        config.pulse_ms,
                    )
                } else {
                    Command::flick_for(
                        config.led_pin,
                        row.hz,
                        millis(config.flick_duration),
                        config.pulse_ms,
                    )
                };
                port.send(command)?;
                flush(mailbox, config.flick_duration - config.decision_duration);
                let licks =
                    count_matching(mailbox, config.decision_duration, config.response_pin);
                if licks >= config.required_licks {
                    deliver_reward(mailbox, port, config)?;
                    rewards_left -= 1;
                    TrialOutcome::Rewarded
                } else {
                    TrialOutcome::NoResponse
                }
            }
            Modality::Auditory => {
                port.send(Command::flick_for(
                    config.sound_pin,
                    row.hz,
                    millis(config.flick_duration),
                    config.pulse_ms,
                ))?;
                mailbox.sleep(Duration::from_secs_f64(config.flick_duration));
                if rng.random_bool(config.audio_reward_probability.clamp(0.0, 1.0)) {
                    deliver_reward(mailbox, port, config)?;
                    rewards_left -= 1;
                    TrialOutcome::Rewarded
                } else {
                    TrialOutcome::Withheld
                }
            }
        };
        mailbox.sleep(Duration::from_secs_f64(config.reward_duration));
        records.push(record(row, outcome));
    }

    finish(mailbox);
    Ok(records)
}

/// Two-choice fixed-interval schedule: the stimulus frequency picks the
/// side, both channels flicker until the interval resolves, and the
/// side's own valve pays out.
pub fn interval_choice<M, P, R>(
    mailbox: &M,
    port: &mut P,
    config: &SessionConfig,
    rng: &mut R,
) -> io::Result<Vec<TrialRecord>>
where
    M: Mailbox,
    P: CommandPort,
    R: Rng,
{
    let plan = TrialPlan::discrimination(config, rng);
    let mut records = Vec::with_capacity(plan.len());

    for row in plan.iter() {
        if !mailbox.working() {
            break;
        }
        show_progress(row, config.led_pin);
        flush(mailbox, row.iti);

        port.send(Command::flick_on_pair(
            (config.led_pin, config.sound_pin),
            (row.hz, row.hz),
            FLICK_HOLD_MS,
            config.pulse_ms,
        ))?;

        let side = if row.hz > config.boundary { 0 } else { 1 };
        let response = config.response_pins.get(side).copied().unwrap_or(config.response_pin);
        let valve = config.reward_pins.get(side).copied().unwrap_or(config.reward_pin);

        let hit = fixed_interval_with_postpone(
            mailbox,
            response,
            config.decision_duration,
            config.minimum_duration,
            config.maximum_duration,
            config.postpone,
        );
        port.send(Command::FlickOff)?;
        port.send(Command::high_for(valve, millis(config.reward_duration)))?;
        flush(mailbox, config.reward_duration);
        mailbox.sleep(Duration::from_secs_f64(config.reward_duration));

        let outcome = if hit { TrialOutcome::Rewarded } else { TrialOutcome::NoResponse };
        records.push(record(row, outcome));
    }

    finish(mailbox);
    Ok(records)
}

fn deliver_reward<M, P>(mailbox: &M, port: &mut P, config: &SessionConfig) -> io::Result<()>
where
    M: Mailbox,
    P: CommandPort,
{
    port.send(Command::high_for(config.reward_pin, millis(config.reward_duration)))?;
    flush(mailbox, config.reward_duration);
    Ok(())
}

fn record(row: &TrialRow, outcome: TrialOutcome) -> TrialRecord {
    tracing::debug!(trial = row.index, hz = row.hz, ?outcome, "trial resolved");
    TrialRecord {
        trial: row.index,
        modality: row.modality,
        hz: row.hz,
        iti_secs: row.iti,
        outcome,
    }
}

fn finish<M: Mailbox>(mailbox: &M) {
    if mailbox.working() {
        mailbox.send(Address::Observer, Payload::Marker(SessionMarker::Completed));
    }
}

fn show_progress(row: &TrialRow, pin: u8) {
    println!(
        "Trial {}: flickr ({}) follows after {:.2} sec on {} pin",
        row.index, row.hz, row.iti, pin
    );
}

fn millis(secs: f64) -> u16 {
    (secs * 1000.0).round() as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use flicklab_core::MemoryPort;
    use flicklab_runtime::{Envelope, Node, Post};

    fn quick_config() -> SessionConfig {
        SessionConfig {
            flick_duration: 0.08,
            decision_duration: 0.04,
            reward_duration: 0.01,
            timeout_duration: 0.03,
            postpone: 0.1,
            minimum_duration: 0.06,
            maximum_duration: 0.2,
            iti: 0.02,
            iti_range: 0.0,
            number_of_trial: 3,
            number_of_reward: 5,
            ..SessionConfig::default()
        }
    }

    fn session() -> (Node, Node) {
        let mut post = Post::open(&Address::ALL);
        let controller = post.node(Address::Controller).unwrap();
        let observer = post.node(Address::Observer).unwrap();
        (controller, observer)
    }

    fn assert_all_frames_decode(port: &MemoryPort) {
        for frame in &port.frames {
            assert!(Command::decode(frame).is_some(), "undecodable frame {frame:?}");
        }
    }

    fn completion(observer: &Node) -> Option<Envelope> {
        observer.try_receive(Duration::ZERO)
    }

    #[test]
    fn go_nogo_records_every_trial_and_signals_completion() {
        let (controller, observer) = session();
        let mut port = MemoryPort::new();
        let config = quick_config();
        let records =
            go_nogo(&controller, &mut port, &config, &mut rand::rng()).unwrap();
        assert_eq!(records.len(), config.number_of_trial);
        assert!(!port.frames.is_empty());
        assert_all_frames_decode(&port);
        assert_eq!(
            completion(&observer).map(|envelope| envelope.payload),
            Some(Payload::Marker(SessionMarker::Completed))
        );
    }

    #[test]
    fn go_nogo_postpone_stops_every_held_flicker() {
        let (controller, observer) = session();
        let mut port = MemoryPort::new();
        let config = quick_config();
        let records =
            go_nogo_postpone(&controller, &mut port, &config, &mut rand::rng()).unwrap();
        assert_eq!(records.len(), config.number_of_trial);
        assert_all_frames_decode(&port);
        let ons = port.frames.iter().filter(|frame| frame[0] == 0x14).count();
        let offs = port.frames.iter().filter(|frame| frame[0] == 0x18).count();
        assert_eq!(ons, offs);
        assert!(completion(&observer).is_some());
    }

    #[test]
    fn lick_training_without_licks_never_rewards_visual_trials() {
        let (controller, _observer) = session();
        let mut port = MemoryPort::new();
        let config = SessionConfig { audio_reward_probability: 0.0, ..quick_config() };
        let records =
            lick_training(&controller, &mut port, &config, &mut rand::rng()).unwrap();
        assert_eq!(records.len(), config.number_of_trial);
        assert!(records.iter().all(|r| r.outcome != TrialOutcome::Rewarded));
        // no reward pulses on the wire either
        assert!(port.frames.iter().all(|frame| frame[0] != 0x17));
    }

    #[test]
    fn interval_choice_pays_the_side_selected_by_the_boundary() {
        let (controller, _observer) = session();
        let mut port = MemoryPort::new();
        let config = SessionConfig {
            led_flick_hz: vec![10.0],
            sound_flick_hz: Vec::new(),
            number_of_trial: 1,
            ..quick_config()
        };
        let records =
            interval_choice(&controller, &mut port, &config, &mut rand::rng()).unwrap();
        assert_eq!(records.len(), 1);
        // 10 Hz is above the boundary: the first side's valve pays
        let pulse = port.frames.iter().find(|frame| frame[0] == 0x17).unwrap();
        assert_eq!(pulse[1], config.reward_pins[0]);
    }

    #[test]
    fn a_stopped_session_runs_no_trials() {
        let mut post = Post::open(&Address::ALL);
        let controller = post.node(Address::Controller).unwrap();
        post.stop_token().stop();
        let mut port = MemoryPort::new();
        let records =
            go_nogo(&controller, &mut port, &quick_config(), &mut rand::rng()).unwrap();
        assert!(records.is_empty());
        assert!(port.frames.is_empty());
    }
}
