//! Decision-timing protocols.
//!
//! Every protocol here runs on the calling task, suspends only at the
//! mailbox's bounded receive, and charges its own wall-clock budgets with
//! the elapsed time measured around that call. A session stop observed via
//! `working()` ends any loop as a normal exit; timeouts are legitimate
//! outcomes, not errors. None of these issue hardware commands — sequencing
//! stimuli and rewards around them is the caller's job.

use std::time::Instant;

use flicklab_runtime::{Envelope, Mailbox, Payload};
use flicklab_timing::Budget;

/// Drains and ignores every inbox message for `duration` seconds.
///
/// Used to let the device's own timing play out (stimulus holds,
/// inter-trial intervals) without reacting to responses.
pub fn flush<M: Mailbox>(mailbox: &M, duration: f64) {
    let mut budget = Budget::new(duration);
    while !budget.is_expired() && mailbox.working() {
        let start = Instant::now();
        let _ = mailbox.try_receive(budget.next_wait());
        budget.charge(start.elapsed());
    }
}

/// Counts messages matching `target` over `duration` seconds.
///
/// Always exhausts its budget; non-matching messages are dropped, not
/// requeued.
pub fn count_matching<M: Mailbox>(mailbox: &M, duration: f64, target: i16) -> u32 {
    let mut budget = Budget::new(duration);
    let mut count = 0;
    while !budget.is_expired() && mailbox.working() {
        let start = Instant::now();
        let received = mailbox.try_receive(budget.next_wait());
        budget.charge(start.elapsed());
        if is_match(&received, target) {
            count += 1;
        }
    }
    count
}

/// Waits up to `duration` seconds for the first message matching `target`.
///
/// Returns `true` the instant a match arrives; only a silent window runs
/// the budget down to `false`.
pub fn detect<M: Mailbox>(mailbox: &M, duration: f64, target: i16) -> bool {
    let mut budget = Budget::new(duration);
    while !budget.is_expired() && mailbox.working() {
        let start = Instant::now();
        let received = mailbox.try_receive(budget.next_wait());
        budget.charge(start.elapsed());
        if is_match(&received, target) {
            return true;
        }
    }
    false
}

/// Go window with a response deadline.
///
/// Both budgets are charged per receive. A correct response is honored
/// only once the decision budget has already run out; an earlier response
/// keeps the trial open and the credit lingers until a later response
/// lands after the window. A receive that times out on the remaining max
/// budget, or a session stop, exits without success.
pub fn go_with_deadline<M: Mailbox>(
    mailbox: &M,
    correct: i16,
    decision_duration: f64,
    max_duration: f64,
) -> bool {
    let mut decision = Budget::new(decision_duration);
    let mut max = Budget::new(max_duration);
    while !max.is_expired() && mailbox.working() {
        let start = Instant::now();
        let received = mailbox.try_receive(max.next_wait());
        let elapsed = start.elapsed();
        decision.charge(elapsed);
        max.charge(elapsed);

        if received.is_none() {
            break;
        }
        if is_match(&received, correct) && decision.is_expired() {
            return true;
        }
    }
    false
}

/// No-go window where a premature response postpones instead of failing.
///
/// Each wait is bounded by the full decision duration; any arrival,
/// the penalized id included, keeps the loop alive and burns the max
/// budget. A silent window, an exhausted max budget, or a session stop
/// ends the call. There is no success signal.
pub fn nogo_with_postpone<M: Mailbox>(
    mailbox: &M,
    incorrect: i16,
    decision_duration: f64,
    max_duration: f64,
) {
    let window = Budget::new(decision_duration).next_wait();
    let mut max = Budget::new(max_duration);
    while !max.is_expired() && mailbox.working() {
        let start = Instant::now();
        let received = mailbox.try_receive(window);
        max.charge(start.elapsed());
        if received.is_none() {
            break;
        }
        if is_match(&received, incorrect) {
            continue;
        }
    }
}

/// Fixed-interval schedule with postponement on premature responses.
///
/// The quiet interval `min_duration - decision_duration` is flushed first
/// and pre-charged against the max budget. Afterwards every non-matching
/// message restarts the decision countdown at `postpone`; the matching id
/// succeeds only once the countdown has already run out, mirroring
/// [`go_with_deadline`].
pub fn fixed_interval_with_postpone<M: Mailbox>(
    mailbox: &M,
    correct: i16,
    decision_duration: f64,
    min_duration: f64,
    max_duration: f64,
    postpone: f64,
) -> bool {
    let quiet = min_duration - decision_duration;
    let mut max = Budget::new(max_duration - quiet);
    flush(mailbox, quiet);

    let mut decision = Budget::new(decision_duration);
    while !max.is_expired() && mailbox.working() {
        let start = Instant::now();
        let received = mailbox.try_receive(max.next_wait());
        let elapsed = start.elapsed();
        max.charge(elapsed);
        decision.charge(elapsed);

        if received.is_none() {
            break;
        }
        if !is_match(&received, correct) {
            decision.reset(postpone);
        } else if decision.is_expired() {
            return true;
        }
    }
    false
}

/// Majority vote over a fixed decision window.
///
/// Flushes the part of the stimulus presentation before the window opens,
/// then accumulates +1 per matching message and -1 per any other message
/// until the window closes. A tie is not a win.
pub fn fixed_time_vote<M: Mailbox>(
    mailbox: &M,
    correct: i16,
    stimulus_duration: f64,
    decision_duration: f64,
) -> bool {
    flush(mailbox, stimulus_duration - decision_duration);

    let mut budget = Budget::new(decision_duration);
    let mut net: i32 = 0;
    while !budget.is_expired() && mailbox.working() {
        let start = Instant::now();
        let received = mailbox.try_receive(budget.next_wait());
        budget.charge(start.elapsed());
        match received {
            Some(envelope) if envelope.payload == Payload::Response(correct) => net += 1,
            Some(_) => net -= 1,
            None => {}
        }
    }
    net > 0
}

fn is_match(received: &Option<Envelope>, target: i16) -> bool {
    matches!(received, Some(envelope) if envelope.payload == Payload::Response(target))
}
