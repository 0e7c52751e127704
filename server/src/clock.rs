//! Action point clock
//!
//! Once a session starts, a task ticks its countdown every second. Each tick
//! broadcasts the seconds left; when the countdown runs out every living
//! player gains one action point, the new state is broadcast and the countdown
//! starts over. Ticks do not count as player activity.

use crate::broadcast::Broadcaster;
use crate::game::GameSession;
use log::debug;
use shared::{tags, timestamp, ClockUpdate, GameStateUpdate};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

pub const CLOCK_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct Countdown {
    period: Duration,
    remaining: Duration,
    running: bool,
}

impl Countdown {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            remaining: period,
            running: false,
        }
    }

    /// Flags the countdown as driven by a task. Returns false if it already was.
    pub fn mark_running(&mut self) -> bool {
        !std::mem::replace(&mut self.running, true)
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    /// Advances the countdown. Returns true when it ran out, in which case it
    /// has already been reset to the full period.
    pub fn tick(&mut self, step: Duration) -> bool {
        self.remaining = self.remaining.saturating_sub(step);
        if self.remaining.is_zero() {
            self.remaining = self.period;
            true
        } else {
            false
        }
    }
}

/// Starts the clock task for a session that just started
pub fn spawn_clock(session: Arc<GameSession>, broadcaster: Broadcaster) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(CLOCK_TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Skip the first tick since it fires immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if !advance_clock(&session, &broadcaster).await {
                break;
            }
        }

        debug!("Clock stopped for {}", session.id());
    })
}

/// Runs one clock tick. Returns false once the session is closed.
pub(crate) async fn advance_clock(session: &GameSession, broadcaster: &Broadcaster) -> bool {
    let mut state = session.lock().await;
    if state.is_closed() {
        return false;
    }

    let targets = state.all_clients();

    if state.clock.tick(CLOCK_TICK) {
        let awarded = state.award_action_points(1);
        debug!("Clock ran out in {}, awarded {} players", session.id(), awarded);

        let update = GameStateUpdate {
            game_state: state.snapshot(),
            sent: timestamp(),
        };
        broadcaster
            .broadcast(tags::RECEIVE_ACTION_POINT, &update, &targets)
            .await;
    }

    let update = ClockUpdate {
        seconds: state.clock.remaining().as_secs(),
        sent: timestamp(),
    };
    broadcaster
        .broadcast(tags::RECEIVE_CLOCK_UPDATE, &update, &targets)
        .await;

    true
}
