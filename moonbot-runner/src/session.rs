//! Per-ticket session state machine.
//!
//! One session spends exactly one ticket: start the remote game, synthesize
//! and encrypt a trace, sit out the play window, then submit. The budget
//! itself belongs to the cycle controller; a session only reports how it
//! ended.

use std::time::Duration;

use chrono::Utc;
use log::{debug, info};
use rand::Rng;
use thiserror::Error;
use tokio::time::sleep;

use moonbot_game::{ItemCatalog, PayloadError, TraceError, encode, generate};

use crate::api::{ApiError, GameApi};

/// Short-lived per-session value carrying the key material and catalog
/// issued at start. Dropped when the session ends, success or failure.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub game_tag: String,
    pub catalog: ItemCatalog,
    pub access_token: String,
}

/// Observable state of a ticket session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Started,
    Simulated,
    AwaitingWindow,
    Completed,
    Failed,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("starting game: {0}")]
    Start(ApiError),
    #[error("trace generation: {0}")]
    Simulation(#[from] TraceError),
    #[error("payload encoding: {0}")]
    Payload(#[from] PayloadError),
    #[error("completing game: {0}")]
    Complete(ApiError),
}

/// Terminal result of one ticket session.
#[derive(Debug)]
pub enum TicketOutcome {
    /// Remote confirmed the completion; the caller consumes one ticket.
    Completed { score: i32 },
    /// Start answered with the insufficient-tickets code. Normal stop for
    /// the whole account loop, not a failure.
    OutOfTickets,
    /// Session failed; the caller abandons the account's remaining tickets.
    Failed(SessionError),
}

pub struct TicketSession<'a, A> {
    api: &'a A,
    /// Doubles as the trace generation window and the post-simulation wait,
    /// which the remote's anti-cheat timing check requires to agree.
    play_window: Duration,
    state: SessionState,
    history: Vec<SessionState>,
}

impl<'a, A: GameApi> TicketSession<'a, A> {
    pub fn new(api: &'a A, play_window: Duration) -> Self {
        Self {
            api,
            play_window,
            state: SessionState::Idle,
            history: vec![SessionState::Idle],
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// States visited so far, in order, starting at `Idle`.
    #[must_use]
    pub fn history(&self) -> &[SessionState] {
        &self.history
    }

    fn enter(&mut self, state: SessionState) {
        self.state = state;
        self.history.push(state);
    }

    /// Drive the session to a terminal state.
    pub async fn run(
        &mut self,
        access_token: &str,
        rng: &mut (impl Rng + ?Sized),
    ) -> TicketOutcome {
        // Idle -> Started
        let context = match self.api.start_game(access_token).await {
            Ok(start) => SessionContext {
                game_tag: start.game_tag,
                catalog: start.catalog,
                access_token: access_token.to_string(),
            },
            Err(err) if err.is_out_of_tickets() => {
                info!("remote reports no tickets left");
                return TicketOutcome::OutOfTickets;
            }
            Err(err) => {
                self.enter(SessionState::Failed);
                return TicketOutcome::Failed(SessionError::Start(err));
            }
        };
        self.enter(SessionState::Started);

        // Started -> Simulated
        let window_ms = self.play_window.as_millis() as u64;
        let started_at_ms = Utc::now().timestamp_millis();
        let trace = match generate(rng, started_at_ms, window_ms, &context.catalog) {
            Ok(trace) => trace,
            Err(err) => {
                self.enter(SessionState::Failed);
                return TicketOutcome::Failed(err.into());
            }
        };
        let score = trace.final_score;
        let payload = match encode(&trace, &context.game_tag, rng) {
            Ok(payload) => payload,
            Err(err) => {
                self.enter(SessionState::Failed);
                return TicketOutcome::Failed(err.into());
            }
        };
        drop(trace);
        self.enter(SessionState::Simulated);
        debug!("simulated play, declared score {score}");

        // Simulated -> AwaitingWindow: mimic real play duration before
        // submitting, or the remote rejects the completion as too fast.
        self.enter(SessionState::AwaitingWindow);
        sleep(self.play_window).await;

        // AwaitingWindow -> Completed
        match self.api.complete_game(&context.access_token, &payload, score).await {
            Ok(()) => {
                self.enter(SessionState::Completed);
                info!("completed game, received {score} points");
                debug!("session path: {:?}", self.history());
                TicketOutcome::Completed { score }
            }
            Err(err) => {
                self.enter(SessionState::Failed);
                TicketOutcome::Failed(SessionError::Complete(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockApi;
    use crate::api::{CODE_OUT_OF_TICKETS, GameStart};
    use moonbot_game::{ItemCatalog, ItemDefinition, ItemKind};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    const TAG: &str = "0123456789abcdef0123456789abcdef";

    fn start_ok() -> GameStart {
        GameStart {
            game_tag: TAG.to_string(),
            catalog: ItemCatalog::new(vec![
                ItemDefinition {
                    kind: ItemKind::Reward,
                    size: 40,
                    reward_magnitude: 5,
                },
                ItemDefinition {
                    kind: ItemKind::Trap,
                    size: 55,
                    reward_magnitude: -6,
                },
                ItemDefinition {
                    kind: ItemKind::Bonus,
                    size: 30,
                    reward_magnitude: 12,
                },
            ]),
        }
    }

    fn short_window() -> Duration {
        // Long enough for a handful of events, short enough for tests.
        Duration::from_millis(10)
    }

    #[tokio::test]
    async fn completed_session_visits_states_in_order() {
        let api = MockApi::default();
        api.push_start(Ok(start_ok()));
        api.push_complete(Ok(()));
        let mut rng = SmallRng::seed_from_u64(1);
        let mut session = TicketSession::new(&api, short_window());
        let outcome = session.run("token", &mut rng).await;
        assert!(matches!(outcome, TicketOutcome::Completed { score } if score >= 100));
        assert_eq!(
            session.history(),
            [
                SessionState::Idle,
                SessionState::Started,
                SessionState::Simulated,
                SessionState::AwaitingWindow,
                SessionState::Completed,
            ]
        );
    }

    #[tokio::test]
    async fn start_rejection_fails_without_submitting() {
        let api = MockApi::default();
        api.push_start(Err(MockApi::rejected("999999")));
        let mut rng = SmallRng::seed_from_u64(2);
        let mut session = TicketSession::new(&api, short_window());
        let outcome = session.run("token", &mut rng).await;
        assert!(matches!(
            outcome,
            TicketOutcome::Failed(SessionError::Start(_))
        ));
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(api.count("complete:"), 0);
    }

    #[tokio::test]
    async fn out_of_tickets_is_not_a_failure() {
        let api = MockApi::default();
        api.push_start(Err(MockApi::rejected(CODE_OUT_OF_TICKETS)));
        let mut rng = SmallRng::seed_from_u64(3);
        let mut session = TicketSession::new(&api, short_window());
        let outcome = session.run("token", &mut rng).await;
        assert!(matches!(outcome, TicketOutcome::OutOfTickets));
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(api.count("complete:"), 0);
    }

    #[tokio::test]
    async fn bad_game_tag_fails_during_simulation() {
        let api = MockApi::default();
        let mut start = start_ok();
        start.game_tag = "short".to_string();
        api.push_start(Ok(start));
        let mut rng = SmallRng::seed_from_u64(4);
        let mut session = TicketSession::new(&api, short_window());
        let outcome = session.run("token", &mut rng).await;
        assert!(matches!(
            outcome,
            TicketOutcome::Failed(SessionError::Payload(_))
        ));
        assert_eq!(api.count("complete:"), 0);
    }

    #[tokio::test]
    async fn complete_rejection_fails_the_session() {
        let api = MockApi::default();
        api.push_start(Ok(start_ok()));
        api.push_complete(Err(MockApi::rejected("100000")));
        let mut rng = SmallRng::seed_from_u64(5);
        let mut session = TicketSession::new(&api, short_window());
        let outcome = session.run("token", &mut rng).await;
        assert!(matches!(
            outcome,
            TicketOutcome::Failed(SessionError::Complete(_))
        ));
        assert_eq!(session.state(), SessionState::Failed);
    }
}
