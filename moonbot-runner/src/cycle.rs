//! Account cycle controller.
//!
//! Walks every account in order, spends its tickets one session at a time,
//! and repeats on a fixed daily cadence. Accounts and tickets are strictly
//! sequential; every pause is a cooperative sleep.

use std::time::Duration;

use log::{error, info, warn};
use rand::Rng;
use tokio::time::sleep;

use moonbot_game::TicketBudget;

use crate::accounts::Account;
use crate::api::GameApi;
use crate::session::{TicketOutcome, TicketSession};

/// Referral-binding task; attempting it without a code always fails, so the
/// sub-flow skips it.
const EXCLUDED_TASK_ID: u64 = 2058;

/// Every wait in the controller and session, in one place so tests can
/// shrink them.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    /// Trace generation window and the post-simulation wait. One field on
    /// purpose: the remote expects the submission to arrive after exactly
    /// the span the trace claims to cover.
    pub play_window: Duration,
    /// Pause between consecutive ticket sessions of one account.
    pub ticket_pause: Duration,
    /// Pause between task completion attempts.
    pub task_pause: Duration,
    /// Pause between accounts.
    pub account_pause: Duration,
    /// Pause between full cycles over all accounts.
    pub cycle_pause: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            play_window: Duration::from_secs(45),
            ticket_pause: Duration::from_secs(3),
            task_pause: Duration::from_secs(1),
            account_pause: Duration::from_secs(1),
            cycle_pause: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl Pacing {
    /// Zero pacing for tests.
    #[cfg(test)]
    pub fn immediate() -> Self {
        Self {
            play_window: Duration::ZERO,
            ticket_pause: Duration::ZERO,
            task_pause: Duration::ZERO,
            account_pause: Duration::ZERO,
            cycle_pause: Duration::ZERO,
        }
    }
}

pub struct CycleController<A> {
    api: A,
    pacing: Pacing,
}

impl<A: GameApi> CycleController<A> {
    pub fn new(api: A, pacing: Pacing) -> Self {
        Self { api, pacing }
    }

    /// Run cycles forever. There is no persisted checkpoint; a restart
    /// begins again from the first account.
    pub async fn run_forever(&self, accounts: &[Account], rng: &mut (impl Rng + ?Sized)) {
        loop {
            self.run_cycle(accounts, rng).await;
            info!("finished processing all accounts, waiting for the next cycle");
            sleep(self.pacing.cycle_pause).await;
        }
    }

    /// One pass over every account. A single account's failure never stops
    /// the others.
    pub async fn run_cycle(&self, accounts: &[Account], rng: &mut (impl Rng + ?Sized)) {
        for account in accounts {
            self.run_account(account, rng).await;
            sleep(self.pacing.account_pause).await;
        }
    }

    async fn run_account(&self, account: &Account, rng: &mut (impl Rng + ?Sized)) {
        info!("account {} | {}", account.index, account.display_name);

        let token = match self.api.access_token(&account.query).await {
            Ok(token) => token,
            Err(err) => {
                error!("account {}: failed to get access token: {err}", account.index);
                return;
            }
        };
        let summary = match self.api.user_info(&token).await {
            Ok(summary) => summary,
            Err(err) => {
                error!("account {}: failed to get user info: {err}", account.index);
                return;
            }
        };
        let Some(summary) = summary else {
            warn!(
                "account {} is not authorized or qualified for the game",
                account.index
            );
            return;
        };

        let mut budget = summary.budget;
        info!("total score: {}", summary.total_grade);
        info!("current tickets: {}", budget.available());
        if budget.available() == 0 {
            info!("no tickets available");
            return;
        }

        self.run_tasks(&token).await;
        self.run_tickets(&token, &mut budget, rng).await;
    }

    /// Attempt every incomplete task except the excluded one. Individual
    /// failures are logged, never fatal.
    async fn run_tasks(&self, token: &str) {
        let task_ids = match self.api.task_list(token).await {
            Ok(ids) => ids,
            Err(err) => {
                warn!("unable to get task list: {err}");
                return;
            }
        };
        if task_ids.is_empty() {
            info!("no uncompleted tasks found");
            return;
        }
        for task_id in task_ids {
            if task_id == EXCLUDED_TASK_ID {
                continue;
            }
            match self.api.complete_task(token, task_id).await {
                Ok(Some(kind)) => info!("completed task {task_id} ({kind})"),
                Ok(None) => info!("completed task {task_id}"),
                Err(err) => warn!("unable to complete task {task_id}: {err}"),
            }
            sleep(self.pacing.task_pause).await;
        }
    }

    /// Spend tickets until the budget runs out or a session ends the loop.
    async fn run_tickets(
        &self,
        token: &str,
        budget: &mut TicketBudget,
        rng: &mut (impl Rng + ?Sized),
    ) {
        while budget.available() > 0 {
            info!("starting game with {} available tickets", budget.available());
            let mut session = TicketSession::new(&self.api, self.pacing.play_window);
            match session.run(token, rng).await {
                TicketOutcome::Completed { .. } => {
                    budget.consume();
                    info!("tickets remaining: {}", budget.available());
                    if budget.available() > 0 {
                        sleep(self.pacing.ticket_pause).await;
                    }
                }
                TicketOutcome::OutOfTickets => {
                    // The local mirror was ahead of the server; stop cleanly.
                    break;
                }
                TicketOutcome::Failed(err) => {
                    error!("ticket session failed in {:?}: {err}", session.state());
                    break;
                }
            }
        }
        if budget.available() == 0 {
            info!("all tickets have been used");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockApi;
    use crate::api::{CODE_OUT_OF_TICKETS, GameStart, UserSummary};
    use moonbot_game::{ItemCatalog, ItemDefinition, ItemKind};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    const TAG: &str = "0123456789abcdef0123456789abcdef";

    fn account() -> Vec<Account> {
        vec![Account {
            index: 1,
            display_name: "Ada".to_string(),
            query: "user=%7B%22first_name%22%3A%22Ada%22%7D".to_string(),
        }]
    }

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
            ]),
        }
    }

    fn api_with_budget(total: u32, consumed: u32) -> MockApi {
        let api = MockApi::default();
        *api.user.lock().unwrap() = Some(Some(UserSummary {
            total_grade: 0,
            budget: TicketBudget::new(total, consumed),
        }));
        api
    }

    #[tokio::test]
    async fn spends_exactly_the_available_tickets() {
        let api = api_with_budget(5, 3);
        api.push_start(Ok(start_ok()));
        api.push_start(Ok(start_ok()));
        let controller = CycleController::new(api, Pacing::immediate());
        let mut rng = SmallRng::seed_from_u64(1);
        controller.run_cycle(&account(), &mut rng).await;
        // availableTickets = 2: two starts, two completes, no third start.
        assert_eq!(controller.api.count("start"), 2);
        assert_eq!(controller.api.count("complete:"), 2);
    }

    #[tokio::test]
    async fn out_of_tickets_code_stops_the_loop_cleanly() {
        let api = api_with_budget(5, 0);
        api.push_start(Err(MockApi::rejected(CODE_OUT_OF_TICKETS)));
        let controller = CycleController::new(api, Pacing::immediate());
        let mut rng = SmallRng::seed_from_u64(2);
        controller.run_cycle(&account(), &mut rng).await;
        assert_eq!(controller.api.count("start"), 1);
        assert_eq!(controller.api.count("complete:"), 0);
    }

    #[tokio::test]
    async fn failed_session_abandons_remaining_tickets() {
        let api = api_with_budget(3, 0);
        api.push_start(Ok(start_ok()));
        api.push_complete(Err(MockApi::rejected("100000")));
        let controller = CycleController::new(api, Pacing::immediate());
        let mut rng = SmallRng::seed_from_u64(3);
        controller.run_cycle(&account(), &mut rng).await;
        assert_eq!(controller.api.count("start"), 1);
        assert_eq!(controller.api.count("complete:"), 1);
    }

    #[tokio::test]
    async fn unqualified_account_is_skipped() {
        let api = MockApi::default();
        let controller = CycleController::new(api, Pacing::immediate());
        let mut rng = SmallRng::seed_from_u64(4);
        controller.run_cycle(&account(), &mut rng).await;
        let calls = controller.api.calls();
        assert_eq!(calls, ["access_token", "user_info"]);
    }

    #[tokio::test]
    async fn exhausted_budget_skips_the_ticket_loop() {
        let api = api_with_budget(4, 4);
        let controller = CycleController::new(api, Pacing::immediate());
        let mut rng = SmallRng::seed_from_u64(5);
        controller.run_cycle(&account(), &mut rng).await;
        assert_eq!(controller.api.count("start"), 0);
        assert_eq!(controller.api.count("task_list"), 0);
    }

    #[tokio::test]
    async fn task_flow_skips_the_excluded_id() {
        let api = api_with_budget(1, 0);
        *api.tasks.lock().unwrap() = vec![2057, 2058, 2059];
        api.push_start(Ok(start_ok()));
        let controller = CycleController::new(api, Pacing::immediate());
        let mut rng = SmallRng::seed_from_u64(6);
        controller.run_cycle(&account(), &mut rng).await;
        let calls = controller.api.calls();
        assert!(calls.contains(&"complete_task:2057".to_string()));
        assert!(calls.contains(&"complete_task:2059".to_string()));
        assert!(!calls.contains(&"complete_task:2058".to_string()));
        // Tasks run before the first game start.
        let first_start = calls.iter().position(|c| c == "start").unwrap();
        let last_task = calls
            .iter()
            .rposition(|c| c.starts_with("complete_task:"))
            .unwrap();
        assert!(last_task < first_start);
    }
}
