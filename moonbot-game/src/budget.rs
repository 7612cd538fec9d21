//! Ticket accounting mirrored from remote user info.

/// Optimistic local mirror of the server-side attempt counters.
///
/// The authoritative count lives on the remote service; this copy only
/// bounds the local ticket loop. It is read once per account visit and
/// decremented after each confirmed remote completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TicketBudget {
    pub total_attempts: u32,
    pub consumed_attempts: u32,
}

impl TicketBudget {
    #[must_use]
    pub const fn new(total_attempts: u32, consumed_attempts: u32) -> Self {
        Self {
            total_attempts,
            consumed_attempts,
        }
    }

    /// Tickets still spendable this visit.
    #[must_use]
    pub const fn available(&self) -> u32 {
        self.total_attempts.saturating_sub(self.consumed_attempts)
    }

    /// Record one confirmed remote completion.
    pub fn consume(&mut self) {
        self.consumed_attempts = self.consumed_attempts.saturating_add(1);
    }
}
