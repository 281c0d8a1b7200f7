//! Append-only conversation log.
//!
//! The log is the single source of truth for what the client renders. A
//! query produces two entries: the user [`Exchange`], appended when the query
//! is submitted, and the assistant [`Exchange`] (answer or diagnostic),
//! appended when that query's request resolves.
//!
//! # Ordering
//!
//! Every submission is issued a [`QueryTicket`] carrying a sequence number
//! and the log's epoch. Resolutions are applied in submission order: a
//! response that arrives before an earlier one is buffered until the earlier
//! one resolves. [`ConversationLog::clear`] bumps the epoch, so tickets issued
//! before the clear resolve as [`Resolution::Stale`] and never touch the log.

use std::collections::BTreeMap;

use crate::models::{Exchange, QueryResponse, Role};

/// Handle for one submitted query, redeemed exactly once on resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryTicket {
    epoch: u64,
    seq: u64,
}

impl QueryTicket {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Outcome of redeeming a [`QueryTicket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// This many assistant exchanges were appended (the resolved one plus any
    /// later ones that were buffered behind it).
    Appended(usize),
    /// Held until earlier submissions resolve.
    Buffered,
    /// The ticket predates the last clear; the resolution was dropped.
    Stale,
    /// The ticket was already redeemed.
    Duplicate,
}

#[derive(Debug, Default)]
pub struct ConversationLog {
    exchanges: Vec<Exchange>,
    epoch: u64,
    next_seq: u64,
    next_to_append: u64,
    buffered: BTreeMap<u64, Exchange>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Number of submitted queries in this epoch still waiting for their
    /// assistant exchange, buffered ones included.
    pub fn outstanding(&self) -> usize {
        (self.next_seq - self.next_to_append) as usize
    }

    pub fn is_awaiting_response(&self) -> bool {
        self.outstanding() > 0
    }

    /// Most recent assistant exchange, if any.
    pub fn last_assistant(&self) -> Option<&Exchange> {
        self.exchanges
            .iter()
            .rev()
            .find(|ex| ex.role == Role::Assistant)
    }

    pub fn append_user_exchange(&mut self, text: impl Into<String>) -> QueryTicket {
        self.exchanges.push(Exchange::user(text));
        let ticket = QueryTicket {
            epoch: self.epoch,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        ticket
    }

    pub fn append_assistant_exchange(
        &mut self,
        ticket: QueryTicket,
        response: QueryResponse,
    ) -> Resolution {
        self.resolve(ticket, Exchange::assistant(response))
    }

    pub fn append_assistant_error(
        &mut self,
        ticket: QueryTicket,
        message: impl Into<String>,
    ) -> Resolution {
        self.resolve(ticket, Exchange::assistant_error(message))
    }

    /// Empty the log and invalidate every outstanding ticket.
    pub fn clear(&mut self) {
        self.exchanges.clear();
        self.buffered.clear();
        self.epoch += 1;
        self.next_to_append = self.next_seq;
    }

    fn resolve(&mut self, ticket: QueryTicket, exchange: Exchange) -> Resolution {
        if ticket.epoch != self.epoch {
            return Resolution::Stale;
        }
        if ticket.seq < self.next_to_append
            || ticket.seq >= self.next_seq
            || self.buffered.contains_key(&ticket.seq)
        {
            return Resolution::Duplicate;
        }

        self.buffered.insert(ticket.seq, exchange);

        let mut appended = 0;
        while let Some(ex) = self.buffered.remove(&self.next_to_append) {
            self.exchanges.push(ex);
            self.next_to_append += 1;
            appended += 1;
        }

        if appended == 0 {
            Resolution::Buffered
        } else {
            Resolution::Appended(appended)
        }
    }
}
