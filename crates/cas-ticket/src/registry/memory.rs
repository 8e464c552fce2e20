//! In-process ticket registry.

use std::collections::BTreeSet;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{Result, TicketError};
use crate::ticket::{Ticket, TicketId, TicketKind};

use super::{visible, TicketRegistry};

/// Ticket registry backed by concurrent hash maps.
///
/// Maintains a secondary index from parent id to child ids so cascades do
/// not need to read the parent record.
#[derive(Debug, Default)]
pub struct InMemoryTicketRegistry {
    /// Primary store: ticket id → ticket.
    tickets: DashMap<TicketId, Ticket>,
    /// Secondary index: parent id → child ids.
    children: DashMap<TicketId, BTreeSet<TicketId>>,
}

impl InMemoryTicketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tickets: DashMap::with_capacity(capacity),
            children: DashMap::new(),
        }
    }
}

impl TicketRegistry for InMemoryTicketRegistry {
    fn add_ticket(&self, ticket: Ticket) -> Result<()> {
        let parent = ticket.parent_id().cloned();
        let id = ticket.id().clone();

        match self.tickets.entry(id.clone()) {
            Entry::Occupied(_) => {
                log::warn!("ticket id collision on {}", id.fingerprint());
                return Err(TicketError::TicketCreationFailed(
                    "ticket id collision".into(),
                ));
            }
            Entry::Vacant(slot) => {
                slot.insert(ticket);
            }
        }

        if let Some(parent) = parent {
            self.children.entry(parent).or_default().insert(id);
        }
        Ok(())
    }

    fn get_ticket(&self, id: &TicketId, kind: TicketKind) -> Result<Option<Ticket>> {
        let found = self.tickets.get(id).map(|t| t.value().clone());
        Ok(found.and_then(|t| visible(t, kind)))
    }

    fn update_ticket(&self, ticket: &Ticket) -> Result<()> {
        if let Some(mut stored) = self.tickets.get_mut(ticket.id()) {
            *stored = ticket.clone();
        }
        Ok(())
    }

    fn delete_ticket(&self, id: &TicketId) -> Result<bool> {
        let Some((_, removed)) = self.tickets.remove(id) else {
            return Ok(false);
        };

        if let Some(parent) = removed.parent_id() {
            let now_empty = self
                .children
                .get_mut(parent)
                .map(|mut set| {
                    set.remove(id);
                    set.is_empty()
                })
                .unwrap_or(false);
            if now_empty {
                self.children.remove_if(parent, |_, set| set.is_empty());
            }
        }
        self.children.remove(id);
        Ok(true)
    }

    fn get_children(&self, id: &TicketId) -> Result<Vec<TicketId>> {
        Ok(self
            .children
            .get(id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn tickets(&self) -> Result<Vec<Ticket>> {
        Ok(self.tickets.iter().map(|e| e.value().clone()).collect())
    }

    fn ticket_count(&self) -> Result<usize> {
        Ok(self.tickets.len())
    }
}
