//! Ticket registry over a key/value cache.
//!
//! Each ticket is stored as `bincode` bytes under `{namespace}:{id}` with a
//! physical TTL taken from its policy's maximum lifetime. The TTL is a
//! backstop for tickets nobody touches again; the policy itself is still
//! evaluated by the central service on every use.
//!
//! Children of a granting ticket are read from the parent record, which
//! the central service rewrites through [`TicketRegistry::update_ticket`]
//! whenever it mints a child.
//!
//! # Multi-node caveat
//!
//! A shared cache gives no cross-node locking. Two nodes granting from the
//! same granting ticket at the same instant can both read the same usage
//! count and both mint a service ticket; the later `update_ticket` wins.
//! Consumption stays safe because it relies on `delete` returning `true` to
//! exactly one caller, but multi-use service tickets and usage counters are
//! only best-effort across nodes. Short ticket lifetimes and single-use
//! service tickets keep the exposure small. Deploy sticky sessions if that
//! is not acceptable.

use crate::error::{Result, TicketError};
use crate::storage::TicketCache;
use crate::ticket::{Ticket, TicketId, TicketKind};

use super::{visible, TicketRegistry};

/// Default key namespace.
pub const DEFAULT_NAMESPACE: &str = "cas";

/// Registry storing serialised tickets in a [`TicketCache`].
#[derive(Debug)]
pub struct CacheTicketRegistry<C> {
    cache: C,
    namespace: String,
}

impl<C: TicketCache> CacheTicketRegistry<C> {
    pub fn new(cache: C) -> Self {
        Self::with_namespace(cache, DEFAULT_NAMESPACE)
    }

    /// Use a custom key namespace, e.g. to share one cache between
    /// several independent deployments.
    pub fn with_namespace(cache: C, namespace: impl Into<String>) -> Self {
        Self {
            cache,
            namespace: namespace.into(),
        }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    fn key(&self, id: &TicketId) -> String {
        format!("{}:{}", self.namespace, id)
    }

    fn read(&self, id: &TicketId) -> Result<Option<Ticket>> {
        self.cache
            .get(&self.key(id))?
            .map(|bytes| decode(&bytes))
            .transpose()
    }
}

fn encode(ticket: &Ticket) -> Result<Vec<u8>> {
    bincode::serialize(ticket).map_err(|e| TicketError::Serialization(e.to_string()))
}

fn decode(bytes: &[u8]) -> Result<Ticket> {
    bincode::deserialize(bytes).map_err(|e| TicketError::Serialization(e.to_string()))
}

impl<C: TicketCache> TicketRegistry for CacheTicketRegistry<C> {
    fn add_ticket(&self, ticket: Ticket) -> Result<()> {
        let bytes = encode(&ticket)?;
        let ttl = ticket.expiration_policy().max_lifetime_ms();
        if self.cache.add(&self.key(ticket.id()), bytes, ttl)? {
            Ok(())
        } else {
            log::warn!("ticket id collision on {}", ticket.id().fingerprint());
            Err(TicketError::TicketCreationFailed(
                "ticket id collision".into(),
            ))
        }
    }

    fn get_ticket(&self, id: &TicketId, kind: TicketKind) -> Result<Option<Ticket>> {
        Ok(self.read(id)?.and_then(|t| visible(t, kind)))
    }

    fn update_ticket(&self, ticket: &Ticket) -> Result<()> {
        let bytes = encode(ticket)?;
        let ttl = ticket.expiration_policy().max_lifetime_ms();
        if !self.cache.replace(&self.key(ticket.id()), bytes, ttl)? {
            log::debug!(
                "update skipped, ticket {} no longer stored",
                ticket.id().fingerprint()
            );
        }
        Ok(())
    }

    fn delete_ticket(&self, id: &TicketId) -> Result<bool> {
        self.cache.delete(&self.key(id))
    }

    fn get_children(&self, id: &TicketId) -> Result<Vec<TicketId>> {
        match self.read(id)? {
            Some(Ticket::Granting(t)) => Ok(t.children().iter().cloned().collect()),
            _ => Ok(Vec::new()),
        }
    }

    fn tickets(&self) -> Result<Vec<Ticket>> {
        let prefix = format!("{}:", self.namespace);
        let mut tickets = Vec::new();
        for key in self.cache.keys()? {
            let Some(id) = key.strip_prefix(&prefix) else {
                continue;
            };
            // Entries can vanish between listing and reading.
            if let Some(ticket) = self.read(&TicketId::from(id))? {
                tickets.push(ticket);
            }
        }
        Ok(tickets)
    }
}
