//! The central authentication service: the only component that mutates
//! ticket state.
//!
//! Every read-check-write sequence runs under the per-id lock of the
//! ticket it mutates. At most one ticket lock is held at a time, and
//! nested work always goes from a granting ticket down to its children,
//! so the service cannot deadlock against itself. Authenticator calls
//! never happen under a lock.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::authn::{Authentication, AuthenticationError, Authenticator, Credential};
use crate::config::CasConfig;
use crate::error::{Result, TicketError};
use crate::registry::TicketRegistry;
use crate::ticket::{
    Assertion, Service, ServiceTicket, Ticket, TicketGrantingTicket, TicketId, TicketIdGenerator,
    TicketKind,
};
use crate::time::{Clock, SystemClock};

use super::locks::TicketLocks;

/// Counts from one [`CentralAuthenticationService::sweep_expired`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Granting tickets destroyed, cascades included.
    pub granting_destroyed: usize,
    /// Service tickets deleted, cascades included.
    pub service_deleted: usize,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.granting_destroyed + self.service_deleted
    }
}

/// Orchestrates authentication and the ticket lifecycle.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use cas_ticket::{
///     CasConfig, CentralAuthenticationService, Credential, InMemoryTicketRegistry,
///     Service, SimpleTestAuthenticator,
/// };
///
/// let cas = CentralAuthenticationService::new(
///     Arc::new(InMemoryTicketRegistry::new()),
///     Arc::new(SimpleTestAuthenticator),
///     CasConfig::default(),
/// )
/// .unwrap();
///
/// let tgt = cas
///     .create_ticket_granting_ticket(&Credential::username_password("alice", "alice"))
///     .unwrap();
/// let app = Service::new("https://app.example.org/");
/// let st = cas.grant_service_ticket(&tgt, &app, None).unwrap();
/// let assertion = cas.validate_service_ticket(&st, &app).unwrap();
/// assert_eq!(assertion.principal().id, "alice");
/// assert!(cas.validate_service_ticket(&st, &app).is_err());
/// ```
pub struct CentralAuthenticationService {
    registry: Arc<dyn TicketRegistry>,
    authenticator: Arc<dyn Authenticator>,
    config: CasConfig,
    ids: TicketIdGenerator,
    clock: Arc<dyn Clock>,
    locks: TicketLocks,
}

/// What happened under the granting ticket's lock.
enum GrantOutcome {
    Issued(TicketId),
    Expired,
    PrincipalChanged,
}

impl CentralAuthenticationService {
    /// Build a service over `registry` and `authenticator`.
    ///
    /// # Errors
    ///
    /// Returns `TicketError::InvalidConfiguration` if `config` does not
    /// validate.
    pub fn new(
        registry: Arc<dyn TicketRegistry>,
        authenticator: Arc<dyn Authenticator>,
        config: CasConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            registry,
            authenticator,
            ids: TicketIdGenerator::new(config.id_suffix.clone(), config.id_random_bytes),
            locks: TicketLocks::with_capacity(config.lock_table_hint),
            clock: Arc::new(SystemClock),
            config,
        })
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn registry(&self) -> &Arc<dyn TicketRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &CasConfig {
        &self.config
    }

    // -- Login --------------------------------------------------------------

    /// Authenticate `credential` and store a new granting ticket.
    ///
    /// Nothing is stored unless authentication succeeds.
    ///
    /// # Errors
    ///
    /// `AuthenticationFailed` for a rejected credential,
    /// `TicketCreationFailed` if the ticket cannot be stored.
    pub fn create_ticket_granting_ticket(&self, credential: &Credential) -> Result<TicketId> {
        let authentication = self.authenticate(credential).map_err(|e| {
            log::warn!("login rejected for {} credential: {e}", credential.kind());
            TicketError::AuthenticationFailed(e.to_string())
        })?;

        let now = self.clock.now_millis();
        let policy = self
            .config
            .granting_policy(authentication.is_long_term())
            .clone();
        let id = self.ids.next_id(TicketKind::Granting);
        let principal = authentication.principal().id.clone();
        let tgt = TicketGrantingTicket::new(id.clone(), authentication, policy, now);

        self.registry
            .add_ticket(tgt.into())
            .map_err(TicketError::into_creation_failure)?;

        log::info!(
            "created granting ticket {} for {principal}",
            id.fingerprint()
        );
        Ok(id)
    }

    // -- Grant --------------------------------------------------------------

    /// Mint a service ticket for `service` from a granting ticket.
    ///
    /// Passing a `credential` makes this a renew request: the credential is
    /// authenticated again and must resolve to the same principal. A renew
    /// that fails destroys the granting ticket.
    ///
    /// A granting ticket found expired here is destroyed.
    ///
    /// # Errors
    ///
    /// `InvalidTicket` for an unknown or expired granting ticket,
    /// `RenewalAuthenticationMismatch` for a failed renew,
    /// `TicketCreationFailed` if the new ticket cannot be stored.
    pub fn grant_service_ticket(
        &self,
        tgt_id: &TicketId,
        service: &Service,
        credential: Option<&Credential>,
    ) -> Result<TicketId> {
        let Some(tgt) = self.registry.get_granting_ticket(tgt_id)? else {
            return Err(TicketError::InvalidTicket);
        };
        // An expired session must look like an unknown one, so this runs
        // before a renew credential reaches the authenticator.
        let now = self.clock.now_millis();
        if tgt.is_expired(now) || self.lineage(tgt.parent(), now)?.is_none() {
            log::debug!("granting ticket {} expired on use", tgt_id.fingerprint());
            self.destroy_ticket_granting_ticket(tgt_id)?;
            return Err(TicketError::InvalidTicket);
        }

        let renewed = match credential {
            None => None,
            Some(credential) => match self.authenticate(credential) {
                Ok(authentication) => Some(authentication),
                Err(e) => {
                    log::warn!(
                        "renew failed on granting ticket {}: {e}",
                        tgt_id.fingerprint()
                    );
                    self.destroy_ticket_granting_ticket(tgt_id)?;
                    return Err(TicketError::RenewalAuthenticationMismatch);
                }
            },
        };

        let outcome = self.locks.with_lock(tgt_id, || {
            self.grant_locked(tgt_id, service, renewed.as_deref())
        })?;

        match outcome {
            GrantOutcome::Issued(st_id) => {
                log::info!(
                    "granted service ticket {} from {} for {service}",
                    st_id.fingerprint(),
                    tgt_id.fingerprint()
                );
                Ok(st_id)
            }
            GrantOutcome::Expired => {
                log::debug!("granting ticket {} expired on use", tgt_id.fingerprint());
                self.destroy_ticket_granting_ticket(tgt_id)?;
                Err(TicketError::InvalidTicket)
            }
            GrantOutcome::PrincipalChanged => {
                log::warn!(
                    "renew on granting ticket {} resolved to another principal",
                    tgt_id.fingerprint()
                );
                self.destroy_ticket_granting_ticket(tgt_id)?;
                Err(TicketError::RenewalAuthenticationMismatch)
            }
        }
    }

    fn grant_locked(
        &self,
        tgt_id: &TicketId,
        service: &Service,
        renewed: Option<&Authentication>,
    ) -> Result<GrantOutcome> {
        let Some(mut tgt) = self.registry.get_granting_ticket(tgt_id)? else {
            self.locks.forget(tgt_id);
            return Err(TicketError::InvalidTicket);
        };

        let now = self.clock.now_millis();
        if tgt.is_expired(now) || self.lineage(tgt.parent(), now)?.is_none() {
            return Ok(GrantOutcome::Expired);
        }

        if let Some(renewed) = renewed {
            if renewed.principal().id != tgt.authentication().principal().id {
                return Ok(GrantOutcome::PrincipalChanged);
            }
        }

        let from_new_login = renewed.is_some() || tgt.state().usage_count == 0;
        tgt.record_use(now);

        let st_id = self.ids.next_id(TicketKind::Service);
        let st = ServiceTicket::new(
            st_id.clone(),
            service.clone(),
            tgt_id.clone(),
            from_new_login,
            self.config.service.clone(),
            now,
        );
        self.registry
            .add_ticket(st.into())
            .map_err(TicketError::into_creation_failure)?;

        tgt.add_child(st_id.clone());
        if let Err(e) = self.registry.update_ticket(&tgt.into()) {
            self.registry.delete_ticket(&st_id)?;
            return Err(e.into_creation_failure());
        }
        Ok(GrantOutcome::Issued(st_id))
    }

    // -- Validate -----------------------------------------------------------

    /// Check a service ticket presented by `service` and consume one use.
    ///
    /// With the default single-use policy the ticket is removed, and every
    /// later validation of the same id fails. A ticket presented by the
    /// wrong service is removed as well.
    ///
    /// # Errors
    ///
    /// `InvalidTicket` for an unknown, expired or consumed ticket, a
    /// service mismatch, or a granting ticket that is no longer live.
    pub fn validate_service_ticket(&self, st_id: &TicketId, service: &Service) -> Result<Assertion> {
        if self.registry.get_service_ticket(st_id)?.is_none() {
            return Err(TicketError::InvalidTicket);
        }

        let (assertion, retired) = self
            .locks
            .with_lock(st_id, || self.validate_locked(st_id, service))?;

        if let Some(parent) = retired {
            self.locks.forget(st_id);
            self.detach(&parent, st_id)?;
        }

        match assertion {
            Some(assertion) => {
                log::info!(
                    "validated service ticket {} for {service} ({} proxy hops)",
                    st_id.fingerprint(),
                    assertion.proxy_hops()
                );
                Ok(assertion)
            }
            None => Err(TicketError::InvalidTicket),
        }
    }

    /// Returns the assertion, if valid, and the parent id if the ticket
    /// left the registry.
    fn validate_locked(
        &self,
        st_id: &TicketId,
        service: &Service,
    ) -> Result<(Option<Assertion>, Option<TicketId>)> {
        let Some(mut st) = self.registry.get_service_ticket(st_id)? else {
            return Ok((None, None));
        };
        let now = self.clock.now_millis();
        let parent = st.granting_ticket().clone();

        let chain = if st.is_expired(now) {
            log::debug!("service ticket {} expired", st_id.fingerprint());
            None
        } else if !st.service().matches(service.id()) {
            log::warn!(
                "service ticket {} issued for {} presented by {service}",
                st_id.fingerprint(),
                st.service()
            );
            None
        } else {
            self.lineage(Some(&parent), now)?
        };

        let Some(mut chain) = chain else {
            self.registry.delete_ticket(st_id)?;
            return Ok((None, Some(parent)));
        };

        let retired = if st.record_validation(now) {
            // Exactly one caller can win the delete, even on a backend
            // shared between nodes.
            if !self.registry.delete_ticket(st_id)? {
                return Ok((None, None));
            }
            Some(parent)
        } else {
            self.registry.update_ticket(&Ticket::from(st.clone()))?;
            None
        };

        chain.reverse();
        let assertion = Assertion::new(chain, st.service().clone(), st.is_from_new_login());
        Ok((Some(assertion), retired))
    }

    // -- Destroy ------------------------------------------------------------

    /// Destroy a granting ticket and everything chained below it.
    ///
    /// Idempotent: an unknown or already destroyed id is not an error.
    ///
    /// # Errors
    ///
    /// Only registry failures.
    pub fn destroy_ticket_granting_ticket(&self, tgt_id: &TicketId) -> Result<()> {
        if self.registry.get_service_ticket(tgt_id)?.is_some() {
            return Ok(());
        }
        let removed = self.destroy_subtree(tgt_id, 0)?;
        if removed.granting_destroyed + removed.service_deleted > 0 {
            log::info!(
                "destroyed granting ticket {} ({} granting, {} service tickets removed)",
                tgt_id.fingerprint(),
                removed.granting_destroyed,
                removed.service_deleted
            );
        }
        Ok(())
    }

    /// Flag `id` expired, remove its children recursively, then remove it.
    fn destroy_subtree(&self, id: &TicketId, depth: u32) -> Result<SweepReport> {
        let (children, parent, is_granting) = self.locks.with_lock(id, || -> Result<_> {
            let mut children: BTreeSet<TicketId> =
                self.registry.get_children(id)?.into_iter().collect();
            let mut parent = None;
            let mut is_granting = false;
            if let Some(mut tgt) = self.registry.get_granting_ticket(id)? {
                children.extend(tgt.children().iter().cloned());
                parent = tgt.parent().cloned();
                is_granting = true;
                tgt.mark_expired();
                self.registry.update_ticket(&tgt.into())?;
            }
            Ok((children, parent, is_granting))
        })?;

        let mut report = SweepReport::default();
        if depth > self.config.max_proxy_depth {
            log::warn!(
                "ticket tree below {} deeper than the proxy limit",
                id.fingerprint()
            );
        } else {
            for child in &children {
                let below = self.destroy_subtree(child, depth + 1)?;
                report.granting_destroyed += below.granting_destroyed;
                report.service_deleted += below.service_deleted;
            }
        }

        if self.registry.delete_ticket(id)? {
            // Flagged records read as absent, so a granting ticket left over
            // from an interrupted destroy is only known by its position.
            if is_granting || depth == 0 {
                report.granting_destroyed += 1;
            } else {
                report.service_deleted += 1;
            }
        }
        self.locks.forget(id);

        if depth == 0 {
            if let Some(parent) = parent {
                self.detach(&parent, id)?;
            }
        }
        Ok(report)
    }

    // -- Proxy --------------------------------------------------------------

    /// Obtain a proxy granting ticket through a service ticket.
    ///
    /// `credential` identifies the proxy, normally its callback URL, and is
    /// authenticated first. The service ticket must be live and must not
    /// have minted a proxy ticket before. It is not consumed; the proxy
    /// still validates it separately.
    ///
    /// # Errors
    ///
    /// `AuthenticationFailed` for a rejected proxy credential,
    /// `InvalidTicket` if the service ticket or its lineage is not usable
    /// or the proxy chain would exceed `max_proxy_depth`.
    pub fn delegate_ticket_granting_ticket(
        &self,
        st_id: &TicketId,
        credential: &Credential,
    ) -> Result<TicketId> {
        if self.registry.get_service_ticket(st_id)?.is_none() {
            return Err(TicketError::InvalidTicket);
        }

        let authentication = self.authenticate(credential).map_err(|e| {
            log::warn!("proxy credential rejected: {e}");
            TicketError::AuthenticationFailed(e.to_string())
        })?;
        let proxied_by = match credential {
            Credential::Url { url } => Some(url.clone()),
            _ => None,
        };

        let parent_id = self.locks.with_lock(st_id, || -> Result<TicketId> {
            let Some(mut st) = self.registry.get_service_ticket(st_id)? else {
                return Err(TicketError::InvalidTicket);
            };
            if st.is_expired(self.clock.now_millis()) || !st.mark_proxy_granted() {
                return Err(TicketError::InvalidTicket);
            }
            self.registry.update_ticket(&Ticket::from(st.clone()))?;
            Ok(st.granting_ticket().clone())
        })?;

        let pgt_id = self.locks.with_lock(&parent_id, || -> Result<TicketId> {
            let now = self.clock.now_millis();
            let Some(mut parent) = self.registry.get_granting_ticket(&parent_id)? else {
                return Err(TicketError::InvalidTicket);
            };
            if !is_alive(&parent, now) || self.lineage(parent.parent(), now)?.is_none() {
                return Err(TicketError::InvalidTicket);
            }
            if parent.proxy_depth() >= self.config.max_proxy_depth {
                log::warn!(
                    "proxy request through {} exceeds depth {}",
                    st_id.fingerprint(),
                    self.config.max_proxy_depth
                );
                return Err(TicketError::InvalidTicket);
            }

            let id = self.ids.next_id(TicketKind::Granting);
            let policy = self
                .config
                .granting_policy(authentication.is_long_term())
                .clone();
            let pgt = TicketGrantingTicket::new_proxy(
                id.clone(),
                Arc::clone(&authentication),
                policy,
                &parent,
                proxied_by.clone(),
                now,
            );
            self.registry
                .add_ticket(pgt.into())
                .map_err(TicketError::into_creation_failure)?;

            parent.add_child(id.clone());
            if let Err(e) = self.registry.update_ticket(&parent.into()) {
                self.registry.delete_ticket(&id)?;
                return Err(e.into_creation_failure());
            }
            Ok(id)
        })?;

        log::info!(
            "delegated proxy granting ticket {} via {} to {}",
            pgt_id.fingerprint(),
            st_id.fingerprint(),
            proxied_by.as_deref().unwrap_or("<non-url credential>")
        );
        Ok(pgt_id)
    }

    // -- Reclamation --------------------------------------------------------

    /// Remove every ticket that can no longer be used.
    ///
    /// Correctness never depends on this; expiry is also discovered when a
    /// ticket is next touched. The throttle window of
    /// [`ThrottledUseAndTimeout`](crate::ExpirationPolicy::ThrottledUseAndTimeout)
    /// is ignored here, since a sweep is not a use.
    ///
    /// # Errors
    ///
    /// Only registry failures.
    pub fn sweep_expired(&self) -> Result<SweepReport> {
        let now = self.clock.now_millis();
        let mut report = SweepReport::default();

        for ticket in self.registry.tickets()? {
            match ticket {
                Ticket::Granting(tgt) => {
                    let dead = !is_alive(&tgt, now) || self.lineage(tgt.parent(), now)?.is_none();
                    if dead {
                        let removed = self.destroy_subtree(tgt.id(), 0)?;
                        report.granting_destroyed += removed.granting_destroyed;
                        report.service_deleted += removed.service_deleted;
                    }
                }
                Ticket::Service(st) => {
                    let dead = st.is_consumed()
                        || st
                            .expiration_policy()
                            .is_reclaimable(st.state(), now)
                        || self.lineage(Some(st.granting_ticket()), now)?.is_none();
                    if dead && self.registry.delete_ticket(st.id())? {
                        report.service_deleted += 1;
                        self.locks.forget(st.id());
                        self.detach(st.granting_ticket(), st.id())?;
                    }
                }
            }
        }

        if report.total() > 0 {
            log::info!(
                "sweep removed {} granting and {} service tickets",
                report.granting_destroyed,
                report.service_deleted
            );
        }
        Ok(report)
    }

    // -- Helpers ------------------------------------------------------------

    fn authenticate(
        &self,
        credential: &Credential,
    ) -> std::result::Result<Arc<Authentication>, AuthenticationError> {
        let outcome = self.authenticator.authenticate(credential)?;
        Ok(Arc::new(Authentication::new(
            outcome.principal,
            self.clock.now_millis(),
            outcome.metadata,
            outcome.long_term || credential.remember_me(),
        )))
    }

    /// Authentications of the live granting tickets from `start` up to the
    /// original login, nearest first. `None` if any link is missing,
    /// destroyed, past its lifetime, or the chain is deeper than allowed.
    fn lineage(
        &self,
        start: Option<&TicketId>,
        now: u64,
    ) -> Result<Option<Vec<Arc<Authentication>>>> {
        let mut chain = Vec::new();
        let mut next = start.cloned();

        while let Some(id) = next {
            if chain.len() > self.config.max_proxy_depth as usize {
                return Ok(None);
            }
            match self.registry.get_granting_ticket(&id)? {
                Some(tgt) if is_alive(&tgt, now) => {
                    chain.push(Arc::clone(tgt.authentication()));
                    next = tgt.parent().cloned();
                }
                _ => return Ok(None),
            }
        }
        Ok(Some(chain))
    }

    /// Drop `child` from the child set of `parent`.
    fn detach(&self, parent: &TicketId, child: &TicketId) -> Result<()> {
        self.locks.with_lock(parent, || {
            match self.registry.get_granting_ticket(parent)? {
                Some(mut tgt) => {
                    if tgt.remove_child(child) {
                        self.registry.update_ticket(&tgt.into())?;
                    }
                }
                None => self.locks.forget(parent),
            }
            Ok(())
        })
    }
}

/// A granting ticket read as an ancestor rather than used directly: only
/// its lifetime bounds apply, not the throttle window.
fn is_alive(tgt: &TicketGrantingTicket, now: u64) -> bool {
    !tgt.is_marked_expired()
        && !tgt
            .expiration_policy()
            .is_reclaimable(tgt.state(), now)
}
