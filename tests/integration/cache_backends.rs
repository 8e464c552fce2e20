//! Integration test: the ticket engine over key/value cache backends.
//!
//! Several service instances share one cache, as nodes of a cluster
//! would. Any node can grant, validate or destroy tickets another node
//! created.

use std::sync::Arc;

use cas_ticket::{
    CacheTicketRegistry, CasConfig, CentralAuthenticationService, Credential, DirectoryCache,
    ExpirationPolicy, ManualClock, MemoryCache, Service, SimpleTestAuthenticator, TicketCache,
    TicketError, TicketRegistry,
};

fn node(
    registry: Arc<dyn TicketRegistry>,
    suffix: &str,
    clock: Arc<ManualClock>,
    config: CasConfig,
) -> CentralAuthenticationService {
    CentralAuthenticationService::new(
        registry,
        Arc::new(SimpleTestAuthenticator),
        CasConfig {
            id_suffix: suffix.to_string(),
            ..config
        },
    )
    .unwrap()
    .with_clock(clock)
}

fn alice() -> Credential {
    Credential::username_password("alice", "alice")
}

#[test]
fn directory_cache_shared_between_nodes() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let app = Service::new("https://app.example.org/");

    let registry_a = Arc::new(CacheTicketRegistry::new(
        DirectoryCache::with_clock(dir.path(), clock.clone()).unwrap(),
    ));
    let registry_b = Arc::new(CacheTicketRegistry::new(
        DirectoryCache::with_clock(dir.path(), clock.clone()).unwrap(),
    ));
    let a = node(registry_a, "node_a", clock.clone(), CasConfig::default());
    let b = node(registry_b, "node_b", clock.clone(), CasConfig::default());

    let tgt = a.create_ticket_granting_ticket(&alice()).unwrap();
    let st = b.grant_service_ticket(&tgt, &app, None).unwrap();
    assert!(st.as_str().ends_with("-node_b"));

    let assertion = a.validate_service_ticket(&st, &app).unwrap();
    assert_eq!(assertion.principal().id, "alice");
    assert!(b.validate_service_ticket(&st, &app).is_err());

    let pending = a.grant_service_ticket(&tgt, &app, None).unwrap();
    b.destroy_ticket_granting_ticket(&tgt).unwrap();
    assert!(a.validate_service_ticket(&pending, &app).is_err());
    assert!(a.grant_service_ticket(&tgt, &app, None).is_err());
    assert_eq!(a.registry().ticket_count().unwrap(), 0);
}

#[test]
fn directory_cache_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let app = Service::new("https://app.example.org/");

    let tgt = {
        let registry = Arc::new(CacheTicketRegistry::new(
            DirectoryCache::with_clock(dir.path(), clock.clone()).unwrap(),
        ));
        let cas = node(registry, "cas", clock.clone(), CasConfig::default());
        cas.create_ticket_granting_ticket(&alice()).unwrap()
    };

    let registry = Arc::new(CacheTicketRegistry::new(
        DirectoryCache::with_clock(dir.path(), clock.clone()).unwrap(),
    ));
    let cas = node(registry, "cas", clock, CasConfig::default());
    let st = cas.grant_service_ticket(&tgt, &app, None).unwrap();
    assert!(cas.validate_service_ticket(&st, &app).is_ok());
}

#[test]
fn physical_ttl_backstops_expiry() {
    let clock = Arc::new(ManualClock::new(0));
    let cache = Arc::new(MemoryCache::with_clock(clock.clone()));
    let registry = Arc::new(CacheTicketRegistry::new(cache.clone()));
    let cas = node(
        registry,
        "cas",
        clock.clone(),
        CasConfig {
            ticket_granting: ExpirationPolicy::TimeToLive { ttl_ms: 1_000 },
            ..CasConfig::default()
        },
    );

    cas.create_ticket_granting_ticket(&alice()).unwrap();
    assert_eq!(cache.keys().unwrap().len(), 1);

    clock.advance(1_000);
    assert_eq!(cache.purge_expired().unwrap(), 1);
    assert!(cache.keys().unwrap().is_empty());
}

#[test]
fn memory_cache_single_use_across_nodes() {
    let clock = Arc::new(ManualClock::new(0));
    let cache = Arc::new(MemoryCache::with_clock(clock.clone()));
    let a = node(
        Arc::new(CacheTicketRegistry::new(cache.clone())),
        "a",
        clock.clone(),
        CasConfig::default(),
    );
    let b = node(
        Arc::new(CacheTicketRegistry::new(cache)),
        "b",
        clock,
        CasConfig::default(),
    );
    let app = Service::new("https://app.example.org/");

    let tgt = a.create_ticket_granting_ticket(&alice()).unwrap();
    let st = a.grant_service_ticket(&tgt, &app, None).unwrap();

    assert!(b.validate_service_ticket(&st, &app).is_ok());
    assert!(matches!(
        a.validate_service_ticket(&st, &app),
        Err(TicketError::InvalidTicket)
    ));
}

#[test]
fn sweep_over_directory_cache() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let registry = Arc::new(CacheTicketRegistry::new(
        DirectoryCache::with_clock(dir.path(), clock.clone()).unwrap(),
    ));
    let cas = node(
        registry.clone(),
        "cas",
        clock.clone(),
        CasConfig {
            ticket_granting: ExpirationPolicy::TimeToLiveWithIdleTimeout {
                ttl_ms: 60_000,
                idle_ms: 5_000,
            },
            ..CasConfig::default()
        },
    );
    let app = Service::new("https://app.example.org/");

    let tgt = cas.create_ticket_granting_ticket(&alice()).unwrap();
    cas.grant_service_ticket(&tgt, &app, None).unwrap();
    cas.grant_service_ticket(&tgt, &app, None).unwrap();

    clock.advance(4_000);
    assert_eq!(cas.sweep_expired().unwrap().total(), 0);

    // Idle past the limit, though the files have not lapsed physically.
    clock.advance(2_000);
    let report = cas.sweep_expired().unwrap();
    assert_eq!(report.granting_destroyed, 1);
    assert_eq!(report.service_deleted, 2);
    assert_eq!(registry.ticket_count().unwrap(), 0);
}

#[test]
fn directory_cache_accepts_high_entropy_ids() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let app = Service::new("https://app.example.org/");
    let registry = Arc::new(CacheTicketRegistry::new(
        DirectoryCache::with_clock(dir.path(), clock.clone()).unwrap(),
    ));
    let cas = node(
        registry,
        "node_a",
        clock,
        CasConfig {
            id_random_bytes: 256,
            ..CasConfig::default()
        },
    );

    let tgt = cas.create_ticket_granting_ticket(&alice()).unwrap();
    assert!(tgt.as_str().len() > 255);
    let st = cas.grant_service_ticket(&tgt, &app, None).unwrap();
    assert_eq!(
        cas.validate_service_ticket(&st, &app).unwrap().principal().id,
        "alice"
    );
}
