//! Integration test: full single sign-on session.
//!
//! Tests the complete lifecycle:
//! 1. Log in through an authenticator chain
//! 2. Grant service tickets for several services
//! 3. Validate each ticket once
//! 4. Renew with fresh credentials
//! 5. Sign out and confirm every ticket is gone

use std::sync::Arc;

use cas_ticket::authn::AUTHENTICATION_METHOD;
use cas_ticket::{
    AuthenticatorChain, CasConfig, CentralAuthenticationService, Credential, ExpirationPolicy,
    InMemoryTicketRegistry, ManualClock, RemoteAddressAuthenticator, Service,
    SimpleTestAuthenticator, TicketError, TicketRegistry,
};

fn build(config: CasConfig) -> (CentralAuthenticationService, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let authenticator = AuthenticatorChain::new()
        .with("trusted-network", RemoteAddressAuthenticator::new(["10.0."]))
        .with("password", SimpleTestAuthenticator);
    let cas = CentralAuthenticationService::new(
        Arc::new(InMemoryTicketRegistry::new()),
        Arc::new(authenticator),
        config,
    )
    .expect("default config is valid")
    .with_clock(clock.clone());
    (cas, clock)
}

#[test]
fn full_workflow_login_to_logout() {
    let (cas, clock) = build(CasConfig::default());
    let mail = Service::new("https://mail.example.org/");
    let wiki = Service::new("https://wiki.example.org/");

    // ── Step 1: Log in ──────────────────────────────────────────────────
    let tgt = cas
        .create_ticket_granting_ticket(&Credential::username_password("alice", "alice"))
        .expect("login should succeed");
    assert!(tgt.as_str().starts_with("TGT-"));
    assert!(tgt.as_str().ends_with("-cas"));

    // ── Step 2: Grant tickets ───────────────────────────────────────────
    let st_mail = cas.grant_service_ticket(&tgt, &mail, None).unwrap();
    clock.advance(5_000);
    let st_wiki = cas.grant_service_ticket(&tgt, &wiki, None).unwrap();
    assert!(st_mail.as_str().starts_with("ST-"));
    assert_ne!(st_mail, st_wiki);

    // ── Step 3: Validate ────────────────────────────────────────────────
    let a = cas.validate_service_ticket(&st_mail, &mail).unwrap();
    assert_eq!(a.principal().id, "alice");
    assert!(a.is_from_new_login());
    assert_eq!(
        a.primary_authentication().metadata()[AUTHENTICATION_METHOD],
        vec!["password".to_string()]
    );

    let b = cas.validate_service_ticket(&st_wiki, &wiki).unwrap();
    assert!(!b.is_from_new_login(), "second grant comes from the SSO session");

    for (st, service) in [(&st_mail, &mail), (&st_wiki, &wiki)] {
        assert!(matches!(
            cas.validate_service_ticket(st, service),
            Err(TicketError::InvalidTicket)
        ));
    }

    // ── Step 4: Renew ───────────────────────────────────────────────────
    let renewed = cas
        .grant_service_ticket(
            &tgt,
            &mail,
            Some(&Credential::username_password("alice", "alice")),
        )
        .unwrap();
    assert!(cas
        .validate_service_ticket(&renewed, &mail)
        .unwrap()
        .is_from_new_login());

    // ── Step 5: Sign out ────────────────────────────────────────────────
    let pending = cas.grant_service_ticket(&tgt, &wiki, None).unwrap();
    cas.destroy_ticket_granting_ticket(&tgt).unwrap();

    assert!(cas.validate_service_ticket(&pending, &wiki).is_err());
    assert!(matches!(
        cas.grant_service_ticket(&tgt, &mail, None),
        Err(TicketError::InvalidTicket)
    ));
    assert_eq!(cas.registry().ticket_count().unwrap(), 0);
}

#[test]
fn trusted_network_login_skips_password() {
    let (cas, _) = build(CasConfig::default());
    let tgt = cas
        .create_ticket_granting_ticket(&Credential::remote_address("10.0.3.7"))
        .unwrap();
    let app = Service::new("https://intranet.example.org");
    let st = cas.grant_service_ticket(&tgt, &app, None).unwrap();
    let assertion = cas.validate_service_ticket(&st, &app).unwrap();

    assert_eq!(assertion.principal().id, "10.0.3.7");
    assert_eq!(
        assertion.primary_authentication().metadata()[AUTHENTICATION_METHOD],
        vec!["trusted-network".to_string()]
    );
}

#[test]
fn untrusted_network_login_fails_without_state() {
    let (cas, _) = build(CasConfig::default());
    let err = cas
        .create_ticket_granting_ticket(&Credential::remote_address("172.16.0.1"))
        .unwrap_err();
    assert!(matches!(err, TicketError::AuthenticationFailed(_)));
    assert_eq!(cas.registry().ticket_count().unwrap(), 0);
}

#[test]
fn idle_session_expires_lazily() {
    let (cas, clock) = build(CasConfig {
        ticket_granting: ExpirationPolicy::TimeToLiveWithIdleTimeout {
            ttl_ms: 60_000,
            idle_ms: 10_000,
        },
        ..CasConfig::default()
    });
    let app = Service::new("https://app.example.org");
    let tgt = cas
        .create_ticket_granting_ticket(&Credential::username_password("bob", "bob"))
        .unwrap();

    // Activity keeps the session alive until the hard limit.
    for _ in 0..5 {
        clock.advance(9_000);
        assert!(cas.grant_service_ticket(&tgt, &app, None).is_ok());
    }
    clock.advance(15_000);
    assert!(matches!(
        cas.grant_service_ticket(&tgt, &app, None),
        Err(TicketError::InvalidTicket)
    ));

    // The failed grant removed the session, children included.
    assert_eq!(cas.registry().ticket_count().unwrap(), 0);
}

#[test]
fn remember_me_outlives_ordinary_session() {
    let (cas, clock) = build(CasConfig::default());
    let app = Service::new("https://app.example.org");

    let short = cas
        .create_ticket_granting_ticket(&Credential::username_password("carol", "carol"))
        .unwrap();
    let long = cas
        .create_ticket_granting_ticket(
            &Credential::username_password("carol", "carol").with_remember_me(),
        )
        .unwrap();

    clock.advance(3 * 60 * 60 * 1_000);
    assert!(cas.grant_service_ticket(&short, &app, None).is_err());
    assert!(cas.grant_service_ticket(&long, &app, None).is_ok());
}
