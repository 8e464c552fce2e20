//! Integration test: proxy granting chains.
//!
//! A portal validates its service ticket and obtains a proxy granting
//! ticket, which it uses to reach a backend on the user's behalf, which
//! in turn proxies further. Each hop is recorded in the assertion.

use std::sync::Arc;

use cas_ticket::{
    CasConfig, CentralAuthenticationService, Credential, InMemoryTicketRegistry, Service,
    SimpleTestAuthenticator, TicketError, TicketId, TicketRegistry,
};

fn cas(max_proxy_depth: u32) -> CentralAuthenticationService {
    CentralAuthenticationService::new(
        Arc::new(InMemoryTicketRegistry::new()),
        Arc::new(SimpleTestAuthenticator),
        CasConfig {
            max_proxy_depth,
            ..CasConfig::default()
        },
    )
    .unwrap()
}

/// Grant from `granting`, obtain a proxy ticket through the new service
/// ticket, then validate the service ticket as its service would.
fn hop(
    cas: &CentralAuthenticationService,
    granting: &TicketId,
    service: &Service,
    callback: &str,
) -> Result<TicketId, TicketError> {
    let st = cas.grant_service_ticket(granting, service, None)?;
    let pgt = cas.delegate_ticket_granting_ticket(&st, &Credential::url(callback));
    cas.validate_service_ticket(&st, service)?;
    pgt
}

#[test]
fn proxy_chain_records_every_hop() {
    let cas = cas(8);
    let tgt = cas
        .create_ticket_granting_ticket(&Credential::username_password("alice", "alice"))
        .unwrap();

    let portal = Service::new("https://portal.example.org/");
    let api = Service::new("https://api.example.org/");
    let db = Service::new("https://reports.example.org/");

    let pgt1 = hop(&cas, &tgt, &portal, "https://portal.example.org/pgt").unwrap();
    let pgt2 = hop(&cas, &pgt1, &api, "https://api.example.org/pgt").unwrap();

    let pt = cas.grant_service_ticket(&pgt2, &db, None).unwrap();
    let assertion = cas.validate_service_ticket(&pt, &db).unwrap();

    let chain: Vec<&str> = assertion
        .chained_authentications()
        .iter()
        .map(|a| a.principal().id.as_str())
        .collect();
    assert_eq!(
        chain,
        [
            "alice",
            "https://portal.example.org/pgt",
            "https://api.example.org/pgt"
        ]
    );
    assert_eq!(assertion.proxy_hops(), 2);
    assert_eq!(assertion.principal().id, "alice");

    let pgt2 = cas.registry().get_granting_ticket(&pgt2).unwrap().unwrap();
    assert_eq!(pgt2.proxy_depth(), 2);
    assert_eq!(pgt2.parent(), Some(&pgt1));
}

#[test]
fn proxy_depth_limit_is_enforced() {
    let cas = cas(2);
    let tgt = cas
        .create_ticket_granting_ticket(&Credential::username_password("bob", "bob"))
        .unwrap();
    let svc = Service::new("https://svc.example.org/");

    let p1 = hop(&cas, &tgt, &svc, "https://one.example.org/").unwrap();
    let p2 = hop(&cas, &p1, &svc, "https://two.example.org/").unwrap();
    assert!(matches!(
        hop(&cas, &p2, &svc, "https://three.example.org/"),
        Err(TicketError::InvalidTicket)
    ));
}

#[test]
fn proxying_disabled_with_zero_depth() {
    let cas = cas(0);
    let tgt = cas
        .create_ticket_granting_ticket(&Credential::username_password("bob", "bob"))
        .unwrap();
    let svc = Service::new("https://svc.example.org/");
    assert!(hop(&cas, &tgt, &svc, "https://one.example.org/").is_err());
}

#[test]
fn sign_out_kills_whole_proxy_tree() {
    let cas = cas(8);
    let tgt = cas
        .create_ticket_granting_ticket(&Credential::username_password("carol", "carol"))
        .unwrap();
    let svc = Service::new("https://svc.example.org/");

    let p1 = hop(&cas, &tgt, &svc, "https://one.example.org/").unwrap();
    let p2 = hop(&cas, &p1, &svc, "https://two.example.org/").unwrap();
    let outstanding = cas.grant_service_ticket(&p2, &svc, None).unwrap();

    cas.destroy_ticket_granting_ticket(&tgt).unwrap();

    assert!(cas.grant_service_ticket(&p1, &svc, None).is_err());
    assert!(cas.grant_service_ticket(&p2, &svc, None).is_err());
    assert!(cas.validate_service_ticket(&outstanding, &svc).is_err());
    assert_eq!(cas.registry().ticket_count().unwrap(), 0);
}

#[test]
fn destroying_middle_hop_keeps_upstream_alive() {
    let cas = cas(8);
    let tgt = cas
        .create_ticket_granting_ticket(&Credential::username_password("dave", "dave"))
        .unwrap();
    let svc = Service::new("https://svc.example.org/");

    let p1 = hop(&cas, &tgt, &svc, "https://one.example.org/").unwrap();
    let p2 = hop(&cas, &p1, &svc, "https://two.example.org/").unwrap();

    cas.destroy_ticket_granting_ticket(&p1).unwrap();

    assert!(cas.grant_service_ticket(&p2, &svc, None).is_err());
    let st = cas.grant_service_ticket(&tgt, &svc, None).unwrap();
    assert!(cas.validate_service_ticket(&st, &svc).is_ok());
}

#[test]
fn consumed_ticket_cannot_mint_proxy() {
    let cas = cas(8);
    let tgt = cas
        .create_ticket_granting_ticket(&Credential::username_password("erin", "erin"))
        .unwrap();
    let svc = Service::new("https://svc.example.org/");
    let st = cas.grant_service_ticket(&tgt, &svc, None).unwrap();
    cas.validate_service_ticket(&st, &svc).unwrap();

    assert!(matches!(
        cas.delegate_ticket_granting_ticket(&st, &Credential::url("https://p.example.org/")),
        Err(TicketError::InvalidTicket)
    ));
}
