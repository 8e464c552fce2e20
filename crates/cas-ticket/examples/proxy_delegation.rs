//! Proxy Delegation: a portal calls a backend on the user's behalf.
//!
//! Run with:
//!   cargo run --example proxy_delegation -p cas-ticket

use std::sync::Arc;

use cas_ticket::{
    CasConfig, CentralAuthenticationService, Credential, InMemoryTicketRegistry, Service,
    SimpleTestAuthenticator,
};

fn main() {
    let cas = CentralAuthenticationService::new(
        Arc::new(InMemoryTicketRegistry::new()),
        Arc::new(SimpleTestAuthenticator),
        CasConfig::default(),
    )
    .expect("default configuration is valid");

    let portal = Service::new("https://portal.example.org/");
    let backend = Service::new("https://backend.example.org/");

    // ── 1. The user logs in and opens the portal ────────────────────────────
    let tgt = cas
        .create_ticket_granting_ticket(&Credential::username_password("alice", "alice"))
        .unwrap();
    let st = cas.grant_service_ticket(&tgt, &portal, None).unwrap();

    // ── 2. The portal asks for a proxy granting ticket ──────────────────────
    //
    // The portal proves itself with its callback URL, then validates the
    // service ticket as usual.
    let pgt = cas
        .delegate_ticket_granting_ticket(&st, &Credential::url("https://portal.example.org/pgt"))
        .expect("delegation should succeed");
    cas.validate_service_ticket(&st, &portal).unwrap();
    println!("Portal holds proxy granting ticket {}", pgt.fingerprint());

    // ── 3. The portal calls the backend as the user ─────────────────────────
    let pt = cas.grant_service_ticket(&pgt, &backend, None).unwrap();
    let assertion = cas.validate_service_ticket(&pt, &backend).unwrap();

    println!("Backend sees:");
    println!("  Principal:  {}", assertion.principal().id);
    println!("  Proxy hops: {}", assertion.proxy_hops());
    for (i, auth) in assertion.chained_authentications().iter().enumerate() {
        println!("  [{i}] {}", auth.principal().id);
    }

    // ── 4. Signing out the user also revokes the portal's delegation ────────
    cas.destroy_ticket_granting_ticket(&tgt).unwrap();
    println!(
        "Proxy usable after sign-out: {}",
        cas.grant_service_ticket(&pgt, &backend, None).is_ok()
    );
}
