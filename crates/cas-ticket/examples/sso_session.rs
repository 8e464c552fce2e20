//! SSO Session: log in once, visit two services, sign out everywhere.
//!
//! Run with:
//!   cargo run --example sso_session -p cas-ticket

use std::sync::Arc;

use cas_ticket::{
    CasConfig, CentralAuthenticationService, Credential, InMemoryTicketRegistry, Service,
    SimpleTestAuthenticator, TicketRegistry,
};

fn main() {
    // ── 1. Build the service ────────────────────────────────────────────────
    //
    // The registry holds every ticket; the authenticator decides whether a
    // credential is good. Both are swappable.
    let cas = CentralAuthenticationService::new(
        Arc::new(InMemoryTicketRegistry::new()),
        Arc::new(SimpleTestAuthenticator),
        CasConfig::default(),
    )
    .expect("default configuration is valid");

    // ── 2. Log in ───────────────────────────────────────────────────────────
    let tgt = cas
        .create_ticket_granting_ticket(&Credential::username_password("alice", "alice"))
        .expect("login should succeed");
    println!("Logged in");
    println!("  Granting ticket: {}", tgt.fingerprint());
    println!();

    // ── 3. Visit two services without logging in again ─────────────────────
    for url in ["https://mail.example.org/", "https://wiki.example.org/"] {
        let service = Service::new(url);
        let st = cas
            .grant_service_ticket(&tgt, &service, None)
            .expect("grant should succeed");
        let assertion = cas
            .validate_service_ticket(&st, &service)
            .expect("fresh ticket should validate");
        println!("Service {url}");
        println!("  Principal:  {}", assertion.principal().id);
        println!("  New login:  {}", assertion.is_from_new_login());

        // A service ticket is good for one validation only.
        let replay = cas.validate_service_ticket(&st, &service);
        println!("  Replay:     {}", if replay.is_err() { "rejected" } else { "ACCEPTED" });
        println!();
    }

    // ── 4. Sign out ─────────────────────────────────────────────────────────
    let mail = Service::new("https://mail.example.org/");
    let pending = cas.grant_service_ticket(&tgt, &mail, None).unwrap();
    cas.destroy_ticket_granting_ticket(&tgt).unwrap();

    println!("Signed out");
    println!(
        "  Pending ticket still valid: {}",
        cas.validate_service_ticket(&pending, &mail).is_ok()
    );
    println!(
        "  Tickets left in registry:   {}",
        cas.registry().ticket_count().unwrap()
    );
}
