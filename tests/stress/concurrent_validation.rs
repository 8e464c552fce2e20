//! Concurrency test: racing validations of the same service tickets.
//!
//! Every ticket must be consumed by exactly one caller, whatever the
//! backend.

use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use cas_ticket::{
    CacheTicketRegistry, CasConfig, CentralAuthenticationService, Credential, DirectoryCache,
    InMemoryTicketRegistry, MemoryCache, Service, SimpleTestAuthenticator, TicketRegistry,
};

fn race_validations(cas: Arc<CentralAuthenticationService>, tickets: usize, racers: usize) {
    let app = Service::new("https://app.example.org/");
    let tgt = cas
        .create_ticket_granting_ticket(&Credential::username_password("alice", "alice"))
        .expect("login should succeed");
    let sts: Vec<_> = (0..tickets)
        .map(|_| cas.grant_service_ticket(&tgt, &app, None).unwrap())
        .collect();
    let sts = Arc::new(sts);

    let wins = Arc::new(Mutex::new(vec![0usize; tickets]));
    let barrier = Arc::new(Barrier::new(racers));

    let mut handles = Vec::new();
    for _ in 0..racers {
        let cas = Arc::clone(&cas);
        let sts = Arc::clone(&sts);
        let wins = Arc::clone(&wins);
        let barrier = Arc::clone(&barrier);
        let app = app.clone();
        handles.push(thread::spawn(move || {
            barrier.wait();
            for (i, st) in sts.iter().enumerate() {
                if cas.validate_service_ticket(st, &app).is_ok() {
                    wins.lock().unwrap()[i] += 1;
                }
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    let wins = wins.lock().unwrap();
    for (i, w) in wins.iter().enumerate() {
        assert_eq!(*w, 1, "ticket {i} validated {w} times");
    }

    let tgt = cas.registry().get_granting_ticket(&tgt).unwrap().unwrap();
    assert!(tgt.children().is_empty(), "consumed tickets stay chained");
}

fn service(registry: Arc<dyn TicketRegistry>) -> Arc<CentralAuthenticationService> {
    Arc::new(
        CentralAuthenticationService::new(
            registry,
            Arc::new(SimpleTestAuthenticator),
            CasConfig::default(),
        )
        .unwrap(),
    )
}

#[test]
fn stress_validation_race_in_memory() {
    let cas = service(Arc::new(InMemoryTicketRegistry::new()));
    race_validations(cas, 200, 16);
}

#[test]
fn stress_validation_race_memory_cache() {
    let cas = service(Arc::new(CacheTicketRegistry::new(MemoryCache::new())));
    race_validations(cas, 200, 16);
}

#[test]
fn stress_validation_race_directory_cache() {
    let dir = tempfile::tempdir().unwrap();
    let cache = DirectoryCache::new(dir.path()).unwrap();
    let cas = service(Arc::new(CacheTicketRegistry::new(cache)));
    race_validations(cas, 40, 8);
}

#[test]
fn stress_two_nodes_share_directory() {
    // Separate services have separate lock tables; the shared directory's
    // delete still lets exactly one of them consume each ticket.
    let dir = tempfile::tempdir().unwrap();
    let app = Service::new("https://app.example.org/");
    let nodes: Vec<_> = (0..2)
        .map(|_| {
            let cache = DirectoryCache::new(dir.path()).unwrap();
            service(Arc::new(CacheTicketRegistry::new(cache)))
        })
        .collect();

    let tgt = nodes[0]
        .create_ticket_granting_ticket(&Credential::username_password("bob", "bob"))
        .unwrap();
    let sts: Arc<Vec<_>> = Arc::new(
        (0..40)
            .map(|_| nodes[0].grant_service_ticket(&tgt, &app, None).unwrap())
            .collect(),
    );

    let total = Arc::new(Mutex::new(0usize));
    let barrier = Arc::new(Barrier::new(nodes.len()));
    let handles: Vec<_> = nodes
        .iter()
        .map(|node| {
            let node = Arc::clone(node);
            let sts = Arc::clone(&sts);
            let total = Arc::clone(&total);
            let barrier = Arc::clone(&barrier);
            let app = app.clone();
            thread::spawn(move || {
                barrier.wait();
                let wins = sts
                    .iter()
                    .filter(|st| node.validate_service_ticket(st, &app).is_ok())
                    .count();
                *total.lock().unwrap() += wins;
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(*total.lock().unwrap(), 40);
}
