//! cas-ticket operator CLI: `casctl` command.
//!
//! Works against a directory-backed ticket cache, the same layout every
//! node sharing that directory reads and writes. Lets an operator check a
//! configuration file, inspect and sweep stored tickets, sign a session
//! out, and run a scripted login round trip.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use cas_ticket::time::{millis_to_rfc3339, now_millis};
use cas_ticket::{
    CacheTicketRegistry, CasConfig, CentralAuthenticationService, Credential, DirectoryCache,
    PreAuthenticatedAuthenticator, Service, Ticket, TicketCache, TicketId, TicketRegistry,
};

// ── Directory helpers ─────────────────────────────────────────────────────────

fn default_ticket_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cas")
        .join("tickets")
}

fn open_registry(dir: &Path) -> Result<Arc<CacheTicketRegistry<DirectoryCache>>> {
    log::debug!("opening ticket directory {}", dir.display());
    let cache = DirectoryCache::new(dir)
        .with_context(|| format!("failed to open ticket directory {}", dir.display()))?;
    Ok(Arc::new(CacheTicketRegistry::new(cache)))
}

fn load_config(path: Option<&Path>) -> Result<CasConfig> {
    match path {
        Some(path) => {
            log::debug!("loading config {}", path.display());
            CasConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))
        }
        None => Ok(CasConfig::default()),
    }
}

fn open_service(
    registry: Arc<CacheTicketRegistry<DirectoryCache>>,
    config: CasConfig,
) -> Result<CentralAuthenticationService> {
    CentralAuthenticationService::new(registry, Arc::new(PreAuthenticatedAuthenticator), config)
        .context("failed to start ticket service")
}

// ── CLI structure ─────────────────────────────────────────────────────────────

/// cas-ticket operator CLI: inspect and maintain a shared ticket directory.
#[derive(Parser, Debug)]
#[command(
    name = "casctl",
    about = "cas-ticket operator CLI",
    version,
    long_about = "casctl: cas-ticket operator CLI\n\nCheck configuration, list and sweep stored tickets,\nand run a login round trip against a ticket directory."
)]
struct Cli {
    /// Ticket directory (default: ~/.cas/tickets)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Engine configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a configuration file and print the effective settings
    CheckConfig {
        /// Configuration file (overrides --config)
        path: Option<PathBuf>,
    },

    /// List stored tickets
    List {
        /// Print full ticket ids instead of fingerprints
        #[arg(long)]
        show_ids: bool,
    },

    /// Remove tickets that can no longer be used
    Sweep,

    /// Destroy a granting ticket and everything chained to it
    Destroy {
        /// Granting ticket id
        ticket_id: String,
    },

    /// Log in, grant, validate and sign out, printing each step
    Smoke {
        /// Principal to log in as
        #[arg(long, default_value = "casctl-smoke")]
        principal: String,

        /// Service to grant a ticket for
        #[arg(long, default_value = "https://smoke.invalid/")]
        service: String,

        /// Keep the session instead of destroying it at the end
        #[arg(long)]
        keep: bool,
    },
}

// ── Main entry point ──────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let dir = cli.dir.clone().unwrap_or_else(default_ticket_dir);
    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::CheckConfig { path } => {
            cmd_check_config(path.as_deref().or(config), cli.json, cli.verbose)
        }
        Commands::List { show_ids } => cmd_list(&dir, show_ids, cli.json),
        Commands::Sweep => cmd_sweep(&dir, config, cli.json),
        Commands::Destroy { ticket_id } => cmd_destroy(&dir, config, &ticket_id),
        Commands::Smoke {
            principal,
            service,
            keep,
        } => cmd_smoke(&dir, config, &principal, &service, keep, cli.verbose),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

// ── Command implementations ───────────────────────────────────────────────────

/// `casctl check-config [PATH]`
fn cmd_check_config(path: Option<&Path>, json: bool, verbose: bool) -> Result<()> {
    let config = load_config(path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    match path {
        Some(path) => println!("Configuration OK: {}", path.display()),
        None => println!("Configuration OK: built-in defaults"),
    }
    println!("  granting:           {}", config.ticket_granting.name());
    println!(
        "  granting (long):    {}",
        config.long_term_ticket_granting.name()
    );
    println!("  service:            {}", config.service.name());
    println!("  id suffix:          {}", config.id_suffix);
    println!("  max proxy depth:    {}", config.max_proxy_depth);

    if verbose {
        println!("{}", serde_json::to_string_pretty(&config)?);
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct TicketRow {
    kind: String,
    id: String,
    principal: Option<String>,
    parent: Option<String>,
    created: String,
    last_used: String,
    previous_use: Option<String>,
    uses: u64,
    policy: &'static str,
    state: &'static str,
}

fn ticket_row(ticket: &Ticket, show_ids: bool, now: u64) -> TicketRow {
    let show = |id: &TicketId| {
        if show_ids {
            id.to_string()
        } else {
            id.fingerprint()
        }
    };

    let state = ticket.state();
    let policy = ticket.expiration_policy();
    let status = if ticket.is_flagged_expired() {
        "destroyed"
    } else if policy.is_reclaimable(state, now) {
        "expired"
    } else {
        "active"
    };
    let principal = match ticket {
        Ticket::Granting(tgt) => Some(tgt.authentication().principal().id.clone()),
        Ticket::Service(_) => None,
    };

    TicketRow {
        kind: ticket.kind().to_string(),
        id: show(ticket.id()),
        principal,
        parent: ticket.parent_id().map(show),
        created: millis_to_rfc3339(state.created_ms),
        last_used: millis_to_rfc3339(state.last_used_ms),
        // Before the second use this is just the creation time.
        previous_use: (state.usage_count > 0)
            .then(|| millis_to_rfc3339(state.previous_used_ms)),
        uses: state.usage_count,
        policy: policy.name(),
        state: status,
    }
}

/// `casctl list [--show-ids]`
fn cmd_list(dir: &Path, show_ids: bool, json: bool) -> Result<()> {
    if !dir.exists() {
        println!(
            "No tickets found (directory {} does not exist)",
            dir.display()
        );
        return Ok(());
    }

    let registry = open_registry(dir)?;
    let now = now_millis();
    let mut tickets = registry.tickets().context("failed to read tickets")?;
    tickets.sort_by_key(|t| t.state().created_ms);
    let rows: Vec<TicketRow> = tickets
        .iter()
        .map(|t| ticket_row(t, show_ids, now))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No tickets found in {}", dir.display());
        return Ok(());
    }

    println!(
        "{:<4} {:<14} {:<20} {:<26} {:>5} {:<10}",
        "KIND", "ID", "PRINCIPAL", "LAST USED", "USES", "STATE"
    );
    println!("{}", "-".repeat(84));
    for row in &rows {
        println!(
            "{:<4} {:<14} {:<20} {:<26} {:>5} {:<10}",
            row.kind,
            row.id,
            row.principal.as_deref().unwrap_or("-"),
            row.last_used,
            row.uses,
            row.state
        );
    }
    println!("\n{} ticket(s)", rows.len());
    Ok(())
}

#[derive(Debug, Serialize)]
struct SweepSummary {
    granting_destroyed: usize,
    service_deleted: usize,
    files_purged: usize,
}

/// `casctl sweep`
fn cmd_sweep(dir: &Path, config: Option<&Path>, json: bool) -> Result<()> {
    let registry = open_registry(dir)?;
    let cas = open_service(registry.clone(), load_config(config)?)?;

    let report = cas.sweep_expired().context("sweep failed")?;
    let files_purged = registry
        .cache()
        .purge_expired()
        .context("failed to purge lapsed cache files")?;

    let summary = SweepSummary {
        granting_destroyed: report.granting_destroyed,
        service_deleted: report.service_deleted,
        files_purged,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Sweep of {}", dir.display());
        println!("  granting tickets destroyed: {}", summary.granting_destroyed);
        println!("  service tickets deleted:    {}", summary.service_deleted);
        println!("  lapsed files purged:        {}", summary.files_purged);
    }
    Ok(())
}

/// `casctl destroy TICKET_ID`
fn cmd_destroy(dir: &Path, config: Option<&Path>, ticket_id: &str) -> Result<()> {
    let id = TicketId::new(ticket_id.trim());
    if id.as_str().is_empty() {
        return Err(anyhow!("ticket id cannot be empty"));
    }

    let registry = open_registry(dir)?;
    let existed = registry.get_granting_ticket(&id)?.is_some();
    let cas = open_service(registry, load_config(config)?)?;
    cas.destroy_ticket_granting_ticket(&id)
        .context("failed to destroy ticket")?;

    if existed {
        println!("Destroyed {}", id.fingerprint());
    } else {
        println!("No live granting ticket {}; nothing to do", id.fingerprint());
    }
    Ok(())
}

/// `casctl smoke [--principal P] [--service URL] [--keep]`
fn cmd_smoke(
    dir: &Path,
    config: Option<&Path>,
    principal: &str,
    service: &str,
    keep: bool,
    verbose: bool,
) -> Result<()> {
    let cas = open_service(open_registry(dir)?, load_config(config)?)?;
    let service = Service::new(service);

    let tgt = cas
        .create_ticket_granting_ticket(&Credential::pre_authenticated(principal))
        .context("login failed")?;
    println!("login     ok  granting ticket {}", tgt.fingerprint());

    let st = cas
        .grant_service_ticket(&tgt, &service, None)
        .context("grant failed")?;
    println!("grant     ok  service ticket {}", st.fingerprint());

    let assertion = cas
        .validate_service_ticket(&st, &service)
        .context("validation failed")?;
    println!(
        "validate  ok  principal {} (new login: {})",
        assertion.principal().id,
        assertion.is_from_new_login()
    );
    if verbose {
        println!(
            "          authenticated at {}",
            millis_to_rfc3339(assertion.primary_authentication().authenticated_at_ms())
        );
    }

    if cas.validate_service_ticket(&st, &service).is_ok() {
        return Err(anyhow!("service ticket validated twice"));
    }
    println!("replay    ok  second validation rejected");

    if keep {
        println!("kept      granting ticket {tgt}");
    } else {
        cas.destroy_ticket_granting_ticket(&tgt)
            .context("sign-out failed")?;
        if cas.grant_service_ticket(&tgt, &service, None).is_ok() {
            return Err(anyhow!("granting ticket usable after sign-out"));
        }
        println!("logout    ok  session destroyed");
    }
    Ok(())
}
