//! wellspringd - The wellspring service
//!
//! This is the main entry point for the wellspring service.
//! It wires together all the components:
//! - Configuration loading
//! - Store initialization
//! - Billing, auth and compliance backends
//! - Join window evaluation
//! - Subscription reconciliation and monitoring

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use wellspring_api::Plan;
use wellspring_billing_api::{BearerToken, CredentialProvider};
use wellspring_billing_http::{
    HttpBilling, HttpComplianceSink, RefreshingCredentials, StaticCredentials,
};
use wellspring_config::{load_config, Settings};
use wellspring_core::{
    BillingActions, ComplianceRecorder, CoreEvent, JoinPhase, JoinWindowPolicy, JoinWindowWatch,
    SubscriptionMonitor, SubscriptionReconciler, WelcomeGate,
};
use wellspring_store::{AuditEvent, AuditEventType, SqliteStore, Store};
use wellspring_util::{
    default_config_path, format_session_time, is_mock_time_active, parse_timestamp, UserId,
};

/// wellspringd - Session join windows and subscription state for wellspring
#[derive(Parser, Debug)]
#[command(name = "wellspringd")]
#[command(about = "Session join windows and subscription state for wellspring", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/wellspring/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set WELLSPRING_DATA_DIR env var)
    #[arg(short, long, env = "WELLSPRING_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Signed-in user id
    #[arg(long, env = "WELLSPRING_USER_ID")]
    user_id: Option<String>,

    /// Access token for the signed-in user
    #[arg(long, env = "WELLSPRING_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Refresh token; enables token refresh when [auth] is configured
    #[arg(long, env = "WELLSPRING_REFRESH_TOKEN", hide_env_values = true)]
    refresh_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate the join window of a session
    JoinWindow {
        /// Scheduled start (ISO-8601)
        scheduled_at: String,

        /// Session length in minutes (default from [sessions])
        #[arg(long)]
        duration: Option<i64>,

        /// Keep printing the state every second until the window closes
        #[arg(long)]
        follow: bool,
    },

    /// Reconcile the subscription state once and print it
    Status,

    /// Keep the subscription state reconciled until interrupted
    Watch,

    /// Create a checkout session and print its URL
    Checkout {
        /// monthly or annual
        plan: Plan,
    },

    /// Create a customer portal session and print its URL
    Portal,

    /// Record consent granted (or withdrawn with --withdraw)
    Consent {
        consent_type: String,

        #[arg(long)]
        policy_version: String,

        #[arg(long)]
        withdraw: bool,
    },

    /// Record a signed liability waiver
    Waiver {
        waiver_version: String,
        signed_name: String,
    },

    /// Check whether the welcome dialog should be shown
    Welcome {
        /// Mark the dialog as seen
        #[arg(long)]
        ack: bool,
    },

    /// Print recent local audit events
    AuditLog {
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
}

/// Everything the billing-facing commands need
struct App {
    settings: Settings,
    store: Arc<SqliteStore>,
    billing: Arc<HttpBilling>,
    credentials: Arc<dyn CredentialProvider>,
    user_id: Option<UserId>,
}

impl App {
    async fn new(args: &Args) -> Result<Self> {
        let settings = load_settings(args)?;

        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| settings.service.data_dir.clone());

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = data_dir.join("wellspring.db");
        let store = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );
        info!(db_path = %db_path.display(), "Store initialized");

        let billing = Arc::new(
            HttpBilling::new(settings.billing.clone()).context("Failed to create billing client")?,
        );
        let credentials = build_credentials(args, &settings).await?;

        Ok(Self {
            settings,
            store,
            billing,
            credentials,
            user_id: args.user_id.clone().map(UserId::new),
        })
    }

    fn require_user(&self) -> Result<&UserId> {
        self.user_id
            .as_ref()
            .context("This command needs a signed-in user (--user-id or WELLSPRING_USER_ID)")
    }

    fn reconciler(&self) -> SubscriptionReconciler {
        SubscriptionReconciler::new(self.billing.clone(), self.credentials.clone())
    }

    fn billing_actions(&self) -> BillingActions {
        BillingActions::new(
            self.billing.clone(),
            self.credentials.clone(),
            self.store.clone(),
        )
    }

    fn compliance_recorder(&self) -> Result<ComplianceRecorder> {
        let sink = HttpComplianceSink::new(&self.settings)
            .context("Failed to create compliance client")?;
        Ok(ComplianceRecorder::new(
            Arc::new(sink),
            self.credentials.clone(),
            self.store.clone(),
        ))
    }
}

fn load_settings(args: &Args) -> Result<Settings> {
    let settings = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;
    info!(config_path = %args.config.display(), "Configuration loaded");
    Ok(settings)
}

/// Session defaults from the config file when there is one
fn join_policy(args: &Args) -> Result<JoinWindowPolicy> {
    if !args.config.exists() {
        debug!(config_path = %args.config.display(), "No config file, using default join window");
        return Ok(JoinWindowPolicy::default());
    }
    Ok(load_settings(args)?.sessions.into())
}

async fn build_credentials(args: &Args, settings: &Settings) -> Result<Arc<dyn CredentialProvider>> {
    match (&args.refresh_token, &settings.auth) {
        (Some(refresh_token), Some(auth)) => {
            let creds = RefreshingCredentials::new(
                auth,
                settings.billing.api_key.clone(),
                settings.billing.request_timeout,
            )
            .context("Failed to create auth client")?;
            creds
                .set_session(
                    args.access_token.clone().unwrap_or_default(),
                    refresh_token.clone(),
                    None,
                )
                .await;
            Ok(Arc::new(creds))
        }
        (Some(_), None) => {
            warn!("Refresh token given but [auth] is not configured; tokens will not be refreshed");
            Ok(Arc::new(StaticCredentials::new(
                args.access_token.clone().map(BearerToken::new),
            )))
        }
        (None, _) => Ok(Arc::new(StaticCredentials::new(
            args.access_token.clone().map(BearerToken::new),
        ))),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn join_window(
    args: &Args,
    scheduled_at: &str,
    duration: Option<i64>,
    follow: bool,
) -> Result<()> {
    let policy = join_policy(args)?;
    let now = wellspring_util::now();

    let state = policy.evaluate_iso(scheduled_at, duration, now)?;
    let start = parse_timestamp(scheduled_at)?;
    info!(
        starts = %format_session_time(&start),
        lead_minutes = policy.lead_minutes,
        "Session join window evaluated"
    );
    print_json(&state)?;

    if !follow || state.phase == JoinPhase::Concluded {
        return Ok(());
    }

    let watch = JoinWindowWatch::spawn(
        policy,
        start,
        duration.unwrap_or(policy.default_duration_minutes),
    );
    let mut rx = watch.subscribe();
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = rx.borrow_and_update().clone();
                println!("{}", serde_json::to_string(&state)?);
                if state.phase == JoinPhase::Concluded {
                    break;
                }
            }
            _ = sigint.recv() => break,
        }
    }

    Ok(())
}

async fn status(app: &App) -> Result<()> {
    let state = app.reconciler().reconcile(app.user_id.as_ref()).await;
    print_json(&state)
}

/// Audit entry for a monitor event
fn audit_for(event: CoreEvent) -> AuditEventType {
    match event {
        CoreEvent::SignedIn { user_id } => AuditEventType::SignedIn { user_id },
        CoreEvent::SignedOut { user_id } => AuditEventType::SignedOut { user_id },
        CoreEvent::SubscriptionChanged { user_id, state } => AuditEventType::SubscriptionChanged {
            user_id,
            subscribed: state.subscribed,
            plan: state.plan,
            subscription_end: state.subscription_end,
        },
        CoreEvent::ReconcileFailed { user_id, message } => {
            AuditEventType::SubscriptionCheckFailed { user_id, message }
        }
    }
}

async fn run_watch(app: &App) -> Result<()> {
    let reconciler = Arc::new(app.reconciler());
    let (_identity_tx, identity_rx) = watch::channel(app.user_id.clone());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let (monitor, mut events) = SubscriptionMonitor::new(
        reconciler.clone(),
        identity_rx,
        app.settings.billing.poll_interval,
        shutdown_rx,
    );
    let monitor_handle = tokio::spawn(monitor.run());

    app.store
        .append_audit(AuditEvent::new(AuditEventType::ServiceStarted))?;

    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;

    info!(
        poll_interval_secs = app.settings.billing.poll_interval.as_secs(),
        "Service running"
    );

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down gracefully");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down gracefully");
                break;
            }
            event = events.recv() => {
                let Some(event) = event else {
                    warn!("Subscription monitor stopped unexpectedly");
                    break;
                };
                if let CoreEvent::SubscriptionChanged { state, .. } = &event {
                    println!("{}", serde_json::to_string(state)?);
                }
                if let Err(e) = app.store.append_audit(AuditEvent::new(audit_for(event))) {
                    warn!(error = %e, "Failed to write audit event");
                }
            }
        }
    }

    let _ = shutdown_tx.send(true);
    let _ = monitor_handle.await;

    app.store
        .append_audit(AuditEvent::new(AuditEventType::ServiceStopped))?;
    info!("Service stopped");
    Ok(())
}

async fn checkout(app: &App, plan: Plan) -> Result<()> {
    let url = app
        .billing_actions()
        .create_checkout(plan, app.user_id.as_ref())
        .await
        .context("Failed to create checkout session")?;
    println!("{}", url);
    Ok(())
}

async fn portal(app: &App) -> Result<()> {
    let user_id = app.require_user()?;
    let url = app
        .billing_actions()
        .open_customer_portal(user_id)
        .await
        .context("Failed to open customer portal")?;
    println!("{}", url);
    Ok(())
}

async fn consent(app: &App, consent_type: &str, policy_version: &str, granted: bool) -> Result<()> {
    let user_id = app.require_user()?;
    let recorder = app.compliance_recorder()?;

    // A one-shot command must not exit before the background submission ends
    let _ = recorder
        .consent(user_id, consent_type, granted, policy_version)
        .await;
    info!(user_id = %user_id, consent_type, granted, "Consent recorded");
    Ok(())
}

async fn waiver(app: &App, waiver_version: &str, signed_name: &str) -> Result<()> {
    let user_id = app.require_user()?;
    let recorder = app.compliance_recorder()?;

    let _ = recorder.waiver(user_id, waiver_version, signed_name).await;
    info!(user_id = %user_id, waiver_version, "Waiver recorded");
    Ok(())
}

fn welcome(app: &App, ack: bool) -> Result<()> {
    let user_id = app.require_user()?;
    let gate = WelcomeGate::new(app.store.clone());

    if ack {
        if gate.mark_seen(user_id)? {
            app.store
                .append_audit(AuditEvent::new(AuditEventType::WelcomeShown {
                    user_id: user_id.clone(),
                }))?;
        }
        return Ok(());
    }

    println!("{}", gate.should_show(user_id)?);
    Ok(())
}

fn audit_log(app: &App, limit: usize) -> Result<()> {
    for event in app.store.get_recent_audits(limit)? {
        println!("{}", serde_json::to_string(&event)?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    debug!(version = env!("CARGO_PKG_VERSION"), "wellspringd starting");
    if is_mock_time_active() {
        warn!(now = %wellspring_util::now(), "Mock time is active");
    }

    if let Command::JoinWindow {
        scheduled_at,
        duration,
        follow,
    } = &args.command
    {
        return join_window(&args, scheduled_at, *duration, *follow).await;
    }

    let app = App::new(&args).await?;

    match &args.command {
        Command::JoinWindow { .. } => Ok(()),
        Command::Status => status(&app).await,
        Command::Watch => run_watch(&app).await,
        Command::Checkout { plan } => checkout(&app, *plan).await,
        Command::Portal => portal(&app).await,
        Command::Consent {
            consent_type,
            policy_version,
            withdraw,
        } => consent(&app, consent_type, policy_version, !withdraw).await,
        Command::Waiver {
            waiver_version,
            signed_name,
        } => waiver(&app, waiver_version, signed_name).await,
        Command::Welcome { ack } => welcome(&app, *ack),
        Command::AuditLog { limit } => audit_log(&app, *limit),
    }
}
