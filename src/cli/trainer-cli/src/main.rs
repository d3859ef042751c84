//! Trainer CLI - Command line interface.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trainer_access::{
    audit, encode_user_cookie, AccessController, Decision, Menu, NavFilter, Role, RoutePolicy,
    UserRecord,
};
use trainer_api::{ApiClient, LoginRequest, DEFAULT_API_URL};
use trainer_auth::{SessionContext, SessionLifecycle, TOKEN_COOKIE, USER_COOKIE};
use trainer_call::{AssistantConfig, CallDriver, CallError, CallEvent, VoiceSdk};
use trainer_storage_sqlite::SqliteBackend;

// ============================================================================
// CLI Structure
// ============================================================================

#[derive(Parser)]
#[command(name = "trainer")]
#[command(about = "Roleplay Trainer CLI - Sessions, route policy and access checks")]
#[command(version)]
struct Cli {
    /// REST API base URL
    #[arg(long, default_value = DEFAULT_API_URL, env = "TRAINER_API_URL")]
    api: String,

    /// Directory holding the persisted session
    #[arg(long, default_value = ".trainer", env = "TRAINER_DATA_DIR")]
    data_dir: PathBuf,

    /// Route policy JSON file (built-in table when omitted)
    #[arg(long, env = "TRAINER_POLICY")]
    policy: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session
    Login {
        /// Account email
        email: String,
        /// Password (or read from stdin if not provided)
        #[arg(long)]
        password: Option<String>,
    },
    /// Clear the stored session
    Logout,
    /// Show the stored session
    Whoami,
    /// Refresh the stored session after checkout
    AfterPayment,
    /// Request a password reset email
    ForgotPassword {
        /// Account email
        email: String,
    },
    /// Decide whether a path is reachable
    Check {
        /// Request path
        path: String,
        #[command(flatten)]
        viewer: ViewerArgs,
    },
    /// List the navigation entries shown to a viewer
    Nav {
        #[command(flatten)]
        viewer: ViewerArgs,
    },
    /// Route policy tooling
    Policy {
        #[command(subcommand)]
        command: PolicyCommands,
    },
    /// Voice call tooling
    Call {
        #[command(subcommand)]
        command: CallCommands,
    },
}

#[derive(Args)]
struct ViewerArgs {
    /// Check as a logged-in user with this role instead of the stored session
    #[arg(long, conflicts_with = "anonymous", value_parser = parse_role)]
    role: Option<Role>,
    /// With --role, treat the user as having no active subscription
    #[arg(long, requires = "role")]
    unsubscribed: bool,
    /// Check as a visitor without a session
    #[arg(long)]
    anonymous: bool,
}

fn parse_role(tag: &str) -> Result<Role, String> {
    Role::from_assignable(tag).ok_or_else(|| {
        let known: Vec<&str> = Role::ASSIGNABLE.iter().map(Role::as_str).collect();
        format!("unknown role '{tag}' (expected one of: {})", known.join(", "))
    })
}

#[derive(Subcommand)]
enum PolicyCommands {
    /// Print the active policy as JSON
    Show,
    /// Validate the policy and list findings
    Validate,
    /// Cross-check the sidebar against the policy for every role
    Audit,
}

#[derive(Subcommand)]
enum CallCommands {
    /// Fetch a scenario's assistant and run the call lifecycle without audio
    DryRun {
        /// Scenario identifier
        scenario: String,
    },
}

// ============================================================================
// Session Store
// ============================================================================

type Session = SessionLifecycle<SqliteBackend, SqliteBackend>;

async fn open_session(data_dir: &Path) -> Result<Session> {
    let cookies = SqliteBackend::open(data_dir, "cookies")
        .await
        .context("Failed to open cookie store")?;
    let local = SqliteBackend::open(data_dir, "local")
        .await
        .context("Failed to open local store")?;

    Ok(SessionLifecycle::new(cookies, local))
}

fn load_policy(path: Option<&Path>) -> Result<RoutePolicy> {
    match path {
        Some(path) => RoutePolicy::load(path)
            .with_context(|| format!("Failed to load policy from {}", path.display())),
        None => Ok(RoutePolicy::default()),
    }
}

/// Viewer for `check`: the cookie view of the session.
async fn cookie_viewer(viewer: &ViewerArgs, session: &Session) -> Result<SessionContext> {
    if viewer.anonymous {
        return Ok(SessionContext::default());
    }
    if let Some(role) = viewer.role {
        return Ok(SessionContext {
            token: Some("cli".into()),
            user: Some(UserRecord::with_role(role, !viewer.unsubscribed)),
        });
    }
    Ok(session.current().await?)
}

fn describe(user: Option<&UserRecord>) -> String {
    match user {
        Some(user) => {
            let name = user
                .user_name
                .as_deref()
                .or(user.email.as_deref())
                .unwrap_or("unknown");
            let role = user.role.map(|r| r.to_string()).unwrap_or_else(|| "none".into());
            let plan = if user.has_active_subscription() {
                "subscribed"
            } else {
                "not subscribed"
            };
            format!("{name} (role: {role}, {plan})")
        },
        None => "no user record".into(),
    }
}

// ============================================================================
// Command Handlers
// ============================================================================

async fn cmd_login(
    api: &ApiClient,
    session: &Session,
    email: String,
    password: Option<String>,
) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => {
            print!("Password: ");
            io::stdout().flush()?;
            let stdin = io::stdin();
            let mut line = String::new();
            stdin.lock().read_line(&mut line)?;
            line.trim().to_string()
        },
    };

    if password.is_empty() {
        bail!("Password cannot be empty");
    }

    let credentials = api.login(&LoginRequest { email, password }).await?;
    session.establish(&credentials).await?;

    println!("Logged in as {}", describe(Some(&credentials.user)));
    if credentials.user.is_unsubscribed_admin() {
        println!("No active subscription: only / and /plans are reachable until checkout.");
    }

    Ok(())
}

async fn cmd_logout(session: &Session) -> Result<()> {
    session.terminate().await?;
    println!("Session cleared");
    Ok(())
}

async fn cmd_whoami(session: &Session) -> Result<()> {
    let current = session.current().await?;
    if !current.is_authenticated() {
        println!("Not logged in");
        return Ok(());
    }

    println!("Logged in as {}", describe(current.user.as_ref()));

    if let Some(mismatch) = session.reconcile().await? {
        println!(
            "Warning: cookie role {:?} differs from local role {:?}",
            mismatch.cookie_role, mismatch.local_role
        );
    }

    Ok(())
}

async fn cmd_after_payment(api: &ApiClient, session: &Session) -> Result<()> {
    let current = session.current().await?;
    let token = current
        .token
        .as_deref()
        .context("Not logged in. Run `trainer login` first")?;

    let mut cookie_header = format!("{TOKEN_COOKIE}={token}");
    if let Some(user) = &current.user {
        cookie_header.push_str(&format!("; {USER_COOKIE}={}", encode_user_cookie(user)));
    }

    let credentials = api.after_payment(Some(&cookie_header)).await?;
    session.refresh(&credentials).await?;

    println!("Session refreshed: {}", describe(Some(&credentials.user)));
    Ok(())
}

async fn cmd_forgot_password(api: &ApiClient, email: &str) -> Result<()> {
    let message = api.forget_password(email).await?;
    if message.is_empty() {
        println!("Reset email requested for {email}");
    } else {
        println!("{message}");
    }
    Ok(())
}

async fn cmd_check(
    controller: &AccessController,
    session: &Session,
    path: &str,
    viewer: &ViewerArgs,
) -> Result<()> {
    let context = cookie_viewer(viewer, session).await?;
    let decision = controller.decide(&context.access_request(path));

    match decision.location(controller.policy()) {
        None => println!("{path}: allow"),
        Some(location) => println!("{path}: redirect to {location} ({})", label(decision)),
    }

    Ok(())
}

fn label(decision: Decision) -> &'static str {
    match decision {
        Decision::Allow => "allow",
        Decision::RedirectToLogin => "no session",
        Decision::RedirectToHome => "not for this role",
        Decision::RedirectToPlans => "subscription required",
    }
}

async fn cmd_nav(policy: &RoutePolicy, session: &Session, viewer: &ViewerArgs) -> Result<()> {
    let menu = Menu::sidebar(policy);
    let filter = NavFilter::new(policy);

    if viewer.anonymous {
        println!("Not logged in: no navigation");
        return Ok(());
    }

    // The stored session renders from the local store, like the page does.
    let user = match viewer.role {
        Some(role) => Some(UserRecord::with_role(role, !viewer.unsubscribed)),
        None => {
            if !session.current().await?.is_authenticated() {
                println!("Not logged in: no navigation");
                return Ok(());
            }
            session.local_user().await?
        },
    };

    for entry in filter.visible_for(&menu, user.as_ref()) {
        println!("  {:<24} {}", entry.label, entry.link);
    }

    Ok(())
}

fn cmd_policy_show(policy: &RoutePolicy) -> Result<()> {
    println!("{}", policy.to_json_pretty()?);
    Ok(())
}

fn cmd_policy_validate(policy: &RoutePolicy) -> Result<()> {
    let findings = policy.validate()?;

    if findings.is_empty() {
        println!("Policy v{} is valid", policy.version);
    } else {
        println!("Policy v{} is valid with {} finding(s):", policy.version, findings.len());
        for finding in &findings {
            println!("  {finding}");
        }
    }

    Ok(())
}

fn cmd_policy_audit(controller: &AccessController) -> Result<()> {
    let menu = Menu::sidebar(controller.policy());
    let issues = audit(&menu, controller);

    if issues.is_empty() {
        println!("Sidebar and route gate agree for every role");
        return Ok(());
    }

    println!("Sidebar and route gate disagree:");
    for issue in &issues {
        let plan = if issue.subscribed { "subscribed" } else { "unsubscribed" };
        println!(
            "  {:<24} {:<20} {} ({plan}): {:?}",
            issue.label, issue.link, issue.role, issue.kind
        );
    }
    bail!("{} inconsistency(ies) found", issues.len());
}

/// Stands in for the voice SDK: prints instead of opening audio.
struct DryRunSdk;

#[async_trait]
impl VoiceSdk for DryRunSdk {
    async fn start(&self, assistant: &AssistantConfig) -> Result<(), CallError> {
        let pretty = serde_json::to_string_pretty(&assistant.0)
            .map_err(|e| CallError::Sdk(e.to_string()))?;
        println!("Assistant configuration:");
        println!("{pretty}");
        Ok(())
    }

    async fn stop(&self) -> Result<(), CallError> {
        println!("Voice session stopped");
        Ok(())
    }
}

async fn cmd_call_dry_run(api: &ApiClient, session: &Session, scenario: &str) -> Result<()> {
    let current = session.current().await?;
    let token = current
        .token
        .context("Not logged in. Run `trainer login` first")?;

    let mut driver = CallDriver::new(scenario, DryRunSdk, api.call_starter(token));

    let navigations = driver.dispatch(CallEvent::StartRequested).await?;
    println!("State: {:?}", driver.session().state());
    if let Some(error) = driver.session().last_error() {
        println!("Error: {error}");
    }
    for navigation in &navigations {
        println!("Navigate: {navigation:?}");
    }

    if driver.session().state().is_terminal() {
        return Ok(());
    }

    for event in [CallEvent::CallStarted, CallEvent::StopRequested] {
        for navigation in driver.dispatch(event).await? {
            println!("Navigate: {navigation:?}");
        }
    }
    println!("State: {:?}", driver.session().state());

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let policy = load_policy(cli.policy.as_deref())?;
    let api = ApiClient::new(&cli.api)?;
    let data_dir = cli.data_dir;

    match cli.command {
        Commands::Login { email, password } => {
            let session = open_session(&data_dir).await?;
            cmd_login(&api, &session, email, password).await
        },
        Commands::Logout => cmd_logout(&open_session(&data_dir).await?).await,
        Commands::Whoami => cmd_whoami(&open_session(&data_dir).await?).await,
        Commands::AfterPayment => {
            let session = open_session(&data_dir).await?;
            cmd_after_payment(&api, &session).await
        },
        Commands::ForgotPassword { email } => cmd_forgot_password(&api, &email).await,
        Commands::Check { path, viewer } => {
            let session = open_session(&data_dir).await?;
            let controller = AccessController::new(policy);
            cmd_check(&controller, &session, &path, &viewer).await
        },
        Commands::Nav { viewer } => {
            let session = open_session(&data_dir).await?;
            cmd_nav(&policy, &session, &viewer).await
        },
        Commands::Policy { command } => match command {
            PolicyCommands::Show => cmd_policy_show(&policy),
            PolicyCommands::Validate => cmd_policy_validate(&policy),
            PolicyCommands::Audit => cmd_policy_audit(&AccessController::new(policy)),
        },
        Commands::Call { command } => match command {
            CallCommands::DryRun { scenario } => {
                let session = open_session(&data_dir).await?;
                cmd_call_dry_run(&api, &session, &scenario).await
            },
        },
    }
}
