// src/cli.rs
use clap::{Parser, Subcommand};
use foliofy::config::ConfigArgs;
use foliofy::models::{Dashboard, Holding, HoldingCreate, HoldingUpdate};
use foliofy::view::{format_percent, format_usd, heatmap_color, is_profit};
use foliofy::{
    ApiClient, AuthApi, Config, DashboardSync, FolioError, HoldingsSync, Result, SessionManager,
};
use log::{info, warn};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "foliofy")]
#[command(about = "Track a stock portfolio from the terminal", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an account
    Signup {
        email: String,
        #[arg(long, env = "FOLIOFY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Confirm an account with the emailed code
    Confirm { email: String, code: String },
    /// Send a new confirmation code
    ResendCode { email: String },
    /// Sign in and store the session tokens
    Signin {
        email: String,
        #[arg(long, env = "FOLIOFY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and forget the stored tokens
    Signout,
    /// Show who is signed in
    Status,
    /// Manage holdings
    Holdings {
        #[command(subcommand)]
        command: HoldingsCommand,
    },
    /// Show portfolio value, P&L and allocation
    Dashboard,
    /// Keep the session alive and reprint the dashboard on every refresh
    Watch,
}

#[derive(Subcommand)]
pub enum HoldingsCommand {
    /// List all holdings
    List,
    /// Add a holding (merges into an existing one for the same symbol)
    Add {
        symbol: String,
        shares: f64,
        avg_cost: f64,
    },
    /// Change shares and/or average cost
    Update {
        id: String,
        #[arg(long)]
        shares: Option<f64>,
        #[arg(long)]
        avg_cost: Option<f64>,
    },
    /// Delete a holding
    Delete {
        id: String,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

fn redirect_to_sign_in() {
    info!("Session ended. Run `foliofy signin <email>` to sign in again.");
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = cli.config.into_config();
    let session = SessionManager::from_config(&config, Arc::new(redirect_to_sign_in))?;

    match cli.command {
        Commands::Signup { email, password } => {
            let response = AuthApi::new(&config)?.sign_up(&email, &password).await?;
            println!("{}", response.message);
            if !response.user_confirmed {
                println!("Next: foliofy confirm {} <code>", email);
            }
        }
        Commands::Confirm { email, code } => {
            let response = AuthApi::new(&config)?
                .confirm_sign_up(&email, &code)
                .await?;
            println!("{}", response.message);
        }
        Commands::ResendCode { email } => {
            let response = AuthApi::new(&config)?.resend_code(&email).await?;
            println!("{}", response.message);
        }
        Commands::Signin { email, password } => {
            session.sign_in(&email, &password).await?;
            let who = session
                .identity()
                .and_then(|claims| claims.email)
                .unwrap_or(email);
            println!("Signed in as {}", who);
            session.dispose();
        }
        Commands::Signout => {
            session.hydrate();
            if !session.is_authenticated() {
                println!("Not signed in");
            }
            session.sign_out().await;
        }
        Commands::Status => {
            session.hydrate();
            print_status(&session);
        }
        Commands::Holdings { command } => {
            session.hydrate();
            run_holdings(&config, &session, command).await?;
        }
        Commands::Dashboard => {
            session.hydrate();
            let dashboard = DashboardSync::new(ApiClient::new(&config, session.clone())?);
            show_dashboard(&dashboard).await?;
        }
        Commands::Watch => {
            session.init();
            let result = watch(&config, &session).await;
            session.dispose();
            result?;
        }
    }
    Ok(())
}

fn print_status(session: &SessionManager) {
    if !session.is_authenticated() {
        println!("Not signed in");
        return;
    }
    let identity = session.identity().unwrap_or_default();
    println!(
        "Signed in as {}",
        identity.email.or(identity.sub).unwrap_or_else(|| "unknown user".into())
    );
    if let Some(expires_at) = session.access_expires_at() {
        println!("Access token expires at {}", expires_at.to_rfc3339());
    }
}

async fn run_holdings(
    config: &Config,
    session: &SessionManager,
    command: HoldingsCommand,
) -> Result<()> {
    let holdings = HoldingsSync::new(ApiClient::new(config, session.clone())?);
    match command {
        HoldingsCommand::List => {
            let list = holdings.refetch().await?;
            if list.is_empty() {
                println!("No holdings yet.");
            } else {
                print_holdings(&list);
            }
        }
        HoldingsCommand::Add {
            symbol,
            shares,
            avg_cost,
        } => {
            let created = holdings
                .add(HoldingCreate::new(&symbol, shares, avg_cost))
                .await?;
            print_holdings(&[created]);
        }
        HoldingsCommand::Update {
            id,
            shares,
            avg_cost,
        } => {
            let updated = holdings.edit(&id, HoldingUpdate { shares, avg_cost }).await?;
            print_holdings(&[updated]);
        }
        HoldingsCommand::Delete { id, yes } => {
            if !yes {
                return Err(FolioError::Validation(format!(
                    "Refusing to delete {} without --yes",
                    id
                )));
            }
            holdings.remove(&id).await?;
            println!("Deleted {}", id);
        }
    }
    Ok(())
}

fn print_holdings(holdings: &[Holding]) {
    println!(
        "{:<38} {:<8} {:>12} {:>14}  {}",
        "ID", "SYMBOL", "SHARES", "AVG COST", "NAME"
    );
    for h in holdings {
        println!(
            "{:<38} {:<8} {:>12} {:>14}  {}",
            h.id,
            h.symbol,
            h.shares,
            format_usd(h.avg_cost),
            h.name
        );
    }
}

async fn show_dashboard(dashboard: &DashboardSync) -> Result<()> {
    match dashboard.refetch().await {
        Ok(d) => {
            print_dashboard(&d);
            Ok(())
        }
        Err(e) if e.is_empty_portfolio() => {
            println!("No holdings yet. Add one with `foliofy holdings add`.");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn print_dashboard(d: &Dashboard) {
    let marker = if is_profit(d) { "▲" } else { "▼" };
    println!("Total assets  {}", format_usd(d.total_value));
    println!(
        "P&L           {} {} ({})",
        marker,
        format_usd(d.total_pnl),
        format_percent(d.total_pnl_pct)
    );
    println!("Cost basis    {}", format_usd(d.total_cost));
    println!("Last updated  {}", d.last_updated.to_rfc3339());
    println!();
    println!(
        "{:<8} {:>10} {:>12} {:>9} {:>14} {:>14} {:>9} {:>8}  {}",
        "SYMBOL", "SHARES", "PRICE", "DAY", "VALUE", "P&L", "P&L %", "ALLOC", "HEAT"
    );
    for h in &d.holdings {
        println!(
            "{:<8} {:>10} {:>12} {:>9} {:>14} {:>14} {:>9} {:>7.1}%  {}",
            h.symbol,
            h.shares,
            format_usd(h.current_price),
            format_percent(h.daily_change_pct),
            format_usd(h.market_value),
            format_usd(h.pnl),
            format_percent(h.pnl_pct),
            h.allocation_pct,
            heatmap_color(h.daily_change_pct)
        );
    }
}

async fn watch(config: &Config, session: &SessionManager) -> Result<()> {
    if !session.is_authenticated() {
        return Err(FolioError::NotAuthenticated);
    }
    let dashboard = DashboardSync::new(ApiClient::new(config, session.clone())?);
    let mut status = session.subscribe();

    if let Err(e) = show_dashboard(&dashboard).await {
        warn!("{}", e);
    }
    loop {
        let changed = tokio::select! {
            _ = tokio::signal::ctrl_c() => false,
            res = status.changed() => res.is_ok(),
        };
        if !changed {
            break;
        }
        let current = *status.borrow();
        if !current.authenticated {
            warn!("Session ended; stopping");
            break;
        }
        if let Err(e) = show_dashboard(&dashboard).await {
            warn!("{}", e);
        }
    }
    Ok(())
}
