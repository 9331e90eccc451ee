//! fxterm - a terminal client for a currency-conversion API.
//!
//! Converts amounts, tracks rates, and manages the signed-in user's
//! server-side history and favorites from a line-oriented prompt.

mod api;
mod app;
mod auth;
mod config;
mod models;
mod sync;

use std::io::{self, Write};

use anyhow::Result;
use chrono::NaiveDate;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use models::AVAILABLE_CURRENCIES;
use sync::RefreshUpdate;

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    info!("fxterm starting");

    let mut app = App::new()?;

    println!("fxterm - currency converter ({})", app.base_url());
    match app.session.email() {
        Some(email) => println!("Signed in as {}", email),
        None => println!("Not signed in. Use 'login <email>' for history and favorites."),
    }
    println!("Type 'help' for commands.");

    // Scripted sign-in via environment, for dev setups
    if !app.session.is_authenticated() {
        if let (Ok(email), Ok(password)) = (
            std::env::var("FXTERM_EMAIL"),
            std::env::var("FXTERM_PASSWORD"),
        ) {
            match app.login(&email, &password).await {
                Ok(()) => println!("Signed in as {}", email),
                Err(e) => eprintln!("Sign-in from environment failed: {}", e),
            }
        }
    }

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        // Apply refreshes that completed while waiting for input
        let updates = app.tick();
        report_updates(&app, updates);

        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !dispatch(&mut app, line).await {
            break;
        }
    }

    info!("fxterm shutting down");
    Ok(())
}

fn report_updates(app: &App, updates: Vec<RefreshUpdate>) {
    for update in updates {
        match update {
            RefreshUpdate::HistoryChanged => {
                println!("[history: {} entries]", app.coordinator.history().len());
            }
            RefreshUpdate::FavoritesChanged => {
                println!("[favorites: {} pairs]", app.coordinator.favorites().len());
            }
            RefreshUpdate::SessionExpired => {
                println!("[session expired - signed out]");
            }
        }
    }
}

/// Handle one command line. Returns false when the user quits.
async fn dispatch(app: &mut App, line: &str) -> bool {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        ["help"] => print_help(),
        ["quit"] | ["exit"] => return false,

        ["rates"] => show_rates(app, "USD", false).await,
        ["rates", base] => show_rates(app, base, false).await,
        ["latest"] => show_rates(app, "USD", true).await,
        ["latest", base] => show_rates(app, base, true).await,

        ["convert", amount, from, to] => do_convert(app, amount, from, to).await,

        ["login"] => match app.config.last_email.clone() {
            Some(email) => do_login(app, &email).await,
            None => println!("Usage: login <email>"),
        },
        ["login", email] => do_login(app, email).await,
        ["register", email] => do_register(app, email).await,
        ["logout"] => {
            app.logout();
            println!("Signed out.");
        }
        ["whoami"] => match app.session.email() {
            Some(email) => println!("Signed in as {}", email),
            None => println!("Not signed in."),
        },

        ["fav"] => match app.last_conversion.clone() {
            Some(c) => do_toggle_favorite(app, &c.from_currency, &c.to_currency).await,
            None => println!("Usage: fav FROM TO (or convert first, then 'fav')"),
        },
        ["fav", from, to] => do_toggle_favorite(app, from, to).await,
        ["favs"] => show_favorites(app),
        ["clear-favs"] => report_result(app.clear_favorites().await, "Favorites cleared."),

        ["history"] => show_history(app),
        ["rm-history", id] => match id.parse::<i64>() {
            Ok(id) => report_result(app.delete_history_entry(id).await, "Entry deleted."),
            Err(_) => println!("Usage: rm-history <id>"),
        },
        ["clear-history"] => report_result(app.clear_history().await, "History cleared."),

        ["report", from, to, days] => do_report(app, from, to, days).await,
        ["comparison"] => do_comparison(app).await,
        ["forecast", from, to, days] => do_forecast(app, from, to, days).await,
        ["compare", amount, from, to, date_from, date_to] => {
            do_historical_compare(app, amount, from, to, date_from, date_to).await
        }

        _ => println!("Unknown command. Type 'help' for commands."),
    }
    true
}

fn print_help() {
    println!("Commands:");
    println!("  rates [BASE]                        current rates for a base currency");
    println!("  latest [BASE]                       latest rates with 24h change");
    println!("  convert AMOUNT FROM TO              convert an amount");
    println!("  login [EMAIL] / register EMAIL      authentication");
    println!("  logout / whoami");
    println!("  fav [FROM TO]                       toggle a favorite pair (defaults to the last conversion)");
    println!("  favs / clear-favs                   list or clear favorites");
    println!("  history / rm-history ID / clear-history");
    println!("  report FROM TO DAYS                 analytics for a pair");
    println!("  comparison                          popular pairs overview");
    println!("  forecast FROM TO DAYS               rate forecast");
    println!("  compare AMOUNT FROM TO FROM_DATE TO_DATE");
    println!("                                      what an amount was worth then vs now");
    println!("  quit");
    println!();
    println!("Currencies: {}", AVAILABLE_CURRENCIES.join(", "));
}

fn report_result(result: Result<(), api::ApiError>, success: &str) {
    match result {
        Ok(()) => println!("{}", success),
        Err(e) => println!("Error: {}", e),
    }
}

async fn show_rates(app: &App, base: &str, latest: bool) {
    let base = base.to_uppercase();
    let fetched = if latest {
        app.latest_rates(&base).await
    } else {
        app.rates(&base).await
    };
    match fetched {
        Ok(rates) => {
            let mut pairs: Vec<_> = rates.into_iter().collect();
            pairs.sort_by(|a, b| a.0.cmp(&b.0));
            for (currency, info) in pairs {
                let arrow = if info.trend_is_up() { "↑" } else { "↓" };
                println!(
                    "  {}/{}  {:.4}  {} {}",
                    base,
                    currency,
                    info.rate,
                    arrow,
                    info.change_display()
                );
            }
        }
        Err(e) => println!("Error: {}", e),
    }
}

async fn do_convert(app: &mut App, amount: &str, from: &str, to: &str) {
    let Ok(amount) = amount.parse::<f64>() else {
        println!("Usage: convert AMOUNT FROM TO");
        return;
    };
    let from = from.to_uppercase();
    let to = to.to_uppercase();

    match app.convert(amount, &from, &to).await {
        Ok(conversion) => {
            println!("{}", conversion.summary());
            println!("Source: {}", conversion.source_display());
        }
        Err(e) => println!("Error: {}", e),
    }
}

async fn do_login(app: &mut App, email: &str) {
    let password = match rpassword::prompt_password("Password: ") {
        Ok(p) => p,
        Err(e) => {
            println!("Error reading password: {}", e);
            return;
        }
    };

    match app.login(email, &password).await {
        Ok(()) => println!("Signed in as {}", email),
        Err(e) => println!("Error: {}", e),
    }
}

async fn do_register(app: &mut App, email: &str) {
    let password = match rpassword::prompt_password("Password: ") {
        Ok(p) => p,
        Err(e) => {
            println!("Error reading password: {}", e);
            return;
        }
    };

    match app.register(email, &password).await {
        Ok(()) => println!("Registered. Use 'login {}' to sign in.", email),
        Err(e) => println!("Error: {}", e),
    }
}

async fn do_toggle_favorite(app: &mut App, from: &str, to: &str) {
    let from = from.to_uppercase();
    let to = to.to_uppercase();
    match app.toggle_favorite(&from, &to).await {
        Ok(true) => println!("Added {} → {} to favorites.", from, to),
        Ok(false) => println!("Removed {} → {} from favorites.", from, to),
        Err(e) => println!("Error: {}", e),
    }
}

fn show_favorites(app: &App) {
    let favorites = app.coordinator.favorites();
    if favorites.is_empty() {
        println!("No favorites.");
        return;
    }
    for favorite in favorites {
        println!("  {}", favorite.label);
    }
}

fn show_history(app: &App) {
    let history = app.coordinator.history();
    if history.is_empty() {
        println!("No history.");
        return;
    }
    for entry in history {
        println!("  [{}] {}", entry.id, entry.display_row());
    }
}

async fn do_report(app: &App, from: &str, to: &str, days: &str) {
    let Ok(days) = days.parse::<u32>() else {
        println!("Usage: report FROM TO DAYS");
        return;
    };
    let from = from.to_uppercase();
    let to = to.to_uppercase();

    match app.analytics_report(&from, &to, days).await {
        Ok(report) => {
            println!(
                "{}/{} over {} days: {:+.2}%  volatility {:.2} ({})",
                from,
                to,
                days,
                report.change_percent,
                report.volatility,
                report.volatility_display()
            );
            println!("Recommendation: {}", report.recommendation);
            for point in &report.history {
                println!("  {}  {:.4}", point.date, point.rate);
            }
        }
        Err(e) => println!("Error: {}", e),
    }
}

async fn do_comparison(app: &App) {
    match app.analytics_comparison().await {
        Ok(rows) => {
            for row in rows {
                println!(
                    "  {}  {}  {}  {}",
                    row.currency, row.change, row.trend, row.recommendation
                );
            }
        }
        Err(e) => println!("Error: {}", e),
    }
}

async fn do_forecast(app: &App, from: &str, to: &str, days: &str) {
    let Ok(days) = days.parse::<u32>() else {
        println!("Usage: forecast FROM TO DAYS");
        return;
    };
    let from = from.to_uppercase();
    let to = to.to_uppercase();

    match app.forecast(&from, &to, days).await {
        Ok(forecast) => {
            let arrow = if forecast.trend_is_up() { "↑" } else { "↓" };
            println!(
                "{}/{} in {} days: ~{:.4} {} (now {:.4}, {:+.2}%)",
                from,
                to,
                days,
                forecast.forecast_rate,
                arrow,
                forecast.current_rate,
                forecast.change_percent
            );
            println!(
                "Confidence: {:.0}%  Recommendation: {}",
                forecast.confidence, forecast.recommendation
            );
        }
        Err(e) => println!("Error: {}", e),
    }
}

async fn do_historical_compare(
    app: &App,
    amount: &str,
    from: &str,
    to: &str,
    date_from: &str,
    date_to: &str,
) {
    let Ok(amount) = amount.parse::<f64>() else {
        println!("Usage: compare AMOUNT FROM TO FROM_DATE TO_DATE (dates as YYYY-MM-DD)");
        return;
    };
    let (Ok(date_from), Ok(date_to)) = (
        NaiveDate::parse_from_str(date_from, "%Y-%m-%d"),
        NaiveDate::parse_from_str(date_to, "%Y-%m-%d"),
    ) else {
        println!("Dates must be YYYY-MM-DD");
        return;
    };
    let from = from.to_uppercase();
    let to = to.to_uppercase();

    match app
        .historical_compare(amount, &from, &to, date_from, date_to)
        .await
    {
        Ok(comparison) => {
            println!(
                "{} {} on {}: {:.2} {} (rate {:.4})",
                amount, from, date_from, comparison.old_result, to, comparison.old_rate
            );
            println!(
                "{} {} on {}: {:.2} {} (rate {:.4})",
                amount, from, date_to, comparison.new_result, to, comparison.new_rate
            );
            println!(
                "Difference: {:+.2} {} ({:+.2}%)",
                comparison.difference, to, comparison.percent_change
            );
        }
        Err(e) => println!("Error: {}", e),
    }
}
