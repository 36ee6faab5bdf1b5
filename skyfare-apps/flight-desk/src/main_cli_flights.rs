//!  Skyfare Flight Desk
//!
//!  Copyright (C) 2026  Mamy Ratsimbazafy
//!
//!  This program is free software: you can redistribute it and/or modify
//!  it under the terms of the GNU Affero General Public License as published by
//!  the Free Software Foundation, either version 3 of the License, or
//!  (at your option) any later version.
//!
//!  This program is distributed in the hope that it will be useful,
//!  but WITHOUT ANY WARRANTY; without even the implied warranty of
//!  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//!  GNU Affero General Public License for more details.
//!
//!  You should have received a copy of the GNU Affero General Public License
//!  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! CLI for flight search, comparison and booking.

use std::cmp::max;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use skyfare_flight_desk::{
    Booking, BookingStatus, BookingsApiClient, ComparisonView, CreateBookingRequest,
    DeskConfig, DeskError, FilterCriteria, Flight, FlightBackend, FlightCatalog, FlightsApiClient,
    LocalBookingStore, Notice, Passenger, PaymentInfo, Priority, SearchCriteria, SearchSession,
    airports, create_booking, default_payment, fmt_duration, primary_passenger, validate_booking_form,
};

/// CLI arguments
#[derive(Parser, Debug)]
#[command(name = "skyfare-flights")]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Flight search service base URL
    #[arg(long, env = "SKYFARE_API_URL", global = true)]
    api_url: Option<String>,

    /// Bookings service base URL
    #[arg(long, env = "SKYFARE_BOOKINGS_URL", global = true)]
    bookings_url: Option<String>,

    /// Weight of cost in the optimized ranking
    #[arg(long, env = "SKYFARE_COST_WEIGHT", default_value = "0.5", global = true)]
    cost_weight: f64,

    /// Weight of duration in the optimized ranking
    #[arg(long, env = "SKYFARE_TIME_WEIGHT", default_value = "0.5", global = true)]
    time_weight: f64,

    /// Search a local JSON flight dataset instead of the search service
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, default_value = "false", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search flights, optionally filtering and comparing results
    Search(SearchArgs),

    /// Look up airports by code, city or name
    Airports {
        query: String,

        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Book one of the search results
    Book {
        #[command(flatten)]
        search: SearchArgs,

        #[command(flatten)]
        account: AccountArgs,

        /// Position of the flight in the search results (1-based)
        #[arg(long)]
        pick: usize,

        /// JSON file with the list of passengers
        #[arg(long)]
        passengers: Option<PathBuf>,

        /// JSON file with the payment details
        #[arg(long)]
        payment: Option<PathBuf>,

        /// Accept the terms and conditions
        #[arg(long, default_value = "false")]
        accept_terms: bool,
    },

    /// List bookings
    Bookings {
        #[command(flatten)]
        account: AccountArgs,

        /// confirmed, cancelled, completed, upcoming or past
        #[arg(long)]
        status: Option<String>,
    },

    /// Cancel a confirmed booking by id or reference
    Cancel {
        booking: String,

        #[command(flatten)]
        account: AccountArgs,
    },
}

#[derive(Args, Debug, Clone)]
struct SearchArgs {
    /// Origin airport code (e.g., SFO, LAX)
    #[arg(short, long)]
    from: Option<String>,

    /// Destination airport code (e.g., JFK, ORD)
    #[arg(short, long)]
    to: Option<String>,

    /// Departure date (YYYY-MM-DD or YYYY/MM/DD)
    #[arg(short, long)]
    date: Option<String>,

    /// Result order: cost, time, optimized
    #[arg(short, long, default_value = "cost")]
    priority: Priority,

    /// Only direct flights
    #[arg(long, default_value = "false")]
    direct_only: bool,

    #[arg(long)]
    min_price: Option<i64>,

    #[arg(long)]
    max_price: Option<i64>,

    /// Maximum duration in minutes
    #[arg(long)]
    max_duration: Option<u32>,

    /// Airline names to keep (comma-separated)
    #[arg(long, value_delimiter = ',')]
    airlines: Vec<String>,

    /// Number of results to print
    #[arg(long, default_value = "10")]
    top: usize,

    /// Result positions to compare side by side (e.g., 1,3,4)
    #[arg(long, value_delimiter = ',')]
    compare: Vec<usize>,
}

#[derive(Args, Debug, Clone)]
struct AccountArgs {
    /// Bearer credential for the bookings service
    #[arg(long, env = "SKYFARE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// User the local booking mirror is scoped to
    #[arg(long, env = "SKYFARE_USER", default_value = "local")]
    user: String,

    /// Local booking mirror file
    #[arg(long, default_value = "skyfare-bookings.json")]
    store: PathBuf,
}

/// Configure logging based on verbosity level
fn setup_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();
}

/// Parse date string to NaiveDate
fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
        .context(format!(
            "Invalid date format: {}. Use YYYY-MM-DD or YYYY/MM/DD",
            s
        ))
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn build_config(args: &CliArgs) -> DeskConfig {
    let mut config = DeskConfig::default().with_ranking(args.cost_weight, args.time_weight);
    if let Some(url) = &args.api_url {
        config = config.with_search_api_url(url.as_str());
    }
    if let Some(url) = &args.bookings_url {
        config = config.with_bookings_api_url(url.as_str());
    }
    config
}

fn build_backend(config: &DeskConfig, dataset: Option<&Path>) -> Result<FlightBackend> {
    match dataset {
        Some(path) => {
            let catalog = FlightCatalog::from_json_file(path)?
                .with_ranker(config.ranker())
                .with_limit(config.result_limit);
            Ok(FlightBackend::Catalog(Arc::new(catalog)))
        }
        None => {
            let client = FlightsApiClient::new(config).context("Failed to create flights client")?;
            Ok(FlightBackend::Remote(client))
        }
    }
}

fn build_criteria(args: &SearchArgs) -> Result<SearchCriteria> {
    let mut builder = SearchCriteria::builder()
        .priority(args.priority)
        .include_connections(!args.direct_only);
    if let Some(from) = &args.from {
        builder = builder.source(from.as_str());
    }
    if let Some(to) = &args.to {
        builder = builder.destination(to.as_str());
    }
    if let Some(date) = &args.date {
        builder = builder.date(parse_date(date)?);
    }
    let criteria = builder.build().context("Invalid search")?;
    Ok(criteria.with_default_date(today()))
}

fn build_filter(args: &SearchArgs) -> FilterCriteria {
    FilterCriteria::default()
        .price(
            args.min_price.unwrap_or(i64::MIN),
            args.max_price.unwrap_or(i64::MAX),
        )
        .duration(0, args.max_duration.unwrap_or(u32::MAX))
        .airlines(args.airlines.iter().map(|a| a.trim().to_string()))
}

/// Run the search through a session and return it with the visible results.
async fn run_search(
    backend: &FlightBackend,
    config: &DeskConfig,
    args: &SearchArgs,
) -> Result<(SearchSession, SearchCriteria, Vec<Flight>)> {
    use skyfare_flight_desk::FlightSource;

    let criteria = build_criteria(args)?;
    let session = SearchSession::new(config.ranker())
        .with_filter(build_filter(args))
        .with_priority(criteria.priority);

    let ticket = session.begin_search();
    let outcome = backend.search(&criteria).await;
    let (session, notice) = session.complete_search(ticket, outcome);
    match notice {
        Some(Notice::NoFlightsFound) | None => {}
        Some(notice) => anyhow::bail!("{}", notice),
    }
    let visible = session.visible_results();
    tracing::info!(
        "Search completed: {} flights, {} after filters",
        session.results().len(),
        visible.len()
    );
    Ok((session, criteria, visible))
}

/// Format departure/arrival times.
fn fmt_times(flight: &Flight) -> String {
    format!(
        "{} → {}",
        flight.takeoff().display_colon(),
        flight.landing().display_colon()
    )
}

fn fmt_stops(flight: &Flight) -> String {
    match flight.connection() {
        None => "direct".to_string(),
        Some(c) => format!(
            "1 stop: {}@{}",
            fmt_duration((c.layover_hours() * 60.0).round() as u32),
            c.connection_airport()
        ),
    }
}

fn airline_label(flight: &Flight) -> String {
    flight
        .airline()
        .map(|a| a.name.clone())
        .unwrap_or_else(|| "??".to_string())
}

/// Get terminal width for responsive tables
fn get_terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(100)
}

fn dash_bar() -> String {
    "-".repeat(get_terminal_width().min(100))
}

/// Calculate column widths from the content
fn calc_column_widths(flights: &[Flight]) -> (usize, usize, usize, usize) {
    let mut max_airline = 7;
    let mut max_times = 15;
    let mut max_duration = 10;
    let mut max_stops = 12;
    for flight in flights {
        max_airline = max(max_airline, airline_label(flight).chars().count());
        max_times = max(max_times, fmt_times(flight).chars().count());
        max_duration = max(max_duration, fmt_duration(flight.duration()).len());
        max_stops = max(max_stops, fmt_stops(flight).len());
    }
    (max_airline, max_times, max_duration, max_stops)
}

fn render_table(flights: &[Flight], top: usize) {
    let shown = &flights[..top.min(flights.len())];
    let (aw, tw, dw, sw) = calc_column_widths(shown);

    println!("{}", dash_bar());
    let h1 = format!("  {:>3}", "#");
    let h2 = format!("{:<w$}", "AIRLINE", w = aw);
    let h3 = format!("{:<w$}", "DEP → ARR", w = tw);
    let h4 = format!("{:<w$}", "DURATION", w = dw);
    let h5 = format!("{:<w$}", "STOPS", w = sw);
    println!("{}  {}  {}  {}  {}   PRICE", h1, h2, h3, h4, h5);
    println!("{}", dash_bar());

    for (i, flight) in shown.iter().enumerate() {
        let c1 = format!("  {:>3}", i + 1);
        let c2 = format!("{:<w$}", airline_label(flight), w = aw);
        let c3 = format!("{:<w$}", fmt_times(flight), w = tw);
        let c4 = format!("{:<w$}", fmt_duration(flight.duration()), w = dw);
        let c5 = format!("{:<w$}", fmt_stops(flight), w = sw);
        println!("{}  {}  {}  {}  {}   {}", c1, c2, c3, c4, c5, flight.cost());
    }
}

fn render_results(criteria: &SearchCriteria, session: &SearchSession, flights: &[Flight], top: usize) {
    let from = criteria
        .source
        .as_deref()
        .map(airports::display_name)
        .unwrap_or_else(|| "anywhere".to_string());
    let to = criteria
        .destination
        .as_deref()
        .map(airports::display_name)
        .unwrap_or_else(|| "anywhere".to_string());
    let on = criteria
        .date
        .map(|d| d.format("%a, %b %-d, %Y").to_string())
        .unwrap_or_else(|| "any date".to_string());

    let rule = "=".repeat(get_terminal_width().min(100));
    println!("{}\n  🛫  {} → {} on {}\n{}\n", rule, from, to, on, rule);

    if flights.is_empty() {
        println!("{}", Notice::NoFlightsFound);
        return;
    }

    let facets = session.facets();
    if let Some(price) = facets.price {
        println!("💰 Price range: ${} - ${}", price.min, price.max);
    }
    println!(
        "📊 Total Flights: {} ({} shown after filters, by {})",
        session.results().len(),
        flights.len(),
        session.priority()
    );
    println!("\n🏆 Top {} Results:", top.min(flights.len()));
    render_table(flights, top);
}

fn render_comparison(view: &ComparisonView) {
    println!("\n⚖️  Comparing {} flights:", view.flights.len());
    println!("{}", dash_bar());
    for (i, flight) in view.flights.iter().enumerate() {
        let mut tags = Vec::new();
        if view.best_value == Some(i) {
            tags.push("💰 best value");
        }
        if view.fastest == Some(i) {
            tags.push("⚡ fastest");
        }
        println!(
            "  {}. {} {} → {}  {}  {}  {}  {}  {}",
            i + 1,
            airline_label(flight),
            flight.source(),
            flight.destination(),
            fmt_times(flight),
            fmt_duration(flight.duration()),
            fmt_stops(flight),
            flight.cost(),
            tags.join(", ")
        );
    }
}

fn compare_picks(mut session: SearchSession, flights: &[Flight], picks: &[usize]) -> Result<()> {
    for &pick in picks {
        let flight = pick
            .checked_sub(1)
            .and_then(|i| flights.get(i))
            .with_context(|| format!("No result #{} to compare", pick))?;
        let (next, notice) = session.toggle_comparison(flight);
        session = next;
        if let Some(notice) = notice {
            println!("⚠️  {}", notice);
        }
    }
    let token = session.comparison().to_handoff_token().ok();

    let (_, view) = session.enter_comparison();
    match view {
        Ok(view) => {
            render_comparison(&view);
            if let Some(token) = token {
                println!("\n🔗 Comparison token: {}", token);
            }
        }
        Err(notice) => println!("⚠️  {}", notice),
    }
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display()))
}

async fn load_booking_form(
    account: &BookingsApiClient,
    passengers: Option<&Path>,
    payment: Option<&Path>,
) -> Result<(Vec<Passenger>, PaymentInfo)> {
    let passengers: Vec<Passenger> = match passengers {
        Some(path) => read_json(path)?,
        None if account.is_authenticated() => {
            let saved = account.saved_passengers().await?;
            primary_passenger(&saved).map(Passenger::from).into_iter().collect()
        }
        None => Vec::new(),
    };
    let payment: PaymentInfo = match payment {
        Some(path) => read_json(path)?,
        None if account.is_authenticated() => {
            let saved = account.saved_payments().await?;
            default_payment(&saved).map(PaymentInfo::from).unwrap_or_default()
        }
        None => PaymentInfo::default(),
    };
    Ok((passengers, payment))
}

fn print_booking(booking: &Booking) {
    println!(
        "  {}  {:<10} {} → {}  {}  {} pax  ${}",
        booking.booking_ref,
        booking.status,
        booking.flight.source(),
        booking.flight.destination(),
        booking.flight.date(),
        booking.passenger_count,
        booking.total_cost
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    setup_logging(args.verbose);

    tracing::info!("Starting skyfare-flights CLI");
    tracing::debug!("Args: {:?}", args);

    let config = build_config(&args);

    match &args.command {
        Command::Search(search) => {
            let backend = build_backend(&config, args.dataset.as_deref())?;
            let (session, criteria, flights) = run_search(&backend, &config, search).await?;
            render_results(&criteria, &session, &flights, search.top);
            if !search.compare.is_empty() {
                compare_picks(session, &flights, &search.compare)?;
            }
        }

        Command::Airports { query, limit } => {
            for airport in airports::search(query, *limit) {
                println!(
                    "  {}  {:<45} {}",
                    airport.code,
                    airport.name,
                    airports::location(airport.code)
                );
            }
        }

        Command::Book {
            search,
            account,
            pick,
            passengers,
            payment,
            accept_terms,
        } => {
            let backend = build_backend(&config, args.dataset.as_deref())?;
            let (_, _, flights) = run_search(&backend, &config, search).await?;
            let flight = pick
                .checked_sub(1)
                .and_then(|i| flights.get(i))
                .with_context(|| format!("No result #{} to book ({} found)", pick, flights.len()))?
                .clone();

            let remote = BookingsApiClient::new(&config, account.token.clone())?;
            let (passengers, payment) =
                load_booking_form(&remote, passengers.as_deref(), payment.as_deref()).await?;
            validate_booking_form(&passengers, &payment, *accept_terms)?;

            let count = u32::try_from(passengers.len()).context("Too many passengers")?;
            let booking = create_booking(&account.user, flight, passengers, payment, count)?;

            let booking = if remote.is_authenticated() {
                remote.create(&CreateBookingRequest::from(&booking)).await?
            } else {
                println!("ℹ️  Not logged in: booking kept in the local mirror only");
                booking
            };
            let mut store = LocalBookingStore::open(&account.store);
            store.add(booking.clone())?;

            println!("\n✅ Booking confirmed: {}", booking.booking_ref);
            println!("   Card: {}", booking.payment.masked_card());
            print_booking(&booking);
        }

        Command::Bookings { account, status } => {
            let remote = BookingsApiClient::new(&config, account.token.clone())?;
            let store = LocalBookingStore::open(&account.store);
            let today = today();

            let bookings: Vec<Booking> = if remote.is_authenticated() {
                match status.as_deref() {
                    Some("upcoming") => remote.upcoming().await?,
                    Some("past") => remote.completed().await?,
                    Some(s) => {
                        let wanted: BookingStatus = s.parse().map_err(anyhow::Error::msg)?;
                        remote
                            .list()
                            .await?
                            .into_iter()
                            .filter(|b| b.status == wanted)
                            .collect()
                    }
                    None => remote.list().await?,
                }
            } else {
                let local = match status.as_deref() {
                    Some("upcoming") => store.upcoming(&account.user, today),
                    Some("past") => store.completed(&account.user, today),
                    Some(s) => {
                        let wanted: BookingStatus = s.parse().map_err(anyhow::Error::msg)?;
                        store.by_status(&account.user, wanted)
                    }
                    None => store.user_bookings(&account.user),
                };
                local.into_iter().cloned().collect()
            };

            println!("📋 {} booking(s)", bookings.len());
            for booking in &bookings {
                print_booking(booking);
            }
        }

        Command::Cancel { booking, account } => {
            let remote = BookingsApiClient::new(&config, account.token.clone())?;
            let mut store = LocalBookingStore::open(&account.store);

            let cancelled = if remote.is_authenticated() {
                match remote.update_status(booking, BookingStatus::Cancelled).await {
                    Ok(b) => b,
                    Err(DeskError::AuthRequired) => {
                        anyhow::bail!("Credential rejected by the bookings service, log in again")
                    }
                    Err(e) => return Err(e.into()),
                }
            } else {
                store.update_status(&account.user, booking, BookingStatus::Cancelled)?
            };
            if remote.is_authenticated() && store.find(&account.user, booking).is_some() {
                if let Err(e) = store.update_status(&account.user, booking, BookingStatus::Cancelled) {
                    tracing::warn!("Local mirror not updated: {:#}", e);
                }
            }
            println!("🛑 Booking {} cancelled", cancelled.booking_ref);
        }
    }

    Ok(())
}
