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

//! # MCP Server Entry Point
//!
//! Exposes flight search, comparison and airport lookup over stdio or
//! streamable HTTP.

use anyhow::{Context, Error, Result};
use clap::{Parser, Subcommand};
use rmcp::handler::server::{ServerHandler, tool::ToolRouter, wrapper::Parameters};
use rmcp::service::serve_server;
use rmcp::tool;
use rmcp::tool_router;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
};
use skyfare_flight_desk::mcp_schema::{
    CompareFlightsInput, CompareFlightsResponse, SearchAirportsInput, SearchAirportsResponse,
    SearchFlightsInput, SearchFlightsResponse,
};
use skyfare_flight_desk::{
    ComparisonSet, DeskConfig, FlightBackend, FlightCatalog, FlightSource, FlightsApiClient, Notice,
    SearchCriteria, SearchSession, airports,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "skyfare-travel-mcp")]
#[command(author, version, about = "MCP server for flight search and comparison")]
struct Args {
    /// Flight search service base URL
    #[arg(long, env = "SKYFARE_API_URL", global = true)]
    api_url: Option<String>,

    /// Answer searches from a local JSON flight dataset
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,

    #[arg(long, env = "SKYFARE_COST_WEIGHT", default_value = "0.5", global = true)]
    cost_weight: f64,

    #[arg(long, env = "SKYFARE_TIME_WEIGHT", default_value = "0.5", global = true)]
    time_weight: f64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run MCP server over stdio (for Claude Desktop, etc.)
    Stdio,

    /// Run MCP server over HTTP
    Http {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        #[arg(long, default_value = "8080")]
        port: u16,
    },
}

#[derive(Clone)]
pub struct FlightDeskServer {
    backend: FlightBackend,
    config: Arc<DeskConfig>,
    tool_router: ToolRouter<Self>,
}

impl FlightDeskServer {
    pub fn new(backend: FlightBackend, config: Arc<DeskConfig>) -> Self {
        Self {
            backend,
            config,
            tool_router: Self::tool_router(),
        }
    }

    /// Search, then apply the input's filters and ordering.
    async fn run_search(
        &self,
        input: &SearchFlightsInput,
    ) -> Result<(SearchSession, SearchCriteria, Option<Notice>), String> {
        let criteria = input.criteria().map_err(|e| e.to_string())?;
        let session = SearchSession::new(self.config.ranker())
            .with_filter(input.filter())
            .with_priority(criteria.priority);

        let ticket = session.begin_search();
        let outcome = self.backend.search(&criteria).await;
        let (session, notice) = session.complete_search(ticket, outcome);
        match notice {
            Some(Notice::SearchFailed(reason)) => Err(format!("Flight search failed: {reason}")),
            Some(Notice::LoginRequired) => Err(Notice::LoginRequired.to_string()),
            other => Ok((session, criteria, other)),
        }
    }
}

#[tool_router]
impl FlightDeskServer {
    #[tool(
        name = "search_flights",
        description = "Search flights, including same-day connections. Parameters: from (IATA), to (IATA), date (YYYY-MM-DD), priority (cost/time/optimized), include_connections (default true), min_price, max_price, max_duration (minutes), airlines (names), limit (default 10)."
    )]
    async fn search_flights(&self, params: Parameters<SearchFlightsInput>) -> Result<String, String> {
        let input = params.0;
        let (session, criteria, notice) = self.run_search(&input).await?;

        let visible = session.visible_results();
        let response = SearchFlightsResponse {
            query: criteria.to_string(),
            total: visible.len(),
            flights: visible.into_iter().take(input.limit).collect(),
            notice,
        };
        serde_json::to_string(&response).map_err(|e| e.to_string())
    }

    #[tool(
        name = "compare_flights",
        description = "Compare 2 or 3 flights side by side, highlighting the best value and the fastest. Either pass the search_flights parameters plus picks (1-based result positions), or a comparison token."
    )]
    async fn compare_flights(&self, params: Parameters<CompareFlightsInput>) -> Result<String, String> {
        let input = params.0;

        if let Some(token) = &input.token {
            let set = ComparisonSet::from_handoff_token(token).map_err(|e| e.to_string())?;
            let response = match set.compare() {
                Ok(view) => CompareFlightsResponse {
                    comparison: Some(view),
                    notices: Vec::new(),
                },
                Err(notice) => CompareFlightsResponse {
                    comparison: None,
                    notices: vec![notice],
                },
            };
            return serde_json::to_string(&response).map_err(|e| e.to_string());
        }

        let (mut session, _, _) = self.run_search(&input.search).await?;
        let visible = session.visible_results();
        let mut notices = Vec::new();
        for &pick in &input.picks {
            let flight = pick
                .checked_sub(1)
                .and_then(|i| visible.get(i))
                .ok_or_else(|| format!("No result #{} ({} results)", pick, visible.len()))?;
            let (next, notice) = session.toggle_comparison(flight);
            session = next;
            notices.extend(notice);
        }

        let (_, view) = session.enter_comparison();
        let comparison = match view {
            Ok(view) => Some(view),
            Err(notice) => {
                notices.push(notice);
                None
            }
        };
        serde_json::to_string(&CompareFlightsResponse {
            comparison,
            notices,
        })
        .map_err(|e| e.to_string())
    }

    #[tool(
        name = "search_airports",
        description = "Find US airports by IATA code, city or name. Parameters: query, limit (default 10)."
    )]
    async fn search_airports(&self, params: Parameters<SearchAirportsInput>) -> Result<String, String> {
        let input = params.0;
        let airports = airports::search(&input.query, input.limit);
        serde_json::to_string(&SearchAirportsResponse {
            query: input.query,
            airports,
        })
        .map_err(|e| e.to_string())
    }
}

impl ServerHandler for FlightDeskServer {
    fn list_tools(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl Future<Output = Result<rmcp::model::ListToolsResult, rmcp::ErrorData>> + Send + '_
    {
        Box::pin(async move {
            let tools = self.tool_router.list_all();
            tracing::debug!("Returning {} tools", tools.len());
            Ok(rmcp::model::ListToolsResult::with_all_items(tools))
        })
    }

    fn call_tool(
        &self,
        request: rmcp::model::CallToolRequestParam,
        context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl Future<Output = Result<rmcp::model::CallToolResult, rmcp::ErrorData>> + Send + '_
    {
        let router = self.tool_router.clone();
        let self_clone = self.clone();
        Box::pin(async move {
            tracing::info!("Tool call: {}", request.name);
            let context =
                rmcp::handler::server::tool::ToolCallContext::new(&self_clone, request, context);
            router.call(context).await
        })
    }

    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            protocol_version: rmcp::model::ProtocolVersion::V_2025_03_26,
            capabilities: rmcp::model::ServerCapabilities {
                tools: Some(rmcp::model::ToolsCapability::default()),
                ..Default::default()
            },
            server_info: rmcp::model::Implementation::from_build_env(),
            instructions: None,
        }
    }
}

fn build_backend(args: &Args, config: &DeskConfig) -> Result<FlightBackend> {
    match &args.dataset {
        Some(path) => {
            let catalog = FlightCatalog::from_json_file(path)?
                .with_ranker(config.ranker())
                .with_limit(config.result_limit);
            tracing::info!("Serving searches from {} ({} flights)", path.display(), catalog.len());
            Ok(FlightBackend::Catalog(Arc::new(catalog)))
        }
        None => {
            let client = FlightsApiClient::new(config).context("Failed to create flights client")?;
            tracing::info!("Serving searches from {}", client.base_url());
            Ok(FlightBackend::Remote(client))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".to_string().into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
                .with_writer(std::io::stderr),
        )
        .init();

    let args = Args::parse();
    tracing::debug!("Parsed args: {:?}", args);

    let mut config = DeskConfig::default().with_ranking(args.cost_weight, args.time_weight);
    if let Some(url) = &args.api_url {
        config = config.with_search_api_url(url.as_str());
    }
    let backend = build_backend(&args, &config)?;
    let server = FlightDeskServer::new(backend, Arc::new(config));

    match args.command {
        Command::Stdio => {
            eprintln!("Starting MCP server over stdio...");
            let (stdin, stdout) = rmcp::transport::io::stdio();
            let _running = serve_server(Arc::new(server), (stdin, stdout))
                .await
                .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;
            tracing::debug!("Server running. Press Ctrl+C to stop.");
            std::future::pending::<()>().await;
        }
        Command::Http { host, port } => {
            let addr: SocketAddr = format!("{}:{}", host, port)
                .parse()
                .context("Invalid host:port")?;
            tracing::info!("Starting MCP server over HTTP on {}", addr);
            let session_manager = Arc::new(LocalSessionManager::default());
            let config = StreamableHttpServerConfig {
                stateful_mode: true,
                ..Default::default()
            };
            let service =
                StreamableHttpService::new(move || Ok(server.clone()), session_manager, config);
            let app = axum::Router::new().nest_service("/mcp", service);
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .context("Failed to bind to address")?;
            axum::serve(listener, app)
                .await
                .context("HTTP server error")?;
        }
    }

    Ok(())
}
