use std::sync::Arc;

use clap::Parser;
use colored::*;
use eyre::{Context, Result, bail};
use log::info;
use serde_json::Value;

mod cli;

use acigate::{Config, ExecutionResult, HttpTransport, IntentRouter, ToolGateway};
use cli::{Cli, Commands};

type Gateway = ToolGateway<HttpTransport>;

fn setup_logging(config: &Config, verbose: bool) {
    // RUST_LOG wins; otherwise --verbose, otherwise the config's level.
    let default_filter = if verbose {
        "debug"
    } else {
        config.log_level.as_deref().unwrap_or("info")
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

/// Parse an --args value strictly as a JSON object.
///
/// The gateway accepts structured arguments only; free-text extraction is
/// deliberately unsupported.
fn parse_args(raw: &str) -> Result<Value> {
    let value: Value =
        serde_json::from_str(raw).context("--args must be valid JSON")?;
    if !value.is_object() {
        bail!("--args must be a JSON object, got: {}", raw);
    }
    Ok(value)
}

fn print_result(result: &ExecutionResult) {
    match result {
        ExecutionResult::Success { payload } => {
            println!("{}", "Success".green());
            println!(
                "{}",
                serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string())
            );
        }
        ExecutionResult::Failure { kind, message } => {
            println!("{} [{}] {}", "Failed:".red(), kind, message);
        }
    }
}

async fn handle_search(gateway: &Gateway, intent: &str, limit: u32, use_cache: bool) -> Result<()> {
    info!("Searching functions for intent: {}", intent);

    match gateway.try_search(intent, limit, use_cache).await {
        Ok(functions) if functions.is_empty() => {
            println!("{}", "No functions matched.".yellow());
        }
        Ok(functions) => {
            println!("{} {}", "Matches for:".green(), intent);
            for function in &functions {
                match &function.description {
                    Some(description) => {
                        println!("  {}  {}", function.name.cyan(), description)
                    }
                    None => println!("  {}", function.name.cyan()),
                }
            }
        }
        Err(e) => {
            println!("{} {}", "Search unavailable:".red(), e);
        }
    }
    Ok(())
}

async fn handle_exec(
    gateway: &Gateway,
    function: &str,
    args: &str,
    timeout: Option<u64>,
) -> Result<()> {
    let arguments = parse_args(args)?;
    info!("Executing {}", function);

    let result = gateway.execute(function, arguments, timeout).await;
    print_result(&result);
    Ok(())
}

async fn handle_call(gateway: &Gateway, app: &str, operation: &str, args: &str) -> Result<()> {
    let arguments = parse_args(args)?;
    info!("Direct call {}__{}", app, operation);

    let result = gateway.direct_call(app, operation, arguments).await;
    print_result(&result);
    Ok(())
}

async fn handle_list(gateway: &Gateway, app: Option<&str>) -> Result<()> {
    match gateway.try_list_tools(app).await {
        Ok(tools) => {
            println!("{} {}", "Functions:".green(), tools.len());
            for tool in &tools {
                match &tool.description {
                    Some(description) => println!("  {}  {}", tool.name.cyan(), description),
                    None => println!("  {}", tool.name.cyan()),
                }
            }
        }
        Err(e) => {
            println!("{} {}", "Listing unavailable:".red(), e);
        }
    }
    Ok(())
}

async fn handle_describe(gateway: &Gateway, function: &str) -> Result<()> {
    match gateway.get_tool_definition(function).await {
        Some(tool) => {
            println!("{}", tool.name.cyan());
            if let Some(description) = &tool.description {
                println!("  {}", description);
            }
        }
        None => {
            println!("{} {}", "Not found:".yellow(), function);
        }
    }
    Ok(())
}

async fn handle_route(
    gateway: Arc<Gateway>,
    intent: &str,
    args: Option<&str>,
    execute: bool,
) -> Result<()> {
    let router = IntentRouter::new(gateway);

    let context = match args {
        Some(raw) => Some(serde_json::json!({ "arguments": parse_args(raw)? })),
        None => None,
    };

    let decision = router
        .route_and_execute(intent, context.as_ref(), execute)
        .await;

    match &decision.selected {
        Some(selected) => {
            println!("{} {}", "Selected:".green(), selected.name.cyan());
            if let Some(description) = &selected.description {
                println!("  {}", description);
            }
            if !decision.alternatives.is_empty() {
                println!("{}", "Alternatives:".green());
                for alternative in &decision.alternatives {
                    println!("  {}", alternative.name.cyan());
                }
            }
            match &decision.execution {
                Some(result) => print_result(result),
                None if execute => {
                    println!("{}", "Not executed: no --args given.".yellow())
                }
                None => {}
            }
        }
        None => {
            println!("{} {}", "No function matched:".yellow(), decision.intent);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    setup_logging(&config, cli.verbose);

    info!(
        "Using apps server {} and unified server {}",
        config.servers.apps_url, config.servers.unified_url
    );

    // Composition root: own the transport and hand it to the gateway.
    let transport =
        Arc::new(HttpTransport::new(&config.auth).context("Failed to create HTTP transport")?);
    let gateway = Arc::new(ToolGateway::new(transport, &config));

    match cli.command {
        Commands::Search {
            intent,
            limit,
            no_cache,
        } => handle_search(&gateway, &intent, limit, !no_cache).await,
        Commands::Exec {
            function,
            args,
            timeout,
        } => handle_exec(&gateway, &function, &args, timeout).await,
        Commands::Call {
            app,
            operation,
            args,
        } => handle_call(&gateway, &app, &operation, &args).await,
        Commands::List { app } => handle_list(&gateway, app.as_deref()).await,
        Commands::Describe { function } => handle_describe(&gateway, &function).await,
        Commands::Route {
            intent,
            args,
            execute,
        } => handle_route(gateway, &intent, args.as_deref(), execute).await,
    }
}
