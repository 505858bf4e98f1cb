//! Thin CLI entry point: one query in, one final response out.

use clap::Parser;

use sqltrace_agent::config::{CliArgs, Config, ConfigOverrides};
use sqltrace_agent::llm::HttpLlmAdapter;
use sqltrace_agent::log_info;
use sqltrace_agent::react::ReActEngine;
use sqltrace_agent::tools::ToolRegistry;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    let config = match Config::from_env_and_args(
        args.project_root.clone(),
        ConfigOverrides { max_steps: args.max_steps, timeout_secs: args.timeout_secs },
    ) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Analysis error: configuration error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = config.verify_project_root() {
        eprintln!("Analysis error: {e}");
        std::process::exit(1);
    }

    let registry = ToolRegistry::new(&config.project_root);
    for init_error in registry.errors() {
        log_info!("main", "tool unavailable: {} ({})", init_error.name, init_error.error);
    }

    let api_key = sqltrace_agent::llm::http::read_api_key_from_env().unwrap_or_default();
    let adapter = HttpLlmAdapter::new(api_key);
    let engine = ReActEngine::new(&config, &adapter, &registry);

    let response = engine.process(&args.query).await;
    println!("{response}");
}
