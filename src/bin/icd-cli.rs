use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use icd_proxy::client::probe::{self, DEFAULT_BASES, DEFAULT_ENDPOINTS, PROBE_DELAY};
use icd_proxy::client::{ClientError, IcdClient, NodeResponse, DEFAULT_LANG};

#[derive(Parser)]
#[command(name = "icd-cli")]
#[command(about = "Query the ICD-10 API through the proxy", long_about = None)]
struct Cli {
    /// API base the /ICD10 endpoints hang off.
    #[arg(short, long, default_value = "http://localhost:8080/api/proxy")]
    url: String,

    #[arg(short, long, default_value = DEFAULT_LANG)]
    lang: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all chapters
    Root,
    /// Show a chapter
    Chapter { id: String },
    /// Show a section
    Section { id: String },
    /// Show a type (three-character category)
    Type { id: String },
    /// Show a disease
    Disease { id: String },
    /// Free-text search
    Search { query: String },
    /// Look up a code value, or a code record by id with --id
    Code {
        code: String,
        #[arg(long)]
        id: bool,
    },
    /// Probe candidate bases and endpoints, printing the ones that answer
    Discover,
    /// Probe a single endpoint under --url
    Probe { endpoint: String },
    /// Try the search endpoint candidates under --url
    SearchProbe { query: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let client = IcdClient::new(&cli.url)?.with_lang(cli.lang);

    match cli.command {
        Commands::Root => {
            let root = client.root().await.map_err(describe)?;
            require_success(&root, &root.status, root.is_success())?;
            print_json(&root)?
        }
        Commands::Chapter { id } => print_node(client.chapter(&id).await)?,
        Commands::Section { id } => print_node(client.section(&id).await)?,
        Commands::Type { id } => print_node(client.node_type(&id).await)?,
        Commands::Disease { id } => print_node(client.disease(&id).await)?,
        Commands::Search { query } => print_json(&client.search(&query).await.map_err(describe)?)?,
        Commands::Code { code, id } => {
            let value = if id {
                client.code_by_id(&code).await
            } else {
                client.code(&code).await
            };
            print_json(&value.map_err(describe)?)?
        }
        Commands::Discover => {
            let http = probe::probe_client()?;
            let working = probe::discover(&http, &DEFAULT_BASES, &DEFAULT_ENDPOINTS, PROBE_DELAY).await;
            print_json(&working)?
        }
        Commands::Probe { endpoint } => {
            let http = probe::probe_client()?;
            let result = probe::probe_endpoint(&http, client.base_url(), &endpoint).await;
            print_json(&result)?;
            if !result.success {
                return Err(format!("{} did not answer 2xx", result.url).into());
            }
        }
        Commands::SearchProbe { query } => {
            let http = probe::probe_client()?;
            match probe::search_probe(&http, client.base_url(), &query).await {
                Some(result) => print_json(&result)?,
                None => return Err("no search endpoint answered".into()),
            }
        }
    }

    Ok(())
}

fn describe(err: ClientError) -> Box<dyn std::error::Error> {
    match err {
        ClientError::Status { status, body } => {
            format!("API returned status {status}\nResponse: {body}").into()
        }
        other => other.into(),
    }
}

fn print_node(result: Result<NodeResponse, ClientError>) -> Result<(), Box<dyn std::error::Error>> {
    let node = result.map_err(describe)?;
    require_success(&node, &node.status, node.is_success())?;
    print_json(&node)?;
    Ok(())
}

/// The API answers 200 with a `status` other than `success` on failure.
fn require_success<T: Serialize>(
    value: &T,
    status: &str,
    success: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if success {
        return Ok(());
    }
    let body = serde_json::to_string(value)?;
    Err(format!("API returned status '{status}'\nResponse: {body}").into())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
