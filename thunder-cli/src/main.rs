//! Sherlock Thunder CLI
//!
//! Username enumeration over rotating proxies and Tor, with identity scoring.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use thunder_core::{RouteKind, DEFAULT_PROXY_FILE};
use thunder_net::{
    EgressSource, HeaderGenerator, IdentitySource, NetConfig, ReqwestTransport, ResilientClient,
    Transport,
};
use thunder_probes::{AccountAgeLookup, GitHubAgeLookup, DEFAULT_TOOL_TIMEOUT};
use thunder_runtime::{
    analyze, write_report, LookupConfig, Orchestrator, Verdict, DEFAULT_MAX_WORKERS,
};

#[derive(Parser)]
#[command(name = "thunder")]
#[command(author, version, about = "Sherlock Thunder: username enumeration over proxies and Tor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1", global = true)]
    verbose: u8,
}

/// Network options shared by every command
#[derive(Args)]
struct NetArgs {
    /// Single proxy URL, overrides the proxy file (or set THUNDER_PROXY)
    #[arg(long, env = "THUNDER_PROXY")]
    proxy: Option<String>,

    /// Proxy list, one `scheme://host:port` per line
    #[arg(long, env = "THUNDER_PROXY_FILE", default_value = DEFAULT_PROXY_FILE)]
    proxy_file: PathBuf,

    /// Never route through Tor
    #[arg(long)]
    no_tor: bool,

    /// Tor control port password (or set THUNDER_CONTROL_PASSWORD)
    #[arg(long, env = "THUNDER_CONTROL_PASSWORD")]
    control_password: Option<String>,

    /// File of user agents to rotate, one per line
    #[arg(long)]
    user_agents: Option<PathBuf>,

    /// Attempts per HTTP request
    #[arg(long, default_value = "3")]
    retries: u32,

    /// Per-attempt HTTP timeout in seconds
    #[arg(long, default_value = "10")]
    timeout: u64,
}

impl NetArgs {
    fn config(&self) -> NetConfig {
        let mut config = NetConfig {
            manual_proxy: self.proxy.clone().filter(|p| !p.trim().is_empty()),
            proxy_file: Some(self.proxy_file.clone()),
            use_anonymity: !self.no_tor,
            control_password: self.control_password.clone(),
            user_agent_file: self.user_agents.clone(),
            ..Default::default()
        };
        config.retry.max_retries = self.retries;
        config.retry.timeout = Duration::from_secs(self.timeout);
        config
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Enumerate accounts for a username and score the identity
    Lookup {
        /// Username to investigate
        target: String,

        #[command(flatten)]
        net: NetArgs,

        /// Directory for the HTML report
        #[arg(long, default_value = "reports")]
        report_dir: PathBuf,

        /// Hard timeout for each external tool in seconds
        #[arg(long, default_value_t = DEFAULT_TOOL_TIMEOUT.as_secs())]
        tool_timeout: u64,

        /// Tools running at once
        #[arg(long, default_value_t = DEFAULT_MAX_WORKERS)]
        workers: usize,

        /// Skip GitHub account age checks
        #[arg(long)]
        skip_age: bool,

        /// GitHub token for the users API (or set GITHUB_TOKEN)
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        github_token: Option<String>,
    },

    /// Check proxy and Tor status
    Status {
        #[command(flatten)]
        net: NetArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    match cli.command {
        Commands::Lookup {
            target,
            net,
            report_dir,
            tool_timeout,
            workers,
            skip_age,
            github_token,
        } => {
            let lookup = LookupConfig {
                max_workers: workers,
                tool_timeout: Duration::from_secs(tool_timeout),
                ..Default::default()
            };
            run_lookup(&target, net, lookup, report_dir, skip_age, github_token).await?;
        }
        Commands::Status { net } => {
            check_status(net).await?;
        }
    }

    Ok(())
}

async fn run_lookup(
    target: &str,
    net: NetArgs,
    lookup: LookupConfig,
    report_dir: PathBuf,
    skip_age: bool,
    github_token: Option<String>,
) -> Result<()> {
    let target = target.trim();
    if target.is_empty() {
        anyhow::bail!("Target username must not be empty");
    }

    println!("⚡ Sherlock Thunder - username enumeration\n");

    let config = net.config();
    let retry = config.retry.clone();
    let headers = HeaderGenerator::detect(config.user_agent_file.as_deref());

    let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new());
    let source: Arc<dyn EgressSource> =
        Arc::new(IdentitySource::detect(config, Arc::clone(&transport)).await);

    match source.active_kind() {
        RouteKind::Proxy => println!("🔀 Rotating {} proxies", source.available_proxy_count()),
        RouteKind::AnonymityCircuit => {
            println!("🧅 Routing through Tor");
            if source.renew_identity().await {
                println!("🔄 Fresh Tor circuit requested");
            } else {
                println!("⚠️  Could not renew the Tor circuit (continuing anyway)");
            }
        }
        RouteKind::Direct => println!("⚠️  No proxy or Tor available - using a direct connection"),
    }
    if headers.has_dynamic_source() {
        println!("🎭 Rotating user agents from file");
    }

    println!("🔍 Target: {}", target);
    println!(
        "⏱️  Tool timeout: {}s | Workers: {}\n",
        lookup.tool_timeout.as_secs(),
        lookup.max_workers
    );

    let orchestrator = Orchestrator::with_tools(&lookup, Arc::clone(&source));
    let outcome = orchestrator.run(target).await;

    for failure in &outcome.failures {
        println!("⚠️  {} failed: {}", failure.probe, failure.reason);
    }
    if outcome.fell_back {
        println!("⚠️  No additional profiles found - analysing {} alone", target);
    } else {
        println!("✅ {} handle variants discovered", outcome.discovered.len());
    }

    let ages = if skip_age {
        None
    } else {
        let client = ResilientClient::new(source, transport, retry).with_headers(headers);
        Some(GitHubAgeLookup::new(client).with_token(github_token))
    };
    let analysis = analyze(
        target,
        &outcome.discovered,
        ages.as_ref().map(|github| github as &dyn AccountAgeLookup),
    )
    .await;

    let path = write_report(&analysis, &report_dir)?;
    let verdict = Verdict::from_score(analysis.score);

    println!("\n{}", "=".repeat(60));
    println!("📊 Confidence score: {}%", analysis.score);
    println!("   {}", verdict.conclusion());
    for handle in &analysis.handles {
        println!(
            "   {:<30} {:>3}%  {:<8} {}",
            handle.handle,
            handle.similarity_percent(),
            handle.level,
            handle.age
        );
    }
    println!("\n📄 Report saved to: {}", path.display());

    Ok(())
}

async fn check_status(net: NetArgs) -> Result<()> {
    println!("🔌 Checking network capabilities...\n");

    let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new());
    let source = IdentitySource::detect(net.config(), transport).await;

    println!("🔀 Proxies loaded: {}", source.available_proxy_count());

    if source.anonymity_available() {
        println!("✅ Tor is running and accessible");
        println!("   Proxy: {}", source.config().socks_addr);
        println!("   Control: {}", source.config().control_addr);
    } else if net.no_tor {
        println!("➖ Tor disabled (--no-tor)");
    } else {
        println!("❌ Tor is not accessible");
        println!("   Expected proxy at: {}", source.config().socks_addr);
        println!("   Expected control port at: {}", source.config().control_addr);
        println!("\n   To install Tor:");
        println!("   - Linux: sudo apt install tor");
        println!("   - Mac: brew install tor");
        println!("   - Enable ControlPort 9051 in torrc to allow circuit renewal");
    }

    println!("\n🛣️  Active route: {}", source.active_kind());
    let route = source.next_route();
    println!("🌐 External IP via {}: {}", route, source.external_ip(&route).await);

    Ok(())
}
