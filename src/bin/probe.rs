use std::collections::HashMap;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use nagare_monitors::{
    Client, Config, MonitorType, Provider, ProviderRegistry, SnmpConfig, SnmpVersion,
    config::{AuthConfig, read_config_file},
    util::zabbix_config_from_env,
    zabbix::WebhookSetup,
};
use serde::Serialize;
use tracing::{debug, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file with the monitor connections
    #[arg(short)]
    file: Option<String>,

    /// Name of the monitor to use, defaults to the first one in the file
    #[arg(short, long)]
    monitor: Option<String>,

    /// Log protocol traffic
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// List hosts with their availability
    Hosts,
    /// Current item values of a host
    Items { host_id: String },
    /// Item history between two unix timestamps
    History {
        item_id: String,
        #[arg(long)]
        from: i64,
        #[arg(long)]
        to: Option<i64>,
    },
    Alerts,
    Triggers,
    Groups,
    /// Poll an SNMP device directly
    Snmp {
        target: String,
        #[arg(long, default_value = "public")]
        community: String,
        #[arg(long, default_value = "v2c")]
        version: String,
        #[arg(long, default_value_t = 161)]
        port: u16,
        /// Extra OIDs as OID=Name, replacing the default set
        #[arg(long = "oid")]
        oids: Vec<String>,
        /// Skip interface, routing, neighbor and hardware table walks
        #[arg(long)]
        no_discovery: bool,
    },
    /// Route Zabbix trigger events to a webhook
    SetupWebhook {
        url: String,
        #[arg(long, default_value = "")]
        token: String,
        #[arg(long)]
        user_id: Option<String>,
        #[arg(long)]
        username: Option<String>,
    },
    /// Authenticate every monitor in the config file
    Health,
}

fn init(verbose: bool) {
    let level = if verbose {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };
    let filter = filter::Targets::new().with_targets(vec![
        ("nagare_monitors", level),
        ("nagare_probe", level),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init(args.verbose);
    trace!("started with args: {args:?}");

    match args.command.clone() {
        Command::Snmp {
            target,
            community,
            version,
            port,
            oids,
            no_discovery,
        } => {
            let config = snmp_config(community, &version, port, &oids, !no_discovery)?;
            let client = Client::new(config)?;
            print(&client.get_items(&target).await?)
        }
        Command::Health => {
            let path = args
                .file
                .as_deref()
                .ok_or_else(|| anyhow!("health needs a config file (-f)"))?;
            let registry = ProviderRegistry::new();
            for (name, e) in registry.initialize(read_config_file(path)?.monitors).await {
                eprintln!("{name}: {e}");
            }
            print(&registry.health_check().await)
        }
        command => {
            let client = Client::new(monitor_config(&args)?)?;
            client.authenticate().await.context("login failed")?;
            run(&client, command).await
        }
    }
}

async fn run(client: &Client, command: Command) -> anyhow::Result<()> {
    debug!("running {command:?} against {}", client.name());
    match command {
        Command::Hosts => print(&client.get_hosts().await?),
        Command::Items { host_id } => print(&client.get_items(&host_id).await?),
        Command::History { item_id, from, to } => {
            let to = to.unwrap_or_else(|| chrono::Utc::now().timestamp());
            print(&client.get_item_history(&item_id, from, to).await?)
        }
        Command::Alerts => print(&client.get_alerts().await?),
        Command::Triggers => print(&client.get_triggers().await?),
        Command::Groups => print(&client.get_host_groups_details().await?),
        Command::SetupWebhook {
            url,
            token,
            user_id,
            username,
        } => {
            let zabbix = client
                .as_zabbix()
                .ok_or_else(|| anyhow!("webhook setup needs a Zabbix monitor"))?;
            let mut setup = WebhookSetup::new(url, token);
            setup.user_id = user_id;
            setup.username = username;
            print(&zabbix.setup_webhook_media_action_and_user(&setup).await?)
        }
        other => Err(anyhow!("{other:?} does not run against a single monitor")),
    }
}

/// The selected monitor from the config file, or Zabbix from the environment.
fn monitor_config(args: &Args) -> anyhow::Result<Config> {
    let Some(path) = &args.file else {
        return zabbix_config_from_env()
            .ok_or_else(|| anyhow!("no config file given and ZABBIX_URL is not set"));
    };

    let config = read_config_file(path)?;
    let found = match &args.monitor {
        Some(name) => config.find(name),
        None => config.monitors.first(),
    };
    found
        .cloned()
        .ok_or_else(|| anyhow!("monitor not found in {path}"))
}

fn snmp_config(
    community: String,
    version: &str,
    port: u16,
    oids: &[String],
    discovery: bool,
) -> anyhow::Result<Config> {
    let version = match version.to_ascii_lowercase().as_str() {
        "v1" | "1" => SnmpVersion::V1,
        "v2c" | "2c" | "2" => SnmpVersion::V2c,
        "v3" | "3" => SnmpVersion::V3,
        other => return Err(anyhow!("unknown SNMP version {other:?}")),
    };
    let custom_oids = oids
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(oid, name)| (oid.trim().to_string(), name.trim().to_string()))
                .ok_or_else(|| anyhow!("expected OID=Name, got {pair:?}"))
        })
        .collect::<anyhow::Result<HashMap<_, _>>>()?;

    let snmp = SnmpConfig {
        community,
        version,
        port,
        custom_oids,
        discovery,
        ..Default::default()
    };
    Ok(Config::new("snmp", MonitorType::Snmp, AuthConfig::default()).with_snmp(snmp))
}

fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
