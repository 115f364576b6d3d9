//! exthub - browse, install and toggle API client extensions

mod output;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use exthub_core::extensions::{ExtensionService, InstallRequest, ListKind};
use exthub_core::HubConfig;

#[derive(Parser, Debug)]
#[command(name = "exthub", version, about = "Manage API client extensions")]
struct Cli {
    /// Config file (defaults to the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Startup sync (the web host re-installs and adds defaults)
    Init,
    /// Catalog merged with installed and debug extensions
    List,
    /// One extension's details
    Detail { name: String },
    /// Installed extensions
    Installed,
    Install {
        name: String,
        #[arg(long, default_value = "latest")]
        version: String,
        /// Entry module override
        #[arg(long, default_value = "")]
        main: String,
    },
    Uninstall { name: String },
    Enable { name: String },
    Disable { name: String },
    /// Extensions contributing a feature (e.g. sidebarView)
    Features {
        key: String,
        /// Only enabled extensions
        #[arg(long)]
        valid: bool,
    },
    /// Sidebar contributions, or one extension's
    Sidebar { name: Option<String> },
    /// Entry point of an extension's package
    Package { name: String },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "exthub=debug,exthub_core=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn load_config(path: Option<&PathBuf>) -> Result<HubConfig> {
    let mut config = match path {
        Some(path) => HubConfig::load(path)
            .await
            .with_context(|| format!("loading {}", path.display()))?,
        None => HubConfig::load_default().await.context("loading config")?,
    };
    if path.is_some() {
        config.apply_env_overrides();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_ref()).await?;
    let mut service = ExtensionService::from_config(&config).await;
    tracing::debug!(
        "exthub: {} platform, registry {}",
        service.platform_kind(),
        config.registry_url
    );

    if !matches!(cli.command, Command::Init) {
        service.refresh().await;
    }

    match cli.command {
        Command::Init => {
            service.init().await.context("syncing extensions")?;
            output::records(service.installed_list(), cli.json)
        }
        Command::List => {
            let list = service
                .request_list(ListKind::List)
                .await
                .context("fetching extension catalog")?;
            output::records(&list, cli.json)
        }
        Command::Detail { name } => {
            let detail = service.get_detail(&name).await;
            output::json(&detail)
        }
        Command::Installed => output::records(service.installed_list(), cli.json),
        Command::Install {
            name,
            version,
            main,
        } => {
            let request = InstallRequest::new(&name)
                .with_version(version)
                .with_main(main);
            if !service.install(request).await {
                bail!("failed to install {name} (run with -v for details)");
            }
            println!("Installed {name}");
            Ok(())
        }
        Command::Uninstall { name } => {
            if !service.uninstall(&name).await {
                bail!("failed to uninstall {name} (run with -v for details)");
            }
            println!("Uninstalled {name}");
            Ok(())
        }
        Command::Enable { name } => {
            service.toggle_enable(&name, true).await?;
            println!("Enabled {name}");
            Ok(())
        }
        Command::Disable { name } => {
            service.toggle_enable(&name, false).await?;
            println!("Disabled {name}");
            Ok(())
        }
        Command::Features { key, valid } => {
            let features = if valid {
                service.valid_extensions_by_feature(&key).await
            } else {
                service.extensions_by_feature(&key).await
            };
            output::json(&features)
        }
        Command::Sidebar { name: Some(name) } => match service.sidebar_view(&name).await {
            Some(view) => output::json(&view),
            None => bail!("{name} has no sidebar view"),
        },
        Command::Sidebar { name: None } => output::json(&service.sidebar_views().await),
        Command::Package { name } => match service.extension_package(&name).await? {
            Some(entry) => {
                println!("{entry}");
                Ok(())
            }
            None => bail!("{name} is not installed"),
        },
    }
}
