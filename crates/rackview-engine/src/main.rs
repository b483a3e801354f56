//! Rackview: command-line entry point.
//!
//! Renders racks from an inventory catalog and prints the result as JSON:
//! where each piece of equipment sits, which shapes of its layout stand for
//! which device, and what could not be placed.
//!
//! # Usage
//!
//! ```text
//! rackview [OPTIONS] [RACK_ID]...
//!
//! Options:
//!   --config <FILE>      Engine configuration [default: platform config dir]
//!   --inventory <FILE>   Inventory catalog (TOML)
//!   --audit              List every placement problem instead of rendering
//!   --pretty             Pretty-print the JSON output
//!   --init-config        Write the effective configuration to disk and exit
//! ```
//!
//! Without rack ids every rack of the inventory is rendered.
//!
//! # Environment variable overrides
//!
//! | Variable             | Description                          |
//! |----------------------|--------------------------------------|
//! | `RACKVIEW_CONFIG`    | Same as `--config`                   |
//! | `RACKVIEW_INVENTORY` | Same as `--inventory`                |
//! | `RUST_LOG`           | Log filter; overrides `log_level`    |
//!
//! # Concurrency
//!
//! Renders are synchronous.  Each rack gets its own blocking task on the Tokio
//! runtime and its own resolver caches; only the read-only catalog is shared.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use rackview_core::DeviceNode;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use rackview_engine::application::metadata::MetadataService;
use rackview_engine::application::render_rack::{RackRender, RackRenderer};
use rackview_engine::infrastructure::inventory::InventoryCatalog;
use rackview_engine::infrastructure::storage::config::{
    config_file_path, load_config, load_config_from, save_config, save_config_to, EngineConfig,
};

/// Class whose instances are rendered when no rack id is given.
const RACK_CLASS: &str = "Rack";

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Rack and device layout renderer.
#[derive(Debug, Parser)]
#[command(
    name = "rackview",
    about = "Renders rack and device layouts from an inventory catalog",
    version
)]
struct Cli {
    /// Engine configuration file.
    #[arg(long, env = "RACKVIEW_CONFIG")]
    config: Option<PathBuf>,

    /// Inventory catalog (TOML).  Falls back to `engine.inventory` in the
    /// configuration.
    #[arg(long, env = "RACKVIEW_INVENTORY")]
    inventory: Option<PathBuf>,

    /// List every placement problem of each rack instead of rendering it.
    #[arg(long)]
    audit: bool,

    /// Pretty-print the JSON report.
    #[arg(long)]
    pretty: bool,

    /// Write the effective configuration to the config file and exit.
    #[arg(long)]
    init_config: bool,

    /// Racks to render.
    rack_ids: Vec<String>,
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<EngineConfig> {
        let config = match &self.config {
            Some(path) => load_config_from(path),
            None => load_config(),
        };
        config.context("failed to load configuration")
    }

    fn inventory_path(&self, config: &EngineConfig) -> anyhow::Result<PathBuf> {
        self.inventory
            .clone()
            .or_else(|| config.engine.inventory.clone())
            .context(
                "no inventory given: pass --inventory or set engine.inventory in the configuration",
            )
    }
}

// ── Report ────────────────────────────────────────────────────────────────────

/// Outcome of one rack, as printed.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum RackReport {
    Rendered {
        render_id: Uuid,
        render: RackRender,
    },
    Audited {
        render_id: Uuid,
        rack: String,
        issues: Vec<String>,
    },
    Failed {
        render_id: Uuid,
        rack: String,
        error: String,
    },
}

impl RackReport {
    fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Renders or audits one rack inside its own tracing span.
fn run_rack(
    service: Arc<dyn MetadataService>,
    config: &EngineConfig,
    rack: &DeviceNode,
    audit: bool,
) -> RackReport {
    let render_id = Uuid::new_v4();
    let span = tracing::info_span!("render", %render_id, rack = %rack.id);
    let _guard = span.enter();

    let renderer = RackRenderer::new(service)
        .with_geometry(config.rack.to_geometry())
        .with_resize_border(config.layout.resize_border)
        .with_original_size(config.layout.original_size);

    let report = if audit {
        renderer.audit_rack(rack).map(|issues| RackReport::Audited {
            render_id,
            rack: rack.id.clone(),
            issues,
        })
    } else {
        renderer
            .render_rack(rack)
            .map(|render| RackReport::Rendered { render_id, render })
    };

    report.unwrap_or_else(|e| {
        tracing::error!("{e}");
        RackReport::Failed {
            render_id,
            rack: rack.id.clone(),
            error: e.to_string(),
        }
    })
}

fn select_racks(catalog: &InventoryCatalog, ids: &[String]) -> anyhow::Result<Vec<DeviceNode>> {
    if ids.is_empty() {
        return Ok(catalog.objects_of_class(RACK_CLASS));
    }
    ids.iter()
        .map(|id| catalog.device_node(id).with_context(|| format!("unknown rack '{id}'")))
        .collect()
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    // ── Logging setup ─────────────────────────────────────────────────────────
    //
    // `RUST_LOG` wins; otherwise the configured level applies.  Logs go to
    // stderr so stdout carries only the JSON report.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.engine.log_level)),
        )
        .init();

    if cli.init_config {
        let written = match &cli.config {
            Some(path) => save_config_to(&config, path).map(|()| path.clone()),
            None => save_config(&config).and_then(|()| config_file_path()),
        };
        let path = written.context("failed to write configuration")?;
        info!("configuration written to {}", path.display());
        return Ok(());
    }

    let inventory_path = cli.inventory_path(&config)?;
    let catalog = InventoryCatalog::load(&inventory_path)
        .with_context(|| format!("failed to load inventory {}", inventory_path.display()))?;
    let racks = select_racks(&catalog, &cli.rack_ids)?;
    let service: Arc<dyn MetadataService> = Arc::new(catalog);

    info!(racks = racks.len(), audit = cli.audit, "rackview starting");

    // ── One blocking task per rack ────────────────────────────────────────────
    let mut tasks = Vec::with_capacity(racks.len());
    for rack in racks {
        let service = Arc::clone(&service);
        let config = config.clone();
        let audit = cli.audit;
        tasks.push(tokio::task::spawn_blocking(move || {
            run_rack(service, &config, &rack, audit)
        }));
    }

    let mut reports = Vec::with_capacity(tasks.len());
    for task in tasks {
        reports.push(task.await.context("render task panicked")?);
    }

    let json = if cli.pretty {
        serde_json::to_string_pretty(&reports)?
    } else {
        serde_json::to_string(&reports)?
    };
    println!("{json}");

    let failed = reports.iter().filter(|r| r.is_failure()).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} racks could not be rendered", reports.len());
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
