mod app;
mod color;
mod state;
mod ui;

use std::path::PathBuf;

use anyhow::Context;
use app::SpcViewerApp;
use clap::Parser;
use eframe::egui;
use log::{info, LevelFilter};
use spc_viewer::data::loader::load_file;
use spc_viewer::data::mock::{history_data, MockConfig};
use spc_viewer::{Dashboard, DatasetStore};
use state::AppState;

#[derive(Debug, Parser)]
#[command(author, version, about, disable_help_subcommand = true)]
struct Args {
    /// Dataset to open at start (.parquet, .json or .csv); mock data when absent
    #[arg(long, env = "SPC_DATA")]
    data: Option<PathBuf>,
    /// Mock rows generated per table
    #[arg(long, env = "SPC_ROWS_PER_TABLE", default_value_t = 100)]
    rows_per_table: usize,
    /// Comma-separated mock table names
    #[arg(long, env = "SPC_TABLES", value_delimiter = ',', default_value = "A,B,C")]
    tables: Vec<String>,
    /// Seed for the mock metric generator
    #[arg(long, env = "SPC_SEED", default_value_t = 42)]
    seed: u64,
    /// Rows per table page
    #[arg(long, env = "SPC_PAGE_SIZE", default_value_t = 5)]
    page_size: usize,
    /// Log debug output from the viewer
    #[arg(long, env = "SPC_DEBUG_MODE")]
    debug: bool,
}

fn main() -> eframe::Result {
    let args = Args::parse();
    init_logging(args.debug);

    let mut status_message = None;
    let store = match &args.data {
        Some(path) => match load_file(path).with_context(|| format!("loading {}", path.display())) {
            Ok(store) => store,
            Err(e) => {
                log::error!("{e:#}; falling back to generated data");
                status_message = Some(format!("Error: {e:#}"));
                mock_store(&args)
            }
        },
        None => mock_store(&args),
    };
    info!(
        "starting spc-viewer with {} points in tables {:?}",
        store.len(),
        store.table_names()
    );

    let mut state = AppState::new(Dashboard::new(store), args.page_size);
    state.status_message = status_message;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 860.0])
            .with_min_inner_size([700.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "SPC UI",
        options,
        Box::new(|_cc| Ok(Box::new(SpcViewerApp::new(state)))),
    )
}

fn mock_store(args: &Args) -> DatasetStore {
    let config = MockConfig {
        tables: args.tables.clone(),
        rows_per_table: args.rows_per_table,
        seed: args.seed,
    };
    // Generated ids are consecutive, so they are always unique.
    DatasetStore::new(history_data(&config)).unwrap_or_default()
}

fn init_logging(debug: bool) {
    if std::env::var_os("RUST_LOG").is_some() {
        env_logger::Builder::from_default_env().init();
    } else {
        let level = if debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        };
        env_logger::Builder::new()
            .filter_level(LevelFilter::Warn)
            .filter_module("spc_viewer", level)
            .init();
    }
}
