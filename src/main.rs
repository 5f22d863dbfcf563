use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use serde::Serialize;

use statgraph::csv_reader;
use statgraph::{
    AggregateResult, ChartKind, ChartTable, ColorAssignment, ColorPalette, Config,
    Dataset, Panel, Selection,
};

#[derive(Parser, Debug)]
#[command(name = "statgraph")]
#[command(about = "Aggregate a cars-style dataset into chart-ready JSON", long_about = None)]
struct Args {
    /// CSV or JSON file with one record per row, or '-' for CSV on stdin
    input: String,

    /// Dashboard panel (1-4); defaults to every panel
    #[arg(long)]
    panel: Option<Panel>,

    /// Chart kind for the panel (e.g. 'violin', 'grouped-bar'); defaults to the
    /// panel's first chart
    #[arg(long, requires = "panel")]
    chart: Option<ChartKind>,

    /// JSON config overriding field names and statistical options
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Serialize)]
struct ChartOutput {
    panel: Panel,
    chart: ChartKind,
    colors: Option<ColorAssignment>,
    result: AggregateResult,
}

fn selections(table: &ChartTable, panel: Option<Panel>, chart: Option<ChartKind>) -> Result<Vec<Selection>> {
    let panels = match panel {
        Some(p) => vec![p],
        None => Panel::ALL.to_vec(),
    };

    let mut out = Vec::with_capacity(panels.len());
    for p in panels {
        let kind = match chart.or_else(|| table.default_kind(p)) {
            Some(k) => k,
            None => bail!("panel {} has no charts", p),
        };
        let selection = table
            .select(p, kind)
            .with_context(|| format!("Invalid selection for panel {}", p))?;
        out.push(selection);
    }
    Ok(out)
}

fn load_dataset(input: &str) -> Result<Dataset> {
    if input == "-" {
        csv_reader::read_csv_from_stdin().context("Failed to read CSV from stdin")
    } else {
        csv_reader::load_path(Path::new(input)).with_context(|| format!("Failed to load '{}'", input))
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = Config::load(args.config.as_deref()).context("Failed to load config")?;
    let table = ChartTable::standard(&config).context("Invalid chart table")?;

    // Selections are checked before touching the data
    let selections = selections(&table, args.panel, args.chart)?;

    let dataset = load_dataset(&args.input)?;
    info!("Loaded {} rows with {} columns", dataset.len(), dataset.headers().len());

    let palette = ColorPalette::category10();
    let outputs: Vec<ChartOutput> = selections
        .iter()
        .map(|selection| {
            let colors = selection.aggregation().color_assignment(&dataset, &palette);
            ChartOutput {
                panel: selection.panel(),
                chart: selection.kind(),
                colors,
                result: table.aggregate(selection, &dataset),
            }
        })
        .collect();

    let json = match (args.panel.is_some(), args.pretty) {
        (true, true) => serde_json::to_string_pretty(&outputs[0]),
        (true, false) => serde_json::to_string(&outputs[0]),
        (false, true) => serde_json::to_string_pretty(&outputs),
        (false, false) => serde_json::to_string(&outputs),
    }
    .context("Failed to serialize output")?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", json).context("Failed to write output to stdout")?;
    handle.flush().context("Failed to flush stdout")?;

    Ok(())
}
