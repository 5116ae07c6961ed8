//! muve: terminal front end for the MUVE query backend.
//! Reads config, builds a connector for the chosen feature, sends one query
//! (positional argument or first line of stdin) and prints the responses.

use clap::Parser;
use muve_client::config::{self, Feature};
use muve_client::{Connector, QueryMessage, RenderAction, RenderMode, ResponseFrame, TransportKind};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(name = "muve", about = "Send a natural-language query to a MUVE backend")]
struct Args {
    /// Config file (defaults to $MUVE_CONFIG, then ~/.muve/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Backend feature: engine, baseline or study
    #[arg(long, default_value = "engine")]
    feature: Feature,

    /// Dataset the query runs against (engine and baseline)
    #[arg(long)]
    dataset: Option<String>,

    /// Visualization width forwarded to the planner
    #[arg(long)]
    width: Option<u32>,

    /// Planner name forwarded to the backend
    #[arg(long)]
    planner: Option<String>,

    /// Response interpretation: default, incremental or approximate
    #[arg(long, default_value = "default")]
    mode: RenderMode,

    /// Exit after this many responses
    #[arg(long, default_value_t = 1)]
    responses: usize,

    /// Seconds to wait for each response
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Query text; read from stdin when omitted
    question: Option<String>,
}

fn resolve_config_path(flag: Option<PathBuf>) -> PathBuf {
    if let Some(path) = flag {
        return path;
    }
    if let Ok(val) = std::env::var("MUVE_CONFIG") {
        return PathBuf::from(val);
    }
    config::default_config_path().unwrap_or_else(|| {
        eprintln!("Error: unable to determine config path (set --config or MUVE_CONFIG)");
        process::exit(1);
    })
}

fn read_question(arg: Option<String>) -> String {
    if let Some(q) = arg {
        return q.trim().to_string();
    }
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).unwrap_or(0);
    line.trim().to_string()
}

/// Callback for `mode`: classifies each payload and forwards it to the printer.
fn render_callback(
    mode: RenderMode,
    tx: mpsc::UnboundedSender<(Option<RenderAction>, String)>,
) -> impl Fn(String) + Send + Sync + 'static {
    let last_timestamp: Mutex<Option<serde_json::Value>> = Mutex::new(None);
    move |payload: String| {
        let action = match ResponseFrame::parse(&payload) {
            Ok(frame) => {
                let mut last = last_timestamp.lock().unwrap_or_else(|e| e.into_inner());
                Some(mode.interpret(&frame, &mut *last))
            }
            Err(e) => {
                tracing::debug!(error = %e, "response is not a result frame");
                None
            }
        };
        let _ = tx.send((action, payload));
    }
}

fn print_response(out: &mut impl Write, action: Option<RenderAction>, payload: &str) {
    let _ = match action {
        Some(RenderAction::NoResults { debug }) => match debug {
            Some(template) => writeln!(out, "No results for {}", template),
            None => writeln!(out, "No results"),
        },
        Some(RenderAction::NewPlotSet) => writeln!(out, "-- new plot set --\n{}", payload),
        Some(RenderAction::UpdatePlot { name: Some(name) }) => writeln!(out, "[{}] {}", name, payload),
        _ => writeln!(out, "{}", payload),
    };
    let _ = out.flush();
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "muve=info,muve_client=info".into()),
        )
        .init();

    let args = Args::parse();
    let config_path = resolve_config_path(args.config.clone());

    let cfg = match config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: failed to load config from {}: {}", config_path.display(), e);
            process::exit(1);
        }
    };

    let question = read_question(args.question.clone());
    if question.is_empty() {
        eprintln!("Error: no question provided");
        process::exit(1);
    }

    let message = match args.feature {
        Feature::Study => question,
        Feature::Engine | Feature::Baseline => {
            let Some(dataset) = args.dataset.clone() else {
                eprintln!("Error: --dataset is required for the {:?} feature", args.feature);
                process::exit(1);
            };
            let mut msg = QueryMessage::new(dataset, question);
            msg.width = args.width;
            msg.planner = args.planner.clone();
            msg.encode()
        }
    };

    let endpoint = cfg.endpoint_for(args.feature);
    let kind = cfg.transport_for(args.feature);
    tracing::info!(endpoint = %endpoint, kind = %kind, "sending query");

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("Error: failed to create runtime: {}", e);
            process::exit(1);
        });

    rt.block_on(async {
        let (tx, mut rx) = mpsc::unbounded_channel();
        // Request/response callbacks are fixed at construction; persistent
        // ones start in default mode and are swapped to the chosen mode.
        let initial_mode = match kind {
            TransportKind::RequestResponse => args.mode,
            TransportKind::Persistent => RenderMode::Default,
        };
        let connector = Connector::with_policy(
            endpoint,
            kind,
            render_callback(initial_mode, tx.clone()),
            cfg.queue_policy(),
        );
        if args.mode != initial_mode {
            if let Err(e) = connector.set_callback(render_callback(args.mode, tx.clone())) {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
        drop(tx);

        connector.send(message);

        let stdout = io::stdout();
        let mut out = stdout.lock();
        for _ in 0..args.responses {
            match tokio::time::timeout(Duration::from_secs(args.timeout), rx.recv()).await {
                Ok(Some((action, payload))) => print_response(&mut out, action, &payload),
                Ok(None) => break,
                Err(_) => {
                    eprintln!("Error: no response from {} (connection failed or timed out)", connector.endpoint());
                    process::exit(1);
                }
            }
        }
    });
}
