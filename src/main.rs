//! server-stats: print a one-shot health report for this host and exit.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use log::debug;

use server_stats_lib::report::{render_error, Palette};
use server_stats_lib::{generate, OutputFormat, ReportConfig, Sources};

#[derive(Parser)]
#[command(name = "server-stats")]
#[command(about = "Point-in-time CPU, memory, disk and process snapshot")]
#[command(version)]
struct Cli {
    /// Suppress ANSI color escapes
    #[arg(long)]
    no_color: bool,

    /// Emit the snapshot as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Rows in each process ranking
    #[arg(long, default_value_t = 5)]
    top: usize,
}

impl Cli {
    fn into_config(self) -> ReportConfig {
        let mut config = ReportConfig::from_env();
        if self.no_color {
            config.color = false;
        }
        if self.json {
            config.output = OutputFormat::Json;
        }
        config.top_n = self.top;
        config
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = Cli::parse().into_config();
    let mut sources = Sources::system(&config);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match generate(&config, &mut sources, &mut out) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            debug!("report aborted: {:?}", err);
            eprintln!("{}", render_error(&Palette::new(config.color), &err));
            ExitCode::from(1)
        }
    }
}
