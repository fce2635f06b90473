use anyhow::Context;
use clap::{Parser, Subcommand};
use nicefigs::{Override, RenderOptions, diagnostics, load, render_with};
use std::path::PathBuf;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "nicefigs")]
#[command(version = nicefigs::VERSION)]
#[command(about = "Render publication-quality figures from YAML/JSON specs", long_about = None)]
struct Cli {
    /// Log debug detail (overridden by NICEFIGS_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a figure document and write every requested format.
    Render {
        /// Figure document (.yaml, .yml or .json).
        config: PathBuf,

        /// Output path, relative to the working directory. Replaces export.path.
        #[arg(short = 'o', long)]
        out: Option<PathBuf>,

        /// Dot-path assignment applied before rendering, e.g. panels.0.axes.title=Latency.
        #[arg(long = "override", value_name = "KEY=VALUE")]
        overrides: Vec<Override>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    diagnostics::init_logging(cli.verbose);

    match cli.cmd {
        Commands::Render {
            config,
            out,
            overrides,
        } => {
            let mut spec = load(config.as_path())
                .with_context(|| diagnostics::error_message(format!("load {}", config.display())))?;
            if !overrides.is_empty() {
                spec = spec
                    .with_overrides(&overrides)
                    .context(diagnostics::error_message("apply overrides"))?;
            }

            let mut options = RenderOptions::default();
            if let Some(out) = out {
                options = options.with_out(out);
            }
            let written = render_with(&spec, &options)
                .with_context(|| diagnostics::error_message(format!("render {}", config.display())))?;
            for path in written {
                println!("Wrote {}", path.display());
            }
        }
    }

    Ok(())
}
