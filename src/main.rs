use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use trimscript::config::{self, TrimConfig};
use trimscript::intervals::file::read_interval_file;
use trimscript::intervals::plan::PlanPolicy;
use trimscript::media::ffmpeg::Ffmpeg;
use trimscript::media::MediaTool;
use trimscript::output::{json as json_out, table};
use trimscript::pipeline::{self, RenderOptions, RunConfig, RunReport, Strategy};
use trimscript::transcript;

#[derive(Parser)]
#[command(name = "trimscript", version, about = "Transcript-driven video trimming: flag spoken content, cut it with ffmpeg")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Path to config file (default: ~/.trimscript/config.toml)
    #[arg(long, global = true, env = "TRIMSCRIPT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct ClassifierArgs {
    /// Keyword list: one keyword per line, matched case-sensitively
    #[arg(long, conflicts_with = "judge")]
    keywords: Option<PathBuf>,

    /// Ask the judgment service configured under [judgment]
    #[arg(long)]
    judge: bool,

    /// API key for the judgment service
    #[arg(long)]
    api_key: Option<String>,

    /// Keep only flagged content instead of removing it
    #[arg(long)]
    keep_flagged: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a transcript and render the trimmed video
    Run {
        /// Source video or audio file
        source: PathBuf,

        /// Transcript file (bracketed lines or WebVTT blocks)
        transcript: PathBuf,

        /// Output media file
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        classifier: ClassifierArgs,

        /// Also write the planned intervals to this file
        #[arg(long)]
        intervals: Option<PathBuf>,

        /// Parallel extraction workers
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Classify a transcript and write the planned intervals, without rendering
    Detect {
        /// Transcript file
        transcript: PathBuf,

        #[command(flatten)]
        classifier: ClassifierArgs,

        /// Probe this media file for its duration
        #[arg(long, conflicts_with = "duration")]
        source: Option<PathBuf>,

        /// Media duration in seconds (or HH:MM:SS.mmm)
        #[arg(long)]
        duration: Option<String>,

        /// Interval file to write
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Render intervals from a previously written interval file
    Render {
        /// Source video or audio file
        source: PathBuf,

        /// Interval file (`start end` per line)
        intervals: PathBuf,

        /// Output media file
        #[arg(short, long)]
        output: PathBuf,

        /// Treat the listed intervals as content to cut out
        #[arg(long)]
        invert: bool,

        /// Parallel extraction workers
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Print a transcript's spoken text without timestamps
    Text {
        /// Transcript file
        transcript: PathBuf,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Create ~/.trimscript/config.toml from the template
    Init,
    /// Show the active configuration (secrets redacted)
    Show,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::Level::WARN.into())
                .from_env_lossy(),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json_output = cli.json;

    let cfg = match cli.config {
        Some(ref path) => TrimConfig::load_from(path)?,
        None => TrimConfig::load()?,
    };

    match cli.command {
        Commands::Run {
            source,
            transcript,
            output,
            classifier,
            intervals,
            workers,
        } => {
            let strategy = strategy_for(&classifier, &cfg)?;
            let run_config = RunConfig {
                source,
                transcript,
                output,
                policy: policy_for(classifier.keep_flagged),
                intervals_file: intervals,
                render: render_options(&cfg, workers),
            };
            let tool = media_tool(&cfg);
            let outcome = pipeline::build_classifier(&strategy)
                .and_then(|c| pipeline::run(&run_config, c.as_ref(), &tool));
            report(outcome, json_output)?;
        }

        Commands::Detect {
            transcript,
            classifier,
            source,
            duration,
            output,
        } => {
            // A failed probe is a pipeline failure and goes through `report`;
            // a bad --duration is a usage error.
            let media_duration = match (source, duration) {
                (Some(src), _) => media_tool(&cfg).probe_duration(&src),
                (None, Some(d)) => Ok(transcript::timestamp::parse(&d)
                    .with_context(|| format!("Invalid --duration: {d}"))?),
                (None, None) => bail!("Provide --source or --duration to bound the plan."),
            };
            let strategy = strategy_for(&classifier, &cfg)?;
            let outcome = media_duration.and_then(|media_duration| {
                let c = pipeline::build_classifier(&strategy)?;
                pipeline::detect(
                    &transcript,
                    c.as_ref(),
                    media_duration,
                    policy_for(classifier.keep_flagged),
                    &output,
                )
            });
            report(outcome, json_output)?;
        }

        Commands::Render {
            source,
            intervals,
            output,
            invert,
            workers,
        } => {
            let policy = if invert {
                PlanPolicy::RemoveFlagged
            } else {
                PlanPolicy::KeepFlagged
            };
            let tool = media_tool(&cfg);
            let outcome = read_interval_file(&intervals).and_then(|listed| {
                pipeline::render_intervals(
                    &source,
                    listed,
                    policy,
                    &output,
                    &tool,
                    &render_options(&cfg, workers),
                )
            });
            report(outcome, json_output)?;
        }

        Commands::Text { transcript, output } => {
            let records = transcript::read(&transcript)?;
            let text = transcript::text::to_plain_text(&records);
            match output {
                Some(path) => {
                    std::fs::write(&path, format!("{text}\n"))
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    eprintln!("Wrote {} lines to {}", records.len(), path.display());
                }
                None => println!("{text}"),
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Init => {
                let path = config::config_path()?;
                if config::init_config()? {
                    println!("Created {}", path.display());
                } else {
                    println!("Config already exists: {}", path.display());
                }
            }
            ConfigAction::Show => {
                if json_output {
                    json_out::print_json(&cfg.redacted())?;
                } else {
                    println!("{}", cfg.display_redacted());
                }
            }
        },
    }

    Ok(())
}

fn strategy_for(args: &ClassifierArgs, cfg: &TrimConfig) -> Result<Strategy> {
    match (&args.keywords, args.judge) {
        (Some(path), false) => Ok(Strategy::Keywords(path.clone())),
        (None, true) => {
            let api_key = config::resolve_api_key(args.api_key.as_deref(), &cfg.judgment)?;
            Ok(Strategy::Judgment(cfg.judgment.to_options(api_key)))
        }
        _ => bail!("Choose a classifier: --keywords FILE or --judge"),
    }
}

fn policy_for(keep_flagged: bool) -> PlanPolicy {
    if keep_flagged {
        PlanPolicy::KeepFlagged
    } else {
        PlanPolicy::RemoveFlagged
    }
}

fn media_tool(cfg: &TrimConfig) -> Ffmpeg {
    Ffmpeg::new(&cfg.media.ffmpeg, &cfg.media.ffprobe, cfg.encode.clone())
}

fn render_options(cfg: &TrimConfig, workers: Option<usize>) -> RenderOptions {
    RenderOptions {
        work_dir: cfg.media.work_dir(),
        workers: workers.unwrap_or(cfg.media.workers).max(1),
        verify: true,
    }
}

/// Print a run report, or the failing stage and its error.
fn report(outcome: trimscript::Result<RunReport>, json_output: bool) -> Result<()> {
    match outcome {
        Ok(report) => {
            if json_output {
                json_out::print_json(&report)?;
            } else {
                table::print_run_report(&report);
            }
            Ok(())
        }
        Err(err) => {
            if json_output {
                json_out::print_json(&json_out::error_json(&err))?;
            }
            let stage = err.stage().to_string();
            Err(anyhow::Error::new(err).context(format!("{stage} stage failed")))
        }
    }
}
