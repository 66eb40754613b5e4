use std::{path::PathBuf, sync::Arc, time::Instant};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use console::style;
use lectern_core::{
    AppConfig, ClickPoint, HttpApi, LectureApi, LectureController, StartMode, Tab, VideoEntry,
    api::video_url,
    format::{format_clock, parse_position},
    session::{LogView, SUMMARY_PENDING},
    subtitles::SubtitleTrack,
    suggestions::{SuggestionBoard, parse_suggestions},
};
use tracing::debug;

use crate::{
    player::{SimulatedMedia, StillFrame},
    render::{
        create_spinner, error_line, format_duration, print_bubble, print_library, print_log,
        print_subtitles, print_suggestions, upload_progress,
    },
};

mod logging;
mod player;
mod render;
mod watch;

macro_rules! arg_env {
    ($v:literal) => {
        concat!("LECTERN_", $v)
    };
}

#[derive(Parser)]
#[command(name = "lectern")]
#[command(about = "Watch lecture videos with subtitles, ask the lecturer and explain frames")]
struct Cli {
    /// Backend address, e.g. http://127.0.0.1:5000
    #[arg(long, global = true, env = arg_env!("BASE_URL"))]
    base_url: Option<String>,

    /// Settings file. Defaults to lectern/config.toml in the user config directory
    #[arg(long, global = true, env = arg_env!("CONFIG"))]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn", env = arg_env!("LOG"))]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List uploaded videos
    List {
        /// Only names containing this text (case-insensitive)
        #[arg(long)]
        filter: Option<String>,
    },
    /// Upload a video and open it
    Upload { file: PathBuf },
    /// Delete a video from the backend
    Delete { name: String },
    /// Print the subtitles of a video
    Subtitles {
        name: String,
        /// Highlight the segment playing at this time (seconds or [H:]MM:SS)
        #[arg(long, value_parser = parse_time)]
        at: Option<f64>,
    },
    /// Suggested questions shown at a given time
    Suggestions {
        name: String,
        #[arg(long, value_parser = parse_time)]
        at: f64,
    },
    /// Ask the lecturer a question about a moment of the video
    Ask {
        name: String,
        #[arg(long, value_parser = parse_time, default_value = "0")]
        at: f64,
        /// Print the rendered HTML instead of the Markdown answer
        #[arg(long)]
        html: bool,
        #[arg(required = true, trailing_var_arg = true)]
        question: Vec<String>,
    },
    /// Explain a frame at a clicked point
    Explain {
        name: String,
        /// PNG of the frame; a blank 1280x720 canvas when omitted
        #[arg(long)]
        frame: Option<PathBuf>,
        #[arg(long, value_parser = parse_time, default_value = "0")]
        at: f64,
        /// Horizontal click position, 0..1
        #[arg(long, default_value_t = 0.5)]
        x: f64,
        /// Vertical click position, 0..1
        #[arg(long, default_value_t = 0.5)]
        y: f64,
        #[arg(long)]
        html: bool,
    },
    /// Print the lecture summary
    Summary {
        name: String,
        /// Keep polling while the summary is being generated
        #[arg(long)]
        wait: bool,
    },
    /// Print the backend processing log
    Log {
        name: String,
        /// Clear the log first
        #[arg(long)]
        clear: bool,
    },
    /// Interactive player on a simulated clock
    Watch {
        /// Video to open right away
        name: Option<String>,
        /// Open NAME in single-video mode (manual start, no log panel)
        #[arg(long, requires = "name", env = arg_env!("SINGLE"))]
        single: bool,
        /// Refuse unmuted autoplay until the first command, like a browser
        #[arg(long)]
        muted_autoplay: bool,
        /// Image used as the current frame for `explain`
        #[arg(long, env = arg_env!("FRAME"))]
        frame: Option<PathBuf>,
    },
}

fn parse_time(raw: &str) -> std::result::Result<f64, String> {
    parse_position(raw).map_err(|e| e.to_string())
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config =
        AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(url) = &cli.base_url {
        config.base_url = url.clone();
    }
    debug!(?config, "configuration");
    Ok(config)
}

fn entry_for(config: &AppConfig, name: &str) -> VideoEntry {
    VideoEntry {
        name: name.to_string(),
        url: video_url(&config.base_url, name),
    }
}

type Controller = LectureController<SimulatedMedia>;

/// Open `name` paused at `at`, the way the player is left after a seek.
async fn open_at(ctl: &mut Controller, name: &str, at: f64) {
    let video = entry_for(ctl.config(), name);
    ctl.load_video(video, StartMode::Paused).await;
    ctl.on_media_ready();
    ctl.player_mut().seek(at);
    ctl.on_time_update();
}

fn print_last_reply(ctl: &Controller, html: bool) -> Result<()> {
    let bubble = ctl
        .session()
        .and_then(|s| s.chat.bubbles().last())
        .ok_or_else(|| anyhow!("No reply"))?;
    print_bubble(bubble, html);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level)?;

    if let Err(e) = run(cli).await {
        error_line(&format!("{e:#}"));
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(&cli)?;
    let api: Arc<dyn LectureApi> = Arc::new(HttpApi::new(&config.base_url, config.request_timeout())?);

    match cli.command {
        Command::List { filter } => {
            let mut ctl = Controller::new(api, SimulatedMedia::new(false), config);
            ctl.refresh_videos().await;
            if let Some(filter) = filter {
                ctl.library_mut().set_filter(&filter);
            }
            print_library(ctl.library());
        }

        Command::Upload { file } => {
            let mut ctl = Controller::new(api, SimulatedMedia::new(false), config);
            let started = Instant::now();
            let spinner = create_spinner("Uploading...");
            let result = ctl
                .upload_file(&file, |overlay| spinner.set_message(upload_progress(overlay)))
                .await;
            match result {
                Ok(video) => spinner.finish_with_message(format!(
                    "{} Uploaded: {} {}",
                    style("✓").green().bold(),
                    style(&video.name).bold(),
                    style(format!("[{}]", format_duration(started.elapsed()))).dim()
                )),
                Err(e) => {
                    spinner.finish_and_clear();
                    bail!(ctl.take_notice().unwrap_or_else(|| e.to_string()));
                }
            }
        }

        Command::Delete { name } => {
            let mut ctl = Controller::new(api, SimulatedMedia::new(false), config);
            if let Err(e) = ctl.delete_video(&name).await {
                debug!(error = %e, "delete failed");
                bail!(ctl.take_notice().unwrap_or_else(|| e.to_string()));
            }
            println!("{} Deleted {}", style("✓").green().bold(), style(&name).bold());
        }

        Command::Subtitles { name, at } => {
            let mut track = SubtitleTrack::new(api.subtitles(&name).await?);
            if let Some(t) = at {
                track.sync(t);
            }
            print_subtitles(&track);
        }

        Command::Suggestions { name, at } => {
            let mut board = SuggestionBoard::with_cap(config.suggestion_cap);
            board.load(parse_suggestions(&api.suggestions(&name).await?));
            let active: Vec<_> = board.active_at(at).into_iter().cloned().collect();
            if active.is_empty() {
                println!("{}", style(format!("No suggestions at {}", format_clock(at))).dim());
            } else {
                print_suggestions(&active);
            }
        }

        Command::Ask {
            name,
            at,
            html,
            question,
        } => {
            let mut ctl = Controller::new(api, SimulatedMedia::new(false), config);
            open_at(&mut ctl, &name, at).await;
            let spinner = create_spinner("Asking the lecturer...");
            let sent = ctl.send_chat(&question.join(" ")).await;
            spinner.finish_and_clear();
            if !sent {
                bail!("Nothing to ask");
            }
            print_last_reply(&ctl, html)?;
        }

        Command::Explain {
            name,
            frame,
            at,
            x,
            y,
            html,
        } => {
            let mut ctl = Controller::new(api, SimulatedMedia::new(false), config);
            open_at(&mut ctl, &name, at).await;
            ctl.click_video(ClickPoint::new(x, y));
            let mut source = StillFrame::new(frame);
            let spinner = create_spinner("Explaining the frame...");
            let sent = ctl.explain_frame(&mut source).await;
            spinner.finish_and_clear();
            if !sent {
                bail!(ctl.take_notice().unwrap_or_else(|| "Nothing to explain".to_string()));
            }
            print_last_reply(&ctl, html)?;
        }

        Command::Summary { name, wait } => {
            let mut ctl = Controller::new(api, SimulatedMedia::new(false), config);
            open_at(&mut ctl, &name, 0.0).await;
            ctl.select_tab(Tab::About).await;

            let ready = |ctl: &Controller| ctl.session().is_some_and(|s| s.summary.is_ready());
            if wait && !ready(&ctl) {
                let spinner = create_spinner(SUMMARY_PENDING);
                let budget = ctl.config().poll_delay() * (ctl.config().summary_poll_attempts + 1);
                let deadline = tokio::time::Instant::now() + budget;
                while !ready(&ctl) {
                    match tokio::time::timeout_at(deadline, ctl.next_poll_event()).await {
                        Ok(Some(event)) => {
                            ctl.apply_poll_event(event);
                        }
                        _ => break,
                    }
                }
                spinner.finish_and_clear();
            }

            match ctl.session().map(|s| s.summary.display()) {
                Some(text) if !text.is_empty() => println!("{text}"),
                _ => println!("{}", style(SUMMARY_PENDING).dim()),
            }
        }

        Command::Log { name, clear } => {
            if clear {
                api.clear_logs(&name).await?;
            }
            let mut log = LogView::default();
            log.replace(api.logs(&name).await?);
            print_log(&log);
        }

        Command::Watch {
            name,
            single,
            muted_autoplay,
            frame,
        } => {
            if single {
                config.single_mode = true;
                config.single_name = name.clone();
            }
            let ctl = Controller::new(api, SimulatedMedia::new(muted_autoplay), config);
            let open = if single { None } else { name };
            watch::run(ctl, open, StillFrame::new(frame)).await?;
        }
    }

    Ok(())
}
