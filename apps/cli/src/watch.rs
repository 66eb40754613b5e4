use std::time::Duration;

use anyhow::Result;
use console::style;
use lectern_core::{
    ClickPoint, Gesture, LectureController, MediaElement, Tab,
    format::parse_position,
    frame::{Size, place_tooltip},
    polling::PollOutcome,
    session::Session,
};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    player::{SimulatedMedia, StillFrame},
    render::{
        create_spinner, error_line, print_bubble, print_library, print_log, print_subtitles,
        print_suggestions,
    },
};

type Controller = LectureController<SimulatedMedia>;

const TICK: Duration = Duration::from_millis(250);
/// Screen size assumed for tooltip placement
const SCREEN: Size = Size {
    width: 1280.0,
    height: 720.0,
};

const HELP: &str = "\
commands:
  list [filter]        show uploaded videos
  open <name>          open a video
  start                press the start control
  play | pause         control playback
  toggle               play if paused, pause if playing
  seek <time>          jump to seconds or [H:]MM:SS
  speed <rate>         playback rate
  volume <0..1>        volume
  subs [n]             show subtitles, or jump to row n
  ask <question>       ask the lecturer
  suggest <n>          ask the n-th visible suggestion
  click <x> <y>        click the video (0..1, or pixels of 1280x720)
  explain              explain the frame at the last click
  replay <n>           show the marker of chat entry n again
  tab <chat|about|log> switch panel
  clearlog             clear the processing log
  status               playback state
  delete <name>        delete a video
  close                close the video
  quit                 leave";

/// Interactive session: stdin commands, poll results and the playback
/// clock are handled on one task.
pub async fn run(mut ctl: Controller, open: Option<String>, mut frame: StillFrame) -> Result<()> {
    println!(
        "\n{}  {}\n",
        style("lectern").cyan().bold(),
        style("Lecture Player").dim()
    );

    ctl.init().await;
    if let Some(name) = open {
        if let Err(e) = ctl.open(&name).await {
            error_line(&e.to_string());
        }
    }
    if ctl.session().is_none() {
        print_library(ctl.library());
    }
    after_load(&mut ctl);
    println!("{}", style("type `help` for commands").dim());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tick = tokio::time::interval(TICK);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle(&mut ctl, &mut frame, line.trim()).await {
                    break;
                }
                if let Some(notice) = ctl.take_notice() {
                    error_line(&notice);
                }
            }
            Some(event) = ctl.next_poll_event() => {
                let subtitles = matches!(event.outcome, PollOutcome::Subtitles(_));
                if ctl.apply_poll_event(event) {
                    if subtitles {
                        sync_duration(&mut ctl);
                        println!("{}", style("Subtitles are ready").green());
                    } else {
                        println!("{}", style("Summary is ready").green());
                        if let Some(session) = ctl.session().filter(|s| s.tab == Tab::About) {
                            println!("{}", session.summary.display());
                        }
                    }
                }
            }
            _ = tick.tick() => on_tick(&mut ctl),
        }
    }
    Ok(())
}

fn on_tick(ctl: &mut Controller) {
    let update = ctl.on_time_update();
    let Some(session) = ctl.session() else {
        return;
    };
    if update.subtitle_changed {
        if let Some(seg) = session.subtitles.active_segment() {
            println!("{} {}", style("»").dim(), seg.text);
        }
    }
    if let Some(items) = update.suggestions.filter(|items| !items.is_empty()) {
        println!("{}", style("suggestions:").dim());
        print_suggestions(&items);
    }
}

/// Without a decoder the subtitle track is the best guess at the length.
fn sync_duration(ctl: &mut Controller) {
    let end = ctl
        .session()
        .and_then(|s| s.subtitles.segments().last())
        .map(|seg| seg.end);
    if let Some(end) = end {
        if !ctl.player().media().duration().is_finite() {
            ctl.player_mut().media_mut().set_duration(end);
        }
    }
}

fn after_load(ctl: &mut Controller) {
    if ctl.session().is_none() {
        return;
    }
    ctl.on_media_ready();
    sync_duration(ctl);
    if let Some(session) = ctl.session() {
        println!("{} {}", style("▶").green().bold(), style(session.name()).bold());
        if session.subtitles.is_empty() {
            println!("{}", style("Subtitles are being generated...").dim());
        }
    }
    if ctl.player().start_control_visible() {
        println!("{}", style("type `start` to play with sound").dim());
    }
    if ctl.player().unmute_visible() {
        println!("{}", style("playing muted, any command turns the sound on").dim());
    }
}

fn print_status(ctl: &Controller) {
    let player = ctl.player();
    println!(
        "{} {}  {:?}  volume {:.2}  speed {}x",
        player.play_pause_label(),
        player.time_display(),
        player.state(),
        player.media().volume(),
        player.media().rate()
    );
}

fn print_tab(session: &Session) {
    match session.tab {
        Tab::Chat => {
            for (i, bubble) in session.chat.bubbles().iter().enumerate() {
                print!("{} ", style(format!("{:>2}", i + 1)).dim());
                print_bubble(bubble, false);
            }
        }
        Tab::About => println!("{}", session.summary.display()),
        Tab::Log => print_log(&session.log),
    }
}

fn parse_index(arg: &str) -> Option<usize> {
    arg.trim().parse::<usize>().ok().filter(|n| *n > 0).map(|n| n - 1)
}

/// Returns `false` when the user asked to leave.
async fn handle(ctl: &mut Controller, frame: &mut StillFrame, line: &str) -> bool {
    if line.is_empty() {
        return true;
    }

    ctl.player_mut().media_mut().note_gesture();
    if ctl.player_mut().on_gesture(Gesture::Key) {
        println!("{}", style("sound on").dim());
    }

    let (cmd, arg) = line.split_once(' ').unwrap_or((line, ""));
    let arg = arg.trim();
    match cmd {
        "quit" | "exit" => return false,
        "help" => println!("{HELP}"),
        "list" => {
            ctl.refresh_videos().await;
            ctl.library_mut().set_filter(arg);
            print_library(ctl.library());
        }
        "open" => match ctl.open(arg).await {
            Ok(()) => after_load(ctl),
            Err(e) => error_line(&e.to_string()),
        },
        "start" => ctl.player_mut().press_start(),
        "play" => {
            if let Err(e) = ctl.player_mut().play() {
                error_line(&e.to_string());
            }
        }
        "pause" => ctl.player_mut().pause(),
        "toggle" => {
            ctl.player_mut().toggle();
            println!("{}", ctl.player().play_pause_label());
        }
        "seek" => match parse_position(arg) {
            Ok(t) => {
                ctl.player_mut().seek(t);
                on_tick(ctl);
            }
            Err(e) => error_line(&e.to_string()),
        },
        "speed" => ctl.player_mut().set_speed_input(arg),
        "volume" => ctl.player_mut().set_volume_input(arg),
        "status" => print_status(ctl),
        "subs" => {
            if let Some(index) = parse_index(arg) {
                ctl.select_subtitle(index);
            }
            if let Some(session) = ctl.session() {
                print_subtitles(&session.subtitles);
            }
        }
        "ask" => {
            let spinner = create_spinner("Asking the lecturer...");
            let sent = ctl.send_chat(arg).await;
            spinner.finish_and_clear();
            if sent {
                print_last(ctl);
            }
        }
        "suggest" => {
            let t = ctl.player().current_time();
            let key = parse_index(arg).and_then(|i| {
                ctl.session()
                    .and_then(|s| s.suggestions.active_at(t).get(i).map(|it| it.key.clone()))
            });
            match key {
                Some(key) => {
                    let spinner = create_spinner("Asking the lecturer...");
                    let sent = ctl.choose_suggestion(&key).await;
                    spinner.finish_and_clear();
                    if sent {
                        print_last(ctl);
                    }
                }
                None => error_line("No such suggestion"),
            }
        }
        "click" => {
            let coords: Vec<f64> = arg
                .split_whitespace()
                .filter_map(|v| v.parse().ok())
                .collect();
            let &[x, y] = coords.as_slice() else {
                error_line("usage: click <x> <y>");
                return true;
            };
            // values above 1 are pixels on the assumed screen
            let point = if x > 1.0 || y > 1.0 {
                ClickPoint::from_pixels(x, y, SCREEN.width, SCREEN.height)
            } else {
                ClickPoint::new(x, y)
            };
            ctl.click_video(point);
            let now = tokio::time::Instant::now();
            if ctl.session().is_some_and(|s| s.tooltip(now).is_some()) {
                let (tx, ty) = place_tooltip(point, SCREEN, Size { width: 0.0, height: 0.0 });
                println!(
                    "{}",
                    style(format!("tooltip at ({tx:.0}, {ty:.0}): `explain` to ask about it")).dim()
                );
            }
        }
        "explain" => {
            let spinner = create_spinner("Explaining the frame...");
            let sent = ctl.explain_frame(frame).await;
            spinner.finish_and_clear();
            if sent {
                print_last(ctl);
            }
        }
        "replay" => match parse_index(arg).and_then(|i| ctl.select_chat_entry(i)) {
            Some(point) => println!(
                "{}",
                style(format!("marker at ({:.2}, {:.2})", point.x, point.y)).red()
            ),
            None => error_line("That entry has no frame"),
        },
        "tab" => match Tab::parse(arg) {
            Some(tab) => {
                if ctl.select_tab(tab).await {
                    if let Some(session) = ctl.session() {
                        print_tab(session);
                    }
                } else {
                    error_line("Panel not available");
                }
            }
            None => error_line("usage: tab <chat|about|log>"),
        },
        "clearlog" => {
            ctl.clear_log().await;
            if let Some(session) = ctl.session() {
                print_log(&session.log);
            }
        }
        "delete" => {
            if ctl.delete_video(arg).await.is_ok() {
                println!("{} Deleted {}", style("✓").green().bold(), style(arg).bold());
            }
        }
        "close" => {
            ctl.close_video().await;
            print_status(ctl);
        }
        other => error_line(&format!("Unknown command `{other}`, try `help`")),
    }
    true
}

fn print_last(ctl: &Controller) {
    if let Some(bubble) = ctl.session().and_then(|s| s.chat.bubbles().last()) {
        print_bubble(bubble, false);
    }
}
