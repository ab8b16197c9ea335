#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that boots the Sorting Board experience.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use directories::{ProjectDirs, UserDirs};
use log::{info, warn};
use sorting_board_core::{GameState, LevelConfig};
use sorting_board_rendering::{
    BoardPresentation, Color, FrameControl, FrameInput, NullRenderer, Presentation,
    RenderingBackend, Scene, SilentAudio,
};
use sorting_board_rendering_macroquad::MacroquadBackend;
use sorting_board_runtime::{autoplay::AutoPlayer, Session, SessionOptions};
use sorting_board_system_bootstrap::Bootstrap;
use sorting_board_system_interaction::PointerEvent;
use sorting_board_system_level::LevelRequest;
use sorting_board_world::query;

/// Fixed step used by headless runs.
const HEADLESS_STEP: Duration = Duration::from_micros(16_667);

/// Ball-sorting motor-skills exercise.
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
struct Cli {
    /// TOML file describing the level
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// directory receiving session CSV and JSON files
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// seed for spawn colors and positions
    #[arg(long)]
    seed: Option<u64>,

    /// number of trials, overriding the configuration
    #[arg(long)]
    trials: Option<u32>,

    /// do not write session files
    #[arg(long)]
    no_export: bool,

    /// play the level with a scripted pointer and no window
    #[arg(long)]
    headless: bool,

    /// share of scripted releases that miss their hole
    #[arg(long, default_value_t = 0.2)]
    miss_rate: f64,

    /// game seconds after which a headless run gives up
    #[arg(long, default_value_t = 600)]
    max_seconds: u64,

    /// synchronise presentation with the display refresh rate
    #[arg(long)]
    vsync: bool,

    /// show the frame-rate counter
    #[arg(long)]
    show_fps: bool,
}

/// Entry point for the Sorting Board command-line interface.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    let options = SessionOptions {
        seed: cli.seed,
        ..SessionOptions::default()
    };
    let display = config.display;
    let session = Session::new(config, options).context("failed to set up the level")?;
    info!("{}", Bootstrap.welcome_banner(session.world()));

    if cli.headless {
        run_headless(session, &cli);
        return Ok(());
    }

    let presentation = presentation(&session, cli.show_fps);
    MacroquadBackend::new()
        .with_vsync(cli.vsync)
        .with_window_size(display.window_width, display.window_height)
        .run(presentation, frame_loop(session))
}

/// Reads the level configuration and applies command-line overrides.
fn resolve_config(cli: &Cli) -> Result<LevelConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => LevelConfig::default(),
    };
    if let Some(trials) = cli.trials {
        config.total_trials = trials;
    }
    if cli.no_export {
        config.export.enabled = false;
    }
    if let Some(directory) = &cli.export_dir {
        config.export.directory = Some(directory.clone());
    }
    if config.export.enabled && config.export.directory.is_none() {
        config.export.directory = default_export_dir();
    }
    Ok(config)
}

fn load_config(path: &Path) -> Result<LevelConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read level configuration {}", path.display()))?;
    toml::from_str(&text)
        .with_context(|| format!("failed to parse level configuration {}", path.display()))
}

/// `Documents/SortingBoard/Logs`, falling back to the local data directory.
fn default_export_dir() -> Option<PathBuf> {
    UserDirs::new()
        .and_then(|dirs| dirs.document_dir().map(|documents| documents.join("SortingBoard")))
        .or_else(|| {
            ProjectDirs::from("", "", "SortingBoard")
                .map(|dirs| dirs.data_local_dir().to_path_buf())
        })
        .map(|root| root.join("Logs"))
}

fn presentation(session: &Session, show_fps: bool) -> Presentation {
    let world = session.world();
    let config = query::config(world);
    let board = BoardPresentation::new(
        config.board.width,
        config.board.depth,
        config.board.height,
        Color::from_rgb_u8(46, 82, 56),
    );
    let mut scene = Scene::new(
        board,
        query::holes(world),
        config.ball_diameter,
        Bootstrap.welcome_banner(world),
    );
    scene.show_fps = show_fps;
    scene.hud = session.hud_view();
    Presentation::new("Sorting Board", Color::from_rgb_u8(24, 24, 28), scene)
}

fn frame_loop(
    mut session: Session,
) -> impl FnMut(Duration, FrameInput, &mut Scene) -> FrameControl + 'static {
    let mut audio = SilentAudio;
    move |dt, input, scene| {
        forward_input(&mut session, input);
        session.tick(dt, scene, &mut audio);
        scene.animate(dt);
        scene.hud = session.hud_view();
        if session.is_exiting() {
            FrameControl::Exit
        } else {
            FrameControl::Continue
        }
    }
}

fn forward_input(session: &mut Session, input: FrameInput) {
    if let Some(point) = input.pointer {
        session.push_pointer(PointerEvent::Moved(point));
    }
    if input.pressed {
        session.push_pointer(PointerEvent::Pressed);
    }
    if input.released {
        session.push_pointer(PointerEvent::Released);
    }
    if input.toggle_pause {
        session.request(LevelRequest::TogglePause);
    }
    if input.restart {
        session.request(LevelRequest::Restart);
    }
    if input.exit {
        session.request(LevelRequest::Exit);
    }
}

/// Plays the level with a scripted pointer until it completes, then exits.
fn run_headless(mut session: Session, cli: &Cli) {
    let mut player = AutoPlayer::new(session.seed(), cli.miss_rate);
    let mut renderer = NullRenderer;
    let mut audio = SilentAudio;
    let budget = Duration::from_secs(cli.max_seconds);
    let mut elapsed = Duration::ZERO;

    while !session.is_exiting() {
        for event in player.drive(session.world()) {
            session.push_pointer(event);
        }
        session.tick(HEADLESS_STEP, &mut renderer, &mut audio);
        elapsed += HEADLESS_STEP;

        if session.game_state() == GameState::LevelComplete {
            println!("{}", session.statistics().summary());
            session.request(LevelRequest::Exit);
        } else if elapsed >= budget {
            warn!("headless run stopped after {}s", budget.as_secs());
            session.request(LevelRequest::Exit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("sorting-board").chain(args.iter().copied()))
            .expect("arguments parse")
    }

    #[test]
    fn overrides_apply_on_top_of_the_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("level.toml");
        fs::write(
            &path,
            "total_trials = 7\nspawn_interval = 0.5\n\n[[holes]]\ndiameter = 150.0\ncolor = \"Blue\"\n",
        )
        .expect("write config");

        let cli = parse(&[
            "--config",
            path.to_str().expect("utf-8 path"),
            "--trials",
            "3",
            "--export-dir",
            "/tmp/sorting-board",
        ]);
        let config = resolve_config(&cli).expect("config resolves");
        assert_eq!(config.total_trials, 3);
        assert!((config.spawn_interval - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.holes.len(), 1);
        assert_eq!(
            config.export.directory,
            Some(PathBuf::from("/tmp/sorting-board"))
        );
    }

    #[test]
    fn no_export_disables_session_files() {
        let config = resolve_config(&parse(&["--no-export"])).expect("config resolves");
        assert!(!config.export.enabled);
        assert_eq!(config.export.directory, None);
    }

    #[test]
    fn unreadable_config_is_reported() {
        let cli = parse(&["--config", "/definitely/not/here.toml"]);
        let error = resolve_config(&cli).expect_err("missing file");
        assert!(error.to_string().contains("failed to read level configuration"));
    }

    #[test]
    fn headless_run_completes_and_exits() {
        let dir = tempfile::tempdir().expect("temp dir");
        let cli = parse(&[
            "--headless",
            "--trials",
            "3",
            "--seed",
            "5",
            "--miss-rate",
            "0",
            "--export-dir",
            dir.path().to_str().expect("utf-8 path"),
        ]);
        let mut config = resolve_config(&cli).expect("config resolves");
        config.spawn_interval = 0.2;
        config.auto_start_delay = 0.0;
        let options = SessionOptions {
            seed: cli.seed,
            ..SessionOptions::default()
        };
        let session = Session::new(config, options).expect("session");
        run_headless(session, &cli);

        let day = fs::read_dir(dir.path())
            .expect("export dir")
            .next()
            .expect("dated folder")
            .expect("entry");
        let files = fs::read_dir(day.path()).expect("dated folder").count();
        assert_eq!(files, 2, "one csv and one json file");
    }
}
