mod audio;
mod config;
mod grid;
mod keymap;
mod render;
mod session;

use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{LevelFilter, error, info, warn};
use macroquad::input::{KeyCode, get_char_pressed, is_key_pressed};
use macroquad::prelude::Conf;
use macroquad::time::{get_frame_time, get_time};
use macroquad::window::next_frame;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use simplelog::WriteLogger;

use audio::{SoundId, Sounds};
use config::{Rules, Settings};
use grid::Boundary;
use keymap::RemapMode;
use render::Rain;
use session::{RestartPolicy, Session};

#[derive(Parser)]
#[command(name = "keyshuffle_snake", about = "Snake whose controls reshuffle after every keypress")]
struct Args {
    /// JSON settings file; defaults are used when it does not exist.
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Seed for a reproducible session.
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value = "keyshuffle_snake.log")]
    log_file: PathBuf,
    #[arg(long)]
    verbose: bool,
    #[arg(long, value_enum)]
    boundary: Option<Boundary>,
    #[arg(long, value_enum)]
    remap: Option<RemapMode>,
    #[arg(long, value_enum)]
    restart: Option<RestartPolicy>,
}

impl Args {
    fn settings(&self) -> Result<Settings, config::ConfigError> {
        let mut settings = Settings::load(&self.config)?;
        if let Some(boundary) = self.boundary {
            settings.boundary = boundary;
        }
        if let Some(remap) = self.remap {
            settings.remap = remap;
        }
        if let Some(restart) = self.restart {
            settings.restart = restart;
        }
        Ok(settings)
    }
}

fn window_conf() -> Conf {
    Conf {
        window_title: "Key Shuffle Snake".to_owned(),
        window_width: 1200,
        window_height: 690,
        high_dpi: true,
        ..Default::default()
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    let log_file = match File::create(&args.log_file) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("cannot create log file {}: {}", args.log_file.display(), err);
            return ExitCode::FAILURE;
        }
    };
    WriteLogger::init(level, simplelog::Config::default(), log_file)
        .expect("Failed to initialize logger");

    let rules = match args.settings().and_then(|settings| settings.resolve()) {
        Ok(rules) => rules,
        Err(err) => {
            error!("{}", err);
            eprintln!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    let seed = args.seed.unwrap_or_else(|| rand::rng().random());
    info!("starting with seed {}: {:?}", seed, rules);

    macroquad::Window::from_config(window_conf(), run(rules, seed));
    ExitCode::SUCCESS
}

async fn run(rules: Rules, seed: u64) {
    let sounds = match Sounds::load(rules.volume).await {
        Ok(sounds) => Some(sounds),
        Err(err) => {
            warn!("sound disabled: {:?}", err);
            None
        }
    };

    let mut session = match Session::new(rules, StdRng::seed_from_u64(seed), get_time()) {
        Ok(session) => session,
        Err(err) => {
            error!("cannot start session: {}", err);
            return;
        }
    };
    let mut rain = Rain::new();

    loop {
        if is_key_pressed(KeyCode::Escape) {
            info!("quit, high score {}", session.high_score().max(session.score()));
            break;
        }

        let now = get_time();
        while let Some(ch) = get_char_pressed() {
            if !ch.is_control() {
                session.handle_key(ch.to_ascii_lowercase(), now);
            }
        }

        if let Some(event) = session.tick(now)
            && let Some(sounds) = &sounds
        {
            sounds.play(SoundId::from(event));
        }

        render::draw(&session, &mut rain, get_frame_time());
        next_frame().await;
    }
}
