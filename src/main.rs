//! Serpent Circuit headless runner
//!
//! Runs a full NPC race at a fixed timestep and prints the final standings
//! as JSON. Handy for tuning profiles and checking determinism:
//!
//!   serpent-circuit [--track NAME] [--laps N] [--racers N] [--seed N]

use std::process::ExitCode;

use serpent_circuit::catalog::{build_race, track_def, track_names, LineupEntry};
use serpent_circuit::consts::SIM_DT;
use serpent_circuit::sim::state::{RacePhase, RacerKind};
use serpent_circuit::{tick, TickInput};

struct Args {
    track: String,
    laps: Option<u32>,
    racers: usize,
    seed: u64,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        track: "oval".to_string(),
        laps: None,
        racers: 6,
        seed: 1,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(flag) = iter.next() {
        let mut value = |name: &str| {
            iter.next().ok_or_else(|| format!("{name} needs a value"))
        };
        match flag.as_str() {
            "--track" => args.track = value("--track")?,
            "--laps" => {
                args.laps = Some(
                    value("--laps")?
                        .parse()
                        .map_err(|e| format!("--laps: {e}"))?,
                )
            }
            "--racers" => {
                args.racers = value("--racers")?
                    .parse()
                    .map_err(|e| format!("--racers: {e}"))?
            }
            "--seed" => {
                args.seed = value("--seed")?
                    .parse()
                    .map_err(|e| format!("--seed: {e}"))?
            }
            other => return Err(format!("unknown flag '{other}'")),
        }
    }
    if args.racers < 2 {
        return Err("--racers must be at least 2".to_string());
    }
    Ok(args)
}

fn main() -> ExitCode {
    env_logger::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{err}");
            eprintln!("tracks: {}", track_names().join(", "));
            return ExitCode::FAILURE;
        }
    };

    let Some(mut def) = track_def(&args.track) else {
        eprintln!(
            "unknown track '{}' (tracks: {})",
            args.track,
            track_names().join(", ")
        );
        return ExitCode::FAILURE;
    };
    if let Some(laps) = args.laps {
        def.laps = laps.max(1);
    }

    let kinds = [
        RacerKind::Default,
        RacerKind::Speedster,
        RacerKind::Bully,
        RacerKind::Trickster,
        RacerKind::CrossAccel,
    ];
    let lineup: Vec<LineupEntry> = (0..args.racers)
        .map(|i| LineupEntry {
            kind: kinds[i % kinds.len()],
            is_player: false,
        })
        .collect();

    let mut world = build_race(&def, &lineup, args.seed, 0.0);

    // 20 sim-minutes is far beyond any sane race; treat it as a hang
    let max_ticks = (20.0 * 60.0 / SIM_DT) as u64;
    let mut now_ms = 0.0_f64;
    let mut ticks = 0_u64;
    while world.phase != RacePhase::Finished && ticks < max_ticks {
        tick(&mut world, &TickInput::default(), now_ms, SIM_DT);
        now_ms += SIM_DT as f64 * 1000.0;
        ticks += 1;
    }

    if world.phase != RacePhase::Finished {
        log::error!("race did not finish within {} ticks", max_ticks);
        return ExitCode::FAILURE;
    }

    log::info!("race complete after {:.1}s simulated", now_ms / 1000.0);
    match serde_json::to_string_pretty(&world.standings) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("failed to serialize standings: {err}");
            ExitCode::FAILURE
        }
    }
}
