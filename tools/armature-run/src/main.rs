// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

mod args;

use std::path::Path;

use armature_kernel::{Effect, World};
use armature_script::units::angle_to_fixed;
use armature_script::{Axis, Module, ModuleDefinition, PieceId};
use clap::Parser;
use eyre::{WrapErr, eyre};
use figment::Figment;
use figment::providers::{Format, Json, Yaml};
use strum::IntoEnumIterator;
use tracing::{info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::args::Args;

/// `RUST_LOG` wins when set; otherwise `--debug` picks between DEBUG and INFO.
fn init_tracing(debug_fallback: bool) -> Result<(), eyre::Report> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if debug_fallback { "debug" } else { "info" })
    });

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .compact()
                .with_ansi(true)
                .with_file(false)
                .with_target(false)
                .with_line_number(false)
                .with_span_events(fmt::format::FmtSpan::NONE),
        )
        .with(filter)
        .try_init()
        .map_err(|e| eyre!("Unable to configure logging: {e}"))
}

fn load_module(path: &Path) -> Result<Module, eyre::Report> {
    let figment = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Figment::new().merge(Json::file(path)),
        _ => Figment::new().merge(Yaml::file(path)),
    };
    let definition: ModuleDefinition = figment
        .extract()
        .map_err(|e| eyre!("Failed to parse module from {:?}: {}", path, e))?;
    Module::from_definition(definition).wrap_err_with(|| format!("Invalid module {path:?}"))
}

fn report(world: &World, module: &Module) -> Result<(), eyre::Report> {
    for unit in world.unit_ids() {
        let state = world.unit(unit)?;
        println!(
            "{unit}: {} live thread(s), statics {:?}",
            state.environment().live_thread_count(),
            state.environment().statics()
        );
        for index in 0..module.piece_count() {
            let piece = PieceId(index as u16);
            let Some(p) = state.pieces().piece(piece) else {
                continue;
            };
            let name = module.piece_name(piece).unwrap_or("?");
            let position: Vec<i32> = Axis::iter()
                .map(|a| p.position[a.index()])
                .collect();
            let rotation: Vec<i32> = Axis::iter()
                .map(|a| angle_to_fixed(p.rotation[a.index()]))
                .collect();
            println!(
                "  {name}: position {position:?} rotation {rotation:?}{}",
                if p.visible { "" } else { " (hidden)" }
            );
        }
    }
    for d in world.diagnostics() {
        println!(
            "fault at tick {}: {} thread {}: {}",
            d.tick, d.unit, d.thread, d.fault
        );
    }
    Ok(())
}

fn main() -> Result<(), eyre::Report> {
    color_eyre::install()?;
    let args = Args::parse();
    init_tracing(args.debug)?;

    let config = args.load_config()?;
    let module = load_module(&args.module)?;
    info!(
        module = ?args.module,
        scripts = module.scripts().len(),
        pieces = module.piece_count(),
        "module loaded"
    );

    let mut world = World::new(config);
    for _ in 0..args.units {
        let unit = world.spawn_unit(module.clone());
        for name in &args.scripts {
            if !module.has_entry_point(name) {
                warn!(%unit, script = %name, "no such entry point, skipping");
                continue;
            }
            world.run_script(unit, name)?;
        }
    }

    for _ in 0..args.ticks {
        world.tick();
        for effect in world.drain_effects() {
            match effect {
                Effect::Explode { unit, piece, kind } => {
                    info!(%unit, piece = module.piece_name(piece), kind, "explode")
                }
                Effect::EmitSmoke { unit, piece, kind } => {
                    info!(%unit, piece = module.piece_name(piece), kind, "smoke")
                }
                Effect::AttachUnit {
                    unit,
                    piece,
                    passenger,
                } => info!(%unit, piece = module.piece_name(piece), passenger, "attach"),
                Effect::DetachUnit { unit, passenger } => info!(%unit, passenger, "detach"),
            }
        }
    }
    info!(ticks = args.ticks, units = args.units, "simulation finished");

    report(&world, &module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use armature_kernel::Config;
    use std::path::PathBuf;

    fn demo(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../../demos")
            .join(name)
    }

    #[test]
    fn test_walker_demo() {
        let module = load_module(&demo("walker.yaml")).unwrap();
        assert_eq!(module.piece_count(), 4);

        let mut world = World::new(Config::default());
        let unit = world.spawn_unit(module);
        world.run_script(unit, "Create").unwrap();
        for _ in 0..40 {
            world.tick();
        }
        assert_eq!(world.static_variable(unit, 0), Ok(1));
        assert!(!world.piece_state(unit, "flare").unwrap().visible);
        assert!(
            world
                .drain_effects()
                .iter()
                .all(|e| matches!(e, Effect::EmitSmoke { .. }))
        );

        world.run_script_with_args(unit, "Killed", &[2]).unwrap();
        world.tick();
        assert_eq!(world.unit(unit).unwrap().environment().live_thread_count(), 0);
        assert!(world.piece_state(unit, "flare").unwrap().visible);
        assert!(world.drain_effects().contains(&Effect::Explode {
            unit,
            piece: PieceId(0),
            kind: 2
        }));
        assert_eq!(world.diagnostics().count(), 0);
    }
}
