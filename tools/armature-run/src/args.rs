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

use std::path::PathBuf;

use armature_kernel::config::{
    Config, DivideByZero, OperandOrder, RuntimeConfig, SemanticsConfig,
};
use clap::builder::ValueHint;
use clap_derive::{Parser, ValueEnum};
use eyre::eyre;
use figment::Figment;
use figment::providers::{Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};

#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    #[arg(
        value_name = "module",
        help = "Module description to load (YAML, or JSON if the file ends in .json)",
        value_hint = ValueHint::FilePath
    )]
    pub module: PathBuf,

    #[arg(
        long,
        value_name = "config",
        help = "Path to configuration (YAML) file to use, if any. If not specified, defaults are used. \
                Configuration file values can be overridden by command line arguments.",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[arg(long, help = "Number of units to spawn", default_value = "1")]
    pub units: u32,

    #[arg(
        long = "run",
        value_name = "entry-point",
        help = "Entry point to start on every unit before the first tick. May be repeated.",
        default_value = "Create"
    )]
    pub scripts: Vec<String>,

    #[arg(long, help = "Number of ticks to simulate", default_value = "30")]
    pub ticks: u64,

    #[command(flatten)]
    pub runtime_args: RuntimeArgs,

    #[command(flatten)]
    pub semantics_args: SemanticsArgs,

    #[arg(long, help = "Enable debug logging")]
    pub debug: bool,
}

#[derive(Parser, Debug, Serialize, Deserialize)]
pub struct RuntimeArgs {
    #[arg(long, help = "Seed for every unit's random source")]
    pub seed: Option<u64>,

    #[arg(long, value_name = "ms", help = "Simulated milliseconds per tick")]
    pub tick_duration_ms: Option<u32>,

    #[arg(long, help = "Instructions a thread may execute per tick before it is made to yield")]
    pub max_instructions_per_run: Option<usize>,

    #[arg(long, help = "Deepest call_script nesting a thread may reach")]
    pub max_call_depth: Option<usize>,
}

impl RuntimeArgs {
    pub fn merge_config(&self, config: &mut RuntimeConfig) {
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(ms) = self.tick_duration_ms {
            config.tick_duration_ms = ms;
        }
        if let Some(n) = self.max_instructions_per_run {
            config.max_instructions_per_run = n;
        }
        if let Some(depth) = self.max_call_depth {
            config.max_call_depth = depth;
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum, Serialize, Deserialize)]
pub enum OperandOrderArg {
    RightOnTop,
    LeftOnTop,
}

#[derive(Clone, Copy, Debug, ValueEnum, Serialize, Deserialize)]
pub enum DivideByZeroArg {
    Fault,
    Zero,
}

#[derive(Parser, Debug, Serialize, Deserialize)]
pub struct SemanticsArgs {
    #[arg(long, value_enum, help = "Which operand of a binary instruction is on top of the stack")]
    pub operand_order: Option<OperandOrderArg>,

    #[arg(long, value_enum, help = "Whether dividing by zero faults the thread or pushes zero")]
    pub divide_by_zero: Option<DivideByZeroArg>,
}

impl SemanticsArgs {
    pub fn merge_config(&self, config: &mut SemanticsConfig) {
        if let Some(order) = self.operand_order {
            config.operand_order = match order {
                OperandOrderArg::RightOnTop => OperandOrder::RightOnTop,
                OperandOrderArg::LeftOnTop => OperandOrder::LeftOnTop,
            };
        }
        if let Some(mode) = self.divide_by_zero {
            config.divide_by_zero = match mode {
                DivideByZeroArg::Fault => DivideByZero::Fault,
                DivideByZeroArg::Zero => DivideByZero::Zero,
            };
        }
    }
}

impl Args {
    fn merge_config(&self, mut config: Config) -> Config {
        self.runtime_args.merge_config(&mut config.runtime);
        self.semantics_args.merge_config(&mut config.semantics);
        config
    }

    /// Load the configuration file if we have it, then apply command line overrides on top.
    pub fn load_config(&self) -> Result<Config, eyre::Report> {
        let config = match &self.config_file {
            Some(path) => Figment::new()
                .merge(Serialized::defaults(Config::default()))
                .merge(Yaml::file(path))
                .extract::<Config>()
                .map_err(|e| eyre!("Failed to parse configuration from {:?}: {}", path, e))?,
            None => Config::default(),
        };
        Ok(self.merge_config(config))
    }
}
