// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The main routine of `bytepta`.
//!
//! Loads a program from its JSON description, runs the pointer analysis and
//! dumps the requested results.

use std::env;

use anyhow::{bail, Context};
use log::*;

use bytepta::ir::loader;
use bytepta::pta;
use bytepta::pta::plugin::{AnalysisTimer, CompositePlugin};
use bytepta::util::mem_watcher::MemoryWatcher;
use bytepta::util::options::AnalysisOptions;
use bytepta::util::results_dumper;

fn main() -> anyhow::Result<()> {
    // Initialize loggers.
    if env::var("PTA_LOG").is_ok() {
        let e = env_logger::Env::new().filter("PTA_LOG").write_style("PTA_LOG_STYLE");
        env_logger::init_from_env(e);
    }

    // Options from the PTA_FLAGS environment variable come first, so that
    // arguments supplied on the command line override them.
    let mut options = AnalysisOptions::default();
    options.parse_from_env().context("invalid PTA_FLAGS")?;
    let args: Vec<String> = env::args().skip(1).collect();
    options.parse_from_args(&args)?;
    info!("PTA Options: {:?}", options);

    let input = match &options.input {
        Some(input) => input.clone(),
        None => bail!("no input program given"),
    };
    let program = loader::load_program_file(&input).with_context(|| format!("failed to load {}", input))?;

    let mut mem_watcher = MemoryWatcher::new();
    mem_watcher.start();

    let mut plugins = CompositePlugin::new();
    plugins.add_plugin(Box::new(AnalysisTimer::new()));
    let result = pta::run(&program, &options, &mut plugins)?;

    mem_watcher.stop();

    results_dumper::dump_results(&result, &options).context("failed to dump the analysis results")?;
    Ok(())
}
