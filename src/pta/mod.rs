// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;
use std::str::FromStr;

use log::*;

use self::context_sensitive::ContextSensitivePTA;
use self::context_strategy::{ContextInsensitive, ContextStrategy, KCallSiteSensitive, KObjectSensitive, KTypeSensitive};
use self::plugin::Plugin;
use self::result::PTAResult;
use crate::error::{PtaError, Result};
use crate::ir::{MethodId, Program};
use crate::util::options::AnalysisOptions;

pub mod context_sensitive;
pub mod context_strategy;
pub mod plugin;
pub mod propagator;
pub mod result;

/// The context sensitivity variant of an analysis run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextSensitivity {
    Insensitive,
    /// The k most recent call sites.
    CallSite(usize),
    /// The k most recent receiver objects.
    Object(usize),
    /// The types of the k most recent receiver objects.
    Type(usize),
}

impl ContextSensitivity {
    /// The context depth limit, 0 for the insensitive variant.
    pub fn depth(&self) -> usize {
        match self {
            ContextSensitivity::Insensitive => 0,
            ContextSensitivity::CallSite(k) | ContextSensitivity::Object(k) | ContextSensitivity::Type(k) => *k,
        }
    }

    /// Rejects k-limited variants with a depth of 0.
    pub fn validate(&self) -> Result<()> {
        if *self != ContextSensitivity::Insensitive && self.depth() == 0 {
            return Err(PtaError::InvalidContextDepth(self.to_string()));
        }
        Ok(())
    }
}

impl FromStr for ContextSensitivity {
    type Err = PtaError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s == "ci" {
            return Ok(ContextSensitivity::Insensitive);
        }
        let (depth, variant) = s
            .split_once('-')
            .ok_or_else(|| PtaError::UnknownContextSensitivity(s.to_string()))?;
        let k: usize = depth
            .parse()
            .map_err(|_| PtaError::UnknownContextSensitivity(s.to_string()))?;
        let cs = match variant {
            "call" | "cfa" => ContextSensitivity::CallSite(k),
            "obj" => ContextSensitivity::Object(k),
            "type" => ContextSensitivity::Type(k),
            _ => return Err(PtaError::UnknownContextSensitivity(s.to_string())),
        };
        cs.validate()?;
        Ok(cs)
    }
}

impl fmt::Display for ContextSensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextSensitivity::Insensitive => write!(f, "ci"),
            ContextSensitivity::CallSite(k) => write!(f, "{}-call", k),
            ContextSensitivity::Object(k) => write!(f, "{}-obj", k),
            ContextSensitivity::Type(k) => write!(f, "{}-type", k),
        }
    }
}

/// Resolves the entry methods: the ones named in the options, or the ones the
/// program declares.
pub fn entry_methods(program: &Program, options: &AnalysisOptions) -> Result<Vec<MethodId>> {
    let entries = if options.entries.is_empty() {
        program.entry_methods().to_vec()
    } else {
        options
            .entries
            .iter()
            .map(|sig| program.method_by_signature(sig).ok_or_else(|| PtaError::UnknownEntry(sig.clone())))
            .collect::<Result<Vec<_>>>()?
    };
    if entries.is_empty() {
        return Err(PtaError::NoEntryMethod);
    }
    Ok(entries)
}

/// Runs the pointer analysis selected by `options` on `program`.
pub fn run<'p>(program: &'p Program, options: &AnalysisOptions, plugin: &mut dyn Plugin) -> Result<PTAResult<'p>> {
    options.context_sensitivity.validate()?;
    plugin.on_preprocess(program);
    let entries = entry_methods(program, options)?;
    debug!("Running {} pointer analysis from {} entries", options.context_sensitivity, entries.len());
    match options.context_sensitivity {
        ContextSensitivity::Insensitive => solve(program, options, entries, ContextInsensitive::new(), plugin),
        ContextSensitivity::CallSite(k) => solve(program, options, entries, KCallSiteSensitive::new(k), plugin),
        ContextSensitivity::Object(k) => solve(program, options, entries, KObjectSensitive::new(k), plugin),
        ContextSensitivity::Type(k) => solve(program, options, entries, KTypeSensitive::new(k), plugin),
    }
}

fn solve<'p, S: ContextStrategy>(
    program: &'p Program,
    options: &AnalysisOptions,
    entries: Vec<MethodId>,
    strategy: S,
    plugin: &mut dyn Plugin,
) -> Result<PTAResult<'p>> {
    let mut pta = ContextSensitivePTA::new(program, options, entries, strategy, plugin)?;
    pta.analyze();
    Ok(pta.finalize())
}
