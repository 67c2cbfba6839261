// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufWriter, Result, Write};
use std::path::Path;

use log::*;

use crate::cs::Pointer;
use crate::ir::{MethodId, VarId};
use crate::pta::result::PTAResult;
use crate::pts_set::points_to::PointsToSet;
use crate::util::options::AnalysisOptions;
use crate::util::pta_statistics;

/// Writes the outputs requested by `options`.
pub fn dump_results(result: &PTAResult<'_>, options: &AnalysisOptions) -> Result<()> {
    if options.dump_stats {
        let stdout = std::io::stdout();
        let mut stat_writer = BufWriter::new(stdout.lock());
        pta_statistics::dump_stats(result, &mut stat_writer)?;
        stat_writer.flush()?;
    }

    if let Some(pts_output) = &options.pts_output {
        info!("Dumping points-to results...");
        dump_ci_pts(result, pts_output)?;
    }

    if let Some(cg_output) = &options.call_graph_output {
        info!("Dumping call graph...");
        dump_call_graph(result, Path::new(cg_output))?;
    }
    Ok(())
}

/// Writes the context-insensitive call graph in DOT format.
pub fn dump_call_graph(result: &PTAResult<'_>, dot_path: &Path) -> Result<()> {
    let program = result.program();
    let dot = result.ci_call_graph().to_dot(|method| program.method_signature(method));
    std::fs::write(dot_path, dot)
}

fn open_output(path: &str) -> Result<BufWriter<Box<dyn Write>>> {
    Ok(BufWriter::new(match path {
        "-" | "stdout" => Box::new(std::io::stdout()) as Box<dyn Write>,
        _ => Box::new(File::create(path)?) as Box<dyn Write>,
    }))
}

/// Writes the points-to sets of variables, grouped by method and merged over
/// contexts, to `pts_path` or to stdout if it is `-`.
pub fn dump_ci_pts(result: &PTAResult<'_>, pts_path: &str) -> Result<()> {
    let mut pts_writer = open_output(pts_path)?;
    write_ci_pts(result, &mut pts_writer)?;
    pts_writer.flush()
}

pub fn write_ci_pts<W: Write>(result: &PTAResult<'_>, pts_writer: &mut W) -> Result<()> {
    let program = result.program();
    let csm = result.csm();
    let mut grouped_pts: BTreeMap<MethodId, BTreeMap<VarId, BTreeSet<String>>> = BTreeMap::new();
    for (pointer, value) in csm.pointers() {
        let var = match value {
            Pointer::Var(cs_var) => csm.get_cs_var(cs_var).var,
            _ => continue,
        };
        let pts = result.points_to(pointer);
        if pts.is_empty() {
            continue;
        }
        let method = program.var(var).method;
        let var_pts = grouped_pts.entry(method).or_default().entry(var).or_default();
        for cs_obj in &pts {
            var_pts.insert(result.heap().obj(csm.get_cs_obj(cs_obj).obj).display(program));
        }
    }
    for (method, pts_map) in grouped_pts {
        writeln!(pts_writer, "{}", program.method_signature(method))?;
        for (var, pts) in pts_map {
            write!(pts_writer, "\t{} ({}) ==> {{ ", program.var(var).name, pts.len())?;
            for pointee in pts {
                write!(pts_writer, "{} ", pointee)?;
            }
            writeln!(pts_writer, "}}")?;
        }
    }
    Ok(())
}

/// Writes the points-to set of every pointer under its context.
pub fn write_cs_pts<W: Write>(result: &PTAResult<'_>, pts_writer: &mut W) -> Result<()> {
    let program = result.program();
    let csm = result.csm();
    for (pointer, value) in csm.pointers() {
        let pts = result.points_to(pointer);
        if pts.is_empty() {
            continue;
        }
        let name = match value {
            Pointer::Var(cs_var) => {
                let cs_var = csm.get_cs_var(cs_var);
                format!("{:?}:{}", result.context_elements(cs_var.cid), program.var_display(cs_var.var))
            }
            Pointer::InstanceField(base, field) => {
                format!("{:?}.{}", base, program.field(field).name)
            }
            Pointer::StaticField(field) => program.field_display(field),
            Pointer::ArrayIndex(base) => format!("{:?}[*]", base),
            Pointer::NativeTemp(cs_callsite) => format!("tmp@{:?}", cs_callsite),
        };
        let pointees: Vec<String> = pts
            .iter()
            .map(|cs_obj| {
                let cs_obj = csm.get_cs_obj(cs_obj);
                format!(
                    "{:?}:{}",
                    result.context_elements(cs_obj.cid),
                    result.heap().obj(cs_obj.obj).display(program)
                )
            })
            .collect();
        writeln!(pts_writer, "{} ==> {{ {} }}", name, pointees.join(" "))?;
    }
    Ok(())
}
