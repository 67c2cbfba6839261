// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::{BTreeSet, HashMap};
use std::io::{Result, Write};

use log::*;

use crate::cs::{CSObjId, Pointer};
use crate::heap::ObjId;
use crate::pta::result::PTAResult;
use crate::pts_set::points_to::PointsToSet;
use crate::util::call_graph_stat;

/// Writes call graph and points-to statistics of `result`.
pub fn dump_stats(result: &PTAResult<'_>, stat_writer: &mut dyn Write) -> Result<()> {
    info!("Dumping pta statistics...");
    writeln!(stat_writer, "##########################################################")?;
    writeln!(stat_writer, "Analysis: {}", result.context_sensitivity())?;
    writeln!(stat_writer, "#Contexts: {}", result.num_contexts())?;
    writeln!(stat_writer, "#Objects: {}", result.heap().num_objs())?;
    writeln!(stat_writer, "#CS objects: {}", result.csm().num_cs_objs())?;
    writeln!(
        stat_writer,
        "#CS variables: {}, #CS methods: {}",
        result.csm().num_cs_vars(),
        result.csm().num_cs_methods()
    )?;
    writeln!(stat_writer, "#PFG nodes: {}, #PFG edges: {}", result.pfg().num_nodes(), result.pfg().num_edges())?;
    call_graph_stat::call_graph_stat(result, stat_writer)?;
    writeln!(stat_writer, "Methods with most contexts: ")?;
    for (method, count) in call_graph_stat::top_context_methods(result, 5) {
        writeln!(stat_writer, "\t{} ({})", result.program().method_signature(method), count)?;
    }
    writeln!(stat_writer, "----------------------------------------------------------")?;
    dump_pts_stat(result, stat_writer)?;
    writeln!(stat_writer, "##########################################################")?;
    Ok(())
}

/// Points-to sizes of variables, context-sensitively and projected onto
/// variables and objects.
pub fn dump_pts_stat(result: &PTAResult<'_>, stat_writer: &mut dyn Write) -> Result<()> {
    let csm = result.csm();
    let mut ci_pts_map: HashMap<_, BTreeSet<ObjId>> = HashMap::new();
    let mut num_cs_pointers = 0;
    let mut num_cs_pts_relations = 0;
    for (pointer, value) in csm.pointers() {
        let var = match value {
            Pointer::Var(cs_var) => csm.get_cs_var(cs_var).var,
            _ => continue,
        };
        let pts = result.points_to(pointer);
        num_cs_pointers += 1;
        num_cs_pts_relations += pts.count();
        let ci_pts = ci_pts_map.entry(var).or_default();
        ci_pts.extend(pts.iter().map(|cs_obj: CSObjId| csm.get_cs_obj(cs_obj).obj));
    }
    let num_ci_pointers = ci_pts_map.len();
    let num_ci_pts_relations: usize = ci_pts_map.values().map(|pts| pts.len()).sum();

    writeln!(stat_writer, "CS Points-to Statistics: ")?;
    writeln!(stat_writer, "#Pointers: {}", num_cs_pointers)?;
    writeln!(stat_writer, "#Points-to relations: {}", num_cs_pts_relations)?;
    writeln!(stat_writer, "#Avg points-to size: {:.2}", average(num_cs_pts_relations, num_cs_pointers))?;
    writeln!(stat_writer, "CI Points-to Statistics: ")?;
    writeln!(stat_writer, "#Pointers: {}", num_ci_pointers)?;
    writeln!(stat_writer, "#Points-to relations: {}", num_ci_pts_relations)?;
    writeln!(stat_writer, "#Avg points-to size: {:.2}", average(num_ci_pts_relations, num_ci_pointers))?;
    Ok(())
}

fn average(total: usize, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}
