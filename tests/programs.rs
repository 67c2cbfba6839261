// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.
//
// Runs the analysis on the JSON programs under tests/programs and checks the
// dumped results.

use std::collections::BTreeSet;
use std::path::PathBuf;

use bytepta::heap::ObjId;
use bytepta::ir::{loader, MethodId, Program, VarId};
use bytepta::pta;
use bytepta::pta::plugin::{AnalysisTimer, CompositePlugin};
use bytepta::pta::result::PTAResult;
use bytepta::util::options::AnalysisOptions;
use bytepta::util::{call_graph_stat, pta_statistics, results_dumper};

fn program_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("programs").join(name)
}

fn load(name: &str) -> Program {
    loader::load_program_file(program_path(name)).unwrap()
}

fn var(program: &Program, method: &str, name: &str) -> VarId {
    let method = method_of(program, method);
    program
        .vars()
        .find(|(_, v)| v.method == method && v.name == name)
        .map(|(id, _)| id)
        .unwrap()
}

fn method_of(program: &Program, signature: &str) -> MethodId {
    program.method_by_signature(signature).unwrap()
}

fn run<'p>(program: &'p Program, args: &[&str]) -> PTAResult<'p> {
    let mut options = AnalysisOptions::default();
    let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    options.parse_from_args(&args).unwrap();
    let mut plugins = CompositePlugin::new();
    plugins.add_plugin(Box::new(AnalysisTimer::new()));
    pta::run(program, &options, &mut plugins).unwrap()
}

fn type_names(result: &PTAResult<'_>, objs: &BTreeSet<ObjId>) -> BTreeSet<String> {
    objs.iter()
        .map(|obj| {
            let ty = result.heap().obj_type(result.program(), *obj);
            result.program().type_name(ty).to_string()
        })
        .collect()
}

#[test]
fn set_get_from_json() {
    let program = load("set_get.json");
    let x1 = var(&program, "<Main: void main()>", "x1");
    let x2 = var(&program, "<Main: void main()>", "x2");

    let ci = run(&program, &["--cs", "ci"]);
    assert_eq!(ci.var_points_to(x1).len(), 2);
    assert_eq!(ci.var_points_to(x1), ci.var_points_to(x2));

    let obj = run(&program, &["--cs", "2-obj"]);
    assert_eq!(obj.var_points_to(x1).len(), 1);
    assert_eq!(obj.var_points_to(x2).len(), 1);
    assert_ne!(obj.var_points_to(x1), obj.var_points_to(x2));

    let init = method_of(&program, "<A: void <init>()>");
    assert_eq!(obj.contexts_of(init).len(), 2);
    assert!(obj.check_fixpoint());
}

#[test]
fn shapes_from_json() {
    let program = load("shapes.json");
    let main = "<Main: void main()>";
    for cs in ["ci", "1-call", "1-obj", "2-type"] {
        let result = run(&program, &["--cs", cs]);
        assert!(result.is_reachable(method_of(&program, "<Registry: void <clinit>()>")), "{}", cs);
        assert_eq!(
            type_names(&result, &result.var_points_to(var(&program, main, "s"))),
            BTreeSet::from(["Circle".to_string(), "Square".to_string()]),
            "{}",
            cs
        );
        assert_eq!(
            type_names(&result, &result.var_points_to(var(&program, main, "circle"))),
            BTreeSet::from(["Circle".to_string()]),
            "{}",
            cs
        );
        assert_eq!(
            type_names(&result, &result.var_points_to(var(&program, main, "area"))),
            BTreeSet::from(["java.lang.Object".to_string(), "java.lang.String".to_string()]),
            "{}",
            cs
        );
        let all = program.class(program.class_by_name("Registry").unwrap()).declared_field("all").unwrap();
        assert_eq!(result.static_field_points_to(all).len(), 1, "{}", cs);
        assert!(result.unresolved_calls().is_empty(), "{}", cs);
        assert!(result.check_fixpoint(), "{}", cs);
    }
}

#[test]
fn statistics_count_calls_by_kind() {
    let program = load("shapes.json");
    let result = run(&program, &["--cs", "1-obj"]);
    let stat = call_graph_stat::CallGraphStat::new(&result);
    // Two static calls to `add`, one interface call with two targets.
    assert_eq!(stat.num_statically_resolved_calls(), 2);
    assert_eq!(stat.num_dynamically_resolved_calls(), (1, 2));
    assert_eq!(stat.num_unresolved_calls, 0);

    let mut out = Vec::new();
    pta_statistics::dump_stats(&result, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Analysis: 1-obj"));
    assert!(text.contains("#Reachable methods: 5"));
    assert!(text.contains("#Dynamically resolved calls: 1, #call graph edges: 2"));
}

#[test]
fn dumps_points_to_sets_and_call_graph() {
    let program = load("set_get.json");
    let result = run(&program, &["--cs", "1-obj"]);

    let mut out = Vec::new();
    results_dumper::write_ci_pts(&result, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("<Main: void main()>"));
    assert!(text.contains("\tx1 (1) ==> { "));

    let mut out = Vec::new();
    results_dumper::write_cs_pts(&result, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("<A: B get()>/r"));

    let dot_path = std::env::temp_dir().join(format!("bytepta-cg-{}.dot", std::process::id()));
    results_dumper::dump_call_graph(&result, &dot_path).unwrap();
    let dot = std::fs::read_to_string(&dot_path).unwrap();
    std::fs::remove_file(&dot_path).unwrap();
    assert!(dot.starts_with("digraph"));
    assert!(dot.contains("virtual"));
    assert!(dot.contains("set(B)"));
}
