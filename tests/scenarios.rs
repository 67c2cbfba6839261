// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.
//
// End-to-end checks of the solver on small programs built in memory.

use std::collections::{BTreeSet, HashMap, HashSet};

use bytepta::cs::{PointerId, PointsTo};
use bytepta::heap::ObjId;
use bytepta::ir::{AllocSiteId, CallKind, CallSiteId, MethodId, MethodModifiers, Program, ProgramBuilder, VarId};
use bytepta::pta::context_sensitive::ContextSensitivePTA;
use bytepta::pta::context_strategy::KObjectSensitive;
use bytepta::pta::plugin::{Plugin, PluginEnv};
use bytepta::pta::result::PTAResult;
use bytepta::pta::{self, ContextSensitivity};
use bytepta::pts_set::points_to::PointsToSet;
use bytepta::util::options::AnalysisOptions;

const ALL_VARIANTS: [ContextSensitivity; 7] = [
    ContextSensitivity::Insensitive,
    ContextSensitivity::CallSite(1),
    ContextSensitivity::CallSite(2),
    ContextSensitivity::Object(1),
    ContextSensitivity::Object(2),
    ContextSensitivity::Type(1),
    ContextSensitivity::Type(2),
];

fn static_modifiers() -> MethodModifiers {
    MethodModifiers {
        is_static: true,
        ..Default::default()
    }
}

fn options(cs: ContextSensitivity) -> AnalysisOptions {
    AnalysisOptions {
        context_sensitivity: cs,
        ..Default::default()
    }
}

fn analyze<'p>(program: &'p Program, options: &AnalysisOptions) -> PTAResult<'p> {
    let mut plugin = NoPlugin;
    pta::run(program, options, &mut plugin).unwrap()
}

struct NoPlugin;

impl Plugin for NoPlugin {}

fn objs(result: &PTAResult<'_>, sites: &[AllocSiteId]) -> BTreeSet<ObjId> {
    sites.iter().map(|site| result.obj_of_site(*site).unwrap()).collect()
}

/// Two `A` objects, each holding its own `B` through a setter and read back
/// through a getter.
struct SetGetProgram {
    program: Program,
    main: MethodId,
    set: MethodId,
    get: MethodId,
    b_sites: [AllocSiteId; 2],
    a_sites: [AllocSiteId; 2],
    reads: [VarId; 2],
    set_calls: [CallSiteId; 2],
}

fn set_get_program() -> SetGetProgram {
    let mut builder = ProgramBuilder::new();
    let b_ty = builder.add_class("B", None);
    let a_ty = builder.add_class("A", None);
    let field = builder.add_field(a_ty, "b", b_ty, false);

    let set = builder.add_method(a_ty, "void set(B)", MethodModifiers::default());
    let set_this = builder.this_var(set).unwrap();
    let param = builder.add_param(set, "b", b_ty);
    builder.store_field(set, set_this, field, param);

    let get = builder.add_method(a_ty, "B get()", MethodModifiers::default());
    let get_this = builder.this_var(get).unwrap();
    let ret = builder.add_var(get, "r", b_ty);
    builder.load_field(get, ret, get_this, field);
    builder.add_return(get, ret);

    let main_ty = builder.add_class("Main", None);
    let main = builder.add_method(main_ty, "void main()", static_modifiers());
    let a1 = builder.add_var(main, "a1", a_ty);
    let a2 = builder.add_var(main, "a2", a_ty);
    let b1 = builder.add_var(main, "b1", b_ty);
    let b2 = builder.add_var(main, "b2", b_ty);
    let x1 = builder.add_var(main, "x1", b_ty);
    let x2 = builder.add_var(main, "x2", b_ty);
    let a1_site = builder.new_obj(main, a1, a_ty);
    let a2_site = builder.new_obj(main, a2, a_ty);
    let b1_site = builder.new_obj(main, b1, b_ty);
    let b2_site = builder.new_obj(main, b2, b_ty);
    let set1 = builder.invoke(main, CallKind::Virtual, a_ty, "void set(B)", Some(a1), &[b1], None);
    let set2 = builder.invoke(main, CallKind::Virtual, a_ty, "void set(B)", Some(a2), &[b2], None);
    builder.invoke(main, CallKind::Virtual, a_ty, "B get()", Some(a1), &[], Some(x1));
    builder.invoke(main, CallKind::Virtual, a_ty, "B get()", Some(a2), &[], Some(x2));
    builder.add_entry(main);

    SetGetProgram {
        program: builder.build(),
        main,
        set,
        get,
        b_sites: [b1_site, b2_site],
        a_sites: [a1_site, a2_site],
        reads: [x1, x2],
        set_calls: [set1, set2],
    }
}

#[test]
fn object_sensitivity_separates_receivers() {
    let p = set_get_program();

    let ci = analyze(&p.program, &options(ContextSensitivity::Insensitive));
    let both = objs(&ci, &p.b_sites);
    assert_eq!(ci.var_points_to(p.reads[0]), both);
    assert_eq!(ci.var_points_to(p.reads[1]), both);
    assert!(ci.check_fixpoint());

    let obj2 = analyze(&p.program, &options(ContextSensitivity::Object(2)));
    assert_eq!(obj2.var_points_to(p.reads[0]), objs(&obj2, &p.b_sites[..1]));
    assert_eq!(obj2.var_points_to(p.reads[1]), objs(&obj2, &p.b_sites[1..]));
    // One context per receiver object.
    assert_eq!(obj2.contexts_of(p.set).len(), 2);
    assert_eq!(obj2.contexts_of(p.get).len(), 2);
    assert_eq!(obj2.contexts_of(p.main).len(), 1);
    assert!(obj2.check_fixpoint());
}

#[test]
fn context_sensitive_queries_follow_caller_contexts() {
    let p = set_get_program();
    let result = analyze(&p.program, &options(ContextSensitivity::Object(1)));
    let csm = result.csm();

    let main_contexts = result.contexts_of(p.main);
    assert_eq!(main_contexts.len(), 1);
    let main_cid = main_contexts[0];
    assert_eq!(result.contexts_of_var(p.reads[0]), main_contexts);

    let cs_objs: BTreeSet<ObjId> = result
        .cs_var_points_to(main_cid, p.reads[0])
        .iter()
        .map(|cs_obj| csm.get_cs_obj(cs_obj).obj)
        .collect();
    assert_eq!(cs_objs, objs(&result, &p.b_sites[..1]));

    for call in p.set_calls {
        let callees = result.cs_callees_of(main_cid, call);
        assert_eq!(callees.len(), 1);
        let callee = csm.get_cs_method(*callees.iter().next().unwrap());
        assert_eq!(callee.method, p.set);
        // The receiver object is the whole callee context.
        assert_eq!(result.context_elements(callee.cid).len(), 1);
    }
    let first = result.cs_callees_of(main_cid, p.set_calls[0]);
    let second = result.cs_callees_of(main_cid, p.set_calls[1]);
    assert!(first.is_disjoint(&second));
}

#[test]
fn every_variant_separates_setter_calls_in_fields() {
    let p = set_get_program();
    for cs in ALL_VARIANTS {
        let result = analyze(&p.program, &options(cs));
        let a1 = result.obj_of_site(p.a_sites[0]).unwrap();
        let field = p.program.class(p.program.class_by_name("A").unwrap()).declared_field("b").unwrap();
        let stored = result.instance_field_points_to(a1, field);
        assert!(stored.contains(&result.obj_of_site(p.b_sites[0]).unwrap()), "{}", cs);
        assert_eq!(result.callees_of(p.set_calls[0]), BTreeSet::from([p.set]), "{}", cs);
        assert!(result.check_fixpoint(), "{}", cs);
    }
}

#[test]
fn static_call_has_exactly_one_callee() {
    let mut builder = ProgramBuilder::new();
    let t_ty = builder.add_class("T", None);
    let u_ty = builder.add_class("U", Some(t_ty));
    let t_m = builder.add_method(t_ty, "void m()", static_modifiers());
    builder.add_method(u_ty, "void m()", static_modifiers());
    let main = builder.add_method(u_ty, "void main()", static_modifiers());
    let call = builder.invoke(main, CallKind::Static, t_ty, "void m()", None, &[], None);
    builder.add_entry(main);
    let program = builder.build();

    for cs in ALL_VARIANTS {
        let result = analyze(&program, &options(cs));
        assert_eq!(result.callees_of(call), BTreeSet::from([t_m]), "{}", cs);
        assert_eq!(
            result.call_edges(),
            BTreeSet::from([(call, t_m, CallKind::Static)]),
            "{}",
            cs
        );
    }
}

/// Two string constants whose `length()` is called, plus a call on a
/// non-string object.
fn strings_program() -> (Program, [VarId; 2]) {
    let mut builder = ProgramBuilder::new();
    let string = builder.string_type();
    let length = builder.add_method(string, "int length()", MethodModifiers::default());
    let n = builder.add_var(length, "n", builder.object_type());
    builder.add_return(length, n);
    let c_ty = builder.add_class("C", None);
    builder.add_method(c_ty, "void run()", MethodModifiers::default());

    let main = builder.add_method(c_ty, "void main()", static_modifiers());
    let s1 = builder.add_var(main, "s1", string);
    let s2 = builder.add_var(main, "s2", string);
    let c = builder.add_var(main, "c", c_ty);
    builder.string_const(main, s1, "hello");
    builder.string_const(main, s2, "world");
    builder.new_obj(main, c, c_ty);
    builder.invoke(main, CallKind::Virtual, string, "int length()", Some(s1), &[], None);
    builder.invoke(main, CallKind::Virtual, string, "int length()", Some(s2), &[], None);
    builder.invoke(main, CallKind::Virtual, c_ty, "void run()", Some(c), &[], None);
    builder.add_entry(main);
    (builder.build(), [s1, s2])
}

#[test]
fn merging_string_constants_keeps_reachability() {
    let (program, [s1, s2]) = strings_program();
    for cs in [ContextSensitivity::Insensitive, ContextSensitivity::Object(1)] {
        let plain = analyze(&program, &options(cs));
        let merged_options = AnalysisOptions {
            merge_string_constants: true,
            ..options(cs)
        };
        let merged = analyze(&program, &merged_options);

        let plain_methods: BTreeSet<MethodId> = plain.reachable_methods().collect();
        let merged_methods: BTreeSet<MethodId> = merged.reachable_methods().collect();
        assert_eq!(plain_methods, merged_methods);

        assert_ne!(plain.var_points_to(s1), plain.var_points_to(s2));
        assert_eq!(merged.var_points_to(s1), merged.var_points_to(s2));
        assert_eq!(merged.var_points_to(s1).len(), 1);
    }
}

#[test]
fn static_field_access_initializes_class_once() {
    let mut builder = ProgramBuilder::new();
    let d_ty = builder.add_class("D", None);
    let i_ty = builder.add_interface("I", &[]);
    let e_ty = builder.add_class("E", Some(d_ty));
    builder.implement(e_ty, i_ty);
    let obj = builder.object_type();
    let field = builder.add_field(e_ty, "f", obj, true);
    let d_clinit = builder.add_method(d_ty, "void <clinit>()", static_modifiers());
    let i_clinit = builder.add_method(i_ty, "void <clinit>()", static_modifiers());
    let e_clinit = builder.add_method(e_ty, "void <clinit>()", static_modifiers());
    let init_val = builder.add_var(e_clinit, "v", obj);
    let init_site = builder.new_obj(e_clinit, init_val, obj);
    builder.store_static(e_clinit, field, init_val);

    let main_ty = builder.add_class("Main", None);
    let main = builder.add_method(main_ty, "void main()", static_modifiers());
    let x = builder.add_var(main, "x", obj);
    let y = builder.add_var(main, "y", obj);
    builder.load_static(main, x, field);
    builder.load_static(main, y, field);
    builder.store_static(main, field, x);
    builder.add_entry(main);
    let program = builder.build();

    for cs in ALL_VARIANTS {
        let result = analyze(&program, &options(cs));
        assert!(result.is_reachable(e_clinit), "{}", cs);
        assert_eq!(result.contexts_of(e_clinit).len(), 1, "{}", cs);
        assert_eq!(result.reachable_methods().filter(|m| *m == e_clinit).count(), 1);
        // Superclasses are initialized first, superinterfaces are not.
        assert!(result.is_reachable(d_clinit), "{}", cs);
        assert!(!result.is_reachable(i_clinit), "{}", cs);
        assert_eq!(result.var_points_to(y), objs(&result, &[init_site]), "{}", cs);
    }
}

/// Checks that every callback sees a growing points-to set.
#[derive(Default)]
struct MonotonicityChecker {
    sizes: HashMap<PointerId, usize>,
    violations: Vec<String>,
    notifications: usize,
    new_methods: HashSet<MethodId>,
    repeated_methods: usize,
}

impl Plugin for MonotonicityChecker {
    fn on_new_points_to_set(&mut self, env: &mut PluginEnv<'_>, pointer: PointerId, diff: &PointsTo) {
        self.notifications += 1;
        if diff.is_empty() {
            self.violations.push(format!("empty diff for {:?}", pointer));
        }
        let size = env.points_to(pointer).count();
        let previous = self.sizes.insert(pointer, size).unwrap_or(0);
        if size < previous || size < diff.count() {
            self.violations.push(format!("{:?} shrank from {} to {}", pointer, previous, size));
        }
    }

    fn on_new_method(&mut self, _env: &mut PluginEnv<'_>, method: MethodId) {
        if !self.new_methods.insert(method) {
            self.repeated_methods += 1;
        }
    }
}

#[test]
fn points_to_sets_only_grow() {
    let p = set_get_program();
    for cs in ALL_VARIANTS {
        let mut checker = MonotonicityChecker::default();
        let result = pta::run(&p.program, &options(cs), &mut checker).unwrap();
        assert!(checker.violations.is_empty(), "{}: {:?}", cs, checker.violations);
        assert!(checker.notifications > 0);
        assert_eq!(checker.repeated_methods, 0);
        let reachable: HashSet<MethodId> = result.reachable_methods().collect();
        assert_eq!(checker.new_methods, reachable);
    }
}

/// Adds a mock object to every variable named `sink` as soon as its method
/// becomes reachable.
struct MockSource;

impl Plugin for MockSource {
    fn on_new_cs_method(&mut self, env: &mut PluginEnv<'_>, cs_method: bytepta::cs::CSMethodId) {
        let cs_method = env.csm().get_cs_method(cs_method);
        let sink = env
            .program()
            .vars()
            .find(|(_, var)| var.method == cs_method.method && var.name == "sink")
            .map(|(id, var)| (id, var.ty));
        if let Some((var, ty)) = sink {
            let obj = env.mock_obj("<mock sink>", ty);
            let cs_obj = env.cs_obj(cs_method.cid, obj);
            env.add_var_points_to(cs_method.cid, var, cs_obj);
        }
    }
}

#[test]
fn plugin_facts_are_propagated() {
    let mut builder = ProgramBuilder::new();
    let obj = builder.object_type();
    let main_ty = builder.add_class("Main", None);
    let main = builder.add_method(main_ty, "void main()", static_modifiers());
    let sink = builder.add_var(main, "sink", obj);
    let copy = builder.add_var(main, "copy", obj);
    builder.assign(main, copy, sink);
    builder.add_entry(main);
    let program = builder.build();

    let mut plugin = MockSource;
    let result = pta::run(&program, &options(ContextSensitivity::Insensitive), &mut plugin).unwrap();
    assert_eq!(result.var_points_to(copy).len(), 1);
    assert_eq!(result.var_points_to(copy), result.var_points_to(sink));
    assert!(result.check_fixpoint());
}

#[test]
fn propagating_again_changes_nothing() {
    let p = set_get_program();
    let opts = options(ContextSensitivity::Object(2));
    let fresh = analyze(&p.program, &opts);

    let mut plugin = NoPlugin;
    let mut solver = ContextSensitivePTA::new(
        &p.program,
        &opts,
        p.program.entry_methods().to_vec(),
        KObjectSensitive::new(2),
        &mut plugin,
    )
    .unwrap();
    solver.analyze();
    let edges_before = solver.call_graph.num_edges();
    solver.propagate();
    assert_eq!(solver.call_graph.num_edges(), edges_before);
    let again = solver.finalize();

    assert!(again.check_fixpoint());
    assert_eq!(again.cs_call_edges().len(), fresh.cs_call_edges().len());
    assert_eq!(again.call_edges(), fresh.call_edges());
    assert_eq!(again.pfg().num_edges(), fresh.pfg().num_edges());
    for (var, _) in p.program.vars() {
        assert_eq!(again.var_points_to(var), fresh.var_points_to(var));
    }
}

#[test]
fn elements_are_interned() {
    let p = set_get_program();
    let result = analyze(&p.program, &options(ContextSensitivity::CallSite(2)));
    let csm = result.csm();

    let cs_objs: HashSet<_> = csm.cs_objs().map(|(_, cs_obj)| cs_obj).collect();
    assert_eq!(cs_objs.len(), csm.num_cs_objs());
    let pointers: HashSet<_> = csm.pointers().map(|(_, pointer)| pointer).collect();
    assert_eq!(pointers.len(), csm.num_pointers());
    for (id, cs_var) in csm.cs_vars() {
        assert_eq!(csm.find_cs_var(cs_var.cid, cs_var.var), Some(id));
    }
    let cs_methods: HashSet<_> = result.reachable_cs_methods().collect();
    assert_eq!(cs_methods.len(), result.reachable_cs_methods().count());
}

/// `main -> f1 -> f2 -> f3 -> f3 ...`, each call passing an object along.
fn call_chain_program() -> (Program, [MethodId; 3], VarId, AllocSiteId) {
    let mut builder = ProgramBuilder::new();
    let obj = builder.object_type();
    let c_ty = builder.add_class("Chain", None);
    let mut methods = Vec::new();
    for name in ["f1", "f2", "f3"] {
        let method = builder.add_method(c_ty, &format!("java.lang.Object {}(java.lang.Object)", name), static_modifiers());
        methods.push(method);
    }
    let mut params = Vec::new();
    for (i, method) in methods.iter().enumerate() {
        let param = builder.add_param(*method, "p", obj);
        let ret = builder.add_var(*method, "r", obj);
        let next = if i + 1 < methods.len() { i + 1 } else { i };
        let subsig = builder.program().method(methods[next]).subsignature.clone();
        builder.invoke(*method, CallKind::Static, c_ty, &subsig, None, &[param], Some(ret));
        builder.add_return(*method, param);
        params.push(param);
    }
    let main = builder.add_method(c_ty, "void main()", static_modifiers());
    let o = builder.add_var(main, "o", obj);
    let site = builder.new_obj(main, o, obj);
    let subsig = builder.program().method(methods[0]).subsignature.clone();
    builder.invoke(main, CallKind::Static, c_ty, &subsig, None, &[o], None);
    builder.add_entry(main);
    (builder.build(), [methods[0], methods[1], methods[2]], params[2], site)
}

#[test]
fn contexts_never_exceed_the_depth_limit() {
    let (program, methods, deepest_param, site) = call_chain_program();
    for k in 1..=3 {
        let result = analyze(&program, &options(ContextSensitivity::CallSite(k)));
        for cs_method in result.reachable_cs_methods() {
            let cid = result.csm().get_cs_method(cs_method).cid;
            assert!(result.context_elements(cid).len() <= k);
        }
        for method in methods {
            assert!(result.is_reachable(method));
        }
        assert_eq!(result.var_points_to(deepest_param), objs(&result, &[site]));
        assert!(result.check_fixpoint());
    }
}

#[test]
fn context_sensitive_results_refine_insensitive_ones() {
    let p = set_get_program();
    let (chain, _, _, _) = call_chain_program();
    for program in [&p.program, &chain] {
        let ci = analyze(program, &options(ContextSensitivity::Insensitive));
        let ci_methods: BTreeSet<MethodId> = ci.reachable_methods().collect();
        for cs in ALL_VARIANTS {
            let result = analyze(program, &options(cs));
            let methods: BTreeSet<MethodId> = result.reachable_methods().collect();
            assert!(methods.is_subset(&ci_methods), "{}", cs);
            assert!(result.call_edges().is_subset(&ci.call_edges()), "{}", cs);
            for (var, _) in program.vars() {
                assert!(
                    result.var_points_to(var).is_subset(&ci.var_points_to(var)),
                    "{}: {}",
                    cs,
                    program.var_display(var)
                );
            }
        }
    }
}

#[test]
fn casts_filter_incompatible_objects() {
    let mut builder = ProgramBuilder::new();
    let obj = builder.object_type();
    let a_ty = builder.add_class("A", None);
    let sub_ty = builder.add_class("SubA", Some(a_ty));
    let b_ty = builder.add_class("B", None);
    let main = builder.add_method(a_ty, "void main()", static_modifiers());
    let a = builder.add_var(main, "a", a_ty);
    let s = builder.add_var(main, "s", sub_ty);
    let b = builder.add_var(main, "b", b_ty);
    let x = builder.add_var(main, "x", obj);
    let y = builder.add_var(main, "y", a_ty);
    let a_site = builder.new_obj(main, a, a_ty);
    let s_site = builder.new_obj(main, s, sub_ty);
    let b_site = builder.new_obj(main, b, b_ty);
    builder.assign(main, x, a);
    builder.assign(main, x, s);
    builder.assign(main, x, b);
    builder.cast(main, y, x, a_ty);
    builder.add_entry(main);
    let program = builder.build();

    let result = analyze(&program, &options(ContextSensitivity::Insensitive));
    assert_eq!(result.var_points_to(x), objs(&result, &[a_site, s_site, b_site]));
    assert_eq!(result.var_points_to(y), objs(&result, &[a_site, s_site]));
    assert!(result.check_fixpoint());
}

#[test]
fn arraycopy_moves_array_contents() {
    let mut builder = ProgramBuilder::new();
    let obj = builder.object_type();
    let system = builder.add_class("java.lang.System", None);
    let arraycopy = builder.add_method(
        system,
        "void arraycopy(java.lang.Object,int,java.lang.Object,int,int)",
        MethodModifiers {
            is_static: true,
            is_native: true,
            ..Default::default()
        },
    );
    for name in ["src", "srcPos", "dest", "destPos", "length"] {
        builder.add_param(arraycopy, name, obj);
    }
    let arr_ty = builder.array_type(obj);
    let main_ty = builder.add_class("Main", None);
    let main = builder.add_method(main_ty, "void main()", static_modifiers());
    let src = builder.add_var(main, "src", arr_ty);
    let dest = builder.add_var(main, "dest", arr_ty);
    let elem = builder.add_var(main, "elem", obj);
    let read = builder.add_var(main, "read", obj);
    let n = builder.add_var(main, "n", obj);
    builder.new_array(main, src, arr_ty);
    let dest_site = builder.new_array(main, dest, arr_ty);
    let elem_site = builder.new_obj(main, elem, obj);
    builder.store_array(main, src, elem);
    let call = builder.invoke(
        main,
        CallKind::Static,
        system,
        "void arraycopy(java.lang.Object,int,java.lang.Object,int,int)",
        None,
        &[src, n, dest, n, n],
        None,
    );
    builder.load_array(main, read, dest);
    builder.add_entry(main);
    let program = builder.build();

    for cs in [ContextSensitivity::Insensitive, ContextSensitivity::CallSite(1)] {
        let result = analyze(&program, &options(cs));
        assert_eq!(result.callees_of(call), BTreeSet::from([arraycopy]));
        assert_eq!(result.var_points_to(read), objs(&result, &[elem_site]));
        let dest_obj = result.obj_of_site(dest_site).unwrap();
        assert_eq!(result.array_index_points_to(dest_obj), objs(&result, &[elem_site]));
        assert!(result.check_fixpoint());
    }
}

#[test]
fn unresolved_calls_are_told_apart_from_unreached_ones() {
    let mut builder = ProgramBuilder::new();
    let i_ty = builder.add_interface("I", &[]);
    builder.add_method(
        i_ty,
        "void m()",
        MethodModifiers {
            is_abstract: true,
            ..Default::default()
        },
    );
    let c_ty = builder.add_class("C", None);
    builder.implement(c_ty, i_ty);

    let main_ty = builder.add_class("Main", None);
    let main = builder.add_method(main_ty, "void main()", static_modifiers());
    let c = builder.add_var(main, "c", i_ty);
    let never = builder.add_var(main, "never", i_ty);
    builder.new_obj(main, c, c_ty);
    let resolvable_never = builder.invoke(main, CallKind::Interface, i_ty, "void m()", Some(never), &[], None);
    let unresolved = builder.invoke(main, CallKind::Interface, i_ty, "void m()", Some(c), &[], None);
    let missing_static = builder.invoke(main, CallKind::Static, main_ty, "void absent()", None, &[], None);

    let dead = builder.add_method(main_ty, "void dead()", static_modifiers());
    let dead_call = builder.invoke(dead, CallKind::Static, main_ty, "void absent()", None, &[], None);
    builder.add_entry(main);
    let program = builder.build();

    let result = analyze(&program, &options(ContextSensitivity::Object(1)));
    assert!(result.unresolved_calls().contains(&(unresolved, Some(c_ty))));
    assert!(result.unresolved_calls().contains(&(missing_static, None)));
    assert!(result.is_unresolved(unresolved));
    assert!(!result.is_unresolved(resolvable_never));
    assert!(!result.is_unresolved(dead_call));
    assert!(result.callees_of(unresolved).is_empty());
    assert!(result.callees_of(resolvable_never).is_empty());
    assert!(!result.is_reachable(dead));
    assert!(result.check_fixpoint());
}

#[test]
fn default_methods_are_dispatched() {
    let mut builder = ProgramBuilder::new();
    let i_ty = builder.add_interface("I", &[]);
    let default_m = builder.add_method(i_ty, "void m()", MethodModifiers::default());
    let c_ty = builder.add_class("C", None);
    builder.implement(c_ty, i_ty);
    let main = builder.add_method(c_ty, "void main()", static_modifiers());
    let c = builder.add_var(main, "c", i_ty);
    builder.new_obj(main, c, c_ty);
    let call = builder.invoke(main, CallKind::Interface, i_ty, "void m()", Some(c), &[], None);
    builder.add_entry(main);
    let program = builder.build();

    let result = analyze(&program, &options(ContextSensitivity::Type(1)));
    assert_eq!(result.callees_of(call), BTreeSet::from([default_m]));
    let this = program.method(default_m).this_var.unwrap();
    assert_eq!(result.var_points_to(this).len(), 1);
}

#[test]
fn missing_entries_are_reported() {
    let mut builder = ProgramBuilder::new();
    let c_ty = builder.add_class("C", None);
    builder.add_method(c_ty, "void main()", static_modifiers());
    let program = builder.build();
    let mut plugin = NoPlugin;

    let err = pta::run(&program, &options(ContextSensitivity::Insensitive), &mut plugin).unwrap_err();
    assert!(matches!(err, bytepta::error::PtaError::NoEntryMethod));

    let named = AnalysisOptions {
        entries: vec!["<C: void main()>".to_string()],
        ..Default::default()
    };
    assert!(pta::run(&program, &named, &mut plugin).is_ok());

    let unknown = AnalysisOptions {
        entries: vec!["<C: void start()>".to_string()],
        ..Default::default()
    };
    let err = pta::run(&program, &unknown, &mut plugin).unwrap_err();
    assert!(matches!(err, bytepta::error::PtaError::UnknownEntry(_)));
}

#[test]
fn zero_depth_is_rejected_before_solving() {
    let SetGetProgram { program, .. } = set_get_program();
    let mut plugin = NoPlugin;
    for cs in [
        ContextSensitivity::CallSite(0),
        ContextSensitivity::Object(0),
        ContextSensitivity::Type(0),
    ] {
        let err = pta::run(&program, &options(cs), &mut plugin).unwrap_err();
        assert!(matches!(err, bytepta::error::PtaError::InvalidContextDepth(_)), "{}", cs);
    }
    assert!(pta::run(&program, &options(ContextSensitivity::CallSite(1)), &mut plugin).is_ok());
}
