// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Builds the pointer flow template of a single method.
//!
//! The template is context free: it refers to local variables only, and is
//! instantiated by the solver for each context the method is reached under.

use log::*;
use std::fmt::{Debug, Formatter, Result};

use crate::graph::method_pfg::MethodPFG;
use crate::graph::pfg::PFGEdgeKind;
use crate::ir::{AllocKind, CallSiteId, MethodId, Program, Stmt};

/// A visitor over the statements of a method body that records the flow
/// constraints of each statement into a [`MethodPFG`].
pub struct MethodPFGBuilder<'p> {
    pub(crate) program: &'p Program,
    pub(crate) method: MethodId,
    /// The template under construction.
    pub(crate) mpfg: MethodPFG,
}

impl<'p> Debug for MethodPFGBuilder<'p> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        "MethodPFGBuilder".fmt(f)
    }
}

impl<'p> MethodPFGBuilder<'p> {
    pub fn new(program: &'p Program, method: MethodId) -> MethodPFGBuilder<'p> {
        debug!(
            "Building MethodPFG for {:?}: {}",
            method,
            program.method_signature(method)
        );
        MethodPFGBuilder {
            program,
            method,
            mpfg: MethodPFG::new(method),
        }
    }

    /// Visits every statement of the method and returns the finished template.
    pub fn build(mut self) -> MethodPFG {
        let program = self.program;
        for stmt in &program.method(self.method).body {
            self.visit_stmt(stmt);
        }
        self.mpfg
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match *stmt {
            Stmt::New { lhs, site } => {
                self.mpfg.allocs.push((lhs, site));
                let alloc = self.program.alloc_site(site);
                if alloc.kind == AllocKind::Object {
                    self.mpfg.add_initialized_class(alloc.ty);
                }
            }
            Stmt::Assign { lhs, rhs } => {
                self.mpfg.add_internal_edge(rhs, lhs, PFGEdgeKind::Assign);
            }
            Stmt::Cast { lhs, rhs, ty } => {
                self.mpfg.add_internal_edge(rhs, lhs, PFGEdgeKind::Cast(ty));
            }
            Stmt::LoadField { lhs, base, field } => {
                self.mpfg.add_internal_edge(base, lhs, PFGEdgeKind::Load(field));
            }
            Stmt::StoreField { base, field, rhs } => {
                self.mpfg.add_internal_edge(rhs, base, PFGEdgeKind::Store(field));
            }
            Stmt::LoadArray { lhs, base } => {
                self.mpfg.add_internal_edge(base, lhs, PFGEdgeKind::LoadArray);
            }
            Stmt::StoreArray { base, rhs } => {
                self.mpfg.add_internal_edge(rhs, base, PFGEdgeKind::StoreArray);
            }
            Stmt::LoadStatic { lhs, field } => {
                self.mpfg.static_loads.push((field, lhs));
                self.mpfg
                    .add_initialized_class(self.program.field(field).declaring_class);
            }
            Stmt::StoreStatic { field, rhs } => {
                self.mpfg.static_stores.push((rhs, field));
                self.mpfg
                    .add_initialized_class(self.program.field(field).declaring_class);
            }
            Stmt::Invoke(call_site) => self.visit_call(call_site),
        }
    }

    fn visit_call(&mut self, call_site: CallSiteId) {
        let cs = self.program.call_site(call_site);
        if cs.is_static() {
            self.mpfg.static_callsites.push(call_site);
            return;
        }
        match cs.receiver {
            Some(receiver) => self.mpfg.instance_callsites.push((receiver, call_site)),
            None => warn!(
                "Ignoring {} call without receiver: {}",
                cs.kind,
                self.program.call_site_display(call_site)
            ),
        }
    }
}

/// Builds the template of `method`.
pub fn build_method_pfg(program: &Program, method: MethodId) -> MethodPFG {
    MethodPFGBuilder::new(program, method).build()
}

#[cfg(test)]
mod test {
    use super::build_method_pfg;
    use crate::graph::pfg::PFGEdgeKind;
    use crate::ir::{CallKind, MethodModifiers, ProgramBuilder};

    #[test]
    fn statements_become_template_entries() {
        let mut builder = ProgramBuilder::new();
        let object = builder.object_type();
        let a = builder.add_class("A", None);
        let e = builder.add_class("E", None);
        let f = builder.add_field(a, "f", object, false);
        let s = builder.add_field(e, "s", object, true);
        let m = builder.add_method(a, "void m()", MethodModifiers::default());
        let this = builder.this_var(m).unwrap();
        let x = builder.add_var(m, "x", a);
        let y = builder.add_var(m, "y", object);

        let site = builder.new_obj(m, x, a);
        builder.assign(m, y, x);
        builder.cast(m, x, y, a);
        builder.store_field(m, this, f, y);
        builder.load_field(m, y, x, f);
        builder.load_static(m, y, s);
        let virt = builder.invoke(m, CallKind::Virtual, a, "void m()", Some(x), &[], None);
        let stat = builder.invoke(m, CallKind::Static, e, "void run()", None, &[], None);
        let program = builder.build();

        let mpfg = build_method_pfg(&program, m);
        assert_eq!(mpfg.allocs, vec![(x, site)]);
        assert_eq!(
            mpfg.internal_edges,
            vec![
                (x, y, PFGEdgeKind::Assign),
                (y, x, PFGEdgeKind::Cast(a)),
                (y, this, PFGEdgeKind::Store(f)),
                (x, y, PFGEdgeKind::Load(f)),
            ]
        );
        assert_eq!(mpfg.static_loads, vec![(s, y)]);
        assert_eq!(mpfg.instance_callsites, vec![(x, virt)]);
        assert_eq!(mpfg.static_callsites, vec![stat]);
        assert_eq!(mpfg.initialized_classes, vec![a, e]);
    }
}
