// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The in-memory program representation consumed by the analysis.
//!
//! Every program element lives in an arena owned by [`Program`] and is addressed
//! by a typed index. Elements are created once, by [`super::ProgramBuilder`] or
//! the JSON loader, and are never mutated while the analysis runs.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::known_names;
use super::stmt::Stmt;
use crate::util::index_vec::IndexVec;

crate::newtype_index! {
    /// A class, interface or array type.
    pub struct TypeId;
}
crate::newtype_index! { pub struct MethodId; }
crate::newtype_index! { pub struct VarId; }
crate::newtype_index! { pub struct FieldId; }
crate::newtype_index! { pub struct CallSiteId; }
crate::newtype_index! { pub struct AllocSiteId; }

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
    /// An array type with the given element type.
    Array(TypeId),
}

#[derive(Clone, Debug)]
pub struct Class {
    pub name: String,
    pub kind: TypeKind,
    pub super_class: Option<TypeId>,
    pub interfaces: Vec<TypeId>,
    /// Declared methods keyed by subsignature.
    pub(crate) methods: HashMap<String, MethodId>,
    /// Declared fields keyed by name.
    pub(crate) fields: HashMap<String, FieldId>,
}

impl Class {
    pub(crate) fn new(name: String, kind: TypeKind) -> Self {
        Class {
            name,
            kind,
            super_class: None,
            interfaces: Vec::new(),
            methods: HashMap::new(),
            fields: HashMap::new(),
        }
    }

    #[inline]
    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeKind::Array(_))
    }

    /// Returns the method this class declares with the given subsignature.
    pub fn declared_method(&self, subsignature: &str) -> Option<MethodId> {
        self.methods.get(subsignature).copied()
    }

    pub fn declared_field(&self, name: &str) -> Option<FieldId> {
        self.fields.get(name).copied()
    }}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MethodModifiers {
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_native: bool,
    pub is_private: bool,
}

#[derive(Clone, Debug)]
pub struct Method {
    /// The simple name, e.g. `set` or `<init>`.
    pub name: String,
    /// Return type, name and parameter types, e.g. `void set(B)`.
    pub subsignature: String,
    pub declaring_class: TypeId,
    pub modifiers: MethodModifiers,
    pub this_var: Option<VarId>,
    pub params: Vec<VarId>,
    pub return_vars: Vec<VarId>,
    pub body: Vec<Stmt>,
}

impl Method {
    #[inline]
    pub fn is_static(&self) -> bool {
        self.modifiers.is_static
    }

    #[inline]
    pub fn is_abstract(&self) -> bool {
        self.modifiers.is_abstract
    }

    #[inline]
    pub fn is_native(&self) -> bool {
        self.modifiers.is_native
    }

    #[inline]
    pub fn is_constructor(&self) -> bool {
        self.name == known_names::INIT_NAME
    }
}

#[derive(Clone, Debug)]
pub struct Var {
    pub name: String,
    pub method: MethodId,
    pub ty: TypeId,
}

#[derive(Clone, Debug)]
pub struct Field {
    pub name: String,
    pub declaring_class: TypeId,
    pub ty: TypeId,
    pub is_static: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    Virtual,
    Interface,
    Special,
    Static,
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallKind::Virtual => "virtual",
            CallKind::Interface => "interface",
            CallKind::Special => "special",
            CallKind::Static => "static",
        };
        f.write_str(name)
    }
}

/// The declared target of a call: the class named at the call site and the
/// subsignature of the method.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub class: TypeId,
    pub subsignature: String,
}

#[derive(Clone, Debug)]
pub struct CallSite {
    pub container: MethodId,
    /// Position of the call among the statements of its container.
    pub index: usize,
    pub kind: CallKind,
    pub method_ref: MethodRef,
    pub receiver: Option<VarId>,
    pub args: Vec<VarId>,
    pub result: Option<VarId>,
}

impl CallSite {
    #[inline]
    pub fn is_static(&self) -> bool {
        self.kind == CallKind::Static
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AllocKind {
    Object,
    Array,
    StringConstant(String),
}

#[derive(Clone, Debug)]
pub struct AllocSite {
    pub container: MethodId,
    /// Position of the allocation among the statements of its container.
    pub index: usize,
    pub ty: TypeId,
    pub kind: AllocKind,
}

/// A whole program: its type hierarchy, methods with their statements, and
/// the entry methods from which reachability starts.
#[derive(Clone, Debug, Default)]
pub struct Program {
    pub(crate) classes: IndexVec<TypeId, Class>,
    pub(crate) methods: IndexVec<MethodId, Method>,
    pub(crate) vars: IndexVec<VarId, Var>,
    pub(crate) fields: IndexVec<FieldId, Field>,
    pub(crate) call_sites: IndexVec<CallSiteId, CallSite>,
    pub(crate) alloc_sites: IndexVec<AllocSiteId, AllocSite>,
    pub(crate) class_by_name: HashMap<String, TypeId>,
    pub(crate) entries: Vec<MethodId>,
}

impl Program {
    #[inline]
    pub fn class(&self, ty: TypeId) -> &Class {
        &self.classes[ty]
    }

    #[inline]
    pub fn method(&self, method: MethodId) -> &Method {
        &self.methods[method]
    }

    #[inline]
    pub fn var(&self, var: VarId) -> &Var {
        &self.vars[var]
    }

    #[inline]
    pub fn field(&self, field: FieldId) -> &Field {
        &self.fields[field]
    }

    #[inline]
    pub fn call_site(&self, call_site: CallSiteId) -> &CallSite {
        &self.call_sites[call_site]
    }

    #[inline]
    pub fn alloc_site(&self, site: AllocSiteId) -> &AllocSite {
        &self.alloc_sites[site]
    }

    pub fn class_by_name(&self, name: &str) -> Option<TypeId> {
        self.class_by_name.get(name).copied()
    }

    pub fn entry_methods(&self) -> &[MethodId] {
        &self.entries
    }

    pub fn classes(&self) -> impl Iterator<Item = (TypeId, &Class)> + '_ {
        self.classes.iter_enumerated()
    }

    pub fn methods(&self) -> impl Iterator<Item = (MethodId, &Method)> + '_ {
        self.methods.iter_enumerated()
    }

    pub fn vars(&self) -> impl Iterator<Item = (VarId, &Var)> + '_ {
        self.vars.iter_enumerated()
    }

    pub fn num_methods(&self) -> usize {
        self.methods.len()
    }

    #[inline]
    pub fn type_name(&self, ty: TypeId) -> &str {
        &self.classes[ty].name
    }

    /// The full signature of a method, e.g. `<A: void set(B)>`.
    pub fn method_signature(&self, method: MethodId) -> String {
        let m = &self.methods[method];
        format!("<{}: {}>", self.type_name(m.declaring_class), m.subsignature)
    }

    pub fn method_ref(&self, class: TypeId, subsignature: &str) -> MethodRef {
        MethodRef {
            class,
            subsignature: subsignature.to_string(),
        }
    }

    /// Finds a method by its full signature `<Class: subsignature>`.
    pub fn method_by_signature(&self, signature: &str) -> Option<MethodId> {
        let inner = signature.strip_prefix('<')?.strip_suffix('>')?;
        let (class, subsig) = inner.split_once(": ")?;
        self.class(self.class_by_name(class)?).declared_method(subsig.trim())
    }

    /// A human-readable name for a variable, e.g. `<A: void set(B)>/b`.
    pub fn var_display(&self, var: VarId) -> String {
        let v = &self.vars[var];
        format!("{}/{}", self.method_signature(v.method), v.name)
    }

    pub fn field_display(&self, field: FieldId) -> String {
        let f = &self.fields[field];
        format!("{}.{}", self.type_name(f.declaring_class), f.name)
    }

    pub fn call_site_display(&self, call_site: CallSiteId) -> String {
        let cs = &self.call_sites[call_site];
        format!(
            "{}[{}@{}.{}]",
            self.method_signature(cs.container),
            cs.index,
            self.type_name(cs.method_ref.class),
            cs.method_ref.subsignature
        )
    }

    pub fn alloc_site_display(&self, site: AllocSiteId) -> String {
        let s = &self.alloc_sites[site];
        match &s.kind {
            AllocKind::StringConstant(value) => format!("{:?}", value),
            _ => format!(
                "{}[{}@new {}]",
                self.method_signature(s.container),
                s.index,
                self.type_name(s.ty)
            ),
        }
    }
}

/// Extracts the simple method name from a subsignature such as `void set(B)`.
pub(crate) fn method_name_of(subsignature: &str) -> &str {
    let head = subsignature.split('(').next().unwrap_or(subsignature);
    head.rsplit(' ').next().unwrap_or(head).trim()
}
