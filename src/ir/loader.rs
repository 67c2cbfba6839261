// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Loads a [`Program`] from its JSON description.
//!
//! ```json
//! {
//!   "entries": ["<Main: void main()>"],
//!   "classes": [{
//!     "name": "Main",
//!     "fields": [{ "name": "f", "type": "java.lang.Object", "static": true }],
//!     "methods": [{
//!       "subsignature": "void main()",
//!       "static": true,
//!       "vars": [{ "name": "o", "type": "java.lang.Object" }],
//!       "body": [
//!         { "op": "new", "lhs": "o", "type": "java.lang.Object" },
//!         { "op": "store_static", "field": "Main.f", "rhs": "o" }
//!       ]
//!     }]
//!   }]
//! }
//! ```
//!
//! Types ending in `[]` denote array types and need not be declared. Fields are
//! referenced as `Class.name` and resolved in the named class or its
//! superclasses. Called methods need not be declared: an unknown target simply
//! never resolves.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use log::debug;
use serde::Deserialize;

use super::builder::ProgramBuilder;
use super::program::{CallKind, FieldId, MethodId, MethodModifiers, Program, TypeId, VarId};
use crate::error::{PtaError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProgramDesc {
    #[serde(default)]
    pub entries: Vec<String>,
    pub classes: Vec<ClassDesc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassDesc {
    pub name: String,
    #[serde(default, rename = "super")]
    pub super_class: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub interface: bool,
    #[serde(default)]
    pub fields: Vec<FieldDesc>,
    #[serde(default)]
    pub methods: Vec<MethodDesc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDesc {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, rename = "static")]
    pub is_static: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodDesc {
    pub subsignature: String,
    #[serde(default, rename = "static")]
    pub is_static: bool,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default, rename = "native")]
    pub is_native: bool,
    #[serde(default, rename = "private")]
    pub is_private: bool,
    #[serde(default)]
    pub params: Vec<VarDesc>,
    #[serde(default)]
    pub vars: Vec<VarDesc>,
    #[serde(default)]
    pub returns: Vec<String>,
    #[serde(default)]
    pub body: Vec<StmtDesc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VarDesc {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StmtDesc {
    New {
        lhs: String,
        #[serde(rename = "type")]
        ty: String,
    },
    NewArray {
        lhs: String,
        #[serde(rename = "type")]
        ty: String,
    },
    Const {
        lhs: String,
        value: String,
    },
    Assign {
        lhs: String,
        rhs: String,
    },
    Cast {
        lhs: String,
        rhs: String,
        #[serde(rename = "type")]
        ty: String,
    },
    Load {
        lhs: String,
        base: String,
        field: String,
    },
    Store {
        base: String,
        field: String,
        rhs: String,
    },
    LoadStatic {
        lhs: String,
        field: String,
    },
    StoreStatic {
        field: String,
        rhs: String,
    },
    LoadArray {
        lhs: String,
        base: String,
    },
    StoreArray {
        base: String,
        rhs: String,
    },
    Invoke {
        kind: CallKind,
        class: String,
        method: String,
        #[serde(default)]
        receiver: Option<String>,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        result: Option<String>,
    },
}

/// Reads and loads the JSON program at `path`.
pub fn load_program_file<P: AsRef<Path>>(path: P) -> Result<Program> {
    let text = fs::read_to_string(path)?;
    load_program_str(&text)
}

pub fn load_program_str(text: &str) -> Result<Program> {
    let desc: ProgramDesc = serde_json::from_str(text)?;
    load_program(&desc)
}

/// Builds a program from its description, checking every name it refers to.
pub fn load_program(desc: &ProgramDesc) -> Result<Program> {
    let mut loader = Loader {
        builder: ProgramBuilder::new(),
    };

    // Declare every class first so that they may refer to each other freely.
    for class in &desc.classes {
        if loader.builder.program().class_by_name(&class.name).is_some()
            && class.name != crate::ir::known_names::JAVA_LANG_OBJECT
        {
            return Err(PtaError::Load(format!("class {} declared twice", class.name)));
        }
        loader.builder.declare_class(&class.name);
    }
    for class in &desc.classes {
        loader.declare_hierarchy(class)?;
    }
    for class in &desc.classes {
        loader.check_acyclic(&class.name)?;
    }
    for class in &desc.classes {
        let ty = loader.class(&class.name)?;
        for field in &class.fields {
            let field_ty = loader.resolve_type(&field.ty)?;
            loader.builder.add_field(ty, &field.name, field_ty, field.is_static);
        }
    }

    let mut bodies = Vec::new();
    for class in &desc.classes {
        let ty = loader.class(&class.name)?;
        for method in &class.methods {
            let (id, scope) = loader.declare_method(ty, method)?;
            bodies.push((id, scope, method));
        }
    }
    for (id, scope, method) in bodies {
        for stmt in &method.body {
            loader.add_stmt(id, &scope, stmt)?;
        }
        for ret in &method.returns {
            let var = scope.lookup(ret)?;
            loader.builder.add_return(id, var);
        }
    }

    for entry in &desc.entries {
        let method = loader
            .builder
            .program()
            .method_by_signature(entry)
            .ok_or_else(|| PtaError::UnknownEntry(entry.clone()))?;
        loader.builder.add_entry(method);
    }

    let program = loader.builder.build();
    debug!(
        "Loaded {} classes, {} methods",
        program.classes().count(),
        program.num_methods()
    );
    Ok(program)
}

struct Loader {
    builder: ProgramBuilder,
}

/// The variables visible in a method body, by name.
struct Scope {
    method: String,
    vars: HashMap<String, VarId>,
}

impl Scope {
    fn lookup(&self, name: &str) -> Result<VarId> {
        self.vars
            .get(name)
            .copied()
            .ok_or_else(|| PtaError::Load(format!("unknown variable {} in {}", name, self.method)))
    }

    fn lookup_opt(&self, name: &Option<String>) -> Result<Option<VarId>> {
        name.as_deref().map(|n| self.lookup(n)).transpose()
    }
}

impl Loader {
    fn class(&self, name: &str) -> Result<TypeId> {
        self.builder
            .program()
            .class_by_name(name)
            .ok_or_else(|| PtaError::Load(format!("unknown type {}", name)))
    }

    fn resolve_type(&mut self, name: &str) -> Result<TypeId> {
        match name.strip_suffix("[]") {
            Some(elem) => {
                let elem = self.resolve_type(elem)?;
                Ok(self.builder.array_type(elem))
            }
            None => self.class(name),
        }
    }

    fn declare_hierarchy(&mut self, class: &ClassDesc) -> Result<()> {
        let ty = self.class(&class.name)?;
        if class.interface {
            self.builder.mark_interface(ty);
        } else {
            let super_class = match &class.super_class {
                Some(name) => self.class(name)?,
                None => self.builder.object_type(),
            };
            self.builder.set_super_class(ty, Some(super_class));
        }
        for name in &class.interfaces {
            let interface = self.class(name)?;
            self.builder.implement(ty, interface);
        }
        Ok(())
    }

    /// Fails if the superclass chain of `name` runs into a cycle.
    fn check_acyclic(&self, name: &str) -> Result<()> {
        let program = self.builder.program();
        let mut visited = HashSet::new();
        let mut cur = Some(self.class(name)?);
        while let Some(ty) = cur {
            if !visited.insert(ty) {
                return Err(PtaError::Load(format!("cyclic superclass chain through {}", name)));
            }
            cur = program.class(ty).super_class;
        }
        Ok(())
    }

    fn declare_method(&mut self, class: TypeId, desc: &MethodDesc) -> Result<(MethodId, Scope)> {
        if self.builder.program().class(class).declared_method(&desc.subsignature).is_some() {
            return Err(PtaError::Load(format!(
                "method {} declared twice in {}",
                desc.subsignature,
                self.builder.program().type_name(class)
            )));
        }
        let modifiers = MethodModifiers {
            is_static: desc.is_static,
            is_abstract: desc.is_abstract,
            is_native: desc.is_native,
            is_private: desc.is_private,
        };
        let method = self.builder.add_method(class, &desc.subsignature, modifiers);
        let mut scope = Scope {
            method: self.builder.program().method_signature(method),
            vars: HashMap::new(),
        };
        if let Some(this) = self.builder.this_var(method) {
            scope.vars.insert("this".to_string(), this);
        }
        for param in &desc.params {
            let ty = self.resolve_type(&param.ty)?;
            let var = self.builder.add_param(method, &param.name, ty);
            scope.vars.insert(param.name.clone(), var);
        }
        for local in &desc.vars {
            let ty = self.resolve_type(&local.ty)?;
            let var = self.builder.add_var(method, &local.name, ty);
            if scope.vars.insert(local.name.clone(), var).is_some() {
                return Err(PtaError::Load(format!(
                    "variable {} declared twice in {}",
                    local.name, scope.method
                )));
            }
        }
        Ok((method, scope))
    }

    /// Resolves `Class.name` to the field declared in `Class` or a superclass.
    fn field(&self, reference: &str) -> Result<FieldId> {
        let (class, name) = reference
            .rsplit_once('.')
            .ok_or_else(|| PtaError::Load(format!("malformed field reference {}", reference)))?;
        let program = self.builder.program();
        let ty = self.class(class)?;
        program
            .super_classes(ty)
            .find_map(|t| program.class(t).declared_field(name))
            .ok_or_else(|| PtaError::Load(format!("unknown field {}", reference)))
    }

    fn add_stmt(&mut self, method: MethodId, scope: &Scope, stmt: &StmtDesc) -> Result<()> {
        match stmt {
            StmtDesc::New { lhs, ty } => {
                let ty = self.resolve_type(ty)?;
                if self.builder.program().class(ty).is_array() {
                    self.builder.new_array(method, scope.lookup(lhs)?, ty);
                } else {
                    self.builder.new_obj(method, scope.lookup(lhs)?, ty);
                }
            }
            StmtDesc::NewArray { lhs, ty } => {
                let ty = self.resolve_type(ty)?;
                if !self.builder.program().class(ty).is_array() {
                    return Err(PtaError::Load(format!(
                        "new_array of non-array type {} in {}",
                        self.builder.program().type_name(ty),
                        scope.method
                    )));
                }
                self.builder.new_array(method, scope.lookup(lhs)?, ty);
            }
            StmtDesc::Const { lhs, value } => {
                self.builder.string_const(method, scope.lookup(lhs)?, value);
            }
            StmtDesc::Assign { lhs, rhs } => {
                self.builder.assign(method, scope.lookup(lhs)?, scope.lookup(rhs)?);
            }
            StmtDesc::Cast { lhs, rhs, ty } => {
                let ty = self.resolve_type(ty)?;
                self.builder.cast(method, scope.lookup(lhs)?, scope.lookup(rhs)?, ty);
            }
            StmtDesc::Load { lhs, base, field } => {
                let field = self.field(field)?;
                self.builder.load_field(method, scope.lookup(lhs)?, scope.lookup(base)?, field);
            }
            StmtDesc::Store { base, field, rhs } => {
                let field = self.field(field)?;
                self.builder.store_field(method, scope.lookup(base)?, field, scope.lookup(rhs)?);
            }
            StmtDesc::LoadStatic { lhs, field } => {
                let field = self.field(field)?;
                self.builder.load_static(method, scope.lookup(lhs)?, field);
            }
            StmtDesc::StoreStatic { field, rhs } => {
                let field = self.field(field)?;
                self.builder.store_static(method, field, scope.lookup(rhs)?);
            }
            StmtDesc::LoadArray { lhs, base } => {
                self.builder.load_array(method, scope.lookup(lhs)?, scope.lookup(base)?);
            }
            StmtDesc::StoreArray { base, rhs } => {
                self.builder.store_array(method, scope.lookup(base)?, scope.lookup(rhs)?);
            }
            StmtDesc::Invoke {
                kind,
                class,
                method: subsignature,
                receiver,
                args,
                result,
            } => {
                let class = self.resolve_type(class)?;
                let receiver = scope.lookup_opt(receiver)?;
                if (*kind == CallKind::Static) == receiver.is_some() {
                    return Err(PtaError::Load(format!(
                        "{} call to {} in {} must {}have a receiver",
                        kind,
                        subsignature,
                        scope.method,
                        if *kind == CallKind::Static { "not " } else { "" }
                    )));
                }
                let args = args
                    .iter()
                    .map(|a| scope.lookup(a))
                    .collect::<Result<Vec<_>>>()?;
                let result = scope.lookup_opt(result)?;
                self.builder
                    .invoke(method, *kind, class, subsignature, receiver, &args, result);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::load_program_str;
    use crate::error::PtaError;
    use crate::ir::Stmt;

    const SAMPLE: &str = r#"{
        "entries": ["<Main: void main()>"],
        "classes": [
            { "name": "Box", "fields": [{ "name": "item", "type": "java.lang.Object" }] },
            {
                "name": "Main",
                "methods": [{
                    "subsignature": "void main()",
                    "static": true,
                    "vars": [
                        { "name": "b", "type": "Box" },
                        { "name": "o", "type": "java.lang.Object" },
                        { "name": "arr", "type": "Box[]" }
                    ],
                    "body": [
                        { "op": "new", "lhs": "b", "type": "Box" },
                        { "op": "new", "lhs": "o", "type": "java.lang.Object" },
                        { "op": "new", "lhs": "arr", "type": "Box[]" },
                        { "op": "store", "base": "b", "field": "Box.item", "rhs": "o" },
                        { "op": "invoke", "kind": "virtual", "class": "Box",
                          "method": "int hashCode()", "receiver": "b" }
                    ]
                }]
            }
        ]
    }"#;

    #[test]
    fn loads_sample_program() {
        let program = load_program_str(SAMPLE).unwrap();
        let main = program.method_by_signature("<Main: void main()>").unwrap();
        assert_eq!(program.entry_methods(), &[main]);
        let body = &program.method(main).body;
        assert_eq!(body.len(), 5);
        assert!(matches!(body[3], Stmt::StoreField { .. }));
        let arr_ty = program.class_by_name("Box[]").unwrap();
        assert!(program.class(arr_ty).is_array());
        let box_ty = program.class_by_name("Box").unwrap();
        assert_eq!(program.class(box_ty).super_class, program.class_by_name("java.lang.Object"));
    }

    #[test]
    fn reports_dangling_names() {
        let unknown_var = SAMPLE.replace(r#""rhs": "o""#, r#""rhs": "missing""#);
        assert!(matches!(load_program_str(&unknown_var), Err(PtaError::Load(_))));

        let unknown_field = SAMPLE.replace("Box.item", "Box.nothing");
        assert!(matches!(load_program_str(&unknown_field), Err(PtaError::Load(_))));

        let unknown_type = SAMPLE.replace(r#""type": "Box[]""#, r#""type": "Crate[]""#);
        assert!(matches!(load_program_str(&unknown_type), Err(PtaError::Load(_))));

        let unknown_entry = SAMPLE.replace("<Main: void main()>", "<Main: void run()>");
        assert!(matches!(load_program_str(&unknown_entry), Err(PtaError::UnknownEntry(_))));

        assert!(matches!(load_program_str("{ \"classes\": 3 }"), Err(PtaError::Json(_))));
    }

    #[test]
    fn rejects_cyclic_superclasses() {
        let cyclic = r#"{
            "classes": [
                { "name": "A", "super": "B" },
                { "name": "B", "super": "A" }
            ]
        }"#;
        assert!(matches!(load_program_str(cyclic), Err(PtaError::Load(_))));

        let own_super = r#"{ "classes": [{ "name": "A", "super": "A" }] }"#;
        assert!(matches!(load_program_str(own_super), Err(PtaError::Load(_))));
    }
}
