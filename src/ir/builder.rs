// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Programmatic construction of a [`Program`].

use super::known_names;
use super::program::*;
use super::stmt::Stmt;

/// Builds a [`Program`] element by element.
///
/// A fresh builder already declares `java.lang.Object`, the root every class
/// without an explicit superclass extends.
pub struct ProgramBuilder {
    program: Program,
    object: TypeId,
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramBuilder {
    pub fn new() -> Self {
        let mut program = Program::default();
        let name = known_names::JAVA_LANG_OBJECT.to_string();
        let object = program.classes.push(Class::new(name.clone(), TypeKind::Class));
        program.class_by_name.insert(name, object);
        ProgramBuilder { program, object }
    }

    #[inline]
    pub fn object_type(&self) -> TypeId {
        self.object
    }

    /// The program built so far.
    #[inline]
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Returns the type named `name`, declaring it as a class without a
    /// superclass if it does not exist yet.
    pub fn declare_class(&mut self, name: &str) -> TypeId {
        if let Some(ty) = self.program.class_by_name(name) {
            return ty;
        }
        let ty = self
            .program
            .classes
            .push(Class::new(name.to_string(), TypeKind::Class));
        self.program.class_by_name.insert(name.to_string(), ty);
        ty
    }

    /// Declares a class extending `super_class`, or `java.lang.Object` if none is given.
    pub fn add_class(&mut self, name: &str, super_class: Option<TypeId>) -> TypeId {
        let ty = self.declare_class(name);
        self.set_super_class(ty, Some(super_class.unwrap_or(self.object)));
        ty
    }

    pub fn add_interface(&mut self, name: &str, super_interfaces: &[TypeId]) -> TypeId {
        let ty = self.declare_class(name);
        self.mark_interface(ty);
        for sup in super_interfaces {
            self.implement(ty, *sup);
        }
        ty
    }

    pub fn set_super_class(&mut self, ty: TypeId, super_class: Option<TypeId>) {
        if ty != self.object {
            self.program.classes[ty].super_class = super_class;
        }
    }

    pub fn mark_interface(&mut self, ty: TypeId) {
        let class = &mut self.program.classes[ty];
        class.kind = TypeKind::Interface;
        class.super_class = None;
    }

    pub fn implement(&mut self, ty: TypeId, interface: TypeId) {
        let interfaces = &mut self.program.classes[ty].interfaces;
        if !interfaces.contains(&interface) {
            interfaces.push(interface);
        }
    }

    /// Returns the array type whose elements are of type `elem`.
    pub fn array_type(&mut self, elem: TypeId) -> TypeId {
        let name = format!("{}[]", self.program.type_name(elem));
        if let Some(ty) = self.program.class_by_name(&name) {
            return ty;
        }
        let mut class = Class::new(name.clone(), TypeKind::Array(elem));
        class.super_class = Some(self.object);
        let ty = self.program.classes.push(class);
        self.program.class_by_name.insert(name, ty);
        ty
    }

    /// Returns `java.lang.String`, declaring it on first use.
    pub fn string_type(&mut self) -> TypeId {
        match self.program.class_by_name(known_names::JAVA_LANG_STRING) {
            Some(ty) => ty,
            None => self.add_class(known_names::JAVA_LANG_STRING, None),
        }
    }

    pub fn add_field(&mut self, class: TypeId, name: &str, ty: TypeId, is_static: bool) -> FieldId {
        if let Some(field) = self.program.classes[class].declared_field(name) {
            return field;
        }
        let field = self.program.fields.push(Field {
            name: name.to_string(),
            declaring_class: class,
            ty,
            is_static,
        });
        self.program.classes[class]
            .fields
            .insert(name.to_string(), field);
        field
    }

    /// Declares a method. Instance methods get their `this` variable here.
    pub fn add_method(&mut self, class: TypeId, subsignature: &str, modifiers: MethodModifiers) -> MethodId {
        if let Some(method) = self.program.classes[class].declared_method(subsignature) {
            return method;
        }
        let method = self.program.methods.push(Method {
            name: method_name_of(subsignature).to_string(),
            subsignature: subsignature.to_string(),
            declaring_class: class,
            modifiers,
            this_var: None,
            params: Vec::new(),
            return_vars: Vec::new(),
            body: Vec::new(),
        });
        if !modifiers.is_static {
            let this = self.add_var(method, "this", class);
            self.program.methods[method].this_var = Some(this);
        }
        self.program.classes[class]
            .methods
            .insert(subsignature.to_string(), method);
        method
    }

    #[inline]
    pub fn this_var(&self, method: MethodId) -> Option<VarId> {
        self.program.methods[method].this_var
    }

    pub fn add_param(&mut self, method: MethodId, name: &str, ty: TypeId) -> VarId {
        let var = self.add_var(method, name, ty);
        self.program.methods[method].params.push(var);
        var
    }

    pub fn add_var(&mut self, method: MethodId, name: &str, ty: TypeId) -> VarId {
        self.program.vars.push(Var {
            name: name.to_string(),
            method,
            ty,
        })
    }

    pub fn add_return(&mut self, method: MethodId, var: VarId) {
        self.program.methods[method].return_vars.push(var);
    }

    pub fn add_entry(&mut self, method: MethodId) {
        if !self.program.entries.contains(&method) {
            self.program.entries.push(method);
        }
    }

    fn push_stmt(&mut self, method: MethodId, stmt: Stmt) {
        self.program.methods[method].body.push(stmt);
    }

    fn next_index(&self, method: MethodId) -> usize {
        self.program.methods[method].body.len()
    }

    fn alloc(&mut self, method: MethodId, lhs: VarId, ty: TypeId, kind: AllocKind) -> AllocSiteId {
        let site = self.program.alloc_sites.push(AllocSite {
            container: method,
            index: self.next_index(method),
            ty,
            kind,
        });
        self.push_stmt(method, Stmt::New { lhs, site });
        site
    }

    /// `lhs = new ty`
    pub fn new_obj(&mut self, method: MethodId, lhs: VarId, ty: TypeId) -> AllocSiteId {
        self.alloc(method, lhs, ty, AllocKind::Object)
    }

    /// `lhs = new elem[n]` where `array_ty` is the array type.
    pub fn new_array(&mut self, method: MethodId, lhs: VarId, array_ty: TypeId) -> AllocSiteId {
        self.alloc(method, lhs, array_ty, AllocKind::Array)
    }

    /// `lhs = "value"`
    pub fn string_const(&mut self, method: MethodId, lhs: VarId, value: &str) -> AllocSiteId {
        let ty = self.string_type();
        self.alloc(method, lhs, ty, AllocKind::StringConstant(value.to_string()))
    }

    pub fn assign(&mut self, method: MethodId, lhs: VarId, rhs: VarId) {
        self.push_stmt(method, Stmt::Assign { lhs, rhs });
    }

    pub fn cast(&mut self, method: MethodId, lhs: VarId, rhs: VarId, ty: TypeId) {
        self.push_stmt(method, Stmt::Cast { lhs, rhs, ty });
    }

    pub fn load_field(&mut self, method: MethodId, lhs: VarId, base: VarId, field: FieldId) {
        self.push_stmt(method, Stmt::LoadField { lhs, base, field });
    }

    pub fn store_field(&mut self, method: MethodId, base: VarId, field: FieldId, rhs: VarId) {
        self.push_stmt(method, Stmt::StoreField { base, field, rhs });
    }

    pub fn load_static(&mut self, method: MethodId, lhs: VarId, field: FieldId) {
        self.push_stmt(method, Stmt::LoadStatic { lhs, field });
    }

    pub fn store_static(&mut self, method: MethodId, field: FieldId, rhs: VarId) {
        self.push_stmt(method, Stmt::StoreStatic { field, rhs });
    }

    pub fn load_array(&mut self, method: MethodId, lhs: VarId, base: VarId) {
        self.push_stmt(method, Stmt::LoadArray { lhs, base });
    }

    pub fn store_array(&mut self, method: MethodId, base: VarId, rhs: VarId) {
        self.push_stmt(method, Stmt::StoreArray { base, rhs });
    }

    /// Appends a call to the declared target `class.subsignature`.
    #[allow(clippy::too_many_arguments)]
    pub fn invoke(
        &mut self,
        method: MethodId,
        kind: CallKind,
        class: TypeId,
        subsignature: &str,
        receiver: Option<VarId>,
        args: &[VarId],
        result: Option<VarId>,
    ) -> CallSiteId {
        let call_site = self.program.call_sites.push(CallSite {
            container: method,
            index: self.next_index(method),
            kind,
            method_ref: self.program.method_ref(class, subsignature),
            receiver,
            args: args.to_vec(),
            result,
        });
        self.push_stmt(method, Stmt::Invoke(call_site));
        call_site
    }

    pub fn build(self) -> Program {
        self.program
    }
}
