// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Class-hierarchy queries: subtyping, method lookup and dispatch.

use std::collections::{HashSet, VecDeque};

use super::known_names;
use super::program::{MethodId, MethodRef, Program, TypeId, TypeKind};

impl Program {
    /// Returns true if `sub` is `sup` or one of its subtypes.
    pub fn is_subtype(&self, sub: TypeId, sup: TypeId) -> bool {
        if sub == sup {
            return true;
        }
        let sup_class = self.class(sup);
        match &self.class(sub).kind {
            TypeKind::Array(sub_elem) => match &sup_class.kind {
                TypeKind::Array(sup_elem) => self.is_subtype(*sub_elem, *sup_elem),
                _ => matches!(
                    sup_class.name.as_str(),
                    known_names::JAVA_LANG_OBJECT
                        | known_names::JAVA_LANG_CLONEABLE
                        | known_names::JAVA_IO_SERIALIZABLE
                ),
            },
            _ => {
                if sup_class.is_array() {
                    return false;
                }
                self.super_types(sub).any(|t| t == sup)
            }
        }
    }

    /// All proper supertypes of a class or interface, superclasses and
    /// superinterfaces alike, each reported once.
    pub fn super_types(&self, ty: TypeId) -> impl Iterator<Item = TypeId> + '_ {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        self.push_direct_supers(ty, &mut queue);
        std::iter::from_fn(move || {
            while let Some(t) = queue.pop_front() {
                if visited.insert(t) {
                    self.push_direct_supers(t, &mut queue);
                    return Some(t);
                }
            }
            None
        })
    }

    fn push_direct_supers(&self, ty: TypeId, queue: &mut VecDeque<TypeId>) {
        let class = self.class(ty);
        queue.extend(class.super_class);
        queue.extend(class.interfaces.iter().copied());
    }

    /// The superclass chain of `ty`, starting with `ty` itself.
    pub fn super_classes(&self, ty: TypeId) -> impl Iterator<Item = TypeId> + '_ {
        std::iter::successors(Some(ty), move |t| self.class(*t).super_class)
    }

    /// Returns true if `sup` is a superclass of `sub` other than `sub` itself.
    pub fn is_proper_superclass(&self, sup: TypeId, sub: TypeId) -> bool {
        self.super_classes(sub).skip(1).any(|t| t == sup)
    }

    /// Looks `subsignature` up in `ty` and then in its superclasses, returning
    /// the first declaration found, abstract or not.
    pub fn lookup_method(&self, ty: TypeId, subsignature: &str) -> Option<MethodId> {
        self.super_classes(ty)
            .find_map(|t| self.class(t).declared_method(subsignature))
    }

    /// Resolves a static call to its declared target.
    pub fn resolve_static(&self, method_ref: &MethodRef) -> Option<MethodId> {
        self.lookup_method(method_ref.class, &method_ref.subsignature)
            .or_else(|| self.lookup_default_method(method_ref.class, &method_ref.subsignature))
    }

    /// Resolves an `invokespecial` issued from a method of `caller_class`.
    ///
    /// Constructors, private methods and calls to a class that is not a proper
    /// superclass of the caller resolve to the declared target. Super calls
    /// look the method up starting from the caller's superclass.
    pub fn resolve_special(&self, method_ref: &MethodRef, caller_class: TypeId) -> Option<MethodId> {
        let declared = self.lookup_method(method_ref.class, &method_ref.subsignature);
        let direct = match declared {
            Some(m) => {
                let method = self.method(m);
                method.is_constructor()
                    || method.modifiers.is_private
                    || !self.is_proper_superclass(method_ref.class, caller_class)
            }
            None => !self.is_proper_superclass(method_ref.class, caller_class),
        };
        let target = if direct {
            declared
        } else {
            self.class(caller_class)
                .super_class
                .and_then(|sup| self.dispatch_in(sup, &method_ref.subsignature))
        };
        target.filter(|m| !self.method(*m).is_abstract())
    }

    /// Resolves a virtual or interface call on a receiver whose runtime type is
    /// `receiver_type`. Returns `None` if no concrete method is found.
    pub fn dispatch(&self, receiver_type: TypeId, method_ref: &MethodRef) -> Option<MethodId> {
        let start = if self.class(receiver_type).is_array() {
            self.class_by_name(known_names::JAVA_LANG_OBJECT)?
        } else {
            receiver_type
        };
        self.dispatch_in(start, &method_ref.subsignature)
    }

    fn dispatch_in(&self, ty: TypeId, subsignature: &str) -> Option<MethodId> {
        let concrete = self
            .super_classes(ty)
            .filter_map(|t| self.class(t).declared_method(subsignature))
            .next();
        match concrete {
            Some(m) if !self.method(m).is_abstract() => Some(m),
            Some(_) => None,
            None => self.lookup_default_method(ty, subsignature),
        }
    }

    /// Finds a non-abstract interface method among the supertypes of `ty`.
    fn lookup_default_method(&self, ty: TypeId, subsignature: &str) -> Option<MethodId> {
        self.super_types(ty)
            .filter(|t| self.class(*t).is_interface())
            .filter_map(|t| self.class(t).declared_method(subsignature))
            .find(|m| !self.method(*m).is_abstract())
    }

    /// The static initializer declared by `ty`, if any.
    pub fn clinit_of(&self, ty: TypeId) -> Option<MethodId> {
        self.class(ty).declared_method(known_names::CLINIT_SUBSIG)
    }
}

#[cfg(test)]
mod test {
    use crate::ir::{MethodModifiers, ProgramBuilder};

    #[test]
    fn subtyping_follows_classes_interfaces_and_arrays() {
        let mut builder = ProgramBuilder::new();
        let object = builder.object_type();
        let i = builder.add_interface("I", &[]);
        let a = builder.add_class("A", None);
        let b = builder.add_class("B", Some(a));
        builder.implement(a, i);
        let b_arr = builder.array_type(b);
        let a_arr = builder.array_type(a);
        let program = builder.build();

        assert!(program.is_subtype(b, a));
        assert!(program.is_subtype(b, i));
        assert!(program.is_subtype(b, object));
        assert!(!program.is_subtype(a, b));
        assert!(program.is_subtype(b_arr, a_arr));
        assert!(program.is_subtype(b_arr, object));
        assert!(!program.is_subtype(a_arr, b_arr));
        assert!(!program.is_subtype(a, a_arr));
    }

    #[test]
    fn dispatch_prefers_overrides_then_defaults() {
        let mut builder = ProgramBuilder::new();
        let i = builder.add_interface("I", &[]);
        let a = builder.add_class("A", None);
        let b = builder.add_class("B", Some(a));
        builder.implement(a, i);
        let a_foo = builder.add_method(a, "void foo()", MethodModifiers::default());
        let b_foo = builder.add_method(b, "void foo()", MethodModifiers::default());
        let i_bar = builder.add_method(i, "void bar()", MethodModifiers::default());
        let abstract_mods = MethodModifiers { is_abstract: true, ..Default::default() };
        let _i_baz = builder.add_method(i, "void baz()", abstract_mods);
        let object = builder.object_type();
        let obj_hash = builder.add_method(object, "int hashCode()", MethodModifiers::default());
        let arr = builder.array_type(a);
        let program = builder.build();

        let foo = program.method_ref(a, "void foo()");
        assert_eq!(program.dispatch(b, &foo), Some(b_foo));
        assert_eq!(program.dispatch(a, &foo), Some(a_foo));
        assert_eq!(program.dispatch(b, &program.method_ref(i, "void bar()")), Some(i_bar));
        assert_eq!(program.dispatch(b, &program.method_ref(i, "void baz()")), None);
        assert_eq!(program.dispatch(arr, &program.method_ref(object, "int hashCode()")), Some(obj_hash));

        // A super call from B reaches A's implementation.
        assert_eq!(program.resolve_special(&foo, b), Some(a_foo));
        // A call to an unrelated class resolves to the declared target.
        assert_eq!(program.resolve_special(&program.method_ref(b, "void foo()"), a), Some(b_foo));
    }
}
