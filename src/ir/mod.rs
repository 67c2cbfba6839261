// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The program model the analysis runs on.

pub mod builder;
pub mod hierarchy;
pub mod known_names;
pub mod loader;
pub mod program;
pub mod stmt;

pub use builder::ProgramBuilder;
pub use program::{
    AllocKind, AllocSite, AllocSiteId, CallKind, CallSite, CallSiteId, Class, Field, FieldId, Method,
    MethodId, MethodModifiers, MethodRef, Program, TypeId, TypeKind, Var, VarId,
};
pub use stmt::Stmt;
