// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use super::program::{AllocSiteId, CallSiteId, FieldId, TypeId, VarId};

/// The statements relevant to pointer analysis. Everything else a method does
/// (arithmetic, branches, monitors) has no effect on points-to facts in a
/// flow-insensitive analysis and is dropped by the front end.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Stmt {
    /// `lhs = new T`, `lhs = new T[n]` or `lhs = "constant"`.
    New { lhs: VarId, site: AllocSiteId },
    /// `lhs = rhs`
    Assign { lhs: VarId, rhs: VarId },
    /// `lhs = (ty) rhs`
    Cast { lhs: VarId, rhs: VarId, ty: TypeId },
    /// `[result =] receiver.m(args)` or `[result =] T.m(args)`
    Invoke(CallSiteId),
    /// `lhs = base.field`
    LoadField { lhs: VarId, base: VarId, field: FieldId },
    /// `base.field = rhs`
    StoreField { base: VarId, field: FieldId, rhs: VarId },
    /// `lhs = T.field`
    LoadStatic { lhs: VarId, field: FieldId },
    /// `T.field = rhs`
    StoreStatic { field: FieldId, rhs: VarId },
    /// `lhs = base[i]`
    LoadArray { lhs: VarId, base: VarId },
    /// `base[i] = rhs`
    StoreArray { base: VarId, rhs: VarId },
}
