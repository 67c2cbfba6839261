// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

pub mod heap_model;

pub use heap_model::{HeapModel, MergedObj, Obj, ObjId};
