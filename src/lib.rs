// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! A context-sensitive, inclusion-based pointer analysis for object-oriented
//! bytecode programs. It computes points-to sets and the call graph together,
//! on the fly, under a configurable context sensitivity.

#![allow(
    clippy::single_match,
    clippy::needless_lifetimes,
    clippy::needless_return,
    clippy::len_zero
)]

pub mod builder;
pub mod cs;
pub mod error;
pub mod graph;
pub mod heap;
pub mod ir;
pub mod pta;
pub mod pts_set;
pub mod util;
