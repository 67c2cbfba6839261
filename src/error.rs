// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Error types for configuring and loading an analysis run.
//!
//! Everything here is raised before the solver starts. Once solving has begun
//! the analysis cannot fail: unresolved calls contribute no edges and the
//! lattice is finite.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PtaError {
    #[error("unknown context sensitivity variant: {0}")]
    UnknownContextSensitivity(String),

    #[error("context depth must be at least 1 in `{0}`")]
    InvalidContextDepth(String),

    #[error("required runtime type {0} is absent from the class path")]
    MissingRuntimeType(&'static str),

    #[error("the program declares no entry method")]
    NoEntryMethod,

    #[error("entry method not found: {0}")]
    UnknownEntry(String),

    #[error("malformed program: {0}")]
    Load(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PtaError>;
