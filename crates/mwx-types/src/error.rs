// ─────────────────────────────────────────────────────────────────────
// MEWarpX-RS — Error
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MwxError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("{geometry} geometry not supported by assembly '{assembly}'")]
    UnsupportedGeometry { geometry: String, assembly: String },

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Shape mismatch for {what}: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        what: String,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Expression error: {0}")]
    Expression(String),

    #[error("Linear algebra error: {0}")]
    LinAlg(String),

    #[error("Collaborator error: {0}")]
    Collaborator(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type MwxResult<T> = Result<T, MwxError>;
