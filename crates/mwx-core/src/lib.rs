// ─────────────────────────────────────────────────────────────────────
// MEWarpX-RS — MWX Core
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! PIC orchestration core: assemblies, scraped-particle accounting and the
//! direct Poisson solver.
//!
//! Engine-facing: fields, buffer, parallel
//! Geometry: shapes, boundary, assembly
//! Run: run, callbacks, poisson, sim_control, mcc, setup

pub mod assembly;
pub mod boundary;
pub mod buffer;
pub mod callbacks;
pub mod fields;
pub mod mcc;
pub mod parallel;
pub mod poisson;
pub mod records;
pub mod run;
pub mod setup;
pub mod shapes;
pub mod sim_control;
pub mod species;
