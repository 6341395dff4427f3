// ─────────────────────────────────────────────────────────────────────
// MEWarpX-RS — Particle Boundary Buffer
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Access to particles the engine removed at each boundary.
//!
//! The engine keeps one buffer per (species, boundary) pair, split into
//! chunks (one per tile). Each scraped particle carries the step it was
//! removed on plus real-valued components such as `x`, `y`, `z`, `w` and
//! `E_total`.

use std::collections::{BTreeMap, HashMap};

use mwx_types::error::{MwxError, MwxResult};
use ndarray::Array1;

pub trait BoundaryBufferAccess {
    /// Number of particles held on this process.
    fn buffer_size(&self, species: &str, label: &str) -> usize;

    fn step_scraped(&self, species: &str, label: &str, level: usize) -> MwxResult<Vec<Array1<i64>>>;

    fn real_component(
        &self,
        species: &str,
        label: &str,
        comp: &str,
        level: usize,
    ) -> MwxResult<Vec<Array1<f64>>>;
}

/// One tile's worth of scraped particles.
#[derive(Debug, Clone, Default)]
pub struct BufferChunk {
    step_scraped: Vec<i64>,
    components: BTreeMap<String, Vec<f64>>,
}

impl BufferChunk {
    pub fn new(step_scraped: Vec<i64>) -> Self {
        BufferChunk {
            step_scraped,
            components: BTreeMap::new(),
        }
    }

    pub fn with_component(mut self, name: &str, values: Vec<f64>) -> Self {
        self.components.insert(name.to_string(), values);
        self
    }

    pub fn len(&self) -> usize {
        self.step_scraped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.step_scraped.is_empty()
    }
}

/// In-memory stand-in for the engine's scraped-particle buffers.
#[derive(Debug, Clone, Default)]
pub struct ParticleBoundaryBuffer {
    buffers: HashMap<(String, String), Vec<BufferChunk>>,
}

impl ParticleBoundaryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_chunk(&mut self, species: &str, label: &str, chunk: BufferChunk) -> MwxResult<()> {
        let n = chunk.len();
        if let Some((name, values)) = chunk.components.iter().find(|(_, v)| v.len() != n) {
            return Err(MwxError::ShapeMismatch {
                what: format!("buffer component '{name}'"),
                expected: vec![n],
                got: vec![values.len()],
            });
        }
        self.buffers
            .entry((species.to_string(), label.to_string()))
            .or_default()
            .push(chunk);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.buffers.clear();
    }

    fn chunks(&self, species: &str, label: &str, level: usize) -> MwxResult<&[BufferChunk]> {
        if level != 0 {
            return Err(MwxError::NotImplemented(format!(
                "mesh refinement level {level} in particle boundary buffers"
            )));
        }
        Ok(self
            .buffers
            .get(&(species.to_string(), label.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[]))
    }
}

impl BoundaryBufferAccess for ParticleBoundaryBuffer {
    fn buffer_size(&self, species: &str, label: &str) -> usize {
        self.buffers
            .get(&(species.to_string(), label.to_string()))
            .map(|chunks| chunks.iter().map(BufferChunk::len).sum())
            .unwrap_or(0)
    }

    fn step_scraped(&self, species: &str, label: &str, level: usize) -> MwxResult<Vec<Array1<i64>>> {
        Ok(self
            .chunks(species, label, level)?
            .iter()
            .map(|c| Array1::from_vec(c.step_scraped.clone()))
            .collect())
    }

    fn real_component(
        &self,
        species: &str,
        label: &str,
        comp: &str,
        level: usize,
    ) -> MwxResult<Vec<Array1<f64>>> {
        self.chunks(species, label, level)?
            .iter()
            .map(|c| {
                c.components
                    .get(comp)
                    .map(|v| Array1::from_vec(v.clone()))
                    .ok_or_else(|| {
                        MwxError::Collaborator(format!(
                            "Buffer for species '{species}' at '{label}' has no component '{comp}'"
                        ))
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_sums_chunks() {
        let mut buf = ParticleBoundaryBuffer::new();
        buf.push_chunk("electrons", "eb", BufferChunk::new(vec![3, 3]).with_component("w", vec![1.0, 2.0]))
            .unwrap();
        buf.push_chunk("electrons", "eb", BufferChunk::new(vec![4]).with_component("w", vec![5.0]))
            .unwrap();
        assert_eq!(buf.buffer_size("electrons", "eb"), 3);
        assert_eq!(buf.buffer_size("electrons", "z_lo"), 0);
        let w = buf.real_component("electrons", "eb", "w", 0).unwrap();
        assert_eq!(w.len(), 2);
        assert_eq!(w[1][0], 5.0);
    }

    #[test]
    fn test_ragged_component_rejected() {
        let mut buf = ParticleBoundaryBuffer::new();
        let chunk = BufferChunk::new(vec![1, 1]).with_component("w", vec![1.0]);
        assert!(buf.push_chunk("ions", "z_hi", chunk).is_err());
    }

    #[test]
    fn test_missing_component_and_level() {
        let mut buf = ParticleBoundaryBuffer::new();
        buf.push_chunk("ions", "z_hi", BufferChunk::new(vec![1])).unwrap();
        assert!(buf.real_component("ions", "z_hi", "E_total", 0).is_err());
        assert!(buf.step_scraped("ions", "z_hi", 1).is_err());
        assert!(buf.step_scraped("ions", "x_lo", 0).unwrap().is_empty());
    }
}
