// ─────────────────────────────────────────────────────────────────────
// MEWarpX-RS — Assemblies
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Conductors in the simulation and the particles they absorb.
//!
//! An [`Assembly`] couples a [`Shape`] with its electrical state (voltage,
//! temperature, work function) and a scraper label naming the engine
//! buffer its absorbed particles land in. Constructors register the
//! conductor with the run: half-spaces and boundary shells claim a domain
//! face potential, embedded shapes extend the embedded boundary.

use std::collections::HashSet;

use mwx_types::error::{MwxError, MwxResult};
use mwx_types::grid::Geometry;
use mwx_types::time::{ExpressionEvaluator, TimeValue};
use ndarray::{Array1, ArrayView1};
use tracing::{debug, warn};

use crate::buffer::BoundaryBufferAccess;
use crate::parallel::Communicator;
use crate::records::{FieldTable, ScrapedRecords};
use crate::run::MwxRun;
use crate::shapes::{is_close, CylinderZ, HalfSpace, InfCylinderY, Rectangle, Shape};
use crate::species::Species;

/// Step whose scraped particles are discarded (pre-seeded plasma is
/// injected across embedded boundaries after step 1).
const SKIPPED_SCRAPE_STEP: u64 = 2;

/// Particle boundary buffer an assembly reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScraperLabel {
    ZLo,
    ZHi,
    XLo,
    XHi,
    Eb,
}

impl ScraperLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScraperLabel::ZLo => "z_lo",
            ScraperLabel::ZHi => "z_hi",
            ScraperLabel::XLo => "x_lo",
            ScraperLabel::XHi => "x_hi",
            ScraperLabel::Eb => "eb",
        }
    }
}

impl std::fmt::Display for ScraperLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything an assembly needs from the run to record one step.
pub struct ScrapeContext<'a> {
    pub t: f64,
    pub step: u64,
    pub geometry: Geometry,
    pub species: &'a [Species],
    pub evaluator: &'a dyn ExpressionEvaluator,
    pub buffers: &'a dyn BoundaryBufferAccess,
    pub level: usize,
}

/// Embedded-boundary particles already attributed during one step.
///
/// All embedded conductors share the `eb` buffer, so each particle is
/// counted by the first assembly (in registration order) whose inside test
/// accepts it.
#[derive(Debug, Clone, Default)]
pub struct ScrapePass {
    step: u64,
    claimed: HashSet<(usize, usize, usize)>,
}

impl ScrapePass {
    pub fn new(step: u64) -> Self {
        ScrapePass {
            step,
            claimed: HashSet::new(),
        }
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn is_claimed(&self, species_id: usize, chunk: usize, index: usize) -> bool {
        self.claimed.contains(&(species_id, chunk, index))
    }

    /// Returns false if the particle was already claimed.
    pub fn claim(&mut self, species_id: usize, chunk: usize, index: usize) -> bool {
        self.claimed.insert((species_id, chunk, index))
    }

    pub fn n_claimed(&self) -> usize {
        self.claimed.len()
    }
}

#[derive(Debug, Clone)]
pub struct Assembly {
    name: String,
    v: TimeValue,
    t: TimeValue,
    wf: TimeValue,
    shape: Shape,
    scraper_label: Option<ScraperLabel>,
    implicit_function: Option<String>,
    records: ScrapedRecords,
}

impl Assembly {
    fn new(name: &str, v: TimeValue, t: TimeValue, wf: TimeValue, shape: Shape) -> Self {
        Assembly {
            name: name.to_string(),
            v,
            t,
            wf,
            implicit_function: shape.implicit_function(),
            shape,
            scraper_label: None,
            records: ScrapedRecords::new(),
        }
    }

    // ── Constructors ─────────────────────────────────────────────────

    /// Bare semi-infinite plane. It claims no face potential and has no
    /// scraper label.
    pub fn z_plane(
        run: &MwxRun,
        name: &str,
        z: f64,
        zsign: i32,
        v: TimeValue,
        t: TimeValue,
        wf: TimeValue,
    ) -> MwxResult<Self> {
        let shape = Shape::HalfSpace(HalfSpace::new(z, zsign)?);
        shape.check_geom(run.geometry()?, name)?;
        Ok(Assembly::new(name, v, t, wf, shape))
    }

    /// Plane at z = 0 extending to -inf; drives the lower z potential.
    pub fn cathode(run: &mut MwxRun, v: TimeValue, t: TimeValue, wf: TimeValue) -> MwxResult<Self> {
        let mut asm = Assembly::z_plane(run, "Cathode", 0.0, -1, v, t, wf)?;
        run.domain_mut()?.potentials.zmin = Some(asm.v.clone());
        asm.scraper_label = Some(ScraperLabel::ZLo);
        Ok(asm)
    }

    /// Plane at `z` extending to +inf; drives the upper z potential.
    pub fn anode(run: &mut MwxRun, z: f64, v: TimeValue, t: TimeValue, wf: TimeValue) -> MwxResult<Self> {
        let mut asm = Assembly::z_plane(run, "Anode", z, 1, v, t, wf)?;
        run.domain_mut()?.potentials.zmax = Some(asm.v.clone());
        asm.scraper_label = Some(ScraperLabel::ZHi);
        Ok(asm)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn inf_cylinder_y(
        run: &mut MwxRun,
        name: &str,
        center_x: f64,
        center_z: f64,
        radius: f64,
        v: TimeValue,
        t: TimeValue,
        wf: TimeValue,
        install_in_simulation: bool,
    ) -> MwxResult<Self> {
        let shape = Shape::InfCylinderY(InfCylinderY::new(center_x, center_z, radius)?);
        shape.check_geom(run.geometry()?, name)?;
        let mut asm = Assembly::new(name, v, t, wf, shape);
        asm.scraper_label = Some(ScraperLabel::Eb);
        if install_in_simulation {
            asm.install_in_simulation(run)?;
        }
        Ok(asm)
    }

    /// Shell around the z axis. A shell with either radius on the domain's
    /// outer radial limit becomes the `x_hi` boundary, and one with either
    /// radius on the inner limit becomes `x_lo`, instead of an embedded
    /// conductor. The outer wall is checked first.
    #[allow(clippy::too_many_arguments)]
    pub fn cylinder_z(
        run: &mut MwxRun,
        name: &str,
        r_outer: f64,
        r_inner: f64,
        zmin: Option<f64>,
        zmax: Option<f64>,
        v: TimeValue,
        t: TimeValue,
        wf: TimeValue,
    ) -> MwxResult<Self> {
        let geometry = run.geometry()?;
        if geometry != Geometry::RZ {
            return Err(MwxError::UnsupportedGeometry {
                geometry: geometry.to_string(),
                assembly: name.to_string(),
            });
        }
        let domain = run.domain()?;
        let (dom_zmin, dom_zmax) = (domain.zmin, domain.zmax);
        let rmin = domain.rmin.unwrap_or(domain.xmin);
        let rmax = domain.rmax.unwrap_or(domain.xmax);

        let cyl = CylinderZ::new(
            r_inner,
            r_outer,
            zmin.unwrap_or(dom_zmin),
            zmax.unwrap_or(dom_zmax),
            (dom_zmin, dom_zmax),
        )?;
        let infinite = cyl.infinite;
        let mut asm = Assembly::new(name, v, t, wf, Shape::CylinderZ(cyl));

        // touching a radial wall from either side makes the shell that wall
        let on_boundary = if is_close(r_inner, rmax) || is_close(r_outer, rmax) {
            Some(ScraperLabel::XHi)
        } else if is_close(r_outer, rmin) || is_close(r_inner, rmin) {
            Some(ScraperLabel::XLo)
        } else {
            None
        };

        match on_boundary {
            Some(label) => {
                if !infinite {
                    return Err(MwxError::ConfigError(format!(
                        "CylinderZ '{name}' on the simulation boundary must span the full z domain"
                    )));
                }
                let potentials = &mut run.domain_mut()?.potentials;
                if label == ScraperLabel::XHi {
                    potentials.xmax = Some(asm.v.clone());
                } else {
                    potentials.xmin = Some(asm.v.clone());
                }
                // a boundary face, not an embedded conductor
                asm.implicit_function = None;
                asm.scraper_label = Some(label);
            }
            None => {
                asm.scraper_label = Some(ScraperLabel::Eb);
                asm.install_in_simulation(run)?;
            }
        }
        Ok(asm)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn rectangle(
        run: &mut MwxRun,
        name: &str,
        center_x: f64,
        center_z: f64,
        length_x: f64,
        length_z: f64,
        v: TimeValue,
        t: TimeValue,
        wf: TimeValue,
        install_in_simulation: bool,
    ) -> MwxResult<Self> {
        let shape = Shape::Rectangle(Rectangle::new(center_x, center_z, length_x, length_z)?);
        shape.check_geom(run.geometry()?, name)?;
        let mut asm = Assembly::new(name, v, t, wf, shape);
        asm.scraper_label = Some(ScraperLabel::Eb);
        if install_in_simulation {
            asm.install_in_simulation(run)?;
        }
        Ok(asm)
    }

    fn install_in_simulation(&self, run: &mut MwxRun) -> MwxResult<()> {
        let Some(implicit) = self.implicit_function.as_deref() else {
            return Ok(());
        };
        run.embedded_boundary_mut().union_with(implicit, &self.v)?;
        debug!(assembly = %self.name, "Installed embedded boundary");
        Ok(())
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn scraper_label(&self) -> Option<ScraperLabel> {
        self.scraper_label
    }

    pub fn implicit_function(&self) -> Option<&str> {
        self.implicit_function.as_deref()
    }

    pub fn v(&self) -> &TimeValue {
        &self.v
    }

    pub fn temperature(&self) -> &TimeValue {
        &self.t
    }

    pub fn work_function(&self) -> &TimeValue {
        &self.wf
    }

    /// Voltage at time `t`.
    pub fn voltage(&self, evaluator: &dyn ExpressionEvaluator, t: f64) -> MwxResult<f64> {
        self.v.evaluate(evaluator, t)
    }

    /// Voltage plus work function: the electron-facing potential.
    pub fn voltage_e(&self, evaluator: &dyn ExpressionEvaluator, t: f64) -> MwxResult<f64> {
        Ok(self.voltage(evaluator, t)? + self.wf.evaluate(evaluator, t)?)
    }

    pub fn is_inside(
        &self,
        x: ArrayView1<f64>,
        y: ArrayView1<f64>,
        z: ArrayView1<f64>,
        aura: f64,
    ) -> MwxResult<Array1<u8>> {
        self.shape.is_inside(x, y, z, aura)
    }

    pub fn normal_at(
        &self,
        px: ArrayView1<f64>,
        py: ArrayView1<f64>,
        pz: ArrayView1<f64>,
    ) -> MwxResult<ndarray::Array2<f64>> {
        self.shape.normal_at(px, py, pz)
    }

    // ── Scraped particles ────────────────────────────────────────────

    /// Append one row per species for the current step.
    pub fn record_scraped_particles(&mut self, ctx: &ScrapeContext<'_>, pass: &mut ScrapePass) -> MwxResult<()> {
        if pass.step() != ctx.step {
            return Err(MwxError::ConfigError(format!(
                "Scrape pass for step {} reused at step {}",
                pass.step(),
                ctx.step
            )));
        }
        let Some(label) = self.scraper_label else {
            warn!("Assembly {} doesn't have a scraper label", self.name);
            return Ok(());
        };
        let v_e = self.voltage_e(ctx.evaluator, ctx.t)?;

        for species in ctx.species {
            let mut row = [0.0; 7];
            row[0] = ctx.t;
            row[1] = ctx.step as f64;
            row[2] = species.species_id as f64;
            row[3] = v_e;

            if ctx.step == SKIPPED_SCRAPE_STEP {
                self.records.append(row);
                continue;
            }

            if let Some(selected) = self.select_scraped(ctx, species, label, pass)? {
                let w = ctx
                    .buffers
                    .real_component(&species.name, label.as_str(), "w", ctx.level)?;
                let energy = ctx
                    .buffers
                    .real_component(&species.name, label.as_str(), "E_total", ctx.level)?;
                let n: usize = selected.iter().map(Vec::len).sum();
                let w_sum = sum_selected(&w, &selected, "w")?;
                let e_sum = sum_selected(&energy, &selected, "E_total")?;
                row[4] = n as f64;
                row[5] = -species.sq * w_sum;
                row[6] = -e_sum;
            }
            self.records.append(row);
        }
        Ok(())
    }

    /// Per-chunk indices of particles scraped this step that belong to this
    /// assembly, or `None` when the buffer holds nothing from this step.
    fn select_scraped(
        &self,
        ctx: &ScrapeContext<'_>,
        species: &Species,
        label: ScraperLabel,
        pass: &mut ScrapePass,
    ) -> MwxResult<Option<Vec<Vec<usize>>>> {
        if ctx.buffers.buffer_size(&species.name, label.as_str()) == 0 {
            return Ok(None);
        }
        let steps = ctx
            .buffers
            .step_scraped(&species.name, label.as_str(), ctx.level)?;
        let current = ctx.step as i64;
        let mut selected: Vec<Vec<usize>> = steps
            .iter()
            .map(|arr| {
                arr.iter()
                    .enumerate()
                    .filter(|(_, s)| **s == current)
                    .map(|(i, _)| i)
                    .collect()
            })
            .collect();
        if selected.iter().all(Vec::is_empty) {
            return Ok(None);
        }
        if label != ScraperLabel::Eb {
            return Ok(Some(selected));
        }

        let (xs, ys, zs) = buffer_positions(ctx, &species.name)?;
        for (chunk, idx) in selected.iter_mut().enumerate() {
            idx.retain(|&i| !pass.is_claimed(species.species_id, chunk, i));
            let px = gather(&xs, chunk, idx, "x")?;
            let py = gather(&ys, chunk, idx, "y")?;
            let pz = gather(&zs, chunk, idx, "z")?;
            let inside = self.shape.is_inside(px.view(), py.view(), pz.view(), 0.0)?;
            let kept: Vec<usize> = idx
                .iter()
                .zip(inside.iter())
                .filter(|(_, m)| **m == 1)
                .map(|(&i, _)| i)
                .collect();
            for &i in &kept {
                pass.claim(species.species_id, chunk, i);
            }
            *idx = kept;
        }
        Ok(Some(selected))
    }

    /// Rows recorded so far, with counts, charge and energy summed across
    /// ranks. Collective.
    pub fn get_scraped_particles(&mut self, comm: &dyn Communicator, clear: bool) -> MwxResult<FieldTable> {
        self.records.collect(comm, clear)
    }

    pub fn records(&self) -> &ScrapedRecords {
        &self.records
    }
}

type Positions = (Vec<Array1<f64>>, Vec<Array1<f64>>, Vec<Array1<f64>>);

/// Buffer positions mapped to (x, y, z) for the shape tests. In 2D the
/// engine stores the second coordinate as `y`.
fn buffer_positions(ctx: &ScrapeContext<'_>, species: &str) -> MwxResult<Positions> {
    let get = |comp: &str| ctx.buffers.real_component(species, "eb", comp, ctx.level);
    match ctx.geometry {
        Geometry::XZ => {
            let y = get("y")?;
            Ok((get("x")?, y.clone(), y))
        }
        Geometry::XYZ => Ok((get("x")?, get("y")?, get("z")?)),
        Geometry::RZ => {
            let x = get("x")?;
            let zeros = x.iter().map(|c| Array1::zeros(c.len())).collect();
            Ok((x, zeros, get("y")?))
        }
        other => Err(MwxError::NotImplemented(format!(
            "Scraping not implemented for {other}"
        ))),
    }
}

fn gather(chunks: &[Array1<f64>], chunk: usize, idx: &[usize], what: &str) -> MwxResult<Array1<f64>> {
    let values = chunks.get(chunk).ok_or_else(|| MwxError::ShapeMismatch {
        what: format!("buffer position '{what}' chunks"),
        expected: vec![chunk + 1],
        got: vec![chunks.len()],
    })?;
    idx.iter()
        .map(|&i| {
            values.get(i).copied().ok_or_else(|| MwxError::ShapeMismatch {
                what: format!("buffer position '{what}'"),
                expected: vec![i + 1],
                got: vec![values.len()],
            })
        })
        .collect::<MwxResult<Vec<f64>>>()
        .map(Array1::from_vec)
}

fn sum_selected(chunks: &[Array1<f64>], selected: &[Vec<usize>], what: &str) -> MwxResult<f64> {
    if chunks.len() != selected.len() {
        return Err(MwxError::ShapeMismatch {
            what: format!("buffer component '{what}' chunks"),
            expected: vec![selected.len()],
            got: vec![chunks.len()],
        });
    }
    let mut total = 0.0;
    for (values, idx) in chunks.iter().zip(selected) {
        for &i in idx {
            total += values.get(i).copied().ok_or_else(|| MwxError::ShapeMismatch {
                what: format!("buffer component '{what}'"),
                expected: vec![i + 1],
                got: vec![values.len()],
            })?;
        }
    }
    Ok(total)
}
