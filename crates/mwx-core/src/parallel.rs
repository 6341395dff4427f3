// ─────────────────────────────────────────────────────────────────────
// MEWarpX-RS — Parallel Reductions
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Cross-process reductions.
//!
//! `SingleProcess` is the serial identity. `LocalGroup` runs several ranks
//! as threads of one process and exchanges data through shared memory, so
//! multi-rank bookkeeping can be exercised without an MPI runtime.

use std::sync::{Arc, Barrier, Mutex, MutexGuard, PoisonError};

use mwx_types::error::{MwxError, MwxResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    Sum,
    Min,
    Max,
}

impl ReduceOp {
    fn identity(&self) -> f64 {
        match self {
            ReduceOp::Sum => 0.0,
            ReduceOp::Min => f64::INFINITY,
            ReduceOp::Max => f64::NEG_INFINITY,
        }
    }

    fn combine(&self, a: f64, b: f64) -> f64 {
        match self {
            ReduceOp::Sum => a + b,
            ReduceOp::Min => a.min(b),
            ReduceOp::Max => a.max(b),
        }
    }
}

pub trait Communicator: Send {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    /// Element-wise reduction of `data` over all ranks, in place. Every
    /// rank must call with the same length.
    fn all_reduce(&self, data: &mut [f64], op: ReduceOp) -> MwxResult<()>;

    fn all_reduce_sum(&self, data: &mut [f64]) -> MwxResult<()> {
        self.all_reduce(data, ReduceOp::Sum)
    }

    fn all_reduce_scalar(&self, value: f64, op: ReduceOp) -> MwxResult<f64> {
        let mut buf = [value];
        self.all_reduce(&mut buf, op)?;
        Ok(buf[0])
    }

    fn is_root(&self) -> bool {
        self.rank() == 0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SingleProcess;

impl Communicator for SingleProcess {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_reduce(&self, _data: &mut [f64], _op: ReduceOp) -> MwxResult<()> {
        Ok(())
    }
}

struct Exchange {
    barrier: Barrier,
    slots: Mutex<Vec<Vec<f64>>>,
}

/// One rank of an in-process thread group.
pub struct LocalGroup {
    rank: usize,
    size: usize,
    shared: Arc<Exchange>,
}

impl LocalGroup {
    /// Create `size` connected ranks; move each into its own thread.
    pub fn split(size: usize) -> MwxResult<Vec<LocalGroup>> {
        if size == 0 {
            return Err(MwxError::ConfigError(
                "LocalGroup needs at least one rank".to_string(),
            ));
        }
        let shared = Arc::new(Exchange {
            barrier: Barrier::new(size),
            slots: Mutex::new(vec![Vec::new(); size]),
        });
        Ok((0..size)
            .map(|rank| LocalGroup {
                rank,
                size,
                shared: Arc::clone(&shared),
            })
            .collect())
    }

    /// The slots hold plain copies, so a rank that panicked while holding
    /// the lock cannot leave them half-written for the others.
    fn slots(&self) -> MutexGuard<'_, Vec<Vec<f64>>> {
        self.shared.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Communicator for LocalGroup {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    /// Collective. Every rank reaches both barriers even when the call
    /// fails, so a length mismatch is reported on all ranks and the group
    /// stays usable. A rank that stops calling (panic, early exit) leaves
    /// the others blocked; the group is then unusable.
    fn all_reduce(&self, data: &mut [f64], op: ReduceOp) -> MwxResult<()> {
        self.slots()[self.rank] = data.to_vec();
        self.shared.barrier.wait();

        let result = {
            let slots = self.slots();
            if slots.iter().any(|s| s.len() != data.len()) {
                Err(MwxError::Collaborator(format!(
                    "all_reduce length mismatch on rank {}: lengths {:?}",
                    self.rank,
                    slots.iter().map(Vec::len).collect::<Vec<_>>()
                )))
            } else {
                for (i, out) in data.iter_mut().enumerate() {
                    *out = slots
                        .iter()
                        .fold(op.identity(), |acc, s| op.combine(acc, s[i]));
                }
                Ok(())
            }
        };
        // nobody may overwrite a slot until every rank has read them all
        self.shared.barrier.wait();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_single_process_is_identity() {
        let comm = SingleProcess;
        let mut v = [1.0, -2.0];
        comm.all_reduce_sum(&mut v).unwrap();
        assert_eq!(v, [1.0, -2.0]);
        assert!(comm.is_root());
        assert_eq!(comm.all_reduce_scalar(3.5, ReduceOp::Min).unwrap(), 3.5);
    }

    #[test]
    fn test_local_group_sum_min_max() {
        let ranks = LocalGroup::split(3).unwrap();
        let handles: Vec<_> = ranks
            .into_iter()
            .map(|comm| {
                thread::spawn(move || {
                    let r = comm.rank() as f64;
                    let mut v = [r, 10.0 * r];
                    comm.all_reduce_sum(&mut v).unwrap();
                    let lo = comm.all_reduce_scalar(r + 1.0, ReduceOp::Min).unwrap();
                    let hi = comm.all_reduce_scalar(r + 1.0, ReduceOp::Max).unwrap();
                    (v, lo, hi)
                })
            })
            .collect();
        for h in handles {
            let (v, lo, hi) = h.join().unwrap();
            assert_eq!(v, [3.0, 30.0]);
            assert_eq!(lo, 1.0);
            assert_eq!(hi, 3.0);
        }
    }

    #[test]
    fn test_local_group_repeated_reductions() {
        let ranks = LocalGroup::split(2).unwrap();
        let handles: Vec<_> = ranks
            .into_iter()
            .map(|comm| {
                thread::spawn(move || {
                    let mut acc = 0.0;
                    for k in 0..50 {
                        let mut v = [k as f64 + comm.rank() as f64];
                        comm.all_reduce_sum(&mut v).unwrap();
                        acc += v[0];
                    }
                    acc
                })
            })
            .collect();
        // sum_k (2k + 1) for k < 50
        for h in handles {
            assert_eq!(h.join().unwrap(), 2500.0);
        }
    }

    #[test]
    fn test_length_mismatch_fails_everywhere_and_group_recovers() {
        let ranks = LocalGroup::split(2).unwrap();
        let handles: Vec<_> = ranks
            .into_iter()
            .map(|comm| {
                thread::spawn(move || {
                    let mut v = vec![1.0; comm.rank() + 1];
                    let first = comm.all_reduce_sum(&mut v);
                    let mut w = [comm.rank() as f64];
                    comm.all_reduce_sum(&mut w).unwrap();
                    (first.is_err(), w[0])
                })
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), (true, 1.0));
        }
    }

    #[test]
    fn test_poisoned_lock_does_not_strand_ranks() {
        let ranks = LocalGroup::split(2).unwrap();
        let shared = Arc::clone(&ranks[0].shared);
        let _ = thread::spawn(move || {
            let _guard = shared.slots.lock().unwrap();
            panic!("rank died holding the exchange lock");
        })
        .join();
        assert!(ranks[0].shared.slots.is_poisoned());

        let handles: Vec<_> = ranks
            .into_iter()
            .map(|comm| {
                thread::spawn(move || {
                    let mut v = [2.0];
                    comm.all_reduce_sum(&mut v).unwrap();
                    v[0]
                })
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), 4.0);
        }
    }

    #[test]
    fn test_zero_ranks_rejected() {
        assert!(LocalGroup::split(0).is_err());
    }
}
