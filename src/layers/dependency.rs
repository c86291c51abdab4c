//! Dependency ordering within a layer.
//!
//! Effect A depends on effect B when applying B would change whether A
//! exists, which objects A applies to, or what A does to them. Dependency
//! is decided by simulation: B is applied to a fork of the current pass and
//! A's signature is compared before and after.
//!
//! The next effect to apply is the earliest-timestamped one that depends on
//! no other remaining effect. When every remaining effect depends on another
//! one, the effects form a cycle, which is reported as an invariant
//! violation.

use tracing::{debug, trace};

use super::system::{LayerEffect, Pass};
use crate::cards::Characteristics;
use crate::core::ObjectId;
use crate::error::{Result, RulesError};

/// What an effect would do right now.
#[derive(Debug, PartialEq)]
struct Signature {
    applies: Option<Vec<ObjectId>>,
    amounts: Vec<i64>,
    copied: Vec<Option<Characteristics>>,
}

fn signature(pass: &Pass<'_>, effect: &LayerEffect) -> Signature {
    let applies = pass.affected_now(effect).map(|mut ids| {
        ids.sort_unstable();
        ids
    });
    let mut amounts = Vec::new();
    let mut copied = Vec::new();
    for &id in applies.iter().flatten() {
        let (a, c) = pass.inputs(effect, id);
        amounts.extend(a);
        copied.extend(c);
    }
    Signature {
        applies,
        amounts,
        copied,
    }
}

/// Whether `dependent` depends on `other`.
pub(crate) fn depends_on(pass: &Pass<'_>, dependent: &LayerEffect, other: &LayerEffect) -> bool {
    let before = signature(pass, dependent);
    let mut fork = pass.clone();
    fork.apply(other, false);
    let after = signature(&fork, dependent);
    before != after
}

/// Index of the effect in `pending` to apply next. `pending` is sorted by
/// timestamp.
pub(crate) fn next_effect(pass: &Pass<'_>, pending: &[LayerEffect]) -> Result<usize> {
    if pending.len() == 1 {
        return Ok(0);
    }
    for (i, candidate) in pending.iter().enumerate() {
        let blocked_by = pending
            .iter()
            .enumerate()
            .find(|&(j, other)| j != i && depends_on(pass, candidate, other));
        match blocked_by {
            None => return Ok(i),
            Some((_, other)) => trace!(effect = ?candidate.key, on = ?other.key, "effect waits on dependency"),
        }
    }
    debug!(effects = pending.len(), "dependency cycle");
    Err(RulesError::invariant(format!(
        "dependency cycle among {} continuous effects: {:?}",
        pending.len(),
        pending.iter().map(|e| e.key).collect::<Vec<_>>()
    )))
}
