//! 活跃变量分析
//!
//! Backward may-live data flow over one method's linear instruction list.
//! Labels are resolved to instruction indices first; the successors of an
//! instruction are its fall-through (unless it is a `goto` / `return`) plus its
//! jump target.
//!
//! ```text
//! liveOut[i] = ∪ liveIn[s]            for s in succ(i)
//! liveIn[i]  = used(i) ∪ (liveOut[i] \ defined(i))
//! ```
//!
//! Iterates to a fixed point starting from empty sets.

use crate::error::{CompileError, CompileResult};
use crate::middle::ir::Method;
use smallvec::SmallVec;
use std::collections::BTreeSet;
use tracing::trace;

/// Ordered set of variable names
pub type NameSet = BTreeSet<String>;

/// Successor indices of an instruction (at most two)
pub type Successors = SmallVec<[usize; 2]>;

/// Per-instruction liveness of one method
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Liveness {
    pub used: Vec<NameSet>,
    pub defined: Vec<NameSet>,
    pub successors: Vec<Successors>,
    pub live_in: Vec<NameSet>,
    pub live_out: Vec<NameSet>,
    /// Sweeps until the fixed point was reached
    pub iterations: usize,
}

impl Liveness {
    pub fn len(&self) -> usize {
        self.live_in.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live_in.is_empty()
    }

    /// Whether `name` is live on entry to instruction `idx`
    pub fn is_live_in(
        &self,
        idx: usize,
        name: &str,
    ) -> bool {
        self.live_in.get(idx).is_some_and(|set| set.contains(name))
    }

    /// Whether `name` is read by any instruction
    pub fn is_used_anywhere(
        &self,
        name: &str,
    ) -> bool {
        self.used.iter().any(|set| set.contains(name))
    }
}

/// Successors of every instruction, with labels resolved
pub fn successors(method: &Method) -> CompileResult<Vec<Successors>> {
    let labels = method.label_indices();
    let len = method.instructions.len();

    method
        .instructions
        .iter()
        .enumerate()
        .map(|(idx, instr)| {
            let mut succ = Successors::new();
            if !instr.is_terminator() && idx + 1 < len {
                succ.push(idx + 1);
            }
            if let Some(label) = instr.jump_target() {
                let target = labels
                    .get(label)
                    .copied()
                    .ok_or_else(|| CompileError::lookup(&method.name, label))?;
                if !succ.contains(&target) {
                    succ.push(target);
                }
            }
            Ok(succ)
        })
        .collect()
}

/// Run the analysis on `method`
pub fn analyze(method: &Method) -> CompileResult<Liveness> {
    let successors = successors(method)?;
    let used: Vec<NameSet> = method
        .instructions
        .iter()
        .map(|instr| instr.used().into_iter().map(str::to_string).collect())
        .collect();
    let defined: Vec<NameSet> = method
        .instructions
        .iter()
        .map(|instr| instr.defined().into_iter().map(str::to_string).collect())
        .collect();

    let len = method.instructions.len();
    let mut live_in = vec![NameSet::new(); len];
    let mut live_out = vec![NameSet::new(); len];

    let mut iterations = 0;
    loop {
        iterations += 1;
        let mut changed = false;

        // 逆序遍历收敛更快
        for idx in (0..len).rev() {
            let out: NameSet = successors[idx]
                .iter()
                .flat_map(|&s| live_in[s].iter().cloned())
                .collect();

            let mut inn: NameSet = out.difference(&defined[idx]).cloned().collect();
            inn.extend(used[idx].iter().cloned());

            if out != live_out[idx] {
                live_out[idx] = out;
                changed = true;
            }
            if inn != live_in[idx] {
                live_in[idx] = inn;
                changed = true;
            }
        }

        if !changed {
            break;
        }
    }

    trace!(
        "liveness of `{}` converged after {} sweeps",
        method.name,
        iterations
    );

    Ok(Liveness {
        used,
        defined,
        successors,
        live_in,
        live_out,
        iterations,
    })
}

#[cfg(test)]
mod tests;
