//! 寄存器分配
//!
//! Liveness-driven graph coloring onto an unbounded set of virtual registers
//! (JVM local variable slots). Steps per method:
//!
//! 1. temporaries that are written but never read are pruned and stay unassigned;
//! 2. the interference graph is built over the remaining non-reserved names;
//! 3. `this` and the parameters take registers `0..` in declaration order and
//!    those registers are never handed out again;
//! 4. copy chains are coalesced onto one register each;
//! 5. the rest is colored greedily in variable table order.
//!
//! Constructors and `main` are skipped; the emitter lays them out itself.

pub mod coalesce;
pub mod interference;

use crate::error::{CompileError, CompileResult};
use crate::middle::ir::{ClassUnit, Method, VarKind};
use crate::middle::liveness;
use indexmap::{IndexMap, IndexSet};
use tracing::{debug, trace};

pub use interference::InterferenceGraph;

/// Whether graph coloring runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AllocationMode {
    /// 1:1 slots in declaration order
    Disabled,
    #[default]
    Enabled,
}

impl From<bool> for AllocationMode {
    fn from(enabled: bool) -> Self {
        if enabled {
            AllocationMode::Enabled
        } else {
            AllocationMode::Disabled
        }
    }
}

/// What the allocator did to one method
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allocation {
    pub registers: IndexMap<String, u16>,
    /// Copy chains that share a register
    pub coalesced: Vec<Vec<String>>,
    /// Dead temporaries left without a register
    pub pruned: Vec<String>,
    pub interference: InterferenceGraph,
}

impl Allocation {
    /// Number of distinct registers in use
    pub fn register_count(&self) -> usize {
        self.registers.values().collect::<IndexSet<_>>().len()
    }
}

/// Slots in declaration order: `this`, parameters, locals, temporaries
pub fn sequential_registers(method: &Method) -> IndexMap<String, u16> {
    method
        .vars
        .keys()
        .enumerate()
        .map(|(slot, name)| (name.clone(), slot as u16))
        .collect()
}

/// Allocate every method of the unit in place
pub fn allocate_class(
    unit: &mut ClassUnit,
    mode: AllocationMode,
) -> CompileResult<()> {
    debug!("allocating registers for `{}` ({:?})", unit.name, mode);
    for method in unit.methods.iter_mut().filter(|m| m.needs_allocation()) {
        let allocation = allocate_method(method, mode)?;
        trace!(
            "`{}`: {} registers, {} coalesced chains, {} pruned temporaries, interference {} nodes / {} edges",
            method.name,
            allocation.register_count(),
            allocation.coalesced.len(),
            allocation.pruned.len(),
            allocation.interference.node_count(),
            allocation.interference.edge_count()
        );
    }
    Ok(())
}

/// Allocate one method, writing registers into its variable table.
/// Any earlier assignment is discarded, so re-running is idempotent.
pub fn allocate_method(
    method: &mut Method,
    mode: AllocationMode,
) -> CompileResult<Allocation> {
    method.clear_registers();

    let allocation = match mode {
        AllocationMode::Disabled => Allocation {
            registers: sequential_registers(method),
            ..Allocation::default()
        },
        AllocationMode::Enabled => color(method)?,
    };

    for (name, register) in &allocation.registers {
        let entry = method
            .vars
            .get_mut(name)
            .ok_or_else(|| CompileError::allocator(&method.name, format!("`{}` has no table entry", name)))?;
        entry.register = Some(*register);
    }
    Ok(allocation)
}

fn color(method: &Method) -> CompileResult<Allocation> {
    let liveness = liveness::analyze(method)?;

    // 1. 死临时变量
    let pruned: Vec<String> = method
        .vars
        .iter()
        .filter(|(name, entry)| entry.kind == VarKind::Temporary && !liveness.is_used_anywhere(name))
        .map(|(name, _)| name.clone())
        .collect();

    let candidates: IndexSet<String> = method
        .vars
        .iter()
        .filter(|(name, entry)| !entry.is_reserved() && !pruned.contains(name))
        .map(|(name, _)| name.clone())
        .collect();

    // 2. 干涉图
    let interference =
        InterferenceGraph::build(method, &liveness, candidates.iter().map(String::as_str))?;

    // 3. 保留寄存器
    let mut registers: IndexMap<String, u16> = IndexMap::new();
    for (name, _) in method.vars.iter().filter(|(_, entry)| entry.is_reserved()) {
        let register = registers.len() as u16;
        registers.insert(name.clone(), register);
    }
    let first_free = registers.len() as u16;

    // 4. 复制合并
    let coalesced = coalesce::coalesced_chains(method, &candidates, &interference);
    for chain in &coalesced {
        let register = lowest_free(chain, &interference, &registers, first_free);
        for name in chain {
            registers.insert(name.clone(), register);
        }
    }

    // 5. 贪心着色
    for name in &candidates {
        if registers.contains_key(name) {
            continue;
        }
        let register = lowest_free(std::slice::from_ref(name), &interference, &registers, first_free);
        registers.insert(name.clone(), register);
    }

    verify(method, &interference, &registers)?;

    Ok(Allocation {
        registers,
        coalesced,
        pruned,
        interference,
    })
}

/// Smallest register at or above `first_free` that no interfering neighbor of
/// any of `names` already holds
fn lowest_free(
    names: &[String],
    interference: &InterferenceGraph,
    registers: &IndexMap<String, u16>,
    first_free: u16,
) -> u16 {
    let taken: IndexSet<u16> = names
        .iter()
        .flat_map(|name| interference.neighbors(name))
        .filter_map(|neighbor| registers.get(neighbor).copied())
        .collect();
    (first_free..)
        .find(|r| !taken.contains(r))
        .unwrap_or(first_free)
}

fn verify(
    method: &Method,
    interference: &InterferenceGraph,
    registers: &IndexMap<String, u16>,
) -> CompileResult<()> {
    for a in interference.nodes() {
        let register = registers.get(a).ok_or_else(|| {
            CompileError::allocator(&method.name, format!("`{}` was never colored", a))
        })?;
        for b in interference.neighbors(a) {
            if registers.get(b) == Some(register) {
                return Err(CompileError::allocator(
                    &method.name,
                    format!("interfering `{}` and `{}` share register {}", a, b, register),
                ));
            }
        }
    }
    Ok(())
}
