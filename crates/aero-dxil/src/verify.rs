//! Structural verification, reducibility analysis, and unreachable-block
//! removal.
//!
//! The converter runs the reducibility check on every emitted function before
//! handing the module to the cleanup pass; DXBC's structured control flow can
//! only produce reducible graphs, so an irreducible result means the scope
//! stack mis-wired a branch.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::inst::{Callee, InstKind, Terminator};
use crate::module::{BlockId, FuncId, Function, Module};
use crate::types::Type;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("function {func}: block {block} has no terminator")]
    MissingTerminator { func: String, block: String },
    #[error("function {func}: block {block} branches to nonexistent block {target}")]
    BadBranchTarget {
        func: String,
        block: String,
        target: u32,
    },
    #[error("function {func}: call to {op} passes {got} args, expected {expected}")]
    BadCallArity {
        func: String,
        op: &'static str,
        got: usize,
        expected: usize,
    },
    #[error("function {func}: instruction {inst} referenced before definition")]
    UseBeforeDef { func: String, inst: u32 },
    #[error("function {func}: store of void value")]
    VoidStore { func: String },
    #[error("function {func} is irreducible")]
    Irreducible { func: String },
}

/// Verifies module-level structural invariants:
///
/// - every block is sealed with exactly one terminator,
/// - branch targets exist,
/// - dx op call arities match the property table,
/// - within each block, instruction operands are defined by earlier
///   instructions of the same function (cross-block dataflow goes through
///   memory or intrinsics in this dialect, so block-local ordering is the
///   whole dominance story for instruction values).
pub fn verify_module(module: &Module) -> Result<(), VerifyError> {
    for func in &module.functions {
        verify_function(func)?;
    }
    Ok(())
}

fn verify_function(func: &Function) -> Result<(), VerifyError> {
    let block_count = func.blocks.len() as u32;

    // Instruction definition order: position of each inst in the linear
    // block-order walk.
    let mut def_pos: BTreeMap<u32, usize> = BTreeMap::new();
    let mut pos = 0usize;
    for block in &func.blocks {
        for &inst in &block.insts {
            def_pos.insert(inst.0, pos);
            pos += 1;
        }
    }

    let mut seen = 0usize;
    for block in &func.blocks {
        for &inst_id in &block.insts {
            let inst = func.inst(inst_id);
            let mut check_value = |v: &crate::module::Value| -> Result<(), VerifyError> {
                if let crate::module::Value::Inst(id) = v {
                    match def_pos.get(&id.0) {
                        Some(&p) if p < seen => Ok(()),
                        _ => Err(VerifyError::UseBeforeDef {
                            func: func.name.clone(),
                            inst: id.0,
                        }),
                    }
                } else {
                    Ok(())
                }
            };

            match &inst.kind {
                InstKind::Binary { lhs, rhs, .. } | InstKind::Cmp { lhs, rhs, .. } => {
                    check_value(lhs)?;
                    check_value(rhs)?;
                }
                InstKind::Cast { value, .. } | InstKind::ExtractValue { value, .. } => {
                    check_value(value)?;
                }
                InstKind::Select {
                    cond,
                    on_true,
                    on_false,
                } => {
                    check_value(cond)?;
                    check_value(on_true)?;
                    check_value(on_false)?;
                }
                InstKind::Call { callee, args } => {
                    for a in args {
                        check_value(a)?;
                    }
                    if let Callee::DxOp(op, _) = callee {
                        if args.len() != op.arity() {
                            return Err(VerifyError::BadCallArity {
                                func: func.name.clone(),
                                op: op.name(),
                                got: args.len(),
                                expected: op.arity(),
                            });
                        }
                    }
                }
                InstKind::Load { ptr } => check_value(ptr)?,
                InstKind::Store { ptr, value } => {
                    check_value(ptr)?;
                    check_value(value)?;
                    if let crate::module::Value::Inst(id) = value {
                        if func.inst(*id).ty == Type::Void {
                            return Err(VerifyError::VoidStore {
                                func: func.name.clone(),
                            });
                        }
                    }
                }
                InstKind::Gep { base, indices } => {
                    check_value(base)?;
                    for i in indices {
                        check_value(i)?;
                    }
                }
                InstKind::Alloca { .. } => {}
                InstKind::AtomicRmw { ptr, value, .. } => {
                    check_value(ptr)?;
                    check_value(value)?;
                }
                InstKind::AtomicCmpXchg {
                    ptr,
                    expected,
                    replacement,
                } => {
                    check_value(ptr)?;
                    check_value(expected)?;
                    check_value(replacement)?;
                }
            }
            seen += 1;
        }

        let term = block.terminator.as_ref().ok_or_else(|| {
            VerifyError::MissingTerminator {
                func: func.name.clone(),
                block: block.name.clone(),
            }
        })?;
        for target in term.successors() {
            if target.0 >= block_count {
                return Err(VerifyError::BadBranchTarget {
                    func: func.name.clone(),
                    block: block.name.clone(),
                    target: target.0,
                });
            }
        }
    }
    Ok(())
}

/// T1/T2 interval reduction: collapse self-loops and single-predecessor
/// merges until fixpoint; the graph is reducible iff it collapses to the
/// entry node alone.
pub fn is_reducible(func: &Function) -> bool {
    let n = func.blocks.len();
    if n <= 1 {
        return true;
    }

    // Successor sets, skipping blocks with no terminator (verification
    // catches those separately).
    let mut succ: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
    for (i, block) in func.blocks.iter().enumerate() {
        if let Some(term) = &block.terminator {
            for s in term.successors() {
                succ[i].insert(s.index());
            }
        }
    }

    let mut alive: BTreeSet<usize> = (0..n).collect();
    loop {
        let mut changed = false;

        // T1: remove self loops.
        for &node in alive.iter() {
            if succ[node].remove(&node) {
                changed = true;
            }
        }

        // T2: merge a non-entry node with a unique predecessor into it.
        let mut preds: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for &node in alive.iter() {
            for &s in &succ[node] {
                preds.entry(s).or_default().push(node);
            }
        }
        let candidate = alive.iter().copied().find(|&node| {
            node != 0 && preds.get(&node).map(|p| p.len()) == Some(1)
        });
        if let Some(node) = candidate {
            let pred = preds[&node][0];
            let outgoing: Vec<usize> = succ[node].iter().copied().collect();
            succ[pred].remove(&node);
            for s in outgoing {
                if s != node {
                    succ[pred].insert(s);
                }
            }
            succ[node].clear();
            alive.remove(&node);
            changed = true;
        }

        if !changed {
            break;
        }
    }

    // Unreachable nodes never gain a unique predecessor; ignore them (the
    // converter removes them before this check runs).
    let mut reachable = BTreeSet::new();
    let mut stack = vec![0usize];
    while let Some(b) = stack.pop() {
        if !reachable.insert(b) {
            continue;
        }
        if let Some(term) = &func.blocks[b].terminator {
            for s in term.successors() {
                stack.push(s.index());
            }
        }
    }
    alive.iter().all(|b| !reachable.contains(b) || *b == 0)
}

/// Removes blocks unreachable from the entry, renumbering branch targets.
/// Returns the number of blocks removed.
pub fn remove_unreachable_blocks(module: &mut Module, func_id: FuncId) -> usize {
    let func = module.func_mut(func_id);
    let n = func.blocks.len();
    if n == 0 {
        return 0;
    }

    let mut reachable = vec![false; n];
    let mut stack = vec![0usize];
    while let Some(b) = stack.pop() {
        if reachable[b] {
            continue;
        }
        reachable[b] = true;
        if let Some(term) = &func.blocks[b].terminator {
            for s in term.successors() {
                stack.push(s.index());
            }
        }
    }

    if reachable.iter().all(|&r| r) {
        return 0;
    }

    // Old index -> new index.
    let mut remap = vec![u32::MAX; n];
    let mut next = 0u32;
    for (i, &r) in reachable.iter().enumerate() {
        if r {
            remap[i] = next;
            next += 1;
        }
    }

    let removed = n - next as usize;
    let mut blocks = Vec::with_capacity(next as usize);
    for (i, block) in std::mem::take(&mut func.blocks).into_iter().enumerate() {
        if !reachable[i] {
            continue;
        }
        blocks.push(block);
    }
    for block in &mut blocks {
        if let Some(term) = &mut block.terminator {
            let fix = |bb: &mut BlockId| {
                bb.0 = remap[bb.index()];
                debug_assert_ne!(bb.0, u32::MAX, "branch into removed block");
            };
            match term {
                Terminator::Br { target } => fix(target),
                Terminator::CondBr {
                    then_bb, else_bb, ..
                } => {
                    fix(then_bb);
                    fix(else_bb);
                }
                Terminator::Switch { default, cases, .. } => {
                    fix(default);
                    for (_, bb) in cases {
                        fix(bb);
                    }
                }
                Terminator::Ret { .. } | Terminator::Unreachable => {}
            }
        }
    }
    func.blocks = blocks;
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Function;

    fn func_with_edges(n: usize, edges: &[(usize, usize)], conds: &[usize]) -> Function {
        // Blocks with Br/CondBr terminators synthesized from the edge list.
        let mut f = Function::new("t", Type::Void);
        for i in 0..n {
            f.add_block(format!("b{i}"));
        }
        for i in 0..n {
            let outs: Vec<usize> = edges
                .iter()
                .filter(|(a, _)| *a == i)
                .map(|(_, b)| *b)
                .collect();
            let term = match outs.len() {
                0 => Terminator::Ret { value: None },
                1 => Terminator::Br {
                    target: BlockId(outs[0] as u32),
                },
                _ => {
                    assert!(conds.contains(&i), "block {i} needs a condition value");
                    Terminator::CondBr {
                        cond: crate::module::Value::Const(crate::module::ConstId(0)),
                        then_bb: BlockId(outs[0] as u32),
                        else_bb: BlockId(outs[1] as u32),
                    }
                }
            };
            f.block_mut(BlockId(i as u32)).terminator = Some(term);
        }
        f
    }

    #[test]
    fn diamond_is_reducible() {
        let f = func_with_edges(4, &[(0, 1), (0, 2), (1, 3), (2, 3)], &[0]);
        assert!(is_reducible(&f));
    }

    #[test]
    fn natural_loop_is_reducible() {
        // 0 -> 1 <-> 2, 1 -> 3
        let f = func_with_edges(4, &[(0, 1), (1, 2), (2, 1), (1, 3)], &[1]);
        assert!(is_reducible(&f));
    }

    #[test]
    fn cross_edges_into_loop_are_irreducible() {
        // Classic irreducible shape: two loop headers entered from outside.
        // 0 -> 1, 0 -> 2, 1 -> 2, 2 -> 1
        let f = func_with_edges(3, &[(0, 1), (0, 2), (1, 2), (2, 1)], &[0]);
        assert!(!is_reducible(&f));
    }

    #[test]
    fn unreachable_blocks_are_removed_and_targets_remapped() {
        let mut module = Module::new("t");
        let mut f = Function::new("t", Type::Void);
        let b0 = f.add_block("entry");
        let b1 = f.add_block("dead");
        let b2 = f.add_block("exit");
        f.block_mut(b0).terminator = Some(Terminator::Br { target: b2 });
        f.block_mut(b1).terminator = Some(Terminator::Ret { value: None });
        f.block_mut(b2).terminator = Some(Terminator::Ret { value: None });
        let id = module.add_function(f);

        assert_eq!(remove_unreachable_blocks(&mut module, id), 1);
        let f = module.func(id);
        assert_eq!(f.blocks.len(), 2);
        assert_eq!(
            f.block(BlockId(0)).terminator,
            Some(Terminator::Br { target: BlockId(1) })
        );
    }
}
