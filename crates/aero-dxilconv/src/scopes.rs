//! Structured control-flow reconstruction.
//!
//! DXBC control flow is a linear token stream of `if`/`else`/`endif`,
//! `loop`/`endloop`, `switch`/`case`/`endswitch`, subroutines, and the
//! synthesized hull-shader phase loops. The scope stack turns that stream
//! back into a well-formed CFG: every push creates the successor blocks for
//! its construct, every pop seals them. Blocks created after unconditional
//! `break`/`continue`/`ret` collect the (dead) tail of the scope and are
//! removed during finalization.

use aero_dxil::{BlockId, Value};

/// One open control-flow construct.
#[derive(Debug)]
pub(crate) enum Scope {
    Function {
        /// Sequence number for naming `ret`-continuation blocks.
        ret_count: u32,
    },
    If {
        /// Block whose conditional branch gets its false edge retargeted if
        /// an `else` arrives.
        pre: BlockId,
        end_bb: BlockId,
    },
    Loop {
        body: BlockId,
        exit: BlockId,
        continue_count: u32,
        break_count: u32,
    },
    Switch {
        /// Block whose terminator becomes the `switch` once sealed.
        pre: BlockId,
        selector: Value,
        end_bb: BlockId,
        default_bb: Option<BlockId>,
        /// (case value, target block), in source order; duplicates targeting
        /// the same block are deduplicated at `endswitch`.
        cases: Vec<(u32, BlockId)>,
        /// Open case-group block instructions land in, when one is open.
        current_case: Option<BlockId>,
        case_count: u32,
        break_count: u32,
    },
    /// Synthesized loop around a hull-shader fork/join phase.
    HullLoop {
        body: BlockId,
        /// Increments the induction variable and tests the trip count.
        latch: BlockId,
        exit: BlockId,
        /// Pointer to the induction variable's storage.
        induction: Value,
        trip_count: u32,
    },
}

/// LIFO stack of open scopes with per-kind counters for block naming.
#[derive(Debug, Default)]
pub(crate) struct ScopeStack {
    scopes: Vec<Scope>,
    pub if_count: u32,
    pub loop_count: u32,
    pub switch_count: u32,
    pub hull_count: u32,
}

impl ScopeStack {
    pub fn push(&mut self, scope: Scope) {
        match &scope {
            Scope::If { .. } => self.if_count += 1,
            Scope::Loop { .. } => self.loop_count += 1,
            Scope::Switch { .. } => self.switch_count += 1,
            Scope::HullLoop { .. } => self.hull_count += 1,
            Scope::Function { .. } => {}
        }
        self.scopes.push(scope);
    }

    pub fn pop(&mut self) -> Option<Scope> {
        self.scopes.pop()
    }

    pub fn top_mut(&mut self) -> Option<&mut Scope> {
        self.scopes.last_mut()
    }

    /// Innermost loop (`loop` only; hull loops do not receive `break`).
    pub fn parent_loop_mut(&mut self) -> Option<&mut Scope> {
        self.scopes
            .iter_mut()
            .rev()
            .find(|s| matches!(s, Scope::Loop { .. }))
    }

    /// Innermost `loop` or `switch`; the target of `break`.
    pub fn parent_breakable_mut(&mut self) -> Option<&mut Scope> {
        self.scopes
            .iter_mut()
            .rev()
            .find(|s| matches!(s, Scope::Loop { .. } | Scope::Switch { .. }))
    }

    /// Innermost function scope; the target of `ret`.
    pub fn parent_function_mut(&mut self) -> Option<&mut Scope> {
        self.scopes
            .iter_mut()
            .rev()
            .find(|s| matches!(s, Scope::Function { .. }))
    }

    /// Innermost hull loop, when translation is inside a fork/join phase.
    pub fn parent_hull_loop(&self) -> Option<&Scope> {
        self.scopes
            .iter()
            .rev()
            .find(|s| matches!(s, Scope::HullLoop { .. }))
    }

    /// Whether a hull loop is open anywhere on the stack.
    pub fn in_hull_loop(&self) -> bool {
        self.parent_hull_loop().is_some()
    }
}
