//! Stateful IR builder.
//!
//! The builder owns a current insertion point (function + block) and appends
//! instructions there. The converter's scope stack moves the insertion point
//! around as structured control flow opens and closes; instructions always
//! land in the block that is current at the source instruction's position.

use crate::dxop::DxOp;
use crate::inst::{
    AtomicOp, BinOp, Callee, CastOp, CmpPred, FastMath, Inst, InstKind, Terminator,
};
use crate::module::{BlockId, FuncId, InstId, Module, Value};
use crate::types::{ScalarType, Type};

pub struct IrBuilder<'m> {
    module: &'m mut Module,
    func: FuncId,
    block: BlockId,
}

impl<'m> IrBuilder<'m> {
    pub fn new(module: &'m mut Module, func: FuncId, block: BlockId) -> IrBuilder<'m> {
        IrBuilder {
            module,
            func,
            block,
        }
    }

    pub fn module(&mut self) -> &mut Module {
        self.module
    }

    pub fn func_id(&self) -> FuncId {
        self.func
    }

    pub fn block_id(&self) -> BlockId {
        self.block
    }

    pub fn set_insert_point(&mut self, func: FuncId, block: BlockId) {
        self.func = func;
        self.block = block;
    }

    pub fn set_block(&mut self, block: BlockId) {
        self.block = block;
    }

    pub fn create_block(&mut self, name: impl Into<String>) -> BlockId {
        self.module.func_mut(self.func).add_block(name)
    }

    /// Appends an instruction at the insertion point and returns its value.
    pub fn emit(&mut self, kind: InstKind, ty: Type) -> Value {
        let func = self.module.func_mut(self.func);
        debug_assert!(
            func.block(self.block).terminator.is_none(),
            "emitting into a sealed block"
        );
        let id = InstId(func.insts.len() as u32);
        func.insts.push(Inst {
            kind,
            ty,
            precise: false,
            fast_math: FastMath::empty(),
        });
        func.block_mut(self.block).insts.push(id);
        Value::Inst(id)
    }

    /// Seals the current block with a terminator. Emitting a terminator into
    /// an already-sealed block is a converter bug.
    pub fn terminate(&mut self, terminator: Terminator) {
        let func = self.module.func_mut(self.func);
        let block = func.block_mut(self.block);
        debug_assert!(block.terminator.is_none(), "block terminated twice");
        block.terminator = Some(terminator);
    }

    pub fn current_block_terminated(&self) -> bool {
        self.module
            .func(self.func)
            .block(self.block)
            .terminator
            .is_some()
    }

    pub fn value_type(&self, value: Value) -> Type {
        self.module.value_type(self.func, value)
    }

    // Arithmetic ------------------------------------------------------------

    pub fn binary(&mut self, op: BinOp, lhs: Value, rhs: Value) -> Value {
        let ty = self.value_type(lhs);
        self.emit(InstKind::Binary { op, lhs, rhs }, ty)
    }

    pub fn add(&mut self, lhs: Value, rhs: Value) -> Value {
        self.binary(BinOp::Add, lhs, rhs)
    }

    pub fn sub(&mut self, lhs: Value, rhs: Value) -> Value {
        self.binary(BinOp::Sub, lhs, rhs)
    }

    pub fn mul(&mut self, lhs: Value, rhs: Value) -> Value {
        self.binary(BinOp::Mul, lhs, rhs)
    }

    pub fn and(&mut self, lhs: Value, rhs: Value) -> Value {
        self.binary(BinOp::And, lhs, rhs)
    }

    pub fn or(&mut self, lhs: Value, rhs: Value) -> Value {
        self.binary(BinOp::Or, lhs, rhs)
    }

    pub fn xor(&mut self, lhs: Value, rhs: Value) -> Value {
        self.binary(BinOp::Xor, lhs, rhs)
    }

    pub fn icmp(&mut self, pred: CmpPred, lhs: Value, rhs: Value) -> Value {
        debug_assert!(!pred.is_float());
        self.emit(InstKind::Cmp { pred, lhs, rhs }, Type::I1)
    }

    pub fn fcmp(&mut self, pred: CmpPred, lhs: Value, rhs: Value) -> Value {
        debug_assert!(pred.is_float());
        self.emit(InstKind::Cmp { pred, lhs, rhs }, Type::I1)
    }

    pub fn cast(&mut self, op: CastOp, value: Value, to: Type) -> Value {
        self.emit(InstKind::Cast { op, value }, to)
    }

    pub fn select(&mut self, cond: Value, on_true: Value, on_false: Value) -> Value {
        let ty = self.value_type(on_true);
        self.emit(
            InstKind::Select {
                cond,
                on_true,
                on_false,
            },
            ty,
        )
    }

    // Calls -----------------------------------------------------------------

    /// Emits a dx op call. `overload` selects the intrinsic overload; the
    /// return type is derived from the op and overload.
    pub fn call_dxop(&mut self, op: DxOp, overload: Type, args: Vec<Value>, ret: Type) -> Value {
        debug_assert_eq!(
            args.len(),
            op.arity(),
            "dx op {} expects {} args",
            op.name(),
            op.arity()
        );
        self.emit(
            InstKind::Call {
                callee: Callee::DxOp(op, overload),
                args,
            },
            ret,
        )
    }

    /// Scalar-returning dx op call with the overload as return type.
    pub fn call_dxop_scalar(&mut self, op: DxOp, scalar: ScalarType, args: Vec<Value>) -> Value {
        self.call_dxop(
            op,
            Type::Scalar(scalar),
            args,
            Type::Scalar(scalar),
        )
    }

    /// Void dx op call (stores, barriers, streams).
    pub fn call_dxop_void(&mut self, op: DxOp, overload: Type, args: Vec<Value>) -> Value {
        self.call_dxop(op, overload, args, Type::Void)
    }

    pub fn call_function(&mut self, callee: FuncId, args: Vec<Value>, ret: Type) -> Value {
        self.emit(
            InstKind::Call {
                callee: Callee::Function(callee),
                args,
            },
            ret,
        )
    }

    pub fn extract_value(&mut self, value: Value, index: u32) -> Value {
        let agg_ty = self.value_type(value);
        let ty = agg_ty
            .aggregate_elem(index)
            .expect("extractvalue from non-aggregate");
        self.emit(InstKind::ExtractValue { value, index }, ty)
    }

    // Memory ----------------------------------------------------------------

    pub fn alloca(&mut self, elem: Type, count: u32) -> Value {
        let ty = Type::ptr(
            if count == 1 {
                elem.clone()
            } else {
                Type::array(elem.clone(), count)
            },
            crate::module::AddressSpace::Default,
        );
        self.emit(InstKind::Alloca { elem, count }, ty)
    }

    pub fn load(&mut self, ptr: Value) -> Value {
        let ty = match self.value_type(ptr) {
            Type::Ptr(elem, _) => *elem,
            other => panic!("load from non-pointer type {other:?}"),
        };
        self.emit(InstKind::Load { ptr }, ty)
    }

    pub fn store(&mut self, ptr: Value, value: Value) -> Value {
        self.emit(InstKind::Store { ptr, value }, Type::Void)
    }

    pub fn gep(&mut self, base: Value, indices: Vec<Value>) -> Value {
        // Pointer arithmetic through arrays: peel one array layer per index
        // after the leading zero index.
        let (mut elem, space) = match self.value_type(base) {
            Type::Ptr(elem, space) => (*elem, space),
            other => panic!("gep on non-pointer type {other:?}"),
        };
        for _ in 1..indices.len() {
            elem = match elem {
                Type::Array(inner, _) => *inner,
                other => other,
            };
        }
        let ty = Type::ptr(elem, space);
        self.emit(InstKind::Gep { base, indices }, ty)
    }

    pub fn atomic_rmw(&mut self, op: AtomicOp, ptr: Value, value: Value) -> Value {
        let ty = self.value_type(value);
        self.emit(InstKind::AtomicRmw { op, ptr, value }, ty)
    }

    pub fn atomic_cmpxchg(&mut self, ptr: Value, expected: Value, replacement: Value) -> Value {
        self.emit(
            InstKind::AtomicCmpXchg {
                ptr,
                expected,
                replacement,
            },
            Type::Carry,
        )
    }

    // Attributes ------------------------------------------------------------

    /// Marks the most recently emitted instruction precise (or clears its
    /// fast-math flags when it is an FP math operator).
    pub fn mark_precise(&mut self, value: Value) {
        if let Value::Inst(id) = value {
            let is_fp_math = {
                let inst = self.module.func(self.func).inst(id);
                match &inst.kind {
                    InstKind::Binary { op, .. } => op.is_float(),
                    InstKind::Call { .. } => inst.ty.is_float(),
                    _ => false,
                }
            };
            let inst = self.module.func_mut(self.func).inst_mut(id);
            if is_fp_math {
                inst.fast_math = FastMath::empty();
            } else {
                inst.precise = true;
            }
        }
    }

    /// Applies default fast-math to an FP instruction result.
    pub fn apply_fast_math(&mut self, value: Value) {
        if let Value::Inst(id) = value {
            let inst = self.module.func_mut(self.func).inst_mut(id);
            let is_fp = match &inst.kind {
                InstKind::Binary { op, .. } => op.is_float(),
                InstKind::Call { .. } => inst.ty.is_float(),
                _ => false,
            };
            if is_fp {
                inst.fast_math = FastMath::FAST;
            }
        }
    }
}
