//! The operand value model.
//!
//! Register operands are 4-lane vectors; an [`OperandValue`] carries one IR
//! value per lane, populated only for the lanes a load/store mask selects.
//! Loading materializes the right intrinsic per operand kind and lane;
//! storing mirrors it. Implicit casts between the requested value type and
//! the operand's natural type follow a fixed bit-level table.

use aero_dxbc::comp::{CompMask, Swizzle};
use aero_dxbc::sm4::decode::{
    Instruction, Operand, OperandIndex, OperandKind, OperandModifier,
};
use aero_dxbc::sm4::ShaderStage;
use aero_dxil::{BinOp, CastOp, CmpPred, DxOp, ResourceClass, ScalarType, Type, Value};

use crate::conv::Conversion;
use crate::error::{ConvertError, Result};

/// One IR value per register lane; lanes outside the active mask stay empty.
#[derive(Debug, Clone, Default)]
pub(crate) struct OperandValue(pub [Option<Value>; 4]);

impl OperandValue {
    pub fn get(&self, comp: u8) -> Value {
        self.0[comp as usize].expect("operand lane not loaded")
    }

    pub fn try_get(&self, comp: u8) -> Option<Value> {
        self.0[comp as usize]
    }

    pub fn set(&mut self, comp: u8, value: Value) {
        self.0[comp as usize] = Some(value);
    }

    pub fn map(&self, mask: CompMask, mut f: impl FnMut(u8, Value) -> Value) -> OperandValue {
        let mut out = self.clone();
        for c in mask.comps() {
            if let Some(v) = self.0[c as usize] {
                out.0[c as usize] = Some(f(c, v));
            }
        }
        out
    }
}

impl Conversion {
    // Index arithmetic ------------------------------------------------------

    /// Loads one operand index dimension as an i32 value.
    pub(crate) fn load_index(&mut self, index: &OperandIndex) -> Result<Value> {
        Ok(match index {
            OperandIndex::Imm32(v) => self.const_i32(*v),
            OperandIndex::Imm64(v) => self.const_i32(*v as u32),
            OperandIndex::Relative(op) => self.load_scalar(op, ScalarType::I32)?,
            OperandIndex::Imm32PlusRelative(base, op) => {
                let rel = self.load_scalar(op, ScalarType::I32)?;
                let base = self.const_i32(*base);
                self.builder().add(base, rel)
            }
        })
    }

    /// Immediate value of an index that must be static (declarations, range
    /// ids).
    pub(crate) fn static_index(&self, op: &Operand, dim: usize) -> Result<u32> {
        op.indices
            .get(dim)
            .and_then(|i| i.as_imm())
            .ok_or_else(|| {
                ConvertError::MalformedBytecode(format!(
                    "operand {:?} index {dim} must be immediate",
                    op.kind
                ))
            })
    }

    /// Loads the single lane an operand's swizzle selects (used for dynamic
    /// register indices and scalar arguments).
    pub(crate) fn load_scalar(&mut self, op: &Operand, ty: ScalarType) -> Result<Value> {
        let lane = op.swizzle().lane(0);
        let value = self.load_operand_op(op, CompMask::X, Swizzle::splat(lane), ty)?;
        Ok(value.get(0))
    }

    /// Raw single-lane load as i32, bypassing operand modifiers; used where
    /// modifiers re-apply to a converted result instead of the source.
    pub(crate) fn load_operand_lane_i32(&mut self, op: &Operand, lane: u8) -> Result<Value> {
        self.load_lane(op, lane, ScalarType::I32)
    }

    // Loads -----------------------------------------------------------------

    /// Loads instruction operand `idx` under `mask` as `ty`.
    pub(crate) fn load_operand(
        &mut self,
        inst: &Instruction,
        idx: usize,
        mask: CompMask,
        ty: ScalarType,
    ) -> Result<OperandValue> {
        let op = inst.operands.get(idx).ok_or_else(|| {
            ConvertError::MalformedBytecode(format!(
                "{} is missing operand {idx}",
                inst.opcode.name()
            ))
        })?;
        // The clone keeps borrows of `self.instructions` out of the emission
        // path; operands are small trees.
        let op = op.clone();
        self.load_operand_op(&op, mask, op.swizzle(), ty)
    }

    fn load_operand_op(
        &mut self,
        op: &Operand,
        mask: CompMask,
        swizzle: Swizzle,
        ty: ScalarType,
    ) -> Result<OperandValue> {
        let mut value = if ty == ScalarType::F64 {
            self.load_double_lanes(op, mask, swizzle)?
        } else {
            let mut value = OperandValue::default();
            for c in mask.comps() {
                let lane = swizzle.lane(c);
                let v = self.load_lane(op, lane, ty)?;
                value.set(c, v);
            }
            value
        };

        // Modifiers apply in fixed order: abs, then neg.
        if op.modifier.has_abs() || op.modifier.has_neg() {
            // Integer operands with float modifiers have already been forced
            // up to a float type by the caller.
            value = self.apply_operand_modifier(op.modifier, mask, ty, value);
        }
        Ok(value)
    }

    /// 64-bit loads assemble each double from two 32-bit halves. Doubles
    /// occupy lane pairs: a mask of `.xy` addresses the first double, `.zw`
    /// the second; results land in lanes 0 and 2.
    fn load_double_lanes(
        &mut self,
        op: &Operand,
        mask: CompMask,
        swizzle: Swizzle,
    ) -> Result<OperandValue> {
        let mut value = OperandValue::default();
        for c in [0u8, 2u8] {
            if !mask.contains(c) && !mask.contains(c + 1) {
                continue;
            }
            if op.kind == OperandKind::Imm64 {
                let bits = op.imm64[(c / 2) as usize];
                let v = self
                    .module
                    .const_value(aero_dxil::Constant::F64(bits));
                value.set(c, v);
                continue;
            }
            let lo_lane = swizzle.lane(c);
            let hi_lane = swizzle.lane(c + 1);
            let lo = self.load_lane(op, lo_lane, ScalarType::I32)?;
            let hi = self.load_lane(op, hi_lane, ScalarType::I32)?;
            let v = self.dxop(
                DxOp::MakeDouble,
                Type::F64,
                vec![lo, hi],
                Type::F64,
            );
            value.set(c, v);
        }
        Ok(value)
    }

    /// Loads a single source lane of an operand as a 32-bit-or-smaller type.
    fn load_lane(&mut self, op: &Operand, lane: u8, ty: ScalarType) -> Result<Value> {
        debug_assert_ne!(ty, ScalarType::F64);
        match op.kind {
            OperandKind::Imm32 => {
                let bits = op.imm[lane as usize];
                let v = match ty {
                    ScalarType::F32 => self.module.const_value(aero_dxil::Constant::F32(bits)),
                    ScalarType::F16 => self
                        .module
                        .const_value(aero_dxil::Constant::F16(bits as u16)),
                    ScalarType::I1 => self.const_bool(bits != 0),
                    ScalarType::I16 => self
                        .module
                        .const_value(aero_dxil::Constant::I16(bits as u16)),
                    _ => self.const_i32(bits),
                };
                Ok(v)
            }
            OperandKind::Imm64 => {
                let bits = op.imm64[(lane / 2) as usize];
                let half = if lane % 2 == 0 { bits as u32 } else { (bits >> 32) as u32 };
                Ok(match ty {
                    ScalarType::F32 => self.module.const_value(aero_dxil::Constant::F32(half)),
                    _ => self.const_i32(half),
                })
            }

            OperandKind::Temp => {
                let reg = self.static_index(op, 0)?;
                let index = self.const_i32(reg * 4 + lane as u32);
                let v = self.dxop_scalar(DxOp::TempRegLoad, loadable(ty), vec![index]);
                self.cast_value(v, loadable(ty), ty)
            }
            OperandKind::IndexableTemp => {
                let id = self.static_index(op, 0)?;
                let reg = self.indexable_reg(id)?;
                let row = self.load_index(&op.indices[1].clone())?;
                let comps = self.const_i32(reg.num_comps);
                let scaled = self.builder().mul(row, comps);
                let lane_v = self.const_i32(lane as u32);
                let offset = self.builder().add(scaled, lane_v);
                let zero = self.const_i32(0);
                let ptr = self.builder().gep(reg.storage, vec![zero, offset]);
                let raw = self.builder().load(ptr);
                self.cast_value(raw, ScalarType::I32, ty)
            }

            OperandKind::Input | OperandKind::InputControlPoint => {
                self.load_io_lane(op, lane, ty, IoIntrinsic::LoadInput)
            }
            OperandKind::OutputControlPoint => {
                self.load_io_lane(op, lane, ty, IoIntrinsic::LoadOutputControlPoint)
            }
            OperandKind::InputPatchConstant => {
                self.load_io_lane(op, lane, ty, IoIntrinsic::LoadPatchConstant)
            }
            // Hull-shader fork/join phases read declared outputs back through
            // the patch-constant path.
            OperandKind::Output if self.in_patch_constant_phase => {
                self.load_io_lane(op, lane, ty, IoIntrinsic::LoadPatchConstant)
            }

            OperandKind::ConstantBuffer => self.load_cb_lane(op, lane, ty),
            OperandKind::ImmediateConstantBuffer => {
                let icb = self.icb_global.ok_or_else(|| {
                    ConvertError::MalformedBytecode(
                        "icb operand without immediate constant buffer declaration".into(),
                    )
                })?;
                let row = self.load_index(&op.indices[0].clone())?;
                let four = self.const_i32(4);
                let scaled = self.builder().mul(row, four);
                let lane_v = self.const_i32(lane as u32);
                let offset = self.builder().add(scaled, lane_v);
                let zero = self.const_i32(0);
                let ptr = self.builder().gep(Value::Global(icb), vec![zero, offset]);
                let raw = self.builder().load(ptr);
                self.cast_value(raw, ScalarType::F32, ty)
            }

            OperandKind::Sampler => {
                let handle = self.handle_for_operand(op, ResourceClass::Sampler)?;
                Ok(handle)
            }
            OperandKind::Resource => {
                let handle = self.handle_for_operand(op, ResourceClass::Srv)?;
                Ok(handle)
            }
            OperandKind::UnorderedAccessView => {
                let handle = self.handle_for_operand(op, ResourceClass::Uav)?;
                Ok(handle)
            }

            OperandKind::InputThreadId => {
                let comp = self.const_i32(lane as u32);
                let v = self.dxop_scalar(DxOp::ThreadId, ScalarType::I32, vec![comp]);
                self.cast_value(v, ScalarType::I32, ty)
            }
            OperandKind::InputThreadGroupId => {
                let comp = self.const_i32(lane as u32);
                let v = self.dxop_scalar(DxOp::GroupId, ScalarType::I32, vec![comp]);
                self.cast_value(v, ScalarType::I32, ty)
            }
            OperandKind::InputThreadIdInGroup => {
                let comp = self.const_i32(lane as u32);
                let v = self.dxop_scalar(DxOp::ThreadIdInGroup, ScalarType::I32, vec![comp]);
                self.cast_value(v, ScalarType::I32, ty)
            }
            OperandKind::InputThreadIdInGroupFlattened => {
                let v =
                    self.dxop_scalar(DxOp::FlattenedThreadIdInGroup, ScalarType::I32, vec![]);
                self.cast_value(v, ScalarType::I32, ty)
            }
            OperandKind::InputPrimitiveId => {
                let v = self.dxop_scalar(DxOp::PrimitiveID, ScalarType::I32, vec![]);
                self.cast_value(v, ScalarType::I32, ty)
            }
            OperandKind::InputGsInstanceId => {
                let v = self.dxop_scalar(DxOp::GSInstanceID, ScalarType::I32, vec![]);
                self.cast_value(v, ScalarType::I32, ty)
            }
            OperandKind::OutputControlPointId => {
                let v = self.dxop_scalar(DxOp::OutputControlPointID, ScalarType::I32, vec![]);
                self.cast_value(v, ScalarType::I32, ty)
            }
            OperandKind::InputForkInstanceId | OperandKind::InputJoinInstanceId => {
                let v = self.hull_instance_id()?;
                self.cast_value(v, ScalarType::I32, ty)
            }
            OperandKind::InputCoverageMask => {
                let v = self.dxop_scalar(DxOp::Coverage, ScalarType::I32, vec![]);
                self.cast_value(v, ScalarType::I32, ty)
            }
            OperandKind::InnerCoverage => {
                let v = self.dxop_scalar(DxOp::InnerCoverage, ScalarType::I32, vec![]);
                self.cast_value(v, ScalarType::I32, ty)
            }
            OperandKind::InputDomainPoint => {
                let comp = self.const_i32(lane as u32);
                let v = self.dxop_scalar(DxOp::DomainLocation, ScalarType::F32, vec![comp]);
                self.cast_value(v, ScalarType::F32, ty)
            }
            OperandKind::CycleCounter => {
                let v = self.dxop_scalar(DxOp::CycleCounterLegacy, ScalarType::I32, vec![]);
                self.cast_value(v, ScalarType::I32, ty)
            }
            OperandKind::ThisPointer => self.load_this_pointer_lane(op, lane, ty),

            other => Err(ConvertError::MalformedBytecode(format!(
                "operand kind {other:?} cannot be loaded"
            ))),
        }
    }

    /// Shared path for signature-backed IO loads.
    fn load_io_lane(
        &mut self,
        op: &Operand,
        lane: u8,
        ty: ScalarType,
        intrinsic: IoIntrinsic,
    ) -> Result<Value> {
        // 2D-indexed forms put the unit (vertex / control point) first and
        // the register second.
        let (unit, reg_index) = match op.index_dim() {
            2 => (Some(op.indices[0].clone()), op.indices[1].clone()),
            _ => (
                None,
                op.indices.first().cloned().unwrap_or(OperandIndex::Imm32(0)),
            ),
        };
        let (base_reg, dynamic_row) = split_index(&reg_index);
        let dynamic_row = match dynamic_row {
            Some(rel) => Some(self.load_index(&rel)?),
            None => None,
        };

        let sig = match intrinsic {
            IoIntrinsic::LoadInput => &self.input_sig,
            IoIntrinsic::LoadOutputControlPoint => &self.output_sig,
            IoIntrinsic::LoadPatchConstant => &self.patch_sig,
            IoIntrinsic::StoreOutput | IoIntrinsic::StorePatchConstant => {
                unreachable!("load_io_lane is only called with Load* intrinsics")
            }
        };
        let (elem, row_in_elem, col_in_elem, elem_ty) = sig
            .get(base_reg, lane as u32, 0)
            .map(|(e, r, c)| (e.id, r, c, e.comp_type))
            .ok_or_else(|| {
                ConvertError::MalformedBytecode(format!(
                    "read of unallocated signature register v{base_reg}.{lane}"
                ))
            })?;

        let elem_id = self.const_i32(elem);
        let row = match dynamic_row {
            Some(dynamic) => {
                let base = self.const_i32(row_in_elem);
                self.builder().add(base, dynamic)
            }
            None => self.const_i32(row_in_elem),
        };
        let col = self.const_i8(col_in_elem as i8);

        let loaded = match intrinsic {
            IoIntrinsic::LoadInput => {
                let vertex = match unit {
                    Some(index) => self.load_index(&index)?,
                    None => self.undef_i32(),
                };
                self.dxop_scalar(
                    DxOp::LoadInput,
                    loadable(elem_ty),
                    vec![elem_id, row, col, vertex],
                )
            }
            IoIntrinsic::LoadOutputControlPoint => {
                let point = match unit {
                    Some(index) => self.load_index(&index)?,
                    None => self.undef_i32(),
                };
                self.dxop_scalar(
                    DxOp::LoadOutputControlPoint,
                    loadable(elem_ty),
                    vec![elem_id, row, col, point],
                )
            }
            IoIntrinsic::LoadPatchConstant => self.dxop_scalar(
                DxOp::LoadPatchConstant,
                loadable(elem_ty),
                vec![elem_id, row, col],
            ),
            IoIntrinsic::StoreOutput | IoIntrinsic::StorePatchConstant => {
                unreachable!("load_io_lane is only called with Load* intrinsics")
            }
        };
        self.cast_value(loaded, loadable(elem_ty), ty)
    }

    fn load_cb_lane(&mut self, op: &Operand, lane: u8, ty: ScalarType) -> Result<Value> {
        // Legacy operands: cb<slot>[row]; SM5.1 operands:
        // cb<range>[binding][row].
        let range_id = self.static_index(op, 0)?;
        let (binding_index, row_index) = if op.index_dim() == 3 {
            let binding = self.load_index(&op.indices[1].clone())?;
            (Some(binding), op.indices[2].clone())
        } else {
            (None, op.indices[1].clone())
        };
        let handle = self.create_handle(
            ResourceClass::CBuffer,
            range_id,
            binding_index,
            op.non_uniform,
        )?;
        let row = self.load_index(&row_index)?;
        let load_ty = loadable(ty);
        let ret = self.dxop(
            DxOp::CBufferLoadLegacy,
            Type::Scalar(load_ty),
            vec![handle, row],
            Type::CBufRet(load_ty),
        );
        let v = self.builder().extract_value(ret, lane as u32);
        self.cast_value(v, load_ty, ty)
    }

    /// Creates (or fetches) the handle for a resource-class operand.
    pub(crate) fn handle_for_operand(
        &mut self,
        op: &Operand,
        class: ResourceClass,
    ) -> Result<Value> {
        let range_id = self.static_index(op, 0)?;
        let index = if op.index_dim() >= 2 {
            Some(self.load_index(&op.indices[1].clone())?)
        } else {
            None
        };
        self.create_handle(class, range_id, index, op.non_uniform)
    }

    fn apply_operand_modifier(
        &mut self,
        modifier: OperandModifier,
        mask: CompMask,
        ty: ScalarType,
        value: OperandValue,
    ) -> OperandValue {
        let mut out = value;
        if modifier.has_abs() {
            out = out.map(mask, |_, v| {
                self.dxop_scalar(DxOp::FAbs, ty, vec![v])
            });
        }
        if modifier.has_neg() {
            out = out.map(mask, |_, v| self.negate(v, ty));
        }
        out
    }

    pub(crate) fn negate(&mut self, value: Value, ty: ScalarType) -> Value {
        if ty.is_float() {
            let zero = match ty {
                ScalarType::F64 => self
                    .module
                    .const_value(aero_dxil::Constant::F64((-0.0f64).to_bits())),
                _ => self.const_f32(-0.0),
            };
            self.builder().binary(BinOp::FSub, zero, value)
        } else {
            let zero = self.const_i32(0);
            self.builder().binary(BinOp::Sub, zero, value)
        }
    }

    // Stores ----------------------------------------------------------------

    /// Applies the instruction's result modifiers (saturate) to a destination
    /// value before it is stored.
    pub(crate) fn apply_instruction_modifiers(
        &mut self,
        inst: &Instruction,
        mask: CompMask,
        ty: ScalarType,
        value: OperandValue,
    ) -> OperandValue {
        if !inst.saturate {
            return value;
        }
        value.map(mask, |_, v| self.dxop_scalar(DxOp::Saturate, ty, vec![v]))
    }

    /// Stores `value` into instruction operand `idx` under `mask`.
    pub(crate) fn store_operand(
        &mut self,
        inst: &Instruction,
        idx: usize,
        mask: CompMask,
        ty: ScalarType,
        value: OperandValue,
    ) -> Result<()> {
        let op = inst.operands.get(idx).cloned().ok_or_else(|| {
            ConvertError::MalformedBytecode(format!(
                "{} is missing destination operand {idx}",
                inst.opcode.name()
            ))
        })?;
        let precise = inst.precise_mask;
        self.store_operand_op(&op, mask, ty, value, precise)
    }

    fn store_operand_op(
        &mut self,
        op: &Operand,
        mask: CompMask,
        ty: ScalarType,
        value: OperandValue,
        _precise: CompMask,
    ) -> Result<()> {
        if ty == ScalarType::F64 {
            return self.store_double_lanes(op, mask, value);
        }
        match op.kind {
            OperandKind::Null => Ok(()),
            OperandKind::Temp => {
                let reg = self.static_index(op, 0)?;
                for c in mask.comps() {
                    let v = value.get(c);
                    let store_ty = loadable(ty);
                    let v = self.cast_value(v, ty, store_ty)?;
                    let index = self.const_i32(reg * 4 + c as u32);
                    self.dxop_void(
                        DxOp::TempRegStore,
                        Type::Scalar(store_ty),
                        vec![index, v],
                    );
                }
                Ok(())
            }
            OperandKind::IndexableTemp => {
                let id = self.static_index(op, 0)?;
                let reg = self.indexable_reg(id)?;
                let row = self.load_index(&op.indices[1].clone())?;
                for c in mask.comps() {
                    let v = value.get(c);
                    let v = self.cast_value(v, ty, ScalarType::I32)?;
                    let comps = self.const_i32(reg.num_comps);
                    let scaled = self.builder().mul(row, comps);
                    let lane_v = self.const_i32(c as u32);
                    let offset = self.builder().add(scaled, lane_v);
                    let zero = self.const_i32(0);
                    let ptr = self.builder().gep(reg.storage, vec![zero, offset]);
                    self.builder().store(ptr, v);
                }
                Ok(())
            }
            OperandKind::Output => {
                if self.stage == ShaderStage::Geometry && self.analysis.multi_stream() {
                    // Multi-stream GS buffers output writes in shadow temp
                    // registers; they are flushed at emit/cut points.
                    let reg = self.static_index(op, 0)?;
                    let shadow = self.gs_shadow_base + reg;
                    for c in mask.comps() {
                        let v = value.get(c);
                        let store_ty = loadable(ty);
                        let v = self.cast_value(v, ty, store_ty)?;
                        let index = self.const_i32(shadow * 4 + c as u32);
                        self.dxop_void(
                            DxOp::TempRegStore,
                            Type::Scalar(store_ty),
                            vec![index, v],
                        );
                    }
                    return Ok(());
                }
                let intrinsic = if self.in_patch_constant_phase {
                    IoIntrinsic::StorePatchConstant
                } else {
                    IoIntrinsic::StoreOutput
                };
                self.store_io(op, mask, ty, &value, intrinsic)
            }
            OperandKind::OutputDepth
            | OperandKind::OutputDepthGreaterEqual
            | OperandKind::OutputDepthLessEqual
            | OperandKind::OutputStencilRef
            | OperandKind::OutputCoverageMask => {
                // Register-less outputs route by operand kind, regardless of
                // the written mask.
                let (elem_id, elem_ty) = self
                    .output_sig
                    .get_sgv(op.kind)
                    .map(|e| (e.id, e.comp_type))
                    .ok_or_else(|| {
                        ConvertError::MalformedBytecode(format!(
                            "write to {:?} with no signature element",
                            op.kind
                        ))
                    })?;
                let lane = mask.first().unwrap_or(0);
                let v = value.get(lane);
                let v = self.cast_value(v, ty, elem_ty)?;
                let elem = self.const_i32(elem_id);
                let row = self.const_i32(0);
                let col = self.const_i8(0);
                self.dxop_void(
                    DxOp::StoreOutput,
                    Type::Scalar(elem_ty),
                    vec![elem, row, col, v],
                );
                Ok(())
            }
            other => Err(ConvertError::MalformedBytecode(format!(
                "operand kind {other:?} cannot be stored"
            ))),
        }
    }

    fn store_io(
        &mut self,
        op: &Operand,
        mask: CompMask,
        ty: ScalarType,
        value: &OperandValue,
        intrinsic: IoIntrinsic,
    ) -> Result<()> {
        let reg_index = op
            .indices
            .first()
            .cloned()
            .unwrap_or(OperandIndex::Imm32(0));
        let (base_reg, dynamic_row) = split_index(&reg_index);
        let dynamic_row = match dynamic_row {
            Some(rel) => Some(self.load_index(&rel)?),
            None => None,
        };
        let stream = if self.stage == ShaderStage::Geometry {
            self.current_stream
        } else {
            0
        };

        // Resolve every lane against the signature first; emission below
        // needs the conversion mutably.
        let mut lanes = Vec::with_capacity(mask.count() as usize);
        {
            let sig = match intrinsic {
                IoIntrinsic::StorePatchConstant => &self.patch_sig,
                _ => &self.output_sig,
            };
            for c in mask.comps() {
                let resolved = sig
                    .get(base_reg, c as u32, stream)
                    .map(|(e, r, col)| (c, e.id, r, col, e.comp_type))
                    .ok_or_else(|| {
                        ConvertError::MalformedBytecode(format!(
                            "write to unallocated signature register o{base_reg}.{c}"
                        ))
                    })?;
                lanes.push(resolved);
            }
        }

        for (c, elem, row_in_elem, col_in_elem, elem_ty) in lanes {
            let v = value.get(c);
            let v = self.cast_value(v, ty, elem_ty)?;
            let elem_id = self.const_i32(elem);
            let row = match dynamic_row {
                Some(dynamic) => {
                    let base = self.const_i32(row_in_elem);
                    self.builder().add(base, dynamic)
                }
                None => self.const_i32(row_in_elem),
            };
            let col = self.const_i8(col_in_elem as i8);
            let dxop = match intrinsic {
                IoIntrinsic::StorePatchConstant => DxOp::StorePatchConstant,
                _ => DxOp::StoreOutput,
            };
            self.dxop_void(dxop, Type::Scalar(elem_ty), vec![elem_id, row, col, v]);
        }
        Ok(())
    }

    /// 64-bit stores split each double into 32-bit halves and store the
    /// halves into the lane pair.
    fn store_double_lanes(
        &mut self,
        op: &Operand,
        mask: CompMask,
        value: OperandValue,
    ) -> Result<()> {
        let mut halves = OperandValue::default();
        let mut half_mask = CompMask::NONE;
        for c in [0u8, 2u8] {
            if !mask.contains(c) && !mask.contains(c + 1) {
                continue;
            }
            let v = value.get(c);
            let split = self.dxop(
                DxOp::SplitDouble,
                Type::F64,
                vec![v],
                Type::SplitDouble,
            );
            let lo = self.builder().extract_value(split, 0);
            let hi = self.builder().extract_value(split, 1);
            halves.set(c, lo);
            halves.set(c + 1, hi);
            half_mask = half_mask.union(CompMask::for_comp(c)).union(CompMask::for_comp(c + 1));
        }
        self.store_operand_op(op, half_mask, ScalarType::I32, halves, CompMask::NONE)
    }

    // Implicit casts --------------------------------------------------------

    /// Bit-level implicit cast between the operand model's types.
    ///
    /// A combination outside the table (i8 paths, 64-bit/small mixes) cannot
    /// come from well-formed SM4/SM5 input; hitting one means the lowering
    /// itself produced a wrongly-typed value, so the conversion aborts
    /// instead of emitting wrong output.
    pub(crate) fn cast_value(
        &mut self,
        value: Value,
        from: ScalarType,
        to: ScalarType,
    ) -> Result<Value> {
        use ScalarType::*;
        if from == to {
            return Ok(value);
        }
        Ok(match (from, to) {
            // Bool widens by sign-extension (DXBC booleans are 0/~0) and
            // narrows by comparison against zero.
            (I1, I32) | (I1, I16) => self.builder().cast(CastOp::SExt, value, Type::Scalar(to)),
            (I32, I1) | (I16, I1) => {
                let zero = self.const_i32(0);
                let zero = self.cast_value(zero, I32, from)?;
                self.builder().icmp(CmpPred::Ne, value, zero)
            }
            (I1, F32) => {
                let wide = self.builder().cast(CastOp::SExt, value, Type::I32);
                self.cast_value(wide, I32, F32)?
            }
            (F32, I1) => {
                let bits = self.cast_value(value, F32, I32)?;
                self.cast_value(bits, I32, I1)?
            }

            // 32-bit int <-> float is a bit-pattern move through the
            // dedicated bitcast ops, never a value conversion.
            (I32, F32) => self.dxop(
                DxOp::BitcastI32toF32,
                Type::Void,
                vec![value],
                Type::F32,
            ),
            (F32, I32) => self.dxop(
                DxOp::BitcastF32toI32,
                Type::Void,
                vec![value],
                Type::I32,
            ),
            (I16, F16) => self.dxop(
                DxOp::BitcastI16toF16,
                Type::Void,
                vec![value],
                Type::F16,
            ),
            (F16, I16) => self.dxop(
                DxOp::BitcastF16toI16,
                Type::Void,
                vec![value],
                Type::I16,
            ),
            (I64, F64) => self.dxop(
                DxOp::BitcastI64toF64,
                Type::Void,
                vec![value],
                Type::F64,
            ),
            (F64, I64) => self.dxop(
                DxOp::BitcastF64toI64,
                Type::Void,
                vec![value],
                Type::I64,
            ),

            // Integer resizes.
            (I16, I32) => self.builder().cast(CastOp::SExt, value, Type::I32),
            (I32, I16) => self.builder().cast(CastOp::Trunc, value, Type::I16),
            (I32, I64) => self.builder().cast(CastOp::ZExt, value, Type::I64),
            (I64, I32) => self.builder().cast(CastOp::Trunc, value, Type::I32),

            // Float resizes.
            (F16, F32) | (F32, F64) | (F16, F64) => {
                self.builder().cast(CastOp::FPExt, value, Type::Scalar(to))
            }
            (F32, F16) | (F64, F32) | (F64, F16) => {
                self.builder().cast(CastOp::FPTrunc, value, Type::Scalar(to))
            }

            // Mixed-width int/float pairs go through the same-width integer.
            (I16, F32) => {
                let wide = self.cast_value(value, I16, I32)?;
                self.cast_value(wide, I32, F32)?
            }
            (F32, I16) => {
                let bits = self.cast_value(value, F32, I32)?;
                self.cast_value(bits, I32, I16)?
            }
            (I32, F16) => {
                let narrowed = self.cast_value(value, I32, I16)?;
                self.cast_value(narrowed, I16, F16)?
            }
            (F16, I32) => {
                let bits = self.cast_value(value, F16, I16)?;
                self.cast_value(bits, I16, I32)?
            }

            _ => {
                return Err(ConvertError::VerificationFailed(format!(
                    "no implicit cast from {from:?} to {to:?}"
                )))
            }
        })
    }

    /// Marks per-lane results precise according to the instruction's precise
    /// mask.
    pub(crate) fn mark_precise_lanes(
        &mut self,
        inst: &Instruction,
        mask: CompMask,
        value: &OperandValue,
    ) {
        if inst.precise_mask.is_empty() {
            return;
        }
        for c in mask.comps() {
            if inst.precise_mask.contains(c) {
                if let Some(v) = value.try_get(c) {
                    self.builder().mark_precise(v);
                }
            }
        }
    }
}

/// Which IO intrinsic a signature-backed access uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IoIntrinsic {
    LoadInput,
    LoadOutputControlPoint,
    LoadPatchConstant,
    StoreOutput,
    StorePatchConstant,
}

/// Splits an operand index into (static base, dynamic part).
fn split_index(index: &OperandIndex) -> (u32, Option<OperandIndex>) {
    match index {
        OperandIndex::Imm32(v) => (*v, None),
        OperandIndex::Imm64(v) => (*v as u32, None),
        OperandIndex::Relative(op) => (0, Some(OperandIndex::Relative(op.clone()))),
        OperandIndex::Imm32PlusRelative(base, op) => {
            (*base, Some(OperandIndex::Relative(op.clone())))
        }
    }
}

/// Narrows a requested type to one the load intrinsics are overloaded on
/// (bools load as i32).
fn loadable(ty: ScalarType) -> ScalarType {
    match ty {
        ScalarType::I1 => ScalarType::I32,
        ScalarType::F64 => ScalarType::F32,
        other => other,
    }
}
