//! Resource access lowering: sampling, typed/raw/structured loads and
//! stores, atomics, gathers, queries, counters, and barriers. Thread-group
//! shared memory takes the pointer path into its byte-array global; every
//! other access goes through a resource handle and the corresponding dx op.

use aero_dxbc::comp::CompMask;
use aero_dxbc::sm4::decode::{Instruction, Operand, OperandKind};
use aero_dxbc::sm4::opcode::{
    SYNC_TGSM_MEMORY, SYNC_THREADS_IN_GROUP, SYNC_UAV_MEMORY_GLOBAL, SYNC_UAV_MEMORY_GROUP,
};
use aero_dxbc::sm4::Opcode;
use aero_dxil::dxop::{barrier_mode, AtomicBinOpCode};
use aero_dxil::{
    AtomicOp, BinOp, CastOp, DxOp, ResourceClass, ResourceKind, ScalarType, Type, UavFlags,
    Value,
};

use crate::conv::Conversion;
use crate::error::{ConvertError, Result};
use crate::operands::OperandValue;

/// Resolved facts about a resource operand.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ResInfo {
    pub kind: ResourceKind,
    pub elem_type: ScalarType,
    pub stride: u32,
}

impl Conversion {
    pub(crate) fn resource_info(
        &self,
        op: &Operand,
        class: ResourceClass,
    ) -> Result<ResInfo> {
        let range_id = self.static_index(op, 0)?;
        let binding = self.resource_by_id(class, range_id)?;
        Ok(ResInfo {
            kind: binding.kind,
            elem_type: binding.elem_type.unwrap_or(ScalarType::F32),
            stride: binding.stride,
        })
    }

    fn srv_or_uav_class(op: &Operand) -> Result<ResourceClass> {
        match op.kind {
            OperandKind::Resource => Ok(ResourceClass::Srv),
            OperandKind::UnorderedAccessView => Ok(ResourceClass::Uav),
            other => Err(ConvertError::MalformedBytecode(format!(
                "expected resource operand, found {other:?}"
            ))),
        }
    }

    /// Loads coordinate lanes from an operand, padding to `slots` with undef.
    fn coord_args(
        &mut self,
        inst: &Instruction,
        idx: usize,
        used: u32,
        slots: u32,
        ty: ScalarType,
    ) -> Result<Vec<Value>> {
        let mask = CompMask::first_n(used.min(4) as u8);
        let coords = self.load_operand(inst, idx, mask, ty)?;
        let mut out = Vec::with_capacity(slots as usize);
        for c in 0..slots {
            if (c as u8) < mask.count() {
                out.push(coords.get(c as u8));
            } else {
                out.push(self.undef(Type::Scalar(ty)));
            }
        }
        Ok(out)
    }

    /// Four store-value slots: masked lanes carry the loaded value, the rest
    /// are undef.
    fn store_lanes(
        &mut self,
        value: &OperandValue,
        mask: CompMask,
        ty: ScalarType,
    ) -> Vec<Value> {
        (0..4u8)
            .map(|c| {
                if mask.contains(c) {
                    value.get(c)
                } else {
                    self.undef(Type::Scalar(ty))
                }
            })
            .collect()
    }

    /// Embedded `aoffimmi` texel offsets as i32 constants, padded with undef.
    fn offset_args(&mut self, inst: &Instruction, used: u32) -> Vec<Value> {
        let mut out = Vec::with_capacity(3);
        for i in 0..3 {
            if (i as u32) < used {
                out.push(self.const_i32(inst.sample_offsets[i] as i32 as u32));
            } else {
                out.push(self.undef_i32());
            }
        }
        out
    }

    /// Stores a `ResRet` aggregate into the destination (and the status field
    /// into a feedback destination).
    fn store_resret(
        &mut self,
        inst: &Instruction,
        dst_idx: usize,
        status_idx: Option<usize>,
        ret: Value,
        res_swizzle: aero_dxbc::comp::Swizzle,
        elem_ty: ScalarType,
    ) -> Result<()> {
        let mask = self.dst_mask(inst, dst_idx);
        let mut out = OperandValue::default();
        for c in mask.comps() {
            let lane = res_swizzle.lane(c).min(3);
            let v = self.builder().extract_value(ret, lane as u32);
            out.set(c, v);
        }
        self.store_operand(inst, dst_idx, mask, elem_ty, out)?;

        if let Some(status_idx) = status_idx {
            let status_mask = self.dst_mask(inst, status_idx);
            if !status_mask.is_empty() && !inst.operands[status_idx].is_null() {
                let status = self.builder().extract_value(ret, 4);
                let mut sv = OperandValue::default();
                for c in status_mask.comps() {
                    sv.set(c, status);
                }
                self.store_operand(inst, status_idx, status_mask, ScalarType::I32, sv)?;
            }
        }
        Ok(())
    }

    // Sampling --------------------------------------------------------------

    pub(crate) fn convert_sample(&mut self, inst: &Instruction, feedback: bool) -> Result<()> {
        let shift = feedback as usize;
        let coord_idx = 1 + shift;
        let res_idx = 2 + shift;
        let samp_idx = 3 + shift;
        let extra_idx = 4 + shift;

        let res_op = inst.operands[res_idx].clone();
        let info = self.resource_info(&res_op, ResourceClass::Srv)?;
        let srv = self.handle_for_operand(&res_op, ResourceClass::Srv)?;
        let samp_op = inst.operands[samp_idx].clone();
        let sampler = self.handle_for_operand(&samp_op, ResourceClass::Sampler)?;

        let coords = self.coord_args(inst, coord_idx, info.kind.coord_count(), 4, ScalarType::F32)?;
        let offsets = self.offset_args(inst, info.kind.offset_count());

        let scalar =
            |conv: &mut Conversion, idx: usize| -> Result<Value> {
                let v = conv.load_operand(inst, idx, CompMask::X, ScalarType::F32)?;
                Ok(v.get(0))
            };

        let mut args = vec![srv, sampler];
        args.extend(coords);
        args.extend(offsets);

        let grad_lanes = info.kind.coord_count().min(3);
        let (op, ret_elem) = match inst.opcode {
            Opcode::Sample => {
                args.push(self.undef_f32());
                (DxOp::Sample, info.elem_type)
            }
            Opcode::SampleB => {
                let bias = scalar(self, extra_idx)?;
                args.push(bias);
                args.push(self.undef_f32());
                (DxOp::SampleBias, info.elem_type)
            }
            Opcode::SampleL | Opcode::SampleLFeedback => {
                let lod = scalar(self, extra_idx)?;
                args.push(lod);
                (DxOp::SampleLevel, info.elem_type)
            }
            Opcode::SampleD | Opcode::SampleDClampFeedback => {
                let ddx = self.coord_args(inst, extra_idx, grad_lanes, 3, ScalarType::F32)?;
                let ddy =
                    self.coord_args(inst, extra_idx + 1, grad_lanes, 3, ScalarType::F32)?;
                args.extend(ddx);
                args.extend(ddy);
                let clamp = if inst.opcode == Opcode::SampleDClampFeedback {
                    scalar(self, extra_idx + 2)?
                } else {
                    self.undef_f32()
                };
                args.push(clamp);
                (DxOp::SampleGrad, info.elem_type)
            }
            Opcode::SampleC | Opcode::SampleCClampFeedback => {
                let reference = scalar(self, extra_idx)?;
                args.push(reference);
                let clamp = if inst.opcode == Opcode::SampleCClampFeedback {
                    scalar(self, extra_idx + 1)?
                } else {
                    self.undef_f32()
                };
                args.push(clamp);
                (DxOp::SampleCmp, ScalarType::F32)
            }
            Opcode::SampleCLz | Opcode::SampleCLzFeedback => {
                let reference = scalar(self, extra_idx)?;
                args.push(reference);
                (DxOp::SampleCmpLevelZero, ScalarType::F32)
            }
            Opcode::SampleClampFeedback => {
                let clamp = scalar(self, extra_idx)?;
                args.push(clamp);
                (DxOp::Sample, info.elem_type)
            }
            Opcode::SampleBClampFeedback => {
                let bias = scalar(self, extra_idx)?;
                let clamp = scalar(self, extra_idx + 1)?;
                args.push(bias);
                args.push(clamp);
                (DxOp::SampleBias, info.elem_type)
            }
            other => {
                return Err(ConvertError::MalformedBytecode(format!(
                    "unexpected sample opcode {}",
                    other.name()
                )))
            }
        };

        let ret = self.dxop(
            op,
            Type::Scalar(ret_elem),
            args,
            Type::ResRet(ret_elem),
        );
        let status_idx = feedback.then_some(1);
        self.store_resret(inst, 0, status_idx, ret, res_op.swizzle(), ret_elem)
    }

    // Loads and stores ------------------------------------------------------

    pub(crate) fn convert_ld(&mut self, inst: &Instruction, feedback: bool) -> Result<()> {
        let shift = feedback as usize;
        let addr_idx = 1 + shift;
        let res_idx = 2 + shift;

        let res_op = inst.operands[res_idx].clone();
        let info = self.resource_info(&res_op, ResourceClass::Srv)?;
        let handle = self.handle_for_operand(&res_op, ResourceClass::Srv)?;

        let ret = if matches!(info.kind, ResourceKind::TypedBuffer) {
            let index = {
                let v = self.load_operand(inst, addr_idx, CompMask::X, ScalarType::I32)?;
                v.get(0)
            };
            let undef = self.undef_i32();
            self.dxop(
                DxOp::BufferLoad,
                Type::Scalar(info.elem_type),
                vec![handle, index, undef],
                Type::ResRet(info.elem_type),
            )
        } else {
            // The mip level rides in the coordinate's w lane; ld_ms replaces
            // it with the explicit sample index operand.
            let is_ms = matches!(
                inst.opcode,
                Opcode::LdMs | Opcode::LdMsFeedback
            );
            let mip = if is_ms {
                let v =
                    self.load_operand(inst, 3 + shift, CompMask::X, ScalarType::I32)?;
                v.get(0)
            } else {
                let v = self.load_operand(
                    inst,
                    addr_idx,
                    CompMask::W,
                    ScalarType::I32,
                )?;
                v.get(3)
            };
            let coords =
                self.coord_args(inst, addr_idx, info.kind.coord_count(), 3, ScalarType::I32)?;
            let offsets = self.offset_args(inst, info.kind.offset_count());
            let mut args = vec![handle, mip];
            args.extend(coords);
            args.extend(offsets);
            self.dxop(
                DxOp::TextureLoad,
                Type::Scalar(info.elem_type),
                args,
                Type::ResRet(info.elem_type),
            )
        };

        let status_idx = feedback.then_some(1);
        self.store_resret(inst, 0, status_idx, ret, res_op.swizzle(), info.elem_type)
    }

    pub(crate) fn convert_ld_uav_typed(
        &mut self,
        inst: &Instruction,
        feedback: bool,
    ) -> Result<()> {
        let shift = feedback as usize;
        let addr_idx = 1 + shift;
        let uav_idx = 2 + shift;

        let uav_op = inst.operands[uav_idx].clone();
        let info = self.resource_info(&uav_op, ResourceClass::Uav)?;
        let handle = self.handle_for_operand(&uav_op, ResourceClass::Uav)?;

        let ret = if matches!(info.kind, ResourceKind::TypedBuffer) {
            let index = {
                let v = self.load_operand(inst, addr_idx, CompMask::X, ScalarType::I32)?;
                v.get(0)
            };
            let undef = self.undef_i32();
            self.dxop(
                DxOp::BufferLoad,
                Type::Scalar(info.elem_type),
                vec![handle, index, undef],
                Type::ResRet(info.elem_type),
            )
        } else {
            let coords =
                self.coord_args(inst, addr_idx, info.kind.coord_count(), 3, ScalarType::I32)?;
            let mip = self.undef_i32();
            let mut args = vec![handle, mip];
            args.extend(coords);
            for _ in 0..3 {
                let u = self.undef_i32();
                args.push(u);
            }
            self.dxop(
                DxOp::TextureLoad,
                Type::Scalar(info.elem_type),
                args,
                Type::ResRet(info.elem_type),
            )
        };

        let status_idx = feedback.then_some(1);
        self.store_resret(inst, 0, status_idx, ret, uav_op.swizzle(), info.elem_type)
    }

    pub(crate) fn convert_store_uav_typed(&mut self, inst: &Instruction) -> Result<()> {
        let uav_op = inst.operands[0].clone();
        let info = self.resource_info(&uav_op, ResourceClass::Uav)?;
        let handle = self.handle_for_operand(&uav_op, ResourceClass::Uav)?;
        let mask = uav_op.write_mask();

        let value = self.load_operand(inst, 2, mask, info.elem_type)?;
        let values = self.store_lanes(&value, mask, info.elem_type);
        let mask_byte = self.const_i8(mask.0 as i8);

        if matches!(info.kind, ResourceKind::TypedBuffer) {
            let index = {
                let v = self.load_operand(inst, 1, CompMask::X, ScalarType::I32)?;
                v.get(0)
            };
            let undef = self.undef_i32();
            let mut args = vec![handle, index, undef];
            args.extend(values);
            args.push(mask_byte);
            self.dxop_void(DxOp::BufferStore, Type::Scalar(info.elem_type), args);
        } else {
            let coords =
                self.coord_args(inst, 1, info.kind.coord_count(), 3, ScalarType::I32)?;
            let mut args = vec![handle];
            args.extend(coords);
            args.extend(values);
            args.push(mask_byte);
            self.dxop_void(DxOp::TextureStore, Type::Scalar(info.elem_type), args);
        }
        Ok(())
    }

    pub(crate) fn convert_ld_raw(&mut self, inst: &Instruction, feedback: bool) -> Result<()> {
        let shift = feedback as usize;
        let offset_idx = 1 + shift;
        let src_idx = 2 + shift;
        let src_op = inst.operands[src_idx].clone();

        let offset = {
            let v = self.load_operand(inst, offset_idx, CompMask::X, ScalarType::I32)?;
            v.get(0)
        };

        if src_op.kind == OperandKind::ThreadGroupSharedMemory {
            return self.tgsm_load(inst, 0, &src_op, offset, None);
        }

        let class = Self::srv_or_uav_class(&src_op)?;
        let handle = self.handle_for_operand(&src_op, class)?;
        let undef = self.undef_i32();
        let ret = self.dxop(
            DxOp::BufferLoad,
            Type::I32,
            vec![handle, offset, undef],
            Type::ResRet(ScalarType::I32),
        );
        let status_idx = feedback.then_some(1);
        self.store_resret(inst, 0, status_idx, ret, src_op.swizzle(), ScalarType::I32)
    }

    pub(crate) fn convert_store_raw(&mut self, inst: &Instruction) -> Result<()> {
        let dst_op = inst.operands[0].clone();
        let offset = {
            let v = self.load_operand(inst, 1, CompMask::X, ScalarType::I32)?;
            v.get(0)
        };
        let mask = dst_op.write_mask();

        if dst_op.kind == OperandKind::ThreadGroupSharedMemory {
            let value = self.load_operand(inst, 2, mask, ScalarType::I32)?;
            return self.tgsm_store(&dst_op, mask, offset, None, value);
        }

        let handle = self.handle_for_operand(&dst_op, ResourceClass::Uav)?;
        let value = self.load_operand(inst, 2, mask, ScalarType::I32)?;
        let values = self.store_lanes(&value, mask, ScalarType::I32);
        let mask_byte = self.const_i8(mask.0 as i8);
        let undef = self.undef_i32();
        let mut args = vec![handle, offset, undef];
        args.extend(values);
        args.push(mask_byte);
        self.dxop_void(DxOp::BufferStore, Type::I32, args);
        Ok(())
    }

    pub(crate) fn convert_ld_structured(
        &mut self,
        inst: &Instruction,
        feedback: bool,
    ) -> Result<()> {
        let shift = feedback as usize;
        let index_idx = 1 + shift;
        let offset_idx = 2 + shift;
        let src_idx = 3 + shift;
        let src_op = inst.operands[src_idx].clone();

        let index = {
            let v = self.load_operand(inst, index_idx, CompMask::X, ScalarType::I32)?;
            v.get(0)
        };
        let offset = {
            let v = self.load_operand(inst, offset_idx, CompMask::X, ScalarType::I32)?;
            v.get(0)
        };

        if src_op.kind == OperandKind::ThreadGroupSharedMemory {
            return self.tgsm_load(inst, 0, &src_op, offset, Some(index));
        }

        let class = Self::srv_or_uav_class(&src_op)?;
        let handle = self.handle_for_operand(&src_op, class)?;
        let ret = self.dxop(
            DxOp::BufferLoad,
            Type::I32,
            vec![handle, index, offset],
            Type::ResRet(ScalarType::I32),
        );
        let status_idx = feedback.then_some(1);
        self.store_resret(inst, 0, status_idx, ret, src_op.swizzle(), ScalarType::I32)
    }

    pub(crate) fn convert_store_structured(&mut self, inst: &Instruction) -> Result<()> {
        let dst_op = inst.operands[0].clone();
        let index = {
            let v = self.load_operand(inst, 1, CompMask::X, ScalarType::I32)?;
            v.get(0)
        };
        let offset = {
            let v = self.load_operand(inst, 2, CompMask::X, ScalarType::I32)?;
            v.get(0)
        };
        let mask = dst_op.write_mask();

        if dst_op.kind == OperandKind::ThreadGroupSharedMemory {
            let value = self.load_operand(inst, 3, mask, ScalarType::I32)?;
            return self.tgsm_store(&dst_op, mask, offset, Some(index), value);
        }

        let handle = self.handle_for_operand(&dst_op, ResourceClass::Uav)?;
        let value = self.load_operand(inst, 3, mask, ScalarType::I32)?;
        let values = self.store_lanes(&value, mask, ScalarType::I32);
        let mask_byte = self.const_i8(mask.0 as i8);
        let mut args = vec![handle, index, offset];
        args.extend(values);
        args.push(mask_byte);
        self.dxop_void(DxOp::BufferStore, Type::I32, args);
        Ok(())
    }

    // TGSM pointer paths ----------------------------------------------------

    /// Computes the dword pointer for a TGSM access.
    fn tgsm_dword_ptr(
        &mut self,
        op: &Operand,
        byte_offset: Value,
        elem_index: Option<Value>,
        lane: u8,
    ) -> Result<Value> {
        let id = self.static_index(op, 0)?;
        let global = *self.tgsm_globals.get(&id).ok_or_else(|| {
            ConvertError::MalformedBytecode(format!("reference to undeclared g{id}"))
        })?;
        let decl = self
            .analysis
            .tgsm
            .iter()
            .find(|d| d.id == id)
            .copied()
            .ok_or_else(|| {
                ConvertError::MalformedBytecode(format!("reference to undeclared g{id}"))
            })?;

        // byte offset (+ element * stride), then dword index, then lane.
        let mut offset = byte_offset;
        if let Some(index) = elem_index {
            let stride = self.const_i32(decl.stride);
            let scaled = self.builder().mul(index, stride);
            offset = self.builder().add(scaled, offset);
        }
        let two = self.const_i32(2);
        let dword = self.builder().binary(BinOp::LShr, offset, two);
        let lane_v = self.const_i32(lane as u32);
        let index = self.builder().add(dword, lane_v);
        let zero = self.const_i32(0);
        Ok(self.builder().gep(Value::Global(global), vec![zero, index]))
    }

    fn tgsm_load(
        &mut self,
        inst: &Instruction,
        dst_idx: usize,
        src_op: &Operand,
        byte_offset: Value,
        elem_index: Option<Value>,
    ) -> Result<()> {
        let mask = self.dst_mask(inst, dst_idx);
        let swz = src_op.swizzle();
        let mut out = OperandValue::default();
        for c in mask.comps() {
            let ptr = self.tgsm_dword_ptr(src_op, byte_offset, elem_index, swz.lane(c))?;
            let v = self.builder().load(ptr);
            out.set(c, v);
        }
        self.store_operand(inst, dst_idx, mask, ScalarType::I32, out)
    }

    fn tgsm_store(
        &mut self,
        dst_op: &Operand,
        mask: CompMask,
        byte_offset: Value,
        elem_index: Option<Value>,
        value: OperandValue,
    ) -> Result<()> {
        // Stored lanes are consecutive dwords starting at the offset.
        for (slot, c) in mask.comps().enumerate() {
            let ptr = self.tgsm_dword_ptr(dst_op, byte_offset, elem_index, slot as u8)?;
            self.builder().store(ptr, value.get(c));
        }
        Ok(())
    }

    // Atomics ---------------------------------------------------------------

    pub(crate) fn convert_atomic(&mut self, inst: &Instruction, has_result: bool) -> Result<()> {
        let target_idx = has_result as usize;
        let addr_idx = target_idx + 1;
        let value_idx = addr_idx + 1;
        let target = inst.operands[target_idx].clone();

        let is_cmpxchg = matches!(
            inst.opcode,
            Opcode::AtomicCmpStore | Opcode::ImmAtomicCmpExch
        );

        let previous = if target.kind == OperandKind::ThreadGroupSharedMemory {
            let info = self.tgsm_kind(&target)?;
            let (offset, index) = self.atomic_address(inst, addr_idx, info)?;
            let ptr = self.tgsm_dword_ptr(&target, offset, index, 0)?;
            if is_cmpxchg {
                let cmp = self.scalar_i32(inst, value_idx)?;
                let new = self.scalar_i32(inst, value_idx + 1)?;
                let pair = self.builder().atomic_cmpxchg(ptr, cmp, new);
                self.builder().extract_value(pair, 0)
            } else {
                let value = self.scalar_i32(inst, value_idx)?;
                let op = tgsm_atomic_op(inst.opcode)?;
                self.builder().atomic_rmw(op, ptr, value)
            }
        } else {
            let info = self.resource_info(&target, ResourceClass::Uav)?;
            let handle = self.handle_for_operand(&target, ResourceClass::Uav)?;
            let (c0, c1, c2) = self.atomic_coords(inst, addr_idx, info)?;
            if is_cmpxchg {
                let cmp = self.scalar_i32(inst, value_idx)?;
                let new = self.scalar_i32(inst, value_idx + 1)?;
                self.dxop(
                    DxOp::AtomicCompareExchange,
                    Type::I32,
                    vec![handle, c0, c1, c2, cmp, new],
                    Type::I32,
                )
            } else {
                let value = self.scalar_i32(inst, value_idx)?;
                let code = self.const_i32(uav_atomic_code(inst.opcode)? as u32);
                self.dxop(
                    DxOp::AtomicBinOp,
                    Type::I32,
                    vec![handle, code, c0, c1, c2, value],
                    Type::I32,
                )
            }
        };

        if has_result && !inst.operands[0].is_null() {
            let mask = self.dst_mask(inst, 0);
            let mut out = OperandValue::default();
            for c in mask.comps() {
                out.set(c, previous);
            }
            self.store_operand(inst, 0, mask, ScalarType::I32, out)?;
        }
        Ok(())
    }

    fn tgsm_kind(&self, op: &Operand) -> Result<bool> {
        let id = self.static_index(op, 0)?;
        let decl = self.analysis.tgsm.iter().find(|d| d.id == id).ok_or_else(|| {
            ConvertError::MalformedBytecode(format!("reference to undeclared g{id}"))
        })?;
        Ok(decl.structured)
    }

    /// Destination address of a TGSM atomic: raw blocks take a byte offset,
    /// structured blocks an (element, byte offset) pair.
    fn atomic_address(
        &mut self,
        inst: &Instruction,
        addr_idx: usize,
        structured: bool,
    ) -> Result<(Value, Option<Value>)> {
        if structured {
            let addr = self.load_operand(inst, addr_idx, CompMask::XY, ScalarType::I32)?;
            Ok((addr.get(1), Some(addr.get(0))))
        } else {
            let addr = self.load_operand(inst, addr_idx, CompMask::X, ScalarType::I32)?;
            Ok((addr.get(0), None))
        }
    }

    /// Coordinates of a UAV atomic, shaped by the resource kind.
    fn atomic_coords(
        &mut self,
        inst: &Instruction,
        addr_idx: usize,
        info: ResInfo,
    ) -> Result<(Value, Value, Value)> {
        let used = match info.kind {
            ResourceKind::StructuredBuffer => 2,
            ResourceKind::TypedBuffer | ResourceKind::RawBuffer => 1,
            other => other.coord_count(),
        };
        let coords = self.coord_args(inst, addr_idx, used, 3, ScalarType::I32)?;
        Ok((coords[0], coords[1], coords[2]))
    }

    fn scalar_i32(&mut self, inst: &Instruction, idx: usize) -> Result<Value> {
        let v = self.load_operand(inst, idx, CompMask::X, ScalarType::I32)?;
        Ok(v.get(0))
    }

    /// `imm_atomic_alloc` / `imm_atomic_consume`.
    pub(crate) fn convert_counter(&mut self, inst: &Instruction, delta: i8) -> Result<()> {
        let uav_op = inst.operands[1].clone();
        let handle = self.handle_for_operand(&uav_op, ResourceClass::Uav)?;

        // The counter marks the UAV record.
        let range_id = self.static_index(&uav_op, 0)?;
        if let Some(&index) = self
            .resource_by_range
            .get(&(ResourceClass::Uav, range_id))
        {
            self.module.resources[index].uav_flags |= UavFlags::HAS_COUNTER;
        }

        let delta = self.const_i8(delta);
        let count = self.dxop(
            DxOp::BufferUpdateCounter,
            Type::Void,
            vec![handle, delta],
            Type::I32,
        );
        let mask = self.dst_mask(inst, 0);
        let mut out = OperandValue::default();
        for c in mask.comps() {
            out.set(c, count);
        }
        self.store_operand(inst, 0, mask, ScalarType::I32, out)
    }

    // Gathers ---------------------------------------------------------------

    pub(crate) fn convert_gather(&mut self, inst: &Instruction, feedback: bool) -> Result<()> {
        let shift = feedback as usize;
        let po = matches!(
            inst.opcode,
            Opcode::Gather4Po
                | Opcode::Gather4PoC
                | Opcode::Gather4PoFeedback
                | Opcode::Gather4PoCFeedback
        );
        let cmp = matches!(
            inst.opcode,
            Opcode::Gather4C
                | Opcode::Gather4PoC
                | Opcode::Gather4CFeedback
                | Opcode::Gather4PoCFeedback
        );

        let coord_idx = 1 + shift;
        let offset_idx = po.then_some(2 + shift);
        let res_idx = 2 + shift + po as usize;
        let samp_idx = res_idx + 1;
        let ref_idx = samp_idx + 1;

        let res_op = inst.operands[res_idx].clone();
        let info = self.resource_info(&res_op, ResourceClass::Srv)?;
        let srv = self.handle_for_operand(&res_op, ResourceClass::Srv)?;
        let samp_op = inst.operands[samp_idx].clone();
        let sampler = self.handle_for_operand(&samp_op, ResourceClass::Sampler)?;

        let coords = self.coord_args(inst, coord_idx, info.kind.coord_count(), 4, ScalarType::F32)?;
        // Programmable-offset gathers read their offsets dynamically instead
        // of from the embedded immediate field.
        let offsets = match offset_idx {
            Some(idx) => {
                let loaded = self.load_operand(inst, idx, CompMask::XY, ScalarType::I32)?;
                vec![loaded.get(0), loaded.get(1)]
            }
            None => self.offset_args(inst, 2)[..2].to_vec(),
        };
        // The sampler operand's component select names the gathered channel.
        let channel = self.const_i32(samp_op.swizzle().lane(0) as u32);

        let mut args = vec![srv, sampler];
        args.extend(coords);
        args.extend(offsets);
        args.push(channel);

        let (op, ret_elem) = if cmp {
            let reference = {
                let v = self.load_operand(inst, ref_idx, CompMask::X, ScalarType::F32)?;
                v.get(0)
            };
            args.push(reference);
            (DxOp::TextureGatherCmp, ScalarType::F32)
        } else {
            (DxOp::TextureGather, info.elem_type)
        };

        let ret = self.dxop(op, Type::Scalar(ret_elem), args, Type::ResRet(ret_elem));
        let status_idx = feedback.then_some(1);
        self.store_resret(inst, 0, status_idx, ret, res_op.swizzle(), ret_elem)
    }

    // Queries ---------------------------------------------------------------

    pub(crate) fn convert_resinfo(&mut self, inst: &Instruction) -> Result<()> {
        use aero_dxbc::sm4::decode::ResInfoReturnType;

        let res_op = inst.operands[2].clone();
        let class = Self::srv_or_uav_class(&res_op)?;
        let handle = self.handle_for_operand(&res_op, class)?;
        let mip = self.scalar_i32(inst, 1)?;
        let dims = self.dxop(
            DxOp::GetDimensions,
            Type::Void,
            vec![handle, mip],
            Type::Dimensions,
        );

        let mask = self.dst_mask(inst, 0);
        let swz = res_op.swizzle();
        let ret_kind = inst.resinfo_return;
        let ty = match ret_kind {
            ResInfoReturnType::UInt => ScalarType::I32,
            _ => ScalarType::F32,
        };
        let mut out = OperandValue::default();
        for c in mask.comps() {
            let raw = self.builder().extract_value(dims, swz.lane(c).min(3) as u32);
            let v = match ret_kind {
                ResInfoReturnType::UInt => raw,
                ResInfoReturnType::Float => {
                    self.builder().cast(CastOp::UIToFP, raw, Type::F32)
                }
                ResInfoReturnType::RcpFloat => {
                    let f = self.builder().cast(CastOp::UIToFP, raw, Type::F32);
                    let one = self.const_f32(1.0);
                    self.builder().binary(BinOp::FDiv, one, f)
                }
            };
            out.set(c, v);
        }
        self.store_operand(inst, 0, mask, ty, out)
    }

    pub(crate) fn convert_sample_info(&mut self, inst: &Instruction) -> Result<()> {
        use aero_dxbc::sm4::decode::ResInfoReturnType;

        let src_op = inst.operands[1].clone();
        let count = if src_op.kind == OperandKind::Rasterizer {
            self.dxop(
                DxOp::RenderTargetGetSampleCount,
                Type::Void,
                vec![],
                Type::I32,
            )
        } else {
            let handle = self.handle_for_operand(&src_op, ResourceClass::Srv)?;
            let undef = self.undef_i32();
            let dims = self.dxop(
                DxOp::GetDimensions,
                Type::Void,
                vec![handle, undef],
                Type::Dimensions,
            );
            // Sample count rides in the fourth field.
            self.builder().extract_value(dims, 3)
        };

        let as_uint = inst.resinfo_return == ResInfoReturnType::UInt;
        let ty = if as_uint { ScalarType::I32 } else { ScalarType::F32 };
        let mask = self.dst_mask(inst, 0);
        let swz = src_op.swizzle();
        let zero = if as_uint {
            self.const_i32(0)
        } else {
            self.const_f32(0.0)
        };
        let converted = if as_uint {
            count
        } else {
            self.builder().cast(CastOp::UIToFP, count, Type::F32)
        };
        let mut out = OperandValue::default();
        for c in mask.comps() {
            out.set(c, if swz.lane(c) == 0 { converted } else { zero });
        }
        self.store_operand(inst, 0, mask, ty, out)
    }

    pub(crate) fn convert_sample_pos(&mut self, inst: &Instruction) -> Result<()> {
        let src_op = inst.operands[1].clone();
        let index = self.scalar_i32(inst, 2)?;
        let pos = if src_op.kind == OperandKind::Rasterizer {
            self.dxop(
                DxOp::RenderTargetGetSamplePosition,
                Type::Void,
                vec![index],
                Type::SamplePos,
            )
        } else {
            let handle = self.handle_for_operand(&src_op, ResourceClass::Srv)?;
            self.dxop(
                DxOp::Texture2DMSGetSamplePosition,
                Type::Void,
                vec![handle, index],
                Type::SamplePos,
            )
        };

        let mask = self.dst_mask(inst, 0);
        let swz = src_op.swizzle();
        let zero = self.const_f32(0.0);
        let x = self.builder().extract_value(pos, 0);
        let y = self.builder().extract_value(pos, 1);
        let mut out = OperandValue::default();
        for c in mask.comps() {
            let v = match swz.lane(c) {
                0 => x,
                1 => y,
                _ => zero,
            };
            out.set(c, v);
        }
        self.store_operand(inst, 0, mask, ScalarType::F32, out)
    }

    pub(crate) fn convert_bufinfo(&mut self, inst: &Instruction) -> Result<()> {
        let src_op = inst.operands[1].clone();
        let class = Self::srv_or_uav_class(&src_op)?;
        let handle = self.handle_for_operand(&src_op, class)?;
        let undef = self.undef_i32();
        let dims = self.dxop(
            DxOp::GetDimensions,
            Type::Void,
            vec![handle, undef],
            Type::Dimensions,
        );
        let width = self.builder().extract_value(dims, 0);

        let mask = self.dst_mask(inst, 0);
        let mut out = OperandValue::default();
        for c in mask.comps() {
            out.set(c, width);
        }
        self.store_operand(inst, 0, mask, ScalarType::I32, out)
    }

    pub(crate) fn convert_check_access(&mut self, inst: &Instruction) -> Result<()> {
        let status = self.scalar_i32(inst, 1)?;
        let ok = self.dxop(
            DxOp::CheckAccessFullyMapped,
            Type::I32,
            vec![status],
            Type::I1,
        );
        let wide = self.builder().cast(CastOp::SExt, ok, Type::I32);
        let mask = self.dst_mask(inst, 0);
        let mut out = OperandValue::default();
        for c in mask.comps() {
            out.set(c, wide);
        }
        self.store_operand(inst, 0, mask, ScalarType::I32, out)
    }

    // Barriers --------------------------------------------------------------

    pub(crate) fn convert_sync(&mut self, inst: &Instruction) -> Result<()> {
        let flags = inst.sync_flags();
        let mut mode = 0u32;
        if flags & SYNC_THREADS_IN_GROUP != 0 {
            mode |= barrier_mode::SYNC_THREAD_GROUP;
        }
        if flags & SYNC_UAV_MEMORY_GLOBAL != 0 {
            mode |= barrier_mode::UAV_FENCE_GLOBAL;
        }
        if flags & SYNC_UAV_MEMORY_GROUP != 0 {
            mode |= barrier_mode::UAV_FENCE_THREAD_GROUP;
        }
        if flags & SYNC_TGSM_MEMORY != 0 {
            mode |= barrier_mode::TGSM_FENCE;
        }
        let mode = self.const_i32(mode);
        self.dxop_void(DxOp::Barrier, Type::Void, vec![mode]);
        Ok(())
    }
}

fn uav_atomic_code(opcode: Opcode) -> Result<AtomicBinOpCode> {
    Ok(match opcode {
        Opcode::AtomicIAdd | Opcode::ImmAtomicIAdd => AtomicBinOpCode::Add,
        Opcode::AtomicAnd | Opcode::ImmAtomicAnd => AtomicBinOpCode::And,
        Opcode::AtomicOr | Opcode::ImmAtomicOr => AtomicBinOpCode::Or,
        Opcode::AtomicXor | Opcode::ImmAtomicXor => AtomicBinOpCode::Xor,
        Opcode::AtomicIMax | Opcode::ImmAtomicIMax => AtomicBinOpCode::IMax,
        Opcode::AtomicIMin | Opcode::ImmAtomicIMin => AtomicBinOpCode::IMin,
        Opcode::AtomicUMax | Opcode::ImmAtomicUMax => AtomicBinOpCode::UMax,
        Opcode::AtomicUMin | Opcode::ImmAtomicUMin => AtomicBinOpCode::UMin,
        Opcode::ImmAtomicExch => AtomicBinOpCode::Exchange,
        other => {
            return Err(ConvertError::MalformedBytecode(format!(
                "{} is not a UAV atomic",
                other.name()
            )))
        }
    })
}

fn tgsm_atomic_op(opcode: Opcode) -> Result<AtomicOp> {
    Ok(match opcode {
        Opcode::AtomicIAdd | Opcode::ImmAtomicIAdd => AtomicOp::Add,
        Opcode::AtomicAnd | Opcode::ImmAtomicAnd => AtomicOp::And,
        Opcode::AtomicOr | Opcode::ImmAtomicOr => AtomicOp::Or,
        Opcode::AtomicXor | Opcode::ImmAtomicXor => AtomicOp::Xor,
        Opcode::AtomicIMax | Opcode::ImmAtomicIMax => AtomicOp::SMax,
        Opcode::AtomicIMin | Opcode::ImmAtomicIMin => AtomicOp::SMin,
        Opcode::AtomicUMax | Opcode::ImmAtomicUMax => AtomicOp::UMax,
        Opcode::AtomicUMin | Opcode::ImmAtomicUMin => AtomicOp::UMin,
        Opcode::ImmAtomicExch => AtomicOp::Exchange,
        other => {
            return Err(ConvertError::MalformedBytecode(format!(
                "{} is not a TGSM atomic",
                other.name()
            )))
        }
    })
}
