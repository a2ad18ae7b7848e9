//! Single-pass analysis over the decoded instruction stream.
//!
//! The pass never emits IR. It collects every declaration into per-concern
//! tables — resources, temps, TGSM, streams, tessellation parameters,
//! interfaces, labels — tracks hull-shader phase transitions, and records the
//! input/output registers the program actually touches so the signature model
//! can derive interpolation modes and validate coverage.

use std::collections::{BTreeMap, BTreeSet};

use aero_dxbc::comp::CompMask;
use aero_dxbc::sm4::decode::{Instruction, OperandKind, ResourceDim};
use aero_dxbc::sm4::opcode::{
    CUSTOMDATA_CLASS_IMMEDIATE_CONSTANT_BUFFER, INTERFACE_DYNAMIC_INDEXED_BIT,
    UAV_GLOBALLY_COHERENT_BIT, UAV_HAS_COUNTER_BIT, UAV_RASTERIZER_ORDERED_BIT,
};
use aero_dxbc::sm4::{Opcode, ShaderModel, ShaderStage};
use aero_dxil::{ResourceClass, ResourceKind, SamplerKind, ScalarType, UavFlags};
use tracing::debug;

use crate::error::{ConvertError, Result};

/// Declared indexable temp array (`x#`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexableTempDecl {
    pub count: u32,
    pub comps: u32,
}

/// One resource declaration, in stream order across all classes.
#[derive(Debug, Clone)]
pub struct ResourceDecl {
    pub class: ResourceClass,
    pub kind: ResourceKind,
    /// SM5.1+: explicit range id; earlier models: the register number.
    pub range_id: u32,
    pub lower_bound: u32,
    /// `u32::MAX` for unbounded ranges.
    pub range_size: u32,
    pub space: u32,
    pub elem_type: Option<ScalarType>,
    /// Structured stride or cbuffer byte size.
    pub stride: u32,
    pub sampler_kind: Option<SamplerKind>,
    pub uav_flags: UavFlags,
    pub sample_count: u32,
    /// Typed-resource return type token (4 × 4 bits), when declared.
    pub return_type_token: Option<u32>,
}

/// Declared thread-group shared memory block (`g#`).
#[derive(Debug, Clone, Copy)]
pub struct TgsmDecl {
    pub id: u32,
    pub stride: u32,
    pub count: u32,
    /// Raw blocks address bytes; structured blocks address (stride × count).
    pub structured: bool,
}

/// A declared input/output register with its interpolation and system-value
/// annotations; feeds the signature model's used-element records.
#[derive(Debug, Clone)]
pub struct IoDecl {
    pub operand_kind: OperandKind,
    /// Register number; `None` for register-less operands (`oDepth`, ...).
    pub register: Option<u32>,
    /// Second dimension for 2D-indexed IO (control points, GS vertices).
    pub unit_count: Option<u32>,
    pub mask: CompMask,
    pub system_value: Option<u32>,
    pub interpolation: u32,
    pub stream: u32,
    pub in_patch_constant_phase: bool,
}

/// An explicitly declared register index range.
#[derive(Debug, Clone, Copy)]
pub struct IndexRangeDecl {
    pub operand_kind: OperandKind,
    pub start_register: u32,
    pub start_component: u8,
    pub count: u32,
    pub stream: u32,
    pub in_patch_constant_phase: bool,
}

/// Hull-shader phase kinds in appearance order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HullPhaseKind {
    ControlPoint,
    Fork,
    Join,
}

#[derive(Debug, Clone)]
pub struct HullPhase {
    pub kind: HullPhaseKind,
    pub instance_count: u32,
    /// Index into the instruction stream of the phase marker.
    pub start: usize,
}

/// Everything the analysis walk learned about the program.
#[derive(Debug, Default)]
pub struct Analysis {
    pub global_flags: u32,
    pub num_temps: u32,
    pub indexable_temps: BTreeMap<u32, IndexableTempDecl>,
    pub pc_indexable_temps: BTreeMap<u32, IndexableTempDecl>,
    pub resources: Vec<ResourceDecl>,
    pub tgsm: Vec<TgsmDecl>,
    pub icb: Option<Vec<u32>>,
    pub inputs: Vec<IoDecl>,
    pub outputs: Vec<IoDecl>,
    pub index_ranges: Vec<IndexRangeDecl>,
    /// Streams with at least one `dcl_stream`.
    pub streams: BTreeSet<u32>,
    pub gs_input_primitive: u32,
    pub gs_output_topology: BTreeMap<u32, u32>,
    pub gs_instance_count: u32,
    pub max_output_vertex_count: u32,
    pub thread_group: [u32; 3],
    pub input_control_points: u32,
    pub output_control_points: u32,
    pub tess_domain: u32,
    pub tess_partitioning: u32,
    pub tess_output_primitive: u32,
    pub max_tess_factor: f32,
    pub hull_phases: Vec<HullPhase>,
    pub label_count: u32,
    pub function_body_count: u32,
    pub function_tables: BTreeMap<u32, Vec<u32>>,
    pub interfaces: BTreeMap<u32, InterfaceDecl>,
    pub has_input_coverage: bool,
    pub has_inner_input_coverage: bool,
    /// Which depth output variant the program writes, when any.
    pub depth_operand: Option<OperandKind>,
    pub has_stencil_ref_out: bool,
    pub has_coverage_out: bool,
    /// Any input declared with sample-frequency interpolation.
    pub sample_frequency: bool,
    /// Output position written (PSV field for VS/DS/GS).
    pub writes_position: bool,
}

#[derive(Debug, Clone)]
pub struct InterfaceDecl {
    pub tables: Vec<u32>,
    pub array_length: u32,
    pub dynamically_indexed: bool,
}

impl Analysis {
    pub fn stream_count(&self) -> u32 {
        self.streams.len().max(1) as u32
    }

    pub fn multi_stream(&self) -> bool {
        self.streams.len() > 1
    }
}

/// Interpolation mode values carried by `dcl_input_ps*` control fields.
pub mod interp {
    pub const UNDEFINED: u32 = 0;
    pub const CONSTANT: u32 = 1;
    pub const LINEAR: u32 = 2;
    pub const LINEAR_CENTROID: u32 = 3;
    pub const LINEAR_NOPERSPECTIVE: u32 = 4;
    pub const LINEAR_NOPERSPECTIVE_CENTROID: u32 = 5;
    pub const LINEAR_SAMPLE: u32 = 6;
    pub const LINEAR_NOPERSPECTIVE_SAMPLE: u32 = 7;
}

fn typed_elem_type(return_type_token: u32) -> Option<ScalarType> {
    // 4-bit return type per component; component 0 decides the scalar type.
    // unorm/snorm/float read back as float, sint/uint as i32.
    match return_type_token & 0xf {
        3 | 4 => Some(ScalarType::I32),
        7 => Some(ScalarType::F64),
        _ => Some(ScalarType::F32),
    }
}

fn resource_kind_from_dim(dim: ResourceDim, sample_count: u32) -> Option<ResourceKind> {
    Some(match dim {
        ResourceDim::Buffer => ResourceKind::TypedBuffer,
        ResourceDim::RawBuffer => ResourceKind::RawBuffer,
        ResourceDim::StructuredBuffer => ResourceKind::StructuredBuffer,
        ResourceDim::Texture1D => ResourceKind::Texture1D,
        ResourceDim::Texture1DArray => ResourceKind::Texture1DArray,
        ResourceDim::Texture2D => ResourceKind::Texture2D,
        ResourceDim::Texture2DArray => ResourceKind::Texture2DArray,
        ResourceDim::Texture2DMS => {
            let _ = sample_count;
            ResourceKind::Texture2DMS
        }
        ResourceDim::Texture2DMSArray => ResourceKind::Texture2DMSArray,
        ResourceDim::Texture3D => ResourceKind::Texture3D,
        ResourceDim::TextureCube => ResourceKind::TextureCube,
        ResourceDim::TextureCubeArray => ResourceKind::TextureCubeArray,
        ResourceDim::Unknown => return None,
    })
}

/// Reads the (range_id, lower_bound, range_size, space) of a resource
/// declaration operand under both binding models.
///
/// SM ≤ 5.0 operands carry a single register index; SM 5.1 operands carry
/// (range id, lower bound, upper bound) plus a trailing space DWORD that the
/// decoder leaves in `extra`.
fn resource_binding(
    inst: &Instruction,
    model: ShaderModel,
    space_extra_index: usize,
) -> Result<(u32, u32, u32, u32)> {
    let op = inst.operands.first().ok_or_else(|| {
        ConvertError::MalformedBytecode(format!(
            "{} declaration has no operand",
            inst.opcode.name()
        ))
    })?;
    let imm = |i: usize| -> Result<u32> {
        op.indices
            .get(i)
            .and_then(|idx| idx.as_imm())
            .ok_or_else(|| {
                ConvertError::MalformedBytecode(format!(
                    "{} declaration operand index {i} is not immediate",
                    inst.opcode.name()
                ))
            })
    };
    if model.is_51_plus() && op.index_dim() == 3 {
        let range_id = imm(0)?;
        let lower = imm(1)?;
        let upper = imm(2)?;
        let size = if upper == u32::MAX {
            u32::MAX
        } else {
            upper - lower + 1
        };
        let space = inst.extra.get(space_extra_index).copied().unwrap_or(0);
        Ok((range_id, lower, size, space))
    } else {
        let reg = imm(0)?;
        Ok((reg, reg, 1, 0))
    }
}

/// Runs the analysis pass.
pub fn analyze(
    stage: ShaderStage,
    model: ShaderModel,
    instructions: &[Instruction],
) -> Result<Analysis> {
    let mut a = Analysis {
        max_tess_factor: 64.0,
        ..Analysis::default()
    };

    let mut current_stream = 0u32;
    let mut in_patch_constant_phase = false;

    for (index, inst) in instructions.iter().enumerate() {
        match inst.opcode {
            Opcode::CustomData => {
                if let Some(custom) = &inst.custom {
                    if custom.class == CUSTOMDATA_CLASS_IMMEDIATE_CONSTANT_BUFFER {
                        a.icb = Some(custom.payload.clone());
                    }
                }
            }

            Opcode::DclGlobalFlags => {
                a.global_flags = inst.global_flags();
            }
            Opcode::DclTemps => {
                let count = inst.extra.first().copied().unwrap_or(0);
                a.num_temps = a.num_temps.max(count);
            }
            Opcode::DclIndexableTemp => {
                let id = inst.extra.first().copied().unwrap_or(0);
                let count = inst.extra.get(1).copied().unwrap_or(0);
                let comps = inst.extra.get(2).copied().unwrap_or(4);
                let table = if in_patch_constant_phase {
                    &mut a.pc_indexable_temps
                } else {
                    &mut a.indexable_temps
                };
                // Re-declarations across fork/join phases take the maximum of
                // the numeric fields.
                table
                    .entry(id)
                    .and_modify(|d| {
                        d.count = d.count.max(count);
                        d.comps = d.comps.max(comps);
                    })
                    .or_insert(IndexableTempDecl { count, comps });
            }

            Opcode::DclResource => {
                let (range_id, lower, size, space) = resource_binding(inst, model, 1)?;
                let dim = inst.resource_dim_control();
                let kind = resource_kind_from_dim(dim, inst.resource_sample_count())
                    .ok_or_else(|| {
                        ConvertError::MalformedBytecode(
                            "dcl_resource with unknown dimension".into(),
                        )
                    })?;
                let ret = inst.extra.first().copied();
                a.resources.push(ResourceDecl {
                    class: ResourceClass::Srv,
                    kind,
                    range_id,
                    lower_bound: lower,
                    range_size: size,
                    space,
                    elem_type: ret.and_then(typed_elem_type),
                    stride: 0,
                    sampler_kind: None,
                    uav_flags: UavFlags::empty(),
                    sample_count: inst.resource_sample_count(),
                    return_type_token: ret,
                });
            }
            Opcode::DclResourceRaw => {
                let (range_id, lower, size, space) = resource_binding(inst, model, 0)?;
                a.resources.push(ResourceDecl {
                    class: ResourceClass::Srv,
                    kind: ResourceKind::RawBuffer,
                    range_id,
                    lower_bound: lower,
                    range_size: size,
                    space,
                    elem_type: None,
                    stride: 0,
                    sampler_kind: None,
                    uav_flags: UavFlags::empty(),
                    sample_count: 0,
                    return_type_token: None,
                });
            }
            Opcode::DclResourceStructured => {
                let (range_id, lower, size, space) = resource_binding(inst, model, 1)?;
                let stride = inst.extra.first().copied().unwrap_or(0);
                a.resources.push(ResourceDecl {
                    class: ResourceClass::Srv,
                    kind: ResourceKind::StructuredBuffer,
                    range_id,
                    lower_bound: lower,
                    range_size: size,
                    space,
                    elem_type: None,
                    stride,
                    sampler_kind: None,
                    uav_flags: UavFlags::empty(),
                    sample_count: 0,
                    return_type_token: None,
                });
            }
            Opcode::DclUavTyped | Opcode::DclUavRaw | Opcode::DclUavStructured => {
                let stride_extra = matches!(inst.opcode, Opcode::DclUavStructured) as usize;
                let ret_extra = matches!(inst.opcode, Opcode::DclUavTyped) as usize;
                let (range_id, lower, size, space) =
                    resource_binding(inst, model, stride_extra + ret_extra)?;
                let mut flags = UavFlags::empty();
                if inst.token0 & UAV_GLOBALLY_COHERENT_BIT != 0 {
                    flags |= UavFlags::GLOBALLY_COHERENT;
                }
                if inst.token0 & UAV_RASTERIZER_ORDERED_BIT != 0 {
                    flags |= UavFlags::RASTERIZER_ORDERED;
                }
                if inst.token0 & UAV_HAS_COUNTER_BIT != 0 {
                    flags |= UavFlags::HAS_COUNTER;
                }
                let (kind, elem_type, stride, ret) = match inst.opcode {
                    Opcode::DclUavTyped => {
                        let dim = inst.resource_dim_control();
                        let kind = resource_kind_from_dim(dim, 0).ok_or_else(|| {
                            ConvertError::MalformedBytecode(
                                "dcl_uav_typed with unknown dimension".into(),
                            )
                        })?;
                        let ret = inst.extra.first().copied();
                        (kind, ret.and_then(typed_elem_type), 0, ret)
                    }
                    Opcode::DclUavRaw => (ResourceKind::RawBuffer, None, 0, None),
                    _ => (
                        ResourceKind::StructuredBuffer,
                        None,
                        inst.extra.first().copied().unwrap_or(0),
                        None,
                    ),
                };
                a.resources.push(ResourceDecl {
                    class: ResourceClass::Uav,
                    kind,
                    range_id,
                    lower_bound: lower,
                    range_size: size,
                    space,
                    elem_type,
                    stride,
                    sampler_kind: None,
                    uav_flags: flags,
                    sample_count: 0,
                    return_type_token: ret,
                });
            }
            Opcode::DclConstantBuffer => {
                // Legacy operands are 2D [slot, reg_count]; SM5.1 operands are
                // 3D [range id, lower, upper] with size + space in the
                // payload.
                let op = inst.operands.first().ok_or_else(|| {
                    ConvertError::MalformedBytecode("dcl_constantbuffer without operand".into())
                })?;
                let (range_id, lower, size, space, reg_count) =
                    if model.is_51_plus() && op.index_dim() == 3 {
                        let (rid, lb, sz, space) = resource_binding(inst, model, 1)?;
                        let reg_count = inst.extra.first().copied().unwrap_or(0);
                        (rid, lb, sz, space, reg_count)
                    } else {
                        let slot = op.indices[0].as_imm().unwrap_or(0);
                        let reg_count = op
                            .indices
                            .get(1)
                            .and_then(|i| i.as_imm())
                            .unwrap_or(0);
                        (slot, slot, 1, 0, reg_count)
                    };
                a.resources.push(ResourceDecl {
                    class: ResourceClass::CBuffer,
                    kind: ResourceKind::CBuffer,
                    range_id,
                    lower_bound: lower,
                    range_size: size,
                    space,
                    elem_type: None,
                    stride: reg_count * 16,
                    sampler_kind: None,
                    uav_flags: UavFlags::empty(),
                    sample_count: 0,
                    return_type_token: None,
                });
            }
            Opcode::DclSampler => {
                let (range_id, lower, size, space) = resource_binding(inst, model, 0)?;
                let kind = if inst.sampler_mode() == 1 {
                    SamplerKind::Comparison
                } else {
                    SamplerKind::Default
                };
                a.resources.push(ResourceDecl {
                    class: ResourceClass::Sampler,
                    kind: ResourceKind::Sampler,
                    range_id,
                    lower_bound: lower,
                    range_size: size,
                    space,
                    elem_type: None,
                    stride: 0,
                    sampler_kind: Some(kind),
                    uav_flags: UavFlags::empty(),
                    sample_count: 0,
                    return_type_token: None,
                });
            }

            Opcode::DclTgsmRaw => {
                let id = inst
                    .operands
                    .first()
                    .and_then(|o| o.reg_imm())
                    .unwrap_or(0);
                let bytes = inst.extra.first().copied().unwrap_or(0);
                a.tgsm.push(TgsmDecl {
                    id,
                    stride: 4,
                    count: bytes / 4,
                    structured: false,
                });
            }
            Opcode::DclTgsmStructured => {
                let id = inst
                    .operands
                    .first()
                    .and_then(|o| o.reg_imm())
                    .unwrap_or(0);
                let stride = inst.extra.first().copied().unwrap_or(0);
                let count = inst.extra.get(1).copied().unwrap_or(0);
                a.tgsm.push(TgsmDecl {
                    id,
                    stride,
                    count,
                    structured: true,
                });
            }

            Opcode::DclInput
            | Opcode::DclInputSgv
            | Opcode::DclInputSiv
            | Opcode::DclInputPs
            | Opcode::DclInputPsSgv
            | Opcode::DclInputPsSiv => {
                let Some(op) = inst.operands.first() else {
                    continue;
                };
                let system_value = inst.extra.first().copied();
                let interpolation = match inst.opcode {
                    Opcode::DclInputPs | Opcode::DclInputPsSgv | Opcode::DclInputPsSiv => {
                        inst.interpolation_mode()
                    }
                    _ => interp::UNDEFINED,
                };
                if matches!(
                    interpolation,
                    interp::LINEAR_SAMPLE | interp::LINEAR_NOPERSPECTIVE_SAMPLE
                ) {
                    a.sample_frequency = true;
                }
                match op.kind {
                    OperandKind::InputCoverageMask => a.has_input_coverage = true,
                    OperandKind::InnerCoverage => a.has_inner_input_coverage = true,
                    _ => {}
                }
                // 2D-indexed IO (GS vertex inputs, HS/DS control points) puts
                // the unit count first and the register second.
                let (register, unit_count) = match op.index_dim() {
                    2 => (
                        op.indices.get(1).and_then(|i| i.as_imm()),
                        op.indices.first().and_then(|i| i.as_imm()),
                    ),
                    _ => (op.reg_imm(), None),
                };
                a.inputs.push(IoDecl {
                    operand_kind: op.kind,
                    register,
                    unit_count,
                    mask: op.write_mask(),
                    system_value,
                    interpolation,
                    stream: 0,
                    in_patch_constant_phase,
                });
            }
            Opcode::DclOutput | Opcode::DclOutputSgv | Opcode::DclOutputSiv => {
                let Some(op) = inst.operands.first() else {
                    continue;
                };
                let system_value = inst.extra.first().copied();
                match op.kind {
                    OperandKind::OutputDepth
                    | OperandKind::OutputDepthGreaterEqual
                    | OperandKind::OutputDepthLessEqual => {
                        a.depth_operand = Some(op.kind);
                    }
                    OperandKind::OutputStencilRef => a.has_stencil_ref_out = true,
                    OperandKind::OutputCoverageMask => a.has_coverage_out = true,
                    _ => {}
                }
                // SV_Position: SIV value 1.
                if system_value == Some(1) {
                    a.writes_position = true;
                }
                a.outputs.push(IoDecl {
                    operand_kind: op.kind,
                    register: op.reg_imm(),
                    unit_count: None,
                    mask: op.write_mask(),
                    system_value,
                    interpolation: interp::UNDEFINED,
                    stream: current_stream,
                    in_patch_constant_phase,
                });
            }
            Opcode::DclIndexRange => {
                let Some(op) = inst.operands.first() else {
                    continue;
                };
                let count = inst.extra.first().copied().unwrap_or(0);
                let (register, component) = match op.index_dim() {
                    2 => (
                        op.indices.get(1).and_then(|i| i.as_imm()).unwrap_or(0),
                        0u8,
                    ),
                    _ => (op.reg_imm().unwrap_or(0), 0u8),
                };
                let component = op.write_mask().first().unwrap_or(component);
                a.index_ranges.push(IndexRangeDecl {
                    operand_kind: op.kind,
                    start_register: register,
                    start_component: component,
                    count,
                    stream: current_stream,
                    in_patch_constant_phase,
                });
            }

            Opcode::DclStream => {
                let stream = inst
                    .operands
                    .first()
                    .and_then(|o| o.reg_imm())
                    .unwrap_or(0);
                a.streams.insert(stream);
                current_stream = stream;
            }
            Opcode::DclGsInputPrimitive => {
                a.gs_input_primitive =
                    (inst.token0 >> aero_dxbc::sm4::opcode::GS_PRIMITIVE_SHIFT)
                        & aero_dxbc::sm4::opcode::GS_PRIMITIVE_MASK;
            }
            Opcode::DclGsOutputPrimitiveTopology => {
                let topology = (inst.token0 >> aero_dxbc::sm4::opcode::GS_PRIMITIVE_SHIFT)
                    & aero_dxbc::sm4::opcode::GS_PRIMITIVE_MASK;
                a.gs_output_topology.insert(current_stream, topology);
            }
            Opcode::DclMaxOutputVertexCount => {
                a.max_output_vertex_count = inst.extra.first().copied().unwrap_or(0);
            }
            Opcode::DclGsInstanceCount => {
                a.gs_instance_count = inst.extra.first().copied().unwrap_or(1);
            }

            Opcode::DclThreadGroup => {
                a.thread_group = [
                    inst.extra.first().copied().unwrap_or(1),
                    inst.extra.get(1).copied().unwrap_or(1),
                    inst.extra.get(2).copied().unwrap_or(1),
                ];
            }

            Opcode::DclInputControlPointCount => {
                a.input_control_points = (inst.token0
                    >> aero_dxbc::sm4::opcode::CONTROL_POINT_COUNT_SHIFT)
                    & aero_dxbc::sm4::opcode::CONTROL_POINT_COUNT_MASK;
            }
            Opcode::DclOutputControlPointCount => {
                a.output_control_points = (inst.token0
                    >> aero_dxbc::sm4::opcode::CONTROL_POINT_COUNT_SHIFT)
                    & aero_dxbc::sm4::opcode::CONTROL_POINT_COUNT_MASK;
            }
            Opcode::DclTessDomain => {
                a.tess_domain = (inst.token0 >> aero_dxbc::sm4::opcode::TESS_DOMAIN_SHIFT)
                    & aero_dxbc::sm4::opcode::TESS_DOMAIN_MASK;
            }
            Opcode::DclTessPartitioning => {
                a.tess_partitioning =
                    (inst.token0 >> aero_dxbc::sm4::opcode::TESS_PARTITIONING_SHIFT)
                        & aero_dxbc::sm4::opcode::TESS_PARTITIONING_MASK;
            }
            Opcode::DclTessOutputPrimitive => {
                a.tess_output_primitive =
                    (inst.token0 >> aero_dxbc::sm4::opcode::TESS_OUTPUT_PRIMITIVE_SHIFT)
                        & aero_dxbc::sm4::opcode::TESS_OUTPUT_PRIMITIVE_MASK;
            }
            Opcode::DclHsMaxTessFactor => {
                a.max_tess_factor =
                    f32::from_bits(inst.extra.first().copied().unwrap_or(0x42800000));
            }
            Opcode::DclHsForkPhaseInstanceCount => {
                if let Some(phase) = a.hull_phases.last_mut() {
                    phase.instance_count = inst.extra.first().copied().unwrap_or(1);
                }
            }
            Opcode::DclHsJoinPhaseInstanceCount => {
                if let Some(phase) = a.hull_phases.last_mut() {
                    phase.instance_count = inst.extra.first().copied().unwrap_or(1);
                }
            }

            Opcode::HsControlPointPhase => {
                in_patch_constant_phase = false;
                a.hull_phases.push(HullPhase {
                    kind: HullPhaseKind::ControlPoint,
                    instance_count: 1,
                    start: index,
                });
            }
            Opcode::HsForkPhase => {
                in_patch_constant_phase = true;
                a.hull_phases.push(HullPhase {
                    kind: HullPhaseKind::Fork,
                    instance_count: 1,
                    start: index,
                });
            }
            Opcode::HsJoinPhase => {
                in_patch_constant_phase = true;
                a.hull_phases.push(HullPhase {
                    kind: HullPhaseKind::Join,
                    instance_count: 1,
                    start: index,
                });
            }
            Opcode::HsDecls => {}

            Opcode::Label => {
                a.label_count += 1;
            }
            Opcode::DclFunctionBody => {
                a.function_body_count += 1;
            }
            Opcode::DclFunctionTable => {
                let table_id = inst.extra.first().copied().unwrap_or(0);
                let count = inst.extra.get(1).copied().unwrap_or(0) as usize;
                let bodies = inst
                    .extra
                    .get(2..2 + count)
                    .map(|s| s.to_vec())
                    .unwrap_or_default();
                a.function_tables.insert(table_id, bodies);
            }
            Opcode::DclInterface => {
                let iface_id = inst.extra.first().copied().unwrap_or(0);
                let lengths = inst.extra.get(1).copied().unwrap_or(0);
                let array_length = lengths & 0xffff;
                let table_count = (lengths >> 16) as usize;
                let tables = inst
                    .extra
                    .get(2..2 + table_count)
                    .map(|s| s.to_vec())
                    .unwrap_or_default();
                a.interfaces.insert(
                    iface_id,
                    InterfaceDecl {
                        tables,
                        array_length,
                        dynamically_indexed: inst.token0 & INTERFACE_DYNAMIC_INDEXED_BIT != 0,
                    },
                );
            }

            // Instruction-side facts the signature model needs.
            Opcode::EmitStream | Opcode::CutStream | Opcode::EmitThenCutStream => {}
            _ => {
                // Non-declaration instruction: record register-less output
                // writes so PS special outputs route even without decls.
                for op in &inst.operands {
                    match op.kind {
                        OperandKind::OutputDepth
                        | OperandKind::OutputDepthGreaterEqual
                        | OperandKind::OutputDepthLessEqual => {
                            a.depth_operand.get_or_insert(op.kind);
                        }
                        OperandKind::OutputStencilRef => a.has_stencil_ref_out = true,
                        OperandKind::OutputCoverageMask => a.has_coverage_out = true,
                        OperandKind::InputCoverageMask => a.has_input_coverage = true,
                        OperandKind::InnerCoverage => a.has_inner_input_coverage = true,
                        _ => {}
                    }
                }
            }
        }
    }

    debug!(
        stage = ?stage,
        temps = a.num_temps,
        resources = a.resources.len(),
        phases = a.hull_phases.len(),
        "analysis complete"
    );
    Ok(a)
}
