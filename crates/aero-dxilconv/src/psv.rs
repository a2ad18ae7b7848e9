//! Pipeline-state-validation (`PSV0`) record synthesis.
//!
//! The runtime uses this part to validate a pipeline without parsing the
//! bitcode. Layout: a size-prefixed runtime-info struct (per-stage union plus
//! wave-lane bounds), then a size-prefixed array of resource-binding records
//! in CB, Sampler, SRV, UAV order.

use aero_dxbc::sm4::ShaderStage;
use aero_dxil::{ResourceClass, ResourceKind, UavFlags};
use bytemuck::{Pod, Zeroable};

use crate::analyze::Analysis;
use crate::conv::Conversion;

const RUNTIME_INFO_SIZE: u32 = 24;
const BIND_INFO_SIZE: u32 = 16;

/// Stage-agnostic view of the runtime-info union: 16 bytes of per-stage
/// fields plus the wave-lane bounds.
#[derive(Debug, Clone, Copy, Pod, Zeroable, Default)]
#[repr(C)]
struct PsvRuntimeInfo0 {
    stage0: u32,
    stage1: u32,
    stage2: u32,
    stage3: u32,
    minimum_wave_lane_count: u32,
    maximum_wave_lane_count: u32,
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct PsvResourceBindInfo0 {
    res_type: u32,
    space: u32,
    lower_bound: u32,
    upper_bound: u32,
}

/// PSV resource-type codes.
mod res_type {
    pub const SAMPLER: u32 = 1;
    pub const CBV: u32 = 2;
    pub const SRV_TYPED: u32 = 3;
    pub const SRV_RAW: u32 = 4;
    pub const SRV_STRUCTURED: u32 = 5;
    pub const UAV_TYPED: u32 = 6;
    pub const UAV_RAW: u32 = 7;
    pub const UAV_STRUCTURED: u32 = 8;
    pub const UAV_STRUCTURED_WITH_COUNTER: u32 = 9;
}

fn byte_of(b: bool) -> u32 {
    b as u32
}

impl Conversion {
    /// Builds the `PSV0` part payload from the analysis tables and module
    /// resource records.
    pub(crate) fn build_psv0(&self) -> Vec<u8> {
        let a: &Analysis = &self.analysis;
        let mut info = PsvRuntimeInfo0::default();

        match self.stage {
            ShaderStage::Vertex => {
                info.stage0 = byte_of(a.writes_position);
            }
            ShaderStage::Hull => {
                info.stage0 = a.input_control_points;
                info.stage1 = a.output_control_points;
                info.stage2 = a.tess_domain;
                info.stage3 = a.tess_output_primitive;
            }
            ShaderStage::Domain => {
                info.stage0 = a.input_control_points;
                info.stage1 = byte_of(a.writes_position);
                info.stage2 = a.tess_domain;
            }
            ShaderStage::Geometry => {
                info.stage0 = a.gs_input_primitive;
                // Topology from an active stream; mask defaults to stream 0
                // when none were activated.
                let topology = a
                    .streams
                    .iter()
                    .find_map(|s| a.gs_output_topology.get(s))
                    .or_else(|| a.gs_output_topology.get(&0))
                    .copied()
                    .unwrap_or(0);
                info.stage1 = topology;
                info.stage2 = if a.streams.is_empty() {
                    1
                } else {
                    a.streams.iter().fold(0u32, |m, s| m | (1 << s))
                };
                info.stage3 = byte_of(a.writes_position);
            }
            ShaderStage::Pixel => {
                info.stage0 = byte_of(a.depth_operand.is_some());
                info.stage1 = byte_of(a.sample_frequency);
            }
            ShaderStage::Compute => {}
        }

        let mut out = Vec::with_capacity(64);
        out.extend_from_slice(&RUNTIME_INFO_SIZE.to_le_bytes());
        out.extend_from_slice(bytemuck::bytes_of(&info));

        // Resource records: one per binding, CB / Sampler / SRV / UAV in
        // declaration order.
        let mut records: Vec<PsvResourceBindInfo0> = Vec::new();
        for class in [
            ResourceClass::CBuffer,
            ResourceClass::Sampler,
            ResourceClass::Srv,
            ResourceClass::Uav,
        ] {
            for r in self.module.resources_of(class) {
                let res_type = match (class, r.kind) {
                    (ResourceClass::CBuffer, _) => res_type::CBV,
                    (ResourceClass::Sampler, _) => res_type::SAMPLER,
                    (ResourceClass::Srv, ResourceKind::RawBuffer) => res_type::SRV_RAW,
                    (ResourceClass::Srv, ResourceKind::StructuredBuffer) => {
                        res_type::SRV_STRUCTURED
                    }
                    (ResourceClass::Srv, _) => res_type::SRV_TYPED,
                    (ResourceClass::Uav, ResourceKind::RawBuffer) => res_type::UAV_RAW,
                    (ResourceClass::Uav, ResourceKind::StructuredBuffer) => {
                        if r.uav_flags.contains(UavFlags::HAS_COUNTER) {
                            res_type::UAV_STRUCTURED_WITH_COUNTER
                        } else {
                            res_type::UAV_STRUCTURED
                        }
                    }
                    (ResourceClass::Uav, _) => res_type::UAV_TYPED,
                };
                let upper_bound = if r.range_size == u32::MAX {
                    u32::MAX
                } else {
                    r.lower_bound + r.range_size - 1
                };
                records.push(PsvResourceBindInfo0 {
                    res_type,
                    space: r.space,
                    lower_bound: r.lower_bound,
                    upper_bound,
                });
            }
        }

        out.extend_from_slice(&(records.len() as u32).to_le_bytes());
        if !records.is_empty() {
            out.extend_from_slice(&BIND_INFO_SIZE.to_le_bytes());
            for record in &records {
                out.extend_from_slice(bytemuck::bytes_of(record));
            }
        }
        out
    }
}
