//! The signature model.
//!
//! Normalizes signature element records — from container blobs or DDI
//! vectors — into an allocated element table with bidirectional lookup:
//! `(register, component, stream) → element` for allocated elements, and
//! `operand kind → element` for system values without a register (depth,
//! stencil-ref, coverage).
//!
//! Pixel-shader input interpolation modes come from the analysis pass's
//! used-element records; explicitly declared index ranges are coalesced and
//! collapse their covered records into single multi-row elements.

use std::collections::BTreeMap;

use aero_dxbc::sm4::decode::OperandKind;
use aero_dxbc::sm4::ShaderStage;
use aero_dxbc::SignatureChunk;
use aero_dxil::{InterpolationMode, ScalarType, SignatureElementMeta};
use tracing::trace;

use crate::analyze::{interp, Analysis, IndexRangeDecl, IoDecl};
use crate::error::{ConvertError, Result};

/// Which of the three signatures a map models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigKind {
    Input,
    Output,
    PatchConstant,
}

/// System-value numbering used by signature blobs (`D3D_NAME`).
pub mod sv {
    pub const UNDEFINED: u32 = 0;
    pub const POSITION: u32 = 1;
    pub const CLIP_DISTANCE: u32 = 2;
    pub const CULL_DISTANCE: u32 = 3;
    pub const RENDER_TARGET_ARRAY_INDEX: u32 = 4;
    pub const VIEWPORT_ARRAY_INDEX: u32 = 5;
    pub const VERTEX_ID: u32 = 6;
    pub const PRIMITIVE_ID: u32 = 7;
    pub const INSTANCE_ID: u32 = 8;
    pub const IS_FRONT_FACE: u32 = 9;
    pub const SAMPLE_INDEX: u32 = 10;
    pub const FINAL_QUAD_EDGE_TESSFACTOR: u32 = 11;
    pub const FINAL_QUAD_INSIDE_TESSFACTOR: u32 = 12;
    pub const FINAL_TRI_EDGE_TESSFACTOR: u32 = 13;
    pub const FINAL_TRI_INSIDE_TESSFACTOR: u32 = 14;
    pub const FINAL_LINE_DETAIL_TESSFACTOR: u32 = 15;
    pub const FINAL_LINE_DENSITY_TESSFACTOR: u32 = 16;
    pub const TARGET: u32 = 64;
    pub const DEPTH: u32 = 65;
    pub const COVERAGE: u32 = 66;
    pub const DEPTH_GREATER_EQUAL: u32 = 67;
    pub const DEPTH_LESS_EQUAL: u32 = 68;
    pub const STENCIL_REF: u32 = 69;
    pub const INNER_COVERAGE: u32 = 70;

    pub fn name(v: u32) -> Option<&'static str> {
        Some(match v {
            POSITION => "SV_Position",
            CLIP_DISTANCE => "SV_ClipDistance",
            CULL_DISTANCE => "SV_CullDistance",
            RENDER_TARGET_ARRAY_INDEX => "SV_RenderTargetArrayIndex",
            VIEWPORT_ARRAY_INDEX => "SV_ViewportArrayIndex",
            VERTEX_ID => "SV_VertexID",
            PRIMITIVE_ID => "SV_PrimitiveID",
            INSTANCE_ID => "SV_InstanceID",
            IS_FRONT_FACE => "SV_IsFrontFace",
            SAMPLE_INDEX => "SV_SampleIndex",
            FINAL_QUAD_EDGE_TESSFACTOR | FINAL_TRI_EDGE_TESSFACTOR => "SV_TessFactor",
            FINAL_QUAD_INSIDE_TESSFACTOR | FINAL_TRI_INSIDE_TESSFACTOR => {
                "SV_InsideTessFactor"
            }
            FINAL_LINE_DETAIL_TESSFACTOR => "SV_TessFactor",
            FINAL_LINE_DENSITY_TESSFACTOR => "SV_InsideTessFactor",
            TARGET => "SV_Target",
            DEPTH => "SV_Depth",
            COVERAGE => "SV_Coverage",
            DEPTH_GREATER_EQUAL => "SV_DepthGreaterEqual",
            DEPTH_LESS_EQUAL => "SV_DepthLessEqual",
            STENCIL_REF => "SV_StencilRef",
            INNER_COVERAGE => "SV_InnerCoverage",
            _ => return None,
        })
    }
}

/// Normalized element record, the common currency of the blob and DDI paths.
#[derive(Debug, Clone)]
pub struct ElementRecord {
    pub semantic_name: String,
    pub semantic_index: u32,
    pub start_row: u32,
    pub start_col: u32,
    pub rows: u32,
    pub cols: u32,
    pub stream: u32,
    pub comp_type: ScalarType,
    pub system_value: u32,
}

fn comp_type_from_blob(v: u32) -> ScalarType {
    // D3D_REGISTER_COMPONENT_TYPE: 1 = uint32, 2 = sint32, 3 = float32.
    match v {
        1 | 2 => ScalarType::I32,
        _ => ScalarType::F32,
    }
}

fn mask_span(mask: u8) -> (u32, u32) {
    if mask == 0 {
        return (0, 0);
    }
    let first = mask.trailing_zeros();
    let last = 7 - mask.leading_zeros();
    (first, last - first + 1)
}

fn interp_mode(v: u32) -> InterpolationMode {
    match v {
        interp::CONSTANT => InterpolationMode::Constant,
        interp::LINEAR => InterpolationMode::Linear,
        interp::LINEAR_CENTROID => InterpolationMode::LinearCentroid,
        interp::LINEAR_NOPERSPECTIVE => InterpolationMode::LinearNoperspective,
        interp::LINEAR_NOPERSPECTIVE_CENTROID => {
            InterpolationMode::LinearNoperspectiveCentroid
        }
        interp::LINEAR_SAMPLE => InterpolationMode::LinearSample,
        interp::LINEAR_NOPERSPECTIVE_SAMPLE => InterpolationMode::LinearNoperspectiveSample,
        _ => InterpolationMode::Undefined,
    }
}

/// The allocated element table plus its lookups.
#[derive(Debug, Default)]
pub struct SignatureMap {
    pub elements: Vec<SignatureElementMeta>,
    by_reg: BTreeMap<(u32, u32, u32), usize>,
    by_sgv: BTreeMap<u32, usize>,
}

impl SignatureMap {
    /// Looks up the allocated element covering `(reg, comp, stream)` and
    /// returns `(element, row-within-element, col-within-element)`.
    pub fn get(
        &self,
        reg: u32,
        comp: u32,
        stream: u32,
    ) -> Option<(&SignatureElementMeta, u32, u32)> {
        let &idx = self.by_reg.get(&(stream, reg, comp))?;
        let e = &self.elements[idx];
        let row = reg - e.start_row.unwrap_or(0);
        let col = comp - e.start_col.unwrap_or(0);
        Some((e, row, col))
    }

    /// Looks up a register-less system-value element by the operand kind that
    /// addresses it.
    pub fn get_sgv(&self, kind: OperandKind) -> Option<&SignatureElementMeta> {
        self.by_sgv.get(&(kind as u32)).map(|&i| &self.elements[i])
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Elements that belong in the cloned output signature metadata.
    pub fn cloned_elements(&self) -> &[SignatureElementMeta] {
        &self.elements
    }

    fn insert_element(&mut self, mut e: SignatureElementMeta, sgv: Option<OperandKind>) {
        e.id = self.elements.len() as u32;
        let idx = self.elements.len();
        if let (Some(start_row), Some(start_col)) = (e.start_row, e.start_col) {
            for r in 0..e.rows {
                for c in 0..e.cols {
                    self.by_reg
                        .insert((e.stream, start_row + r, start_col + c), idx);
                }
            }
        }
        if let Some(kind) = sgv {
            self.by_sgv.insert(kind as u32, idx);
        }
        self.elements.push(e);
    }
}

/// Builds the signature map for one signature kind.
pub fn build_signature(
    kind: SigKind,
    stage: ShaderStage,
    records: Vec<ElementRecord>,
    analysis: &Analysis,
) -> Result<SignatureMap> {
    let mut map = SignatureMap::default();

    // Index ranges applicable to this signature, coalesced.
    let ranges = coalesce_ranges(collect_ranges(kind, analysis));

    // Records consumed by a range collapse into one element per range.
    let mut consumed = vec![false; records.len()];
    for range in &ranges {
        let mut covered: Vec<usize> = (0..records.len())
            .filter(|&i| {
                let r = &records[i];
                r.stream == range.stream
                    && r.start_row >= range.start_register
                    && r.start_row < range.start_register + range.count
            })
            .collect();
        if covered.is_empty() {
            continue;
        }
        covered.sort_by_key(|&i| records[i].start_row);
        let first = &records[covered[0]];

        // Tight column bound over the captured components.
        let start_col = covered
            .iter()
            .map(|&i| records[i].start_col)
            .min()
            .unwrap_or(0);
        let end_col = covered
            .iter()
            .map(|&i| records[i].start_col + records[i].cols)
            .max()
            .unwrap_or(0);

        let semantic_indices: Vec<u32> =
            covered.iter().map(|&i| records[i].semantic_index).collect();

        let e = SignatureElementMeta {
            id: 0,
            semantic_name: first.semantic_name.clone(),
            semantic_indices,
            system_value: first.system_value,
            comp_type: first.comp_type,
            rows: range.count,
            cols: end_col - start_col,
            start_row: Some(range.start_register),
            start_col: Some(start_col),
            interpolation: InterpolationMode::Undefined,
            stream: range.stream,
            sgv_operand: None,
        };
        map.insert_element(e, None);
        for i in covered {
            consumed[i] = true;
        }
    }

    for (i, record) in records.iter().enumerate() {
        if consumed[i] {
            continue;
        }
        let e = SignatureElementMeta {
            id: 0,
            semantic_name: record.semantic_name.clone(),
            semantic_indices: vec![record.semantic_index],
            system_value: record.system_value,
            comp_type: record.comp_type,
            rows: record.rows,
            cols: record.cols,
            start_row: Some(record.start_row),
            start_col: Some(record.start_col),
            interpolation: InterpolationMode::Undefined,
            stream: record.stream,
            sgv_operand: None,
        };
        map.insert_element(e, None);
    }

    // Pixel-shader inputs: interpolation from the used-element records.
    if kind == SigKind::Input && stage == ShaderStage::Pixel {
        apply_ps_interpolation(&mut map, &analysis.inputs);
    }

    // Register-less system values addressed by operand kind.
    if kind == SigKind::Input && stage == ShaderStage::Pixel {
        if analysis.has_input_coverage && map.get_sgv(OperandKind::InputCoverageMask).is_none()
        {
            synthesize_sgv(
                &mut map,
                "SV_Coverage",
                sv::COVERAGE,
                OperandKind::InputCoverageMask,
            );
        }
        if analysis.has_inner_input_coverage
            && map.get_sgv(OperandKind::InnerCoverage).is_none()
        {
            synthesize_sgv(
                &mut map,
                "SV_InnerCoverage",
                sv::INNER_COVERAGE,
                OperandKind::InnerCoverage,
            );
        }
    }
    if kind == SigKind::Output && stage == ShaderStage::Pixel {
        if let Some(depth_kind) = analysis.depth_operand {
            let (name, value) = match depth_kind {
                OperandKind::OutputDepthGreaterEqual => {
                    ("SV_DepthGreaterEqual", sv::DEPTH_GREATER_EQUAL)
                }
                OperandKind::OutputDepthLessEqual => ("SV_DepthLessEqual", sv::DEPTH_LESS_EQUAL),
                _ => ("SV_Depth", sv::DEPTH),
            };
            let mut e = sgv_element(name, value);
            e.comp_type = ScalarType::F32;
            e.sgv_operand = Some(depth_kind as u32);
            map.insert_element(e, Some(depth_kind));
        }
        if analysis.has_stencil_ref_out {
            synthesize_sgv(
                &mut map,
                "SV_StencilRef",
                sv::STENCIL_REF,
                OperandKind::OutputStencilRef,
            );
        }
        if analysis.has_coverage_out {
            synthesize_sgv(
                &mut map,
                "SV_Coverage",
                sv::COVERAGE,
                OperandKind::OutputCoverageMask,
            );
        }
    }

    trace!(?kind, elements = map.elements.len(), "signature built");
    Ok(map)
}

fn sgv_element(name: &str, system_value: u32) -> SignatureElementMeta {
    SignatureElementMeta {
        id: 0,
        semantic_name: name.to_owned(),
        semantic_indices: vec![0],
        system_value,
        comp_type: ScalarType::I32,
        rows: 1,
        cols: 1,
        start_row: None,
        start_col: None,
        interpolation: InterpolationMode::Undefined,
        stream: 0,
        sgv_operand: None,
    }
}

fn synthesize_sgv(map: &mut SignatureMap, name: &str, value: u32, kind: OperandKind) {
    let mut e = sgv_element(name, value);
    e.sgv_operand = Some(kind as u32);
    map.insert_element(e, Some(kind));
}

fn collect_ranges(kind: SigKind, analysis: &Analysis) -> Vec<IndexRangeDecl> {
    analysis
        .index_ranges
        .iter()
        .filter(|r| {
            let matches_kind = match kind {
                SigKind::Input => matches!(
                    r.operand_kind,
                    OperandKind::Input
                        | OperandKind::InputControlPoint
                        | OperandKind::OutputControlPoint
                ) && !r.in_patch_constant_phase,
                SigKind::Output => {
                    r.operand_kind == OperandKind::Output && !r.in_patch_constant_phase
                }
                SigKind::PatchConstant => {
                    r.in_patch_constant_phase || r.operand_kind == OperandKind::InputPatchConstant
                }
            };
            matches_kind && r.count > 1
        })
        .copied()
        .collect()
}

/// Sorts ranges by (stream, row, col) and merges overlapping or adjacent
/// ones.
fn coalesce_ranges(mut ranges: Vec<IndexRangeDecl>) -> Vec<IndexRangeDecl> {
    ranges.sort_by_key(|r| (r.stream, r.start_register, r.start_component));
    let mut out: Vec<IndexRangeDecl> = Vec::with_capacity(ranges.len());
    for range in ranges {
        if let Some(last) = out.last_mut() {
            let last_end = last.start_register + last.count;
            if last.stream == range.stream && range.start_register <= last_end {
                let new_end = (range.start_register + range.count).max(last_end);
                last.count = new_end - last.start_register;
                continue;
            }
        }
        out.push(range);
    }
    out
}

/// Intersects each element's register/component rectangle with the pixel
/// shader's `dcl_input_ps` records to pick its interpolation mode.
fn apply_ps_interpolation(map: &mut SignatureMap, used: &[IoDecl]) {
    for e in &mut map.elements {
        let (Some(start_row), Some(start_col)) = (e.start_row, e.start_col) else {
            continue;
        };
        for decl in used {
            let Some(reg) = decl.register else { continue };
            if decl.operand_kind != OperandKind::Input {
                continue;
            }
            let row_hit = reg >= start_row && reg < start_row + e.rows;
            let col_hit = decl
                .mask
                .comps()
                .any(|c| (c as u32) >= start_col && (c as u32) < start_col + e.cols);
            if row_hit && col_hit && decl.interpolation != interp::UNDEFINED {
                e.interpolation = interp_mode(decl.interpolation);
                break;
            }
        }
    }
}

/// Element records from a parsed signature chunk.
pub fn records_from_chunk(chunk: &SignatureChunk) -> Vec<ElementRecord> {
    chunk
        .entries
        .iter()
        .map(|entry| {
            let (start_col, cols) = mask_span(entry.mask);
            ElementRecord {
                semantic_name: entry.semantic_name.clone(),
                semantic_index: entry.semantic_index,
                start_row: entry.register,
                start_col,
                rows: 1,
                cols,
                stream: entry.stream.unwrap_or(0) as u32,
                comp_type: comp_type_from_blob(entry.component_type),
                system_value: entry.system_value_type,
            }
        })
        .collect()
}

/// Element records from a DDI signature vector.
///
/// DDI entries carry no semantic names; names are derived from the system
/// value, with pixel-shader heuristics for entries whose system value is
/// absent (stencil-ref vs coverage vs depth variants by component type and
/// prior declaration hints).
pub fn records_from_ddi(
    entries: &[crate::driver::DdiSignatureEntry],
    kind: SigKind,
    stage: ShaderStage,
    analysis: &Analysis,
) -> Result<Vec<ElementRecord>> {
    let mut out = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let comp_type = match entry.component_type {
            1 | 2 => ScalarType::I32,
            0 | 3 => ScalarType::F32,
            other => {
                return Err(ConvertError::InvalidDdiSignature(format!(
                    "entry {i}: unknown component type {other}"
                )))
            }
        };

        let mut system_value = entry.system_value;
        if entry.register == u32::MAX && system_value == sv::UNDEFINED {
            // Register-less entry with no tag: disambiguate for PS.
            if stage == ShaderStage::Pixel && kind == SigKind::Output {
                system_value = if analysis.has_stencil_ref_out && comp_type == ScalarType::I32 {
                    sv::STENCIL_REF
                } else if analysis.has_coverage_out && comp_type == ScalarType::I32 {
                    sv::COVERAGE
                } else {
                    match analysis.depth_operand {
                        Some(OperandKind::OutputDepthGreaterEqual) => sv::DEPTH_GREATER_EQUAL,
                        Some(OperandKind::OutputDepthLessEqual) => sv::DEPTH_LESS_EQUAL,
                        Some(_) => sv::DEPTH,
                        None => {
                            return Err(ConvertError::InvalidDdiSignature(format!(
                                "entry {i}: register-less entry with no system value"
                            )))
                        }
                    }
                };
            } else if stage == ShaderStage::Pixel && kind == SigKind::Input {
                system_value = sv::COVERAGE;
            } else {
                return Err(ConvertError::InvalidDdiSignature(format!(
                    "entry {i}: register-less entry with no system value"
                )));
            }
        }

        let (start_col, cols) = mask_span(entry.mask);
        let semantic_name = sv::name(system_value)
            .map(str::to_owned)
            .unwrap_or_else(|| "ARB".to_owned());
        out.push(ElementRecord {
            semantic_name,
            semantic_index: if system_value == sv::UNDEFINED {
                entry.register
            } else {
                0
            },
            start_row: entry.register,
            start_col,
            rows: 1,
            cols,
            stream: entry.stream as u32,
            comp_type,
            system_value,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_spans() {
        assert_eq!(mask_span(0b0001), (0, 1));
        assert_eq!(mask_span(0b0110), (1, 2));
        assert_eq!(mask_span(0b1111), (0, 4));
        assert_eq!(mask_span(0b1000), (3, 1));
        assert_eq!(mask_span(0), (0, 0));
    }

    #[test]
    fn coalesce_merges_overlapping_and_adjacent() {
        let mk = |start: u32, count: u32| IndexRangeDecl {
            operand_kind: OperandKind::Input,
            start_register: start,
            start_component: 0,
            count,
            stream: 0,
            in_patch_constant_phase: false,
        };
        let merged = coalesce_ranges(vec![mk(4, 2), mk(0, 3), mk(2, 2)]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].start_register, 0);
        assert_eq!(merged[0].count, 6);

        let split = coalesce_ranges(vec![mk(0, 2), mk(4, 2)]);
        assert_eq!(split.len(), 2);
    }
}
