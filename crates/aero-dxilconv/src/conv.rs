//! Per-conversion state.
//!
//! One [`Conversion`] owns the output module and every auxiliary table for
//! the duration of a single translation; nothing here is shared between
//! conversions. The instance is consumed when the module is detached.

use std::collections::BTreeMap;

use aero_dxbc::sm4::decode::Instruction;
use aero_dxbc::sm4::{ShaderModel, ShaderStage};
use aero_dxil::{
    AddressSpace, BlockId, Constant, DxOp, FuncId, Function, GlobalId, GlobalVariable,
    IrBuilder, Module, ResourceBinding, ResourceClass, ResourceKind, ScalarType, ShaderKind,
    Type, Value,
};
use tracing::trace;

use crate::analyze::Analysis;
use crate::error::{ConvertError, Result};
use crate::options::Options;
use crate::scopes::ScopeStack;
use crate::signature::SignatureMap;

/// Storage for one indexable temp array (`x#`).
#[derive(Debug, Clone, Copy)]
pub(crate) struct IndexableReg {
    /// Pointer value of the 32-bit lane array.
    pub storage: Value,
    pub num_regs: u32,
    pub num_comps: u32,
}

/// Reserved binding of the interface-data constant buffer.
pub(crate) const INTERFACE_DATA_CB_SLOT: u32 = 14;

pub(crate) struct Conversion {
    pub module: Module,
    pub stage: ShaderStage,
    pub model: ShaderModel,
    pub analysis: Analysis,
    pub options: Options,
    pub instructions: Vec<Instruction>,

    pub input_sig: SignatureMap,
    pub output_sig: SignatureMap,
    pub patch_sig: SignatureMap,

    /// Current insertion point.
    pub func: FuncId,
    pub block: BlockId,

    pub scopes: ScopeStack,

    pub indexable: BTreeMap<u32, IndexableReg>,
    pub pc_indexable: BTreeMap<u32, IndexableReg>,

    /// (class, range id) → index into `module.resources`.
    pub resource_by_range: BTreeMap<(ResourceClass, u32), usize>,
    /// Handle cache for SM ≤ 5.0, keyed by (class, lower bound).
    pub handle_cache: BTreeMap<(ResourceClass, u32), Value>,

    pub tgsm_globals: BTreeMap<u32, GlobalId>,
    pub icb_global: Option<GlobalId>,

    /// SM4 subroutine labels and SM5 interface function bodies.
    pub labels: BTreeMap<u32, FuncId>,
    pub function_bodies: BTreeMap<u32, FuncId>,
    pub interface_cb_handle: Option<Value>,

    pub in_patch_constant_phase: bool,
    pub current_stream: u32,
    /// First shadow temp register backing GS multi-stream output buffering.
    pub gs_shadow_base: u32,

    /// Which fork/join phase the lowering walk is up to.
    pub hull_phase_cursor: usize,
    /// Shared induction-variable storage for the hull phase loops.
    pub hull_induction: Option<Value>,

    pub diagnostics: Vec<String>,
}

impl Conversion {
    pub fn new(
        stage: ShaderStage,
        model: ShaderModel,
        analysis: Analysis,
        options: Options,
        instructions: Vec<Instruction>,
        input_sig: SignatureMap,
        output_sig: SignatureMap,
        patch_sig: SignatureMap,
    ) -> Conversion {
        let mut module = Module::new("dxbc2dxil.module");
        module.shader_kind = Some(match stage {
            ShaderStage::Pixel => ShaderKind::Pixel,
            ShaderStage::Vertex => ShaderKind::Vertex,
            ShaderStage::Geometry => ShaderKind::Geometry,
            ShaderStage::Hull => ShaderKind::Hull,
            ShaderStage::Domain => ShaderKind::Domain,
            ShaderStage::Compute => ShaderKind::Compute,
        });
        module.global_flags = analysis.global_flags;

        let num_temps = analysis.num_temps;
        Conversion {
            module,
            stage,
            model,
            analysis,
            options,
            instructions,
            input_sig,
            output_sig,
            patch_sig,
            func: FuncId(0),
            block: BlockId(0),
            scopes: ScopeStack::default(),
            indexable: BTreeMap::new(),
            pc_indexable: BTreeMap::new(),
            resource_by_range: BTreeMap::new(),
            handle_cache: BTreeMap::new(),
            tgsm_globals: BTreeMap::new(),
            icb_global: None,
            labels: BTreeMap::new(),
            function_bodies: BTreeMap::new(),
            interface_cb_handle: None,
            in_patch_constant_phase: false,
            current_stream: 0,
            gs_shadow_base: num_temps,
            hull_phase_cursor: 0,
            hull_induction: None,
            diagnostics: Vec::new(),
        }
    }

    // Emission helpers ------------------------------------------------------

    pub fn builder(&mut self) -> IrBuilder<'_> {
        IrBuilder::new(&mut self.module, self.func, self.block)
    }

    pub fn const_i32(&mut self, v: u32) -> Value {
        self.module.const_i32(v)
    }

    pub fn const_i8(&mut self, v: i8) -> Value {
        self.module.const_i8(v)
    }

    pub fn const_f32(&mut self, v: f32) -> Value {
        self.module.const_f32(v)
    }

    pub fn const_bool(&mut self, v: bool) -> Value {
        self.module.const_bool(v)
    }

    pub fn undef(&mut self, ty: Type) -> Value {
        self.module.const_undef(ty)
    }

    pub fn undef_f32(&mut self) -> Value {
        self.module.const_undef(Type::F32)
    }

    pub fn undef_i32(&mut self) -> Value {
        self.module.const_undef(Type::I32)
    }

    /// dx op call whose result is the overload scalar.
    pub fn dxop_scalar(&mut self, op: DxOp, scalar: ScalarType, args: Vec<Value>) -> Value {
        self.builder().call_dxop_scalar(op, scalar, args)
    }

    /// dx op call with an explicit return type.
    pub fn dxop(&mut self, op: DxOp, overload: Type, args: Vec<Value>, ret: Type) -> Value {
        self.builder().call_dxop(op, overload, args, ret)
    }

    pub fn dxop_void(&mut self, op: DxOp, overload: Type, args: Vec<Value>) {
        self.builder().call_dxop_void(op, overload, args);
    }

    // Module-entity setup ---------------------------------------------------

    /// Creates the module resource records from the analysis declarations and
    /// fills the per-class range maps. Ids are dense per class in declaration
    /// order.
    pub fn declare_resources(&mut self) {
        let mut next_id: BTreeMap<ResourceClass, u32> = BTreeMap::new();
        let decls = std::mem::take(&mut self.analysis.resources);
        for decl in &decls {
            let id = next_id.entry(decl.class).or_insert(0);
            let name = match decl.class {
                ResourceClass::Srv => format!("T{}", *id),
                ResourceClass::Uav => format!("U{}", *id),
                ResourceClass::CBuffer => format!("CB{}", *id),
                ResourceClass::Sampler => format!("S{}", *id),
            };
            let binding = ResourceBinding {
                class: decl.class,
                id: *id,
                name,
                space: decl.space,
                lower_bound: decl.lower_bound,
                range_size: decl.range_size,
                kind: decl.kind,
                elem_type: decl.elem_type,
                stride: decl.stride,
                sampler_kind: decl.sampler_kind,
                uav_flags: decl.uav_flags,
                sample_count: decl.sample_count,
            };
            let index = self.module.resources.len();
            // Declarations are unique per range id within a class.
            self.resource_by_range
                .insert((decl.class, decl.range_id), index);
            self.module.resources.push(binding);
            *id += 1;
        }
        self.analysis.resources = decls;
    }

    /// Resolves a resource record by (class, range id or register).
    pub fn resource_by_id(
        &self,
        class: ResourceClass,
        range_id: u32,
    ) -> Result<&ResourceBinding> {
        let index = self
            .resource_by_range
            .get(&(class, range_id))
            .copied()
            .ok_or_else(|| {
                ConvertError::MalformedBytecode(format!(
                    "reference to undeclared {class:?} range {range_id}"
                ))
            })?;
        Ok(&self.module.resources[index])
    }

    /// Creates (or returns the cached) handle for a resource range.
    ///
    /// For SM ≤ 5.0 each (class, lower-bound) pair gets exactly one handle,
    /// created on first use and cached for the rest of the conversion. SM 5.1
    /// ranges are indexed dynamically, so every access site computes its own
    /// handle from the range id plus index.
    pub fn create_handle(
        &mut self,
        class: ResourceClass,
        range_id: u32,
        index: Option<Value>,
        non_uniform: bool,
    ) -> Result<Value> {
        let binding = self.resource_by_id(class, range_id)?;
        let id = binding.id;
        let lower_bound = binding.lower_bound;

        if !self.model.is_51_plus() {
            if let Some(cached) = self.handle_cache.get(&(class, lower_bound)) {
                return Ok(*cached);
            }
        }

        let class_imm = self.const_i8(match class {
            ResourceClass::Srv => 0,
            ResourceClass::Uav => 1,
            ResourceClass::CBuffer => 2,
            ResourceClass::Sampler => 3,
        });
        let id_imm = self.const_i32(id);
        let index_value = match index {
            Some(v) => v,
            None => self.const_i32(lower_bound),
        };
        let non_uniform = self.const_bool(non_uniform);
        let handle = self.dxop(
            DxOp::CreateHandle,
            Type::Void,
            vec![class_imm, id_imm, index_value, non_uniform],
            Type::Handle,
        );

        if !self.model.is_51_plus() {
            self.handle_cache.insert((class, lower_bound), handle);
        }
        trace!(?class, range_id, "created resource handle");
        Ok(handle)
    }

    /// Pre-creates one handle per declared resource range at the current
    /// function's entry (SM ≤ 5.0 only).
    ///
    /// Creating handles lazily at first use would let a handle materialize
    /// inside one branch of a conditional and be reused from the cache in a
    /// block that branch does not dominate. Entry-block creation keeps every
    /// cached handle dominating all of its uses; SM 5.1 ranges are indexed
    /// per access site and never cached.
    pub fn insert_sm50_resource_handles(&mut self) -> Result<()> {
        // Handles never cross function boundaries; every function gets its
        // own.
        self.handle_cache.clear();
        self.interface_cb_handle = None;
        if self.model.is_51_plus() {
            return Ok(());
        }
        let keys: Vec<(ResourceClass, u32)> = self.resource_by_range.keys().copied().collect();
        for (class, range_id) in keys {
            self.create_handle(class, range_id, None, false)?;
        }
        Ok(())
    }

    /// Materializes TGSM declarations as zero-initialized globals in the
    /// group-shared address space.
    pub fn declare_tgsm(&mut self) {
        let decls = self.analysis.tgsm.clone();
        for decl in decls {
            let elem_count = decl.count * (decl.stride / 4).max(1);
            let ty = Type::array(Type::I32, elem_count);
            let id = self.module.add_global(GlobalVariable {
                name: format!("TGSM{}", decl.id),
                ty: ty.clone(),
                address_space: AddressSpace::Tgsm,
                initializer: Some(Constant::ZeroInit(ty)),
                constant: false,
                align: 4,
            });
            self.tgsm_globals.insert(decl.id, id);
        }
    }

    /// Materializes the immediate constant buffer as a module-scope read-only
    /// float array in its dedicated address space.
    pub fn declare_icb(&mut self) {
        if let Some(dwords) = self.analysis.icb.clone() {
            let ty = Type::array(Type::F32, dwords.len() as u32);
            let id = self.module.add_global(GlobalVariable {
                name: "ICB".to_owned(),
                ty,
                address_space: AddressSpace::IcbConstant,
                initializer: Some(Constant::F32Array(dwords)),
                constant: true,
                align: 4,
            });
            self.icb_global = Some(id);
        }
    }

    /// Allocates storage for the indexable temps of the current phase.
    ///
    /// Single-function shaders use entry-block allocas; shaders with
    /// subroutines or interface bodies use module-scope storage so every
    /// function sees the same registers.
    pub fn declare_indexable_temps(&mut self, patch_constant_phase: bool) {
        let decls = if patch_constant_phase {
            self.analysis.pc_indexable_temps.clone()
        } else {
            self.analysis.indexable_temps.clone()
        };
        // Multi-function shaders (subroutines, interface bodies, hull phase
        // pairs) need module-scope storage so every function sees the same
        // registers; single-function shaders get entry-block allocas.
        let needs_globals = self.analysis.label_count > 0
            || self.analysis.function_body_count > 0
            || self.stage == ShaderStage::Hull;

        for (id, decl) in decls {
            let elem_count = decl.count * decl.comps;
            let storage = if needs_globals {
                let ty = Type::array(Type::I32, elem_count);
                let gid = self.module.add_global(GlobalVariable {
                    name: format!("dx.v32.x{id}"),
                    ty: ty.clone(),
                    address_space: AddressSpace::Default,
                    initializer: Some(Constant::ZeroInit(ty)),
                    constant: false,
                    align: 4,
                });
                Value::Global(gid)
            } else {
                self.builder().alloca(Type::I32, elem_count)
            };
            let reg = IndexableReg {
                storage,
                num_regs: decl.count,
                num_comps: decl.comps,
            };
            if patch_constant_phase {
                self.pc_indexable.insert(id, reg);
            } else {
                self.indexable.insert(id, reg);
            }
        }
    }

    pub fn indexable_reg(&self, id: u32) -> Result<IndexableReg> {
        let table = if self.in_patch_constant_phase {
            // Fork/join phases see their own declarations first, then the
            // control-point phase's.
            self.pc_indexable.get(&id).or_else(|| self.indexable.get(&id))
        } else {
            self.indexable.get(&id)
        };
        table.copied().ok_or_else(|| {
            ConvertError::MalformedBytecode(format!("reference to undeclared x{id}"))
        })
    }

    /// Handle of the reserved interface-data constant buffer, created on
    /// first use.
    pub fn interface_data_handle(&mut self) -> Result<Value> {
        if let Some(handle) = self.interface_cb_handle {
            return Ok(handle);
        }
        // Register the reserved binding if the shader didn't declare it.
        let class = ResourceClass::CBuffer;
        if !self
            .resource_by_range
            .contains_key(&(class, INTERFACE_DATA_CB_SLOT))
        {
            let id = self
                .module
                .resources_of(class)
                .map(|r| r.id + 1)
                .max()
                .unwrap_or(0);
            let index = self.module.resources.len();
            self.module.resources.push(ResourceBinding {
                class,
                id,
                name: "IFACE_CB".to_owned(),
                space: 0,
                lower_bound: INTERFACE_DATA_CB_SLOT,
                range_size: 1,
                kind: ResourceKind::CBuffer,
                elem_type: None,
                stride: 4096,
                sampler_kind: None,
                uav_flags: aero_dxil::UavFlags::empty(),
                sample_count: 0,
            });
            self.resource_by_range
                .insert((class, INTERFACE_DATA_CB_SLOT), index);
        }
        let handle = self.create_handle(class, INTERFACE_DATA_CB_SLOT, None, false)?;
        self.interface_cb_handle = Some(handle);
        Ok(handle)
    }

    // Function management ---------------------------------------------------

    /// Starts a new function with an entry block and moves the insertion
    /// point there.
    pub fn begin_function(&mut self, name: &str, is_entry: bool) -> FuncId {
        let mut func = Function::new(name, Type::Void);
        func.is_entry = is_entry;
        func.add_block("entry");
        let id = self.module.add_function(func);
        if is_entry && self.module.entry.is_none() {
            self.module.entry = Some(id);
        }
        self.func = id;
        self.block = BlockId(0);
        id
    }

    pub fn current_block_terminated(&self) -> bool {
        self.module
            .func(self.func)
            .block(self.block)
            .terminator
            .is_some()
    }

    pub fn add_block(&mut self, name: String) -> BlockId {
        self.module.func_mut(self.func).add_block(name)
    }

}
