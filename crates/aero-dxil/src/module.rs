//! The IR module and its owned entities.

use bitflags::bitflags;

use crate::inst::{Inst, Terminator};
use crate::types::{ScalarType, Type};

/// Pointer address spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum AddressSpace {
    Default = 0,
    DeviceMemory = 1,
    CBuffer = 2,
    /// Thread-group shared memory.
    Tgsm = 3,
    /// Immediate constant buffer storage.
    IcbConstant = 4,
}

/// Shader pipeline stage of the emitted module. The converter always promotes
/// the model itself to 6.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    Vertex,
    Hull,
    Domain,
    Geometry,
    Pixel,
    Compute,
}

impl ShaderKind {
    /// Program-version encoding used by the DXIL program header.
    pub fn program_kind(self) -> u32 {
        match self {
            ShaderKind::Pixel => 0,
            ShaderKind::Vertex => 1,
            ShaderKind::Geometry => 2,
            ShaderKind::Hull => 3,
            ShaderKind::Domain => 4,
            ShaderKind::Compute => 5,
        }
    }
}

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

id_type!(
    /// Function id, unique within a module.
    FuncId
);
id_type!(
    /// Instruction id, unique within a function.
    InstId
);
id_type!(
    /// Basic-block id, unique within a function.
    BlockId
);
id_type!(
    /// Interned-constant id, unique within a module.
    ConstId
);
id_type!(
    /// Global-variable id, unique within a module.
    GlobalId
);

/// An SSA value: an instruction result, an interned constant, or the address
/// of a global.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    Inst(InstId),
    Const(ConstId),
    Global(GlobalId),
}

/// Interned constants. Float payloads are stored as bit patterns so constant
/// identity (and therefore serialized output) is exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    I1(bool),
    I8(i8),
    I16(u16),
    I32(u32),
    I64(u64),
    F16(u16),
    F32(u32),
    F64(u64),
    Undef(Type),
    /// All-zero value of an aggregate/array type.
    ZeroInit(Type),
    /// Flat `f32` array initializer (immediate constant buffers).
    F32Array(Vec<u32>),
}

impl Constant {
    pub fn ty(&self) -> Type {
        match self {
            Constant::I1(_) => Type::I1,
            Constant::I8(_) => Type::I8,
            Constant::I16(_) => Type::I16,
            Constant::I32(_) => Type::I32,
            Constant::I64(_) => Type::I64,
            Constant::F16(_) => Type::F16,
            Constant::F32(_) => Type::F32,
            Constant::F64(_) => Type::F64,
            Constant::Undef(ty) | Constant::ZeroInit(ty) => ty.clone(),
            Constant::F32Array(values) => Type::array(Type::F32, values.len() as u32),
        }
    }
}

/// A module-scope variable.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalVariable {
    pub name: String,
    /// Pointee type; the global's value is a pointer to it.
    pub ty: Type,
    pub address_space: AddressSpace,
    pub initializer: Option<Constant>,
    pub constant: bool,
    pub align: u32,
}

/// A basic block: named, with body instructions and (once sealed) exactly one
/// terminator.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub name: String,
    pub insts: Vec<InstId>,
    pub terminator: Option<Terminator>,
}

/// A function: entry block first, instructions owned in an arena indexed by
/// [`InstId`].
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub ret_ty: Type,
    pub blocks: Vec<Block>,
    pub insts: Vec<Inst>,
    /// True for `main`/`pc_main`-style entry points (they never return a
    /// value and are listed in the module metadata).
    pub is_entry: bool,
}

impl Function {
    pub fn new(name: impl Into<String>, ret_ty: Type) -> Function {
        Function {
            name: name.into(),
            ret_ty,
            blocks: Vec::new(),
            insts: Vec::new(),
            is_entry: false,
        }
    }

    pub fn entry_block(&self) -> Option<BlockId> {
        (!self.blocks.is_empty()).then_some(BlockId(0))
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.index()]
    }

    pub fn inst(&self, id: InstId) -> &Inst {
        &self.insts[id.index()]
    }

    pub fn inst_mut(&mut self, id: InstId) -> &mut Inst {
        &mut self.insts[id.index()]
    }

    pub fn add_block(&mut self, name: impl Into<String>) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Block {
            name: name.into(),
            insts: Vec::new(),
            terminator: None,
        });
        id
    }
}

/// Resource class, one table per class in the module metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceClass {
    Srv,
    Uav,
    CBuffer,
    Sampler,
}

/// Shape of a bound resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    TypedBuffer,
    RawBuffer,
    StructuredBuffer,
    Texture1D,
    Texture1DArray,
    Texture2D,
    Texture2DArray,
    Texture2DMS,
    Texture2DMSArray,
    Texture3D,
    TextureCube,
    TextureCubeArray,
    CBuffer,
    Sampler,
}

impl ResourceKind {
    /// Number of coordinates used to address the resource.
    pub fn coord_count(self) -> u32 {
        match self {
            ResourceKind::TypedBuffer
            | ResourceKind::RawBuffer
            | ResourceKind::StructuredBuffer
            | ResourceKind::Texture1D => 1,
            ResourceKind::Texture1DArray
            | ResourceKind::Texture2D
            | ResourceKind::Texture2DMS => 2,
            ResourceKind::Texture2DArray
            | ResourceKind::Texture2DMSArray
            | ResourceKind::Texture3D
            | ResourceKind::TextureCube => 3,
            ResourceKind::TextureCubeArray => 4,
            ResourceKind::CBuffer | ResourceKind::Sampler => 0,
        }
    }

    /// Number of texel-offset components sampling accepts (0 for cube forms).
    pub fn offset_count(self) -> u32 {
        match self {
            ResourceKind::Texture1D | ResourceKind::Texture1DArray => 1,
            ResourceKind::Texture2D
            | ResourceKind::Texture2DArray
            | ResourceKind::Texture2DMS
            | ResourceKind::Texture2DMSArray => 2,
            ResourceKind::Texture3D => 3,
            _ => 0,
        }
    }
}

/// Sampler flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerKind {
    Default,
    Comparison,
}

bitflags! {
    /// UAV binding flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UavFlags: u8 {
        const GLOBALLY_COHERENT = 1 << 0;
        const HAS_COUNTER = 1 << 1;
        const RASTERIZER_ORDERED = 1 << 2;
    }
}

/// One resource binding record in the module metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceBinding {
    pub class: ResourceClass,
    /// Range id assigned by the module, dense per class in declaration order.
    pub id: u32,
    pub name: String,
    pub space: u32,
    pub lower_bound: u32,
    /// `u32::MAX` encodes an unbounded range.
    pub range_size: u32,
    pub kind: ResourceKind,
    /// Element type for typed resources.
    pub elem_type: Option<ScalarType>,
    /// Byte stride for structured buffers; byte size for cbuffers.
    pub stride: u32,
    pub sampler_kind: Option<SamplerKind>,
    pub uav_flags: UavFlags,
    /// Texture2DMS sample count, when declared.
    pub sample_count: u32,
}

/// Interpolation mode of a signature element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationMode {
    #[default]
    Undefined,
    Constant,
    Linear,
    LinearCentroid,
    LinearNoperspective,
    LinearNoperspectiveCentroid,
    LinearSample,
    LinearNoperspectiveSample,
}

/// Signature element record carried in the module metadata (one per element
/// of the input/output/patch-constant signatures).
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureElementMeta {
    pub id: u32,
    pub semantic_name: String,
    /// One semantic index per row the element spans.
    pub semantic_indices: Vec<u32>,
    pub system_value: u32,
    pub comp_type: ScalarType,
    pub rows: u32,
    pub cols: u32,
    /// `None` when the element is unallocated (SGVs without a register).
    pub start_row: Option<u32>,
    pub start_col: Option<u32>,
    pub interpolation: InterpolationMode,
    pub stream: u32,
    /// Kind of the DXBC operand this element is addressed through, for
    /// register-less system values (depth, coverage, stencil-ref).
    pub sgv_operand: Option<u32>,
}

/// The IR module: the unit of conversion output.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub name: String,
    pub shader_kind: Option<ShaderKind>,
    /// Always `(6, 0)` for converted modules.
    pub shader_model: (u8, u8),
    pub constants: Vec<Constant>,
    pub globals: Vec<GlobalVariable>,
    pub functions: Vec<Function>,
    pub entry: Option<FuncId>,
    pub patch_constant_entry: Option<FuncId>,
    pub resources: Vec<ResourceBinding>,
    pub input_signature: Vec<SignatureElementMeta>,
    pub output_signature: Vec<SignatureElementMeta>,
    pub patch_constant_signature: Vec<SignatureElementMeta>,
    /// Global shader flag DWORD collected from `dcl_globalFlags`.
    pub global_flags: u32,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Module {
        Module {
            name: name.into(),
            shader_model: (6, 0),
            ..Module::default()
        }
    }

    pub fn func(&self, id: FuncId) -> &Function {
        &self.functions[id.index()]
    }

    pub fn func_mut(&mut self, id: FuncId) -> &mut Function {
        &mut self.functions[id.index()]
    }

    pub fn add_function(&mut self, func: Function) -> FuncId {
        let id = FuncId(self.functions.len() as u32);
        self.functions.push(func);
        id
    }

    /// Interns a constant, returning a stable id. Linear scan: the constant
    /// pools of converted shaders stay small.
    pub fn intern_const(&mut self, c: Constant) -> ConstId {
        if let Some(i) = self.constants.iter().position(|e| *e == c) {
            return ConstId(i as u32);
        }
        let id = ConstId(self.constants.len() as u32);
        self.constants.push(c);
        id
    }

    pub fn const_value(&mut self, c: Constant) -> Value {
        Value::Const(self.intern_const(c))
    }

    pub fn const_i32(&mut self, v: u32) -> Value {
        self.const_value(Constant::I32(v))
    }

    pub fn const_i8(&mut self, v: i8) -> Value {
        self.const_value(Constant::I8(v))
    }

    pub fn const_bool(&mut self, v: bool) -> Value {
        self.const_value(Constant::I1(v))
    }

    pub fn const_f32(&mut self, v: f32) -> Value {
        self.const_value(Constant::F32(v.to_bits()))
    }

    pub fn const_undef(&mut self, ty: Type) -> Value {
        self.const_value(Constant::Undef(ty))
    }

    pub fn add_global(&mut self, global: GlobalVariable) -> GlobalId {
        let id = GlobalId(self.globals.len() as u32);
        self.globals.push(global);
        id
    }

    pub fn global(&self, id: GlobalId) -> &GlobalVariable {
        &self.globals[id.index()]
    }

    /// Resolves a value's type within the given function.
    pub fn value_type(&self, func: FuncId, value: Value) -> Type {
        match value {
            Value::Inst(id) => self.func(func).inst(id).ty.clone(),
            Value::Const(id) => self.constants[id.index()].ty(),
            Value::Global(id) => {
                let g = &self.globals[id.index()];
                Type::ptr(g.ty.clone(), g.address_space)
            }
        }
    }

    /// Looks up the resource record for `(class, id)`.
    pub fn resource(&self, class: ResourceClass, id: u32) -> Option<&ResourceBinding> {
        self.resources
            .iter()
            .find(|r| r.class == class && r.id == id)
    }

    /// All records of one class, in declaration order.
    pub fn resources_of(&self, class: ResourceClass) -> impl Iterator<Item = &ResourceBinding> {
        self.resources.iter().filter(move |r| r.class == class)
    }
}
