//! A typed SSA intermediate representation for DXIL-flavoured shader modules.
//!
//! The IR is deliberately small: enough to express what the DXBC converter
//! emits — dx op intrinsic calls, scalar arithmetic, structured control flow,
//! group-shared and constant-buffer memory access — and to be verified,
//! cleaned up, and serialized. It is not a general-purpose compiler IR.
//!
//! Entities:
//!
//! - [`Module`] owns constants, globals, resource/signature metadata, and
//!   functions.
//! - [`Function`] owns basic blocks and instructions; values are instruction
//!   results, interned constants, or globals.
//! - [`IrBuilder`] appends instructions at an insertion point, mirroring the
//!   stateful-builder pattern the converter's scope stack relies on.
//! - [`dxop::DxOp`] enumerates the fixed intrinsic operation set with its
//!   compile-time property table.

pub mod bitcode;
pub mod builder;
pub mod container;
pub mod dxop;
pub mod inst;
pub mod module;
pub mod text;
pub mod types;
pub mod verify;

pub use bitcode::{serialize, ModulePass, PassError};
pub use builder::IrBuilder;
pub use dxop::{DxOp, DxOpAttr, DxOpClass};
pub use inst::{
    AtomicOp, BinOp, Callee, CastOp, CmpPred, FastMath, Inst, InstKind, Terminator,
};
pub use module::{
    AddressSpace, BlockId, ConstId, Constant, FuncId, Function, GlobalId, GlobalVariable,
    InstId, InterpolationMode, Module, ResourceBinding, ResourceClass, ResourceKind,
    SamplerKind, ShaderKind, SignatureElementMeta, UavFlags, Value,
};
pub use types::{ScalarType, Type};
pub use verify::{is_reducible, remove_unreachable_blocks, verify_module, VerifyError};
