//! The in-driver entry point's DDI signature layout.
//!
//! Drivers hand the converter raw token arrays plus three signature vectors
//! in a fixed DDI layout instead of a container. Entries carry no semantic
//! names; the signature model derives them from the system-value tag, with
//! pixel-shader heuristics for untagged register-less entries.

use bytemuck::{Pod, Zeroable};

/// One DDI signature element.
///
/// Layout per the driver ABI: system-value enum, 32-bit register index,
/// 8-bit component mask, 8-bit stream id, 32-bit component-type enum, 32-bit
/// min-precision enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct DdiSignatureEntry {
    pub system_value: u32,
    pub register: u32,
    pub mask: u8,
    pub stream: u8,
    pub _pad: [u8; 2],
    pub component_type: u32,
    pub min_precision: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_layout_is_20_bytes() {
        assert_eq!(std::mem::size_of::<DdiSignatureEntry>(), 20);
    }
}
