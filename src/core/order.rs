//! Ordering policies
//!
//! Both planning passes are order-dependent. The order is an explicit input
//! produced here, never something the passes work out for themselves.

use crate::core::address::AddressedFile;

/// Arranges addressed files into the sequence the passes consume
pub trait PlacementOrder {
    fn arrange(&self, files: Vec<AddressedFile>) -> Vec<AddressedFile>;
}

/// Canonical order: ascending declared start block, ties kept in input order
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredAddressOrder;

impl PlacementOrder for DeclaredAddressOrder {
    fn arrange(&self, mut files: Vec<AddressedFile>) -> Vec<AddressedFile> {
        // Stable sort: equal addresses keep their input order.
        files.sort_by_key(|f| f.declared_start);
        files
    }
}

/// Leaves files exactly as they were given
#[derive(Debug, Clone, Copy, Default)]
pub struct InputOrder;

impl PlacementOrder for InputOrder {
    fn arrange(&self, mut files: Vec<AddressedFile>) -> Vec<AddressedFile> {
        files.sort_by_key(|f| f.input_index);
        files
    }
}
