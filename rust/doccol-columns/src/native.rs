//! Mapping between Rust primitive types and column kinds.

use doccol_format::TypeKind;

/// A Rust type that can be used as the native representation of a column's cells.
///
/// `bool` columns store one byte per cell (`0` or `1`) and are accessed as `u8`;
/// `date` cells are `i64` milliseconds since the Unix epoch; `timestamp` cells are
/// `u64` values packed as `time << 32 | increment`; `id` cells are the 12 raw bytes
/// of an ObjectId.
pub trait NativeType: bytemuck::Pod + PartialEq + std::fmt::Debug {
    /// Returns `true` if cells of `kind` are stored as `Self`.
    fn stores(kind: TypeKind) -> bool;
}

macro_rules! impl_native_type {
    ($ty:ty, $($kind:ident)|+) => {
        impl NativeType for $ty {
            #[inline]
            fn stores(kind: TypeKind) -> bool {
                matches!(kind, $(TypeKind::$kind)|+)
            }
        }
    };
}

impl_native_type!(i8, Int8);
impl_native_type!(i16, Int16);
impl_native_type!(i32, Int32);
impl_native_type!(i64, Int64 | Date);
impl_native_type!(u8, UInt8 | Bool | Type);
impl_native_type!(u16, UInt16);
impl_native_type!(u32, UInt32 | Length | Size | WireSize);
impl_native_type!(u64, UInt64 | Timestamp);
impl_native_type!(f32, Float32);
impl_native_type!(f64, Float64);
impl_native_type!([u8; 12], ObjectId);
