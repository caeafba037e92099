//! The BUG value type model (component C1).
//!
//! Equality on [`Type`] is structural (derived `PartialEq`). Compatibility is
//! looser than equality: it additionally permits implicit widening between
//! numerics of the same signedness, and unifies anything with [`Type::Failure`]
//! so a single typing mistake doesn't cascade into a wall of follow-on
//! diagnostics.

use std::fmt;

/// A BUG value type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Bool,
    /// `uint{bits}`, `bits` one of 8/16/32/64/128/256.
    Uint(u16),
    /// `int{bits}`, same width set as `Uint`.
    Int(u16),
    /// 160-bit address.
    Address,
    /// `Some(n)` is fixed-size `bytesN`, `1 <= n <= 32`; `None` is dynamic `bytes`.
    Bytes(Option<u8>),
    String,
    /// `Array(element, Some(n))` is fixed-size; `None` is dynamic.
    Array(Box<Type>, Option<u64>),
    Mapping(Box<Type>, Box<Type>),
    Struct(StructType),
    Function(FunctionType),
    /// The error-recovery type. Compatible with everything; never equal to
    /// anything but another `Failure`.
    Failure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructType {
    pub name: String,
    /// Declaration order; this is also storage-layout order (§3.3).
    pub fields: Vec<(String, Type)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionType {
    pub name: String,
    pub params: Vec<Type>,
    pub ret: Option<Box<Type>>,
}

pub const NUMERIC_WIDTHS: [u16; 6] = [8, 16, 32, 64, 128, 256];

impl Type {
    pub fn failure(reason: impl Into<String>) -> Type {
        Type::Failure(reason.into())
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Type::Failure(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Uint(_) | Type::Int(_))
    }

    pub fn is_signed(&self) -> Option<bool> {
        match self {
            Type::Uint(_) => Some(false),
            Type::Int(_) => Some(true),
            _ => None,
        }
    }

    pub fn numeric_bits(&self) -> Option<u16> {
        match self {
            Type::Uint(b) | Type::Int(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_bytes_like(&self) -> bool {
        matches!(self, Type::Bytes(_) | Type::String)
    }

    /// Finds `f` on `self` if `self` is a struct.
    pub fn struct_field(&self, field: &str) -> Option<(usize, &Type)> {
        match self {
            Type::Struct(s) => s
                .fields
                .iter()
                .enumerate()
                .find(|(_, (name, _))| name == field)
                .map(|(i, (_, ty))| (i, ty)),
            _ => None,
        }
    }

    /// Structural equality modulo `Failure`, which is always compatible.
    pub fn compatible(&self, other: &Type) -> bool {
        if self.is_failure() || other.is_failure() {
            return true;
        }
        if self == other {
            return true;
        }
        // Same-signedness numeric implicit conversion.
        match (self.is_signed(), other.is_signed()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// The common type of two numerics of matching signedness: the wider of
    /// the two widths, same sign. `None` if the types aren't both numeric
    /// with matching signedness (callers should fall back to `Failure`).
    pub fn common_type(&self, other: &Type) -> Option<Type> {
        match (self, other) {
            (Type::Uint(a), Type::Uint(b)) => Some(Type::Uint((*a).max(*b))),
            (Type::Int(a), Type::Int(b)) => Some(Type::Int((*a).max(*b))),
            _ => None,
        }
    }

    /// Width in bytes for types with a statically-known fixed layout size
    /// (used by the memory planner and by `.length` on fixed-size things).
    /// `None` for dynamically-sized types (dynamic bytes/string/array,
    /// mapping), which carry no fixed slot footprint.
    pub fn fixed_byte_len(&self) -> Option<u64> {
        match self {
            Type::Bool | Type::Uint(_) | Type::Int(_) | Type::Address => Some(32),
            Type::Bytes(Some(_)) => Some(32),
            Type::Bytes(None) | Type::String => None,
            Type::Array(elem, Some(n)) => elem.fixed_byte_len().map(|_| 32 * n),
            Type::Array(_, None) => None,
            Type::Mapping(_, _) => None,
            Type::Struct(s) => {
                let mut total = 0u64;
                for (_, ty) in &s.fields {
                    total += ty.fixed_byte_len()?;
                }
                Some(total)
            }
            Type::Function(_) => None,
            Type::Failure(_) => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => write!(f, "bool"),
            Type::Uint(b) => write!(f, "uint{b}"),
            Type::Int(b) => write!(f, "int{b}"),
            Type::Address => write!(f, "address"),
            Type::Bytes(Some(n)) => write!(f, "bytes{n}"),
            Type::Bytes(None) => write!(f, "bytes"),
            Type::String => write!(f, "string"),
            Type::Array(elem, Some(n)) => write!(f, "array<{elem}, {n}>"),
            Type::Array(elem, None) => write!(f, "array<{elem}>"),
            Type::Mapping(k, v) => write!(f, "mapping<{k},{v}>"),
            Type::Struct(s) => write!(f, "{}", s.name),
            Type::Function(func) => write!(f, "fn {}(...)", func.name),
            Type::Failure(reason) => write!(f, "<error: {reason}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_unifies_with_anything() {
        let f = Type::failure("undefined variable");
        assert!(f.compatible(&Type::Bool));
        assert!(Type::Bool.compatible(&f));
        assert!(f.compatible(&Type::Address));
    }

    #[test]
    fn same_signedness_numerics_are_compatible() {
        assert!(Type::Uint(8).compatible(&Type::Uint(256)));
        assert!(!Type::Uint(8).compatible(&Type::Int(8)));
    }

    #[test]
    fn common_type_widens() {
        assert_eq!(
            Type::Uint(8).common_type(&Type::Uint(256)),
            Some(Type::Uint(256))
        );
        assert_eq!(Type::Uint(8).common_type(&Type::Int(8)), None);
    }

    #[test]
    fn struct_fixed_len_is_one_slot_per_field() {
        let s = Type::Struct(StructType {
            name: "Point".into(),
            fields: vec![("x".into(), Type::Uint(256)), ("y".into(), Type::Uint(256))],
        });
        assert_eq!(s.fixed_byte_len(), Some(64));
    }
}
