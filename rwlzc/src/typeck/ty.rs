//! Resolved types and the type rules.
//!
//! Every rule here is a pure function of its operands; nothing touches the
//! symbol table. An operator rule returns `None` when the operands are
//! invalid, and the analyzer turns that into a diagnostic.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::ast::{BinOp, TypeName, TypeSpec, UnaryOp};
use serde::Serialize;

/// Base kinds a value can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseType {
    Int,
    Float,
    Bool,
    Char,
    String,
    Void,
    /// Unknown but accepted: the type of engine-provided values.
    Auto,
    /// Produced after a reported error; accepted everywhere so one mistake
    /// is reported once.
    Error,
}

impl BaseType {
    /// Base types a value of this type may be implicitly converted to.
    pub fn promotions(self) -> &'static [BaseType] {
        match self {
            BaseType::Int => &[BaseType::Float],
            BaseType::Float => &[BaseType::Int],
            BaseType::Char => &[BaseType::Int, BaseType::String],
            BaseType::Bool => &[BaseType::Int],
            _ => &[],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BaseType::Int => "int",
            BaseType::Float => "float",
            BaseType::Bool => "bool",
            BaseType::Char => "char",
            BaseType::String => "string",
            BaseType::Void => "void",
            BaseType::Auto => "auto",
            BaseType::Error => "error",
        }
    }
}

impl From<TypeName> for BaseType {
    fn from(name: TypeName) -> Self {
        match name {
            TypeName::Int => BaseType::Int,
            TypeName::Float => BaseType::Float,
            TypeName::Bool => BaseType::Bool,
            TypeName::Char => BaseType::Char,
            TypeName::String => BaseType::String,
            TypeName::Void => BaseType::Void,
            TypeName::Auto => BaseType::Auto,
        }
    }
}

/// A type as the analyzer sees it.
///
/// Equality and hashing ignore `is_const`: const-ness restricts assignment,
/// it does not make a different type.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ResolvedType {
    pub base: BaseType,
    pub is_array: bool,
    pub is_const: bool,
}

impl ResolvedType {
    pub const INT: ResolvedType = ResolvedType::scalar(BaseType::Int);
    pub const FLOAT: ResolvedType = ResolvedType::scalar(BaseType::Float);
    pub const BOOL: ResolvedType = ResolvedType::scalar(BaseType::Bool);
    pub const CHAR: ResolvedType = ResolvedType::scalar(BaseType::Char);
    pub const STRING: ResolvedType = ResolvedType::scalar(BaseType::String);
    pub const VOID: ResolvedType = ResolvedType::scalar(BaseType::Void);
    pub const AUTO: ResolvedType = ResolvedType::scalar(BaseType::Auto);
    pub const ERROR: ResolvedType = ResolvedType::scalar(BaseType::Error);

    pub const fn scalar(base: BaseType) -> Self {
        Self {
            base,
            is_array: false,
            is_const: false,
        }
    }

    pub const fn array(base: BaseType) -> Self {
        Self {
            base,
            is_array: true,
            is_const: false,
        }
    }

    /// Resolve a declared type spelling.
    pub fn from_spec(spec: &TypeSpec) -> Self {
        Self {
            base: spec.name.into(),
            is_array: spec.is_array,
            is_const: spec.is_const,
        }
    }

    pub fn with_const(mut self, is_const: bool) -> Self {
        self.is_const = is_const;
        self
    }

    /// The element type of an array, or `None` for scalars.
    pub fn element(self) -> Option<ResolvedType> {
        self.is_array.then(|| ResolvedType::scalar(self.base))
    }

    /// The array type whose elements have this type.
    pub fn array_of(self) -> ResolvedType {
        ResolvedType {
            base: self.base,
            is_array: true,
            is_const: self.is_const,
        }
    }

    pub fn is_error(self) -> bool {
        self.base == BaseType::Error
    }

    pub fn is_void(self) -> bool {
        self.base == BaseType::Void && !self.is_array
    }

    /// Whether errors about this type would only repeat an earlier one.
    pub fn is_permissive(self) -> bool {
        matches!(self.base, BaseType::Error | BaseType::Auto)
    }

    /// Non-array `int` or `float`.
    pub fn is_numeric(self) -> bool {
        !self.is_array && matches!(self.base, BaseType::Int | BaseType::Float)
    }

    pub fn is_integer(self) -> bool {
        !self.is_array && self.base == BaseType::Int
    }

    pub fn is_float(self) -> bool {
        !self.is_array && self.base == BaseType::Float
    }

    pub fn is_bool(self) -> bool {
        !self.is_array && self.base == BaseType::Bool
    }

    pub fn is_char(self) -> bool {
        !self.is_array && self.base == BaseType::Char
    }

    pub fn is_string(self) -> bool {
        !self.is_array && self.base == BaseType::String
    }

    /// Usable as a condition or a logical operand: bool, or numeric with
    /// zero meaning false.
    pub fn is_truthy(self) -> bool {
        self.is_bool() || self.is_numeric()
    }
}

impl PartialEq for ResolvedType {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base && self.is_array == other.is_array
    }
}

impl Eq for ResolvedType {}

impl Hash for ResolvedType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.base.hash(state);
        self.is_array.hash(state);
    }
}

/// `const int[]`
impl fmt::Display for ResolvedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_const {
            f.write_str("const ")?;
        }
        f.write_str(self.base.as_str())?;
        if self.is_array {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

// ============================================================
// Rules
// ============================================================

/// Whether a value of type `value` may be used where `expected` is required.
pub fn is_compatible(expected: ResolvedType, value: ResolvedType) -> bool {
    if expected.is_permissive() || value.is_permissive() {
        return true;
    }
    if expected == value {
        return true;
    }
    if expected.is_array || value.is_array {
        return false;
    }
    value.base.promotions().contains(&expected.base)
}

/// Result type of an arithmetic operator.
pub fn arithmetic_result(op: BinOp, left: ResolvedType, right: ResolvedType) -> Option<ResolvedType> {
    if left.is_array || right.is_array {
        return None;
    }

    if op == BinOp::Add
        && (left.is_string() || right.is_string() || (left.is_char() && right.is_char()))
    {
        return Some(ResolvedType::STRING);
    }

    if left.is_numeric() && right.is_numeric() {
        if left.is_float() || right.is_float() {
            return Some(ResolvedType::FLOAT);
        }
        return Some(ResolvedType::INT);
    }

    None
}

/// Result type of a comparison operator.
pub fn comparison_result(op: BinOp, left: ResolvedType, right: ResolvedType) -> Option<ResolvedType> {
    if left.is_array || right.is_array {
        return None;
    }

    let valid = if op.is_equality() {
        is_compatible(left, right) || is_compatible(right, left)
    } else {
        (left.is_numeric() && right.is_numeric())
            || (left.is_char() && right.is_char())
            || (left.is_string() && right.is_string())
    };
    valid.then_some(ResolvedType::BOOL)
}

/// Result type of `&&` and `||`.
pub fn logical_result(left: ResolvedType, right: ResolvedType) -> Option<ResolvedType> {
    (left.is_truthy() && right.is_truthy()).then_some(ResolvedType::BOOL)
}

/// Result type of a binary operator, dispatching on its class.
pub fn binary_result(op: BinOp, left: ResolvedType, right: ResolvedType) -> Option<ResolvedType> {
    if op.is_arithmetic() {
        arithmetic_result(op, left, right)
    } else if op.is_comparison() {
        comparison_result(op, left, right)
    } else {
        logical_result(left, right)
    }
}

/// Result type of a prefix operator.
pub fn unary_result(op: UnaryOp, operand: ResolvedType) -> Option<ResolvedType> {
    match op {
        UnaryOp::Not => operand.is_truthy().then_some(ResolvedType::BOOL),
        UnaryOp::Neg | UnaryOp::Plus => {
            operand.is_numeric().then(|| ResolvedType::scalar(operand.base))
        }
    }
}

/// Whether `++`/`--` apply to a value of this type.
pub fn supports_increment(ty: ResolvedType) -> bool {
    ty.is_numeric()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ALL: [ResolvedType; 8] = [
        ResolvedType::INT,
        ResolvedType::FLOAT,
        ResolvedType::BOOL,
        ResolvedType::CHAR,
        ResolvedType::STRING,
        ResolvedType::VOID,
        ResolvedType::AUTO,
        ResolvedType::ERROR,
    ];

    #[test]
    fn numeric_addition_promotes() {
        let add = |l, r| arithmetic_result(BinOp::Add, l, r);
        assert_eq!(add(ResolvedType::INT, ResolvedType::FLOAT), Some(ResolvedType::FLOAT));
        assert_eq!(add(ResolvedType::FLOAT, ResolvedType::INT), Some(ResolvedType::FLOAT));
        assert_eq!(add(ResolvedType::INT, ResolvedType::INT), Some(ResolvedType::INT));
    }

    #[test]
    fn concatenation_yields_string() {
        let add = |l, r| arithmetic_result(BinOp::Add, l, r);
        assert_eq!(add(ResolvedType::STRING, ResolvedType::CHAR), Some(ResolvedType::STRING));
        assert_eq!(add(ResolvedType::CHAR, ResolvedType::CHAR), Some(ResolvedType::STRING));
        assert_eq!(add(ResolvedType::INT, ResolvedType::STRING), Some(ResolvedType::STRING));
        assert_eq!(arithmetic_result(BinOp::Sub, ResolvedType::CHAR, ResolvedType::CHAR), None);
        assert_eq!(arithmetic_result(BinOp::Mul, ResolvedType::STRING, ResolvedType::INT), None);
    }

    #[test]
    fn arrays_never_take_part_in_arithmetic() {
        let xs = ResolvedType::array(BaseType::Int);
        assert_eq!(arithmetic_result(BinOp::Add, xs, ResolvedType::INT), None);
        assert_eq!(comparison_result(BinOp::Eq, xs, xs), None);
    }

    #[test]
    fn promotion_direction() {
        assert!(is_compatible(ResolvedType::FLOAT, ResolvedType::INT));
        assert!(is_compatible(ResolvedType::INT, ResolvedType::FLOAT));
        assert!(is_compatible(ResolvedType::INT, ResolvedType::CHAR));
        assert!(is_compatible(ResolvedType::STRING, ResolvedType::CHAR));
        assert!(is_compatible(ResolvedType::INT, ResolvedType::BOOL));
        assert!(!is_compatible(ResolvedType::CHAR, ResolvedType::STRING));
        assert!(!is_compatible(ResolvedType::BOOL, ResolvedType::INT));
        assert!(!is_compatible(ResolvedType::STRING, ResolvedType::INT));
    }

    #[test]
    fn arrays_match_exactly() {
        let ints = ResolvedType::array(BaseType::Int);
        let floats = ResolvedType::array(BaseType::Float);
        assert!(is_compatible(ints, ints));
        assert!(!is_compatible(floats, ints));
        assert!(!is_compatible(ResolvedType::INT, ints));
        assert!(!is_compatible(ints, ResolvedType::INT));
    }

    #[test]
    fn const_is_ignored_by_equality() {
        let a = ResolvedType::INT.with_const(true);
        assert_eq!(a, ResolvedType::INT);
        assert_eq!(a.to_string(), "const int");
        assert_eq!(ResolvedType::array(BaseType::Char).with_const(true).to_string(), "const char[]");
    }

    #[test]
    fn ordering_rules() {
        let lt = |l, r| comparison_result(BinOp::Lt, l, r);
        assert_eq!(lt(ResolvedType::INT, ResolvedType::FLOAT), Some(ResolvedType::BOOL));
        assert_eq!(lt(ResolvedType::CHAR, ResolvedType::CHAR), Some(ResolvedType::BOOL));
        assert_eq!(lt(ResolvedType::STRING, ResolvedType::STRING), Some(ResolvedType::BOOL));
        assert_eq!(lt(ResolvedType::CHAR, ResolvedType::INT), None);
        assert_eq!(lt(ResolvedType::BOOL, ResolvedType::BOOL), None);
    }

    #[test]
    fn equality_accepts_either_direction() {
        let eq = |l, r| comparison_result(BinOp::Eq, l, r);
        assert_eq!(eq(ResolvedType::STRING, ResolvedType::CHAR), Some(ResolvedType::BOOL));
        assert_eq!(eq(ResolvedType::CHAR, ResolvedType::STRING), Some(ResolvedType::BOOL));
        assert_eq!(eq(ResolvedType::STRING, ResolvedType::BOOL), None);
    }

    #[test]
    fn logical_and_not_accept_numbers() {
        assert_eq!(logical_result(ResolvedType::INT, ResolvedType::BOOL), Some(ResolvedType::BOOL));
        assert_eq!(unary_result(UnaryOp::Not, ResolvedType::FLOAT), Some(ResolvedType::BOOL));
        assert_eq!(logical_result(ResolvedType::STRING, ResolvedType::BOOL), None);
        assert_eq!(unary_result(UnaryOp::Not, ResolvedType::CHAR), None);
    }

    #[test]
    fn negation_and_increment_need_numbers() {
        assert_eq!(unary_result(UnaryOp::Neg, ResolvedType::FLOAT), Some(ResolvedType::FLOAT));
        assert_eq!(unary_result(UnaryOp::Plus, ResolvedType::BOOL), None);
        assert!(supports_increment(ResolvedType::INT));
        assert!(!supports_increment(ResolvedType::array(BaseType::Int)));
        assert!(!supports_increment(ResolvedType::CHAR));
    }

    fn arb_type() -> impl Strategy<Value = ResolvedType> {
        (prop::sample::select(ALL.to_vec()), any::<bool>(), any::<bool>()).prop_map(
            |(ty, is_array, is_const)| ResolvedType {
                is_array,
                is_const,
                ..ty
            },
        )
    }

    proptest! {
        #[test]
        fn prop_numeric_addition_is_symmetric(l in arb_type(), r in arb_type()) {
            prop_assume!(l.is_numeric() && r.is_numeric());
            prop_assert_eq!(
                arithmetic_result(BinOp::Add, l, r),
                arithmetic_result(BinOp::Add, r, l)
            );
        }

        #[test]
        fn prop_compatibility_is_reflexive(ty in arb_type()) {
            prop_assert!(is_compatible(ty, ty));
        }

        #[test]
        fn prop_error_is_compatible_with_everything(ty in arb_type()) {
            prop_assert!(is_compatible(ResolvedType::ERROR, ty));
            prop_assert!(is_compatible(ty, ResolvedType::ERROR));
        }

        #[test]
        fn prop_equality_is_symmetric(l in arb_type(), r in arb_type()) {
            prop_assert_eq!(
                comparison_result(BinOp::Eq, l, r),
                comparison_result(BinOp::Eq, r, l)
            );
        }

        #[test]
        fn prop_const_does_not_change_rules(l in arb_type(), r in arb_type()) {
            prop_assert_eq!(
                is_compatible(l, r),
                is_compatible(l.with_const(!l.is_const), r.with_const(!r.is_const))
            );
        }
    }
}
