#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashSet;

use pretty_assertions::assert_eq;

use super::*;

#[test]
fn scalar_types_are_singletons() {
    let ctx = IrContext::new();
    assert_eq!(Float32Type::get(&ctx), Float32Type::get(&ctx));
    assert_ne!(Float32Type::get(&ctx), Float64Type::get(&ctx));
    assert_eq!(ctx.storage().instance_count::<Int64Type>(), Ok(1));
}

#[test]
fn scalar_types_from_different_contexts_differ() {
    let a = IrContext::new();
    let b = IrContext::new();
    assert_ne!(BoolType::get(&a), BoolType::get(&b));
}

#[test]
fn isa_and_dyn_cast() {
    let ctx = IrContext::new();
    let f32_ty = Float32Type::get(&ctx);
    assert!(f32_ty.isa::<Float32Type>());
    assert!(!f32_ty.isa::<Int32Type>());
    assert!(f32_ty.dyn_cast::<Float32Type>().is_some());
    assert!(f32_ty.dyn_cast::<VectorType>().is_none());
    assert!(is_scalar(&f32_ty));
}

#[test]
fn cast_reports_both_kinds() {
    let ctx = IrContext::new();
    let err = Int8Type::get(&ctx).cast::<VectorType>().unwrap_err();
    assert_eq!(err.expected, KindId::of::<VectorType>());
    assert_eq!(err.found, KindId::of::<Int8Type>());
    assert_eq!(err.to_string(), "cannot cast `Int8Type` to `VectorType`");
}

#[test]
fn vector_types_intern_structurally() {
    let ctx = IrContext::new();
    let f32_ty = Float32Type::get(&ctx);
    let i64_ty = Int64Type::get(&ctx);

    let a = VectorType::get(&ctx, vec![f32_ty.clone(), i64_ty.clone()]);
    let b = VectorType::get(&ctx, vec![f32_ty.clone(), i64_ty.clone()]);
    let c = VectorType::get(&ctx, vec![i64_ty, f32_ty]);

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(ctx.storage().instance_count::<VectorType>(), Ok(2));
    assert!(!is_scalar(&a));
}

#[test]
fn vector_accessors() {
    let ctx = IrContext::new();
    let f16_ty = Float16Type::get(&ctx);
    let ty = VectorType::get(&ctx, vec![f16_ty.clone(), f16_ty.clone()]);
    let vector = ty.cast::<VectorType>().unwrap();
    assert_eq!(vector.len(), 2);
    assert!(!vector.is_empty());
    assert_eq!(vector.element(1), Some(&f16_ty));
    assert_eq!(vector.element(2), None);

    let empty = VectorType::get(&ctx, Vec::new());
    assert!(empty.cast::<VectorType>().unwrap().is_empty());
}

#[test]
fn handles_hash_by_identity() {
    let ctx = IrContext::new();
    let set: HashSet<Type> = [
        UInt8Type::get(&ctx),
        UInt8Type::get(&ctx),
        Int16Type::get(&ctx),
        Int32Type::get(&ctx),
    ]
    .into_iter()
    .collect();
    assert_eq!(set.len(), 3);
}

#[test]
fn display_forms() {
    let ctx = IrContext::new();
    let ty = VectorType::get(&ctx, vec![BoolType::get(&ctx), Float64Type::get(&ctx)]);
    assert_eq!(ty.to_string(), "vec[bool, f64]");
    assert_eq!(format!("{:?}", Float32Type::get(&ctx)), "Type(f32)");
    assert_eq!(ty.kind().short_name(), "VectorType");
}
