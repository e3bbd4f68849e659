#![allow(clippy::unwrap_used, clippy::expect_used)]

use pretty_assertions::assert_eq;

use super::*;
use crate::feed_fetch::{set_feed_item, set_feed_variable, set_fetch_variable, FETCH_VAR};
use crate::tensor::DenseTensor;
use crate::variable::{FeedItem, PayloadKind};
use tessel_ir::dialect::TensorDialect;
use tessel_ir::{Builder, Float32Type, OpInfo, OpSignature, OperationArgument, Type};

// Fixtures

fn context() -> IrContext {
    let ctx = IrContext::new();
    ctx.register_dialect(&TensorDialect).unwrap();
    ctx
}

fn tensor_ty(ctx: &IrContext, dims: &[i64]) -> Type {
    DenseTensorType::get(ctx, Float32Type::get(ctx), dims)
}

fn full(builder: &mut Builder<'_>, persistable: bool) -> ValueId {
    let f32_ty = builder.float32_type();
    tensor::full(builder, f32_ty, &[2], 0.0, persistable).unwrap()
}

/// Result of binding the entry block into a fresh transient scope.
struct Bound {
    scopes: ScopeTree,
    scope: ScopeId,
    tables: BindingTables,
}

impl Bound {
    fn name(&self, value: ValueId) -> &str {
        self.tables.value_name(value).unwrap()
    }

    fn var(&self, value: ValueId) -> VarId {
        self.scopes.find(self.scope, self.name(value)).unwrap()
    }

    fn names_in_order(&self) -> Vec<String> {
        self.tables
            .variables()
            .iter()
            .map(|&var| self.tables.variable_name(var).unwrap().to_owned())
            .collect()
    }
}

fn bind_with(
    ctx: &IrContext,
    program: &Program,
    config: &BindConfig,
    mut scopes: ScopeTree,
) -> Result<Bound, BindError> {
    let scope = scopes.new_scope(scopes.root()).unwrap();
    let mut tables = BindingTables::new();
    build_scope(
        ctx,
        program,
        program.entry_block(),
        &mut scopes,
        scope,
        &mut tables,
        config,
    )?;
    Ok(Bound {
        scopes,
        scope,
        tables,
    })
}

fn bind(ctx: &IrContext, program: &Program) -> Result<Bound, BindError> {
    bind_with(ctx, program, &BindConfig::default(), ScopeTree::new())
}

// Classification

#[test]
fn classify_special_forms() {
    assert_eq!(BindRule::classify("pd.feed"), BindRule::Feed);
    assert_eq!(BindRule::classify("pd.fetch"), BindRule::Fetch);
    assert_eq!(BindRule::classify("builtin.combine"), BindRule::Combine);
    assert_eq!(BindRule::classify("builtin.set_parameter"), BindRule::SetParameter);
    assert_eq!(BindRule::classify("builtin.get_parameter"), BindRule::GetParameter);
    assert_eq!(BindRule::classify("builtin.slice"), BindRule::Slice);
    assert_eq!(BindRule::classify("pd.relu"), BindRule::Regular);
    assert!(BindRule::Slice.is_special());
    assert!(!BindRule::Regular.is_special());
}

// Default binding

#[test]
fn results_get_sequential_names() {
    let ctx = context();
    let mut program = Program::new();
    let (w, r, s) = {
        let mut b = Builder::new(&ctx, &mut program);
        let w = full(&mut b, false);
        let r = tensor::relu(&mut b, w).unwrap();
        let s = tensor::add(&mut b, w, r).unwrap();
        (w, r, s)
    };

    let bound = bind(&ctx, &program).unwrap();
    assert_eq!(bound.name(w), "inner_var_0");
    assert_eq!(bound.name(r), "inner_var_1");
    assert_eq!(bound.name(s), "inner_var_2");
    assert_eq!(bound.tables.len(), 3);
    assert_eq!(bound.tables.ordinal("inner_var_2"), Some(2));
    assert_eq!(bound.tables.verify(&bound.scopes, bound.scope), Ok(()));

    for value in [w, r, s] {
        let var = bound.var(value);
        assert_eq!(bound.scopes.scope_of(var), Some(bound.scope));
        assert_eq!(bound.scopes.var(var).unwrap().kind(), PayloadKind::DenseTensor);
    }
}

#[test]
fn custom_prefix() {
    let ctx = context();
    let mut program = Program::new();
    let w = full(&mut Builder::new(&ctx, &mut program), false);

    let config = BindConfig::default().with_var_prefix("tmp_");
    let bound = bind_with(&ctx, &program, &config, ScopeTree::new()).unwrap();
    assert_eq!(bound.name(w), "tmp_0");
}

#[test]
fn untyped_result_defaults_to_dense_tensor() {
    let ctx = context();
    ctx.register_op(OpInfo::new("test.untyped")).unwrap();
    let mut program = Program::new();
    let value = Builder::new(&ctx, &mut program)
        .create_value(OperationArgument::new("test.untyped").untyped_result())
        .unwrap();

    let bound = bind(&ctx, &program).unwrap();
    let var = bound.var(value);
    assert!(bound.scopes.var(var).unwrap().dense_tensor().is_ok());
}

#[test]
fn persistable_results_live_in_root() {
    let ctx = context();
    let mut program = Program::new();
    let (w, r) = {
        let mut b = Builder::new(&ctx, &mut program);
        let w = full(&mut b, true);
        let r = tensor::relu(&mut b, w).unwrap();
        (w, r)
    };

    let bound = bind(&ctx, &program).unwrap();
    let root = bound.scopes.root();
    assert_eq!(bound.scopes.scope_of(bound.var(w)), Some(root));
    assert_eq!(bound.scopes.scope_of(bound.var(r)), Some(bound.scope));

    let config = BindConfig::default().with_force_persistable(true);
    let forced = bind_with(&ctx, &program, &config, ScopeTree::new()).unwrap();
    assert_eq!(forced.scopes.scope_of(forced.var(r)), Some(root));
}

#[test]
fn vector_results_get_one_variable_per_element() {
    let ctx = context();
    let mut program = Program::new();
    let (x, parts, second) = {
        let mut b = Builder::new(&ctx, &mut program);
        let f32_ty = b.float32_type();
        let x = tensor::full(&mut b, f32_ty, &[4, 2], 1.0, false).unwrap();
        let parts = tensor::split(&mut b, x, 2, 0).unwrap();
        let second = builtin::slice(&mut b, parts, 1).unwrap();
        (x, parts, second)
    };

    let bound = bind(&ctx, &program).unwrap();
    assert_eq!(bound.name(x), "inner_var_0");
    assert_eq!(bound.name(parts), "inner_var_1");
    assert_eq!(bound.name(second), "inner_var_3");
    assert_eq!(
        bound.names_in_order(),
        vec!["inner_var_0", "inner_var_1", "inner_var_2", "inner_var_3"]
    );

    let list = bound.scopes.var(bound.var(parts)).unwrap().ref_array().unwrap();
    assert_eq!(list.len(), 2);
    for &element in list {
        assert!(bound.scopes.var(element).unwrap().dense_tensor().is_ok());
        assert_eq!(bound.scopes.scope_of(element), Some(bound.scope));
    }
    assert_eq!(bound.tables.verify(&bound.scopes, bound.scope), Ok(()));
}

#[test]
fn scalar_result_is_unsupported() {
    let ctx = context();
    ctx.register_op(OpInfo::new("test.scalar")).unwrap();
    let mut program = Program::new();
    {
        let mut b = Builder::new(&ctx, &mut program);
        let f32_ty = b.float32_type();
        b.create(OperationArgument::new("test.scalar").result(f32_ty))
            .unwrap();
    }

    assert_eq!(
        bind(&ctx, &program).err(),
        Some(BindError::UnsupportedOutputType {
            op: "test.scalar".to_owned(),
            ty: "f32".to_owned(),
        })
    );
}

#[test]
fn nested_list_of_non_tensors_is_unsupported() {
    let ctx = context();
    ctx.register_op(OpInfo::new("test.pack")).unwrap();
    let mut program = Program::new();
    {
        let mut b = Builder::new(&ctx, &mut program);
        let tensor = tensor_ty(&ctx, &[1]);
        let inner = b.vec_type(vec![tensor.clone()]);
        let ty = b.vec_type(vec![tensor, inner]);
        b.create(OperationArgument::new("test.pack").result(ty)).unwrap();
    }

    assert_eq!(
        bind(&ctx, &program).err(),
        Some(BindError::UnsupportedNestedList {
            op: "test.pack".to_owned(),
            index: 1,
            ty: "vec[tensor<1xf32>]".to_owned(),
        })
    );
}

#[test]
fn operand_from_another_block_is_unbound() {
    let ctx = context();
    let mut program = Program::new();
    {
        let mut b = Builder::new(&ctx, &mut program);
        let other = b.new_block();
        b.set_insertion_point_to_end(other).unwrap();
        let x = full(&mut b, false);
        b.set_insertion_point_to_end(BlockId::new(0)).unwrap();
        tensor::relu(&mut b, x).unwrap();
    }

    assert_eq!(
        bind(&ctx, &program).err(),
        Some(BindError::UnboundOperand {
            op: "pd.relu".to_owned(),
            index: 0,
        })
    );
}

#[test]
fn rebinding_a_block_reuses_variables() {
    let ctx = context();
    let mut program = Program::new();
    let list = {
        let mut b = Builder::new(&ctx, &mut program);
        let a = full(&mut b, false);
        let c = full(&mut b, false);
        builtin::combine(&mut b, &[a, c]).unwrap()
    };

    let mut bound = bind(&ctx, &program).unwrap();
    build_scope(
        &ctx,
        &program,
        program.entry_block(),
        &mut bound.scopes,
        bound.scope,
        &mut bound.tables,
        &BindConfig::default(),
    )
    .unwrap();

    assert_eq!(bound.tables.len(), 3);
    let members = bound.scopes.var(bound.var(list)).unwrap().ref_array().unwrap();
    assert_eq!(members.len(), 2);
}

#[test]
fn vector_results_rebound_over_a_shared_root() {
    let ctx = context();
    let mut program = Program::new();
    let (x, parts, first_part, out) = {
        let mut b = Builder::new(&ctx, &mut program);
        let f32_ty = b.float32_type();
        let x = tensor::full(&mut b, f32_ty, &[4, 2], 1.0, false).unwrap();
        let parts = tensor::split(&mut b, x, 2, 0).unwrap();
        let first_part = builtin::slice(&mut b, parts, 0).unwrap();
        let out = tensor::relu(&mut b, x).unwrap();
        (x, parts, first_part, out)
    };
    let config = BindConfig::default().with_force_persistable(true);

    let first = bind_with(&ctx, &program, &config, ScopeTree::new()).unwrap();
    let first_names = first.names_in_order();
    let mut scopes = first.scopes;
    scopes.drop_scope(first.scope).unwrap();

    let second = bind_with(&ctx, &program, &config, scopes).unwrap();
    assert_eq!(second.names_in_order(), first_names);
    assert_eq!(second.name(x), "inner_var_0");
    assert_eq!(second.name(first_part), "inner_var_2");
    assert_eq!(second.name(out), "inner_var_4");

    let elements = second
        .scopes
        .var(second.var(parts))
        .unwrap()
        .ref_array()
        .unwrap()
        .clone();
    assert_eq!(elements.len(), 2);
    assert!(!elements.contains(&second.var(out)));
    for element in elements {
        assert!(second.tables.variable_name(element).is_some());
    }
    assert_eq!(second.tables.verify(&second.scopes, second.scope), Ok(()));
}

#[test]
fn rebinding_a_vector_result_keeps_its_elements() {
    let ctx = context();
    let mut program = Program::new();
    let parts = {
        let mut b = Builder::new(&ctx, &mut program);
        let f32_ty = b.float32_type();
        let x = tensor::full(&mut b, f32_ty, &[4, 2], 1.0, false).unwrap();
        tensor::split(&mut b, x, 2, 0).unwrap()
    };

    let mut bound = bind(&ctx, &program).unwrap();
    let before = bound.scopes.var(bound.var(parts)).unwrap().ref_array().unwrap().clone();
    build_scope(
        &ctx,
        &program,
        program.entry_block(),
        &mut bound.scopes,
        bound.scope,
        &mut bound.tables,
        &BindConfig::default(),
    )
    .unwrap();

    assert_eq!(bound.tables.len(), 4);
    let after = bound.scopes.var(bound.var(parts)).unwrap().ref_array().unwrap();
    assert_eq!(after, &before);
}

// In-place binding

#[test]
fn inplace_results_alias_their_input() {
    let ctx = context();
    let mut program = Program::new();
    let (x, y, z, other, sum) = {
        let mut b = Builder::new(&ctx, &mut program);
        let x = full(&mut b, false);
        let y = tensor::relu_(&mut b, x).unwrap();
        let z = tensor::scale_(&mut b, y, 2.0, 1.0).unwrap();
        let other = full(&mut b, false);
        let sum = tensor::add_(&mut b, other, z).unwrap();
        (x, y, z, other, sum)
    };

    let bound = bind(&ctx, &program).unwrap();
    assert_eq!(bound.name(y), bound.name(x));
    assert_eq!(bound.name(z), bound.name(x));
    assert_eq!(bound.name(sum), bound.name(other));
    assert_eq!(bound.tables.len(), 2);
}

#[test]
fn inplace_non_aliased_output_gets_default_binding() {
    let ctx = context();
    ctx.register_op(OpInfo::with_signature(
        "test.norm_",
        OpSignature::new()
            .input("x")
            .output("out")
            .output("stat")
            .inplace("out", "x"),
    ))
    .unwrap();
    let mut program = Program::new();
    let (x, op) = {
        let mut b = Builder::new(&ctx, &mut program);
        let x = full(&mut b, false);
        let ty = tensor_ty(&ctx, &[2]);
        let flag = b.bool_attr(true);
        let op = b
            .create(
                OperationArgument::new("test.norm_")
                    .operand(x)
                    .result(ty.clone())
                    .result(ty)
                    .attribute(names::IS_INPLACE, flag),
            )
            .unwrap();
        (x, op)
    };

    let bound = bind(&ctx, &program).unwrap();
    let results = program.op(op).results();
    assert_eq!(bound.name(results[0]), bound.name(x));
    assert_eq!(bound.name(results[1]), "inner_var_1");
}

fn inplace_op(ctx: &IrContext, program: &mut Program, name: &str, op_name: Option<&str>) {
    let mut b = Builder::new(ctx, program);
    let x = full(&mut b, false);
    let ty = tensor_ty(ctx, &[2]);
    let mut argument = OperationArgument::new(name)
        .operand(x)
        .result(ty)
        .attribute(names::IS_INPLACE, b.bool_attr(true));
    if let Some(op_name) = op_name {
        argument = argument.attribute(names::OP_NAME, b.str_attr(op_name));
    }
    b.create(argument).unwrap();
}

#[test]
fn inplace_metadata_failures() {
    let ctx = context();
    ctx.register_op(OpInfo::new("test.nosig")).unwrap();
    ctx.register_op(OpInfo::with_signature(
        "test.short",
        OpSignature::new().input("x"),
    ))
    .unwrap();
    ctx.register_op(OpInfo::with_signature(
        "test.dangling",
        OpSignature::new().input("x").output("out").inplace("out", "y"),
    ))
    .unwrap();

    let mut program = Program::new();
    inplace_op(&ctx, &mut program, "pd.relu_", Some("test.ghost"));
    assert_eq!(
        bind(&ctx, &program).err(),
        Some(BindError::UnregisteredOp {
            op: "test.ghost".to_owned()
        })
    );

    let mut program = Program::new();
    inplace_op(&ctx, &mut program, "test.nosig", None);
    assert_eq!(
        bind(&ctx, &program).err(),
        Some(BindError::MissingSignature {
            op: "test.nosig".to_owned()
        })
    );

    let mut program = Program::new();
    inplace_op(&ctx, &mut program, "test.short", None);
    assert_eq!(
        bind(&ctx, &program).err(),
        Some(BindError::MissingOutputInfo {
            op: "test.short".to_owned(),
            index: 0,
        })
    );

    let mut program = Program::new();
    inplace_op(&ctx, &mut program, "test.dangling", None);
    assert_eq!(
        bind(&ctx, &program).err(),
        Some(BindError::UnknownInplaceInput {
            op: "test.dangling".to_owned(),
            output: "out".to_owned(),
            input: "y".to_owned(),
        })
    );
}

// Special forms

#[test]
fn slice_aliases_combined_element() {
    let ctx = context();
    let mut program = Program::new();
    let (a, b_value, c, list, sliced) = {
        let mut b = Builder::new(&ctx, &mut program);
        let a = full(&mut b, false);
        let b_value = full(&mut b, false);
        let c = full(&mut b, false);
        let list = builtin::combine(&mut b, &[a, b_value, c]).unwrap();
        let sliced = builtin::slice(&mut b, list, 1).unwrap();
        (a, b_value, c, list, sliced)
    };

    let bound = bind(&ctx, &program).unwrap();
    assert_eq!(bound.name(sliced), bound.name(b_value));
    assert_eq!(bound.name(list), "inner_var_3");
    assert_eq!(
        bound.scopes.var(bound.var(list)).unwrap().ref_array().unwrap(),
        &vec![bound.var(a), bound.var(b_value), bound.var(c)]
    );
    assert_eq!(bound.tables.len(), 4);
}

#[test]
fn slice_out_of_range() {
    let ctx = context();
    for index in [3, -1] {
        let mut program = Program::new();
        {
            let mut b = Builder::new(&ctx, &mut program);
            let values = [full(&mut b, false), full(&mut b, false), full(&mut b, false)];
            let list = builtin::combine(&mut b, &values).unwrap();
            builtin::slice(&mut b, list, index).unwrap();
        }
        assert_eq!(
            bind(&ctx, &program).err(),
            Some(BindError::SliceOutOfRange {
                op: "builtin.slice".to_owned(),
                index,
                len: 3,
            })
        );
    }
}

#[test]
fn slice_of_foreign_variable_is_unresolved() {
    let ctx = context();
    let mut program = Program::new();
    {
        let mut b = Builder::new(&ctx, &mut program);
        let w = builtin::get_parameter(&mut b, "w", tensor_ty(&ctx, &[2])).unwrap();
        let list = builtin::combine(&mut b, &[w]).unwrap();
        builtin::slice(&mut b, list, 0).unwrap();
    }

    let mut scopes = ScopeTree::new();
    scopes.create(scopes.root(), "w").unwrap();
    assert_eq!(
        bind_with(&ctx, &program, &BindConfig::default(), scopes).err(),
        Some(BindError::UnresolvedSliceElement {
            op: "builtin.slice".to_owned(),
            index: 0,
        })
    );
}

#[test]
fn combine_requires_bound_operands() {
    let ctx = context();
    let mut program = Program::new();
    {
        let mut b = Builder::new(&ctx, &mut program);
        let other = b.new_block();
        b.set_insertion_point_to_end(other).unwrap();
        let x = full(&mut b, false);
        b.set_insertion_point_to_end(BlockId::new(0)).unwrap();
        builtin::combine(&mut b, &[x]).unwrap();
    }

    assert_eq!(
        bind(&ctx, &program).err(),
        Some(BindError::UnboundOperand {
            op: "builtin.combine".to_owned(),
            index: 0,
        })
    );
}

#[test]
fn feed_shares_data_with_feed_column() {
    let ctx = context();
    let mut program = Program::new();
    let ty = tensor_ty(&ctx, &[3]);
    let x = tensor::feed(&mut Builder::new(&ctx, &mut program), "x", 2, ty).unwrap();

    let mut source = DenseTensor::from_f32(&[3], &[1.0, 2.0, 3.0]);
    source.set_lod(vec![vec![0, 1, 3]]);
    let mut scopes = ScopeTree::new();
    set_feed_variable(&mut scopes, source.clone(), 2).unwrap();

    let bound = bind_with(&ctx, &program, &BindConfig::default(), scopes).unwrap();
    assert_eq!(bound.name(x), "inner_var_0");
    let var = bound.var(x);
    assert_eq!(bound.scopes.scope_of(var), Some(bound.scope));

    let fed = bound.scopes.var(var).unwrap().dense_tensor().unwrap();
    assert!(fed.shares_data_with(&source));
    assert_eq!(fed.lod(), source.lod());
    assert_eq!(fed.dims(), source.dims());

    source.write_f32(0, 9.0).unwrap();
    assert_eq!(fed.to_f32_vec().unwrap(), vec![9.0, 2.0, 3.0]);
}

#[test]
fn feed_rerun_with_same_tables_reads_new_data() {
    let ctx = context();
    let mut program = Program::new();
    let x = {
        let mut b = Builder::new(&ctx, &mut program);
        let x = tensor::feed(&mut b, "x", 0, tensor_ty(&ctx, &[1])).unwrap();
        tensor::relu(&mut b, x).unwrap();
        x
    };

    let mut scopes = ScopeTree::new();
    set_feed_variable(&mut scopes, DenseTensor::from_f32(&[1], &[1.0]), 0).unwrap();
    let mut bound = bind_with(&ctx, &program, &BindConfig::default(), scopes).unwrap();
    let fed = bound.var(x);

    let fresh = DenseTensor::from_f32(&[1], &[2.0]);
    set_feed_variable(&mut bound.scopes, fresh.clone(), 0).unwrap();
    build_scope(
        &ctx,
        &program,
        program.entry_block(),
        &mut bound.scopes,
        bound.scope,
        &mut bound.tables,
        &BindConfig::default(),
    )
    .unwrap();

    assert_eq!(bound.name(x), "inner_var_0");
    assert_eq!(bound.var(x), fed);
    assert_eq!(bound.tables.len(), 2);
    // feed, x and the relu result
    assert_eq!(bound.scopes.num_vars(), 3);
    let tensor = bound.scopes.var(fed).unwrap().dense_tensor().unwrap();
    assert!(tensor.shares_data_with(&fresh));
    assert_eq!(tensor.to_f32_vec().unwrap(), vec![2.0]);
}

#[test]
fn feed_failures() {
    let ctx = context();
    let feed_program = |col: i32| {
        let mut program = Program::new();
        let ty = tensor_ty(&ctx, &[1]);
        tensor::feed(&mut Builder::new(&ctx, &mut program), "x", col, ty).unwrap();
        program
    };
    let config = BindConfig::default();

    assert_eq!(
        bind(&ctx, &feed_program(0)).err(),
        Some(BindError::FeedMissing)
    );

    let mut scopes = ScopeTree::new();
    set_feed_variable(&mut scopes, DenseTensor::from_f32(&[1], &[0.0]), 0).unwrap();
    assert_eq!(
        bind_with(&ctx, &feed_program(3), &config, scopes).err(),
        Some(BindError::FeedColumnOutOfRange { col: 3, len: 1 })
    );

    let mut scopes = ScopeTree::new();
    set_feed_item(&mut scopes, FeedItem::Strings(vec!["a".to_owned()]), 0).unwrap();
    assert_eq!(
        bind_with(&ctx, &feed_program(0), &config, scopes).err(),
        Some(BindError::FeedItemNotTensor { col: 0 })
    );

    assert_eq!(
        bind(&ctx, &feed_program(-1)).err(),
        Some(BindError::InvalidColumn {
            op: "pd.feed".to_owned(),
            col: -1,
        })
    );
}

#[test]
fn fetch_reserves_slots_and_never_shrinks() {
    let ctx = context();
    let mut program = Program::new();
    {
        let mut b = Builder::new(&ctx, &mut program);
        let x = full(&mut b, false);
        tensor::fetch(&mut b, x, "x", 3).unwrap();
        tensor::fetch(&mut b, x, "x", 1).unwrap();
    }

    let bound = bind(&ctx, &program).unwrap();
    let root = bound.scopes.root();
    let fetch = bound.scopes.find_local(root, FETCH_VAR).unwrap();
    assert_eq!(bound.scopes.var(fetch).unwrap().fetch_list().unwrap().len(), 4);

    let mut scopes = ScopeTree::new();
    set_fetch_variable(&mut scopes, DenseTensor::from_f32(&[1], &[5.0]), 5).unwrap();
    let bound = bind_with(&ctx, &program, &BindConfig::default(), scopes).unwrap();
    let fetch = bound.scopes.find_local(root, FETCH_VAR).unwrap();
    let slots = bound.scopes.var(fetch).unwrap().fetch_list().unwrap();
    assert_eq!(slots.len(), 6);
    assert!(slots[5].is_some());
}

#[test]
fn set_parameter_renames_once() {
    let ctx = context();
    let mut program = Program::new();
    let (w1, w2) = {
        let mut b = Builder::new(&ctx, &mut program);
        let w1 = full(&mut b, false);
        builtin::set_parameter(&mut b, w1, "w").unwrap();
        let w2 = full(&mut b, false);
        builtin::set_parameter(&mut b, w2, "w").unwrap();
        (w1, w2)
    };

    let bound = bind(&ctx, &program).unwrap();
    let root = bound.scopes.root();
    assert_eq!(bound.scopes.local_names(root).unwrap(), vec!["w"]);
    let published = bound.scopes.find_local(root, "w").unwrap();
    assert_eq!(bound.tables.variables()[0], published);

    assert_eq!(bound.name(w1), "w");
    assert_eq!(bound.name(w2), "w");
    assert_eq!(bound.tables.variable_name(published), Some("w"));
    assert_eq!(bound.tables.ordinal("w"), Some(0));
    assert_eq!(bound.tables.ordinal("inner_var_0"), None);
    assert_eq!(bound.tables.ordinal("inner_var_1"), Some(1));
    assert!(bound.scopes.find_local(bound.scope, "inner_var_1").is_some());
    assert_eq!(bound.tables.verify(&bound.scopes, bound.scope), Ok(()));
}

#[test]
fn set_parameter_is_idempotent_across_runs() {
    let ctx = context();
    let mut program = Program::new();
    let w = {
        let mut b = Builder::new(&ctx, &mut program);
        let w = full(&mut b, false);
        builtin::set_parameter(&mut b, w, "w").unwrap();
        w
    };

    let first = bind(&ctx, &program).unwrap();
    let published = first.scopes.find_local(first.scopes.root(), "w").unwrap();
    let mut scopes = first.scopes;
    scopes.drop_scope(first.scope).unwrap();

    let second = bind_with(&ctx, &program, &BindConfig::default(), scopes).unwrap();
    let root = second.scopes.root();
    assert_eq!(second.scopes.local_names(root).unwrap(), vec!["w"]);
    assert_eq!(second.scopes.find_local(root, "w"), Some(published));
    assert_eq!(second.name(w), "w");
    assert!(second.scopes.find_local(second.scope, "inner_var_0").is_some());
}

#[test]
fn get_parameter_binds_without_creating() {
    let ctx = context();
    let mut program = Program::new();
    let (p, r) = {
        let mut b = Builder::new(&ctx, &mut program);
        let p = builtin::get_parameter(&mut b, "w", tensor_ty(&ctx, &[2])).unwrap();
        let r = tensor::relu(&mut b, p).unwrap();
        (p, r)
    };

    let mut scopes = ScopeTree::new();
    let w = scopes.create(scopes.root(), "w").unwrap();
    let bound = bind_with(&ctx, &program, &BindConfig::default(), scopes).unwrap();
    assert_eq!(bound.name(p), "w");
    assert_eq!(bound.var(p), w);
    assert_eq!(bound.name(r), "inner_var_0");
    assert_eq!(bound.tables.len(), 1);
    assert_eq!(bound.tables.verify(&bound.scopes, bound.scope), Ok(()));
}

#[test]
fn op_name_attribute_overrides_dispatch() {
    let ctx = context();
    ctx.register_op(OpInfo::new("test.reader")).unwrap();
    let mut program = Program::new();
    let x = {
        let mut b = Builder::new(&ctx, &mut program);
        let argument = OperationArgument::new("test.reader")
            .attribute(names::OP_NAME, b.str_attr(tensor::FEED))
            .attribute(names::COL, b.int32_attr(0))
            .result(tensor_ty(&ctx, &[1]));
        b.create_value(argument).unwrap()
    };

    let source = DenseTensor::from_f32(&[1], &[3.0]);
    let mut scopes = ScopeTree::new();
    set_feed_variable(&mut scopes, source.clone(), 0).unwrap();
    let bound = bind_with(&ctx, &program, &BindConfig::default(), scopes).unwrap();
    let fed = bound.scopes.var(bound.var(x)).unwrap().dense_tensor().unwrap();
    assert!(fed.shares_data_with(&source));
}

#[test]
fn malformed_attributes() {
    let ctx = context();
    ctx.register_op(OpInfo::new("test.node")).unwrap();

    let mut program = Program::new();
    {
        let mut b = Builder::new(&ctx, &mut program);
        let argument = OperationArgument::new("test.node")
            .attribute(names::OP_NAME, b.int32_attr(1));
        b.create(argument).unwrap();
    }
    assert!(matches!(
        bind(&ctx, &program).err(),
        Some(BindError::AttributeType { name: "op_name", .. })
    ));

    let mut program = Program::new();
    {
        let mut b = Builder::new(&ctx, &mut program);
        let argument = OperationArgument::new("test.node")
            .attribute(names::OP_NAME, b.str_attr(tensor::FETCH));
        b.create(argument).unwrap();
    }
    assert_eq!(
        bind(&ctx, &program).err(),
        Some(BindError::MissingAttribute {
            op: "pd.fetch".to_owned(),
            name: "col",
        })
    );
}

// Scope lifetime

#[test]
fn dropping_transient_scope_keeps_persistent_variables() {
    let ctx = context();
    let mut program = Program::new();
    let (kept, published, transient) = {
        let mut b = Builder::new(&ctx, &mut program);
        let kept = full(&mut b, true);
        let published = full(&mut b, false);
        builtin::set_parameter(&mut b, published, "w").unwrap();
        let transient = tensor::relu(&mut b, kept).unwrap();
        (kept, published, transient)
    };

    let bound = bind(&ctx, &program).unwrap();
    let (kept, published, transient) =
        (bound.var(kept), bound.var(published), bound.var(transient));
    let mut scopes = bound.scopes;
    scopes.drop_scope(bound.scope).unwrap();

    assert!(scopes.var(kept).is_ok());
    assert!(scopes.var(published).is_ok());
    assert!(scopes.var(transient).is_err());
}

// === Property tests ===

mod properties {
    use super::*;
    use proptest::prelude::*;
    use rustc_hash::FxHashSet;

    /// Build a block from a list of op choices applied to the running value.
    fn build(ctx: &IrContext, choices: &[u8]) -> Program {
        let mut program = Program::new();
        let mut b = Builder::new(ctx, &mut program);
        let first = full(&mut b, false);
        let mut last = first;
        for choice in choices {
            last = match choice % 6 {
                0 => tensor::relu(&mut b, last).unwrap(),
                1 => tensor::relu_(&mut b, last).unwrap(),
                2 => tensor::add(&mut b, last, first).unwrap(),
                3 => full(&mut b, true),
                4 => {
                    let list = builtin::combine(&mut b, &[first, last]).unwrap();
                    builtin::slice(&mut b, list, 1).unwrap()
                }
                _ => {
                    let parts = tensor::split(&mut b, last, 2, 0).unwrap();
                    builtin::slice(&mut b, parts, 0).unwrap()
                }
            };
        }
        tensor::fetch(&mut b, last, "out", 0).unwrap();
        program
    }

    proptest! {
        #[test]
        fn binding_is_deterministic(choices in proptest::collection::vec(any::<u8>(), 0..16)) {
            let ctx = context();
            let program = build(&ctx, &choices);
            let first = bind(&ctx, &program).unwrap();
            let second = bind(&ctx, &program).unwrap();

            prop_assert_eq!(first.names_in_order(), second.names_in_order());
            for index in 0..program.num_values() {
                let value = ValueId::new(u32::try_from(index).unwrap());
                prop_assert_eq!(first.tables.value_name(value), second.tables.value_name(value));
            }
        }

        #[test]
        fn rebinding_over_a_shared_root_is_deterministic(
            choices in proptest::collection::vec(any::<u8>(), 0..16),
            forced in any::<bool>(),
        ) {
            let ctx = context();
            let program = build(&ctx, &choices);
            let config = BindConfig::default().with_force_persistable(forced);
            let first = bind_with(&ctx, &program, &config, ScopeTree::new()).unwrap();
            let first_names = first.names_in_order();
            let mut scopes = first.scopes;
            scopes.drop_scope(first.scope).unwrap();

            let second = bind_with(&ctx, &program, &config, scopes).unwrap();
            prop_assert_eq!(&first_names, &second.names_in_order());
            for index in 0..program.num_values() {
                let value = ValueId::new(u32::try_from(index).unwrap());
                prop_assert_eq!(
                    first.tables.value_name(value),
                    second.tables.value_name(value)
                );
            }
            let distinct: FxHashSet<VarId> = second.tables.variables().iter().copied().collect();
            prop_assert_eq!(distinct.len(), second.tables.len());
            prop_assert_eq!(second.tables.verify(&second.scopes, second.scope), Ok(()));
        }

        #[test]
        fn tables_stay_consistent(choices in proptest::collection::vec(any::<u8>(), 0..16)) {
            let ctx = context();
            let program = build(&ctx, &choices);
            let bound = bind(&ctx, &program).unwrap();

            prop_assert_eq!(bound.tables.variables().len(), bound.tables.name_to_id().len());
            prop_assert_eq!(bound.tables.variables().len(), bound.tables.next_var_number());
            prop_assert_eq!(bound.tables.verify(&bound.scopes, bound.scope), Ok(()));
            prop_assert_eq!(bound.tables.value_to_name().len(), program.num_values());
        }
    }
}
