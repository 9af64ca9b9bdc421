// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Tests for the pattern compiler: emitted shapes and stack discipline.

use super::*;
use crate::ast::{
    AssignmentElementItem, AssignmentProperty, AssignmentTarget, Binding, BindingElement,
    BindingElementItem, BindingProperty, FunctionExpression, FunctionKind, Identifier,
    MemberExpression, PropertyName,
};
use crate::compiler::bytecode::{EnvironmentHandle, OpCode, Operand};

use OpCode::*;

const LEXICAL: BindingMode = BindingMode::Direct(EnvironmentHandle::Lexical);

fn compile_binding(
    pattern: &BindingPattern,
    mode: BindingMode,
    options: CompileOptions,
) -> CompileResult<Bytecode> {
    let mut compiler = Compiler::with_options(options);
    compiler.compile_expression(&Expression::ident("value"))?;
    compiler.compile_binding_initialization(pattern, mode)?;
    compiler.finish()
}

fn binding_ok(pattern: &BindingPattern, mode: BindingMode) -> Bytecode {
    compile_binding(pattern, mode, CompileOptions::default()).expect("Compilation should succeed")
}

fn assignment_with(mut compiler: Compiler, pattern: &AssignmentPattern) -> Bytecode {
    compiler
        .compile_expression(&Expression::ident("value"))
        .unwrap();
    compiler
        .compile_destructuring_assignment(pattern)
        .expect("Compilation should succeed");
    compiler.finish().unwrap()
}

fn assignment_ok(pattern: &AssignmentPattern) -> Bytecode {
    assignment_with(Compiler::new(), pattern)
}

fn computed(name: &str) -> PropertyName {
    PropertyName::computed(Expression::ident(name))
}

// ============================================================================
// Object patterns
// ============================================================================

#[test]
fn test_compiler_default() {
    let compiler = Compiler::default();
    assert_eq!(compiler.emitter.stack().depth(), 0);
    assert_eq!(*compiler.options(), CompileOptions::default());
}

#[test]
fn test_shorthand_property() {
    let pattern = BindingPattern::object(vec![BindingProperty::shorthand("a")], None);
    assert_eq!(
        binding_ok(&pattern, LEXICAL).opcodes(),
        vec![
            LoadBinding,
            RequireObjectCoercible,
            Dup,
            GetV,
            CreateMutableBinding,
            InitializeBinding,
            Pop,
            Halt
        ]
    );
}

#[test]
fn test_empty_object_pattern_still_checks_coercible() {
    let pattern = BindingPattern::object(vec![], None);
    assert_eq!(
        binding_ok(&pattern, LEXICAL).opcodes(),
        vec![LoadBinding, RequireObjectCoercible, Pop, Halt]
    );
}

#[test]
fn test_rest_alone_needs_no_key_set() {
    let pattern = BindingPattern::object(vec![], Some("r"));
    let bytecode = binding_ok(&pattern, LEXICAL);
    assert_eq!(
        bytecode.opcodes(),
        vec![
            LoadBinding,
            RequireObjectCoercible,
            CopyDataProperties,
            CreateMutableBinding,
            InitializeBinding,
            Halt
        ]
    );
    assert_eq!(bytecode.instructions[2].operand, None);
    assert_eq!(bytecode.temporaries, 0);
}

#[test]
fn test_properties_without_rest_need_no_key_set() {
    let pattern = BindingPattern::object(
        vec![BindingProperty::shorthand("a"), BindingProperty::shorthand("b")],
        None,
    );
    let bytecode = binding_ok(&pattern, LEXICAL);
    assert_eq!(bytecode.count(NewKeySet), 0);
    assert_eq!(bytecode.count(RecordKey), 0);
}

#[test]
fn test_key_set_records_every_key_before_reading() {
    let pattern = BindingPattern::object(
        vec![
            BindingProperty::shorthand("a"),
            BindingProperty::new(computed("k"), Binding::ident("b"), None),
        ],
        Some("r"),
    );
    let bytecode = binding_ok(&pattern, LEXICAL);
    assert_eq!(
        bytecode.opcodes(),
        vec![
            LoadBinding,
            RequireObjectCoercible,
            NewKeySet,
            StoreLocal,
            Dup,
            RecordKey,
            GetV,
            CreateMutableBinding,
            InitializeBinding,
            Dup,
            LoadBinding,
            ToPropertyKey,
            RecordKey,
            GetV,
            CreateMutableBinding,
            InitializeBinding,
            CopyDataProperties,
            CreateMutableBinding,
            InitializeBinding,
            Halt
        ]
    );
    assert!(matches!(
        bytecode.instructions[5].operand,
        Some(Operand::KeyedLocal { slot: 0, .. })
    ));
    assert_eq!(bytecode.instructions[12].operand, Some(Operand::Local(0)));
    assert_eq!(bytecode.instructions[16].operand, Some(Operand::Local(0)));
}

#[test]
fn test_literal_key_resolves_reference_first() {
    let pattern = BindingPattern::object(vec![BindingProperty::shorthand("a")], None);
    assert_eq!(
        binding_ok(&pattern, BindingMode::Reference).opcodes(),
        vec![
            LoadBinding,
            RequireObjectCoercible,
            ResolveBinding,
            Over,
            GetV,
            PutValue,
            Pop,
            Halt
        ]
    );
}

#[test]
fn test_unoptimized_literal_key_resolves_after_key() {
    let pattern = BindingPattern::object(vec![BindingProperty::shorthand("a")], None);
    let bytecode = compile_binding(
        &pattern,
        BindingMode::Reference,
        CompileOptions::default().unoptimized(),
    )
    .unwrap();
    assert_eq!(
        bytecode.opcodes(),
        vec![
            LoadBinding,
            RequireObjectCoercible,
            Dup,
            ResolveBinding,
            Swap,
            GetV,
            PutValue,
            Pop,
            Halt
        ]
    );
}

#[test]
fn test_computed_key_parks_key_before_resolving() {
    let pattern = AssignmentPattern::object(
        vec![AssignmentProperty::new(
            computed("k"),
            AssignmentTarget::ident("a"),
            None,
        )],
        None,
    );
    let bytecode = assignment_ok(&pattern);
    assert_eq!(
        bytecode.opcodes(),
        vec![
            LoadBinding,
            RequireObjectCoercible,
            Dup,
            LoadBinding,
            ToPropertyKey,
            StoreLocal,
            ResolveBinding,
            Swap,
            LoadLocal,
            GetV,
            PutValue,
            Pop,
            Halt
        ]
    );
}

#[test]
fn test_computed_key_with_unobservable_local_is_hoisted() {
    let pattern = AssignmentPattern::object(
        vec![AssignmentProperty::new(
            computed("k"),
            AssignmentTarget::ident("a"),
            None,
        )],
        None,
    );
    let mut compiler = Compiler::new();
    compiler.scope.declare("a");
    let bytecode = assignment_with(compiler, &pattern);
    assert_eq!(
        bytecode.opcodes(),
        vec![
            LoadBinding,
            RequireObjectCoercible,
            ResolveBinding,
            Over,
            LoadBinding,
            ToPropertyKey,
            GetV,
            PutValue,
            Pop,
            Halt
        ]
    );
    assert_eq!(bytecode.temporaries, 0);
}

#[test]
fn test_dynamic_scope_blocks_hoisting() {
    let pattern = AssignmentPattern::object(
        vec![AssignmentProperty::new(
            computed("k"),
            AssignmentTarget::ident("a"),
            None,
        )],
        None,
    );
    let mut compiler = Compiler::new();
    compiler.scope.declare("a");
    compiler.scope.mark_dynamic();
    let bytecode = assignment_with(compiler, &pattern);
    let opcodes = bytecode.opcodes();
    let key = opcodes.iter().position(|op| *op == ToPropertyKey).unwrap();
    let resolve = opcodes.iter().position(|op| *op == ResolveBinding).unwrap();
    assert!(key < resolve);
}

#[test]
fn test_member_target_is_never_hoisted_past_computed_key() {
    let target = AssignmentTarget::Member(MemberExpression::named(Expression::ident("obj"), "p"));
    let pattern = AssignmentPattern::object(
        vec![AssignmentProperty::new(computed("k"), target, None)],
        None,
    );
    let opcodes = assignment_ok(&pattern).opcodes();
    let key = opcodes.iter().position(|op| *op == ToPropertyKey).unwrap();
    let reference = opcodes.iter().position(|op| *op == MakeReference).unwrap();
    assert!(key < reference);
}

#[test]
fn test_assignment_identifier_rest_copies_before_resolving() {
    let pattern = AssignmentPattern::object(
        vec![AssignmentProperty::shorthand("a")],
        Some(AssignmentTarget::ident("r")),
    );
    assert_eq!(
        assignment_ok(&pattern).opcodes(),
        vec![
            LoadBinding,
            RequireObjectCoercible,
            NewKeySet,
            StoreLocal,
            ResolveBinding,
            Over,
            RecordKey,
            GetV,
            PutValue,
            CopyDataProperties,
            ResolveBinding,
            Swap,
            PutValue,
            Halt
        ]
    );
}

#[test]
fn test_assignment_member_rest_resolves_before_copying() {
    let target = AssignmentTarget::Member(MemberExpression::named(Expression::ident("obj"), "r"));
    let pattern = AssignmentPattern::object(vec![], Some(target));
    assert_eq!(
        assignment_ok(&pattern).opcodes(),
        vec![
            LoadBinding,
            RequireObjectCoercible,
            LoadBinding,
            MakeReference,
            Swap,
            CopyDataProperties,
            PutValue,
            Halt
        ]
    );
}

// ============================================================================
// Array patterns
// ============================================================================

#[test]
fn test_plain_array_pattern_has_no_close_guard() {
    let pattern = BindingPattern::array(vec![
        BindingElementItem::ident("a"),
        BindingElementItem::ident("b"),
    ]);
    assert_eq!(
        binding_ok(&pattern, LEXICAL).opcodes(),
        vec![
            LoadBinding,
            GetIterator,
            StoreLocal,
            IteratorStep,
            CreateMutableBinding,
            InitializeBinding,
            IteratorStep,
            CreateMutableBinding,
            InitializeBinding,
            IteratorClose,
            Halt
        ]
    );
}

#[test]
fn test_unoptimized_array_pattern_is_guarded() {
    let pattern = BindingPattern::array(vec![BindingElementItem::ident("a")]);
    let bytecode =
        compile_binding(&pattern, LEXICAL, CompileOptions::default().unoptimized()).unwrap();
    assert_eq!(
        bytecode.opcodes(),
        vec![
            LoadBinding,
            GetIterator,
            StoreLocal,
            EnterTry,
            IteratorStep,
            CreateMutableBinding,
            InitializeBinding,
            LeaveTry,
            IteratorClose,
            Jump,
            IteratorCloseOnThrow,
            Rethrow,
            Halt
        ]
    );
    assert_eq!(bytecode.instructions[3].operand, Some(Operand::Jump(10)));
    assert_eq!(bytecode.instructions[9].operand, Some(Operand::Jump(12)));
}

#[test]
fn test_defaults_and_nested_patterns_need_a_guard() {
    let with_default = BindingPattern::array(vec![BindingElementItem::with_default(
        Binding::ident("a"),
        Expression::number(1.0),
    )]);
    assert_eq!(binding_ok(&with_default, LEXICAL).count(EnterTry), 1);

    let nested = BindingPattern::array(vec![BindingElementItem::Element(BindingElement::new(
        Binding::pattern(BindingPattern::object(vec![BindingProperty::shorthand("x")], None)),
        None,
    ))]);
    assert_eq!(binding_ok(&nested, LEXICAL).count(EnterTry), 1);

    let by_reference = BindingPattern::array(vec![BindingElementItem::ident("a")]);
    assert_eq!(
        binding_ok(&by_reference, BindingMode::Reference).count(EnterTry),
        1
    );
}

#[test]
fn test_rest_element_skips_close() {
    let pattern = BindingPattern::array(vec![
        BindingElementItem::ident("a"),
        BindingElementItem::Elision,
        BindingElementItem::rest(Binding::ident("r")),
    ]);
    assert_eq!(
        binding_ok(&pattern, LEXICAL).opcodes(),
        vec![
            LoadBinding,
            GetIterator,
            StoreLocal,
            IteratorStep,
            CreateMutableBinding,
            InitializeBinding,
            IteratorStep,
            Pop,
            IteratorDrain,
            CreateMutableBinding,
            InitializeBinding,
            Halt
        ]
    );
}

#[test]
fn test_guarded_rest_still_skips_normal_close() {
    let pattern = BindingPattern::array(vec![
        BindingElementItem::with_default(Binding::ident("a"), Expression::number(1.0)),
        BindingElementItem::rest(Binding::ident("r")),
    ]);
    let bytecode = binding_ok(&pattern, LEXICAL);
    assert_eq!(bytecode.count(IteratorClose), 0);
    assert_eq!(bytecode.count(IteratorCloseOnThrow), 1);
}

#[test]
fn test_rest_must_be_last() {
    let pattern = BindingPattern::array(vec![
        BindingElementItem::rest(Binding::ident("r")),
        BindingElementItem::ident("a"),
    ]);
    let err = compile_binding(&pattern, LEXICAL, CompileOptions::default()).unwrap_err();
    assert!(matches!(err, CompileError::MalformedPattern(_)));

    let assignment = AssignmentPattern::array(vec![
        AssignmentElementItem::Rest(AssignmentTarget::ident("r")),
        AssignmentElementItem::Elision,
    ]);
    let mut compiler = Compiler::new();
    compiler
        .compile_expression(&Expression::ident("value"))
        .unwrap();
    assert!(matches!(
        compiler.compile_destructuring_assignment(&assignment),
        Err(CompileError::MalformedPattern(_))
    ));
}

#[test]
fn test_member_reference_is_resolved_before_step() {
    let target = AssignmentTarget::Member(MemberExpression::named(Expression::ident("obj"), "p"));
    let pattern = AssignmentPattern::array(vec![AssignmentElementItem::target(target)]);
    assert_eq!(
        assignment_ok(&pattern).opcodes(),
        vec![
            LoadBinding,
            GetIterator,
            StoreLocal,
            EnterTry,
            LoadBinding,
            MakeReference,
            IteratorStep,
            PutValue,
            LeaveTry,
            IteratorClose,
            Jump,
            IteratorCloseOnThrow,
            Rethrow,
            Halt
        ]
    );
}

// ============================================================================
// Defaults and names
// ============================================================================

#[test]
fn test_default_jumps_over_initializer() {
    let pattern = BindingPattern::array(vec![BindingElementItem::with_default(
        Binding::ident("a"),
        Expression::number(10.0),
    )]);
    let bytecode = binding_ok(&pattern, LEXICAL);
    let jump = bytecode
        .instructions
        .iter()
        .position(|i| i.opcode == JumpIfNotUndefined)
        .unwrap();
    assert_eq!(bytecode.instructions[jump + 1].opcode, Pop);
    assert_eq!(bytecode.instructions[jump + 2].opcode, LoadConst);
    assert_eq!(
        bytecode.instructions[jump].operand,
        Some(Operand::Jump(jump as i32 + 3))
    );
}

#[test]
fn test_anonymous_function_default_takes_target_name() {
    let pattern = BindingPattern::array(vec![BindingElementItem::with_default(
        Binding::ident("f"),
        Expression::anonymous(FunctionKind::Arrow),
    )]);
    let bytecode = binding_ok(&pattern, LEXICAL);
    assert_eq!(bytecode.count(SetFunctionName), 1);
    let set = bytecode
        .instructions
        .iter()
        .find(|i| i.opcode == SetFunctionName)
        .unwrap();
    let Some(Operand::Constant(name)) = set.operand else {
        panic!("SetFunctionName without a name");
    };
    assert_eq!(bytecode.string(name), Some("f"));
}

#[test]
fn test_function_name_only_for_identifier_targets() {
    let named = Expression::Function(FunctionExpression {
        id: Some(Identifier::new("own")),
        kind: FunctionKind::Normal,
    });
    let named_default = BindingPattern::object(
        vec![BindingProperty::new(
            PropertyName::literal("f"),
            Binding::ident("f"),
            Some(named),
        )],
        None,
    );
    assert_eq!(binding_ok(&named_default, LEXICAL).count(SetFunctionName), 0);

    let pattern_target = BindingPattern::array(vec![BindingElementItem::with_default(
        Binding::pattern(BindingPattern::array(vec![])),
        Expression::anonymous(FunctionKind::Normal),
    )]);
    assert_eq!(binding_ok(&pattern_target, LEXICAL).count(SetFunctionName), 0);

    let member = AssignmentTarget::Member(MemberExpression::named(Expression::ident("obj"), "f"));
    let member_target = AssignmentPattern::array(vec![AssignmentElementItem::with_default(
        member,
        Expression::anonymous(FunctionKind::Class),
    )]);
    assert_eq!(assignment_ok(&member_target).count(SetFunctionName), 0);

    let identifier = AssignmentPattern::array(vec![AssignmentElementItem::with_default(
        AssignmentTarget::ident("g"),
        Expression::anonymous(FunctionKind::Class),
    )]);
    assert_eq!(assignment_ok(&identifier).count(SetFunctionName), 1);
}

// ============================================================================
// Parameters and stack discipline
// ============================================================================

#[test]
fn test_parameters_never_close_the_cursor() {
    let parameters = FormalParameters {
        items: vec![
            BindingElement::new(Binding::ident("a"), None),
            BindingElement::new(Binding::ident("b"), Some(Expression::number(2.0))),
        ],
        rest: Some(Binding::ident("rest")),
    };
    let mut compiler = Compiler::new();
    compiler
        .compile_expression(&Expression::array(vec![Expression::number(1.0)]))
        .unwrap();
    let cursor = compiler.emitter.get_iterator().unwrap();
    compiler
        .compile_iterator_binding_initialization(&parameters, cursor, LEXICAL)
        .unwrap();
    let bytecode = compiler.finish().unwrap();

    assert_eq!(bytecode.count(IteratorStep), 2);
    assert_eq!(bytecode.count(IteratorDrain), 1);
    assert_eq!(bytecode.count(IteratorClose), 0);
    assert_eq!(bytecode.count(EnterTry), 0);
}

#[test]
fn test_parameters_require_an_iterator_cursor() {
    let mut compiler = Compiler::new();
    let not_a_cursor = compiler.emitter.alloc_temp(StackEntry::Value).unwrap();
    let err = compiler
        .compile_iterator_binding_initialization(&FormalParameters::default(), not_a_cursor, LEXICAL)
        .unwrap_err();
    assert!(matches!(err, CompileError::TemporaryMismatch { .. }));
}

#[test]
fn test_entry_points_need_a_value() {
    let mut compiler = Compiler::new();
    let pattern = BindingPattern::array(vec![]);
    let err = compiler
        .compile_binding_initialization(&pattern, LEXICAL)
        .unwrap_err();
    assert!(matches!(err, CompileError::StackMismatch { found: None, .. }));
}

#[test]
fn test_nested_patterns_leave_the_stack_balanced() {
    // {a: [b, {c = 1, ...d}], ...e}
    let inner = BindingPattern::object(
        vec![BindingProperty::new(
            PropertyName::literal("c"),
            Binding::ident("c"),
            Some(Expression::number(1.0)),
        )],
        Some("d"),
    );
    let middle = BindingPattern::array(vec![
        BindingElementItem::ident("b"),
        BindingElementItem::Element(BindingElement::new(Binding::pattern(inner), None)),
    ]);
    let outer = BindingPattern::object(
        vec![BindingProperty::new(
            PropertyName::literal("a"),
            Binding::pattern(middle),
            None,
        )],
        Some("e"),
    );

    for mode in [LEXICAL, BindingMode::Reference] {
        let mut compiler = Compiler::new();
        compiler
            .compile_expression(&Expression::ident("value"))
            .unwrap();
        compiler.compile_binding_initialization(&outer, mode).unwrap();
        assert_eq!(compiler.emitter.stack().depth(), 0);
        assert!(compiler.emitter.stack().max_depth() <= 6);
        let bytecode = compiler.finish().unwrap();
        assert_eq!(bytecode.count(NewKeySet), 2);
        assert_eq!(bytecode.count(GetIterator), 1);
    }
}

#[test]
fn test_disassembly_names_bindings() {
    let pattern = BindingPattern::object(vec![BindingProperty::shorthand("a")], None);
    let text = binding_ok(&pattern, LEXICAL).to_string();
    assert!(text.contains("RequireObjectCoercible"));
    assert!(text.contains(r#"InitializeBinding      lexical "a""#));
}
