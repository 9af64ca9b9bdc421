// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Property tests over generated sources and pattern shapes.

use proptest::prelude::*;
use spacey_destructure::ast::{
    Binding, BindingElementItem, BindingPattern, BindingProperty, Expression, Literal, PropertyName,
};
use spacey_destructure::compiler::{BindingMode, CompileUnit, EnvironmentHandle, compile_unit};
use spacey_destructure::{CompileOptions, Effect, VM, Value};

const LET: BindingMode = BindingMode::Direct(EnvironmentHandle::Lexical);

const KEY_POOL: &[&str] = &["a", "b", "c", "d", "0", "1", "7", "x"];

fn execute(unit: &CompileUnit, options: CompileOptions) -> VM {
    let bytecode = compile_unit(unit, &options).unwrap();
    let mut vm = VM::new();
    vm.execute(&bytecode).unwrap();
    vm
}

fn positional(count: usize, rest: bool) -> BindingPattern {
    let mut elements: Vec<BindingElementItem> = (0..count)
        .map(|i| BindingElementItem::ident(&format!("x{}", i)))
        .collect();
    if rest {
        elements.push(BindingElementItem::rest(Binding::ident("rest")));
    }
    BindingPattern::array(elements)
}

fn literal() -> impl Strategy<Value = Literal> {
    prop_oneof![
        Just(Literal::Undefined),
        Just(Literal::Null),
        any::<bool>().prop_map(Literal::Boolean),
        (-100i32..100).prop_map(|n| Literal::Number(n as f64)),
        "[a-z]{0,3}".prop_map(Literal::String),
    ]
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Undefined => Value::Undefined,
        Literal::Null => Value::Null,
        Literal::Boolean(b) => Value::Boolean(*b),
        Literal::Number(n) => Value::Number(*n),
        Literal::String(s) => Value::String(s.clone()),
    }
}

/// Integer-like keys ascend first, then the rest in insertion order.
fn enumeration_order(keys: &[&str]) -> Vec<String> {
    let mut integers: Vec<u32> = keys.iter().filter_map(|k| k.parse().ok()).collect();
    integers.sort_unstable();
    integers
        .into_iter()
        .map(|n| n.to_string())
        .chain(
            keys.iter()
                .filter(|k| k.parse::<u32>().is_err())
                .map(|k| k.to_string()),
        )
        .collect()
}

proptest! {
    #[test]
    fn positional_elements_take_values_in_order(
        values in prop::collection::vec(-1000i32..1000, 0..8),
        count in 0usize..6,
        rest in any::<bool>(),
    ) {
        let source = Expression::array(values.iter().map(|n| Expression::number(*n as f64)).collect());
        let vm = execute(&CompileUnit::binding(positional(count, rest), LET, source), CompileOptions::default());

        for i in 0..count {
            let expected = values.get(i).map(|n| Value::Number(*n as f64)).unwrap_or(Value::Undefined);
            prop_assert_eq!(vm.binding(&format!("x{}", i)), Some(expected));
        }
        if rest {
            let tail: Vec<String> = values.iter().skip(count).map(|n| n.to_string()).collect();
            let shown = vm.binding("rest").map(|v| vm.render(&v)).unwrap_or_default();
            prop_assert_eq!(shown, format!("[{}]", tail.join(", ")));
        }

        let steps = vm.effects().iter().filter(|e| matches!(e, Effect::IteratorNext(_))).count();
        let expected_steps = if rest { values.len() + 1 } else { count.min(values.len() + 1) };
        prop_assert_eq!(steps, expected_steps);
    }

    #[test]
    fn object_rest_collects_unconsumed_keys(
        source_keys in prop::sample::subsequence(KEY_POOL.to_vec(), 0..=KEY_POOL.len()).prop_shuffle(),
        consumed in prop::sample::subsequence(KEY_POOL.to_vec(), 0..=4),
    ) {
        let properties = consumed
            .iter()
            .map(|key| BindingProperty::new(
                PropertyName::literal(key),
                Binding::ident(&format!("v_{}", key)),
                None,
            ))
            .collect();
        let pattern = BindingPattern::object(properties, Some("rest"));
        let source = Expression::object(
            source_keys.iter().enumerate().map(|(i, key)| (*key, Expression::number(i as f64))).collect(),
        );
        let vm = execute(&CompileUnit::binding(pattern, LET, source), CompileOptions::default());

        let Some(Value::Object(id)) = vm.binding("rest") else {
            panic!("rest should be bound to an object");
        };
        let expected: Vec<String> = enumeration_order(&source_keys)
            .into_iter()
            .filter(|key| !consumed.contains(&key.as_str()))
            .collect();
        prop_assert_eq!(vm.heap().get(id).unwrap().own_enumerable_keys(), expected);

        for key in &consumed {
            let expected = source_keys
                .iter()
                .position(|k| k == key)
                .map(|i| Value::Number(i as f64))
                .unwrap_or(Value::Undefined);
            prop_assert_eq!(vm.binding(&format!("v_{}", key)), Some(expected));
        }
    }

    #[test]
    fn defaults_apply_exactly_when_undefined(value in literal()) {
        let pattern = BindingPattern::object(
            vec![BindingProperty::new(
                PropertyName::literal("a"),
                Binding::ident("a"),
                Some(Expression::number(42.0)),
            )],
            None,
        );
        let source = Expression::object(vec![("a", Expression::Literal(value.clone()))]);
        let vm = execute(&CompileUnit::binding(pattern, LET, source), CompileOptions::default());

        let expected = match value {
            Literal::Undefined => Value::Number(42.0),
            ref other => literal_value(other),
        };
        prop_assert_eq!(vm.binding("a"), Some(expected));
    }

    #[test]
    fn unoptimized_code_binds_the_same_values(
        values in prop::collection::vec(prop::option::of(-50i32..50), 0..6),
        count in 1usize..5,
    ) {
        let elements = (0..count)
            .map(|i| BindingElementItem::with_default(
                Binding::ident(&format!("x{}", i)),
                Expression::number(-1.0),
            ))
            .collect();
        let source = Expression::array(
            values
                .iter()
                .map(|v| match v {
                    Some(n) => Expression::number(*n as f64),
                    None => Expression::Literal(Literal::Undefined),
                })
                .collect(),
        );
        let unit = CompileUnit::binding(BindingPattern::array(elements), LET, source);

        let optimized = execute(&unit, CompileOptions::default());
        let reference = execute(&unit, CompileOptions::default().unoptimized());
        prop_assert_eq!(optimized.bindings(), reference.bindings());
        prop_assert_eq!(optimized.effect_log(), reference.effect_log());
    }
}
