//! Property-based tests for result normalization.
//!
//! Invariants:
//! - normalization never panics on arbitrary JSON
//! - list order survives every list-like wrapper
//! - a decision only allows when no violations remain

use crate::{decide, to_boolean, to_list};
use proptest::prelude::*;
use serde_json::{Value, json};

fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-z ]{0,12}".prop_map(Value::String),
    ]
}

fn arb_json() -> impl Strategy<Value = Value> {
    arb_scalar().prop_recursive(4, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,8}", inner, 0..5)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

/// Violation records as policies emit them: objects with a `code`.
fn arb_violation() -> impl Strategy<Value = Value> {
    ("[a-z_]{1,16}", "[a-z ]{0,24}").prop_map(|(code, msg)| json!({"code": code, "msg": msg}))
}

proptest! {
    #[test]
    fn normalizers_never_panic(raw in arb_json()) {
        let _ = to_boolean(&raw);
        let _ = to_list(&raw);
    }

    #[test]
    fn list_order_is_preserved(items in prop::collection::vec(arb_violation(), 0..8)) {
        let bare = Value::Array(items.clone());
        prop_assert_eq!(to_list(&bare), items.clone());

        let envelope = json!({"result": items.clone()});
        prop_assert_eq!(to_list(&envelope), items.clone());

        let result_set = json!([{"result": items.clone()}]);
        prop_assert_eq!(to_list(&result_set), items.clone());

        let expressions = json!([{"expressions": [{"value": items.clone()}]}]);
        prop_assert_eq!(to_list(&expressions), items);
    }

    #[test]
    fn scalars_wrap_as_single_element(v in arb_scalar()) {
        let list = to_list(&v);
        if v.is_null() {
            prop_assert!(list.is_empty());
        } else {
            prop_assert_eq!(list, vec![v]);
        }
    }

    #[test]
    fn boolean_wrappers_agree(b in any::<bool>()) {
        prop_assert_eq!(to_boolean(&json!(b)), b);
        prop_assert_eq!(to_boolean(&json!([{"result": b}])), b);
        prop_assert_eq!(to_boolean(&json!([{"expressions": [{"value": b}]}])), b);
        prop_assert_eq!(to_boolean(&json!({"result": b})), b);
    }

    #[test]
    fn decision_is_conjunctive(allow_raw in arb_json(), violations_raw in arb_json()) {
        let d = decide(&allow_raw, &violations_raw);
        let expected = to_boolean(&allow_raw) && to_list(&violations_raw).is_empty();
        prop_assert_eq!(d.allow, expected);
        prop_assert_eq!(d.violations, to_list(&violations_raw));
    }
}
