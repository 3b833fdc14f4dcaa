use mongolite::document::from_value;
use mongolite::query::{CmpOp, Filter, eval_filter};
use proptest::prelude::*;
use serde_json::{Value, json};

fn cmp(op: CmpOp, v: i64) -> Filter {
    Filter::Cmp { path: "x".into(), op, value: json!(v) }
}

proptest! {
    #[test]
    fn prop_gt_and_lte_are_complementary(i in -1_000_000i64..1_000_000, j in -1_000_000i64..1_000_000) {
        let doc = from_value(json!({"x": i})).unwrap();
        prop_assert_eq!(eval_filter(&doc, &cmp(CmpOp::Gt, j)), !eval_filter(&doc, &cmp(CmpOp::Lte, j)));
        prop_assert_eq!(eval_filter(&doc, &cmp(CmpOp::Eq, j)), !eval_filter(&doc, &cmp(CmpOp::Ne, j)));
    }

    #[test]
    fn prop_in_agrees_with_or_of_eq(x in -20i64..20, set in proptest::collection::vec(-20i64..20, 0..8)) {
        let doc = from_value(json!({"x": x})).unwrap();
        let values: Vec<Value> = set.iter().map(|v| json!(v)).collect();
        let by_in = eval_filter(&doc, &Filter::In { path: "x".into(), values });
        let by_or = set.iter().any(|v| eval_filter(&doc, &cmp(CmpOp::Eq, *v)));
        prop_assert_eq!(by_in, by_or);
    }

    #[test]
    fn prop_nor_negates_or(x in -5i64..5, a in -5i64..5, b in -5i64..5) {
        let doc = from_value(json!({"x": x})).unwrap();
        let or = Filter::Or(vec![cmp(CmpOp::Eq, a), cmp(CmpOp::Lt, b)]);
        let nor = Filter::Nor(vec![cmp(CmpOp::Eq, a), cmp(CmpOp::Lt, b)]);
        prop_assert_eq!(eval_filter(&doc, &or), !eval_filter(&doc, &nor));
    }
}
