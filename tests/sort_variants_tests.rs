//! Distinct, GroupBy and OrderBy over the external sort.

mod test_data_gen;

use spillway_core::prelude::{Tuple, Value};
use spillway_operators::{collect_all, Distinct, GroupBy, Operator, OrderBy, SortDirection};
use test_data_gen::*;

const PAGE: usize = 72;

#[test]
fn test_distinct_on_all_columns() {
    let (ctx, _storage) = memory_context(PAGE);
    let input = values(
        pair_schema("t", "b"),
        pair_rows(&[(1, "a"), (1, "a"), (2, "b")]),
        PAGE,
    );
    let mut distinct = Distinct::new(input, 3, Vec::new(), ctx.clone());
    let out = collect_all(&mut distinct).expect("distinct");
    assert_eq!(out, pair_rows(&[(1, "a"), (2, "b")]));
    assert!(ctx.spill.list_segments().is_empty());
}

#[test]
fn test_distinct_on_key_keeps_one_row_per_key() {
    let (ctx, _storage) = memory_context(PAGE);
    let rows = pair_rows(&[(3, "c"), (1, "b"), (3, "a"), (1, "a"), (2, "z")]);
    let mut distinct = Distinct::new(
        values(pair_schema("t", "b"), rows, PAGE),
        3,
        vec![int_attr("t", "a")],
        ctx,
    );
    let out = collect_all(&mut distinct).expect("distinct");
    assert_eq!(ints_of(&out), vec![1, 2, 3]);
}

#[test]
fn test_distinct_spilling_input() {
    let (ctx, _storage) = memory_context(8);
    let input = scrambled_ints(400, 37, 5);
    let scan = values(int_schema("t"), int_rows(&input), 8);
    let mut distinct = Distinct::new(scan, 4, Vec::new(), ctx.clone());
    let out = collect_all(&mut distinct).expect("distinct");

    let mut expected = input;
    expected.sort_unstable();
    expected.dedup();
    assert_eq!(ints_of(&out), expected);
    assert!(distinct.sort().initial_runs() > 1);
    assert!(ctx.spill.list_segments().is_empty());
}

#[test]
fn test_group_by_makes_groups_contiguous() {
    let (ctx, _storage) = memory_context(PAGE);
    let keys = scrambled_ints(50, 6, 21);
    let rows: Vec<Tuple> = keys
        .iter()
        .enumerate()
        .map(|(i, &k)| Tuple::new(vec![Value::Int(k), Value::from(format!("row{i}"))]))
        .collect();
    let mut group = GroupBy::new(
        values(pair_schema("t", "b"), rows, PAGE),
        3,
        vec![int_attr("t", "a")],
        ctx,
    );
    let out = collect_all(&mut group).expect("group by");
    assert_eq!(out.len(), 50, "group by keeps every row");

    let seen = ints_of(&out);
    let mut groups = seen.clone();
    groups.dedup();
    let mut unique = groups.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(groups, unique, "each key forms exactly one contiguous run");
}

#[test]
fn test_order_by_descending_on_second_column() {
    let (ctx, _storage) = memory_context(PAGE);
    let rows = pair_rows(&[(1, "b"), (2, "d"), (3, "a"), (4, "c")]);
    let mut order = OrderBy::new(
        values(pair_schema("t", "b"), rows, PAGE),
        3,
        vec![str_attr("t", "b")],
        SortDirection::Descending,
        ctx,
    );
    let out = collect_all(&mut order).expect("order by");
    assert_eq!(ints_of(&out), vec![2, 4, 1, 3]);
    assert_eq!(order.name(), "order_by");
}

#[test]
fn test_wrappers_keep_input_schema() {
    let (ctx, _storage) = memory_context(PAGE);
    let schema = pair_schema("t", "b");
    let distinct =
        Distinct::new(values(schema.clone(), Vec::new(), PAGE), 3, Vec::new(), ctx.clone());
    let group = GroupBy::new(values(schema.clone(), Vec::new(), PAGE), 3, Vec::new(), ctx);
    assert_eq!(distinct.schema(), &schema);
    assert_eq!(group.schema(), &schema);
    assert_eq!(group.name(), "group_by");
}
