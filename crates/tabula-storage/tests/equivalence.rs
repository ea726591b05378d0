//! The SQLite and mock executors must return identical results for the
//! same sequence of operations.

use proptest::prelude::*;
use tabula_core::{model, Model, Value};
use tabula_storage::{Database, StorageError};

model! {
    #[derive(Debug, Clone, Default, PartialEq)]
    struct Person {
        #[db = "id,primary_key,auto_increment"]
        id: i64,
        #[db = "name,not_null"]
        name: String,
        #[db = "age"]
        age: i64,
    }
}

impl Model for Person {
    fn table_name() -> Option<&'static str> {
        Some("people")
    }
}

model! {
    #[derive(Debug, Clone, Default, PartialEq)]
    struct Item {
        #[db = "id,primary_key,auto_increment"]
        id: i64,
        #[db = "name"]
        name: String,
        #[db = "score"]
        score: f64,
        #[db = "qty"]
        qty: Option<i64>,
    }
}

impl Model for Item {}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn backends() -> Vec<Database> {
    vec![
        Database::mock(),
        Database::sqlite_memory().expect("in-memory sqlite"),
    ]
}

fn seed_people(db: &Database) {
    db.ensure_table::<Person>().unwrap();
    for (name, age) in [("Ann", 17), ("Bob", 42)] {
        db.create(&mut Person {
            id: 0,
            name: name.into(),
            age,
        })
        .unwrap();
    }
}

fn names(people: Vec<Person>) -> Vec<String> {
    people.into_iter().map(|p| p.name).collect()
}

#[test]
fn test_lookup_table_on_both_backends() {
    init_tracing();
    for db in backends() {
        seed_people(&db);
        let people = db.objects::<Person>();
        let backend = db.backend();

        assert_eq!(names(people.filter("age__gte", 18).all().unwrap()), ["Bob"], "{backend}");
        assert_eq!(
            names(people.filter("name__icontains", "an").all().unwrap()),
            ["Ann"],
            "{backend}"
        );
        assert!(people.filter("age__lt", 18).exists().unwrap(), "{backend}");
        assert_eq!(people.filter("age", "17").count().unwrap(), 1, "{backend}");
        assert_eq!(people.order_by("-age").first().unwrap().name, "Bob", "{backend}");
        assert_eq!(
            names(people.exclude("name__startswith", "A").all().unwrap()),
            ["Bob"],
            "{backend}"
        );
        assert_eq!(
            names(people.filter("age__in", Value::list([42, 99])).all().unwrap()),
            ["Bob"],
            "{backend}"
        );
        assert_eq!(
            people.filter("age__in", Value::list(Vec::<i64>::new())).count().unwrap(),
            0,
            "{backend}"
        );
        assert_eq!(people.filter("name__contains", "an").count().unwrap(), 0, "{backend}");
        assert_eq!(people.offset(1).count().unwrap(), 2, "{backend}");
        assert_eq!(names(people.order_by("age").offset(1).all().unwrap()), ["Bob"], "{backend}");
    }
}

#[test]
fn test_build_errors_match_on_both_backends() {
    for db in backends() {
        seed_people(&db);
        let people = db.objects::<Person>();
        assert!(matches!(
            people.filter("email", "x").all(),
            Err(StorageError::UnknownColumn { .. })
        ));
        assert!(matches!(
            people.filter("age", "seventeen").count(),
            Err(StorageError::TypeMismatch { .. })
        ));
    }
}

#[test]
fn test_scoped_update_and_delete_on_both_backends() {
    for db in backends() {
        seed_people(&db);
        let people = db.objects::<Person>();

        assert_eq!(people.filter("name", "Ann").update([("age", 18)]).unwrap(), 1);
        assert_eq!(people.filter("age", 18).count().unwrap(), 1);
        assert_eq!(people.update([("age", 50)]).unwrap(), 2);
        assert_eq!(people.filter("age", 50).count().unwrap(), 2);

        assert_eq!(people.filter("name", "Nobody").delete().unwrap(), 0);
        assert_eq!(people.delete().unwrap(), 2);
        assert!(!people.exists().unwrap());
    }
}

#[test]
fn test_real_text_forms_agree_on_both_backends() {
    let readings = [1.0e20, -0.0, 0.1, 1.0e-7, f64::INFINITY];
    for db in backends() {
        db.ensure_table::<Item>().unwrap();
        for reading in readings {
            db.create(&mut Item {
                score: reading,
                ..Item::default()
            })
            .unwrap();
        }
        let items = db.objects::<Item>();
        let backend = db.backend();

        assert_eq!(items.filter("score__contains", "e").count().unwrap(), 2, "{backend}");
        assert_eq!(items.filter("score__contains", "e+20").count().unwrap(), 1, "{backend}");
        assert_eq!(items.filter("score__endswith", "e-07").count().unwrap(), 1, "{backend}");
        assert_eq!(items.filter("score__startswith", "-").count().unwrap(), 0, "{backend}");
        assert_eq!(items.filter("score__iexact", "inf").count().unwrap(), 1, "{backend}");
        assert_eq!(items.filter("score__startswith", "0.").count().unwrap(), 2, "{backend}");
    }
}

#[test]
fn test_unique_collision_on_both_backends() {
    model! {
        #[derive(Debug, Default)]
        struct Tag {
            #[db = "id,primary_key,auto_increment"]
            id: i64,
            #[db = "label,unique"]
            label: Option<String>,
        }
    }
    impl Model for Tag {}

    for db in backends() {
        db.ensure_table::<Tag>().unwrap();
        let tag = |label: Option<&str>| {
            db.create(&mut Tag {
                id: 0,
                label: label.map(str::to_string),
            })
        };
        tag(Some("rust")).unwrap();
        assert!(matches!(
            tag(Some("rust")),
            Err(StorageError::Backend { .. })
        ));
        tag(None).unwrap();
        tag(None).unwrap();
        assert_eq!(db.objects::<Tag>().count().unwrap(), 3);
    }
}

const NAMES: &[&str] = &["Ann", "ann", "Bob", "BOB", "carla", "anna", ""];
const FRAGMENTS: &[&str] = &["an", "A", "b", "la", ""];

#[derive(Debug, Clone)]
enum Op {
    Filter(&'static str, Value),
    Exclude(&'static str, Value),
    OrderBy(&'static str),
    Limit(usize),
    Offset(usize),
}

fn name_condition() -> impl Strategy<Value = (&'static str, Value)> {
    let lookup = prop::sample::select(vec![
        "name",
        "name__iexact",
        "name__contains",
        "name__icontains",
        "name__startswith",
        "name__istartswith",
        "name__endswith",
        "name__iendswith",
    ]);
    (lookup, prop::sample::select(FRAGMENTS.to_vec()))
        .prop_map(|(lookup, fragment)| (lookup, Value::from(fragment)))
}

fn qty_condition() -> impl Strategy<Value = (&'static str, Value)> {
    prop_oneof![
        (
            prop::sample::select(vec!["qty", "qty__gt", "qty__gte", "qty__lt", "qty__lte"]),
            -2i64..6,
        )
            .prop_map(|(lookup, n)| (lookup, Value::from(n))),
        any::<bool>().prop_map(|b| ("qty__isnull", Value::from(b))),
        prop::collection::vec(-2i64..6, 0..4).prop_map(|ns| ("qty__in", Value::list(ns))),
    ]
}

const SCORE_FRAGMENTS: &[&str] = &["e", "e+", "e-0", "-", "0.", ".5", "5", "inf", "Inf", "1.0"];

fn score() -> impl Strategy<Value = f64> {
    prop_oneof![
        4 => (-8i64..8).prop_map(|k| k as f64 / 4.0),
        1 => prop::sample::select(vec![1.0e20, -0.0, 1.0e-7, -1.5e-5, 1.0e15, f64::INFINITY]),
    ]
}

fn score_condition() -> impl Strategy<Value = (&'static str, Value)> {
    prop_oneof![
        (
            prop::sample::select(vec!["score", "score__gt", "score__lt", "score__gte"]),
            score(),
        )
            .prop_map(|(lookup, r)| (lookup, Value::from(r))),
        (
            prop::sample::select(vec![
                "score__contains",
                "score__icontains",
                "score__startswith",
                "score__endswith",
                "score__iexact",
            ]),
            prop::sample::select(SCORE_FRAGMENTS.to_vec()),
        )
            .prop_map(|(lookup, fragment)| (lookup, Value::from(fragment))),
    ]
}

fn condition() -> impl Strategy<Value = (&'static str, Value)> {
    prop_oneof![name_condition(), qty_condition(), score_condition()]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => condition().prop_map(|(f, v)| Op::Filter(f, v)),
        2 => condition().prop_map(|(f, v)| Op::Exclude(f, v)),
        1 => prop::sample::select(vec!["id", "-id", "name", "-name", "score", "-score", "qty", "-qty"])
            .prop_map(Op::OrderBy),
        1 => (0usize..6).prop_map(Op::Limit),
        1 => (0usize..4).prop_map(Op::Offset),
    ]
}

fn item() -> impl Strategy<Value = Item> {
    (
        prop::sample::select(NAMES.to_vec()),
        score(),
        prop::option::of(-2i64..6),
    )
        .prop_map(|(name, score, qty)| Item {
            id: 0,
            name: name.to_string(),
            score,
            qty,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_backends_agree(
        items in prop::collection::vec(item(), 0..12),
        ops in prop::collection::vec(op(), 0..6),
    ) {
        let mock = Database::mock();
        let sqlite = Database::sqlite_memory().unwrap();
        for db in [&mock, &sqlite] {
            db.ensure_table::<Item>().unwrap();
            for item in &items {
                db.create(&mut item.clone()).unwrap();
            }
        }

        let run = |db: &Database| {
            let query = ops.iter().fold(db.objects::<Item>(), |query, op| match op {
                Op::Filter(field, value) => query.filter(field, value.clone()),
                Op::Exclude(field, value) => query.exclude(field, value.clone()),
                Op::OrderBy(field) => query.order_by(field),
                Op::Limit(n) => query.limit(*n),
                Op::Offset(n) => query.offset(*n),
            });
            (query.all().unwrap(), query.count().unwrap())
        };

        prop_assert_eq!(run(&mock), run(&sqlite));
    }
}
