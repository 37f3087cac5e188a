// Copyright 2025 Cowboy AI, LLC.

use cim_model::{
    combine_reducers, Action, EntityModel, EntitySchema, Model, ModelOptions, ModelSettings, Value,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;

fn counter(namespace: &str) -> Model {
    ModelOptions::new(namespace)
        .state(json!({"count": 0, "history": (0..64).collect::<Vec<u32>>()}))
        .reducer("increment", |draft, _| {
            draft.update("count", |c| Value::from(c.as_i64().unwrap_or(0) + 1));
        })
        .settings(ModelSettings::unchecked())
        .build()
        .unwrap()
}

fn benchmark_combined_reduce(c: &mut Criterion) {
    let mut group = c.benchmark_group("combined_reduce");

    for models in [1usize, 10, 100].iter() {
        let namespaces: Vec<String> = (0..*models).map(|i| format!("app.counter{i}")).collect();
        let built: Vec<Model> = namespaces.iter().map(|ns| counter(ns)).collect();
        let reducer = combine_reducers(&built).unwrap();
        let state = reducer.initial_state();
        let hit = Action::new(format!("{}.increment", namespaces[0]), Value::Null).unwrap();
        let miss = Action::new("other.thing", Value::Null).unwrap();

        group.bench_with_input(BenchmarkId::new("matching", models), models, |b, _| {
            b.iter(|| reducer.reduce(black_box(&state), black_box(&hit)));
        });
        group.bench_with_input(BenchmarkId::new("unrelated", models), models, |b, _| {
            b.iter(|| reducer.reduce(black_box(&state), black_box(&miss)));
        });
    }

    group.finish();
}

fn benchmark_normalize(c: &mut Criterion) {
    let schema = EntitySchema::new(vec![
        EntityModel::new("articles")
            .one_to_one("author", "users")
            .one_to_many("comments", "comments"),
        EntityModel::new("users"),
        EntityModel::new("comments").one_to_one("commenter", "users"),
    ])
    .unwrap();

    let mut group = c.benchmark_group("normalize");

    for size in [10usize, 100, 1_000].iter() {
        let articles: Vec<serde_json::Value> = (0..*size)
            .map(|i| {
                json!({
                    "id": i,
                    "title": format!("article {i}"),
                    "author": {"id": i % 17, "name": "writer"},
                    "comments": [
                        {"id": i * 2, "commenter": {"id": i % 5}},
                        {"id": i * 2 + 1, "commenter": {"id": i % 7}}
                    ]
                })
            })
            .collect();
        let payload = Value::from(serde_json::Value::Array(articles));
        let normalized = schema.normalize("articles", &payload).unwrap();
        let root = normalized.to_state();
        let ids = normalized.id_values();

        group.bench_with_input(BenchmarkId::new("flatten", size), &payload, |b, payload| {
            b.iter(|| schema.normalize("articles", black_box(payload)).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("rebuild", size), &ids, |b, ids| {
            b.iter(|| schema.denormalize("articles", black_box(ids), &root).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_combined_reduce, benchmark_normalize);
criterion_main!(benches);
