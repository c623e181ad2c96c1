//! Hearth Benchmark Suite
//!
//! Performance targets:
//!   record_creation_single ............. < 10μs
//!   retrieval_top5_from_200 ............ < 500μs
//!   retrieval_top5_from_2000 ........... < 5ms
//!   reflection_poll_count_policy ....... < 50μs
//!   relationship_update_100_agents ..... < 20μs
//!   social_summary_100_agents .......... < 100μs

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use hearth_core::clock::{ManualClock, SharedClock};
use hearth_core::config::{MemoryConfig, RetrievalConfig, SocialConfig};
use hearth_core::memory::RecordStore;
use hearth_core::reflection::ReflectionTrigger;
use hearth_core::retrieval::RetrievalEngine;
use hearth_core::social::SocialNetwork;
use hearth_core::types::{AgentId, Location};
use hearth_core::{MemoryRecord, RecordKind};

const ACTIVITIES: [&str; 8] = [
    "chopped oak wood near the river",
    "mined iron in the north cave",
    "traded stone with Bob",
    "ate bread at camp",
    "saw a wolf on the ridge",
    "built a wall for the shelter",
    "rested under the old pine",
    "argued with Carol about the mine",
];

fn clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).single().unwrap_or_default())
}

fn filled_store(clock: &ManualClock, records: usize) -> RecordStore {
    let shared: SharedClock = Arc::new(clock.clone());
    let mut store = RecordStore::in_memory(AgentId::from("Alice"), shared);
    for i in 0..records {
        let activity = ACTIVITIES[i % ACTIVITIES.len()];
        let importance = (i % 10) as f64 / 10.0;
        store.add_observation(format!("{activity} ({i})"), importance, Some(Location::new(i as f64, 0.0, 0.0)), "bench");
        clock.advance(Duration::minutes(3));
    }
    store
}

fn agents(count: usize) -> Vec<AgentId> {
    (0..count).map(|i| AgentId::from(format!("agent-{i:03}"))).collect()
}

/// Benchmark: Single record creation (target: < 10μs).
fn bench_record_creation(c: &mut Criterion) {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().unwrap_or_default();
    c.bench_function("record_creation_single", |b| {
        b.iter(|| {
            let record = MemoryRecord::new(
                black_box("met Bob at the river"),
                RecordKind::Observation,
                black_box(0.7),
                now,
                "bench",
            );
            black_box(record);
        });
    });
}

/// Benchmark: Retrieval top-5 over 200 and 2000 records.
fn bench_retrieval(c: &mut Criterion) {
    let engine = RetrievalEngine::new(RetrievalConfig::default());
    let mut group = c.benchmark_group("retrieval");

    for records in [200_usize, 2000] {
        let clock = clock();
        let mut store = filled_store(&clock, records);
        group.bench_function(format!("retrieval_top5_from_{records}"), |b| {
            b.iter(|| {
                let results = engine
                    .retrieve(&mut store, black_box("iron mine Carol"), None, 5)
                    .unwrap_or_default();
                black_box(results);
            });
        });
    }
    group.finish();
}

/// Benchmark: Polling the reflection trigger on a busy stream (target: < 50μs).
fn bench_reflection_poll(c: &mut Criterion) {
    let clock = clock();
    let store = filled_store(&clock, 500);
    let config = MemoryConfig::default();

    c.bench_function("reflection_poll_count_policy", |b| {
        b.iter(|| {
            let mut trigger = ReflectionTrigger::new(&config).with_watermark(black_box(480));
            black_box(trigger.poll(&store));
        });
    });
}

/// Benchmark: Relationship updates among 100 agents (target: < 20μs).
fn bench_relationship_update(c: &mut Criterion) {
    let shared: SharedClock = Arc::new(clock());
    let mut network = SocialNetwork::in_memory(&SocialConfig::default(), shared);
    let population = agents(100);
    let mut step = 0_usize;

    c.bench_function("relationship_update_100_agents", |b| {
        b.iter(|| {
            let a = &population[step % population.len()];
            let b_agent = &population[(step * 7 + 1) % population.len()];
            step += 1;
            if a != b_agent {
                let delta = if step % 3 == 0 { -15.0 } else { 10.0 };
                let _ = black_box(network.update_relationship(a, b_agent, delta, "bench"));
            }
        });
    });
}

/// Benchmark: Social summary in a dense 100-agent network (target: < 100μs).
fn bench_social_summary(c: &mut Criterion) {
    let shared: SharedClock = Arc::new(clock());
    let mut network = SocialNetwork::in_memory(&SocialConfig::default(), shared);
    let population = agents(100);
    for (i, a) in population.iter().enumerate() {
        for b in population.iter().skip(i + 1).step_by(5) {
            let delta = if (i % 4) == 0 { -60.0 } else { 55.0 };
            let _ = network.update_relationship(a, b, delta, "seed");
        }
    }
    for (i, agent) in population.iter().enumerate().step_by(10) {
        let faction = format!("faction-{}", i / 10);
        let _ = network.create_faction(&faction, agent);
    }

    c.bench_function("social_summary_100_agents", |b| {
        b.iter(|| {
            black_box(network.get_social_summary(black_box(&population[42])));
        });
    });
}

criterion_group!(
    benches,
    bench_record_creation,
    bench_retrieval,
    bench_reflection_poll,
    bench_relationship_update,
    bench_social_summary,
);
criterion_main!(benches);
