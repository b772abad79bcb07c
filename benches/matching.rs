use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use chatreact::{extract, ChatMessage, Fragment, Registry, Trigger};

fn sample_fragments() -> Vec<Fragment> {
    vec![
        Fragment::text("hey "),
        Fragment::mention("@streamer"),
        Fragment::text(" that was "),
        Fragment::emote("PogChamp"),
        Fragment::text(" "),
        Fragment::cheer("Cheer1000", "1,000"),
        Fragment::text(" see "),
        Fragment::link("example.com"),
    ]
}

fn bench_extract(c: &mut Criterion) {
    let fragments = sample_fragments();
    let mut group = c.benchmark_group("extract");
    group.throughput(Throughput::Elements(1));
    group.bench_function("mixed_8_fragments", |b| {
        b.iter(|| extract(black_box(&fragments)).unwrap());
    });
    group.finish();
}

fn bench_matching(c: &mut Criterion) {
    let detail = extract(&sample_fragments()).unwrap();

    // 16 listeners sharing leaf triggers, similar to a bot rule set.
    let hype = Trigger::bits(500) | Trigger::emote_regex("^Pog").unwrap();
    let question = Trigger::text_regex(r"\?\s*$").unwrap();
    let mut triggers = Vec::new();
    for i in 0..16u64 {
        let t = match i % 4 {
            0 => hype.clone(),
            1 => &hype & &Trigger::mention("streamer"),
            2 => question.clone() | Trigger::bits(i * 100),
            _ => Trigger::emote_only(),
        };
        triggers.push(t);
    }

    let mut group = c.benchmark_group("matching");
    group.throughput(Throughput::Elements(triggers.len() as u64));
    group.bench_function("16_triggers", |b| {
        b.iter(|| triggers.iter().filter(|t| t.matches(black_box(&detail))).count());
    });
    group.finish();

    let mut registry = Registry::new();
    for t in triggers {
        registry.register(t, |_, _| Ok(()));
    }
    let message = ChatMessage::new("bench", sample_fragments());
    c.bench_function("dispatch/16_listeners", |b| {
        b.iter(|| registry.dispatch(black_box(&message)).unwrap());
    });
}

criterion_group!(benches, bench_extract, bench_matching);
criterion_main!(benches);
