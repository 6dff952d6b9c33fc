use std::path::Path;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use quizclock_core::parser::{parse_bank_str, validate_bank};

fn make_bank_toml(n: usize) -> String {
    let mut toml = String::from("[bank]\nid = \"bench\"\nname = \"Bench bank\"\n\n");
    for i in 0..n {
        toml.push_str(&format!(
            "[[questions]]\nid = \"q{i}\"\ntext = \"Question {i}\"\n\
             options = [\"A\", \"B\", \"C\", \"D\"]\ncorrect_answer = {}\n\
             subject = \"Subject {}\"\nachievement_tag = \"T.{}\"\ndifficulty = \"{}\"\n\n",
            i % 4,
            i % 6,
            i % 17,
            ["easy", "medium", "hard"][i % 3],
        ));
    }
    toml
}

fn bench_parse_bank(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_bank");
    let path = Path::new("bench.toml");

    for n in [10, 90] {
        let toml = make_bank_toml(n);
        group.bench_function(format!("questions={n}"), |b| {
            b.iter(|| parse_bank_str(black_box(&toml), path))
        });
    }

    let bank = parse_bank_str(&make_bank_toml(90), path).unwrap();
    group.bench_function("validate/questions=90", |b| {
        b.iter(|| validate_bank(black_box(&bank)))
    });

    group.finish();
}

criterion_group!(benches, bench_parse_bank);
criterion_main!(benches);
