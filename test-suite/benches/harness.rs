use divan::black_box;
use stagehand::Harness;

#[divan::bench(args = [1, 16, 256])]
fn register_and_teardown(n: usize) {
    let harness = Harness::new();
    for i in 0..n {
        harness.register_with_cleanup(format!("r{i}"), i, || Ok(()));
    }
    harness.teardown();
    black_box(harness);
}

#[divan::bench(name = "lookup hit")]
fn lookup_hit(bencher: divan::Bencher) {
    let harness = Harness::new();
    harness.register("db", 42u64);
    bencher.bench_local(|| black_box(harness.resource::<u64>(black_box("db"))));
}

fn main() {
    divan::main();
}
