//! Benchmarks for keyed children reconciliation.
//!
//! Run with: cargo bench -p trellis-core --bench list_diff
//!
//! Each iteration mounts a fresh keyed list into a `MemoryDom` and patches
//! it to a reordered version, so the numbers include node creation for the
//! first render. The op log is disabled to keep allocation noise out.

use std::hint::black_box;
use std::rc::Rc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use trellis_core::config::Config;
use trellis_core::dom::MemoryDom;
use trellis_core::reactive::Runtime;
use trellis_core::vdom::modules::platform_modules;
use trellis_core::vdom::{PatchTarget, Patcher, VNode, VNodeData, VNodeRef};

fn keyed_list(keys: &[usize]) -> VNodeRef {
    VNode::element(
        "ul",
        None,
        keys.iter()
            .map(|key| {
                VNode::element(
                    "li",
                    Some(VNodeData::new().key(*key).attr("data-id", key.to_string())),
                    vec![VNode::text(key.to_string())],
                )
            })
            .collect(),
    )
}

/// Mount `old`, then patch it to `new`. Returns the node count afterwards.
fn mount_and_patch(old: &[usize], new: &[usize]) -> usize {
    let dom = Rc::new(MemoryDom::new());
    dom.set_recording(false);
    let patcher = Patcher::new(Runtime::new(Config::default()), dom.clone(), platform_modules());
    let first = keyed_list(old);
    patcher.patch(None, Some(first.clone()), false, false);
    patcher.patch(Some(PatchTarget::VNode(first)), Some(keyed_list(new)), false, false);
    dom.len()
}

fn bench_reorders(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_diff/reorder");

    for size in [10usize, 100, 1000] {
        let keys: Vec<usize> = (0..size).collect();
        let reversed: Vec<usize> = keys.iter().rev().copied().collect();
        let mut rotated = keys.clone();
        rotated.rotate_left(size / 3);
        // Swap every other pair, which defeats the four end-point checks.
        let mut swapped = keys.clone();
        for pair in swapped.chunks_mut(2) {
            pair.reverse();
        }

        group.throughput(Throughput::Elements(size as u64));
        for (name, target) in [("reverse", &reversed), ("rotate", &rotated), ("swap_pairs", &swapped)] {
            group.bench_with_input(BenchmarkId::new(name, size), target, |b, target| {
                b.iter(|| black_box(mount_and_patch(&keys, target)))
            });
        }
    }

    group.finish();
}

fn bench_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_diff/churn");

    for size in [100usize, 1000] {
        let keys: Vec<usize> = (0..size).collect();
        // Drop every third key and append as many new ones.
        let mut churned: Vec<usize> = keys.iter().copied().filter(|k| k % 3 != 0).collect();
        churned.extend(size..size + size / 3);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("replace_third", size), &churned, |b, churned| {
            b.iter(|| black_box(mount_and_patch(&keys, churned)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_reorders, bench_churn);
criterion_main!(benches);
