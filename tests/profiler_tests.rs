//! End-to-end profiler properties on in-memory traces.
//!
//! These tests exercise whole profiling runs (reader -> profiler -> curve)
//! rather than single components: exactness at full sampling rate,
//! monotonicity of every produced curve, agreement between SHARDS and a
//! real LRU simulation, and the online-Belady lower bound.

use mrc_rs::{
    MemoryReader, MinisimParams, MrcCurve, Profiler, Request, ShardsParams, SizeVector,
};

// ============================================================================
// HELPERS
// ============================================================================

fn sizes(points: &[u64]) -> SizeVector {
    SizeVector {
        sizes: points.to_vec(),
        wss_ratios: None,
    }
}

fn shards(params: &str, points: &[u64]) -> Profiler {
    let params: ShardsParams = params.parse().unwrap();
    Profiler::shards(params, "lru", sizes(points)).unwrap()
}

fn minisim(params: &str, algo: &str, points: &[u64]) -> Profiler {
    let params: MinisimParams = params.parse().unwrap();
    Profiler::minisim(params, algo, sizes(points)).unwrap()
}

/// Deterministic skewed trace over `universe` unit-sized objects.
fn skewed_ids(n: usize, universe: u64, seed: u64) -> Vec<u64> {
    let mut x = seed | 1;
    (0..n)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            let r = (x >> 11) as f64 / (1u64 << 53) as f64;
            (r * r * universe as f64) as u64
        })
        .collect()
}

fn run(profiler: &mut Profiler, ids: &[u64]) -> MrcCurve {
    let mut reader = MemoryReader::from_ids(ids);
    profiler.run(&mut reader).unwrap()
}

/// Exact LRU hit counts by brute-force stack distances.
fn exact_lru_hits(ids: &[u64], points: &[u64]) -> Vec<u64> {
    let mut hits = vec![0u64; points.len()];
    for (i, &id) in ids.iter().enumerate() {
        let Some(prev) = ids[..i].iter().rposition(|&x| x == id) else {
            continue;
        };
        let mut distinct: Vec<u64> = ids[prev..i].to_vec();
        distinct.sort_unstable();
        distinct.dedup();
        let d = distinct.len() as u64;
        for (j, &p) in points.iter().enumerate() {
            if d <= p {
                hits[j] += 1;
            }
        }
    }
    hits
}

fn assert_monotone(curve: &MrcCurve) {
    for i in 1..curve.len() {
        assert!(
            curve.hit_count[i] >= curve.hit_count[i - 1],
            "hit_count not monotone at {i}"
        );
        assert!(
            curve.hit_bytes[i] >= curve.hit_bytes[i - 1],
            "hit_bytes not monotone at {i}"
        );
        assert!(
            curve.miss_rate(i) <= curve.miss_rate(i - 1) + 1e-12,
            "miss_rate not monotone at {i}"
        );
    }
}

// ============================================================================
// SHARDS
// ============================================================================

#[test]
fn shards_full_rate_matches_brute_force_lru() {
    let ids = skewed_ids(5_000, 120, 0x1234);
    let points = [5u64, 15, 40, 120];
    let curve = run(&mut shards("FIX_RATE,1.0,42", &points), &ids);
    let expected = exact_lru_hits(&ids, &points);
    for i in 0..points.len() {
        assert!(
            (curve.hit_count[i] - expected[i] as f64).abs() < 1e-9,
            "point {i}: shards {} vs exact {}",
            curve.hit_count[i],
            expected[i]
        );
    }
}

#[test]
fn shards_full_rate_is_seed_independent() {
    let ids = skewed_ids(3_000, 80, 7);
    let points = [10u64, 40, 80];
    let a = run(&mut shards("FIX_RATE,1.0,1", &points), &ids);
    let b = run(&mut shards("FIX_RATE,1.0,999", &points), &ids);
    assert_eq!(a.hit_count, b.hit_count);
    assert_eq!(a.hit_bytes, b.hit_bytes);
}

#[test]
fn shards_curves_are_monotone() {
    let ids = skewed_ids(40_000, 900, 0xabcdef);
    let points = [10u64, 50, 100, 300, 900];
    for params in [
        "FIX_RATE,1.0,42",
        "FIX_RATE,0.2,42",
        "FIX_RATE,0.05,42",
        "FIX_SIZE,128,42",
        "FIX_SIZE,16,42",
    ] {
        let curve = run(&mut shards(params, &points), &ids);
        assert_eq!(curve.n_req, 40_000);
        assert_monotone(&curve);
    }
}

#[test]
fn shards_sampling_stays_close_to_exact() {
    let ids = skewed_ids(150_000, 2_000, 0xfeed);
    let points = [50u64, 200, 800, 2_000];
    let exact = run(&mut shards("FIX_RATE,1.0,42", &points), &ids);
    for params in ["FIX_RATE,0.1,42", "FIX_SIZE,256,42"] {
        let estimate = run(&mut shards(params, &points), &ids);
        for i in 0..points.len() {
            let delta = (exact.miss_rate(i) - estimate.miss_rate(i)).abs();
            assert!(delta < 0.06, "{params} point {i}: delta {delta}");
        }
    }
}

#[test]
fn shards_weighted_bytes_follow_object_sizes() {
    // one hot large object, one cold small one
    let trace = vec![
        Request::new(1, 1, 900),
        Request::new(2, 2, 100),
        Request::new(3, 1, 900),
        Request::new(4, 2, 100),
    ];
    let points = [100u64, 1_000, 2_000];
    let params: ShardsParams = "FIX_RATE,1.0,42".parse().unwrap();
    let mut profiler = Profiler::shards(params, "lru", sizes(&points)).unwrap();
    let mut reader = MemoryReader::new(trace);
    let curve = profiler.run(&mut reader).unwrap();
    // reuse of 1 spans 1000 weighted bytes, reuse of 2 spans 1000 too
    assert_eq!(curve.hit_count, vec![0.0, 2.0, 2.0]);
    assert_eq!(curve.hit_bytes, vec![0.0, 1_000.0, 1_000.0]);
    assert_eq!(curve.sum_obj_size_req, 2_000);
}

// ============================================================================
// MINISIM
// ============================================================================

#[test]
fn minisim_agrees_with_shards_at_full_rate() {
    let ids = skewed_ids(25_000, 500, 0xc0ffee);
    let points = [25u64, 100, 250, 500];
    let shards_curve = run(&mut shards("FIX_RATE,1.0,42", &points), &ids);
    let sim_curve = run(&mut minisim("FIX_RATE,1.0,4", "lru", &points), &ids);
    for i in 0..points.len() {
        let delta = (shards_curve.miss_rate(i) - sim_curve.miss_rate(i)).abs();
        assert!(delta < 1e-9, "point {i}: delta {delta}");
    }
}

#[test]
fn minisim_sampled_estimate_tracks_the_truth() {
    let ids = skewed_ids(150_000, 2_000, 0xdead);
    let points = [100u64, 500, 1_000, 2_000];
    let truth = run(&mut minisim("FIX_RATE,1.0,2", "lru", &points), &ids);
    let estimate = run(&mut minisim("FIX_RATE,0.1,4", "lru", &points), &ids);
    for i in 0..points.len() {
        let delta = (truth.miss_rate(i) - estimate.miss_rate(i)).abs();
        assert!(delta < 0.06, "point {i}: delta {delta}");
    }
}

#[test]
fn minisim_runs_every_policy() {
    let ids = skewed_ids(10_000, 300, 0xbeef);
    let points = [30u64, 120, 300];
    for algo in ["lru", "fifo", "clock", "belady-online"] {
        let curve = run(&mut minisim("FIX_RATE,1.0,2", algo, &points), &ids);
        assert_eq!(curve.n_req, 10_000);
        for i in 0..curve.len() {
            let rate = curve.miss_rate(i);
            assert!((0.0..=1.0).contains(&rate), "{algo} point {i}");
        }
    }
}

#[test]
fn belady_is_a_lower_bound_for_every_policy() {
    let ids = skewed_ids(20_000, 400, 0x7777);
    let points = [40u64, 160, 400];
    let opt = run(&mut minisim("FIX_RATE,1.0,2", "belady-online", &points), &ids);
    for algo in ["lru", "fifo", "clock"] {
        let curve = run(&mut minisim("FIX_RATE,1.0,2", algo, &points), &ids);
        for i in 0..points.len() {
            assert!(
                opt.miss_rate(i) <= curve.miss_rate(i) + 1e-9,
                "{algo} beat OPT at point {i}"
            );
        }
    }
}

#[test]
fn minisim_thread_counts_do_not_change_results() {
    let ids = skewed_ids(20_000, 500, 0x5555);
    let points = [50u64, 100, 200, 350, 500];
    let single = run(&mut minisim("FIX_RATE,0.25,1", "lru", &points), &ids);
    let many = run(&mut minisim("FIX_RATE,0.25,8", "lru", &points), &ids);
    assert_eq!(single.hit_count, many.hit_count);
    assert_eq!(single.hit_bytes, many.hit_bytes);
}

// ============================================================================
// CROSS-CUTTING
// ============================================================================

#[test]
fn curves_expose_the_trace_totals() {
    let trace: Vec<Request> = (0..100)
        .map(|i| Request::new(i, i % 10, 7))
        .collect();
    let points = [7u64 * 10, 7 * 20];
    let params: ShardsParams = "FIX_RATE,1.0,0".parse().unwrap();
    let mut profiler = Profiler::shards(params, "lru", sizes(&points)).unwrap();
    let mut reader = MemoryReader::new(trace);
    let curve = profiler.run(&mut reader).unwrap();
    assert_eq!(curve.n_req, 100);
    assert_eq!(curve.sum_obj_size_req, 700);
    // hit counters never exceed the totals
    for i in 0..curve.len() {
        assert!(curve.hit_count[i] <= 100.0 + 1e-9);
        assert!(curve.hit_bytes[i] <= 700.0 + 1e-9);
    }
}

#[test]
fn reader_reuse_across_profilers() {
    // the MINISIM pass installs a sampler; a fresh profiler on the same
    // reader must reset it explicitly first
    let ids = skewed_ids(5_000, 200, 0x99);
    let points = [20u64, 200];
    let mut reader = MemoryReader::from_ids(&ids);
    let mut sim = minisim("FIX_RATE,0.5,2", "lru", &points);
    let first = sim.run(&mut reader).unwrap();
    assert_eq!(first.n_req, 5_000);

    let mut fresh = MemoryReader::from_ids(&ids);
    let mut sh = shards("FIX_RATE,1.0,42", &points);
    let second = sh.run(&mut fresh).unwrap();
    assert_eq!(second.n_req, 5_000);
}
