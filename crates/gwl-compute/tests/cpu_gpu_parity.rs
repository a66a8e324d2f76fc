//! CPU vs batched-device parity.
//!
//! Every property is checked through `LikelihoodBackend` on the CPU backend
//! and on the device backend with 1-4 emulated lanes.

use gwl_compute::{CpuBackend, GpuBackend, HostBlas};
use gwl_core::{Complex64, LikelihoodBackend, LikelihoodInputs, LikelihoodResult};
use proptest::prelude::*;

const TOL: f64 = 1e-9;

fn backends() -> Vec<Box<dyn LikelihoodBackend>> {
    let mut out: Vec<Box<dyn LikelihoodBackend>> =
        vec![Box::new(CpuBackend::new()), Box::new(CpuBackend::with_threads(3))];
    for n_devices in 1..=4 {
        out.push(Box::new(GpuBackend::new(HostBlas::lanes(n_devices)).unwrap()));
    }
    out
}

/// Deterministic pseudo-random series (LCG), amplitude roughly `amp`.
fn series(n: usize, seed: u64, amp: f64) -> Vec<Complex64> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut next = || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((state >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
    };
    (0..n).map(|_| Complex64::new(amp * next(), amp * next())).collect()
}

struct Case {
    data: [Vec<Complex64>; 3],
    templates: [Vec<Complex64>; 3],
    n_walkers: usize,
    stream_len: usize,
}

impl Case {
    fn random(n_walkers: usize, stream_len: usize, seed: u64) -> Self {
        let data = std::array::from_fn(|c| series(stream_len, seed + c as u64, 1.0));
        let templates =
            std::array::from_fn(|c| series(n_walkers * stream_len, seed + 100 + c as u64, 0.7));
        Self { data, templates, n_walkers, stream_len }
    }

    fn inputs(&self) -> LikelihoodInputs<'_> {
        LikelihoodInputs::new(
            [&self.data[0], &self.data[1], &self.data[2]],
            [&self.templates[0], &self.templates[1], &self.templates[2]],
            self.n_walkers,
            self.stream_len,
        )
        .unwrap()
    }

    fn run(&self, backend: &mut dyn LikelihoodBackend) -> LikelihoodResult {
        backend.compute(&self.inputs()).unwrap()
    }
}

fn close(a: f64, b: f64, scale: f64) -> bool {
    (a - b).abs() <= TOL * scale.max(1.0)
}

fn energy_scale(case: &Case) -> f64 {
    case.templates.iter().chain(case.data.iter()).flatten().map(|v| v.norm_sqr()).sum()
}

#[test]
fn unit_cycle_scenario_on_every_backend() {
    let d = vec![
        Complex64::new(1.0, 0.0),
        Complex64::new(0.0, 1.0),
        Complex64::new(-1.0, 0.0),
        Complex64::new(0.0, -1.0),
    ];
    let z = vec![Complex64::new(0.0, 0.0); 4];
    let case = Case {
        data: [d.clone(), z.clone(), z.clone()],
        templates: [
            d.iter().chain(z.iter()).copied().collect(),
            vec![Complex64::new(0.0, 0.0); 8],
            vec![Complex64::new(0.0, 0.0); 8],
        ],
        n_walkers: 2,
        stream_len: 4,
    };
    for mut backend in backends() {
        let r = case.run(backend.as_mut());
        assert_eq!(r.h_h, vec![4.0, 0.0], "{}", backend.name());
        assert_eq!(r.d_h, vec![4.0, 0.0], "{}", backend.name());
    }
}

#[test]
fn backends_agree_and_energy_is_non_negative() {
    let case = Case::random(37, 257, 7);
    let scale = energy_scale(&case);
    let mut cpu = CpuBackend::new();
    let reference = case.run(&mut cpu);
    for mut backend in backends() {
        let r = case.run(backend.as_mut());
        for w in 0..case.n_walkers {
            assert!(r.h_h[w] >= -TOL, "{} walker {w}", backend.name());
            assert!(close(r.d_h[w], reference.d_h[w], scale), "{} walker {w}", backend.name());
            assert!(close(r.h_h[w], reference.h_h[w], scale), "{} walker {w}", backend.name());
        }
    }
}

#[test]
fn zero_template_walker_is_exactly_zero() {
    let mut case = Case::random(5, 64, 11);
    for c in 0..3 {
        for v in &mut case.templates[c][2 * 64..3 * 64] {
            *v = Complex64::new(0.0, 0.0);
        }
    }
    for mut backend in backends() {
        let r = case.run(backend.as_mut());
        assert_eq!(r.d_h[2], 0.0, "{}", backend.name());
        assert_eq!(r.h_h[2], 0.0, "{}", backend.name());
        assert!(r.h_h[1] > 0.0);
    }
}

#[test]
fn self_energy_identity() {
    // data := template of walker 0 → d_h[0] == h_h[0], bit for bit
    let mut case = Case::random(3, 1001, 13);
    for c in 0..3 {
        case.data[c] = case.templates[c][..1001].to_vec();
    }
    for mut backend in backends() {
        let r = case.run(backend.as_mut());
        assert_eq!(r.d_h[0], r.h_h[0], "{}", backend.name());
    }
}

#[test]
fn channel_additivity_on_devices() {
    let case = Case::random(6, 40, 17);
    let scale = energy_scale(&case);
    let mut gpu = GpuBackend::new(HostBlas::lanes(2)).unwrap();
    let full = case.run(&mut gpu);

    let mut d_sum = vec![0.0; 6];
    let mut h_sum = vec![0.0; 6];
    for keep in 0..3 {
        let single = Case {
            data: std::array::from_fn(|c| {
                if c == keep { case.data[c].clone() } else { vec![Complex64::new(0.0, 0.0); 40] }
            }),
            templates: std::array::from_fn(|c| {
                if c == keep {
                    case.templates[c].clone()
                } else {
                    vec![Complex64::new(0.0, 0.0); 6 * 40]
                }
            }),
            n_walkers: 6,
            stream_len: 40,
        };
        let r = single.run(&mut gpu);
        for w in 0..6 {
            d_sum[w] += r.d_h[w];
            h_sum[w] += r.h_h[w];
        }
    }
    for w in 0..6 {
        assert!(close(full.d_h[w], d_sum[w], scale));
        assert!(close(full.h_h[w], h_sum[w], scale));
    }
}

#[test]
fn scaling_law_on_every_backend() {
    let case = Case::random(4, 33, 19);
    let scale = energy_scale(&case);
    for mut backend in backends() {
        let base = case.run(backend.as_mut());
        for s in [-3.0, 0.25, 2.0] {
            let scaled = Case {
                data: case.data.clone(),
                templates: std::array::from_fn(|c| {
                    case.templates[c].iter().map(|v| *v * s).collect()
                }),
                n_walkers: case.n_walkers,
                stream_len: case.stream_len,
            };
            let r = scaled.run(backend.as_mut());
            for w in 0..case.n_walkers {
                assert!(close(r.d_h[w], s * base.d_h[w], scale * s.abs()));
                assert!(close(r.h_h[w], s * s * base.h_h[w], scale * s * s));
            }
        }
    }
}

#[test]
fn walker_permutation_is_carried_to_outputs() {
    let case = Case::random(7, 24, 23);
    let perm = [6, 2, 0, 5, 1, 4, 3];
    let permuted = Case {
        data: case.data.clone(),
        templates: std::array::from_fn(|c| {
            perm.iter()
                .flat_map(|&w| case.templates[c][w * 24..(w + 1) * 24].iter().copied())
                .collect()
        }),
        n_walkers: 7,
        stream_len: 24,
    };
    let scale = energy_scale(&case);
    for mut backend in backends() {
        let r = case.run(backend.as_mut());
        let p = permuted.run(backend.as_mut());
        for (slot, &w) in perm.iter().enumerate() {
            assert!(close(p.d_h[slot], r.d_h[w], scale), "{}", backend.name());
            assert!(close(p.h_h[slot], r.h_h[w], scale), "{}", backend.name());
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_cpu_matches_devices(
        n_walkers in 1usize..24,
        stream_len in 1usize..130,
        n_devices in 1usize..5,
        seed in 0u64..10_000,
    ) {
        let case = Case::random(n_walkers, stream_len, seed);
        let scale = energy_scale(&case);
        let cpu = case.run(&mut CpuBackend::new());
        let gpu = case.run(&mut GpuBackend::new(HostBlas::lanes(n_devices)).unwrap());
        for w in 0..n_walkers {
            prop_assert!(close(cpu.d_h[w], gpu.d_h[w], scale));
            prop_assert!(close(cpu.h_h[w], gpu.h_h[w], scale));
            prop_assert!(gpu.h_h[w] >= 0.0);
        }
    }
}
