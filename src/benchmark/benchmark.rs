use std::time::Instant;

use crate::configuration::config::SimulationConfig;
use crate::scheduler::control::Control;
use crate::scheduler::pool::WorkerPool;
use crate::simulation::engine::Simulation;
use crate::simulation::ordered_set::OrderedBodySet;
use crate::simulation::params::UniverseConstants;
use crate::simulation::phases::GravitationTask;
use crate::simulation::states::{Body, NVec3};
use crate::visualization::compositor::{Color, DepthCompositor};
use crate::visualization::frame::FrameCollector;

/// Helper to build `n` bodies on a deterministic curve
fn make_bodies(u: &UniverseConstants, n: usize) -> Vec<Body> {
    (0..n)
        .map(|i| {
            let i_f = i as f64;
            let pos = NVec3::new(
                (i_f * 0.37).sin() * 500.0,
                (i_f * 0.13).cos() * 500.0,
                (i_f * 0.07).sin() * 500.0,
            );
            Body::new(u, pos, u.mass_to_kg, 0.0)
        })
        .collect()
}

/// Gravitation phase for growing n and pool sizes
pub fn bench_gravitation() {
    let u = UniverseConstants::default();
    let ns = [200, 400, 800, 1600, 3200];
    let pools = [1, 2, 4, 8];

    for n in ns {
        let set = match OrderedBodySet::from_bodies(make_bodies(&u, n)) {
            Ok(set) => set,
            Err(e) => {
                println!("N = {n:5}: {e}");
                continue;
            }
        };

        let mut line = format!("N = {n:5}");
        for workers in pools {
            let pool = match WorkerPool::new(workers) {
                Ok(pool) => pool,
                Err(e) => {
                    println!("{e}");
                    return;
                }
            };
            let task = GravitationTask::new(&set, &u);

            // Warm up
            pool.run(&task);

            let t0 = Instant::now();
            pool.run(&task);
            let dt = t0.elapsed().as_secs_f64();
            line.push_str(&format!(", {workers} workers = {dt:8.6} s"));
        }
        println!("{line}");
    }
}

/// Dust writes into one pixel: growing numbers of overlapping halos
pub fn bench_compositor() {
    let counts = [10, 100, 1000, 10000];

    for count in counts {
        let out = match DepthCompositor::new(1, 1, 0.0001) {
            Ok(out) => out,
            Err(e) => {
                println!("{e}");
                return;
            }
        };

        let t0 = Instant::now();
        for i in 0..count {
            let i_f = i as f64;
            let z = 10.0 + (i_f * 0.61).sin() * 5.0;
            let range = 1.0 + (i_f * 0.23).cos().abs() * 3.0;
            // thin halos, so the chain rarely turns opaque
            if out.write_dust(0, 0, z, Color::new(200.0, 120.0, 40.0), range, range * 400.0).is_err() {
                println!("writes = {count:6}: storage exhausted");
                break;
            }
        }
        let dt_write = t0.elapsed().as_secs_f64();
        let intervals = out.dust_at(0, 0).len();

        let t1 = Instant::now();
        out.resolve_pixel(0, 0);
        let dt_resolve = t1.elapsed().as_secs_f64();

        println!(
            "writes = {count:6}, intervals = {intervals:6}, write = {:8.6} s, resolve = {:8.6} s",
            dt_write, dt_resolve
        );
    }
}

/// Full simulated seconds, frames included, on a small screen
pub fn bench_step() {
    println!("workers,ms_per_second");

    for workers in [1, 2, 4, 8] {
        let mut cfg = SimulationConfig::default();
        cfg.screen.width = 80;
        cfg.screen.height = 60;
        cfg.engine.workers = workers;
        cfg.engine.fps = 10;
        cfg.engine.seconds_per_cycle = 10;

        let mut sim = match Simulation::new(cfg) {
            Ok(sim) => sim,
            Err(e) => {
                println!("{e}");
                return;
            }
        };
        let mut sink = FrameCollector::new();
        let steps = 3;

        let t0 = Instant::now();
        for _ in 0..steps {
            if sim.step_second(&mut sink, 0, 0).is_err() {
                break;
            }
        }
        let ms = t0.elapsed().as_secs_f64() * 1000.0 / steps as f64;

        println!("{},{:.3}", workers, ms);
    }
}

/// Interruptible sort on reversed input
pub fn bench_sort() {
    let u = UniverseConstants::default();
    let control = Control::new(1);

    for n in [1000, 4000, 16000] {
        let mut set = match OrderedBodySet::from_bodies(make_bodies(&u, n)) {
            Ok(set) => set,
            Err(e) => {
                println!("{e}");
                return;
            }
        };
        // push every body to the mirrored distance, reversing the order
        let max = (0..n).map(|i| set.get_mut(i).distance).fold(0.0, f64::max);
        for i in 0..n {
            let b = set.get_mut(i);
            b.pos *= (max - b.distance + 1.0) / b.distance.max(1.0);
            b.update_distance();
        }

        let t0 = Instant::now();
        set.sort(&control);
        println!("N = {n:6}, sort = {:8.6} s", t0.elapsed().as_secs_f64());
    }
}
