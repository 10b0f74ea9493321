//! # Navigation Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::time::{Duration, Instant};

use nalgebra::Point2;
use nav_lib::{
    avoid::{min_distance_to_segment, AvoidPlanner, Obstacle, Params},
    loc::Pose,
    params::NavParams,
    traj_ctrl::{InputData, TrajCtrl, Waypoint},
};
use util::module::State;

fn planner_benchmark(c: &mut Criterion) {
    // ---- Build the planner and a ring of query points around the obstacle ----

    let obstacle = Obstacle { x_mm: 250, y_mm: 250, radius_mm: 30.0 };
    let goal = Point2::new(400.0, 250.0);

    let points: Vec<Point2<f64>> = (0..360)
        .map(|d| {
            let a = (d as f64).to_radians();
            Point2::new(250.0 + 120.0 * a.cos(), 250.0 + 120.0 * a.sin())
        })
        .collect();

    c.bench_function("min_distance_to_segment", |b| {
        let centre = Point2::new(250.0, 250.0);
        b.iter(|| {
            for p in points.iter() {
                black_box(min_distance_to_segment(&centre, p, &goal));
            }
        })
    });

    c.bench_function("AvoidPlanner::query", |b| {
        let mut planner = AvoidPlanner::new(Some(obstacle), &Params::default()).unwrap();
        b.iter(|| {
            for p in points.iter() {
                black_box(planner.query(p, &goal));
            }
        })
    });

    // ---- Full trajectory control cycle ----

    let params = NavParams {
        waypoints: vec![Waypoint { x_mm: 400, y_mm: 250, reach_radius_mm: 20.0 }],
        obstacle: Some(obstacle),
        ..Default::default()
    };

    let mut traj_ctrl = TrajCtrl::default();
    traj_ctrl.init(params, None).unwrap();

    let t0 = Instant::now();
    let mut i = 0u32;

    c.bench_function("TrajCtrl::proc", |b| {
        b.iter(|| {
            i += 1;
            let input = InputData {
                pose: Pose { x_mm: 120, y_mm: 260, heading_deg: 10 },
                now: t0 + Duration::from_millis(50) * i,
            };
            black_box(traj_ctrl.proc(&input).unwrap())
        })
    });
}

criterion_group!(benches, planner_benchmark);
criterion_main!(benches);
