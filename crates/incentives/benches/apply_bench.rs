//! Benchmarks for a fully stacked incentives calculation.
//! Run with: cargo bench -p dsh-incentives

use chrono::{TimeZone, Utc};
use dsh_core::incentives::{IncentiveContext, IncentivesSnapshot, UserType};
use dsh_incentives::IncentivesEngine;
use std::path::PathBuf;

fn stacked_order() -> IncentiveContext {
    IncentiveContext {
        city: Some("Sanaa".to_string()),
        category: Some("supermarket".to_string()),
        subscription_plan_id: Some("sub_user_pro_monthly".to_string()),
        coupon_code: Some("WELCOME10".to_string()),
        points_to_redeem: Some(300),
        user_type: UserType::New,
        ..IncentiveContext::new(42000, 5000)
    }
}

fn main() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config/incentives.toml");
    let snapshot = IncentivesSnapshot::load(path).expect("Failed to load snapshot");
    let engine = IncentivesEngine::try_new(snapshot).expect("Invalid snapshot");
    let context = stacked_order();
    let now = Utc
        .with_ymd_and_hms(2025, 6, 13, 18, 0, 0)
        .single()
        .expect("valid timestamp");

    // Warmup
    for _ in 0..100 {
        std::hint::black_box(engine.apply_at(&context, now));
    }

    // Benchmark
    let iterations: u32 = 100_000;
    let start = std::time::Instant::now();

    for _ in 0..iterations {
        std::hint::black_box(engine.apply_at(std::hint::black_box(&context), now));
    }

    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations;

    println!("=== Incentives Benchmark ===");
    println!("Iterations:  {}", iterations);
    println!("Total time:  {:?}", elapsed);
    println!("Per call:    {:?}", per_iter);
    println!(
        "Throughput:  {:.0} calculations/sec",
        iterations as f64 / elapsed.as_secs_f64()
    );
}
