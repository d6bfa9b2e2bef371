use stress_test::{stress_test_ccounter, stress_test_registry, stress_test_rga, stress_test_scaling};
use tracing_subscriber::EnvFilter;
pub mod stress_test;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting weft stress tests");

    println!("\n\n╔════════════════════════════════════════════════════════════╗");
    println!("║            ASYNC STRESS TESTS                               ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    let mut all_converged = true;

    // Test 1: CCounter with small scale
    let stats = stress_test_ccounter(4, 100, 200).await;
    all_converged &= stats.converged;
    stats.print();

    // Test 2: RGA with small scale
    let stats = stress_test_rga(4, 100, 200).await;
    all_converged &= stats.converged;
    stats.print();

    // Test 3: CCounter with medium scale
    let stats = stress_test_ccounter(10, 500, 1000).await;
    all_converged &= stats.converged;
    stats.print();

    // Test 4: RGA with medium scale
    let stats = stress_test_rga(10, 500, 1000).await;
    all_converged &= stats.converged;
    stats.print();

    // Test 5: registry-created handles over JSON
    match stress_test_registry(4, 100, 200).await {
        Ok(stats) => {
            all_converged &= stats.converged;
            stats.print();
        }
        Err(err) => {
            tracing::error!(%err, "registry stress test failed");
            all_converged = false;
        }
    }

    // Test 6: Scaling analysis
    println!("\n\n╔════════════════════════════════════════════════════════════╗");
    println!("║          SCALING ANALYSIS (CCounter)                       ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    stress_test_scaling(20, 2).await;

    if all_converged {
        println!("\n✓ All stress tests completed successfully!");
    } else {
        println!("\n✗ Some replicas failed to converge");
        std::process::exit(1);
    }
}
