use sim::{simulate_concurrent_editing, walkthrough};
pub mod sim;

fn main() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async_main());
}

async fn async_main() {
    println!("══════════════════════════════════════════════════");
    println!(" Concurrent edit walkthrough");
    println!("══════════════════════════════════════════════════");
    walkthrough().await;

    println!();
    println!("══════════════════════════════════════════════════");
    println!(" Randomized convergence runs");
    println!("══════════════════════════════════════════════════");

    let stats = simulate_concurrent_editing(2, 25, 7).await;
    stats.print();
    assert!(stats.converged);

    let stats = simulate_concurrent_editing(4, 50, 11).await;
    stats.print();
    assert!(stats.converged);

    let stats = simulate_concurrent_editing(8, 100, 13).await;
    stats.print();
    assert!(stats.converged);

    println!("\n✓ all replicas converged");
}
