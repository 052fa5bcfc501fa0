//! Example: Monitoring a few bytes of the V area
//!
//! Run with: cargo run --example monitor
//!
//! This example demonstrates:
//! - Starting and stopping the background poll loop
//! - Feeding poll results into the bit grid
//! - Idempotent start/stop

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use s7_bitview::display::BitGrid;
use s7_bitview::sim::SimulatedPlc;
use s7_bitview::{PollerConfig, SessionConfig, Viewer};
use tracing_subscriber::EnvFilter;

fn main() -> s7_bitview::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let plc = SimulatedPlc::new(1024);
    let viewer = Viewer::with_config(
        plc.clone(),
        SessionConfig::new(),
        PollerConfig::new().with_interval(Duration::from_millis(250)),
    );
    viewer.connect("192.168.1.11")?;

    // =========================================================================
    // Start monitoring VB200 (length is clamped to 4 bytes)
    // =========================================================================

    let (tx, rx) = mpsc::channel();
    viewer.start_monitoring(200, 16, move |bits| {
        let _ = tx.send(bits);
    });

    // A second start while running does nothing
    assert!(!viewer.start_monitoring(200, 1, |_| {}));

    // Let the PLC "count" while we watch
    let writer = {
        let plc = plc.clone();
        thread::spawn(move || {
            for counter in 0u32..8 {
                plc.write(200, &counter.to_be_bytes());
                thread::sleep(Duration::from_millis(250));
            }
        })
    };

    let mut grid = BitGrid::new();
    for _ in 0..8 {
        match rx.recv_timeout(Duration::from_secs(2)) {
            Ok(bits) => {
                grid.update(&bits);
                let row: String = grid.rows().flatten().take(32).map(|cell| cell.symbol()).collect();
                println!("VB200..VB203: {}", row);
            }
            Err(_) => break,
        }
    }

    // =========================================================================
    // Stop
    // =========================================================================

    viewer.stop_monitoring();
    assert!(!viewer.stop_monitoring());
    let _ = writer.join();

    viewer.disconnect();
    Ok(())
}
