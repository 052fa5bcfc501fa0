//! Example: Single-shot read of the V area
//!
//! Run with: cargo run --example simple_read
//!
//! This example demonstrates:
//! - Connecting through the viewer facade
//! - Reading a window and printing both projections
//! - The data block / flat memory fallback
//! - Input validation of the text fields

use s7_bitview::sim::SimulatedPlc;
use s7_bitview::{Viewer, ViewerError};
use tracing_subscriber::EnvFilter;

fn main() -> s7_bitview::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // =========================================================================
    // Connect to the (simulated) PLC
    // =========================================================================

    let plc = SimulatedPlc::new(1024);
    plc.write(100, &[0x01, 0x02, 0x03, 0b1011_0000, 0xFF, 0x00, 0x55, 0xAA]);

    let viewer = Viewer::new(plc.clone());
    viewer.connect("192.168.1.11")?;

    // =========================================================================
    // Read VB100..VB107
    // =========================================================================

    println!("=== Reading VB100, 8 bytes ===\n");

    let reading = viewer.read_once(100, 8)?;
    println!("Register words: {}", reading.words_text());
    println!("{}\n", reading.grid());

    // =========================================================================
    // Firmware without DB1 mapping: the flat memory path answers instead
    // =========================================================================

    println!("=== Data block path disabled ===\n");

    plc.set_data_block_failure(true);
    let reading = viewer.read_once(100, 2)?;
    println!("Register words: {}", reading.words_text());

    plc.set_flat_memory_failure(true);
    match viewer.read_once(100, 2) {
        Err(ViewerError::Read { data_block, flat_memory }) => {
            println!("Both paths failed: {data_block} / {flat_memory}");
        }
        other => println!("Unexpected: {:?}", other),
    }

    // =========================================================================
    // Text fields are validated before the session sees them
    // =========================================================================

    println!("\n=== Input validation ===\n");

    if let Err(e) = viewer.read_text("V100", "2") {
        println!("{}", e);
    }

    viewer.disconnect();
    Ok(())
}
