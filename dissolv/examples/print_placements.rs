//! Print every placement request built from a board file.

use dissolv::prelude::*;
use std::path::Path;

fn main() -> Result<(), DissolvError> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tests/fixtures/two_footprints.kicad_pcb".to_string());
    let path = Path::new(&path);

    if !path.exists() {
        eprintln!("File not found: {}", path.display());
        eprintln!("Usage: cargo run --example print_placements [path/to/board.kicad_pcb]");
        std::process::exit(1);
    }

    let mut backend = RecordingBackend::new();
    let result = DissolvCore::build_and_apply(path, &BuildConfig::default(), &mut backend)?;
    let batch = &result.batch;

    println!("Placement requests for: {}", result.file.display());
    println!("Total requests: {}", batch.request_count());
    println!();

    for trace in &batch.traces {
        println!(
            "  {:<14} {:>2} {:>8.4}mm at {} ({})",
            trace.name, trace.compass, trace.length, trace.origin, trace.net
        );
    }
    for via in &batch.vias {
        println!("  {:<14} r={:.3} at {}", via.name, via.radius, via.origin);
    }
    for pad in &batch.pads {
        println!("  {:<14} at {}", pad.name, pad.origin);
    }
    for model in &batch.models {
        println!("  {:<14} {} at {}", model.name, model.path.display(), model.origin);
    }

    for event in &result.events {
        if let BuildEvent::TraceExcluded { name, length, .. } = event {
            println!("  {} excluded ({:.4}mm)", name, length);
        }
    }

    Ok(())
}
