//! Redact a band across the middle of each input photo and write the
//! `A`/`B`/`C` export set for every image.
//!
//! Usage:
//!   cargo run --example redact_batch -- <out_dir> <image>...

use std::path::Path;

use facemosaic::{Batch, Brush, BrushMode, ExportOptions, FailurePolicy, SessionConfig};

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((out_dir, paths)) = args.split_first() else {
        eprintln!("usage: redact_batch <out_dir> <image>...");
        std::process::exit(2);
    };

    let inputs: Vec<Vec<u8>> = paths
        .iter()
        .map(|p| std::fs::read(p).unwrap_or_else(|e| panic!("failed to read {p}: {e}")))
        .collect();

    let mut batch = Batch::prepare(
        &inputs,
        None,
        &SessionConfig::default(),
        FailurePolicy::Continue,
        |p| println!("prepared {}/{} ({}%)", p.completed, p.total, p.percent()),
    )
    .unwrap();

    for failure in batch.failures() {
        println!("  {}: {}", paths[failure.index], failure.error);
    }

    for index in 0..batch.len() {
        let session = batch.session_mut(index).unwrap();
        let (w, h) = session.original().dimensions();
        let radius = (w.min(h) / 10).max(1);
        session.set_brush(Brush::clamped(radius, BrushMode::Pixelate { block_size: radius / 3 }));

        session.open();
        let y = h as f64 / 2.0;
        session.begin_stroke(w as f64 * 0.2, y).unwrap();
        session.stroke_to(w as f64 * 0.8, y).unwrap();
        session.end_stroke().unwrap();
        session.commit().unwrap();

        let crop = session.crop_rect();
        println!(
            "  image {}: {w}x{h}, crop ({}, {}, {}x{})",
            index + 1,
            crop.left,
            crop.top,
            crop.size,
            crop.size
        );
    }

    let sets = batch
        .export(&ExportOptions::default(), |p| {
            println!("exported {}/{}", p.completed, p.total)
        })
        .unwrap();

    std::fs::create_dir_all(out_dir).unwrap();
    for set in &sets {
        for image in [&set.original, &set.mosaic, &set.cropped] {
            std::fs::write(Path::new(out_dir).join(&image.name), &image.data).unwrap();
        }
    }
}
