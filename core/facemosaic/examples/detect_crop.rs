//! Run the SeetaFace detector on photos and print the export crop each one
//! would get.
//!
//! Usage:
//!   cargo run --example detect_crop --features rustface -- <model.bin> <image>...

use facemosaic::{
    decode_image, resolve_crop, CropConfig, DetectorChain, FaceDetector, RustfaceDetector,
};

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((model_path, paths)) = args.split_first() else {
        eprintln!("usage: detect_crop <model.bin> <image>...");
        std::process::exit(2);
    };

    let model_data = std::fs::read(model_path).expect("failed to read model");
    let detector = DetectorChain::new().tier(Box::new(
        RustfaceDetector::from_model_bytes(&model_data).expect("failed to load model"),
    ));
    let config = CropConfig::default();

    for path in paths {
        let input = std::fs::read(path).unwrap();
        let image = decode_image(&input).unwrap();
        let (width, height) = image.dimensions();
        println!("=== {path} ({width}x{height}) ===");

        let detection = detector.detect(&image);
        match &detection {
            Some(d) => println!(
                "  face: confidence={:.2}, box=({:.0}, {:.0}, {:.0}x{:.0})",
                d.confidence, d.face.x, d.face.y, d.face.width, d.face.height
            ),
            None => println!("  no face, using center crop"),
        }

        let crop = resolve_crop(width, height, detection.as_ref(), &config);
        println!(
            "  crop: left={}, top={}, size={}",
            crop.left, crop.top, crop.size
        );
    }
}
