use image::GenericImageView;
use std::env;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Panel resolution the splash image is fitted to
const SPLASH_WIDTH: u32 = 400;
const SPLASH_HEIGHT: u32 = 300;

/// Convert a PNG image to a packed 1-bpp frame at build time
///
/// Rows are `width / 8` bytes, the leftmost pixel in the most significant bit,
/// `1` = ink. The image keeps its aspect ratio and is centered on a light
/// background.
fn convert_image_to_binary(
    input_path: &str,
    output_path: &Path,
    target_width: u32,
    target_height: u32,
    threshold: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    // Check if input file exists
    if !Path::new(input_path).exists() {
        println!("cargo:warning=Image file '{}' not found, skipping conversion", input_path);
        // Create empty file so the include_bytes! in main.rs still resolves
        File::create(output_path)?;
        return Ok(());
    }

    let img = image::open(input_path)?;
    let (orig_width, orig_height) = img.dimensions();
    let orig_ratio = orig_width as f32 / orig_height as f32;
    let target_ratio = target_width as f32 / target_height as f32;

    let (new_width, new_height) = if orig_ratio > target_ratio {
        // Image is wider than target - fit to width
        (target_width, (target_width as f32 / orig_ratio) as u32)
    } else {
        // Image is taller than target - fit to height
        ((target_height as f32 * orig_ratio) as u32, target_height)
    };

    let gray = img
        .resize(new_width, new_height, image::imageops::FilterType::Lanczos3)
        .to_luma8();
    let (new_width, new_height) = gray.dimensions();

    let bytes_per_row = target_width.div_ceil(8);
    let mut buffer = vec![0u8; (bytes_per_row * target_height) as usize];

    let offset_x = (target_width - new_width) / 2;
    let offset_y = (target_height - new_height) / 2;

    for (ix, iy, pixel) in gray.enumerate_pixels() {
        // darker than the threshold is ink
        if pixel[0] < threshold {
            let (x, y) = (ix + offset_x, iy + offset_y);
            let byte_index = (y * bytes_per_row + x / 8) as usize;
            buffer[byte_index] |= 1 << (7 - (x % 8));
        }
    }

    let mut file = File::create(output_path)?;
    file.write_all(&buffer)?;

    println!(
        "cargo:warning=Splash image {}x{} packed into {} bytes",
        new_width,
        new_height,
        buffer.len()
    );
    Ok(())
}

fn main() {
    // Only the ESP-IDF target needs the esp-idf build environment
    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }

    let Some(out_dir) = env::var_os("OUT_DIR") else {
        println!("cargo:warning=OUT_DIR not set, cannot embed splash image");
        return;
    };
    let splash_output = Path::new(&out_dir).join("splash.bin");

    if let Err(e) = convert_image_to_binary(
        "splash.png",
        &splash_output,
        SPLASH_WIDTH,
        SPLASH_HEIGHT,
        128, // threshold (0-255, 128 = middle gray)
    ) {
        println!("cargo:warning=Failed to convert splash.png: {}", e);
        // fall back to no splash
        if let Err(e) = File::create(&splash_output) {
            println!("cargo:warning=Could not write {}: {}", splash_output.display(), e);
        }
    }

    println!("cargo:rerun-if-changed=splash.png");
    println!("cargo:rerun-if-changed=build.rs");
}
