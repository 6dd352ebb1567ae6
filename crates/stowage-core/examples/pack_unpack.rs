//! Example: Packing and unpacking with stowage-core
//!
//! Run with: `RUST_LOG=debug cargo run --example pack_unpack`

use stowage_core::PackConfig;
use stowage_core::formats::GzipPacker;
use stowage_core::formats::GzipUnpacker;
use stowage_core::formats::Pack;
use stowage_core::formats::Unpack;
use stowage_core::pack_archive;
use stowage_core::unpack_archive;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let temp = tempfile::tempdir()?;
    let site = temp.path().join("site");
    std::fs::create_dir_all(site.join("assets"))?;
    std::fs::write(site.join("index.html"), "<h1>Hello, stowage!</h1>")?;
    std::fs::write(site.join("assets/app.js"), "console.log('hi');")?;

    // Example 1: tar.gz with names relative to the working directory
    println!("Example 1: tar.gz");
    let config = PackConfig::default().with_working_dir(&site);
    let archive = temp.path().join("site.tar.gz");
    let report = pack_archive(&archive, &["."], &config)?;
    println!("  Packed {} files ({} bytes)", report.files_added, report.bytes_written);

    let report = unpack_archive(&archive, temp.path().join("restored"))?;
    println!(
        "  Extracted {} files into {} new directories",
        report.files_extracted, report.directories_created
    );

    // Example 2: zip with maximum compression
    println!("\nExample 2: zip");
    let config = config.with_compression_level(9);
    let report = pack_archive(temp.path().join("site.zip"), &["index.html", "assets"], &config)?;
    println!("  Packed {} files in {:?}", report.files_added, report.duration);

    // Example 3: gzip a single file in place and back
    println!("\nExample 3: per-file gzip");
    let page = site.join("index.html");
    GzipPacker::new(&[&page]).pack()?;
    println!("  Compressed to {}", page.with_extension("html.gz").display());
    GzipUnpacker::new(&[page.with_extension("html.gz")]).unpack()?;
    println!("  Restored {}", page.display());

    println!("\nExamples completed successfully!");
    Ok(())
}
