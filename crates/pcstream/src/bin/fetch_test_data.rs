//! Load a point cloud and save a decoded summary for cross-checking.
//!
//! Usage: `fetch_test_data <url-or-path> [depth] [stride]`
//!
//! HTTP(S) locators are fetched with range requests. Local COPC files and
//! EPT directories are read into memory first.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use pcstream::{Client, Fetch, HttpFetcher, LoadOptions, LoadedCloud, MemoryCache, MemoryStore};

const OUTPUT_DIR: &str = "test_vectors";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let Some(locator) = args.next() else {
        eprintln!("usage: fetch_test_data <url-or-path> [depth] [stride]");
        std::process::exit(2);
    };
    let depth = args.next().map(|s| s.parse()).transpose()?.unwrap_or(2);
    let stride = args.next().map(|s| s.parse()).transpose()?.unwrap_or(1);
    let options = LoadOptions::default().with_depth(depth).with_stride(stride);

    let output_path = Path::new(OUTPUT_DIR);
    fs::create_dir_all(output_path)?;

    println!("Loading {locator} (depth {depth}, stride {stride})...\n");

    let loaded = if locator.starts_with("http://") || locator.starts_with("https://") {
        load(Client::with_cache(HttpFetcher::new(), MemoryCache::new()), &locator, &options).await?
    } else {
        let store = read_local(Path::new(&locator))?;
        println!("   Read {} local files", store.len());
        load(Client::new(store), &locator, &options).await?
    };

    save_summary(output_path, &locator, &options, &loaded)?;
    print_summary(&loaded);

    Ok(())
}

async fn load<F: Fetch, C: pcstream::Cache>(
    client: Client<F, C>,
    locator: &str,
    options: &LoadOptions,
) -> Result<LoadedCloud, Box<dyn std::error::Error>> {
    let dataset = client.open(locator).await?;
    println!(
        "1. Opened {:?} dataset: {} points, spacing {:.3}",
        dataset.dialect, dataset.point_count, dataset.spacing
    );

    let hierarchy = client.resolve(&dataset, options.depth).await?;
    println!(
        "2. Resolved hierarchy: {} nodes, {} tiles selected",
        hierarchy.len(),
        hierarchy.select().len()
    );

    println!("3. Loading tiles...");
    Ok(client.load(&dataset, options).await?)
}

/// Read a local COPC file, or every file below an EPT directory.
fn read_local(path: &Path) -> Result<MemoryStore, Box<dyn std::error::Error>> {
    let mut store = MemoryStore::new();
    if path.is_file() {
        store.insert(path.to_string_lossy(), fs::read(path)?);
        return Ok(store);
    }

    let mut pending = vec![path.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?.path();
            if entry.is_dir() {
                pending.push(entry);
            } else {
                let locator = entry.to_string_lossy().replace('\\', "/");
                store.insert(locator, fs::read(&entry)?);
            }
        }
    }
    Ok(store)
}

fn save_summary(
    output_path: &Path,
    locator: &str,
    options: &LoadOptions,
    loaded: &LoadedCloud,
) -> Result<(), Box<dyn std::error::Error>> {
    let cloud = &loaded.cloud;
    let report = &loaded.report;
    let summary = serde_json::json!({
        "locator": locator,
        "options": options,
        "points": cloud.len(),
        "bounds": {
            "min": cloud.bounds.min.to_array(),
            "max": cloud.bounds.max.to_array(),
        },
        "sphere": {
            "center": cloud.sphere.center.to_array(),
            "radius": cloud.sphere.radius,
        },
        "elevation": {
            "p1": loaded.elevation.p1,
            "p99": loaded.elevation.p99,
            "range": loaded.elevation.range,
        },
        "has_color": cloud.colors.is_some(),
        "has_intensity": cloud.intensity.is_some(),
        "has_classification": cloud.classification.is_some(),
        "first_positions": cloud.positions.chunks_exact(3).take(5).collect::<Vec<_>>(),
        "report": {
            "selected": report.selected,
            "decoded": report.decoded,
            "empty": report.empty,
            "lfs_placeholders": report.lfs_placeholders,
            "skipped": report.skipped,
            "failures": report.failures.iter().map(|f| {
                serde_json::json!({ "key": f.key.to_string(), "error": f.error.to_string() })
            }).collect::<Vec<_>>(),
        },
    });

    let summary_path = output_path.join("summary.json");
    File::create(&summary_path)?.write_all(serde_json::to_string_pretty(&summary)?.as_bytes())?;
    println!("   Saved summary to {}", summary_path.display());
    Ok(())
}

fn print_summary(loaded: &LoadedCloud) {
    let report = &loaded.report;
    println!("\n=== Summary ===");
    println!("  Points:        {}", loaded.cloud.len());
    println!(
        "  Tiles:         {} selected, {} decoded, {} empty, {} failed",
        report.selected,
        report.decoded,
        report.empty,
        report.failures.len()
    );
    if report.lfs_placeholders > 0 {
        println!("  LFS pointers:  {}", report.lfs_placeholders);
    }
    println!(
        "  Elevation:     p1={:.2} p99={:.2} range={:.2}",
        loaded.elevation.p1, loaded.elevation.p99, loaded.elevation.range
    );
    for failure in &report.failures {
        println!("  ! {}: {}", failure.key, failure.error);
    }
}
