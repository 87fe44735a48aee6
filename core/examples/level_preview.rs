use portal_core::preview::render_preview;
use portal_core::{Biome, Detail, LevelGenerator, TerrainConfig};
use std::path::Path;

// Render a top-down preview of one level per biome.
// Usage: cargo run -p portal_core --example level_preview [seed]
fn main() {
    simple_logger::init_with_level(log::Level::Info).unwrap();

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(2025);
    let generator = LevelGenerator::default();

    for biome in Biome::ALL {
        let config = TerrainConfig::new(seed, 200.0, 300.0, biome).with_detail(Detail::High);
        let level = generator.generate_level(&config).unwrap();
        let img = render_preview(&level.level_data).unwrap();

        let name = format!("preview_{}_{}.png", biome, seed);
        let path = Path::new(&name);
        img.save(path).unwrap();
        println!(
            "Saved {} ({} obstacles) to {:?}",
            level.level_data.id,
            level.level_data.geometry.obstacles.len(),
            path
        );
    }
}
