use portal_core::{LevelGenerator, LevelRequest};

// Read a level request as JSON on stdin and print the generated LevelData.
// echo '{"seed":7,"size":{"width":100,"height":150},"biome":"snow"}' | cargo run -p portal_core --example level_json
fn main() {
    simple_logger::init_with_level(log::Level::Info).unwrap();

    let request: LevelRequest = serde_json::from_reader(std::io::stdin().lock()).unwrap();
    match LevelGenerator::default().generate_from_request(&request) {
        Ok(level) => println!("{}", serde_json::to_string_pretty(&level.level_data).unwrap()),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
