use std::time::Instant;

use eframe::{App, Frame, NativeOptions, egui, run_native};
use egui::{ColorImage, TextureHandle, Vec2};
use log::{error, info};
use portal_core::preview::render_preview;
use portal_core::{Biome, Detail, LevelData, LevelGenerator, TerrainConfig, TerrainMeshes};

struct LevelApp {
    // parameters
    seed: u64,
    width: f32,
    depth: f32,
    biome: Biome,
    detail: Detail,
    racing_friendly: bool,

    generator: LevelGenerator,

    // last level shown, with its meshes for the stats panel
    level: Option<LevelData>,
    meshes: Option<TerrainMeshes>,
    preview: Option<image::RgbImage>,
    texture: Option<TextureHandle>,

    // timing & status
    last_duration: Option<f32>,
    status_message: String,
}

impl Default for LevelApp {
    fn default() -> Self {
        Self {
            seed: 2025,
            width: 200.0,
            depth: 300.0,
            biome: Biome::Forest,
            detail: Detail::Medium,
            racing_friendly: true,
            generator: LevelGenerator::default(),
            level: None,
            meshes: None,
            preview: None,
            texture: None,
            last_duration: None,
            status_message: String::new(),
        }
    }
}

impl LevelApp {
    fn generate(&mut self, ctx: &egui::Context) {
        let start = Instant::now();
        let config = TerrainConfig::new(self.seed, self.width, self.depth, self.biome)
            .with_detail(self.detail)
            .with_racing_friendly(self.racing_friendly);

        match self.generator.generate_level(&config) {
            Ok(generated) => {
                self.last_duration = Some(start.elapsed().as_secs_f32() * 1000.0);
                self.show(ctx, generated.level_data, generated.meshes);
                self.status_message = format!(
                    "Generated in {:.2} ms (seed {})",
                    self.last_duration.unwrap_or_default(),
                    self.seed
                );
            }
            Err(e) => {
                error!("generation failed: {e}");
                self.status_message = e.to_string();
            }
        }
    }

    // Same path a remote client takes: meshes are rebuilt from the level data.
    fn load(&mut self, ctx: &egui::Context) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Level JSON", &["json"])
            .pick_file()
        else {
            return;
        };
        let loaded = std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|text| serde_json::from_str::<LevelData>(&text).map_err(|e| e.to_string()))
            .and_then(|level| {
                self.generator
                    .generate_terrain_meshes_from_level(&level)
                    .map(|meshes| (level, meshes))
                    .map_err(|e| e.to_string())
            });
        match loaded {
            Ok((level, meshes)) => {
                self.seed = level.metadata.seed;
                self.biome = level.biome;
                self.status_message = format!("Loaded {}", level.id);
                self.show(ctx, level, meshes);
            }
            Err(e) => {
                error!("could not load {}: {e}", path.display());
                self.status_message = format!("Load failed: {e}");
            }
        }
    }

    fn show(&mut self, ctx: &egui::Context, level: LevelData, meshes: TerrainMeshes) {
        match render_preview(&level) {
            Ok(img) => {
                let size = [img.width() as usize, img.height() as usize];
                let color_image = ColorImage::from_rgb(size, img.as_raw());
                self.texture =
                    Some(ctx.load_texture("level", color_image, egui::TextureOptions::NEAREST));
                self.preview = Some(img);
            }
            Err(e) => {
                self.texture = None;
                self.preview = None;
                self.status_message = e.to_string();
            }
        }
        self.level = Some(level);
        self.meshes = Some(meshes);
        ctx.request_repaint();
    }

    fn save_png(&mut self) {
        let (Some(img), Some(level)) = (&self.preview, &self.level) else {
            return;
        };
        let Some(path) = rfd::FileDialog::new()
            .add_filter("PNG", &["png"])
            .set_file_name(format!("{}.png", level.id))
            .save_file()
        else {
            return;
        };
        self.status_message = match img.save(&path) {
            Ok(()) => format!("Saved {}", path.display()),
            Err(e) => format!("Save failed: {e}"),
        };
    }

    fn export_json(&mut self) {
        let Some(level) = &self.level else {
            return;
        };
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Level JSON", &["json"])
            .set_file_name(format!("{}.json", level.id))
            .save_file()
        else {
            return;
        };
        let written = serde_json::to_string_pretty(level)
            .map_err(|e| e.to_string())
            .and_then(|text| std::fs::write(&path, text).map_err(|e| e.to_string()));
        self.status_message = match written {
            Ok(()) => {
                info!("exported {} to {}", level.id, path.display());
                format!("Exported {}", path.display())
            }
            Err(e) => format!("Export failed: {e}"),
        };
    }
}

impl App for LevelApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        egui::SidePanel::left("controls").show(ctx, |ui| {
            ui.heading("Level Generator");
            ui.separator();

            ui.label("Seed");
            ui.add(egui::DragValue::new(&mut self.seed).speed(1.0));

            egui::ComboBox::from_label("Biome")
                .selected_text(self.biome.as_str())
                .show_ui(ui, |ui| {
                    for biome in Biome::ALL {
                        ui.selectable_value(&mut self.biome, biome, biome.as_str());
                    }
                });

            egui::ComboBox::from_label("Detail")
                .selected_text(self.detail.as_str())
                .show_ui(ui, |ui| {
                    for detail in Detail::ALL {
                        ui.selectable_value(&mut self.detail, detail, detail.as_str());
                    }
                });

            ui.label("Width");
            ui.add(egui::Slider::new(&mut self.width, 32.0..=512.0).step_by(8.0));
            ui.label("Length");
            ui.add(egui::Slider::new(&mut self.depth, 32.0..=512.0).step_by(8.0));

            ui.checkbox(&mut self.racing_friendly, "Racing friendly");

            ui.separator();

            if ui.button("Generate Level").clicked() {
                self.generate(ctx);
            }
            if ui.button("Load JSON…").clicked() {
                self.load(ctx);
            }
            if ui.button("Save PNG…").clicked() {
                self.save_png();
            }
            if ui.button("Export JSON…").clicked() {
                self.export_json();
            }

            ui.separator();
            if let (Some(level), Some(meshes)) = (&self.level, &self.meshes) {
                let theme = &level.metadata;
                ui.label(&level.id);
                ui.label(format!(
                    "{} / {} (difficulty {})",
                    theme.theme, theme.mood, theme.difficulty
                ));
                ui.label(format!(
                    "terrain: {} vertices, {} triangles",
                    meshes.terrain.vertex_count(),
                    meshes.terrain.triangle_count()
                ));
                ui.label(format!("obstacles: {}", level.geometry.obstacles.len()));
                for batch in &meshes.vegetation {
                    ui.label(format!(
                        "  {}: {}",
                        batch.vegetation_type.as_str(),
                        batch.instance_count()
                    ));
                }
            }

            ui.separator();
            ui.label(&self.status_message);
        });

        // central display
        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(tex) = &self.texture {
                // fit the preview, keeping the level's aspect ratio
                let available = ui.available_size();
                let [w, h] = tex.size().map(|v| v as f32);
                let scale = (available.x / w).min(available.y / h);
                ui.image((tex.id(), Vec2::new(w * scale, h * scale)));
            } else {
                ui.centered_and_justified(|ui| {
                    ui.label("Click “Generate Level” to start");
                });
            }
        });
    }
}

fn main() {
    simple_logger::init_with_level(log::Level::Info).unwrap();

    let opts = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 700.0])
            .with_min_inner_size([400.0, 300.0]),
        ..Default::default()
    };
    run_native(
        "Portal Level Generator",
        opts,
        Box::new(|_cc| Ok(Box::new(LevelApp::default()))),
    )
    .unwrap();
}
