// Top-down preview image of a level: biome colour ramp, hillshade,
// vegetation dots and the two portals.

use image::{Rgb, RgbImage};

use crate::error::Result;
use crate::heightfield::HeightField;
use crate::level::LevelData;
use crate::utils::{HeightGradient, hillshade};

const START_COLOR: Rgb<u8> = Rgb([40, 200, 255]);
const END_COLOR: Rgb<u8> = Rgb([255, 80, 200]);
const AMBIENT: f32 = 0.35;

// One pixel per height sample. Row 0 of the image is the most negative z.
pub fn render_preview(level: &LevelData) -> Result<RgbImage> {
    let field = level.height_field()?;
    let mut img = render_heights(&field, &HeightGradient::for_biome(level.biome));

    for obstacle in &level.geometry.obstacles {
        let [r, g, b] = obstacle.kind.color();
        let color = Rgb([to_u8(r), to_u8(g), to_u8(b)]);
        let p = obstacle.position;
        if let Some((x, y)) = field.nearest_cell(p.x, p.z) {
            put(&mut img, x as i64, y as i64, color);
        }
    }

    for (point, color) in [(level.start(), START_COLOR), (level.end(), END_COLOR)] {
        if let Some((x, y)) = field.nearest_cell(point.x, point.z) {
            draw_marker(&mut img, x as i64, y as i64, color);
        }
    }
    Ok(img)
}

pub fn render_heights(field: &HeightField, gradient: &HeightGradient) -> RgbImage {
    let (min, max) = field.min_max();
    let shade = hillshade(field, 1.0);
    let mut img = RgbImage::new(field.cols() as u32, field.rows() as u32);

    for row in 0..field.rows() {
        for col in 0..field.cols() {
            let [r, g, b] = gradient.color_at(field.get(col, row), min, max);
            let light = AMBIENT + (1.0 - AMBIENT) * shade[row * field.cols() + col];
            img.put_pixel(
                col as u32,
                row as u32,
                Rgb([to_u8(r * light), to_u8(g * light), to_u8(b * light)]),
            );
        }
    }
    img
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

// 5x5 plus sign
fn draw_marker(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    for d in -2..=2 {
        put(img, x + d, y, color);
        put(img, x, y + d, color);
    }
}
