use std::path::Path;

use image::{imageops::FilterType, GrayImage, ImageReader, Luma, Pixel, Rgb, RgbImage};
use imageproc::{
    drawing::draw_hollow_rect_mut,
    geometric_transformations::{rotate_about_center, Interpolation},
    rect::Rect,
};
use nalgebra::{Isometry2, Point2, Vector2};
use ndarray::Array2;
use tracing::instrument;

use crate::{BoundingBox, Result};

const CUBIC_A: f64 = -0.75;
const MARKER_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const MARKER_THICKNESS: i32 = 2;

pub(crate) fn to_array(image: &GrayImage) -> Array2<f64> {
    Array2::<f64>::from_shape_fn(
        (image.height() as usize, image.width() as usize),
        |(y, x)| image.get_pixel(x as u32, y as u32).channels()[0] as f64,
    )
}

/// Rotates counter-clockwise by `angle` degrees about the center, keeping the
/// canvas size. Uncovered pixels are zero.
pub(crate) fn rotate_nearest(image: &GrayImage, angle: f64) -> GrayImage {
    // imageproc rotates clockwise for positive theta.
    let theta = -(angle.to_radians() as f32);
    rotate_about_center(image, theta, Interpolation::Nearest, Luma([0]))
}

/// Rotates counter-clockwise by `angle` degrees about the (integer) image
/// center with bicubic sampling. Samples that fall outside the source
/// replicate the nearest edge pixel.
#[instrument(level = "debug", skip(image))]
pub fn rotate_replicate(image: &RgbImage, angle: f64) -> RgbImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 || angle == 0.0 {
        return image.clone();
    }
    let cx = (width / 2) as f64;
    let cy = (height / 2) as f64;
    // Image rows grow downward, so a visually counter-clockwise turn is a
    // negative rotation in these coordinates.
    let forward = Isometry2::new(Vector2::new(cx, cy), -angle.to_radians())
        * Isometry2::translation(-cx, -cy);
    let inverse = forward.inverse();

    RgbImage::from_fn(width, height, |x, y| {
        let source = inverse.transform_point(&Point2::new(x as f64, y as f64));
        sample_bicubic(image, source.x, source.y)
    })
}

fn cubic_weights(t: f64) -> [f64; 4] {
    let weight = |d: f64| {
        let d = d.abs();
        if d <= 1.0 {
            ((CUBIC_A + 2.0) * d - (CUBIC_A + 3.0)) * d * d + 1.0
        } else if d < 2.0 {
            ((CUBIC_A * d - 5.0 * CUBIC_A) * d + 8.0 * CUBIC_A) * d - 4.0 * CUBIC_A
        } else {
            0.0
        }
    };
    [weight(1.0 + t), weight(t), weight(1.0 - t), weight(2.0 - t)]
}

fn sample_bicubic(image: &RgbImage, x: f64, y: f64) -> Rgb<u8> {
    let max_x = image.width() as i64 - 1;
    let max_y = image.height() as i64 - 1;
    let x0 = x.floor();
    let y0 = y.floor();
    let wx = cubic_weights(x - x0);
    let wy = cubic_weights(y - y0);
    let (x0, y0) = (x0 as i64, y0 as i64);

    let mut acc = [0.0f64; 3];
    for (j, wy) in wy.iter().enumerate() {
        let sy = (y0 - 1 + j as i64).clamp(0, max_y) as u32;
        for (i, wx) in wx.iter().enumerate() {
            let sx = (x0 - 1 + i as i64).clamp(0, max_x) as u32;
            let pixel = image.get_pixel(sx, sy);
            for (channel, value) in acc.iter_mut().zip(pixel.channels()) {
                *channel += wx * wy * *value as f64;
            }
        }
    }
    Rgb(acc.map(|it| it.round().clamp(0.0, 255.0) as u8))
}

pub(crate) fn resize_lanczos(image: &RgbImage, width: u32, height: u32) -> RgbImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    log::trace!(
        "Resizing from (w: {}, h: {}) to (w: {width}, h: {height})",
        image.width(),
        image.height()
    );
    image::imageops::resize(image, width, height, FilterType::Lanczos3)
}

/// Decodes an image by sniffing its contents, so a file whose extension lies
/// about its format still loads.
pub fn load_rgb(path: impl AsRef<Path>) -> Result<RgbImage> {
    let image = ImageReader::open(path.as_ref())?
        .with_guessed_format()?
        .decode()?;
    Ok(image.to_rgb8())
}

/// Crops the part of `rect` that lies inside the image. Returns `None` when
/// nothing of it does.
pub(crate) fn part_image(
    image: &RgbImage,
    rect: &BoundingBox,
) -> Option<(BoundingBox, RgbImage)> {
    let clipped = rect.clip(image.width(), image.height());
    if clipped.area() == 0 {
        return None;
    }
    log::trace!("Slicing subimage to {clipped:?}");
    let view = image::imageops::crop_imm(
        image,
        clipped.x as u32,
        clipped.y as u32,
        clipped.width as u32,
        clipped.height as u32,
    );
    Some((clipped, view.to_image()))
}

pub(crate) fn draw_marker(image: &mut RgbImage, rect: &BoundingBox) {
    let clipped = rect.clip(image.width(), image.height());
    for inset in 0..MARKER_THICKNESS {
        let width = clipped.width - 2 * inset;
        let height = clipped.height - 2 * inset;
        if width <= 0 || height <= 0 {
            break;
        }
        let outline =
            Rect::at(clipped.x + inset, clipped.y + inset).of_size(width as u32, height as u32);
        draw_hollow_rect_mut(image, outline, MARKER_COLOR);
    }
}
