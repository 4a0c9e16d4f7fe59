//! Pixel effects that the `image` crate has no direct operation for
//!
//! All functions work on RGBA8 buffers and leave alpha untouched unless
//! stated otherwise.

use image::{Rgba, RgbaImage};

use super::params::{Color, Edges};

/// Rec. 601 luma of an RGB triple
fn luma(p: &Rgba<u8>) -> u8 {
    let [r, g, b, _] = p.0;
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000) as u8
}

/// Bounding box of pixels that differ from the top-left pixel by more than
/// `threshold` in any color channel. `None` when the image is uniform.
pub fn trim_bounds(img: &RgbaImage, threshold: u8) -> Option<(u32, u32, u32, u32)> {
    if img.width() == 0 || img.height() == 0 {
        return None;
    }
    let reference = *img.get_pixel(0, 0);
    let differs = |p: &Rgba<u8>| {
        p.0.iter()
            .zip(reference.0.iter())
            .any(|(a, b)| a.abs_diff(*b) > threshold)
    };

    let (mut min_x, mut min_y) = (u32::MAX, u32::MAX);
    let (mut max_x, mut max_y) = (0, 0);
    for (x, y, p) in img.enumerate_pixels() {
        if differs(p) {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    if min_x == u32::MAX {
        return None;
    }
    Some((min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}

/// Canvas size after adding `edges`; `None` when it does not fit in `u32`
pub fn extended_size((width, height): (u32, u32), edges: Edges) -> Option<(u32, u32)> {
    let width = width.checked_add(edges.left)?.checked_add(edges.right)?;
    let height = height.checked_add(edges.top)?.checked_add(edges.bottom)?;
    Some((width, height))
}

/// Place `img` on a larger canvas filled with `color`.
///
/// Callers check [`extended_size`] against their limits first.
pub fn extend(img: &RgbaImage, edges: Edges, color: Color) -> RgbaImage {
    let width = img.width().saturating_add(edges.left).saturating_add(edges.right);
    let height = img.height().saturating_add(edges.top).saturating_add(edges.bottom);
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba(color.0));
    image::imageops::replace(&mut canvas, img, edges.left as i64, edges.top as i64);
    canvas
}

/// Center-of-window median over a `size` x `size` neighborhood
pub fn median(img: &RgbaImage, size: u32) -> RgbaImage {
    if size <= 1 {
        return img.clone();
    }
    let radius = (size / 2) as i64;
    let (width, height) = (img.width() as i64, img.height() as i64);
    let mut window: [Vec<u8>; 3] = Default::default();

    RgbaImage::from_fn(img.width(), img.height(), |x, y| {
        for channel in window.iter_mut() {
            channel.clear();
        }
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let sx = (x as i64 + dx).clamp(0, width - 1) as u32;
                let sy = (y as i64 + dy).clamp(0, height - 1) as u32;
                let p = img.get_pixel(sx, sy);
                for (c, channel) in window.iter_mut().enumerate() {
                    channel.push(p.0[c]);
                }
            }
        }
        let mut out = [0u8; 4];
        for (c, channel) in window.iter_mut().enumerate() {
            channel.sort_unstable();
            out[c] = channel[channel.len() / 2];
        }
        out[3] = img.get_pixel(x, y).0[3];
        Rgba(out)
    })
}

/// Gamma correction with exponent `1 / gamma`
pub fn gamma(img: &mut RgbaImage, gamma: f32) {
    let mut table = [0u8; 256];
    for (i, entry) in table.iter_mut().enumerate() {
        let normalized = i as f32 / 255.0;
        *entry = (normalized.powf(1.0 / gamma) * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    for p in img.pixels_mut() {
        for c in 0..3 {
            p.0[c] = table[p.0[c] as usize];
        }
    }
}

/// Stretch luminance so the darkest pixel is black and the brightest white
pub fn normalize(img: &mut RgbaImage) {
    let (lo, hi) = img
        .pixels()
        .map(luma)
        .fold((u8::MAX, u8::MIN), |(lo, hi), l| (lo.min(l), hi.max(l)));
    if hi <= lo {
        return;
    }
    let range = (hi - lo) as f32;
    for p in img.pixels_mut() {
        for c in 0..3 {
            let v = (p.0[c].saturating_sub(lo)) as f32 / range * 255.0;
            p.0[c] = v.round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Binarize: luma at or above `level` becomes white, everything else black
pub fn threshold(img: &mut RgbaImage, level: u8) {
    for p in img.pixels_mut() {
        let v = if luma(p) >= level { 255 } else { 0 };
        p.0[0] = v;
        p.0[1] = v;
        p.0[2] = v;
    }
}

/// Recolor while keeping luminance
pub fn tint(img: &mut RgbaImage, color: Color) {
    let [tr, tg, tb, _] = color.0;
    for p in img.pixels_mut() {
        let l = luma(p) as u32;
        p.0[0] = (l * tr as u32 / 255) as u8;
        p.0[1] = (l * tg as u32 / 255) as u8;
        p.0[2] = (l * tb as u32 / 255) as u8;
    }
}

/// Composite onto an opaque background, dropping transparency
pub fn flatten(img: &mut RgbaImage, background: Color) {
    let [br, bg, bb, _] = background.0;
    for p in img.pixels_mut() {
        let alpha = p.0[3] as u32;
        if alpha == 255 {
            continue;
        }
        let blend = |fg: u8, bgc: u8| ((fg as u32 * alpha + bgc as u32 * (255 - alpha)) / 255) as u8;
        p.0 = [blend(p.0[0], br), blend(p.0[1], bg), blend(p.0[2], bb), 255];
    }
}
