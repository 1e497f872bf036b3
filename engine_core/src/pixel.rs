//! CPU pixel buffers: the host's backbuffer and borrowed draw targets.
//!
//! Pixels are `0xAARRGGBB`.

use crate::surface::ScaleTransform;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct Color(pub u32);

impl Color {
    pub const TRANSPARENT: Color = Color(0x0000_0000);
    pub const BLACK: Color = Color(0xFF00_0000);
    pub const WHITE: Color = Color(0xFFFF_FFFF);
    pub const RED: Color = Color(0xFFFF_0000);

    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::argb(0xFF, r, g, b)
    }

    #[inline]
    pub const fn argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Color((a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32)
    }

    /// From a `0xRRGGBB` value, forcing full alpha.
    #[inline]
    pub const fn opaque(rgb: u32) -> Self {
        Color(0xFF00_0000 | (rgb & 0x00FF_FFFF))
    }

    #[inline]
    pub const fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }
}

/// Source-over blend of `src` onto `dst`.
#[inline]
pub fn blend(dst: u32, src: u32) -> u32 {
    let a = src >> 24;
    match a {
        0xFF => src,
        0 => dst,
        _ => {
            let inv = 255 - a;
            let ch = |shift: u32| {
                let s = (src >> shift) & 0xFF;
                let d = (dst >> shift) & 0xFF;
                ((s * a + d * inv + 127) / 255) << shift
            };
            let out_a = a + (((dst >> 24) * inv + 127) / 255);
            (out_a << 24) | ch(16) | ch(8) | ch(0)
        }
    }
}

/// Mutable view over a row-major pixel slice.
pub struct DrawTarget<'a> {
    pixels: &'a mut [u32],
    width: u32,
    height: u32,
}

impl<'a> DrawTarget<'a> {
    /// `pixels` must hold exactly `width * height` entries.
    pub fn new(pixels: &'a mut [u32], width: u32, height: u32) -> Self {
        assert_eq!(pixels.len(), width as usize * height as usize);
        Self {
            pixels,
            width,
            height,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u32] {
        self.pixels
    }

    pub fn clear(&mut self, color: Color) {
        self.pixels.fill(color.0);
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        (x < self.width && y < self.height)
            .then(|| Color(self.pixels[(y * self.width + x) as usize]))
    }

    /// Writes one pixel, ignoring coordinates outside the target.
    #[inline]
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return;
        }
        let i = y as usize * self.width as usize + x as usize;
        self.pixels[i] = blend(self.pixels[i], color.0);
    }

    /// Blends a rectangle, clipped to the target.
    pub fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: Color) {
        let x0 = x.max(0) as i64;
        let y0 = y.max(0) as i64;
        let x1 = (x as i64 + w as i64).min(self.width as i64);
        let y1 = (y as i64 + h as i64).min(self.height as i64);
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        let stride = self.width as usize;
        for row in y0 as usize..y1 as usize {
            let line = &mut self.pixels[row * stride + x0 as usize..row * stride + x1 as usize];
            if color.alpha() == 0xFF {
                line.fill(color.0);
            } else {
                for p in line.iter_mut() {
                    *p = blend(*p, color.0);
                }
            }
        }
    }

    /// Nearest-neighbour copy of `src` through `transform`, blended over
    /// what is already here and clipped to the target.
    pub fn blit_scaled(&mut self, src: &Backbuffer, transform: &ScaleTransform) {
        let ox = transform.offset_x.floor() as i64;
        let oy = transform.offset_y.floor() as i64;
        let sw = transform.scaled_width as i64;
        let sh = transform.scaled_height as i64;

        let x0 = ox.max(0);
        let y0 = oy.max(0);
        let x1 = (ox + sw).min(self.width as i64);
        let y1 = (oy + sh).min(self.height as i64);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let inv = 1.0 / transform.scale;
        let src_w = src.width as usize;
        let max_sx = src.width as usize - 1;
        let max_sy = src.height as usize - 1;
        let columns: Vec<usize> = (x0..x1)
            .map(|dx| (((dx - ox) as f64 * inv) as usize).min(max_sx))
            .collect();

        let stride = self.width as usize;
        for dy in y0..y1 {
            let sy = (((dy - oy) as f64 * inv) as usize).min(max_sy);
            let src_row = &src.pixels[sy * src_w..(sy + 1) * src_w];
            let base = dy as usize * stride;
            let dst_row = &mut self.pixels[base + x0 as usize..base + x1 as usize];
            for (d, &sx) in dst_row.iter_mut().zip(&columns) {
                *d = blend(*d, src_row[sx]);
            }
        }
    }
}

/// Fixed-size render target the host draws into.
///
/// Starts fully transparent; contents persist between frames.
pub struct Backbuffer {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl Backbuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::TRANSPARENT.0; width as usize * height as usize],
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        (x < self.width && y < self.height)
            .then(|| Color(self.pixels[(y * self.width + x) as usize]))
    }

    /// Borrow the backbuffer as a drawing surface.
    pub fn draw(&mut self) -> DrawTarget<'_> {
        DrawTarget::new(&mut self.pixels, self.width, self.height)
    }
}
