use imageproc::rect::Rect;

/// Axis-aligned box in pixel coordinates, corners inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
}

impl BoundingBox {

    pub fn new(x_min: i32, y_min: i32, x_max: i32, y_max: i32) -> Self {
        Self { x_min, y_min, x_max, y_max }
    }

    /// Box from the normalized ymin, xmin, ymax, xmax layout detection graphs emit.
    pub fn from_normalized(v: &[f32], width: u32, height: u32) -> Self {
        let ymin = (v[0]*(height as f32)) as i32;
        let xmin = (v[1]*(width as f32)) as i32;
        let ymax = (v[2]*(height as f32)) as i32;
        let xmax = (v[3]*(width as f32)) as i32;
        Self::new(xmin, ymin, xmax, ymax)
    }

    pub fn width(&self) -> u32 {
        (self.x_max - self.x_min).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.y_max - self.y_min).max(0) as u32
    }

    /// Crop window `[x, y, width, height]` of this box inside a `width`x`height`
    /// image, or None when nothing of the box lies inside it.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<[u32; 4]> {
        let clamp = |v: i32, max: u32| v.max(0).min(max as i32) as u32;
        let x0 = clamp(self.x_min, width);
        let y0 = clamp(self.y_min, height);
        let x1 = clamp(self.x_max, width);
        let y1 = clamp(self.y_max, height);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some([x0, y0, x1 - x0, y1 - y0])
    }

    /// Outline rect covering both corners, inset by `inset` pixels.
    pub fn outline(&self, inset: i32) -> Option<Rect> {
        let width = self.x_max - self.x_min + 1 - 2*inset;
        let height = self.y_max - self.y_min + 1 - 2*inset;
        if width <= 0 || height <= 0 {
            return None;
        }
        Some(Rect::at(self.x_min + inset, self.y_min + inset).of_size(width as u32, height as u32))
    }
}
