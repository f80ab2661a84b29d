use base64::{engine::general_purpose::STANDARD, Engine as _};

/// A point in the canvas's backing resolution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Where the canvas is shown on screen, in terminal cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

/// A flattened, fully opaque RGB image of the canvas
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub width: usize,
    pub height: usize,
    pub rgb: Vec<u8>,
}

impl Snapshot {
    /// Binary PPM (P6)
    pub fn to_ppm(&self) -> Vec<u8> {
        let mut out = format!("P6\n{} {}\n255\n", self.width, self.height).into_bytes();
        out.extend_from_slice(&self.rgb);
        out
    }

    pub fn to_data_url(&self) -> String {
        format!(
            "data:image/x-portable-pixmap;base64,{}",
            STANDARD.encode(self.to_ppm())
        )
    }
}

/// Drawing surface with transparent background and black ink.
///
/// Ink is stored as per-pixel coverage; `snapshot` composites it over white
/// because classifiers expect a solid image.
#[derive(Debug, Clone)]
pub struct Canvas {
    width: usize,
    height: usize,
    ink: Vec<u8>,
    brush: usize,
    cursor: Option<Point>,
    has_drawn: bool,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            ink: vec![0; width * height],
            brush: 1,
            cursor: None,
            has_drawn: false,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn has_drawn(&self) -> bool {
        self.has_drawn
    }

    /// Maps a terminal cell inside `viewport` onto the backing resolution
    pub fn to_local(&self, viewport: Viewport, column: u16, row: u16) -> Option<Point> {
        if viewport.width == 0 || viewport.height == 0 {
            return None;
        }
        if column < viewport.x
            || row < viewport.y
            || column >= viewport.x + viewport.width
            || row >= viewport.y + viewport.height
        {
            return None;
        }

        let scale_x = self.width as f64 / viewport.width as f64;
        let scale_y = self.height as f64 / viewport.height as f64;
        // centre of the cell
        Some(Point::new(
            ((column - viewport.x) as f64 + 0.5) * scale_x,
            ((row - viewport.y) as f64 + 0.5) * scale_y,
        ))
    }

    pub fn begin_stroke(&mut self, at: Point) {
        self.has_drawn = true;
        self.cursor = Some(at);
        self.stamp(at);
    }

    pub fn stroke_to(&mut self, to: Point) {
        let Some(from) = self.cursor else {
            return;
        };
        let steps = (to.x - from.x).abs().max((to.y - from.y).abs()).ceil() as usize;
        for i in 1..=steps.max(1) {
            let t = i as f64 / steps.max(1) as f64;
            self.stamp(Point::new(
                from.x + (to.x - from.x) * t,
                from.y + (to.y - from.y) * t,
            ));
        }
        self.cursor = Some(to);
    }

    pub fn end_stroke(&mut self) {
        self.cursor = None;
    }

    pub fn clear(&mut self) {
        self.ink.fill(0);
        self.cursor = None;
        self.has_drawn = false;
    }

    /// Coordinates of every inked pixel, row-major
    pub fn inked(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.ink
            .iter()
            .enumerate()
            .filter(|(_, a)| **a > 0)
            .map(|(i, _)| (i % self.width, i / self.width))
    }

    pub fn snapshot(&self) -> Snapshot {
        let rgb = self
            .ink
            .iter()
            .flat_map(|alpha| {
                let v = 255 - alpha;
                [v, v, v]
            })
            .collect();
        Snapshot {
            width: self.width,
            height: self.height,
            rgb,
        }
    }

    fn stamp(&mut self, at: Point) {
        let r = self.brush as isize;
        let cx = at.x.floor() as isize;
        let cy = at.y.floor() as isize;
        for dy in -r..=r {
            for dx in -r..=r {
                let (x, y) = (cx + dx, cy + dy);
                if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
                    self.ink[y as usize * self.width + x as usize] = 255;
                }
            }
        }
    }
}
