/// A colored point of a point cloud.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    /// `[R, G, B]`, each in `[0, 1]`.
    pub color_rgb: [f32; 3],
    pub position: [f64; 3],
}

pub type Points = Vec<Point>;
