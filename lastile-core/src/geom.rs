/// Axis-aligned rectangle in east/north coordinates, anchored at its
/// upper-left (north-west) corner. `upper_left_y >= lower_right_y`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub upper_left_x: f64,
    pub upper_left_y: f64,
    pub lower_right_x: f64,
    pub lower_right_y: f64,
}

impl Rect {
    pub fn new(upper_left_x: f64, upper_left_y: f64, lower_right_x: f64, lower_right_y: f64) -> Self {
        Rect {
            upper_left_x,
            upper_left_y,
            lower_right_x,
            lower_right_y,
        }
    }

    /// Builds a rectangle from min/max extents.
    pub fn from_extent(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Rect::new(min_x, max_y, max_x, min_y)
    }

    pub fn width(&self) -> f64 {
        self.lower_right_x - self.upper_left_x
    }

    pub fn height(&self) -> f64 {
        self.upper_left_y - self.lower_right_y
    }

    /// Edge-inclusive containment.
    pub fn contains(&self, east: f64, north: f64) -> bool {
        east >= self.upper_left_x
            && east <= self.lower_right_x
            && north <= self.upper_left_y
            && north >= self.lower_right_y
    }

    /// Edge-inclusive axis-aligned overlap test.
    pub fn has_overlap(&self, other: &Rect) -> bool {
        self.upper_left_x <= other.lower_right_x
            && other.upper_left_x <= self.lower_right_x
            && self.lower_right_y <= other.upper_left_y
            && other.lower_right_y <= self.upper_left_y
    }

    /// The rectangle grown outward by `margin` on all four sides.
    pub fn expanded(&self, margin: f64) -> Rect {
        Rect::new(
            self.upper_left_x - margin,
            self.upper_left_y + margin,
            self.lower_right_x + margin,
            self.lower_right_y - margin,
        )
    }
}

/// Closed vertex ring with a precomputed bounding box. The bounding box is
/// inflated by the buffer distance; exact containment accepts points inside
/// the ring or within the buffer distance of an edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<(f64, f64)>,
    buffer: f64,
    bounds: Rect,
}

impl Polygon {
    pub fn new(vertices: Vec<(f64, f64)>, buffer: f64) -> Self {
        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;
        for &(east, north) in &vertices {
            min_x = min_x.min(east);
            min_y = min_y.min(north);
            max_x = max_x.max(east);
            max_y = max_y.max(north);
        }
        let bounds = if vertices.is_empty() {
            Rect::new(0.0, 0.0, 0.0, 0.0)
        } else {
            Rect::from_extent(min_x, min_y, max_x, max_y).expanded(buffer)
        };
        Polygon {
            vertices,
            buffer,
            bounds,
        }
    }

    pub fn vertices(&self) -> &[(f64, f64)] {
        &self.vertices
    }

    /// Bounding box including the buffer.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn contains(&self, east: f64, north: f64) -> bool {
        if !self.bounds.contains(east, north) {
            return false;
        }
        if ring_contains(&self.vertices, east, north) {
            return true;
        }
        self.buffer > 0.0 && self.edge_distance(east, north) <= self.buffer
    }

    /// Distance to the nearest ring edge.
    fn edge_distance(&self, east: f64, north: f64) -> f64 {
        let n = self.vertices.len();
        if n == 0 {
            return f64::MAX;
        }
        let mut nearest = f64::MAX;
        let mut j = n - 1;
        for i in 0..n {
            let (ax, ay) = self.vertices[j];
            let (bx, by) = self.vertices[i];
            nearest = nearest.min(segment_distance(east, north, ax, ay, bx, by));
            j = i;
        }
        nearest
    }
}

/// Even-odd crossing test against the (implicitly closed) ring.
fn ring_contains(vertices: &[(f64, f64)], east: f64, north: f64) -> bool {
    if vertices.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (xi, yi) = vertices[i];
        let (xj, yj) = vertices[j];
        if (yi > north) != (yj > north) && east < (xj - xi) * (north - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn segment_distance(px: f64, py: f64, ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    let dx = bx - ax;
    let dy = by - ay;
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return ((px - ax).powi(2) + (py - ay).powi(2)).sqrt();
    }
    let t = (((px - ax) * dx + (py - ay) * dy) / len2).clamp(0.0, 1.0);
    let cx = ax + t * dx;
    let cy = ay + t * dy;
    ((px - cx).powi(2) + (py - cy).powi(2)).sqrt()
}

/// Extraction target geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum AreaShape {
    Rect(Rect),
    Polygon(Polygon),
}

impl AreaShape {
    /// Coarse bounding box used for block resolution.
    pub fn bounds(&self) -> Rect {
        match self {
            AreaShape::Rect(rect) => *rect,
            AreaShape::Polygon(polygon) => polygon.bounds(),
        }
    }

    /// Exact membership test used by the fine filter.
    pub fn contains(&self, east: f64, north: f64) -> bool {
        match self {
            AreaShape::Rect(rect) => rect.contains(east, north),
            AreaShape::Polygon(polygon) => polygon.contains(east, north),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_contains_is_edge_inclusive() {
        let rect = Rect::new(0.0, 100.0, 100.0, 0.0);
        assert!(rect.contains(50.0, 50.0));
        assert!(rect.contains(0.0, 100.0));
        assert!(rect.contains(100.0, 0.0));
        assert!(!rect.contains(100.1, 50.0));
        assert!(!rect.contains(50.0, -0.1));
    }

    #[test]
    fn test_rect_overlap() {
        let a = Rect::new(0.0, 100.0, 100.0, 0.0);
        let b = Rect::new(50.0, 150.0, 150.0, 50.0);
        let c = Rect::new(100.0, 100.0, 200.0, 0.0);
        let d = Rect::new(200.5, 100.0, 300.0, 0.0);
        assert!(a.has_overlap(&b));
        assert!(b.has_overlap(&a));
        // touching edges count as overlap
        assert!(a.has_overlap(&c));
        assert!(!a.has_overlap(&d));
    }

    #[test]
    fn test_rect_expanded() {
        let rect = Rect::new(100.0, 200.0, 200.0, 100.0).expanded(10.0);
        assert_eq!(rect, Rect::new(90.0, 210.0, 210.0, 90.0));
        assert_eq!(rect.width(), 120.0);
        assert_eq!(rect.height(), 120.0);
    }

    #[test]
    fn test_polygon_contains_square() {
        let polygon = Polygon::new(
            vec![(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)],
            0.0,
        );
        assert!(polygon.contains(50.0, 50.0));
        assert!(!polygon.contains(150.0, 50.0));
        assert!(!polygon.contains(-1.0, 50.0));
    }

    #[test]
    fn test_polygon_contains_concave() {
        // L-shape: the notch in the upper right is outside
        let polygon = Polygon::new(
            vec![
                (0.0, 0.0),
                (100.0, 0.0),
                (100.0, 50.0),
                (50.0, 50.0),
                (50.0, 100.0),
                (0.0, 100.0),
            ],
            0.0,
        );
        assert!(polygon.contains(25.0, 75.0));
        assert!(polygon.contains(75.0, 25.0));
        assert!(!polygon.contains(75.0, 75.0));
    }

    #[test]
    fn test_polygon_buffer_extends_membership() {
        let polygon = Polygon::new(
            vec![(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)],
            10.0,
        );
        assert!(polygon.contains(105.0, 50.0));
        assert!(!polygon.contains(115.0, 50.0));
        assert_eq!(polygon.bounds(), Rect::new(-10.0, 110.0, 110.0, -10.0));
    }

    #[test]
    fn test_area_shape_dispatch() {
        let rect = AreaShape::Rect(Rect::new(0.0, 10.0, 10.0, 0.0));
        assert!(rect.contains(5.0, 5.0));
        assert_eq!(rect.bounds(), Rect::new(0.0, 10.0, 10.0, 0.0));

        let polygon = AreaShape::Polygon(Polygon::new(
            vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
            0.0,
        ));
        assert!(polygon.contains(5.0, 5.0));
        assert!(!polygon.contains(11.0, 5.0));
    }
}
