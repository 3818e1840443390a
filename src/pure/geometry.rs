//! Geometry primitives
use serde::{Deserialize, Serialize};

/// An x,y coordinate pair
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// An absolute x coordinate relative to the root window
    pub x: i32,
    /// An absolute y coordinate relative to the root window
    pub y: i32,
}

impl Point {
    /// Create a new Point.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Point {
    fn from(raw: (i32, i32)) -> Self {
        let (x, y) = raw;

        Self { x, y }
    }
}

// A Rect converts to its top left corner
impl From<Rect> for Point {
    fn from(r: Rect) -> Self {
        let Rect { x, y, .. } = r;

        Self { x, y }
    }
}

/// An X window / screen position: top left corner + extent
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub struct Rect {
    /// The x-coordinate of the top left corner of this rect
    pub x: i32,
    /// The y-coordinate of the top left corner of this rect
    pub y: i32,
    /// The width of this rect
    pub w: u32,
    /// The height of this rect
    pub h: u32,
}

impl Rect {
    /// Create a new Rect.
    pub const fn new(x: i32, y: i32, w: u32, h: u32) -> Rect {
        Rect { x, y, w, h }
    }

    /// The midpoint of this rectangle
    pub fn midpoint(&self) -> Point {
        Point {
            x: self.x + self.w as i32 / 2,
            y: self.y + self.h as i32 / 2,
        }
    }

    /// Check whether this Rect contains `other` as a sub-Rect
    pub fn contains(&self, other: &Rect) -> bool {
        match other {
            Rect { x, .. } if *x < self.x => false,
            Rect { x, w, .. } if (*x + *w as i32) > (self.x + self.w as i32) => false,
            Rect { y, .. } if *y < self.y => false,
            Rect { y, h, .. } if (*y + *h as i32) > (self.y + self.h as i32) => false,
            _ => true,
        }
    }

    /// Check whether this Rect contains `p`
    pub fn contains_point<P>(&self, p: P) -> bool
    where
        P: Into<Point>,
    {
        let p = p.into();

        (self.x..=(self.x + self.w as i32)).contains(&p.x)
            && (self.y..=(self.y + self.h as i32)).contains(&p.y)
    }

    /// Center this Rect inside of `enclosing`.
    ///
    /// Returns `None` if this Rect can not fit inside enclosing
    pub fn centered_in(&self, enclosing: &Rect) -> Option<Self> {
        if self.w > enclosing.w || self.h > enclosing.h {
            return None;
        }

        Some(Self {
            x: enclosing.x + ((enclosing.w - self.w) / 2) as i32,
            y: enclosing.y + ((enclosing.h - self.h) / 2) as i32,
            ..*self
        })
    }

    /// The smallest Rect that contains both `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = (self.x + self.w as i32).max(other.x + other.w as i32);
        let bottom = (self.y + self.h as i32).max(other.y + other.h as i32);

        Rect::new(x, y, (right - x) as u32, (bottom - y) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    #[test]
    fn contains_rect() {
        let r1 = Rect::new(10, 10, 50, 50);
        let r2 = Rect::new(0, 0, 100, 100);

        assert!(r2.contains(&r1));
        assert!(!r1.contains(&r2));
    }

    #[test_case(Point::new(0, 0), false; "outside")]
    #[test_case(Point::new(30, 20), true; "inside")]
    #[test_case(Point::new(10, 20), true; "top left")]
    #[test_case(Point::new(40, 20), true; "top right")]
    #[test_case(Point::new(10, 60), true; "bottom left")]
    #[test_case(Point::new(40, 60), true; "bottom right")]
    #[test]
    fn contains_point(p: Point, expected: bool) {
        let r = Rect::new(10, 20, 30, 40);

        assert_eq!(r.contains_point(p), expected);
    }

    #[test_case(
        Rect::new(0, 0, 10, 10),
        Some(Rect::new(5, 5, 10, 10));
        "fits"
    )]
    #[test_case(
        Rect::new(100, 100, 10, 10),
        Some(Rect::new(5, 5, 10, 10));
        "fits but not contained"
    )]
    #[test_case(Rect::new(0, 0, 100, 100), None; "doesn't fit")]
    #[test]
    fn centered_in(inner: Rect, expected: Option<Rect>) {
        let outer = Rect::new(0, 0, 20, 20);

        let res = inner.centered_in(&outer);

        assert_eq!(res, expected);
    }

    #[test_case(
        Rect::new(0, 0, 100, 100),
        Rect::new(100, 0, 100, 100),
        Rect::new(0, 0, 200, 100);
        "side by side"
    )]
    #[test_case(
        Rect::new(0, 0, 100, 100),
        Rect::new(50, 50, 100, 100),
        Rect::new(0, 0, 150, 150);
        "overlapping"
    )]
    #[test_case(
        Rect::new(-10, 0, 10, 10),
        Rect::new(5, 5, 10, 10),
        Rect::new(-10, 0, 25, 15);
        "negative origin"
    )]
    #[test]
    fn union(a: Rect, b: Rect, expected: Rect) {
        assert_eq!(a.union(&b), expected);
        assert_eq!(b.union(&a), expected);
    }
}
