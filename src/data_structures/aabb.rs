use cgmath::{EuclideanSpace, InnerSpace};

/// Axis-aligned bounding box in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: cgmath::Point3<f32>,
    pub max: cgmath::Point3<f32>,
}

impl Aabb {
    pub fn from_point(point: cgmath::Point3<f32>) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Smallest box around `points`, `None` when there are none.
    pub fn from_points(points: impl IntoIterator<Item = cgmath::Point3<f32>>) -> Option<Self> {
        points.into_iter().fold(None, |aabb: Option<Aabb>, point| match aabb {
            None => Some(Aabb::from_point(point)),
            Some(mut aabb) => {
                aabb.add_point(point);
                Some(aabb)
            }
        })
    }

    pub fn add_point(&mut self, point: cgmath::Point3<f32>) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.min.z = self.min.z.min(point.z);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
        self.max.z = self.max.z.max(point.z);
    }

    pub fn union(mut self, other: &Aabb) -> Self {
        self.add_point(other.min);
        self.add_point(other.max);
        self
    }

    pub fn center(&self) -> cgmath::Point3<f32> {
        self.min.midpoint(self.max)
    }

    pub fn size(&self) -> cgmath::Vector3<f32> {
        self.max - self.min
    }

    /// Length of the box diagonal.
    pub fn diagonal(&self) -> f32 {
        self.size().magnitude()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn collects_points_into_box() {
        let aabb = Aabb::from_points([
            cgmath::Point3::new(-1.0, 0.0, 2.0),
            cgmath::Point3::new(3.0, -2.0, 0.0),
        ])
        .expect("a box around two points");

        assert_eq!(aabb.min, cgmath::Point3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max, cgmath::Point3::new(3.0, 0.0, 2.0));
        assert_eq!(aabb.center(), cgmath::Point3::new(1.0, -1.0, 1.0));
        assert_relative_eq!(aabb.diagonal(), 24.0f32.sqrt());
    }

    #[test]
    fn no_points_no_box() {
        assert!(Aabb::from_points(std::iter::empty()).is_none());
    }
}
