//! Read-only spatial index over polygons.
//!
//! Bounding boxes live in an R-tree; exact predicates run only against the
//! candidates the tree returns.

use geo::{BoundingRect, Centroid, Contains, Intersects, MultiPolygon, Point, Rect};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};

type Envelope = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// Spatial index over a fixed set of polygon geometries.
///
/// Entries are addressed by their insertion position, so callers can keep a
/// parallel `Vec` of attributes (orders, cells) and look them up by index.
/// The index is built once and never mutated.
#[derive(Debug)]
pub struct GeometryIndex {
    geometries: Vec<MultiPolygon<f64>>,
    tree: RTree<Envelope>,
}

impl GeometryIndex {
    /// Build an index over the given geometries.
    ///
    /// Empty geometries are kept (so positions stay aligned) but never match
    /// any query.
    pub fn new<I>(geometries: I) -> Self
    where
        I: IntoIterator<Item = MultiPolygon<f64>>,
    {
        let geometries: Vec<MultiPolygon<f64>> = geometries.into_iter().collect();
        let envelopes = geometries
            .iter()
            .enumerate()
            .filter_map(|(i, g)| {
                g.bounding_rect()
                    .map(|r| GeomWithData::new(to_rectangle(&r), i))
            })
            .collect();

        Self {
            geometries,
            tree: RTree::bulk_load(envelopes),
        }
    }

    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }

    /// Geometry at the given position.
    pub fn get(&self, index: usize) -> Option<&MultiPolygon<f64>> {
        self.geometries.get(index)
    }

    /// Bounding rectangle of every indexed geometry.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.geometries
            .iter()
            .filter_map(|g| g.bounding_rect())
            .reduce(|a, b| {
                Rect::new(
                    (a.min().x.min(b.min().x), a.min().y.min(b.min().y)),
                    (a.max().x.max(b.max().x), a.max().y.max(b.max().y)),
                )
            })
    }

    /// Positions of geometries that intersect `query` (boundary contact counts).
    ///
    /// Results are sorted ascending.
    pub fn intersecting(&self, query: &MultiPolygon<f64>) -> Vec<usize> {
        let Some(rect) = query.bounding_rect() else {
            return Vec::new();
        };
        self.candidates(&rect, |g| g.intersects(query))
    }

    /// Positions of geometries that intersect the rectangle.
    pub fn intersecting_rect(&self, rect: &Rect<f64>) -> Vec<usize> {
        self.candidates(rect, |g| g.intersects(rect))
    }

    /// Positions of geometries whose interior strictly contains `point`.
    ///
    /// A point on a geometry's boundary is not contained.
    pub fn containing(&self, point: &Point<f64>) -> Vec<usize> {
        let rect = Rect::new(point.0, point.0);
        self.candidates(&rect, |g| g.contains(point))
    }

    /// Centroid of the geometry at the given position.
    pub fn centroid(&self, index: usize) -> Option<Point<f64>> {
        self.geometries.get(index).and_then(|g| g.centroid())
    }

    fn candidates<F>(&self, rect: &Rect<f64>, predicate: F) -> Vec<usize>
    where
        F: Fn(&MultiPolygon<f64>) -> bool,
    {
        let envelope =
            AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);
        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.data)
            .filter(|&i| predicate(&self.geometries[i]))
            .collect();
        hits.sort_unstable();
        hits
    }
}

fn to_rectangle(rect: &Rect<f64>) -> Rectangle<[f64; 2]> {
    Rectangle::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
}
