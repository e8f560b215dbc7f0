//! Planar subdivision of overlapping polygons.

use geo::{Area, BooleanOps, BoundingRect, Intersects, Polygon, Rect};

use crate::geometry::{parts_above, sliver_threshold, to_multi};

/// Flatten overlapping polygons into a set of pairwise-disjoint pieces whose
/// union equals the union of the inputs.
///
/// Each input splits every piece it overlaps into an inside part and an
/// outside part, then contributes whatever area no existing piece covers.
/// Slivers left behind by the boolean operations are discarded; the cutoff
/// scales with the total input area (see [`sliver_threshold`]).
pub fn flatten<'a, I>(inputs: I) -> Vec<Polygon<f64>>
where
    I: IntoIterator<Item = &'a Polygon<f64>>,
{
    let inputs: Vec<&Polygon<f64>> = inputs.into_iter().collect();
    let min_area = sliver_threshold(inputs.iter().map(|p| p.unsigned_area()).sum());

    inputs
        .into_iter()
        .fold(Vec::new(), |pieces, cutter| split(pieces, cutter, min_area))
}

fn split(pieces: Vec<Polygon<f64>>, cutter: &Polygon<f64>, min_area: f64) -> Vec<Polygon<f64>> {
    let Some(cutter_rect) = cutter.bounding_rect() else {
        return pieces;
    };
    let cutter_multi = to_multi(cutter);

    let mut remainder = cutter_multi.clone();
    let mut next = Vec::with_capacity(pieces.len() + 1);

    for piece in pieces {
        if !overlaps_rect(&piece, &cutter_rect) || !piece.intersects(cutter) {
            next.push(piece);
            continue;
        }

        let piece_multi = to_multi(&piece);
        next.extend(parts_above(piece_multi.intersection(&cutter_multi), min_area));
        next.extend(parts_above(piece_multi.difference(&cutter_multi), min_area));
        remainder = remainder.difference(&piece_multi);
    }

    next.extend(parts_above(remainder, min_area));
    next
}

fn overlaps_rect(piece: &Polygon<f64>, rect: &Rect<f64>) -> bool {
    piece
        .bounding_rect()
        .is_some_and(|r| r.intersects(rect))
}
