//! Pure spatial predicates over partition footprints: overlap, proximity,
//! edge-adjacency connectivity, point containment, and footprint area.

use std::collections::VecDeque;

use contracts::{Area, Position2D, Position3D};

/// True iff the two footprints intersect on at least one cell.
pub fn overlaps(a: &Area, b: &Area) -> bool {
    a.lower.x <= b.upper.x && b.lower.x <= a.upper.x && a.lower.z <= b.upper.z && b.lower.z <= a.upper.z
}

/// Number of empty cells separating the two footprints along one axis; zero
/// when the ranges touch or overlap on that axis. Computed in i64 so ranges
/// at the i32 extremes stay exact.
fn axis_gap(a_lower: i32, a_upper: i32, b_lower: i32, b_upper: i32) -> u64 {
    if a_lower > b_upper {
        (a_lower as i64 - b_upper as i64 - 1) as u64
    } else if b_lower > a_upper {
        (b_lower as i64 - a_upper as i64 - 1) as u64
    } else {
        0
    }
}

/// True iff the footprints are disjoint but separated by fewer than `min_gap`
/// cells. Overlapping footprints are not "too close"; they overlap.
pub fn too_close(a: &Area, b: &Area, min_gap: u32) -> bool {
    if overlaps(a, b) {
        return false;
    }
    let gap_x = axis_gap(a.lower.x, a.upper.x, b.lower.x, b.upper.x);
    let gap_z = axis_gap(a.lower.z, a.upper.z, b.lower.z, b.upper.z);
    gap_x.max(gap_z) < u64::from(min_gap)
}

/// True iff the two footprints share a boundary edge of length at least one
/// cell. Corner-only contact does not count.
pub fn adjacent(a: &Area, b: &Area) -> bool {
    let x_ranges_meet = a.lower.x <= b.upper.x && b.lower.x <= a.upper.x;
    let z_ranges_meet = a.lower.z <= b.upper.z && b.lower.z <= a.upper.z;
    let touch_on_x = b.lower.x as i64 == a.upper.x as i64 + 1
        || a.lower.x as i64 == b.upper.x as i64 + 1;
    let touch_on_z = b.lower.z as i64 == a.upper.z as i64 + 1
        || a.lower.z as i64 == b.upper.z as i64 + 1;
    (touch_on_x && z_ranges_meet) || (touch_on_z && x_ranges_meet)
}

/// True iff the footprints form a single connected body under edge-adjacency.
/// Empty and singleton sets are connected.
pub fn is_connected(areas: &[Area]) -> bool {
    if areas.len() <= 1 {
        return true;
    }

    let mut visited = vec![false; areas.len()];
    let mut queue = VecDeque::new();
    visited[0] = true;
    queue.push_back(0);

    while let Some(current) = queue.pop_front() {
        for (index, area) in areas.iter().enumerate() {
            if !visited[index] && adjacent(&areas[current], area) {
                visited[index] = true;
                queue.push_back(index);
            }
        }
    }

    visited.into_iter().all(|seen| seen)
}

/// True iff the footprint contains the given ground position.
pub fn contains_point(area: &Area, point: Position2D) -> bool {
    area.lower.x <= point.x && point.x <= area.upper.x && area.lower.z <= point.z && point.z <= area.upper.z
}

/// True iff any footprint contains the anchor's ground projection.
pub fn anchor_enclosed(areas: &[Area], anchor: Position3D) -> bool {
    let ground = anchor.ground();
    areas.iter().any(|area| contains_point(area, ground))
}

/// Footprint block count of a region. Height never counts.
pub fn footprint_area(area: &Area) -> u64 {
    area.block_count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area(lx: i32, lz: i32, ux: i32, uz: i32) -> Area {
        Area::new(Position2D::new(lx, lz), Position2D::new(ux, uz))
    }

    #[test]
    fn overlap_detects_shared_cells() {
        assert!(overlaps(&area(0, 0, 4, 4), &area(4, 4, 8, 8)));
        assert!(overlaps(&area(0, 0, 4, 4), &area(2, 2, 3, 3)));
        assert!(!overlaps(&area(0, 0, 4, 4), &area(5, 0, 8, 4)));
    }

    #[test]
    fn overlap_is_symmetric() {
        let a = area(0, 0, 4, 4);
        let b = area(3, 3, 9, 9);
        assert_eq!(overlaps(&a, &b), overlaps(&b, &a));
    }

    #[test]
    fn too_close_measures_gap_between_boxes() {
        let a = area(0, 0, 4, 4);
        // One empty column between them: gap 1.
        assert!(too_close(&a, &area(6, 0, 9, 4), 2));
        // Gap 1 satisfies min_gap 1.
        assert!(!too_close(&a, &area(6, 0, 9, 4), 1));
        // Edge-adjacent boxes have gap 0.
        assert!(too_close(&a, &area(5, 0, 9, 4), 1));
    }

    #[test]
    fn too_close_is_false_for_overlapping_boxes() {
        assert!(!too_close(&area(0, 0, 4, 4), &area(2, 2, 6, 6), 3));
    }

    #[test]
    fn too_close_uses_chebyshev_separation() {
        // Diagonal neighbours: 1 cell of separation on each axis.
        let a = area(0, 0, 4, 4);
        let b = area(6, 6, 9, 9);
        assert!(too_close(&a, &b, 2));
        assert!(!too_close(&a, &b, 1));
    }

    #[test]
    fn separation_is_exact_at_coordinate_extremes() {
        let west = area(i32::MIN, 0, i32::MIN + 4, 4);
        let east = area(i32::MAX - 4, 0, i32::MAX, 4);
        // Almost the whole axis of empty cells between them: gap 2^32 - 10.
        assert!(!too_close(&west, &east, 1_000_000));
        assert!(too_close(&west, &east, u32::MAX));
        assert!(!adjacent(&west, &east));
        // Touching boxes at the far edge never overflow the +1.
        let far = area(i32::MAX - 1, 0, i32::MAX, 4);
        assert!(adjacent(&area(i32::MAX - 3, 0, i32::MAX - 2, 4), &far));
    }

    #[test]
    fn adjacency_requires_a_shared_edge() {
        let a = area(0, 0, 4, 4);
        assert!(adjacent(&a, &area(5, 0, 9, 4)));
        assert!(adjacent(&a, &area(0, 5, 4, 9)));
        assert!(adjacent(&a, &area(5, 4, 9, 9)));
        // Corner contact only.
        assert!(!adjacent(&a, &area(5, 5, 9, 9)));
        // Disjoint with a gap.
        assert!(!adjacent(&a, &area(6, 0, 9, 4)));
        // Overlap is not adjacency.
        assert!(!adjacent(&a, &area(4, 0, 9, 4)));
    }

    #[test]
    fn connectivity_of_empty_and_singleton_sets() {
        assert!(is_connected(&[]));
        assert!(is_connected(&[area(0, 0, 4, 4)]));
    }

    #[test]
    fn connectivity_traverses_chains() {
        let chain = vec![area(0, 0, 4, 4), area(5, 0, 9, 4), area(10, 0, 14, 4)];
        assert!(is_connected(&chain));

        let broken = vec![area(0, 0, 4, 4), area(10, 0, 14, 4)];
        assert!(!is_connected(&broken));
    }

    #[test]
    fn corner_contact_does_not_connect() {
        let diagonal = vec![area(0, 0, 4, 4), area(5, 5, 9, 9)];
        assert!(!is_connected(&diagonal));
    }

    #[test]
    fn point_containment_is_inclusive() {
        let a = area(-2, -2, 2, 2);
        assert!(contains_point(&a, Position2D::new(-2, -2)));
        assert!(contains_point(&a, Position2D::new(2, 2)));
        assert!(contains_point(&a, Position2D::new(0, 1)));
        assert!(!contains_point(&a, Position2D::new(3, 0)));
    }

    #[test]
    fn anchor_enclosure_projects_to_the_footprint_plane() {
        let areas = vec![area(0, 0, 4, 4), area(5, 0, 9, 4)];
        assert!(anchor_enclosed(&areas, Position3D::new(7, 120, 3)));
        assert!(!anchor_enclosed(&areas, Position3D::new(10, 64, 3)));
        assert!(!anchor_enclosed(&[], Position3D::new(0, 0, 0)));
    }

    #[test]
    fn footprint_ignores_height() {
        assert_eq!(footprint_area(&area(0, 0, 9, 4)), 50);
    }
}
