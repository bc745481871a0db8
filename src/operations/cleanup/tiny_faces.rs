use std::collections::HashMap;

use tracing::{debug, warn};

use crate::math::polyline::polyline_length;
use crate::mesh::{EdgeSource, Solid};
use crate::operations::repair::FaceRole;

/// Merges faces whose area shrank below `ratio` of their reference area
/// into a round face.
///
/// `reference` maps face names to their area before the boolean (the tool's
/// face areas). Round faces are never merged away. The target is the round
/// face sharing the longest border with the tiny face, or failing that the
/// largest round face of the solid.
///
/// Returns the `(merged, into)` pairs.
pub fn merge_tiny_faces(solid: &mut Solid, reference: &HashMap<String, f64>, ratio: f64) -> Vec<(String, String)> {
    let names = solid.face_names();
    let round: Vec<&String> = names.iter().filter(|n| FaceRole::from_name(n) == FaceRole::Arc).collect();
    let tiny: Vec<&String> = names
        .iter()
        .filter(|n| FaceRole::from_name(n) != FaceRole::Arc)
        .filter(|n| {
            reference
                .get(n.as_str())
                .is_some_and(|&before| before > 0.0 && solid.face_area(n) < ratio * before)
        })
        .collect();
    if tiny.is_empty() {
        return Vec::new();
    }
    let Some(largest) = round
        .iter()
        .max_by(|a, b| solid.face_area(a).total_cmp(&solid.face_area(b)))
        .map(|n| (*n).clone())
    else {
        warn!(tiny = tiny.len(), "no round face to merge tiny faces into");
        return Vec::new();
    };

    let mut shared: HashMap<(&str, &str), f64> = HashMap::new();
    let borders = solid.boundary_edge_polylines();
    for pl in &borders {
        let length = polyline_length(&pl.positions, pl.closed);
        for (a, b) in [(&pl.face_a, &pl.face_b), (&pl.face_b, &pl.face_a)] {
            if FaceRole::from_name(b) == FaceRole::Arc {
                *shared.entry((a.as_str(), b.as_str())).or_default() += length;
            }
        }
    }

    let mut plan: Vec<(String, String)> = Vec::with_capacity(tiny.len());
    for face in tiny {
        let into = round
            .iter()
            .filter_map(|r| shared.get(&(face.as_str(), r.as_str())).map(|len| (*r, *len)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map_or_else(|| largest.clone(), |(r, _)| r.clone());
        plan.push((face.clone(), into));
    }

    let (mesh, faces) = solid.buffers_mut();
    for (face, into) in &plan {
        let (Some(from_id), Some(into_id)) = (faces.id(face), faces.id(into)) else {
            continue;
        };
        for id in &mut mesh.face_ids {
            if *id == from_id {
                *id = into_id;
            }
        }
    }
    solid.prune_faces();
    debug!(merged = plan.len(), "tiny faces merged");
    plan
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point3;
    use crate::operations::creation::MakeBox;

    fn renamed_cube(renames: &[(&str, &str)]) -> Solid {
        let mut solid = MakeBox::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0)).execute().unwrap();
        for (from, to) in renames {
            let id = solid.faces().id(from).unwrap();
            solid.faces_mut().bind(id, to);
        }
        solid
    }

    fn reference(entries: &[(&str, f64)]) -> HashMap<String, f64> {
        entries.iter().map(|(n, a)| ((*n).to_owned(), *a)).collect()
    }

    #[test]
    fn sliver_joins_adjacent_round_face() {
        let mut solid = renamed_cube(&[("TOP", "T_ARC"), ("FRONT", "T_CAP_START")]);
        let volume = solid.volume();
        let merged = merge_tiny_faces(&mut solid, &reference(&[("T_CAP_START", 100.0)]), 0.05);
        assert_eq!(merged, vec![("T_CAP_START".to_owned(), "T_ARC".to_owned())]);
        assert!(solid.faces().id("T_CAP_START").is_none());
        assert!((solid.face_area("T_ARC") - 2.0).abs() < 1e-12);
        assert!((solid.volume() - volume).abs() < 1e-12);
    }

    #[test]
    fn falls_back_to_largest_round_face() {
        let mut solid = renamed_cube(&[("TOP", "T_ARC"), ("BOTTOM", "T_CAP_END")]);
        let merged = merge_tiny_faces(&mut solid, &reference(&[("T_CAP_END", 100.0)]), 0.05);
        assert_eq!(merged, vec![("T_CAP_END".to_owned(), "T_ARC".to_owned())]);
    }

    #[test]
    fn faces_above_ratio_and_round_faces_stay() {
        let mut solid = renamed_cube(&[("TOP", "T_ARC"), ("FRONT", "T_SIDE_A")]);
        let merged = merge_tiny_faces(
            &mut solid,
            &reference(&[("T_SIDE_A", 2.0), ("T_ARC", 100.0)]),
            0.05,
        );
        assert!(merged.is_empty());
        assert_eq!(solid.face_names().len(), 6);
    }

    #[test]
    fn without_round_faces_nothing_happens() {
        let mut solid = renamed_cube(&[("FRONT", "T_CAP_START")]);
        assert!(merge_tiny_faces(&mut solid, &reference(&[("T_CAP_START", 100.0)]), 0.05).is_empty());
        assert!(solid.faces().id("T_CAP_START").is_some());
    }
}
