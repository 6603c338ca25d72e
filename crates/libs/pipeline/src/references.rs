use common_types::{BatchItem, PersonReference};
use itertools::Itertools;
use std::collections::HashMap;

/// Picks, per identified person, the page item where that person's matched
/// face covers the largest area, and uses its display bytes as the
/// reference image. Recomputed from scratch after every face review, since
/// corrections can change which items are identified at all.
#[must_use]
pub fn select_references(items: &[BatchItem]) -> Vec<PersonReference> {
    let mut best: HashMap<&str, (f32, usize)> = HashMap::new();
    for (index, item) in items.iter().enumerate() {
        if item.display_bytes.is_none() {
            continue;
        }
        for face in &item.faces {
            let Some(name) = face.matched_name.as_deref() else {
                continue;
            };
            let area = face.region.bounding_box.area();
            match best.get(name) {
                Some((best_area, _)) if *best_area >= area => {}
                _ => {
                    best.insert(name, (area, index));
                }
            }
        }
    }

    best.into_iter()
        .sorted_by(|a, b| a.0.cmp(b.0))
        .filter_map(|(name, (_, index))| {
            let item = &items[index];
            item.display_bytes.as_ref().map(|bytes| PersonReference {
                person_name: name.to_string(),
                image: bytes.clone(),
                source_item_id: item.entry.id.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_types::{BoundingBox, DetectedFace, FaceRegion, ImageVariant, MediaEntry, VariantKind};

    fn item(id: &str, bytes: Option<&[u8]>, faces: Vec<(&str, f32)>) -> BatchItem {
        let mut item = BatchItem::new(MediaEntry {
            id: id.to_string(),
            filename: format!("{id}.jpg"),
            title: None,
            variants: vec![ImageVariant {
                kind: VariantKind::FullRes,
                reference: id.to_string(),
            }],
            created: None,
        });
        item.display_bytes = bytes.map(<[u8]>::to_vec);
        item.faces = faces
            .into_iter()
            .map(|(name, size)| {
                let mut face = DetectedFace::unmatched(FaceRegion {
                    bounding_box: BoundingBox {
                        x: 0.0,
                        y: 0.0,
                        width: size,
                        height: size,
                    },
                    crop: Vec::new(),
                    embedding: vec![0.0; 4],
                });
                face.matched_name = Some(name.to_string());
                face
            })
            .collect();
        item.refresh_identified_names();
        item
    }

    #[test]
    fn picks_the_largest_face_per_person() {
        let items = vec![
            item("a", Some(b"bytes-a"), vec![("Alice", 0.2)]),
            item("b", Some(b"bytes-b"), vec![("Alice", 0.5), ("Bob", 0.1)]),
        ];
        let refs = select_references(&items);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].person_name, "Alice");
        assert_eq!(refs[0].source_item_id, "b");
        assert_eq!(refs[0].image, b"bytes-b");
        assert_eq!(refs[1].person_name, "Bob");
    }

    #[test]
    fn items_without_display_bytes_cannot_be_references() {
        let items = vec![
            item("a", None, vec![("Alice", 0.9)]),
            item("b", Some(b"bytes-b"), vec![("Alice", 0.1)]),
        ];
        let refs = select_references(&items);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].source_item_id, "b");
    }

    #[test]
    fn unmatched_faces_produce_no_references() {
        let mut unnamed = item("a", Some(b"x"), vec![]);
        unnamed.faces = vec![DetectedFace::unmatched(FaceRegion {
            bounding_box: BoundingBox {
                x: 0.0,
                y: 0.0,
                width: 0.4,
                height: 0.4,
            },
            crop: Vec::new(),
            embedding: vec![0.0; 4],
        })];
        assert!(select_references(&[unnamed]).is_empty());
    }
}
