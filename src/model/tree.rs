//! Pure operations over the layer tree. Every edit returns a fresh
//! root; the node and its ancestor chain are replaced rather than
//! mutated in place, so a render pass holding the old tree never
//! observes a partially-updated node.

use std::collections::HashSet;

use crate::foundation::core::{Color, Size, Vec2};
use crate::model::layer::{KeyPath, KeyValue, Layer, LayerKind};

pub fn find_by_id<'a>(root: &'a Layer, id: &str) -> Option<&'a Layer> {
    if root.id == id {
        return Some(root);
    }
    root.children.iter().find_map(|c| find_by_id(c, id))
}

pub fn contains_id(root: &Layer, id: &str) -> bool {
    find_by_id(root, id).is_some()
}

pub fn walk(root: &Layer, visit: &mut dyn FnMut(&Layer)) {
    visit(root);
    for child in &root.children {
        walk(child, visit);
    }
}

pub fn collect_ids(root: &Layer) -> Vec<String> {
    let mut out = Vec::new();
    walk(root, &mut |l| out.push(l.id.clone()));
    out
}

pub fn collect_names(root: &Layer) -> Vec<String> {
    let mut out = Vec::new();
    walk(root, &mut |l| out.push(l.name.clone()));
    out
}

/// Rebuild the tree with `f` applied to the node carrying `id`.
/// Returns `None` when the id does not resolve.
pub fn update_by_id(root: &Layer, id: &str, f: &mut dyn FnMut(&mut Layer)) -> Option<Layer> {
    if root.id == id {
        let mut fresh = root.clone();
        f(&mut fresh);
        return Some(fresh);
    }
    for (i, child) in root.children.iter().enumerate() {
        if let Some(updated) = update_by_id(child, id, f) {
            let mut fresh = root.clone();
            fresh.children[i] = updated;
            return Some(fresh);
        }
    }
    None
}

/// Insert `node` under the selected layer when one is given (falling
/// back to the root when the selection does not resolve).
pub fn insert_under(root: &Layer, selected_id: Option<&str>, node: Layer) -> Layer {
    if let Some(sel) = selected_id
        && let Some(updated) = update_by_id(root, sel, &mut |l| l.children.push(node.clone()))
    {
        return updated;
    }
    let mut fresh = root.clone();
    fresh.children.push(node);
    fresh
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertPosition {
    Before,
    After,
    Into,
}

/// Insert `node` before/after the target among its siblings, or as the
/// target's last child. Returns `None` when the target does not resolve
/// (or is the root, for Before/After).
pub fn insert_relative(
    root: &Layer,
    target_id: &str,
    node: Layer,
    position: InsertPosition,
) -> Option<Layer> {
    if position == InsertPosition::Into {
        return update_by_id(root, target_id, &mut |l| l.children.push(node.clone()));
    }
    insert_sibling(root, target_id, &node, position)
}

fn insert_sibling(
    parent: &Layer,
    target_id: &str,
    node: &Layer,
    position: InsertPosition,
) -> Option<Layer> {
    if let Some(i) = parent.children.iter().position(|c| c.id == target_id) {
        let mut fresh = parent.clone();
        let at = match position {
            InsertPosition::Before => i,
            InsertPosition::After => i + 1,
            InsertPosition::Into => unreachable!("handled by insert_relative"),
        };
        fresh.children.insert(at, node.clone());
        return Some(fresh);
    }
    for (i, child) in parent.children.iter().enumerate() {
        if let Some(updated) = insert_sibling(child, target_id, node, position) {
            let mut fresh = parent.clone();
            fresh.children[i] = updated;
            return Some(fresh);
        }
    }
    None
}

/// Remove the node carrying `id`, returning the removed node together
/// with the pruned tree. Removing the root is not an edit; it returns
/// `None`.
pub fn remove_by_id(root: &Layer, id: &str) -> Option<(Layer, Layer)> {
    if root.id == id {
        return None;
    }
    if let Some(i) = root.children.iter().position(|c| c.id == id) {
        let mut fresh = root.clone();
        let removed = fresh.children.remove(i);
        return Some((removed, fresh));
    }
    for (i, child) in root.children.iter().enumerate() {
        if let Some((removed, pruned)) = remove_by_id(child, id) {
            let mut fresh = root.clone();
            fresh.children[i] = pruned;
            return Some((removed, fresh));
        }
    }
    None
}

/// Partial update applied through [`patch_by_id`]. `None` fields leave
/// the layer untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayerPatch {
    pub name: Option<String>,
    pub position: Option<Vec2>,
    pub size: Option<Size>,
    pub anchor_point: Option<Vec2>,
    pub opacity: Option<f64>,
    pub rotation: Option<f64>,
    pub rotation_x: Option<f64>,
    pub rotation_y: Option<f64>,
    pub z_position: Option<f64>,
    pub corner_radius: Option<f64>,
    pub background_color: Option<Option<Color>>,
    pub masks_to_bounds: Option<bool>,
}

/// Apply a partial update to one layer.
///
/// When the patch resizes a video layer that owns synthesized per-frame
/// children, every child is re-centered at the new midpoint in the same
/// update.
pub fn patch_by_id(root: &Layer, id: &str, patch: &LayerPatch) -> Option<Layer> {
    update_by_id(root, id, &mut |l| {
        if let Some(name) = &patch.name {
            l.name = name.clone();
        }
        if let Some(p) = patch.position {
            l.position = p;
        }
        if let Some(s) = patch.size {
            l.size = s;
            if matches!(l.kind, LayerKind::Video(_)) && !l.children.is_empty() {
                let mid = s.midpoint();
                for child in &mut l.children {
                    child.position = mid;
                }
            }
        }
        if let Some(a) = patch.anchor_point {
            l.anchor_point = a;
        }
        if let Some(o) = patch.opacity {
            l.opacity = o.clamp(0.0, 1.0);
        }
        if let Some(r) = patch.rotation {
            l.rotation = r;
        }
        if let Some(r) = patch.rotation_x {
            l.rotation_x = r;
        }
        if let Some(r) = patch.rotation_y {
            l.rotation_y = r;
        }
        if let Some(z) = patch.z_position {
            l.z_position = z;
        }
        if let Some(c) = patch.corner_radius {
            l.corner_radius = c;
        }
        if let Some(bg) = patch.background_color {
            l.background_color = bg;
        }
        if let Some(m) = patch.masks_to_bounds {
            l.masks_to_bounds = m;
        }
    })
}

/// Write a state-override value onto the target layer, returning the
/// rebuilt tree.
pub fn apply_value(root: &Layer, target_id: &str, key_path: KeyPath, value: &KeyValue) -> Option<Layer> {
    update_by_id(root, target_id, &mut |l| l.set_value(key_path, value))
}

/// Deep-clone a subtree for duplication. Every cloned node gets a fresh
/// id, and a fresh name chosen by scanning every name in the whole
/// document (not just siblings), so pasting under any parent stays
/// collision-free.
pub fn clone_deep(node: &Layer, document_root: &Layer) -> Layer {
    let mut ids: HashSet<String> = collect_ids(document_root).into_iter().collect();
    let mut names: HashSet<String> = collect_names(document_root).into_iter().collect();
    clone_rec(node, &mut ids, &mut names)
}

fn clone_rec(node: &Layer, ids: &mut HashSet<String>, names: &mut HashSet<String>) -> Layer {
    let mut fresh = node.clone();
    fresh.id = next_unique_id(&node.id, ids);
    fresh.name = next_unique_name(&node.name, names);
    ids.insert(fresh.id.clone());
    names.insert(fresh.name.clone());
    fresh.children = node
        .children
        .iter()
        .map(|c| clone_rec(c, ids, names))
        .collect();
    fresh
}

fn next_unique_id(base: &str, taken: &HashSet<String>) -> String {
    let stem = strip_numeric_suffix(base, '-');
    let mut n = 2u32;
    loop {
        let candidate = format!("{stem}-{n}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn next_unique_name(base: &str, taken: &HashSet<String>) -> String {
    let stem = strip_numeric_suffix(base, ' ');
    let mut n = 2u32;
    loop {
        let candidate = format!("{stem} {n}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn strip_numeric_suffix(s: &str, sep: char) -> &str {
    if let Some((stem, tail)) = s.rsplit_once(sep)
        && !tail.is_empty()
        && tail.chars().all(|c| c.is_ascii_digit())
        && !stem.is_empty()
    {
        return stem;
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::layer::{CalculationMode, VideoFrames};

    fn leaf(id: &str, name: &str) -> Layer {
        Layer::group(id, name)
    }

    fn sample_tree() -> Layer {
        let mut root = leaf("root", "Root");
        let mut a = leaf("a", "A");
        a.children.push(leaf("a1", "A1"));
        root.children.push(a);
        root.children.push(leaf("b", "B"));
        root
    }

    #[test]
    fn find_descends_into_children() {
        let tree = sample_tree();
        assert_eq!(find_by_id(&tree, "a1").unwrap().name, "A1");
        assert!(find_by_id(&tree, "zz").is_none());
    }

    #[test]
    fn update_replaces_ancestor_chain_not_the_original() {
        let tree = sample_tree();
        let updated = update_by_id(&tree, "a1", &mut |l| l.opacity = 0.5).unwrap();
        assert_eq!(find_by_id(&updated, "a1").unwrap().opacity, 0.5);
        assert_eq!(find_by_id(&tree, "a1").unwrap().opacity, 1.0);
    }

    #[test]
    fn insert_relative_places_siblings() {
        let tree = sample_tree();
        let updated =
            insert_relative(&tree, "b", leaf("c", "C"), InsertPosition::Before).unwrap();
        let order: Vec<_> = updated.children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(order, vec!["a", "c", "b"]);

        let updated = insert_relative(&tree, "a1", leaf("c", "C"), InsertPosition::Into).unwrap();
        assert_eq!(find_by_id(&updated, "a1").unwrap().children.len(), 1);
    }

    #[test]
    fn remove_returns_node_and_pruned_tree() {
        let tree = sample_tree();
        let (removed, pruned) = remove_by_id(&tree, "a").unwrap();
        assert_eq!(removed.id, "a");
        assert_eq!(removed.children.len(), 1);
        assert!(find_by_id(&pruned, "a").is_none());
        assert!(find_by_id(&pruned, "b").is_some());
        assert!(remove_by_id(&tree, "root").is_none());
    }

    #[test]
    fn patch_recenters_video_frame_children() {
        let mut video = Layer::new(
            "v",
            "Video",
            LayerKind::Video(VideoFrames {
                frame_count: 3,
                fps: 30.0,
                duration_seconds: 0.1,
                frame_prefix: "frame_".to_string(),
                frame_extension: "png".to_string(),
                auto_reverses: false,
                calculation_mode: CalculationMode::Discrete,
            }),
        );
        video.children.push(leaf("f0", "Frame"));
        let mut root = leaf("root", "Root");
        root.children.push(video);

        let patch = LayerPatch {
            size: Some(Size::new(100.0, 40.0)),
            ..LayerPatch::default()
        };
        let updated = patch_by_id(&root, "v", &patch).unwrap();
        let child = &find_by_id(&updated, "v").unwrap().children[0];
        assert_eq!(child.position, Vec2::new(50.0, 20.0));
    }

    #[test]
    fn clone_deep_scans_the_whole_document_for_names() {
        let mut root = sample_tree();
        // A name that lives in a different branch still blocks the
        // first candidate suffix.
        root.children.push(leaf("x", "A1 2"));

        let source = find_by_id(&root, "a").unwrap().clone();
        let cloned = clone_deep(&source, &root);
        assert_ne!(cloned.id, "a");
        assert_eq!(cloned.name, "A 2");
        assert_eq!(cloned.children[0].name, "A1 3");
        assert_ne!(cloned.children[0].id, "a1");
    }

    #[test]
    fn clone_deep_never_reuses_a_fresh_id_twice() {
        let mut root = leaf("root", "Root");
        root.children.push(leaf("n", "N"));
        root.children.push(leaf("n-2", "N 2"));
        let source = find_by_id(&root, "n").unwrap().clone();
        let cloned = clone_deep(&source, &root);
        assert_eq!(cloned.id, "n-3");
        assert_eq!(cloned.name, "N 3");
    }
}
