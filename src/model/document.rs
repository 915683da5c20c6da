use std::collections::{BTreeMap, HashSet};

use crate::foundation::error::{CaplayError, CaplayResult};
use crate::model::layer::{Animation, KeyPath, KeyValue, Layer};
use crate::model::tree;

/// State names synthesized when a document declares none.
pub const DEFAULT_STATE_NAMES: [&str; 3] = ["Locked", "Unlock", "Sleep"];

/// Appearance suffixes a state name may carry when a document splits
/// its states per system appearance.
pub const APPEARANCE_SUFFIXES: [&str; 2] = [" Light", " Dark"];

/// One per-state property override.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StateSetValue {
    pub target_id: String,
    pub key_path: KeyPath,
    pub value: KeyValue,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TransitionElement {
    pub target_id: String,
    pub key_path: KeyPath,
    pub animation: Animation,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StateTransition {
    /// `*` matches any state.
    pub from_state: String,
    pub to_state: String,
    pub elements: Vec<TransitionElement>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ParallaxAxis {
    X,
    Y,
}

impl ParallaxAxis {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Some(Self::X),
            "y" => Some(Self::Y),
            _ => None,
        }
    }
}

/// Mapping from a device-tilt axis to a layer property range, used by
/// gyro-reactive wallpapers.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GyroParallaxEntry {
    pub axis: ParallaxAxis,
    pub layer_name: String,
    pub key_path: KeyPath,
    pub map_min_to: f64,
    pub map_max_to: f64,
    pub view: String,
    pub title: String,
    pub image: String,
}

/// Per-state override table: state name to its ordered override list.
pub type StateOverrides = BTreeMap<String, Vec<StateSetValue>>;

/// A parsed wallpaper document: the layer tree plus everything the
/// codec discovers alongside it.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CamlDocument {
    pub root: Layer,
    pub state_names: Vec<String>,
    pub state_overrides: StateOverrides,
    pub transitions: Vec<StateTransition>,
    pub parallax: Vec<GyroParallaxEntry>,
}

impl CamlDocument {
    pub fn with_root(root: Layer) -> Self {
        Self {
            root,
            state_names: Vec::new(),
            state_overrides: StateOverrides::new(),
            transitions: Vec::new(),
            parallax: Vec::new(),
        }
    }

    /// Effective override list for a state name: the literal name, or
    /// the name with a trailing appearance suffix stripped when the
    /// literal has no entries.
    pub fn effective_overrides(&self, state: &str) -> &[StateSetValue] {
        if let Some(list) = self.state_overrides.get(state)
            && !list.is_empty()
        {
            return list;
        }
        if let Some(base) = strip_appearance_suffix(state)
            && let Some(list) = self.state_overrides.get(base)
        {
            return list;
        }
        &[]
    }

    /// Whether any declared state is split per appearance.
    pub fn has_appearance_split(&self) -> bool {
        self.state_names
            .iter()
            .any(|n| strip_appearance_suffix(n).is_some())
    }

    /// Map a foreign state name (e.g. from a foreground document) into
    /// this document's own state vocabulary.
    pub fn map_state_name(&self, foreign: &str) -> Option<String> {
        if self.state_names.iter().any(|n| n == foreign) {
            return Some(foreign.to_string());
        }
        if let Some(base) = strip_appearance_suffix(foreign)
            && self.state_names.iter().any(|n| n == base)
        {
            return Some(base.to_string());
        }
        if self.has_appearance_split() {
            for suffix in APPEARANCE_SUFFIXES {
                let candidate = format!("{foreign}{suffix}");
                if self.state_names.iter().any(|n| n == &candidate) {
                    return Some(candidate);
                }
            }
        }
        None
    }

    pub fn validate(&self) -> CaplayResult<()> {
        let mut seen = HashSet::new();
        let mut duplicate = None;
        tree::walk(&self.root, &mut |l| {
            if !seen.insert(l.id.clone()) && duplicate.is_none() {
                duplicate = Some(l.id.clone());
            }
        });
        if let Some(id) = duplicate {
            return Err(CaplayError::model(format!("duplicate layer id '{id}'")));
        }

        let mut bad: Option<CaplayError> = None;
        tree::walk(&self.root, &mut |l| {
            if bad.is_some() {
                return;
            }
            if !(0.0..=1.0).contains(&l.opacity) {
                bad = Some(CaplayError::model(format!(
                    "layer '{}' opacity out of range",
                    l.id
                )));
                return;
            }
            for anim in &l.animations {
                if anim.values.is_empty() {
                    bad = Some(CaplayError::animation(format!(
                        "layer '{}' has an animation with no values",
                        l.id
                    )));
                    return;
                }
                if let Some(kt) = &anim.key_times
                    && kt.len() != anim.values.len()
                {
                    bad = Some(CaplayError::animation(format!(
                        "layer '{}' keyTimes length {} does not match {} values",
                        l.id,
                        kt.len(),
                        anim.values.len()
                    )));
                    return;
                }
            }
        });
        if let Some(err) = bad {
            return Err(err);
        }

        Ok(())
    }
}

pub fn strip_appearance_suffix(state: &str) -> Option<&str> {
    APPEARANCE_SUFFIXES
        .iter()
        .find_map(|s| state.strip_suffix(s))
        .filter(|base| !base.is_empty())
}

/// Return the override table with every `(target_id, key_path)` pair
/// any state defines present in *all* states passed in `state_names`,
/// missing entries defaulted to the target layer's live value.
///
/// Pure and order-independent: the returned table is complete before
/// any serialization reads it. Pairs whose target no longer resolves
/// are dropped from every state. Running the function twice yields the
/// same table as running it once.
///
/// The default is intentionally the *live* layer property rather than
/// the base state's own override; the two can diverge and the source
/// behavior is preserved here.
pub fn backfill_overrides(
    overrides: &StateOverrides,
    state_names: &[String],
    root: &Layer,
) -> StateOverrides {
    // Union of pairs across every state, in first-seen order.
    let mut pairs: Vec<(String, KeyPath)> = Vec::new();
    let mut seen: HashSet<(String, KeyPath)> = HashSet::new();
    for list in overrides.values() {
        for sv in list {
            let key = (sv.target_id.clone(), sv.key_path);
            if seen.insert(key.clone()) {
                pairs.push(key);
            }
        }
    }
    pairs.retain(|(id, _)| tree::contains_id(root, id));

    let mut out = StateOverrides::new();
    for state in state_names {
        let existing = overrides.get(state).map(Vec::as_slice).unwrap_or(&[]);
        let mut list: Vec<StateSetValue> = existing
            .iter()
            .filter(|sv| tree::contains_id(root, &sv.target_id))
            .cloned()
            .collect();
        for (target_id, key_path) in &pairs {
            let already = list
                .iter()
                .any(|sv| &sv.target_id == target_id && sv.key_path == *key_path);
            if already {
                continue;
            }
            let live = tree::find_by_id(root, target_id).and_then(|l| l.value_for(*key_path));
            if let Some(value) = live {
                list.push(StateSetValue {
                    target_id: target_id.clone(),
                    key_path: *key_path,
                    value,
                });
            }
        }
        out.insert(state.clone(), list);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::layer::{KeyValue, Layer};
    use kurbo::Vec2;

    fn doc_with_states(states: &[&str]) -> CamlDocument {
        let mut root = Layer::group("root", "Root");
        let mut child = Layer::group("l", "L");
        child.position = Vec2::new(42.0, 7.0);
        root.children.push(child);

        let mut doc = CamlDocument::with_root(root);
        doc.state_names = states.iter().map(|s| s.to_string()).collect();
        doc
    }

    fn set_x(target: &str, x: f64) -> StateSetValue {
        StateSetValue {
            target_id: target.to_string(),
            key_path: KeyPath::PositionX,
            value: KeyValue::Scalar(x),
        }
    }

    #[test]
    fn backfill_copies_live_value_into_missing_states() {
        let mut doc = doc_with_states(&["Locked", "Unlock"]);
        doc.state_overrides
            .insert("Locked".to_string(), vec![set_x("l", 10.0)]);

        let filled = backfill_overrides(&doc.state_overrides, &doc.state_names, &doc.root);
        let unlock = &filled["Unlock"];
        assert_eq!(unlock.len(), 1);
        assert_eq!(unlock[0].target_id, "l");
        assert_eq!(unlock[0].value, KeyValue::Scalar(42.0)); // live position.x
    }

    #[test]
    fn backfill_is_idempotent() {
        let mut doc = doc_with_states(&["Locked", "Unlock", "Sleep"]);
        doc.state_overrides
            .insert("Locked".to_string(), vec![set_x("l", 10.0)]);

        let once = backfill_overrides(&doc.state_overrides, &doc.state_names, &doc.root);
        let twice = backfill_overrides(&once, &doc.state_names, &doc.root);
        assert_eq!(once, twice);
    }

    #[test]
    fn backfill_drops_dead_targets_everywhere() {
        let mut doc = doc_with_states(&["Locked", "Unlock"]);
        doc.state_overrides.insert(
            "Locked".to_string(),
            vec![set_x("l", 10.0), set_x("ghost", 5.0)],
        );

        let filled = backfill_overrides(&doc.state_overrides, &doc.state_names, &doc.root);
        for list in filled.values() {
            assert!(list.iter().all(|sv| sv.target_id != "ghost"));
        }
    }

    #[test]
    fn effective_overrides_falls_back_to_base_state() {
        let mut doc = doc_with_states(&["Locked", "Locked Dark"]);
        doc.state_overrides
            .insert("Locked".to_string(), vec![set_x("l", 10.0)]);

        assert_eq!(doc.effective_overrides("Locked Dark").len(), 1);
        assert_eq!(doc.effective_overrides("Sleep").len(), 0);
    }

    #[test]
    fn map_state_name_respects_appearance_split() {
        let mut doc = doc_with_states(&["Locked Light", "Locked Dark"]);
        doc.state_overrides.insert("Locked Light".to_string(), vec![]);

        assert_eq!(
            doc.map_state_name("Locked").as_deref(),
            Some("Locked Light")
        );
        assert_eq!(
            doc.map_state_name("Unlock Dark"),
            None
        );
    }

    #[test]
    fn validate_rejects_duplicate_ids() {
        let mut root = Layer::group("root", "Root");
        root.children.push(Layer::group("x", "X1"));
        root.children.push(Layer::group("x", "X2"));
        let doc = CamlDocument::with_root(root);
        assert!(doc.validate().is_err());
    }
}
