//! Cross-state transition resolution.
//!
//! A state change does not play authored keyframes; it diffs the two
//! states' override tables and tweens every numeric difference. The
//! resolver is pure: it produces [`TweenTrack`]s and a
//! [`TransitionSession`] samples them for a given elapsed time. The
//! frame clock and the callback handle live with the caller; starting a
//! new session simply replaces the old one, and `from` values are
//! recomputed against the last rendered (possibly mid-tween) tree, so a
//! superseded tween is never resumed or blended with.

use crate::animation::ease::cubic_ease_out;
use crate::model::document::{CamlDocument, StateSetValue, StateTransition, strip_appearance_suffix};
use crate::model::layer::{KeyPath, KeyValue, Layer};
use crate::model::tree;

pub const DEFAULT_TRACK_DURATION_SECONDS: f64 = 0.8;

/// One property tween between two states.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TweenTrack {
    pub target_id: String,
    pub key_path: KeyPath,
    pub from: f64,
    pub to: f64,
    pub duration_seconds: f64,
}

/// A sampled track value for one tick.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackValue {
    pub target_id: String,
    pub key_path: KeyPath,
    pub value: f64,
}

/// Resolve the tween tracks for a state change `prev -> next`.
///
/// `rendered` is the last fully-materialized tree and supplies `from`
/// values directly: in steady state it already carries the previous
/// state's overrides, and mid-tween (when a previous change is being
/// superseded) it carries the values actually on screen, so the new
/// tween starts where the cancelled one left off instead of snapping.
/// The previous state's override table only backs up pairs the
/// rendered tree cannot answer.
pub fn resolve_tracks(
    doc: &CamlDocument,
    rendered: &Layer,
    prev_state: &str,
    next_state: &str,
) -> Vec<TweenTrack> {
    let prev_list = doc.effective_overrides(prev_state);
    let next_list = doc.effective_overrides(next_state);

    let mut pairs: Vec<(String, KeyPath)> = Vec::new();
    for sv in prev_list.iter().chain(next_list.iter()) {
        let key = (sv.target_id.clone(), sv.key_path);
        if !pairs.contains(&key) {
            pairs.push(key);
        }
    }

    let mut tracks = Vec::new();
    for (target_id, key_path) in pairs {
        let from = scalar_layer_value(rendered, &target_id, key_path)
            .or_else(|| scalar_override(prev_list, &target_id, key_path))
            .or_else(|| scalar_layer_value(&doc.root, &target_id, key_path));
        let to = scalar_override(next_list, &target_id, key_path)
            .or_else(|| scalar_layer_value(&doc.root, &target_id, key_path));

        let (Some(from), Some(to)) = (from, to) else {
            continue;
        };
        if from == to {
            continue;
        }

        let duration_seconds = authored_duration(doc, prev_state, next_state, &target_id, key_path)
            .unwrap_or(DEFAULT_TRACK_DURATION_SECONDS);

        tracks.push(TweenTrack {
            target_id,
            key_path,
            from,
            to,
            duration_seconds,
        });
    }
    tracks
}

/// Resolve tracks for a companion background document visible beneath
/// the foreground ("floating") layer set. The foreground's state names
/// are mapped into the background's own vocabulary first.
pub fn resolve_background_tracks(
    background: &CamlDocument,
    rendered_background: &Layer,
    prev_foreground_state: &str,
    next_foreground_state: &str,
) -> Vec<TweenTrack> {
    let prev = background
        .map_state_name(prev_foreground_state)
        .unwrap_or_else(|| prev_foreground_state.to_string());
    let next = background
        .map_state_name(next_foreground_state)
        .unwrap_or_else(|| next_foreground_state.to_string());
    resolve_tracks(background, rendered_background, &prev, &next)
}

/// Materialize a named state: the tree with every effective override
/// of `state` written through. Used to seed the rendered tree when a
/// state is entered without animation, and when no tracks were created
/// the caller resolves to this tree immediately.
pub fn apply_state(doc: &CamlDocument, root: &Layer, state: &str) -> Layer {
    let mut current = root.clone();
    for sv in doc.effective_overrides(state) {
        if let Some(updated) = tree::apply_value(&current, &sv.target_id, sv.key_path, &sv.value) {
            current = updated;
        }
    }
    current
}

fn scalar_override(list: &[StateSetValue], target_id: &str, key_path: KeyPath) -> Option<f64> {
    list.iter()
        .find(|sv| sv.target_id == target_id && sv.key_path == key_path)
        .and_then(|sv| sv.value.as_scalar())
}

fn scalar_layer_value(root: &Layer, target_id: &str, key_path: KeyPath) -> Option<f64> {
    tree::find_by_id(root, target_id)
        .and_then(|l| l.value_for(key_path))
        .and_then(|v| v.as_scalar())
}

/// Authored per-element duration from the document's transition list,
/// when one matches. Exact from/to names beat wildcards; state names
/// fall back to their appearance-stripped base form like overrides do.
fn authored_duration(
    doc: &CamlDocument,
    prev_state: &str,
    next_state: &str,
    target_id: &str,
    key_path: KeyPath,
) -> Option<f64> {
    let state_matches = |pattern: &str, state: &str| {
        pattern == "*"
            || pattern == state
            || strip_appearance_suffix(state).is_some_and(|base| pattern == base)
    };
    let mut best: Option<(u8, &StateTransition)> = None;
    for tr in &doc.transitions {
        let from_ok = state_matches(&tr.from_state, prev_state);
        let to_ok = state_matches(&tr.to_state, next_state);
        if !from_ok || !to_ok {
            continue;
        }
        let score = u8::from(tr.from_state != "*") + u8::from(tr.to_state != "*");
        if best.is_none_or(|(s, _)| score > s) {
            best = Some((score, tr));
        }
    }
    let (_, tr) = best?;
    tr.elements
        .iter()
        .find(|e| e.target_id == target_id && e.key_path == key_path)
        .map(|e| e.animation.duration_seconds)
        .filter(|d| *d > 0.0)
}

/// The in-flight tween set for one state change. Sampling is pure;
/// owning and cancelling the per-frame callback is the caller's job.
#[derive(Clone, Debug, Default)]
pub struct TransitionSession {
    tracks: Vec<TweenTrack>,
}

impl TransitionSession {
    pub fn new(tracks: Vec<TweenTrack>) -> Self {
        Self { tracks }
    }

    pub fn tracks(&self) -> &[TweenTrack] {
        &self.tracks
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Overall visible transition length: the longest single track.
    pub fn total_seconds(&self) -> f64 {
        self.tracks
            .iter()
            .map(|t| t.duration_seconds)
            .fold(0.0, f64::max)
    }

    pub fn finished(&self, elapsed_seconds: f64) -> bool {
        elapsed_seconds >= self.total_seconds()
    }

    /// Sample every track at `elapsed_seconds`. Each track eases
    /// independently over its own duration (cubic ease-out) and holds
    /// its end value once done.
    pub fn sample(&self, elapsed_seconds: f64) -> Vec<TrackValue> {
        self.tracks
            .iter()
            .map(|track| {
                let t = if track.duration_seconds <= 0.0 {
                    1.0
                } else {
                    (elapsed_seconds / track.duration_seconds).clamp(0.0, 1.0)
                };
                let eased = cubic_ease_out(t);
                TrackValue {
                    target_id: track.target_id.clone(),
                    key_path: track.key_path,
                    value: track.from + (track.to - track.from) * eased,
                }
            })
            .collect()
    }

    /// Apply one tick's samples onto a tree, returning the rebuilt
    /// tree. Values for ids that no longer resolve are skipped.
    pub fn apply(&self, root: &Layer, elapsed_seconds: f64) -> Layer {
        let mut current = root.clone();
        for tv in self.sample(elapsed_seconds) {
            if let Some(updated) = tree::apply_value(
                &current,
                &tv.target_id,
                tv.key_path,
                &KeyValue::Scalar(tv.value),
            ) {
                current = updated;
            }
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::document::{CamlDocument, StateSetValue, TransitionElement};
    use crate::model::layer::{Animation, KeyValue};
    use kurbo::Vec2;

    fn doc() -> CamlDocument {
        let mut root = Layer::group("root", "Root");
        let mut l = Layer::group("l", "L");
        l.position = Vec2::new(100.0, 50.0);
        l.opacity = 1.0;
        root.children.push(l);

        let mut doc = CamlDocument::with_root(root);
        doc.state_names = vec!["Locked".to_string(), "Unlock".to_string()];
        doc.state_overrides.insert(
            "Locked".to_string(),
            vec![StateSetValue {
                target_id: "l".to_string(),
                key_path: KeyPath::PositionX,
                value: KeyValue::Scalar(10.0),
            }],
        );
        doc.state_overrides.insert("Unlock".to_string(), vec![]);
        doc
    }

    #[test]
    fn diff_creates_one_track_per_changed_pair() {
        let doc = doc();
        let rendered = apply_state(&doc, &doc.root, "Locked");
        let tracks = resolve_tracks(&doc, &rendered, "Locked", "Unlock");
        assert_eq!(tracks.len(), 1);
        let t = &tracks[0];
        assert_eq!(t.from, 10.0);
        assert_eq!(t.to, 100.0); // live layer value fills the gap
        assert_eq!(t.duration_seconds, DEFAULT_TRACK_DURATION_SECONDS);
    }

    #[test]
    fn identical_states_resolve_to_no_tracks() {
        let doc = doc();
        let rendered = apply_state(&doc, &doc.root, "Locked");
        assert!(resolve_tracks(&doc, &rendered, "Locked", "Locked").is_empty());
        assert!(resolve_tracks(&doc, &doc.root, "Unlock", "Unlock").is_empty());
    }

    #[test]
    fn from_reads_the_mid_tween_rendered_tree_not_the_override() {
        let doc = doc();
        // A Locked -> Unlock tween was superseded at x=55; the new
        // change back to Locked starts from 55, not from Unlock's
        // table or the document value.
        let rendered = tree::apply_value(
            &doc.root,
            "l",
            KeyPath::PositionX,
            &KeyValue::Scalar(55.0),
        )
        .unwrap();
        let tracks = resolve_tracks(&doc, &rendered, "Unlock", "Locked");
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].from, 55.0);
        assert_eq!(tracks[0].to, 10.0);
    }

    #[test]
    fn apply_state_writes_every_override_through() {
        let doc = doc();
        let rendered = apply_state(&doc, &doc.root, "Locked");
        assert_eq!(tree::find_by_id(&rendered, "l").unwrap().position.x, 10.0);
        // The source tree is untouched.
        assert_eq!(tree::find_by_id(&doc.root, "l").unwrap().position.x, 100.0);
    }

    #[test]
    fn appearance_suffix_falls_back_to_base_state() {
        let doc = doc();
        let rendered = apply_state(&doc, &doc.root, "Locked Dark");
        let tracks = resolve_tracks(&doc, &rendered, "Locked Dark", "Unlock");
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].from, 10.0);
    }

    #[test]
    fn authored_transition_overrides_track_duration() {
        let mut doc = doc();
        doc.transitions.push(crate::model::document::StateTransition {
            from_state: "*".to_string(),
            to_state: "Unlock".to_string(),
            elements: vec![TransitionElement {
                target_id: "l".to_string(),
                key_path: KeyPath::PositionX,
                animation: Animation::new(KeyPath::PositionX, vec![KeyValue::Scalar(0.0)], 1.5),
            }],
        });
        let tracks = resolve_tracks(&doc, &doc.root, "Locked", "Unlock");
        assert_eq!(tracks[0].duration_seconds, 1.5);
    }

    #[test]
    fn background_document_maps_foreground_state_names() {
        let mut background = doc();
        background.state_names = vec!["Locked Light".to_string(), "Unlock Light".to_string()];
        let overrides = background.state_overrides.remove("Locked").unwrap();
        background
            .state_overrides
            .insert("Locked Light".to_string(), overrides);
        background
            .state_overrides
            .insert("Unlock Light".to_string(), vec![]);

        let rendered = apply_state(&background, &background.root, "Locked Light");
        let tracks = resolve_background_tracks(&background, &rendered, "Locked", "Unlock");
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].from, 10.0);
    }

    #[test]
    fn session_eases_out_and_holds_the_end_value() {
        let session = TransitionSession::new(vec![TweenTrack {
            target_id: "l".to_string(),
            key_path: KeyPath::PositionX,
            from: 0.0,
            to: 100.0,
            duration_seconds: 1.0,
        }]);
        assert_eq!(session.total_seconds(), 1.0);

        let start = session.sample(0.0)[0].value;
        let mid = session.sample(0.5)[0].value;
        let end = session.sample(1.0)[0].value;
        assert_eq!(start, 0.0);
        assert!(mid > 50.0); // ease-out front-loads movement
        assert_eq!(end, 100.0);
        assert_eq!(session.sample(5.0)[0].value, 100.0);
        assert!(session.finished(1.0));
    }

    #[test]
    fn session_total_is_the_longest_track() {
        let mk = |d: f64| TweenTrack {
            target_id: "l".to_string(),
            key_path: KeyPath::Opacity,
            from: 0.0,
            to: 1.0,
            duration_seconds: d,
        };
        let session = TransitionSession::new(vec![mk(0.3), mk(0.8), mk(0.5)]);
        assert_eq!(session.total_seconds(), 0.8);
        assert!(!session.finished(0.79));
    }

    #[test]
    fn apply_writes_samples_through_to_the_tree() {
        let doc = doc();
        let session = TransitionSession::new(vec![TweenTrack {
            target_id: "l".to_string(),
            key_path: KeyPath::Opacity,
            from: 1.0,
            to: 0.0,
            duration_seconds: 0.8,
        }]);
        let done = session.apply(&doc.root, 0.8);
        assert_eq!(tree::find_by_id(&done, "l").unwrap().opacity, 0.0);
    }
}
