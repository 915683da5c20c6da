//! CAML text to document model.
//!
//! Parsing is best-effort and non-throwing at the document level: a
//! missing attribute falls back to its documented default, and a
//! failure inside one of the optional sections (states, transitions,
//! parallax) degrades that section to empty instead of aborting the
//! parse. Real-world documents come from several authoring tools with
//! inconsistent completeness. Only unreadable top-level XML errors.

use kurbo::Vec2;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::codec::{color, normalize_filename, video};
use crate::foundation::core::{Canvas, GradientStop, Size};
use crate::foundation::error::{CaplayError, CaplayResult};
use crate::foundation::math::radians_to_degrees;
use crate::model::document::{
    CamlDocument, GyroParallaxEntry, ParallaxAxis, StateOverrides, StateSetValue, StateTransition,
    TransitionElement,
};
use crate::model::layer::{
    Animation, CalculationMode, CellColor, DisplayKind, EmitterCell, EmitterLayer, EmitterMode,
    EmitterRenderMode, EmitterShape, GradientKind, GradientLayer, ImageLayer, KeyPath, KeyValue,
    Layer, LayerKind, ReplicatorLayer, ShapeLayer, TextAlignment, TextLayer, TimingFunction,
    VideoFrames,
};

#[derive(Clone, Copy, Debug, Default)]
pub struct ParseOptions {
    /// Project canvas, used to place synthesized image children.
    pub canvas: Option<Canvas>,
}

/// Parse CAML text into a document.
#[tracing::instrument(skip_all)]
pub fn parse(text: &str, opts: &ParseOptions) -> CaplayResult<CamlDocument> {
    let tree = read_tree(text)?;
    let root_el = if tree.name == "caml" {
        tree.children
            .iter()
            .find(|c| is_layer_element(&c.name))
            .ok_or_else(|| CaplayError::codec("caml document has no root layer"))?
    } else if is_layer_element(&tree.name) {
        &tree
    } else {
        return Err(CaplayError::codec(format!(
            "unexpected root element '{}'",
            tree.name
        )));
    };

    let mut ctx = ParseCtx {
        opts: *opts,
        fresh: 0,
    };
    let root = parse_layer(root_el, &mut ctx);

    let (state_names, state_overrides) = match parse_states(root_el) {
        Ok(v) => v,
        Err(err) => {
            tracing::warn!(%err, "states section unreadable, dropping");
            (Vec::new(), StateOverrides::new())
        }
    };
    let transitions = match parse_transitions(root_el) {
        Ok(v) => v,
        Err(err) => {
            tracing::warn!(%err, "stateTransitions section unreadable, dropping");
            Vec::new()
        }
    };
    let parallax = match parse_parallax(root_el) {
        Ok(v) => v,
        Err(err) => {
            tracing::warn!(%err, "parallax section unreadable, dropping");
            Vec::new()
        }
    };

    Ok(CamlDocument {
        root,
        state_names,
        state_overrides,
        transitions,
        parallax,
    })
}

// ---------------------------------------------------------------------------
// Generic element tree

#[derive(Clone, Debug, Default)]
struct XmlNode {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<XmlNode>,
}

impl XmlNode {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.name == name)
    }
}

fn read_tree(text: &str) -> CaplayResult<XmlNode> {
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<XmlNode> = vec![XmlNode::default()]; // sentinel

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(node_from(&e)),
            Ok(Event::Empty(e)) => {
                let node = node_from(&e);
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(node);
                }
            }
            Ok(Event::End(_)) => {
                if stack.len() < 2 {
                    return Err(CaplayError::codec("unbalanced closing tag"));
                }
                let node = stack.pop().unwrap_or_default();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(node);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {} // text, comments, declarations
            Err(err) => return Err(CaplayError::codec(format!("malformed XML: {err}"))),
        }
    }

    if stack.len() != 1 {
        return Err(CaplayError::codec("unclosed element at end of document"));
    }
    stack
        .pop()
        .and_then(|sentinel| sentinel.children.into_iter().next())
        .ok_or_else(|| CaplayError::codec("empty document"))
}

fn node_from(e: &BytesStart<'_>) -> XmlNode {
    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in e.attributes().with_checks(false).flatten() {
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        if let Ok(value) = attr.unescape_value() {
            attrs.push((key, value.into_owned()));
        }
    }
    XmlNode {
        name,
        attrs,
        children: Vec::new(),
    }
}

fn is_layer_element(name: &str) -> bool {
    matches!(
        name,
        "CALayer"
            | "CATextLayer"
            | "CAGradientLayer"
            | "CAEmitterLayer"
            | "CATransformLayer"
            | "CAReplicatorLayer"
    )
}

// ---------------------------------------------------------------------------
// Attribute helpers

fn parse_f64(s: &str) -> Option<f64> {
    s.trim().parse().ok()
}

fn attr_f64(el: &XmlNode, name: &str, default: f64) -> f64 {
    el.attr(name).and_then(parse_f64).unwrap_or(default)
}

fn attr_bool(el: &XmlNode, name: &str) -> bool {
    matches!(el.attr(name).map(str::trim), Some("1") | Some("true"))
}

fn parse_vec2(s: &str) -> Option<Vec2> {
    let mut it = s.split_whitespace().map(parse_f64);
    match (it.next(), it.next()) {
        (Some(Some(x)), Some(Some(y))) => Some(Vec2::new(x, y)),
        _ => None,
    }
}

fn attr_vec2(el: &XmlNode, name: &str, default: Vec2) -> Vec2 {
    el.attr(name).and_then(parse_vec2).unwrap_or(default)
}

/// `bounds="x y w h"`; only the extent is kept.
fn parse_bounds(s: &str) -> Option<Size> {
    let parts: Vec<f64> = s.split_whitespace().filter_map(parse_f64).collect();
    match parts.as_slice() {
        [_, _, w, h] => Some(Size::new(*w, *h)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Layers

struct ParseCtx {
    opts: ParseOptions,
    fresh: u64,
}

impl ParseCtx {
    fn fresh_id(&mut self) -> String {
        self.fresh += 1;
        format!("layer-{}", self.fresh)
    }
}

fn parse_layer(el: &XmlNode, ctx: &mut ParseCtx) -> Layer {
    let id = el
        .attr("id")
        .map(str::to_string)
        .unwrap_or_else(|| ctx.fresh_id());
    let name = el.attr("name").unwrap_or(&id).to_string();

    let (animations, contents_video) = parse_animations(el);

    let mut children: Vec<Layer> = el
        .child("sublayers")
        .map(|subs| {
            subs.children
                .iter()
                .filter(|c| is_layer_element(&c.name))
                .map(|c| parse_layer(c, ctx))
                .collect()
        })
        .unwrap_or_default();

    let mut layer = Layer::new(id, name, LayerKind::Transform);
    layer.position = attr_vec2(el, "position", Vec2::ZERO);
    layer.size = el
        .attr("bounds")
        .and_then(parse_bounds)
        .unwrap_or_default();
    layer.anchor_point = attr_vec2(el, "anchorPoint", crate::model::layer::DEFAULT_ANCHOR);
    layer.opacity = attr_f64(el, "opacity", 1.0).clamp(0.0, 1.0);
    layer.rotation = radians_to_degrees(attr_f64(el, "transform.rotation.z", 0.0));
    layer.rotation_x = radians_to_degrees(attr_f64(el, "transform.rotation.x", 0.0));
    layer.rotation_y = radians_to_degrees(attr_f64(el, "transform.rotation.y", 0.0));
    layer.z_position = attr_f64(el, "zPosition", 0.0);
    layer.background_color = el
        .attr("backgroundColor")
        .and_then(|s| color::parse_components(s).ok());
    layer.background_opacity = el.attr("backgroundColorOpacity").and_then(parse_f64);
    layer.corner_radius = attr_f64(el, "cornerRadius", 0.0);
    layer.border_color = el
        .attr("borderColor")
        .and_then(|s| color::parse_components(s).ok());
    layer.border_width = attr_f64(el, "borderWidth", 0.0);
    layer.masks_to_bounds = attr_bool(el, "masksToBounds");
    layer.geometry_flipped = attr_bool(el, "geometryFlipped");
    layer.animations = animations;

    layer.kind = classify(el, contents_video, &children);

    if let LayerKind::Group {
        display: Some(_),
        contents: Some(contents),
    } = &layer.kind
        && !has_matching_image_child(&children, contents)
    {
        children.push(synthesize_image_child(&layer, contents, ctx));
    }

    layer.children = children;
    layer
}

fn classify(el: &XmlNode, contents_video: Option<VideoFrames>, children: &[Layer]) -> LayerKind {
    match el.name.as_str() {
        "CATextLayer" => LayerKind::Text(TextLayer {
            text: el.attr("string").unwrap_or_default().to_string(),
            font_size: attr_f64(el, "fontSize", 17.0),
            font_family: el.attr("fontFamily").unwrap_or("Helvetica").to_string(),
            color: el
                .attr("foregroundColor")
                .and_then(|s| color::parse_components(s).ok()),
            alignment: el
                .attr("alignmentMode")
                .map(TextAlignment::parse)
                .unwrap_or_default(),
        }),
        "CAGradientLayer" => LayerKind::Gradient(parse_gradient(el)),
        "CAEmitterLayer" => LayerKind::Emitter(parse_emitter(el)),
        "CATransformLayer" => LayerKind::Transform,
        "CAReplicatorLayer" => LayerKind::Replicator(ReplicatorLayer {
            instance_count: attr_f64(el, "instanceCount", 1.0).max(1.0) as u32,
            instance_delay_seconds: attr_f64(el, "instanceDelay", 0.0),
            instance_rotation: radians_to_degrees(attr_f64(el, "instanceRotation", 0.0)),
            instance_translate: attr_vec2(el, "instanceTranslate", Vec2::ZERO),
        }),
        // CALayer and anything unrecognized.
        _ => {
            if el.attr("caplayFrameCount").is_some() {
                return LayerKind::Video(video_from_attrs(el));
            }
            if let Some(video) = contents_video {
                return LayerKind::Video(video);
            }
            if let Some(path) = el.attr("path") {
                return LayerKind::Shape(ShapeLayer {
                    path: path.to_string(),
                    fill_color: el
                        .attr("fillColor")
                        .and_then(|s| color::parse_components(s).ok()),
                    stroke_color: el
                        .attr("strokeColor")
                        .and_then(|s| color::parse_components(s).ok()),
                    stroke_width: attr_f64(el, "strokeWidth", 0.0),
                });
            }
            let contents = el.attr("contents").map(str::to_string);
            if let Some(display) = el.attr("caplayKind").and_then(DisplayKind::parse) {
                return LayerKind::Group {
                    display: Some(display),
                    contents,
                };
            }
            if children.is_empty()
                && let Some(src) = contents.clone()
            {
                return LayerKind::Image(ImageLayer { src });
            }
            LayerKind::Group {
                display: None,
                contents,
            }
        }
    }
}

fn video_from_attrs(el: &XmlNode) -> VideoFrames {
    let frame_count = attr_f64(el, "caplayFrameCount", 0.0).max(0.0) as u32;
    let duration = attr_f64(el, "caplayDuration", 0.0);
    VideoFrames {
        frame_count,
        fps: attr_f64(el, "caplayFPS", 30.0),
        duration_seconds: duration,
        frame_prefix: el.attr("caplayFramePrefix").unwrap_or_default().to_string(),
        frame_extension: el
            .attr("caplayFrameExtension")
            .unwrap_or("png")
            .to_string(),
        auto_reverses: attr_bool(el, "caplayAutoReverses"),
        calculation_mode: el
            .attr("caplayCalculationMode")
            .map(CalculationMode::parse)
            .unwrap_or_default(),
    }
}

fn parse_gradient(el: &XmlNode) -> GradientLayer {
    let colors: Vec<_> = el
        .child("colors")
        .map(|wrapper| {
            wrapper
                .children_named("CGColor")
                .filter_map(|c| c.attr("value"))
                .filter_map(|v| color::parse_components(v).ok())
                .collect()
        })
        .unwrap_or_default();

    let locations: Vec<f64> = el
        .attr("locations")
        .map(|s| s.split_whitespace().filter_map(parse_f64).collect())
        .unwrap_or_default();

    let n = colors.len();
    let stops = colors
        .into_iter()
        .enumerate()
        .map(|(i, c)| GradientStop {
            color: c,
            location: locations.get(i).copied().unwrap_or(if n > 1 {
                i as f64 / (n - 1) as f64
            } else {
                0.0
            }),
        })
        .collect();

    GradientLayer {
        kind: el
            .attr("type")
            .map(GradientKind::parse)
            .unwrap_or_default(),
        start_point: attr_vec2(el, "startPoint", Vec2::new(0.5, 0.0)),
        end_point: attr_vec2(el, "endPoint", Vec2::new(0.5, 1.0)),
        stops,
    }
}

fn parse_emitter(el: &XmlNode) -> EmitterLayer {
    let cells = el
        .child("emitterCells")
        .map(|wrapper| {
            wrapper
                .children_named("CAEmitterCell")
                .map(parse_emitter_cell)
                .collect()
        })
        .unwrap_or_default();

    EmitterLayer {
        emitter_position: attr_vec2(el, "emitterPosition", Vec2::ZERO),
        emitter_size: el
            .attr("emitterSize")
            .and_then(parse_vec2)
            .map(|v| Size::new(v.x, v.y))
            .unwrap_or_default(),
        shape: el
            .attr("emitterShape")
            .map(EmitterShape::parse)
            .unwrap_or_default(),
        mode: el
            .attr("emitterMode")
            .map(EmitterMode::parse)
            .unwrap_or_default(),
        render_mode: el
            .attr("renderMode")
            .map(EmitterRenderMode::parse)
            .unwrap_or_default(),
        cells,
    }
}

fn parse_cell_color(el: &XmlNode, name: &str, default: CellColor) -> CellColor {
    let Some(s) = el.attr(name) else {
        return default;
    };
    let parts: Vec<f64> = s.split_whitespace().filter_map(parse_f64).collect();
    match parts.as_slice() {
        [r, g, b] | [r, g, b, _] => CellColor::new(*r, *g, *b),
        _ => default,
    }
}

fn parse_emitter_cell(el: &XmlNode) -> EmitterCell {
    EmitterCell {
        birth_rate: attr_f64(el, "birthRate", 0.0),
        lifetime: attr_f64(el, "lifetime", 1.0),
        lifetime_range: attr_f64(el, "lifetimeRange", 0.0),
        velocity: attr_f64(el, "velocity", 0.0),
        velocity_range: attr_f64(el, "velocityRange", 0.0),
        emission_angle: attr_f64(el, "emissionLongitude", 0.0),
        emission_range: attr_f64(el, "emissionRange", 0.0),
        x_acceleration: attr_f64(el, "xAcceleration", 0.0),
        y_acceleration: attr_f64(el, "yAcceleration", 0.0),
        scale: attr_f64(el, "scale", 1.0),
        scale_range: attr_f64(el, "scaleRange", 0.0),
        scale_speed: attr_f64(el, "scaleSpeed", 0.0),
        alpha: attr_f64(el, "alpha", 1.0),
        alpha_range: attr_f64(el, "alphaRange", 0.0),
        alpha_speed: attr_f64(el, "alphaSpeed", 0.0),
        color: parse_cell_color(el, "color", CellColor::white()),
        color_range: CellColor::new(
            attr_f64(el, "redRange", 0.0),
            attr_f64(el, "greenRange", 0.0),
            attr_f64(el, "blueRange", 0.0),
        ),
        color_speed: CellColor::new(
            attr_f64(el, "redSpeed", 0.0),
            attr_f64(el, "greenSpeed", 0.0),
            attr_f64(el, "blueSpeed", 0.0),
        ),
        spin: attr_f64(el, "spin", 0.0),
        spin_range: attr_f64(el, "spinRange", 0.0),
        contents_image: el.attr("contents").map(str::to_string),
    }
}

fn has_matching_image_child(children: &[Layer], contents: &str) -> bool {
    let wanted = normalize_filename(contents);
    children.iter().any(|c| match &c.kind {
        LayerKind::Image(img) => normalize_filename(&img.src) == wanted,
        _ => false,
    })
}

/// A composite group whose inline image matches no child gets an
/// implicit image child so the image stays independently editable
/// without breaking the native XML shape.
fn synthesize_image_child(parent: &Layer, contents: &str, ctx: &mut ParseCtx) -> Layer {
    let stem = normalize_filename(contents);
    let stem = stem.rsplit_once('.').map(|(s, _)| s.to_string()).unwrap_or(stem);

    let mut child = Layer::new(
        format!("{}-contents", parent.id),
        stem,
        LayerKind::Image(ImageLayer {
            src: contents.to_string(),
        }),
    );
    child.size = parent.size;
    child.position = if parent.size.w > 0.0 || parent.size.h > 0.0 {
        parent.size.midpoint()
    } else if let Some(canvas) = ctx.opts.canvas {
        canvas.center()
    } else {
        Vec2::ZERO
    };
    child
}

// ---------------------------------------------------------------------------
// Animations

/// Parse the `animations` section. A `contents` keyframe animation over
/// a sequential image run is intercepted and decoded as video frames
/// rather than stored literally.
fn parse_animations(el: &XmlNode) -> (Vec<Animation>, Option<VideoFrames>) {
    let Some(wrapper) = el.child("animations") else {
        return (Vec::new(), None);
    };

    let mut animations = Vec::new();
    let mut contents_video = None;

    for node in wrapper.children_named("animation") {
        let key_path = node.attr("keyPath").unwrap_or_default();
        if key_path == "contents" {
            let names: Vec<String> = node
                .children_named("CGImage")
                .filter_map(|c| c.attr("src"))
                .map(str::to_string)
                .collect();
            let decoded = video::video_from_contents(
                &names,
                attr_f64(node, "duration", 0.0),
                attr_bool(node, "autoreverses"),
                node.attr("calculationMode")
                    .map(CalculationMode::parse)
                    .unwrap_or_default(),
            );
            if decoded.is_none() {
                tracing::debug!("contents animation is not a frame sequence, skipping");
            }
            contents_video = contents_video.or(decoded);
            continue;
        }

        match parse_animation(node, None) {
            Some(anim) => animations.push(anim),
            None => tracing::debug!(key_path, "unparseable animation, skipping"),
        }
    }

    (animations, contents_video)
}

/// `fallback_key_path` serves transition elements, where the key lives
/// on the enclosing element rather than the animation itself.
fn parse_animation(node: &XmlNode, fallback_key_path: Option<KeyPath>) -> Option<Animation> {
    let key_path = node
        .attr("keyPath")
        .and_then(KeyPath::parse)
        .or(fallback_key_path)?;

    let values: Vec<KeyValue> = node
        .children
        .iter()
        .filter_map(|c| parse_value_element(c))
        .map(|v| decode_value(key_path, v))
        .collect();
    if values.is_empty() {
        return None;
    }

    let mut anim = Animation::new(key_path, values, attr_f64(node, "duration", 1.0));
    anim.begin_seconds = attr_f64(node, "beginTime", 0.0);
    anim.speed = attr_f64(node, "speed", 1.0);
    anim.autoreverses = attr_bool(node, "autoreverses");
    anim.infinite = node
        .attr("repeatCount")
        .map(|s| s.trim().eq_ignore_ascii_case("inf"))
        .unwrap_or(false);
    anim.repeat_duration_seconds = node.attr("repeatDuration").and_then(parse_f64);
    anim.calculation_mode = node
        .attr("calculationMode")
        .map(CalculationMode::parse)
        .unwrap_or_default();
    anim.timing_function = node
        .attr("timingFunction")
        .map(TimingFunction::parse)
        .unwrap_or_default();
    anim.key_times = node.attr("keyTimes").map(|s| {
        s.split_whitespace()
            .filter_map(parse_f64)
            .collect::<Vec<_>>()
    });

    Some(anim)
}

fn parse_value_element(node: &XmlNode) -> Option<KeyValue> {
    match node.name.as_str() {
        "real" | "integer" => node.attr("value").and_then(parse_f64).map(KeyValue::Scalar),
        "CGPoint" => node
            .attr("value")
            .and_then(parse_vec2)
            .map(KeyValue::Point),
        "CGRect" => node
            .attr("value")
            .and_then(parse_bounds)
            .map(KeyValue::Size),
        "CGColor" => node
            .attr("value")
            .and_then(|v| color::parse_components(v).ok())
            .map(KeyValue::Color),
        "array" => Some(KeyValue::Colors(
            node.children_named("CGColor")
                .filter_map(|c| c.attr("value"))
                .filter_map(|v| color::parse_components(v).ok())
                .collect(),
        )),
        _ => None,
    }
}

/// Document values to model values: rotation scalars arrive in radians.
fn decode_value(key_path: KeyPath, value: KeyValue) -> KeyValue {
    match value {
        KeyValue::Scalar(v) if key_path.is_rotation() => {
            KeyValue::Scalar(radians_to_degrees(v))
        }
        other => other,
    }
}

// ---------------------------------------------------------------------------
// States, transitions, parallax

fn parse_states(root_el: &XmlNode) -> CaplayResult<(Vec<String>, StateOverrides)> {
    let Some(states_el) = root_el.child("states") else {
        return Ok((Vec::new(), StateOverrides::new()));
    };

    let mut names = Vec::new();
    let mut overrides = StateOverrides::new();

    for state in states_el.children_named("LKState") {
        let Some(name) = state.attr("name") else {
            continue;
        };
        let mut list = Vec::new();
        if let Some(elements) = state.child("elements") {
            for sv in elements.children_named("LKStateSetValue") {
                if let Some(parsed) = parse_state_set_value(sv) {
                    list.push(parsed);
                }
            }
        }
        names.push(name.to_string());
        overrides.insert(name.to_string(), list);
    }

    Ok((names, overrides))
}

fn parse_state_set_value(el: &XmlNode) -> Option<StateSetValue> {
    let target_id = el.attr("targetId")?.trim_start_matches('#').to_string();
    let key_path = KeyPath::parse(el.attr("keyPath")?)?;
    let value_el = el.child("value")?;

    let raw = match value_el.attr("type")? {
        "integer" | "real" => KeyValue::Scalar(parse_f64(value_el.attr("value")?)?),
        "CGPoint" => KeyValue::Point(parse_vec2(value_el.attr("value")?)?),
        "CGRect" => KeyValue::Size(parse_bounds(value_el.attr("value")?)?),
        "CGColor" => KeyValue::Color(color::parse_components(value_el.attr("value")?).ok()?),
        "array" => KeyValue::Colors(
            value_el
                .children_named("CGColor")
                .filter_map(|c| c.attr("value"))
                .filter_map(|v| color::parse_components(v).ok())
                .collect(),
        ),
        _ => return None,
    };

    Some(StateSetValue {
        target_id,
        key_path,
        value: decode_value(key_path, raw),
    })
}

fn parse_transitions(root_el: &XmlNode) -> CaplayResult<Vec<StateTransition>> {
    let Some(wrapper) = root_el.child("stateTransitions") else {
        return Ok(Vec::new());
    };

    let mut transitions = Vec::new();
    for tr in wrapper.children_named("LKStateTransition") {
        let mut elements = Vec::new();
        if let Some(elements_el) = tr.child("elements") {
            for element in elements_el.children_named("LKStateTransitionElement") {
                let Some(target_id) = element.attr("targetId") else {
                    continue;
                };
                let Some(key_path) = element
                    .attr("key")
                    .or_else(|| element.attr("keyPath"))
                    .and_then(KeyPath::parse)
                else {
                    continue;
                };
                let Some(animation) = element
                    .child("animation")
                    .and_then(|a| parse_animation(a, Some(key_path)))
                else {
                    continue;
                };
                elements.push(TransitionElement {
                    target_id: target_id.trim_start_matches('#').to_string(),
                    key_path,
                    animation,
                });
            }
        }
        transitions.push(StateTransition {
            from_state: tr.attr("fromState").unwrap_or("*").to_string(),
            to_state: tr.attr("toState").unwrap_or("*").to_string(),
            elements,
        });
    }
    Ok(transitions)
}

fn parse_parallax(root_el: &XmlNode) -> CaplayResult<Vec<GyroParallaxEntry>> {
    let Some(groups) = root_el
        .child("style")
        .and_then(|s| s.child("wallpaperParallaxGroups"))
    else {
        return Ok(Vec::new());
    };

    let mut entries = Vec::new();
    for dict in groups.children_named("NSDictionary") {
        let Some(axis) = dict.attr("axis").and_then(ParallaxAxis::parse) else {
            continue;
        };
        let Some(key_path) = dict.attr("keyPath").and_then(KeyPath::parse) else {
            continue;
        };
        entries.push(GyroParallaxEntry {
            axis,
            layer_name: dict.attr("layerName").unwrap_or_default().to_string(),
            key_path,
            map_min_to: attr_f64(dict, "mapMinTo", 0.0),
            map_max_to: attr_f64(dict, "mapMaxTo", 0.0),
            view: dict.attr("view").unwrap_or_default().to_string(),
            title: dict.attr("title").unwrap_or_default().to_string(),
            image: dict.attr("image").unwrap_or_default().to_string(),
        });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(text: &str) -> CamlDocument {
        parse(text, &ParseOptions::default()).unwrap()
    }

    #[test]
    fn nested_layer_round_trips_geometry() {
        let doc = parse_str(
            r#"<caml xmlns="http://www.apple.com/CoreAnimation/1.0">
                <CALayer id="root" name="Root" bounds="0 0 390 844" position="195 422">
                  <sublayers>
                    <CALayer id="child" name="Child" bounds="0 0 100 50" position="40 60" opacity="0.5"/>
                  </sublayers>
                </CALayer>
              </caml>"#,
        );
        assert_eq!(doc.root.id, "root");
        assert_eq!(doc.root.size, Size::new(390.0, 844.0));
        assert_eq!(doc.root.children.len(), 1);
        let child = &doc.root.children[0];
        assert_eq!(child.name, "Child");
        assert_eq!(child.position, Vec2::new(40.0, 60.0));
        assert_eq!(child.opacity, 0.5);
        assert!(matches!(
            child.kind,
            LayerKind::Group {
                display: None,
                contents: None
            }
        ));
    }

    #[test]
    fn rotation_attributes_convert_to_degrees() {
        let doc = parse_str(
            r#"<CALayer id="r" name="R" transform.rotation.z="3.14159265358979"/>"#,
        );
        assert!((doc.root.rotation - 180.0).abs() < 1e-9);
    }

    #[test]
    fn missing_attributes_fall_back_to_defaults() {
        let doc = parse_str(r#"<CALayer id="r"/>"#);
        assert_eq!(doc.root.opacity, 1.0);
        assert_eq!(doc.root.anchor_point, Vec2::new(0.5, 0.5));
        assert_eq!(doc.root.name, "r");
        assert!(doc.state_names.is_empty());
    }

    #[test]
    fn malformed_top_level_xml_is_an_error() {
        assert!(parse("<CALayer id='r'>", &ParseOptions::default()).is_err());
        assert!(parse("not xml at all", &ParseOptions::default()).is_err());
    }

    #[test]
    fn keyframe_animation_parses_typed_values() {
        let doc = parse_str(
            r#"<CALayer id="r">
                <animations>
                  <animation type="CAKeyframeAnimation" keyPath="opacity" duration="2"
                             autoreverses="1" repeatCount="inf" timingFunction="easeIn">
                    <real value="0"/>
                    <real value="1"/>
                  </animation>
                  <animation type="CAKeyframeAnimation" keyPath="position" duration="1">
                    <CGPoint value="0 0"/>
                    <CGPoint value="10 20"/>
                  </animation>
                </animations>
              </CALayer>"#,
        );
        assert_eq!(doc.root.animations.len(), 2);
        let a = &doc.root.animations[0];
        assert_eq!(a.key_path, KeyPath::Opacity);
        assert!(a.autoreverses);
        assert!(a.infinite);
        assert_eq!(a.timing_function, TimingFunction::EaseIn);
        assert_eq!(
            doc.root.animations[1].values[1],
            KeyValue::Point(Vec2::new(10.0, 20.0))
        );
    }

    #[test]
    fn rotation_animation_values_arrive_in_degrees() {
        let doc = parse_str(
            r#"<CALayer id="r">
                <animations>
                  <animation keyPath="transform.rotation.z" duration="1">
                    <real value="0"/>
                    <real value="1.5707963267948966"/>
                  </animation>
                </animations>
              </CALayer>"#,
        );
        let v = doc.root.animations[0].values[1].as_scalar().unwrap();
        assert!((v - 90.0).abs() < 1e-9);
    }

    #[test]
    fn contents_animation_decodes_into_video() {
        let doc = parse_str(
            r#"<CALayer id="v" name="V">
                <animations>
                  <animation keyPath="contents" duration="0.2" calculationMode="discrete">
                    <CGImage src="wave_001.png"/>
                    <CGImage src="wave_002.png"/>
                    <CGImage src="wave_003.png"/>
                    <CGImage src="wave_004.png"/>
                  </animation>
                </animations>
              </CALayer>"#,
        );
        match &doc.root.kind {
            LayerKind::Video(video) => {
                assert_eq!(video.frame_count, 4);
                assert_eq!(video.fps, 20.0);
                assert_eq!(video.frame_prefix, "wave_");
                assert_eq!(video.calculation_mode, CalculationMode::Discrete);
            }
            other => panic!("expected video, got {other:?}"),
        }
        assert!(doc.root.animations.is_empty());
    }

    #[test]
    fn caplay_kind_group_synthesizes_missing_image_child() {
        let doc = parse_str(
            r#"<CALayer id="g" name="G" caplayKind="image" bounds="0 0 200 100"
                        contents="art/Flower.PNG"/>"#,
        );
        assert!(matches!(
            doc.root.kind,
            LayerKind::Group {
                display: Some(DisplayKind::Image),
                ..
            }
        ));
        assert_eq!(doc.root.children.len(), 1);
        let child = &doc.root.children[0];
        assert!(matches!(&child.kind, LayerKind::Image(i) if i.src == "art/Flower.PNG"));
        assert_eq!(child.position, Vec2::new(100.0, 50.0));
    }

    #[test]
    fn existing_image_child_suppresses_synthesis() {
        let doc = parse_str(
            r#"<CALayer id="g" caplayKind="image" contents="art/Flower.png">
                <sublayers>
                  <CALayer id="i" name="flower" contents="flower.png"/>
                </sublayers>
              </CALayer>"#,
        );
        assert_eq!(doc.root.children.len(), 1);
    }

    #[test]
    fn states_and_overrides_are_discovered() {
        let doc = parse_str(
            r#"<CALayer id="root">
                <sublayers><CALayer id="l" name="L" position="100 50"/></sublayers>
                <states>
                  <LKState name="Locked">
                    <elements>
                      <LKStateSetValue targetId="l" keyPath="position.x">
                        <value type="integer" value="10"/>
                      </LKStateSetValue>
                    </elements>
                  </LKState>
                  <LKState name="Unlock"/>
                </states>
              </CALayer>"#,
        );
        assert_eq!(doc.state_names, vec!["Locked", "Unlock"]);
        let locked = &doc.state_overrides["Locked"];
        assert_eq!(locked.len(), 1);
        assert_eq!(locked[0].target_id, "l");
        assert_eq!(locked[0].value, KeyValue::Scalar(10.0));
        assert!(doc.state_overrides["Unlock"].is_empty());
    }

    #[test]
    fn broken_states_section_degrades_to_empty() {
        // The states element is fine XML-wise but carries nothing
        // usable; entries without target or value are skipped, and the
        // overall parse still succeeds.
        let doc = parse_str(
            r#"<CALayer id="root">
                <states>
                  <LKState name="Locked">
                    <elements>
                      <LKStateSetValue keyPath="position.x"/>
                      <LKStateSetValue targetId="l" keyPath="unknown.path">
                        <value type="integer" value="1"/>
                      </LKStateSetValue>
                    </elements>
                  </LKState>
                </states>
              </CALayer>"#,
        );
        assert_eq!(doc.state_names, vec!["Locked"]);
        assert!(doc.state_overrides["Locked"].is_empty());
    }

    #[test]
    fn transitions_parse_with_wildcards() {
        let doc = parse_str(
            r#"<CALayer id="root">
                <stateTransitions>
                  <LKStateTransition fromState="*" toState="Locked">
                    <elements>
                      <LKStateTransitionElement targetId="l" key="opacity">
                        <animation duration="0.5">
                          <real value="0"/>
                          <real value="1"/>
                        </animation>
                      </LKStateTransitionElement>
                    </elements>
                  </LKStateTransition>
                </stateTransitions>
              </CALayer>"#,
        );
        assert_eq!(doc.transitions.len(), 1);
        let tr = &doc.transitions[0];
        assert_eq!(tr.from_state, "*");
        assert_eq!(tr.to_state, "Locked");
        assert_eq!(tr.elements[0].key_path, KeyPath::Opacity);
        assert_eq!(tr.elements[0].animation.duration_seconds, 0.5);
    }

    #[test]
    fn parallax_dictionaries_parse() {
        let doc = parse_str(
            r#"<CALayer id="root">
                <style>
                  <wallpaperParallaxGroups>
                    <NSDictionary axis="x" layerName="Sky" keyPath="position.x"
                                  mapMinTo="-20" mapMaxTo="20" view="lock"
                                  title="Sky drift" image="sky.png"/>
                    <NSDictionary axis="sideways" layerName="Bad" keyPath="position.x"/>
                  </wallpaperParallaxGroups>
                </style>
              </CALayer>"#,
        );
        assert_eq!(doc.parallax.len(), 1);
        let entry = &doc.parallax[0];
        assert_eq!(entry.axis, ParallaxAxis::X);
        assert_eq!(entry.layer_name, "Sky");
        assert_eq!(entry.map_min_to, -20.0);
    }

    #[test]
    fn emitter_layer_parses_cells() {
        let doc = parse_str(
            r#"<CAEmitterLayer id="e" emitterPosition="50 60" emitterSize="10 4"
                               emitterShape="rectangle" emitterMode="outline" renderMode="additive">
                <emitterCells>
                  <CAEmitterCell birthRate="12" lifetime="3" velocity="40" velocityRange="5"
                                 color="1 0.5 0" redRange="0.1" spin="0.5" contents="spark.png"/>
                </emitterCells>
              </CAEmitterLayer>"#,
        );
        match &doc.root.kind {
            LayerKind::Emitter(em) => {
                assert_eq!(em.shape, EmitterShape::Rectangle);
                assert_eq!(em.mode, EmitterMode::Outline);
                assert_eq!(em.render_mode, EmitterRenderMode::Additive);
                assert_eq!(em.cells.len(), 1);
                let cell = &em.cells[0];
                assert_eq!(cell.birth_rate, 12.0);
                assert_eq!(cell.color.g, 0.5);
                assert_eq!(cell.color_range.r, 0.1);
                assert_eq!(cell.contents_image.as_deref(), Some("spark.png"));
            }
            other => panic!("expected emitter, got {other:?}"),
        }
    }
}
