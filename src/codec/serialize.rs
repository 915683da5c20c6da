//! Document model to CAML text.
//!
//! Mirror of parsing: degrees back to radians, hex colors back to
//! float components, positions rounded to whole points. The full
//! per-state override table is completed (backfilled and pruned of
//! dead targets) before any state node is written, so no state's
//! output depends on the order states are visited in. A document with
//! no declared states gets the default `Locked/Unlock/Sleep` set plus
//! wildcard transitions in both directions for each.

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};

use crate::codec::{CAML_NAMESPACE, color, fmt_scalar, video};
use crate::foundation::error::{CaplayError, CaplayResult};
use crate::foundation::math::degrees_to_radians;
use crate::model::document::{
    CamlDocument, DEFAULT_STATE_NAMES, GyroParallaxEntry, StateOverrides, StateTransition,
    backfill_overrides,
};
use crate::model::layer::{
    Animation, CalculationMode, CellColor, DEFAULT_ANCHOR, EmitterCell, EmitterMode,
    EmitterRenderMode, EmitterShape, GradientKind, KeyPath, KeyValue, Layer, LayerKind,
    TextAlignment, TimingFunction,
};

/// Serialize a document back to CAML text.
#[tracing::instrument(skip_all)]
pub fn serialize(doc: &CamlDocument) -> CaplayResult<String> {
    let (state_names, synthesized) = if doc.state_names.is_empty() {
        let names: Vec<String> = DEFAULT_STATE_NAMES.iter().map(|s| s.to_string()).collect();
        let transitions = default_transitions(&names);
        (names, Some(transitions))
    } else {
        (doc.state_names.clone(), None)
    };
    let transitions = synthesized.as_deref().unwrap_or(&doc.transitions);

    // Complete the table for every state before a single state node is
    // built; overrides whose target no longer resolves are dropped
    // here rather than emitted.
    let overrides = backfill_overrides(&doc.state_overrides, &state_names, &doc.root);

    let mut w = Xml::new();
    let mut caml = BytesStart::new("caml");
    caml.push_attribute(("xmlns", CAML_NAMESPACE));
    w.start(caml)?;
    write_layer(
        &mut w,
        &doc.root,
        Some(&Sections {
            state_names: &state_names,
            overrides: &overrides,
            transitions,
            parallax: &doc.parallax,
        }),
    )?;
    w.end("caml")?;
    w.finish()
}

/// Root-only document sections, written inside the root layer element.
struct Sections<'a> {
    state_names: &'a [String],
    overrides: &'a StateOverrides,
    transitions: &'a [StateTransition],
    parallax: &'a [GyroParallaxEntry],
}

fn default_transitions(state_names: &[String]) -> Vec<StateTransition> {
    let mut out = Vec::new();
    for name in state_names {
        out.push(StateTransition {
            from_state: "*".to_string(),
            to_state: name.clone(),
            elements: Vec::new(),
        });
        out.push(StateTransition {
            from_state: name.clone(),
            to_state: "*".to_string(),
            elements: Vec::new(),
        });
    }
    out
}

// ---------------------------------------------------------------------------
// Layers

fn element_name(kind: &LayerKind) -> &'static str {
    match kind {
        LayerKind::Group { .. }
        | LayerKind::Image(_)
        | LayerKind::Shape(_)
        | LayerKind::Video(_) => "CALayer",
        LayerKind::Text(_) => "CATextLayer",
        LayerKind::Gradient(_) => "CAGradientLayer",
        LayerKind::Emitter(_) => "CAEmitterLayer",
        LayerKind::Transform => "CATransformLayer",
        LayerKind::Replicator(_) => "CAReplicatorLayer",
    }
}

fn write_layer(w: &mut Xml, layer: &Layer, sections: Option<&Sections<'_>>) -> CaplayResult<()> {
    let name = element_name(&layer.kind);
    let mut el = BytesStart::new(name);
    push_base_attrs(&mut el, layer);
    push_kind_attrs(&mut el, &layer.kind);

    let video_contents = match &layer.kind {
        LayerKind::Video(v) if v.frame_count > 0 => Some(video::contents_names(v)),
        _ => None,
    };
    let has_children = !layer.children.is_empty()
        || !layer.animations.is_empty()
        || video_contents.is_some()
        || needs_kind_children(&layer.kind)
        || sections.is_some();

    if !has_children {
        return w.empty(el);
    }
    w.start(el)?;

    write_kind_children(w, &layer.kind)?;

    if !layer.animations.is_empty() || video_contents.is_some() {
        w.start(BytesStart::new("animations"))?;
        if let (Some(names), LayerKind::Video(v)) = (&video_contents, &layer.kind) {
            write_contents_animation(w, names, v.duration_seconds, v.auto_reverses, v.calculation_mode)?;
        }
        for anim in &layer.animations {
            write_animation(w, anim, true)?;
        }
        w.end("animations")?;
    }

    if !layer.children.is_empty() {
        w.start(BytesStart::new("sublayers"))?;
        for child in &layer.children {
            write_layer(w, child, None)?;
        }
        w.end("sublayers")?;
    }

    if let Some(sections) = sections {
        write_states(w, sections)?;
        write_transitions(w, sections.transitions)?;
        write_parallax(w, sections.parallax)?;
    }

    w.end(name)
}

fn push_base_attrs(el: &mut BytesStart<'_>, layer: &Layer) {
    el.push_attribute(("id", layer.id.as_str()));
    el.push_attribute(("name", layer.name.as_str()));
    el.push_attribute((
        "bounds",
        format!("0 0 {} {}", fmt_scalar(layer.size.w), fmt_scalar(layer.size.h)).as_str(),
    ));
    el.push_attribute(("position", point_text(layer.position.x, layer.position.y).as_str()));
    if layer.anchor_point != DEFAULT_ANCHOR {
        el.push_attribute((
            "anchorPoint",
            format!(
                "{} {}",
                fmt_scalar(layer.anchor_point.x),
                fmt_scalar(layer.anchor_point.y)
            )
            .as_str(),
        ));
    }
    if layer.opacity != 1.0 {
        el.push_attribute(("opacity", fmt_scalar(layer.opacity).as_str()));
    }
    if layer.rotation != 0.0 {
        el.push_attribute((
            "transform.rotation.z",
            fmt_scalar(degrees_to_radians(layer.rotation)).as_str(),
        ));
    }
    if layer.rotation_x != 0.0 {
        el.push_attribute((
            "transform.rotation.x",
            fmt_scalar(degrees_to_radians(layer.rotation_x)).as_str(),
        ));
    }
    if layer.rotation_y != 0.0 {
        el.push_attribute((
            "transform.rotation.y",
            fmt_scalar(degrees_to_radians(layer.rotation_y)).as_str(),
        ));
    }
    if layer.z_position != 0.0 {
        el.push_attribute(("zPosition", fmt_scalar(layer.z_position).as_str()));
    }
    if let Some(bg) = layer.background_color {
        el.push_attribute(("backgroundColor", color::write_components(bg).as_str()));
    }
    if let Some(bg_opacity) = layer.background_opacity {
        el.push_attribute(("backgroundColorOpacity", fmt_scalar(bg_opacity).as_str()));
    }
    if layer.corner_radius != 0.0 {
        el.push_attribute(("cornerRadius", fmt_scalar(layer.corner_radius).as_str()));
    }
    if let Some(border) = layer.border_color {
        el.push_attribute(("borderColor", color::write_components(border).as_str()));
    }
    if layer.border_width != 0.0 {
        el.push_attribute(("borderWidth", fmt_scalar(layer.border_width).as_str()));
    }
    if layer.masks_to_bounds {
        el.push_attribute(("masksToBounds", "1"));
    }
    if layer.geometry_flipped {
        el.push_attribute(("geometryFlipped", "1"));
    }
}

fn push_kind_attrs(el: &mut BytesStart<'_>, kind: &LayerKind) {
    match kind {
        LayerKind::Group { display, contents } => {
            if let Some(display) = display {
                el.push_attribute(("caplayKind", display.as_str()));
            }
            if let Some(contents) = contents {
                el.push_attribute(("contents", contents.as_str()));
            }
        }
        LayerKind::Image(img) => el.push_attribute(("contents", img.src.as_str())),
        LayerKind::Text(text) => {
            el.push_attribute(("string", text.text.as_str()));
            el.push_attribute(("fontSize", fmt_scalar(text.font_size).as_str()));
            el.push_attribute(("fontFamily", text.font_family.as_str()));
            if let Some(fg) = text.color {
                el.push_attribute(("foregroundColor", color::write_components(fg).as_str()));
            }
            if text.alignment != TextAlignment::Natural {
                el.push_attribute(("alignmentMode", text.alignment.as_str()));
            }
        }
        LayerKind::Gradient(g) => {
            if g.kind != GradientKind::Axial {
                el.push_attribute(("type", g.kind.as_str()));
            }
            el.push_attribute((
                "startPoint",
                format!("{} {}", fmt_scalar(g.start_point.x), fmt_scalar(g.start_point.y))
                    .as_str(),
            ));
            el.push_attribute((
                "endPoint",
                format!("{} {}", fmt_scalar(g.end_point.x), fmt_scalar(g.end_point.y)).as_str(),
            ));
            if !g.stops.is_empty() {
                let locations: Vec<String> =
                    g.stops.iter().map(|s| fmt_scalar(s.location)).collect();
                el.push_attribute(("locations", locations.join(" ").as_str()));
            }
        }
        LayerKind::Shape(shape) => {
            el.push_attribute(("path", shape.path.as_str()));
            if let Some(fill) = shape.fill_color {
                el.push_attribute(("fillColor", color::write_components(fill).as_str()));
            }
            if let Some(stroke) = shape.stroke_color {
                el.push_attribute(("strokeColor", color::write_components(stroke).as_str()));
            }
            if shape.stroke_width != 0.0 {
                el.push_attribute(("strokeWidth", fmt_scalar(shape.stroke_width).as_str()));
            }
        }
        LayerKind::Video(v) => {
            el.push_attribute(("caplayFrameCount", v.frame_count.to_string().as_str()));
            el.push_attribute(("caplayFPS", fmt_scalar(v.fps).as_str()));
            el.push_attribute(("caplayDuration", fmt_scalar(v.duration_seconds).as_str()));
            el.push_attribute(("caplayFramePrefix", v.frame_prefix.as_str()));
            el.push_attribute(("caplayFrameExtension", v.frame_extension.as_str()));
            if v.auto_reverses {
                el.push_attribute(("caplayAutoReverses", "1"));
            }
            if v.calculation_mode != CalculationMode::Linear {
                el.push_attribute(("caplayCalculationMode", v.calculation_mode.as_str()));
            }
        }
        LayerKind::Emitter(em) => {
            el.push_attribute((
                "emitterPosition",
                point_text(em.emitter_position.x, em.emitter_position.y).as_str(),
            ));
            el.push_attribute((
                "emitterSize",
                format!("{} {}", fmt_scalar(em.emitter_size.w), fmt_scalar(em.emitter_size.h))
                    .as_str(),
            ));
            if em.shape != EmitterShape::Point {
                el.push_attribute(("emitterShape", em.shape.as_str()));
            }
            if em.mode != EmitterMode::Volume {
                el.push_attribute(("emitterMode", em.mode.as_str()));
            }
            if em.render_mode != EmitterRenderMode::Unordered {
                el.push_attribute(("renderMode", em.render_mode.as_str()));
            }
        }
        LayerKind::Transform => {}
        LayerKind::Replicator(rep) => {
            el.push_attribute(("instanceCount", rep.instance_count.to_string().as_str()));
            if rep.instance_delay_seconds != 0.0 {
                el.push_attribute((
                    "instanceDelay",
                    fmt_scalar(rep.instance_delay_seconds).as_str(),
                ));
            }
            if rep.instance_rotation != 0.0 {
                el.push_attribute((
                    "instanceRotation",
                    fmt_scalar(degrees_to_radians(rep.instance_rotation)).as_str(),
                ));
            }
            if rep.instance_translate.x != 0.0 || rep.instance_translate.y != 0.0 {
                el.push_attribute((
                    "instanceTranslate",
                    format!(
                        "{} {}",
                        fmt_scalar(rep.instance_translate.x),
                        fmt_scalar(rep.instance_translate.y)
                    )
                    .as_str(),
                ));
            }
        }
    }
}

fn needs_kind_children(kind: &LayerKind) -> bool {
    match kind {
        LayerKind::Gradient(g) => !g.stops.is_empty(),
        LayerKind::Emitter(em) => !em.cells.is_empty(),
        _ => false,
    }
}

fn write_kind_children(w: &mut Xml, kind: &LayerKind) -> CaplayResult<()> {
    match kind {
        LayerKind::Gradient(g) if !g.stops.is_empty() => {
            w.start(BytesStart::new("colors"))?;
            for stop in &g.stops {
                let mut el = BytesStart::new("CGColor");
                el.push_attribute(("value", color::write_components(stop.color).as_str()));
                w.empty(el)?;
            }
            w.end("colors")
        }
        LayerKind::Emitter(em) if !em.cells.is_empty() => {
            w.start(BytesStart::new("emitterCells"))?;
            for cell in &em.cells {
                write_emitter_cell(w, cell)?;
            }
            w.end("emitterCells")
        }
        _ => Ok(()),
    }
}

fn write_emitter_cell(w: &mut Xml, cell: &EmitterCell) -> CaplayResult<()> {
    let mut el = BytesStart::new("CAEmitterCell");
    el.push_attribute(("birthRate", fmt_scalar(cell.birth_rate).as_str()));
    el.push_attribute(("lifetime", fmt_scalar(cell.lifetime).as_str()));
    let mut opt = |name: &str, v: f64, default: f64| {
        if v != default {
            el.push_attribute((name, fmt_scalar(v).as_str()));
        }
    };
    opt("lifetimeRange", cell.lifetime_range, 0.0);
    opt("velocity", cell.velocity, 0.0);
    opt("velocityRange", cell.velocity_range, 0.0);
    opt("emissionLongitude", cell.emission_angle, 0.0);
    opt("emissionRange", cell.emission_range, 0.0);
    opt("xAcceleration", cell.x_acceleration, 0.0);
    opt("yAcceleration", cell.y_acceleration, 0.0);
    opt("scale", cell.scale, 1.0);
    opt("scaleRange", cell.scale_range, 0.0);
    opt("scaleSpeed", cell.scale_speed, 0.0);
    opt("alpha", cell.alpha, 1.0);
    opt("alphaRange", cell.alpha_range, 0.0);
    opt("alphaSpeed", cell.alpha_speed, 0.0);
    if cell.color != CellColor::white() {
        el.push_attribute(("color", cell_color_text(cell.color).as_str()));
    }
    let mut opt = |name: &str, v: f64| {
        if v != 0.0 {
            el.push_attribute((name, fmt_scalar(v).as_str()));
        }
    };
    opt("redRange", cell.color_range.r);
    opt("greenRange", cell.color_range.g);
    opt("blueRange", cell.color_range.b);
    opt("redSpeed", cell.color_speed.r);
    opt("greenSpeed", cell.color_speed.g);
    opt("blueSpeed", cell.color_speed.b);
    opt("spin", cell.spin);
    opt("spinRange", cell.spin_range);
    if let Some(image) = &cell.contents_image {
        el.push_attribute(("contents", image.as_str()));
    }
    w.empty(el)
}

fn cell_color_text(c: CellColor) -> String {
    format!("{} {} {}", fmt_scalar(c.r), fmt_scalar(c.g), fmt_scalar(c.b))
}

// ---------------------------------------------------------------------------
// Animations

fn write_contents_animation(
    w: &mut Xml,
    names: &[String],
    duration_seconds: f64,
    auto_reverses: bool,
    calculation_mode: CalculationMode,
) -> CaplayResult<()> {
    let mut el = BytesStart::new("animation");
    el.push_attribute(("type", "CAKeyframeAnimation"));
    el.push_attribute(("keyPath", "contents"));
    el.push_attribute(("duration", fmt_scalar(duration_seconds).as_str()));
    el.push_attribute(("repeatCount", "inf"));
    if auto_reverses {
        el.push_attribute(("autoreverses", "1"));
    }
    if calculation_mode != CalculationMode::Linear {
        el.push_attribute(("calculationMode", calculation_mode.as_str()));
    }
    w.start(el)?;
    for name in names {
        let mut frame = BytesStart::new("CGImage");
        frame.push_attribute(("src", name.as_str()));
        w.empty(frame)?;
    }
    w.end("animation")
}

fn write_animation(w: &mut Xml, anim: &Animation, with_key_path: bool) -> CaplayResult<()> {
    let mut el = BytesStart::new("animation");
    el.push_attribute(("type", "CAKeyframeAnimation"));
    if with_key_path {
        el.push_attribute(("keyPath", anim.key_path.as_str()));
    }
    el.push_attribute(("duration", fmt_scalar(anim.duration_seconds).as_str()));
    if anim.begin_seconds != 0.0 {
        el.push_attribute(("beginTime", fmt_scalar(anim.begin_seconds).as_str()));
    }
    if anim.speed != 1.0 {
        el.push_attribute(("speed", fmt_scalar(anim.speed).as_str()));
    }
    if anim.autoreverses {
        el.push_attribute(("autoreverses", "1"));
    }
    if anim.infinite {
        el.push_attribute(("repeatCount", "inf"));
    }
    if let Some(bound) = anim.repeat_duration_seconds {
        el.push_attribute(("repeatDuration", fmt_scalar(bound).as_str()));
    }
    if anim.calculation_mode != CalculationMode::Linear {
        el.push_attribute(("calculationMode", anim.calculation_mode.as_str()));
    }
    if anim.timing_function != TimingFunction::Linear {
        el.push_attribute(("timingFunction", anim.timing_function.as_str()));
    }
    if let Some(key_times) = &anim.key_times {
        let joined: Vec<String> = key_times.iter().map(|t| fmt_scalar(*t)).collect();
        el.push_attribute(("keyTimes", joined.join(" ").as_str()));
    }

    w.start(el)?;
    for value in &anim.values {
        write_typed_value(w, anim.key_path, value)?;
    }
    w.end("animation")
}

/// Typed animation value child: `<real/>`, `<CGPoint/>`, `<CGRect/>`,
/// `<CGColor/>`, or `<array>` of colors.
fn write_typed_value(w: &mut Xml, key_path: KeyPath, value: &KeyValue) -> CaplayResult<()> {
    match encode_value(key_path, value) {
        Encoded::Attr { type_name, value } => {
            let mut el = BytesStart::new(type_name);
            el.push_attribute(("value", value.as_str()));
            w.empty(el)
        }
        Encoded::ColorList(colors) => {
            w.start(BytesStart::new("array"))?;
            for c in colors {
                let mut el = BytesStart::new("CGColor");
                el.push_attribute(("value", c.as_str()));
                w.empty(el)?;
            }
            w.end("array")
        }
    }
}

enum Encoded {
    Attr {
        type_name: &'static str,
        value: String,
    },
    ColorList(Vec<String>),
}

/// Model values to document values. Rotation scalars leave in radians;
/// `position.x`/`position.y` round to whole points while every other
/// numeric key path keeps its float precision.
fn encode_value(key_path: KeyPath, value: &KeyValue) -> Encoded {
    match value {
        KeyValue::Scalar(v) => {
            if key_path.rounds_to_integer() {
                Encoded::Attr {
                    type_name: "integer",
                    value: format!("{}", v.round() as i64),
                }
            } else {
                let v = if key_path.is_rotation() {
                    degrees_to_radians(*v)
                } else {
                    *v
                };
                Encoded::Attr {
                    type_name: "real",
                    value: fmt_scalar(v),
                }
            }
        }
        KeyValue::Point(p) => Encoded::Attr {
            type_name: "CGPoint",
            value: point_text(p.x, p.y),
        },
        KeyValue::Size(s) => Encoded::Attr {
            type_name: "CGRect",
            value: format!("0 0 {} {}", fmt_scalar(s.w), fmt_scalar(s.h)),
        },
        KeyValue::Color(c) => Encoded::Attr {
            type_name: "CGColor",
            value: color::write_components(*c),
        },
        KeyValue::Colors(colors) => {
            Encoded::ColorList(colors.iter().map(|c| color::write_components(*c)).collect())
        }
    }
}

fn point_text(x: f64, y: f64) -> String {
    format!("{} {}", x.round() as i64, y.round() as i64)
}

// ---------------------------------------------------------------------------
// States, transitions, parallax

fn write_states(w: &mut Xml, sections: &Sections<'_>) -> CaplayResult<()> {
    w.start(BytesStart::new("states"))?;
    for name in sections.state_names {
        let list = sections
            .overrides
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let mut state = BytesStart::new("LKState");
        state.push_attribute(("name", name.as_str()));
        if list.is_empty() {
            w.empty(state)?;
            continue;
        }
        w.start(state)?;
        w.start(BytesStart::new("elements"))?;
        for sv in list {
            let mut el = BytesStart::new("LKStateSetValue");
            el.push_attribute(("targetId", sv.target_id.as_str()));
            el.push_attribute(("keyPath", sv.key_path.as_str()));
            w.start(el)?;
            match encode_value(sv.key_path, &sv.value) {
                Encoded::Attr { type_name, value } => {
                    let mut v = BytesStart::new("value");
                    v.push_attribute(("type", type_name));
                    v.push_attribute(("value", value.as_str()));
                    w.empty(v)?;
                }
                Encoded::ColorList(colors) => {
                    let mut v = BytesStart::new("value");
                    v.push_attribute(("type", "array"));
                    w.start(v)?;
                    for c in colors {
                        let mut color_el = BytesStart::new("CGColor");
                        color_el.push_attribute(("value", c.as_str()));
                        w.empty(color_el)?;
                    }
                    w.end("value")?;
                }
            }
            w.end("LKStateSetValue")?;
        }
        w.end("elements")?;
        w.end("LKState")?;
    }
    w.end("states")
}

fn write_transitions(w: &mut Xml, transitions: &[StateTransition]) -> CaplayResult<()> {
    if transitions.is_empty() {
        return Ok(());
    }
    w.start(BytesStart::new("stateTransitions"))?;
    for tr in transitions {
        let mut el = BytesStart::new("LKStateTransition");
        el.push_attribute(("fromState", tr.from_state.as_str()));
        el.push_attribute(("toState", tr.to_state.as_str()));
        if tr.elements.is_empty() {
            w.empty(el)?;
            continue;
        }
        w.start(el)?;
        w.start(BytesStart::new("elements"))?;
        for element in &tr.elements {
            let mut te = BytesStart::new("LKStateTransitionElement");
            te.push_attribute(("targetId", element.target_id.as_str()));
            te.push_attribute(("key", element.key_path.as_str()));
            w.start(te)?;
            write_animation(w, &element.animation, false)?;
            w.end("LKStateTransitionElement")?;
        }
        w.end("elements")?;
        w.end("LKStateTransition")?;
    }
    w.end("stateTransitions")
}

fn write_parallax(w: &mut Xml, parallax: &[GyroParallaxEntry]) -> CaplayResult<()> {
    if parallax.is_empty() {
        return Ok(());
    }
    w.start(BytesStart::new("style"))?;
    w.start(BytesStart::new("wallpaperParallaxGroups"))?;
    for entry in parallax {
        let mut el = BytesStart::new("NSDictionary");
        el.push_attribute(("axis", entry.axis.as_str()));
        el.push_attribute(("layerName", entry.layer_name.as_str()));
        el.push_attribute(("keyPath", entry.key_path.as_str()));
        el.push_attribute(("mapMinTo", fmt_scalar(entry.map_min_to).as_str()));
        el.push_attribute(("mapMaxTo", fmt_scalar(entry.map_max_to).as_str()));
        el.push_attribute(("view", entry.view.as_str()));
        el.push_attribute(("title", entry.title.as_str()));
        el.push_attribute(("image", entry.image.as_str()));
        w.empty(el)?;
    }
    w.end("wallpaperParallaxGroups")?;
    w.end("style")
}

// ---------------------------------------------------------------------------
// Writer plumbing

struct Xml {
    writer: Writer<Vec<u8>>,
}

impl Xml {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn start(&mut self, el: BytesStart<'_>) -> CaplayResult<()> {
        self.writer
            .write_event(Event::Start(el))
            .map_err(|e| CaplayError::codec(format!("xml write: {e}")))
    }

    fn empty(&mut self, el: BytesStart<'_>) -> CaplayResult<()> {
        self.writer
            .write_event(Event::Empty(el))
            .map_err(|e| CaplayError::codec(format!("xml write: {e}")))
    }

    fn end(&mut self, name: &str) -> CaplayResult<()> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(|e| CaplayError::codec(format!("xml write: {e}")))
    }

    fn finish(self) -> CaplayResult<String> {
        String::from_utf8(self.writer.into_inner())
            .map_err(|e| CaplayError::codec(format!("non-utf8 output: {e}")))
    }
}
