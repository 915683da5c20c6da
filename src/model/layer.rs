use kurbo::Vec2;

use crate::foundation::core::{Color, GradientStop, Size};

/// One node of a wallpaper document's layer tree.
///
/// Base fields are shared by every variant; variant-specific payload
/// lives in [`LayerKind`]. Rotation fields are stored in degrees (the
/// document text carries radians, the codec converts both ways).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Layer {
    pub id: String,
    pub name: String,
    pub position: Vec2,
    pub size: Size,
    pub anchor_point: Vec2, // default (0.5, 0.5)
    pub opacity: f64,       // 0..1
    pub rotation: f64,      // z axis, degrees
    pub rotation_x: f64,
    pub rotation_y: f64,
    pub z_position: f64,
    pub background_color: Option<Color>,
    pub background_opacity: Option<f64>,
    pub corner_radius: f64,
    pub border_color: Option<Color>,
    pub border_width: f64,
    pub masks_to_bounds: bool,
    pub geometry_flipped: bool,
    pub kind: LayerKind,
    pub animations: Vec<Animation>,
    pub children: Vec<Layer>,
}

pub const DEFAULT_ANCHOR: Vec2 = Vec2::new(0.5, 0.5);

impl Layer {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            position: Vec2::ZERO,
            size: Size::default(),
            anchor_point: DEFAULT_ANCHOR,
            opacity: 1.0,
            rotation: 0.0,
            rotation_x: 0.0,
            rotation_y: 0.0,
            z_position: 0.0,
            background_color: None,
            background_opacity: None,
            corner_radius: 0.0,
            border_color: None,
            border_width: 0.0,
            masks_to_bounds: false,
            geometry_flipped: false,
            kind,
            animations: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn group(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(
            id,
            name,
            LayerKind::Group {
                display: None,
                contents: None,
            },
        )
    }

    /// Current value of an animatable key path, read from the layer's
    /// static properties. Returns `None` for key paths the layer cannot
    /// carry (e.g. `colors` on a non-gradient layer).
    pub fn value_for(&self, key_path: KeyPath) -> Option<KeyValue> {
        match key_path {
            KeyPath::Position => Some(KeyValue::Point(self.position)),
            KeyPath::PositionX => Some(KeyValue::Scalar(self.position.x)),
            KeyPath::PositionY => Some(KeyValue::Scalar(self.position.y)),
            KeyPath::Bounds => Some(KeyValue::Size(self.size)),
            KeyPath::RotationX => Some(KeyValue::Scalar(self.rotation_x)),
            KeyPath::RotationY => Some(KeyValue::Scalar(self.rotation_y)),
            KeyPath::RotationZ => Some(KeyValue::Scalar(self.rotation)),
            KeyPath::Opacity => Some(KeyValue::Scalar(self.opacity)),
            KeyPath::BackgroundColor => self.background_color.map(KeyValue::Color),
            KeyPath::Colors => match &self.kind {
                LayerKind::Gradient(g) => Some(KeyValue::Colors(
                    g.stops.iter().map(|s| s.color).collect(),
                )),
                _ => None,
            },
        }
    }

    /// Write a value back through a key path. The inverse of
    /// [`Layer::value_for`]; non-matching value shapes are ignored.
    pub fn set_value(&mut self, key_path: KeyPath, value: &KeyValue) {
        match (key_path, value) {
            (KeyPath::Position, KeyValue::Point(p)) => self.position = *p,
            (KeyPath::PositionX, KeyValue::Scalar(x)) => self.position.x = *x,
            (KeyPath::PositionY, KeyValue::Scalar(y)) => self.position.y = *y,
            (KeyPath::Bounds, KeyValue::Size(s)) => self.size = *s,
            (KeyPath::RotationX, KeyValue::Scalar(d)) => self.rotation_x = *d,
            (KeyPath::RotationY, KeyValue::Scalar(d)) => self.rotation_y = *d,
            (KeyPath::RotationZ, KeyValue::Scalar(d)) => self.rotation = *d,
            (KeyPath::Opacity, KeyValue::Scalar(o)) => self.opacity = o.clamp(0.0, 1.0),
            (KeyPath::BackgroundColor, KeyValue::Color(c)) => self.background_color = Some(*c),
            (KeyPath::Colors, KeyValue::Colors(colors)) => {
                if let LayerKind::Gradient(g) = &mut self.kind {
                    for (stop, color) in g.stops.iter_mut().zip(colors.iter()) {
                        stop.color = *color;
                    }
                }
            }
            _ => {}
        }
    }
}

/// Exhaustive layer variant union. Codec and evaluator both match on
/// this, so adding a variant forces every consumer to handle it.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum LayerKind {
    Group {
        display: Option<DisplayKind>,
        /// Inline image reference kept for native-consumer shape even
        /// after an image child has been synthesized from it.
        contents: Option<String>,
    },
    Image(ImageLayer),
    Text(TextLayer),
    Gradient(GradientLayer),
    Shape(ShapeLayer),
    Video(VideoFrames),
    Emitter(EmitterLayer),
    Transform,
    Replicator(ReplicatorLayer),
}

/// Display-kind tag carried by a structural group (`caplayKind`): the
/// group wraps variant-specific attributes plus a contents image child
/// without losing its native children.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DisplayKind {
    Image,
    Text,
    Gradient,
    Emitter,
}

impl DisplayKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Text => "text",
            Self::Gradient => "gradient",
            Self::Emitter => "emitter",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Some(Self::Image),
            "text" => Some(Self::Text),
            "gradient" => Some(Self::Gradient),
            "emitter" => Some(Self::Emitter),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ImageLayer {
    pub src: String,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TextLayer {
    pub text: String,
    pub font_size: f64,
    pub font_family: String,
    pub color: Option<Color>,
    pub alignment: TextAlignment,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum TextAlignment {
    #[default]
    Natural,
    Left,
    Center,
    Right,
    Justified,
}

impl TextAlignment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Natural => "natural",
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::Justified => "justified",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Self::Left,
            "center" => Self::Center,
            "right" => Self::Right,
            "justified" => Self::Justified,
            _ => Self::Natural,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GradientLayer {
    pub kind: GradientKind,
    pub start_point: Vec2,
    pub end_point: Vec2,
    pub stops: Vec<GradientStop>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum GradientKind {
    #[default]
    Axial,
    Radial,
    Conic,
}

impl GradientKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Axial => "axial",
            Self::Radial => "radial",
            Self::Conic => "conic",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "radial" => Self::Radial,
            "conic" => Self::Conic,
            _ => Self::Axial,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ShapeLayer {
    /// SVG-style path data, carried opaquely.
    pub path: String,
    pub fill_color: Option<Color>,
    pub stroke_color: Option<Color>,
    pub stroke_width: f64,
}

/// Decoded form of a `contents` keyframe animation over sequential
/// image references. The literal frame list is never stored; filenames
/// are regenerated from prefix + zero-padded index + extension.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VideoFrames {
    pub frame_count: u32,
    pub fps: f64,
    pub duration_seconds: f64,
    pub frame_prefix: String,
    pub frame_extension: String,
    pub auto_reverses: bool,
    pub calculation_mode: CalculationMode,
}

impl VideoFrames {
    /// Filename of frame `i`, mirroring the padding the decoder saw.
    pub fn frame_name(&self, i: u32, pad: usize) -> String {
        format!("{}{:0pad$}.{}", self.frame_prefix, i, self.frame_extension)
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReplicatorLayer {
    pub instance_count: u32,
    pub instance_delay_seconds: f64,
    pub instance_rotation: f64, // degrees
    pub instance_translate: Vec2,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EmitterLayer {
    pub emitter_position: Vec2,
    pub emitter_size: Size,
    pub shape: EmitterShape,
    pub mode: EmitterMode,
    pub render_mode: EmitterRenderMode,
    pub cells: Vec<EmitterCell>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum EmitterShape {
    #[default]
    Point,
    Line,
    Rectangle,
}

impl EmitterShape {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::Line => "line",
            Self::Rectangle => "rectangle",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "line" => Self::Line,
            "rectangle" => Self::Rectangle,
            _ => Self::Point,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum EmitterMode {
    #[default]
    Volume,
    Outline,
}

impl EmitterMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Volume => "volume",
            Self::Outline => "outline",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "outline" => Self::Outline,
            _ => Self::Volume,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum EmitterRenderMode {
    #[default]
    Unordered,
    Additive,
}

impl EmitterRenderMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unordered => "unordered",
            Self::Additive => "additive",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "additive" => Self::Additive,
            _ => Self::Unordered,
        }
    }
}

/// Unit-range RGB triple used by emitter cell tinting.
#[derive(Clone, Copy, Debug, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct CellColor {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl CellColor {
    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    pub fn white() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }
}

/// Spawn-parameter specification for one particle species.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EmitterCell {
    pub birth_rate: f64, // particles per second
    pub lifetime: f64,   // seconds
    pub lifetime_range: f64,
    pub velocity: f64, // points per second
    pub velocity_range: f64,
    pub emission_angle: f64, // radians
    pub emission_range: f64,
    pub x_acceleration: f64,
    pub y_acceleration: f64,
    pub scale: f64,
    pub scale_range: f64,
    pub scale_speed: f64,
    pub alpha: f64,
    pub alpha_range: f64,
    pub alpha_speed: f64,
    pub color: CellColor,
    pub color_range: CellColor,
    pub color_speed: CellColor,
    pub spin: f64, // radians per second
    pub spin_range: f64,
    pub contents_image: Option<String>,
}

impl Default for EmitterCell {
    fn default() -> Self {
        Self {
            birth_rate: 0.0,
            lifetime: 1.0,
            lifetime_range: 0.0,
            velocity: 0.0,
            velocity_range: 0.0,
            emission_angle: 0.0,
            emission_range: 0.0,
            x_acceleration: 0.0,
            y_acceleration: 0.0,
            scale: 1.0,
            scale_range: 0.0,
            scale_speed: 0.0,
            alpha: 1.0,
            alpha_range: 0.0,
            alpha_speed: 0.0,
            color: CellColor::white(),
            color_range: CellColor::default(),
            color_speed: CellColor::default(),
            spin: 0.0,
            spin_range: 0.0,
            contents_image: None,
        }
    }
}

/// Which layer property a keyframe animation or state override targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum KeyPath {
    Position,
    PositionX,
    PositionY,
    Bounds,
    RotationX,
    RotationY,
    RotationZ,
    Opacity,
    Colors,
    BackgroundColor,
}

impl KeyPath {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::PositionX => "position.x",
            Self::PositionY => "position.y",
            Self::Bounds => "bounds",
            Self::RotationX => "transform.rotation.x",
            Self::RotationY => "transform.rotation.y",
            Self::RotationZ => "transform.rotation.z",
            Self::Opacity => "opacity",
            Self::Colors => "colors",
            Self::BackgroundColor => "backgroundColor",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "position" => Some(Self::Position),
            "position.x" => Some(Self::PositionX),
            "position.y" => Some(Self::PositionY),
            "bounds" => Some(Self::Bounds),
            "transform.rotation.x" => Some(Self::RotationX),
            "transform.rotation.y" => Some(Self::RotationY),
            "transform.rotation.z" | "transform.rotation" => Some(Self::RotationZ),
            "opacity" => Some(Self::Opacity),
            "colors" => Some(Self::Colors),
            "backgroundColor" => Some(Self::BackgroundColor),
            _ => None,
        }
    }

    /// Rotation key paths store degrees in the model but radians in the
    /// document text.
    pub fn is_rotation(self) -> bool {
        matches!(self, Self::RotationX | Self::RotationY | Self::RotationZ)
    }

    /// `position.x`/`position.y` round to whole points on serialize.
    pub fn rounds_to_integer(self) -> bool {
        matches!(self, Self::PositionX | Self::PositionY)
    }
}

/// One keyframe (or override) value, typed per key path.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum KeyValue {
    Scalar(f64),
    Point(Vec2),
    Size(Size),
    Color(Color),
    Colors(Vec<Color>),
}

impl KeyValue {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Scalar(_))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum CalculationMode {
    #[default]
    Linear,
    Discrete,
}

impl CalculationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Discrete => "discrete",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "discrete" => Self::Discrete,
            _ => Self::Linear,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum TimingFunction {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInEaseOut,
}

impl TimingFunction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::EaseIn => "easeIn",
            Self::EaseOut => "easeOut",
            Self::EaseInEaseOut => "easeInEaseOut",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "easeIn" => Self::EaseIn,
            "easeOut" => Self::EaseOut,
            "easeInEaseOut" => Self::EaseInEaseOut,
            _ => Self::Linear,
        }
    }
}

/// A keyframe animation over one key path.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Animation {
    pub key_path: KeyPath,
    pub values: Vec<KeyValue>, // N >= 1
    pub duration_seconds: f64,
    pub begin_seconds: f64, // delay before the first cycle
    pub speed: f64,
    pub autoreverses: bool,
    pub infinite: bool,
    pub repeat_duration_seconds: Option<f64>,
    pub calculation_mode: CalculationMode,
    pub timing_function: TimingFunction,
    pub key_times: Option<Vec<f64>>,
}

impl Animation {
    pub fn new(key_path: KeyPath, values: Vec<KeyValue>, duration_seconds: f64) -> Self {
        Self {
            key_path,
            values,
            duration_seconds,
            begin_seconds: 0.0,
            speed: 1.0,
            autoreverses: false,
            infinite: false,
            repeat_duration_seconds: None,
            calculation_mode: CalculationMode::Linear,
            timing_function: TimingFunction::Linear,
            key_times: None,
        }
    }

    /// Length of one playback cycle: the authored duration, doubled
    /// when the animation reverses back to its start.
    pub fn cycle_seconds(&self) -> f64 {
        if self.autoreverses {
            self.duration_seconds * 2.0
        } else {
            self.duration_seconds
        }
    }
}
