use std::collections::HashMap;

use crate::foundation::error::{CastError, CastResult};

/// Lottie schema version written into every document.
pub const LOTTIE_VERSION: &str = "5.7.4";

/// Root of the keyframed animation document (Lottie JSON).
///
/// Field names are Rust-side; the serialized keys are the short Lottie keys.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnimationDocument {
    #[serde(rename = "v")]
    pub version: String,
    /// Ticks per second.
    #[serde(rename = "fr")]
    pub frame_rate: u32,
    /// Always 0 for generated documents.
    #[serde(rename = "ip")]
    pub in_tick: f64,
    /// Total duration in ticks.
    #[serde(rename = "op")]
    pub out_tick: f64,
    #[serde(rename = "w")]
    pub width: u32,
    #[serde(rename = "h")]
    pub height: u32,
    #[serde(rename = "nm")]
    pub name: String,
    #[serde(rename = "ddd", default)]
    pub three_d: u8,
    #[serde(default)]
    pub assets: Vec<Asset>,
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub markers: Vec<Marker>,
}

/// An embedded still image.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Asset {
    pub id: String,
    #[serde(rename = "w")]
    pub width: u32,
    #[serde(rename = "h")]
    pub height: u32,
    /// Directory prefix; empty for embedded assets.
    #[serde(rename = "u", default)]
    pub dir: String,
    /// `data:` URI for embedded assets.
    #[serde(rename = "p")]
    pub payload: String,
    /// 1 when `payload` is embedded.
    #[serde(rename = "e", default)]
    pub embedded: u8,
}

impl Asset {
    pub fn embedded(id: impl Into<String>, width: u32, height: u32, data_uri: String) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            dir: String::new(),
            payload: data_uri,
            embedded: 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum LayerType {
    Image,
    Shape,
}

impl From<LayerType> for u8 {
    fn from(value: LayerType) -> Self {
        match value {
            LayerType::Image => 2,
            LayerType::Shape => 4,
        }
    }
}

impl TryFrom<u8> for LayerType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Self::Image),
            4 => Ok(Self::Shape),
            other => Err(format!("unsupported layer type {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Layer {
    #[serde(rename = "ddd", default)]
    pub three_d: u8,
    #[serde(rename = "ind")]
    pub index: u32,
    #[serde(rename = "ty")]
    pub layer_type: LayerType,
    #[serde(rename = "nm")]
    pub name: String,
    #[serde(rename = "refId", default, skip_serializing_if = "Option::is_none")]
    pub asset_ref: Option<String>,
    #[serde(rename = "sr", default = "one")]
    pub stretch: f64,
    #[serde(rename = "ks")]
    pub transform: Transform,
    #[serde(rename = "ao", default)]
    pub auto_orient: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shapes: Option<Vec<ShapeItem>>,
    #[serde(rename = "ip")]
    pub start_tick: f64,
    #[serde(rename = "op")]
    pub end_tick: f64,
    #[serde(rename = "st", default)]
    pub start_time: f64,
    #[serde(rename = "bm", default)]
    pub blend_mode: u8,
}

fn one() -> f64 {
    1.0
}

impl Layer {
    pub fn image(index: u32, name: String, asset_ref: String, transform: Transform) -> Self {
        Self {
            three_d: 0,
            index,
            layer_type: LayerType::Image,
            name,
            asset_ref: Some(asset_ref),
            stretch: 1.0,
            transform,
            auto_orient: 0,
            shapes: None,
            start_tick: 0.0,
            end_tick: 0.0,
            start_time: 0.0,
            blend_mode: 0,
        }
    }

    pub fn shape(index: u32, name: String, shapes: Vec<ShapeItem>, transform: Transform) -> Self {
        Self {
            layer_type: LayerType::Shape,
            asset_ref: None,
            shapes: Some(shapes),
            ..Self::image(index, name, String::new(), transform)
        }
    }

    pub fn spanning(mut self, start_tick: f64, end_tick: f64) -> Self {
        self.start_tick = start_tick;
        self.end_tick = end_tick;
        self
    }
}

/// Layer transform (`ks`).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Transform {
    #[serde(rename = "o")]
    pub opacity: Property,
    #[serde(rename = "r")]
    pub rotation: Property,
    #[serde(rename = "p")]
    pub position: Property,
    #[serde(rename = "a")]
    pub anchor: Property,
    #[serde(rename = "s")]
    pub scale: Property,
}

impl Transform {
    /// Static transform placing the layer's `anchor` at `position`.
    pub fn at(position: [f64; 2], anchor: [f64; 2]) -> Self {
        Self {
            opacity: Property::fixed(100.0),
            rotation: Property::fixed(0.0),
            position: Property::fixed_vec(vec![position[0], position[1], 0.0]),
            anchor: Property::fixed_vec(vec![anchor[0], anchor[1], 0.0]),
            scale: Property::fixed_vec(vec![100.0, 100.0, 100.0]),
        }
    }

    /// An image of `width` x `height` centred on a canvas of the same size.
    pub fn centered(width: u32, height: u32) -> Self {
        let c = [f64::from(width) / 2.0, f64::from(height) / 2.0];
        Self::at(c, c)
    }

    pub fn with_opacity(mut self, opacity: Property) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_rotation(mut self, rotation: Property) -> Self {
        self.rotation = rotation;
        self
    }
}

/// An animatable value: `{ "a": 0|1, "k": ... }`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Property {
    #[serde(rename = "a")]
    pub animated: u8,
    #[serde(rename = "k")]
    pub value: PropertyValue,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Scalar(f64),
    Vector(Vec<f64>),
    Keyframes(Vec<Keyframe>),
}

impl Property {
    pub fn fixed(v: f64) -> Self {
        Self {
            animated: 0,
            value: PropertyValue::Scalar(v),
        }
    }

    pub fn fixed_vec(v: Vec<f64>) -> Self {
        Self {
            animated: 0,
            value: PropertyValue::Vector(v),
        }
    }

    pub fn keyframed(keys: Vec<Keyframe>) -> Self {
        Self {
            animated: 1,
            value: PropertyValue::Keyframes(keys),
        }
    }

    pub fn keyframes(&self) -> Option<&[Keyframe]> {
        match &self.value {
            PropertyValue::Keyframes(k) => Some(k),
            _ => None,
        }
    }

    fn validate(&self, what: &str) -> CastResult<()> {
        let keyed = matches!(self.value, PropertyValue::Keyframes(_));
        if keyed != (self.animated == 1) {
            return Err(CastError::validation(format!(
                "{what}: animated flag {} does not match its value",
                self.animated
            )));
        }
        if let Some(keys) = self.keyframes() {
            if keys.is_empty() {
                return Err(CastError::validation(format!("{what}: no keyframes")));
            }
            for pair in keys.windows(2) {
                if !(pair[0].tick <= pair[1].tick) {
                    return Err(CastError::validation(format!(
                        "{what}: keyframe ticks must be non-decreasing"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// One keyframe: value `start` at `tick`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Keyframe {
    #[serde(rename = "t")]
    pub tick: f64,
    #[serde(rename = "s")]
    pub start: Vec<f64>,
    /// Legacy end value understood by older players.
    #[serde(rename = "e", default, skip_serializing_if = "Option::is_none")]
    pub end: Option<Vec<f64>>,
    #[serde(rename = "i", default, skip_serializing_if = "Option::is_none")]
    pub in_tangent: Option<EaseHandle>,
    #[serde(rename = "o", default, skip_serializing_if = "Option::is_none")]
    pub out_tangent: Option<EaseHandle>,
}

impl Keyframe {
    pub fn at(tick: f64, value: f64) -> Self {
        Self {
            tick,
            start: vec![value],
            end: None,
            in_tangent: None,
            out_tangent: None,
        }
    }

    pub fn ending_at(mut self, value: f64) -> Self {
        self.end = Some(vec![value]);
        self
    }

    pub fn eased(mut self, in_tangent: EaseHandle, out_tangent: EaseHandle) -> Self {
        self.in_tangent = Some(in_tangent);
        self.out_tangent = Some(out_tangent);
        self
    }
}

/// Bezier ease handle (`{ "x": [..], "y": [..] }`).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EaseHandle {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl EaseHandle {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: vec![x],
            y: vec![y],
        }
    }
}

/// Shape-layer content (`shapes[]` / group `it[]`), tagged by `ty`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "ty")]
pub enum ShapeItem {
    #[serde(rename = "gr")]
    Group {
        #[serde(rename = "nm", default)]
        name: String,
        #[serde(rename = "it")]
        items: Vec<ShapeItem>,
        #[serde(rename = "bm", default)]
        blend_mode: u8,
    },
    #[serde(rename = "el")]
    Ellipse {
        #[serde(rename = "p")]
        position: Property,
        #[serde(rename = "s")]
        size: Property,
    },
    #[serde(rename = "sh")]
    Path {
        #[serde(rename = "ks")]
        path: PathProperty,
    },
    #[serde(rename = "fl")]
    Fill {
        #[serde(rename = "c")]
        color: Property,
        #[serde(rename = "o")]
        opacity: Property,
    },
    #[serde(rename = "st")]
    Stroke {
        #[serde(rename = "c")]
        color: Property,
        #[serde(rename = "o")]
        opacity: Property,
        #[serde(rename = "w")]
        width: Property,
    },
    #[serde(rename = "tr")]
    GroupTransform {
        #[serde(rename = "p")]
        position: Property,
        #[serde(rename = "a")]
        anchor: Property,
        #[serde(rename = "s")]
        scale: Property,
        #[serde(rename = "r")]
        rotation: Property,
        #[serde(rename = "o")]
        opacity: Property,
    },
}

/// Static bezier path (`{ "a": 0, "k": { i, o, v, c } }`).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PathProperty {
    #[serde(rename = "a")]
    pub animated: u8,
    #[serde(rename = "k")]
    pub bezier: Bezier,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bezier {
    #[serde(rename = "i")]
    pub in_tangents: Vec<[f64; 2]>,
    #[serde(rename = "o")]
    pub out_tangents: Vec<[f64; 2]>,
    #[serde(rename = "v")]
    pub vertices: Vec<[f64; 2]>,
    #[serde(rename = "c")]
    pub closed: bool,
}

impl Bezier {
    /// Closed polygon through `vertices` with straight edges.
    pub fn polygon(vertices: Vec<[f64; 2]>) -> Self {
        let n = vertices.len();
        Self {
            in_tangents: vec![[0.0, 0.0]; n],
            out_tangents: vec![[0.0, 0.0]; n],
            vertices,
            closed: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Marker {
    #[serde(rename = "tm")]
    pub tick: f64,
    #[serde(rename = "cm")]
    pub comment: String,
    #[serde(rename = "dr", default)]
    pub duration: f64,
}

impl AnimationDocument {
    pub fn new(name: impl Into<String>, frame_rate: u32, width: u32, height: u32) -> Self {
        Self {
            version: LOTTIE_VERSION.to_string(),
            frame_rate,
            in_tick: 0.0,
            out_tick: 0.0,
            width,
            height,
            name: name.into(),
            three_d: 0,
            assets: Vec::new(),
            layers: Vec::new(),
            markers: Vec::new(),
        }
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.frame_rate == 0 {
            0.0
        } else {
            (self.out_tick - self.in_tick) / f64::from(self.frame_rate)
        }
    }

    pub fn asset(&self, id: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.id == id)
    }

    pub fn validate(&self) -> CastResult<()> {
        if self.frame_rate == 0 {
            return Err(CastError::validation("frame rate must be > 0"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(CastError::validation("canvas width/height must be > 0"));
        }
        if !self.in_tick.is_finite() || !self.out_tick.is_finite() || self.out_tick < self.in_tick {
            return Err(CastError::validation(
                "document span must be finite with out_tick >= in_tick",
            ));
        }
        if self.layers.is_empty() {
            return Err(CastError::validation("document has no layers"));
        }

        let mut ids: HashMap<&str, usize> = HashMap::with_capacity(self.assets.len());
        for asset in &self.assets {
            if asset.id.trim().is_empty() {
                return Err(CastError::validation("asset id must be non-empty"));
            }
            *ids.entry(asset.id.as_str()).or_default() += 1;
        }
        if let Some((id, _)) = ids.iter().find(|(_, n)| **n > 1) {
            return Err(CastError::validation(format!("duplicate asset id '{id}'")));
        }

        let mut prev_start = f64::NEG_INFINITY;
        for layer in &self.layers {
            let what = format!("layer {} '{}'", layer.index, layer.name);
            if !layer.start_tick.is_finite()
                || !layer.end_tick.is_finite()
                || layer.end_tick < layer.start_tick
            {
                return Err(CastError::validation(format!("{what} has a negative span")));
            }
            if layer.start_tick < prev_start {
                return Err(CastError::validation(format!(
                    "{what} starts before the previous layer"
                )));
            }
            prev_start = layer.start_tick;

            match layer.layer_type {
                LayerType::Image => {
                    let Some(r) = layer.asset_ref.as_deref() else {
                        return Err(CastError::validation(format!("{what} has no refId")));
                    };
                    if !ids.contains_key(r) {
                        return Err(CastError::validation(format!(
                            "{what} references missing asset '{r}'"
                        )));
                    }
                }
                LayerType::Shape => {
                    if layer.shapes.as_ref().is_none_or(|s| s.is_empty()) {
                        return Err(CastError::validation(format!("{what} has no shapes")));
                    }
                }
            }

            let t = &layer.transform;
            t.opacity.validate(&format!("{what} opacity"))?;
            t.rotation.validate(&format!("{what} rotation"))?;
            t.position.validate(&format!("{what} position"))?;
            t.anchor.validate(&format!("{what} anchor"))?;
            t.scale.validate(&format!("{what} scale"))?;
        }

        Ok(())
    }

    pub fn to_json(&self) -> CastResult<String> {
        Ok(serde_json::to_string(self).map_err(anyhow::Error::from)?)
    }

    pub fn from_json(s: &str) -> CastResult<Self> {
        let doc: Self = serde_json::from_str(s)
            .map_err(|e| CastError::validation(format!("malformed animation document: {e}")))?;
        doc.validate()?;
        Ok(doc)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/document/model.rs"]
mod tests;
