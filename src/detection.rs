//! Detection results and coordinate reshaping
//!
//! Gemini reports 2D geometry on a 0–1000 grid with `[ymin, xmin, ymax, xmax]`
//! ordering and 3D rotations in degrees. The UI wants fractional
//! `[x, y, width, height]` and radians. Reshaping is not idempotent: feeding
//! already-normalized values back in divides them by 1000 again.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

pub const COORDINATE_SCALE: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectType {
    Boxes2d,
    Points,
    Masks,
    Boxes3d,
}

impl FromStr for DetectType {
    type Err = Error;

    /// Accepts the labels the spatial demo shows ("2D bounding boxes", ...)
    /// as well as short forms.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "2d bounding boxes" | "2d" | "boxes" => Ok(DetectType::Boxes2d),
            "points" | "point" => Ok(DetectType::Points),
            "segmentation masks" | "masks" | "segmentation" => Ok(DetectType::Masks),
            "3d bounding boxes" | "3d" => Ok(DetectType::Boxes3d),
            other => Err(Error::InvalidRequest(format!(
                "Unknown detectType '{}'",
                other
            ))),
        }
    }
}

// Provider-native shapes

#[derive(Debug, Clone, Deserialize)]
pub struct RawBox2d {
    pub box_2d: [f64; 4],
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPoint {
    /// `[y, x]`
    pub point: [f64; 2],
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMask {
    pub box_2d: [f64; 4],
    #[serde(default)]
    pub label: String,
    /// Usually a base64 PNG data URL.
    #[serde(default)]
    pub mask: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawBox3d {
    /// Center (3), size (3), roll/pitch/yaw in degrees (3).
    pub box_3d: [f64; 9],
    #[serde(default)]
    pub label: String,
}

// UI-native shapes

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Box2d {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Mask {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub label: String,
    pub mask: Value,
}

impl Mask {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Box3d {
    pub center: [f64; 3],
    pub size: [f64; 3],
    /// Roll, pitch, yaw in radians.
    pub rpy: [f64; 3],
    pub label: String,
}

/// One entry of a `set_timecodes*` function call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Timecode {
    pub time: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

fn fractional_rect([ymin, xmin, ymax, xmax]: [f64; 4]) -> (f64, f64, f64, f64) {
    (
        xmin / COORDINATE_SCALE,
        ymin / COORDINATE_SCALE,
        (xmax - xmin) / COORDINATE_SCALE,
        (ymax - ymin) / COORDINATE_SCALE,
    )
}

pub fn reshape_box_2d(raw: RawBox2d) -> Box2d {
    let (x, y, width, height) = fractional_rect(raw.box_2d);
    Box2d {
        x,
        y,
        width,
        height,
        label: raw.label,
    }
}

pub fn reshape_point(raw: RawPoint) -> Point {
    let [y, x] = raw.point;
    Point {
        x: x / COORDINATE_SCALE,
        y: y / COORDINATE_SCALE,
        label: raw.label,
    }
}

/// Reshape masks and order them largest first so small masks draw on top.
/// The sort is stable: equal areas keep their input order.
pub fn reshape_masks(raw: Vec<RawMask>) -> Vec<Mask> {
    let mut masks: Vec<Mask> = raw
        .into_iter()
        .map(|m| {
            let (x, y, width, height) = fractional_rect(m.box_2d);
            Mask {
                x,
                y,
                width,
                height,
                label: m.label,
                mask: m.mask,
            }
        })
        .collect();
    masks.sort_by(|a, b| b.area().total_cmp(&a.area()));
    masks
}

pub fn reshape_box_3d(raw: RawBox3d) -> Box3d {
    let b = raw.box_3d;
    Box3d {
        center: [b[0], b[1], b[2]],
        size: [b[3], b[4], b[5]],
        rpy: [b[6].to_radians(), b[7].to_radians(), b[8].to_radians()],
        label: raw.label,
    }
}

fn decode_list<T: DeserializeOwned>(value: Value, what: &str) -> Result<Vec<T>> {
    serde_json::from_value(value)
        .map_err(|e| Error::MalformedOutput(format!("unexpected {} output: {}", what, e)))
}

/// Reshape a parsed model result (a JSON list) into UI coordinates.
pub fn reshape(detect_type: DetectType, value: Value) -> Result<Value> {
    let reshaped = match detect_type {
        DetectType::Boxes2d => serde_json::to_value(
            decode_list::<RawBox2d>(value, "2D box")?
                .into_iter()
                .map(reshape_box_2d)
                .collect::<Vec<_>>(),
        )?,
        DetectType::Points => serde_json::to_value(
            decode_list::<RawPoint>(value, "point")?
                .into_iter()
                .map(reshape_point)
                .collect::<Vec<_>>(),
        )?,
        DetectType::Masks => {
            serde_json::to_value(reshape_masks(decode_list(value, "segmentation mask")?))?
        }
        DetectType::Boxes3d => serde_json::to_value(
            decode_list::<RawBox3d>(value, "3D box")?
                .into_iter()
                .map(reshape_box_3d)
                .collect::<Vec<_>>(),
        )?,
    };
    Ok(reshaped)
}
