use crate::{
    contour::Connectivity,
    foundation::{
        error::{FloodError, FloodResult},
        math::{clamp_param, clamp_scale},
    },
};

/// Straight RGBA in `[0, 1]`.
pub type Rgba = [f32; 4];

/// Effect description as it appears in JSON: `{ "kind": "skeleton", "params": { ... } }`.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct EffectSpec {
    pub kind: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Validated, clamped parameters for one effect.
#[derive(Clone, Debug, PartialEq)]
pub enum EffectParams {
    Distance(DistanceParams),
    Skeleton(SkeletonParams),
    StraightSkeleton(StraightSkeletonParams),
    InnerBevel(BevelParams),
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DistanceParams {
    /// Mask binarisation cut, clamped to `[0, 1]`.
    pub threshold: f32,
    /// Output multiplier, clamped to `[1e-6, 1e6]`.
    #[serde(alias = "distanceScale")]
    pub distance_scale: f32,
    /// Seed from the mask outline and negate distances inside the mask.
    #[serde(alias = "signedDistance")]
    pub signed_distance: bool,
    pub subpixel: bool,
    /// Value for cells no seed reached. Defaults to `+∞`.
    pub sentinel: f32,
    pub connectivity: Connectivity,
}

impl Default for DistanceParams {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            distance_scale: 1.0,
            signed_distance: false,
            subpixel: false,
            sentinel: f32::INFINITY,
            connectivity: Connectivity::Four,
        }
    }
}

impl DistanceParams {
    pub fn sanitized(self) -> Self {
        let d = Self::default();
        Self {
            threshold: clamp_param("threshold", self.threshold, d.threshold, 0.0, 1.0),
            distance_scale: clamp_scale(self.distance_scale),
            sentinel: if self.sentinel.is_nan() {
                tracing::warn!("sentinel is NaN, using +inf");
                f32::INFINITY
            } else {
                self.sentinel
            },
            ..self
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SkeletonParams {
    pub threshold: f32,
    #[serde(alias = "distanceScale")]
    pub distance_scale: f32,
    #[serde(alias = "signedDistance")]
    pub signed_distance: bool,
    /// Ridge cells closer to the outline than this (after scaling) are plain foreground.
    #[serde(alias = "minDistance")]
    pub min_distance: f32,
    pub connectivity: Connectivity,
    pub skeleton_color: Rgba,
    pub foreground_color: Rgba,
    pub background_color: Rgba,
}

impl Default for SkeletonParams {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            distance_scale: 1.0,
            signed_distance: true,
            min_distance: 1.0,
            connectivity: Connectivity::Four,
            skeleton_color: [1.0, 1.0, 1.0, 1.0],
            foreground_color: [0.5, 0.5, 0.5, 1.0],
            background_color: [0.0, 0.0, 0.0, 0.0],
        }
    }
}

impl SkeletonParams {
    pub fn sanitized(self) -> Self {
        let d = Self::default();
        Self {
            threshold: clamp_param("threshold", self.threshold, d.threshold, 0.0, 1.0),
            distance_scale: clamp_scale(self.distance_scale),
            min_distance: clamp_param(
                "min_distance",
                self.min_distance,
                d.min_distance,
                0.0,
                f32::MAX,
            ),
            skeleton_color: clamp_color(self.skeleton_color),
            foreground_color: clamp_color(self.foreground_color),
            background_color: clamp_color(self.background_color),
            ..self
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StraightSkeletonParams {
    pub threshold: f32,
    /// Neighbouring directions with a dot product below this disagree. Clamped to `[-1, 1]`.
    #[serde(alias = "angleThreshold")]
    pub angle_threshold: f32,
    pub subpixel: bool,
    pub connectivity: Connectivity,
    pub skeleton_color: Rgba,
    pub foreground_color: Rgba,
    pub background_color: Rgba,
}

impl Default for StraightSkeletonParams {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            angle_threshold: std::f32::consts::FRAC_1_SQRT_2,
            subpixel: false,
            connectivity: Connectivity::Four,
            skeleton_color: [1.0, 1.0, 1.0, 1.0],
            foreground_color: [0.5, 0.5, 0.5, 1.0],
            background_color: [0.0, 0.0, 0.0, 0.0],
        }
    }
}

impl StraightSkeletonParams {
    pub fn sanitized(self) -> Self {
        let d = Self::default();
        Self {
            threshold: clamp_param("threshold", self.threshold, d.threshold, 0.0, 1.0),
            angle_threshold: clamp_param(
                "angle_threshold",
                self.angle_threshold,
                d.angle_threshold,
                -1.0,
                1.0,
            ),
            skeleton_color: clamp_color(self.skeleton_color),
            foreground_color: clamp_color(self.foreground_color),
            background_color: clamp_color(self.background_color),
            ..self
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BevelParams {
    pub threshold: f32,
    #[serde(alias = "distanceScale")]
    pub distance_scale: f32,
    /// Bevel falloff distance in (scaled) cells. Clamped to `[1e-3, 1e4]`.
    pub width: f32,
    /// Light direction in degrees, counter-clockwise from +x with y pointing up on screen.
    pub angle: f32,
    /// Height dither amplitude in cells. Clamped to `[0, width]`.
    pub noise: f32,
    /// Seed for the dither pattern.
    pub noise_seed: u64,
    pub subpixel: bool,
    pub highlight_color: Rgba,
    pub shadow_color: Rgba,
}

impl Default for BevelParams {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            distance_scale: 1.0,
            width: 5.0,
            angle: 0.0,
            noise: 0.0,
            noise_seed: 0,
            subpixel: true,
            highlight_color: [1.0, 1.0, 1.0, 1.0],
            shadow_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl BevelParams {
    pub fn sanitized(self) -> Self {
        let d = Self::default();
        let width = clamp_param("width", self.width, d.width, 1e-3, 1e4);
        Self {
            threshold: clamp_param("threshold", self.threshold, d.threshold, 0.0, 1.0),
            distance_scale: clamp_scale(self.distance_scale),
            width,
            angle: if self.angle.is_finite() {
                self.angle
            } else {
                tracing::warn!(value = self.angle, "angle is not finite, using default");
                d.angle
            },
            noise: clamp_param("noise", self.noise, d.noise, 0.0, width),
            highlight_color: clamp_color(self.highlight_color),
            shadow_color: clamp_color(self.shadow_color),
            ..self
        }
    }
}

/// Parse and sanitise an [`EffectSpec`].
///
/// Unknown kinds, unknown parameter names and ill-typed values are validation errors;
/// out-of-range numbers are clamped.
pub fn parse_effect(spec: &EffectSpec) -> FloodResult<EffectParams> {
    let kind = spec.kind.trim().to_ascii_lowercase();
    if kind.is_empty() {
        return Err(FloodError::validation("effect kind must be non-empty"));
    }

    match kind.as_str() {
        "distance" | "distance_field" | "distance-field" | "distancefield" => Ok(
            EffectParams::Distance(params_from::<DistanceParams>(&kind, &spec.params)?.sanitized()),
        ),
        "skeleton" => Ok(EffectParams::Skeleton(
            params_from::<SkeletonParams>(&kind, &spec.params)?.sanitized(),
        )),
        "straightskeleton" | "straight_skeleton" | "straight-skeleton" => {
            Ok(EffectParams::StraightSkeleton(
                params_from::<StraightSkeletonParams>(&kind, &spec.params)?.sanitized(),
            ))
        }
        "innerbevel" | "inner_bevel" | "inner-bevel" | "bevel" => Ok(EffectParams::InnerBevel(
            params_from::<BevelParams>(&kind, &spec.params)?.sanitized(),
        )),
        _ => Err(FloodError::validation(format!(
            "unknown effect kind '{kind}'"
        ))),
    }
}

/// Parse an effect from a JSON string.
pub fn parse_effect_json(json: &str) -> FloodResult<EffectParams> {
    let spec: EffectSpec = serde_json::from_str(json)
        .map_err(|e| FloodError::serde(format!("invalid effect JSON: {e}")))?;
    parse_effect(&spec)
}

fn params_from<T>(kind: &str, params: &serde_json::Value) -> FloodResult<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    if params.is_null() {
        return Ok(T::default());
    }
    if !params.is_object() {
        return Err(FloodError::validation(format!(
            "{kind} params must be an object"
        )));
    }
    T::deserialize(params)
        .map_err(|e| FloodError::validation(format!("invalid {kind} params: {e}")))
}

fn clamp_color(c: Rgba) -> Rgba {
    c.map(|v| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(kind: &str, params: serde_json::Value) -> EffectSpec {
        EffectSpec {
            kind: kind.to_string(),
            params,
        }
    }

    #[test]
    fn defaults_match_documented_values() {
        let EffectParams::StraightSkeleton(p) =
            parse_effect(&spec("straight-skeleton", serde_json::Value::Null)).unwrap()
        else {
            panic!("wrong kind");
        };
        assert_eq!(p.angle_threshold, std::f32::consts::FRAC_1_SQRT_2);
        assert_eq!(p.threshold, 0.5);

        let EffectParams::InnerBevel(b) =
            parse_effect(&spec("Inner_Bevel", serde_json::json!({}))).unwrap()
        else {
            panic!("wrong kind");
        };
        assert_eq!((b.width, b.angle, b.noise), (5.0, 0.0, 0.0));
        assert!(b.subpixel);
    }

    #[test]
    fn camel_case_aliases_are_accepted() {
        let p = parse_effect(&spec(
            "skeleton",
            serde_json::json!({ "distanceScale": 2.0, "signedDistance": false }),
        ))
        .unwrap();
        let EffectParams::Skeleton(p) = p else {
            panic!("wrong kind");
        };
        assert_eq!(p.distance_scale, 2.0);
        assert!(!p.signed_distance);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let p = parse_effect(&spec(
            "distance",
            serde_json::json!({ "threshold": 3.0, "distance_scale": -1.0 }),
        ))
        .unwrap();
        let EffectParams::Distance(p) = p else {
            panic!("wrong kind");
        };
        assert_eq!(p.threshold, 1.0);
        assert_eq!(p.distance_scale, 1e-6);

        let b = BevelParams {
            width: 2.0,
            noise: 9.0,
            highlight_color: [2.0, -1.0, f32::NAN, 0.5],
            ..BevelParams::default()
        }
        .sanitized();
        assert_eq!(b.noise, 2.0);
        assert_eq!(b.highlight_color, [1.0, 0.0, 0.0, 0.5]);
    }

    #[test]
    fn unknown_kinds_and_fields_are_rejected() {
        assert!(matches!(
            parse_effect(&spec("glow", serde_json::Value::Null)),
            Err(FloodError::Validation(_))
        ));
        assert!(matches!(
            parse_effect(&spec("skeleton", serde_json::json!({ "tresh": 0.2 }))),
            Err(FloodError::Validation(_))
        ));
        assert!(matches!(
            parse_effect(&spec("skeleton", serde_json::json!([1, 2]))),
            Err(FloodError::Validation(_))
        ));
        assert!(matches!(
            parse_effect(&spec("  ", serde_json::Value::Null)),
            Err(FloodError::Validation(_))
        ));
    }

    #[test]
    fn json_entry_point_reports_syntax_errors_as_serde() {
        assert!(matches!(
            parse_effect_json("{ not json"),
            Err(FloodError::Serde(_))
        ));
        let p = parse_effect_json(r#"{ "kind": "bevel", "params": { "angle": 90 } }"#).unwrap();
        assert!(matches!(p, EffectParams::InnerBevel(BevelParams { angle, .. }) if angle == 90.0));
    }
}
