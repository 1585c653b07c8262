use std::collections::BTreeMap;

use facemosaic::{
    Brush, BrushMode, DetectionResult, EditSession, EncodedImage, ExportFormat, ExportOptions,
    FaceBox, FaceMosaicError, Landmark, Point, SessionConfig, SessionState,
};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

/// A face detection produced on the JavaScript side, e.g. by a browser
/// landmark model.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionInput {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    /// Landmark name (`lowerLip`, `noseBridge`, ...) to point.
    #[serde(default)]
    pub landmarks: Option<BTreeMap<String, PointInput>>,
}

#[derive(Deserialize)]
pub struct PointInput {
    pub x: f64,
    pub y: f64,
}

fn default_confidence() -> f64 {
    1.0
}

/// Brush settings. Missing fields keep the editor's current values.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct BrushOptions {
    pub mode: Option<String>,
    pub radius: Option<u32>,
    pub strength: Option<u32>,
}

/// Editor settings, all optional.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorOptions {
    pub history_depth: Option<usize>,
}

/// Export settings, all optional. Qualities are in `0.0..=1.0`.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportSettings {
    pub format: Option<String>,
    pub original_quality: Option<f32>,
    pub mosaic_quality: Option<f32>,
    pub crop_quality: Option<f32>,
}

fn state_to_str(state: SessionState) -> &'static str {
    match state {
        SessionState::Loaded => "loaded",
        SessionState::Editing => "editing",
        SessionState::Committed => "committed",
        SessionState::Skipped => "skipped",
    }
}

fn format_to_str(format: ExportFormat) -> &'static str {
    match format {
        ExportFormat::Jpeg => "jpeg",
        ExportFormat::Png => "png",
    }
}

fn string_to_format(format: &str) -> Result<ExportFormat, JsValue> {
    match format {
        "jpeg" => Ok(ExportFormat::Jpeg),
        "png" => Ok(ExportFormat::Png),
        _ => Err(make_error(
            "INVALID_OPTIONS",
            &format!("unknown format: {format}"),
        )),
    }
}

fn string_to_landmark(name: &str) -> Result<Landmark, JsValue> {
    match name {
        "leftEye" => Ok(Landmark::LeftEye),
        "rightEye" => Ok(Landmark::RightEye),
        "noseBridge" => Ok(Landmark::NoseBridge),
        "noseTip" => Ok(Landmark::NoseTip),
        "lowerLip" => Ok(Landmark::LowerLip),
        "chin" => Ok(Landmark::Chin),
        _ => Err(make_error(
            "INVALID_OPTIONS",
            &format!("unknown landmark: {name}"),
        )),
    }
}

/// Create a JS `Error` with a `code` property.
fn make_error(code: &str, message: &str) -> JsValue {
    let err = js_sys::Error::new(message);
    let _ = js_sys::Reflect::set(&err, &"code".into(), &JsValue::from_str(code));
    JsValue::from(err)
}

/// Convert a `FaceMosaicError` into a JS `Error` with a machine-readable `code` property.
fn to_js_error(e: FaceMosaicError) -> JsValue {
    let code = match &e {
        FaceMosaicError::DecodeError(_) => "DECODE_ERROR",
        FaceMosaicError::ZeroDimensions => "ZERO_DIMENSIONS",
        FaceMosaicError::EncodeError(_) => "ENCODE_ERROR",
        FaceMosaicError::InvalidQuality(_) => "INVALID_QUALITY",
        FaceMosaicError::InvalidBrushRadius(_) => "INVALID_BRUSH_RADIUS",
        FaceMosaicError::InvalidStrength(_) => "INVALID_STRENGTH",
        FaceMosaicError::NotEditing(_) => "NOT_EDITING",
        FaceMosaicError::InvalidCoordinate { .. } => "INVALID_COORDINATE",
        FaceMosaicError::SizeMismatch { .. } => "SIZE_MISMATCH",
        FaceMosaicError::SampleLength { .. } => "SAMPLE_LENGTH",
        FaceMosaicError::ModelLoad(_) => "MODEL_LOAD",
        FaceMosaicError::Item { .. } => "BATCH_ITEM",
    };
    make_error(code, &e.to_string())
}

fn parse_value<T: Default + for<'de> Deserialize<'de>>(value: JsValue) -> Result<T, JsValue> {
    if value.is_undefined() || value.is_null() {
        Ok(T::default())
    } else {
        serde_wasm_bindgen::from_value(value)
            .map_err(|e| make_error("INVALID_OPTIONS", &format!("invalid options: {e}")))
    }
}

fn parse_detection(value: JsValue) -> Result<Option<DetectionResult>, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(None);
    }
    let input: DetectionInput = serde_wasm_bindgen::from_value(value)
        .map_err(|e| make_error("INVALID_OPTIONS", &format!("invalid detection: {e}")))?;

    let mut detection = DetectionResult::from_box(
        FaceBox {
            x: input.x,
            y: input.y,
            width: input.width,
            height: input.height,
        },
        input.confidence,
    );
    if let Some(landmarks) = input.landmarks {
        let mut points = BTreeMap::new();
        for (name, p) in landmarks {
            points.insert(string_to_landmark(&name)?, Point::new(p.x, p.y));
        }
        detection = detection.with_landmarks(points);
    }
    Ok(Some(detection))
}

fn apply_brush(current: Brush, opts: &BrushOptions) -> Result<Brush, JsValue> {
    let strength = opts.strength.unwrap_or(current.mode().strength());
    let mode = match opts.mode.as_deref() {
        None => match current.mode() {
            BrushMode::Pixelate { .. } => BrushMode::Pixelate {
                block_size: strength,
            },
            BrushMode::Blur { .. } => BrushMode::Blur { radius: strength },
        },
        Some("pixelate") => BrushMode::Pixelate {
            block_size: strength,
        },
        Some("blur") => BrushMode::Blur { radius: strength },
        Some(other) => {
            return Err(make_error(
                "INVALID_OPTIONS",
                &format!("unknown brush mode: {other}"),
            ))
        }
    };
    Brush::new(opts.radius.unwrap_or(current.radius()), mode).map_err(to_js_error)
}

fn apply_export_settings(opts: &ExportSettings) -> Result<ExportOptions, JsValue> {
    let mut options = ExportOptions::new();
    if let Some(ref fmt) = opts.format {
        options = options.format(string_to_format(fmt)?);
    }
    if let Some(q) = opts.original_quality {
        options = options.original_quality(q);
    }
    if let Some(q) = opts.mosaic_quality {
        options = options.mosaic_quality(q);
    }
    if let Some(q) = opts.crop_quality {
        options = options.crop_quality(q);
    }
    Ok(options)
}

/// Build a plain JS object from an `EncodedImage`.
fn build_image_object(image: &EncodedImage) -> Result<JsValue, JsValue> {
    let obj = js_sys::Object::new();
    js_sys::Reflect::set(&obj, &"name".into(), &JsValue::from_str(&image.name))?;
    let data = js_sys::Uint8Array::from(&image.data[..]);
    js_sys::Reflect::set(&obj, &"data".into(), &data)?;
    js_sys::Reflect::set(
        &obj,
        &"format".into(),
        &JsValue::from_str(format_to_str(image.format)),
    )?;
    js_sys::Reflect::set(&obj, &"width".into(), &JsValue::from(image.width))?;
    js_sys::Reflect::set(&obj, &"height".into(), &JsValue::from(image.height))?;
    Ok(JsValue::from(obj))
}

/// Redaction editor for a single photo.
///
/// Pointer coordinates are in image pixels; the page is responsible for
/// mapping from display coordinates.
#[wasm_bindgen]
pub struct Editor {
    session: EditSession,
}

#[wasm_bindgen]
impl Editor {
    /// Decode a photo and prepare it for editing.
    ///
    /// @param input - Raw image bytes (JPEG, PNG, or WebP)
    /// @param detection - Optional face `{ x, y, width, height, confidence,
    ///   landmarks }`, where `landmarks` maps names such as `lowerLip` and
    ///   `noseBridge` to `{ x, y }`
    /// @param options - Optional object with field: historyDepth
    #[wasm_bindgen(constructor)]
    pub fn new(input: Vec<u8>, detection: JsValue, options: JsValue) -> Result<Editor, JsValue> {
        let opts: EditorOptions = parse_value(options)?;
        let detection = parse_detection(detection)?;

        let mut config = SessionConfig::new();
        if let Some(depth) = opts.history_depth {
            config = config.history_depth(depth);
        }

        let original = facemosaic::decode_image(&input).map_err(to_js_error)?;
        let session = EditSession::new(original, detection, config).map_err(to_js_error)?;
        Ok(Editor { session })
    }

    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.session.original().width()
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.session.original().height()
    }

    /// One of `loaded`, `editing`, `committed`, `skipped`.
    #[wasm_bindgen(getter)]
    pub fn state(&self) -> String {
        state_to_str(self.session.state()).to_string()
    }

    #[wasm_bindgen(getter, js_name = "faceDetected")]
    pub fn face_detected(&self) -> bool {
        self.session.detection().is_some()
    }

    #[wasm_bindgen(getter, js_name = "undoDepth")]
    pub fn undo_depth(&self) -> usize {
        self.session.history().depth()
    }

    /// @param options - Object with fields: mode (`pixelate` or `blur`),
    ///   radius, strength
    #[wasm_bindgen(js_name = "setBrush")]
    pub fn set_brush(&mut self, options: JsValue) -> Result<(), JsValue> {
        let opts: BrushOptions = parse_value(options)?;
        let brush = apply_brush(self.session.brush(), &opts)?;
        self.session.set_brush(brush);
        Ok(())
    }

    pub fn open(&mut self) {
        self.session.open();
    }

    pub fn commit(&mut self) -> Result<(), JsValue> {
        self.session.commit().map_err(to_js_error)
    }

    pub fn skip(&mut self) -> Result<(), JsValue> {
        self.session.skip().map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = "goBack")]
    pub fn go_back(&mut self) {
        self.session.go_back();
    }

    pub fn reset(&mut self) {
        self.session.reset();
    }

    /// Returns `false` when already at the oldest snapshot.
    pub fn undo(&mut self) -> Result<bool, JsValue> {
        self.session.undo().map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = "beginStroke")]
    pub fn begin_stroke(&mut self, x: f64, y: f64) -> Result<(), JsValue> {
        self.session.begin_stroke(x, y).map_err(to_js_error)
    }

    /// Returns the number of dabs painted.
    #[wasm_bindgen(js_name = "strokeTo")]
    pub fn stroke_to(&mut self, x: f64, y: f64) -> Result<usize, JsValue> {
        self.session.stroke_to(x, y).map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = "endStroke")]
    pub fn end_stroke(&mut self) -> Result<(), JsValue> {
        self.session.end_stroke().map_err(to_js_error)
    }

    /// RGBA bytes of the working surface, suitable for `ImageData`.
    #[wasm_bindgen(js_name = "workingRgba")]
    pub fn working_rgba(&self) -> Vec<u8> {
        self.session.working().as_raw().to_vec()
    }

    /// The export crop as `{ left, top, size }`.
    #[wasm_bindgen(js_name = "cropRect")]
    pub fn crop_rect(&self) -> Result<JsValue, JsValue> {
        let rect = self.session.crop_rect();
        let obj = js_sys::Object::new();
        js_sys::Reflect::set(&obj, &"left".into(), &JsValue::from(rect.left))?;
        js_sys::Reflect::set(&obj, &"top".into(), &JsValue::from(rect.top))?;
        js_sys::Reflect::set(&obj, &"size".into(), &JsValue::from(rect.size))?;
        Ok(JsValue::from(obj))
    }

    /// Encode the original, the committed redaction and its crop.
    ///
    /// @param number - 1-based position used in the file names
    /// @param options - Optional object with fields: format, originalQuality,
    ///   mosaicQuality, cropQuality
    pub fn export(&self, number: usize, options: JsValue) -> Result<JsValue, JsValue> {
        let opts: ExportSettings = parse_value(options)?;
        let options = apply_export_settings(&opts)?;
        let set = self.session.export(number, &options).map_err(to_js_error)?;

        let obj = js_sys::Object::new();
        js_sys::Reflect::set(&obj, &"number".into(), &JsValue::from(set.number as u32))?;
        js_sys::Reflect::set(&obj, &"original".into(), &build_image_object(&set.original)?)?;
        js_sys::Reflect::set(&obj, &"mosaic".into(), &build_image_object(&set.mosaic)?)?;
        js_sys::Reflect::set(&obj, &"cropped".into(), &build_image_object(&set.cropped)?)?;
        js_sys::Reflect::set(
            &obj,
            &"faceDetected".into(),
            &JsValue::from(set.face_detected),
        )?;
        Ok(JsValue::from(obj))
    }
}
