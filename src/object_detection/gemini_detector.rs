//! Zero-shot tree detection with the Gemini `generateContent` REST API.

use crate::annotations::bounding_box::BoundingBox;
use crate::annotations::detection::Detection;
use crate::config::GeminiConfig;
use crate::error::{Error, Result};
use crate::object_detection::object_detection_model::Detector;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use log::{debug, warn};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Gemini reports boxes on a 0-1000 grid regardless of the image size.
const NORMALIZED_EXTENT: f64 = 1000.0;

const API_KEY_HEADER: &str = "x-goog-api-key";

const BASE_PROMPT: &str = r#"You are an expert forest ecologist. Detect ALL trees in this image.
The image is a 50m x 50m aerial patch ({size}x{size} pixels).

CRITICAL INSTRUCTION:
Return ONLY valid JSON. Do not write an introduction or conclusion.

OUTPUT FORMAT:
{
    "trees": [
        {"box_2d": [ymin, xmin, ymax, xmax], "label": "Alive"},
        {"box_2d": [ymin, xmin, ymax, xmax], "label": "Dead"}
    ]
}

COORDINATE SYSTEM:
- Use NORMALIZED coordinates (0 to 1000).
- [0, 0] is Top-Left. [1000, 1000] is Bottom-Right.
"#;

const VISUAL_GUIDES: &str = r#"
VISUAL GUIDES:
- Alive: Continuous green texture, rounded canopy.
- Dead: Gray/white skeletal branches, no leaves, jagged structure.
"#;

pub fn system_prompt(image_size: u32, detailed_reasoning: bool) -> String {
    let mut prompt = BASE_PROMPT.replace("{size}", &image_size.to_string());
    if detailed_reasoning {
        prompt.push_str(VISUAL_GUIDES);
    }
    prompt
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TreeList {
    #[serde(default)]
    trees: Vec<Tree>,
}

#[derive(Debug, Deserialize)]
struct Tree {
    /// `[ymin, xmin, ymax, xmax]` on the 0-1000 grid.
    box_2d: [f64; 4],
    label: String,
}

pub struct GeminiDetector {
    client: Client,
    api_key: String,
    config: GeminiConfig,
    image_size: u32,
}

impl GeminiDetector {
    pub fn new(api_key: String, config: GeminiConfig, image_size: u32) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(GeminiDetector { client, api_key, config, image_size })
    }

    fn generate_content(&self, image_path: &Path) -> Result<String> {
        let image_bytes = fs::read(image_path)?;
        let url = format!("{}/models/{}:generateContent", self.config.endpoint, self.config.model);
        let body = json!({
            "contents": [{
                "parts": [
                    {"text": system_prompt(self.image_size, self.config.detailed_reasoning)},
                    {"inline_data": {
                        "mime_type": mime_type(image_path),
                        "data": STANDARD.encode(image_bytes),
                    }},
                ],
            }],
        });
        // The key must never appear in a URL: reqwest errors print theirs and end up in logs.
        let response: GenerateContentResponse = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.json::<GenerateContentResponse>())
            .map_err(|err| err.without_url())?;
        response
            .candidates
            .into_iter()
            .flat_map(|candidate| candidate.content.parts)
            .find_map(|part| part.text)
            .ok_or_else(|| Error::MalformedResponse("response contained no text".to_string()))
    }
}

impl Detector for GeminiDetector {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn detect(&mut self, image_path: &Path) -> Result<Vec<Detection<BoundingBox>>> {
        let text = self.generate_content(image_path)?;
        debug!("{} replied {} bytes for {}", self.config.name, text.len(), image_path.display());
        parse_response(&text, self.image_size)
    }

    fn request_interval(&self) -> Option<Duration> {
        Some(self.config.request_interval())
    }
}

fn mime_type(image_path: &Path) -> &'static str {
    match image_path.extension().and_then(|ext| ext.to_str()) {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("tif" | "tiff") => "image/tiff",
        _ => "image/png",
    }
}

/// Removes a surrounding Markdown code fence, with or without a `json` tag.
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Converts a model reply into detections in `image_size` pixel coordinates.
///
/// Gemini has no confidence score, so every detection gets the default one. A reply that is
/// not valid JSON is an error; a single tree with an impossible box is dropped with a
/// warning and the rest of the reply is kept.
pub fn parse_response(text: &str, image_size: u32) -> Result<Vec<Detection<BoundingBox>>> {
    let trees: TreeList = serde_json::from_str(strip_code_fence(text))?;
    let scale = f64::from(image_size) / NORMALIZED_EXTENT;
    let mut detections = Vec::with_capacity(trees.trees.len());
    for tree in trees.trees {
        let [ymin, xmin, ymax, xmax] = tree.box_2d;
        match BoundingBox::new(xmin * scale, ymin * scale, xmax * scale, ymax * scale, tree.label)
        {
            Ok(bbox) => detections.push(Detection::without_confidence(bbox)),
            Err(err) => {
                warn!("Dropping tree with box_2d [{ymin}, {xmin}, {ymax}, {xmax}]: {err}");
            }
        }
    }
    Ok(detections)
}
