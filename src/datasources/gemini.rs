use crate::config::DocumentAnalysisConfig;
use crate::error::{FertiplanError, Result};
use crate::models::SoilReading;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use tracing::{debug, info};

const SYSTEM_INSTRUCTION: &str = "\
You are an agronomist who reads soil laboratory reports.
Extract precise numeric values from the attached report (PDF or image).

Main fields: pH, organic matter, nitrogen, phosphorus, potassium, calcium, \
magnesium, cation exchange capacity and texture. If a value is not stated, use 0. \
Keep units consistent with the report.

Put every other technical reading in 'otherData' as strings formatted \
\"Name: value unit\". Look in particular for sulfur, micronutrients \
(Fe, Zn, Mn, Cu, B), toxic elements (Al, Na), cation ratios (Ca/Mg, Mg/K, \
(Ca+Mg)/K), saturation percentages and exchangeable acidity.

Example otherData: [\"Sulfur: 12 ppm\", \"Zinc: 2.4 ppm\", \"Ca/Mg ratio: 3.5\", \"Base saturation: 85%\"]";

const USER_PROMPT: &str = "Analyze the attached soil report. Extract the main nutrients and put \
every micronutrient, ratio, saturation and extra reading in 'otherData'.";

/// Client for soil-report extraction through the Gemini API.
pub struct GeminiClient {
    client: reqwest::Client,
    config: DocumentAnalysisConfig,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: UploadedFile,
}

#[derive(Debug, Deserialize)]
struct UploadedFile {
    uri: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
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

/// Model output before defaults are applied; any field may be missing or null.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtractedSoil {
    ph: Option<f64>,
    organic_matter: Option<f64>,
    nitrogen: Option<f64>,
    phosphorus: Option<f64>,
    potassium: Option<f64>,
    calcium: Option<f64>,
    magnesium: Option<f64>,
    cation_exchange_capacity: Option<f64>,
    texture: Option<String>,
    crop: Option<String>,
    other_data: Option<Vec<String>>,
}

impl From<ExtractedSoil> for SoilReading {
    fn from(e: ExtractedSoil) -> Self {
        let mut soil = SoilReading::new(e.ph.unwrap_or(0.0), e.organic_matter.unwrap_or(0.0))
            .with_npk(
                e.nitrogen.unwrap_or(0.0),
                e.phosphorus.unwrap_or(0.0),
                e.potassium.unwrap_or(0.0),
            )
            .with_cations(
                e.calcium.unwrap_or(0.0),
                e.magnesium.unwrap_or(0.0),
                e.cation_exchange_capacity.unwrap_or(0.0),
            )
            .with_texture(e.texture.unwrap_or_default());

        for entry in e.other_data.unwrap_or_default() {
            soil = soil.with_other(entry);
        }
        soil.crop = e
            .crop
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        soil
    }
}

/// Mime type for a soil report, from its extension.
pub fn mime_type_for(path: &Path) -> Result<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => Ok("application/pdf"),
        "png" => Ok("image/png"),
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "webp" => Ok("image/webp"),
        _ => Err(FertiplanError::DocumentAnalysis(format!(
            "unsupported document type '{}' (expected pdf, png, jpg or webp)",
            path.display()
        ))),
    }
}

fn response_schema() -> Value {
    let number = |description: &str| json!({ "type": "NUMBER", "description": description });

    json!({
        "type": "OBJECT",
        "properties": {
            "ph": number("Soil pH"),
            "organicMatter": number("Organic matter, percent"),
            "nitrogen": number("Nitrogen (ppm or kg/ha as reported)"),
            "phosphorus": number("Phosphorus (ppm)"),
            "potassium": number("Potassium (cmol/kg or ppm)"),
            "calcium": number("Calcium (cmol/kg)"),
            "magnesium": number("Magnesium (cmol/kg)"),
            "cationExchangeCapacity": number("Cation exchange capacity"),
            "texture": { "type": "STRING", "description": "Soil texture class" },
            "crop": { "type": "STRING", "description": "Crop named in the report, if any" },
            "otherData": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "Every additional reading as \"Name: value unit\""
            }
        },
        "required": ["ph", "phosphorus", "potassium"]
    })
}

/// Pulls the JSON soil object out of a `generateContent` reply.
fn parse_soil_reply(body: &str) -> Result<SoilReading> {
    let response: GenerateResponse = serde_json::from_str(body).map_err(|e| {
        FertiplanError::DocumentAnalysis(format!("Failed to parse Gemini response: {}", e))
    })?;

    let text = response
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .find_map(|p| p.text)
        .ok_or_else(|| FertiplanError::DocumentAnalysis("Gemini returned no text".into()))?;

    let extracted: ExtractedSoil = serde_json::from_str(text.trim()).map_err(|e| {
        FertiplanError::DocumentAnalysis(format!("Gemini reply is not a soil object: {}", e))
    })?;

    Ok(extracted.into())
}

impl GeminiClient {
    pub fn new(config: DocumentAnalysisConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() || config.api_key.starts_with("${") {
            return Err(FertiplanError::Config(
                "document_analysis.api_key is not set".into(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            config,
        })
    }

    fn base_url(&self) -> &str {
        self.config.endpoint.trim_end_matches('/')
    }

    /// Uploads a soil report and asks the model for its readings.
    pub async fn extract_soil(&self, path: &Path) -> Result<SoilReading> {
        let mime_type = mime_type_for(path)?;
        let bytes = tokio::fs::read(path).await?;
        info!(
            path = %path.display(),
            size = bytes.len(),
            "Uploading soil report for analysis"
        );

        let file = self.upload(bytes, mime_type, path).await?;
        debug!(uri = %file.uri, "Upload complete");

        self.generate(&file).await
    }

    async fn upload(&self, bytes: Vec<u8>, mime_type: &str, path: &Path) -> Result<UploadedFile> {
        let display_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("soil-report");

        let start = self
            .client
            .post(format!("{}/upload/v1beta/files", self.base_url()))
            .header("x-goog-api-key", &self.config.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&json!({ "file": { "display_name": display_name } }))
            .send()
            .await?;

        if !start.status().is_success() {
            let status = start.status();
            let body = start.text().await.unwrap_or_default();
            return Err(FertiplanError::DocumentAnalysis(format!(
                "Gemini upload start returned {}: {}",
                status, body
            )));
        }

        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                FertiplanError::DocumentAnalysis("Gemini upload returned no upload URL".into())
            })?;

        let finish = self
            .client
            .post(&upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await?;

        if !finish.status().is_success() {
            let status = finish.status();
            let body = finish.text().await.unwrap_or_default();
            return Err(FertiplanError::DocumentAnalysis(format!(
                "Gemini upload returned {}: {}",
                status, body
            )));
        }

        let uploaded: UploadResponse = finish.json().await.map_err(|e| {
            FertiplanError::DocumentAnalysis(format!("Failed to parse upload response: {}", e))
        })?;
        Ok(uploaded.file)
    }

    async fn generate(&self, file: &UploadedFile) -> Result<SoilReading> {
        let request = json!({
            "systemInstruction": { "parts": [{ "text": SYSTEM_INSTRUCTION }] },
            "contents": [{
                "parts": [
                    { "file_data": { "mime_type": file.mime_type, "file_uri": file.uri } },
                    { "text": USER_PROMPT }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema()
            }
        });

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url(),
                self.config.model
            ))
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FertiplanError::DocumentAnalysis(format!(
                "Gemini returned {}: {}",
                status, body
            )));
        }

        let body = response.text().await?;
        let soil = parse_soil_reply(&body)?;
        debug!(
            ph = soil.ph,
            phosphorus = soil.phosphorus,
            potassium = soil.potassium,
            extra = soil.other_data.len(),
            "Extracted soil reading"
        );
        Ok(soil)
    }
}
