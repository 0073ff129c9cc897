use std::borrow::Cow;

use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::gemini::{GeminiClient, Part};
use crate::image_prep::PreparedImage;
use crate::model::{AnalysisResult, KeywordSuggestions};

/// Raw research text beyond this many characters is cut before transmission.
pub const MAX_RAW_TEXT_LEN: usize = 60_000;
pub const TRUNCATION_MARKER: &str = "\n...[Data Truncated for Analysis Safety]";

const SYSTEM_INSTRUCTION: &str =
    "You are a helpful, professional, and data-driven Etsy SEO expert.";

/// Output contract for the keyword-idea call.
fn suggestions_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "suggestions": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "List of 15-20 distinct search keywords ranging from broad to specific."
            }
        },
        "required": ["suggestions"]
    })
}

/// Output contract for the full analysis call, mirrored by
/// [`crate::model::AnalysisResult`].
fn analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "productContext": {
                "type": "OBJECT",
                "properties": {
                    "niche": { "type": "STRING", "description": "Identified niche (e.g., Cottagecore, Desk Decor)" },
                    "isPhysical": { "type": "BOOLEAN", "description": "True if physical item, False if digital/pattern" },
                    "visualStyle": { "type": "STRING", "description": "Brief description of style/color/usage" }
                },
                "required": ["niche", "isPhysical", "visualStyle"]
            },
            "keywords": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "keyword": { "type": "STRING" },
                        "searchVolume": { "type": "NUMBER" },
                        "competition": { "type": "NUMBER" },
                        "quadrant": {
                            "type": "STRING",
                            "enum": ["GOLD_MINE", "LONG_TAIL", "WAR_ZONE", "TRASH_RISK"],
                            "description": "Classification based on volume vs competition"
                        },
                        "reason": { "type": "STRING", "description": "Brief reason for classification" }
                    },
                    "required": ["keyword", "searchVolume", "competition", "quadrant", "reason"]
                }
            },
            "valueAnalysis": {
                "type": "STRING",
                "description": "Why the Gold/Long Tail keywords are valuable for this specific product. Markdown format."
            },
            "pricingStrategy": {
                "type": "STRING",
                "description": "Pricing suggestions based on market data or perceived value. Markdown format."
            },
            "nextSteps": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "List of 5-10 specific new keywords to search next."
            }
        },
        "required": ["productContext", "keywords", "valueAnalysis", "pricingStrategy", "nextSteps"]
    })
}

const IDEAS_PROMPT: &str = "\
Role: Etsy SEO Specialist.
Task: Analyze the uploaded product images. Identify the item, its style (e.g., Boho, Minimalist), material, and potential usage.
Output: Generate a list of 15-20 distinct keyword phrases to type into a keyword research tool (like eRank or Etsy Search) to find data.
Strategy:
1. Start with 3-4 broad terms (e.g., \"Ceramic Mug\").
2. Add 5-6 niche specific terms (e.g., \"Strawberry Cow Mug\", \"Cottagecore Coffee Cup\").
3. Add 5-6 occasion/recipient terms (e.g., \"Gift for Gamer\", \"Office Desk Decor\").
4. Ensure terms are relevant to Physical Products if the image looks like one.
Language: English (as Etsy SEO is primarily English based).";

fn analysis_prompt(raw_data: &str) -> String {
    format!(
        "\
Role: You are an expert Etsy SEO Data Analyst and Product Strategy Consultant.

Task:
1. Analyze the uploaded product images to identify the niche, style, and usage. These images represent the product(s) being sold.
2. Parse the provided Raw Data (which may be unstructured text from eRank/Etsy) to extract keywords, search volume, and competition numbers.
3. Filter: If the image is a Physical Item, flag keywords like \"Pattern\", \"PDF\", \"Digital\", \"Download\" as 'TRASH_RISK'.
4. Classify keywords into 4 Quadrants:
   - GOLD_MINE: High Search Volume (relative to this dataset), Low Competition.
   - LONG_TAIL: Low Search, Low Competition (Specific, high conversion).
   - WAR_ZONE: High Search, High Competition (Hard to rank).
   - TRASH_RISK: Low Search + High Comp OR Wrong Intent (Digital terms for physical items).
5. Provide value analysis and pricing strategy suggestions.
6. Suggest 5-10 new keywords to research based on style/occasion gaps.

Raw Data to parse:
{raw_data}"
    )
}

/// Bound pasted research text before it goes on the wire. Oversized input is
/// not an error: the first [`MAX_RAW_TEXT_LEN`] characters are kept and a
/// visible marker is appended.
pub fn clamp_raw_data(raw_data: &str) -> Cow<'_, str> {
    if raw_data.chars().count() <= MAX_RAW_TEXT_LEN {
        return Cow::Borrowed(raw_data);
    }
    let mut clamped: String = raw_data.chars().take(MAX_RAW_TEXT_LEN).collect();
    clamped.push_str(TRUNCATION_MARKER);
    Cow::Owned(clamped)
}

/// Image parts first, one text instruction last — the part order the
/// `generateContent` call expects.
fn build_parts(images: &[PreparedImage], instruction: String) -> Vec<Part> {
    let mut parts: Vec<Part> = images
        .iter()
        .map(|img| Part::jpeg(img.encoded.clone()))
        .collect();
    parts.push(Part::text(instruction));
    parts
}

/// Ask the model for research phrases to feed a keyword tool. Checks its own
/// precondition so no request is ever issued for an empty upload list.
pub async fn generate_keyword_ideas(
    client: &GeminiClient,
    model: &str,
    images: &[PreparedImage],
) -> Result<Vec<String>> {
    if images.is_empty() {
        return Err(Error::EmptyInput(
            "Upload at least one product image first.".to_string(),
        ));
    }

    let parts = build_parts(images, IDEAS_PROMPT.to_string());
    let text = client
        .generate(model, parts, suggestions_schema(), None)
        .await
        .map_err(|e| Error::Generation(e.to_string()))?;

    let parsed: KeywordSuggestions =
        serde_json::from_str(&text).map_err(|e| Error::Generation(e.to_string()))?;
    Ok(parsed.suggestions)
}

/// Run the full report: images + (clamped) raw research text in, one
/// schema-conformant [`AnalysisResult`] out. Nothing is accepted partially —
/// a reply that misses the schema is a failure.
pub async fn analyze_seo_data(
    client: &GeminiClient,
    model: &str,
    images: &[PreparedImage],
    raw_data: &str,
) -> Result<AnalysisResult> {
    if images.is_empty() {
        return Err(Error::EmptyInput(
            "Upload at least one product image first.".to_string(),
        ));
    }
    if raw_data.trim().is_empty() {
        return Err(Error::EmptyInput(
            "Paste some keyword research data first.".to_string(),
        ));
    }

    let prompt = analysis_prompt(&clamp_raw_data(raw_data));
    let parts = build_parts(images, prompt);
    let text = client
        .generate(model, parts, analysis_schema(), Some(SYSTEM_INSTRUCTION))
        .await
        .map_err(|e| Error::Analysis(e.to_string()))?;

    serde_json::from_str(&text).map_err(|e| Error::Analysis(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    /// Serve exactly one canned HTTP response on an ephemeral port and return
    /// the base URL to point the client at.
    async fn serve_one_response(body: String) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                loop {
                    let n = match socket.read(&mut buf).await {
                        Ok(n) => n,
                        Err(_) => 0,
                    };
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                    if request_complete(&request) {
                        break;
                    }
                }
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        format!("http://{}", addr)
    }

    fn request_complete(request: &[u8]) -> bool {
        let Some(header_end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
            return false;
        };
        let headers = String::from_utf8_lossy(&request[..header_end]);
        let content_length = headers
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        request.len() >= header_end + 4 + content_length
    }

    /// Gemini envelope whose candidate text is `text`.
    fn envelope_with_text(text: &str) -> String {
        serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}]}
            }]
        })
        .to_string()
    }

    fn fake_image(encoded: &str) -> PreparedImage {
        PreparedImage {
            id: "t".to_string(),
            path: None,
            width: 10,
            height: 10,
            encoded: encoded.to_string(),
        }
    }

    #[test]
    fn short_text_passes_through_unchanged() {
        let text = "Cute Mug 1200 searches 300 competition";
        let clamped = clamp_raw_data(text);
        assert!(matches!(clamped, Cow::Borrowed(_)));
        assert_eq!(clamped, text);
    }

    #[test]
    fn oversized_text_keeps_exactly_the_first_60k_chars_plus_marker() {
        let text = "x".repeat(MAX_RAW_TEXT_LEN + 500);
        let clamped = clamp_raw_data(&text);
        let expected_prefix: String = text.chars().take(MAX_RAW_TEXT_LEN).collect();
        assert_eq!(
            clamped.as_ref(),
            format!("{}{}", expected_prefix, TRUNCATION_MARKER)
        );
        assert_eq!(
            clamped.chars().count(),
            MAX_RAW_TEXT_LEN + TRUNCATION_MARKER.chars().count()
        );
    }

    #[test]
    fn boundary_length_text_is_not_marked() {
        let text = "y".repeat(MAX_RAW_TEXT_LEN);
        assert_eq!(clamp_raw_data(&text).as_ref(), text.as_str());
    }

    #[test]
    fn parts_are_images_then_instruction() {
        let images = vec![fake_image("AAAA"), fake_image("BBBB")];
        let parts = build_parts(&images, "do the thing".to_string());
        assert_eq!(parts.len(), 3);
        assert!(matches!(&parts[0], Part::InlineData { .. }));
        assert!(matches!(&parts[1], Part::InlineData { .. }));
        match &parts[2] {
            Part::Text { text } => assert_eq!(text, "do the thing"),
            _ => panic!("last part must be the instruction"),
        }
    }

    #[test]
    fn analysis_schema_names_all_required_fields() {
        let schema = analysis_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(
            required,
            vec![
                "productContext",
                "keywords",
                "valueAnalysis",
                "pricingStrategy",
                "nextSteps"
            ]
        );
        let quadrants = &schema["properties"]["keywords"]["items"]["properties"]["quadrant"]["enum"];
        assert_eq!(
            quadrants,
            &json!(["GOLD_MINE", "LONG_TAIL", "WAR_ZONE", "TRASH_RISK"])
        );
    }

    #[tokio::test]
    async fn ideas_with_no_images_fails_before_any_network_call() {
        // Unroutable base URL: if the precondition check were skipped, this
        // would surface as Generation, not EmptyInput.
        let client = GeminiClient::new("test-key").with_base_url("http://127.0.0.1:1");
        let err = generate_keyword_ideas(&client, "gemini-2.5-flash", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptyInput(_)));
    }

    #[tokio::test]
    async fn analyze_with_blank_text_fails_with_empty_input() {
        let client = GeminiClient::new("test-key").with_base_url("http://127.0.0.1:1");
        let images = vec![fake_image("AAAA")];
        let err = analyze_seo_data(&client, "gemini-2.5-flash", &images, "   \n")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptyInput(_)));
    }

    #[tokio::test]
    async fn ideas_network_failure_maps_to_generation_error() {
        let client = GeminiClient::new("test-key").with_base_url("http://127.0.0.1:1");
        let images = vec![fake_image("AAAA")];
        let err = generate_keyword_ideas(&client, "gemini-2.5-flash", &images)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
    }

    #[tokio::test]
    async fn analyze_network_failure_maps_to_analysis_error() {
        let client = GeminiClient::new("test-key").with_base_url("http://127.0.0.1:1");
        let images = vec![fake_image("AAAA")];
        let err = analyze_seo_data(&client, "gemini-2.5-flash", &images, "Cute Mug 1200 300")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Analysis(_)));
    }

    #[tokio::test]
    async fn ideas_reply_that_is_not_json_maps_to_generation_error() {
        let base = serve_one_response(envelope_with_text("not json at all")).await;
        let client = GeminiClient::new("test-key").with_base_url(&base);
        let images = vec![fake_image("AAAA")];
        let err = generate_keyword_ideas(&client, "gemini-2.5-flash", &images)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
    }

    #[tokio::test]
    async fn analyze_reply_that_misses_the_schema_maps_to_analysis_error() {
        // Valid JSON, wrong shape: no productContext/keywords/etc.
        let base = serve_one_response(envelope_with_text("{\"suggestions\": []}")).await;
        let client = GeminiClient::new("test-key").with_base_url(&base);
        let images = vec![fake_image("AAAA")];
        let err = analyze_seo_data(&client, "gemini-2.5-flash", &images, "Cute Mug 1200 300")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Analysis(_)));
    }
}
