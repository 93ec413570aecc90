//! Prompt extraction from PNG generator metadata.
//!
//! Image generators embed their prompt in PNG text chunks: AUTOMATIC1111
//! and Forge write a `parameters` tEXt chunk, ComfyUI writes `prompt` or
//! `workflow` chunks holding node-graph JSON. Uploads pull these out so a
//! freshly dropped render arrives with its prompt already filled in.
//! Extraction is best-effort and never fails the upload.

use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;

const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPrompt {
    pub prompt: String,
    pub negative_prompt: String,
}

impl ExtractedPrompt {
    /// Single prompt-field rendering, negative appended when present.
    pub fn compose(&self) -> String {
        let positive = self.prompt.trim();
        let negative = self.negative_prompt.trim();
        if negative.is_empty() {
            positive.to_string()
        } else {
            format!("{}\n\nNegative: {}", positive, negative)
        }
    }
}

/// Return the prompt embedded in a PNG's metadata, if any.
pub fn extract_prompt_from_png(path: &Path) -> Option<ExtractedPrompt> {
    let bytes = fs::read(path).ok()?;
    let chunks = text_chunks(&bytes)?;
    if chunks.is_empty() {
        return None;
    }

    if let Some((_, text)) = find_chunk(&chunks, &["parameters"]) {
        return parse_a1111(text);
    }
    if let Some((_, text)) = find_chunk(&chunks, &["prompt", "workflow"]) {
        return parse_comfyui(text);
    }
    None
}

/// Walk PNG chunks collecting (keyword, text) pairs from tEXt and
/// uncompressed iTXt chunks. Returns None when the file is not a PNG.
fn text_chunks(bytes: &[u8]) -> Option<Vec<(String, String)>> {
    if bytes.len() < 8 || bytes[..8] != PNG_SIGNATURE {
        return None;
    }
    let mut chunks = Vec::new();
    let mut pos = 8usize;
    while pos + 8 <= bytes.len() {
        let len = u32::from_be_bytes(bytes[pos..pos + 4].try_into().ok()?) as usize;
        let kind = &bytes[pos + 4..pos + 8];
        let data_start = pos + 8;
        let data_end = data_start.checked_add(len)?;
        if data_end + 4 > bytes.len() {
            break;
        }
        let data = &bytes[data_start..data_end];
        match kind {
            b"tEXt" => {
                if let Some(sep) = data.iter().position(|&b| b == 0) {
                    chunks.push((latin1(&data[..sep]), latin1(&data[sep + 1..])));
                }
            }
            b"iTXt" => {
                if let Some(entry) = parse_itxt(data) {
                    chunks.push(entry);
                }
            }
            b"IEND" => break,
            _ => {}
        }
        // skip CRC
        pos = data_end + 4;
    }
    Some(chunks)
}

/// iTXt layout: keyword NUL compflag compmethod NUL-terminated language and
/// translated keyword, then UTF-8 text. Compressed payloads are skipped.
fn parse_itxt(data: &[u8]) -> Option<(String, String)> {
    let keyword_end = data.iter().position(|&b| b == 0)?;
    let keyword = latin1(&data[..keyword_end]);
    let rest = data.get(keyword_end + 1..)?;
    let compression_flag = *rest.first()?;
    if compression_flag != 0 {
        return None;
    }
    let rest = rest.get(2..)?;
    let lang_end = rest.iter().position(|&b| b == 0)?;
    let rest = rest.get(lang_end + 1..)?;
    let translated_end = rest.iter().position(|&b| b == 0)?;
    let text = String::from_utf8(rest.get(translated_end + 1..)?.to_vec()).ok()?;
    Some((keyword, text))
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn find_chunk<'a>(
    chunks: &'a [(String, String)],
    names: &[&str],
) -> Option<(&'a str, &'a str)> {
    for name in names {
        for (keyword, text) in chunks {
            if keyword.to_lowercase().starts_with(&name.to_lowercase()) {
                return Some((keyword.as_str(), text.as_str()));
            }
        }
    }
    None
}

/// AUTOMATIC1111/Forge style: first line is the positive prompt, a later
/// `Negative prompt:` line carries the negative.
fn parse_a1111(text: &str) -> Option<ExtractedPrompt> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let positive = lines.next()?.to_string();
    let negative = lines
        .find_map(|line| {
            let lower = line.to_lowercase();
            lower
                .starts_with("negative prompt:")
                .then(|| line["negative prompt:".len()..].trim().to_string())
        })
        .unwrap_or_default();
    Some(ExtractedPrompt {
        prompt: positive,
        negative_prompt: negative,
    })
}

/// ComfyUI node-graph JSON: first `CLIPTextEncode`-family node supplies the
/// positive (and optionally negative) text.
fn parse_comfyui(json_text: &str) -> Option<ExtractedPrompt> {
    let data: JsonValue = serde_json::from_str(json_text).ok()?;
    let data = data.as_object()?;
    let nodes = data
        .get("nodes")
        .or_else(|| data.get("workflow"))
        .cloned()
        .unwrap_or_else(|| JsonValue::Object(data.clone()));

    let mut positive: Option<String> = None;
    let mut negative: Option<String> = None;
    let mut handle_node = |node: &JsonValue| {
        let class_type = node.get("class_type").and_then(|c| c.as_str());
        if !matches!(class_type, Some("CLIPTextEncode") | Some("CLIPTextEncodeSDXL")) {
            return;
        }
        if let Some(widgets) = node.get("widgets_values").and_then(|w| w.as_array()) {
            if positive.is_none() {
                positive = widgets.first().and_then(|w| w.as_str()).map(String::from);
            }
            if negative.is_none() {
                negative = widgets.get(1).and_then(|w| w.as_str()).map(String::from);
            }
        }
        if let Some(inputs) = node.get("inputs") {
            if positive.is_none() {
                positive = inputs.get("text").and_then(|t| t.as_str()).map(String::from);
            }
            if negative.is_none() {
                negative = inputs
                    .get("negative")
                    .and_then(|t| t.as_str())
                    .map(String::from);
            }
        }
    };

    match &nodes {
        JsonValue::Object(map) => {
            for node in map.values() {
                handle_node(node);
            }
        }
        JsonValue::Array(list) => {
            for node in list {
                handle_node(node);
            }
        }
        _ => return None,
    }

    if positive.is_none() && negative.is_none() {
        return None;
    }
    Some(ExtractedPrompt {
        prompt: positive.unwrap_or_default(),
        negative_prompt: negative.unwrap_or_default(),
    })
}
