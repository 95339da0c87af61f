//! Character cards: JSON metadata embedded in a PNG `tEXt` chunk.

use std::path::Path;

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine as _;
use recap_core::error::{RecapError, Result};
use serde_json::Value;
use tracing::debug;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// Keyword of the text chunk that carries the card.
pub const CARD_KEYWORD: &str = "chara";

/// Pull the decoded card text out of raw PNG bytes.
///
/// Returns `None` for a non-PNG, a PNG without a `chara` text chunk, a
/// truncated chunk, or a payload that is not base64.
pub fn extract_card_text(bytes: &[u8]) -> Option<String> {
    if bytes.len() < PNG_SIGNATURE.len() || bytes[..8] != PNG_SIGNATURE {
        return None;
    }

    let mut offset = PNG_SIGNATURE.len();
    // Each chunk: 4-byte length, 4-byte type, data, 4-byte CRC.
    while offset + 8 <= bytes.len() {
        let length = u32::from_be_bytes(bytes[offset..offset + 4].try_into().ok()?) as usize;
        let kind = &bytes[offset + 4..offset + 8];
        let data_start = offset + 8;
        let data_end = data_start.checked_add(length)?;
        if data_end > bytes.len() {
            return None;
        }

        if kind == b"tEXt" {
            let data = &bytes[data_start..data_end];
            if let Some(nul) = data.iter().position(|&b| b == 0) {
                if nul > 0 && &data[..nul] == CARD_KEYWORD.as_bytes() {
                    return decode_payload(&data[nul + 1..]);
                }
            }
        }
        if kind == b"IEND" {
            break;
        }
        offset = data_end + 4;
    }
    None
}

/// Read and parse the card embedded in the PNG at `path`.
pub fn load_character_card(path: &Path) -> Result<Value> {
    let bytes = std::fs::read(path).map_err(|source| RecapError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let text = extract_card_text(&bytes).ok_or_else(|| RecapError::CardParse {
        path: path.to_path_buf(),
        reason: "no character data chunk".to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| RecapError::CardParse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Lenient variant of [`load_character_card`]: any failure is `None`.
pub fn read_character_card(path: &Path) -> Option<Value> {
    match load_character_card(path) {
        Ok(card) => Some(card),
        Err(e) => {
            debug!("{}", e);
            None
        }
    }
}

fn decode_payload(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let decoded = STANDARD
        .decode(&compact)
        .or_else(|_| STANDARD_NO_PAD.decode(compact.trim_end_matches('=')))
        .ok()?;
    Some(String::from_utf8_lossy(&decoded).into_owned())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
