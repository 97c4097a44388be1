// SPDX-FileCopyrightText: 2026 Voxgraph Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Language-aware sentence boundary detection.
//!
//! Splitting is terminator-driven: each language has an ordered list of
//! sentence-final markers, and the splitter repeatedly carves off the
//! earliest-terminated sentence. Ordering inside a list matters for
//! tie-breaking at the same position (longer Korean polite endings sit
//! before their single-syllable suffixes).

/// Korean polite endings first, then general punctuation. Also the default
/// list when the language is unknown.
const KO_ENDINGS: &[&str] = &[
    "습니다.", "입니다.", "합니다.", "됩니다.", "있습니다.", "없습니다.",
    "니다.", "세요.", "까요?", "나요?", "네요.", "군요.", "거든요.",
    "다.", "요.", "죠.", "요?", "죠?",
    ". ", "! ", "? ", ".\n", "!\n", "?\n",
    "。", "！", "？",
];

/// Japanese punctuation plus common verb endings (polite and plain forms).
const JA_ENDINGS: &[&str] = &[
    "。", "！", "？",
    "ます ", "です ", "ました ", "でした ",
    "ます", "です", "ました", "でした",
    "った ", "った", "だ ", "だ", "た ",
    "か ", "か", "ね ", "ね", "よ ", "よ",
    ". ", "! ", "? ",
];

/// Chinese ideographic punctuation plus common particles.
const ZH_ENDINGS: &[&str] = &[
    "。", "！", "？", "了 ", "了", "的 ",
    ". ", "! ", "? ",
];

/// ASCII sentence punctuation followed by whitespace.
const EN_ENDINGS: &[&str] = &[". ", "! ", "? ", ".\n", "!\n", "?\n"];

/// A sentence must exceed this many characters to be emitted.
const MIN_SENTENCE_CHARS: usize = 3;

/// Normalizes a BCP-47 code to a bare language: "ja-JP" -> "ja",
/// "cmn-Hans-CN" -> "zh".
pub fn normalize_language_code(code: Option<&str>) -> Option<String> {
    let code = code?;
    let lang = code.split('-').next()?.to_lowercase();
    let mapped = match lang.as_str() {
        "cmn" | "yue" | "wuu" => "zh",
        other => other,
    };
    Some(mapped.to_string())
}

/// Minimum buffer length for a force-flush, per language.
pub fn min_flush_length(language_code: Option<&str>) -> usize {
    match normalize_language_code(language_code).as_deref() {
        Some("ko") => 30,
        Some("ja") => 15,
        Some("zh") => 15,
        Some("en") => 50,
        _ => 20,
    }
}

fn endings_for(language: Option<&str>) -> &'static [&'static str] {
    match language {
        Some("ja") => JA_ENDINGS,
        Some("zh") => ZH_ENDINGS,
        Some("en") => EN_ENDINGS,
        _ => KO_ENDINGS,
    }
}

/// Carves complete sentences off the front of `text`.
///
/// Returns the emitted sentences and the unterminated remainder. Sentences
/// of [`MIN_SENTENCE_CHARS`] or fewer characters are discarded.
pub fn split_complete_sentences(
    text: &str,
    language_code: Option<&str>,
) -> (Vec<String>, String) {
    let language = normalize_language_code(language_code);
    let endings = endings_for(language.as_deref());

    let mut sentences = Vec::new();
    let mut remaining = text.to_string();

    loop {
        let mut best: Option<(usize, &str)> = None;
        for ending in endings {
            if let Some(idx) = remaining.find(ending) {
                let better = match best {
                    None => true,
                    Some((best_idx, _)) => idx < best_idx,
                };
                if better {
                    best = Some((idx, ending));
                }
            }
        }

        let Some((idx, ending)) = best else {
            break;
        };

        let cut = idx + ending.len();
        let sentence = remaining[..cut].trim().to_string();
        remaining = remaining[cut..].trim().to_string();
        if sentence.chars().count() > MIN_SENTENCE_CHARS {
            sentences.push(sentence);
        }
    }

    (sentences, remaining)
}
