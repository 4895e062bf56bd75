//! Article generation service.
//!
//! # Responsibility
//! - Validate generation parameters before any generation attempt.
//! - Drive the external backend when one is configured, folding streamed
//!   fragments into a full response and parsing title/content markers.
//! - Fall back to deterministic template synthesis whenever the backend is
//!   absent, returns nothing usable, or fails.
//!
//! # Invariants
//! - The only error surfaced to callers is a parameter validation failure.
//! - Template output always contains the raw memo verbatim.

use crate::backend::{GenerationBackend, GenerationRequest};
use crate::model::article::{
    StructureType, Theme, CASUALNESS_LEVEL_MAX, CASUALNESS_LEVEL_MIN, EXPERIENCE_RATIO_MAX,
    EXPERIENCE_RATIO_MIN,
};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const GENERATION_TEMPERATURE: f32 = 0.7;
const GENERATION_MAX_OUTPUT_TOKENS: u32 = 2000;

const FALLBACK_TITLE: &str = "生成されたタイトル";
const FALLBACK_CONTENT: &str = "生成された本文";

/// Sentence-final particles indexed by casualness level 1..=5.
const TONE_PARTICLES: [&str; 5] = ["です", "である", "だ", "だよ", "だね"];

static TITLE_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(タイトル|title)").expect("valid title marker regex"));
static CONTENT_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(本文|内容|content)").expect("valid content marker regex"));
static TITLE_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(タイトル|title)[:：]\s*").expect("valid title prefix regex"));
static CONTENT_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(本文|内容|content)[:：]\s*").expect("valid content prefix regex")
});

/// Validation error for generation parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValidationError {
    EmptyOriginalMemo,
    ExperienceRatioOutOfRange(f64),
    CasualnessLevelOutOfRange(i64),
}

impl Display for ParamValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyOriginalMemo => write!(f, "original memo must not be blank"),
            Self::ExperienceRatioOutOfRange(value) => write!(
                f,
                "experience_ratio must be within {EXPERIENCE_RATIO_MIN}..={EXPERIENCE_RATIO_MAX}, got {value}"
            ),
            Self::CasualnessLevelOutOfRange(value) => write!(
                f,
                "casualness_level must be within {CASUALNESS_LEVEL_MIN}..={CASUALNESS_LEVEL_MAX}, got {value}"
            ),
        }
    }
}

impl Error for ParamValidationError {}

/// Error surfaced by [`ArticleGenerator::generate`].
///
/// Backend trouble is recovered internally, so invalid parameters are the
/// whole public failure surface.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratorError {
    InvalidParams(ParamValidationError),
}

impl Display for GeneratorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidParams(err) => write!(f, "{err}"),
        }
    }
}

impl Error for GeneratorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidParams(err) => Some(err),
        }
    }
}

/// Input parameters for one generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub original_memo: String,
    pub theme: Theme,
    pub experience_ratio: f64,
    pub casualness_level: i64,
    pub structure_type: StructureType,
}

impl GenerationParams {
    /// Checks parameter ranges; runs before any generation attempt.
    pub fn validate(&self) -> Result<(), ParamValidationError> {
        if self.original_memo.trim().is_empty() {
            return Err(ParamValidationError::EmptyOriginalMemo);
        }
        if !(EXPERIENCE_RATIO_MIN..=EXPERIENCE_RATIO_MAX).contains(&self.experience_ratio) {
            return Err(ParamValidationError::ExperienceRatioOutOfRange(
                self.experience_ratio,
            ));
        }
        if !(CASUALNESS_LEVEL_MIN..=CASUALNESS_LEVEL_MAX).contains(&self.casualness_level) {
            return Err(ParamValidationError::CasualnessLevelOutOfRange(
                self.casualness_level,
            ));
        }
        Ok(())
    }
}

/// Generated title/content pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArticle {
    pub title: String,
    pub content: String,
}

/// Article generator with external and template strategies.
pub struct ArticleGenerator<B: GenerationBackend> {
    backend: Option<B>,
}

impl<B: GenerationBackend> ArticleGenerator<B> {
    /// Creates a generator; `None` backend means template-only mode.
    pub fn new(backend: Option<B>) -> Self {
        Self { backend }
    }

    /// Generates a title/content pair from the memo and parameters.
    ///
    /// # Errors
    /// - `GeneratorError::InvalidParams` when the parameters fail range
    ///   checks. No other error escapes; backend failures fall back to the
    ///   template strategy.
    pub fn generate(&self, params: &GenerationParams) -> Result<GeneratedArticle, GeneratorError> {
        params.validate().map_err(GeneratorError::InvalidParams)?;

        if let Some(backend) = &self.backend {
            match generate_with_backend(backend, params) {
                Ok(article) => return Ok(article),
                Err(err) => {
                    warn!(
                        "event=generate_backend module=generator status=error error={err} fallback=template"
                    );
                }
            }
        }

        Ok(template_article(params))
    }
}

fn generate_with_backend<B: GenerationBackend>(
    backend: &B,
    params: &GenerationParams,
) -> Result<GeneratedArticle, String> {
    let request = GenerationRequest {
        prompt: build_prompt(params),
        temperature: GENERATION_TEMPERATURE,
        max_output_tokens: GENERATION_MAX_OUTPUT_TOKENS,
    };

    let fragments = backend
        .stream_generate(&request)
        .map_err(|err| err.to_string())?;

    let full_response = fragments.concat();
    if full_response.trim().is_empty() {
        return Err("empty backend response".to_string());
    }

    Ok(parse_generated_text(&full_response))
}

/// Parses the model response into a title/content pair.
///
/// Looks for a `タイトル`/`title` line and a `本文`/`内容`/`content` line in
/// order; when markers are missing or inverted, the first line is the title
/// and the remainder is the content. Marker prefixes are stripped.
fn parse_generated_text(response: &str) -> GeneratedArticle {
    let lines: Vec<&str> = response
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let title_index = lines.iter().position(|line| TITLE_MARKER_RE.is_match(line));
    let content_index = lines
        .iter()
        .position(|line| CONTENT_MARKER_RE.is_match(line));

    let (title, content) = match (title_index, content_index) {
        (Some(title_at), Some(content_at)) if title_at < content_at => {
            let title = lines
                .get(title_at + 1)
                .copied()
                .unwrap_or(FALLBACK_TITLE)
                .to_string();
            let content = if content_at + 1 < lines.len() {
                lines[content_at + 1..].join("\n")
            } else {
                FALLBACK_CONTENT.to_string()
            };
            (title, content)
        }
        _ => {
            let title = lines.first().copied().unwrap_or(FALLBACK_TITLE).to_string();
            let content = if lines.len() > 1 {
                lines[1..].join("\n")
            } else {
                FALLBACK_CONTENT.to_string()
            };
            (title, content)
        }
    };

    GeneratedArticle {
        title: TITLE_PREFIX_RE.replace(&title, "").into_owned(),
        content: CONTENT_PREFIX_RE.replace(&content, "").into_owned(),
    }
}

/// Builds the generation prompt from the guidance lookup tables.
fn build_prompt(params: &GenerationParams) -> String {
    format!(
        "以下の気づきメモをもとに、ブログ記事を生成してください。\n\n\
         【気づきメモ】\n{}\n\n\
         【生成条件】\n\
         - {}で記事を作成\n\
         - {}にする\n\
         - {}で執筆\n\
         - {}で構成\n\n\
         【出力形式】\n\
         タイトル: [ここにタイトル]\n\n\
         本文:\n\
         [ここに本文]\n\n\
         読者が共感し、実践したくなるような内容で、800-1200文字程度のブログ記事を作成してください。",
        params.original_memo,
        theme_context(params.theme),
        experience_guidance(params.experience_ratio),
        tone_guidance(params.casualness_level),
        structure_guidance(params.structure_type),
    )
}

fn theme_context(theme: Theme) -> &'static str {
    match theme {
        Theme::Coaching => "コーチングの視点から、読者の自己成長や目標達成を支援する内容",
        Theme::SelfCompassion => {
            "セルフコンパッション（自分への優しさ）の観点から、読者が自分を受け入れ、労われるような内容"
        }
    }
}

fn experience_guidance(experience_ratio: f64) -> &'static str {
    if experience_ratio > 0.7 {
        "個人的な体験や具体的なエピソードを豊富に織り交ぜた構成"
    } else if experience_ratio > 0.3 {
        "理論と体験のバランスを取った構成"
    } else {
        "理論的な説明を中心に、適度に体験談を加えた構成"
    }
}

fn tone_guidance(casualness_level: i64) -> &'static str {
    match casualness_level {
        1 => "丁寧で格式ある文体",
        2 => "やや丁寧な文体",
        3 => "親しみやすい文体",
        4 => "カジュアルで親しみやすい文体",
        _ => "非常にカジュアルで友達のような文体",
    }
}

fn structure_guidance(structure_type: StructureType) -> &'static str {
    match structure_type {
        StructureType::Kishotenketsu => "起承転結の構成（導入→展開→転換→結論）",
        StructureType::Standard => "問題提起→解決策提示→具体例→まとめの標準的な構成",
    }
}

/// Deterministic template strategy.
fn template_article(params: &GenerationParams) -> GeneratedArticle {
    let theme_title = match params.theme {
        Theme::Coaching => "コーチング",
        Theme::SelfCompassion => "セルフコンパッション",
    };

    let tone_index = (params.casualness_level - 1).clamp(0, 4) as usize;
    let tone = TONE_PARTICLES[tone_index];

    let memo_lead = params
        .original_memo
        .split('。')
        .next()
        .unwrap_or("")
        .trim();
    let title = format!("{memo_lead}から学ぶ{theme_title}の実践");

    let mut sections: Vec<String> = Vec::new();

    sections.push(format!("最近、こんなことを考えていました{tone}。"));
    sections.push(String::new());
    sections.push(params.original_memo.clone());
    sections.push(String::new());

    sections.push(match params.theme {
        Theme::Coaching => format!(
            "この体験から、コーチングの視点で考えてみると、いくつかの重要なポイントが見えてきます{tone}。"
        ),
        Theme::SelfCompassion => {
            format!("この気づきをセルフコンパッションの観点から深めてみたいと思います{tone}。")
        }
    });
    sections.push(String::new());

    if params.experience_ratio > 0.5 {
        sections.push("具体的な体験を振り返ってみると...".to_string());
        sections.push("私自身も同じような場面で...".to_string());
    } else {
        sections.push("理論的に考えてみると...".to_string());
        sections.push("研究によれば...".to_string());
    }
    sections.push(String::new());

    sections.push(match params.structure_type {
        StructureType::Kishotenketsu => format!(
            "ところで、この考え方は日常の様々な場面で応用できるのではないでしょうか{tone}。"
        ),
        StructureType::Standard => "つまり、この気づきから得られる教訓は...".to_string(),
    });
    sections.push(String::new());

    sections.push(format!(
        "読者の皆さんも、同じような体験をされたことがあるかもしれません{tone}。"
    ));
    sections.push(format!("少しでも参考になれば嬉しい{tone}。"));

    GeneratedArticle {
        title,
        content: sections.join("\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        build_prompt, parse_generated_text, template_article, GenerationParams, FALLBACK_CONTENT,
    };
    use crate::model::article::{StructureType, Theme};

    fn params(theme: Theme, ratio: f64, casualness: i64, structure: StructureType) -> GenerationParams {
        GenerationParams {
            original_memo: "今日は失敗から学んだ。小さな一歩を重ねたい。".to_string(),
            theme,
            experience_ratio: ratio,
            casualness_level: casualness,
            structure_type: structure,
        }
    }

    #[test]
    fn parse_extracts_marked_title_and_content() {
        let response = "タイトル:\n失敗は学びの種\n本文:\n一段落目。\n二段落目。";
        let article = parse_generated_text(response);
        assert_eq!(article.title, "失敗は学びの種");
        assert_eq!(article.content, "一段落目。\n二段落目。");
    }

    #[test]
    fn parse_strips_marker_prefix_from_values() {
        let response = "title: something\ntitle: 実際のタイトル\ncontent:\n本文です。";
        let article = parse_generated_text(response);
        assert_eq!(article.title, "実際のタイトル");
        assert_eq!(article.content, "本文です。");
    }

    #[test]
    fn parse_falls_back_to_first_line_when_markers_missing() {
        let response = "最初の行がタイトル\n残りが\n本文になる";
        let article = parse_generated_text(response);
        assert_eq!(article.title, "最初の行がタイトル");
        assert_eq!(article.content, "残りが\n本文になる");
    }

    #[test]
    fn parse_falls_back_when_markers_inverted() {
        let response = "本文: 先に出てきた\nタイトル: 後から出てきた";
        let article = parse_generated_text(response);
        // Inverted ordering drops to first-line-as-title; only the matching
        // marker kind is stripped from each value.
        assert_eq!(article.title, "本文: 先に出てきた");
        assert_eq!(article.content, "タイトル: 後から出てきた");
    }

    #[test]
    fn parse_single_line_uses_content_fallback() {
        let article = parse_generated_text("タイトルだけの応答");
        assert_eq!(article.title, "タイトルだけの応答");
        assert_eq!(article.content, FALLBACK_CONTENT);
    }

    #[test]
    fn prompt_embeds_memo_and_guidance() {
        let prompt = build_prompt(&params(Theme::Coaching, 0.8, 4, StructureType::Standard));
        assert!(prompt.contains("今日は失敗から学んだ。"));
        assert!(prompt.contains("コーチングの視点"));
        assert!(prompt.contains("個人的な体験や具体的なエピソード"));
        assert!(prompt.contains("カジュアルで親しみやすい文体"));
        assert!(prompt.contains("問題提起→解決策提示"));
        assert!(prompt.contains("タイトル:"));
        assert!(prompt.contains("本文:"));
    }

    #[test]
    fn prompt_guidance_switches_on_ratio_bands() {
        let balanced = build_prompt(&params(Theme::Coaching, 0.5, 3, StructureType::Standard));
        assert!(balanced.contains("理論と体験のバランス"));
        let theory = build_prompt(&params(Theme::Coaching, 0.2, 3, StructureType::Standard));
        assert!(theory.contains("理論的な説明を中心"));
    }

    #[test]
    fn template_title_derives_from_memo_lead_and_theme() {
        let article = template_article(&params(Theme::Coaching, 0.8, 4, StructureType::Standard));
        assert_eq!(article.title, "今日は失敗から学んだから学ぶコーチングの実践");
    }

    #[test]
    fn template_tone_particle_follows_casualness_level() {
        for (level, particle) in [(1, "です"), (2, "である"), (3, "だ"), (4, "だよ"), (5, "だね")] {
            let article =
                template_article(&params(Theme::Coaching, 0.8, level, StructureType::Standard));
            assert!(
                article
                    .content
                    .contains(&format!("最近、こんなことを考えていました{particle}。")),
                "level {level} should use particle {particle}"
            );
        }
    }

    #[test]
    fn template_switches_elaboration_at_half_ratio() {
        let experience =
            template_article(&params(Theme::Coaching, 0.6, 3, StructureType::Standard));
        assert!(experience.content.contains("具体的な体験を振り返ってみると"));

        let theory = template_article(&params(Theme::Coaching, 0.5, 3, StructureType::Standard));
        assert!(theory.content.contains("理論的に考えてみると"));
    }

    #[test]
    fn template_closing_depends_on_structure_type() {
        let kishotenketsu =
            template_article(&params(Theme::Coaching, 0.8, 3, StructureType::Kishotenketsu));
        assert!(kishotenketsu.content.contains("ところで、この考え方は"));

        let standard = template_article(&params(Theme::Coaching, 0.8, 3, StructureType::Standard));
        assert!(standard.content.contains("つまり、この気づきから得られる教訓は"));
    }
}
