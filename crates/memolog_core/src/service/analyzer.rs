//! Rating-history analysis service.
//!
//! # Responsibility
//! - Aggregate the article/feedback corpus into a pattern report.
//! - Derive recommended generation parameters with a confidence score.
//!
//! # Invariants
//! - This service never writes; it only reads through the analytics
//!   repository.
//! - Averages over empty sets are represented as absent values, never zero.
//! - Best-value reductions walk distributions in ascending key order and
//!   replace only on a strictly greater average, so the smallest key wins
//!   ties deterministically.

use crate::model::article::{StructureType, Theme};
use crate::repo::analytics_repo::AnalyticsRepository;
use crate::repo::RepoResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Feedback rating at or above which an article counts as high-rated.
pub const HIGH_RATING_THRESHOLD: i64 = 4;

const DEFAULT_EXPERIENCE_RATIO: f64 = 0.6;
const DEFAULT_CASUALNESS_LEVEL: i64 = 3;
const DEFAULT_STRUCTURE_TYPE: StructureType = StructureType::Standard;

const MIN_ARTICLES_FOR_ANALYSIS: u64 = 10;
const MIN_ARTICLES_PER_THEME: u64 = 3;

/// Aggregate statistics for one theme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeStats {
    pub count: u64,
    /// Average feedback rating rounded to 2 decimals; absent without ratings.
    pub avg_rating: Option<f64>,
    pub feedback_count: u64,
}

/// Per-theme performance block of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemePerformance {
    pub coaching: ThemeStats,
    pub self_compassion: ThemeStats,
}

/// Average rating for one experience-ratio bin (rounded to one decimal).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioBinStat {
    pub ratio: f64,
    pub avg_rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioInsights {
    /// Bins in ascending ratio order; bins with no rated articles are absent.
    pub distribution: Vec<RatioBinStat>,
    pub best_performing_ratio: Option<f64>,
    pub recommendation: String,
}

/// Average rating for one casualness level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CasualnessStat {
    pub level: i64,
    pub avg_rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CasualnessInsights {
    pub distribution: Vec<CasualnessStat>,
    pub best_performing_level: Option<i64>,
    pub recommendation: String,
}

/// Average rating for one structure type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureStat {
    pub structure_type: StructureType,
    pub avg_rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureInsights {
    pub distribution: Vec<StructureStat>,
    /// Best-performing structure type; absent without any rated articles.
    pub recommendation: Option<StructureType>,
}

/// Full pattern report over the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternReport {
    pub theme_performance: ThemePerformance,
    pub experience_ratio_insights: RatioInsights,
    pub casualness_insights: CasualnessInsights,
    pub structure_insights: StructureInsights,
    pub improvement_suggestions: Vec<String>,
}

/// Recommended generation parameters with a confidence score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRecommendation {
    pub recommended_experience_ratio: f64,
    pub recommended_casualness_level: i64,
    pub recommended_structure_type: StructureType,
    /// Heuristic trust measure within `[0.1, 0.9]`.
    pub confidence_score: f64,
    /// Human-readable justification; empty without high-rated articles.
    pub reasoning: String,
}

/// Learning analyzer over the full article/feedback corpus.
pub struct LearningAnalyzer<R: AnalyticsRepository> {
    repo: R,
}

impl<R: AnalyticsRepository> LearningAnalyzer<R> {
    /// Creates an analyzer using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Computes the pattern report, or `None` for an empty corpus.
    pub fn analyze_patterns(&self) -> RepoResult<Option<PatternReport>> {
        let total_articles = self.repo.count_articles()?;
        if total_articles == 0 {
            return Ok(None);
        }

        let theme_performance = ThemePerformance {
            coaching: self.theme_stats(Theme::Coaching)?,
            self_compassion: self.theme_stats(Theme::SelfCompassion)?,
        };

        let ratio_distribution = self.repo.avg_rating_by_ratio_bin()?;
        let best_performing_ratio = best_key(&ratio_distribution);
        let experience_ratio_insights = RatioInsights {
            distribution: ratio_distribution
                .iter()
                .map(|&(ratio, avg_rating)| RatioBinStat { ratio, avg_rating })
                .collect(),
            best_performing_ratio,
            recommendation: ratio_recommendation(best_performing_ratio).to_string(),
        };

        let casualness_distribution = self.repo.avg_rating_by_casualness()?;
        let best_performing_level = best_key(&casualness_distribution);
        let casualness_insights = CasualnessInsights {
            distribution: casualness_distribution
                .iter()
                .map(|&(level, avg_rating)| CasualnessStat { level, avg_rating })
                .collect(),
            best_performing_level,
            recommendation: casualness_recommendation(best_performing_level).to_string(),
        };

        let structure_distribution = self.repo.avg_rating_by_structure()?;
        let structure_insights = StructureInsights {
            distribution: structure_distribution
                .iter()
                .map(|&(structure_type, avg_rating)| StructureStat {
                    structure_type,
                    avg_rating,
                })
                .collect(),
            recommendation: best_key(&structure_distribution),
        };

        let improvement_suggestions =
            self.improvement_suggestions(total_articles, &theme_performance)?;

        Ok(Some(PatternReport {
            theme_performance,
            experience_ratio_insights,
            casualness_insights,
            structure_insights,
            improvement_suggestions,
        }))
    }

    /// Derives recommended parameters from high-rated articles.
    ///
    /// Falls back to neutral defaults when no article has a feedback rating
    /// at or above [`HIGH_RATING_THRESHOLD`].
    pub fn generate_improved_prompt_parameters(&self) -> RepoResult<ParameterRecommendation> {
        let total_articles = self.repo.count_articles()?;
        let high_rated = self.repo.high_rated_articles(HIGH_RATING_THRESHOLD)?;
        let confidence_score = confidence_score(total_articles, high_rated.len() as u64);

        if high_rated.is_empty() {
            return Ok(ParameterRecommendation {
                recommended_experience_ratio: DEFAULT_EXPERIENCE_RATIO,
                recommended_casualness_level: DEFAULT_CASUALNESS_LEVEL,
                recommended_structure_type: DEFAULT_STRUCTURE_TYPE,
                confidence_score,
                reasoning: String::new(),
            });
        }

        let ratio_sum: f64 = high_rated
            .iter()
            .map(|article| article.experience_ratio)
            .sum();
        let mean_ratio = ratio_sum / high_rated.len() as f64;

        let mut level_counts: BTreeMap<i64, u64> = BTreeMap::new();
        for article in &high_rated {
            *level_counts.entry(article.casualness_level).or_default() += 1;
        }
        let modal_level = mode_key(level_counts.iter().map(|(&level, &count)| (level, count)))
            .unwrap_or(DEFAULT_CASUALNESS_LEVEL);

        let modal_structure = StructureType::ALL
            .iter()
            .copied()
            .map(|structure_type| {
                let count = high_rated
                    .iter()
                    .filter(|article| article.structure_type == structure_type)
                    .count() as u64;
                (structure_type, count)
            })
            .filter(|&(_, count)| count > 0)
            .fold(None::<(StructureType, u64)>, |best, candidate| match best {
                Some((_, best_count)) if candidate.1 <= best_count => best,
                _ => Some(candidate),
            })
            .map(|(structure_type, _)| structure_type)
            .unwrap_or(DEFAULT_STRUCTURE_TYPE);

        Ok(ParameterRecommendation {
            recommended_experience_ratio: mean_ratio,
            recommended_casualness_level: modal_level,
            recommended_structure_type: modal_structure,
            confidence_score,
            reasoning: build_reasoning(mean_ratio, modal_level),
        })
    }

    fn theme_stats(&self, theme: Theme) -> RepoResult<ThemeStats> {
        let count = self.repo.count_articles_by_theme(theme)?;
        let stats = self.repo.theme_feedback_stats(theme)?;
        Ok(ThemeStats {
            count,
            avg_rating: stats.avg_rating.map(round2),
            feedback_count: stats.feedback_count,
        })
    }

    fn improvement_suggestions(
        &self,
        total_articles: u64,
        theme_performance: &ThemePerformance,
    ) -> RepoResult<Vec<String>> {
        let mut suggestions = Vec::new();

        if total_articles < MIN_ARTICLES_FOR_ANALYSIS {
            suggestions.push("記事数を増やしてより正確な分析を行いましょう".to_string());
        }

        let without_feedback = self.repo.count_articles_without_feedback()?;
        if without_feedback > 0 {
            suggestions.push(format!(
                "{without_feedback}件の記事にフィードバックが未入力です"
            ));
        }

        let underrepresented = theme_performance.coaching.count < MIN_ARTICLES_PER_THEME
            || theme_performance.self_compassion.count < MIN_ARTICLES_PER_THEME;
        if underrepresented {
            suggestions.push(
                "両方のテーマ（コーチング・セルフコンパッション）でより多くの記事を書くことで、比較分析が可能になります"
                    .to_string(),
            );
        }

        Ok(suggestions)
    }
}

/// Confidence thresholds, evaluated in this exact order (first match wins).
fn confidence_score(total_articles: u64, high_rated_count: u64) -> f64 {
    if total_articles < 3 {
        return 0.1;
    }
    if total_articles < 10 {
        return 0.3;
    }
    if high_rated_count < 3 {
        return 0.5;
    }

    let consistency = high_rated_count as f64 / total_articles as f64;
    (0.3 + consistency).min(0.9)
}

fn build_reasoning(mean_ratio: f64, modal_level: i64) -> String {
    let ratio_percent = (mean_ratio * 100.0) as i64;
    let ratio_part = if mean_ratio > 0.7 {
        format!("高い体験比率({ratio_percent}%)が読者の共感を得やすい傾向があります")
    } else if mean_ratio < 0.3 {
        format!("理論重視のアプローチ(体験比率{ratio_percent}%)が効果的です")
    } else {
        format!("体験と理論のバランス({ratio_percent}%)が最適です")
    };

    let level_part = match modal_level {
        1 | 2 => "丁寧で格式ある文体が読者に好まれています",
        3 => "親しみやすい標準的な文体が効果的です",
        _ => "カジュアルで親近感のある文体が成功しています",
    };

    format!("{ratio_part}。{level_part}。")
}

fn ratio_recommendation(best_ratio: Option<f64>) -> &'static str {
    match best_ratio {
        None => "データ不足のため、0.5-0.7の範囲で試してみてください",
        Some(ratio) if ratio <= 0.3 => "理論的な説明を中心とした構成が効果的です",
        Some(ratio) if ratio <= 0.7 => "体験と理論のバランスが取れた構成が最適です",
        Some(_) => "個人的な体験を豊富に含む構成が読者の共感を得ています",
    }
}

fn casualness_recommendation(best_level: Option<i64>) -> &'static str {
    match best_level {
        None => "カジュアル度3（標準的な親しみやすさ）から始めることをお勧めします",
        Some(1) => "フォーマルで丁寧な文体が最も効果的です",
        Some(2) => "やや丁寧な文体が読者に好まれています",
        Some(3) => "親しみやすい標準的な文体が最適です",
        Some(4) => "カジュアルで親近感のある文体が成功しています",
        Some(_) => "非常にカジュアルで友達のような文体が効果的です",
    }
}

/// Returns the key with the highest average from an ascending distribution.
///
/// Strictly-greater comparison keeps the first (smallest) key on ties.
fn best_key<K: Copy>(distribution: &[(K, f64)]) -> Option<K> {
    let mut best: Option<(K, f64)> = None;
    for &(key, avg) in distribution {
        match best {
            Some((_, best_avg)) if avg <= best_avg => {}
            _ => best = Some((key, avg)),
        }
    }
    best.map(|(key, _)| key)
}

/// Returns the key with the highest count; first key wins ties.
fn mode_key<K: Copy>(counts: impl Iterator<Item = (K, u64)>) -> Option<K> {
    let mut best: Option<(K, u64)> = None;
    for (key, count) in counts {
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((key, count)),
        }
    }
    best.map(|(key, _)| key)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::{
        best_key, build_reasoning, casualness_recommendation, confidence_score, mode_key,
        ratio_recommendation, round2,
    };

    #[test]
    fn confidence_follows_threshold_order() {
        assert_eq!(confidence_score(0, 0), 0.1);
        assert_eq!(confidence_score(2, 2), 0.1);
        assert_eq!(confidence_score(9, 9), 0.3);
        assert_eq!(confidence_score(12, 2), 0.5);
        // min(0.9, 0.3 + 6/15) = 0.7, modulo float addition noise
        assert!((confidence_score(15, 6) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn confidence_is_capped_at_nine_tenths() {
        assert_eq!(confidence_score(10, 10), 0.9);
    }

    #[test]
    fn ratio_recommendation_uses_range_boundaries() {
        assert!(ratio_recommendation(None).contains("データ不足"));
        assert!(ratio_recommendation(Some(0.3)).contains("理論的な説明"));
        assert!(ratio_recommendation(Some(0.4)).contains("バランス"));
        assert!(ratio_recommendation(Some(0.7)).contains("バランス"));
        assert!(ratio_recommendation(Some(0.8)).contains("体験を豊富に含む"));
    }

    #[test]
    fn casualness_recommendation_covers_all_levels() {
        assert!(casualness_recommendation(None).contains("カジュアル度3"));
        for level in 1..=5 {
            assert!(!casualness_recommendation(Some(level)).is_empty());
        }
    }

    #[test]
    fn best_key_prefers_smallest_key_on_tie() {
        let distribution = [(1_i64, 4.0), (3, 4.5), (5, 4.5)];
        assert_eq!(best_key(&distribution), Some(3));
        assert_eq!(best_key::<i64>(&[]), None);
    }

    #[test]
    fn mode_key_prefers_first_key_on_tie() {
        let counts = [(2_i64, 3_u64), (4, 3)];
        assert_eq!(mode_key(counts.iter().copied()), Some(2));
    }

    #[test]
    fn reasoning_combines_ratio_and_tone_phrases() {
        let reasoning = build_reasoning(0.8, 4);
        assert_eq!(
            reasoning,
            "高い体験比率(80%)が読者の共感を得やすい傾向があります。カジュアルで親近感のある文体が成功しています。"
        );

        let balanced = build_reasoning(0.5, 3);
        assert!(balanced.contains("体験と理論のバランス(50%)"));
        assert!(balanced.contains("親しみやすい標準的な文体"));
    }

    #[test]
    fn round2_keeps_two_decimals() {
        assert_eq!(round2(14.0 / 3.0), 4.67);
        assert_eq!(round2(3.333333), 3.33);
    }
}
