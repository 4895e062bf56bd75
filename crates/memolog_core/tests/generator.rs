use memolog_core::{
    ArticleGenerator, BackendError, BackendResult, GeminiBackend, GenerationBackend,
    GenerationParams, GenerationRequest, GeneratorError, ParamValidationError, StructureType,
    Theme,
};

/// Backend stub replaying a fixed fragment stream.
struct ReplayBackend {
    fragments: Vec<String>,
}

impl GenerationBackend for ReplayBackend {
    fn stream_generate(&self, _request: &GenerationRequest) -> BackendResult<Vec<String>> {
        Ok(self.fragments.clone())
    }
}

/// Backend stub that always fails.
struct BrokenBackend;

impl GenerationBackend for BrokenBackend {
    fn stream_generate(&self, _request: &GenerationRequest) -> BackendResult<Vec<String>> {
        Err(BackendError::UnexpectedStatus {
            status: 503,
            body: "overloaded".to_string(),
        })
    }
}

fn params() -> GenerationParams {
    GenerationParams {
        original_memo: "今日は失敗から学んだ。".to_string(),
        theme: Theme::Coaching,
        experience_ratio: 0.8,
        casualness_level: 4,
        structure_type: StructureType::Standard,
    }
}

fn template_only() -> ArticleGenerator<GeminiBackend> {
    ArticleGenerator::new(None)
}

#[test]
fn template_strategy_produces_title_and_memo_verbatim() {
    let article = template_only().generate(&params()).unwrap();

    assert!(article.title.contains("学ぶ"));
    assert!(article.title.contains("コーチング"));
    assert!(article.content.contains("今日は失敗から学んだ。"));
    assert!(!article.title.is_empty());
    assert!(!article.content.is_empty());
}

#[test]
fn template_strategy_applies_casual_tone_particle() {
    let article = template_only().generate(&params()).unwrap();
    // casualness_level 4 selects the だよ particle
    assert!(article.content.contains("考えていましただよ。"));
}

#[test]
fn validation_rejects_blank_memo_before_any_generation() {
    let mut invalid = params();
    invalid.original_memo = "   ".to_string();

    let err = template_only().generate(&invalid).unwrap_err();
    assert!(matches!(
        err,
        GeneratorError::InvalidParams(ParamValidationError::EmptyOriginalMemo)
    ));
}

#[test]
fn validation_rejects_out_of_range_ratio() {
    for ratio in [-0.1, 1.1] {
        let mut invalid = params();
        invalid.experience_ratio = ratio;
        let err = template_only().generate(&invalid).unwrap_err();
        assert!(matches!(
            err,
            GeneratorError::InvalidParams(ParamValidationError::ExperienceRatioOutOfRange(_))
        ));
    }
}

#[test]
fn validation_rejects_out_of_range_casualness() {
    for level in [0, 6] {
        let mut invalid = params();
        invalid.casualness_level = level;
        let err = template_only().generate(&invalid).unwrap_err();
        assert!(matches!(
            err,
            GeneratorError::InvalidParams(ParamValidationError::CasualnessLevelOutOfRange(_))
        ));
    }
}

#[test]
fn validation_runs_before_backend_is_consulted() {
    struct PanickingBackend;
    impl GenerationBackend for PanickingBackend {
        fn stream_generate(&self, _request: &GenerationRequest) -> BackendResult<Vec<String>> {
            panic!("backend must not be called for invalid params");
        }
    }

    let generator = ArticleGenerator::new(Some(PanickingBackend));
    let mut invalid = params();
    invalid.experience_ratio = 2.0;
    assert!(generator.generate(&invalid).is_err());
}

#[test]
fn streamed_fragments_are_folded_and_parsed() {
    let backend = ReplayBackend {
        fragments: vec![
            "タイトル:\n失敗は".to_string(),
            "学びの種\n".to_string(),
            "本文:\n失敗を振り返る".to_string(),
            "と、次の一歩が見える。".to_string(),
        ],
    };
    let generator = ArticleGenerator::new(Some(backend));

    let article = generator.generate(&params()).unwrap();
    assert_eq!(article.title, "失敗は学びの種");
    assert_eq!(article.content, "失敗を振り返ると、次の一歩が見える。");
}

#[test]
fn backend_failure_falls_back_to_template() {
    let generator = ArticleGenerator::new(Some(BrokenBackend));

    let article = generator.generate(&params()).unwrap();
    assert!(article.title.contains("学ぶ"));
    assert!(article.content.contains("今日は失敗から学んだ。"));
}

#[test]
fn empty_backend_response_falls_back_to_template() {
    let generator = ArticleGenerator::new(Some(ReplayBackend {
        fragments: vec!["  ".to_string(), "\n".to_string()],
    }));

    let article = generator.generate(&params()).unwrap();
    assert!(article.content.contains("今日は失敗から学んだ。"));
}

#[test]
fn unmarked_backend_response_uses_first_line_as_title() {
    let generator = ArticleGenerator::new(Some(ReplayBackend {
        fragments: vec!["一行目の見出し\n二行目からが本文。\n続きの文。".to_string()],
    }));

    let article = generator.generate(&params()).unwrap();
    assert_eq!(article.title, "一行目の見出し");
    assert_eq!(article.content, "二行目からが本文。\n続きの文。");
}

#[test]
fn all_valid_parameter_combinations_produce_nonempty_output() {
    let generator = template_only();
    for theme in Theme::ALL {
        for structure_type in StructureType::ALL {
            for casualness_level in 1..=5 {
                for experience_ratio in [0.0, 0.3, 0.5, 0.7, 1.0] {
                    let params = GenerationParams {
                        original_memo: "小さな習慣が大きな変化を生む。".to_string(),
                        theme,
                        experience_ratio,
                        casualness_level,
                        structure_type,
                    };
                    let article = generator.generate(&params).unwrap();
                    assert!(!article.title.trim().is_empty());
                    assert!(!article.content.trim().is_empty());
                }
            }
        }
    }
}
