use memolog_core::db::open_db_in_memory;
use memolog_core::{
    Article, ArticleRepository, Feedback, FeedbackRepository, FeedbackService, RepoError,
    SqliteArticleRepository, SqliteFeedbackRepository, StructureType, Theme,
};
use uuid::Uuid;

fn seeded_article(conn: &rusqlite::Connection) -> Article {
    let repo = SqliteArticleRepository::try_new(conn).unwrap();
    let article = Article::new(
        "タイトル",
        "本文",
        "メモ",
        Theme::Coaching,
        0.5,
        3,
        StructureType::Standard,
    );
    repo.create_article(&article).unwrap();
    article
}

#[test]
fn create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let article = seeded_article(&conn);
    let repo = SqliteFeedbackRepository::try_new(&conn).unwrap();

    let feedback = Feedback::new(article.uuid, 4, "共感できた");
    let id = repo.create_feedback(&feedback).unwrap();

    let loaded = repo.get_feedback(article.uuid, id).unwrap().unwrap();
    assert_eq!(loaded.uuid, feedback.uuid);
    assert_eq!(loaded.article_uuid, article.uuid);
    assert_eq!(loaded.rating, 4);
    assert_eq!(loaded.comment, "共感できた");
    assert!(loaded.created_at > 0);
}

#[test]
fn create_for_missing_article_fails_before_insert() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteFeedbackRepository::try_new(&conn).unwrap();

    let orphan_parent = Uuid::new_v4();
    let err = repo
        .create_feedback(&Feedback::new(orphan_parent, 4, "迷子"))
        .unwrap_err();
    assert!(matches!(err, RepoError::ArticleNotFound(id) if id == orphan_parent));

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM feedbacks;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn validation_failure_blocks_create() {
    let conn = open_db_in_memory().unwrap();
    let article = seeded_article(&conn);
    let repo = SqliteFeedbackRepository::try_new(&conn).unwrap();

    let err = repo
        .create_feedback(&Feedback::new(article.uuid, 0, "低すぎ"))
        .unwrap_err();
    assert!(matches!(err, RepoError::InvalidFeedback(_)));

    let err = repo
        .create_feedback(&Feedback::new(article.uuid, 3, "   "))
        .unwrap_err();
    assert!(matches!(err, RepoError::InvalidFeedback(_)));
}

#[test]
fn update_existing_feedback() {
    let conn = open_db_in_memory().unwrap();
    let article = seeded_article(&conn);
    let repo = SqliteFeedbackRepository::try_new(&conn).unwrap();

    let mut feedback = Feedback::new(article.uuid, 2, "最初の印象");
    repo.create_feedback(&feedback).unwrap();

    feedback.rating = 5;
    feedback.comment = "読み直したら良かった".to_string();
    repo.update_feedback(&feedback).unwrap();

    let loaded = repo
        .get_feedback(article.uuid, feedback.uuid)
        .unwrap()
        .unwrap();
    assert_eq!(loaded.rating, 5);
    assert_eq!(loaded.comment, "読み直したら良かった");
}

#[test]
fn update_not_found_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let article = seeded_article(&conn);
    let repo = SqliteFeedbackRepository::try_new(&conn).unwrap();

    let feedback = Feedback::new(article.uuid, 4, "存在しない");
    let err = repo.update_feedback(&feedback).unwrap_err();
    assert!(matches!(err, RepoError::FeedbackNotFound(id) if id == feedback.uuid));
}

#[test]
fn feedback_is_scoped_to_its_article() {
    let conn = open_db_in_memory().unwrap();
    let article_a = seeded_article(&conn);
    let article_b = seeded_article(&conn);
    let repo = SqliteFeedbackRepository::try_new(&conn).unwrap();

    let feedback = Feedback::new(article_a.uuid, 4, "記事Aへの感想");
    repo.create_feedback(&feedback).unwrap();

    // The same feedback id is unreachable through another article.
    assert!(repo
        .get_feedback(article_b.uuid, feedback.uuid)
        .unwrap()
        .is_none());
    let err = repo
        .delete_feedback(article_b.uuid, feedback.uuid)
        .unwrap_err();
    assert!(matches!(err, RepoError::FeedbackNotFound(_)));

    assert!(repo
        .get_feedback(article_a.uuid, feedback.uuid)
        .unwrap()
        .is_some());
}

#[test]
fn list_returns_feedback_oldest_first() {
    let conn = open_db_in_memory().unwrap();
    let article = seeded_article(&conn);
    let repo = SqliteFeedbackRepository::try_new(&conn).unwrap();

    let mut first = Feedback::new(article.uuid, 3, "一件目");
    first.uuid = Uuid::parse_str("00000000-0000-4000-8000-000000000001").unwrap();
    let mut second = Feedback::new(article.uuid, 5, "二件目");
    second.uuid = Uuid::parse_str("00000000-0000-4000-8000-000000000002").unwrap();
    repo.create_feedback(&first).unwrap();
    repo.create_feedback(&second).unwrap();

    let listed = repo.list_feedback_for_article(article.uuid).unwrap();
    assert_eq!(listed.len(), 2);
    for pair in listed.windows(2) {
        let earlier = (&pair[0].created_at, pair[0].uuid.to_string());
        let later = (&pair[1].created_at, pair[1].uuid.to_string());
        assert!(
            earlier.0 < later.0 || (earlier.0 == later.0 && earlier.1 < later.1),
            "list must be ordered by created_at ASC, uuid ASC"
        );
    }
}

#[test]
fn delete_feedback_removes_single_entry() {
    let conn = open_db_in_memory().unwrap();
    let article = seeded_article(&conn);
    let service = FeedbackService::new(SqliteFeedbackRepository::try_new(&conn).unwrap());

    let keep = Feedback::new(article.uuid, 4, "残す");
    let remove = Feedback::new(article.uuid, 1, "消す");
    service.create_feedback(&keep).unwrap();
    service.create_feedback(&remove).unwrap();

    service.delete_feedback(article.uuid, remove.uuid).unwrap();

    let listed = service.list_feedback_for_article(article.uuid).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].uuid, keep.uuid);
}

#[test]
fn article_record_embeds_its_feedback() {
    let conn = open_db_in_memory().unwrap();
    let article = seeded_article(&conn);
    let articles = SqliteArticleRepository::try_new(&conn).unwrap();
    let feedbacks = SqliteFeedbackRepository::try_new(&conn).unwrap();

    feedbacks
        .create_feedback(&Feedback::new(article.uuid, 5, "刺さった"))
        .unwrap();

    let record = articles.get_article(article.uuid).unwrap().unwrap();
    assert_eq!(record.feedbacks.len(), 1);
    assert_eq!(record.feedbacks[0].rating, 5);
    assert_eq!(record.feedbacks[0].article_uuid, article.uuid);
}
