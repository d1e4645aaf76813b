use bootcamp_core::model::{InstructorId, LessonId, LessonProgress, LevelId, QuizScore};
use bootcamp_core::time::fixed_now;
use chrono::Duration;
use storage::repository::ProgressRepository;
use storage::sqlite::SqliteRepository;

fn ids() -> (InstructorId, LevelId) {
    (
        InstructorId::new("alex").unwrap(),
        LevelId::new("beginner").unwrap(),
    )
}

fn record(lesson: &str, score: u32, minutes: i64) -> LessonProgress {
    LessonProgress::completed(
        LessonId::new(lesson).unwrap(),
        QuizScore::new(score).unwrap(),
        fixed_now() + Duration::minutes(minutes),
    )
}

#[tokio::test]
async fn sqlite_upsert_preserves_insertion_order() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_progress_order?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    let (instructor, level) = ids();

    assert!(repo.level_progress(&instructor, &level).await.unwrap().is_none());

    repo.upsert_lesson_progress(&instructor, &level, &record("lesson-3", 60, 0))
        .await
        .unwrap();
    repo.upsert_lesson_progress(&instructor, &level, &record("lesson-1", 70, 1))
        .await
        .unwrap();
    repo.upsert_lesson_progress(&instructor, &level, &record("lesson-3", 95, 2))
        .await
        .unwrap();

    let progress = repo
        .level_progress(&instructor, &level)
        .await
        .unwrap()
        .expect("saved progress");
    assert_eq!(progress.len(), 2);
    let order: Vec<_> = progress
        .records()
        .iter()
        .map(|r| r.lesson_id().as_str())
        .collect();
    assert_eq!(order, ["lesson-3", "lesson-1"]);

    let updated = &progress.records()[0];
    assert!(updated.is_completed());
    assert_eq!(updated.quiz_score(), Some(QuizScore::new(95).unwrap()));
    assert_eq!(updated.completed_at(), fixed_now() + Duration::minutes(2));
}

#[tokio::test]
async fn sqlite_groups_instructor_progress_by_level() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_progress_levels?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    repo.migrate().await.expect("migrations are idempotent");

    let (instructor, beginner) = ids();
    let advanced = LevelId::new("advanced").unwrap();
    let other = InstructorId::new("sam").unwrap();

    repo.upsert_lesson_progress(&instructor, &beginner, &record("b1", 100, 0))
        .await
        .unwrap();
    repo.upsert_lesson_progress(&instructor, &advanced, &record("a1", 80, 1))
        .await
        .unwrap();
    repo.upsert_lesson_progress(&instructor, &beginner, &record("b2", 90, 2))
        .await
        .unwrap();
    repo.upsert_lesson_progress(&other, &beginner, &record("b1", 10, 3))
        .await
        .unwrap();

    let levels = repo.instructor_progress(&instructor).await.unwrap();
    assert_eq!(levels.len(), 2);
    assert_eq!(levels[0].0, advanced);
    assert_eq!(levels[0].1.len(), 1);
    assert_eq!(levels[1].0, beginner);
    assert_eq!(levels[1].1.completed_count(), 2);

    let others = repo.instructor_progress(&other).await.unwrap();
    assert_eq!(others.len(), 1);
}
