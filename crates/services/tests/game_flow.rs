use std::sync::Arc;

use chrono::{DateTime, Utc};
use quiz_core::model::{Choice, GameSession, Player, QuestionId, Role, SessionId};
use quiz_core::time::fixed_now;
use services::{
    Clock, GameError, GameService, HintOutcome, QuestionCatalog, RandomSource, SessionSnapshot,
};
use storage::Storage;
use storage::repository::{GameStartPersistence, NewPlayerRecord, StorageError};

/// Deterministic selection: always the lowest-id candidate.
struct FirstPick;

impl RandomSource for FirstPick {
    fn pick(&self, _len: usize) -> usize {
        0
    }
}

async fn service_for(storage: &Storage) -> GameService {
    let catalog = QuestionCatalog::load_seeded(storage.questions.as_ref())
        .await
        .unwrap();
    GameService::from_storage(Clock::fixed(fixed_now()), Arc::new(catalog), storage)
        .with_random(Arc::new(FirstPick))
}

async fn in_memory_service() -> GameService {
    service_for(&Storage::in_memory()).await
}

fn shown(snapshot: &SessionSnapshot) -> QuestionId {
    snapshot
        .current_question
        .as_ref()
        .map(|q| q.id)
        .expect("a question is shown")
}

fn choice_for(service: &GameService, question: QuestionId, correct: bool) -> Choice {
    let right = service.catalog().get(question).unwrap().correct();
    if correct {
        right
    } else {
        Choice::ALL.into_iter().find(|c| *c != right).unwrap()
    }
}

async fn answer(service: &GameService, snapshot: &SessionSnapshot, correct: bool) -> SessionSnapshot {
    let question = shown(snapshot);
    service
        .submit_answer(
            snapshot.session_id,
            question,
            choice_for(service, question, correct),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn four_correct_answers_complete_the_game() {
    let service = in_memory_service().await;
    let mut snapshot = service.start_new_game("Ada", Role::Front).await.unwrap();
    assert_eq!(snapshot.stage.value(), 1);
    assert_eq!((snapshot.score, snapshot.streak), (0, 0));
    assert!(!snapshot.perk_used);

    let expected = [(2, 10, 1), (3, 20, 2), (4, 35, 3), (4, 50, 4)];
    for (stage, score, streak) in expected {
        snapshot = answer(&service, &snapshot, true).await;
        assert_eq!(snapshot.stage.value(), stage);
        assert_eq!(snapshot.score, score);
        assert_eq!(snapshot.streak, streak);
    }
    assert!(snapshot.completed);
    assert!(snapshot.current_question.is_none());
    assert_eq!(snapshot.total_answers, 4);
    assert!((snapshot.accuracy - 100.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn completed_session_rejects_further_answers() {
    let service = in_memory_service().await;
    let mut snapshot = service.start_new_game("Ada", Role::Back).await.unwrap();
    let mut last_question = shown(&snapshot);
    for _ in 0..4 {
        last_question = shown(&snapshot);
        snapshot = answer(&service, &snapshot, true).await;
    }
    assert!(snapshot.completed);

    let err = service
        .submit_answer(snapshot.session_id, last_question, Choice::A)
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::Completed));

    let after = service.build_snapshot(snapshot.session_id).await.unwrap();
    assert_eq!(after, snapshot);
}

#[tokio::test]
async fn wrong_answer_resets_streak_and_logs_a_miss() {
    let service = in_memory_service().await;
    let start = service.start_new_game("Ada", Role::Mobile).await.unwrap();

    let snapshot = answer(&service, &start, false).await;
    assert_eq!(snapshot.stage, start.stage);
    assert_eq!(snapshot.score, 0);
    assert_eq!(snapshot.streak, 0);
    assert_eq!(snapshot.total_answers, 1);
    assert_eq!(snapshot.correct_answers, 0);
    // The missed question was seen, so a fresh one is offered.
    assert_ne!(shown(&snapshot), shown(&start));
}

#[tokio::test]
async fn back_perk_recovers_from_a_miss_once() {
    let service = in_memory_service().await;
    let start = service.start_new_game("Ada", Role::Back).await.unwrap();
    let after_hit = answer(&service, &start, true).await;
    let after_miss = answer(&service, &after_hit, false).await;
    assert_eq!((after_miss.score, after_miss.streak), (10, 0));

    let perked = service.use_back_perk(start.session_id).await.unwrap();
    assert_eq!(perked.score, 15);
    assert_eq!(perked.streak, 1);
    assert!(perked.perks.back);
    assert!(perked.perk_used);

    let again = service.use_back_perk(start.session_id).await.unwrap();
    assert_eq!((again.score, again.streak, again.stage), (15, 1, perked.stage));
}

#[tokio::test]
async fn back_perk_without_a_miss_only_spends_the_flag() {
    let service = in_memory_service().await;
    let start = service.start_new_game("Ada", Role::Back).await.unwrap();

    let perked = service.use_back_perk(start.session_id).await.unwrap();
    assert_eq!((perked.score, perked.streak), (0, 0));
    assert!(perked.perks.back);

    let after_hit = answer(&service, &perked, true).await;
    assert_eq!(after_hit.score, 10);
}

#[tokio::test]
async fn front_perk_skips_a_stage_once() {
    let service = in_memory_service().await;
    let start = service.start_new_game("Ada", Role::Front).await.unwrap();

    let skipped = service
        .use_front_perk(start.session_id, Some(shown(&start)))
        .await
        .unwrap();
    assert_eq!(skipped.stage.value(), 2);
    assert_eq!((skipped.score, skipped.streak), (0, 0));
    assert!(skipped.perks.front);
    assert_eq!(skipped.current_question.as_ref().map(|q| q.stage), Some(skipped.stage));

    let again = service
        .use_front_perk(start.session_id, Some(shown(&skipped)))
        .await
        .unwrap();
    assert_eq!(again.stage.value(), 2);
}

#[tokio::test]
async fn front_perk_on_final_stage_avoids_the_shown_question() {
    let service = in_memory_service().await;
    let mut snapshot = service.start_new_game("Ada", Role::Front).await.unwrap();
    for _ in 0..3 {
        snapshot = answer(&service, &snapshot, true).await;
    }
    assert_eq!(snapshot.stage.value(), 4);
    let displayed = shown(&snapshot);

    let skipped = service
        .use_front_perk(snapshot.session_id, Some(displayed))
        .await
        .unwrap();
    assert_eq!(skipped.stage.value(), 4);
    assert_eq!(skipped.score, snapshot.score);
    assert!(skipped.perks.front);
    let next = shown(&skipped);
    assert_ne!(next, displayed);
    assert_eq!(service.catalog().get(next).unwrap().stage(), skipped.stage);
}

#[tokio::test]
async fn mobile_perk_reveals_the_shown_hint_once() {
    let service = in_memory_service().await;
    let start = service.start_new_game("Ada", Role::Mobile).await.unwrap();
    let question = shown(&start);

    let result = service
        .use_mobile_perk(start.session_id, Some(question))
        .await
        .unwrap();
    let expected = service.catalog().get(question).unwrap().hint().to_string();
    assert_eq!(result.hint, HintOutcome::Hint(expected));
    assert_eq!(shown(&result.snapshot), question);
    assert!(result.snapshot.perks.mobile);

    let again = service
        .use_mobile_perk(start.session_id, Some(question))
        .await
        .unwrap();
    assert_eq!(again.hint, HintOutcome::AlreadyUsed);
}

#[tokio::test]
async fn mobile_perk_without_questions_is_unavailable() {
    let storage = Storage::in_memory();
    let service = GameService::from_storage(
        Clock::fixed(fixed_now()),
        Arc::new(QuestionCatalog::default()),
        &storage,
    );
    let start = service.start_new_game("Ada", Role::Mobile).await.unwrap();
    assert!(start.current_question.is_none());

    let result = service.use_mobile_perk(start.session_id, None).await.unwrap();
    assert_eq!(result.hint, HintOutcome::Unavailable);
    assert!(result.snapshot.perks.mobile);
}

#[tokio::test]
async fn restarting_overwrites_role_and_resume_picks_latest() {
    let service = in_memory_service().await;
    let first = service.start_new_game("  Ada ", Role::Front).await.unwrap();
    let second = service.start_new_game("Ada", Role::Mobile).await.unwrap();
    assert_eq!(second.player_name, "Ada");
    assert_eq!(second.role, Role::Mobile);
    assert_ne!(first.session_id, second.session_id);

    let resumed = service.resume_last_game("Ada").await.unwrap().unwrap();
    assert_eq!(resumed.session_id, second.session_id);
    assert_eq!(resumed.role, Role::Mobile);

    let history = service.list_history("Ada").await.unwrap();
    let ids: Vec<_> = history.iter().map(|s| s.id()).collect();
    assert_eq!(ids, vec![second.session_id, first.session_id]);
}

#[tokio::test]
async fn unknown_players_have_nothing_to_resume() {
    let service = in_memory_service().await;
    assert!(service.resume_last_game("Nobody").await.unwrap().is_none());
    assert!(service.resume_last_game("   ").await.unwrap().is_none());
    assert!(service.list_history("Nobody").await.unwrap().is_empty());

    let err = service.start_new_game("   ", Role::Front).await.unwrap_err();
    assert!(matches!(err, GameError::Player(_)));
}

#[tokio::test]
async fn unknown_entities_are_not_found() {
    let service = in_memory_service().await;
    let err = service
        .build_snapshot(SessionId::new(404))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let start = service.start_new_game("Ada", Role::Front).await.unwrap();
    let err = service
        .submit_answer(start.session_id, QuestionId::new(9_999), Choice::A)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    let unchanged = service.build_snapshot(start.session_id).await.unwrap();
    assert_eq!(unchanged.total_answers, 0);

    let err = service.use_back_perk(SessionId::new(404)).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn scores_are_listed_highest_first() {
    let service = in_memory_service().await;

    // 30: hit, hit, miss, hit (streak back to 1).
    let mut thirty = service.start_new_game("Ada", Role::Front).await.unwrap();
    for correct in [true, true, false, true] {
        thirty = answer(&service, &thirty, correct).await;
    }
    let mut fifty = service.start_new_game("Bob", Role::Back).await.unwrap();
    for _ in 0..4 {
        fifty = answer(&service, &fifty, true).await;
    }
    let ten = service.start_new_game("Cy", Role::Mobile).await.unwrap();
    let ten = answer(&service, &ten, true).await;
    assert_eq!((thirty.score, fifty.score, ten.score), (30, 50, 10));

    let scores = service.list_scores().await.unwrap();
    let order: Vec<_> = scores
        .iter()
        .map(|s| (s.player_name.as_str(), s.score))
        .collect();
    assert_eq!(order, vec![("Bob", 50), ("Ada", 30), ("Cy", 10)]);
}

#[tokio::test]
async fn sqlite_backend_plays_a_full_round() {
    let storage = Storage::sqlite("sqlite:file:memdb_game_flow?mode=memory&cache=shared")
        .await
        .unwrap();
    let service = service_for(&storage).await;

    let start = service.start_new_game("Ada", Role::Back).await.unwrap();
    let missed = answer(&service, &start, false).await;
    let perked = service.use_back_perk(missed.session_id).await.unwrap();
    assert_eq!((perked.score, perked.streak), (5, 1));

    let hit = answer(&service, &perked, true).await;
    assert_eq!(hit.stage.value(), 2);
    assert_eq!(hit.score, 15);
    assert_eq!(hit.streak, 2);

    let resumed = service.resume_last_game("Ada").await.unwrap().unwrap();
    assert_eq!(resumed.score, 15);
    assert_eq!(resumed.total_answers, 2);
    assert!(resumed.perks.back);

    let scores = service.list_scores().await.unwrap();
    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0].score, 15);
}

/// Game-start store whose backend is down.
struct OfflineStarts;

#[async_trait::async_trait]
impl GameStartPersistence for OfflineStarts {
    async fn start_game(
        &self,
        _player: NewPlayerRecord,
        _started_at: DateTime<Utc>,
    ) -> Result<(Player, GameSession), StorageError> {
        Err(StorageError::Connection("offline".into()))
    }
}

#[tokio::test]
async fn storage_failures_propagate_unchanged() {
    let storage = Storage::in_memory();
    let service = GameService::new(
        Clock::fixed(fixed_now()),
        Arc::new(QuestionCatalog::default()),
        Arc::clone(&storage.players),
        Arc::clone(&storage.sessions),
        Arc::clone(&storage.answers),
        Arc::clone(&storage.answer_writes),
        Arc::new(OfflineStarts),
    );

    let err = service.start_new_game("Ada", Role::Front).await.unwrap_err();
    assert!(matches!(
        err,
        GameError::Storage(StorageError::Connection(ref msg)) if msg == "offline"
    ));
    assert!(service.list_scores().await.unwrap().is_empty());
    assert!(service.list_history("Ada").await.unwrap().is_empty());
}
