//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `StudyStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use studyforge_core::domain::{Flashcard, QuizQuestion, ReviewState, StudyPack};
use studyforge_core::ports::{PortError, PortResult, StudyStore};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `StudyStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn load_children(
        &self,
        record: PackRecord,
    ) -> PortResult<StudyPack> {
        let cards = sqlx::query_as::<_, FlashcardRecord>(
            "SELECT id, front, back, last_reviewed, next_review_date, easiness_factor, \
             repetitions, interval_days \
             FROM flashcards WHERE pack_id = $1 ORDER BY position ASC",
        )
        .bind(record.id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let questions = sqlx::query_as::<_, QuizQuestionRecord>(
            "SELECT id, question, options, correct_answer \
             FROM quiz_questions WHERE pack_id = $1 ORDER BY position ASC",
        )
        .bind(record.id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(record.to_domain(
            cards.into_iter().map(FlashcardRecord::to_domain).collect(),
            questions
                .into_iter()
                .map(QuizQuestionRecord::to_domain)
                .collect(),
        ))
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct PackRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    summary: String,
    source_text: String,
    created_at: DateTime<Utc>,
}
impl PackRecord {
    fn to_domain(self, flashcards: Vec<Flashcard>, quiz: Vec<QuizQuestion>) -> StudyPack {
        StudyPack {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            flashcards,
            quiz,
            summary: self.summary,
            source_text: self.source_text,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct FlashcardRecord {
    id: Uuid,
    front: String,
    back: String,
    last_reviewed: Option<DateTime<Utc>>,
    next_review_date: Option<NaiveDate>,
    easiness_factor: f64,
    repetitions: i32,
    interval_days: i32,
}
impl FlashcardRecord {
    fn to_domain(self) -> Flashcard {
        Flashcard {
            id: self.id,
            front: self.front,
            back: self.back,
            review_state: ReviewState {
                last_reviewed: self.last_reviewed,
                next_review_date: self.next_review_date,
                easiness_factor: self.easiness_factor,
                repetitions: self.repetitions as u32,
                interval_days: self.interval_days as u32,
            },
        }
    }
}

#[derive(FromRow)]
struct QuizQuestionRecord {
    id: Uuid,
    question: String,
    options: Json<Vec<String>>,
    correct_answer: String,
}
impl QuizQuestionRecord {
    fn to_domain(self) -> QuizQuestion {
        QuizQuestion {
            id: self.id,
            question: self.question,
            options: self.options.0,
            correct_answer: self.correct_answer,
        }
    }
}

//=========================================================================================
// `StudyStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl StudyStore for DbAdapter {
    async fn create_study_pack(&self, pack: &StudyPack) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        sqlx::query(
            "INSERT INTO study_packs (id, user_id, title, summary, source_text, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(pack.id)
        .bind(pack.user_id)
        .bind(&pack.title)
        .bind(&pack.summary)
        .bind(&pack.source_text)
        .bind(pack.created_at)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        for (position, card) in pack.flashcards.iter().enumerate() {
            sqlx::query(
                "INSERT INTO flashcards (id, pack_id, position, front, back, last_reviewed, \
                 next_review_date, easiness_factor, repetitions, interval_days) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            )
            .bind(card.id)
            .bind(pack.id)
            .bind(position as i32)
            .bind(&card.front)
            .bind(&card.back)
            .bind(card.review_state.last_reviewed)
            .bind(card.review_state.next_review_date)
            .bind(card.review_state.easiness_factor)
            .bind(card.review_state.repetitions as i32)
            .bind(card.review_state.interval_days as i32)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }

        for (position, question) in pack.quiz.iter().enumerate() {
            sqlx::query(
                "INSERT INTO quiz_questions (id, pack_id, position, question, options, \
                 correct_answer) VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(question.id)
            .bind(pack.id)
            .bind(position as i32)
            .bind(&question.question)
            .bind(Json(&question.options))
            .bind(&question.correct_answer)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }

        tx.commit().await.map_err(unexpected)?;
        Ok(())
    }

    async fn get_study_pack(&self, pack_id: Uuid) -> PortResult<StudyPack> {
        let record = sqlx::query_as::<_, PackRecord>(
            "SELECT id, user_id, title, summary, source_text, created_at \
             FROM study_packs WHERE id = $1",
        )
        .bind(pack_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Study pack {} not found", pack_id)))?;

        self.load_children(record).await
    }

    async fn list_study_packs(&self, user_id: Uuid) -> PortResult<Vec<StudyPack>> {
        let records = sqlx::query_as::<_, PackRecord>(
            "SELECT id, user_id, title, summary, source_text, created_at \
             FROM study_packs WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let mut packs = Vec::with_capacity(records.len());
        for record in records {
            packs.push(self.load_children(record).await?);
        }
        Ok(packs)
    }

    async fn update_review_state(
        &self,
        pack_id: Uuid,
        flashcard_id: Uuid,
        state: &ReviewState,
    ) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE flashcards SET last_reviewed = $1, next_review_date = $2, \
             easiness_factor = $3, repetitions = $4, interval_days = $5 \
             WHERE id = $6 AND pack_id = $7",
        )
        .bind(state.last_reviewed)
        .bind(state.next_review_date)
        .bind(state.easiness_factor)
        .bind(state.repetitions as i32)
        .bind(state.interval_days as i32)
        .bind(flashcard_id)
        .bind(pack_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Flashcard {} not found in pack {}",
                flashcard_id, pack_id
            )));
        }
        Ok(())
    }

    async fn delete_study_pack(&self, pack_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM study_packs WHERE id = $1")
            .bind(pack_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Study pack {} not found",
                pack_id
            )));
        }
        Ok(())
    }
}
