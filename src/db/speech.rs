use chrono::Utc;

use super::DBClient;
use crate::models::SpeechPracticeRecord;

pub struct NewSpeechRecord<'a> {
    pub student_id: i64,
    pub topic: &'a str,
    pub text_content: &'a str,
    pub score: i32,
    pub pronunciation_score: i32,
    pub fluency_score: i32,
    pub feedback: &'a str,
}

pub trait SpeechExt {
    async fn create_speech_record(
        &self,
        record: &NewSpeechRecord<'_>,
    ) -> Result<SpeechPracticeRecord, sqlx::Error>;

    /// Most recent practice records of a student, newest first.
    async fn get_recent_speech_records(
        &self,
        student_id: i64,
        limit: i64,
    ) -> Result<Vec<SpeechPracticeRecord>, sqlx::Error>;

    async fn count_speech_records(&self, student_id: i64) -> Result<i64, sqlx::Error>;
}

impl SpeechExt for DBClient {
    async fn create_speech_record(
        &self,
        record: &NewSpeechRecord<'_>,
    ) -> Result<SpeechPracticeRecord, sqlx::Error> {
        sqlx::query_as::<_, SpeechPracticeRecord>(
            r#"
            INSERT INTO speech_practice_records
                (student_id, topic, text_content, score, pronunciation_score, fluency_score, feedback, practiced_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id, student_id, topic, text_content, audio_file, score, pronunciation_score,
                      fluency_score, feedback, practiced_at
            "#,
        )
        .bind(record.student_id)
        .bind(record.topic)
        .bind(record.text_content)
        .bind(record.score)
        .bind(record.pronunciation_score)
        .bind(record.fluency_score)
        .bind(record.feedback)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
    }

    async fn get_recent_speech_records(
        &self,
        student_id: i64,
        limit: i64,
    ) -> Result<Vec<SpeechPracticeRecord>, sqlx::Error> {
        sqlx::query_as::<_, SpeechPracticeRecord>(
            r#"
            SELECT id, student_id, topic, text_content, audio_file, score, pronunciation_score,
                   fluency_score, feedback, practiced_at
            FROM speech_practice_records
            WHERE student_id = ?
            ORDER BY practiced_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(student_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn count_speech_records(&self, student_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM speech_practice_records WHERE student_id = ?"#)
            .bind(student_id)
            .fetch_one(&self.pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::student;

    #[tokio::test]
    async fn recent_records_are_capped_and_newest_first() {
        let db = DBClient::in_memory().await;
        let (_, student) = student(&db, "speaker").await;

        for score in 70..82 {
            db.create_speech_record(&NewSpeechRecord {
                student_id: student.id,
                topic: "greetings",
                text_content: "ni hao",
                score,
                pronunciation_score: 80,
                fluency_score: 80,
                feedback: "ok",
            })
            .await
            .unwrap();
        }

        let recent = db.get_recent_speech_records(student.id, 10).await.unwrap();
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].score, 81);
        assert!(recent[0].audio_file.is_none());
        assert_eq!(db.count_speech_records(student.id).await.unwrap(), 12);
    }
}
