use chrono::{NaiveDate, Utc};

use super::DBClient;
use crate::models::{LeaveRequest, LeaveRequestView, LeaveStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveDecision {
    Approve,
    Reject,
}

impl LeaveDecision {
    pub fn status(&self) -> LeaveStatus {
        match self {
            LeaveDecision::Approve => LeaveStatus::Approved,
            LeaveDecision::Reject => LeaveStatus::Rejected,
        }
    }
}

/// Result of a teacher's approve/reject action.
#[derive(Debug)]
pub enum DecisionOutcome {
    Applied(LeaveRequest),
    NotFound,
    /// The request belongs to a course taught by someone else.
    NotOwner,
    /// The request already left `pending`; carries the status it holds.
    AlreadyDecided(LeaveStatus),
}

pub trait LeaveExt {
    async fn create_leave_request(
        &self,
        student_id: i64,
        course_id: i64,
        lesson_date: NaiveDate,
        reason: &str,
    ) -> Result<LeaveRequest, sqlx::Error>;

    async fn get_leave_request(&self, request_id: i64)
    -> Result<Option<LeaveRequest>, sqlx::Error>;

    /// A student's own requests, newest first.
    async fn get_student_leave_requests(
        &self,
        student_id: i64,
    ) -> Result<Vec<LeaveRequestView>, sqlx::Error>;

    /// Requests against the teacher's courses, newest first.
    async fn get_teacher_leave_requests(
        &self,
        teacher_id: i64,
    ) -> Result<Vec<LeaveRequestView>, sqlx::Error>;

    async fn count_student_pending_leaves(&self, student_id: i64) -> Result<i64, sqlx::Error>;

    async fn count_teacher_pending_leaves(&self, teacher_id: i64) -> Result<i64, sqlx::Error>;

    /// Move a pending request to approved or rejected.
    ///
    /// The update only matches rows still in `pending`, so of two racing
    /// decisions exactly one is applied and `processed_at` is written once.
    async fn decide_leave_request(
        &self,
        request_id: i64,
        teacher_id: i64,
        decision: LeaveDecision,
        comment: Option<&str>,
    ) -> Result<DecisionOutcome, sqlx::Error>;
}

impl LeaveExt for DBClient {
    async fn create_leave_request(
        &self,
        student_id: i64,
        course_id: i64,
        lesson_date: NaiveDate,
        reason: &str,
    ) -> Result<LeaveRequest, sqlx::Error> {
        sqlx::query_as::<_, LeaveRequest>(
            r#"
            INSERT INTO leave_requests (student_id, course_id, lesson_date, reason, requested_at, status)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, student_id, course_id, lesson_date, reason, requested_at, status, teacher_comment, processed_at
            "#,
        )
        .bind(student_id)
        .bind(course_id)
        .bind(lesson_date)
        .bind(reason)
        .bind(Utc::now())
        .bind(LeaveStatus::Pending)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_leave_request(
        &self,
        request_id: i64,
    ) -> Result<Option<LeaveRequest>, sqlx::Error> {
        sqlx::query_as::<_, LeaveRequest>(
            r#"
            SELECT id, student_id, course_id, lesson_date, reason, requested_at, status, teacher_comment, processed_at
            FROM leave_requests WHERE id = ?
            "#,
        )
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_student_leave_requests(
        &self,
        student_id: i64,
    ) -> Result<Vec<LeaveRequestView>, sqlx::Error> {
        sqlx::query_as::<_, LeaveRequestView>(
            r#"
            SELECT lr.id, lr.student_id, lr.course_id, lr.lesson_date, lr.reason, lr.requested_at,
                   lr.status, lr.teacher_comment, lr.processed_at,
                   c.name AS course_name, s.full_name AS student_name
            FROM leave_requests lr
            JOIN courses c ON c.id = lr.course_id
            JOIN student_profiles s ON s.id = lr.student_id
            WHERE lr.student_id = ?
            ORDER BY lr.requested_at DESC, lr.id DESC
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_teacher_leave_requests(
        &self,
        teacher_id: i64,
    ) -> Result<Vec<LeaveRequestView>, sqlx::Error> {
        sqlx::query_as::<_, LeaveRequestView>(
            r#"
            SELECT lr.id, lr.student_id, lr.course_id, lr.lesson_date, lr.reason, lr.requested_at,
                   lr.status, lr.teacher_comment, lr.processed_at,
                   c.name AS course_name, s.full_name AS student_name
            FROM leave_requests lr
            JOIN courses c ON c.id = lr.course_id
            JOIN student_profiles s ON s.id = lr.student_id
            WHERE c.teacher_id = ?
            ORDER BY lr.requested_at DESC, lr.id DESC
            "#,
        )
        .bind(teacher_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn count_student_pending_leaves(&self, student_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM leave_requests WHERE student_id = ? AND status = 'pending'"#,
        )
        .bind(student_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn count_teacher_pending_leaves(&self, teacher_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM leave_requests lr
            JOIN courses c ON c.id = lr.course_id
            WHERE c.teacher_id = ? AND lr.status = 'pending'
            "#,
        )
        .bind(teacher_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn decide_leave_request(
        &self,
        request_id: i64,
        teacher_id: i64,
        decision: LeaveDecision,
        comment: Option<&str>,
    ) -> Result<DecisionOutcome, sqlx::Error> {
        let owner: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT c.teacher_id
            FROM leave_requests lr
            JOIN courses c ON c.id = lr.course_id
            WHERE lr.id = ?
            "#,
        )
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await?;

        match owner {
            None => return Ok(DecisionOutcome::NotFound),
            Some(owner) if owner != teacher_id => return Ok(DecisionOutcome::NotOwner),
            Some(_) => {}
        }

        let applied = sqlx::query_as::<_, LeaveRequest>(
            r#"
            UPDATE leave_requests
            SET status = ?, teacher_comment = ?, processed_at = ?
            WHERE id = ? AND status = 'pending'
            RETURNING id, student_id, course_id, lesson_date, reason, requested_at, status, teacher_comment, processed_at
            "#,
        )
        .bind(decision.status())
        .bind(comment)
        .bind(Utc::now())
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(request) = applied {
            return Ok(DecisionOutcome::Applied(request));
        }

        Ok(match self.get_leave_request(request_id).await? {
            Some(current) => DecisionOutcome::AlreadyDecided(current.status),
            None => DecisionOutcome::NotFound,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{CourseExt, EnrollmentExt};
    use crate::test_utils::{new_course, student, teacher};

    struct Fixture {
        db: DBClient,
        owner: i64,
        stranger: i64,
        request_id: i64,
    }

    async fn fixture() -> Fixture {
        let db = DBClient::in_memory().await;
        let (_, owner) = teacher(&db, "owner").await;
        let (_, stranger) = teacher(&db, "stranger").await;
        let course = db.create_course(&new_course(owner.id)).await.unwrap();
        let (_, student) = student(&db, "pupil").await;
        db.enroll_student(student.id, course.id).await.unwrap();

        let request = db
            .create_leave_request(
                student.id,
                course.id,
                NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
                "fever",
            )
            .await
            .unwrap();

        Fixture {
            db,
            owner: owner.id,
            stranger: stranger.id,
            request_id: request.id,
        }
    }

    #[tokio::test]
    async fn new_request_is_pending() {
        let f = fixture().await;
        let request = f.db.get_leave_request(f.request_id).await.unwrap().unwrap();
        assert_eq!(request.status, LeaveStatus::Pending);
        assert!(request.processed_at.is_none());
        assert_eq!(f.db.count_teacher_pending_leaves(f.owner).await.unwrap(), 1);
        assert_eq!(f.db.count_teacher_pending_leaves(f.stranger).await.unwrap(), 0);
        assert_eq!(
            f.db.count_student_pending_leaves(request.student_id).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn non_owner_cannot_decide() {
        let f = fixture().await;
        let outcome = f
            .db
            .decide_leave_request(f.request_id, f.stranger, LeaveDecision::Approve, None)
            .await
            .unwrap();
        assert!(matches!(outcome, DecisionOutcome::NotOwner));

        let request = f.db.get_leave_request(f.request_id).await.unwrap().unwrap();
        assert_eq!(request.status, LeaveStatus::Pending);
        assert!(request.processed_at.is_none());
    }

    #[tokio::test]
    async fn second_decision_keeps_the_first() {
        let f = fixture().await;
        let first = match f
            .db
            .decide_leave_request(f.request_id, f.owner, LeaveDecision::Approve, Some("get well"))
            .await
            .unwrap()
        {
            DecisionOutcome::Applied(request) => request,
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert_eq!(first.status, LeaveStatus::Approved);
        assert_eq!(first.teacher_comment.as_deref(), Some("get well"));
        let stamped = first.processed_at.expect("processed_at stamped");

        let second = f
            .db
            .decide_leave_request(f.request_id, f.owner, LeaveDecision::Reject, None)
            .await
            .unwrap();
        assert!(matches!(
            second,
            DecisionOutcome::AlreadyDecided(LeaveStatus::Approved)
        ));

        let stored = f.db.get_leave_request(f.request_id).await.unwrap().unwrap();
        assert_eq!(stored.status, LeaveStatus::Approved);
        assert_eq!(stored.processed_at, Some(stamped));
        assert_eq!(stored.teacher_comment.as_deref(), Some("get well"));
    }

    #[tokio::test]
    async fn unknown_request_is_not_found() {
        let f = fixture().await;
        let outcome = f
            .db
            .decide_leave_request(4242, f.owner, LeaveDecision::Reject, None)
            .await
            .unwrap();
        assert!(matches!(outcome, DecisionOutcome::NotFound));
    }

    #[tokio::test]
    async fn views_carry_names() {
        let f = fixture().await;
        let for_teacher = f.db.get_teacher_leave_requests(f.owner).await.unwrap();
        assert_eq!(for_teacher.len(), 1);
        assert_eq!(for_teacher[0].course_name, "HSK2 Evening");
        assert_eq!(for_teacher[0].student_name, "pupil full name");
        assert!(f.db.get_teacher_leave_requests(f.stranger).await.unwrap().is_empty());

        let student_id = for_teacher[0].request.student_id;
        let for_student = f.db.get_student_leave_requests(student_id).await.unwrap();
        assert_eq!(for_student[0].request.id, f.request_id);
    }
}
