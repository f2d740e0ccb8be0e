use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
};
use serde_json::json;

use rollcall_server::checkin::maintenance::delete_term;
use rollcall_server::entity::{
    assignment, attendance, classroom, qr_session, student, subject, term, timetable_entry,
};

use crate::common::{TestApp, routes};

async fn stored_count(app: &TestApp, classroom_id: &str) -> i32 {
    classroom::Entity::find_by_id(classroom_id.to_string())
        .one(&app.db)
        .await
        .unwrap()
        .unwrap()
        .student_count
}

mod classroom_counts {
    use super::*;

    #[tokio::test]
    async fn recount_repairs_drifted_counts() {
        let app = TestApp::spawn().await;
        let school = app.seed_school(3).await;

        classroom::Entity::update_many()
            .col_expr(classroom::Column::StudentCount, Expr::value(42))
            .filter(classroom::Column::Id.eq(&school.classroom_a))
            .exec(&app.db)
            .await
            .unwrap();

        let res = app.post(routes::CLASSROOM_COUNTS, &json!({})).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["updated_classrooms"], 1);
        let fixed = res.body["classrooms"]
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["classroom_id"] == school.classroom_a.as_str())
            .unwrap();
        assert_eq!(fixed["previous"], 42);
        assert_eq!(fixed["current"], 3);
        assert_eq!(stored_count(&app, &school.classroom_a).await, 3);

        let res = app.post(routes::CLASSROOM_COUNTS, &json!({})).await;
        assert_eq!(res.body["updated_classrooms"], 0, "second run is a no-op");
    }

    #[tokio::test]
    async fn recount_can_be_scoped_to_a_term() {
        let app = TestApp::spawn().await;
        let school = app.seed_school(1).await;
        let other_term = app.create_term("2024/2", false).await;
        let other_room = app.create_classroom(&other_term, "M.2/1").await;

        for id in [&school.classroom_a, &other_room] {
            classroom::Entity::update_many()
                .col_expr(classroom::Column::StudentCount, Expr::value(9))
                .filter(classroom::Column::Id.eq(id))
                .exec(&app.db)
                .await
                .unwrap();
        }

        let res = app
            .post(routes::CLASSROOM_COUNTS, &json!({ "term_id": other_term }))
            .await;
        assert_eq!(res.body["updated_classrooms"], 1);
        assert_eq!(res.body["classrooms"].as_array().unwrap().len(), 1);
        assert_eq!(stored_count(&app, &other_room).await, 0);
        assert_eq!(stored_count(&app, &school.classroom_a).await, 9, "other terms untouched");
    }

    #[tokio::test]
    async fn counts_match_roster_after_mixed_writes() {
        let app = TestApp::spawn().await;
        let school = app.seed_school(3).await;

        let res = app
            .patch(
                &routes::student(&school.students_a[0]),
                &json!({ "classroom_id": school.classroom_b }),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        let res = app.delete(&routes::student(&school.students_b[1])).await;
        assert_eq!(res.status, 204);
        app.create_student("A9", "66009", &school.classroom_a).await;

        for room in [&school.classroom_a, &school.classroom_b] {
            let actual = student::Entity::find()
                .filter(student::Column::ClassroomId.eq(room))
                .count(&app.db)
                .await
                .unwrap() as i32;
            assert_eq!(stored_count(&app, room).await, actual);
        }

        let res = app.post(routes::CLASSROOM_COUNTS, &json!({})).await;
        assert_eq!(res.body["updated_classrooms"], 0);
    }
}

mod term_cascade {
    use super::*;

    async fn seed_extras(app: &TestApp, term_id: &str, subject_id: &str, classroom_id: &str) {
        assignment::ActiveModel {
            id: Set("hw1".into()),
            subject_id: Set(subject_id.into()),
            title: Set("Worksheet 1".into()),
            due_date: Set(None),
            term_id: Set(term_id.into()),
            created_at: Set(Utc::now()),
        }
        .insert(&app.db)
        .await
        .unwrap();
        timetable_entry::ActiveModel {
            id: Set("tt1".into()),
            subject_id: Set(subject_id.into()),
            classroom_id: Set(classroom_id.into()),
            day_of_week: Set(1),
            period: Set(2),
            term_id: Set(term_id.into()),
        }
        .insert(&app.db)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn deletes_term_and_everything_in_it() {
        let app = TestApp::spawn().await;
        let school = app.seed_school(2).await;
        seed_extras(&app, &school.term_id, &school.subject_id, &school.classroom_a).await;
        let session = app.open_session(&school.subject_id, "2024-06-03", 2).await;
        app.scan(session["token"].as_str().unwrap(), &school.students_a[0], &school.classroom_a)
            .await;

        // A second term that must survive.
        let keep = app.create_term("2024/2", false).await;
        let keep_room = app.create_classroom(&keep, "M.2/1").await;

        let res = app.delete(&routes::term(&school.term_id)).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["term_id"], school.term_id.as_str());

        let deleted: Vec<(String, u64)> = res.body["deleted"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| {
                (
                    d["collection"].as_str().unwrap().to_string(),
                    d["deleted"].as_u64().unwrap(),
                )
            })
            .collect();
        let expected = [
            ("attendance", 1),
            ("qr_sessions", 1),
            ("assignments", 1),
            ("timetable_entries", 1),
            ("subjects", 1),
            ("students", 4),
            ("classrooms", 2),
            ("terms", 1),
        ];
        assert_eq!(
            deleted,
            expected
                .iter()
                .map(|(c, n)| (c.to_string(), *n))
                .collect::<Vec<_>>()
        );

        assert_eq!(attendance::Entity::find().count(&app.db).await.unwrap(), 0);
        assert_eq!(qr_session::Entity::find().count(&app.db).await.unwrap(), 0);
        assert_eq!(subject::Entity::find().count(&app.db).await.unwrap(), 0);
        assert_eq!(student::Entity::find().count(&app.db).await.unwrap(), 0);
        assert_eq!(term::Entity::find().count(&app.db).await.unwrap(), 1);
        assert!(
            classroom::Entity::find_by_id(keep_room)
                .one(&app.db)
                .await
                .unwrap()
                .is_some()
        );

        let res = app.delete(&routes::term(&school.term_id)).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn failure_after_committed_chunks_reports_progress_and_rerun_finishes() {
        let app = TestApp::spawn_with(|c| c.store.batch_size = 1).await;
        let school = app.seed_school(2).await;
        seed_extras(&app, &school.term_id, &school.subject_id, &school.classroom_a).await;
        let session = app.open_session(&school.subject_id, "2024-06-03", 2).await;
        let token = session["token"].as_str().unwrap();
        for student in &school.students_a {
            let res = app.scan(token, student, &school.classroom_a).await;
            assert_eq!(res.status, 201, "{}", res.text);
        }

        app.db
            .execute_unprepared("DROP TABLE timetable_entries")
            .await
            .unwrap();

        let res = app.delete(&routes::term(&school.term_id)).await;
        assert_eq!(res.status, 500, "{}", res.text);
        assert_eq!(res.code(), "PARTIAL_CASCADE_FAILURE");
        assert_eq!(res.body["details"]["collection"], "timetable_entries");
        // Two check-ins, one session and one assignment.
        assert_eq!(res.body["details"]["deleted"], 4);

        assert_eq!(attendance::Entity::find().count(&app.db).await.unwrap(), 0);
        assert_eq!(assignment::Entity::find().count(&app.db).await.unwrap(), 0);
        assert_eq!(term::Entity::find().count(&app.db).await.unwrap(), 1);
        assert_eq!(student::Entity::find().count(&app.db).await.unwrap(), 4);

        rollcall_server::database::create_schema(&app.db).await.unwrap();

        let res = app.delete(&routes::term(&school.term_id)).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(term::Entity::find().count(&app.db).await.unwrap(), 0);
        assert_eq!(student::Entity::find().count(&app.db).await.unwrap(), 0);
        assert_eq!(classroom::Entity::find().count(&app.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failure_before_any_commit_is_store_unavailable() {
        let app = TestApp::spawn().await;
        let school = app.seed_school(1).await;

        app.db
            .execute_unprepared("DROP TABLE attendance")
            .await
            .unwrap();

        let res = app.delete(&routes::term(&school.term_id)).await;
        assert_eq!(res.status, 503, "{}", res.text);
        assert_eq!(res.code(), "STORE_UNAVAILABLE");
        assert_eq!(term::Entity::find().count(&app.db).await.unwrap(), 1);
        assert_eq!(student::Entity::find().count(&app.db).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn small_batches_delete_everything() {
        let app = TestApp::spawn().await;
        let school = app.seed_school(5).await;

        let report = delete_term(&app.db, &school.term_id, 2).await.unwrap();
        let students = report.iter().find(|d| d.collection == "students").unwrap();
        assert_eq!(students.deleted, 10);
        assert_eq!(student::Entity::find().count(&app.db).await.unwrap(), 0);
        assert_eq!(term::Entity::find().count(&app.db).await.unwrap(), 0);
    }
}
