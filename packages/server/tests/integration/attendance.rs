use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::{Value, json};

use rollcall_server::entity::attendance;

use crate::common::{School, TestApp, routes};

const DAY: &str = "2024-06-03";

fn sheet(school: &School, date: &str, period: i32, records: Value) -> Value {
    json!({
        "date": date,
        "subject_id": school.subject_id,
        "classroom_id": school.classroom_a,
        "period": period,
        "records": records,
    })
}

mod save_attendance {
    use super::*;

    #[tokio::test]
    async fn resubmitting_updates_in_place() {
        let app = TestApp::spawn().await;
        let school = app.seed_school(3).await;
        let [a1, a2, a3] = [&school.students_a[0], &school.students_a[1], &school.students_a[2]];

        let first = sheet(
            &school,
            DAY,
            1,
            json!([
                { "student_id": a1, "status": "present" },
                { "student_id": a2, "status": "late" },
                { "student_id": a3, "status": "absent" },
            ]),
        );
        let res = app.post(routes::ATTENDANCE, &first).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["inserted"], 3);
        assert_eq!(res.body["updated"], 0);

        let second = sheet(
            &school,
            DAY,
            1,
            json!([
                { "student_id": a1, "status": "present" },
                { "student_id": a2, "status": "present", "note": "bus was late" },
                { "student_id": a3, "status": "sick" },
            ]),
        );
        let res = app.post(routes::ATTENDANCE, &second).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["inserted"], 0);
        assert_eq!(res.body["updated"], 3);

        let total = attendance::Entity::find().count(&app.db).await.unwrap();
        assert_eq!(total, 3);

        let res = app
            .get_with_query(routes::ATTENDANCE, &[("student_id", a2.as_str())])
            .await;
        let rows = res.body.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["status"], "present");
        assert_eq!(rows[0]["note"], "bus was late");
        assert_eq!(rows[0]["term_id"], school.term_id.as_str());
    }

    #[tokio::test]
    async fn last_duplicate_entry_wins() {
        let app = TestApp::spawn().await;
        let school = app.seed_school(1).await;
        let a1 = &school.students_a[0];

        let body = sheet(
            &school,
            DAY,
            1,
            json!([
                { "student_id": a1, "status": "present" },
                { "student_id": a1, "status": "leave" },
            ]),
        );
        let res = app.post(routes::ATTENDANCE, &body).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["inserted"], 1);

        let res = app.get(routes::ATTENDANCE).await;
        let rows = res.body.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["status"], "leave");
    }

    #[tokio::test]
    async fn large_sheets_are_written_in_chunks() {
        let app = TestApp::spawn_with(|c| c.store.batch_size = 2).await;
        let school = app.seed_school(5).await;

        let records: Vec<Value> = school
            .students_a
            .iter()
            .map(|id| json!({ "student_id": id, "status": "present" }))
            .collect();
        let res = app
            .post(routes::ATTENDANCE, &sheet(&school, DAY, 1, json!(records)))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["inserted"], 5);

        let total = attendance::Entity::find().count(&app.db).await.unwrap();
        assert_eq!(total, 5);
    }

    #[tokio::test]
    async fn empty_sheet_writes_nothing() {
        let app = TestApp::spawn().await;
        let school = app.seed_school(1).await;

        let res = app
            .post(routes::ATTENDANCE, &sheet(&school, DAY, 1, json!([])))
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["inserted"], 0);
        assert_eq!(res.body["updated"], 0);
    }

    #[tokio::test]
    async fn manual_entry_and_scan_share_one_record() {
        let app = TestApp::spawn().await;
        let school = app.seed_school(1).await;
        let a1 = &school.students_a[0];
        let session = app.open_session(&school.subject_id, DAY, 2).await;

        let res = app
            .scan(session["token"].as_str().unwrap(), a1, &school.classroom_a)
            .await;
        assert_eq!(res.status, 201, "{}", res.text);

        // The teacher corrects the scanned record to late.
        let body = sheet(
            &school,
            DAY,
            2,
            json!([{ "student_id": a1, "status": "late" }]),
        );
        let res = app.post(routes::ATTENDANCE, &body).await;
        assert_eq!(res.body["updated"], 1, "{}", res.text);

        let records = attendance::Entity::find().all(&app.db).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, common::AttendanceStatus::Late);
        assert!(records[0].check_in_time.is_some(), "scan time is kept");
    }

    #[tokio::test]
    async fn rejects_bad_sheets() {
        let app = TestApp::spawn().await;
        let school = app.seed_school(1).await;
        let a1 = &school.students_a[0];

        let cases = [
            sheet(&school, DAY, 0, json!([])),
            sheet(&school, DAY, 1, json!([{ "student_id": " ", "status": "present" }])),
            sheet(&school, DAY, 1, json!([{ "student_id": a1, "status": "asleep" }])),
            sheet(
                &school,
                DAY,
                1,
                json!([{ "student_id": a1, "status": "late", "note": "x".repeat(501) }]),
            ),
        ];
        for body in cases {
            let res = app.post(routes::ATTENDANCE, &body).await;
            assert_eq!(res.status, 400, "{body}: {}", res.text);
            assert_eq!(res.code(), "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn requires_a_term_when_none_is_active() {
        let app = TestApp::spawn().await;
        let term = app.create_term("2024/1", false).await;
        let classroom = app.create_classroom(&term, "M.1/1").await;
        let subject = app.create_subject(&term, "MATH101", &[&classroom]).await;
        let body = json!({
            "date": DAY,
            "subject_id": subject,
            "classroom_id": classroom,
            "period": 1,
            "records": [],
        });

        let res = app.post(routes::ATTENDANCE, &body).await;
        assert_eq!(res.status, 400);
        assert!(res.body["message"].as_str().unwrap().contains("active term"));

        let mut with_term = body.clone();
        with_term["term_id"] = json!(term);
        let res = app.post(routes::ATTENDANCE, &with_term).await;
        assert_eq!(res.status, 200, "{}", res.text);
    }
}

mod list_and_delete {
    use super::*;

    async fn seed_week(app: &TestApp, school: &School) {
        for (date, period) in [("2024-06-03", 1), ("2024-06-04", 1), ("2024-06-05", 2)] {
            let records: Vec<Value> = school
                .students_a
                .iter()
                .map(|id| json!({ "student_id": id, "status": "present" }))
                .collect();
            let res = app
                .post(routes::ATTENDANCE, &sheet(school, date, period, json!(records)))
                .await;
            assert_eq!(res.status, 200, "{}", res.text);
        }
    }

    #[tokio::test]
    async fn filters_combine() {
        let app = TestApp::spawn().await;
        let school = app.seed_school(2).await;
        seed_week(&app, &school).await;

        let all = app.get(routes::ATTENDANCE).await;
        assert_eq!(all.body.as_array().unwrap().len(), 6);

        let res = app
            .get_with_query(routes::ATTENDANCE, &[("date", "2024-06-04")])
            .await;
        assert_eq!(res.body.as_array().unwrap().len(), 2);

        let res = app
            .get_with_query(
                routes::ATTENDANCE,
                &[("from", "2024-06-04"), ("to", "2024-06-05")],
            )
            .await;
        assert_eq!(res.body.as_array().unwrap().len(), 4);

        let res = app
            .get_with_query(
                routes::ATTENDANCE,
                &[("period", "2"), ("student_id", school.students_a[1].as_str())],
            )
            .await;
        let rows = res.body.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["date"], "2024-06-05");
    }

    #[tokio::test]
    async fn results_are_ordered_by_date_period_student() {
        let app = TestApp::spawn().await;
        let school = app.seed_school(2).await;
        seed_week(&app, &school).await;

        let res = app.get(routes::ATTENDANCE).await;
        let keys: Vec<(String, i64, String)> = res
            .body
            .as_array()
            .unwrap()
            .iter()
            .map(|r| {
                (
                    r["date"].as_str().unwrap().to_string(),
                    r["period"].as_i64().unwrap(),
                    r["student_id"].as_str().unwrap().to_string(),
                )
            })
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[tokio::test]
    async fn inverted_range_is_rejected() {
        let app = TestApp::spawn().await;
        let res = app
            .get_with_query(
                routes::ATTENDANCE,
                &[("from", "2024-06-05"), ("to", "2024-06-01")],
            )
            .await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn delete_removes_one_record() {
        let app = TestApp::spawn().await;
        let school = app.seed_school(2).await;
        seed_week(&app, &school).await;

        let all = app.get(routes::ATTENDANCE).await;
        let id = all.body[0]["id"].as_str().unwrap().to_string();

        let res = app.delete(&routes::attendance_record(&id)).await;
        assert_eq!(res.status, 204);

        let total = attendance::Entity::find().count(&app.db).await.unwrap();
        assert_eq!(total, 5);

        let res = app.delete(&routes::attendance_record(&id)).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.code(), "NOT_FOUND");
    }
}
