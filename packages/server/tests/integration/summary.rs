use serde_json::{Value, json};

use crate::common::{School, TestApp, routes};

async fn save(app: &TestApp, school: &School, classroom: &str, date: &str, period: i32, records: Value) {
    let res = app
        .post(
            routes::ATTENDANCE,
            &json!({
                "date": date,
                "subject_id": school.subject_id,
                "classroom_id": classroom,
                "period": period,
                "records": records,
            }),
        )
        .await;
    assert_eq!(res.status, 200, "save failed: {}", res.text);
}

mod dashboard {
    use super::*;

    const DAY: &str = "2024-06-03";

    #[tokio::test]
    async fn counts_students_by_worst_status() {
        let app = TestApp::spawn().await;
        let school = app.seed_school(2).await;
        let (a1, a2) = (&school.students_a[0], &school.students_a[1]);

        // A1: present then late. A2: late then absent.
        save(&app, &school, &school.classroom_a, DAY, 1, json!([
            { "student_id": a1, "status": "present" },
            { "student_id": a2, "status": "late" },
        ]))
        .await;
        save(&app, &school, &school.classroom_a, DAY, 2, json!([
            { "student_id": a1, "status": "late" },
            { "student_id": a2, "status": "absent" },
        ]))
        .await;

        let res = app.get_with_query(routes::DASHBOARD, &[("date", DAY)]).await;
        assert_eq!(res.status, 200, "{}", res.text);
        let stats = &res.body["stats"];
        assert_eq!(stats["late"], 1);
        assert_eq!(stats["absent"], 1);
        assert_eq!(stats["present"], 0);
        assert_eq!(stats["recorded"], 2);
        assert_eq!(stats["total_students"], 4, "unrecorded students still count in the roster");
        assert_eq!(res.body["term_id"], school.term_id.as_str());
    }

    #[tokio::test]
    async fn reports_every_classroom_sorted_by_name() {
        let app = TestApp::spawn().await;
        let school = app.seed_school(1).await;
        save(&app, &school, &school.classroom_b, DAY, 1, json!([
            { "student_id": school.students_b[0], "status": "sick" },
        ]))
        .await;

        let res = app.get_with_query(routes::DASHBOARD, &[("date", DAY)]).await;
        let rows = res.body["classroom_summary"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["classroom_name"], "M.1/1");
        assert_eq!(rows[0]["counts"]["total"], 0);
        assert_eq!(rows[1]["classroom_name"], "M.1/2");
        assert_eq!(rows[1]["counts"]["sick"], 1);
        assert_eq!(rows[1]["counts"]["total"], 1);
    }

    #[tokio::test]
    async fn other_days_are_not_counted() {
        let app = TestApp::spawn().await;
        let school = app.seed_school(1).await;
        save(&app, &school, &school.classroom_a, "2024-06-04", 1, json!([
            { "student_id": school.students_a[0], "status": "absent" },
        ]))
        .await;

        let res = app.get_with_query(routes::DASHBOARD, &[("date", DAY)]).await;
        assert_eq!(res.body["stats"]["recorded"], 0);
        assert_eq!(res.body["stats"]["absent"], 0);
    }

    #[tokio::test]
    async fn needs_a_term() {
        let app = TestApp::spawn().await;
        let res = app.get_with_query(routes::DASHBOARD, &[("date", DAY)]).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
    }
}

mod grid {
    use super::*;

    #[tokio::test]
    async fn builds_student_by_date_matrix() {
        let app = TestApp::spawn().await;
        let school = app.seed_school(2).await;
        let (a1, a2) = (&school.students_a[0], &school.students_a[1]);

        save(&app, &school, &school.classroom_a, "2024-06-03", 1, json!([
            { "student_id": a2, "status": "present" },
            { "student_id": a1, "status": "present" },
        ]))
        .await;
        save(&app, &school, &school.classroom_a, "2024-06-03", 2, json!([
            { "student_id": a1, "status": "leave" },
        ]))
        .await;
        save(&app, &school, &school.classroom_a, "2024-06-05", 1, json!([
            { "student_id": a2, "status": "online" },
        ]))
        .await;

        let res = app.get(routes::GRID).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["dates"], json!(["2024-06-03", "2024-06-05"]));

        let rows = res.body["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["student_id"], a1.as_str());
        assert_eq!(rows[0]["student_code"], "66001");
        assert_eq!(rows[0]["cells"], json!(["leave", null]));
        assert_eq!(rows[1]["student_id"], a2.as_str());
        assert_eq!(rows[1]["cells"], json!(["present", "online"]));
    }

    #[tokio::test]
    async fn filters_narrow_the_grid() {
        let app = TestApp::spawn().await;
        let school = app.seed_school(1).await;
        save(&app, &school, &school.classroom_a, "2024-06-03", 1, json!([
            { "student_id": school.students_a[0], "status": "present" },
        ]))
        .await;
        save(&app, &school, &school.classroom_b, "2024-06-04", 1, json!([
            { "student_id": school.students_b[0], "status": "absent" },
        ]))
        .await;

        let res = app
            .get_with_query(routes::GRID, &[("classroom_id", school.classroom_b.as_str())])
            .await;
        assert_eq!(res.body["dates"], json!(["2024-06-04"]));
        assert_eq!(res.body["rows"].as_array().unwrap().len(), 1);

        let res = app
            .get_with_query(routes::GRID, &[("from", "2024-06-05"), ("to", "2024-06-30")])
            .await;
        assert_eq!(res.body["dates"], json!([]));
        assert!(res.body["rows"].as_array().unwrap().is_empty());
    }
}
