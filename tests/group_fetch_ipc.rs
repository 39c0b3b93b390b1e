use serde_json::json;

mod test_support;

use test_support::{
    field, request_err, request_ok, spawn_sidecar, spawn_sidecar_with, temp_dir, StubResponse,
    StubServer,
};

fn group_server() -> StubServer {
    StubServer::start(|req| match req.path.as_str() {
        "/fetch/G42" => StubResponse::json(
            200,
            json!({
                "project_title": "Smart Irrigation",
                "guide_name": "Dr. Iyer",
                "mentor_name": "K. Das",
                "mentor_email": "das@example.org",
                "mentor_mobile": "9000000001",
                "members": [
                    ["21CS001", "Anu", "anu@example.org"],
                    ["21CS002", "Bala", "bala@example.org"],
                    {
                        "roll_no": "21CS003",
                        "student_name": "Chitra",
                        "contact_details": "chitra@example.org"
                    },
                    ["21CS004", "Dev", "dev@example.org"],
                    ["21CS005", "Extra", "extra@example.org"]
                ]
            }),
        ),
        _ => StubResponse::json(404, json!({ "error": "Group not found" })),
    })
}

#[test]
fn typing_a_group_id_populates_the_page() {
    let stub = group_server();
    let (_child, mut stdin, mut reader) = spawn_sidecar_with(&stub.url, &temp_dir("reviewd-group"));

    let set = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "review.setField",
        json!({ "review": 3, "key": "group_id", "value": " G42 " }),
    );
    assert_eq!(set["groupFetch"]["fetched"], true);
    let page = &set["page"];
    assert_eq!(field(page, "project_title"), "Smart Irrigation");
    assert_eq!(field(page, "mentor_email"), "das@example.org");
    assert_eq!(field(page, "roll_no_1"), "21CS001");
    assert_eq!(field(page, "student_name_3"), "Chitra");
    assert_eq!(field(page, "contact_details_4"), "dev@example.org");
    assert!(page["fields"].get("roll_no_5").is_none());

    let seen = stub.requests();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, "GET");
    assert_eq!(seen[0].path, "/fetch/G42");
}

#[test]
fn failed_lookup_leaves_the_page_untouched() {
    let stub = group_server();
    let (_child, mut stdin, mut reader) = spawn_sidecar_with(&stub.url, &temp_dir("reviewd-group"));

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "group.fetch",
        json!({ "review": 4, "groupId": "G42" }),
    );
    let err = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "group.fetch",
        json!({ "review": 4, "groupId": "G404" }),
    );
    assert_eq!(err["code"], "group_fetch_failed");
    assert_eq!(
        err["message"],
        "Failed to load group details. Please check the group ID."
    );

    let page = request_ok(&mut stdin, &mut reader, "3", "review.get", json!({ "review": 4 }));
    assert_eq!(field(&page, "group_id"), "G404");
    assert_eq!(field(&page, "project_title"), "Smart Irrigation");
    assert_eq!(field(&page, "student_name_1"), "Anu");
}

#[test]
fn blank_group_id_skips_the_request() {
    let stub = group_server();
    let (_child, mut stdin, mut reader) = spawn_sidecar_with(&stub.url, &temp_dir("reviewd-group"));

    let res = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "group.fetch",
        json!({ "review": 3, "groupId": "   " }),
    );
    assert_eq!(res["fetched"], false);
    assert!(stub.requests().is_empty());
}

#[test]
fn lookup_is_limited_to_reviews_three_and_four() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    for review in [1, 2, 5] {
        let err = request_err(
            &mut stdin,
            &mut reader,
            &format!("r{review}"),
            "group.fetch",
            json!({ "review": review, "groupId": "G42" }),
        );
        assert_eq!(err["code"], "bad_params");
    }

    // On other pages group_id is plain text.
    let set = request_ok(
        &mut stdin,
        &mut reader,
        "text",
        "review.setField",
        json!({ "review": 1, "key": "group_id", "value": "G42" }),
    );
    assert!(set.get("groupFetch").is_none());
}
