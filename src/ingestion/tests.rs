//! Ingestion Module Tests
//!
//! Drives `/upload` on a live node over HTTP.
//!
//! ## Test Scopes
//! - **Scenarios**: single file, sub-path placement, empty form, several files per request.
//! - **Partial failure**: a part that cannot be stored does not abort the others.
//! - **Malformed bodies**: requests that cannot be read as multipart at all, and bodies
//!   that break off after the first part.
//! - **Limits**: the configured body size cap.

#[cfg(test)]
mod tests {
    use crate::protocol::{ENDPOINT_UPLOAD, ResponseCode, UploadResponse};
    use crate::storage::names::NAME_ALPHABET;
    use crate::storage::paths::encode_sub_path;
    use crate::test_support::{files_under, spawn_node, spawn_node_with};
    use reqwest::multipart::{Form, Part};

    fn file_part(name: &str, contents: &'static [u8]) -> Part {
        Part::bytes(contents).file_name(name.to_string())
    }

    async fn upload(
        url: &str,
        form: Form,
        sub_path: Option<&str>,
    ) -> (reqwest::StatusCode, UploadResponse) {
        let mut request = reqwest::Client::new().post(url).multipart(form);
        if let Some(sub_path) = sub_path {
            request = request.header("Path", encode_sub_path(sub_path));
        }
        let response = request.send().await.unwrap();
        let status = response.status();
        let body = response.json::<UploadResponse>().await.unwrap();
        (status, body)
    }

    // ============================================================
    // SCENARIOS
    // ============================================================

    #[tokio::test]
    async fn test_single_file_without_path_header() {
        let node = spawn_node(vec![]).await;
        let form = Form::new().part("doc", file_part("notes.txt", b"hello"));

        let (status, body) = upload(&node.url(ENDPOINT_UPLOAD), form, None).await;

        assert_eq!(status, reqwest::StatusCode::OK);
        assert_eq!(body.code, ResponseCode::Success);
        assert_eq!(body.results.len(), 1);

        let relative = body.results["doc@notes.txt"].as_str().unwrap();
        assert!(relative.starts_with('/'));
        assert!(relative.ends_with(".txt"));
        // "/" + 12 generated symbols + ".txt"
        assert_eq!(relative.len(), 1 + 12 + 4);
        assert!(relative[1..13].bytes().all(|b| NAME_ALPHABET.contains(&b)));

        let stored = node.root_path().join(&relative[1..]);
        assert_eq!(std::fs::read(stored).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_path_header_places_file_in_sub_directory() {
        let node = spawn_node(vec![]).await;
        let form = Form::new().part("report", file_part("q1.csv", b"a,b\n1,2\n"));

        let (_, body) = upload(&node.url(ENDPOINT_UPLOAD), form, Some("reports/2024")).await;

        assert_eq!(body.code, ResponseCode::Success);
        let relative = body.results["report@q1.csv"].as_str().unwrap();
        assert!(relative.starts_with("/reports/2024/"), "{}", relative);
        assert!(relative.ends_with(".csv"));

        let files = files_under(&node.root_path().join("reports/2024"));
        assert_eq!(files.len(), 1);
        assert_eq!(std::fs::read(&files[0]).unwrap(), b"a,b\n1,2\n");
    }

    #[tokio::test]
    async fn test_traversal_in_path_header_stays_under_root() {
        let node = spawn_node(vec![]).await;
        let form = Form::new().part("f", file_part("x.bin", b"x"));

        let (_, body) = upload(&node.url(ENDPOINT_UPLOAD), form, Some("../../etc")).await;

        assert_eq!(body.code, ResponseCode::Success);
        let relative = body.results["f@x.bin"].as_str().unwrap();
        assert!(relative.starts_with("/etc/"), "{}", relative);
        assert!(node.root_path().join(&relative[1..]).is_file());
    }

    #[tokio::test]
    async fn test_form_without_parts_is_success() {
        let node = spawn_node(vec![]).await;

        let response = reqwest::Client::new()
            .post(node.url(ENDPOINT_UPLOAD))
            .header("Content-Type", "multipart/form-data; boundary=XyZ")
            .body("--XyZ--\r\n")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body = response.json::<UploadResponse>().await.unwrap();
        assert_eq!(body.code, ResponseCode::Success);
        assert!(body.results.is_empty());
        assert!(files_under(node.root_path()).is_empty());
    }

    #[tokio::test]
    async fn test_same_file_name_twice_gets_distinct_paths() {
        let node = spawn_node(vec![]).await;
        let form = Form::new()
            .part("first", file_part("same.txt", b"one"))
            .part("second", file_part("same.txt", b"two"));

        let (_, body) = upload(&node.url(ENDPOINT_UPLOAD), form, None).await;

        assert_eq!(body.code, ResponseCode::Success);
        let first = body.results["first@same.txt"].as_str().unwrap();
        let second = body.results["second@same.txt"].as_str().unwrap();
        assert_ne!(first, second);

        assert_eq!(std::fs::read(node.root_path().join(&first[1..])).unwrap(), b"one");
        assert_eq!(std::fs::read(node.root_path().join(&second[1..])).unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_repeated_field_and_file_name_keep_both_entries() {
        let node = spawn_node(vec![]).await;
        let form = Form::new()
            .part("f", file_part("same.txt", b"one"))
            .part("f", file_part("same.txt", b"two"));

        let (_, body) = upload(&node.url(ENDPOINT_UPLOAD), form, None).await;

        assert_eq!(body.code, ResponseCode::Success);
        let keys: Vec<&String> = body.results.keys().collect();
        assert_eq!(keys, ["f@same.txt", "f@same.txt#2"]);

        let first = body.results["f@same.txt"].as_str().unwrap();
        let second = body.results["f@same.txt#2"].as_str().unwrap();
        assert_ne!(first, second);
        assert_eq!(std::fs::read(node.root_path().join(&first[1..])).unwrap(), b"one");
        assert_eq!(std::fs::read(node.root_path().join(&second[1..])).unwrap(), b"two");
        assert_eq!(files_under(node.root_path()).len(), 2);
    }

    #[tokio::test]
    async fn test_results_follow_arrival_order() {
        let node = spawn_node(vec![]).await;
        let form = Form::new()
            .part("zeta", file_part("z.txt", b"z"))
            .part("alpha", file_part("a.txt", b"a"));

        let (_, body) = upload(&node.url(ENDPOINT_UPLOAD), form, None).await;

        let keys: Vec<&String> = body.results.keys().collect();
        assert_eq!(keys, ["zeta@z.txt", "alpha@a.txt"]);
    }

    #[tokio::test]
    async fn test_non_file_fields_are_skipped() {
        let node = spawn_node(vec![]).await;
        let form = Form::new()
            .text("comment", "not a file")
            .part("doc", file_part("kept.md", b"# kept"));

        let (_, body) = upload(&node.url(ENDPOINT_UPLOAD), form, None).await;

        assert_eq!(body.code, ResponseCode::Success);
        assert_eq!(body.results.len(), 1);
        assert!(body.results.contains_key("doc@kept.md"));
        assert_eq!(files_under(node.root_path()).len(), 1);
    }

    // ============================================================
    // FAILURES
    // ============================================================

    #[tokio::test]
    async fn test_unwritable_destination_is_recorded_per_part() {
        let node = spawn_node(vec![]).await;
        std::fs::write(node.root_path().join("blocked"), b"regular file").unwrap();
        let form = Form::new()
            .part("a", file_part("a.txt", b"a"))
            .part("b", file_part("b.txt", b"b"));

        let (status, body) =
            upload(&node.url(ENDPOINT_UPLOAD), form, Some("blocked/inner")).await;

        assert_eq!(status, reqwest::StatusCode::OK);
        assert_eq!(body.code, ResponseCode::Error);
        assert_eq!(body.results.len(), 2);
        assert!(body.results["a@a.txt"].is_null());
        assert!(body.results["b@b.txt"].is_null());
    }

    #[tokio::test]
    async fn test_non_multipart_request_is_server_error() {
        let node = spawn_node(vec![]).await;

        let response = reqwest::Client::new()
            .post(node.url(ENDPOINT_UPLOAD))
            .header("Content-Type", "application/json")
            .body("{}")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!response.text().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_truncated_body_before_first_part_is_server_error() {
        let node = spawn_node(vec![]).await;

        let response = reqwest::Client::new()
            .post(node.url(ENDPOINT_UPLOAD))
            .header("Content-Type", "multipart/form-data; boundary=XyZ")
            .body("this is not a multipart body")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        assert!(files_under(node.root_path()).is_empty());
    }

    #[tokio::test]
    async fn test_body_cut_off_inside_second_part_keeps_first_result() {
        let node = spawn_node(vec![]).await;
        let body = concat!(
            "--XyZ\r\n",
            "Content-Disposition: form-data; name=\"a\"; filename=\"a.txt\"\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "first part\r\n",
            "--XyZ\r\n",
            "Content-Disposition: form-data; name=\"b\"; filename=\"b.txt\"\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "second part never ends",
        );

        let response = reqwest::Client::new()
            .post(node.url(ENDPOINT_UPLOAD))
            .header("Content-Type", "multipart/form-data; boundary=XyZ")
            .body(body)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body = response.json::<UploadResponse>().await.unwrap();
        assert_eq!(body.code, ResponseCode::Error);
        assert_eq!(body.results.len(), 2);
        assert!(body.results["b@b.txt"].is_null());

        let first = body.results["a@a.txt"].as_str().unwrap();
        let files = files_under(node.root_path());
        assert_eq!(files, vec![node.root_path().join(&first[1..])]);
        assert_eq!(std::fs::read(&files[0]).unwrap(), b"first part");
    }

    // ============================================================
    // LIMITS
    // ============================================================

    #[tokio::test]
    async fn test_body_over_configured_limit_is_rejected() {
        let node = spawn_node_with(vec![], serde_json::json!({ "maxBodyBytes": 1024 })).await;

        let form = Form::new().part("small", file_part("fits.txt", b"fits"));
        let (_, body) = upload(&node.url(ENDPOINT_UPLOAD), form, None).await;
        assert_eq!(body.code, ResponseCode::Success);

        let oversized = Part::bytes(vec![b'x'; 64 * 1024]).file_name("big.bin");
        let response = reqwest::Client::new()
            .post(node.url(ENDPOINT_UPLOAD))
            .multipart(Form::new().part("big", oversized))
            .send()
            .await;

        // The node may answer before the client finishes sending, which can surface as a
        // connection error on the client side.
        let rejected = match response {
            Err(_) => true,
            Ok(response) => {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                status != reqwest::StatusCode::OK
                    || serde_json::from_str::<UploadResponse>(&text)
                        .map(|body| body.code == ResponseCode::Error)
                        .unwrap_or(true)
            }
        };
        assert!(rejected);

        let stored = files_under(node.root_path());
        let contents: Vec<Vec<u8>> = stored
            .iter()
            .filter_map(|path| std::fs::read(path).ok())
            .collect();
        assert!(contents.iter().any(|bytes| bytes.as_slice() == b"fits"));
        assert!(contents.iter().all(|bytes| bytes.len() <= 1024));
    }
}
