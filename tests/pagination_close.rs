//! `iter_data_code` page ordering and the close-guard race against a
//! multi-page walk (mirrors the `iter_data_layer` coverage in
//! `data_layer.rs`, exercising the sync iterator's sibling code path).

mod common;

use boj_api_client::{BojClient, DataCodeQuery};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn iter_data_code_walks_pages_in_cursor_order() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/getDataCode"))
        .and(query_param("startPosition", "9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::series_body_with_next(&["C2".to_string()], None)))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/getDataCode"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::series_body_with_next(&["C1".to_string()], Some(9))))
        .with_priority(2)
        .mount(&server)
        .await;

    let client = BojClient::new(common::fast_config(&server.uri())).unwrap();
    let pages: Vec<_> = client
        .iter_data_code(DataCodeQuery::new("DB", vec!["A".into()]))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].series[0].series_code, "C1");
    assert_eq!(pages[1].series[0].series_code, "C2");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn closing_mid_walk_stops_the_iterator_before_the_next_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/getDataCode"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::series_body_with_next(&["C1".to_string()], Some(2))))
        .mount(&server)
        .await;

    let client = BojClient::new(common::fast_config(&server.uri())).unwrap();
    let mut pages = client.iter_data_code(DataCodeQuery::new("DB", vec!["A".into()])).unwrap();

    assert!(pages.next().unwrap().is_ok());
    client.close();
    let err = pages.next().unwrap().unwrap_err();
    assert!(err.is_client_closed());

    // The facade itself rejects any further call once closed, regardless of
    // the in-flight iterator.
    let rejected = client.get_data_code(DataCodeQuery::new("DB", vec!["B".into()]), None).unwrap_err();
    assert!(rejected.is_client_closed());
}
