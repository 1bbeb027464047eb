//! Drives `WsTransport` against a local websocket that answers like a DevTools page.

use std::sync::Arc;
use std::time::Duration;

use action_primitives::PageDom;
use cdp_adapter::{AdapterErrorKind, CdpPage, CdpTransport, WsTransport};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Answers every command with `respond(method, params)`, out of order when asked.
async fn fake_devtools<F>(respond: F, reverse_pairs: bool) -> String
where
    F: Fn(&str, &Value) -> Value + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/devtools/page/test", listener.local_addr().unwrap());

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let mut held: Option<Value> = None;
        while let Some(Ok(Message::Text(text))) = ws.next().await {
            let request: Value = serde_json::from_str(text.as_str()).unwrap();
            let method = request["method"].as_str().unwrap_or_default().to_string();
            let mut response = respond(&method, &request["params"]);
            response["id"] = request["id"].clone();

            if reverse_pairs && held.is_none() {
                held = Some(response);
                continue;
            }
            ws.send(Message::Text(response.to_string().into()))
                .await
                .unwrap();
            if let Some(first) = held.take() {
                ws.send(Message::Text(first.to_string().into()))
                    .await
                    .unwrap();
            }
        }
    });

    url
}

#[tokio::test]
async fn evaluate_round_trips_through_session() {
    let url = fake_devtools(
        |method, params| {
            assert_eq!(method, "Runtime.evaluate");
            assert_eq!(params["returnByValue"], true);
            json!({ "result": { "result": { "type": "number", "value": 480 } } })
        },
        false,
    )
    .await;

    let transport = WsTransport::connect(&url, Duration::from_secs(5))
        .await
        .unwrap();
    let page = CdpPage::new(Arc::new(transport));

    assert_eq!(page.scroll_offset().await.unwrap(), 480.0);
}

#[tokio::test]
async fn responses_are_matched_by_id() {
    let url = fake_devtools(
        |_, params| json!({ "result": { "echo": params["tag"].clone() } }),
        true,
    )
    .await;

    let transport = Arc::new(
        WsTransport::connect(&url, Duration::from_secs(5))
            .await
            .unwrap(),
    );
    let first = {
        let transport = transport.clone();
        tokio::spawn(async move { transport.send_command("Test.one", json!({"tag": 1})).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = transport
        .send_command("Test.two", json!({"tag": 2}))
        .await
        .unwrap();

    assert_eq!(second["echo"], 2);
    assert_eq!(first.await.unwrap().unwrap()["echo"], 1);
}

#[tokio::test]
async fn unanswered_command_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        while ws.next().await.is_some() {}
    });

    let transport = WsTransport::connect(&url, Duration::from_millis(100))
        .await
        .unwrap();
    let err = transport
        .send_command("Page.captureScreenshot", json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.kind, AdapterErrorKind::Timeout);
}
